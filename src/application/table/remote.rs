//! Background fetch loop of a remote table.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use tokio::sync::watch;
use tracing::{debug, warn};

use super::TableService;
use super::state::{QuerySnapshot, TableOutputs};

/// Fetch pages from `endpoint` whenever the query settles.
///
/// Changes are debounced. A change that arrives while a fetch is in flight
/// drops that fetch, even when both are ready in the same poll; only the
/// settled query is ever published. The loop ends when the query sender goes
/// away.
pub(crate) async fn run<T>(
    service: TableService,
    endpoint: String,
    debounce: Duration,
    mut query: watch::Receiver<QuerySnapshot>,
    outputs: Arc<TableOutputs<T>>,
) where
    T: DeserializeOwned + Send + Sync + 'static,
{
    loop {
        if !settle(&mut query, debounce).await {
            return;
        }

        let snapshot = query.borrow_and_update().clone();
        let params = service.build_query_params(&snapshot.params);
        outputs.loading.send_replace(true);
        outputs.error.send_replace(None);

        tokio::select! {
            biased;

            changed = query.changed() => {
                if changed.is_err() {
                    return;
                }
                debug!(target: "sijil::table", endpoint = %endpoint, "superseded table fetch dropped");
                continue;
            }
            result = service.fetch_data::<T>(&endpoint, &params) => match result {
                _ if is_superseded(&query, &snapshot) => {
                    debug!(target: "sijil::table", endpoint = %endpoint, "superseded table result dropped");
                    continue;
                }
                Ok(page) => {
                    debug!(
                        target: "sijil::table",
                        endpoint = %endpoint,
                        page = snapshot.params.page,
                        total_items = page.total_items,
                        "table page loaded"
                    );
                    outputs.publish_page(page.data, page.total_items);
                }
                Err(err) => {
                    warn!(
                        target: "sijil::table",
                        endpoint = %endpoint,
                        status = err.status_code(),
                        error = %err,
                        "table data fetch failed"
                    );
                    outputs.publish_error(err.table_message());
                }
            },
        }

        if query.changed().await.is_err() {
            return;
        }
    }
}

/// True when the query moved on after `fetched` was taken.
fn is_superseded(query: &watch::Receiver<QuerySnapshot>, fetched: &QuerySnapshot) -> bool {
    query.has_changed().unwrap_or(true) && *query.borrow() != *fetched
}

/// Wait until no change has arrived for `debounce`. False when the sender is gone.
async fn settle(query: &mut watch::Receiver<QuerySnapshot>, debounce: Duration) -> bool {
    loop {
        tokio::select! {
            changed = query.changed() => {
                if changed.is_err() {
                    return false;
                }
            }
            () = tokio::time::sleep(debounce) => return true,
        }
    }
}
