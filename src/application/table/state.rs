//! Observable table state.
//!
//! Outputs are `watch` channels: every subscriber sees the latest value and
//! is woken on change. Setters update the query in one step, so a setter that
//! also resets the page never exposes the intermediate state.

use std::sync::Arc;

use serde_json::Value;
use sijil_api_types::{DEFAULT_PAGE, Filters, SortDirection, TableQueryParams};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::local;

/// Query parameters plus the refresh counter that forces a reload.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct QuerySnapshot {
    pub(crate) params: TableQueryParams,
    pub(crate) refresh: u64,
}

/// Publishing side of the table outputs.
#[derive(Debug)]
pub(crate) struct TableOutputs<T> {
    pub(crate) data: watch::Sender<Vec<T>>,
    pub(crate) total_items: watch::Sender<u64>,
    pub(crate) loading: watch::Sender<bool>,
    pub(crate) error: watch::Sender<Option<String>>,
}

impl<T> TableOutputs<T> {
    pub(crate) fn new() -> Self {
        Self {
            data: watch::Sender::new(Vec::new()),
            total_items: watch::Sender::new(0),
            loading: watch::Sender::new(false),
            error: watch::Sender::new(None),
        }
    }

    pub(crate) fn publish_page(&self, data: Vec<T>, total_items: u64) {
        self.data.send_replace(data);
        self.total_items.send_replace(total_items);
        self.loading.send_replace(false);
    }

    pub(crate) fn publish_error(&self, message: String) {
        self.error.send_replace(Some(message));
        self.loading.send_replace(false);
        self.data.send_replace(Vec::new());
        self.total_items.send_replace(0);
    }
}

pub(crate) struct LocalRecords<T> {
    records: Vec<T>,
    rows: Vec<Value>,
}

impl<T: Clone> LocalRecords<T> {
    pub(crate) fn new(records: Vec<T>, rows: Vec<Value>) -> Self {
        Self { records, rows }
    }

    fn publish(&self, params: &TableQueryParams, outputs: &TableOutputs<T>) {
        let view = local::compute(&self.rows, params);
        let data = view
            .indices
            .iter()
            .map(|&index| self.records[index].clone())
            .collect();
        outputs.publish_page(data, view.total as u64);
    }
}

pub(crate) enum Source<T> {
    /// A background task fetches pages from an endpoint.
    Remote(JoinHandle<()>),
    /// Pages are computed in place on every change.
    Static(LocalRecords<T>),
}

/// State of one table: its query, its outputs and how pages are produced.
///
/// Dropping the state stops any background fetching.
pub struct TableState<T> {
    query: watch::Sender<QuerySnapshot>,
    current: watch::Sender<TableQueryParams>,
    outputs: Arc<TableOutputs<T>>,
    initial: TableQueryParams,
    source: Source<T>,
}

impl<T: Clone> TableState<T> {
    pub(crate) fn new(
        query: watch::Sender<QuerySnapshot>,
        outputs: Arc<TableOutputs<T>>,
        source: Source<T>,
    ) -> Self {
        let initial = query.borrow().params.clone();
        let state = Self {
            current: watch::Sender::new(initial.clone()),
            query,
            outputs,
            initial,
            source,
        };
        state.recompute();
        state
    }

    pub fn data(&self) -> watch::Receiver<Vec<T>> {
        self.outputs.data.subscribe()
    }

    pub fn total_items(&self) -> watch::Receiver<u64> {
        self.outputs.total_items.subscribe()
    }

    pub fn loading(&self) -> watch::Receiver<bool> {
        self.outputs.loading.subscribe()
    }

    pub fn error(&self) -> watch::Receiver<Option<String>> {
        self.outputs.error.subscribe()
    }

    pub fn current_state(&self) -> watch::Receiver<TableQueryParams> {
        self.current.subscribe()
    }

    /// The visible page as of now.
    pub fn current_data(&self) -> Vec<T> {
        self.outputs.data.borrow().clone()
    }

    pub fn current_total(&self) -> u64 {
        *self.outputs.total_items.borrow()
    }

    pub fn is_loading(&self) -> bool {
        *self.outputs.loading.borrow()
    }

    pub fn current_error(&self) -> Option<String> {
        self.outputs.error.borrow().clone()
    }

    pub fn params(&self) -> TableQueryParams {
        self.current.borrow().clone()
    }

    pub fn is_static(&self) -> bool {
        matches!(self.source, Source::Static(_))
    }

    pub fn set_page(&self, page: u32) {
        self.update(|params| params.page = page.max(1));
    }

    pub fn set_page_size(&self, page_size: u32) {
        self.update(|params| {
            params.page_size = page_size.max(1);
            params.page = DEFAULT_PAGE;
        });
    }

    pub fn set_sort(&self, sort_by: impl Into<String>, direction: SortDirection) {
        let sort_by = sort_by.into();
        self.update(|params| {
            params.sort_by = sort_by;
            params.sort_direction = direction;
            params.page = DEFAULT_PAGE;
        });
    }

    pub fn set_search(&self, search: impl Into<String>) {
        let search = search.into();
        self.update(|params| {
            params.search = search;
            params.page = DEFAULT_PAGE;
        });
    }

    pub fn set_filters(&self, filters: Filters) {
        self.update(|params| {
            params.filters = filters;
            params.page = DEFAULT_PAGE;
        });
    }

    /// Reload with unchanged parameters.
    pub fn refresh(&self) {
        self.query.send_modify(|snapshot| {
            snapshot.refresh = snapshot.refresh.wrapping_add(1);
        });
        self.recompute();
    }

    /// Restore the parameters the table was created with.
    pub fn reset(&self) {
        let initial = self.initial.clone();
        self.query.send_modify(|snapshot| {
            snapshot.params = initial;
            snapshot.refresh = 0;
        });
        self.after_change();
    }

    fn update(&self, change: impl FnOnce(&mut TableQueryParams)) {
        self.query.send_modify(|snapshot| change(&mut snapshot.params));
        self.after_change();
    }

    fn after_change(&self) {
        let params = self.query.borrow().params.clone();
        self.current.send_if_modified(|current| {
            if *current == params {
                return false;
            }
            *current = params;
            true
        });
        self.recompute();
    }

    fn recompute(&self) {
        if let Source::Static(local) = &self.source {
            local.publish(&self.query.borrow().params, &self.outputs);
        }
    }
}

impl<T> Drop for TableState<T> {
    fn drop(&mut self) {
        if let Source::Remote(worker) = &self.source {
            worker.abort();
        }
    }
}
