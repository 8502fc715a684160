//! Paginated table state over a remote endpoint or an in-memory collection.

mod export;
mod local;
mod remote;
mod search;
mod state;

use std::sync::Arc;

use bytes::Bytes;
use serde::Serialize;
use serde::de::DeserializeOwned;
use sijil_api_types::{DEFAULT_PAGE, PaginatedResponse, TableQueryParams};
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::watch;

use crate::config::TableSettings;
use crate::infra::http::{ApiClient, ApiError, QueryParams, RequestHeaders};

pub use export::CsvColumn;
pub use search::normalize as normalize_search;
pub use state::TableState;

use state::{LocalRecords, QuerySnapshot, Source, TableOutputs};

const EXCEL_ACCEPT: &str = "application/vnd.ms-excel";

#[derive(Debug, Error)]
pub enum TableError {
    #[error("table record could not be serialized: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("remote tables need a running tokio runtime")]
    NoRuntime,
}

/// Creates table states and performs table-shaped requests.
#[derive(Clone)]
pub struct TableService {
    client: ApiClient,
    settings: TableSettings,
}

impl TableService {
    pub fn new(client: ApiClient, settings: TableSettings) -> Self {
        Self { client, settings }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// First page with the configured default page size.
    pub fn default_params(&self) -> TableQueryParams {
        TableQueryParams {
            page_size: self.settings.default_page_size.get(),
            ..TableQueryParams::default()
        }
    }

    /// Table backed by `endpoint`.
    ///
    /// Must be called inside a tokio runtime: a background task fetches a page
    /// once the query has been quiet for the configured debounce.
    pub fn create_table_state<T>(
        &self,
        endpoint: impl Into<String>,
        initial: TableQueryParams,
    ) -> Result<TableState<T>, TableError>
    where
        T: DeserializeOwned + Clone + Send + Sync + 'static,
    {
        let handle = Handle::try_current().map_err(|_| TableError::NoRuntime)?;
        let query = watch::Sender::new(QuerySnapshot {
            params: sanitize(initial),
            refresh: 0,
        });
        let outputs = Arc::new(TableOutputs::new());

        let worker = handle.spawn(remote::run(
            self.clone(),
            endpoint.into(),
            self.settings.debounce,
            query.subscribe(),
            Arc::clone(&outputs),
        ));

        Ok(TableState::new(query, outputs, Source::Remote(worker)))
    }

    /// Table over a fixed collection. Pages are computed synchronously, so
    /// the outputs are current as soon as a setter returns.
    pub fn create_static_table_state<T>(
        &self,
        records: Vec<T>,
        initial: TableQueryParams,
    ) -> Result<TableState<T>, TableError>
    where
        T: Serialize + Clone,
    {
        let rows = records
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;
        let query = watch::Sender::new(QuerySnapshot {
            params: sanitize(initial),
            refresh: 0,
        });
        let source = Source::Static(LocalRecords::new(records, rows));
        Ok(TableState::new(query, Arc::new(TableOutputs::new()), source))
    }

    /// Cached GET of one page.
    pub async fn fetch_data<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &QueryParams,
    ) -> Result<PaginatedResponse<T>, ApiError> {
        self.client.get(endpoint, None, Some(params)).await
    }

    /// Outbound query for `params`: `page`, `pageSize`, `sortBy` and
    /// `sortDirection` when sorting, `search` when set, then each non-empty
    /// filter under its own key.
    pub fn build_query_params(&self, params: &TableQueryParams) -> QueryParams {
        let mut query = QueryParams::new();
        if params.page > 0 {
            query.set("page", params.page);
        }
        if params.page_size > 0 {
            query.set("pageSize", params.page_size);
        }
        if !params.sort_by.is_empty() {
            query
                .set("sortBy", params.sort_by.as_str())
                .set("sortDirection", params.sort_direction.as_str());
        }
        if !params.search.is_empty() {
            query.set("search", params.search.as_str());
        }
        for (key, value) in params.active_filters() {
            query.set(key.as_str(), value.clone());
        }
        query
    }

    /// CSV of `records` with a UTF-8 BOM.
    pub fn export_csv<T: Serialize>(
        &self,
        records: &[T],
        columns: Option<&[CsvColumn]>,
    ) -> Result<String, TableError> {
        export::to_csv(records, columns)
    }

    /// Spreadsheet export rendered by the endpoint itself. Never cached.
    pub async fn export_excel(
        &self,
        endpoint: &str,
        params: &TableQueryParams,
    ) -> Result<Bytes, ApiError> {
        let query = self.build_query_params(params).with("export", "excel");
        let headers = RequestHeaders::new().with("Accept", EXCEL_ACCEPT);
        self.client
            .get_blob(endpoint, Some(&headers), Some(&query))
            .await
    }
}

fn sanitize(mut params: TableQueryParams) -> TableQueryParams {
    params.page = params.page.max(DEFAULT_PAGE);
    params.page_size = params.page_size.max(1);
    params
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use sijil_api_types::{Filters, ParamValue, SortDirection};

    use super::*;
    use crate::cache::CacheConfig;
    use crate::infra::http::{ApiRequest, Transport};

    struct Unreachable;

    #[async_trait]
    impl Transport for Unreachable {
        async fn send(&self, request: ApiRequest) -> Result<Bytes, ApiError> {
            Err(ApiError::connectivity(request.url, "offline"))
        }
    }

    fn service() -> TableService {
        let client = ApiClient::new(Arc::new(Unreachable), CacheConfig::default());
        TableService::new(client, TableSettings::default())
    }

    #[test]
    fn query_params_include_only_set_dimensions() {
        let mut filters = Filters::new();
        filters.insert("status".into(), ParamValue::from("active"));
        filters.insert("department".into(), ParamValue::Null);
        let params = TableQueryParams {
            page: 2,
            page_size: 20,
            sort_by: "createdAt".into(),
            sort_direction: SortDirection::Desc,
            search: "angular".into(),
            filters,
        };
        assert_eq!(
            service().build_query_params(&params).to_query_string(),
            "page=2&pageSize=20&search=angular&sortBy=createdAt&sortDirection=desc&status=active"
        );

        let bare = service().build_query_params(&TableQueryParams::default());
        assert_eq!(bare.to_query_string(), "page=1&pageSize=10");
    }

    #[test]
    fn remote_tables_require_a_runtime() {
        let result = service()
            .create_table_state::<serde_json::Value>("/api/employees", TableQueryParams::default());
        assert!(matches!(result, Err(TableError::NoRuntime)));
    }

    #[test]
    fn initial_params_are_clamped() {
        let state = service()
            .create_static_table_state(
                vec![1, 2, 3],
                TableQueryParams {
                    page: 0,
                    page_size: 0,
                    ..TableQueryParams::default()
                },
            )
            .expect("static table");
        assert_eq!(state.params().page, 1);
        assert_eq!(state.params().page_size, 1);
        assert_eq!(state.current_data(), vec![1]);
        assert_eq!(state.current_total(), 3);
    }

    #[test]
    fn default_params_use_configured_page_size() {
        let params = service().default_params();
        assert_eq!(params.page, 1);
        assert_eq!(params.page_size, 10);
    }
}
