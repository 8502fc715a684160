//! Ready-made key shapes for the common request kinds.

use std::borrow::Borrow;

use sijil_api_types::{ParamValue, SortDirection};

use super::keys::CacheKeyBuilder;

/// Key for an API call: URL, then parameters, then headers.
pub fn for_api_call<P, PK, PV, H, HK, HV>(url: &str, params: P, headers: H) -> String
where
    P: IntoIterator<Item = (PK, PV)>,
    PK: AsRef<str>,
    PV: Borrow<ParamValue>,
    H: IntoIterator<Item = (HK, HV)>,
    HK: AsRef<str>,
    HV: AsRef<str>,
{
    CacheKeyBuilder::new()
        .add_url(url)
        .add_params(params)
        .add_headers(headers)
        .build()
}

/// Key for one page of table data.
pub fn for_table_data<F, K, V>(
    endpoint: &str,
    page: u32,
    page_size: u32,
    sort_by: &str,
    direction: Option<SortDirection>,
    search: &str,
    filters: F,
) -> String
where
    F: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Borrow<ParamValue>,
{
    CacheKeyBuilder::new()
        .add_url(endpoint)
        .add_pagination(Some(page), Some(page_size))
        .add_sort(sort_by, direction)
        .add_search(search)
        .add_filters(filters)
        .build()
}

pub fn for_resource<P, K, V>(resource_type: &str, id: impl Into<ParamValue>, params: P) -> String
where
    P: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Borrow<ParamValue>,
{
    CacheKeyBuilder::new()
        .add_resource(resource_type, id)
        .add_params(params)
        .build()
}

pub fn for_user_data<P, K, V>(user_id: impl Into<ParamValue>, data_type: &str, params: P) -> String
where
    P: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Borrow<ParamValue>,
{
    CacheKeyBuilder::new()
        .add_user(user_id)
        .add_custom("dataType", data_type)
        .add_params(params)
        .build()
}

pub fn for_search<F, K, V>(query: &str, filters: F, page: Option<u32>) -> String
where
    F: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Borrow<ParamValue>,
{
    CacheKeyBuilder::new()
        .add_search(query)
        .add_filters(filters)
        .add_pagination(page, None)
        .build()
}

pub fn for_report<P, K, V>(
    report_type: &str,
    start_date: Option<&str>,
    end_date: Option<&str>,
    params: P,
) -> String
where
    P: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Borrow<ParamValue>,
{
    CacheKeyBuilder::new()
        .add_custom("report", report_type)
        .add_custom("startDate", start_date)
        .add_custom("endDate", end_date)
        .add_params(params)
        .build()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn none() -> BTreeMap<String, ParamValue> {
        BTreeMap::new()
    }

    #[test]
    fn api_call_puts_params_before_headers() {
        let mut params = BTreeMap::new();
        params.insert("department".to_string(), ParamValue::from("IT"));
        let key = for_api_call("/api/employees", &params, [("Accept", "application/json")]);
        assert_eq!(
            key,
            r#"/api/employees::{"department":"IT"}::{"Accept":"application/json"}"#
        );
    }

    #[test]
    fn table_key_lists_every_dimension() {
        let mut filters = BTreeMap::new();
        filters.insert("status".to_string(), ParamValue::from("active"));
        let key = for_table_data(
            "/api/employees",
            1,
            10,
            "name",
            Some(SortDirection::Asc),
            "john",
            &filters,
        );
        assert_eq!(
            key,
            r#"/api/employees::page_1::size_10::sort_name_asc::search_john::filters_{"status":"active"}"#
        );
    }

    #[test]
    fn resource_user_search_and_report_keys() {
        let mut include = BTreeMap::new();
        include.insert("include".to_string(), ParamValue::from("department"));
        assert_eq!(
            for_resource("employee", 123, &include),
            r#"resource_employee_123::{"include":"department"}"#
        );
        assert_eq!(
            for_user_data(456, "preferences", none()),
            "user_456::dataType_preferences"
        );
        assert_eq!(for_search("Ali", none(), Some(2)), "search_ali::page_2");
        assert_eq!(
            for_report("monthly", Some("2024-01-01"), None, none()),
            "report_monthly::startDate_2024-01-01"
        );
    }
}
