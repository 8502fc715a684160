//! The reqwest transport against a real HTTP server.

use std::sync::Arc;
use std::time::Duration;

use httpmock::MockServer;
use serde_json::{Value, json};
use sijil::api_types::TableQueryParams;
use sijil::application::table::TableService;
use sijil::config::{ApiSettings, Settings, TableSettings};
use sijil::infra::http::{ApiClient, ApiError, FormData, QueryParams};
use sijil::notify::ToastCenter;
use url::Url;

fn settings(base: &str) -> Settings {
    Settings {
        api: ApiSettings {
            base_url: Some(Url::parse(base).expect("base url")),
            timeout: Duration::from_secs(5),
        },
        ..Settings::default()
    }
}

fn client(server: &MockServer) -> ApiClient {
    ApiClient::from_settings(&settings(&server.base_url())).expect("client")
}

#[tokio::test]
async fn cached_get_reaches_the_server_once() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method("GET")
                .path("/api/employees")
                .query_param("department", "IT");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!([{"id": 1, "name": "Ali"}]));
        })
        .await;

    let client = client(&server);
    let params = QueryParams::new().with("department", "IT");
    for _ in 0..3 {
        let body: Value = client
            .get("/api/employees", None, Some(&params))
            .await
            .expect("employees");
        assert_eq!(body[0]["name"], "Ali");
    }

    mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn writes_send_json_and_invalidate_reads() {
    let server = MockServer::start_async().await;
    let list = server
        .mock_async(|when, then| {
            when.method("GET").path("/api/departments");
            then.status(200).json_body(json!([]));
        })
        .await;
    let create = server
        .mock_async(|when, then| {
            when.method("POST")
                .path("/api/departments")
                .json_body(json!({"name": "Finance"}));
            then.status(201).json_body(json!({"id": 9, "name": "Finance"}));
        })
        .await;
    let remove = server
        .mock_async(|when, then| {
            when.method("DELETE").path("/api/departments/9");
            then.status(204);
        })
        .await;

    let client = client(&server);
    let _: Value = client.get("/api/departments", None, None).await.expect("list");
    let created: Value = client
        .post("/api/departments", &json!({"name": "Finance"}), None, None)
        .await
        .expect("create");
    assert_eq!(created["id"], 9);
    let _: Value = client.get("/api/departments", None, None).await.expect("list");

    let deleted: Value = client
        .delete("/api/departments/9", None, None)
        .await
        .expect("delete");
    assert_eq!(deleted, Value::Null);

    list.assert_calls_async(2).await;
    create.assert_async().await;
    remove.assert_async().await;
}

#[tokio::test]
async fn form_uploads_are_sent_as_multipart() {
    let server = MockServer::start_async().await;
    let upload = server
        .mock_async(|when, then| {
            when.method("POST")
                .path("/api/uploads")
                .header_includes("content-type", "multipart/form-data")
                .body_includes("name=\"title\"")
                .body_includes("Quarterly report")
                .body_includes("filename=\"report.csv\"")
                .body_includes("id,name");
            then.status(201).json_body(json!({"id": 5}));
        })
        .await;

    let client = client(&server);
    let form = FormData::new().text("title", "Quarterly report").file(
        "file",
        "report.csv",
        Some("text/csv"),
        &b"id,name\n1,Ali\n"[..],
    );
    let created: Value = client
        .post_form_data("/api/uploads", form, None, None)
        .await
        .expect("upload");

    assert_eq!(created["id"], 5);
    upload.assert_async().await;
}

#[tokio::test]
async fn validation_errors_become_messages_and_toasts() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method("PUT").path("/api/employees/4");
            then.status(400).json_body(json!({
                "message": "Validation failed",
                "arMessage": "فشل التحقق",
                "details": [
                    {"field": "email", "message": "البريد الإلكتروني غير صالح"},
                    {"field": "phone", "message": "رقم الهاتف مطلوب"}
                ]
            }));
        })
        .await;

    let toasts = Arc::new(ToastCenter::new());
    let client = client(&server).with_toasts(Arc::clone(&toasts));
    let err = client
        .put::<Value, _>("/api/employees/4", &json!({"email": "x"}), None, None)
        .await
        .expect_err("validation failure");

    assert_eq!(err.status_code(), 400);
    let expected = "البريد الإلكتروني غير صالح\nرقم الهاتف مطلوب";
    assert_eq!(err.user_message(), expected);
    let active = toasts.active();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].message, expected);
}

#[tokio::test]
async fn excel_export_asks_for_a_spreadsheet() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method("GET")
                .path("/api/reports/attendance")
                .query_param("export", "excel")
                .query_param("page", "1")
                .query_param("search", "ali")
                .header("accept", "application/vnd.ms-excel");
            then.status(200)
                .header("content-type", "application/vnd.ms-excel")
                .body("XLS");
        })
        .await;

    let client = client(&server);
    let service = TableService::new(client, TableSettings::default());
    let params = TableQueryParams {
        search: "ali".into(),
        ..TableQueryParams::default()
    };
    for _ in 0..2 {
        let bytes = service
            .export_excel("/api/reports/attendance", &params)
            .await
            .expect("export");
        assert_eq!(&bytes[..], b"XLS");
    }

    mock.assert_calls_async(2).await;
}

#[tokio::test]
async fn unreachable_servers_report_connectivity() {
    let client = ApiClient::from_settings(&settings("http://127.0.0.1:1")).expect("client");
    let err = client
        .get::<Value>("/api/employees", None, None)
        .await
        .expect_err("nothing listens on port 1");

    assert!(matches!(err, ApiError::Connectivity { .. }));
    assert_eq!(err.status_code(), 0);
    assert_eq!(err.table_message(), "لا يمكن الاتصال بالخادم");
    assert!(client.cache_stats().entries.is_empty());
}
