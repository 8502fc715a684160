use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use httpmock::MockServer;
use metrics_util::debugging::DebuggingRecorder;
use serde_json::{Value, json};
use sijil::cache::{
    CacheConfig, METRIC_CACHE_EXPIRED_TOTAL, METRIC_CACHE_HIT_TOTAL,
    METRIC_CACHE_INVALIDATE_TOTAL, METRIC_CACHE_MISS_TOTAL,
};
use sijil::config::{ApiSettings, Settings};
use sijil::infra::http::{
    ApiClient, HttpTransport, METRIC_HTTP_ERROR_TOTAL, METRIC_HTTP_REQUEST_MS,
};
use url::Url;

fn client_for(base: &str, cache: CacheConfig) -> ApiClient {
    let settings = Settings {
        api: ApiSettings {
            base_url: Some(Url::parse(base).expect("base url")),
            timeout: Duration::from_secs(5),
        },
        ..Settings::default()
    };
    let transport = HttpTransport::new(&settings.api).expect("transport");
    ApiClient::new(Arc::new(transport), cache)
}

#[tokio::test]
async fn cache_and_http_paths_emit_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");
    sijil::infra::telemetry::describe_metrics();

    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method("GET").path("/api/employees");
            then.status(200).json_body(json!([]));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method("GET").path("/api/report");
            then.status(200).body("<html>maintenance</html>");
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method("POST").path("/api/employees");
            then.status(201).json_body(json!({"id": 1}));
        })
        .await;

    let cache = CacheConfig {
        ttl_ms: 20,
        ..CacheConfig::default()
    };
    let client = client_for(&server.base_url(), cache);

    // miss, hit, invalidate
    let _: Value = client.get("/api/employees", None, None).await.expect("miss");
    let _: Value = client.get("/api/employees", None, None).await.expect("hit");
    let _: Value = client
        .post("/api/employees", &json!({"name": "Ali"}), None, None)
        .await
        .expect("post");

    // expired
    let _: Value = client.get("/api/employees", None, None).await.expect("refill");
    tokio::time::sleep(Duration::from_millis(50)).await;
    client.force_cleanup_expired_cache();

    // undecodable body
    let _ = client.get::<Value>("/api/report", None, None).await;

    // connectivity failure
    let offline = client_for("http://127.0.0.1:1", CacheConfig::default());
    let _ = offline.get::<Value>("/api/employees", None, None).await;

    let snapshot = snapshotter.snapshot().into_vec();
    let names: HashSet<String> = snapshot
        .iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();

    let expected = [
        METRIC_CACHE_HIT_TOTAL,
        METRIC_CACHE_MISS_TOTAL,
        METRIC_CACHE_INVALIDATE_TOTAL,
        METRIC_CACHE_EXPIRED_TOTAL,
        METRIC_HTTP_REQUEST_MS,
        METRIC_HTTP_ERROR_TOTAL,
    ];
    for metric in expected {
        assert!(names.contains(metric), "missing metric: {metric}");
    }

    for kind in ["connectivity", "decode"] {
        let labelled = snapshot.iter().any(|(composite_key, _, _, _)| {
            let key = composite_key.key();
            key.name() == METRIC_HTTP_ERROR_TOTAL
                && key
                    .labels()
                    .any(|label| label.key() == "kind" && label.value() == kind)
        });
        assert!(labelled, "missing http error kind: {kind}");
    }
}
