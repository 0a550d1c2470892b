use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
};
use chrono::Utc;
use dwlr_ingest::{normalize, SimulatedSource, SourceFormat};
use dwlr_server::{apply_snapshot, build_app, set_ready, AppSettings};
use tower::ServiceExt;

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn health_ready_metrics_endpoints() {
    let (app, state) = build_app(AppSettings::default()).unwrap();

    // /healthz returns 200 and increments a counter
    let res = app.clone().oneshot(get("/healthz")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    // /readyz initially 503
    let res = app.clone().oneshot(get("/readyz")).await.unwrap();
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);

    // Set ready
    set_ready(&state, true);

    // /readyz now 200
    let res = app.clone().oneshot(get("/readyz")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    // /metrics returns prometheus text and contains our counter
    let res = app.clone().oneshot(get("/metrics")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let ct = res.headers().get("content-type").unwrap().to_str().unwrap();
    assert!(ct.starts_with("text/plain"));
    let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("dwlr_requests_total"));
}

#[tokio::test]
async fn first_snapshot_makes_service_ready() {
    let (app, state) = build_app(AppSettings::default()).unwrap();

    let res = app.clone().oneshot(get("/readyz")).await.unwrap();
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);

    let records = SimulatedSource::new(2, 3).generate(Utc::now());
    assert!(apply_snapshot(&state, 1, normalize(&records, SourceFormat::Dwlr)).await);

    let res = app.clone().oneshot(get("/readyz")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    // An older response arriving late is discarded and counted
    assert!(!apply_snapshot(&state, 1, normalize(&records, SourceFormat::Dwlr)).await);
    assert_eq!(state.sequence().await, Some(1));

    let res = app.oneshot(get("/metrics")).await.unwrap();
    let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("dwlr_polls_applied_total"));
    assert!(text.contains("dwlr_stale_responses_total"));
}
