use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use pretty_assertions::assert_eq;
use serde_json::json;

use windplay::app::coordinator::{ApplyOutcome, GenerationOutcome};
use windplay::app::dispatch::RequestDispatcher;
use windplay::app::playground::{DEFAULT_WINDFILE, Playground};
use windplay::domain::model::GenerationTarget;
use windplay::infra::config::{DeploymentMode, Endpoint};
use windplay::infra::generation::{GenerationError, GenerationService, HttpGenerationClient};

#[derive(Debug, Clone, PartialEq, Eq)]
struct Received {
    target: String,
    accept: Option<String>,
    content_type: Option<String>,
    body: String,
}

type Log = Arc<Mutex<Vec<Received>>>;

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned)
}

async fn echo(
    State(log): State<Log>,
    Path(target): Path<String>,
    headers: HeaderMap,
    body: String,
) -> Json<serde_json::Value> {
    log.lock().unwrap().push(Received {
        target: target.clone(),
        accept: header(&headers, "accept"),
        content_type: header(&headers, "content-type"),
        body: body.clone(),
    });
    Json(json!({ "result": format!("# {target}\n{}", body.lines().count()), "key": "k" }))
}

async fn spawn_service() -> (SocketAddr, Log) {
    let log: Log = Arc::default();
    let app = Router::new()
        .route("/generate/:target/yaml", post(echo))
        .route("/empty/generate/:target/yaml", post(|| async { "" }))
        .route(
            "/html/generate/:target/yaml",
            post(|| async { (StatusCode::BAD_GATEWAY, "<html>502 Bad Gateway</html>") }),
        )
        .route(
            "/blank/generate/:target/yaml",
            post(|| async { Json(json!({ "result": "" })) }),
        )
        .with_state(Arc::clone(&log));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("listener address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("test server");
    });
    (addr, log)
}

fn client(base: String) -> HttpGenerationClient {
    HttpGenerationClient::new(
        &Endpoint::new(DeploymentMode::Development, base),
        Duration::from_secs(5),
    )
    .expect("client builds")
}

#[tokio::test]
async fn posts_raw_windfile_with_yaml_headers() {
    let (addr, log) = spawn_service().await;
    let client = client(format!("http://{addr}/"));

    let result = client
        .generate(GenerationTarget::Jenkins, DEFAULT_WINDFILE)
        .await
        .expect("request succeeds");

    let lines = DEFAULT_WINDFILE.lines().count();
    assert_eq!(result, Some(format!("# jenkins\n{lines}")));
    let received = log.lock().unwrap().clone();
    assert_eq!(
        received,
        vec![Received {
            target: "jenkins".into(),
            accept: Some("application/json".into()),
            content_type: Some("application/x-yaml".into()),
            body: DEFAULT_WINDFILE.to_string(),
        }]
    );
}

#[tokio::test]
async fn bodies_without_result_are_empty() {
    let (addr, _log) = spawn_service().await;
    for prefix in ["empty", "html", "blank"] {
        let client = client(format!("http://{addr}/{prefix}"));
        let result = client
            .generate(GenerationTarget::Cli, "api: v0.0.1")
            .await
            .expect("service answered");
        assert_eq!(result, None, "prefix {prefix}");
    }
}

#[tokio::test]
async fn refused_connection_is_a_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = client(format!("http://{addr}"))
        .generate(GenerationTarget::Bamboo, "api: v0.0.1")
        .await
        .expect_err("nothing listens");
    match err {
        GenerationError::Transport { url, .. } => {
            assert_eq!(url, format!("http://{addr}/generate/bamboo/yaml"));
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test]
async fn playground_round_trip_through_the_dispatcher() {
    let (addr, log) = spawn_service().await;
    let (dispatcher, mut responses) =
        RequestDispatcher::new(Arc::new(client(format!("http://{addr}"))));

    let mut playground = Playground::new(DEFAULT_WINDFILE, GenerationTarget::Cli);
    let request = playground.validate(Vec::new()).expect("valid input dispatches");
    dispatcher.dispatch(request);
    let response = responses.recv().await.expect("response delivered");
    assert!(matches!(response.outcome, GenerationOutcome::Generated(_)));
    assert_eq!(playground.apply(response), ApplyOutcome::Applied);

    let tabs = playground.tabs();
    assert!(tabs.iter().all(|tab| !tab.placeholder));
    assert!(tabs[0].body.starts_with("# cli"));
    assert_eq!(log.lock().unwrap().len(), 1);

    let request = playground.select_tab(1).expect("tab switch dispatches");
    dispatcher.dispatch(request);
    let response = responses.recv().await.expect("response delivered");
    assert_eq!(playground.apply(response), ApplyOutcome::Applied);
    assert_eq!(playground.target(), GenerationTarget::Bamboo);
    assert!(playground.result().unwrap().starts_with("# bamboo"));
    assert_eq!(log.lock().unwrap()[1].target, "bamboo");
}
