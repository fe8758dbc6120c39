//! End-to-end tests wiring the engine to the real process runner and `gh`
//! handlers, with a shell script standing in for `gh`.

#![cfg(unix)]

use async_trait::async_trait;
use ghrelay_adapters::{builtin_handlers, ProcessRunner, DEFAULT_COMMAND_TIMEOUT};
use ghrelay_core::{
    ChainStatus, Engine, EngineConfig, ErrorCode, ExecutionDeps, GraphqlError, GraphqlResponse,
    Route, TaskRequest, Transport,
};
use serde_json::{json, Value};
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, OnceLock};

const FAKE_GH: &str = r#"#!/bin/sh
case "$1" in
  --version)
    echo "gh version 2.60.0 (2024-10-01)"
    exit 0
    ;;
  auth)
    if [ "$FAKE_GH_AUTH" = "ok" ]; then exit 0; fi
    echo "You are not logged into any GitHub hosts. To log in, run: gh auth login" >&2
    exit 1
    ;;
  repo)
    echo '{"name":"hello","stargazerCount":5}'
    exit 0
    ;;
  issue)
    if [ "$2" = "create" ]; then
      echo "https://github.com/octo/hello/issues/9"
      exit 0
    fi
    echo "GraphQL: Could not resolve to an issue or pull request with the number of 99. (repository.issue)" >&2
    exit 1
    ;;
esac
echo "unknown command: $1" >&2
exit 1
"#;

/// The script is written once; every test only executes it
fn fake_gh() -> &'static PathBuf {
    static PATH: OnceLock<PathBuf> = OnceLock::new();
    PATH.get_or_init(|| {
        let path = std::env::temp_dir().join(format!("ghrelay-fake-gh-{}", std::process::id()));
        std::fs::write(&path, FAKE_GH).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    })
}

/// Transport returning a fixed response and recording queries
struct FixedTransport {
    response: GraphqlResponse,
    queries: Mutex<Vec<String>>,
}

impl FixedTransport {
    fn new(response: GraphqlResponse) -> Arc<Self> {
        Arc::new(Self {
            response,
            queries: Mutex::new(Vec::new()),
        })
    }

    fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for FixedTransport {
    async fn execute(&self, query: &str, _variables: Value) -> ghrelay_core::Result<GraphqlResponse> {
        self.queries.lock().unwrap().push(query.to_string());
        Ok(self.response.clone())
    }
}

fn setup(auth: &str, transport: Arc<FixedTransport>) -> (Engine, ExecutionDeps) {
    let binary = fake_gh().to_string_lossy().to_string();
    let engine = Engine::builtin(
        builtin_handlers(&binary, DEFAULT_COMMAND_TIMEOUT),
        EngineConfig::new(binary),
    );
    let runner = ProcessRunner::new().with_env("FAKE_GH_AUTH", auth);
    let deps = ExecutionDeps::new()
        .with_transport(transport)
        .with_token(true)
        .with_cli_runner(Arc::new(runner));
    (engine, deps)
}

fn repo() -> Value {
    json!({"owner": "octo", "name": "hello"})
}

#[tokio::test]
async fn test_authenticated_cli_serves_repo_view() {
    let transport = FixedTransport::new(GraphqlResponse::default());
    let (engine, deps) = setup("ok", transport.clone());

    let envelope = engine
        .execute_task(TaskRequest::new("repo.view", repo()), &deps)
        .await;

    assert!(envelope.ok, "{:?}", envelope.error);
    assert_eq!(envelope.meta.route_used, Some(Route::Cli));
    assert_eq!(envelope.data.unwrap()["stargazerCount"], json!(5));
    assert!(transport.queries().is_empty());
}

#[tokio::test]
async fn test_unauthenticated_cli_routes_to_graphql() {
    let transport = FixedTransport::new(GraphqlResponse::data(
        json!({"step0": {"name": "hello", "stargazerCount": 6}}),
    ));
    let (engine, deps) = setup("no", transport.clone());

    let envelope = engine
        .execute_task(TaskRequest::new("repo.view", repo()), &deps)
        .await;

    assert!(envelope.ok, "{:?}", envelope.error);
    assert_eq!(envelope.meta.route_used, Some(Route::Graphql));
    assert_eq!(envelope.data.unwrap()["stargazerCount"], json!(6));
    assert_eq!(transport.queries().len(), 1);
}

#[tokio::test]
async fn test_chain_with_cli_failure_and_graphql_fallback() {
    let transport = FixedTransport::new(GraphqlResponse {
        data: Some(json!({"step1": null})),
        errors: vec![GraphqlError::new(
            "Could not resolve to an Issue with the number of 99.",
        )
        .at("step1")
        .with_type("NOT_FOUND")],
    });
    let (engine, deps) = setup("ok", transport.clone());

    let mut issue = repo();
    issue["number"] = json!(99);
    let result = engine
        .execute_tasks(
            vec![
                TaskRequest::new("repo.view", repo()),
                TaskRequest::new("issue.view", issue),
            ],
            &deps,
        )
        .await;

    assert_eq!(result.status, ChainStatus::Partial);
    assert_eq!(result.meta.route_used, Route::Graphql);
    assert_eq!(result.results[0].meta.route_used, Some(Route::Cli));

    let failed = &result.results[1];
    assert_eq!(failed.error_code(), Some(ErrorCode::NotFound));
    assert_eq!(failed.meta.route_used, Some(Route::Graphql));
    assert_eq!(failed.meta.attempts, vec![Route::Cli, Route::Graphql]);
    assert_eq!(transport.queries().len(), 1);
    assert!(transport.queries()[0].contains("step1: repository("));
}

#[tokio::test]
async fn test_issue_create_over_cli_when_no_token() {
    let transport = FixedTransport::new(GraphqlResponse::default());
    let (engine, deps) = setup("ok", transport.clone());
    let deps = deps.with_token(false);

    let mut input = repo();
    input["title"] = json!("Broken build");
    let envelope = engine
        .execute_task(TaskRequest::new("issue.create", input), &deps)
        .await;

    assert!(envelope.ok, "{:?}", envelope.error);
    assert_eq!(envelope.meta.route_used, Some(Route::Cli));
    assert_eq!(
        envelope.data,
        Some(json!({"url": "https://github.com/octo/hello/issues/9"}))
    );
    assert!(transport.queries().is_empty());
}
