//! Hand-written collaborators shared by the integration tests

#![allow(dead_code)]

use ghrelay_core::{
    CliCommandRunner, CliHandler, CliOutput, EnvelopeError, GraphqlResponse, OperationCard,
    ResultEnvelope, ResultMeta, Route, Transport,
};
use regex::Regex;
use serde_json::{json, Map, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Responder = Box<dyn Fn(&str, &Value) -> ghrelay_core::Result<GraphqlResponse> + Send + Sync>;

/// Transport answering through a closure and recording every call
pub struct ScriptedTransport {
    responder: Responder,
    calls: Mutex<Vec<(String, Value)>>,
}

impl ScriptedTransport {
    pub fn new(
        responder: impl Fn(&str, &Value) -> ghrelay_core::Result<GraphqlResponse> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            responder: Box::new(responder),
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Answers every alias with `{"alias": <alias>}`
    pub fn echo() -> Arc<Self> {
        Self::new(|query, _| {
            let data: Map<String, Value> = aliases_in(query)
                .into_iter()
                .map(|alias| (alias.clone(), json!({ "alias": alias })))
                .collect();
            Ok(GraphqlResponse::data(Value::Object(data)))
        })
    }

    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, query: &str, variables: Value) -> ghrelay_core::Result<GraphqlResponse> {
        let reply = (self.responder)(query, &variables);
        self.calls.lock().unwrap().push((query.to_string(), variables));
        reply
    }
}

/// Aliased root fields of a merged batch document
pub fn aliases_in(query: &str) -> Vec<String> {
    let re = Regex::new(r"(?m)^  (step\d+): ").unwrap();
    re.captures_iter(query).map(|c| c[1].to_string()).collect()
}

/// Runner answering `--version` and `auth status` probes, counting calls
pub struct ProbeRunner {
    pub version_exit: i32,
    pub auth_exit: i32,
    pub fail_version: bool,
    pub delay: Duration,
    version_calls: AtomicUsize,
    auth_calls: AtomicUsize,
}

impl ProbeRunner {
    pub fn new(version_exit: i32, auth_exit: i32) -> Self {
        Self {
            version_exit,
            auth_exit,
            fail_version: false,
            delay: Duration::ZERO,
            version_calls: AtomicUsize::new(0),
            auth_calls: AtomicUsize::new(0),
        }
    }

    pub fn ready() -> Arc<Self> {
        Arc::new(Self::new(0, 0))
    }

    pub fn version_calls(&self) -> usize {
        self.version_calls.load(Ordering::SeqCst)
    }

    pub fn auth_calls(&self) -> usize {
        self.auth_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl CliCommandRunner for ProbeRunner {
    async fn run(&self, _command: &str, args: &[String], _timeout_ms: u64) -> ghrelay_core::Result<CliOutput> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let exit_code = match args.first().map(String::as_str) {
            Some("--version") => {
                self.version_calls.fetch_add(1, Ordering::SeqCst);
                if self.fail_version {
                    return Err(ghrelay_core::Error::Command("permission denied".to_string()));
                }
                self.version_exit
            }
            Some("auth") => {
                self.auth_calls.fetch_add(1, Ordering::SeqCst);
                self.auth_exit
            }
            _ => 0,
        };
        Ok(CliOutput {
            stdout: String::new(),
            stderr: String::new(),
            exit_code,
        })
    }
}

/// Handler returning a fixed outcome, counting invocations
pub struct StaticHandler {
    outcome: Result<Value, EnvelopeError>,
    delay: Duration,
    calls: AtomicUsize,
}

impl StaticHandler {
    pub fn ok(data: Value) -> Arc<Self> {
        Arc::new(Self {
            outcome: Ok(data),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing(error: EnvelopeError) -> Arc<Self> {
        Arc::new(Self {
            outcome: Err(error),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            outcome: Ok(json!({})),
            delay,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl CliHandler for StaticHandler {
    async fn execute(
        &self,
        _runner: &dyn CliCommandRunner,
        _params: &Map<String, Value>,
        card: &OperationCard,
    ) -> ResultEnvelope {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let meta = ResultMeta::new(card.task.as_str()).with_route(Route::Cli);
        match &self.outcome {
            Ok(data) => ResultEnvelope::success(data.clone(), meta),
            Err(error) => ResultEnvelope::failure(error.clone(), meta),
        }
    }
}

pub fn repo_input() -> Value {
    json!({"owner": "octo", "name": "hello"})
}
