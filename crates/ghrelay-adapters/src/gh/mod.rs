//! gh - CLI handlers driving the `gh` binary
//!
//! Each built-in task maps to one [`GhCommand`]. The handler renders the
//! arguments from the step params, runs the binary through the injected
//! runner and turns the output into an envelope.

mod template;

pub use template::{Arg, GhCommand, OutputMode, ValueFormat};

use async_trait::async_trait;
use ghrelay_core::{
    CliCommandRunner, CliHandler, CliHandlerRegistry, EnvelopeError, ErrorCode, OperationCard,
    ResultEnvelope, ResultMeta, Route, TaskId,
};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Default timeout handed to the runner
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(10);

/// Handler for one task
#[derive(Debug, Clone)]
pub struct GhHandler {
    binary: String,
    command: GhCommand,
    timeout: Duration,
}

impl GhHandler {
    /// Create a handler
    #[must_use]
    pub fn new(binary: impl Into<String>, command: GhCommand) -> Self {
        Self {
            binary: binary.into(),
            command,
            timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }

    /// Set the command timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Command template
    #[must_use]
    pub fn command(&self) -> &GhCommand {
        &self.command
    }
}

#[async_trait]
impl CliHandler for GhHandler {
    async fn execute(
        &self,
        runner: &dyn CliCommandRunner,
        params: &Map<String, Value>,
        card: &OperationCard,
    ) -> ResultEnvelope {
        let meta = ResultMeta::new(card.task.as_str()).with_route(Route::Cli);

        let args = match self.command.render(params) {
            Ok(args) => args,
            Err(e) => {
                return ResultEnvelope::failure(
                    EnvelopeError::from(ghrelay_core::Error::from(e)),
                    meta,
                )
            }
        };

        debug!(task = %card.task, binary = %self.binary, args = ?args, "Running gh");
        let output = match runner
            .run(&self.binary, &args, self.timeout.as_millis() as u64)
            .await
        {
            Ok(output) => output,
            Err(e) => return ResultEnvelope::failure(EnvelopeError::from(&e), meta),
        };

        if !output.success() {
            let stderr = output.stderr.trim();
            let message = if stderr.is_empty() {
                format!("{} exited with status {}", self.binary, output.exit_code)
            } else {
                stderr.to_string()
            };
            warn!(task = %card.task, exit_code = output.exit_code, error = %message, "gh command failed");
            return ResultEnvelope::failure(
                EnvelopeError::classified(message)
                    .with_details(serde_json::json!({ "exit_code": output.exit_code })),
                meta,
            );
        }

        match self.command.parse_output(&output.stdout) {
            Ok(data) => ResultEnvelope::success(data, meta),
            Err(message) => {
                ResultEnvelope::failure(EnvelopeError::new(ErrorCode::Server, message), meta)
            }
        }
    }
}

fn repo_flag() -> [Arg; 2] {
    [Arg::text("--repo"), Arg::text("{owner}/{name}")]
}

fn command_for(task: TaskId) -> Option<GhCommand> {
    let [repo, slug] = repo_flag();
    let command = match task {
        TaskId::RepoView => GhCommand::new(
            vec![Arg::text("repo"), Arg::text("view"), Arg::text("{owner}/{name}")],
            OutputMode::Json(
                "id,name,nameWithOwner,description,url,isPrivate,isArchived,stargazerCount,forkCount,defaultBranchRef"
                    .to_string(),
            ),
        ),
        TaskId::IssueView => GhCommand::new(
            vec![Arg::text("issue"), Arg::text("view"), Arg::text("{number}"), repo, slug],
            OutputMode::Json("id,number,title,state,body,url,author,labels".to_string()),
        ),
        TaskId::IssueList => GhCommand::new(
            vec![
                Arg::text("issue"),
                Arg::text("list"),
                repo,
                slug,
                Arg::flag("--limit", "first"),
                Arg::state_flag("states"),
            ],
            OutputMode::Json("number,title,state,url".to_string()),
        ),
        TaskId::PrView => GhCommand::new(
            vec![Arg::text("pr"), Arg::text("view"), Arg::text("{number}"), repo, slug],
            OutputMode::Json(
                "id,number,title,state,isDraft,url,headRefName,baseRefName,mergeable".to_string(),
            ),
        ),
        TaskId::PrList => GhCommand::new(
            vec![
                Arg::text("pr"),
                Arg::text("list"),
                repo,
                slug,
                Arg::flag("--limit", "first"),
                Arg::state_flag("states"),
            ],
            OutputMode::Json("number,title,state,url,headRefName".to_string()),
        ),
        TaskId::IssueCreate => GhCommand::new(
            vec![
                Arg::text("issue"),
                Arg::text("create"),
                repo,
                slug,
                Arg::text("--title"),
                Arg::text("{title}"),
                Arg::flag_or("--body", "body", ""),
            ],
            OutputMode::Url,
        ),
        TaskId::IssueClose => GhCommand::new(
            vec![Arg::text("issue"), Arg::text("close"), Arg::text("{number}"), repo, slug],
            OutputMode::Ack,
        ),
        TaskId::IssueCommentCreate => GhCommand::new(
            vec![
                Arg::text("issue"),
                Arg::text("comment"),
                Arg::text("{number}"),
                repo,
                slug,
                Arg::text("--body"),
                Arg::text("{body}"),
            ],
            OutputMode::Url,
        ),
        TaskId::IssueCommentsList => return None,
    };
    Some(command)
}

/// Handlers for every built-in task with a CLI route
#[must_use]
pub fn builtin_handlers(binary: &str, timeout: Duration) -> CliHandlerRegistry {
    let mut registry = CliHandlerRegistry::new();
    for task in TaskId::ALL {
        if let Some(command) = command_for(task) {
            let handler = GhHandler::new(binary, command).with_timeout(timeout);
            registry.register(task, Arc::new(handler));
        }
    }
    registry
}
