//! Registry - Capability registration and lookup
//!
//! Each supported task has one [`OperationCard`] describing which routes can
//! structurally serve it, in which order they are preferred, the input
//! contract, and (for mutations) how dependent identifiers are resolved.
//! Whether a route is usable at runtime is decided by the classifier.

mod cards;
pub mod documents;

use crate::envelope::Route;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

/// Closed set of supported tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TaskId {
    /// View repository metadata
    #[serde(rename = "repo.view")]
    RepoView,
    /// View one issue
    #[serde(rename = "issue.view")]
    IssueView,
    /// List issues
    #[serde(rename = "issue.list")]
    IssueList,
    /// List comments on an issue
    #[serde(rename = "issue.comments.list")]
    IssueCommentsList,
    /// View one pull request
    #[serde(rename = "pr.view")]
    PrView,
    /// List pull requests
    #[serde(rename = "pr.list")]
    PrList,
    /// Create an issue
    #[serde(rename = "issue.create")]
    IssueCreate,
    /// Close an issue
    #[serde(rename = "issue.close")]
    IssueClose,
    /// Comment on an issue
    #[serde(rename = "issue.comment.create")]
    IssueCommentCreate,
}

impl TaskId {
    /// Every task, in declaration order
    pub const ALL: [TaskId; 9] = [
        Self::RepoView,
        Self::IssueView,
        Self::IssueList,
        Self::IssueCommentsList,
        Self::PrView,
        Self::PrList,
        Self::IssueCreate,
        Self::IssueClose,
        Self::IssueCommentCreate,
    ];

    /// Returns the task name
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RepoView => "repo.view",
            Self::IssueView => "issue.view",
            Self::IssueList => "issue.list",
            Self::IssueCommentsList => "issue.comments.list",
            Self::PrView => "pr.view",
            Self::PrList => "pr.list",
            Self::IssueCreate => "issue.create",
            Self::IssueClose => "issue.close",
            Self::IssueCommentCreate => "issue.comment.create",
        }
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TaskId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("Unsupported task: {}", s))
    }
}

/// Whether a structured document reads or writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    /// Read-only query
    Query,
    /// Mutation
    Mutation,
}

/// Declared value type of an input field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    /// JSON string
    String,
    /// JSON integer
    Integer,
    /// JSON boolean
    Boolean,
    /// JSON array of strings
    StringList,
}

impl InputKind {
    /// Returns the string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::StringList => "string list",
        }
    }
}

/// One field of a card's input contract
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputField {
    /// Field name
    pub name: String,
    /// Expected kind
    pub kind: InputKind,
    /// Whether the field must be present
    pub required: bool,
}

impl InputField {
    /// Required field
    #[must_use]
    pub fn required(name: impl Into<String>, kind: InputKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: true,
        }
    }

    /// Optional field
    #[must_use]
    pub fn optional(name: impl Into<String>, kind: InputKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
        }
    }
}

/// Route preference order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Routing {
    /// First choice
    pub preferred: Route,
    /// Ordered fallbacks
    #[serde(default)]
    pub fallbacks: Vec<Route>,
}

impl Routing {
    /// Preferred route followed by fallbacks, without duplicates
    pub fn order(&self) -> impl Iterator<Item = Route> + '_ {
        std::iter::once(self.preferred).chain(
            self.fallbacks
                .iter()
                .copied()
                .enumerate()
                .filter(move |(i, r)| {
                    *r != self.preferred && !self.fallbacks[..*i].contains(r)
                })
                .map(|(_, r)| r),
        )
    }
}

/// Maps a request input key onto a lookup variable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VarBinding {
    /// Key in the request input
    pub input_key: String,
    /// Variable name in the lookup document
    pub variable: String,
}

/// Pre-mutation lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupSpec {
    /// Operation name of the lookup document
    pub operation_name: String,
    /// Lookup query document
    pub document: String,
    /// Input-to-variable mapping; every bound key is required
    pub vars: Vec<VarBinding>,
}

/// Where a looked-up value goes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InjectTarget {
    /// Dotted path in the lookup result
    pub source: String,
    /// Mutation variable receiving the value
    pub target: String,
}

/// Resolution of human-facing identifiers into node ids
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionSpec {
    /// Lookup to run
    pub lookup: LookupSpec,
    /// Values to inject
    pub inject: Vec<InjectTarget>,
}

impl ResolutionSpec {
    /// Create a resolution from a lookup document
    #[must_use]
    pub fn new(operation_name: impl Into<String>, document: impl Into<String>) -> Self {
        Self {
            lookup: LookupSpec {
                operation_name: operation_name.into(),
                document: document.into(),
                vars: Vec::new(),
            },
            inject: Vec::new(),
        }
    }

    /// Bind an input key to a lookup variable
    #[must_use]
    pub fn bind(mut self, input_key: impl Into<String>, variable: impl Into<String>) -> Self {
        self.lookup.vars.push(VarBinding {
            input_key: input_key.into(),
            variable: variable.into(),
        });
        self
    }

    /// Inject a lookup result path into a mutation variable
    #[must_use]
    pub fn inject(mut self, source: impl Into<String>, target: impl Into<String>) -> Self {
        self.inject.push(InjectTarget {
            source: source.into(),
            target: target.into(),
        });
        self
    }
}

/// Structured-route configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphqlConfig {
    /// Operation name in the document
    pub operation_name: String,
    /// Full operation document with a single root field
    pub document: String,
    /// Query or mutation
    pub kind: OperationKind,
    /// Pre-mutation lookup
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<ResolutionSpec>,
}

impl GraphqlConfig {
    /// Query configuration
    #[must_use]
    pub fn query(operation_name: impl Into<String>, document: impl Into<String>) -> Self {
        Self {
            operation_name: operation_name.into(),
            document: document.into(),
            kind: OperationKind::Query,
            resolution: None,
        }
    }

    /// Mutation configuration
    #[must_use]
    pub fn mutation(operation_name: impl Into<String>, document: impl Into<String>) -> Self {
        Self {
            operation_name: operation_name.into(),
            document: document.into(),
            kind: OperationKind::Mutation,
            resolution: None,
        }
    }

    /// Attach a resolution spec
    #[must_use]
    pub fn with_resolution(mut self, resolution: ResolutionSpec) -> Self {
        self.resolution = Some(resolution);
        self
    }
}

/// CLI-route configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CliConfig {
    /// Subcommand the handler drives, e.g. `repo view`
    pub command: String,
}

impl CliConfig {
    /// Create a CLI config
    #[must_use]
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

/// Registry entry for one task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationCard {
    /// Task identifier
    pub task: TaskId,
    /// Human-readable description
    pub description: String,
    /// Route preference
    pub routing: Routing,
    /// Input contract
    #[serde(default)]
    pub input: Vec<InputField>,
    /// Structured-route support
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graphql: Option<GraphqlConfig>,
    /// CLI-route support
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cli: Option<CliConfig>,
}

impl OperationCard {
    /// Create a card preferring the structured route with no fallbacks
    #[must_use]
    pub fn new(task: TaskId, description: impl Into<String>) -> Self {
        Self {
            task,
            description: description.into(),
            routing: Routing {
                preferred: Route::Graphql,
                fallbacks: Vec::new(),
            },
            input: Vec::new(),
            graphql: None,
            cli: None,
        }
    }

    /// Set routing preference
    #[must_use]
    pub fn with_routing(mut self, preferred: Route, fallbacks: &[Route]) -> Self {
        self.routing = Routing {
            preferred,
            fallbacks: fallbacks.to_vec(),
        };
        self
    }

    /// Set structured-route config
    #[must_use]
    pub fn with_graphql(mut self, graphql: GraphqlConfig) -> Self {
        self.graphql = Some(graphql);
        self
    }

    /// Set CLI-route config
    #[must_use]
    pub fn with_cli(mut self, cli: CliConfig) -> Self {
        self.cli = Some(cli);
        self
    }

    /// Add an input field
    #[must_use]
    pub fn with_input(mut self, field: InputField) -> Self {
        self.input.push(field);
        self
    }

    /// Whether the card configures the given route at all
    #[must_use]
    pub fn configures(&self, route: Route) -> bool {
        match route {
            Route::Graphql => self.graphql.is_some(),
            Route::Cli => self.cli.is_some(),
            Route::Rest => false,
        }
    }

    /// Whether any route is configured
    #[must_use]
    pub fn is_routable(&self) -> bool {
        self.routing.order().any(|r| self.configures(r))
    }

    /// Structured operation kind, if configured
    #[must_use]
    pub fn operation_kind(&self) -> Option<OperationKind> {
        self.graphql.as_ref().map(|g| g.kind)
    }
}

/// Registry of operation cards
#[derive(Debug, Clone, Default)]
pub struct CapabilityRegistry {
    cards: HashMap<TaskId, Arc<OperationCard>>,
}

impl CapabilityRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in card
    #[must_use]
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for card in cards::builtin_cards() {
            registry.register(card);
        }
        registry
    }

    /// Register (or replace) a card
    pub fn register(&mut self, card: OperationCard) {
        debug!(task = %card.task, "Registering operation card");
        self.cards.insert(card.task, Arc::new(card));
    }

    /// Get a card by task
    #[must_use]
    pub fn get(&self, task: TaskId) -> Option<Arc<OperationCard>> {
        self.cards.get(&task).cloned()
    }

    /// Look up a card by task name
    #[must_use]
    pub fn lookup(&self, task: &str) -> Option<Arc<OperationCard>> {
        task.parse::<TaskId>().ok().and_then(|t| self.get(t))
    }

    /// Check if a card exists
    #[must_use]
    pub fn has(&self, task: TaskId) -> bool {
        self.cards.contains_key(&task)
    }

    /// All cards ordered by task
    #[must_use]
    pub fn list(&self) -> Vec<Arc<OperationCard>> {
        let mut cards: Vec<_> = self.cards.values().cloned().collect();
        cards.sort_by_key(|c| c.task);
        cards
    }

    /// Card count
    #[must_use]
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    /// Check if registry is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}
