//! ghrelay Core - Capability routing and execution engine
//!
//! This crate turns abstract capability requests (`repo.view`, `issue.create`, ...)
//! into calls over the best available transport:
//! - Registry: Operation cards describing per-route support
//! - Preflight: Cached, de-duplicated CLI environment detection
//! - Routing: Input validation and route classification
//! - Batch: Aliased GraphQL query/mutation batching with partial-failure demux
//! - Resolution: Pre-mutation lookups and variable injection
//! - Engine: Chain orchestration with per-step fallback and result assembly

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod batch;
pub mod cli;
pub mod engine;
pub mod envelope;
pub mod error;
pub mod preflight;
pub mod registry;
pub mod resolution;
pub mod routing;
pub mod taxonomy;
pub mod transport;

pub use cli::{CliCommandRunner, CliHandler, CliHandlerRegistry, CliOutput};
pub use engine::{Engine, EngineConfig, ExecutionDeps};
pub use envelope::{
    ChainMeta, ChainResult, ChainStatus, EnvelopeError, ResultEnvelope, ResultMeta, Route,
    RouteReason, TaskRequest,
};
pub use error::{Error, Result};
pub use preflight::{CliEnvironment, CliEnvironmentDetector, Clock, ManualClock, SystemClock};
pub use registry::{CapabilityRegistry, OperationCard, OperationKind, TaskId};
pub use taxonomy::ErrorCode;
pub use transport::{GraphqlError, GraphqlResponse, Transport};
