//! ghrelay Adapters - Concrete collaborators for the engine
//!
//! This crate provides the I/O side of ghrelay:
//! - GraphQL: HTTP transport for the GitHub GraphQL endpoint
//! - Process: Subprocess runner with timeouts
//! - gh: Template-driven `gh` CLI handlers for the built-in tasks

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod gh;
pub mod graphql;
pub mod process;

pub use error::{Error, Result};
pub use gh::{
    builtin_handlers, Arg, GhCommand, GhHandler, OutputMode, ValueFormat, DEFAULT_COMMAND_TIMEOUT,
};
pub use graphql::{GraphqlHttpConfig, GraphqlHttpTransport, DEFAULT_API_URL};
pub use process::ProcessRunner;
