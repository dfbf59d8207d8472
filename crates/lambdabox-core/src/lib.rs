//! # lambdabox-core
//!
//! Sandboxed execution of user-authored lambdas.
//!
//! A lambda is a single unary function written in JavaScript or TypeScript.
//! Each invocation goes through the same pipeline:
//! - `signature` - structural check of the `function(<params>) {` entry point
//! - `normalize` - TypeScript lowering (JavaScript passes through unchanged)
//! - `sandbox` - V8 isolate with no host I/O, console capture, limits
//! - `service` - timing and classification into an [`ExecutionResult`]

#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod lambda;
pub mod normalize;
pub mod protocol;
pub mod result;
pub mod sandbox;
pub mod service;
pub mod signature;

pub use config::SandboxConfig;
pub use error::LambdaError;
pub use lambda::{LambdaDefinition, Language};
pub use result::{ExecutionResult, StatusCode};
pub use service::LambdaService;

/// Crate-level result type
pub type Result<T> = std::result::Result<T, LambdaError>;
