//! # Anvil Core Kernel
//!
//! Process-wide constants and the crate-level error type.
//!
//! - **Constants**: file names, environment variable names and the embedded
//!   engine descriptor, found in the `constants` submodule.
//! - **Error Handling**: the [`Error`](error::Error) enum wrapping every
//!   subsystem error, plus a `Result` alias, in the `error` submodule.
pub mod constants;
pub mod error;

pub use error::{Error, Result};
