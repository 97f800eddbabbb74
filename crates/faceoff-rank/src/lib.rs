#![forbid(unsafe_code)]
//! faceoff-rank library.
//!
//! The ranking engine proper. A driver (GUI or CLI, external to this crate)
//! asks for the next set of records to show, reports which one the human
//! preferred, and periodically persists the store; everything in between
//! lives here.
//!
//! # Conventions
//!
//! - **Errors**: typed [`error::EngineError`]; fatal conditions propagate to
//!   the driver, nothing is retried.
//! - **Logging**: `tracing` macros.
//! - **Randomness**: every selection entry point takes `&mut impl Rng` so
//!   callers (and tests) control seeding.

pub mod choose;
pub mod closure;
pub mod correlate;
pub mod elo;
pub mod error;
pub mod session;

pub use choose::{Chooser, SelectionMode, WeightStrategy};
pub use closure::ExactEngine;
pub use correlate::{Correlation, spearman};
pub use elo::EloUpdater;
pub use error::EngineError;
pub use session::{Round, Session, SessionReport};
