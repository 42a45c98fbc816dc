//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Router::start(shutdown):
//!     spawn gc sweeper ──┐
//!     spawn history listener ──┤ tracked by Shutdown
//!
//! Shutdown::shutdown(deadline):
//!     broadcast stop → await every tracked task → abort stragglers
//! ```
//!
//! # Design Decisions
//! - One broadcast channel fans the stop signal out to every task
//! - Shutdown has a deadline; tasks still running afterwards are aborted

pub mod shutdown;

pub use shutdown::Shutdown;
