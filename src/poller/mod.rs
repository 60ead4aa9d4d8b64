//! Poll loop module
//!
//! The periodic detection cycle: concurrent top-mover fetches, history
//! updates, scoring, the early-pump and threshold alert paths, and live
//! order book activation.

mod runner;
mod types;

pub use runner::PollLoop;
pub use types::{CycleReport, PollConfig};
