pub mod gate;
pub mod router;
pub mod session;
pub mod store;
pub mod summary;
pub mod thread;

#[cfg(test)]
mod testing;

pub use gate::{DENIAL_NOTICE, Resolution, ResolutionStatus};
pub use router::RouterDecision;
pub use session::{Reply, Session};
pub use store::ThreadStore;
pub use summary::{SummaryReport, format_duration};
pub use thread::{GateState, Thread};
