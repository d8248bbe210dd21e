//! Graph build processor: turns one work item into a persisted graph

mod assemble;
mod fetch;
mod service;

pub use assemble::{assemble, AssembledGraph};
pub use fetch::FetchLimiter;
pub use service::{Collaborators, GraphProcessor};

/// Messages of deliberate build failures, pushed to subscribers before the
/// terminal error signal.
pub const UNABLE_TO_CONNECT: &str = "Unable to connect to the remote service";
pub const UNABLE_TO_FETCH_APPLICATIONS: &str = "Unable to fetch applications";
pub const NO_APPLICATIONS_FOUND: &str = "No applications found";
