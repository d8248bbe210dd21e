//! Build pipeline services

pub mod client;
pub mod messages;
pub mod notifications;
pub mod processor;
pub mod queue;
pub mod worker;

// Re-exports
pub use client::GraphBuildClient;
pub use messages::{GraphEvent, WorkItem};
pub use notifications::BroadcastNotifier;
pub use processor::{Collaborators, FetchLimiter, GraphProcessor};
pub use queue::GraphQueue;
pub use worker::{QueueService, WorkerConfig};
