//! Core data structures for the graph build pipeline

pub mod entities;
pub mod errors;
pub mod identifiers;
pub mod paging;

// Re-export all common types
pub use entities::{
    App, Edge, EdgesMap, Field, FieldKind, Graph, GraphStatus, Multiplicity, Node, Point, User,
};
pub use errors::{panic_message, CoreError, RemoteError, RepositoryError};
pub use identifiers::{AppId, FieldId, GraphId, GroupKey, UserId, WorkItemId};
pub use paging::{Page, PagingRequest};
