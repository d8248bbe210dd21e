//! Persisted graph model and the remote schema objects it is built from

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::data::identifiers::{AppId, FieldId, GraphId, UserId};

/// Build status of a graph.
///
/// A graph is created (or re-requested) in `Building`; a build moves it to
/// exactly one of `Built` or `NotBuilt`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GraphStatus {
    NotBuilt,
    Building,
    Built,
}

/// A graph vertex: one remote application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: AppId,
    pub name: String,
}

impl From<App> for Node {
    fn from(app: App) -> Self {
        Self { id: app.id, name: app.name }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Multiplicity {
    SingleSelect,
    MultiSelect,
}

/// A graph edge: a reference field on `app_id` pointing at `referenced_app_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub id: FieldId,
    pub app_id: AppId,
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    pub referenced_app_id: AppId,
    pub multiplicity: Multiplicity,
    pub is_required: bool,
    pub is_unique: bool,
}

/// Layout coordinate for a node. Stored for the client; never computed here.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

pub type EdgesMap = BTreeMap<AppId, Vec<Edge>>;

/// A user-owned relationship graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Graph {
    pub id: GraphId,
    pub owner_id: UserId,
    pub name: String,
    /// Encrypted remote credential; only decrypted for the duration of a build.
    pub credential: String,
    pub status: GraphStatus,
    pub nodes: Vec<Node>,
    pub edges_map: EdgesMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<BTreeMap<AppId, Point>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Graph {
    /// A freshly registered graph, waiting for its first build.
    pub fn new(owner_id: UserId, name: impl Into<String>, credential: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: GraphId::new_v4(),
            owner_id,
            name: name.into(),
            credential: credential.into(),
            status: GraphStatus::Building,
            nodes: Vec::new(),
            edges_map: EdgesMap::new(),
            layout: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn edge_count(&self) -> usize {
        self.edges_map.values().map(Vec::len).sum()
    }
}

/// Owner record. `key_material` is handed to the encryption service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub key_material: String,
}

impl User {
    pub fn new(username: impl Into<String>, key_material: impl Into<String>) -> Self {
        Self {
            id: UserId::new_v4(),
            username: username.into(),
            key_material: key_material.into(),
        }
    }
}

/// Remote application as returned by the schema API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct App {
    pub id: AppId,
    pub name: String,
}

/// The kind of a remote field. Only references become edges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum FieldKind {
    Reference {
        referenced_app_id: AppId,
        multiplicity: Multiplicity,
    },
    Other {
        field_type: String,
    },
}

/// Remote field definition belonging to an application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub id: FieldId,
    pub app_id: AppId,
    pub name: String,
    pub is_required: bool,
    pub is_unique: bool,
    pub kind: FieldKind,
}

impl Field {
    pub const REFERENCE_TYPE: &'static str = "Reference";

    /// Converts a reference field into an edge; every other kind yields `None`.
    pub fn into_edge(self) -> Option<Edge> {
        match self.kind {
            FieldKind::Reference { referenced_app_id, multiplicity } => Some(Edge {
                id: self.id,
                app_id: self.app_id,
                name: self.name,
                field_type: Self::REFERENCE_TYPE.to_string(),
                referenced_app_id,
                multiplicity,
                is_required: self.is_required,
                is_unique: self.is_unique,
            }),
            FieldKind::Other { .. } => None,
        }
    }
}
