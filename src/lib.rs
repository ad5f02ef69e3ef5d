//! kgweave: a typed object-graph client for JSON-LD knowledge-graph stores.
//!
//! Node types are declared as static [`NodeType`] descriptors and registered
//! in a [`Registry`]. A [`Session`] pairs the registry with a [`Transport`]
//! and holds the caches that make repeated saves idempotent.

pub mod activity;
pub mod cache;
pub mod config;
pub mod error;
pub mod filter;
pub mod json_ld;
pub mod model;
pub mod query;
pub mod registry;
pub mod session;
pub mod transport;

pub use crate::activity::{ActivityEntry, ActivityLog, EntryKind};
pub use crate::config::Config;
pub use crate::error::{Error, Result};
pub use crate::filter::{FilterItem, Filters};
pub use crate::model::{
    Distribution, ExistenceQuery, FieldDef, FieldType, KgObject, KgProxy, NodeRef, NodeType,
    ObjectDiff, SaveOptions, ScalarType, Value,
};
pub use crate::registry::Registry;
pub use crate::session::{Api, FetchOptions, ListOptions, LookupOptions, MatchMode, Session};
pub use crate::transport::{HttpTransport, MemoryTransport, Scope, Transport};
