//! Resource quiver: mutation consistency
//!
//! A quiver collects the node and arrow assertions and retractions of one
//! mutation, rejects contradictions as they arrive, and drains into a flat
//! [`ChangeSet`]. [`ResourceQuiver`] layers the schema on top and keeps
//! inverse relationships in step with their forward side.

pub mod changes;
pub mod error;
pub mod resource;
pub mod staging;

pub use changes::{Arrow, ArrowChanges, ArrowGroup, ChangeSet, NodeUpsert};
pub use error::{PropertyConflict, QuiverError, QuiverResult};
pub use resource::ResourceQuiver;
pub use staging::{NodeEntry, NodeState, Quiver};
