//! Records flowing between physical operators

use crate::graph::Resource;
use serde_json::Value;

/// A candidate resource plus its materialized view.
///
/// The view is only built when a later operator needs to look through it
/// (a where clause or an order key); otherwise it stays `Null`.
#[derive(Debug, Clone)]
pub struct Record<'a> {
    pub resource: &'a Resource,
    pub view: Value,
}

impl<'a> Record<'a> {
    pub fn new(resource: &'a Resource, view: Value) -> Self {
        Self { resource, view }
    }
}
