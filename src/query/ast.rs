//! Canonical query representation
//!
//! Produced by [`normalize_query`](super::normalize::normalize_query) from the
//! caller-facing JSON form. Every shorthand has been expanded and every name
//! checked against the schema by the time a `Query` exists.

use indexmap::IndexMap;
use serde_json::Value;
use std::fmt;

/// A query against one resource type
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub resource_type: String,
    /// Single-resource lookup when present
    pub id: Option<String>,
    /// Output key to selector, in output order
    pub select: IndexMap<String, Selector>,
    /// Normalized boolean expression
    pub where_clause: Option<Value>,
    pub order: Vec<OrderBy>,
    pub limit: Option<usize>,
    pub offset: usize,
}

impl Query {
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            id: None,
            select: IndexMap::new(),
            where_clause: None,
            order: Vec::new(),
            limit: None,
            offset: 0,
        }
    }

    /// Whether the result is a single resource (or null) rather than a list
    pub fn is_single(&self) -> bool {
        self.id.is_some()
    }

    /// Nested sub-queries in select order
    pub fn sub_queries(&self) -> impl Iterator<Item = (&str, &Query)> {
        self.select.values().filter_map(|selector| match selector {
            Selector::SubQuery {
                relationship,
                query,
            } => Some((relationship.as_str(), query.as_ref())),
            _ => None,
        })
    }
}

/// How one output key is computed
#[derive(Debug, Clone, PartialEq)]
pub enum Selector {
    /// Declared attribute (including the id attribute)
    Attribute(String),
    /// Dotted path through the materialized resource
    Path(String),
    /// Expression applied to the materialized resource
    Expression(Value),
    /// Nested query over a relationship's targets
    SubQuery {
        relationship: String,
        query: Box<Query>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "asc" => Some(Direction::Asc),
            "desc" => Some(Direction::Desc),
            _ => None,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Asc => write!(f, "asc"),
            Direction::Desc => write!(f, "desc"),
        }
    }
}

/// One sort key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub path: String,
    pub direction: Direction,
}

impl OrderBy {
    pub fn asc(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            direction: Direction::Asc,
        }
    }

    pub fn desc(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            direction: Direction::Desc,
        }
    }
}
