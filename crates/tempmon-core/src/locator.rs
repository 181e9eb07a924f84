//! Property search over the model's property database
//!
//! Searches are sent as a structured [`PropertyQuery`] instead of code for
//! the database to evaluate. [`evaluate`] is the scan every in-process
//! database runs: find the attribute definition by name, then collect the
//! objects whose value for that attribute satisfies the predicate.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

use crate::device::DbId;
use crate::host::{HostError, PropertyDatabase};

/// Attribute definition in the property database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeDef {
    pub id: u32,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// A stored property value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Text(String),
    Boolean(bool),
    Number(f64),
}

/// One property of one object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub attribute_id: u32,
    pub value: PropertyValue,
}

/// Condition on an attribute value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    /// Text value equal to the given string
    Equals(String),
}

impl Predicate {
    pub fn matches(&self, value: &PropertyValue) -> bool {
        match (self, value) {
            (Predicate::Equals(expected), PropertyValue::Text(actual)) => actual == expected,
            _ => false,
        }
    }
}

/// Structured property search
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyQuery {
    pub attribute_name: String,
    pub predicate: Predicate,
}

impl PropertyQuery {
    pub fn equals(attribute_name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            attribute_name: attribute_name.into(),
            predicate: Predicate::Equals(value.into()),
        }
    }
}

/// Result of a query as reported by the database
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryOutcome {
    /// No attribute definition carries the requested name
    UnknownAttribute,
    Matches(Vec<DbId>),
}

/// Raw enumeration access to a property database
pub trait PropertyEnumerator {
    fn attributes(&self) -> &[AttributeDef];
    fn object_ids(&self) -> Vec<DbId>;
    fn object_properties(&self, db_id: DbId) -> &[Property];
}

/// Scan the database for objects matching the query
pub fn evaluate<E>(db: &E, query: &PropertyQuery) -> QueryOutcome
where
    E: PropertyEnumerator + ?Sized,
{
    let Some(attribute) = db
        .attributes()
        .iter()
        .find(|a| a.name == query.attribute_name)
    else {
        return QueryOutcome::UnknownAttribute;
    };

    let matches = db
        .object_ids()
        .into_iter()
        .filter(|&id| {
            // Only the first property with this attribute id is compared
            db.object_properties(id)
                .iter()
                .find(|p| p.attribute_id == attribute.id)
                .is_some_and(|p| query.predicate.matches(&p.value))
        })
        .collect();

    QueryOutcome::Matches(matches)
}

/// Resolves object ids by property name and value
#[derive(Clone)]
pub struct PropertyLocator {
    db: Arc<dyn PropertyDatabase>,
}

impl PropertyLocator {
    pub fn new(db: Arc<dyn PropertyDatabase>) -> Self {
        Self { db }
    }

    /// Objects whose `name` property equals `value`
    ///
    /// An unknown attribute or an empty match is an empty set, not an error.
    pub async fn find(&self, name: &str, value: &str) -> Result<BTreeSet<DbId>, HostError> {
        let query = PropertyQuery::equals(name, value);
        match self.db.execute(&query).await? {
            QueryOutcome::UnknownAttribute => {
                debug!(attribute = %name, "Attribute not found in property database");
                Ok(BTreeSet::new())
            }
            QueryOutcome::Matches(ids) => {
                debug!(attribute = %name, value = %value, matches = ids.len(), "Property search finished");
                Ok(ids.into_iter().collect())
            }
        }
    }
}
