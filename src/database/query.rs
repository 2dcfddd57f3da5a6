//! Composition of parsed modifiers into a single query description.
//!
//! The compiled query is what crosses the SDK boundary: one ordering clause
//! plus the range/limit refinements in parse order. Whether a
//! given combination is legal at the protocol level is the SDK's business;
//! this step only builds the call chain.

use std::fmt::{Display, Formatter};

use crate::database::modifier::Modifier;

/// The query's ordering clause. Exactly one applies; the default mirrors
/// the wire format's implicit order-by-key starting point.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum QueryOrder {
    #[default]
    Key,
    Value,
    Priority,
    Child(String),
}

/// A range or limit refinement, applied cumulatively in parse order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QueryFilter {
    StartAt { value: String, key: Option<String> },
    EndAt { value: String, key: Option<String> },
    EqualTo { value: String, key: Option<String> },
    LimitToFirst(u32),
    LimitToLast(u32),
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CompiledQuery {
    order: QueryOrder,
    filters: Vec<QueryFilter>,
}

impl CompiledQuery {
    /// Folds parsed modifiers into a query, starting from order-by-key.
    ///
    /// A later ordering instruction replaces an earlier one (last write
    /// wins); refinements keep their relative order. An empty modifier
    /// sequence yields the default query.
    pub fn compile(modifiers: &[Modifier]) -> Self {
        let mut query = CompiledQuery::default();
        for modifier in modifiers {
            match modifier {
                Modifier::OrderByKey => query.order = QueryOrder::Key,
                Modifier::OrderByValue => query.order = QueryOrder::Value,
                Modifier::OrderByPriority => query.order = QueryOrder::Priority,
                Modifier::OrderByChild(field) => {
                    query.order = QueryOrder::Child(field.clone());
                }
                Modifier::LimitToFirst(limit) => {
                    query.filters.push(QueryFilter::LimitToFirst(*limit));
                }
                Modifier::LimitToLast(limit) => {
                    query.filters.push(QueryFilter::LimitToLast(*limit));
                }
                Modifier::EqualTo { value, key } => {
                    query.filters.push(QueryFilter::EqualTo {
                        value: value.clone(),
                        key: key.clone(),
                    });
                }
                Modifier::StartAt { value, key } => {
                    query.filters.push(QueryFilter::StartAt {
                        value: value.clone(),
                        key: key.clone(),
                    });
                }
                Modifier::EndAt { value, key } => {
                    query.filters.push(QueryFilter::EndAt {
                        value: value.clone(),
                        key: key.clone(),
                    });
                }
            }
        }
        query
    }

    pub fn order(&self) -> &QueryOrder {
        &self.order
    }

    pub fn filters(&self) -> &[QueryFilter] {
        &self.filters
    }

    pub fn is_default(&self) -> bool {
        self.order == QueryOrder::Key && self.filters.is_empty()
    }
}

impl Display for CompiledQuery {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.order {
            QueryOrder::Key => f.write_str("orderByKey")?,
            QueryOrder::Value => f.write_str("orderByValue")?,
            QueryOrder::Priority => f.write_str("orderByPriority")?,
            QueryOrder::Child(field) => write!(f, "orderByChild:{field}")?,
        }
        for filter in &self.filters {
            match filter {
                QueryFilter::StartAt { value, key } => write_bound(f, "startAt", value, key)?,
                QueryFilter::EndAt { value, key } => write_bound(f, "endAt", value, key)?,
                QueryFilter::EqualTo { value, key } => write_bound(f, "equalTo", value, key)?,
                QueryFilter::LimitToFirst(limit) => write!(f, " limitToFirst:{limit}")?,
                QueryFilter::LimitToLast(limit) => write!(f, " limitToLast:{limit}")?,
            }
        }
        Ok(())
    }
}

fn write_bound(
    f: &mut Formatter<'_>,
    op: &str,
    value: &str,
    key: &Option<String>,
) -> std::fmt::Result {
    match key {
        Some(key) => write!(f, " {op}:{value}:{key}"),
        None => write!(f, " {op}:{value}"),
    }
}
