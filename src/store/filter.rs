//! Query filter predicates
//!
//! A [`Filter`] is applied identically to every request of a pagination
//! session (count, first page, next, previous and the first-page lookahead).
//! Each backend either evaluates it in process ([`Filter::matches`]) or
//! translates it into a MongoDB query document ([`Filter::to_document`]).

use bson::{Bson, Document};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use super::lookup;
use super::ordering::{compare_values, type_rank};

/// Comparison operator of a filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOp {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
    In,
}

impl FilterOp {
    /// MongoDB query operator name
    pub fn operator(self) -> &'static str {
        match self {
            FilterOp::Eq => "$eq",
            FilterOp::Ne => "$ne",
            FilterOp::Lt => "$lt",
            FilterOp::Lte => "$lte",
            FilterOp::Gt => "$gt",
            FilterOp::Gte => "$gte",
            FilterOp::In => "$in",
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            FilterOp::Eq => "=",
            FilterOp::Ne => "!=",
            FilterOp::Lt => "<",
            FilterOp::Lte => "<=",
            FilterOp::Gt => ">",
            FilterOp::Gte => ">=",
            FilterOp::In => " in ",
        }
    }
}

/// Equality or range predicate on one field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: Bson,
}

impl Filter {
    pub fn new(field: impl Into<String>, op: FilterOp, value: impl Into<Bson>) -> Self {
        Self {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Bson>) -> Self {
        Self::new(field, FilterOp::Eq, value)
    }

    pub fn ne(field: impl Into<String>, value: impl Into<Bson>) -> Self {
        Self::new(field, FilterOp::Ne, value)
    }

    pub fn lt(field: impl Into<String>, value: impl Into<Bson>) -> Self {
        Self::new(field, FilterOp::Lt, value)
    }

    pub fn lte(field: impl Into<String>, value: impl Into<Bson>) -> Self {
        Self::new(field, FilterOp::Lte, value)
    }

    pub fn gt(field: impl Into<String>, value: impl Into<Bson>) -> Self {
        Self::new(field, FilterOp::Gt, value)
    }

    pub fn gte(field: impl Into<String>, value: impl Into<Bson>) -> Self {
        Self::new(field, FilterOp::Gte, value)
    }

    pub fn any_of(field: impl Into<String>, values: Vec<Bson>) -> Self {
        Self::new(field, FilterOp::In, Bson::Array(values))
    }

    /// Translate into a MongoDB query clause: `{ field: { $op: value } }`
    pub fn to_document(&self) -> Document {
        let mut condition = Document::new();
        condition.insert(self.op.operator(), self.value.clone());
        let mut clause = Document::new();
        clause.insert(self.field.clone(), condition);
        clause
    }

    /// Evaluate the predicate against a document.
    ///
    /// A missing field behaves like null for equality. Range operators only
    /// match values in the same type bracket as the operand.
    pub fn matches(&self, doc: &Document) -> bool {
        let actual = lookup(doc, &self.field).unwrap_or(&Bson::Null);

        match self.op {
            FilterOp::Eq => equals(actual, &self.value),
            FilterOp::Ne => !equals(actual, &self.value),
            FilterOp::In => match &self.value {
                Bson::Array(candidates) => candidates.iter().any(|c| equals(actual, c)),
                single => equals(actual, single),
            },
            FilterOp::Lt => ranged(actual, &self.value, |o| o == Ordering::Less),
            FilterOp::Lte => ranged(actual, &self.value, |o| o != Ordering::Greater),
            FilterOp::Gt => ranged(actual, &self.value, |o| o == Ordering::Greater),
            FilterOp::Gte => ranged(actual, &self.value, |o| o != Ordering::Less),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.field, self.op.symbol(), self.value)
    }
}

/// Build the combined filter document for a set of predicates
pub fn combine(filters: &[Filter], extra: Option<Document>) -> Document {
    let mut clauses: Vec<Document> = filters.iter().map(Filter::to_document).collect();
    if let Some(extra) = extra {
        clauses.push(extra);
    }

    match clauses.len() {
        0 => Document::new(),
        1 => clauses.remove(0),
        _ => {
            let mut combined = Document::new();
            combined.insert(
                "$and",
                clauses.into_iter().map(Bson::Document).collect::<Vec<_>>(),
            );
            combined
        }
    }
}

fn equals(actual: &Bson, expected: &Bson) -> bool {
    type_rank(actual) == type_rank(expected) && compare_values(actual, expected) == Ordering::Equal
}

fn ranged(actual: &Bson, operand: &Bson, accept: impl Fn(Ordering) -> bool) -> bool {
    type_rank(actual) == type_rank(operand) && accept(compare_values(actual, operand))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn test_equality_filters() {
        let doc = doc! { "status": "active", "owner": { "role": "client" } };
        assert!(Filter::eq("status", "active").matches(&doc));
        assert!(!Filter::eq("status", "archived").matches(&doc));
        assert!(Filter::ne("status", "archived").matches(&doc));
        assert!(Filter::eq("owner.role", "client").matches(&doc));
        assert!(Filter::eq("deletedAt", Bson::Null).matches(&doc));
    }

    #[test]
    fn test_range_filters_respect_type_bracket() {
        let doc = doc! { "progress": 75, "name": "Project Alpha" };
        assert!(Filter::gt("progress", 50.5).matches(&doc));
        assert!(Filter::lte("progress", 75_i64).matches(&doc));
        assert!(!Filter::lt("progress", 75).matches(&doc));
        assert!(!Filter::gt("name", 10).matches(&doc));
        assert!(!Filter::gt("missing", 0).matches(&doc));
    }

    #[test]
    fn test_in_filter() {
        let doc = doc! { "type": "chart" };
        let filter = Filter::any_of("type", vec!["folder".into(), "chart".into()]);
        assert!(filter.matches(&doc));
        assert!(!Filter::any_of("type", vec!["list".into()]).matches(&doc));
    }

    #[test]
    fn test_to_document_and_combine() {
        let status = Filter::eq("status", "active");
        assert_eq!(status.to_document(), doc! { "status": { "$eq": "active" } });

        assert_eq!(combine(&[], None), doc! {});
        assert_eq!(combine(&[status.clone()], None), status.to_document());
        assert_eq!(
            combine(&[status], Some(doc! { "progress": { "$gt": 10 } })),
            doc! { "$and": [
                { "status": { "$eq": "active" } },
                { "progress": { "$gt": 10 } }
            ] }
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(Filter::gte("progress", 10).to_string(), "progress>=10");
    }
}
