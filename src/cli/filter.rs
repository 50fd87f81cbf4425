//! `--where` filter expressions
//!
//! `field=value`, `field!=value`, `field>value`, `field>=value`,
//! `field<value` and `field<=value`. Values are read as null, booleans,
//! integers, floats or strings, in that order; wrap a value in double quotes
//! to force a string.

use bson::Bson;

use crate::error::{QueryError, Result};
use crate::store::{Filter, FilterOp};

/// Parse one filter expression
pub fn parse_filter_expr(expr: &str) -> Result<Filter> {
    let Some(start) = expr.find(['=', '!', '<', '>']) else {
        return Err(invalid(expr, "missing operator"));
    };

    let rest = &expr[start..];
    let (op, width) = if rest.starts_with("!=") {
        (FilterOp::Ne, 2)
    } else if rest.starts_with(">=") {
        (FilterOp::Gte, 2)
    } else if rest.starts_with("<=") {
        (FilterOp::Lte, 2)
    } else if rest.starts_with('=') {
        (FilterOp::Eq, 1)
    } else if rest.starts_with('>') {
        (FilterOp::Gt, 1)
    } else if rest.starts_with('<') {
        (FilterOp::Lt, 1)
    } else {
        return Err(invalid(expr, "unknown operator"));
    };

    let field = expr[..start].trim();
    if field.is_empty() {
        return Err(invalid(expr, "missing field"));
    }

    Ok(Filter::new(field, op, parse_value(&rest[width..])))
}

/// Read a literal value
pub fn parse_value(raw: &str) -> Bson {
    let raw = raw.trim();
    if raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"') {
        return Bson::String(raw[1..raw.len() - 1].to_string());
    }

    match raw {
        "null" => return Bson::Null,
        "true" => return Bson::Boolean(true),
        "false" => return Bson::Boolean(false),
        _ => {}
    }

    if let Ok(n) = raw.parse::<i64>() {
        return match i32::try_from(n) {
            Ok(small) => Bson::Int32(small),
            Err(_) => Bson::Int64(n),
        };
    }
    if let Ok(f) = raw.parse::<f64>() {
        if f.is_finite() {
            return Bson::Double(f);
        }
    }

    Bson::String(raw.to_string())
}

fn invalid(expr: &str, reason: &str) -> crate::error::ZetoError {
    QueryError::InvalidSpec(format!("filter '{expr}': {reason}")).into()
}
