//! Output formatting for zeto
//!
//! This module renders pagination snapshots and guard decisions:
//! - JSON formatting (plain and pretty-printed)
//! - Compact formatting for quick terminal checks
//! - Color highlighting of pretty-printed JSON
//!
//! BSON values are simplified before rendering: ObjectIds become hex strings,
//! dates become RFC 3339 strings and 64-bit integers plain numbers.

use bson::{Bson, Document};
use colored_json::prelude::*;
use serde::Serialize;
use serde_json::{Value, json};

use crate::config::{DisplayConfig, OutputFormat};
use crate::error::{Result, ZetoError};
use crate::guard::{GuardDecision, Role};
use crate::pagination::{FeedView, PageView};
use crate::store::ID_FIELD;

/// Main formatter for command output
pub struct Formatter {
    /// Output format type
    format: OutputFormat,

    /// Enable colored output
    use_colors: bool,

    /// Indentation of pretty-printed JSON
    indent: usize,
}

impl Formatter {
    /// Create a new formatter
    ///
    /// # Arguments
    /// * `format` - Output format type
    /// * `use_colors` - Enable colored output
    pub fn new(format: OutputFormat, use_colors: bool) -> Self {
        Self {
            format,
            use_colors,
            indent: 2,
        }
    }

    /// Create a formatter from display configuration
    pub fn from_config(config: &DisplayConfig) -> Self {
        Self::new(config.format, config.color_output)
    }

    /// Format a paged session snapshot
    pub fn format_page(&self, view: &PageView) -> Result<String> {
        if self.format == OutputFormat::Compact {
            let mut lines = vec![format!(
                "{}: page {} of {} ({} item(s), {} total){}",
                view.collection,
                view.page,
                view.total_pages,
                view.items.len(),
                view.total_count,
                status_suffix(view.is_last_page, view.error.as_deref())
            )];
            lines.extend(view.items.iter().map(compact_line));
            return Ok(lines.join("\n"));
        }

        self.render(&with_items(view, &view.items)?)
    }

    /// Format an infinite session snapshot
    pub fn format_feed(&self, view: &FeedView) -> Result<String> {
        if self.format == OutputFormat::Compact {
            let mut lines = vec![format!(
                "{}: {} of {} item(s) in {} fetch(es){}",
                view.collection,
                view.items.len(),
                view.total_count,
                view.fetches,
                status_suffix(!view.has_more, view.error.as_deref())
            )];
            lines.extend(view.items.iter().map(compact_line));
            return Ok(lines.join("\n"));
        }

        self.render(&with_items(view, &view.items)?)
    }

    /// Format a route guard decision
    pub fn format_decision(
        &self,
        path: &str,
        role: Option<Role>,
        decision: &GuardDecision,
    ) -> Result<String> {
        if self.format == OutputFormat::Compact {
            let who = role.map_or_else(|| "anonymous".to_string(), |r| r.to_string());
            return Ok(format!("{who} {path} -> {decision}"));
        }

        let (outcome, target) = match decision {
            GuardDecision::Pending => ("pending", None),
            GuardDecision::Allow => ("allow", None),
            GuardDecision::Redirect(to) => ("redirect", Some(to.as_str())),
        };
        self.render(&json!({
            "path": path,
            "role": role,
            "decision": outcome,
            "redirectTo": target,
        }))
    }

    fn render(&self, value: &Value) -> Result<String> {
        // Single-line JSON stays plain for piping
        if !self.format.is_pretty() {
            return Ok(serde_json::to_string(value)?);
        }

        let text = self.to_pretty_string(value)?;
        if self.use_colors {
            Ok(text.to_colored_json_auto().unwrap_or(text))
        } else {
            Ok(text)
        }
    }

    fn to_pretty_string<T: Serialize>(&self, value: &T) -> Result<String> {
        let mut buf = Vec::new();
        let indent = " ".repeat(self.indent);
        let formatter = serde_json::ser::PrettyFormatter::with_indent(indent.as_bytes());
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        value.serialize(&mut ser)?;
        String::from_utf8(buf).map_err(|e| ZetoError::Serialization(e.to_string()))
    }
}

/// Serialize a view, replacing its raw BSON items with simplified JSON
fn with_items<T: Serialize>(view: &T, items: &[Document]) -> Result<Value> {
    let mut value = serde_json::to_value(view)?;
    value["items"] = Value::Array(items.iter().map(simplify_document).collect());
    Ok(value)
}

fn status_suffix(at_end: bool, error: Option<&str>) -> String {
    match (at_end, error) {
        (_, Some(error)) => format!(" [error: {error}]"),
        (true, None) => " [end]".to_string(),
        (false, None) => String::new(),
    }
}

/// One line per document: its id followed by the remaining fields
fn compact_line(document: &Document) -> String {
    let id = document
        .get(ID_FIELD)
        .map(|id| match simplify(id) {
            Value::String(s) => s,
            other => other.to_string(),
        })
        .unwrap_or_else(|| "-".to_string());

    let mut rest = document.clone();
    rest.remove(ID_FIELD);
    format!("  {id}  {}", simplify_document(&rest))
}

/// Convert a BSON document to simplified JSON
pub fn simplify_document(document: &Document) -> Value {
    Value::Object(
        document
            .iter()
            .map(|(key, value)| (key.clone(), simplify(value)))
            .collect(),
    )
}

/// Convert a BSON value to simplified JSON
pub fn simplify(value: &Bson) -> Value {
    match value {
        Bson::ObjectId(oid) => Value::String(oid.to_hex()),
        Bson::DateTime(dt) => dt
            .try_to_rfc3339_string()
            .map(Value::String)
            .unwrap_or_else(|_| json!(dt.timestamp_millis())),
        Bson::Int32(n) => json!(n),
        Bson::Int64(n) => json!(n),
        Bson::Double(f) => serde_json::Number::from_f64(*f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Bson::String(s) => Value::String(s.clone()),
        Bson::Boolean(b) => Value::Bool(*b),
        Bson::Null | Bson::Undefined => Value::Null,
        Bson::Array(items) => Value::Array(items.iter().map(simplify).collect()),
        Bson::Document(doc) => simplify_document(doc),
        other => other.clone().into_relaxed_extjson(),
    }
}
