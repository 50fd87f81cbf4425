//! Mock project documents for demos and fixtures
//!
//! Documents follow the dashboard's project shape: `id`, `name`, `type`,
//! `iconColor`, optional `progress` / `fileCount`, and a `createdAt` date the
//! collection is ordered by.

use bson::{Bson, Document, doc};
use chrono::{DateTime, TimeDelta, Utc};
use serde_json::{Map, Value};
use std::path::Path;
use tracing::info;

use crate::error::Result;

/// `(name, type, icon color)` of the template projects
const TEMPLATES: &[(&str, &str, &str)] = &[
    ("Project Alpha", "folder", "bg-blue-500"),
    ("Research Study", "chart", "bg-orange-500"),
    ("Client Proposal", "document", "bg-teal-500"),
    ("Marketing Campaign", "megaphone", "bg-teal-500"),
    ("Agrenain Faw", "list", "bg-orange-500"),
];

/// Generate `count` projects, newest first, one hour apart
pub fn generate_projects(count: usize, newest: DateTime<Utc>) -> Vec<Document> {
    (0..count)
        .map(|i| {
            let (name, kind, color) = TEMPLATES[i % TEMPLATES.len()];
            let round = i / TEMPLATES.len();
            let name = if round == 0 {
                name.to_string()
            } else {
                format!("{name} {}", round + 1)
            };
            let created = newest - TimeDelta::hours(i as i64);

            let mut project = doc! {
                "id": uuid::Uuid::new_v4().to_string(),
                "name": name,
                "type": kind,
                "iconColor": color,
                "createdAt": bson::DateTime::from_millis(created.timestamp_millis()),
            };
            match kind {
                "folder" => {
                    project.insert("progress", ((i * 15) % 100) as i32);
                }
                "chart" => {
                    project.insert("fileCount", (i % 12) as i32 + 1);
                }
                _ => {}
            }
            project
        })
        .collect()
}

/// Render documents as fixture JSON: `{ "<collection>": [ ...extended JSON ] }`
pub fn to_fixture(collection: &str, documents: &[Document]) -> Result<String> {
    let items: Vec<Value> = documents
        .iter()
        .map(|doc| Bson::Document(doc.clone()).into_relaxed_extjson())
        .collect();

    let mut root = Map::new();
    root.insert(collection.to_string(), Value::Array(items));
    Ok(serde_json::to_string_pretty(&Value::Object(root))?)
}

/// Write a fixture file readable by `MemoryStore::from_fixture_file`
pub fn write_fixture<P: AsRef<Path>>(path: P, collection: &str, documents: &[Document]) -> Result<()> {
    let path = path.as_ref();
    std::fs::write(path, to_fixture(collection, documents)?)?;
    info!(
        "Wrote {} '{}' document(s) to {}",
        documents.len(),
        collection,
        path.display()
    );
    Ok(())
}
