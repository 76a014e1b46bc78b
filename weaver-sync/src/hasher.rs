//! Canonical hashing: SHA-256 digests that ignore map key order.
//!
//! Values are serialized with every object's keys sorted, recursively, and
//! the canonical text is hashed. Arrays keep their order; callers sort the
//! arrays whose order carries no meaning (map entries, dependency lists,
//! generator names) before hashing.
//!
//! The digests are change sentinels only. They never identify anything.

use std::collections::HashMap;
use std::fmt::Write as _;

use serde_json::{to_value, Map, Value};
use sha2::{Digest, Sha256};

use weaver_core::{ProjectGraph, ProjectGraphDependency};

/// Serialize `value` with object keys sorted at every level.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_string(key, out);
                out.push(':');
                write_canonical(&map[key], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        Value::String(s) => write_string(s, out),
        scalar => {
            let _ = write!(out, "{scalar}");
        }
    }
}

fn write_string(s: &str, out: &mut String) {
    // `Value::String` display is the JSON-escaped, quoted form.
    let _ = write!(out, "{}", Value::String(s.to_owned()));
}

/// SHA-256 hex digest of the canonical serialization of `value`.
pub fn hash_value(value: &Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical_json(value).as_bytes());
    hex::encode(hasher.finalize())
}

/// Digest of a list of strings, insensitive to their order.
pub fn hash_strings<I, S>(items: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut items: Vec<String> = items.into_iter().map(|s| s.as_ref().to_owned()).collect();
    items.sort();
    hash_value(&Value::from(items))
}

/// Entries of an unordered map, sorted by key.
pub fn sorted_entries<K: Ord, V>(map: &HashMap<K, V>) -> Vec<(&K, &V)> {
    let mut entries: Vec<(&K, &V)> = map.iter().collect();
    entries.sort_by(|(a, _), (b, _)| a.cmp(b));
    entries
}

/// Digest of the graph shape: nodes, dependencies, external nodes, version.
///
/// Nodes and external nodes are sorted by name; each project's dependency
/// list is sorted by target, and the projects themselves by name. Fails when
/// a node does not serialize to JSON, e.g. a project root that is not UTF-8.
pub fn hash_project_graph(graph: &ProjectGraph) -> Result<String, serde_json::Error> {
    let dependencies: Vec<(&String, Vec<&ProjectGraphDependency>)> =
        sorted_entries(&graph.dependencies)
            .into_iter()
            .map(|(project, deps)| {
                let mut deps: Vec<&ProjectGraphDependency> = deps.iter().collect();
                deps.sort_by(|a, b| a.target.cmp(&b.target).then_with(|| a.source.cmp(&b.source)));
                (project, deps)
            })
            .collect();

    let mut input = Map::new();
    input.insert("nodes".into(), to_value(sorted_entries(&graph.nodes))?);
    input.insert("dependencies".into(), to_value(dependencies)?);
    input.insert(
        "externalNodes".into(),
        to_value(sorted_entries(&graph.external_nodes))?,
    );
    input.insert("version".into(), to_value(&graph.version)?);
    Ok(hash_value(&Value::Object(input)))
}
