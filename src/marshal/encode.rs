//! Result encoder

use std::sync::Arc;

use super::{wrap_data, MAP_CLASS_MAP, MARKER};
use crate::mapclass::MapClassDefinition;
use crate::value::{Map, Value};

/// Marshal `value` into the STAF wire format.
///
/// If `value` contains map class instances, the output is a context entry
/// carrying their definitions, followed by the value itself. Definitions are
/// keyed by class name; if two different definitions share a name, the first
/// one encountered wins.
pub fn marshal(value: &Value) -> String {
    let mut out = String::new();
    marshal_into(value, &mut out);
    out
}

/// Like [`marshal`], appending to `out`.
pub fn marshal_into(value: &Value, out: &mut String) {
    let definitions = collect_definitions(value);
    if definitions.is_empty() {
        write_entry(value, out);
        return;
    }

    let mut content = String::new();
    write_entry(&context_map(&definitions), &mut content);
    write_entry(value, &mut content);
    out.push_str(MARKER);
    out.push('*');
    out.push_str(&wrap_data(&content));
}

/// Distinct map class definitions used anywhere in `value`, in first-seen order.
fn collect_definitions(value: &Value) -> Vec<Arc<MapClassDefinition>> {
    let mut found: Vec<Arc<MapClassDefinition>> = Vec::new();
    let mut pending = vec![value];
    while let Some(v) = pending.pop() {
        match v {
            Value::None | Value::String(_) => {}
            Value::List(items) => pending.extend(items.iter().rev()),
            Value::Map(map) => pending.extend(map.values().rev()),
            Value::MapClass(mc) => {
                if !found.iter().any(|d| d.name() == mc.class_name()) {
                    found.push(Arc::clone(mc.shared_definition()));
                }
                pending.extend(mc.values().collect::<Vec<_>>().into_iter().rev());
            }
        }
    }
    found
}

/// The context map describing `definitions`:
///
/// ```text
/// { map-class-map: { <name>: { keys: [ { key, display-name, display-short-name? } ], name } } }
/// ```
pub(crate) fn context_map(definitions: &[Arc<MapClassDefinition>]) -> Value {
    let mut class_map = Map::new();
    for definition in definitions {
        let keys = definition
            .items()
            .iter()
            .map(|item| {
                let mut entry = Map::new();
                entry.insert("key".into(), Value::from(item.key.as_str()));
                entry.insert("display-name".into(), Value::from(item.display_name.as_str()));
                if let Some(short) = &item.display_short_name {
                    entry.insert("display-short-name".into(), Value::from(short.as_str()));
                }
                Value::Map(entry)
            })
            .collect();

        let mut info = Map::new();
        info.insert("keys".into(), Value::List(keys));
        info.insert("name".into(), Value::from(definition.name()));
        class_map.insert(definition.name().to_string(), Value::Map(info));
    }

    let mut context = Map::new();
    context.insert(MAP_CLASS_MAP.into(), Value::Map(class_map));
    Value::Map(context)
}

/// An entry in output order, with the map key written in front of it.
struct Entry<'a> {
    value: &'a Value,
    key: Option<&'a str>,
    content_len: usize,
}

/// Framed length of `n` characters: `:<n>:` plus the characters.
fn framed_len(n: usize) -> usize {
    n.to_string().len() + 2 + n
}

/// Write one entry for `value` without recursing.
///
/// Entries are laid out in pre-order, then sized children first, then
/// written front to back.
fn write_entry(value: &Value, out: &mut String) {
    let mut entries = Vec::new();
    let mut pending: Vec<(&Value, Option<&str>)> = vec![(value, None)];
    while let Some((value, key)) = pending.pop() {
        entries.push(Entry {
            value,
            key,
            content_len: 0,
        });
        match value {
            Value::None | Value::String(_) => {}
            Value::List(items) => pending.extend(items.iter().rev().map(|v| (v, None))),
            Value::Map(map) => {
                pending.extend(map.iter().rev().map(|(k, v)| (v, Some(k.as_str()))));
            }
            Value::MapClass(mc) => {
                let values: Vec<&Value> = mc.values().collect();
                pending.extend(values.into_iter().rev().map(|v| (v, None)));
            }
        }
    }

    // Finished entry sizes, key included; a parent's children are on top.
    let mut sizes: Vec<usize> = Vec::new();
    for entry in entries.iter_mut().rev() {
        let start = sizes.len() - entry.value.children().count();
        let children: usize = sizes.drain(start..).sum();
        let (content_len, header_len) = match entry.value {
            Value::None => (0, "$0:0:".len()),
            Value::String(s) => (0, 2 + framed_len(s.chars().count())),
            Value::List(items) => (children, 1 + items.len().to_string().len() + framed_len(children)),
            Value::Map(_) => (children, 1 + framed_len(children)),
            Value::MapClass(mc) => {
                let content = framed_len(mc.class_name().chars().count()) + children;
                (content, 1 + framed_len(content))
            }
        };
        entry.content_len = content_len;
        let key_len = entry.key.map_or(0, |k| framed_len(k.chars().count()));
        sizes.push(key_len + MARKER.len() + header_len);
    }

    out.reserve(sizes.iter().sum());
    for entry in &entries {
        if let Some(key) = entry.key {
            out.push_str(&wrap_data(key));
        }
        out.push_str(MARKER);
        match entry.value {
            Value::None => out.push_str("$0:0:"),
            Value::String(s) => {
                out.push_str("$S");
                out.push_str(&wrap_data(s));
            }
            Value::List(items) => {
                out.push('[');
                out.push_str(&items.len().to_string());
                push_length(entry.content_len, out);
            }
            Value::Map(_) => {
                out.push('{');
                push_length(entry.content_len, out);
            }
            Value::MapClass(mc) => {
                out.push('%');
                push_length(entry.content_len, out);
                out.push_str(&wrap_data(mc.class_name()));
            }
        }
    }
}

fn push_length(len: usize, out: &mut String) {
    out.push(':');
    out.push_str(&len.to_string());
    out.push(':');
}
