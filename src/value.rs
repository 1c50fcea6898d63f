//! Unmarshalled result values
//!
//! Results can nest as deeply as the input allows, so the traits that walk a
//! whole tree (`Drop`, `Clone`, `PartialEq`) work from a heap stack instead of
//! recursing.

use std::sync::Arc;

use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

use crate::mapclass::MapClass;

/// An ordered string-keyed map, as decoded from the wire
pub type Map = IndexMap<String, Value>;

/// A decoded result
#[derive(Debug, Default)]
pub enum Value {
    /// The marshalled "none" scalar
    #[default]
    None,
    String(String),
    List(Vec<Value>),
    /// A plain map; keys keep their wire order
    Map(Map),
    /// A map class instance with schema metadata
    MapClass(MapClass),
}

impl Value {
    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Map> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_map_class(&self) -> Option<&MapClass> {
        match self {
            Value::MapClass(mc) => Some(mc),
            _ => None,
        }
    }

    /// Field lookup on either kind of map. `None` for other variants or a missing key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Map(map) => map.get(key),
            Value::MapClass(mc) => mc.get(key),
            _ => None,
        }
    }

    /// Consume a string value.
    pub fn into_string(mut self) -> Option<String> {
        match &mut self {
            Value::String(s) => Some(std::mem::take(s)),
            _ => None,
        }
    }

    /// Nesting depth: 1 for scalars and empty containers.
    pub fn depth(&self) -> usize {
        let mut max = 0;
        let mut pending = vec![(self, 1)];
        while let Some((value, depth)) = pending.pop() {
            max = max.max(depth);
            pending.extend(value.children().map(|child| (child, depth + 1)));
        }
        max
    }

    /// Direct children of a container, in order.
    pub(crate) fn children(&self) -> Box<dyn Iterator<Item = &Value> + '_> {
        match self {
            Value::List(items) => Box::new(items.iter()),
            Value::Map(map) => Box::new(map.values()),
            Value::MapClass(mc) => Box::new(mc.values()),
            Value::None | Value::String(_) => Box::new(std::iter::empty()),
        }
    }

    /// `(key, value)` pairs of a map or map class, in order; empty for other variants.
    pub fn entries(&self) -> Vec<(&str, &Value)> {
        match self {
            Value::Map(map) => map.iter().map(|(k, v)| (k.as_str(), v)).collect(),
            Value::MapClass(mc) => mc.iter().collect(),
            _ => Vec::new(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "none",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::MapClass(_) => "map class",
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::None, Into::into)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<Map> for Value {
    fn from(map: Map) -> Self {
        Value::Map(map)
    }
}

impl From<MapClass> for Value {
    fn from(mc: MapClass) -> Self {
        Value::MapClass(mc)
    }
}

impl PartialEq<&str> for Value {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == Some(*other)
    }
}

impl FromIterator<Value> for Value {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Value::List(iter.into_iter().collect())
    }
}

impl Drop for Value {
    fn drop(&mut self) {
        let mut pending = match self {
            Value::List(items) if !items.is_empty() => std::mem::take(items),
            Value::Map(map) if !map.is_empty() => map.drain(..).map(|(_, v)| v).collect(),
            Value::MapClass(mc) if !mc.is_empty() => mc.take_values(),
            _ => return,
        };
        // Children are emptied before they drop, so no drop below recurses.
        while let Some(mut value) = pending.pop() {
            match &mut value {
                Value::List(items) => pending.append(items),
                Value::Map(map) => pending.extend(map.drain(..).map(|(_, v)| v)),
                Value::MapClass(mc) => pending.extend(mc.take_values()),
                Value::None | Value::String(_) => {}
            }
        }
    }
}

impl Clone for Value {
    fn clone(&self) -> Self {
        enum Task<'a> {
            Visit(&'a Value),
            List(usize),
            Map(&'a Map),
            MapClass(&'a MapClass),
        }

        let mut tasks = vec![Task::Visit(self)];
        let mut built: Vec<Value> = Vec::new();
        while let Some(task) = tasks.pop() {
            match task {
                Task::Visit(Value::None) => built.push(Value::None),
                Task::Visit(Value::String(s)) => built.push(Value::String(s.clone())),
                Task::Visit(Value::List(items)) => {
                    tasks.push(Task::List(items.len()));
                    tasks.extend(items.iter().rev().map(Task::Visit));
                }
                Task::Visit(Value::Map(map)) => {
                    tasks.push(Task::Map(map));
                    tasks.extend(map.values().rev().map(Task::Visit));
                }
                Task::Visit(Value::MapClass(mc)) => {
                    tasks.push(Task::MapClass(mc));
                    let values: Vec<&Value> = mc.values().collect();
                    tasks.extend(values.into_iter().rev().map(Task::Visit));
                }
                Task::List(len) => {
                    let items = built.split_off(built.len() - len);
                    built.push(Value::List(items));
                }
                Task::Map(map) => {
                    let values = built.split_off(built.len() - map.len());
                    built.push(Value::Map(map.keys().cloned().zip(values).collect()));
                }
                Task::MapClass(mc) => {
                    let values = built.split_off(built.len() - mc.len());
                    built.push(Value::MapClass(MapClass::from_values(
                        Arc::clone(mc.shared_definition()),
                        values,
                    )));
                }
            }
        }
        built.pop().unwrap_or_default()
    }
}

/// Maps compare as maps (key order doesn't matter); map classes also
/// compare their class definitions.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        let mut pending = vec![(self, other)];
        while let Some(pair) = pending.pop() {
            match pair {
                (Value::None, Value::None) => {}
                (Value::String(a), Value::String(b)) => {
                    if a != b {
                        return false;
                    }
                }
                (Value::List(a), Value::List(b)) => {
                    if a.len() != b.len() {
                        return false;
                    }
                    pending.extend(a.iter().zip(b));
                }
                (Value::Map(a), Value::Map(b)) => {
                    if a.len() != b.len() {
                        return false;
                    }
                    for (key, va) in a {
                        match b.get(key) {
                            Some(vb) => pending.push((va, vb)),
                            None => return false,
                        }
                    }
                }
                (Value::MapClass(a), Value::MapClass(b)) => {
                    if !a.same_class(b) {
                        return false;
                    }
                    pending.extend(a.values().zip(b.values()));
                }
                _ => return false,
            }
        }
        true
    }
}

/// Serialization recurses once per nesting level; check [`Value::depth`]
/// before serializing untrusted, deeply nested results.
impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::None => serializer.serialize_none(),
            Value::String(s) => serializer.serialize_str(s),
            Value::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Map(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (k, v) in map {
                    out.serialize_entry(k, v)?;
                }
                out.end()
            }
            Value::MapClass(mc) => {
                let mut out = serializer.serialize_map(Some(mc.len()))?;
                for (k, v) in mc.iter() {
                    out.serialize_entry(k, v)?;
                }
                out.end()
            }
        }
    }
}
