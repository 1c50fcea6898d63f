//! Map classes
//!
//! A map class is a named schema for map-shaped results: an ordered list of
//! keys, each with a display name and an optional short display name.
//! Instances ([`MapClass`]) hold exactly one value per key, always iterated in
//! definition order.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{Result, StafError};
use crate::value::Value;

/// One key of a map class definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapClassItem {
    pub key: String,
    pub display_name: String,
    pub display_short_name: Option<String>,
}

/// A map class definition: class name plus ordered keys and their display names.
#[derive(Debug, Clone)]
pub struct MapClassDefinition {
    name: String,
    items: Vec<MapClassItem>,
    /// key → position in `items`
    index: HashMap<String, usize>,
}

impl MapClassDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            items: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add a key with its display names.
    ///
    /// Re-adding an existing key replaces its display names and keeps its position.
    pub fn add_item(
        &mut self,
        key: impl Into<String>,
        display_name: impl Into<String>,
        display_short_name: Option<impl Into<String>>,
    ) -> &mut Self {
        let item = MapClassItem {
            key: key.into(),
            display_name: display_name.into(),
            display_short_name: display_short_name.map(Into::into),
        };
        match self.index.get(&item.key) {
            Some(&idx) => self.items[idx] = item,
            None => {
                self.index.insert(item.key.clone(), self.items.len());
                self.items.push(item);
            }
        }
        self
    }

    /// Builder form of [`add_item`](Self::add_item).
    pub fn with_item(
        mut self,
        key: impl Into<String>,
        display_name: impl Into<String>,
        display_short_name: Option<&str>,
    ) -> Self {
        self.add_item(key, display_name, display_short_name);
        self
    }

    pub fn items(&self) -> &[MapClassItem] {
        &self.items
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(|i| i.key.as_str())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn position(&self, key: &str) -> Option<usize> {
        self.index.get(key).copied()
    }

    pub fn item(&self, key: &str) -> Option<&MapClassItem> {
        self.position(key).map(|idx| &self.items[idx])
    }

    pub fn display_name(&self, key: &str) -> Option<&str> {
        self.item(key).map(|i| i.display_name.as_str())
    }

    /// Short display name for `key`; `None` if the key is unknown or has no short name.
    pub fn display_short_name(&self, key: &str) -> Option<&str> {
        self.item(key).and_then(|i| i.display_short_name.as_deref())
    }

    /// Create an empty instance (every value `Value::None`) of this class.
    ///
    /// The instance takes a snapshot: later `add_item` calls don't affect it.
    pub fn map_class(&self) -> MapClass {
        MapClass::new(Arc::new(self.clone()))
    }
}

impl PartialEq for MapClassDefinition {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.items == other.items
    }
}

impl Eq for MapClassDefinition {}

/// An instance of a map class
#[derive(Clone)]
pub struct MapClass {
    definition: Arc<MapClassDefinition>,
    values: Vec<Value>,
}

impl MapClass {
    pub fn new(definition: Arc<MapClassDefinition>) -> Self {
        let values = vec![Value::None; definition.len()];
        Self { definition, values }
    }

    /// Build an instance from values already in definition order.
    pub(crate) fn from_values(definition: Arc<MapClassDefinition>, values: Vec<Value>) -> Self {
        debug_assert_eq!(definition.len(), values.len());
        Self { definition, values }
    }

    pub fn class_name(&self) -> &str {
        self.definition.name()
    }

    pub fn definition(&self) -> &MapClassDefinition {
        &self.definition
    }

    pub fn shared_definition(&self) -> &Arc<MapClassDefinition> {
        &self.definition
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.definition.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.definition.position(key).map(|idx| &self.values[idx])
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        let idx = self.definition.position(key)?;
        Some(&mut self.values[idx])
    }

    /// Set the value for `key`, returning the previous one.
    ///
    /// Keys not in the definition are rejected: map class instances can't grow.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> Result<Value> {
        let idx = self.definition.position(key).ok_or_else(|| {
            StafError::usage(format!(
                "key {:?} is not in map class {:?}",
                key,
                self.class_name()
            ))
        })?;
        Ok(std::mem::replace(&mut self.values[idx], value.into()))
    }

    /// Set several values at once. Nothing is changed if any key is unknown.
    pub fn update<K, V, I>(&mut self, entries: I) -> Result<()>
    where
        K: AsRef<str>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut staged = Vec::new();
        for (key, value) in entries {
            let key = key.as_ref();
            let idx = self.definition.position(key).ok_or_else(|| {
                StafError::usage(format!(
                    "key {:?} is not in map class {:?}",
                    key,
                    self.class_name()
                ))
            })?;
            staged.push((idx, value.into()));
        }
        for (idx, value) in staged {
            self.values[idx] = value;
        }
        Ok(())
    }

    /// Builder form of [`set`](Self::set).
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Result<Self> {
        self.set(key, value)?;
        Ok(self)
    }

    pub fn display_name(&self, key: &str) -> Option<&str> {
        self.definition.display_name(key)
    }

    pub fn display_short_name(&self, key: &str) -> Option<&str> {
        self.definition.display_short_name(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.definition.keys()
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.values.iter()
    }

    /// `(key, value)` pairs in definition order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.definition.keys().zip(self.values.iter())
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    /// Move the values out, leaving the instance empty. Only for tearing down.
    pub(crate) fn take_values(&mut self) -> Vec<Value> {
        std::mem::take(&mut self.values)
    }

    /// Whether both instances are of the same class definition.
    pub(crate) fn same_class(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.definition, &other.definition) || self.definition == other.definition
    }
}

impl PartialEq for MapClass {
    fn eq(&self, other: &Self) -> bool {
        self.same_class(other) && self.values == other.values
    }
}

// Field order matters for map classes, so print them like an ordered map.
impl fmt::Debug for MapClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.class_name())?;
        f.debug_map().entries(self.iter()).finish()
    }
}
