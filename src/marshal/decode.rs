//! Result decoder
//!
//! Open containers are kept on an explicit frame stack rather than the call
//! stack, so nesting depth is bounded by the input size only. Every frame
//! holds the part of its framed content that hasn't been consumed yet.
//!
//! Map class definitions arrive in a context entry ahead of the data that
//! uses them. They live in a registry owned by the decoder; a context
//! replaces the registry for its root entry and restores the outer one when
//! it ends. A wire definition may list a key more than once; an instance then
//! carries one value per listed key and the last one is kept. A string scalar decoded recursively starts with an empty
//! registry, like a separate document.

use std::collections::HashMap;
use std::sync::Arc;

use super::{is_marshalled, UnmarshalMode, MAP_CLASS_MAP, MARKER};
use crate::error::{Result, StafError};
use crate::mapclass::{MapClass, MapClassDefinition};
use crate::value::{Map, Value};

/// Shortest possible entry (`@SDT/$0:0:`); bounds list preallocation.
const MIN_ENTRY_LEN: usize = 10;

type Registry = HashMap<String, Arc<WireClass>>;

/// A map class as declared in a context
struct WireClass {
    definition: Arc<MapClassDefinition>,
    /// Position in `definition` for each key entry on the wire
    slots: Vec<usize>,
}

/// Unmarshal `data`, falling back to the plain string.
///
/// Returns `Value::String(data)` if `mode` is [`UnmarshalMode::None`] or if
/// `data` is not valid marshalled data. Never fails.
pub fn unmarshal(data: &str, mode: UnmarshalMode) -> Value {
    if mode == UnmarshalMode::None || !is_marshalled(data) {
        return Value::String(data.to_string());
    }
    unmarshal_force(data, mode).unwrap_or_else(|e| {
        tracing::trace!(error = %e, "result is not valid marshalled data, keeping it as a string");
        Value::String(data.to_string())
    })
}

/// Unmarshal `data`, failing with [`StafError::Unmarshal`] if it isn't valid
/// marshalled data.
///
/// With [`UnmarshalMode::None`] the data is returned as a string unchanged.
pub fn unmarshal_force(data: &str, mode: UnmarshalMode) -> Result<Value> {
    if mode == UnmarshalMode::None {
        return Ok(Value::String(data.to_string()));
    }
    Decoder::new(data, mode).run(data)
}

fn bad_clc() -> StafError {
    StafError::unmarshal("bad format for colon-length-colon object")
}

fn too_long() -> StafError {
    StafError::unmarshal("specified length exceeds available data")
}

fn trailing() -> StafError {
    StafError::unmarshal("unexpected trailing data")
}

/// An open container
enum Frame<'a> {
    /// A complete document: the top-level input, or a string scalar being
    /// decoded recursively. Only the top-level document has no `outer`
    /// registry; the others fall back to their source string on error.
    Document {
        source: &'a str,
        rest: &'a str,
        value: Option<Value>,
        outer: Option<Registry>,
    },
    List {
        count: usize,
        items: Vec<Value>,
        rest: &'a str,
    },
    Map {
        map: Map,
        key: Option<String>,
        rest: &'a str,
    },
    MapClass {
        class: Arc<WireClass>,
        values: Vec<Value>,
        read: usize,
        rest: &'a str,
    },
    /// `outer` is set once the context map has been read and its
    /// definitions installed.
    Context {
        root: Option<Value>,
        outer: Option<Registry>,
        rest: &'a str,
    },
}

/// What a frame needs next
enum Step<'a> {
    /// Decode an entry from the start of this input
    Read(&'a str),
    /// The frame is complete
    Finish(Value),
}

/// A decoded entry header: either a complete value, or a new open container
enum Entry<'a> {
    Value(Value),
    Open(Frame<'a>),
}

impl<'a> Frame<'a> {
    fn set_rest(&mut self, rest: &'a str) {
        match self {
            Frame::Document { rest: r, .. }
            | Frame::List { rest: r, .. }
            | Frame::Map { rest: r, .. }
            | Frame::MapClass { rest: r, .. }
            | Frame::Context { rest: r, .. } => *r = rest,
        }
    }

    fn next(&mut self, ascii: bool) -> Result<Step<'a>> {
        match self {
            Frame::Document { rest, value, .. } => match value.take() {
                Some(v) if rest.is_empty() => Ok(Step::Finish(v)),
                Some(_) => Err(trailing()),
                None => Ok(Step::Read(*rest)),
            },
            Frame::List { count, items, rest } => {
                if items.len() < *count {
                    Ok(Step::Read(*rest))
                } else if !rest.is_empty() {
                    Err(trailing())
                } else {
                    Ok(Step::Finish(Value::List(std::mem::take(items))))
                }
            }
            Frame::Map { map, key, rest } => {
                if rest.is_empty() {
                    return Ok(Step::Finish(Value::Map(std::mem::take(map))));
                }
                let (k, after) = read_clc(*rest, ascii)?;
                *key = Some(k.to_string());
                *rest = after;
                Ok(Step::Read(after))
            }
            Frame::MapClass {
                class,
                values,
                read,
                rest,
            } => {
                if *read < class.slots.len() {
                    Ok(Step::Read(*rest))
                } else if !rest.is_empty() {
                    Err(trailing())
                } else {
                    let values = std::mem::take(values);
                    Ok(Step::Finish(Value::MapClass(MapClass::from_values(
                        Arc::clone(&class.definition),
                        values,
                    ))))
                }
            }
            Frame::Context { root, outer, rest } => {
                if outer.is_none() {
                    return Ok(Step::Read(*rest));
                }
                match root.take() {
                    Some(v) if rest.is_empty() => Ok(Step::Finish(v)),
                    Some(_) => Err(trailing()),
                    None => Ok(Step::Read(*rest)),
                }
            }
        }
    }

    /// The registry to restore when this frame is closed.
    fn into_outer(self) -> Option<Registry> {
        match self {
            Frame::Document { outer, .. } | Frame::Context { outer, .. } => outer,
            _ => None,
        }
    }
}

struct Decoder<'a> {
    mode: UnmarshalMode,
    /// Char counts equal byte counts, so framing can slice bytes directly
    ascii: bool,
    registry: Registry,
    stack: Vec<Frame<'a>>,
}

impl<'a> Decoder<'a> {
    fn new(data: &str, mode: UnmarshalMode) -> Self {
        Self {
            mode,
            ascii: data.is_ascii(),
            registry: Registry::new(),
            stack: Vec::new(),
        }
    }

    fn run(mut self, data: &'a str) -> Result<Value> {
        self.stack.push(Frame::Document {
            source: data,
            rest: data,
            value: None,
            outer: None,
        });
        loop {
            match self.step() {
                Ok(Some(value)) => return Ok(value),
                Ok(None) => {}
                Err(e) => self.recover(e)?,
            }
        }
    }

    /// Advance the top frame by one entry. Returns the final value once the
    /// top-level document is complete.
    fn step(&mut self) -> Result<Option<Value>> {
        let ascii = self.ascii;
        let top = match self.stack.last_mut() {
            Some(top) => top,
            None => return Err(StafError::unmarshal("decoder stack is empty")),
        };
        match top.next(ascii)? {
            Step::Read(input) => {
                let (entry, rest) = self.read_entry(input)?;
                if let Some(top) = self.stack.last_mut() {
                    top.set_rest(rest);
                }
                match entry {
                    Entry::Value(v) => self.deliver(v)?,
                    Entry::Open(frame) => self.stack.push(frame),
                }
                Ok(None)
            }
            Step::Finish(value) => {
                if let Some(outer) = self.stack.pop().and_then(Frame::into_outer) {
                    self.registry = outer;
                }
                if self.stack.is_empty() {
                    return Ok(Some(value));
                }
                self.deliver(value)?;
                Ok(None)
            }
        }
    }

    /// Hand a completed value to the frame on top of the stack.
    fn deliver(&mut self, value: Value) -> Result<()> {
        let Some(top) = self.stack.last_mut() else {
            return Err(StafError::unmarshal("decoder stack is empty"));
        };
        match top {
            Frame::Document { value: slot, .. } => *slot = Some(value),
            Frame::List { items, .. } => items.push(value),
            Frame::Map { map, key, .. } => {
                map.insert(key.take().unwrap_or_default(), value);
            }
            Frame::MapClass {
                class,
                values,
                read,
                ..
            } => {
                if let Some(slot) = class.slots.get(*read).and_then(|&i| values.get_mut(i)) {
                    *slot = value;
                }
                *read += 1;
            }
            Frame::Context { root, outer, .. } => {
                if outer.is_none() {
                    let defined = definitions_from_context(&value)?;
                    *outer = Some(std::mem::replace(&mut self.registry, defined));
                } else {
                    *root = Some(value);
                }
            }
        }
        Ok(())
    }

    /// Unwind to the innermost recursively-decoded string and keep it as a
    /// plain string. Errors outside any such string are returned.
    fn recover(&mut self, mut err: StafError) -> Result<()> {
        while let Some(frame) = self.stack.pop() {
            match frame {
                Frame::Document {
                    source,
                    outer: Some(outer),
                    ..
                } => {
                    tracing::trace!(error = %err, "nested string is not marshalled data");
                    self.registry = outer;
                    match self.deliver(Value::String(source.to_string())) {
                        Ok(()) => return Ok(()),
                        Err(e) => err = e,
                    }
                }
                Frame::Document { outer: None, .. } => return Err(err),
                other => {
                    if let Some(outer) = other.into_outer() {
                        self.registry = outer;
                    }
                }
            }
        }
        Err(err)
    }

    /// Decode one entry header from the start of `input`.
    ///
    /// Returns the entry and the input following it.
    fn read_entry(&mut self, input: &'a str) -> Result<(Entry<'a>, &'a str)> {
        let body = input
            .strip_prefix(MARKER)
            .ok_or_else(|| StafError::unmarshal("missing marshalled data marker"))?;
        let mut chars = body.chars();
        let symbol = chars
            .next()
            .ok_or_else(|| StafError::unmarshal("incomplete marshalled data"))?;
        let body = chars.as_str();

        match symbol {
            '$' => self.read_scalar(body),
            '{' => {
                let (content, rest) = read_clc(body, self.ascii)?;
                let frame = Frame::Map {
                    map: Map::new(),
                    key: None,
                    rest: content,
                };
                Ok((Entry::Open(frame), rest))
            }
            '[' => {
                let digits = body.bytes().take_while(u8::is_ascii_digit).count();
                if digits == 0 {
                    return Err(StafError::unmarshal("bad format for list object"));
                }
                let count: usize = body[..digits]
                    .parse()
                    .map_err(|_| StafError::unmarshal("bad format for list object"))?;
                let (content, rest) = read_clc(&body[digits..], self.ascii)?;
                let frame = Frame::List {
                    count,
                    items: Vec::with_capacity(count.min(content.len() / MIN_ENTRY_LEN)),
                    rest: content,
                };
                Ok((Entry::Open(frame), rest))
            }
            '%' => {
                let (content, rest) = read_clc(body, self.ascii)?;
                let (class_name, values) = read_clc(content, self.ascii)?;
                let class = self.registry.get(class_name).cloned().ok_or_else(|| {
                    StafError::unmarshal(format!(
                        "missing map class definition for {:?}",
                        class_name
                    ))
                })?;
                let frame = Frame::MapClass {
                    values: vec![Value::None; class.definition.len()],
                    class,
                    read: 0,
                    rest: values,
                };
                Ok((Entry::Open(frame), rest))
            }
            '*' => {
                let (content, rest) = read_clc(body, self.ascii)?;
                let frame = Frame::Context {
                    root: None,
                    outer: None,
                    rest: content,
                };
                Ok((Entry::Open(frame), rest))
            }
            _ => Err(StafError::unmarshal("unrecognized data type indicator")),
        }
    }

    fn read_scalar(&mut self, body: &'a str) -> Result<(Entry<'a>, &'a str)> {
        let kind = body.as_bytes().first().copied();
        if kind != Some(b'0') && kind != Some(b'S') {
            return Err(StafError::unmarshal("bad format for scalar object"));
        }
        let (obj, rest) = read_clc(&body[1..], self.ascii)?;

        if kind == Some(b'0') {
            if !obj.is_empty() {
                return Err(StafError::unmarshal("bad format for none object"));
            }
            return Ok((Entry::Value(Value::None), rest));
        }

        if self.mode == UnmarshalMode::Recursive && is_marshalled(obj) {
            let frame = Frame::Document {
                source: obj,
                rest: obj,
                value: None,
                outer: Some(std::mem::take(&mut self.registry)),
            };
            return Ok((Entry::Open(frame), rest));
        }
        Ok((Entry::Value(Value::String(obj.to_string())), rest))
    }
}

/// Read a colon-length-colon framed object: `:<len>:<len chars of data>`.
///
/// Returns the object and everything after it.
fn read_clc(data: &str, ascii: bool) -> Result<(&str, &str)> {
    let body = data.strip_prefix(':').ok_or_else(bad_clc)?;
    let digits = body.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return Err(bad_clc());
    }
    let rest = body[digits..].strip_prefix(':').ok_or_else(bad_clc)?;
    // A length too large for usize can't fit in the data either.
    let len: usize = body[..digits].parse().map_err(|_| too_long())?;
    split_chars(rest, len, ascii).ok_or_else(too_long)
}

/// Split `s` after `n` characters.
fn split_chars(s: &str, n: usize, ascii: bool) -> Option<(&str, &str)> {
    if ascii {
        return (n <= s.len()).then(|| s.split_at(n));
    }
    let end = s
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(s.len()))
        .nth(n)?;
    Some(s.split_at(end))
}

/// Build the map class registry from a context map.
fn definitions_from_context(context: &Value) -> Result<Registry> {
    let context = context
        .as_map()
        .ok_or_else(|| StafError::unmarshal("context is not a map"))?;
    let mut registry = Registry::new();
    let Some(class_map) = context.get(MAP_CLASS_MAP) else {
        return Ok(registry);
    };
    let class_map = class_map
        .as_map()
        .ok_or_else(|| StafError::unmarshal("bad format for map class map"))?;

    for (name, info) in class_map {
        let bad = || StafError::unmarshal(format!("bad format for map class definition {:?}", name));
        let keys = info.get("keys").and_then(Value::as_list).ok_or_else(bad)?;
        let mut definition = MapClassDefinition::new(name.clone());
        let mut slots = Vec::with_capacity(keys.len());
        for item in keys {
            let key = item.get("key").and_then(Value::as_str).ok_or_else(bad)?;
            let display_name = item.get("display-name").and_then(Value::as_str).ok_or_else(bad)?;
            let short = item.get("display-short-name").and_then(Value::as_str);
            definition.add_item(key, display_name, short);
            slots.push(definition.position(key).ok_or_else(bad)?);
        }
        let class = WireClass {
            definition: Arc::new(definition),
            slots,
        };
        registry.insert(name.clone(), Arc::new(class));
    }
    Ok(registry)
}
