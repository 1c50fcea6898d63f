//! STAF marshalling format
//!
//! Results come back from services as text. Structured results are
//! "marshalled": they start with the `@SDT/` marker, followed by a type
//! indicator and colon-length-colon framed content:
//!
//! ```text
//! @SDT/$0:0:                  none
//! @SDT/$S:3:foo               string "foo"
//! @SDT/[2:<len>:<e1><e2>      list of 2 entries
//! @SDT/{:<len>::3:key<entry>  map, each value preceded by a framed key
//! @SDT/%:<len>::5:Class<e..>  map class instance, one entry per class key
//! @SDT/*:<len>:<ctx><root>    context: map-class definitions, then the root
//! ```
//!
//! Lengths count characters, not bytes.

mod decode;
mod encode;

pub use decode::{unmarshal, unmarshal_force};
pub use encode::{marshal, marshal_into};

/// Prefix of every marshalled entry
pub const MARKER: &str = "@SDT/";

/// Context map key holding the map class definitions
pub(crate) const MAP_CLASS_MAP: &str = "map-class-map";

/// How a result string should be unmarshalled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnmarshalMode {
    /// Decode, and also decode string scalars that are themselves marshalled data
    #[default]
    Recursive,
    /// Decode the top level only; nested marshalled strings stay strings
    NonRecursive,
    /// Don't decode; results are returned as plain strings
    None,
}

/// Whether `data` looks like marshalled data (starts with the marker).
pub fn is_marshalled(data: &str) -> bool {
    data.starts_with(MARKER)
}

/// Frame `data` as `:<len>:<data>`, with the length counted in characters.
///
/// This is the same framing used to escape request option values.
pub fn wrap_data(data: &str) -> String {
    format!(":{}:{}", data.chars().count(), data)
}
