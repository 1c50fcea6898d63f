//! stafkit: Rust bindings for the STAF automation framework
//!
//! # Overview
//!
//! A program talks to STAF through a [`Handle`]. A handle is registered with
//! the local runtime, submits requests to services (local or on other
//! machines) and is unregistered when dropped. Results come back as text; if
//! they are marshalled (`@SDT/...`) they are decoded into a [`Value`] tree.
//!
//! ```no_run
//! use std::sync::Arc;
//! use stafkit::{ApiConfig, Handle, NativeApi, Value};
//!
//! # fn main() -> stafkit::Result<()> {
//! let api = Arc::new(NativeApi::load(&ApiConfig::from_env())?);
//! let handle = Handle::register(api, "example")?;
//!
//! // A raw request string...
//! let services = handle.submit("local", "service", "list")?;
//! for service in services.as_list().unwrap_or_default() {
//!     println!("{:?}", service.get("name"));
//! }
//!
//! // ...or option/value tokens; values are framed, so they need no quoting.
//! let handles = handle.submit("local", "handle", ["list handles name", "example", "long"])?;
//! assert!(matches!(handles, Value::List(_)));
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`marshal`] | `@SDT/` decoder and encoder |
//! | [`rc`] | Return-code table |
//! | [`privacy`] | `!!@ … @!!` privacy delimiter helpers |
//!
//! The runtime is reached through the [`StafApi`] trait; [`NativeApi`] loads
//! the C library with `libloading`.

mod api;
mod config;
mod error;
mod format;
mod handle;
mod mapclass;
pub mod marshal;
mod native;
pub mod privacy;
pub mod rc;
mod request;
mod value;

pub use api::{StafApi, Submission, SyncOption};
pub use config::{ApiConfig, LIBRARY_ENV};
pub use error::{Result, StafError};
pub use format::format_object;
pub use handle::{Handle, SubmitOptions};
pub use mapclass::{MapClass, MapClassDefinition, MapClassItem};
pub use marshal::{is_marshalled, marshal, unmarshal, unmarshal_force, wrap_data, UnmarshalMode};
pub use native::NativeApi;
pub use privacy::{
    add_privacy_delimiters, escape_privacy_delimiters, mask_private_data,
    remove_privacy_delimiters,
};
pub use rc::{rc_name, strerror, Rc};
pub use request::{Request, RequestBuilder};
pub use value::{Map, Value};
