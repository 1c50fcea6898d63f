//! Binding errors

use crate::rc::{self, Rc};

/// Errors surfaced by the binding.
///
/// Every variant is a `std::error::Error`, so callers can catch broadly with
/// `Box<dyn Error>`/`anyhow`, or match a specific kind.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StafError {
    /// Registering a handle with the native runtime failed
    #[error("[RC {rc}] {description}")]
    Registration { rc: Rc, description: String },

    /// A request or API call came back with a nonzero return code
    #[error("[RC {rc}] {description}{}", fmt_extra(.extra))]
    Result {
        rc: Rc,
        description: String,
        /// Raw result text returned alongside the RC, if any
        extra: Option<String>,
    },

    /// Marshalled data could not be decoded
    #[error("unmarshal error: {0}")]
    Unmarshal(String),

    /// The binding was used incorrectly (bad request tokens, unknown map class key)
    #[error("usage error: {0}")]
    Usage(String),

    /// The native library could not be loaded
    #[error("library error: {0}")]
    Library(String),
}

/// The extra text is often a multi-line dump; only keep it when it fits on one line.
fn fmt_extra(extra: &Option<String>) -> String {
    match extra {
        Some(e) if !e.is_empty() && !e.contains('\n') => format!(" ({})", e),
        _ => String::new(),
    }
}

impl StafError {
    pub fn registration(rc: Rc) -> Self {
        Self::Registration {
            rc,
            description: rc::strerror(rc).to_string(),
        }
    }

    /// Build a result error, looking the description up in the return-code table.
    pub fn result(rc: Rc, extra: Option<String>) -> Self {
        Self::Result {
            rc,
            description: rc::strerror(rc).to_string(),
            extra: extra.filter(|e| !e.is_empty()),
        }
    }

    pub fn unmarshal(msg: impl Into<String>) -> Self {
        Self::Unmarshal(msg.into())
    }

    pub fn usage(msg: impl Into<String>) -> Self {
        Self::Usage(msg.into())
    }

    /// Numeric return code, for the variants that carry one.
    pub fn rc(&self) -> Option<Rc> {
        match self {
            Self::Registration { rc, .. } | Self::Result { rc, .. } => Some(*rc),
            _ => None,
        }
    }

    /// Human-readable description without the `[RC n]` prefix.
    pub fn description(&self) -> &str {
        match self {
            Self::Registration { description, .. } | Self::Result { description, .. } => {
                description
            }
            Self::Unmarshal(msg) | Self::Usage(msg) | Self::Library(msg) => msg,
        }
    }

    /// Raw result text attached to a result error.
    pub fn extra(&self) -> Option<&str> {
        match self {
            Self::Result { extra, .. } => extra.as_deref(),
            _ => None,
        }
    }

    pub fn is_unmarshal(&self) -> bool {
        matches!(self, Self::Unmarshal(_))
    }

    pub fn is_usage(&self) -> bool {
        matches!(self, Self::Usage(_))
    }
}

pub type Result<T> = std::result::Result<T, StafError>;
