//! The seam between [`Handle`](crate::Handle) and the STAF runtime
//!
//! [`NativeApi`](crate::NativeApi) implements [`StafApi`] over the C
//! library. Other implementations (an in-process service table in tests, a
//! recording proxy) plug in the same way.

use std::fmt;
use std::str::FromStr;

use crate::error::StafError;
use crate::rc::Rc;

/// How a request is submitted (`STAFSyncOption_t`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u32)]
pub enum SyncOption {
    /// Wait for the result
    #[default]
    Synchronous = 0,
    /// Return the request number immediately, discard the result
    FireAndForget = 1,
    /// Return the request number; the result is queued to the handle
    Queue = 2,
    /// Return the request number; the result is kept until freed
    Retain = 3,
    /// Both queue and retain the result
    QueueRetain = 4,
}

impl SyncOption {
    pub fn as_raw(self) -> u32 {
        self as u32
    }

    pub fn name(self) -> &'static str {
        match self {
            SyncOption::Synchronous => "sync",
            SyncOption::FireAndForget => "fire-and-forget",
            SyncOption::Queue => "queue",
            SyncOption::Retain => "retain",
            SyncOption::QueueRetain => "queue-retain",
        }
    }
}

impl fmt::Display for SyncOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SyncOption {
    type Err = StafError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sync" | "synchronous" => Ok(SyncOption::Synchronous),
            "fire-and-forget" | "fireandforget" => Ok(SyncOption::FireAndForget),
            "queue" => Ok(SyncOption::Queue),
            "retain" => Ok(SyncOption::Retain),
            "queue-retain" | "queueretain" => Ok(SyncOption::QueueRetain),
            other => Err(StafError::usage(format!("unknown sync option: {}", other))),
        }
    }
}

/// What came back from a submit: the return code and the raw result bytes.
///
/// The result can be non-empty on failure; it then usually holds more detail.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Submission {
    pub rc: Rc,
    pub result: Vec<u8>,
}

impl Submission {
    pub fn ok(result: impl Into<Vec<u8>>) -> Self {
        Self {
            rc: 0,
            result: result.into(),
        }
    }

    pub fn failed(rc: Rc, result: impl Into<Vec<u8>>) -> Self {
        Self {
            rc,
            result: result.into(),
        }
    }
}

/// The three calls a handle needs from the runtime.
///
/// Errors are raw return codes; [`Handle`](crate::Handle) maps them to
/// [`StafError`]s.
pub trait StafApi: Send + Sync {
    /// Register a new handle under `name`, returning its number.
    fn register(&self, name: &str) -> Result<u32, Rc>;

    fn unregister(&self, handle: u32) -> Result<(), Rc>;

    /// Submit `request` to `service` on `location`.
    fn submit(
        &self,
        handle: u32,
        sync: SyncOption,
        location: &str,
        service: &str,
        request: &[u8],
    ) -> Submission;
}
