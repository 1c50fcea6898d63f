//! Handles: registered sessions for submitting requests

use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::api::{StafApi, SyncOption};
use crate::error::{Result, StafError};
use crate::marshal::{unmarshal, UnmarshalMode};
use crate::rc;
use crate::request::Request;
use crate::value::Value;

/// Per-submit settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SubmitOptions {
    pub sync: SyncOption,
    pub unmarshal: UnmarshalMode,
}

impl SubmitOptions {
    pub fn sync(mut self, sync: SyncOption) -> Self {
        self.sync = sync;
        self
    }

    pub fn unmarshal(mut self, mode: UnmarshalMode) -> Self {
        self.unmarshal = mode;
        self
    }
}

/// A STAF handle.
///
/// A registered handle is unregistered when dropped, so the usual pattern is
/// to keep it in a local and let scope end its life:
///
/// ```no_run
/// use std::sync::Arc;
/// use stafkit::{ApiConfig, Handle, NativeApi};
///
/// # fn main() -> stafkit::Result<()> {
/// let api = Arc::new(NativeApi::load(&ApiConfig::from_env())?);
/// let handle = Handle::register(api, "my tool")?;
/// assert_eq!(handle.submit("local", "ping", "ping")?, "PONG");
/// # Ok(())
/// # }
/// ```
///
/// Static handles (created with `HANDLE CREATE`) are only wrapped; they are
/// never unregistered by this type.
pub struct Handle {
    api: Arc<dyn StafApi>,
    number: u32,
    name: Option<String>,
    is_static: bool,
    registered: bool,
}

impl Handle {
    /// Register a new handle called `name`.
    pub fn register(api: Arc<dyn StafApi>, name: &str) -> Result<Self> {
        let number = api.register(name).map_err(StafError::registration)?;
        debug!(handle = number, name, "registered handle");
        Ok(Self {
            api,
            number,
            name: Some(name.to_string()),
            is_static: false,
            registered: true,
        })
    }

    /// Wrap an existing static handle.
    pub fn from_static(api: Arc<dyn StafApi>, number: u32) -> Self {
        Self {
            api,
            number,
            name: None,
            is_static: true,
            registered: true,
        }
    }

    /// Submit a request synchronously and unmarshal the result recursively.
    ///
    /// `request` is either a raw string or alternating option/value tokens;
    /// see [`Request`].
    pub fn submit(
        &self,
        location: &str,
        service: &str,
        request: impl Into<Request>,
    ) -> Result<Value> {
        self.submit_with(location, service, request, SubmitOptions::default())
    }

    /// Submit with explicit sync and unmarshal settings.
    ///
    /// A nonzero return code becomes [`StafError::Result`], carrying the
    /// result text, if any, as `extra`.
    pub fn submit_with(
        &self,
        location: &str,
        service: &str,
        request: impl Into<Request>,
        options: SubmitOptions,
    ) -> Result<Value> {
        let request = request.into().encode()?;
        debug!(
            handle = self.number,
            location,
            service,
            sync = %options.sync,
            "submitting request"
        );

        let submission =
            self.api
                .submit(self.number, options.sync, location, service, request.as_bytes());
        let text = String::from_utf8_lossy(&submission.result);

        if submission.rc != rc::OK {
            debug!(handle = self.number, rc = submission.rc, service, "request failed");
            return Err(StafError::result(submission.rc, Some(text.into_owned())));
        }
        Ok(unmarshal(&text, options.unmarshal))
    }

    /// Unregister the handle.
    ///
    /// Calling this again, or on a static handle, does nothing. A handle the
    /// runtime no longer knows about (for example after a restart) counts as
    /// unregistered.
    pub fn unregister(&mut self) -> Result<()> {
        if self.is_static || !self.registered {
            return Ok(());
        }

        let number = self.number;
        match self.api.unregister(number) {
            Ok(()) => debug!(handle = number, "unregistered handle"),
            Err(rc::HANDLE_DOES_NOT_EXIST) => {
                debug!(handle = number, "handle was already gone")
            }
            Err(code) => return Err(StafError::result(code, None)),
        }
        self.registered = false;
        self.number = 0;
        Ok(())
    }

    /// The handle number; 0 once unregistered.
    pub fn number(&self) -> u32 {
        self.number
    }

    /// The registration name; `None` for static handles.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn is_static(&self) -> bool {
        self.is_static
    }

    /// Whether the handle is still usable. Static handles always are.
    pub fn is_registered(&self) -> bool {
        self.registered
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        if let Err(e) = self.unregister() {
            warn!(handle = self.number, error = %e, "failed to unregister handle on drop");
        }
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_static {
            write!(f, "<STAF Static Handle {}>", self.number)
        } else {
            write!(f, "<STAF Handle {}>", self.number)
        }
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("number", &self.number)
            .field("name", &self.name)
            .field("is_static", &self.is_static)
            .field("registered", &self.registered)
            .finish()
    }
}
