//! Runtime library configuration

use std::env;
use std::path::PathBuf;

/// Environment variable naming an explicit library path
pub const LIBRARY_ENV: &str = "STAFKIT_LIBRARY";

/// Where to find the STAF runtime library
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    /// Explicit path; when set, only this is tried
    pub library: Option<PathBuf>,
    /// Names handed to the platform loader, in order, when `library` is unset
    pub candidates: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            library: None,
            candidates: vec![
                "STAF".into(),
                "libSTAF.so".into(),
                "libSTAF.dylib".into(),
                "STAF.dll".into(),
            ],
        }
    }
}

impl ApiConfig {
    /// Defaults, with `library` taken from `STAFKIT_LIBRARY` when it is set and non-empty.
    pub fn from_env() -> Self {
        Self::default().with_library_from(env::var_os(LIBRARY_ENV).map(PathBuf::from))
    }

    /// Use exactly this library.
    pub fn with_library(mut self, path: impl Into<PathBuf>) -> Self {
        self.library = Some(path.into());
        self
    }

    fn with_library_from(mut self, path: Option<PathBuf>) -> Self {
        if let Some(p) = path.filter(|p| !p.as_os_str().is_empty()) {
            self.library = Some(p);
        }
        self
    }

    /// Library names/paths to try, in order.
    pub fn search_order(&self) -> Vec<PathBuf> {
        match &self.library {
            Some(path) => vec![path.clone()],
            None => self.candidates.iter().map(PathBuf::from).collect(),
        }
    }
}
