//! Request strings
//!
//! A request is either a raw string, sent as-is, or a sequence of tokens
//! alternating between option names and option values. Values are framed
//! with [`wrap_data`] so they never need quoting; option names are sent
//! verbatim, so several options may share one token (`"list handles name"`).

use crate::error::{Result, StafError};
use crate::marshal::wrap_data;

/// A service request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Sent verbatim
    Raw(String),
    /// Alternating option / value tokens, starting with an option
    Tokens(Vec<String>),
}

impl Request {
    /// Start building a token request.
    pub fn builder() -> RequestBuilder {
        RequestBuilder::default()
    }

    /// The request string that goes on the wire.
    pub fn encode(&self) -> Result<String> {
        match self {
            Request::Raw(s) => Ok(s.clone()),
            Request::Tokens(tokens) => encode_tokens(tokens),
        }
    }
}

fn encode_tokens(tokens: &[String]) -> Result<String> {
    if tokens.is_empty() {
        return Err(StafError::usage("request has no tokens"));
    }

    let mut parts = Vec::with_capacity(tokens.len());
    for (i, token) in tokens.iter().enumerate() {
        if i % 2 == 0 {
            if token.is_empty() {
                return Err(StafError::usage(format!(
                    "request token {} is an empty option name",
                    i + 1
                )));
            }
            parts.push(token.clone());
        } else {
            parts.push(wrap_data(token));
        }
    }
    Ok(parts.join(" "))
}

impl From<&str> for Request {
    fn from(s: &str) -> Self {
        Request::Raw(s.to_string())
    }
}

impl From<String> for Request {
    fn from(s: String) -> Self {
        Request::Raw(s)
    }
}

impl From<&String> for Request {
    fn from(s: &String) -> Self {
        Request::Raw(s.clone())
    }
}

impl From<Vec<String>> for Request {
    fn from(tokens: Vec<String>) -> Self {
        Request::Tokens(tokens)
    }
}

impl From<&[&str]> for Request {
    fn from(tokens: &[&str]) -> Self {
        Request::Tokens(tokens.iter().map(|t| t.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Request {
    fn from(tokens: [&str; N]) -> Self {
        Request::Tokens(tokens.iter().map(|t| t.to_string()).collect())
    }
}

impl From<Vec<&str>> for Request {
    fn from(tokens: Vec<&str>) -> Self {
        Request::Tokens(tokens.into_iter().map(String::from).collect())
    }
}

/// Builds a token [`Request`] one option or value at a time.
///
/// ```
/// use stafkit::Request;
///
/// let req = Request::builder()
///     .option("list handles")
///     .option("name")
///     .value("test handle")
///     .option("long")
///     .build()
///     .unwrap();
/// assert_eq!(req.encode().unwrap(), "list handles name :11:test handle long");
/// ```
#[derive(Debug, Clone, Default)]
pub struct RequestBuilder {
    tokens: Vec<String>,
    /// set when the last call was `option`
    pending_option: bool,
    error: Option<String>,
}

impl RequestBuilder {
    /// Append an option name. Consecutive options share one token.
    pub fn option(mut self, name: impl AsRef<str>) -> Self {
        let name = name.as_ref();
        if self.pending_option {
            if let Some(last) = self.tokens.last_mut() {
                if !name.is_empty() {
                    last.push(' ');
                    last.push_str(name);
                }
            }
        } else {
            self.tokens.push(name.to_string());
            self.pending_option = true;
        }
        self
    }

    /// Append a value for the preceding option.
    pub fn value(mut self, value: impl Into<String>) -> Self {
        if !self.pending_option {
            if self.error.is_none() {
                self.error = Some(format!(
                    "value at token {} does not follow an option",
                    self.tokens.len() + 1
                ));
            }
            return self;
        }
        self.tokens.push(value.into());
        self.pending_option = false;
        self
    }

    pub fn build(self) -> Result<Request> {
        if let Some(e) = self.error {
            return Err(StafError::usage(e));
        }
        if self.tokens.is_empty() {
            return Err(StafError::usage("request has no tokens"));
        }
        Ok(Request::Tokens(self.tokens))
    }
}
