use std::backtrace::{Backtrace, BacktraceStatus};
use std::error::Error;
use std::fmt;

pub type Result<T, E = UdxError> = std::result::Result<T, E>;

/// Broad category of an error.
///
/// Every category is fatal for the instance that hit it. The kind exists so
/// the boundary layer can decide what to abort (the whole job for schema and
/// config errors, just the current instance for the rest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Wrong arity, wrong column type, missing partition/order metadata.
    Schema,
    /// Input bytes or values that can't be interpreted.
    MalformedInput,
    /// File not found, failed seek, failed read.
    Resource,
    /// Buffer too small to make progress.
    Capacity,
    /// Invalid setting or parameter value.
    Config,
    /// The caller broke an ordering or delivery guarantee.
    Contract,
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Schema => "schema error",
            Self::MalformedInput => "malformed input",
            Self::Resource => "resource error",
            Self::Capacity => "capacity error",
            Self::Config => "configuration error",
            Self::Contract => "contract violation",
            Self::Internal => "internal error",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug)]
pub struct UdxError {
    inner: Box<UdxErrorInner>,
}

#[derive(Debug)]
struct UdxErrorInner {
    kind: ErrorKind,
    msg: String,
    source: Option<Box<dyn Error + Send + Sync>>,
    /// Extra key/value context attached to the error.
    fields: Vec<(String, String)>,
    backtrace: Backtrace,
}

impl UdxError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::Internal, msg)
    }

    pub fn with_kind(kind: ErrorKind, msg: impl Into<String>) -> Self {
        UdxError {
            inner: Box::new(UdxErrorInner {
                kind,
                msg: msg.into(),
                source: None,
                fields: Vec::new(),
                backtrace: Backtrace::capture(),
            }),
        }
    }

    pub fn schema(msg: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::Schema, msg)
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::MalformedInput, msg)
    }

    pub fn resource(msg: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::Resource, msg)
    }

    pub fn capacity(msg: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::Capacity, msg)
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::Config, msg)
    }

    pub fn contract(msg: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::Contract, msg)
    }

    pub fn with_source(mut self, source: impl Into<Box<dyn Error + Send + Sync>>) -> Self {
        self.inner.source = Some(source.into());
        self
    }

    /// Attach a field to the error, rendered as `key: value` after the
    /// message.
    pub fn with_field(mut self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        self.inner.fields.push((key.into(), value.to_string()));
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.inner.kind
    }

    pub fn message(&self) -> &str {
        &self.inner.msg
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner
            .fields
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn get_field(&self, key: &str) -> Option<&str> {
        self.fields().find(|(k, _)| *k == key).map(|(_, v)| v)
    }

    pub fn get_backtrace(&self) -> Option<&Backtrace> {
        match self.inner.backtrace.status() {
            BacktraceStatus::Captured => Some(&self.inner.backtrace),
            _ => None,
        }
    }
}

impl fmt::Display for UdxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.inner.kind, self.inner.msg)?;

        for (key, value) in &self.inner.fields {
            write!(f, "\n  {key}: {value}")?;
        }

        if let Some(source) = &self.inner.source {
            write!(f, "\nError source: {source}")?;
        }

        Ok(())
    }
}

impl Error for UdxError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.inner.source.as_ref().map(|e| e.as_ref() as _)
    }
}

impl From<std::io::Error> for UdxError {
    fn from(value: std::io::Error) -> Self {
        UdxError::resource("IO error").with_source(value)
    }
}

impl From<std::fmt::Error> for UdxError {
    fn from(value: std::fmt::Error) -> Self {
        UdxError::new("Format error").with_source(value)
    }
}

/// Wrap foreign errors with a message.
///
/// A wrapped `UdxError` keeps its kind, anything else becomes a resource
/// error since the foreign errors we wrap come from IO and parsing in the
/// boundary code.
pub trait ResultExt<T, E> {
    fn context(self, msg: &'static str) -> Result<T>;

    fn context_fn<F>(self, f: F) -> Result<T>
    where
        F: Fn() -> String;
}

impl<T, E: Error + Send + Sync + 'static> ResultExt<T, E> for std::result::Result<T, E> {
    fn context(self, msg: &'static str) -> Result<T> {
        match self {
            Ok(v) => Ok(v),
            Err(e) => Err(wrap(msg.to_string(), e)),
        }
    }

    fn context_fn<F>(self, f: F) -> Result<T>
    where
        F: Fn() -> String,
    {
        match self {
            Ok(v) => Ok(v),
            Err(e) => Err(wrap(f(), e)),
        }
    }
}

fn wrap<E: Error + Send + Sync + 'static>(msg: String, err: E) -> UdxError {
    let boxed: Box<dyn Error + Send + Sync> = Box::new(err);
    let kind = match boxed.downcast_ref::<UdxError>() {
        Some(inner) => inner.kind(),
        None => ErrorKind::Resource,
    };
    UdxError::with_kind(kind, msg).with_source(boxed)
}

pub trait OptionExt<T> {
    /// Return an internal error naming `what` if the option is None.
    fn required(self, what: &'static str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn required(self, what: &'static str) -> Result<T> {
        match self {
            Some(v) => Ok(v),
            None => Err(UdxError::new(format!("Missing required value: {what}"))),
        }
    }
}

/// Return a "not implemented" error from the enclosing function.
#[macro_export]
macro_rules! not_implemented {
    ($($arg:tt)+) => {{
        let msg = format!($($arg)+);
        return Err($crate::UdxError::new(format!("Not yet implemented: {msg}")));
    }};
}
