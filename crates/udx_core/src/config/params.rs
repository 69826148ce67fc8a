use std::collections::HashMap;

use udx_error::{Result, UdxError};

use crate::arrays::scalar::ScalarValue;

/// Named parameters passed to a function instance (`USING PARAMETERS ...`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NamedParams {
    params: HashMap<String, ScalarValue>,
}

impl NamedParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<ScalarValue>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<ScalarValue>) {
        self.params.insert(name.into(), value.into());
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.params.keys().map(|k| k.as_str())
    }

    pub fn get(&self, name: &str) -> Option<&ScalarValue> {
        self.params.get(name)
    }

    pub fn get_string(&self, name: &str) -> Result<Option<&str>> {
        match self.params.get(name) {
            None | Some(ScalarValue::Null) => Ok(None),
            Some(v) => v.try_as_str().map(Some).map_err(|e| {
                UdxError::config(format!("Parameter '{name}' must be a string")).with_source(e)
            }),
        }
    }

    pub fn require_string(&self, name: &str) -> Result<&str> {
        self.get_string(name)?
            .ok_or_else(|| UdxError::config(format!("Required parameter \"{name}\" not found")))
    }

    pub fn get_i64(&self, name: &str) -> Result<Option<i64>> {
        match self.params.get(name) {
            None | Some(ScalarValue::Null) => Ok(None),
            Some(v) => v.try_as_i64().map(Some).map_err(|e| {
                UdxError::config(format!("Parameter '{name}' must be an integer")).with_source(e)
            }),
        }
    }

    /// Split a comma separated string parameter into its trimmed, non-empty
    /// parts.
    pub fn get_list(&self, name: &str) -> Result<Option<Vec<String>>> {
        let s = match self.get_string(name)? {
            Some(s) => s,
            None => return Ok(None),
        };
        Ok(Some(
            s.split(',')
                .map(|p| p.trim())
                .filter(|p| !p.is_empty())
                .map(|p| p.to_string())
                .collect(),
        ))
    }
}

impl<K, V> FromIterator<(K, V)> for NamedParams
where
    K: Into<String>,
    V: Into<ScalarValue>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        NamedParams {
            params: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
