//! Path parameters bound by a route match.
//!
//! # Design Decisions
//! - Ordered pairs, not a map: routes bind a handful of params and a scan
//!   beats hashing at that size
//! - Values are the raw matched segment text; decoding is the handler's call
//! - Cleared between requests, keeping the allocation

use std::fmt;
use std::str::FromStr;

use crate::context::binding::BindError;

/// One bound path parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub key: String,
    pub value: String,
}

/// The ordered parameters bound for one request.
#[derive(Debug, Default)]
pub struct Params(Vec<Param>);

impl Params {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self(Vec::with_capacity(capacity))
    }

    pub(crate) fn push(&mut self, key: &str, value: &str) {
        self.0.push(Param {
            key: key.to_string(),
            value: value.to_string(),
        });
    }

    pub(crate) fn clear(&mut self) {
        self.0.clear();
    }

    /// The value bound under `name`, if the route declared it.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|p| p.key == name)
            .map(|p| p.value.as_str())
    }

    /// Parse the value bound under `name` into `T`.
    pub fn get_as<T: FromStr>(&self, name: &str) -> Result<T, BindError> {
        let value = self.get(name).ok_or_else(|| BindError::MissingParam {
            name: name.to_string(),
        })?;
        value.parse().map_err(|_| BindError::InvalidParam {
            name: name.to_string(),
            value: value.to_string(),
            target: std::any::type_name::<T>(),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Param> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Params {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for p in &self.0 {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", p.key, p.value)?;
            first = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Params {
        let mut params = Params::new();
        params.push("id", "42");
        params.push("name", "widget");
        params
    }

    #[test]
    fn test_get_by_name() {
        let params = sample();
        assert_eq!(params.get("id"), Some("42"));
        assert_eq!(params.get("name"), Some("widget"));
        assert_eq!(params.get("missing"), None);
    }

    #[test]
    fn test_typed_conversion() {
        let params = sample();
        assert_eq!(params.get_as::<u64>("id").unwrap(), 42);

        let err = params.get_as::<u64>("name").unwrap_err();
        assert!(matches!(err, BindError::InvalidParam { .. }));

        let err = params.get_as::<u64>("missing").unwrap_err();
        assert!(matches!(err, BindError::MissingParam { .. }));
    }

    #[test]
    fn test_clear_keeps_capacity() {
        let mut params = sample();
        let capacity = params.0.capacity();
        params.clear();
        assert!(params.is_empty());
        assert_eq!(params.0.capacity(), capacity);
    }

    #[test]
    fn test_display_joins_pairs() {
        assert_eq!(sample().to_string(), "id=42, name=widget");
    }
}
