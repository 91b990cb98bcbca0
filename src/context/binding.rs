//! Request payload binding errors and helpers.
//!
//! # Design Decisions
//! - Binding never fails the request by itself; handlers get a `BindError`
//!   and decide the response
//! - Structured binding goes through serde (`serde_json`, `quick-xml`,
//!   `serde_urlencoded`); scalar helpers go through `FromStr`

use thiserror::Error;

/// Why a binding or typed-conversion helper could not produce a value.
#[derive(Debug, Error)]
pub enum BindError {
    #[error("route parameter {name:?} was not bound")]
    MissingParam { name: String },

    #[error("route parameter {name:?}={value:?} is not a valid {target}")]
    InvalidParam {
        name: String,
        value: String,
        target: &'static str,
    },

    #[error("query parameter {name:?} is missing")]
    MissingQuery { name: String },

    #[error("query parameter {name:?}={value:?} is not a valid {target}")]
    InvalidQuery {
        name: String,
        value: String,
        target: &'static str,
    },

    #[error("expected content type {expected}, got {actual:?}")]
    ContentType {
        expected: &'static str,
        actual: String,
    },

    #[error("malformed JSON body: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed XML body: {0}")]
    Xml(#[from] quick_xml::DeError),

    #[error("malformed urlencoded payload: {0}")]
    UrlEncoded(#[from] serde_urlencoded::de::Error),
}

/// Decode `key=value&…` bytes into owned pairs, percent- and plus-decoded.
pub(crate) fn parse_pairs(raw: &[u8]) -> Vec<(String, String)> {
    url::form_urlencoded::parse(raw).into_owned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pairs_decodes() {
        let pairs = parse_pairs(b"name=a%20b&tag=x&tag=y&flag");
        assert_eq!(pairs[0], ("name".to_string(), "a b".to_string()));
        assert_eq!(pairs[1], ("tag".to_string(), "x".to_string()));
        assert_eq!(pairs[2], ("tag".to_string(), "y".to_string()));
        // A bare key decodes to an empty value.
        assert_eq!(pairs[3], ("flag".to_string(), String::new()));
    }

    #[test]
    fn test_parse_pairs_plus_as_space() {
        let pairs = parse_pairs(b"q=hello+world");
        assert_eq!(pairs[0].1, "hello world");
    }

    #[test]
    fn test_error_messages_name_the_field() {
        let err = BindError::InvalidParam {
            name: "id".to_string(),
            value: "abc".to_string(),
            target: "u64",
        };
        let msg = err.to_string();
        assert!(msg.contains("id"));
        assert!(msg.contains("abc"));
        assert!(msg.contains("u64"));
    }
}
