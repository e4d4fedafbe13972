//! Weak well-formedness check for stored image URLs
//!
//! Only flags values that are obviously truncated or placeholders. It is not a
//! URI grammar and says nothing about reachability.

use serde::{Deserialize, Serialize};

/// Values of this length or shorter are rejected.
pub const MIN_URL_LENGTH: usize = 10;

const ALLOWED_SCHEMES: [&str; 2] = ["http://", "https://"];

/// True iff `value` is present, starts with `http://` or `https://` and is
/// longer than [`MIN_URL_LENGTH`] characters.
pub fn is_valid_url(value: Option<&str>) -> bool {
    value.is_some_and(|url| {
        ALLOWED_SCHEMES.iter().any(|scheme| url.starts_with(scheme))
            && url.chars().count() > MIN_URL_LENGTH
    })
}

/// Which source held the value that failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UrlSide {
    Central,
    Product,
}

/// A value present in one source that fails [`is_valid_url`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialRecord {
    pub id: String,
    pub side: UrlSide,
    pub value: String,
}

impl PartialRecord {
    /// Returns a partial when `value` is present but invalid.
    pub fn check(id: &str, side: UrlSide, value: Option<&str>) -> Option<Self> {
        let value = value?;
        (!is_valid_url(Some(value))).then(|| Self {
            id: id.to_string(),
            side,
            value: value.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_valid_url() {
        // 11 characters
        assert!(is_valid_url(Some("http://a.co")));
    }

    #[test]
    fn test_bare_scheme_is_invalid() {
        assert!(!is_valid_url(Some("http://")));
        assert!(!is_valid_url(Some("https://")));
    }

    #[test]
    fn test_missing_value_is_invalid() {
        assert!(!is_valid_url(None));
    }

    #[test]
    fn test_partial_only_for_present_values() {
        assert!(PartialRecord::check("A", UrlSide::Central, None).is_none());
        assert!(PartialRecord::check("A", UrlSide::Central, Some("https://cdn.example.com/a.png")).is_none());

        let partial = PartialRecord::check("A", UrlSide::Product, Some("/img/a.png")).unwrap();
        assert_eq!(partial.side, UrlSide::Product);
        assert_eq!(partial.value, "/img/a.png");
    }
}
