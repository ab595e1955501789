//! Helpers for partial-update payloads.

use serde::{Deserialize, Deserializer};

/// Deserialize a patch field that can be kept, set or cleared.
///
/// Pair with `#[serde(default, deserialize_with = "nullable")]` on an
/// `Option<Option<T>>`: a missing field stays `None` (keep), `null` becomes
/// `Some(None)` (clear) and a value becomes `Some(Some(v))` (set).
pub fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "nullable")]
        limit: Option<Option<u32>>,
    }

    #[test]
    fn distinguishes_missing_null_and_value() {
        let keep: Patch = serde_json::from_str("{}").unwrap();
        let clear: Patch = serde_json::from_str(r#"{"limit":null}"#).unwrap();
        let set: Patch = serde_json::from_str(r#"{"limit":3}"#).unwrap();
        assert_eq!(keep.limit, None);
        assert_eq!(clear.limit, Some(None));
        assert_eq!(set.limit, Some(Some(3)));
    }
}
