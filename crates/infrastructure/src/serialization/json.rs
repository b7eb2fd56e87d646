//! Deterministic JSON helpers.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::ser::{PrettyFormatter, Serializer};

/// Error type for serialization operations.
#[derive(Debug, thiserror::Error)]
pub enum SerializationError {
    /// The value could not be written as JSON.
    #[error("JSON serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The input was not valid JSON for the target type.
    #[error("JSON deserialization failed: {0}")]
    Deserialize(serde_json::Error),

    /// The serializer produced invalid UTF-8.
    #[error("UTF-8 encoding error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Serializes a value as pretty JSON with a trailing newline.
///
/// Key order follows the source type, so map fields should be `BTreeMap`s.
///
/// # Errors
/// Returns an error if the value cannot be serialized.
pub fn to_json_stable<T: Serialize>(value: &T) -> Result<String, SerializationError> {
    let mut buffer = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"  ");
    let mut serializer = Serializer::with_formatter(&mut buffer, formatter);
    value.serialize(&mut serializer)?;

    let mut json = String::from_utf8(buffer)?;
    json.push('\n');
    Ok(json)
}

/// Bytes form of [`to_json_stable`], ready for a file write.
///
/// # Errors
/// Returns an error if the value cannot be serialized.
pub fn to_json_stable_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, SerializationError> {
    to_json_stable(value).map(String::into_bytes)
}

/// Parses JSON text.
///
/// # Errors
/// Returns `Deserialize` if the text is not valid JSON for `T`.
pub fn from_json<T: DeserializeOwned>(json: &str) -> Result<T, SerializationError> {
    serde_json::from_str(json).map_err(SerializationError::Deserialize)
}

/// Parses JSON bytes.
///
/// # Errors
/// Returns `Deserialize` if the bytes are not valid JSON for `T`.
pub fn from_json_bytes<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, SerializationError> {
    serde_json::from_slice(bytes).map_err(SerializationError::Deserialize)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use arbor_domain::{TreeItemState, TreeStateTable};
    use pretty_assertions::assert_eq;

    fn table() -> TreeStateTable {
        let mut table = TreeStateTable::new();
        table.put(
            "zeta",
            TreeItemState {
                order: 2,
                expanded: false,
            },
        );
        table.put(
            "alpha",
            TreeItemState {
                order: 1,
                expanded: true,
            },
        );
        table
    }

    #[test]
    fn test_stable_serialization_has_trailing_newline_and_indent() {
        let json = to_json_stable(&table()).expect("serialization should work");
        assert!(json.ends_with('\n'));
        assert!(json.contains("\n  \"alpha\""));
    }

    #[test]
    fn test_table_keys_are_sorted() {
        let json = to_json_stable(&table()).expect("serialization should work");
        let alpha = json.find("alpha").expect("alpha should be in json");
        let zeta = json.find("zeta").expect("zeta should be in json");
        assert!(alpha < zeta);
    }

    #[test]
    fn test_output_is_stable_across_rewrites() {
        let first = to_json_stable_bytes(&table()).unwrap();
        let restored: TreeStateTable = from_json_bytes(&first).unwrap();
        assert_eq!(restored, table());
        assert_eq!(to_json_stable_bytes(&restored).unwrap(), first);
    }

    #[test]
    fn test_from_json_reports_deserialize_errors() {
        let err = from_json::<TreeStateTable>(r#"{"alpha": }"#).unwrap_err();
        assert!(matches!(err, SerializationError::Deserialize(_)));
    }
}
