//! ID generation utilities.

use uuid::Uuid;

/// Generates a new time-ordered UUID v7 as a string.
///
/// Used for backend-assigned resource ids and for locally created rows.
#[must_use]
pub fn generate_id() -> String {
    Uuid::now_v7().to_string()
}

/// Builds the deterministic id of a synthetic directory node.
///
/// Intermediate directories created while inserting by path have no backend
/// record yet, so they are keyed by aggregate and path until the entry stream
/// reports the real id.
#[must_use]
pub fn synthetic_dir_id(aggregate_id: &str, segments: &[String]) -> String {
    format!("{aggregate_id}-{}", segments.join("-"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_id_format() {
        let id = generate_id();
        // 8-4-4-4-12 = 36 chars
        assert_eq!(id.len(), 36);
        assert!(Uuid::parse_str(&id).is_ok());
    }

    #[test]
    fn test_generate_id_uniqueness() {
        let id1 = generate_id();
        let id2 = generate_id();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_synthetic_dir_id() {
        let segments = vec!["endpoints".to_string(), "users".to_string()];
        assert_eq!(synthetic_dir_id("p1", &segments), "p1-endpoints-users");
    }
}
