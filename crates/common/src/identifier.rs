//! Identifier classification for chat routes
//!
//! Every chat-related route addresses either an assistant session (by its
//! UUID) or a paper (by its course code). The original system repeated the
//! disambiguating pattern match in each handler, with at least one route
//! drifting to a looser variant; this module is the single authority all
//! routes import.

use regex_lite::Regex;
use std::sync::OnceLock;
use uuid::Uuid;

use crate::errors::{AppError, Result};

/// What a chat-route path segment resolves to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatIdentifier {
    /// Canonical hyphenated UUID: an assistant session id
    Session(Uuid),
    /// Anything else non-empty: a paper code, uppercased for keying.
    /// Well-formedness beyond that is the paper store's concern.
    Paper(String),
}

/// Canonical 8-4-4-4-12 hyphenated hex form, case-insensitive.
/// Unhyphenated, braced or URN renderings deliberately do not match.
fn session_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$",
        )
        .expect("session id pattern is valid")
    })
}

/// Classify a chat-route identifier.
///
/// Empty (or whitespace-only) input is an input error, not a valid
/// classification.
pub fn classify(identifier: &str) -> Result<ChatIdentifier> {
    let identifier = identifier.trim();
    if identifier.is_empty() {
        return Err(AppError::MissingField {
            field: "identifier".to_string(),
        });
    }

    if session_id_pattern().is_match(identifier) {
        let id = Uuid::parse_str(identifier).map_err(|e| AppError::Internal {
            message: format!("uuid pattern matched but parse failed: {}", e),
        })?;
        Ok(ChatIdentifier::Session(id))
    } else {
        Ok(ChatIdentifier::Paper(identifier.to_uppercase()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_uuid_is_session() {
        let id = Uuid::new_v4();
        assert_eq!(
            classify(&id.to_string()).unwrap(),
            ChatIdentifier::Session(id)
        );
    }

    #[test]
    fn test_uppercase_uuid_is_session() {
        let raw = "A1B2C3D4-E5F6-7890-ABCD-EF0123456789";
        match classify(raw).unwrap() {
            ChatIdentifier::Session(id) => {
                assert_eq!(id, Uuid::parse_str(raw).unwrap());
            }
            other => panic!("expected session, got {:?}", other),
        }
    }

    #[test]
    fn test_paper_codes_are_papers() {
        assert_eq!(
            classify("COMP161").unwrap(),
            ChatIdentifier::Paper("COMP161".to_string())
        );
        // Lowercase codes are normalized the way the front end keys them
        assert_eq!(
            classify("comp161").unwrap(),
            ChatIdentifier::Paper("COMP161".to_string())
        );
    }

    #[test]
    fn test_non_canonical_uuid_renderings_are_papers() {
        let id = Uuid::new_v4();
        // 32 hex digits without hyphens
        let simple = id.simple().to_string();
        assert!(matches!(
            classify(&simple).unwrap(),
            ChatIdentifier::Paper(_)
        ));
        // Braced form
        let braced = format!("{{{}}}", id);
        assert!(matches!(
            classify(&braced).unwrap(),
            ChatIdentifier::Paper(_)
        ));
        // URN form
        let urn = format!("urn:uuid:{}", id);
        assert!(matches!(classify(&urn).unwrap(), ChatIdentifier::Paper(_)));
    }

    #[test]
    fn test_wrong_group_lengths_are_papers() {
        assert!(matches!(
            classify("a1b2c3d4-e5f6-7890-abcd-ef012345678").unwrap(),
            ChatIdentifier::Paper(_)
        ));
        assert!(matches!(
            classify("a1b2c3d4-e5f6-7890-abcd-ef01234567890").unwrap(),
            ChatIdentifier::Paper(_)
        ));
        // Non-hex digit in the last group
        assert!(matches!(
            classify("a1b2c3d4-e5f6-7890-abcd-ef012345678g").unwrap(),
            ChatIdentifier::Paper(_)
        ));
    }

    #[test]
    fn test_empty_identifier_is_an_error() {
        assert!(classify("").is_err());
        assert!(classify("   ").is_err());
    }
}
