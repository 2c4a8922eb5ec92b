//! Access policy for chat sessions
//!
//! Two rules, evaluated per request:
//! - An authenticated caller may act only on sessions whose `owner_id`
//!   equals their own id. A foreign session is reported as not found, so
//!   its existence never leaks.
//! - An anonymous caller may act on a session only by presenting its exact
//!   id, and only while the session itself is anonymous-owned. Possession
//!   of the identifier is the whole credential; this is an intentionally
//!   weak, documented guarantee, not an oversight to be hardened here.

use uuid::Uuid;

use crate::db::models::ChatSession;
use crate::errors::{AppError, Result};

/// Check whether `caller_owner` may read/write/delete `session`.
///
/// Every refusal is `SessionNotFound`, never a 403.
pub fn authorize_session(caller_owner: Option<Uuid>, session: &ChatSession) -> Result<()> {
    let allowed = match (caller_owner, session.owner_id) {
        (Some(caller), Some(owner)) => caller == owner,
        // Anonymous caller holding the id of an anonymous session
        (None, None) => true,
        // Anonymous caller probing an owned session, or an authenticated
        // caller probing an anonymous one
        _ => false,
    };

    if allowed {
        Ok(())
    } else {
        Err(AppError::SessionNotFound {
            id: session.session_id.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn session(owner_id: Option<Uuid>) -> ChatSession {
        ChatSession {
            session_id: Uuid::new_v4(),
            owner_id,
            paper_code: None,
            title: None,
            starred: false,
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
        }
    }

    #[test]
    fn test_owner_may_access_own_session() {
        let me = Uuid::new_v4();
        assert!(authorize_session(Some(me), &session(Some(me))).is_ok());
    }

    #[test]
    fn test_foreign_session_is_not_found() {
        let me = Uuid::new_v4();
        let them = Uuid::new_v4();
        let err = authorize_session(Some(me), &session(Some(them))).unwrap_err();
        assert!(matches!(err, AppError::SessionNotFound { .. }));
    }

    #[test]
    fn test_anonymous_holder_may_access_anonymous_session() {
        assert!(authorize_session(None, &session(None)).is_ok());
    }

    #[test]
    fn test_anonymous_caller_cannot_access_owned_session() {
        let owner = Uuid::new_v4();
        let err = authorize_session(None, &session(Some(owner))).unwrap_err();
        assert!(matches!(err, AppError::SessionNotFound { .. }));
    }

    #[test]
    fn test_authenticated_caller_cannot_claim_anonymous_session() {
        let me = Uuid::new_v4();
        let err = authorize_session(Some(me), &session(None)).unwrap_err();
        assert!(matches!(err, AppError::SessionNotFound { .. }));
    }
}
