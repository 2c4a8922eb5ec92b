//! Caller identity extraction
//!
//! The surrounding application owns accounts and login state; this service
//! only needs "which account, if any, is making the request". That seam is
//! the `x-user-id` header, standing in for whatever cookie/session
//! mechanism fronts the service. Anonymous requests are first-class: no
//! header means no owner, not a rejection.

use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::errors::{AppError, Result};

/// Extracted caller identity available to handlers
#[derive(Debug, Clone)]
pub struct CallerIdentity {
    /// Owning account, when the caller is logged in
    pub owner_id: Option<Uuid>,

    /// Request ID for tracing
    pub request_id: String,
}

impl CallerIdentity {
    /// Whether the caller has no account bound to the request
    pub fn is_anonymous(&self) -> bool {
        self.owner_id.is_none()
    }

    /// An anonymous identity, useful for internal calls
    pub fn anonymous() -> Self {
        Self {
            owner_id: None,
            request_id: Uuid::new_v4().to_string(),
        }
    }
}

impl<S> FromRequestParts<S> for CallerIdentity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
        // Extract request ID (set upstream by the request-id layer)
        let request_id = parts
            .headers
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .map(String::from)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        // Extract the optional account binding. A present-but-malformed
        // value is a broken login, not anonymity.
        let owner_id = match parts.headers.get("x-user-id") {
            None => None,
            Some(value) => {
                let raw = value.to_str().map_err(|_| AppError::Unauthenticated {
                    message: "Invalid x-user-id header".to_string(),
                })?;
                let id = Uuid::parse_str(raw).map_err(|_| AppError::Unauthenticated {
                    message: "x-user-id is not a valid account id".to_string(),
                })?;
                Some(id)
            }
        };

        Ok(CallerIdentity {
            owner_id,
            request_id,
        })
    }
}
