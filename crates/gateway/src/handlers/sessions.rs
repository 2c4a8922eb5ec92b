//! Session management handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::AppState;
use cupid_common::{
    auth::CallerIdentity,
    db::models::ChatSession,
    errors::{AppError, Result},
    identifier::{classify, ChatIdentifier},
    policy,
};

/// Create session response
#[derive(Serialize)]
pub struct CreateSessionResponse {
    pub session_id: Uuid,
    pub is_anonymous: bool,
}

/// Session detail response
#[derive(Serialize)]
pub struct SessionResponse {
    pub session_id: Uuid,
    pub owner_id: Option<Uuid>,
    pub paper_code: Option<String>,
    pub title: Option<String>,
    pub starred: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<ChatSession> for SessionResponse {
    fn from(session: ChatSession) -> Self {
        Self {
            session_id: session.session_id,
            owner_id: session.owner_id,
            paper_code: session.paper_code,
            title: session.title,
            starred: session.starred,
            created_at: session.created_at.to_rfc3339(),
            updated_at: session.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListSessionsQuery {
    #[serde(rename = "currentSessionId")]
    pub current_session_id: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RenameSessionRequest {
    #[validate(length(min = 1, message = "title must not be empty"))]
    pub title: String,
}

#[derive(Serialize)]
pub struct RenameSessionResponse {
    pub success: bool,
    pub title: String,
}

#[derive(Serialize)]
pub struct DeleteSessionResponse {
    pub success: bool,
    pub message: String,
}

/// Create a new assistant session for the caller. Authenticated callers must
/// resolve to a known account row; anonymous callers get an unowned session.
pub async fn create_session(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<(StatusCode, Json<CreateSessionResponse>)> {
    if let Some(owner_id) = caller.owner_id {
        if !state.repo.account_exists(owner_id).await? {
            return Err(AppError::Unauthenticated {
                message: format!("unknown account: {}", owner_id),
            });
        }
    }

    let session = state.repo.create_session(caller.owner_id, None).await?;
    metrics::counter!("cupid_sessions_created_total").increment(1);

    tracing::info!(
        session_id = %session.session_id,
        anonymous = caller.is_anonymous(),
        "session created"
    );

    Ok((
        StatusCode::CREATED,
        Json(CreateSessionResponse {
            session_id: session.session_id,
            is_anonymous: session.owner_id.is_none(),
        }),
    ))
}

/// List the caller's assistant sessions for the sidebar. Authenticated
/// callers see all of their non-paper sessions; anonymous callers see at
/// most the single session they claim via `currentSessionId`.
pub async fn list_sessions(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Query(query): Query<ListSessionsQuery>,
) -> Result<Json<Vec<SessionResponse>>> {
    let sessions = match caller.owner_id {
        Some(owner_id) => state.repo.list_sessions_for_owner(owner_id, true).await?,
        None => match query.current_session_id.as_deref() {
            Some(raw) => match classify(raw).ok() {
                Some(ChatIdentifier::Session(session_id)) => state
                    .repo
                    .find_anonymous_session(session_id)
                    .await?
                    .into_iter()
                    .collect(),
                _ => Vec::new(),
            },
            None => Vec::new(),
        },
    };

    Ok(Json(sessions.into_iter().map(Into::into).collect()))
}

/// Get a single session by id.
pub async fn get_session(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(raw_id): Path<String>,
) -> Result<Json<SessionResponse>> {
    let session = require_session(&state, &caller, &raw_id).await?;
    Ok(Json(session.into()))
}

/// Rename a session. The stored title is trimmed.
pub async fn rename_session(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(raw_id): Path<String>,
    Json(request): Json<RenameSessionRequest>,
) -> Result<Json<RenameSessionResponse>> {
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: Some("title".to_string()),
    })?;

    let session = require_session(&state, &caller, &raw_id).await?;
    let renamed = state
        .repo
        .rename_session(session.session_id, &request.title)
        .await?;

    tracing::info!(session_id = %renamed.session_id, "session renamed");

    Ok(Json(RenameSessionResponse {
        success: true,
        title: renamed.title.unwrap_or_default(),
    }))
}

/// Delete a chat by identifier. A session id deletes the addressed session;
/// a paper code deletes the caller's current session for that paper.
pub async fn delete_session(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(raw_identifier): Path<String>,
) -> Result<Json<DeleteSessionResponse>> {
    let (session_id, message) = match classify(&raw_identifier)? {
        ChatIdentifier::Session(_) => {
            let session = require_session(&state, &caller, &raw_identifier).await?;
            (session.session_id, "Chat session deleted".to_string())
        }
        ChatIdentifier::Paper(code) => {
            let session = state
                .repo
                .find_current_paper_session(caller.owner_id, &code)
                .await?
                .ok_or_else(|| AppError::NotFound {
                    resource_type: "paper chat".to_string(),
                    id: code.clone(),
                })?;
            (session.session_id, format!("Chat for {} deleted", code))
        }
    };

    state.repo.delete_session(session_id).await?;
    metrics::counter!("cupid_sessions_deleted_total").increment(1);

    tracing::info!(session_id = %session_id, "session deleted");

    Ok(Json(DeleteSessionResponse {
        success: true,
        message,
    }))
}

/// Resolve a raw path identifier to a session the caller may act on.
/// Anything other than an accessible session id surfaces as not-found, so
/// probing for other callers' sessions is indistinguishable from a miss.
async fn require_session(
    state: &AppState,
    caller: &CallerIdentity,
    raw_id: &str,
) -> Result<ChatSession> {
    let session_id = match classify(raw_id)? {
        ChatIdentifier::Session(id) => id,
        ChatIdentifier::Paper(_) => {
            return Err(AppError::SessionNotFound {
                id: raw_id.to_string(),
            })
        }
    };

    let session = state
        .repo
        .find_session(session_id)
        .await?
        .ok_or_else(|| AppError::SessionNotFound {
            id: session_id.to_string(),
        })?;

    policy::authorize_session(caller.owner_id, &session)?;
    Ok(session)
}
