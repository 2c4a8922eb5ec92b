//! Chat turn orchestration.
//!
//! A turn runs the same pipeline regardless of how the chat was addressed:
//! classify the identifier, authorize the caller, resolve (or create) the
//! backing session, persist the user turn, obtain a reply, persist it, and
//! hand the reply back. Responder outages degrade to a canned reply so the
//! endpoint stays up while the upstream is down.

use std::sync::Arc;
use std::time::Instant;

use cupid_common::db::models::{ChatMessage, ChatSession, MessageRole, Paper};
use cupid_common::db::Repository;
use cupid_common::errors::{AppError, Result};
use cupid_common::identifier::{classify, ChatIdentifier};
use cupid_common::policy;
use uuid::Uuid;

use crate::responder::Responder;

/// Reply returned to the client when the responder cannot be reached.
/// The user's turn stays persisted; the failed reply is not.
pub const FALLBACK_REPLY: &str = "Error: could not connect to AI.";

const MATCHMAKER_PROMPT: &str = "You are Course Cupid, a friendly matchmaker \
who helps University of Otago students find first-year papers they will love. \
Ask about their interests, suggest papers that fit, and keep replies short, \
warm and practical.";

fn paper_prompt(paper: &Paper) -> String {
    format!(
        "You are {} ({}), a first-year university paper from the University of \
         Otago. Description: {}. You are on a dating app, trying to convince a \
         prospective student to take you as a paper. You are playful and \
         flirty, but also informative about your course content and structure. \
         Answer the user's questions in short, engaging responses.",
        paper.title, paper.paper_code, paper.description
    )
}

#[derive(Clone)]
pub struct ChatService {
    repo: Repository,
    responder: Arc<dyn Responder>,
    history_window: u64,
}

impl ChatService {
    pub fn new(repo: Repository, responder: Arc<dyn Responder>, history_window: u64) -> Self {
        Self {
            repo,
            responder,
            history_window,
        }
    }

    /// Run one chat turn addressed by a raw identifier (session id or paper
    /// code) and return the reply text.
    pub async fn handle_turn(
        &self,
        caller_owner: Option<Uuid>,
        raw_identifier: &str,
        message: &str,
    ) -> Result<String> {
        let message = message.trim();
        if message.is_empty() {
            return Err(AppError::Validation {
                message: "message must not be empty".to_string(),
                field: Some("message".to_string()),
            });
        }

        match classify(raw_identifier)? {
            ChatIdentifier::Session(session_id) => {
                self.assistant_turn(caller_owner, session_id, message).await
            }
            ChatIdentifier::Paper(code) => self.paper_turn(caller_owner, &code, message).await,
        }
    }

    /// Fetch the transcript behind an identifier. A paper code with no chat
    /// started yet yields an empty transcript rather than an error, so the
    /// client can render a fresh conversation view.
    pub async fn transcript(
        &self,
        caller_owner: Option<Uuid>,
        raw_identifier: &str,
    ) -> Result<Vec<ChatMessage>> {
        match classify(raw_identifier)? {
            ChatIdentifier::Session(session_id) => {
                let session = self.require_session(caller_owner, session_id).await?;
                self.repo.list_messages(session.session_id).await
            }
            ChatIdentifier::Paper(code) => {
                match self
                    .repo
                    .find_current_paper_session(caller_owner, &code)
                    .await?
                {
                    Some(session) => self.repo.list_messages(session.session_id).await,
                    None => Ok(Vec::new()),
                }
            }
        }
    }

    /// Assistant mode requires the session to already exist.
    async fn assistant_turn(
        &self,
        caller_owner: Option<Uuid>,
        session_id: Uuid,
        message: &str,
    ) -> Result<String> {
        let session = self.require_session(caller_owner, session_id).await?;
        self.repo
            .append_message(session.session_id, MessageRole::User, message)
            .await?;
        let reply = self.obtain_reply(session.session_id, MATCHMAKER_PROMPT).await;
        self.finish_turn(session.session_id, reply).await
    }

    /// Paper mode resolves the caller's current session for the paper,
    /// creating one transparently on the first turn.
    async fn paper_turn(
        &self,
        caller_owner: Option<Uuid>,
        code: &str,
        message: &str,
    ) -> Result<String> {
        let paper = self
            .repo
            .find_paper_by_code(code)
            .await?
            .ok_or_else(|| AppError::PaperNotFound {
                code: code.to_string(),
            })?;

        let session = match self
            .repo
            .find_current_paper_session(caller_owner, code)
            .await?
        {
            Some(session) => session,
            None => {
                let session = self
                    .repo
                    .create_session(caller_owner, Some(code.to_string()))
                    .await?;
                metrics::counter!("cupid_sessions_created_total").increment(1);
                tracing::info!(
                    session_id = %session.session_id,
                    paper_code = %code,
                    "created paper chat session"
                );
                session
            }
        };

        self.repo
            .append_message(session.session_id, MessageRole::User, message)
            .await?;
        let prompt = paper_prompt(&paper);
        let reply = self.obtain_reply(session.session_id, &prompt).await;
        self.finish_turn(session.session_id, reply).await
    }

    async fn require_session(
        &self,
        caller_owner: Option<Uuid>,
        session_id: Uuid,
    ) -> Result<ChatSession> {
        let session = self
            .repo
            .find_session(session_id)
            .await?
            .ok_or_else(|| AppError::SessionNotFound {
                id: session_id.to_string(),
            })?;
        policy::authorize_session(caller_owner, &session)?;
        Ok(session)
    }

    /// Replay the recent history window (oldest first) through the responder.
    async fn obtain_reply(&self, session_id: Uuid, system_prompt: &str) -> Result<String> {
        let mut window = self
            .repo
            .recent_messages(session_id, self.history_window)
            .await?;
        window.reverse();

        let start = Instant::now();
        let reply = self.responder.generate_reply(system_prompt, &window).await;
        metrics::histogram!("cupid_responder_duration_seconds")
            .record(start.elapsed().as_secs_f64());
        reply
    }

    /// Persist a successful reply, or swap a responder failure for the
    /// fallback text. Storage failures still propagate.
    async fn finish_turn(&self, session_id: Uuid, reply: Result<String>) -> Result<String> {
        metrics::counter!("cupid_chat_turns_total").increment(1);
        match reply {
            Ok(text) if !text.trim().is_empty() => {
                self.repo
                    .append_message(session_id, MessageRole::Assistant, &text)
                    .await?;
                Ok(text)
            }
            Ok(_) => {
                metrics::counter!("cupid_responder_errors_total").increment(1);
                tracing::warn!(session_id = %session_id, "responder returned an empty reply");
                Ok(FALLBACK_REPLY.to_string())
            }
            Err(AppError::Responder { message }) => {
                metrics::counter!("cupid_responder_errors_total").increment(1);
                tracing::warn!(session_id = %session_id, error = %message, "responder failure");
                Ok(FALLBACK_REPLY.to_string())
            }
            Err(AppError::HttpClient(err)) => {
                metrics::counter!("cupid_responder_errors_total").increment(1);
                tracing::warn!(session_id = %session_id, error = %err, "responder unreachable");
                Ok(FALLBACK_REPLY.to_string())
            }
            Err(other) => Err(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use cupid_common::db::models::{
        AccountEntity, ChatMessageEntity, ChatSessionEntity, PaperEntity,
    };
    use cupid_common::db::DbPool;
    use sea_orm::{ConnectionTrait, Database, EntityTrait, Schema, Set};

    use crate::responder::MockResponder;

    struct FailingResponder;

    #[async_trait]
    impl Responder for FailingResponder {
        async fn generate_reply(
            &self,
            _system_prompt: &str,
            _history: &[ChatMessage],
        ) -> Result<String> {
            Err(AppError::Responder {
                message: "upstream timed out".to_string(),
            })
        }
    }

    async fn test_repository() -> Repository {
        let conn = Database::connect("sqlite::memory:")
            .await
            .expect("in-memory sqlite");
        let schema = Schema::new(conn.get_database_backend());
        for stmt in [
            schema.create_table_from_entity(AccountEntity),
            schema.create_table_from_entity(PaperEntity),
            schema.create_table_from_entity(ChatSessionEntity),
            schema.create_table_from_entity(ChatMessageEntity),
        ] {
            conn.execute(conn.get_database_backend().build(&stmt))
                .await
                .expect("create table");
        }

        PaperEntity::insert(cupid_common::db::models::PaperActiveModel {
            paper_code: Set("COMP161".to_string()),
            title: Set("Computer Programming".to_string()),
            description: Set("An introduction to programming.".to_string()),
            created_at: Set(chrono::Utc::now().into()),
        })
        .exec(&conn)
        .await
        .expect("seed paper");

        let pool = DbPool {
            primary: conn,
            replica: None,
        };
        Repository::new(pool, "web_user".to_string())
    }

    fn service(repo: Repository, responder: Arc<dyn Responder>) -> ChatService {
        ChatService::new(repo, responder, 8)
    }

    #[tokio::test]
    async fn assistant_turn_requires_existing_session() {
        let repo = test_repository().await;
        let svc = service(repo, Arc::new(MockResponder));

        let err = svc
            .handle_turn(None, &Uuid::new_v4().to_string(), "hello")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::SessionNotFound { .. }));
    }

    #[tokio::test]
    async fn paper_turn_creates_then_reuses_session() {
        let repo = test_repository().await;
        let svc = service(repo.clone(), Arc::new(MockResponder));

        svc.handle_turn(None, "comp161", "tell me about yourself")
            .await
            .unwrap();
        svc.handle_turn(None, "COMP161", "what are the labs like?")
            .await
            .unwrap();

        let transcript = svc.transcript(None, "COMP161").await.unwrap();
        assert_eq!(transcript.len(), 4);
        assert_eq!(transcript[0].role, "user");
        assert_eq!(transcript[1].role, "assistant");
    }

    #[tokio::test]
    async fn unknown_paper_is_rejected() {
        let repo = test_repository().await;
        let svc = service(repo, Arc::new(MockResponder));

        let err = svc.handle_turn(None, "NOPE101", "hi").await.unwrap_err();
        assert!(matches!(err, AppError::PaperNotFound { .. }));
    }

    #[tokio::test]
    async fn responder_failure_degrades_to_fallback() {
        let repo = test_repository().await;
        let svc = service(repo.clone(), Arc::new(FailingResponder));

        let session = repo.create_session(None, None).await.unwrap();
        let reply = svc
            .handle_turn(None, &session.session_id.to_string(), "hello?")
            .await
            .unwrap();
        assert_eq!(reply, FALLBACK_REPLY);

        // The user's turn survives; the failed reply is never stored.
        let transcript = svc
            .transcript(None, &session.session_id.to_string())
            .await
            .unwrap();
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript[0].role, "user");
    }

    #[tokio::test]
    async fn empty_message_is_rejected_before_classification() {
        let repo = test_repository().await;
        let svc = service(repo, Arc::new(MockResponder));

        let err = svc.handle_turn(None, "COMP161", "   ").await.unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[tokio::test]
    async fn paper_transcript_is_empty_before_first_turn() {
        let repo = test_repository().await;
        let svc = service(repo, Arc::new(MockResponder));

        let transcript = svc.transcript(None, "COMP161").await.unwrap();
        assert!(transcript.is_empty());
    }

    #[tokio::test]
    async fn paper_sessions_are_scoped_per_caller() {
        let repo = test_repository().await;
        let svc = service(repo.clone(), Arc::new(MockResponder));

        let owner = Uuid::new_v4();
        svc.handle_turn(Some(owner), "COMP161", "hi from me")
            .await
            .unwrap();

        // An anonymous caller gets their own session, not the owner's.
        let transcript = svc.transcript(None, "COMP161").await.unwrap();
        assert!(transcript.is_empty());

        let owned = svc.transcript(Some(owner), "COMP161").await.unwrap();
        assert_eq!(owned.len(), 2);
    }
}
