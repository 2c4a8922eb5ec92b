//! Repository pattern for database operations
//!
//! Provides a clean interface for all data access operations with proper
//! error handling. The session store and the transcript store both live
//! here; the multi-step chat flow deliberately does NOT wrap its steps in
//! one transaction (each commits independently), the only transactional
//! operation is session deletion, which must remove messages and the
//! session row together.

use crate::config::DatabaseConfig;
use crate::db::models::*;
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbBackend, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, Statement, TransactionTrait,
};
use uuid::Uuid;

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,

    /// Account table maintained by the surrounding app, resolved once at
    /// startup from configuration
    account_table: String,
}

impl Repository {
    /// Create a new repository with the given connection pool and the
    /// account table name from configuration
    pub fn new(pool: DbPool, account_table: impl Into<String>) -> Self {
        Self {
            pool,
            account_table: account_table.into(),
        }
    }

    /// Create a repository using the table location from `DatabaseConfig`
    pub fn from_config(pool: DbPool, config: &DatabaseConfig) -> Self {
        Self::new(pool, config.account_table.clone())
    }

    /// Get the read connection
    fn read_conn(&self) -> &DatabaseConnection {
        self.pool.read()
    }

    /// Get the write connection
    fn write_conn(&self) -> &DatabaseConnection {
        self.pool.write()
    }

    // ========================================================================
    // Health Check
    // ========================================================================

    /// Ping the database
    pub async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }

    // ========================================================================
    // Account Operations (external collaborator)
    // ========================================================================

    /// Check whether an account row exists in the configured account table
    pub async fn account_exists(&self, owner_id: Uuid) -> Result<bool> {
        let backend = self.read_conn().get_database_backend();
        let sql = match backend {
            DbBackend::Postgres => {
                format!("SELECT 1 FROM {} WHERE user_id = $1", self.account_table)
            }
            _ => format!("SELECT 1 FROM {} WHERE user_id = ?", self.account_table),
        };
        let stmt = Statement::from_sql_and_values(backend, sql, [owner_id.into()]);

        let row = self.read_conn().query_one(stmt).await?;
        Ok(row.is_some())
    }

    // ========================================================================
    // Paper Operations (external collaborator, read-only here)
    // ========================================================================

    /// Find paper metadata by course code
    pub async fn find_paper_by_code(&self, code: &str) -> Result<Option<Paper>> {
        PaperEntity::find_by_id(code.to_string())
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    // ========================================================================
    // Session Store
    // ========================================================================

    /// Create a new chat session. `paper_code` set means a paper-bound
    /// session; `owner_id` absent means anonymous-owned.
    pub async fn create_session(
        &self,
        owner_id: Option<Uuid>,
        paper_code: Option<String>,
    ) -> Result<ChatSession> {
        let now = chrono::Utc::now();

        let session = ChatSessionActiveModel {
            session_id: Set(Uuid::new_v4()),
            owner_id: Set(owner_id),
            paper_code: Set(paper_code),
            title: Set(None),
            starred: Set(false),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        session.insert(self.write_conn()).await.map_err(Into::into)
    }

    /// Find session by ID
    pub async fn find_session(&self, session_id: Uuid) -> Result<Option<ChatSession>> {
        ChatSessionEntity::find_by_id(session_id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// List an owner's sessions, most recently active first. The
    /// assistant-session list and the paper-chat list are disjoint views:
    /// `exclude_paper_bound` selects the former.
    pub async fn list_sessions_for_owner(
        &self,
        owner_id: Uuid,
        exclude_paper_bound: bool,
    ) -> Result<Vec<ChatSession>> {
        let mut query = ChatSessionEntity::find().filter(ChatSessionColumn::OwnerId.eq(owner_id));

        if exclude_paper_bound {
            query = query.filter(ChatSessionColumn::PaperCode.is_null());
        }

        query
            .order_by_desc(ChatSessionColumn::UpdatedAt)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// The anonymous 0..1 view: return the session only when the caller
    /// already holds its id and it is an anonymous-owned assistant session.
    /// Paper-bound sessions never surface here, so the sidebar views stay
    /// disjoint for anonymous callers too. Anonymous sessions are never
    /// enumerable.
    pub async fn find_anonymous_session(&self, session_id: Uuid) -> Result<Option<ChatSession>> {
        ChatSessionEntity::find_by_id(session_id)
            .filter(ChatSessionColumn::OwnerId.is_null())
            .filter(ChatSessionColumn::PaperCode.is_null())
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Find the "current" session for an (owner, paper) pair: the most
    /// recently created one wins. A `None` owner matches only `None`
    /// owners. Stale duplicates are tolerated, never merged.
    pub async fn find_current_paper_session(
        &self,
        owner_id: Option<Uuid>,
        paper_code: &str,
    ) -> Result<Option<ChatSession>> {
        let owner_filter = match owner_id {
            Some(id) => ChatSessionColumn::OwnerId.eq(id),
            None => ChatSessionColumn::OwnerId.is_null(),
        };

        ChatSessionEntity::find()
            .filter(owner_filter)
            .filter(ChatSessionColumn::PaperCode.eq(paper_code))
            .order_by_desc(ChatSessionColumn::CreatedAt)
            .limit(1)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Rename a session. Titles are trimmed; empty titles are rejected.
    pub async fn rename_session(&self, session_id: Uuid, title: &str) -> Result<ChatSession> {
        let title = title.trim();
        if title.is_empty() {
            return Err(AppError::Validation {
                message: "Title must not be empty".to_string(),
                field: Some("title".to_string()),
            });
        }

        let session = ChatSessionEntity::find_by_id(session_id)
            .one(self.write_conn())
            .await?
            .ok_or_else(|| AppError::SessionNotFound {
                id: session_id.to_string(),
            })?;

        let mut session: ChatSessionActiveModel = session.into();
        session.title = Set(Some(title.to_string()));
        session.updated_at = Set(chrono::Utc::now().into());

        session.update(self.write_conn()).await.map_err(Into::into)
    }

    /// Delete a session and all its messages. Messages go first to satisfy
    /// the referential constraint, inside one transaction so concurrent
    /// readers never observe a half-deleted session. Deleting an unknown
    /// session is a NotFound, not a silent success.
    pub async fn delete_session(&self, session_id: Uuid) -> Result<()> {
        let txn = self.write_conn().begin().await?;

        let exists = ChatSessionEntity::find_by_id(session_id).one(&txn).await?;
        if exists.is_none() {
            return Err(AppError::SessionNotFound {
                id: session_id.to_string(),
            });
        }

        ChatMessageEntity::delete_many()
            .filter(ChatMessageColumn::SessionId.eq(session_id))
            .exec(&txn)
            .await?;

        ChatSessionEntity::delete_by_id(session_id).exec(&txn).await?;

        txn.commit().await?;
        Ok(())
    }

    // ========================================================================
    // Transcript Store
    // ========================================================================

    /// Append one turn to a session's transcript and refresh the session's
    /// `updated_at`. Appends to a missing session are rejected rather than
    /// silently creating orphan rows.
    pub async fn append_message(
        &self,
        session_id: Uuid,
        role: MessageRole,
        content: &str,
    ) -> Result<ChatMessage> {
        if content.trim().is_empty() {
            return Err(AppError::Validation {
                message: "Message content must not be empty".to_string(),
                field: Some("content".to_string()),
            });
        }

        let session = ChatSessionEntity::find_by_id(session_id)
            .one(self.write_conn())
            .await?
            .ok_or_else(|| AppError::SessionNotFound {
                id: session_id.to_string(),
            })?;

        let now = chrono::Utc::now();

        // seq stays unset so the database assigns the next value
        let message = ChatMessageActiveModel {
            message_id: Set(Uuid::new_v4()),
            session_id: Set(session_id),
            role: Set(role.as_str().to_string()),
            content: Set(content.to_string()),
            created_at: Set(now.into()),
            ..Default::default()
        };

        let message = message.insert(self.write_conn()).await?;

        let mut session: ChatSessionActiveModel = session.into();
        session.updated_at = Set(now.into());
        session.update(self.write_conn()).await?;

        Ok(message)
    }

    /// Full transcript of a session, in insertion order
    pub async fn list_messages(&self, session_id: Uuid) -> Result<Vec<ChatMessage>> {
        ChatMessageEntity::find()
            .filter(ChatMessageColumn::SessionId.eq(session_id))
            .order_by_asc(ChatMessageColumn::Seq)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// The newest `limit` messages of a session, newest first. Callers
    /// replay the window chronologically when building responder context.
    pub async fn recent_messages(&self, session_id: Uuid, limit: u64) -> Result<Vec<ChatMessage>> {
        ChatMessageEntity::find()
            .filter(ChatMessageColumn::SessionId.eq(session_id))
            .order_by_desc(ChatMessageColumn::Seq)
            .limit(limit)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{Database, Schema};

    async fn test_repository() -> Repository {
        let conn = Database::connect("sqlite::memory:").await.unwrap();
        let backend = conn.get_database_backend();
        let schema = Schema::new(backend);

        conn.execute(backend.build(&schema.create_table_from_entity(AccountEntity)))
            .await
            .unwrap();
        conn.execute(backend.build(&schema.create_table_from_entity(PaperEntity)))
            .await
            .unwrap();
        conn.execute(backend.build(&schema.create_table_from_entity(ChatSessionEntity)))
            .await
            .unwrap();
        conn.execute(backend.build(&schema.create_table_from_entity(ChatMessageEntity)))
            .await
            .unwrap();

        let pool = DbPool {
            primary: conn,
            replica: None,
        };
        Repository::new(pool, "web_user")
    }

    #[tokio::test]
    async fn test_create_and_find_session() {
        let repo = test_repository().await;

        let session = repo.create_session(None, None).await.unwrap();
        assert!(session.is_anonymous());
        assert!(!session.is_paper_bound());
        assert!(!session.starred);

        let found = repo.find_session(session.session_id).await.unwrap().unwrap();
        assert_eq!(found.session_id, session.session_id);

        assert!(repo.find_session(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_transcript_is_ordered_and_complete() {
        let repo = test_repository().await;
        let session = repo.create_session(None, None).await.unwrap();

        repo.append_message(session.session_id, MessageRole::User, "first")
            .await
            .unwrap();
        repo.append_message(session.session_id, MessageRole::Assistant, "second")
            .await
            .unwrap();
        repo.append_message(session.session_id, MessageRole::User, "third")
            .await
            .unwrap();

        let messages = repo.list_messages(session.session_id).await.unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(
            messages.iter().map(|m| m.content.as_str()).collect::<Vec<_>>(),
            vec!["first", "second", "third"]
        );
        for pair in messages.windows(2) {
            assert!(pair[0].created_at <= pair[1].created_at);
        }

        // Appends refresh the session's updated_at
        let refreshed = repo.find_session(session.session_id).await.unwrap().unwrap();
        assert!(refreshed.updated_at >= session.updated_at);
    }

    #[tokio::test]
    async fn test_append_to_missing_session_is_rejected() {
        let repo = test_repository().await;

        let err = repo
            .append_message(Uuid::new_v4(), MessageRole::User, "hello")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::SessionNotFound { .. }));
    }

    #[tokio::test]
    async fn test_append_empty_content_is_rejected() {
        let repo = test_repository().await;
        let session = repo.create_session(None, None).await.unwrap();

        let err = repo
            .append_message(session.session_id, MessageRole::User, "   ")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_delete_cascades_to_messages() {
        let repo = test_repository().await;
        let session = repo.create_session(None, None).await.unwrap();

        for i in 0..4 {
            repo.append_message(session.session_id, MessageRole::User, &format!("m{}", i))
                .await
                .unwrap();
        }

        repo.delete_session(session.session_id).await.unwrap();

        assert!(repo.find_session(session.session_id).await.unwrap().is_none());
        assert!(repo.list_messages(session.session_id).await.unwrap().is_empty());

        // Double delete is a NotFound, not a silent success
        let err = repo.delete_session(session.session_id).await.unwrap_err();
        assert!(matches!(err, AppError::SessionNotFound { .. }));
    }

    #[tokio::test]
    async fn test_rename_trims_and_rejects_empty() {
        let repo = test_repository().await;
        let session = repo.create_session(None, None).await.unwrap();

        let renamed = repo
            .rename_session(session.session_id, "  My Chat  ")
            .await
            .unwrap();
        assert_eq!(renamed.title.as_deref(), Some("My Chat"));

        let err = repo.rename_session(session.session_id, "   ").await.unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));

        let err = repo.rename_session(Uuid::new_v4(), "title").await.unwrap_err();
        assert!(matches!(err, AppError::SessionNotFound { .. }));
    }

    #[tokio::test]
    async fn test_owner_listing_excludes_paper_bound() {
        let repo = test_repository().await;
        let owner = Uuid::new_v4();

        let assistant = repo.create_session(Some(owner), None).await.unwrap();
        let paper = repo
            .create_session(Some(owner), Some("COMP161".to_string()))
            .await
            .unwrap();
        // Someone else's session stays invisible
        repo.create_session(Some(Uuid::new_v4()), None).await.unwrap();

        let listed = repo.list_sessions_for_owner(owner, true).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].session_id, assistant.session_id);

        let all = repo.list_sessions_for_owner(owner, false).await.unwrap();
        assert_eq!(all.len(), 2);
        assert!(all.iter().any(|s| s.session_id == paper.session_id));
    }

    #[tokio::test]
    async fn test_anonymous_view_is_possession_based() {
        let repo = test_repository().await;

        let anon = repo.create_session(None, None).await.unwrap();
        let owned = repo.create_session(Some(Uuid::new_v4()), None).await.unwrap();

        let found = repo.find_anonymous_session(anon.session_id).await.unwrap();
        assert_eq!(found.unwrap().session_id, anon.session_id);

        // Owned sessions are not reachable through the anonymous view
        assert!(repo
            .find_anonymous_session(owned.session_id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_anonymous_view_excludes_paper_sessions() {
        let repo = test_repository().await;

        let paper = repo
            .create_session(None, Some("COMP161".to_string()))
            .await
            .unwrap();

        // Holding a paper chat's id does not surface it in the sidebar view
        assert!(repo
            .find_anonymous_session(paper.session_id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_transcript_order_survives_created_at_ties() {
        let repo = test_repository().await;
        let session = repo.create_session(None, None).await.unwrap();

        // Identical timestamps, as produced by fast consecutive turns
        let stamp = chrono::Utc::now();
        for content in ["first", "second", "third"] {
            let message = ChatMessageActiveModel {
                message_id: Set(Uuid::new_v4()),
                session_id: Set(session.session_id),
                role: Set(MessageRole::User.as_str().to_string()),
                content: Set(content.to_string()),
                created_at: Set(stamp.into()),
                ..Default::default()
            };
            message.insert(repo.write_conn()).await.unwrap();
        }

        let messages = repo.list_messages(session.session_id).await.unwrap();
        assert_eq!(
            messages.iter().map(|m| m.content.as_str()).collect::<Vec<_>>(),
            vec!["first", "second", "third"]
        );

        let recent = repo.recent_messages(session.session_id, 2).await.unwrap();
        assert_eq!(
            recent.iter().map(|m| m.content.as_str()).collect::<Vec<_>>(),
            vec!["third", "second"]
        );
    }

    #[tokio::test]
    async fn test_current_paper_session_is_most_recent() {
        let repo = test_repository().await;
        let owner = Uuid::new_v4();

        let first = repo
            .create_session(Some(owner), Some("COMP161".to_string()))
            .await
            .unwrap();
        let second = repo
            .create_session(Some(owner), Some("COMP161".to_string()))
            .await
            .unwrap();

        let current = repo
            .find_current_paper_session(Some(owner), "COMP161")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(current.session_id, second.session_id);

        // The stale duplicate still exists, untouched
        assert!(repo.find_session(first.session_id).await.unwrap().is_some());

        // Anonymous and owned paper chats never alias
        assert!(repo
            .find_current_paper_session(None, "COMP161")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_recent_messages_window() {
        let repo = test_repository().await;
        let session = repo.create_session(None, None).await.unwrap();

        for i in 0..5 {
            repo.append_message(session.session_id, MessageRole::User, &format!("m{}", i))
                .await
                .unwrap();
        }

        let recent = repo.recent_messages(session.session_id, 3).await.unwrap();
        assert_eq!(
            recent.iter().map(|m| m.content.as_str()).collect::<Vec<_>>(),
            vec!["m4", "m3", "m2"]
        );
    }

    #[tokio::test]
    async fn test_account_probe_uses_configured_table() {
        let repo = test_repository().await;
        let user_id = Uuid::new_v4();

        assert!(!repo.account_exists(user_id).await.unwrap());

        let account = AccountActiveModel {
            user_id: Set(user_id),
            username: Set("hogka652".to_string()),
            email: Set("hogka652@example.ac.nz".to_string()),
            created_at: Set(chrono::Utc::now().into()),
        };
        account.insert(repo.write_conn()).await.unwrap();

        assert!(repo.account_exists(user_id).await.unwrap());
    }
}
