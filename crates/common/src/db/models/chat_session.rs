//! Chat session entity
//!
//! A session is either paper-bound (`paper_code` set, the simulated
//! conversation with one course) or general (`paper_code` null, an
//! assistant session) - never both meanings at once. `owner_id` is null
//! for anonymous-owned sessions.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "chat_session")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub session_id: Uuid,

    /// Owning account; null means anonymous-owned
    pub owner_id: Option<Uuid>,

    /// Bound paper; null means a general assistant session
    pub paper_code: Option<String>,

    /// User-assigned display label
    pub title: Option<String>,

    /// Reserved flag, not load-bearing in current behavior
    pub starred: bool,

    pub created_at: DateTimeWithTimeZone,

    /// Refreshed on every appended message and on rename
    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    /// Whether this session represents a conversation with a paper
    pub fn is_paper_bound(&self) -> bool {
        self.paper_code.is_some()
    }

    /// Whether the session has no owning account
    pub fn is_anonymous(&self) -> bool {
        self.owner_id.is_none()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::chat_message::Entity")]
    Messages,
}

impl Related<super::chat_message::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Messages.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
