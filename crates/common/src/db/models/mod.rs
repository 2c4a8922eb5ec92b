//! SeaORM entity models
//!
//! Database entities for the Course Cupid chat tables

mod account;
mod chat_message;
mod chat_session;
mod paper;

pub use account::{
    ActiveModel as AccountActiveModel, Column as AccountColumn, Entity as AccountEntity,
    Model as Account,
};

pub use chat_session::{
    ActiveModel as ChatSessionActiveModel, Column as ChatSessionColumn,
    Entity as ChatSessionEntity, Model as ChatSession,
};

pub use chat_message::{
    ActiveModel as ChatMessageActiveModel, Column as ChatMessageColumn,
    Entity as ChatMessageEntity, MessageRole, Model as ChatMessage,
};

pub use paper::{
    ActiveModel as PaperActiveModel, Column as PaperColumn, Entity as PaperEntity, Model as Paper,
};
