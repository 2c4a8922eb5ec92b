//! Paper entity
//!
//! External collaborator: this service reads papers only to build the
//! responder prompt, and never writes them. Ingestion lives in the
//! scraper/import tooling.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "paper")]
pub struct Model {
    /// Course code, e.g. COMP161
    #[sea_orm(primary_key, auto_increment = false)]
    pub paper_code: String,

    #[sea_orm(column_type = "Text")]
    pub title: String,

    #[sea_orm(column_type = "Text")]
    pub description: String,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
