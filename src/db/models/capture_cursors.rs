use sea_orm::entity::prelude::*;
use chrono::{DateTime, Utc};

/// One row per feed stream.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "capture_cursors")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub stream: String,

    #[sea_orm(nullable)]
    pub continuation: Option<String>,

    #[sea_orm(nullable)]
    pub last_event_id: Option<String>,

    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
