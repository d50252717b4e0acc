use sea_orm::entity::prelude::*;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "activities")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub source_event_id: String,

    pub order_id: String,

    pub contract_address: String,

    pub token_index: String,

    pub price: Decimal,

    pub maker: String,

    #[sea_orm(nullable)]
    pub listing_from: Option<DateTime<Utc>>,

    #[sea_orm(nullable)]
    pub listing_to: Option<DateTime<Utc>>,

    pub observed_at: DateTime<Utc>,

    pub captured_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
