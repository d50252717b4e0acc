use sea_orm::entity::prelude::*;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "nft_prices")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub contract_address: String,

    #[sea_orm(primary_key, auto_increment = false)]
    pub token_index: String,

    #[sea_orm(nullable)]
    pub current_price: Option<Decimal>,

    pub last_listing_timestamp: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
