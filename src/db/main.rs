use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, Condition, ConnectionTrait, Database,
    DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
};
use sea_query::{Alias, ColumnDef, Index, MysqlQueryBuilder, Table, TableCreateStatement};
use tracing::{debug, info};

use super::models::{activities, capture_cursors, nft_prices};
use super::store::Store;
use super::upsert::UpsertConfig;
use crate::aggregator::PriceFact;
use crate::checkpoint::Cursor;
use crate::constants::{ACTIVITIES_TABLE, CAPTURE_CURSORS_TABLE, NFT_PRICES_TABLE};
use crate::error::{Error, Result};
use crate::feed::{Activity, NftKey};

/// Keys per `IN`-style lookup when reading stored prices.
const PRICE_LOOKUP_CHUNK: usize = 200;

pub struct Db {
    connection: DatabaseConnection,
}

impl Db {
    pub async fn new(database_url: &str) -> Result<Self> {
        let connection = Database::connect(database_url)
            .await
            .map_err(|e| Error::Persistence(format!("Failed to connect to database: {}", e)))?;

        info!("✅ Connected to database");
        Ok(Self { connection })
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.connection
    }

    pub async fn create_tables(&self) -> Result<()> {
        info!("Creating capture tables...");

        for stmt in [
            Self::activities_table(),
            Self::nft_prices_table(),
            Self::capture_cursors_table(),
        ] {
            let sql = stmt.to_string(MysqlQueryBuilder);
            self.connection
                .execute_unprepared(&sql)
                .await
                .map_err(|e| Error::Persistence(format!("Failed to create table: {}", e)))?;
        }

        info!("✅ Capture tables ready");
        Ok(())
    }

    fn activities_table() -> TableCreateStatement {
        Table::create()
            .table(Alias::new(ACTIVITIES_TABLE))
            .if_not_exists()
            .col(
                ColumnDef::new(Alias::new("source_event_id"))
                    .string_len(64)
                    .not_null()
                    .primary_key()
            )
            .col(
                ColumnDef::new(Alias::new("order_id"))
                    .string_len(128)
                    .not_null()
            )
            .col(
                ColumnDef::new(Alias::new("contract_address"))
                    .string_len(42)
                    .not_null()
            )
            .col(
                ColumnDef::new(Alias::new("token_index"))
                    .string_len(80)
                    .not_null()
            )
            .col(
                ColumnDef::new(Alias::new("price"))
                    .decimal_len(36, 18)
                    .not_null()
            )
            .col(
                ColumnDef::new(Alias::new("maker"))
                    .string_len(42)
                    .not_null()
            )
            .col(ColumnDef::new(Alias::new("listing_from")).date_time())
            .col(ColumnDef::new(Alias::new("listing_to")).date_time())
            .col(
                ColumnDef::new(Alias::new("observed_at"))
                    .date_time()
                    .not_null()
            )
            .col(
                ColumnDef::new(Alias::new("captured_at"))
                    .date_time()
                    .not_null()
            )
            .index(
                Index::create()
                    .name("idx_activities_nft")
                    .col(Alias::new("contract_address"))
                    .col(Alias::new("token_index"))
            )
            .to_owned()
    }

    fn nft_prices_table() -> TableCreateStatement {
        Table::create()
            .table(Alias::new(NFT_PRICES_TABLE))
            .if_not_exists()
            .col(
                ColumnDef::new(Alias::new("contract_address"))
                    .string_len(42)
                    .not_null()
            )
            .col(
                ColumnDef::new(Alias::new("token_index"))
                    .string_len(80)
                    .not_null()
            )
            .col(ColumnDef::new(Alias::new("current_price")).decimal_len(36, 18))
            .col(
                ColumnDef::new(Alias::new("last_listing_timestamp"))
                    .date_time()
                    .not_null()
            )
            .col(
                ColumnDef::new(Alias::new("updated_at"))
                    .date_time()
                    .not_null()
            )
            .primary_key(
                Index::create()
                    .col(Alias::new("contract_address"))
                    .col(Alias::new("token_index"))
            )
            .to_owned()
    }

    fn capture_cursors_table() -> TableCreateStatement {
        Table::create()
            .table(Alias::new(CAPTURE_CURSORS_TABLE))
            .if_not_exists()
            .col(
                ColumnDef::new(Alias::new("stream"))
                    .string_len(64)
                    .not_null()
                    .primary_key()
            )
            .col(ColumnDef::new(Alias::new("continuation")).text())
            .col(ColumnDef::new(Alias::new("last_event_id")).string_len(64))
            .col(
                ColumnDef::new(Alias::new("updated_at"))
                    .date_time()
                    .not_null()
            )
            .to_owned()
    }

    /// Insert many rows, resolving conflicts per `config`. Returns rows affected.
    pub async fn upsert_many<E, A>(
        &self,
        models: Vec<A>,
        config: &UpsertConfig<E::Column>,
    ) -> Result<u64>
    where
        E: EntityTrait,
        A: ActiveModelTrait<Entity = E> + Send,
        E::Model: IntoActiveModel<A>,
    {
        if models.is_empty() {
            return Ok(0);
        }

        let rows = E::insert_many(models)
            .on_conflict(config.on_conflict())
            .exec_without_returning(&self.connection)
            .await?;

        Ok(rows)
    }

    pub async fn upsert_one<E, A>(&self, model: A, config: &UpsertConfig<E::Column>) -> Result<u64>
    where
        E: EntityTrait,
        A: ActiveModelTrait<Entity = E> + Send,
        E::Model: IntoActiveModel<A>,
    {
        self.upsert_many(vec![model], config).await
    }

    pub async fn read_one<E>(&self, filter: Condition) -> Result<Option<E::Model>>
    where
        E: EntityTrait,
    {
        let row = E::find().filter(filter).one(&self.connection).await?;
        Ok(row)
    }

    fn activity_active_model(activity: &Activity, captured_at: chrono::DateTime<Utc>) -> activities::ActiveModel {
        activities::ActiveModel {
            source_event_id: ActiveValue::Set(activity.source_event_id.clone()),
            order_id: ActiveValue::Set(activity.order_id.clone()),
            contract_address: ActiveValue::Set(activity.nft_key.contract_address.clone()),
            token_index: ActiveValue::Set(activity.nft_key.token_index.clone()),
            price: ActiveValue::Set(activity.price),
            maker: ActiveValue::Set(activity.maker.clone()),
            listing_from: ActiveValue::Set(activity.window.from),
            listing_to: ActiveValue::Set(activity.window.to),
            observed_at: ActiveValue::Set(activity.observed_at),
            captured_at: ActiveValue::Set(captured_at),
        }
    }

    fn price_active_model(fact: &PriceFact, updated_at: chrono::DateTime<Utc>) -> nft_prices::ActiveModel {
        nft_prices::ActiveModel {
            contract_address: ActiveValue::Set(fact.nft_key.contract_address.clone()),
            token_index: ActiveValue::Set(fact.nft_key.token_index.clone()),
            current_price: ActiveValue::Set(fact.current_price),
            last_listing_timestamp: ActiveValue::Set(fact.last_listing_timestamp),
            updated_at: ActiveValue::Set(updated_at),
        }
    }
}

impl From<nft_prices::Model> for PriceFact {
    fn from(model: nft_prices::Model) -> Self {
        PriceFact {
            nft_key: NftKey::new(model.contract_address, model.token_index),
            current_price: model.current_price,
            last_listing_timestamp: model.last_listing_timestamp,
        }
    }
}

impl From<capture_cursors::Model> for Cursor {
    fn from(model: capture_cursors::Model) -> Self {
        Cursor {
            continuation: model.continuation,
            last_event_id: model.last_event_id,
        }
    }
}

#[async_trait]
impl Store for Db {
    async fn insert_activities(&self, activities: &[Activity]) -> Result<u64> {
        let now = Utc::now();
        let models: Vec<activities::ActiveModel> = activities
            .iter()
            .map(|a| Self::activity_active_model(a, now))
            .collect();

        let config = UpsertConfig::ignore(vec![activities::Column::SourceEventId]);
        let rows = self.upsert_many(models, &config).await?;

        debug!("Wrote {} activity rows", rows);
        Ok(rows)
    }

    async fn upsert_price_facts(&self, facts: &[PriceFact]) -> Result<()> {
        let now = Utc::now();
        let models: Vec<nft_prices::ActiveModel> = facts
            .iter()
            .map(|f| Self::price_active_model(f, now))
            .collect();

        let config = UpsertConfig::overwrite(
            vec![
                nft_prices::Column::ContractAddress,
                nft_prices::Column::TokenIndex,
            ],
            vec![
                nft_prices::Column::CurrentPrice,
                nft_prices::Column::LastListingTimestamp,
                nft_prices::Column::UpdatedAt,
            ],
        );
        self.upsert_many(models, &config).await?;

        Ok(())
    }

    async fn load_price_facts(&self, keys: &[NftKey]) -> Result<Vec<PriceFact>> {
        let mut facts = Vec::with_capacity(keys.len());

        for chunk in keys.chunks(PRICE_LOOKUP_CHUNK) {
            let condition = chunk.iter().fold(Condition::any(), |cond, key| {
                cond.add(
                    Condition::all()
                        .add(nft_prices::Column::ContractAddress.eq(key.contract_address.as_str()))
                        .add(nft_prices::Column::TokenIndex.eq(key.token_index.as_str())),
                )
            });

            let rows = nft_prices::Entity::find()
                .filter(condition)
                .all(&self.connection)
                .await?;
            facts.extend(rows.into_iter().map(PriceFact::from));
        }

        Ok(facts)
    }

    async fn load_cursor(&self, stream: &str) -> Result<Option<Cursor>> {
        let row = self
            .read_one::<capture_cursors::Entity>(
                Condition::all().add(capture_cursors::Column::Stream.eq(stream)),
            )
            .await?;
        Ok(row.map(Cursor::from))
    }

    async fn save_cursor(&self, stream: &str, cursor: &Cursor) -> Result<()> {
        let model = capture_cursors::ActiveModel {
            stream: ActiveValue::Set(stream.to_string()),
            continuation: ActiveValue::Set(cursor.continuation.clone()),
            last_event_id: ActiveValue::Set(cursor.last_event_id.clone()),
            updated_at: ActiveValue::Set(Utc::now()),
        };

        let config = UpsertConfig::overwrite(
            vec![capture_cursors::Column::Stream],
            vec![
                capture_cursors::Column::Continuation,
                capture_cursors::Column::LastEventId,
                capture_cursors::Column::UpdatedAt,
            ],
        );
        self.upsert_one(model, &config).await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nft_prices_table_has_composite_key() {
        let sql = Db::nft_prices_table().to_string(MysqlQueryBuilder);

        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS `nft_prices`"));
        assert!(sql.contains("PRIMARY KEY (`contract_address`, `token_index`)"));
        assert!(sql.contains("`current_price` decimal(36, 18)"));
    }

    #[test]
    fn activities_are_keyed_by_source_event() {
        let sql = Db::activities_table().to_string(MysqlQueryBuilder);

        assert!(sql.contains("`source_event_id` varchar(64) NOT NULL PRIMARY KEY"));
        assert!(sql.contains("`idx_activities_nft`"));
    }

    #[test]
    fn stored_price_row_converts_to_fact() {
        let ts = chrono::DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap();
        let fact = PriceFact::from(nft_prices::Model {
            contract_address: "0xABC".into(),
            token_index: "7".into(),
            current_price: None,
            last_listing_timestamp: ts,
            updated_at: ts,
        });

        assert_eq!(fact.nft_key, NftKey::new("0xabc", "7"));
        assert_eq!(fact.current_price, None);
        assert_eq!(fact.last_listing_timestamp, ts);
    }
}
