//! Relational storage through sea-orm (PostgreSQL in production, SQLite in tests)

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectOptions, ConnectionTrait, Database, DatabaseConnection,
    DbBackend, DbErr, EntityTrait, IsolationLevel, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Schema, Set, SqlErr, TransactionTrait,
};
use std::collections::HashMap;
use std::time::Duration;

use crate::entity::{address, user};
use crate::pagination::PageWindow;
use crate::repository::{NewAddress, NewUser, StoreError, StoreResult, UserRepository};

/// Open a connection pool
pub async fn connect(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(database_url);
    opt.max_connections(20)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(8))
        .acquire_timeout(Duration::from_secs(8))
        .sqlx_logging(false);

    let db = Database::connect(opt).await?;
    tracing::info!(backend = ?db.get_database_backend(), "connected to database");

    Ok(db)
}

/// Create the `users` and `addresses` tables when missing
///
/// Existing tables are left alone; column changes need a manual migration.
pub async fn sync_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    let mut users = schema.create_table_from_entity(user::Entity);
    users.if_not_exists();
    db.execute(backend.build(&users)).await?;

    let mut addresses = schema.create_table_from_entity(address::Entity);
    addresses.if_not_exists();
    db.execute(backend.build(&addresses)).await?;

    tracing::info!("database schema synchronized");
    Ok(())
}

fn store_error(err: DbErr) -> StoreError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(detail)) => StoreError::UniqueViolation(detail),
        Some(SqlErr::ForeignKeyConstraintViolation(detail)) => StoreError::ForeignKeyViolation(detail),
        _ => StoreError::Database(err),
    }
}

/// Isolation for reading a page together with its total
///
/// Under READ COMMITTED each statement gets its own snapshot, so the count
/// could see rows the page did not. SQLite transactions are already serializable.
fn page_isolation(backend: DbBackend) -> Option<IsolationLevel> {
    if matches!(backend, DbBackend::Sqlite) {
        None
    } else {
        Some(IsolationLevel::RepeatableRead)
    }
}

fn address_model(user_id: i32, input: NewAddress) -> address::ActiveModel {
    address::ActiveModel {
        cep: Set(input.cep),
        street: Set(input.street),
        street_number: Set(input.street_number),
        complement: Set(input.complement),
        neighborhood: Set(input.neighborhood),
        city: Set(input.city),
        state: Set(input.state),
        user_id: Set(user_id),
        ..Default::default()
    }
}

/// UserRepository backed by a sea-orm connection
#[derive(Debug, Clone)]
pub struct SeaOrmUserRepository {
    db: DatabaseConnection,
}

impl SeaOrmUserRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepository for SeaOrmUserRepository {
    async fn create(&self, input: NewUser) -> StoreResult<user::Model> {
        let txn = self.db.begin().await?;

        let created = user::ActiveModel {
            name: Set(input.name),
            email: Set(input.email),
            password: Set(input.password_hash),
            birth_date: Set(input.birth_date),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(store_error)?;

        for address in input.addresses {
            address_model(created.id, address)
                .insert(&txn)
                .await
                .map_err(store_error)?;
        }

        txn.commit().await?;

        tracing::debug!(user_id = created.id, "inserted user");
        Ok(created)
    }

    async fn find_by_id(&self, id: i32) -> StoreResult<Option<user::Model>> {
        Ok(user::Entity::find_by_id(id).one(&self.db).await?)
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<user::Model>> {
        Ok(user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .one(&self.db)
            .await?)
    }

    async fn page(&self, window: PageWindow) -> StoreResult<(Vec<user::Model>, u64)> {
        let isolation = page_isolation(self.db.get_database_backend());
        let txn = self.db.begin_with_config(isolation, None).await?;

        let users = user::Entity::find()
            .order_by_asc(user::Column::Name)
            .order_by_asc(user::Column::Id)
            .offset(window.skip)
            .limit(window.num_users)
            .all(&txn)
            .await?;
        let total = user::Entity::find().count(&txn).await?;

        txn.commit().await?;
        Ok((users, total))
    }

    async fn delete(&self, id: i32) -> StoreResult<bool> {
        let result = user::Entity::delete_by_id(id).exec(&self.db).await?;

        if result.rows_affected > 0 {
            tracing::debug!(user_id = id, "deleted user");
        }
        Ok(result.rows_affected > 0)
    }

    async fn clear(&self) -> StoreResult<()> {
        let txn = self.db.begin().await?;
        address::Entity::delete_many().exec(&txn).await?;
        let removed = user::Entity::delete_many().exec(&txn).await?;
        txn.commit().await?;

        tracing::debug!(rows = removed.rows_affected, "cleared users");
        Ok(())
    }

    async fn add_address(&self, user_id: i32, address: NewAddress) -> StoreResult<address::Model> {
        address_model(user_id, address)
            .insert(&self.db)
            .await
            .map_err(store_error)
    }

    async fn find_address(&self, id: i32) -> StoreResult<Option<address::Model>> {
        Ok(address::Entity::find_by_id(id).one(&self.db).await?)
    }

    async fn addresses_for_users(&self, user_ids: &[i32]) -> StoreResult<HashMap<i32, Vec<address::Model>>> {
        if user_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = address::Entity::find()
            .filter(address::Column::UserId.is_in(user_ids.iter().copied()))
            .order_by_asc(address::Column::Id)
            .all(&self.db)
            .await?;

        let mut result: HashMap<i32, Vec<address::Model>> = HashMap::new();
        for row in rows {
            result.entry(row.user_id).or_default().push(row);
        }
        Ok(result)
    }
}
