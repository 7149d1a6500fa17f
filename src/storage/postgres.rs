use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgRow};
use sqlx::{Postgres, QueryBuilder, Row};
use uuid::Uuid;

use crate::config::PostgresConfig;
use crate::domain::account::{Account, AccountStore, Credential, ListQuery, StorageError};
use crate::utils::{retry, RetryPolicy};

// ============================================================================
// PostgreSQL Account Store
// ============================================================================
//
// Table `accounts`, one row per account. Email uniqueness is a UNIQUE
// constraint; a violation comes back as SQLSTATE 23505.
//
// ============================================================================

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS accounts (
        id          UUID PRIMARY KEY,
        email       TEXT NOT NULL UNIQUE,
        first_name  TEXT NOT NULL,
        last_name   TEXT NOT NULL,
        handle      TEXT NOT NULL,
        country     TEXT NOT NULL,
        credential  TEXT NOT NULL,
        created_at  TIMESTAMPTZ NOT NULL,
        updated_at  TIMESTAMPTZ
    )
    "#,
    "CREATE INDEX IF NOT EXISTS accounts_created_at_id_idx ON accounts (created_at, id)",
];

const COLUMNS: &str = "id, email, first_name, last_name, handle, country, credential, created_at, updated_at";

const UNIQUE_VIOLATION: &str = "23505";

/// Classify sqlx failures into the three storage error kinds.
trait SqlxResultExt<T> {
    fn map_storage(self) -> Result<T, StorageError>;
}

impl<T> SqlxResultExt<T> for Result<T, sqlx::Error> {
    fn map_storage(self) -> Result<T, StorageError> {
        self.map_err(|e| match e {
            sqlx::Error::RowNotFound => StorageError::NotFound,
            sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) => {
                StorageError::UniquenessConflict(db_err.constraint().unwrap_or("unique").to_string())
            }
            other => StorageError::other(other),
        })
    }
}

pub struct PgAccountStore {
    pool: PgPool,
}

impl PgAccountStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Build a pool without connecting; the first query (or
    /// `wait_until_ready`) opens the connections.
    pub fn connect_lazy(config: &PostgresConfig) -> Self {
        let options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .database(&config.dbname)
            .username(&config.username)
            .password(&config.password);

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect_lazy_with(options);

        Self::new(pool)
    }

    pub async fn ensure_schema(&self) -> Result<(), StorageError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await.map_storage()?;
        }
        tracing::info!("Account schema ready");
        Ok(())
    }

    pub async fn ping(&self) -> Result<(), StorageError> {
        sqlx::query_scalar::<Postgres, bool>("SELECT true")
            .fetch_one(&self.pool)
            .await
            .map(|_| ())
            .map_storage()
    }

    pub async fn wait_until_ready(&self, policy: &RetryPolicy) -> Result<(), StorageError> {
        retry(policy, "postgres ping", |_| self.ping()).await
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn account_from_row(row: &PgRow) -> Result<Account, sqlx::Error> {
    Ok(Account {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        handle: row.try_get("handle")?,
        country: row.try_get("country")?,
        credential: Credential::from_hash(row.try_get::<String, _>("credential")?),
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// `SELECT` for one filtered page. Only present filters become predicates.
fn build_list_query(query: &ListQuery) -> QueryBuilder<'_, Postgres> {
    let mut builder = QueryBuilder::new(format!("SELECT {COLUMNS} FROM accounts"));

    let filters = [
        ("country", query.filter.country.as_deref()),
        ("email", query.filter.email.as_deref()),
        ("handle", query.filter.handle.as_deref()),
    ];

    let mut separator = " WHERE ";
    for (column, value) in filters {
        if let Some(value) = value {
            builder.push(separator).push(column).push(" = ").push_bind(value);
            separator = " AND ";
        }
    }

    builder
        .push(" ORDER BY created_at, id LIMIT ")
        .push_bind(i64::try_from(query.page_size()).unwrap_or(i64::MAX))
        .push(" OFFSET ")
        .push_bind(i64::try_from(query.offset()).unwrap_or(i64::MAX));

    builder
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn insert(&self, account: &Account) -> Result<Uuid, StorageError> {
        sqlx::query_scalar::<Postgres, Uuid>(
            r#"
            INSERT INTO accounts (
                id, email, first_name, last_name, handle,
                country, credential, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id
            "#,
        )
        .bind(account.id)
        .bind(account.email.as_str())
        .bind(account.first_name.as_str())
        .bind(account.last_name.as_str())
        .bind(account.handle.as_str())
        .bind(account.country.as_str())
        .bind(account.credential.as_str())
        .bind(account.created_at)
        .bind(account.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_storage()
    }

    async fn update_by_id(&self, id: Uuid, account: &Account) -> Result<(), StorageError> {
        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET email = $2, first_name = $3, last_name = $4, handle = $5,
                country = $6, credential = $7, updated_at = $8
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(account.email.as_str())
        .bind(account.first_name.as_str())
        .bind(account.last_name.as_str())
        .bind(account.handle.as_str())
        .bind(account.country.as_str())
        .bind(account.credential.as_str())
        .bind(account.updated_at)
        .execute(&self.pool)
        .await
        .map_storage()?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM accounts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_storage()?;
        Ok(())
    }

    async fn exists_by_id(&self, id: Uuid) -> Result<bool, StorageError> {
        sqlx::query_scalar::<Postgres, bool>("SELECT EXISTS(SELECT 1 FROM accounts WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_storage()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Account, StorageError> {
        let row = sqlx::query(&format!("SELECT {COLUMNS} FROM accounts WHERE id = $1"))
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_storage()?;

        account_from_row(&row).map_storage()
    }

    async fn find_by_filter(&self, query: &ListQuery) -> Result<Vec<Account>, StorageError> {
        let mut builder = build_list_query(query);
        let rows = builder.build().fetch_all(&self.pool).await.map_storage()?;

        rows.iter()
            .map(account_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_storage()
    }
}
