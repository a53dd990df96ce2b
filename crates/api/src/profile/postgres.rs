//! [`PgProfileStore`]: [`ProfileStore`] backed by a PostgreSQL connection pool.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use common::protocol::UserProfile;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, Transaction};
use tracing::{debug, warn};

use super::{ProfileRecord, ProfileStore, StoreError, UpsertOutcome};
use crate::config::Config;

const UPDATE_PROFILE: &str = "UPDATE profiles \
     SET first_name = $1, last_name = $2, number = $3 \
     WHERE id = $4::uuid";

const INSERT_PROFILE: &str = "INSERT INTO profiles \
     (id, first_name, last_name, number, password, is_social_login) \
     VALUES ($1::uuid, $2, $3, $4, $5, $6)";

const SELECT_PROFILE: &str = "SELECT first_name, last_name, number, is_social_login \
     FROM profiles WHERE id = $1::uuid";

#[derive(sqlx::FromRow)]
struct ProfileRow {
    first_name: String,
    last_name: String,
    number: String,
    is_social_login: Option<bool>,
}

impl From<ProfileRow> for ProfileRecord {
    fn from(row: ProfileRow) -> Self {
        Self {
            first_name: row.first_name,
            last_name: row.last_name,
            number: row.number,
            // Rows written before the column existed carry NULL.
            is_social_login: row.is_social_login.unwrap_or(false),
        }
    }
}

/// PostgreSQL-backed profile store.
///
/// Every operation borrows a connection from the pool for its own duration;
/// the connection returns to the pool when the query or transaction is dropped,
/// on success and error paths alike.
#[derive(Clone, Debug)]
pub struct PgProfileStore {
    pool: PgPool,
}

impl PgProfileStore {
    /// Open a connection pool sized from `cfg` and verify the database is reachable.
    ///
    /// # Errors
    ///
    /// Returns an error if no connection can be established.
    pub async fn connect(cfg: &Config) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(cfg.database_max_connections)
            .acquire_timeout(Duration::from_secs(cfg.database_acquire_timeout_secs))
            .connect(&cfg.database_url)
            .await
            .context("failed to connect to the database")?;
        Ok(Self::from_pool(pool))
    }

    /// Wrap an existing pool.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileStore for PgProfileStore {
    async fn upsert(
        &self,
        subject: &str,
        profile: &UserProfile,
    ) -> Result<UpsertOutcome, StoreError> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(UPDATE_PROFILE)
            .bind(&profile.first_name)
            .bind(&profile.last_name)
            .bind(&profile.mobile_number)
            .bind(subject)
            .execute(&mut *tx)
            .await;
        match updated {
            Ok(done) if done.rows_affected() > 0 => {
                tx.commit().await?;
                return Ok(UpsertOutcome::Updated);
            }
            Ok(_) => {}
            Err(e) => return Err(abort(tx, e).await),
        }

        let inserted = sqlx::query(INSERT_PROFILE)
            .bind(subject)
            .bind(&profile.first_name)
            .bind(&profile.last_name)
            .bind(&profile.mobile_number)
            .bind(profile.stored_password())
            .bind(profile.is_social_login())
            .execute(&mut *tx)
            .await;
        match inserted {
            Ok(_) => {
                tx.commit().await?;
                Ok(UpsertOutcome::Created)
            }
            Err(e) if is_unique_violation(&e) => {
                tx.rollback().await?;
                debug!("profile inserted concurrently by another request");
                Ok(UpsertOutcome::AlreadyExists)
            }
            Err(e) => Err(abort(tx, e).await),
        }
    }

    async fn fetch(&self, subject: &str) -> Result<Option<ProfileRecord>, StoreError> {
        let row = sqlx::query_as::<_, ProfileRow>(SELECT_PROFILE)
            .bind(subject)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(ProfileRecord::from))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

/// Roll back `tx` and convert the error that caused it.
async fn abort(tx: Transaction<'_, Postgres>, err: sqlx::Error) -> StoreError {
    if let Err(rollback_err) = tx.rollback().await {
        warn!(error = %rollback_err, "rollback failed; connection will be discarded");
    }
    StoreError::Database(err)
}

/// These tests need a scratch PostgreSQL database:
///
/// ```text
/// TEST_DATABASE_URL=postgres://localhost/solar_test cargo test -p api -- --ignored
/// ```
#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    async fn test_store() -> PgProfileStore {
        let url = std::env::var("TEST_DATABASE_URL").expect("TEST_DATABASE_URL must be set");
        let pool = PgPool::connect(&url).await.unwrap();
        load_schema(pool).await
    }

    async fn small_store(max_connections: u32) -> PgProfileStore {
        let url = std::env::var("TEST_DATABASE_URL").expect("TEST_DATABASE_URL must be set");
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect(&url)
            .await
            .unwrap();
        load_schema(pool).await
    }

    async fn load_schema(pool: PgPool) -> PgProfileStore {
        sqlx::raw_sql(include_str!("../../sql/profiles.sql"))
            .execute(&pool)
            .await
            .unwrap();
        PgProfileStore::from_pool(pool)
    }

    fn profile(first: &str, password: Option<&str>) -> UserProfile {
        UserProfile {
            first_name: first.into(),
            last_name: "Rao".into(),
            mobile_number: "9876543210".into(),
            password: password.map(Into::into),
        }
    }

    async fn stored_password(store: &PgProfileStore, subject: &str) -> Option<String> {
        sqlx::query_scalar("SELECT password FROM profiles WHERE id = $1::uuid")
            .bind(subject)
            .fetch_one(&store.pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    #[ignore = "requires TEST_DATABASE_URL"]
    async fn fetch_before_save_is_none() {
        let store = test_store().await;
        let subject = Uuid::new_v4().to_string();
        assert_eq!(store.fetch(&subject).await.unwrap(), None);
    }

    #[tokio::test]
    #[ignore = "requires TEST_DATABASE_URL"]
    async fn first_save_creates_password_account() {
        let store = test_store().await;
        let subject = Uuid::new_v4().to_string();

        let outcome = store.upsert(&subject, &profile("Asha", Some("pw"))).await.unwrap();
        assert_eq!(outcome, UpsertOutcome::Created);

        let record = store.fetch(&subject).await.unwrap().unwrap();
        assert_eq!(record.first_name, "Asha");
        assert_eq!(record.number, "9876543210");
        assert!(!record.is_social_login);
        assert_eq!(stored_password(&store, &subject).await.as_deref(), Some("pw"));
    }

    #[tokio::test]
    #[ignore = "requires TEST_DATABASE_URL"]
    async fn empty_password_creates_social_login() {
        let store = test_store().await;
        let subject = Uuid::new_v4().to_string();

        store.upsert(&subject, &profile("Asha", Some(""))).await.unwrap();

        let record = store.fetch(&subject).await.unwrap().unwrap();
        assert!(record.is_social_login);
        assert_eq!(stored_password(&store, &subject).await, None);
    }

    #[tokio::test]
    #[ignore = "requires TEST_DATABASE_URL"]
    async fn resave_updates_names_but_keeps_credentials() {
        let store = test_store().await;
        let subject = Uuid::new_v4().to_string();

        store.upsert(&subject, &profile("Asha", Some("pw"))).await.unwrap();
        let outcome = store.upsert(&subject, &profile("Meera", None)).await.unwrap();
        assert_eq!(outcome, UpsertOutcome::Updated);

        let record = store.fetch(&subject).await.unwrap().unwrap();
        assert_eq!(record.first_name, "Meera");
        assert!(!record.is_social_login);
        assert_eq!(stored_password(&store, &subject).await.as_deref(), Some("pw"));
    }

    #[tokio::test]
    #[ignore = "requires TEST_DATABASE_URL"]
    async fn concurrent_first_saves_insert_once() {
        let store = test_store().await;
        let subject = Uuid::new_v4().to_string();
        let (a, b) = (store.clone(), store.clone());
        let first = profile("Asha", Some("pw"));
        let second = profile("Meera", Some(""));

        let (ra, rb) = tokio::join!(a.upsert(&subject, &first), b.upsert(&subject, &second));
        let outcomes = [ra.unwrap(), rb.unwrap()];

        let created = outcomes.iter().filter(|o| **o == UpsertOutcome::Created).count();
        // The loser sees AlreadyExists when it raced the insert, Updated when it
        // started after the winner committed.
        assert_eq!(created, 1, "outcomes: {outcomes:?}");

        let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM profiles WHERE id = $1::uuid")
            .bind(&subject)
            .fetch_one(&store.pool)
            .await
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[tokio::test]
    #[ignore = "requires TEST_DATABASE_URL"]
    async fn insert_blocked_by_uncommitted_winner_reports_already_exists() {
        let store = small_store(3).await;
        let subject = Uuid::new_v4().to_string();

        let mut winner = store.pool.begin().await.unwrap();
        sqlx::query(INSERT_PROFILE)
            .bind(&subject)
            .bind("W")
            .bind("Rao")
            .bind("1111111111")
            .bind(Some("pw"))
            .bind(false)
            .execute(&mut *winner)
            .await
            .unwrap();

        let loser = tokio::spawn({
            let store = store.clone();
            let subject = subject.clone();
            async move { store.upsert(&subject, &profile("Meera", Some(""))).await }
        });

        // The loser's UPDATE sees no row, so its INSERT waits on the unique index.
        let mut waiting = false;
        for _ in 0..100 {
            waiting = sqlx::query_scalar(
                "SELECT EXISTS (SELECT 1 FROM pg_stat_activity \
                 WHERE datname = current_database() \
                 AND wait_event_type = 'Lock' \
                 AND query LIKE 'INSERT INTO profiles%')",
            )
            .fetch_one(&store.pool)
            .await
            .unwrap();
            if waiting {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        assert!(waiting, "upsert never blocked on the pending insert");

        winner.commit().await.unwrap();
        assert_eq!(loser.await.unwrap().unwrap(), UpsertOutcome::AlreadyExists);

        let record = store.fetch(&subject).await.unwrap().unwrap();
        assert_eq!(record.first_name, "W");
        assert_eq!(record.number, "1111111111");
        assert!(!record.is_social_login);
        assert_eq!(stored_password(&store, &subject).await.as_deref(), Some("pw"));

        // Every connection went back to the pool.
        let (a, b, c) = tokio::join!(
            store.pool.acquire(),
            store.pool.acquire(),
            store.pool.acquire()
        );
        assert!(a.is_ok() && b.is_ok() && c.is_ok());
    }

    #[tokio::test]
    #[ignore = "requires TEST_DATABASE_URL"]
    async fn malformed_subject_is_a_storage_error() {
        let store = test_store().await;
        let result = store.upsert("not-a-uuid", &profile("Asha", None)).await;
        assert!(matches!(result, Err(StoreError::Database(_))));
    }

    #[tokio::test]
    #[ignore = "requires TEST_DATABASE_URL"]
    async fn ping_succeeds() {
        let store = test_store().await;
        store.ping().await.unwrap();
    }
}
