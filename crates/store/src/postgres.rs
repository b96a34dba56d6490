use crate::migrations::run_migrations;
use crate::HistoryStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use history_models::{
    AccountQuery, CollectorCursor, DatabaseConfig, FileSequence, HistoryError, Payment, Trustline,
};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use tracing::{info, instrument};

const PAYMENT_COLUMNS: &str =
    "source, destination, amount, memo_text, tx_hash, op_index, ledger_sequence, time";
const TRUSTLINE_COLUMNS: &str =
    "source, trust_limit, memo_text, tx_hash, op_index, ledger_sequence, time";

/// Options for the collector's own connections: `database.url` when set, else the split fields.
pub fn connect_options(config: &DatabaseConfig) -> Result<PgConnectOptions, HistoryError> {
    match &config.url {
        Some(url) => url
            .parse::<PgConnectOptions>()
            .map_err(|e| HistoryError::ConfigError {
                reason: format!("database.url: {}", e),
            }),
        None => Ok(PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(&config.password)
            .database(&config.name)),
    }
}

/// Options for the superuser connection used by `init-db`, on the given database.
pub fn admin_connect_options(config: &DatabaseConfig, database: &str) -> PgConnectOptions {
    PgConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .username(&config.admin_user)
        .password(&config.admin_password)
        .database(database)
}

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[instrument(skip(config), fields(host = %config.host, database = %config.name))]
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, HistoryError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(connect_options(config)?)
            .await?;
        info!("Connected to postgres");
        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), HistoryError> {
        run_migrations(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn ledger_sequence(row: &PgRow) -> Result<u32, HistoryError> {
    let raw: i64 = row.try_get("ledger_sequence")?;
    u32::try_from(raw).map_err(|_| HistoryError::DatabaseError {
        reason: format!("ledger_sequence out of range: {}", raw),
    })
}

fn op_index(row: &PgRow) -> Result<u32, HistoryError> {
    let raw: i32 = row.try_get("op_index")?;
    u32::try_from(raw).map_err(|_| HistoryError::DatabaseError {
        reason: format!("op_index out of range: {}", raw),
    })
}

fn payment_from_row(row: &PgRow) -> Result<Payment, HistoryError> {
    Ok(Payment {
        source: row.try_get("source")?,
        destination: row.try_get("destination")?,
        amount: row.try_get("amount")?,
        memo_text: row.try_get("memo_text")?,
        tx_hash: row.try_get("tx_hash")?,
        op_index: op_index(row)?,
        ledger_sequence: ledger_sequence(row)?,
        time: row.try_get::<DateTime<Utc>, _>("time")?,
    })
}

fn trustline_from_row(row: &PgRow) -> Result<Trustline, HistoryError> {
    Ok(Trustline {
        source: row.try_get("source")?,
        limit: row.try_get("trust_limit")?,
        memo_text: row.try_get("memo_text")?,
        tx_hash: row.try_get("tx_hash")?,
        op_index: op_index(row)?,
        ledger_sequence: ledger_sequence(row)?,
        time: row.try_get::<DateTime<Utc>, _>("time")?,
    })
}

#[async_trait]
impl HistoryStore for PgStore {
    async fn cursor(&self) -> Result<Option<CollectorCursor>, HistoryError> {
        let row = sqlx::query("SELECT name, processed FROM lastfile LIMIT 1")
            .fetch_optional(&self.pool)
            .await?;
        match row {
            None => Ok(None),
            Some(row) => {
                let name: String = row.try_get("name")?;
                Ok(Some(CollectorCursor {
                    file: FileSequence::parse(&name)?,
                    processed: row.try_get("processed")?,
                }))
            }
        }
    }

    async fn seed_cursor(&self, file: FileSequence) -> Result<(), HistoryError> {
        sqlx::query(
            "INSERT INTO lastfile (id, name, processed) VALUES (TRUE, $1, FALSE) \
             ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name, processed = FALSE",
        )
        .bind(file.name())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    #[instrument(skip(self, file, payments, trustlines), fields(file = %file, payments = payments.len(), trustlines = trustlines.len()))]
    async fn commit_checkpoint(
        &self,
        file: FileSequence,
        payments: &[Payment],
        trustlines: &[Trustline],
    ) -> Result<(), HistoryError> {
        let mut tx = self.pool.begin().await?;

        for payment in payments {
            sqlx::query(&format!(
                "INSERT INTO payments ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
                 ON CONFLICT (tx_hash, op_index) DO NOTHING",
                PAYMENT_COLUMNS
            ))
            .bind(&payment.source)
            .bind(&payment.destination)
            .bind(payment.amount)
            .bind(&payment.memo_text)
            .bind(&payment.tx_hash)
            .bind(payment.op_index as i32)
            .bind(payment.ledger_sequence as i64)
            .bind(payment.time)
            .execute(&mut *tx)
            .await?;
        }

        for trustline in trustlines {
            sqlx::query(&format!(
                "INSERT INTO trustlines ({}) VALUES ($1, $2, $3, $4, $5, $6, $7) \
                 ON CONFLICT (tx_hash, op_index) DO NOTHING",
                TRUSTLINE_COLUMNS
            ))
            .bind(&trustline.source)
            .bind(trustline.limit)
            .bind(&trustline.memo_text)
            .bind(&trustline.tx_hash)
            .bind(trustline.op_index as i32)
            .bind(trustline.ledger_sequence as i64)
            .bind(trustline.time)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query(
            "INSERT INTO lastfile (id, name, processed) VALUES (TRUE, $1, TRUE) \
             ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name, processed = TRUE",
        )
        .bind(file.name())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn payments_by_source(&self, query: &AccountQuery) -> Result<Vec<Payment>, HistoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM payments WHERE source = $1 \
             ORDER BY ledger_sequence DESC, id DESC LIMIT $2",
            PAYMENT_COLUMNS
        ))
        .bind(&query.source)
        .bind(query.limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(payment_from_row).collect()
    }

    async fn payment_by_hash(&self, tx_hash: &str) -> Result<Option<Payment>, HistoryError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM payments WHERE tx_hash = $1 ORDER BY op_index LIMIT 1",
            PAYMENT_COLUMNS
        ))
        .bind(tx_hash)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(payment_from_row).transpose()
    }

    async fn trustlines_by_source(&self, query: &AccountQuery) -> Result<Vec<Trustline>, HistoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM trustlines WHERE source = $1 \
             ORDER BY ledger_sequence DESC, id DESC LIMIT $2",
            TRUSTLINE_COLUMNS
        ))
        .bind(&query.source)
        .bind(query.limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(trustline_from_row).collect()
    }

    async fn ping(&self) -> Result<(), HistoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use history_models::Config;

    #[test]
    fn test_connect_options_from_fields() {
        let mut config = Config::default().database;
        config.host = "localhost".to_string();
        config.password = "1234".to_string();
        let options = connect_options(&config).unwrap();
        assert_eq!(options.get_host(), "localhost");
        assert_eq!(options.get_port(), 5432);
        assert_eq!(options.get_username(), "python");
        assert_eq!(options.get_database(), Some("kin"));
    }

    #[test]
    fn test_connect_options_prefers_url() {
        let mut config = Config::default().database;
        config.url = Some("postgres://reader:pw@db.internal:6543/history".to_string());
        let options = connect_options(&config).unwrap();
        assert_eq!(options.get_host(), "db.internal");
        assert_eq!(options.get_port(), 6543);
        assert_eq!(options.get_database(), Some("history"));

        config.url = Some("not a url".to_string());
        assert!(matches!(
            connect_options(&config),
            Err(HistoryError::ConfigError { .. })
        ));
    }

    #[test]
    fn test_admin_options_use_admin_credentials() {
        let config = Config::default().database;
        let options = admin_connect_options(&config, "postgres");
        assert_eq!(options.get_username(), "postgres");
        assert_eq!(options.get_database(), Some("postgres"));
    }
}
