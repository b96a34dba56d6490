use crate::migrations::run_migrations;
use crate::postgres::admin_connect_options;
use crate::{HistoryStore, PgStore};
use history_models::{DatabaseConfig, FileSequence, HistoryError};
use sqlx::postgres::PgPoolOptions;
use sqlx::{Connection, Executor, PgConnection, Row};
use tracing::{info, instrument, warn};

const MAINTENANCE_DATABASE: &str = "postgres";

#[derive(Debug, Clone)]
pub struct BootstrapOptions {
    /// Target database, collector user and superuser credentials.
    pub database: DatabaseConfig,
    pub first_file: FileSequence,
    /// Drop an existing database and user first.
    pub force: bool,
}

/// DDL cannot bind identifiers, so names are restricted to plain lowercase SQL identifiers.
pub fn validate_identifier(kind: &str, value: &str) -> Result<(), HistoryError> {
    let mut chars = value.chars();
    let valid_start = matches!(chars.next(), Some(c) if c.is_ascii_lowercase() || c == '_');
    let valid_rest = chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if valid_start && valid_rest && value.len() <= 63 {
        Ok(())
    } else {
        Err(HistoryError::InvalidRequest {
            reason: format!("invalid {} name: {:?}", kind, value),
        })
    }
}

fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Creates the collector database and user, applies the schema and seeds the cursor.
#[instrument(skip(options), fields(database = %options.database.name, user = %options.database.user, first_file = %options.first_file))]
pub async fn bootstrap(options: &BootstrapOptions) -> Result<(), HistoryError> {
    let db = &options.database;
    validate_identifier("database", &db.name)?;
    validate_identifier("user", &db.user)?;
    if !options.first_file.is_checkpoint() {
        return Err(HistoryError::InvalidFileSequence {
            value: options.first_file.name(),
        });
    }

    let mut admin =
        PgConnection::connect_with(&admin_connect_options(db, MAINTENANCE_DATABASE)).await?;

    let exists: bool = sqlx::query(
        "SELECT EXISTS(SELECT 1 FROM pg_catalog.pg_database WHERE lower(datname) = lower($1))",
    )
    .bind(&db.name)
    .fetch_one(&mut admin)
    .await?
    .try_get(0)?;

    if exists {
        if !options.force {
            return Err(HistoryError::DatabaseExists {
                name: db.name.clone(),
            });
        }
        warn!("Dropping existing database");
        admin
            .execute(format!("DROP DATABASE {}", db.name).as_str())
            .await?;
        admin
            .execute(format!("DROP USER IF EXISTS {}", db.user).as_str())
            .await?;
    }

    admin
        .execute(format!("CREATE DATABASE {}", db.name).as_str())
        .await?;

    let role_exists: bool =
        sqlx::query("SELECT EXISTS(SELECT 1 FROM pg_catalog.pg_roles WHERE rolname = $1)")
            .bind(&db.user)
            .fetch_one(&mut admin)
            .await?
            .try_get(0)?;
    let role_statement = if role_exists {
        "ALTER USER"
    } else {
        "CREATE USER"
    };
    admin
        .execute(
            format!(
                "{} {} WITH ENCRYPTED PASSWORD {}",
                role_statement,
                db.user,
                quote_literal(&db.password)
            )
            .as_str(),
        )
        .await?;
    admin
        .execute(format!("GRANT ALL ON DATABASE {} TO {}", db.name, db.user).as_str())
        .await?;
    admin.close().await?;

    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect_with(admin_connect_options(db, &db.name))
        .await?;
    run_migrations(&pool).await?;
    // The collector re-runs the migration at startup, which needs table ownership.
    for statement in [
        format!("GRANT ALL ON SCHEMA public TO {}", db.user),
        format!("ALTER TABLE payments OWNER TO {}", db.user),
        format!("ALTER TABLE trustlines OWNER TO {}", db.user),
        format!("ALTER TABLE lastfile OWNER TO {}", db.user),
    ] {
        pool.execute(statement.as_str()).await?;
    }

    let store = PgStore::new(pool);
    store.seed_cursor(options.first_file).await?;
    store.pool().close().await;

    info!("Database created successfully");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_validation() {
        assert!(validate_identifier("database", "kin").is_ok());
        assert!(validate_identifier("user", "python_2").is_ok());
        assert!(validate_identifier("user", "_svc").is_ok());
        assert!(validate_identifier("database", "").is_err());
        assert!(validate_identifier("database", "2kin").is_err());
        assert!(validate_identifier("database", "Kin").is_err());
        assert!(validate_identifier("database", "kin; DROP TABLE x").is_err());
        assert!(validate_identifier("database", &"a".repeat(64)).is_err());
    }

    #[test]
    fn test_quote_literal_escapes_quotes() {
        assert_eq!(quote_literal("pa'ss"), "'pa''ss'");
    }

    #[tokio::test]
    async fn test_rejects_non_checkpoint_before_connecting() {
        let mut database = history_models::Config::default().database;
        database.host = "unreachable.invalid".to_string();
        let options = BootstrapOptions {
            database,
            first_file: FileSequence::new(0x40),
            force: false,
        };
        assert!(matches!(
            bootstrap(&options).await,
            Err(HistoryError::InvalidFileSequence { .. })
        ));
    }
}
