pub mod models;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use tracing::{debug, info};

use crate::error::MandatoError;

pub const INITIAL_SCHEMA: &str = include_str!("../../migrations/001_initial_schema.sql");

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self, MandatoError> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        debug!("Connected to {}", database_url);
        Ok(Database { pool })
    }

    /// Single-connection in-memory database; every pooled connection would
    /// otherwise see its own empty database.
    pub async fn new_in_memory() -> Result<Self, MandatoError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let database = Database { pool };
        database.run_migrations().await?;
        Ok(database)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Apply the schema; every statement is `IF NOT EXISTS`
    pub async fn run_migrations(&self) -> Result<(), MandatoError> {
        sqlx::raw_sql(INITIAL_SCHEMA).execute(&self.pool).await?;
        info!("Database schema is up to date");
        Ok(())
    }

    /// Row counts for the status endpoint
    pub async fn table_counts(&self) -> Result<Vec<(String, i64)>, MandatoError> {
        let tables = [
            "usuarios",
            "eleitores",
            "liderancas",
            "funcionarios",
            "solicitacoes",
            "emendas",
            "documentos",
            "logs_auditoria",
        ];

        let mut counts = Vec::with_capacity(tables.len());
        for table in tables {
            let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
                .fetch_one(&self.pool)
                .await?;
            counts.push((table.to_string(), count));
        }
        Ok(counts)
    }
}
