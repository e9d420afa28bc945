use std::sync::Arc;

use crate::audit::AuditLogger;
use crate::comunicacao::Gateway;
use crate::config::AppConfig;
use crate::database::Database;
use crate::error::MandatoError;

/// Shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub database: Database,
    pub audit: AuditLogger,
    pub gateway: Gateway,
}

impl AppState {
    pub fn new(config: AppConfig, database: Database) -> Result<Self, MandatoError> {
        let gateway = Gateway::from_config(&config.messaging)?;
        let audit = AuditLogger::new(database.pool().clone());

        Ok(Self {
            config: Arc::new(config),
            database,
            audit,
            gateway,
        })
    }

    pub fn with_gateway(mut self, gateway: Gateway) -> Self {
        self.gateway = gateway;
        self
    }
}
