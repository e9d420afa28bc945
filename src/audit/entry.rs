//! Audit and access log records

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;

use crate::database::models::AcaoAuditoria;
use crate::export::Exportable;

/// One row of `logs_auditoria`
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AuditEntry {
    pub id: i64,
    pub usuario_id: Option<i64>,
    pub usuario_nome: Option<String>,
    pub acao: AcaoAuditoria,
    pub entidade: String,
    pub entidade_id: Option<i64>,
    pub detalhes: Json<serde_json::Value>,
    pub criado_em: DateTime<Utc>,
}

impl AuditEntry {
    /// Human-readable summary used in logs and exports
    pub fn summary(&self) -> String {
        match self.entidade_id {
            Some(id) => format!("{} {} #{}", self.acao, self.entidade, id),
            None => format!("{} {}", self.acao, self.entidade),
        }
    }
}

/// Query-string filters of the audit log screen
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditFilter {
    pub usuario_id: Option<i64>,
    pub acao: Option<AcaoAuditoria>,
    pub entidade: Option<String>,
    /// Substring of the JSON details
    pub texto: Option<String>,
    pub data_inicio: Option<NaiveDate>,
    pub data_fim: Option<NaiveDate>,
    pub page: Option<usize>,
    pub per_page: Option<usize>,
}

/// One row of `logs_acessos`
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AccessEntry {
    pub id: i64,
    pub usuario_id: Option<i64>,
    pub email: String,
    pub sucesso: bool,
    pub motivo: Option<String>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub criado_em: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccessFilter {
    pub email: Option<String>,
    pub sucesso: Option<bool>,
    pub data_inicio: Option<NaiveDate>,
    pub data_fim: Option<NaiveDate>,
    pub page: Option<usize>,
    pub per_page: Option<usize>,
}

/// Request metadata stored with each login attempt
#[derive(Debug, Clone, Default)]
pub struct AccessContext {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

impl Exportable for AuditEntry {
    fn headers() -> &'static [&'static str] {
        &["Data", "Usuário", "Ação", "Entidade", "ID", "Detalhes"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.criado_em.format("%d/%m/%Y %H:%M").to_string(),
            self.usuario_nome.clone().unwrap_or_else(|| "sistema".to_string()),
            self.acao.to_string(),
            self.entidade.clone(),
            self.entidade_id.map(|id| id.to_string()).unwrap_or_default(),
            self.detalhes.0.to_string(),
        ]
    }
}

impl Exportable for AccessEntry {
    fn headers() -> &'static [&'static str] {
        &["Data", "E-mail", "Sucesso", "Motivo", "IP"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.criado_em.format("%d/%m/%Y %H:%M").to_string(),
            self.email.clone(),
            if self.sucesso { "sim" } else { "não" }.to_string(),
            self.motivo.clone().unwrap_or_default(),
            self.ip.clone().unwrap_or_default(),
        ]
    }
}
