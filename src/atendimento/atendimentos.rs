//! Constituent service records

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::audit::AuditLogger;
use crate::config::PaginationConfig;
use crate::database::models::AcaoAuditoria;
use crate::database::Database;
use crate::error::MandatoError;
use crate::listing::{
    matches_eq, matches_query, matches_text, paginate, DateRange, ListParams, Page, Searchable,
};
use crate::validation::{FieldErrors, Validate};

const SELECT_ATENDIMENTO: &str = r#"
    SELECT a.*, e.nome AS eleitor_nome, u.nome AS usuario_nome
    FROM atendimentos a
    JOIN eleitores e ON e.id = a.eleitor_id
    LEFT JOIN usuarios u ON u.id = a.usuario_id
"#;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Atendimento {
    pub id: i64,
    pub eleitor_id: i64,
    pub eleitor_nome: String,
    pub usuario_id: Option<i64>,
    pub usuario_nome: Option<String>,
    pub tipo: String,
    pub descricao: String,
    pub data: NaiveDate,
    pub criado_em: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AtendimentoPayload {
    pub eleitor_id: i64,
    pub tipo: String,
    pub descricao: String,
    pub data: NaiveDate,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AtendimentoFilter {
    pub eleitor_id: Option<i64>,
    pub tipo: Option<String>,
    pub data_inicio: Option<NaiveDate>,
    pub data_fim: Option<NaiveDate>,
}

impl Searchable for Atendimento {
    fn search_fields(&self) -> Vec<&str> {
        vec![
            self.eleitor_nome.as_str(),
            self.tipo.as_str(),
            self.descricao.as_str(),
        ]
    }
}

impl Validate for AtendimentoPayload {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.required("tipo", &self.tipo);
        errors.required("descricao", &self.descricao);
        errors.max_len("descricao", &self.descricao, 5000);
        errors.into_result()
    }
}

#[derive(Clone)]
pub struct AtendimentoRegistry {
    pool: SqlitePool,
    audit: AuditLogger,
}

impl AtendimentoRegistry {
    pub fn new(database: &Database) -> Self {
        Self {
            pool: database.pool().clone(),
            audit: AuditLogger::new(database.pool().clone()),
        }
    }

    pub async fn list(
        &self,
        filter: &AtendimentoFilter,
        params: &ListParams,
        pagination: &PaginationConfig,
    ) -> Result<Page<Atendimento>, MandatoError> {
        let sql = format!("{} ORDER BY a.data DESC, a.id DESC", SELECT_ATENDIMENTO);
        let all = sqlx::query_as::<_, Atendimento>(&sql).fetch_all(&self.pool).await?;
        let range = DateRange::new(filter.data_inicio, filter.data_fim);

        let filtered: Vec<Atendimento> = all
            .into_iter()
            .filter(|a| matches_query(a, params.query()))
            .filter(|a| matches_eq(Some(a.eleitor_id), filter.eleitor_id))
            .filter(|a| matches_text(Some(&a.tipo), filter.tipo.as_deref()))
            .filter(|a| range.contains(a.data))
            .collect();

        Ok(paginate(filtered, params.page_request(pagination)))
    }

    pub async fn get(&self, id: i64) -> Result<Atendimento, MandatoError> {
        let sql = format!("{} WHERE a.id = ?", SELECT_ATENDIMENTO);
        sqlx::query_as::<_, Atendimento>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| MandatoError::not_found("atendimento", id))
    }

    /// The logged-in user is recorded as the one who served the voter
    pub async fn create(&self, actor: i64, payload: AtendimentoPayload) -> Result<Atendimento, MandatoError> {
        payload.validate()?;

        let result = sqlx::query(
            r#"
            INSERT INTO atendimentos (eleitor_id, usuario_id, tipo, descricao, data, criado_em)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(payload.eleitor_id)
        .bind(actor)
        .bind(payload.tipo.trim())
        .bind(payload.descricao.trim())
        .bind(payload.data)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        self.audit
            .record(Some(actor), AcaoAuditoria::Criar, "atendimentos", Some(id), serde_json::to_value(&payload)?)
            .await?;

        self.get(id).await
    }

    pub async fn update(&self, actor: i64, id: i64, payload: AtendimentoPayload) -> Result<Atendimento, MandatoError> {
        payload.validate()?;
        self.get(id).await?;

        sqlx::query("UPDATE atendimentos SET eleitor_id = ?, tipo = ?, descricao = ?, data = ? WHERE id = ?")
            .bind(payload.eleitor_id)
            .bind(payload.tipo.trim())
            .bind(payload.descricao.trim())
            .bind(payload.data)
            .bind(id)
            .execute(&self.pool)
            .await?;

        self.audit
            .record(Some(actor), AcaoAuditoria::Atualizar, "atendimentos", Some(id), serde_json::to_value(&payload)?)
            .await?;

        self.get(id).await
    }

    pub async fn delete(&self, actor: i64, id: i64) -> Result<(), MandatoError> {
        let atendimento = self.get(id).await?;

        sqlx::query("DELETE FROM atendimentos WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        self.audit
            .record(
                Some(actor),
                AcaoAuditoria::Excluir,
                "atendimentos",
                Some(id),
                serde_json::json!({ "eleitor_id": atendimento.eleitor_id, "tipo": atendimento.tipo }),
            )
            .await?;

        Ok(())
    }
}
