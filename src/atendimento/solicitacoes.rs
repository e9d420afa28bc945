//! Citizen requests and their status history.
//!
//! A request is created as NOVO. Afterwards its status only moves through
//! [`SolicitacaoRegistry::change_status`], which writes the new status and
//! one `solicitacoes_historico` row in the same transaction. Any status may
//! follow any other; repeating the current one is rejected.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::collections::BTreeMap;

use crate::audit::AuditLogger;
use crate::config::PaginationConfig;
use crate::database::models::{display_opt, AcaoAuditoria, Prioridade, StatusSolicitacao};
use crate::database::Database;
use crate::error::MandatoError;
use crate::export::Exportable;
use crate::listing::{matches_eq, matches_query, paginate, ListParams, Page, Searchable};
use crate::validation::{blank_to_none, FieldErrors, Validate};

const SELECT_SOLICITACAO: &str = r#"
    SELECT s.*, e.nome AS eleitor_nome, u.nome AS responsavel_nome
    FROM solicitacoes s
    LEFT JOIN eleitores e ON e.id = s.eleitor_id
    LEFT JOIN usuarios u ON u.id = s.responsavel_id
"#;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Solicitacao {
    pub id: i64,
    pub titulo: String,
    pub descricao: String,
    pub eleitor_id: Option<i64>,
    pub eleitor_nome: Option<String>,
    pub status: StatusSolicitacao,
    pub prioridade: Prioridade,
    pub responsavel_id: Option<i64>,
    pub responsavel_nome: Option<String>,
    pub criado_em: DateTime<Utc>,
    pub atualizado_em: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolicitacaoPayload {
    pub titulo: String,
    pub descricao: String,
    pub eleitor_id: Option<i64>,
    #[serde(default)]
    pub prioridade: Prioridade,
    pub responsavel_id: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SolicitacaoFilter {
    pub status: Option<StatusSolicitacao>,
    pub prioridade: Option<Prioridade>,
    pub responsavel_id: Option<i64>,
    pub eleitor_id: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MudancaStatus {
    pub status: StatusSolicitacao,
    pub observacao: Option<String>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct HistoricoSolicitacao {
    pub id: i64,
    pub solicitacao_id: i64,
    pub status_anterior: StatusSolicitacao,
    pub status_novo: StatusSolicitacao,
    pub usuario_id: Option<i64>,
    pub usuario_nome: Option<String>,
    pub observacao: Option<String>,
    pub criado_em: DateTime<Utc>,
}

impl Searchable for Solicitacao {
    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.titulo.as_str(), self.descricao.as_str()];
        fields.extend(
            [&self.eleitor_nome, &self.responsavel_nome]
                .into_iter()
                .filter_map(|f| f.as_deref()),
        );
        fields
    }
}

impl Validate for SolicitacaoPayload {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.required("titulo", &self.titulo);
        errors.max_len("titulo", &self.titulo, 200);
        errors.required("descricao", &self.descricao);
        errors.into_result()
    }
}

impl Exportable for Solicitacao {
    fn headers() -> &'static [&'static str] {
        &["Título", "Solicitante", "Status", "Prioridade", "Responsável", "Aberta em"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.titulo.clone(),
            display_opt(&self.eleitor_nome),
            self.status.to_string(),
            self.prioridade.to_string(),
            display_opt(&self.responsavel_nome),
            self.criado_em.format("%d/%m/%Y").to_string(),
        ]
    }
}

#[derive(Clone)]
pub struct SolicitacaoRegistry {
    pool: SqlitePool,
    audit: AuditLogger,
}

impl SolicitacaoRegistry {
    pub fn new(database: &Database) -> Self {
        Self {
            pool: database.pool().clone(),
            audit: AuditLogger::new(database.pool().clone()),
        }
    }

    /// Newest first
    pub async fn search(&self, filter: &SolicitacaoFilter, query: &str) -> Result<Vec<Solicitacao>, MandatoError> {
        let sql = format!("{} ORDER BY s.criado_em DESC, s.id DESC", SELECT_SOLICITACAO);
        let all = sqlx::query_as::<_, Solicitacao>(&sql).fetch_all(&self.pool).await?;

        Ok(all
            .into_iter()
            .filter(|s| matches_query(s, query))
            .filter(|s| matches_eq(Some(s.status), filter.status))
            .filter(|s| matches_eq(Some(s.prioridade), filter.prioridade))
            .filter(|s| matches_eq(s.responsavel_id, filter.responsavel_id))
            .filter(|s| matches_eq(s.eleitor_id, filter.eleitor_id))
            .collect())
    }

    pub async fn list(
        &self,
        filter: &SolicitacaoFilter,
        params: &ListParams,
        pagination: &PaginationConfig,
    ) -> Result<Page<Solicitacao>, MandatoError> {
        let rows = self.search(filter, params.query()).await?;
        Ok(paginate(rows, params.page_request(pagination)))
    }

    pub async fn get(&self, id: i64) -> Result<Solicitacao, MandatoError> {
        let sql = format!("{} WHERE s.id = ?", SELECT_SOLICITACAO);
        sqlx::query_as::<_, Solicitacao>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| MandatoError::not_found("solicitacao", id))
    }

    /// Request counts per status, every status present
    pub async fn count_by_status(&self) -> Result<BTreeMap<String, i64>, MandatoError> {
        let rows: Vec<(StatusSolicitacao, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM solicitacoes GROUP BY status")
                .fetch_all(&self.pool)
                .await?;

        let mut counts: BTreeMap<String, i64> = StatusSolicitacao::ALL
            .iter()
            .map(|s| (s.to_string(), 0))
            .collect();
        for (status, total) in rows {
            counts.insert(status.to_string(), total);
        }
        Ok(counts)
    }

    pub async fn create(&self, actor: i64, payload: SolicitacaoPayload) -> Result<Solicitacao, MandatoError> {
        payload.validate()?;
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO solicitacoes (titulo, descricao, eleitor_id, status, prioridade, responsavel_id,
                                      criado_em, atualizado_em)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(payload.titulo.trim())
        .bind(payload.descricao.trim())
        .bind(payload.eleitor_id)
        .bind(StatusSolicitacao::Novo)
        .bind(payload.prioridade)
        .bind(payload.responsavel_id)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        self.audit
            .record(Some(actor), AcaoAuditoria::Criar, "solicitacoes", Some(id), serde_json::to_value(&payload)?)
            .await?;

        self.get(id).await
    }

    /// Edits everything but the status
    pub async fn update(&self, actor: i64, id: i64, payload: SolicitacaoPayload) -> Result<Solicitacao, MandatoError> {
        payload.validate()?;
        self.get(id).await?;

        sqlx::query(
            r#"
            UPDATE solicitacoes SET titulo = ?, descricao = ?, eleitor_id = ?, prioridade = ?,
                   responsavel_id = ?, atualizado_em = ?
            WHERE id = ?
            "#,
        )
        .bind(payload.titulo.trim())
        .bind(payload.descricao.trim())
        .bind(payload.eleitor_id)
        .bind(payload.prioridade)
        .bind(payload.responsavel_id)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        self.audit
            .record(Some(actor), AcaoAuditoria::Atualizar, "solicitacoes", Some(id), serde_json::to_value(&payload)?)
            .await?;

        self.get(id).await
    }

    pub async fn change_status(&self, actor: i64, id: i64, mudanca: MudancaStatus) -> Result<Solicitacao, MandatoError> {
        let atual = self.get(id).await?;
        if atual.status == mudanca.status {
            let mut errors = FieldErrors::new();
            errors.add("status", format!("solicitação já está com status {}", atual.status));
            return Err(errors.into());
        }

        let observacao = blank_to_none(mudanca.observacao);
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE solicitacoes SET status = ?, atualizado_em = ? WHERE id = ?")
            .bind(mudanca.status)
            .bind(now)
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO solicitacoes_historico (solicitacao_id, status_anterior, status_novo, usuario_id,
                                                observacao, criado_em)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id)
        .bind(atual.status)
        .bind(mudanca.status)
        .bind(actor)
        .bind(&observacao)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            "Solicitação {} moved from {} to {}",
            id,
            atual.status,
            mudanca.status
        );

        self.audit
            .record(
                Some(actor),
                AcaoAuditoria::AlterarStatus,
                "solicitacoes",
                Some(id),
                serde_json::json!({
                    "de": atual.status,
                    "para": mudanca.status,
                    "observacao": observacao,
                }),
            )
            .await?;

        self.get(id).await
    }

    /// Transitions in the order they happened
    pub async fn historico(&self, id: i64) -> Result<Vec<HistoricoSolicitacao>, MandatoError> {
        self.get(id).await?;

        let rows = sqlx::query_as::<_, HistoricoSolicitacao>(
            r#"
            SELECT h.*, u.nome AS usuario_nome
            FROM solicitacoes_historico h
            LEFT JOIN usuarios u ON u.id = h.usuario_id
            WHERE h.solicitacao_id = ?
            ORDER BY h.criado_em, h.id
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn delete(&self, actor: i64, id: i64) -> Result<(), MandatoError> {
        let solicitacao = self.get(id).await?;

        sqlx::query("DELETE FROM solicitacoes WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        self.audit
            .record(
                Some(actor),
                AcaoAuditoria::Excluir,
                "solicitacoes",
                Some(id),
                serde_json::json!({ "titulo": solicitacao.titulo, "status": solicitacao.status }),
            )
            .await?;

        Ok(())
    }
}
