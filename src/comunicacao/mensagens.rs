//! One-to-one messages and the conversation view

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::audit::AuditLogger;
use crate::comunicacao::gateway::Gateway;
use crate::config::PaginationConfig;
use crate::database::models::{AcaoAuditoria, Canal, Direcao};
use crate::database::Database;
use crate::error::MandatoError;
use crate::listing::{matches_query, paginate, ListParams, Page, Searchable};
use crate::validation::{blank_to_none, FieldErrors, Validate};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Mensagem {
    pub id: i64,
    pub contato: String,
    pub nome_contato: Option<String>,
    pub canal: Canal,
    pub direcao: Direcao,
    pub conteudo: String,
    pub disparo_id: Option<i64>,
    pub usuario_id: Option<i64>,
    pub criado_em: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MensagemPayload {
    pub contato: String,
    pub nome_contato: Option<String>,
    pub canal: Canal,
    pub conteudo: String,
}

/// Last message exchanged with each contact
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Contato {
    pub contato: String,
    pub nome_contato: Option<String>,
    pub canal: Canal,
    pub ultima_mensagem: String,
    pub ultima_em: DateTime<Utc>,
    pub total_mensagens: i64,
}

pub(crate) struct NovaMensagem<'a> {
    pub contato: &'a str,
    pub nome_contato: Option<&'a str>,
    pub canal: Canal,
    pub direcao: Direcao,
    pub conteudo: &'a str,
    pub disparo_id: Option<i64>,
    pub usuario_id: Option<i64>,
}

pub(crate) async fn insert_mensagem(pool: &SqlitePool, m: &NovaMensagem<'_>) -> Result<i64, MandatoError> {
    let result = sqlx::query(
        r#"
        INSERT INTO comunicacao_mensagens (contato, nome_contato, canal, direcao, conteudo, disparo_id,
                                           usuario_id, criado_em)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(m.contato)
    .bind(m.nome_contato)
    .bind(m.canal)
    .bind(m.direcao)
    .bind(m.conteudo)
    .bind(m.disparo_id)
    .bind(m.usuario_id)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

impl Searchable for Contato {
    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.contato.as_str(), self.ultima_mensagem.as_str()];
        fields.extend(self.nome_contato.as_deref());
        fields
    }
}

impl Validate for MensagemPayload {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.required("contato", &self.contato);
        errors.required("conteudo", &self.conteudo);
        if self.canal == Canal::Email {
            errors.optional_email("contato", Some(&self.contato));
        }
        errors.into_result()
    }
}

#[derive(Clone)]
pub struct MensagemRegistry {
    pool: SqlitePool,
    audit: AuditLogger,
    gateway: Gateway,
}

impl MensagemRegistry {
    pub fn new(database: &Database, gateway: Gateway) -> Self {
        Self {
            pool: database.pool().clone(),
            audit: AuditLogger::new(database.pool().clone()),
            gateway,
        }
    }

    pub async fn get(&self, id: i64) -> Result<Mensagem, MandatoError> {
        sqlx::query_as::<_, Mensagem>("SELECT * FROM comunicacao_mensagens WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| MandatoError::not_found("mensagem", id))
    }

    /// Deliver through the gateway; only delivered messages are stored
    pub async fn enviar(&self, actor: i64, payload: MensagemPayload) -> Result<Mensagem, MandatoError> {
        payload.validate()?;
        let contato = payload.contato.trim();
        let nome = blank_to_none(payload.nome_contato.clone());

        self.gateway.send(payload.canal, contato, &payload.conteudo).await?;

        let id = insert_mensagem(
            &self.pool,
            &NovaMensagem {
                contato,
                nome_contato: nome.as_deref(),
                canal: payload.canal,
                direcao: Direcao::Enviada,
                conteudo: &payload.conteudo,
                disparo_id: None,
                usuario_id: Some(actor),
            },
        )
        .await?;

        self.audit
            .record(
                Some(actor),
                AcaoAuditoria::Criar,
                "comunicacao_mensagens",
                Some(id),
                serde_json::json!({ "contato": contato, "canal": payload.canal }),
            )
            .await?;

        self.get(id).await
    }

    /// Store a reply that arrived through the gateway
    pub async fn registrar_recebida(&self, actor: i64, payload: MensagemPayload) -> Result<Mensagem, MandatoError> {
        payload.validate()?;
        let contato = payload.contato.trim();
        let nome = blank_to_none(payload.nome_contato.clone());

        let id = insert_mensagem(
            &self.pool,
            &NovaMensagem {
                contato,
                nome_contato: nome.as_deref(),
                canal: payload.canal,
                direcao: Direcao::Recebida,
                conteudo: &payload.conteudo,
                disparo_id: None,
                usuario_id: None,
            },
        )
        .await?;

        self.audit
            .record(
                Some(actor),
                AcaoAuditoria::Criar,
                "comunicacao_mensagens",
                Some(id),
                serde_json::json!({ "contato": contato, "canal": payload.canal, "direcao": Direcao::Recebida }),
            )
            .await?;

        self.get(id).await
    }

    /// Every message exchanged with one contact, oldest first
    pub async fn conversa(&self, contato: &str) -> Result<Vec<Mensagem>, MandatoError> {
        let rows = sqlx::query_as::<_, Mensagem>(
            "SELECT * FROM comunicacao_mensagens WHERE contato = ? ORDER BY criado_em, id",
        )
        .bind(contato.trim())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Contacts with their latest message, most recent conversation first
    pub async fn contatos(&self, params: &ListParams, pagination: &PaginationConfig) -> Result<Page<Contato>, MandatoError> {
        let all = sqlx::query_as::<_, Contato>(
            r#"
            SELECT m.contato, m.nome_contato, m.canal, m.conteudo AS ultima_mensagem,
                   m.criado_em AS ultima_em,
                   (SELECT COUNT(*) FROM comunicacao_mensagens c WHERE c.contato = m.contato) AS total_mensagens
            FROM comunicacao_mensagens m
            WHERE m.id = (SELECT MAX(x.id) FROM comunicacao_mensagens x WHERE x.contato = m.contato)
            ORDER BY m.id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let rows: Vec<Contato> = all
            .into_iter()
            .filter(|c| matches_query(c, params.query()))
            .collect();
        Ok(paginate(rows, params.page_request(pagination)))
    }
}
