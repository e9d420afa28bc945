use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::audit::AuditLogger;
use crate::config::PaginationConfig;
use crate::database::models::{display_opt, AcaoAuditoria};
use crate::database::Database;
use crate::error::MandatoError;
use crate::export::Exportable;
use crate::listing::{
    matches_eq, matches_query, matches_text, paginate, DateRange, ListParams, Page, Searchable,
};
use crate::validation::{blank_to_none, FieldErrors, Validate};

const SELECT_EVENTO: &str = r#"
    SELECT ev.*, u.nome AS responsavel_nome
    FROM agenda_eventos ev
    LEFT JOIN usuarios u ON u.id = ev.responsavel_id
"#;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Evento {
    pub id: i64,
    pub titulo: String,
    pub descricao: Option<String>,
    pub local: Option<String>,
    pub inicio: NaiveDateTime,
    pub fim: NaiveDateTime,
    pub tipo: String,
    pub responsavel_id: Option<i64>,
    pub responsavel_nome: Option<String>,
    pub criado_em: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventoPayload {
    pub titulo: String,
    pub descricao: Option<String>,
    pub local: Option<String>,
    pub inicio: NaiveDateTime,
    pub fim: NaiveDateTime,
    pub tipo: String,
    pub responsavel_id: Option<i64>,
}

/// Events are selected by the day they start on
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventoFilter {
    pub data_inicio: Option<NaiveDate>,
    pub data_fim: Option<NaiveDate>,
    pub tipo: Option<String>,
    pub responsavel_id: Option<i64>,
}

impl Searchable for Evento {
    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.titulo.as_str(), self.tipo.as_str()];
        fields.extend(
            [&self.descricao, &self.local, &self.responsavel_nome]
                .into_iter()
                .filter_map(|f| f.as_deref()),
        );
        fields
    }
}

impl Validate for EventoPayload {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.required("titulo", &self.titulo);
        errors.max_len("titulo", &self.titulo, 200);
        errors.required("tipo", &self.tipo);
        if self.fim < self.inicio {
            errors.add("fim", "término anterior ao início");
        }
        errors.into_result()
    }
}

impl EventoPayload {
    fn normalized(self) -> Self {
        Self {
            titulo: self.titulo.trim().to_string(),
            descricao: blank_to_none(self.descricao),
            local: blank_to_none(self.local),
            tipo: self.tipo.trim().to_string(),
            ..self
        }
    }
}

impl Exportable for Evento {
    fn headers() -> &'static [&'static str] {
        &["Título", "Tipo", "Início", "Fim", "Local", "Responsável"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.titulo.clone(),
            self.tipo.clone(),
            self.inicio.format("%d/%m/%Y %H:%M").to_string(),
            self.fim.format("%d/%m/%Y %H:%M").to_string(),
            display_opt(&self.local),
            display_opt(&self.responsavel_nome),
        ]
    }
}

#[derive(Clone)]
pub struct AgendaRegistry {
    pool: SqlitePool,
    audit: AuditLogger,
}

impl AgendaRegistry {
    pub fn new(database: &Database) -> Self {
        Self {
            pool: database.pool().clone(),
            audit: AuditLogger::new(database.pool().clone()),
        }
    }

    /// Chronological, earliest first
    pub async fn search(&self, filter: &EventoFilter, query: &str) -> Result<Vec<Evento>, MandatoError> {
        let sql = format!("{} ORDER BY ev.inicio, ev.id", SELECT_EVENTO);
        let all = sqlx::query_as::<_, Evento>(&sql).fetch_all(&self.pool).await?;
        let range = DateRange::new(filter.data_inicio, filter.data_fim);

        Ok(all
            .into_iter()
            .filter(|ev| matches_query(ev, query))
            .filter(|ev| range.contains(ev.inicio.date()))
            .filter(|ev| matches_text(Some(&ev.tipo), filter.tipo.as_deref()))
            .filter(|ev| matches_eq(ev.responsavel_id, filter.responsavel_id))
            .collect())
    }

    pub async fn list(
        &self,
        filter: &EventoFilter,
        params: &ListParams,
        pagination: &PaginationConfig,
    ) -> Result<Page<Evento>, MandatoError> {
        let rows = self.search(filter, params.query()).await?;
        Ok(paginate(rows, params.page_request(pagination)))
    }

    pub async fn get(&self, id: i64) -> Result<Evento, MandatoError> {
        let sql = format!("{} WHERE ev.id = ?", SELECT_EVENTO);
        sqlx::query_as::<_, Evento>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| MandatoError::not_found("evento", id))
    }

    pub async fn create(&self, actor: i64, payload: EventoPayload) -> Result<Evento, MandatoError> {
        payload.validate()?;
        let p = payload.normalized();

        let result = sqlx::query(
            r#"
            INSERT INTO agenda_eventos (titulo, descricao, local, inicio, fim, tipo, responsavel_id, criado_em)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&p.titulo)
        .bind(&p.descricao)
        .bind(&p.local)
        .bind(p.inicio)
        .bind(p.fim)
        .bind(&p.tipo)
        .bind(p.responsavel_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        self.audit
            .record(Some(actor), AcaoAuditoria::Criar, "agenda_eventos", Some(id), serde_json::to_value(&p)?)
            .await?;

        self.get(id).await
    }

    pub async fn update(&self, actor: i64, id: i64, payload: EventoPayload) -> Result<Evento, MandatoError> {
        payload.validate()?;
        let p = payload.normalized();
        self.get(id).await?;

        sqlx::query(
            r#"
            UPDATE agenda_eventos SET titulo = ?, descricao = ?, local = ?, inicio = ?, fim = ?,
                   tipo = ?, responsavel_id = ?
            WHERE id = ?
            "#,
        )
        .bind(&p.titulo)
        .bind(&p.descricao)
        .bind(&p.local)
        .bind(p.inicio)
        .bind(p.fim)
        .bind(&p.tipo)
        .bind(p.responsavel_id)
        .bind(id)
        .execute(&self.pool)
        .await?;

        self.audit
            .record(Some(actor), AcaoAuditoria::Atualizar, "agenda_eventos", Some(id), serde_json::to_value(&p)?)
            .await?;

        self.get(id).await
    }

    pub async fn delete(&self, actor: i64, id: i64) -> Result<(), MandatoError> {
        let evento = self.get(id).await?;

        sqlx::query("DELETE FROM agenda_eventos WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        self.audit
            .record(
                Some(actor),
                AcaoAuditoria::Excluir,
                "agenda_eventos",
                Some(id),
                serde_json::json!({ "titulo": evento.titulo, "inicio": evento.inicio }),
            )
            .await?;

        Ok(())
    }
}
