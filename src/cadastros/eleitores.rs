//! Voter registry

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::audit::AuditLogger;
use crate::config::PaginationConfig;
use crate::database::models::{display_opt, AcaoAuditoria};
use crate::database::Database;
use crate::error::MandatoError;
use crate::export::Exportable;
use crate::listing::{matches_eq, matches_query, matches_text, paginate, ListParams, Page, Searchable};
use crate::validation::{blank_to_none, format_cpf, normalize_document, FieldErrors, Validate};

const SELECT_ELEITOR: &str = r#"
    SELECT e.*, l.nome AS lideranca_nome
    FROM eleitores e
    LEFT JOIN liderancas l ON l.id = e.lideranca_id
"#;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Eleitor {
    pub id: i64,
    pub nome: String,
    pub cpf: Option<String>,
    pub titulo_eleitor: Option<String>,
    pub data_nascimento: Option<NaiveDate>,
    pub telefone: Option<String>,
    pub whatsapp: Option<String>,
    pub email: Option<String>,
    pub endereco: Option<String>,
    pub bairro: Option<String>,
    pub cidade: Option<String>,
    pub uf: Option<String>,
    pub lideranca_id: Option<i64>,
    pub lideranca_nome: Option<String>,
    pub observacoes: Option<String>,
    pub criado_em: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EleitorPayload {
    pub nome: String,
    pub cpf: Option<String>,
    pub titulo_eleitor: Option<String>,
    pub data_nascimento: Option<NaiveDate>,
    pub telefone: Option<String>,
    pub whatsapp: Option<String>,
    pub email: Option<String>,
    pub endereco: Option<String>,
    pub bairro: Option<String>,
    pub cidade: Option<String>,
    pub uf: Option<String>,
    pub lideranca_id: Option<i64>,
    pub observacoes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EleitorFilter {
    pub lideranca_id: Option<i64>,
    pub bairro: Option<String>,
    pub cidade: Option<String>,
}

impl Searchable for Eleitor {
    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.nome.as_str()];
        fields.extend(
            [&self.cpf, &self.email, &self.telefone, &self.bairro, &self.cidade]
                .into_iter()
                .filter_map(|f| f.as_deref()),
        );
        fields
    }
}

impl Validate for EleitorPayload {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.required("nome", &self.nome);
        errors.max_len("nome", &self.nome, 150);
        errors.optional_cpf("cpf", self.cpf.as_deref());
        errors.optional_email("email", self.email.as_deref());
        errors.optional_uf("uf", self.uf.as_deref());
        if let Some(nascimento) = self.data_nascimento {
            if nascimento > Utc::now().date_naive() {
                errors.add("data_nascimento", "data de nascimento no futuro");
            }
        }
        errors.into_result()
    }
}

impl EleitorPayload {
    fn normalized(self) -> Self {
        Self {
            nome: self.nome.trim().to_string(),
            cpf: normalize_document(self.cpf),
            titulo_eleitor: blank_to_none(self.titulo_eleitor),
            data_nascimento: self.data_nascimento,
            telefone: blank_to_none(self.telefone),
            whatsapp: blank_to_none(self.whatsapp),
            email: blank_to_none(self.email).map(|e| e.to_lowercase()),
            endereco: blank_to_none(self.endereco),
            bairro: blank_to_none(self.bairro),
            cidade: blank_to_none(self.cidade),
            uf: blank_to_none(self.uf),
            lideranca_id: self.lideranca_id,
            observacoes: blank_to_none(self.observacoes),
        }
    }
}

impl Exportable for Eleitor {
    fn headers() -> &'static [&'static str] {
        &["Nome", "CPF", "Telefone", "E-mail", "Bairro", "Cidade", "Liderança"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.nome.clone(),
            self.cpf.as_deref().map(format_cpf).unwrap_or_default(),
            display_opt(&self.telefone),
            display_opt(&self.email),
            display_opt(&self.bairro),
            display_opt(&self.cidade),
            display_opt(&self.lideranca_nome),
        ]
    }
}

#[derive(Clone)]
pub struct EleitorRegistry {
    pool: SqlitePool,
    audit: AuditLogger,
}

impl EleitorRegistry {
    pub fn new(database: &Database) -> Self {
        Self {
            pool: database.pool().clone(),
            audit: AuditLogger::new(database.pool().clone()),
        }
    }

    /// Every voter matching the query and filters, ordered by name
    pub async fn search(&self, filter: &EleitorFilter, query: &str) -> Result<Vec<Eleitor>, MandatoError> {
        let sql = format!("{} ORDER BY e.nome COLLATE NOCASE", SELECT_ELEITOR);
        let all = sqlx::query_as::<_, Eleitor>(&sql).fetch_all(&self.pool).await?;

        Ok(all
            .into_iter()
            .filter(|e| matches_query(e, query))
            .filter(|e| matches_eq(e.lideranca_id, filter.lideranca_id))
            .filter(|e| matches_text(e.bairro.as_deref(), filter.bairro.as_deref()))
            .filter(|e| matches_text(e.cidade.as_deref(), filter.cidade.as_deref()))
            .collect())
    }

    pub async fn list(
        &self,
        filter: &EleitorFilter,
        params: &ListParams,
        pagination: &PaginationConfig,
    ) -> Result<Page<Eleitor>, MandatoError> {
        let rows = self.search(filter, params.query()).await?;
        Ok(paginate(rows, params.page_request(pagination)))
    }

    pub async fn get(&self, id: i64) -> Result<Eleitor, MandatoError> {
        let sql = format!("{} WHERE e.id = ?", SELECT_ELEITOR);
        sqlx::query_as::<_, Eleitor>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| MandatoError::not_found("eleitor", id))
    }

    pub async fn create(&self, actor: i64, payload: EleitorPayload) -> Result<Eleitor, MandatoError> {
        payload.validate()?;
        let p = payload.normalized();

        let result = sqlx::query(
            r#"
            INSERT INTO eleitores (nome, cpf, titulo_eleitor, data_nascimento, telefone, whatsapp,
                                   email, endereco, bairro, cidade, uf, lideranca_id, observacoes, criado_em)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&p.nome)
        .bind(&p.cpf)
        .bind(&p.titulo_eleitor)
        .bind(p.data_nascimento)
        .bind(&p.telefone)
        .bind(&p.whatsapp)
        .bind(&p.email)
        .bind(&p.endereco)
        .bind(&p.bairro)
        .bind(&p.cidade)
        .bind(&p.uf)
        .bind(p.lideranca_id)
        .bind(&p.observacoes)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        self.audit
            .record(Some(actor), AcaoAuditoria::Criar, "eleitores", Some(id), serde_json::to_value(&p)?)
            .await?;

        self.get(id).await
    }

    pub async fn update(&self, actor: i64, id: i64, payload: EleitorPayload) -> Result<Eleitor, MandatoError> {
        payload.validate()?;
        let p = payload.normalized();
        let before = self.get(id).await?;

        sqlx::query(
            r#"
            UPDATE eleitores SET nome = ?, cpf = ?, titulo_eleitor = ?, data_nascimento = ?,
                   telefone = ?, whatsapp = ?, email = ?, endereco = ?, bairro = ?, cidade = ?,
                   uf = ?, lideranca_id = ?, observacoes = ?
            WHERE id = ?
            "#,
        )
        .bind(&p.nome)
        .bind(&p.cpf)
        .bind(&p.titulo_eleitor)
        .bind(p.data_nascimento)
        .bind(&p.telefone)
        .bind(&p.whatsapp)
        .bind(&p.email)
        .bind(&p.endereco)
        .bind(&p.bairro)
        .bind(&p.cidade)
        .bind(&p.uf)
        .bind(p.lideranca_id)
        .bind(&p.observacoes)
        .bind(id)
        .execute(&self.pool)
        .await?;

        self.audit
            .record(
                Some(actor),
                AcaoAuditoria::Atualizar,
                "eleitores",
                Some(id),
                serde_json::json!({ "antes": before.nome, "depois": p }),
            )
            .await?;

        self.get(id).await
    }

    pub async fn delete(&self, actor: i64, id: i64) -> Result<(), MandatoError> {
        let eleitor = self.get(id).await?;

        sqlx::query("DELETE FROM eleitores WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        self.audit
            .record(
                Some(actor),
                AcaoAuditoria::Excluir,
                "eleitores",
                Some(id),
                serde_json::json!({ "nome": eleitor.nome, "cpf": eleitor.cpf }),
            )
            .await?;

        Ok(())
    }
}
