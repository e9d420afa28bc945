//! Local leaderships and the voters linked to them

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::audit::AuditLogger;
use crate::cadastros::eleitores::{Eleitor, EleitorFilter, EleitorRegistry};
use crate::config::PaginationConfig;
use crate::database::models::{display_opt, AcaoAuditoria};
use crate::database::Database;
use crate::error::MandatoError;
use crate::export::Exportable;
use crate::listing::{matches_eq, matches_query, matches_text, paginate, ListParams, Page, Searchable};
use crate::validation::{blank_to_none, format_cpf, normalize_document, FieldErrors, Validate};

const SELECT_LIDERANCA: &str = r#"
    SELECT l.*, (SELECT COUNT(*) FROM eleitores e WHERE e.lideranca_id = l.id) AS total_eleitores
    FROM liderancas l
"#;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Lideranca {
    pub id: i64,
    pub nome: String,
    pub cpf: Option<String>,
    pub telefone: Option<String>,
    pub whatsapp: Option<String>,
    pub email: Option<String>,
    pub bairro: Option<String>,
    pub cidade: Option<String>,
    pub data_nascimento: Option<NaiveDate>,
    pub ativo: bool,
    pub total_eleitores: i64,
    pub criado_em: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiderancaPayload {
    pub nome: String,
    pub cpf: Option<String>,
    pub telefone: Option<String>,
    pub whatsapp: Option<String>,
    pub email: Option<String>,
    pub bairro: Option<String>,
    pub cidade: Option<String>,
    pub data_nascimento: Option<NaiveDate>,
    #[serde(default = "default_ativo")]
    pub ativo: bool,
}

fn default_ativo() -> bool {
    true
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LiderancaFilter {
    pub cidade: Option<String>,
    pub ativo: Option<bool>,
}

impl Searchable for Lideranca {
    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.nome.as_str()];
        fields.extend(
            [&self.cpf, &self.telefone, &self.email, &self.bairro, &self.cidade]
                .into_iter()
                .filter_map(|f| f.as_deref()),
        );
        fields
    }
}

impl Validate for LiderancaPayload {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.required("nome", &self.nome);
        errors.max_len("nome", &self.nome, 150);
        errors.optional_cpf("cpf", self.cpf.as_deref());
        errors.optional_email("email", self.email.as_deref());
        errors.into_result()
    }
}

impl LiderancaPayload {
    fn normalized(self) -> Self {
        Self {
            nome: self.nome.trim().to_string(),
            cpf: normalize_document(self.cpf),
            telefone: blank_to_none(self.telefone),
            whatsapp: blank_to_none(self.whatsapp),
            email: blank_to_none(self.email).map(|e| e.to_lowercase()),
            bairro: blank_to_none(self.bairro),
            cidade: blank_to_none(self.cidade),
            data_nascimento: self.data_nascimento,
            ativo: self.ativo,
        }
    }
}

impl Exportable for Lideranca {
    fn headers() -> &'static [&'static str] {
        &["Nome", "CPF", "Telefone", "Bairro", "Cidade", "Eleitores", "Ativo"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.nome.clone(),
            self.cpf.as_deref().map(format_cpf).unwrap_or_default(),
            display_opt(&self.telefone),
            display_opt(&self.bairro),
            display_opt(&self.cidade),
            self.total_eleitores.to_string(),
            if self.ativo { "sim" } else { "não" }.to_string(),
        ]
    }
}

#[derive(Clone)]
pub struct LiderancaRegistry {
    pool: SqlitePool,
    audit: AuditLogger,
    eleitores: EleitorRegistry,
}

impl LiderancaRegistry {
    pub fn new(database: &Database) -> Self {
        Self {
            pool: database.pool().clone(),
            audit: AuditLogger::new(database.pool().clone()),
            eleitores: EleitorRegistry::new(database),
        }
    }

    pub async fn search(&self, filter: &LiderancaFilter, query: &str) -> Result<Vec<Lideranca>, MandatoError> {
        let sql = format!("{} ORDER BY l.nome COLLATE NOCASE", SELECT_LIDERANCA);
        let all = sqlx::query_as::<_, Lideranca>(&sql).fetch_all(&self.pool).await?;

        Ok(all
            .into_iter()
            .filter(|l| matches_query(l, query))
            .filter(|l| matches_text(l.cidade.as_deref(), filter.cidade.as_deref()))
            .filter(|l| matches_eq(Some(l.ativo), filter.ativo))
            .collect())
    }

    pub async fn list(
        &self,
        filter: &LiderancaFilter,
        params: &ListParams,
        pagination: &PaginationConfig,
    ) -> Result<Page<Lideranca>, MandatoError> {
        let rows = self.search(filter, params.query()).await?;
        Ok(paginate(rows, params.page_request(pagination)))
    }

    pub async fn get(&self, id: i64) -> Result<Lideranca, MandatoError> {
        let sql = format!("{} WHERE l.id = ?", SELECT_LIDERANCA);
        sqlx::query_as::<_, Lideranca>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| MandatoError::not_found("lideranca", id))
    }

    /// Voters linked to one leadership, paginated like the main voter list
    pub async fn eleitores(
        &self,
        id: i64,
        params: &ListParams,
        pagination: &PaginationConfig,
    ) -> Result<Page<Eleitor>, MandatoError> {
        self.get(id).await?;
        let filter = EleitorFilter {
            lideranca_id: Some(id),
            ..Default::default()
        };
        self.eleitores.list(&filter, params, pagination).await
    }

    pub async fn create(&self, actor: i64, payload: LiderancaPayload) -> Result<Lideranca, MandatoError> {
        payload.validate()?;
        let p = payload.normalized();

        let result = sqlx::query(
            r#"
            INSERT INTO liderancas (nome, cpf, telefone, whatsapp, email, bairro, cidade,
                                    data_nascimento, ativo, criado_em)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&p.nome)
        .bind(&p.cpf)
        .bind(&p.telefone)
        .bind(&p.whatsapp)
        .bind(&p.email)
        .bind(&p.bairro)
        .bind(&p.cidade)
        .bind(p.data_nascimento)
        .bind(p.ativo)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        self.audit
            .record(Some(actor), AcaoAuditoria::Criar, "liderancas", Some(id), serde_json::to_value(&p)?)
            .await?;

        self.get(id).await
    }

    pub async fn update(&self, actor: i64, id: i64, payload: LiderancaPayload) -> Result<Lideranca, MandatoError> {
        payload.validate()?;
        let p = payload.normalized();
        self.get(id).await?;

        sqlx::query(
            r#"
            UPDATE liderancas SET nome = ?, cpf = ?, telefone = ?, whatsapp = ?, email = ?,
                   bairro = ?, cidade = ?, data_nascimento = ?, ativo = ?
            WHERE id = ?
            "#,
        )
        .bind(&p.nome)
        .bind(&p.cpf)
        .bind(&p.telefone)
        .bind(&p.whatsapp)
        .bind(&p.email)
        .bind(&p.bairro)
        .bind(&p.cidade)
        .bind(p.data_nascimento)
        .bind(p.ativo)
        .bind(id)
        .execute(&self.pool)
        .await?;

        self.audit
            .record(Some(actor), AcaoAuditoria::Atualizar, "liderancas", Some(id), serde_json::to_value(&p)?)
            .await?;

        self.get(id).await
    }

    /// Linked voters are kept and simply lose their leadership
    pub async fn delete(&self, actor: i64, id: i64) -> Result<(), MandatoError> {
        let lideranca = self.get(id).await?;

        sqlx::query("DELETE FROM liderancas WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        self.audit
            .record(
                Some(actor),
                AcaoAuditoria::Excluir,
                "liderancas",
                Some(id),
                serde_json::json!({ "nome": lideranca.nome, "eleitores_desvinculados": lideranca.total_eleitores }),
            )
            .await?;

        Ok(())
    }
}
