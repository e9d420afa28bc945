//! Parliamentary budget amendments and the disbursements made against them.
//!
//! The disbursed total of an amendment never exceeds its value: new
//! repasses beyond the remaining balance are rejected, and so is lowering
//! the amendment value below what was already disbursed.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::audit::AuditLogger;
use crate::config::PaginationConfig;
use crate::database::models::{format_centavos, AcaoAuditoria, StatusEmenda};
use crate::database::Database;
use crate::error::MandatoError;
use crate::export::Exportable;
use crate::listing::{matches_eq, matches_query, matches_text, paginate, ListParams, Page, Searchable};
use crate::validation::{blank_to_none, FieldErrors, Validate};

const SELECT_EMENDA: &str = r#"
    SELECT em.*,
           COALESCE((SELECT SUM(r.valor_centavos) FROM repasses r WHERE r.emenda_id = em.id), 0)
               AS total_repassado_centavos
    FROM emendas em
"#;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Emenda {
    pub id: i64,
    pub numero: String,
    pub ano: i32,
    pub tipo: String,
    pub objeto: String,
    pub municipio: String,
    pub beneficiario: String,
    pub valor_centavos: i64,
    pub status: StatusEmenda,
    pub total_repassado_centavos: i64,
    pub criado_em: DateTime<Utc>,
}

impl Emenda {
    pub fn saldo_centavos(&self) -> i64 {
        self.valor_centavos - self.total_repassado_centavos
    }
}

/// Amendment with its disbursements, as shown on the detail screen
#[derive(Debug, Clone, Serialize)]
pub struct EmendaDetalhe {
    #[serde(flatten)]
    pub emenda: Emenda,
    pub saldo_centavos: i64,
    pub repasses: Vec<Repasse>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmendaPayload {
    pub numero: String,
    pub ano: i32,
    pub tipo: String,
    pub objeto: String,
    pub municipio: String,
    pub beneficiario: String,
    pub valor_centavos: i64,
    #[serde(default = "default_status")]
    pub status: StatusEmenda,
}

fn default_status() -> StatusEmenda {
    StatusEmenda::Proposta
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmendaFilter {
    pub ano: Option<i32>,
    pub status: Option<StatusEmenda>,
    pub municipio: Option<String>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Repasse {
    pub id: i64,
    pub emenda_id: i64,
    pub data: NaiveDate,
    pub valor_centavos: i64,
    pub descricao: Option<String>,
    pub criado_em: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepassePayload {
    pub data: NaiveDate,
    pub valor_centavos: i64,
    pub descricao: Option<String>,
}

impl Searchable for Emenda {
    fn search_fields(&self) -> Vec<&str> {
        vec![
            self.numero.as_str(),
            self.objeto.as_str(),
            self.municipio.as_str(),
            self.beneficiario.as_str(),
            self.tipo.as_str(),
        ]
    }
}

impl Validate for EmendaPayload {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.required("numero", &self.numero);
        errors.required("tipo", &self.tipo);
        errors.required("objeto", &self.objeto);
        errors.required("municipio", &self.municipio);
        errors.required("beneficiario", &self.beneficiario);
        errors.positive_amount("valor_centavos", self.valor_centavos);
        if !(1988..=2100).contains(&self.ano) {
            errors.add("ano", "ano inválido");
        }
        errors.into_result()
    }
}

impl Validate for RepassePayload {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.positive_amount("valor_centavos", self.valor_centavos);
        errors.into_result()
    }
}

impl Exportable for Emenda {
    fn headers() -> &'static [&'static str] {
        &["Número", "Ano", "Objeto", "Município", "Beneficiário", "Valor", "Repassado", "Saldo", "Status"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.numero.clone(),
            self.ano.to_string(),
            self.objeto.clone(),
            self.municipio.clone(),
            self.beneficiario.clone(),
            format_centavos(self.valor_centavos),
            format_centavos(self.total_repassado_centavos),
            format_centavos(self.saldo_centavos()),
            self.status.to_string(),
        ]
    }
}

#[derive(Clone)]
pub struct EmendaRegistry {
    pool: SqlitePool,
    audit: AuditLogger,
}

impl EmendaRegistry {
    pub fn new(database: &Database) -> Self {
        Self {
            pool: database.pool().clone(),
            audit: AuditLogger::new(database.pool().clone()),
        }
    }

    pub async fn search(&self, filter: &EmendaFilter, query: &str) -> Result<Vec<Emenda>, MandatoError> {
        let sql = format!("{} ORDER BY em.ano DESC, em.numero", SELECT_EMENDA);
        let all = sqlx::query_as::<_, Emenda>(&sql).fetch_all(&self.pool).await?;

        Ok(all
            .into_iter()
            .filter(|e| matches_query(e, query))
            .filter(|e| matches_eq(Some(e.ano), filter.ano))
            .filter(|e| matches_eq(Some(e.status), filter.status))
            .filter(|e| matches_text(Some(&e.municipio), filter.municipio.as_deref()))
            .collect())
    }

    pub async fn list(
        &self,
        filter: &EmendaFilter,
        params: &ListParams,
        pagination: &PaginationConfig,
    ) -> Result<Page<Emenda>, MandatoError> {
        let rows = self.search(filter, params.query()).await?;
        Ok(paginate(rows, params.page_request(pagination)))
    }

    pub async fn get(&self, id: i64) -> Result<Emenda, MandatoError> {
        let sql = format!("{} WHERE em.id = ?", SELECT_EMENDA);
        sqlx::query_as::<_, Emenda>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| MandatoError::not_found("emenda", id))
    }

    pub async fn detalhe(&self, id: i64) -> Result<EmendaDetalhe, MandatoError> {
        let emenda = self.get(id).await?;
        let repasses = self.repasses(id).await?;
        Ok(EmendaDetalhe {
            saldo_centavos: emenda.saldo_centavos(),
            emenda,
            repasses,
        })
    }

    pub async fn create(&self, actor: i64, payload: EmendaPayload) -> Result<Emenda, MandatoError> {
        payload.validate()?;

        let result = sqlx::query(
            r#"
            INSERT INTO emendas (numero, ano, tipo, objeto, municipio, beneficiario, valor_centavos,
                                 status, criado_em)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(payload.numero.trim())
        .bind(payload.ano)
        .bind(payload.tipo.trim())
        .bind(payload.objeto.trim())
        .bind(payload.municipio.trim())
        .bind(payload.beneficiario.trim())
        .bind(payload.valor_centavos)
        .bind(payload.status)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        self.audit
            .record(Some(actor), AcaoAuditoria::Criar, "emendas", Some(id), serde_json::to_value(&payload)?)
            .await?;

        self.get(id).await
    }

    pub async fn update(&self, actor: i64, id: i64, payload: EmendaPayload) -> Result<Emenda, MandatoError> {
        payload.validate()?;
        let atual = self.get(id).await?;

        if payload.valor_centavos < atual.total_repassado_centavos {
            let mut errors = FieldErrors::new();
            errors.add(
                "valor_centavos",
                format!(
                    "valor menor que o total já repassado ({})",
                    format_centavos(atual.total_repassado_centavos)
                ),
            );
            return Err(errors.into());
        }

        sqlx::query(
            r#"
            UPDATE emendas SET numero = ?, ano = ?, tipo = ?, objeto = ?, municipio = ?,
                   beneficiario = ?, valor_centavos = ?, status = ?
            WHERE id = ?
            "#,
        )
        .bind(payload.numero.trim())
        .bind(payload.ano)
        .bind(payload.tipo.trim())
        .bind(payload.objeto.trim())
        .bind(payload.municipio.trim())
        .bind(payload.beneficiario.trim())
        .bind(payload.valor_centavos)
        .bind(payload.status)
        .bind(id)
        .execute(&self.pool)
        .await?;

        self.audit
            .record(Some(actor), AcaoAuditoria::Atualizar, "emendas", Some(id), serde_json::to_value(&payload)?)
            .await?;

        self.get(id).await
    }

    /// Removes the amendment together with its repasses
    pub async fn delete(&self, actor: i64, id: i64) -> Result<(), MandatoError> {
        let emenda = self.get(id).await?;

        sqlx::query("DELETE FROM emendas WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        self.audit
            .record(
                Some(actor),
                AcaoAuditoria::Excluir,
                "emendas",
                Some(id),
                serde_json::json!({ "numero": emenda.numero, "valor_centavos": emenda.valor_centavos }),
            )
            .await?;

        Ok(())
    }

    pub async fn repasses(&self, emenda_id: i64) -> Result<Vec<Repasse>, MandatoError> {
        let rows = sqlx::query_as::<_, Repasse>(
            "SELECT * FROM repasses WHERE emenda_id = ? ORDER BY data, id",
        )
        .bind(emenda_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn add_repasse(&self, actor: i64, emenda_id: i64, payload: RepassePayload) -> Result<Repasse, MandatoError> {
        payload.validate()?;
        let emenda = self.get(emenda_id).await?;

        if payload.valor_centavos > emenda.saldo_centavos() {
            let mut errors = FieldErrors::new();
            errors.add(
                "valor_centavos",
                format!("valor excede o saldo da emenda ({})", format_centavos(emenda.saldo_centavos())),
            );
            return Err(errors.into());
        }

        let descricao = blank_to_none(payload.descricao.clone());
        let result = sqlx::query(
            "INSERT INTO repasses (emenda_id, data, valor_centavos, descricao, criado_em) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(emenda_id)
        .bind(payload.data)
        .bind(payload.valor_centavos)
        .bind(&descricao)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        self.audit
            .record(
                Some(actor),
                AcaoAuditoria::Criar,
                "repasses",
                Some(id),
                serde_json::json!({
                    "emenda_id": emenda_id,
                    "data": payload.data,
                    "valor_centavos": payload.valor_centavos,
                }),
            )
            .await?;

        self.get_repasse(emenda_id, id).await
    }

    pub async fn get_repasse(&self, emenda_id: i64, id: i64) -> Result<Repasse, MandatoError> {
        sqlx::query_as::<_, Repasse>("SELECT * FROM repasses WHERE id = ? AND emenda_id = ?")
            .bind(id)
            .bind(emenda_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| MandatoError::not_found("repasse", id))
    }

    pub async fn delete_repasse(&self, actor: i64, emenda_id: i64, id: i64) -> Result<(), MandatoError> {
        let repasse = self.get_repasse(emenda_id, id).await?;

        sqlx::query("DELETE FROM repasses WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        self.audit
            .record(
                Some(actor),
                AcaoAuditoria::Excluir,
                "repasses",
                Some(id),
                serde_json::json!({ "emenda_id": emenda_id, "valor_centavos": repasse.valor_centavos }),
            )
            .await?;

        Ok(())
    }
}
