use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::audit::AuditLogger;
use crate::config::PaginationConfig;
use crate::database::models::{display_opt, format_centavos, AcaoAuditoria, StatusDespesa};
use crate::database::Database;
use crate::error::MandatoError;
use crate::export::Exportable;
use crate::listing::{
    matches_eq, matches_query, matches_text, paginate, DateRange, ListParams, Page, Searchable,
};
use crate::validation::{blank_to_none, FieldErrors, Validate};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Despesa {
    pub id: i64,
    pub descricao: String,
    pub categoria: String,
    pub fornecedor: Option<String>,
    pub numero_nota: Option<String>,
    pub valor_centavos: i64,
    pub vencimento: NaiveDate,
    pub status: StatusDespesa,
    pub criado_em: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DespesaPayload {
    pub descricao: String,
    pub categoria: String,
    pub fornecedor: Option<String>,
    pub numero_nota: Option<String>,
    pub valor_centavos: i64,
    pub vencimento: NaiveDate,
    #[serde(default = "default_status")]
    pub status: StatusDespesa,
}

fn default_status() -> StatusDespesa {
    StatusDespesa::Pendente
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DespesaFilter {
    pub status: Option<StatusDespesa>,
    pub categoria: Option<String>,
    pub vencimento_inicio: Option<NaiveDate>,
    pub vencimento_fim: Option<NaiveDate>,
}

impl Searchable for Despesa {
    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.descricao.as_str(), self.categoria.as_str()];
        fields.extend(
            [&self.fornecedor, &self.numero_nota]
                .into_iter()
                .filter_map(|f| f.as_deref()),
        );
        fields
    }
}

impl Validate for DespesaPayload {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.required("descricao", &self.descricao);
        errors.required("categoria", &self.categoria);
        errors.positive_amount("valor_centavos", self.valor_centavos);
        errors.into_result()
    }
}

impl DespesaPayload {
    fn normalized(self) -> Self {
        Self {
            descricao: self.descricao.trim().to_string(),
            categoria: self.categoria.trim().to_string(),
            fornecedor: blank_to_none(self.fornecedor),
            numero_nota: blank_to_none(self.numero_nota),
            ..self
        }
    }
}

impl Exportable for Despesa {
    fn headers() -> &'static [&'static str] {
        &["Vencimento", "Descrição", "Categoria", "Fornecedor", "Nota", "Valor", "Status"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.vencimento.format("%d/%m/%Y").to_string(),
            self.descricao.clone(),
            self.categoria.clone(),
            display_opt(&self.fornecedor),
            display_opt(&self.numero_nota),
            format_centavos(self.valor_centavos),
            self.status.to_string(),
        ]
    }
}

#[derive(Clone)]
pub struct DespesaRegistry {
    pool: SqlitePool,
    audit: AuditLogger,
}

impl DespesaRegistry {
    pub fn new(database: &Database) -> Self {
        Self {
            pool: database.pool().clone(),
            audit: AuditLogger::new(database.pool().clone()),
        }
    }

    /// Ordered by due date, earliest first
    pub async fn search(&self, filter: &DespesaFilter, query: &str) -> Result<Vec<Despesa>, MandatoError> {
        let all = sqlx::query_as::<_, Despesa>("SELECT * FROM financeiro_despesas ORDER BY vencimento, id")
            .fetch_all(&self.pool)
            .await?;
        let range = DateRange::new(filter.vencimento_inicio, filter.vencimento_fim);

        Ok(all
            .into_iter()
            .filter(|d| matches_query(d, query))
            .filter(|d| matches_eq(Some(d.status), filter.status))
            .filter(|d| matches_text(Some(&d.categoria), filter.categoria.as_deref()))
            .filter(|d| range.contains(d.vencimento))
            .collect())
    }

    pub async fn list(
        &self,
        filter: &DespesaFilter,
        params: &ListParams,
        pagination: &PaginationConfig,
    ) -> Result<Page<Despesa>, MandatoError> {
        let rows = self.search(filter, params.query()).await?;
        Ok(paginate(rows, params.page_request(pagination)))
    }

    pub async fn get(&self, id: i64) -> Result<Despesa, MandatoError> {
        sqlx::query_as::<_, Despesa>("SELECT * FROM financeiro_despesas WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| MandatoError::not_found("despesa", id))
    }

    pub async fn create(&self, actor: i64, payload: DespesaPayload) -> Result<Despesa, MandatoError> {
        payload.validate()?;
        let p = payload.normalized();

        let result = sqlx::query(
            r#"
            INSERT INTO financeiro_despesas (descricao, categoria, fornecedor, numero_nota, valor_centavos,
                                             vencimento, status, criado_em)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&p.descricao)
        .bind(&p.categoria)
        .bind(&p.fornecedor)
        .bind(&p.numero_nota)
        .bind(p.valor_centavos)
        .bind(p.vencimento)
        .bind(p.status)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        self.audit
            .record(Some(actor), AcaoAuditoria::Criar, "financeiro_despesas", Some(id), serde_json::to_value(&p)?)
            .await?;

        self.get(id).await
    }

    pub async fn update(&self, actor: i64, id: i64, payload: DespesaPayload) -> Result<Despesa, MandatoError> {
        payload.validate()?;
        let p = payload.normalized();
        self.get(id).await?;

        sqlx::query(
            r#"
            UPDATE financeiro_despesas SET descricao = ?, categoria = ?, fornecedor = ?, numero_nota = ?,
                   valor_centavos = ?, vencimento = ?, status = ?
            WHERE id = ?
            "#,
        )
        .bind(&p.descricao)
        .bind(&p.categoria)
        .bind(&p.fornecedor)
        .bind(&p.numero_nota)
        .bind(p.valor_centavos)
        .bind(p.vencimento)
        .bind(p.status)
        .bind(id)
        .execute(&self.pool)
        .await?;

        self.audit
            .record(
                Some(actor),
                AcaoAuditoria::Atualizar,
                "financeiro_despesas",
                Some(id),
                serde_json::to_value(&p)?,
            )
            .await?;

        self.get(id).await
    }

    pub async fn delete(&self, actor: i64, id: i64) -> Result<(), MandatoError> {
        let despesa = self.get(id).await?;

        sqlx::query("DELETE FROM financeiro_despesas WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        self.audit
            .record(
                Some(actor),
                AcaoAuditoria::Excluir,
                "financeiro_despesas",
                Some(id),
                serde_json::json!({ "descricao": despesa.descricao, "valor_centavos": despesa.valor_centavos }),
            )
            .await?;

        Ok(())
    }
}
