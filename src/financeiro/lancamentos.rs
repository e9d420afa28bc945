//! Cash book entries and the running balance

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::audit::AuditLogger;
use crate::config::PaginationConfig;
use crate::database::models::{format_centavos, AcaoAuditoria, TipoLancamento};
use crate::database::Database;
use crate::error::MandatoError;
use crate::export::Exportable;
use crate::listing::{
    matches_eq, matches_query, matches_text, paginate, DateRange, ListParams, Page, Searchable,
};
use crate::validation::{FieldErrors, Validate};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Lancamento {
    pub id: i64,
    pub tipo: TipoLancamento,
    pub categoria: String,
    pub descricao: String,
    pub valor_centavos: i64,
    pub data: NaiveDate,
    pub criado_em: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LancamentoPayload {
    pub tipo: TipoLancamento,
    pub categoria: String,
    pub descricao: String,
    pub valor_centavos: i64,
    pub data: NaiveDate,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LancamentoFilter {
    pub tipo: Option<TipoLancamento>,
    pub categoria: Option<String>,
    pub data_inicio: Option<NaiveDate>,
    pub data_fim: Option<NaiveDate>,
}

/// Totals over the filtered entries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResumoFinanceiro {
    pub entradas_centavos: i64,
    pub saidas_centavos: i64,
    pub saldo_centavos: i64,
}

impl ResumoFinanceiro {
    pub fn from_lancamentos<'a>(
        lancamentos: impl IntoIterator<Item = &'a Lancamento>,
    ) -> Result<Self, MandatoError> {
        let mut resumo = Self::default();
        for l in lancamentos {
            let total = match l.tipo {
                TipoLancamento::Entrada => &mut resumo.entradas_centavos,
                TipoLancamento::Saida => &mut resumo.saidas_centavos,
            };
            *total = total
                .checked_add(l.valor_centavos)
                .ok_or_else(totals_overflow)?;
        }
        resumo.saldo_centavos = resumo
            .entradas_centavos
            .checked_sub(resumo.saidas_centavos)
            .ok_or_else(totals_overflow)?;
        Ok(resumo)
    }
}

fn totals_overflow() -> MandatoError {
    MandatoError::DatabaseError("financial totals out of range".to_string())
}

#[derive(Debug, Clone, Serialize)]
pub struct LancamentosPage {
    #[serde(flatten)]
    pub page: Page<Lancamento>,
    pub resumo: ResumoFinanceiro,
}

impl Searchable for Lancamento {
    fn search_fields(&self) -> Vec<&str> {
        vec![self.categoria.as_str(), self.descricao.as_str()]
    }
}

impl Validate for LancamentoPayload {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.required("categoria", &self.categoria);
        errors.required("descricao", &self.descricao);
        errors.positive_amount("valor_centavos", self.valor_centavos);
        errors.into_result()
    }
}

impl Exportable for Lancamento {
    fn headers() -> &'static [&'static str] {
        &["Data", "Tipo", "Categoria", "Descrição", "Valor"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.data.format("%d/%m/%Y").to_string(),
            self.tipo.to_string(),
            self.categoria.clone(),
            self.descricao.clone(),
            format_centavos(self.valor_centavos),
        ]
    }
}

#[derive(Clone)]
pub struct LancamentoRegistry {
    pool: SqlitePool,
    audit: AuditLogger,
}

impl LancamentoRegistry {
    pub fn new(database: &Database) -> Self {
        Self {
            pool: database.pool().clone(),
            audit: AuditLogger::new(database.pool().clone()),
        }
    }

    pub async fn search(&self, filter: &LancamentoFilter, query: &str) -> Result<Vec<Lancamento>, MandatoError> {
        let all = sqlx::query_as::<_, Lancamento>(
            "SELECT * FROM financeiro_lancamentos ORDER BY data DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        let range = DateRange::new(filter.data_inicio, filter.data_fim);

        Ok(all
            .into_iter()
            .filter(|l| matches_query(l, query))
            .filter(|l| matches_eq(Some(l.tipo), filter.tipo))
            .filter(|l| matches_text(Some(&l.categoria), filter.categoria.as_deref()))
            .filter(|l| range.contains(l.data))
            .collect())
    }

    /// One page plus the balance of everything the filters selected
    pub async fn list(
        &self,
        filter: &LancamentoFilter,
        params: &ListParams,
        pagination: &PaginationConfig,
    ) -> Result<LancamentosPage, MandatoError> {
        let rows = self.search(filter, params.query()).await?;
        let resumo = ResumoFinanceiro::from_lancamentos(&rows)?;
        Ok(LancamentosPage {
            page: paginate(rows, params.page_request(pagination)),
            resumo,
        })
    }

    pub async fn get(&self, id: i64) -> Result<Lancamento, MandatoError> {
        sqlx::query_as::<_, Lancamento>("SELECT * FROM financeiro_lancamentos WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| MandatoError::not_found("lancamento", id))
    }

    pub async fn create(&self, actor: i64, payload: LancamentoPayload) -> Result<Lancamento, MandatoError> {
        payload.validate()?;

        let result = sqlx::query(
            r#"
            INSERT INTO financeiro_lancamentos (tipo, categoria, descricao, valor_centavos, data, criado_em)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(payload.tipo)
        .bind(payload.categoria.trim())
        .bind(payload.descricao.trim())
        .bind(payload.valor_centavos)
        .bind(payload.data)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        self.audit
            .record(
                Some(actor),
                AcaoAuditoria::Criar,
                "financeiro_lancamentos",
                Some(id),
                serde_json::to_value(&payload)?,
            )
            .await?;

        self.get(id).await
    }

    pub async fn update(&self, actor: i64, id: i64, payload: LancamentoPayload) -> Result<Lancamento, MandatoError> {
        payload.validate()?;
        self.get(id).await?;

        sqlx::query(
            r#"
            UPDATE financeiro_lancamentos SET tipo = ?, categoria = ?, descricao = ?, valor_centavos = ?, data = ?
            WHERE id = ?
            "#,
        )
        .bind(payload.tipo)
        .bind(payload.categoria.trim())
        .bind(payload.descricao.trim())
        .bind(payload.valor_centavos)
        .bind(payload.data)
        .bind(id)
        .execute(&self.pool)
        .await?;

        self.audit
            .record(
                Some(actor),
                AcaoAuditoria::Atualizar,
                "financeiro_lancamentos",
                Some(id),
                serde_json::to_value(&payload)?,
            )
            .await?;

        self.get(id).await
    }

    pub async fn delete(&self, actor: i64, id: i64) -> Result<(), MandatoError> {
        let lancamento = self.get(id).await?;

        sqlx::query("DELETE FROM financeiro_lancamentos WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        self.audit
            .record(
                Some(actor),
                AcaoAuditoria::Excluir,
                "financeiro_lancamentos",
                Some(id),
                serde_json::json!({
                    "tipo": lancamento.tipo,
                    "valor_centavos": lancamento.valor_centavos,
                    "data": lancamento.data,
                }),
            )
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lancamento(tipo: TipoLancamento, valor: i64) -> Lancamento {
        Lancamento {
            id: 0,
            tipo,
            categoria: "Geral".to_string(),
            descricao: "teste".to_string(),
            valor_centavos: valor,
            data: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            criado_em: Utc::now(),
        }
    }

    #[test]
    fn test_balance_is_inflow_minus_outflow() {
        let rows = vec![
            lancamento(TipoLancamento::Entrada, 100_000),
            lancamento(TipoLancamento::Saida, 35_050),
            lancamento(TipoLancamento::Entrada, 1_000),
        ];
        let resumo = ResumoFinanceiro::from_lancamentos(&rows).unwrap();

        assert_eq!(resumo.entradas_centavos, 101_000);
        assert_eq!(resumo.saidas_centavos, 35_050);
        assert_eq!(resumo.saldo_centavos, 65_950);
    }

    #[test]
    fn test_empty_balance_is_zero() {
        assert_eq!(
            ResumoFinanceiro::from_lancamentos(&[]).unwrap(),
            ResumoFinanceiro::default()
        );
    }

    #[test]
    fn test_overflowing_totals_are_an_error() {
        let rows = vec![
            lancamento(TipoLancamento::Entrada, i64::MAX),
            lancamento(TipoLancamento::Entrada, 1),
        ];
        assert!(matches!(
            ResumoFinanceiro::from_lancamentos(&rows),
            Err(MandatoError::DatabaseError(_))
        ));

        let rows = vec![
            lancamento(TipoLancamento::Entrada, 1),
            lancamento(TipoLancamento::Saida, i64::MAX),
            lancamento(TipoLancamento::Saida, 1),
        ];
        assert!(ResumoFinanceiro::from_lancamentos(&rows).is_err());
    }
}
