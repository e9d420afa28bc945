//! Donors and the donations they made

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::audit::AuditLogger;
use crate::config::PaginationConfig;
use crate::database::models::{display_opt, format_centavos, AcaoAuditoria};
use crate::database::Database;
use crate::error::MandatoError;
use crate::export::Exportable;
use crate::listing::{matches_eq, matches_query, paginate, DateRange, ListParams, Page, Searchable};
use crate::validation::{blank_to_none, digits_only, is_valid_cpf_cnpj, FieldErrors, Validate};

const SELECT_DOACAO: &str = r#"
    SELECT d.*, o.nome AS doador_nome, o.cpf_cnpj AS doador_cpf_cnpj
    FROM financeiro_doacoes d
    JOIN financeiro_doadores o ON o.id = d.doador_id
"#;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Doador {
    pub id: i64,
    pub nome: String,
    pub cpf_cnpj: String,
    pub email: Option<String>,
    pub telefone: Option<String>,
    pub criado_em: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoadorPayload {
    pub nome: String,
    pub cpf_cnpj: String,
    pub email: Option<String>,
    pub telefone: Option<String>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Doacao {
    pub id: i64,
    pub doador_id: i64,
    pub doador_nome: String,
    pub doador_cpf_cnpj: String,
    pub valor_centavos: i64,
    pub data: NaiveDate,
    pub recibo: Option<String>,
    pub criado_em: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoacaoPayload {
    pub doador_id: i64,
    pub valor_centavos: i64,
    pub data: NaiveDate,
    pub recibo: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DoacaoFilter {
    pub doador_id: Option<i64>,
    pub data_inicio: Option<NaiveDate>,
    pub data_fim: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DoacoesPage {
    #[serde(flatten)]
    pub page: Page<Doacao>,
    pub total_centavos: i64,
}

impl Searchable for Doador {
    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.nome.as_str(), self.cpf_cnpj.as_str()];
        fields.extend(
            [&self.email, &self.telefone]
                .into_iter()
                .filter_map(|f| f.as_deref()),
        );
        fields
    }
}

impl Searchable for Doacao {
    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.doador_nome.as_str(), self.doador_cpf_cnpj.as_str()];
        fields.extend(self.recibo.as_deref());
        fields
    }
}

impl Validate for DoadorPayload {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.required("nome", &self.nome);
        if self.cpf_cnpj.trim().is_empty() {
            errors.add("cpf_cnpj", "campo obrigatório");
        } else if !is_valid_cpf_cnpj(&self.cpf_cnpj) {
            errors.add("cpf_cnpj", "CPF/CNPJ inválido");
        }
        errors.optional_email("email", self.email.as_deref());
        errors.into_result()
    }
}

impl DoadorPayload {
    fn normalized(self) -> Self {
        Self {
            nome: self.nome.trim().to_string(),
            cpf_cnpj: digits_only(&self.cpf_cnpj),
            email: blank_to_none(self.email).map(|e| e.to_lowercase()),
            telefone: blank_to_none(self.telefone),
        }
    }
}

impl Validate for DoacaoPayload {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.positive_amount("valor_centavos", self.valor_centavos);
        if self.data > Utc::now().date_naive() {
            errors.add("data", "data no futuro");
        }
        errors.into_result()
    }
}

impl Exportable for Doacao {
    fn headers() -> &'static [&'static str] {
        &["Data", "Doador", "CPF/CNPJ", "Valor", "Recibo"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.data.format("%d/%m/%Y").to_string(),
            self.doador_nome.clone(),
            self.doador_cpf_cnpj.clone(),
            format_centavos(self.valor_centavos),
            display_opt(&self.recibo),
        ]
    }
}

#[derive(Clone)]
pub struct DoacaoRegistry {
    pool: SqlitePool,
    audit: AuditLogger,
}

impl DoacaoRegistry {
    pub fn new(database: &Database) -> Self {
        Self {
            pool: database.pool().clone(),
            audit: AuditLogger::new(database.pool().clone()),
        }
    }

    pub async fn list_doadores(&self, params: &ListParams, pagination: &PaginationConfig) -> Result<Page<Doador>, MandatoError> {
        let all = sqlx::query_as::<_, Doador>("SELECT * FROM financeiro_doadores ORDER BY nome COLLATE NOCASE")
            .fetch_all(&self.pool)
            .await?;

        // Searching by a formatted document matches the stored digits
        let query = params.query();
        let digits = digits_only(query);
        let rows: Vec<Doador> = all
            .into_iter()
            .filter(|d| matches_query(d, query) || (digits.len() >= 3 && d.cpf_cnpj.contains(&digits)))
            .collect();

        Ok(paginate(rows, params.page_request(pagination)))
    }

    pub async fn get_doador(&self, id: i64) -> Result<Doador, MandatoError> {
        sqlx::query_as::<_, Doador>("SELECT * FROM financeiro_doadores WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| MandatoError::not_found("doador", id))
    }

    pub async fn create_doador(&self, actor: i64, payload: DoadorPayload) -> Result<Doador, MandatoError> {
        payload.validate()?;
        let p = payload.normalized();

        let result = sqlx::query(
            "INSERT INTO financeiro_doadores (nome, cpf_cnpj, email, telefone, criado_em) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&p.nome)
        .bind(&p.cpf_cnpj)
        .bind(&p.email)
        .bind(&p.telefone)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        self.audit
            .record(Some(actor), AcaoAuditoria::Criar, "financeiro_doadores", Some(id), serde_json::to_value(&p)?)
            .await?;

        self.get_doador(id).await
    }

    pub async fn update_doador(&self, actor: i64, id: i64, payload: DoadorPayload) -> Result<Doador, MandatoError> {
        payload.validate()?;
        let p = payload.normalized();
        self.get_doador(id).await?;

        sqlx::query("UPDATE financeiro_doadores SET nome = ?, cpf_cnpj = ?, email = ?, telefone = ? WHERE id = ?")
            .bind(&p.nome)
            .bind(&p.cpf_cnpj)
            .bind(&p.email)
            .bind(&p.telefone)
            .bind(id)
            .execute(&self.pool)
            .await?;

        self.audit
            .record(
                Some(actor),
                AcaoAuditoria::Atualizar,
                "financeiro_doadores",
                Some(id),
                serde_json::to_value(&p)?,
            )
            .await?;

        self.get_doador(id).await
    }

    /// Donors with donations on record cannot be removed
    pub async fn delete_doador(&self, actor: i64, id: i64) -> Result<(), MandatoError> {
        let doador = self.get_doador(id).await?;

        sqlx::query("DELETE FROM financeiro_doadores WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        self.audit
            .record(
                Some(actor),
                AcaoAuditoria::Excluir,
                "financeiro_doadores",
                Some(id),
                serde_json::json!({ "nome": doador.nome, "cpf_cnpj": doador.cpf_cnpj }),
            )
            .await?;

        Ok(())
    }

    pub async fn search(&self, filter: &DoacaoFilter, query: &str) -> Result<Vec<Doacao>, MandatoError> {
        let sql = format!("{} ORDER BY d.data DESC, d.id DESC", SELECT_DOACAO);
        let all = sqlx::query_as::<_, Doacao>(&sql).fetch_all(&self.pool).await?;
        let range = DateRange::new(filter.data_inicio, filter.data_fim);

        Ok(all
            .into_iter()
            .filter(|d| matches_query(d, query))
            .filter(|d| matches_eq(Some(d.doador_id), filter.doador_id))
            .filter(|d| range.contains(d.data))
            .collect())
    }

    /// One page plus the total of every donation the filters selected
    pub async fn list(
        &self,
        filter: &DoacaoFilter,
        params: &ListParams,
        pagination: &PaginationConfig,
    ) -> Result<DoacoesPage, MandatoError> {
        let rows = self.search(filter, params.query()).await?;
        let total_centavos = rows
            .iter()
            .try_fold(0i64, |acc, d| acc.checked_add(d.valor_centavos))
            .ok_or_else(|| MandatoError::DatabaseError("donation total out of range".to_string()))?;
        Ok(DoacoesPage {
            page: paginate(rows, params.page_request(pagination)),
            total_centavos,
        })
    }

    pub async fn get(&self, id: i64) -> Result<Doacao, MandatoError> {
        let sql = format!("{} WHERE d.id = ?", SELECT_DOACAO);
        sqlx::query_as::<_, Doacao>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| MandatoError::not_found("doacao", id))
    }

    pub async fn create(&self, actor: i64, payload: DoacaoPayload) -> Result<Doacao, MandatoError> {
        payload.validate()?;
        self.get_doador(payload.doador_id).await?;
        let recibo = blank_to_none(payload.recibo.clone());

        let result = sqlx::query(
            "INSERT INTO financeiro_doacoes (doador_id, valor_centavos, data, recibo, criado_em) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(payload.doador_id)
        .bind(payload.valor_centavos)
        .bind(payload.data)
        .bind(&recibo)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        self.audit
            .record(Some(actor), AcaoAuditoria::Criar, "financeiro_doacoes", Some(id), serde_json::to_value(&payload)?)
            .await?;

        self.get(id).await
    }

    pub async fn update(&self, actor: i64, id: i64, payload: DoacaoPayload) -> Result<Doacao, MandatoError> {
        payload.validate()?;
        self.get(id).await?;
        self.get_doador(payload.doador_id).await?;

        sqlx::query("UPDATE financeiro_doacoes SET doador_id = ?, valor_centavos = ?, data = ?, recibo = ? WHERE id = ?")
            .bind(payload.doador_id)
            .bind(payload.valor_centavos)
            .bind(payload.data)
            .bind(blank_to_none(payload.recibo.clone()))
            .bind(id)
            .execute(&self.pool)
            .await?;

        self.audit
            .record(
                Some(actor),
                AcaoAuditoria::Atualizar,
                "financeiro_doacoes",
                Some(id),
                serde_json::to_value(&payload)?,
            )
            .await?;

        self.get(id).await
    }

    pub async fn delete(&self, actor: i64, id: i64) -> Result<(), MandatoError> {
        let doacao = self.get(id).await?;

        sqlx::query("DELETE FROM financeiro_doacoes WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        self.audit
            .record(
                Some(actor),
                AcaoAuditoria::Excluir,
                "financeiro_doacoes",
                Some(id),
                serde_json::json!({ "doador_id": doacao.doador_id, "valor_centavos": doacao.valor_centavos }),
            )
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_donor_document_must_be_cpf_or_cnpj() {
        let mut payload = DoadorPayload {
            nome: "Comercial Boa Vista".to_string(),
            cpf_cnpj: "11.222.333/0001-81".to_string(),
            email: None,
            telefone: None,
        };
        assert!(payload.validate().is_ok());
        assert_eq!(payload.clone().normalized().cpf_cnpj, "11222333000181");

        payload.cpf_cnpj = "123.456".to_string();
        assert!(payload.validate().unwrap_err().has("cpf_cnpj"));
    }
}
