use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::audit::AuditLogger;
use crate::config::PaginationConfig;
use crate::database::models::{display_opt, format_centavos, AcaoAuditoria};
use crate::database::Database;
use crate::error::MandatoError;
use crate::export::Exportable;
use crate::listing::{matches_eq, matches_query, matches_text, paginate, ListParams, Page, Searchable};
use crate::validation::{
    blank_to_none, format_cpf, normalize_document, FieldErrors, Validate, MAX_VALOR_CENTAVOS,
};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Funcionario {
    pub id: i64,
    pub nome: String,
    pub cpf: Option<String>,
    pub cargo: String,
    pub email: Option<String>,
    pub telefone: Option<String>,
    pub whatsapp: Option<String>,
    pub salario_centavos: i64,
    pub data_admissao: Option<NaiveDate>,
    pub data_nascimento: Option<NaiveDate>,
    pub ativo: bool,
    pub criado_em: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FuncionarioPayload {
    pub nome: String,
    pub cpf: Option<String>,
    pub cargo: String,
    pub email: Option<String>,
    pub telefone: Option<String>,
    pub whatsapp: Option<String>,
    #[serde(default)]
    pub salario_centavos: i64,
    pub data_admissao: Option<NaiveDate>,
    pub data_nascimento: Option<NaiveDate>,
    #[serde(default = "default_ativo")]
    pub ativo: bool,
}

fn default_ativo() -> bool {
    true
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FuncionarioFilter {
    pub cargo: Option<String>,
    pub ativo: Option<bool>,
}

impl Searchable for Funcionario {
    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.nome.as_str(), self.cargo.as_str()];
        fields.extend(
            [&self.cpf, &self.email, &self.telefone]
                .into_iter()
                .filter_map(|f| f.as_deref()),
        );
        fields
    }
}

impl Validate for FuncionarioPayload {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.required("nome", &self.nome);
        errors.required("cargo", &self.cargo);
        errors.optional_cpf("cpf", self.cpf.as_deref());
        errors.optional_email("email", self.email.as_deref());
        if self.salario_centavos < 0 {
            errors.add("salario_centavos", "salário não pode ser negativo");
        } else if self.salario_centavos > MAX_VALOR_CENTAVOS {
            errors.add("salario_centavos", "valor acima do limite permitido");
        }
        errors.into_result()
    }
}

impl FuncionarioPayload {
    fn normalized(self) -> Self {
        Self {
            nome: self.nome.trim().to_string(),
            cpf: normalize_document(self.cpf),
            cargo: self.cargo.trim().to_string(),
            email: blank_to_none(self.email).map(|e| e.to_lowercase()),
            telefone: blank_to_none(self.telefone),
            whatsapp: blank_to_none(self.whatsapp),
            ..self
        }
    }
}

impl Exportable for Funcionario {
    fn headers() -> &'static [&'static str] {
        &["Nome", "CPF", "Cargo", "E-mail", "Telefone", "Salário", "Admissão", "Ativo"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.nome.clone(),
            self.cpf.as_deref().map(format_cpf).unwrap_or_default(),
            self.cargo.clone(),
            display_opt(&self.email),
            display_opt(&self.telefone),
            format_centavos(self.salario_centavos),
            self.data_admissao
                .map(|d| d.format("%d/%m/%Y").to_string())
                .unwrap_or_default(),
            if self.ativo { "sim" } else { "não" }.to_string(),
        ]
    }
}

#[derive(Clone)]
pub struct FuncionarioRegistry {
    pool: SqlitePool,
    audit: AuditLogger,
}

impl FuncionarioRegistry {
    pub fn new(database: &Database) -> Self {
        Self {
            pool: database.pool().clone(),
            audit: AuditLogger::new(database.pool().clone()),
        }
    }

    pub async fn search(&self, filter: &FuncionarioFilter, query: &str) -> Result<Vec<Funcionario>, MandatoError> {
        let all = sqlx::query_as::<_, Funcionario>("SELECT * FROM funcionarios ORDER BY nome COLLATE NOCASE")
            .fetch_all(&self.pool)
            .await?;

        Ok(all
            .into_iter()
            .filter(|f| matches_query(f, query))
            .filter(|f| matches_text(Some(&f.cargo), filter.cargo.as_deref()))
            .filter(|f| matches_eq(Some(f.ativo), filter.ativo))
            .collect())
    }

    pub async fn list(
        &self,
        filter: &FuncionarioFilter,
        params: &ListParams,
        pagination: &PaginationConfig,
    ) -> Result<Page<Funcionario>, MandatoError> {
        let rows = self.search(filter, params.query()).await?;
        Ok(paginate(rows, params.page_request(pagination)))
    }

    pub async fn get(&self, id: i64) -> Result<Funcionario, MandatoError> {
        sqlx::query_as::<_, Funcionario>("SELECT * FROM funcionarios WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| MandatoError::not_found("funcionario", id))
    }

    pub async fn create(&self, actor: i64, payload: FuncionarioPayload) -> Result<Funcionario, MandatoError> {
        payload.validate()?;
        let p = payload.normalized();

        let result = sqlx::query(
            r#"
            INSERT INTO funcionarios (nome, cpf, cargo, email, telefone, whatsapp, salario_centavos,
                                      data_admissao, data_nascimento, ativo, criado_em)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&p.nome)
        .bind(&p.cpf)
        .bind(&p.cargo)
        .bind(&p.email)
        .bind(&p.telefone)
        .bind(&p.whatsapp)
        .bind(p.salario_centavos)
        .bind(p.data_admissao)
        .bind(p.data_nascimento)
        .bind(p.ativo)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        self.audit
            .record(Some(actor), AcaoAuditoria::Criar, "funcionarios", Some(id), serde_json::to_value(&p)?)
            .await?;

        self.get(id).await
    }

    pub async fn update(&self, actor: i64, id: i64, payload: FuncionarioPayload) -> Result<Funcionario, MandatoError> {
        payload.validate()?;
        let p = payload.normalized();
        self.get(id).await?;

        sqlx::query(
            r#"
            UPDATE funcionarios SET nome = ?, cpf = ?, cargo = ?, email = ?, telefone = ?, whatsapp = ?,
                   salario_centavos = ?, data_admissao = ?, data_nascimento = ?, ativo = ?
            WHERE id = ?
            "#,
        )
        .bind(&p.nome)
        .bind(&p.cpf)
        .bind(&p.cargo)
        .bind(&p.email)
        .bind(&p.telefone)
        .bind(&p.whatsapp)
        .bind(p.salario_centavos)
        .bind(p.data_admissao)
        .bind(p.data_nascimento)
        .bind(p.ativo)
        .bind(id)
        .execute(&self.pool)
        .await?;

        self.audit
            .record(Some(actor), AcaoAuditoria::Atualizar, "funcionarios", Some(id), serde_json::to_value(&p)?)
            .await?;

        self.get(id).await
    }

    pub async fn delete(&self, actor: i64, id: i64) -> Result<(), MandatoError> {
        let funcionario = self.get(id).await?;

        sqlx::query("DELETE FROM funcionarios WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        self.audit
            .record(
                Some(actor),
                AcaoAuditoria::Excluir,
                "funcionarios",
                Some(id),
                serde_json::json!({ "nome": funcionario.nome, "cargo": funcionario.cargo }),
            )
            .await?;

        Ok(())
    }
}
