//! System settings: a flat key/value table edited by administrators

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::collections::BTreeMap;

use crate::audit::AuditLogger;
use crate::database::models::AcaoAuditoria;
use crate::database::Database;
use crate::error::MandatoError;
use crate::validation::{FieldErrors, Validate};

/// Birthday greeting template; `{nome}` is replaced by the recipient's name
pub const MENSAGEM_ANIVERSARIO: &str = "mensagem_aniversario";

pub const DEFAULT_MENSAGEM_ANIVERSARIO: &str =
    "Olá, {nome}! Feliz aniversário! Desejamos um novo ano de muita saúde e conquistas.";

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Configuracao {
    pub chave: String,
    pub valor: String,
    pub atualizado_em: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfiguracaoPayload {
    pub valor: String,
}

struct Chave<'a>(&'a str);

impl Validate for Chave<'_> {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.required("chave", self.0);
        errors.max_len("chave", self.0, 100);
        if !self
            .0
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '.')
        {
            errors.add("chave", "use apenas letras minúsculas, dígitos, '_' e '.'");
        }
        errors.into_result()
    }
}

#[derive(Clone)]
pub struct ConfiguracaoRegistry {
    pool: SqlitePool,
    audit: AuditLogger,
}

impl ConfiguracaoRegistry {
    pub fn new(database: &Database) -> Self {
        Self {
            pool: database.pool().clone(),
            audit: AuditLogger::new(database.pool().clone()),
        }
    }

    pub async fn list(&self) -> Result<Vec<Configuracao>, MandatoError> {
        let rows = sqlx::query_as::<_, Configuracao>("SELECT * FROM configuracoes_sistema ORDER BY chave")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn get(&self, chave: &str) -> Result<Configuracao, MandatoError> {
        sqlx::query_as::<_, Configuracao>("SELECT * FROM configuracoes_sistema WHERE chave = ?")
            .bind(chave)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| MandatoError::NotFound(format!("configuracao {}", chave)))
    }

    /// Stored value, or `default` when the key was never set
    pub async fn value_or(&self, chave: &str, default: &str) -> Result<String, MandatoError> {
        let valor: Option<String> =
            sqlx::query_scalar("SELECT valor FROM configuracoes_sistema WHERE chave = ?")
                .bind(chave)
                .fetch_optional(&self.pool)
                .await?;
        Ok(valor.unwrap_or_else(|| default.to_string()))
    }

    pub async fn upsert(&self, actor: Option<i64>, chave: &str, valor: &str) -> Result<Configuracao, MandatoError> {
        Chave(chave).validate()?;

        sqlx::query(
            r#"
            INSERT INTO configuracoes_sistema (chave, valor, atualizado_em) VALUES (?, ?, ?)
            ON CONFLICT(chave) DO UPDATE SET valor = excluded.valor, atualizado_em = excluded.atualizado_em
            "#,
        )
        .bind(chave)
        .bind(valor)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        self.audit
            .record(
                actor,
                AcaoAuditoria::Atualizar,
                "configuracoes_sistema",
                None,
                serde_json::json!({ "chave": chave, "valor": valor }),
            )
            .await?;

        self.get(chave).await
    }

    pub async fn delete(&self, actor: i64, chave: &str) -> Result<(), MandatoError> {
        let atual = self.get(chave).await?;

        sqlx::query("DELETE FROM configuracoes_sistema WHERE chave = ?")
            .bind(chave)
            .execute(&self.pool)
            .await?;

        self.audit
            .record(
                Some(actor),
                AcaoAuditoria::Excluir,
                "configuracoes_sistema",
                None,
                serde_json::json!({ "chave": atual.chave, "valor": atual.valor }),
            )
            .await?;

        Ok(())
    }

    /// Write every pair of a settings map, returning how many were stored
    pub async fn seed(&self, actor: Option<i64>, values: &BTreeMap<String, String>) -> Result<usize, MandatoError> {
        for (chave, valor) in values {
            self.upsert(actor, chave, valor).await?;
        }
        Ok(values.len())
    }
}
