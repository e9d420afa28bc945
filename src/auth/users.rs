//! User and role administration

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::info;

use crate::audit::AuditLogger;
use crate::auth::password::{hash_password, verify_password};
use crate::config::PaginationConfig;
use crate::database::models::{AcaoAuditoria, Perfil};
use crate::database::Database;
use crate::error::MandatoError;
use crate::listing::{matches_eq, matches_query, paginate, ListParams, Page, Searchable};
use crate::validation::{FieldErrors, Validate};

const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Usuario {
    pub id: i64,
    pub nome: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub senha_hash: String,
    pub perfil: Perfil,
    pub ativo: bool,
    pub criado_em: DateTime<Utc>,
}

impl Searchable for Usuario {
    fn search_fields(&self) -> Vec<&str> {
        vec![self.nome.as_str(), self.email.as_str()]
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NovoUsuario {
    pub nome: String,
    pub email: String,
    pub senha: String,
    #[serde(default = "default_perfil")]
    pub perfil: Perfil,
    #[serde(default = "default_true")]
    pub ativo: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AtualizaUsuario {
    pub nome: String,
    pub email: String,
    pub perfil: Perfil,
    pub ativo: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlteraSenha {
    /// Required when users change their own password
    pub senha_atual: Option<String>,
    pub nova_senha: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UsuarioFilter {
    pub perfil: Option<Perfil>,
    pub ativo: Option<bool>,
}

fn default_perfil() -> Perfil {
    Perfil::Operador
}

fn default_true() -> bool {
    true
}

fn validate_identity(errors: &mut FieldErrors, nome: &str, email: &str) {
    errors.required("nome", nome);
    errors.max_len("nome", nome, 150);
    errors.required("email", email);
    if !email.trim().is_empty() {
        errors.optional_email("email", Some(email));
    }
}

fn validate_password(errors: &mut FieldErrors, field: &str, senha: &str) {
    if senha.chars().count() < MIN_PASSWORD_LEN {
        errors.add(field, format!("mínimo de {} caracteres", MIN_PASSWORD_LEN));
    }
}

impl Validate for NovoUsuario {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        validate_identity(&mut errors, &self.nome, &self.email);
        validate_password(&mut errors, "senha", &self.senha);
        errors.into_result()
    }
}

impl Validate for AtualizaUsuario {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        validate_identity(&mut errors, &self.nome, &self.email);
        errors.into_result()
    }
}

#[derive(Clone)]
pub struct UserRegistry {
    pool: SqlitePool,
    audit: AuditLogger,
}

impl UserRegistry {
    pub fn new(database: &Database) -> Self {
        Self {
            pool: database.pool().clone(),
            audit: AuditLogger::new(database.pool().clone()),
        }
    }

    pub async fn list(
        &self,
        filter: &UsuarioFilter,
        params: &ListParams,
        pagination: &PaginationConfig,
    ) -> Result<Page<Usuario>, MandatoError> {
        let all = sqlx::query_as::<_, Usuario>("SELECT * FROM usuarios ORDER BY nome")
            .fetch_all(&self.pool)
            .await?;

        let filtered: Vec<Usuario> = all
            .into_iter()
            .filter(|u| matches_query(u, params.query()))
            .filter(|u| matches_eq(Some(u.perfil), filter.perfil))
            .filter(|u| matches_eq(Some(u.ativo), filter.ativo))
            .collect();

        Ok(paginate(filtered, params.page_request(pagination)))
    }

    pub async fn get(&self, id: i64) -> Result<Usuario, MandatoError> {
        sqlx::query_as::<_, Usuario>("SELECT * FROM usuarios WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| MandatoError::not_found("usuario", id))
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<Usuario>, MandatoError> {
        Ok(
            sqlx::query_as::<_, Usuario>("SELECT * FROM usuarios WHERE lower(email) = lower(?)")
                .bind(email.trim())
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    /// `actor` is `None` only for provisioning from the command line
    pub async fn create(&self, actor: Option<i64>, novo: NovoUsuario) -> Result<Usuario, MandatoError> {
        novo.validate()?;

        let result = sqlx::query(
            r#"
            INSERT INTO usuarios (nome, email, senha_hash, perfil, ativo, criado_em)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(novo.nome.trim())
        .bind(novo.email.trim().to_lowercase())
        .bind(hash_password(&novo.senha)?)
        .bind(novo.perfil)
        .bind(novo.ativo)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        self.audit
            .record(
                actor,
                AcaoAuditoria::Criar,
                "usuarios",
                Some(id),
                serde_json::json!({ "email": novo.email.trim().to_lowercase(), "perfil": novo.perfil }),
            )
            .await?;

        info!("Created user {} ({})", id, novo.perfil);
        self.get(id).await
    }

    pub async fn update(&self, actor: i64, id: i64, dados: AtualizaUsuario) -> Result<Usuario, MandatoError> {
        dados.validate()?;
        let before = self.get(id).await?;

        let loses_admin = before.perfil.is_admin() && before.ativo && (!dados.perfil.is_admin() || !dados.ativo);
        if loses_admin && self.active_admin_count().await? <= 1 {
            return Err(MandatoError::Conflict(
                "at least one active administrator must remain".to_string(),
            ));
        }

        sqlx::query("UPDATE usuarios SET nome = ?, email = ?, perfil = ?, ativo = ? WHERE id = ?")
            .bind(dados.nome.trim())
            .bind(dados.email.trim().to_lowercase())
            .bind(dados.perfil)
            .bind(dados.ativo)
            .bind(id)
            .execute(&self.pool)
            .await?;

        self.audit
            .record(
                Some(actor),
                AcaoAuditoria::Atualizar,
                "usuarios",
                Some(id),
                serde_json::json!({
                    "antes": { "nome": before.nome, "email": before.email, "perfil": before.perfil, "ativo": before.ativo },
                    "depois": { "nome": dados.nome, "email": dados.email, "perfil": dados.perfil, "ativo": dados.ativo },
                }),
            )
            .await?;

        self.get(id).await
    }

    /// Users changing their own password must confirm the current one
    pub async fn change_password(
        &self,
        actor: i64,
        actor_is_admin: bool,
        id: i64,
        dados: AlteraSenha,
    ) -> Result<(), MandatoError> {
        let usuario = self.get(id).await?;

        let mut errors = FieldErrors::new();
        validate_password(&mut errors, "nova_senha", &dados.nova_senha);

        if actor == id || !actor_is_admin {
            if actor != id {
                return Err(MandatoError::Forbidden(
                    "only administrators may change other users' passwords".to_string(),
                ));
            }
            let atual = dados.senha_atual.as_deref().unwrap_or("");
            if !verify_password(atual, &usuario.senha_hash)? {
                errors.add("senha_atual", "senha atual incorreta");
            }
        }
        errors.into_result()?;

        sqlx::query("UPDATE usuarios SET senha_hash = ? WHERE id = ?")
            .bind(hash_password(&dados.nova_senha)?)
            .bind(id)
            .execute(&self.pool)
            .await?;

        self.audit
            .record(
                Some(actor),
                AcaoAuditoria::AlterarSenha,
                "usuarios",
                Some(id),
                serde_json::json!({}),
            )
            .await?;

        Ok(())
    }

    pub async fn delete(&self, actor: i64, id: i64) -> Result<(), MandatoError> {
        if actor == id {
            return Err(MandatoError::Conflict("users cannot delete themselves".to_string()));
        }

        let usuario = self.get(id).await?;
        if usuario.perfil.is_admin() && usuario.ativo && self.active_admin_count().await? <= 1 {
            return Err(MandatoError::Conflict(
                "at least one active administrator must remain".to_string(),
            ));
        }

        sqlx::query("DELETE FROM usuarios WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        self.audit
            .record(
                Some(actor),
                AcaoAuditoria::Excluir,
                "usuarios",
                Some(id),
                serde_json::json!({ "email": usuario.email }),
            )
            .await?;

        Ok(())
    }

    async fn active_admin_count(&self) -> Result<i64, MandatoError> {
        Ok(sqlx::query_scalar(
            "SELECT COUNT(*) FROM usuarios WHERE perfil = 'ADMINISTRADOR' AND ativo = 1",
        )
        .fetch_one(&self.pool)
        .await?)
    }
}
