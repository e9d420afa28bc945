//! Authentication and user administration
//!
//! Login issues a signed session token; every request carrying it is
//! resolved back to an [`AuthUser`] whose role gates the admin screens.

pub mod extractor;
pub mod password;
pub mod token;
pub mod users;

pub use extractor::AuthUser;
pub use users::{AlteraSenha, AtualizaUsuario, NovoUsuario, UserRegistry, Usuario, UsuarioFilter};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::audit::{AccessContext, AuditLogger};
use crate::config::AppConfig;
use crate::database::models::Perfil;
use crate::database::Database;
use crate::error::MandatoError;

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub senha: String,
}

/// What the client keeps for the session
#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expira_em: i64,
    pub usuario: PerfilSessao,
}

#[derive(Debug, Clone, Serialize)]
pub struct PerfilSessao {
    pub id: i64,
    pub nome: String,
    pub email: String,
    pub perfil: Perfil,
}

impl From<&AuthUser> for PerfilSessao {
    fn from(user: &AuthUser) -> Self {
        Self {
            id: user.id,
            nome: user.nome.clone(),
            email: user.email.clone(),
            perfil: user.perfil,
        }
    }
}

/// Check credentials and issue a session token. Every attempt, successful
/// or not, lands in the access log.
pub async fn login(
    database: &Database,
    config: &AppConfig,
    request: &LoginRequest,
    context: &AccessContext,
) -> Result<LoginResponse, MandatoError> {
    let users = UserRegistry::new(database);
    let audit = AuditLogger::new(database.pool().clone());

    let usuario = match users.find_by_email(&request.email).await? {
        Some(u) => u,
        None => {
            audit
                .record_access(None, &request.email, false, Some("usuario inexistente"), context)
                .await?;
            return Err(login_failure(&request.email, "unknown user"));
        }
    };

    if !password::verify_password(&request.senha, &usuario.senha_hash)? {
        audit
            .record_access(Some(usuario.id), &usuario.email, false, Some("senha incorreta"), context)
            .await?;
        return Err(login_failure(&request.email, "wrong password"));
    }

    if !usuario.ativo {
        audit
            .record_access(Some(usuario.id), &usuario.email, false, Some("usuario inativo"), context)
            .await?;
        return Err(MandatoError::Forbidden("user is inactive".to_string()));
    }

    let (token, claims) = token::issue_token(
        &config.jwt_secret,
        config.token_ttl_hours,
        usuario.id,
        &usuario.nome,
        &usuario.email,
        usuario.perfil,
    )?;

    audit
        .record_access(Some(usuario.id), &usuario.email, true, None, context)
        .await?;
    info!("User {} logged in", usuario.id);

    Ok(LoginResponse {
        token,
        expira_em: claims.exp,
        usuario: PerfilSessao {
            id: usuario.id,
            nome: usuario.nome,
            email: usuario.email,
            perfil: usuario.perfil,
        },
    })
}

/// Unknown user and wrong password look the same to the caller
fn login_failure(email: &str, motivo: &str) -> MandatoError {
    warn!("Login failed for {}: {}", email.trim(), motivo);
    MandatoError::Unauthorized("invalid credentials".to_string())
}
