use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::auth::token::decode_token;
use crate::database::models::Perfil;
use crate::error::MandatoError;
use crate::state::AppState;

/// The logged-in user, taken from `Authorization: Bearer <token>`
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: i64,
    pub nome: String,
    pub email: String,
    pub perfil: Perfil,
}

impl AuthUser {
    pub fn require(&self, allowed: &[Perfil]) -> Result<(), MandatoError> {
        if allowed.contains(&self.perfil) {
            Ok(())
        } else {
            Err(MandatoError::Forbidden(format!(
                "profile {} may not perform this action",
                self.perfil
            )))
        }
    }

    pub fn require_admin(&self) -> Result<(), MandatoError> {
        self.require(&[Perfil::Administrador])
    }

    /// Deletes and financial records are closed to leadership accounts
    pub fn require_staff(&self) -> Result<(), MandatoError> {
        self.require(&[Perfil::Administrador, Perfil::Operador])
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = MandatoError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| MandatoError::Unauthorized("missing Authorization header".to_string()))?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| MandatoError::Unauthorized("expected a Bearer token".to_string()))?;

        let claims = decode_token(&state.config.jwt_secret, token.trim())?;

        // Role and status come from the database so changes apply immediately
        let current: Option<(String, String, Perfil, bool)> =
            sqlx::query_as("SELECT nome, email, perfil, ativo FROM usuarios WHERE id = ?")
                .bind(claims.sub)
                .fetch_optional(state.database.pool())
                .await?;

        match current {
            Some((nome, email, perfil, true)) => Ok(AuthUser {
                id: claims.sub,
                nome,
                email,
                perfil,
            }),
            _ => Err(MandatoError::Unauthorized("user is inactive or removed".to_string())),
        }
    }
}
