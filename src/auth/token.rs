//! Session tokens (HS256 JWT) standing in for the browser-stored profile

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::database::models::Perfil;
use crate::error::MandatoError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub nome: String,
    pub email: String,
    pub perfil: Perfil,
    pub iat: i64,
    pub exp: i64,
}

pub fn issue_token(
    secret: &str,
    ttl_hours: i64,
    usuario_id: i64,
    nome: &str,
    email: &str,
    perfil: Perfil,
) -> Result<(String, Claims), MandatoError> {
    let now = Utc::now();
    let claims = Claims {
        sub: usuario_id,
        nome: nome.to_string(),
        email: email.to_string(),
        perfil,
        iat: now.timestamp(),
        exp: (now + Duration::hours(ttl_hours)).timestamp(),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| MandatoError::ConfigError(format!("Failed to sign session token: {}", e)))?;

    Ok((token, claims))
}

pub fn decode_token(secret: &str, token: &str) -> Result<Claims, MandatoError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| MandatoError::Unauthorized(format!("invalid session token: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_and_decode() {
        let (token, _) =
            issue_token("segredo", 1, 7, "Ana", "ana@gabinete.br", Perfil::Operador).unwrap();
        let claims = decode_token("segredo", &token).unwrap();
        assert_eq!(claims.sub, 7);
        assert_eq!(claims.perfil, Perfil::Operador);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let (token, _) =
            issue_token("segredo", 1, 7, "Ana", "ana@gabinete.br", Perfil::Operador).unwrap();
        assert!(matches!(
            decode_token("outro", &token),
            Err(MandatoError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_expired_token_rejected() {
        let (token, _) =
            issue_token("segredo", -2, 7, "Ana", "ana@gabinete.br", Perfil::Operador).unwrap();
        assert!(decode_token("segredo", &token).is_err());
    }
}
