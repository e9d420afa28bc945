use axum::{
    extract::{Path, Query, State},
    http::{header::USER_AGENT, HeaderMap, StatusCode},
    response::Json,
};

use crate::audit::AccessContext;
use crate::auth::{
    self, AlteraSenha, AtualizaUsuario, AuthUser, LoginRequest, LoginResponse, NovoUsuario,
    PerfilSessao, UserRegistry, Usuario, UsuarioFilter,
};
use crate::error::MandatoError;
use crate::listing::{ListParams, Page};
use crate::state::AppState;

/// Client address as reported by the reverse proxy
fn access_context(headers: &HeaderMap) -> AccessContext {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    AccessContext {
        ip: header("x-forwarded-for")
            .and_then(|v| v.split(',').next())
            .map(|v| v.trim().to_string())
            .or_else(|| header("x-real-ip").map(str::to_string)),
        user_agent: headers
            .get(USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    }
}

pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, MandatoError> {
    let context = access_context(&headers);
    let response = auth::login(&state.database, &state.config, &request, &context).await?;
    Ok(Json(response))
}

pub async fn me(user: AuthUser) -> Json<PerfilSessao> {
    Json(PerfilSessao::from(&user))
}

pub async fn change_own_password(
    State(state): State<AppState>,
    user: AuthUser,
    Json(dados): Json<AlteraSenha>,
) -> Result<StatusCode, MandatoError> {
    UserRegistry::new(&state.database)
        .change_password(user.id, user.perfil.is_admin(), user.id, dados)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_users(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<ListParams>,
    Query(filter): Query<UsuarioFilter>,
) -> Result<Json<Page<Usuario>>, MandatoError> {
    user.require_admin()?;
    let page = UserRegistry::new(&state.database)
        .list(&filter, &params, &state.config.pagination)
        .await?;
    Ok(Json(page))
}

pub async fn get_user(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<Usuario>, MandatoError> {
    user.require_admin()?;
    Ok(Json(UserRegistry::new(&state.database).get(id).await?))
}

pub async fn create_user(
    State(state): State<AppState>,
    user: AuthUser,
    Json(novo): Json<NovoUsuario>,
) -> Result<(StatusCode, Json<Usuario>), MandatoError> {
    user.require_admin()?;
    let usuario = UserRegistry::new(&state.database).create(Some(user.id), novo).await?;
    Ok((StatusCode::CREATED, Json(usuario)))
}

pub async fn update_user(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(dados): Json<AtualizaUsuario>,
) -> Result<Json<Usuario>, MandatoError> {
    user.require_admin()?;
    Ok(Json(UserRegistry::new(&state.database).update(user.id, id, dados).await?))
}

pub async fn change_user_password(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(dados): Json<AlteraSenha>,
) -> Result<StatusCode, MandatoError> {
    UserRegistry::new(&state.database)
        .change_password(user.id, user.perfil.is_admin(), id, dados)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_user(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, MandatoError> {
    user.require_admin()?;
    UserRegistry::new(&state.database).delete(user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_access_context_from_proxy_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("200.1.2.3, 10.0.0.1"));
        headers.insert(USER_AGENT, HeaderValue::from_static("Mozilla/5.0"));

        let context = access_context(&headers);
        assert_eq!(context.ip.as_deref(), Some("200.1.2.3"));
        assert_eq!(context.user_agent.as_deref(), Some("Mozilla/5.0"));

        let context = access_context(&HeaderMap::new());
        assert!(context.ip.is_none());
    }
}
