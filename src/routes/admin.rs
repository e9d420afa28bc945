//! Administrator-only screens: settings and audit trail

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Json, Response},
};

use crate::audit::{AccessEntry, AccessFilter, AuditEntry, AuditFilter};
use crate::auth::AuthUser;
use crate::configuracoes::{Configuracao, ConfiguracaoPayload, ConfiguracaoRegistry};
use crate::error::MandatoError;
use crate::listing::Page;
use crate::routes::{export_response, ExportParams};
use crate::state::AppState;

pub async fn list_configuracoes(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<Configuracao>>, MandatoError> {
    user.require_admin()?;
    Ok(Json(ConfiguracaoRegistry::new(&state.database).list().await?))
}

pub async fn get_configuracao(
    State(state): State<AppState>,
    user: AuthUser,
    Path(chave): Path<String>,
) -> Result<Json<Configuracao>, MandatoError> {
    user.require_admin()?;
    Ok(Json(ConfiguracaoRegistry::new(&state.database).get(&chave).await?))
}

pub async fn upsert_configuracao(
    State(state): State<AppState>,
    user: AuthUser,
    Path(chave): Path<String>,
    Json(payload): Json<ConfiguracaoPayload>,
) -> Result<Json<Configuracao>, MandatoError> {
    user.require_admin()?;
    Ok(Json(
        ConfiguracaoRegistry::new(&state.database)
            .upsert(Some(user.id), &chave, &payload.valor)
            .await?,
    ))
}

pub async fn delete_configuracao(
    State(state): State<AppState>,
    user: AuthUser,
    Path(chave): Path<String>,
) -> Result<StatusCode, MandatoError> {
    user.require_admin()?;
    ConfiguracaoRegistry::new(&state.database).delete(user.id, &chave).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_auditoria(
    State(state): State<AppState>,
    user: AuthUser,
    Query(filter): Query<AuditFilter>,
) -> Result<Json<Page<AuditEntry>>, MandatoError> {
    user.require_admin()?;
    Ok(Json(state.audit.query(&filter, &state.config.pagination).await?))
}

pub async fn export_auditoria(
    State(state): State<AppState>,
    user: AuthUser,
    Query(filter): Query<AuditFilter>,
    Query(export): Query<ExportParams>,
) -> Result<Response, MandatoError> {
    user.require_admin()?;
    let rows = state.audit.query_all(&filter).await?;
    export_response(&state, &user, "auditoria", "Log de auditoria", export.format(), &rows).await
}

pub async fn get_auditoria(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<AuditEntry>, MandatoError> {
    user.require_admin()?;
    Ok(Json(state.audit.get(id).await?))
}

/// Every entry about one record, oldest first
pub async fn entity_history(
    State(state): State<AppState>,
    user: AuthUser,
    Path((entidade, id)): Path<(String, i64)>,
) -> Result<Json<Vec<AuditEntry>>, MandatoError> {
    user.require_admin()?;
    Ok(Json(state.audit.for_entity(&entidade, id).await?))
}

pub async fn list_acessos(
    State(state): State<AppState>,
    user: AuthUser,
    Query(filter): Query<AccessFilter>,
) -> Result<Json<Page<AccessEntry>>, MandatoError> {
    user.require_admin()?;
    Ok(Json(state.audit.query_access(&filter, &state.config.pagination).await?))
}

pub async fn export_acessos(
    State(state): State<AppState>,
    user: AuthUser,
    Query(filter): Query<AccessFilter>,
    Query(export): Query<ExportParams>,
) -> Result<Response, MandatoError> {
    user.require_admin()?;
    let rows = state.audit.query_access_all(&filter).await?;
    export_response(&state, &user, "acessos", "Log de acessos", export.format(), &rows).await
}
