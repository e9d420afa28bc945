use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Json, Response},
};

use crate::auth::AuthUser;
use crate::error::MandatoError;
use crate::listing::{ListParams, Page};
use crate::orcamento::{
    Emenda, EmendaDetalhe, EmendaFilter, EmendaPayload, EmendaRegistry, Repasse, RepassePayload,
};
use crate::routes::{export_response, ExportParams};
use crate::state::AppState;

pub async fn list_emendas(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(params): Query<ListParams>,
    Query(filter): Query<EmendaFilter>,
) -> Result<Json<Page<Emenda>>, MandatoError> {
    let page = EmendaRegistry::new(&state.database)
        .list(&filter, &params, &state.config.pagination)
        .await?;
    Ok(Json(page))
}

pub async fn export_emendas(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<ListParams>,
    Query(filter): Query<EmendaFilter>,
    Query(export): Query<ExportParams>,
) -> Result<Response, MandatoError> {
    let rows = EmendaRegistry::new(&state.database)
        .search(&filter, params.query())
        .await?;
    export_response(&state, &user, "emendas", "Emendas parlamentares", export.format(), &rows).await
}

/// Amendment with its transfers and remaining balance
pub async fn get_emenda(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<EmendaDetalhe>, MandatoError> {
    Ok(Json(EmendaRegistry::new(&state.database).detalhe(id).await?))
}

pub async fn create_emenda(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<EmendaPayload>,
) -> Result<(StatusCode, Json<Emenda>), MandatoError> {
    let emenda = EmendaRegistry::new(&state.database).create(user.id, payload).await?;
    Ok((StatusCode::CREATED, Json(emenda)))
}

pub async fn update_emenda(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(payload): Json<EmendaPayload>,
) -> Result<Json<Emenda>, MandatoError> {
    Ok(Json(EmendaRegistry::new(&state.database).update(user.id, id, payload).await?))
}

pub async fn delete_emenda(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, MandatoError> {
    user.require_staff()?;
    EmendaRegistry::new(&state.database).delete(user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_repasses(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<Vec<Repasse>>, MandatoError> {
    Ok(Json(EmendaRegistry::new(&state.database).repasses(id).await?))
}

pub async fn create_repasse(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(payload): Json<RepassePayload>,
) -> Result<(StatusCode, Json<Repasse>), MandatoError> {
    let repasse = EmendaRegistry::new(&state.database)
        .add_repasse(user.id, id, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(repasse)))
}

pub async fn delete_repasse(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, repasse_id)): Path<(i64, i64)>,
) -> Result<StatusCode, MandatoError> {
    user.require_staff()?;
    EmendaRegistry::new(&state.database)
        .delete_repasse(user.id, id, repasse_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
