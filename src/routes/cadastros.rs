//! Voters, community leaders and office staff

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Json, Response},
};

use crate::auth::AuthUser;
use crate::cadastros::{
    Eleitor, EleitorFilter, EleitorPayload, EleitorRegistry, Funcionario, FuncionarioFilter,
    FuncionarioPayload, FuncionarioRegistry, Lideranca, LiderancaFilter, LiderancaPayload,
    LiderancaRegistry,
};
use crate::error::MandatoError;
use crate::listing::{ListParams, Page};
use crate::routes::{export_response, ExportParams};
use crate::state::AppState;

pub async fn list_eleitores(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(params): Query<ListParams>,
    Query(filter): Query<EleitorFilter>,
) -> Result<Json<Page<Eleitor>>, MandatoError> {
    let page = EleitorRegistry::new(&state.database)
        .list(&filter, &params, &state.config.pagination)
        .await?;
    Ok(Json(page))
}

pub async fn export_eleitores(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<ListParams>,
    Query(filter): Query<EleitorFilter>,
    Query(export): Query<ExportParams>,
) -> Result<Response, MandatoError> {
    let rows = EleitorRegistry::new(&state.database)
        .search(&filter, params.query())
        .await?;
    export_response(&state, &user, "eleitores", "Eleitores", export.format(), &rows).await
}

pub async fn get_eleitor(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<Eleitor>, MandatoError> {
    Ok(Json(EleitorRegistry::new(&state.database).get(id).await?))
}

pub async fn create_eleitor(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<EleitorPayload>,
) -> Result<(StatusCode, Json<Eleitor>), MandatoError> {
    let eleitor = EleitorRegistry::new(&state.database).create(user.id, payload).await?;
    Ok((StatusCode::CREATED, Json(eleitor)))
}

pub async fn update_eleitor(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(payload): Json<EleitorPayload>,
) -> Result<Json<Eleitor>, MandatoError> {
    Ok(Json(EleitorRegistry::new(&state.database).update(user.id, id, payload).await?))
}

pub async fn delete_eleitor(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, MandatoError> {
    user.require_staff()?;
    EleitorRegistry::new(&state.database).delete(user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_liderancas(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(params): Query<ListParams>,
    Query(filter): Query<LiderancaFilter>,
) -> Result<Json<Page<Lideranca>>, MandatoError> {
    let page = LiderancaRegistry::new(&state.database)
        .list(&filter, &params, &state.config.pagination)
        .await?;
    Ok(Json(page))
}

pub async fn export_liderancas(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<ListParams>,
    Query(filter): Query<LiderancaFilter>,
    Query(export): Query<ExportParams>,
) -> Result<Response, MandatoError> {
    let rows = LiderancaRegistry::new(&state.database)
        .search(&filter, params.query())
        .await?;
    export_response(&state, &user, "liderancas", "Lideranças", export.format(), &rows).await
}

pub async fn get_lideranca(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<Lideranca>, MandatoError> {
    Ok(Json(LiderancaRegistry::new(&state.database).get(id).await?))
}

/// Voters linked to one leader
pub async fn lideranca_eleitores(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i64>,
    Query(params): Query<ListParams>,
) -> Result<Json<Page<Eleitor>>, MandatoError> {
    let page = LiderancaRegistry::new(&state.database)
        .eleitores(id, &params, &state.config.pagination)
        .await?;
    Ok(Json(page))
}

pub async fn create_lideranca(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<LiderancaPayload>,
) -> Result<(StatusCode, Json<Lideranca>), MandatoError> {
    let lideranca = LiderancaRegistry::new(&state.database).create(user.id, payload).await?;
    Ok((StatusCode::CREATED, Json(lideranca)))
}

pub async fn update_lideranca(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(payload): Json<LiderancaPayload>,
) -> Result<Json<Lideranca>, MandatoError> {
    Ok(Json(LiderancaRegistry::new(&state.database).update(user.id, id, payload).await?))
}

pub async fn delete_lideranca(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, MandatoError> {
    user.require_staff()?;
    LiderancaRegistry::new(&state.database).delete(user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_funcionarios(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(params): Query<ListParams>,
    Query(filter): Query<FuncionarioFilter>,
) -> Result<Json<Page<Funcionario>>, MandatoError> {
    let page = FuncionarioRegistry::new(&state.database)
        .list(&filter, &params, &state.config.pagination)
        .await?;
    Ok(Json(page))
}

pub async fn export_funcionarios(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<ListParams>,
    Query(filter): Query<FuncionarioFilter>,
    Query(export): Query<ExportParams>,
) -> Result<Response, MandatoError> {
    let rows = FuncionarioRegistry::new(&state.database)
        .search(&filter, params.query())
        .await?;
    export_response(&state, &user, "funcionarios", "Funcionários", export.format(), &rows).await
}

pub async fn get_funcionario(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<Funcionario>, MandatoError> {
    Ok(Json(FuncionarioRegistry::new(&state.database).get(id).await?))
}

pub async fn create_funcionario(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<FuncionarioPayload>,
) -> Result<(StatusCode, Json<Funcionario>), MandatoError> {
    user.require_staff()?;
    let funcionario = FuncionarioRegistry::new(&state.database).create(user.id, payload).await?;
    Ok((StatusCode::CREATED, Json(funcionario)))
}

pub async fn update_funcionario(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(payload): Json<FuncionarioPayload>,
) -> Result<Json<Funcionario>, MandatoError> {
    user.require_staff()?;
    Ok(Json(FuncionarioRegistry::new(&state.database).update(user.id, id, payload).await?))
}

pub async fn delete_funcionario(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, MandatoError> {
    user.require_staff()?;
    FuncionarioRegistry::new(&state.database).delete(user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
