//! Financial screens, closed to leadership accounts

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Json, Response},
};

use crate::auth::AuthUser;
use crate::error::MandatoError;
use crate::financeiro::{
    Despesa, DespesaFilter, DespesaPayload, DespesaRegistry, Doacao, DoacaoFilter, DoacaoPayload,
    DoacaoRegistry, DoacoesPage, Doador, DoadorPayload, Lancamento, LancamentoFilter,
    LancamentoPayload, LancamentoRegistry, LancamentosPage,
};
use crate::listing::{ListParams, Page};
use crate::routes::{export_response, ExportParams};
use crate::state::AppState;

pub async fn list_lancamentos(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<ListParams>,
    Query(filter): Query<LancamentoFilter>,
) -> Result<Json<LancamentosPage>, MandatoError> {
    user.require_staff()?;
    let page = LancamentoRegistry::new(&state.database)
        .list(&filter, &params, &state.config.pagination)
        .await?;
    Ok(Json(page))
}

pub async fn export_lancamentos(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<ListParams>,
    Query(filter): Query<LancamentoFilter>,
    Query(export): Query<ExportParams>,
) -> Result<Response, MandatoError> {
    user.require_staff()?;
    let rows = LancamentoRegistry::new(&state.database)
        .search(&filter, params.query())
        .await?;
    export_response(&state, &user, "lancamentos", "Lançamentos", export.format(), &rows).await
}

pub async fn get_lancamento(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<Lancamento>, MandatoError> {
    user.require_staff()?;
    Ok(Json(LancamentoRegistry::new(&state.database).get(id).await?))
}

pub async fn create_lancamento(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<LancamentoPayload>,
) -> Result<(StatusCode, Json<Lancamento>), MandatoError> {
    user.require_staff()?;
    let lancamento = LancamentoRegistry::new(&state.database).create(user.id, payload).await?;
    Ok((StatusCode::CREATED, Json(lancamento)))
}

pub async fn update_lancamento(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(payload): Json<LancamentoPayload>,
) -> Result<Json<Lancamento>, MandatoError> {
    user.require_staff()?;
    Ok(Json(LancamentoRegistry::new(&state.database).update(user.id, id, payload).await?))
}

pub async fn delete_lancamento(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, MandatoError> {
    user.require_staff()?;
    LancamentoRegistry::new(&state.database).delete(user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_despesas(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<ListParams>,
    Query(filter): Query<DespesaFilter>,
) -> Result<Json<Page<Despesa>>, MandatoError> {
    user.require_staff()?;
    let page = DespesaRegistry::new(&state.database)
        .list(&filter, &params, &state.config.pagination)
        .await?;
    Ok(Json(page))
}

pub async fn export_despesas(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<ListParams>,
    Query(filter): Query<DespesaFilter>,
    Query(export): Query<ExportParams>,
) -> Result<Response, MandatoError> {
    user.require_staff()?;
    let rows = DespesaRegistry::new(&state.database)
        .search(&filter, params.query())
        .await?;
    export_response(&state, &user, "despesas", "Despesas", export.format(), &rows).await
}

pub async fn get_despesa(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<Despesa>, MandatoError> {
    user.require_staff()?;
    Ok(Json(DespesaRegistry::new(&state.database).get(id).await?))
}

pub async fn create_despesa(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<DespesaPayload>,
) -> Result<(StatusCode, Json<Despesa>), MandatoError> {
    user.require_staff()?;
    let despesa = DespesaRegistry::new(&state.database).create(user.id, payload).await?;
    Ok((StatusCode::CREATED, Json(despesa)))
}

pub async fn update_despesa(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(payload): Json<DespesaPayload>,
) -> Result<Json<Despesa>, MandatoError> {
    user.require_staff()?;
    Ok(Json(DespesaRegistry::new(&state.database).update(user.id, id, payload).await?))
}

pub async fn delete_despesa(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, MandatoError> {
    user.require_staff()?;
    DespesaRegistry::new(&state.database).delete(user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_doadores(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<ListParams>,
) -> Result<Json<Page<Doador>>, MandatoError> {
    user.require_staff()?;
    let page = DoacaoRegistry::new(&state.database)
        .list_doadores(&params, &state.config.pagination)
        .await?;
    Ok(Json(page))
}

pub async fn get_doador(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<Doador>, MandatoError> {
    user.require_staff()?;
    Ok(Json(DoacaoRegistry::new(&state.database).get_doador(id).await?))
}

pub async fn create_doador(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<DoadorPayload>,
) -> Result<(StatusCode, Json<Doador>), MandatoError> {
    user.require_staff()?;
    let doador = DoacaoRegistry::new(&state.database).create_doador(user.id, payload).await?;
    Ok((StatusCode::CREATED, Json(doador)))
}

pub async fn update_doador(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(payload): Json<DoadorPayload>,
) -> Result<Json<Doador>, MandatoError> {
    user.require_staff()?;
    Ok(Json(
        DoacaoRegistry::new(&state.database)
            .update_doador(user.id, id, payload)
            .await?,
    ))
}

pub async fn delete_doador(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, MandatoError> {
    user.require_staff()?;
    DoacaoRegistry::new(&state.database).delete_doador(user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_doacoes(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<ListParams>,
    Query(filter): Query<DoacaoFilter>,
) -> Result<Json<DoacoesPage>, MandatoError> {
    user.require_staff()?;
    let page = DoacaoRegistry::new(&state.database)
        .list(&filter, &params, &state.config.pagination)
        .await?;
    Ok(Json(page))
}

pub async fn export_doacoes(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<ListParams>,
    Query(filter): Query<DoacaoFilter>,
    Query(export): Query<ExportParams>,
) -> Result<Response, MandatoError> {
    user.require_staff()?;
    let rows = DoacaoRegistry::new(&state.database)
        .search(&filter, params.query())
        .await?;
    export_response(&state, &user, "doacoes", "Doações", export.format(), &rows).await
}

pub async fn get_doacao(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<Doacao>, MandatoError> {
    user.require_staff()?;
    Ok(Json(DoacaoRegistry::new(&state.database).get(id).await?))
}

pub async fn create_doacao(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<DoacaoPayload>,
) -> Result<(StatusCode, Json<Doacao>), MandatoError> {
    user.require_staff()?;
    let doacao = DoacaoRegistry::new(&state.database).create(user.id, payload).await?;
    Ok((StatusCode::CREATED, Json(doacao)))
}

pub async fn update_doacao(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(payload): Json<DoacaoPayload>,
) -> Result<Json<Doacao>, MandatoError> {
    user.require_staff()?;
    Ok(Json(DoacaoRegistry::new(&state.database).update(user.id, id, payload).await?))
}

pub async fn delete_doacao(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, MandatoError> {
    user.require_staff()?;
    DoacaoRegistry::new(&state.database).delete(user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
