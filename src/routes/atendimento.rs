//! Service desk handlers

use std::collections::BTreeMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Json, Response},
};

use crate::atendimento::{
    AgendaRegistry, Atendimento, AtendimentoFilter, AtendimentoPayload, AtendimentoRegistry,
    Evento, EventoFilter, EventoPayload, HistoricoSolicitacao, MudancaStatus, Solicitacao,
    SolicitacaoFilter, SolicitacaoPayload, SolicitacaoRegistry,
};
use crate::auth::AuthUser;
use crate::error::MandatoError;
use crate::listing::{ListParams, Page};
use crate::routes::{export_response, ExportParams};
use crate::state::AppState;

pub async fn list_atendimentos(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(params): Query<ListParams>,
    Query(filter): Query<AtendimentoFilter>,
) -> Result<Json<Page<Atendimento>>, MandatoError> {
    let page = AtendimentoRegistry::new(&state.database)
        .list(&filter, &params, &state.config.pagination)
        .await?;
    Ok(Json(page))
}

pub async fn get_atendimento(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<Atendimento>, MandatoError> {
    Ok(Json(AtendimentoRegistry::new(&state.database).get(id).await?))
}

pub async fn create_atendimento(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<AtendimentoPayload>,
) -> Result<(StatusCode, Json<Atendimento>), MandatoError> {
    let atendimento = AtendimentoRegistry::new(&state.database).create(user.id, payload).await?;
    Ok((StatusCode::CREATED, Json(atendimento)))
}

pub async fn update_atendimento(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(payload): Json<AtendimentoPayload>,
) -> Result<Json<Atendimento>, MandatoError> {
    Ok(Json(AtendimentoRegistry::new(&state.database).update(user.id, id, payload).await?))
}

pub async fn delete_atendimento(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, MandatoError> {
    user.require_staff()?;
    AtendimentoRegistry::new(&state.database).delete(user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_eventos(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(params): Query<ListParams>,
    Query(filter): Query<EventoFilter>,
) -> Result<Json<Page<Evento>>, MandatoError> {
    let page = AgendaRegistry::new(&state.database)
        .list(&filter, &params, &state.config.pagination)
        .await?;
    Ok(Json(page))
}

pub async fn export_eventos(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<ListParams>,
    Query(filter): Query<EventoFilter>,
    Query(export): Query<ExportParams>,
) -> Result<Response, MandatoError> {
    let rows = AgendaRegistry::new(&state.database)
        .search(&filter, params.query())
        .await?;
    export_response(&state, &user, "agenda", "Agenda", export.format(), &rows).await
}

pub async fn get_evento(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<Evento>, MandatoError> {
    Ok(Json(AgendaRegistry::new(&state.database).get(id).await?))
}

pub async fn create_evento(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<EventoPayload>,
) -> Result<(StatusCode, Json<Evento>), MandatoError> {
    let evento = AgendaRegistry::new(&state.database).create(user.id, payload).await?;
    Ok((StatusCode::CREATED, Json(evento)))
}

pub async fn update_evento(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(payload): Json<EventoPayload>,
) -> Result<Json<Evento>, MandatoError> {
    Ok(Json(AgendaRegistry::new(&state.database).update(user.id, id, payload).await?))
}

pub async fn delete_evento(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, MandatoError> {
    user.require_staff()?;
    AgendaRegistry::new(&state.database).delete(user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_solicitacoes(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(params): Query<ListParams>,
    Query(filter): Query<SolicitacaoFilter>,
) -> Result<Json<Page<Solicitacao>>, MandatoError> {
    let page = SolicitacaoRegistry::new(&state.database)
        .list(&filter, &params, &state.config.pagination)
        .await?;
    Ok(Json(page))
}

pub async fn export_solicitacoes(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<ListParams>,
    Query(filter): Query<SolicitacaoFilter>,
    Query(export): Query<ExportParams>,
) -> Result<Response, MandatoError> {
    let rows = SolicitacaoRegistry::new(&state.database)
        .search(&filter, params.query())
        .await?;
    export_response(&state, &user, "solicitacoes", "Solicitações", export.format(), &rows).await
}

/// Request counts per status for the kanban header
pub async fn resumo_solicitacoes(
    State(state): State<AppState>,
    _user: AuthUser,
) -> Result<Json<BTreeMap<String, i64>>, MandatoError> {
    Ok(Json(SolicitacaoRegistry::new(&state.database).count_by_status().await?))
}

pub async fn get_solicitacao(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<Solicitacao>, MandatoError> {
    Ok(Json(SolicitacaoRegistry::new(&state.database).get(id).await?))
}

pub async fn create_solicitacao(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<SolicitacaoPayload>,
) -> Result<(StatusCode, Json<Solicitacao>), MandatoError> {
    let solicitacao = SolicitacaoRegistry::new(&state.database).create(user.id, payload).await?;
    Ok((StatusCode::CREATED, Json(solicitacao)))
}

pub async fn update_solicitacao(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(payload): Json<SolicitacaoPayload>,
) -> Result<Json<Solicitacao>, MandatoError> {
    Ok(Json(SolicitacaoRegistry::new(&state.database).update(user.id, id, payload).await?))
}

pub async fn change_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(mudanca): Json<MudancaStatus>,
) -> Result<Json<Solicitacao>, MandatoError> {
    Ok(Json(
        SolicitacaoRegistry::new(&state.database)
            .change_status(user.id, id, mudanca)
            .await?,
    ))
}

pub async fn historico(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<Vec<HistoricoSolicitacao>>, MandatoError> {
    Ok(Json(SolicitacaoRegistry::new(&state.database).historico(id).await?))
}

pub async fn delete_solicitacao(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, MandatoError> {
    user.require_staff()?;
    SolicitacaoRegistry::new(&state.database).delete(user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
