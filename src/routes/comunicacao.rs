//! Birthdays, bulk dispatch and one-to-one messages

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};

use crate::auth::AuthUser;
use crate::comunicacao::{
    Aniversariante, AniversarianteQuery, AniversarianteRegistry, Contato, Disparo, DisparoRequest,
    DisparoResultado, Dispatcher, FelicitacaoRequest, Mensagem, MensagemPayload, MensagemRegistry,
};
use crate::error::MandatoError;
use crate::listing::{ListParams, Page};
use crate::state::AppState;

fn dispatcher(state: &AppState) -> Dispatcher {
    Dispatcher::new(&state.database, state.gateway.clone())
}

fn mensagens(state: &AppState) -> MensagemRegistry {
    MensagemRegistry::new(&state.database, state.gateway.clone())
}

pub async fn list_aniversariantes(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(query): Query<AniversarianteQuery>,
) -> Result<Json<Vec<Aniversariante>>, MandatoError> {
    let periodo = query.periodo()?;
    Ok(Json(AniversarianteRegistry::new(&state.database).list(periodo).await?))
}

pub async fn enviar_felicitacoes(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<FelicitacaoRequest>,
) -> Result<Json<DisparoResultado>, MandatoError> {
    user.require_staff()?;
    Ok(Json(dispatcher(&state).enviar_felicitacoes(user.id, request).await?))
}

pub async fn list_disparos(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(params): Query<ListParams>,
) -> Result<Json<Page<Disparo>>, MandatoError> {
    let page = dispatcher(&state)
        .historico(&params, &state.config.pagination)
        .await?;
    Ok(Json(page))
}

pub async fn create_disparo(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<DisparoRequest>,
) -> Result<(StatusCode, Json<DisparoResultado>), MandatoError> {
    user.require_staff()?;
    let resultado = dispatcher(&state).disparar(user.id, request).await?;
    Ok((StatusCode::CREATED, Json(resultado)))
}

pub async fn get_disparo(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<Disparo>, MandatoError> {
    Ok(Json(dispatcher(&state).get(id).await?))
}

pub async fn disparo_mensagens(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<Vec<Mensagem>>, MandatoError> {
    Ok(Json(dispatcher(&state).mensagens(id).await?))
}

pub async fn enviar_mensagem(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<MensagemPayload>,
) -> Result<(StatusCode, Json<Mensagem>), MandatoError> {
    let mensagem = mensagens(&state).enviar(user.id, payload).await?;
    Ok((StatusCode::CREATED, Json(mensagem)))
}

/// Stores a reply typed in from an external conversation
pub async fn registrar_recebida(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<MensagemPayload>,
) -> Result<(StatusCode, Json<Mensagem>), MandatoError> {
    let mensagem = mensagens(&state).registrar_recebida(user.id, payload).await?;
    Ok((StatusCode::CREATED, Json(mensagem)))
}

pub async fn list_contatos(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(params): Query<ListParams>,
) -> Result<Json<Page<Contato>>, MandatoError> {
    let page = mensagens(&state)
        .contatos(&params, &state.config.pagination)
        .await?;
    Ok(Json(page))
}

pub async fn conversa(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(contato): Path<String>,
) -> Result<Json<Vec<Mensagem>>, MandatoError> {
    Ok(Json(mensagens(&state).conversa(&contato).await?))
}
