//! HTTP API
//!
//! Every screen of the office system maps to a JSON endpoint under `/api`.
//! Handlers authenticate through [`AuthUser`], call into the domain
//! registries and let [`MandatoError`] render failures.

pub mod admin;
pub mod atendimento;
pub mod auth;
pub mod cadastros;
pub mod comunicacao;
pub mod documentos;
pub mod financeiro;
pub mod orcamento;

use axum::{
    extract::{DefaultBodyLimit, State},
    http::header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    response::{IntoResponse, Json, Response},
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use serde_json::Value;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::auth::AuthUser;
use crate::database::models::AcaoAuditoria;
use crate::documentos::MAX_DOCUMENT_BYTES;
use crate::error::MandatoError;
use crate::export::{self, ExportFile, ExportFormat, Exportable};
use crate::state::AppState;

/// `?format=csv|pdf`, CSV when omitted
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExportParams {
    pub format: Option<ExportFormat>,
}

impl ExportParams {
    pub fn format(&self) -> ExportFormat {
        self.format.unwrap_or(ExportFormat::Csv)
    }
}

pub fn build_router(state: AppState) -> Router {
    // base64 inflates uploads by a third
    let upload_limit = DefaultBodyLimit::max(MAX_DOCUMENT_BYTES / 3 * 4 + 64 * 1024);

    Router::new()
        .route("/health", get(health_check))
        .route("/status", get(status_endpoint))
        // session
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/me", get(auth::me))
        .route("/api/auth/senha", put(auth::change_own_password))
        // users
        .route("/api/usuarios", get(auth::list_users).post(auth::create_user))
        .route(
            "/api/usuarios/:id",
            get(auth::get_user).put(auth::update_user).delete(auth::delete_user),
        )
        .route("/api/usuarios/:id/senha", put(auth::change_user_password))
        // people
        .route("/api/eleitores", get(cadastros::list_eleitores).post(cadastros::create_eleitor))
        .route("/api/eleitores/export", get(cadastros::export_eleitores))
        .route(
            "/api/eleitores/:id",
            get(cadastros::get_eleitor)
                .put(cadastros::update_eleitor)
                .delete(cadastros::delete_eleitor),
        )
        .route("/api/liderancas", get(cadastros::list_liderancas).post(cadastros::create_lideranca))
        .route("/api/liderancas/export", get(cadastros::export_liderancas))
        .route(
            "/api/liderancas/:id",
            get(cadastros::get_lideranca)
                .put(cadastros::update_lideranca)
                .delete(cadastros::delete_lideranca),
        )
        .route("/api/liderancas/:id/eleitores", get(cadastros::lideranca_eleitores))
        .route(
            "/api/funcionarios",
            get(cadastros::list_funcionarios).post(cadastros::create_funcionario),
        )
        .route("/api/funcionarios/export", get(cadastros::export_funcionarios))
        .route(
            "/api/funcionarios/:id",
            get(cadastros::get_funcionario)
                .put(cadastros::update_funcionario)
                .delete(cadastros::delete_funcionario),
        )
        // service desk
        .route(
            "/api/atendimentos",
            get(atendimento::list_atendimentos).post(atendimento::create_atendimento),
        )
        .route(
            "/api/atendimentos/:id",
            get(atendimento::get_atendimento)
                .put(atendimento::update_atendimento)
                .delete(atendimento::delete_atendimento),
        )
        .route("/api/agenda", get(atendimento::list_eventos).post(atendimento::create_evento))
        .route("/api/agenda/export", get(atendimento::export_eventos))
        .route(
            "/api/agenda/:id",
            get(atendimento::get_evento)
                .put(atendimento::update_evento)
                .delete(atendimento::delete_evento),
        )
        .route(
            "/api/solicitacoes",
            get(atendimento::list_solicitacoes).post(atendimento::create_solicitacao),
        )
        .route("/api/solicitacoes/export", get(atendimento::export_solicitacoes))
        .route("/api/solicitacoes/resumo", get(atendimento::resumo_solicitacoes))
        .route(
            "/api/solicitacoes/:id",
            get(atendimento::get_solicitacao)
                .put(atendimento::update_solicitacao)
                .delete(atendimento::delete_solicitacao),
        )
        .route("/api/solicitacoes/:id/status", put(atendimento::change_status))
        .route("/api/solicitacoes/:id/historico", get(atendimento::historico))
        // budget amendments
        .route("/api/emendas", get(orcamento::list_emendas).post(orcamento::create_emenda))
        .route("/api/emendas/export", get(orcamento::export_emendas))
        .route(
            "/api/emendas/:id",
            get(orcamento::get_emenda)
                .put(orcamento::update_emenda)
                .delete(orcamento::delete_emenda),
        )
        .route(
            "/api/emendas/:id/repasses",
            get(orcamento::list_repasses).post(orcamento::create_repasse),
        )
        .route(
            "/api/emendas/:id/repasses/:repasse_id",
            axum::routing::delete(orcamento::delete_repasse),
        )
        // finances
        .route(
            "/api/financeiro/lancamentos",
            get(financeiro::list_lancamentos).post(financeiro::create_lancamento),
        )
        .route("/api/financeiro/lancamentos/export", get(financeiro::export_lancamentos))
        .route(
            "/api/financeiro/lancamentos/:id",
            get(financeiro::get_lancamento)
                .put(financeiro::update_lancamento)
                .delete(financeiro::delete_lancamento),
        )
        .route(
            "/api/financeiro/despesas",
            get(financeiro::list_despesas).post(financeiro::create_despesa),
        )
        .route("/api/financeiro/despesas/export", get(financeiro::export_despesas))
        .route(
            "/api/financeiro/despesas/:id",
            get(financeiro::get_despesa)
                .put(financeiro::update_despesa)
                .delete(financeiro::delete_despesa),
        )
        .route(
            "/api/financeiro/doadores",
            get(financeiro::list_doadores).post(financeiro::create_doador),
        )
        .route(
            "/api/financeiro/doadores/:id",
            get(financeiro::get_doador)
                .put(financeiro::update_doador)
                .delete(financeiro::delete_doador),
        )
        .route(
            "/api/financeiro/doacoes",
            get(financeiro::list_doacoes).post(financeiro::create_doacao),
        )
        .route("/api/financeiro/doacoes/export", get(financeiro::export_doacoes))
        .route(
            "/api/financeiro/doacoes/:id",
            get(financeiro::get_doacao)
                .put(financeiro::update_doacao)
                .delete(financeiro::delete_doacao),
        )
        // documents
        .route(
            "/api/documentos",
            get(documentos::list_documentos)
                .post(documentos::upload_documento)
                .layer(upload_limit),
        )
        .route(
            "/api/documentos/:id",
            get(documentos::get_documento)
                .put(documentos::update_documento)
                .delete(documentos::delete_documento),
        )
        .route("/api/documentos/:id/download", get(documentos::download_documento))
        // messaging
        .route("/api/aniversariantes", get(comunicacao::list_aniversariantes))
        .route("/api/aniversariantes/felicitacoes", post(comunicacao::enviar_felicitacoes))
        .route(
            "/api/comunicacao/disparos",
            get(comunicacao::list_disparos).post(comunicacao::create_disparo),
        )
        .route("/api/comunicacao/disparos/:id", get(comunicacao::get_disparo))
        .route("/api/comunicacao/disparos/:id/mensagens", get(comunicacao::disparo_mensagens))
        .route("/api/comunicacao/mensagens", post(comunicacao::enviar_mensagem))
        .route("/api/comunicacao/mensagens/recebidas", post(comunicacao::registrar_recebida))
        .route("/api/comunicacao/contatos", get(comunicacao::list_contatos))
        .route("/api/comunicacao/contatos/:contato", get(comunicacao::conversa))
        // administration
        .route("/api/configuracoes", get(admin::list_configuracoes))
        .route(
            "/api/configuracoes/:chave",
            get(admin::get_configuracao)
                .put(admin::upsert_configuracao)
                .delete(admin::delete_configuracao),
        )
        .route("/api/auditoria", get(admin::list_auditoria))
        .route("/api/auditoria/export", get(admin::export_auditoria))
        .route("/api/auditoria/acessos", get(admin::list_acessos))
        .route("/api/auditoria/acessos/export", get(admin::export_acessos))
        .route("/api/auditoria/entidade/:entidade/:id", get(admin::entity_history))
        .route("/api/auditoria/:id", get(admin::get_auditoria))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).into_inner())
        .with_state(state)
}

async fn health_check() -> Json<Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "mandato-pro",
        "timestamp": chrono::Utc::now()
    }))
}

async fn status_endpoint(State(state): State<AppState>) -> Json<Value> {
    let mut status = serde_json::json!({
        "status": "healthy",
        "service": "mandato-pro",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now(),
        "messaging_gateway": state.gateway.name(),
    });

    match state.database.table_counts().await {
        Ok(counts) => {
            let tables: serde_json::Map<String, Value> =
                counts.into_iter().map(|(t, c)| (t, Value::from(c))).collect();
            status["database"] = serde_json::json!({ "status": "healthy", "tables": tables });
        }
        Err(e) => {
            tracing::error!("Status check failed to query database: {}", e);
            status["status"] = Value::from("degraded");
            status["database"] = serde_json::json!({ "status": "error" });
        }
    }

    Json(status)
}

/// Render rows as a download and note the export in the audit log
pub(crate) async fn export_response<T: Exportable>(
    state: &AppState,
    user: &AuthUser,
    entidade: &str,
    title: &str,
    format: ExportFormat,
    rows: &[T],
) -> Result<Response, MandatoError> {
    let file = export::render(format, title, entidade, rows)?;

    state
        .audit
        .record(
            Some(user.id),
            AcaoAuditoria::Exportar,
            entidade,
            None,
            serde_json::json!({ "formato": format.as_str(), "linhas": rows.len() }),
        )
        .await?;

    Ok(attachment(file))
}

pub(crate) fn attachment(file: ExportFile) -> Response {
    (
        [
            (CONTENT_TYPE, file.content_type),
            (CONTENT_DISPOSITION, content_disposition(&file.file_name)),
        ],
        file.bytes,
    )
        .into_response()
}

/// `attachment` header with an ASCII fallback name and the UTF-8 original
pub(crate) fn content_disposition(file_name: &str) -> String {
    let fallback: String = file_name
        .chars()
        .map(|c| {
            if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect();

    let mut encoded = String::with_capacity(file_name.len() * 3);
    for byte in file_name.bytes() {
        if byte.is_ascii_alphanumeric() || b"-._~".contains(&byte) {
            encoded.push(byte as char);
        } else {
            encoded.push_str(&format!("%{:02X}", byte));
        }
    }

    format!("attachment; filename=\"{}\"; filename*=UTF-8''{}", fallback, encoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_disposition_ascii() {
        assert_eq!(
            content_disposition("eleitores.csv"),
            "attachment; filename=\"eleitores.csv\"; filename*=UTF-8''eleitores.csv"
        );
    }

    #[test]
    fn test_content_disposition_non_ascii() {
        let header = content_disposition("ofício nº 1.pdf");
        assert!(header.starts_with("attachment; filename=\"of_cio n_ 1.pdf\""));
        assert!(header.ends_with("filename*=UTF-8''of%C3%ADcio%20n%C2%BA%201.pdf"));
    }
}
