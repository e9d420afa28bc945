use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Json, Response},
};

use crate::auth::AuthUser;
use crate::documentos::{Documento, DocumentoFilter, DocumentoMetadata, DocumentoRegistry, DocumentoUpload};
use crate::error::MandatoError;
use crate::export::ExportFile;
use crate::listing::{ListParams, Page};
use crate::routes::attachment;
use crate::state::AppState;

fn registry(state: &AppState) -> DocumentoRegistry {
    DocumentoRegistry::new(&state.database, &state.config.documents_dir)
}

pub async fn list_documentos(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(params): Query<ListParams>,
    Query(filter): Query<DocumentoFilter>,
) -> Result<Json<Page<Documento>>, MandatoError> {
    let page = registry(&state)
        .list(&filter, &params, &state.config.pagination)
        .await?;
    Ok(Json(page))
}

pub async fn get_documento(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<Documento>, MandatoError> {
    Ok(Json(registry(&state).get(id).await?))
}

pub async fn upload_documento(
    State(state): State<AppState>,
    user: AuthUser,
    Json(upload): Json<DocumentoUpload>,
) -> Result<(StatusCode, Json<Documento>), MandatoError> {
    let documento = registry(&state).upload(user.id, upload).await?;
    Ok((StatusCode::CREATED, Json(documento)))
}

pub async fn update_documento(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(metadata): Json<DocumentoMetadata>,
) -> Result<Json<Documento>, MandatoError> {
    Ok(Json(registry(&state).update(user.id, id, metadata).await?))
}

/// Stored bytes under the original file name
pub async fn download_documento(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Response, MandatoError> {
    let (documento, bytes) = registry(&state).download(id).await?;
    let content_type = match documento.tipo_conteudo.as_str() {
        "" => "application/octet-stream".to_string(),
        other => other.to_string(),
    };

    Ok(attachment(ExportFile {
        file_name: documento.nome_arquivo,
        content_type,
        bytes,
    }))
}

pub async fn delete_documento(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, MandatoError> {
    user.require_staff()?;
    registry(&state).delete(user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
