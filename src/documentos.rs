//! Document repository
//!
//! Uploads arrive as base64 inside a JSON body. The bytes are written under
//! `documents_dir` with a random UUID file name; the table keeps the
//! original name, content type, size and SHA-256 of the content.

use axum::http::HeaderValue;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use uuid::Uuid;

use crate::audit::AuditLogger;
use crate::config::PaginationConfig;
use crate::database::models::AcaoAuditoria;
use crate::database::Database;
use crate::error::MandatoError;
use crate::listing::{matches_query, matches_text, paginate, ListParams, Page, Searchable};
use crate::validation::{blank_to_none, FieldErrors, Validate};

/// Largest accepted file, after decoding
pub const MAX_DOCUMENT_BYTES: usize = 20 * 1024 * 1024;

const SELECT_DOCUMENTO: &str = r#"
    SELECT d.*, u.nome AS enviado_por_nome
    FROM documentos d
    LEFT JOIN usuarios u ON u.id = d.enviado_por
"#;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Documento {
    pub id: i64,
    pub titulo: String,
    pub categoria: String,
    pub descricao: Option<String>,
    pub nome_arquivo: String,
    pub tipo_conteudo: String,
    pub tamanho: i64,
    pub sha256: String,
    #[serde(skip_serializing)]
    pub caminho: String,
    pub enviado_por: Option<i64>,
    pub enviado_por_nome: Option<String>,
    pub criado_em: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DocumentoUpload {
    pub titulo: String,
    pub categoria: String,
    pub descricao: Option<String>,
    pub nome_arquivo: String,
    pub tipo_conteudo: Option<String>,
    /// Plain base64 or a `data:<type>;base64,` URL
    pub conteudo_base64: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentoMetadata {
    pub titulo: String,
    pub categoria: String,
    pub descricao: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DocumentoFilter {
    pub categoria: Option<String>,
}

impl Searchable for Documento {
    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![
            self.titulo.as_str(),
            self.categoria.as_str(),
            self.nome_arquivo.as_str(),
        ];
        fields.extend(self.descricao.as_deref());
        fields
    }
}

impl Validate for DocumentoMetadata {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.required("titulo", &self.titulo);
        errors.max_len("titulo", &self.titulo, 200);
        errors.required("categoria", &self.categoria);
        errors.into_result()
    }
}

impl Validate for DocumentoUpload {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.required("titulo", &self.titulo);
        errors.max_len("titulo", &self.titulo, 200);
        errors.required("categoria", &self.categoria);
        errors.required("nome_arquivo", &self.nome_arquivo);
        errors.required("conteudo_base64", &self.conteudo_base64);
        if let Some(tipo) = self.tipo_conteudo.as_deref().filter(|t| !t.trim().is_empty()) {
            check_content_type(&mut errors, tipo);
        }
        errors.into_result()
    }
}

/// The stored type is sent back as the `Content-Type` of every download
fn check_content_type(errors: &mut FieldErrors, tipo: &str) {
    if tipo.len() > 255 || HeaderValue::from_str(tipo.trim()).is_err() {
        errors.add("tipo_conteudo", "tipo de conteúdo inválido");
    }
}

/// Split an optional data URL prefix off the payload
fn split_data_url(conteudo: &str) -> (Option<&str>, &str) {
    let conteudo = conteudo.trim();
    if let Some(rest) = conteudo.strip_prefix("data:") {
        if let Some((meta, data)) = rest.split_once(',') {
            let tipo = meta.strip_suffix(";base64").unwrap_or(meta);
            return (Some(tipo).filter(|t| !t.is_empty()), data);
        }
    }
    (None, conteudo)
}

fn decode_content(conteudo: &str) -> Result<Vec<u8>, FieldErrors> {
    let cleaned: String = conteudo.chars().filter(|c| !c.is_whitespace()).collect();
    let mut errors = FieldErrors::new();

    match STANDARD.decode(cleaned.as_bytes()) {
        Ok(bytes) if bytes.is_empty() => errors.add("conteudo_base64", "arquivo vazio"),
        Ok(bytes) if bytes.len() > MAX_DOCUMENT_BYTES => errors.add(
            "conteudo_base64",
            format!("arquivo maior que {} MB", MAX_DOCUMENT_BYTES / (1024 * 1024)),
        ),
        Ok(bytes) => return Ok(bytes),
        Err(_) => errors.add("conteudo_base64", "conteúdo base64 inválido"),
    }
    Err(errors)
}

/// Keep only the final path component of a client-supplied file name
fn sanitize_file_name(name: &str) -> String {
    let base = name
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or(name)
        .trim();
    if base.is_empty() {
        "arquivo".to_string()
    } else {
        base.to_string()
    }
}

fn stored_name(original: &str) -> String {
    let ext = Path::new(original)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| e.len() <= 10 && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|e| format!(".{}", e.to_lowercase()))
        .unwrap_or_default();
    format!("{}{}", Uuid::new_v4(), ext)
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

#[derive(Clone)]
pub struct DocumentoRegistry {
    pool: SqlitePool,
    audit: AuditLogger,
    dir: PathBuf,
}

impl DocumentoRegistry {
    pub fn new(database: &Database, documents_dir: impl Into<PathBuf>) -> Self {
        Self {
            pool: database.pool().clone(),
            audit: AuditLogger::new(database.pool().clone()),
            dir: documents_dir.into(),
        }
    }

    pub async fn list(
        &self,
        filter: &DocumentoFilter,
        params: &ListParams,
        pagination: &PaginationConfig,
    ) -> Result<Page<Documento>, MandatoError> {
        let sql = format!("{} ORDER BY d.criado_em DESC, d.id DESC", SELECT_DOCUMENTO);
        let all = sqlx::query_as::<_, Documento>(&sql).fetch_all(&self.pool).await?;

        let rows: Vec<Documento> = all
            .into_iter()
            .filter(|d| matches_query(d, params.query()))
            .filter(|d| matches_text(Some(&d.categoria), filter.categoria.as_deref()))
            .collect();
        Ok(paginate(rows, params.page_request(pagination)))
    }

    pub async fn get(&self, id: i64) -> Result<Documento, MandatoError> {
        let sql = format!("{} WHERE d.id = ?", SELECT_DOCUMENTO);
        sqlx::query_as::<_, Documento>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| MandatoError::not_found("documento", id))
    }

    pub async fn upload(&self, actor: i64, upload: DocumentoUpload) -> Result<Documento, MandatoError> {
        upload.validate()?;
        let (data_url_type, encoded) = split_data_url(&upload.conteudo_base64);
        let bytes = decode_content(encoded)?;

        let nome_arquivo = sanitize_file_name(&upload.nome_arquivo);
        let tipo_conteudo = blank_to_none(upload.tipo_conteudo.clone())
            .or_else(|| data_url_type.map(str::to_string))
            .unwrap_or_else(|| "application/octet-stream".to_string());
        let mut errors = FieldErrors::new();
        check_content_type(&mut errors, &tipo_conteudo);
        errors.into_result()?;
        let sha256 = sha256_hex(&bytes);
        let caminho = stored_name(&nome_arquivo);

        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(&caminho);
        tokio::fs::write(&path, &bytes).await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO documentos (titulo, categoria, descricao, nome_arquivo, tipo_conteudo, tamanho,
                                    sha256, caminho, enviado_por, criado_em)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(upload.titulo.trim())
        .bind(upload.categoria.trim())
        .bind(blank_to_none(upload.descricao.clone()))
        .bind(&nome_arquivo)
        .bind(&tipo_conteudo)
        .bind(bytes.len() as i64)
        .bind(&sha256)
        .bind(&caminho)
        .bind(actor)
        .bind(Utc::now())
        .execute(&self.pool)
        .await;

        let id = match inserted {
            Ok(result) => result.last_insert_rowid(),
            Err(e) => {
                if let Err(io) = tokio::fs::remove_file(&path).await {
                    warn!("Could not remove orphan upload {}: {}", path.display(), io);
                }
                return Err(e.into());
            }
        };

        info!("Stored document {} ({} bytes) as {}", id, bytes.len(), caminho);

        self.audit
            .record(
                Some(actor),
                AcaoAuditoria::Criar,
                "documentos",
                Some(id),
                serde_json::json!({
                    "titulo": upload.titulo.trim(),
                    "nome_arquivo": nome_arquivo,
                    "tamanho": bytes.len(),
                    "sha256": sha256,
                }),
            )
            .await?;

        self.get(id).await
    }

    pub async fn update(&self, actor: i64, id: i64, metadata: DocumentoMetadata) -> Result<Documento, MandatoError> {
        metadata.validate()?;
        self.get(id).await?;

        sqlx::query("UPDATE documentos SET titulo = ?, categoria = ?, descricao = ? WHERE id = ?")
            .bind(metadata.titulo.trim())
            .bind(metadata.categoria.trim())
            .bind(blank_to_none(metadata.descricao.clone()))
            .bind(id)
            .execute(&self.pool)
            .await?;

        self.audit
            .record(Some(actor), AcaoAuditoria::Atualizar, "documentos", Some(id), serde_json::to_value(&metadata)?)
            .await?;

        self.get(id).await
    }

    /// Metadata plus the stored bytes
    pub async fn download(&self, id: i64) -> Result<(Documento, Vec<u8>), MandatoError> {
        let documento = self.get(id).await?;
        let path = self.dir.join(&documento.caminho);

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(MandatoError::NotFound(format!(
                    "arquivo do documento {} ausente",
                    id
                )))
            }
            Err(e) => return Err(e.into()),
        };

        if sha256_hex(&bytes) != documento.sha256 {
            warn!("Document {} content does not match its recorded SHA-256", id);
        }

        Ok((documento, bytes))
    }

    /// Removes the row and then the stored file
    pub async fn delete(&self, actor: i64, id: i64) -> Result<(), MandatoError> {
        let documento = self.get(id).await?;

        sqlx::query("DELETE FROM documentos WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        let path = self.dir.join(&documento.caminho);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Document {} file {} was already gone", id, path.display());
            }
            Err(e) => return Err(e.into()),
        }

        self.audit
            .record(
                Some(actor),
                AcaoAuditoria::Excluir,
                "documentos",
                Some(id),
                serde_json::json!({ "titulo": documento.titulo, "nome_arquivo": documento.nome_arquivo }),
            )
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_url_prefix() {
        let (tipo, data) = split_data_url("data:application/pdf;base64,JVBERi0=");
        assert_eq!(tipo, Some("application/pdf"));
        assert_eq!(data, "JVBERi0=");

        let (tipo, data) = split_data_url("  aGVsbG8=  ");
        assert_eq!(tipo, None);
        assert_eq!(data, "aGVsbG8=");
    }

    #[test]
    fn test_decode_rejects_empty_and_invalid() {
        assert_eq!(decode_content("aGVs\nbG8=").unwrap(), b"hello");
        assert!(decode_content("").unwrap_err().has("conteudo_base64"));
        assert!(decode_content("@@@").unwrap_err().has("conteudo_base64"));
    }

    #[test]
    fn test_content_type_must_fit_a_header() {
        let upload = |tipo: &str| DocumentoUpload {
            titulo: "Ofício".to_string(),
            categoria: "Ofícios".to_string(),
            descricao: None,
            nome_arquivo: "oficio.pdf".to_string(),
            tipo_conteudo: Some(tipo.to_string()),
            conteudo_base64: "JVBERi0=".to_string(),
        };

        assert!(upload("application/pdf").validate().is_ok());
        assert!(upload("  ").validate().is_ok());
        assert!(upload("a\nb").validate().unwrap_err().has("tipo_conteudo"));
        assert!(upload("text/plain\u{7f}").validate().is_err());
    }

    #[test]
    fn test_file_names() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\docs\\ofício.pdf"), "ofício.pdf");
        assert!(stored_name("Ofício.PDF").ends_with(".pdf"));
        assert!(!stored_name("sem_extensao").contains('.'));
    }

    #[test]
    fn test_sha256_hex() {
        assert_eq!(
            sha256_hex(b"hello"),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }
}
