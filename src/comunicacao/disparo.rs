//! Mass dispatch (disparo) of one message to a recipient group.
//!
//! Sends go out one at a time, once per recipient and channel, with no
//! retry. A recipient lacking a contact for a channel counts as a failure
//! for that channel. Delivered messages are stored individually and the
//! dispatch keeps its totals.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::audit::AuditLogger;
use crate::comunicacao::aniversariantes::{
    Aniversariante, AniversarianteRegistry, FelicitacaoRequest, Periodo,
};
use crate::comunicacao::gateway::Gateway;
use crate::comunicacao::mensagens::{insert_mensagem, Mensagem, NovaMensagem};
use crate::config::PaginationConfig;
use crate::configuracoes::{ConfiguracaoRegistry, DEFAULT_MENSAGEM_ANIVERSARIO, MENSAGEM_ANIVERSARIO};
use crate::database::models::{AcaoAuditoria, Canal, Direcao, TipoDestinatario};
use crate::database::Database;
use crate::error::MandatoError;
use crate::listing::{matches_query, paginate, ListParams, Page, Searchable};
use crate::validation::{FieldErrors, Validate};

const SELECT_DISPARO: &str = r#"
    SELECT d.*, u.nome AS usuario_nome
    FROM comunicacao_disparos d
    LEFT JOIN usuarios u ON u.id = d.usuario_id
"#;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Disparo {
    pub id: i64,
    pub titulo: String,
    pub mensagem: String,
    pub tipo_destinatario: TipoDestinatario,
    pub canais: Json<Vec<Canal>>,
    pub total: i64,
    pub enviados: i64,
    pub falhas: i64,
    pub usuario_id: Option<i64>,
    pub usuario_nome: Option<String>,
    pub criado_em: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisparoRequest {
    pub titulo: String,
    /// `{nome}` is replaced by each recipient's name
    pub mensagem: String,
    pub tipo_destinatario: TipoDestinatario,
    pub canais: Vec<Canal>,
    /// Birthday date for ANIVERSARIANTES; today when omitted
    pub data: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisparoResultado {
    pub id: i64,
    pub total: i64,
    pub enviados: i64,
    pub falhas: i64,
    pub erros: Vec<String>,
}

/// Who a dispatch goes to, with the contacts of every channel
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Destinatario {
    pub nome: String,
    pub telefone: Option<String>,
    pub whatsapp: Option<String>,
    pub email: Option<String>,
}

impl Destinatario {
    /// WhatsApp falls back to the phone number
    pub fn contato(&self, canal: Canal) -> Option<&str> {
        let contato = match canal {
            Canal::Whatsapp => self.whatsapp.as_deref().or(self.telefone.as_deref()),
            Canal::Sms => self.telefone.as_deref(),
            Canal::Email => self.email.as_deref(),
        };
        contato.map(str::trim).filter(|c| !c.is_empty())
    }
}

impl From<Aniversariante> for Destinatario {
    fn from(a: Aniversariante) -> Self {
        Self {
            nome: a.nome,
            telefone: a.telefone,
            whatsapp: a.whatsapp,
            email: a.email,
        }
    }
}

impl Searchable for Disparo {
    fn search_fields(&self) -> Vec<&str> {
        vec![self.titulo.as_str(), self.mensagem.as_str()]
    }
}

impl Validate for DisparoRequest {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.required("titulo", &self.titulo);
        errors.required("mensagem", &self.mensagem);
        if self.canais.is_empty() {
            errors.add("canais", "selecione ao menos um canal");
        }
        errors.into_result()
    }
}

pub fn personalizar(modelo: &str, nome: &str) -> String {
    modelo.replace("{nome}", nome)
}

fn unique_channels(canais: &[Canal]) -> Vec<Canal> {
    let mut unique = Vec::with_capacity(canais.len());
    for canal in canais {
        if !unique.contains(canal) {
            unique.push(*canal);
        }
    }
    unique
}

#[derive(Clone)]
pub struct Dispatcher {
    pool: SqlitePool,
    audit: AuditLogger,
    gateway: Gateway,
    aniversariantes: AniversarianteRegistry,
    configuracoes: ConfiguracaoRegistry,
}

impl Dispatcher {
    pub fn new(database: &Database, gateway: Gateway) -> Self {
        Self {
            pool: database.pool().clone(),
            audit: AuditLogger::new(database.pool().clone()),
            gateway,
            aniversariantes: AniversarianteRegistry::new(database),
            configuracoes: ConfiguracaoRegistry::new(database),
        }
    }

    pub async fn destinatarios(
        &self,
        tipo: TipoDestinatario,
        data: Option<NaiveDate>,
    ) -> Result<Vec<Destinatario>, MandatoError> {
        let sql = match tipo {
            TipoDestinatario::Eleitores => {
                "SELECT nome, telefone, whatsapp, email FROM eleitores ORDER BY nome COLLATE NOCASE"
            }
            TipoDestinatario::Liderancas => {
                "SELECT nome, telefone, whatsapp, email FROM liderancas WHERE ativo = 1 ORDER BY nome COLLATE NOCASE"
            }
            TipoDestinatario::Funcionarios => {
                "SELECT nome, telefone, whatsapp, email FROM funcionarios WHERE ativo = 1 ORDER BY nome COLLATE NOCASE"
            }
            TipoDestinatario::Aniversariantes => {
                let dia = data.unwrap_or_else(|| Utc::now().date_naive());
                let rows = self.aniversariantes.list(Periodo::Dia(dia)).await?;
                return Ok(rows.into_iter().map(Destinatario::from).collect());
            }
        };

        let rows = sqlx::query_as::<_, Destinatario>(sql).fetch_all(&self.pool).await?;
        Ok(rows)
    }

    pub async fn disparar(&self, actor: i64, request: DisparoRequest) -> Result<DisparoResultado, MandatoError> {
        request.validate()?;
        let canais = unique_channels(&request.canais);
        let destinatarios = self.destinatarios(request.tipo_destinatario, request.data).await?;
        let total = (destinatarios.len() * canais.len()) as i64;

        let result = sqlx::query(
            r#"
            INSERT INTO comunicacao_disparos (titulo, mensagem, tipo_destinatario, canais, total,
                                              enviados, falhas, usuario_id, criado_em)
            VALUES (?, ?, ?, ?, ?, 0, 0, ?, ?)
            "#,
        )
        .bind(request.titulo.trim())
        .bind(&request.mensagem)
        .bind(request.tipo_destinatario)
        .bind(Json(canais.clone()))
        .bind(total)
        .bind(actor)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        let id = result.last_insert_rowid();

        info!(
            "Disparo {} started: {} recipients x {} channels via {} gateway",
            id,
            destinatarios.len(),
            canais.len(),
            self.gateway.name()
        );

        let mut resultado = DisparoResultado {
            id,
            total,
            enviados: 0,
            falhas: 0,
            erros: Vec::new(),
        };

        for destinatario in &destinatarios {
            let texto = personalizar(&request.mensagem, &destinatario.nome);

            for canal in &canais {
                let Some(contato) = destinatario.contato(*canal) else {
                    resultado.falhas += 1;
                    resultado
                        .erros
                        .push(format!("{}: sem contato para {}", destinatario.nome, canal));
                    continue;
                };

                match self.gateway.send(*canal, contato, &texto).await {
                    Ok(()) => {
                        insert_mensagem(
                            &self.pool,
                            &NovaMensagem {
                                contato,
                                nome_contato: Some(&destinatario.nome),
                                canal: *canal,
                                direcao: Direcao::Enviada,
                                conteudo: &texto,
                                disparo_id: Some(id),
                                usuario_id: Some(actor),
                            },
                        )
                        .await?;
                        resultado.enviados += 1;
                    }
                    Err(e) => {
                        warn!("Disparo {}: delivery to {} failed: {}", id, contato, e);
                        resultado.falhas += 1;
                        resultado.erros.push(format!("{}: {}", destinatario.nome, e));
                    }
                }
            }
        }

        sqlx::query("UPDATE comunicacao_disparos SET enviados = ?, falhas = ? WHERE id = ?")
            .bind(resultado.enviados)
            .bind(resultado.falhas)
            .bind(id)
            .execute(&self.pool)
            .await?;

        self.audit
            .record(
                Some(actor),
                AcaoAuditoria::Disparo,
                "comunicacao_disparos",
                Some(id),
                serde_json::json!({
                    "titulo": request.titulo,
                    "tipo_destinatario": request.tipo_destinatario,
                    "canais": canais,
                    "total": resultado.total,
                    "enviados": resultado.enviados,
                    "falhas": resultado.falhas,
                }),
            )
            .await?;

        info!(
            "Disparo {} finished: {} sent, {} failed",
            id, resultado.enviados, resultado.falhas
        );
        Ok(resultado)
    }

    /// Greets everyone with a birthday on the given day using the stored template
    pub async fn enviar_felicitacoes(
        &self,
        actor: i64,
        request: FelicitacaoRequest,
    ) -> Result<DisparoResultado, MandatoError> {
        let dia = request.data.unwrap_or_else(|| Utc::now().date_naive());
        let modelo = self
            .configuracoes
            .value_or(MENSAGEM_ANIVERSARIO, DEFAULT_MENSAGEM_ANIVERSARIO)
            .await?;

        self.disparar(
            actor,
            DisparoRequest {
                titulo: format!("Felicitações {}", dia.format("%d/%m/%Y")),
                mensagem: modelo,
                tipo_destinatario: TipoDestinatario::Aniversariantes,
                canais: request.canais,
                data: Some(dia),
            },
        )
        .await
    }

    /// Dispatch history, newest first
    pub async fn historico(&self, params: &ListParams, pagination: &PaginationConfig) -> Result<Page<Disparo>, MandatoError> {
        let sql = format!("{} ORDER BY d.criado_em DESC, d.id DESC", SELECT_DISPARO);
        let all = sqlx::query_as::<_, Disparo>(&sql).fetch_all(&self.pool).await?;

        let rows: Vec<Disparo> = all
            .into_iter()
            .filter(|d| matches_query(d, params.query()))
            .collect();
        Ok(paginate(rows, params.page_request(pagination)))
    }

    pub async fn get(&self, id: i64) -> Result<Disparo, MandatoError> {
        let sql = format!("{} WHERE d.id = ?", SELECT_DISPARO);
        sqlx::query_as::<_, Disparo>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| MandatoError::not_found("disparo", id))
    }

    /// Messages delivered by one dispatch
    pub async fn mensagens(&self, id: i64) -> Result<Vec<Mensagem>, MandatoError> {
        self.get(id).await?;
        let rows = sqlx::query_as::<_, Mensagem>(
            "SELECT * FROM comunicacao_mensagens WHERE disparo_id = ? ORDER BY id",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn destinatario() -> Destinatario {
        Destinatario {
            nome: "José".to_string(),
            telefone: Some("81999990000".to_string()),
            whatsapp: None,
            email: Some("  ".to_string()),
        }
    }

    #[test]
    fn test_contact_per_channel() {
        let d = destinatario();
        assert_eq!(d.contato(Canal::Whatsapp), Some("81999990000"));
        assert_eq!(d.contato(Canal::Sms), Some("81999990000"));
        assert_eq!(d.contato(Canal::Email), None);
    }

    #[test]
    fn test_template_substitution() {
        assert_eq!(personalizar("Parabéns, {nome}!", "Ana"), "Parabéns, Ana!");
        assert_eq!(personalizar("Sem nome", "Ana"), "Sem nome");
    }

    #[test]
    fn test_request_needs_message_and_channel() {
        let request = DisparoRequest {
            titulo: "Aviso".to_string(),
            mensagem: " ".to_string(),
            tipo_destinatario: TipoDestinatario::Eleitores,
            canais: vec![],
            data: None,
        };
        let errors = request.validate().unwrap_err();
        assert!(errors.has("mensagem"));
        assert!(errors.has("canais"));
    }

    #[test]
    fn test_repeated_channels_collapse() {
        let canais = unique_channels(&[Canal::Sms, Canal::Email, Canal::Sms]);
        assert_eq!(canais, vec![Canal::Sms, Canal::Email]);
    }
}
