//! Mass dispatch, birthday greetings and direct messages through a mock gateway

mod common;

use std::time::Duration;

use common::{create_admin, date, setup_test_db};
use mandato_pro::cadastros::{EleitorPayload, EleitorRegistry};
use mandato_pro::comunicacao::{
    AniversarianteRegistry, DisparoRequest, Dispatcher, FelicitacaoRequest, Gateway,
    MensagemPayload, MensagemRegistry, Periodo,
};
use mandato_pro::config::PaginationConfig;
use mandato_pro::configuracoes::{ConfiguracaoRegistry, MENSAGEM_ANIVERSARIO};
use mandato_pro::database::models::{Canal, Direcao, TipoDestinatario};
use mandato_pro::database::Database;
use mandato_pro::listing::ListParams;
use mandato_pro::MandatoError;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TELEFONE_RECUSADO: &str = "11900000003";

async fn seed_eleitores(db: &Database, actor: i64) {
    let registry = EleitorRegistry::new(db);
    let eleitores = [
        ("Ana Souza", Some("11900000001"), None, Some(date(1985, 7, 14))),
        ("Bruno Reis", None, Some("bruno@example.com"), Some(date(1990, 1, 2))),
        ("Carla Dias", Some(TELEFONE_RECUSADO), None, None),
    ];
    for (nome, telefone, email, nascimento) in eleitores {
        registry
            .create(
                actor,
                EleitorPayload {
                    nome: nome.to_string(),
                    telefone: telefone.map(str::to_string),
                    email: email.map(str::to_string),
                    data_nascimento: nascimento,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
    }
}

async fn mock_gateway() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/whatsapp"))
        .and(body_partial_json(json!({ "destino": TELEFONE_RECUSADO })))
        .respond_with(ResponseTemplate::new(500))
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/whatsapp"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn test_disparo_counts_missing_contacts_and_gateway_errors() {
    let db = setup_test_db().await;
    let admin = create_admin(&db).await;
    seed_eleitores(&db, admin.id).await;

    let server = mock_gateway().await;
    let gateway = Gateway::http(&server.uri(), Duration::from_secs(5)).unwrap();
    let dispatcher = Dispatcher::new(&db, gateway);

    let resultado = dispatcher
        .disparar(
            admin.id,
            DisparoRequest {
                titulo: "Convite reunião de bairro".to_string(),
                mensagem: "Olá {nome}, contamos com você sábado às 10h.".to_string(),
                tipo_destinatario: TipoDestinatario::Eleitores,
                canais: vec![Canal::Whatsapp, Canal::Whatsapp],
                data: None,
            },
        )
        .await
        .unwrap();

    assert_eq!(resultado.total, 3);
    assert_eq!(resultado.enviados, 1);
    assert_eq!(resultado.falhas, 2);
    assert_eq!(resultado.erros.len(), 2);

    let disparo = dispatcher.get(resultado.id).await.unwrap();
    assert_eq!(disparo.enviados, 1);
    assert_eq!(disparo.falhas, 2);
    assert_eq!(disparo.canais.0, vec![Canal::Whatsapp]);

    let mensagens = dispatcher.mensagens(resultado.id).await.unwrap();
    assert_eq!(mensagens.len(), 1);
    assert_eq!(mensagens[0].contato, "11900000001");
    assert_eq!(
        mensagens[0].conteudo,
        "Olá Ana Souza, contamos com você sábado às 10h."
    );
    assert_eq!(mensagens[0].direcao, Direcao::Enviada);

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);

    let historico = dispatcher
        .historico(&ListParams::default(), &PaginationConfig::default())
        .await
        .unwrap();
    assert_eq!(historico.total_items, 1);
    assert_eq!(historico.items[0].usuario_nome.as_deref(), Some("Administrador"));
}

#[tokio::test]
async fn test_disparo_without_recipients_is_recorded() {
    let db = setup_test_db().await;
    let admin = create_admin(&db).await;
    let dispatcher = Dispatcher::new(&db, Gateway::Log);

    let resultado = dispatcher
        .disparar(
            admin.id,
            DisparoRequest {
                titulo: "Comunicado".to_string(),
                mensagem: "Expediente suspenso amanhã.".to_string(),
                tipo_destinatario: TipoDestinatario::Funcionarios,
                canais: vec![Canal::Email],
                data: None,
            },
        )
        .await
        .unwrap();

    assert_eq!(resultado.total, 0);
    assert_eq!(resultado.enviados, 0);
    assert!(dispatcher.get(resultado.id).await.is_ok());
}

#[tokio::test]
async fn test_felicitacoes_use_stored_template() {
    let db = setup_test_db().await;
    let admin = create_admin(&db).await;
    seed_eleitores(&db, admin.id).await;

    ConfiguracaoRegistry::new(&db)
        .upsert(Some(admin.id), MENSAGEM_ANIVERSARIO, "Parabéns, {nome}! Um abraço do gabinete.")
        .await
        .unwrap();

    let aniversariantes = AniversarianteRegistry::new(&db)
        .list(Periodo::Dia(date(2024, 7, 14)))
        .await
        .unwrap();
    assert_eq!(aniversariantes.len(), 1);
    assert_eq!(aniversariantes[0].origem, "ELEITOR");

    let dispatcher = Dispatcher::new(&db, Gateway::Log);
    let resultado = dispatcher
        .enviar_felicitacoes(
            admin.id,
            FelicitacaoRequest {
                data: Some(date(2024, 7, 14)),
                canais: vec![Canal::Whatsapp, Canal::Email],
            },
        )
        .await
        .unwrap();

    // Ana has a phone but no e-mail
    assert_eq!(resultado.total, 2);
    assert_eq!(resultado.enviados, 1);
    assert_eq!(resultado.falhas, 1);

    let mensagens = dispatcher.mensagens(resultado.id).await.unwrap();
    assert_eq!(mensagens[0].conteudo, "Parabéns, Ana Souza! Um abraço do gabinete.");
    assert_eq!(mensagens[0].canal, Canal::Whatsapp);
}

#[tokio::test]
async fn test_failed_direct_message_is_not_stored() {
    let db = setup_test_db().await;
    let admin = create_admin(&db).await;
    let server = mock_gateway().await;
    let gateway = Gateway::http(&server.uri(), Duration::from_secs(5)).unwrap();
    let registry = MensagemRegistry::new(&db, gateway);

    let falha = registry
        .enviar(
            admin.id,
            MensagemPayload {
                contato: TELEFONE_RECUSADO.to_string(),
                nome_contato: Some("Carla Dias".to_string()),
                canal: Canal::Whatsapp,
                conteudo: "Sua solicitação foi atendida.".to_string(),
            },
        )
        .await;
    assert!(matches!(falha, Err(MandatoError::MessagingError(_))));
    assert!(registry.conversa(TELEFONE_RECUSADO).await.unwrap().is_empty());

    registry
        .enviar(
            admin.id,
            MensagemPayload {
                contato: "11900000001".to_string(),
                nome_contato: Some("Ana Souza".to_string()),
                canal: Canal::Whatsapp,
                conteudo: "Bom dia, Ana!".to_string(),
            },
        )
        .await
        .unwrap();
    registry
        .registrar_recebida(
            admin.id,
            MensagemPayload {
                contato: "11900000001".to_string(),
                nome_contato: Some("Ana Souza".to_string()),
                canal: Canal::Whatsapp,
                conteudo: "Bom dia! Obrigada.".to_string(),
            },
        )
        .await
        .unwrap();

    let conversa = registry.conversa("11900000001").await.unwrap();
    assert_eq!(conversa.len(), 2);
    assert_eq!(conversa[1].direcao, Direcao::Recebida);

    let contatos = registry
        .contatos(&ListParams::default(), &PaginationConfig::default())
        .await
        .unwrap();
    assert_eq!(contatos.total_items, 1);
    assert_eq!(contatos.items[0].total_mensagens, 2);
    assert_eq!(contatos.items[0].ultima_mensagem, "Bom dia! Obrigada.");
}
