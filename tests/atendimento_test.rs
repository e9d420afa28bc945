//! Service desk: interactions, calendar and citizen requests

mod common;

use chrono::NaiveTime;
use common::{create_admin, create_eleitor, date, setup_test_db};
use mandato_pro::atendimento::{
    AgendaRegistry, AtendimentoFilter, AtendimentoPayload, AtendimentoRegistry, EventoFilter,
    EventoPayload, MudancaStatus, SolicitacaoFilter, SolicitacaoPayload, SolicitacaoRegistry,
};
use mandato_pro::audit::{AuditFilter, AuditLogger};
use mandato_pro::config::PaginationConfig;
use mandato_pro::database::models::{AcaoAuditoria, Prioridade, StatusSolicitacao};
use mandato_pro::listing::ListParams;
use mandato_pro::MandatoError;

fn pedido(titulo: &str, eleitor_id: Option<i64>) -> SolicitacaoPayload {
    SolicitacaoPayload {
        titulo: titulo.to_string(),
        descricao: "Buraco na rua em frente ao número 120".to_string(),
        eleitor_id,
        prioridade: Prioridade::Alta,
        responsavel_id: None,
    }
}

#[tokio::test]
async fn test_status_changes_build_history() {
    let db = setup_test_db().await;
    let admin = create_admin(&db).await;
    let eleitor = create_eleitor(&db, admin.id, "Carlos Nogueira").await;
    let registry = SolicitacaoRegistry::new(&db);

    let solicitacao = registry
        .create(admin.id, pedido("Tapa-buraco", Some(eleitor.id)))
        .await
        .unwrap();
    assert_eq!(solicitacao.status, StatusSolicitacao::Novo);
    assert_eq!(solicitacao.eleitor_nome.as_deref(), Some("Carlos Nogueira"));

    registry
        .change_status(
            admin.id,
            solicitacao.id,
            MudancaStatus {
                status: StatusSolicitacao::EmAndamento,
                observacao: Some("Encaminhado à subprefeitura".to_string()),
            },
        )
        .await
        .unwrap();
    let atendida = registry
        .change_status(
            admin.id,
            solicitacao.id,
            MudancaStatus {
                status: StatusSolicitacao::Atendido,
                observacao: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(atendida.status, StatusSolicitacao::Atendido);

    let historico = registry.historico(solicitacao.id).await.unwrap();
    assert_eq!(historico.len(), 2);
    assert_eq!(historico[0].status_anterior, StatusSolicitacao::Novo);
    assert_eq!(historico[0].status_novo, StatusSolicitacao::EmAndamento);
    assert_eq!(historico[1].status_anterior, StatusSolicitacao::EmAndamento);
    assert_eq!(historico[1].status_novo, StatusSolicitacao::Atendido);
    assert_eq!(historico[1].usuario_nome.as_deref(), Some("Administrador"));

    let audit = AuditLogger::new(db.pool().clone())
        .query_all(&AuditFilter {
            acao: Some(AcaoAuditoria::AlterarStatus),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(audit.len(), 2);
}

#[tokio::test]
async fn test_same_status_is_rejected_without_history() {
    let db = setup_test_db().await;
    let admin = create_admin(&db).await;
    let registry = SolicitacaoRegistry::new(&db);

    let solicitacao = registry.create(admin.id, pedido("Poda de árvore", None)).await.unwrap();
    let result = registry
        .change_status(
            admin.id,
            solicitacao.id,
            MudancaStatus {
                status: StatusSolicitacao::Novo,
                observacao: None,
            },
        )
        .await;

    match result {
        Err(MandatoError::ValidationError(fields)) => assert!(fields.has("status")),
        other => panic!("expected validation error, got {:?}", other.map(|s| s.id)),
    }
    assert!(registry.historico(solicitacao.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_update_keeps_status_and_counts_by_status() {
    let db = setup_test_db().await;
    let admin = create_admin(&db).await;
    let registry = SolicitacaoRegistry::new(&db);

    let a = registry.create(admin.id, pedido("Iluminação", None)).await.unwrap();
    registry.create(admin.id, pedido("Calçada", None)).await.unwrap();
    registry
        .change_status(
            admin.id,
            a.id,
            MudancaStatus {
                status: StatusSolicitacao::Recusado,
                observacao: Some("Fora da área de atuação".to_string()),
            },
        )
        .await
        .unwrap();

    let editada = registry
        .update(admin.id, a.id, pedido("Iluminação pública", None))
        .await
        .unwrap();
    assert_eq!(editada.titulo, "Iluminação pública");
    assert_eq!(editada.status, StatusSolicitacao::Recusado);

    let counts = registry.count_by_status().await.unwrap();
    assert_eq!(counts.get("NOVO"), Some(&1));
    assert_eq!(counts.get("RECUSADO"), Some(&1));

    let recusadas = registry
        .search(
            &SolicitacaoFilter {
                status: Some(StatusSolicitacao::Recusado),
                ..Default::default()
            },
            "",
        )
        .await
        .unwrap();
    assert_eq!(recusadas.len(), 1);
}

#[tokio::test]
async fn test_atendimentos_filtered_by_period() {
    let db = setup_test_db().await;
    let admin = create_admin(&db).await;
    let eleitor = create_eleitor(&db, admin.id, "Fernanda Melo").await;
    let registry = AtendimentoRegistry::new(&db);

    for (dia, tipo) in [(5, "Presencial"), (20, "Telefone"), (28, "WhatsApp")] {
        registry
            .create(
                admin.id,
                AtendimentoPayload {
                    eleitor_id: eleitor.id,
                    tipo: tipo.to_string(),
                    descricao: "Pedido de informação sobre vagas em creche".to_string(),
                    data: date(2024, 6, dia),
                },
            )
            .await
            .unwrap();
    }

    let filter = AtendimentoFilter {
        data_inicio: Some(date(2024, 6, 10)),
        data_fim: Some(date(2024, 6, 30)),
        ..Default::default()
    };
    let page = registry
        .list(&filter, &ListParams::default(), &PaginationConfig::default())
        .await
        .unwrap();

    assert_eq!(page.total_items, 2);
    // newest first
    assert_eq!(page.items[0].tipo, "WhatsApp");
    assert_eq!(page.items[0].usuario_id, Some(admin.id));
    assert_eq!(page.items[0].eleitor_nome, "Fernanda Melo");
}

#[tokio::test]
async fn test_agenda_rejects_end_before_start() {
    let db = setup_test_db().await;
    let admin = create_admin(&db).await;
    let registry = AgendaRegistry::new(&db);
    let nove = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
    let onze = NaiveTime::from_hms_opt(11, 0, 0).unwrap();

    let payload = EventoPayload {
        titulo: "Audiência pública".to_string(),
        descricao: None,
        local: Some("Câmara Municipal".to_string()),
        inicio: date(2024, 8, 12).and_time(onze),
        fim: date(2024, 8, 12).and_time(nove),
        tipo: "Audiência".to_string(),
        responsavel_id: Some(admin.id),
    };
    match registry.create(admin.id, payload.clone()).await {
        Err(MandatoError::ValidationError(fields)) => assert!(fields.has("fim")),
        other => panic!("expected validation error, got {:?}", other.map(|e| e.id)),
    }

    let evento = registry
        .create(
            admin.id,
            EventoPayload {
                inicio: date(2024, 8, 12).and_time(nove),
                fim: date(2024, 8, 12).and_time(onze),
                ..payload
            },
        )
        .await
        .unwrap();
    assert_eq!(evento.responsavel_nome.as_deref(), Some("Administrador"));

    let agosto = registry
        .search(
            &EventoFilter {
                data_inicio: Some(date(2024, 8, 1)),
                data_fim: Some(date(2024, 8, 31)),
                ..Default::default()
            },
            "audiência",
        )
        .await
        .unwrap();
    assert_eq!(agosto.len(), 1);
}
