//! Audit trail and access log queries

mod common;

use chrono::{Days, Utc};
use common::{create_admin, create_user, setup_test_db};
use mandato_pro::audit::{AccessContext, AccessFilter, AuditFilter, AuditLogger};
use mandato_pro::config::PaginationConfig;
use mandato_pro::database::models::{AcaoAuditoria, Perfil};
use mandato_pro::database::Database;
use serde_json::json;

fn pagination() -> PaginationConfig {
    PaginationConfig {
        default_per_page: 2,
        max_per_page: 10,
    }
}

/// Creating the two users writes two `usuarios` entries; five more follow
async fn seed(db: &Database) -> (AuditLogger, i64, i64) {
    let admin = create_admin(db).await;
    let operador = create_user(db, "Operadora", "operadora@gabinete.gov.br", Perfil::Operador).await;
    let audit = AuditLogger::new(db.pool().clone());

    let entries = [
        (admin.id, AcaoAuditoria::Criar, "eleitores", 1, json!({ "nome": "Ana Souza" })),
        (admin.id, AcaoAuditoria::Atualizar, "eleitores", 1, json!({ "bairro": "Centro" })),
        (operador.id, AcaoAuditoria::Criar, "atendimentos", 7, json!({ "assunto": "Poda de árvore" })),
        (operador.id, AcaoAuditoria::Excluir, "eleitores", 2, json!({ "nome": "Bruno Reis" })),
        (admin.id, AcaoAuditoria::Criar, "emendas", 3, json!({ "numero": "2024-0042" })),
    ];
    for (usuario, acao, entidade, id, detalhes) in entries {
        audit
            .record(Some(usuario), acao, entidade, Some(id), detalhes)
            .await
            .unwrap();
    }
    (audit, admin.id, operador.id)
}

#[tokio::test]
async fn test_audit_filters_by_user_entity_and_text() {
    let db = setup_test_db().await;
    let (audit, admin, operador) = seed(&db).await;

    let do_operador = audit
        .query_all(&AuditFilter {
            usuario_id: Some(operador),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(do_operador.len(), 2);
    assert!(do_operador.iter().all(|e| e.usuario_nome.as_deref() == Some("Operadora")));

    let eleitores = audit
        .query_all(&AuditFilter {
            entidade: Some("eleitores".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(eleitores.len(), 3);

    let combinados = audit
        .query_all(&AuditFilter {
            usuario_id: Some(admin),
            acao: Some(AcaoAuditoria::Criar),
            entidade: Some("eleitores".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(combinados.len(), 1);
    assert_eq!(combinados[0].entidade_id, Some(1));

    let texto = audit
        .query_all(&AuditFilter {
            texto: Some("Poda".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(texto.len(), 1);
    assert_eq!(texto[0].entidade, "atendimentos");
}

#[tokio::test]
async fn test_audit_date_range_on_stored_timestamps() {
    let db = setup_test_db().await;
    let (audit, _, _) = seed(&db).await;
    let hoje = Utc::now().date_naive();
    let ontem = hoje.checked_sub_days(Days::new(1)).unwrap();
    let amanha = hoje.checked_add_days(Days::new(1)).unwrap();

    let count = |data_inicio, data_fim| {
        let audit = audit.clone();
        async move {
            audit
                .query_all(&AuditFilter {
                    data_inicio,
                    data_fim,
                    ..Default::default()
                })
                .await
                .unwrap()
                .len()
        }
    };

    assert_eq!(count(Some(ontem), Some(amanha)).await, 7);
    assert_eq!(count(Some(hoje), Some(hoje)).await, 7);
    assert_eq!(count(Some(amanha), None).await, 0);
    assert_eq!(count(None, Some(ontem)).await, 0);
}

#[tokio::test]
async fn test_audit_pages_are_newest_first() {
    let db = setup_test_db().await;
    let (audit, _, _) = seed(&db).await;

    let primeira = audit.query(&AuditFilter::default(), &pagination()).await.unwrap();
    assert_eq!(primeira.total_items, 7);
    assert_eq!(primeira.total_pages, 4);
    assert_eq!(primeira.per_page, 2);
    assert_eq!(primeira.items[0].entidade, "emendas");
    assert_eq!(primeira.items[1].entidade, "eleitores");
    assert_eq!(primeira.items[1].acao, AcaoAuditoria::Excluir);

    let ultima = audit
        .query(
            &AuditFilter {
                page: Some(4),
                ..Default::default()
            },
            &pagination(),
        )
        .await
        .unwrap();
    assert_eq!(ultima.items.len(), 1);
    assert_eq!(ultima.items[0].entidade, "usuarios");
    assert_eq!(ultima.items[0].usuario_id, None);

    let ids: Vec<i64> = primeira.items.iter().chain(ultima.items.iter()).map(|e| e.id).collect();
    assert!(ids.windows(2).all(|w| w[0] > w[1]));

    let filtrada = audit
        .query(
            &AuditFilter {
                entidade: Some("eleitores".to_string()),
                per_page: Some(50),
                ..Default::default()
            },
            &pagination(),
        )
        .await
        .unwrap();
    assert_eq!(filtrada.per_page, 10);
    assert_eq!(filtrada.total_items, 3);
    assert_eq!(filtrada.total_pages, 1);
}

#[tokio::test]
async fn test_access_log_filters() {
    let db = setup_test_db().await;
    let admin = create_admin(&db).await;
    let audit = AuditLogger::new(db.pool().clone());
    let context = AccessContext {
        ip: Some("200.1.2.3".to_string()),
        user_agent: None,
    };

    audit
        .record_access(Some(admin.id), &admin.email, true, None, &context)
        .await
        .unwrap();
    audit
        .record_access(None, "intruso@example.com", false, Some("usuario nao encontrado"), &context)
        .await
        .unwrap();
    audit
        .record_access(Some(admin.id), &admin.email, false, Some("senha incorreta"), &context)
        .await
        .unwrap();

    let falhas = audit
        .query_access(
            &AccessFilter {
                sucesso: Some(false),
                ..Default::default()
            },
            &pagination(),
        )
        .await
        .unwrap();
    assert_eq!(falhas.total_items, 2);
    assert_eq!(falhas.items[0].motivo.as_deref(), Some("senha incorreta"));

    let do_admin = audit
        .query_access(
            &AccessFilter {
                email: Some("ADMIN@".to_string()),
                sucesso: Some(false),
                ..Default::default()
            },
            &pagination(),
        )
        .await
        .unwrap();
    assert_eq!(do_admin.total_items, 1);

    let hoje = Utc::now().date_naive();
    let amanha = hoje.checked_add_days(Days::new(1)).unwrap();
    let de_hoje = audit
        .query_access(
            &AccessFilter {
                data_inicio: Some(hoje),
                data_fim: Some(hoje),
                ..Default::default()
            },
            &pagination(),
        )
        .await
        .unwrap();
    assert_eq!(de_hoje.total_items, 3);
    assert_eq!(de_hoje.total_pages, 2);

    let futuro = audit
        .query_access(
            &AccessFilter {
                data_inicio: Some(amanha),
                ..Default::default()
            },
            &pagination(),
        )
        .await
        .unwrap();
    assert_eq!(futuro.total_items, 0);
    assert!(futuro.items.is_empty());
}
