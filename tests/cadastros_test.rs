//! Voter, leader and staff registries against an in-memory database

mod common;

use common::{create_admin, create_eleitor, date, setup_test_db};
use mandato_pro::audit::AuditFilter;
use mandato_pro::audit::AuditLogger;
use mandato_pro::cadastros::{
    EleitorFilter, EleitorPayload, EleitorRegistry, FuncionarioPayload, FuncionarioRegistry,
    LiderancaPayload, LiderancaRegistry,
};
use mandato_pro::config::PaginationConfig;
use mandato_pro::database::models::AcaoAuditoria;
use mandato_pro::listing::ListParams;
use mandato_pro::MandatoError;

fn lideranca(nome: &str) -> LiderancaPayload {
    LiderancaPayload {
        nome: nome.to_string(),
        cpf: None,
        telefone: Some("11999990000".to_string()),
        whatsapp: None,
        email: None,
        bairro: Some("Vila Nova".to_string()),
        cidade: Some("Campinas".to_string()),
        data_nascimento: None,
        ativo: true,
    }
}

#[tokio::test]
async fn test_eleitor_crud_is_audited() {
    let db = setup_test_db().await;
    let admin = create_admin(&db).await;
    let registry = EleitorRegistry::new(&db);

    let eleitor = create_eleitor(&db, admin.id, "Maria da Silva").await;
    assert_eq!(eleitor.nome, "Maria da Silva");
    assert_eq!(eleitor.uf.as_deref(), Some("SP"));

    let mut payload = EleitorPayload {
        nome: "Maria da Silva Souza".to_string(),
        bairro: Some("Jardim América".to_string()),
        ..Default::default()
    };
    payload.data_nascimento = Some(date(1980, 3, 15));
    let updated = registry.update(admin.id, eleitor.id, payload).await.unwrap();
    assert_eq!(updated.nome, "Maria da Silva Souza");
    assert_eq!(updated.data_nascimento, Some(date(1980, 3, 15)));

    registry.delete(admin.id, eleitor.id).await.unwrap();
    assert!(matches!(
        registry.get(eleitor.id).await,
        Err(MandatoError::NotFound(_))
    ));

    let history = AuditLogger::new(db.pool().clone())
        .for_entity("eleitores", eleitor.id)
        .await
        .unwrap();
    let acoes: Vec<AcaoAuditoria> = history.iter().map(|e| e.acao).collect();
    assert_eq!(
        acoes,
        vec![AcaoAuditoria::Criar, AcaoAuditoria::Atualizar, AcaoAuditoria::Excluir]
    );
    assert!(history.iter().all(|e| e.usuario_id == Some(admin.id)));
}

#[tokio::test]
async fn test_eleitor_validation_reports_every_field() {
    let db = setup_test_db().await;
    let admin = create_admin(&db).await;

    let payload = EleitorPayload {
        nome: "  ".to_string(),
        cpf: Some("123.456.789-00".to_string()),
        email: Some("sem-arroba".to_string()),
        uf: Some("sao".to_string()),
        ..Default::default()
    };

    match EleitorRegistry::new(&db).create(admin.id, payload).await {
        Err(MandatoError::ValidationError(fields)) => {
            assert!(fields.has("nome"));
            assert!(fields.has("cpf"));
            assert!(fields.has("email"));
            assert!(fields.has("uf"));
        }
        other => panic!("expected validation error, got {:?}", other.map(|e| e.id)),
    }

    let audit = AuditLogger::new(db.pool().clone())
        .query_all(&AuditFilter::default())
        .await
        .unwrap();
    assert!(audit.iter().all(|e| e.entidade != "eleitores"));
}

#[tokio::test]
async fn test_eleitor_search_and_pagination() {
    let db = setup_test_db().await;
    let admin = create_admin(&db).await;
    let registry = EleitorRegistry::new(&db);

    for nome in ["Ana Costa", "Bruno Lima", "Carla Costa", "Diego Alves", "Elisa Costa"] {
        create_eleitor(&db, admin.id, nome).await;
    }

    let pagination = PaginationConfig {
        default_per_page: 2,
        max_per_page: 10,
    };
    let params = ListParams {
        q: Some("costa".to_string()),
        page: Some(2),
        per_page: None,
    };
    let page = registry
        .list(&EleitorFilter::default(), &params, &pagination)
        .await
        .unwrap();

    assert_eq!(page.total_items, 3);
    assert_eq!(page.total_pages, 2);
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].nome, "Elisa Costa");
}

#[tokio::test]
async fn test_lideranca_links_eleitores() {
    let db = setup_test_db().await;
    let admin = create_admin(&db).await;
    let liderancas = LiderancaRegistry::new(&db);
    let eleitores = EleitorRegistry::new(&db);

    let lider = liderancas.create(admin.id, lideranca("João Pereira")).await.unwrap();
    for nome in ["Pedro Rocha", "Paula Dias"] {
        eleitores
            .create(
                admin.id,
                EleitorPayload {
                    nome: nome.to_string(),
                    lideranca_id: Some(lider.id),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
    }
    create_eleitor(&db, admin.id, "Sem Liderança").await;

    let page = liderancas
        .eleitores(lider.id, &ListParams::default(), &PaginationConfig::default())
        .await
        .unwrap();
    assert_eq!(page.total_items, 2);
    assert!(page
        .items
        .iter()
        .all(|e| e.lideranca_nome.as_deref() == Some("João Pereira")));

    let missing = eleitores
        .create(
            admin.id,
            EleitorPayload {
                nome: "Órfão".to_string(),
                lideranca_id: Some(9999),
                ..Default::default()
            },
        )
        .await;
    assert!(missing.is_err());
}

#[tokio::test]
async fn test_funcionario_requires_cargo() {
    let db = setup_test_db().await;
    let admin = create_admin(&db).await;
    let registry = FuncionarioRegistry::new(&db);

    let payload = FuncionarioPayload {
        nome: "Roberta Alves".to_string(),
        cpf: None,
        cargo: "".to_string(),
        email: None,
        telefone: None,
        whatsapp: None,
        salario_centavos: 450_000,
        data_admissao: Some(date(2023, 2, 1)),
        data_nascimento: None,
        ativo: true,
    };
    assert!(matches!(
        registry.create(admin.id, payload.clone()).await,
        Err(MandatoError::ValidationError(_))
    ));

    let funcionario = registry
        .create(
            admin.id,
            FuncionarioPayload {
                cargo: "Assessora parlamentar".to_string(),
                ..payload
            },
        )
        .await
        .unwrap();
    assert_eq!(funcionario.salario_centavos, 450_000);
}
