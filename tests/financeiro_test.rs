//! Budget amendments and office finances

mod common;

use common::{create_admin, date, setup_test_db};
use mandato_pro::config::PaginationConfig;
use mandato_pro::database::models::{StatusDespesa, StatusEmenda, TipoLancamento};
use mandato_pro::financeiro::{
    DespesaFilter, DespesaPayload, DespesaRegistry, DoacaoFilter, DoacaoPayload, DoacaoRegistry,
    DoadorPayload, LancamentoFilter, LancamentoPayload, LancamentoRegistry, ResumoFinanceiro,
};
use mandato_pro::listing::ListParams;
use mandato_pro::orcamento::{EmendaPayload, EmendaRegistry, RepassePayload};
use mandato_pro::validation::MAX_VALOR_CENTAVOS;
use mandato_pro::MandatoError;

fn emenda(valor_centavos: i64) -> EmendaPayload {
    EmendaPayload {
        numero: "2024-0042".to_string(),
        ano: 2024,
        tipo: "Individual".to_string(),
        objeto: "Reforma da UBS do Jardim Esperança".to_string(),
        municipio: "Sorocaba".to_string(),
        beneficiario: "Secretaria Municipal de Saúde".to_string(),
        valor_centavos,
        status: StatusEmenda::Aprovada,
    }
}

fn repasse(valor_centavos: i64) -> RepassePayload {
    RepassePayload {
        data: date(2024, 5, 10),
        valor_centavos,
        descricao: None,
    }
}

#[tokio::test]
async fn test_repasses_cannot_exceed_emenda_value() {
    let db = setup_test_db().await;
    let admin = create_admin(&db).await;
    let registry = EmendaRegistry::new(&db);

    let criada = registry.create(admin.id, emenda(100_000_00)).await.unwrap();
    registry.add_repasse(admin.id, criada.id, repasse(60_000_00)).await.unwrap();
    registry.add_repasse(admin.id, criada.id, repasse(40_000_00)).await.unwrap();

    match registry.add_repasse(admin.id, criada.id, repasse(1)).await {
        Err(MandatoError::ValidationError(fields)) => assert!(fields.has("valor_centavos")),
        other => panic!("expected validation error, got {:?}", other.map(|r| r.id)),
    }

    let detalhe = registry.detalhe(criada.id).await.unwrap();
    assert_eq!(detalhe.emenda.total_repassado_centavos, 100_000_00);
    assert_eq!(detalhe.saldo_centavos, 0);
    assert_eq!(detalhe.repasses.len(), 2);

    // the value may not drop below what was already transferred
    assert!(registry.update(admin.id, criada.id, emenda(90_000_00)).await.is_err());

    let primeiro = detalhe.repasses[0].id;
    registry.delete_repasse(admin.id, criada.id, primeiro).await.unwrap();
    let emenda_atual = registry.get(criada.id).await.unwrap();
    assert_eq!(emenda_atual.saldo_centavos(), 60_000_00);
    assert!(registry.update(admin.id, criada.id, emenda(90_000_00)).await.is_ok());
}

#[tokio::test]
async fn test_emenda_validation_and_cascade() {
    let db = setup_test_db().await;
    let admin = create_admin(&db).await;
    let registry = EmendaRegistry::new(&db);

    let invalida = EmendaPayload {
        ano: 1950,
        ..emenda(0)
    };
    match registry.create(admin.id, invalida).await {
        Err(MandatoError::ValidationError(fields)) => {
            assert!(fields.has("ano"));
            assert!(fields.has("valor_centavos"));
        }
        other => panic!("expected validation error, got {:?}", other.map(|e| e.id)),
    }

    let criada = registry.create(admin.id, emenda(50_000_00)).await.unwrap();
    let r = registry.add_repasse(admin.id, criada.id, repasse(10_000_00)).await.unwrap();
    registry.delete(admin.id, criada.id).await.unwrap();
    assert!(matches!(
        registry.get_repasse(criada.id, r.id).await,
        Err(MandatoError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_lancamentos_summary_follows_filters() {
    let db = setup_test_db().await;
    let admin = create_admin(&db).await;
    let registry = LancamentoRegistry::new(&db);

    let entries = [
        (TipoLancamento::Entrada, "Verba de gabinete", 30_000_00, date(2024, 3, 1)),
        (TipoLancamento::Saida, "Aluguel", 8_000_00, date(2024, 3, 5)),
        (TipoLancamento::Saida, "Combustível", 1_500_00, date(2024, 3, 20)),
        (TipoLancamento::Saida, "Aluguel", 8_000_00, date(2024, 4, 5)),
    ];
    for (tipo, categoria, valor_centavos, data) in entries {
        registry
            .create(
                admin.id,
                LancamentoPayload {
                    tipo,
                    categoria: categoria.to_string(),
                    descricao: format!("{} {}", categoria, data),
                    valor_centavos,
                    data,
                },
            )
            .await
            .unwrap();
    }

    let marco = LancamentoFilter {
        data_inicio: Some(date(2024, 3, 1)),
        data_fim: Some(date(2024, 3, 31)),
        ..Default::default()
    };
    let page = registry
        .list(&marco, &ListParams::default(), &PaginationConfig::default())
        .await
        .unwrap();

    assert_eq!(page.page.total_items, 3);
    assert_eq!(
        page.resumo,
        ResumoFinanceiro {
            entradas_centavos: 30_000_00,
            saidas_centavos: 9_500_00,
            saldo_centavos: 20_500_00,
        }
    );
}

#[tokio::test]
async fn test_oversized_amounts_are_rejected() {
    let db = setup_test_db().await;
    let admin = create_admin(&db).await;
    let registry = LancamentoRegistry::new(&db);

    for _ in 0..2 {
        let result = registry
            .create(
                admin.id,
                LancamentoPayload {
                    tipo: TipoLancamento::Entrada,
                    categoria: "Doação".to_string(),
                    descricao: "valor fora da escala".to_string(),
                    valor_centavos: i64::MAX,
                    data: date(2024, 6, 1),
                },
            )
            .await;
        match result {
            Err(MandatoError::ValidationError(fields)) => assert!(fields.has("valor_centavos")),
            other => panic!("expected validation error, got {:?}", other.map(|l| l.id)),
        }
    }

    registry
        .create(
            admin.id,
            LancamentoPayload {
                tipo: TipoLancamento::Entrada,
                categoria: "Verba de gabinete".to_string(),
                descricao: "teto".to_string(),
                valor_centavos: MAX_VALOR_CENTAVOS,
                data: date(2024, 6, 1),
            },
        )
        .await
        .unwrap();

    let page = registry
        .list(&LancamentoFilter::default(), &ListParams::default(), &PaginationConfig::default())
        .await
        .unwrap();
    assert_eq!(page.resumo.saldo_centavos, MAX_VALOR_CENTAVOS);

    let emendas = EmendaRegistry::new(&db);
    assert!(matches!(
        emendas.create(admin.id, emenda(i64::MAX)).await,
        Err(MandatoError::ValidationError(_))
    ));
}

#[tokio::test]
async fn test_despesa_defaults_to_pending() {
    let db = setup_test_db().await;
    let admin = create_admin(&db).await;
    let registry = DespesaRegistry::new(&db);

    let despesa: DespesaPayload = serde_json::from_value(serde_json::json!({
        "descricao": "Conta de energia",
        "categoria": "Utilidades",
        "fornecedor": "Distribuidora",
        "numero_nota": "  ",
        "valor_centavos": 45_678,
        "vencimento": "2024-07-10"
    }))
    .unwrap();
    let criada = registry.create(admin.id, despesa).await.unwrap();
    assert_eq!(criada.status, StatusDespesa::Pendente);
    assert_eq!(criada.numero_nota, None);

    let pendentes = registry
        .search(
            &DespesaFilter {
                status: Some(StatusDespesa::Pendente),
                vencimento_fim: Some(date(2024, 7, 31)),
                ..Default::default()
            },
            "",
        )
        .await
        .unwrap();
    assert_eq!(pendentes.len(), 1);
}

#[tokio::test]
async fn test_doacoes_need_a_valid_donor() {
    let db = setup_test_db().await;
    let admin = create_admin(&db).await;
    let registry = DoacaoRegistry::new(&db);

    let invalido = DoadorPayload {
        nome: "Empresa X".to_string(),
        cpf_cnpj: "11.111.111/1111-11".to_string(),
        email: None,
        telefone: None,
    };
    assert!(matches!(
        registry.create_doador(admin.id, invalido).await,
        Err(MandatoError::ValidationError(_))
    ));

    let doador = registry
        .create_doador(
            admin.id,
            DoadorPayload {
                nome: "Comércio Bom Preço Ltda".to_string(),
                cpf_cnpj: "11.222.333/0001-81".to_string(),
                email: Some("Contato@BomPreco.com.br".to_string()),
                telefone: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(doador.cpf_cnpj, "11222333000181");
    assert_eq!(doador.email.as_deref(), Some("contato@bompreco.com.br"));

    for (valor_centavos, dia) in [(500_00, 3), (1_200_00, 18)] {
        registry
            .create(
                admin.id,
                DoacaoPayload {
                    doador_id: doador.id,
                    valor_centavos,
                    data: date(2024, 9, dia),
                    recibo: Some(format!("REC-{}", dia)),
                },
            )
            .await
            .unwrap();
    }

    let page = registry
        .list(
            &DoacaoFilter {
                doador_id: Some(doador.id),
                ..Default::default()
            },
            &ListParams::default(),
            &PaginationConfig::default(),
        )
        .await
        .unwrap();
    assert_eq!(page.page.total_items, 2);
    assert_eq!(page.total_centavos, 1_700_00);
    assert!(page.page.items.iter().all(|d| d.doador_nome == "Comércio Bom Preço Ltda"));

    // donors with donations cannot be removed
    assert!(matches!(
        registry.delete_doador(admin.id, doador.id).await,
        Err(MandatoError::Conflict(_))
    ));
}
