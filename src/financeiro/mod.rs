//! Office finances: cash book, bills, donors and donations
pub mod despesas;
pub mod doacoes;
pub mod lancamentos;

pub use despesas::{Despesa, DespesaFilter, DespesaPayload, DespesaRegistry};
pub use doacoes::{
    Doacao, DoacaoFilter, DoacaoPayload, DoacaoRegistry, DoacoesPage, Doador, DoadorPayload,
};
pub use lancamentos::{
    Lancamento, LancamentoFilter, LancamentoPayload, LancamentoRegistry, LancamentosPage,
    ResumoFinanceiro,
};
