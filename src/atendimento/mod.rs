//! Service desk: voter interactions, calendar and citizen requests
pub mod agenda;
pub mod atendimentos;
pub mod solicitacoes;

pub use agenda::{AgendaRegistry, Evento, EventoFilter, EventoPayload};
pub use atendimentos::{Atendimento, AtendimentoFilter, AtendimentoPayload, AtendimentoRegistry};
pub use solicitacoes::{
    HistoricoSolicitacao, MudancaStatus, Solicitacao, SolicitacaoFilter, SolicitacaoPayload,
    SolicitacaoRegistry,
};
