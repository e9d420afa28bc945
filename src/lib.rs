pub mod atendimento;
pub mod audit;
pub mod auth;
pub mod cadastros;
pub mod comunicacao;
pub mod config;
pub mod configuracoes;
pub mod database;
pub mod documentos;
pub mod error;
pub mod export;
pub mod financeiro;
pub mod listing;
pub mod orcamento;
pub mod routes;
pub mod state;
pub mod validation;

pub use error::MandatoError;
