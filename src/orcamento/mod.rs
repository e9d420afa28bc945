//! Budget amendments (emendas parlamentares)
pub mod emendas;

pub use emendas::{
    Emenda, EmendaDetalhe, EmendaFilter, EmendaPayload, EmendaRegistry, Repasse, RepassePayload,
};
