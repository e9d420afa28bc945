//! People registries: voters, local leaderships and office staff

pub mod eleitores;
pub mod funcionarios;
pub mod liderancas;

pub use eleitores::{Eleitor, EleitorFilter, EleitorPayload, EleitorRegistry};
pub use funcionarios::{Funcionario, FuncionarioFilter, FuncionarioPayload, FuncionarioRegistry};
pub use liderancas::{Lideranca, LiderancaFilter, LiderancaPayload, LiderancaRegistry};
