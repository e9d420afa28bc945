//! Messaging: mass dispatch, single messages and birthday greetings
pub mod aniversariantes;
pub mod disparo;
pub mod gateway;
pub mod mensagens;

pub use aniversariantes::{
    Aniversariante, AniversarianteQuery, AniversarianteRegistry, FelicitacaoRequest, Periodo,
};
pub use disparo::{Destinatario, Disparo, DisparoRequest, DisparoResultado, Dispatcher};
pub use gateway::Gateway;
pub use mensagens::{Contato, Mensagem, MensagemPayload, MensagemRegistry};
