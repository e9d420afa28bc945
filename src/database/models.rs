//! Enumerated column types shared across tables.
//!
//! Every enum is stored as TEXT and accepts only its declared value set,
//! both from JSON payloads and from the database.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::MandatoError;

macro_rules! text_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:tt),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
        pub enum $name {
            $(
                #[serde(rename = $text)]
                #[sqlx(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = MandatoError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_uppercase().as_str() {
                    $($text => Ok($name::$variant),)+
                    _ => Err(MandatoError::BadRequest(format!(
                        "Invalid {}: {}",
                        stringify!($name),
                        s
                    ))),
                }
            }
        }
    };
}

text_enum! {
    /// User role
    Perfil {
        Administrador => "ADMINISTRADOR",
        Lideranca => "LIDERANCA",
        Operador => "OPERADOR",
    }
}

text_enum! {
    StatusSolicitacao {
        Novo => "NOVO",
        EmAndamento => "EM_ANDAMENTO",
        Atendido => "ATENDIDO",
        Recusado => "RECUSADO",
    }
}

text_enum! {
    Prioridade {
        Baixa => "BAIXA",
        Media => "MÉDIA",
        Alta => "ALTA",
        Urgente => "URGENTE",
    }
}

text_enum! {
    StatusEmenda {
        Proposta => "PROPOSTA",
        Aprovada => "APROVADA",
        Empenhada => "EMPENHADA",
        Paga => "PAGA",
        Cancelada => "CANCELADA",
    }
}

text_enum! {
    TipoLancamento {
        Entrada => "ENTRADA",
        Saida => "SAIDA",
    }
}

text_enum! {
    StatusDespesa {
        Pendente => "PENDENTE",
        Paga => "PAGA",
        Cancelada => "CANCELADA",
    }
}

text_enum! {
    /// Messaging channel
    Canal {
        Whatsapp => "WHATSAPP",
        Sms => "SMS",
        Email => "EMAIL",
    }
}

text_enum! {
    Direcao {
        Enviada => "ENVIADA",
        Recebida => "RECEBIDA",
    }
}

text_enum! {
    /// Recipient group of a mass dispatch
    TipoDestinatario {
        Eleitores => "ELEITORES",
        Liderancas => "LIDERANCAS",
        Funcionarios => "FUNCIONARIOS",
        Aniversariantes => "ANIVERSARIANTES",
    }
}

text_enum! {
    AcaoAuditoria {
        Criar => "CRIAR",
        Atualizar => "ATUALIZAR",
        Excluir => "EXCLUIR",
        AlterarStatus => "ALTERAR_STATUS",
        Disparo => "DISPARO",
        Exportar => "EXPORTAR",
        AlterarSenha => "ALTERAR_SENHA",
    }
}

impl Default for StatusSolicitacao {
    fn default() -> Self {
        StatusSolicitacao::Novo
    }
}

impl Default for Prioridade {
    fn default() -> Self {
        Prioridade::Media
    }
}

impl Perfil {
    pub fn is_admin(&self) -> bool {
        matches!(self, Perfil::Administrador)
    }
}

/// `123456` → `R$ 1.234,56`
pub fn format_centavos(centavos: i64) -> String {
    let negative = centavos < 0;
    let abs = centavos.unsigned_abs();
    let reais = (abs / 100).to_string();
    let cents = abs % 100;

    let mut grouped = String::new();
    for (i, ch) in reais.chars().enumerate() {
        if i > 0 && (reais.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    format!(
        "{}R$ {},{:02}",
        if negative { "-" } else { "" },
        grouped,
        cents
    )
}

/// Optional value rendered for tables and exports
pub fn display_opt<T: fmt::Display>(value: &Option<T>) -> String {
    value.as_ref().map(|v| v.to_string()).unwrap_or_default()
}
