//! Birthdays across voters, leaderships and staff

use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::database::models::Canal;
use crate::database::Database;
use crate::error::MandatoError;
use crate::validation::FieldErrors;

/// Inactive leaderships and staff are left out
const SELECT_ANIVERSARIANTES: &str = r#"
    SELECT 'ELEITOR' AS origem, id, nome, data_nascimento, telefone, whatsapp, email
    FROM eleitores WHERE data_nascimento IS NOT NULL
    UNION ALL
    SELECT 'LIDERANCA' AS origem, id, nome, data_nascimento, telefone, whatsapp, email
    FROM liderancas WHERE data_nascimento IS NOT NULL AND ativo = 1
    UNION ALL
    SELECT 'FUNCIONARIO' AS origem, id, nome, data_nascimento, telefone, whatsapp, email
    FROM funcionarios WHERE data_nascimento IS NOT NULL AND ativo = 1
"#;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Aniversariante {
    pub origem: String,
    pub id: i64,
    pub nome: String,
    pub data_nascimento: NaiveDate,
    pub telefone: Option<String>,
    pub whatsapp: Option<String>,
    pub email: Option<String>,
}

impl Aniversariante {
    /// Age completed on `dia`
    pub fn idade_em(&self, dia: NaiveDate) -> i32 {
        let mut idade = dia.year() - self.data_nascimento.year();
        if (dia.month(), dia.day()) < (self.data_nascimento.month(), self.data_nascimento.day()) {
            idade -= 1;
        }
        idade
    }
}

/// Query string of the birthday screen: `?mes=5` or `?data=2024-05-10`;
/// neither means today
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AniversarianteQuery {
    pub data: Option<NaiveDate>,
    pub mes: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Periodo {
    Dia(NaiveDate),
    Mes(u32),
}

impl AniversarianteQuery {
    pub fn periodo(&self) -> Result<Periodo, MandatoError> {
        match (self.mes, self.data) {
            (Some(mes), _) if !(1..=12).contains(&mes) => {
                let mut errors = FieldErrors::new();
                errors.add("mes", "mês deve estar entre 1 e 12");
                Err(errors.into())
            }
            (Some(mes), _) => Ok(Periodo::Mes(mes)),
            (None, Some(data)) => Ok(Periodo::Dia(data)),
            (None, None) => Ok(Periodo::Dia(Utc::now().date_naive())),
        }
    }
}

/// Greeting request for everyone born on `data` (today when omitted)
#[derive(Debug, Clone, Deserialize)]
pub struct FelicitacaoRequest {
    pub data: Option<NaiveDate>,
    pub canais: Vec<Canal>,
}

impl Periodo {
    /// Feb 29 birthdays are celebrated on Feb 28 in common years
    pub fn inclui(&self, nascimento: NaiveDate) -> bool {
        match *self {
            Periodo::Mes(mes) => nascimento.month() == mes,
            Periodo::Dia(dia) => {
                let (mes, d) = (nascimento.month(), nascimento.day());
                if (mes, d) == (dia.month(), dia.day()) {
                    return true;
                }
                mes == 2 && d == 29 && dia.month() == 2 && dia.day() == 28 && !is_leap_year(dia.year())
            }
        }
    }
}

fn is_leap_year(year: i32) -> bool {
    NaiveDate::from_ymd_opt(year, 2, 29).is_some()
}

#[derive(Clone)]
pub struct AniversarianteRegistry {
    pool: SqlitePool,
}

impl AniversarianteRegistry {
    pub fn new(database: &Database) -> Self {
        Self {
            pool: database.pool().clone(),
        }
    }

    /// Ordered by day of month, then name
    pub async fn list(&self, periodo: Periodo) -> Result<Vec<Aniversariante>, MandatoError> {
        let all = sqlx::query_as::<_, Aniversariante>(SELECT_ANIVERSARIANTES)
            .fetch_all(&self.pool)
            .await?;

        let mut rows: Vec<Aniversariante> = all
            .into_iter()
            .filter(|a| periodo.inclui(a.data_nascimento))
            .collect();
        rows.sort_by(|a, b| {
            a.data_nascimento
                .day()
                .cmp(&b.data_nascimento.day())
                .then_with(|| a.nome.to_lowercase().cmp(&b.nome.to_lowercase()))
        });
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_day_ignores_birth_year() {
        let periodo = Periodo::Dia(d(2024, 5, 10));
        assert!(periodo.inclui(d(1980, 5, 10)));
        assert!(!periodo.inclui(d(1980, 5, 11)));
        assert!(Periodo::Mes(5).inclui(d(1990, 5, 31)));
        assert!(!Periodo::Mes(6).inclui(d(1990, 5, 31)));
    }

    #[test]
    fn test_leap_day_birthdays_in_common_years() {
        let nascimento = d(2000, 2, 29);
        assert!(Periodo::Dia(d(2023, 2, 28)).inclui(nascimento));
        assert!(!Periodo::Dia(d(2024, 2, 28)).inclui(nascimento));
        assert!(Periodo::Dia(d(2024, 2, 29)).inclui(nascimento));
    }

    #[test]
    fn test_month_out_of_range() {
        let query = AniversarianteQuery { data: None, mes: Some(13) };
        assert!(query.periodo().is_err());

        let query = AniversarianteQuery { data: Some(d(2024, 1, 2)), mes: None };
        assert_eq!(query.periodo().unwrap(), Periodo::Dia(d(2024, 1, 2)));
    }

    #[test]
    fn test_age_on_day() {
        let a = Aniversariante {
            origem: "ELEITOR".to_string(),
            id: 1,
            nome: "Ana".to_string(),
            data_nascimento: d(1990, 5, 10),
            telefone: None,
            whatsapp: None,
            email: None,
        };
        assert_eq!(a.idade_em(d(2024, 5, 10)), 34);
        assert_eq!(a.idade_em(d(2024, 5, 9)), 33);
    }
}
