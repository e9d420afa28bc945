//! Form validation
//!
//! Field-level checks run before any write. A failed check never touches
//! the database; the caller gets every failing field at once.

use chrono::NaiveDate;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

/// Largest single amount accepted (R$ 100 bilhões), so totals stay far from i64 limits
pub const MAX_VALOR_CENTAVOS: i64 = 10_000_000_000_000;

/// Field name → messages, ordered by field name for stable output
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(|v| v.as_slice())
    }

    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    pub fn required(&mut self, field: &str, value: &str) {
        if value.trim().is_empty() {
            self.add(field, "campo obrigatório");
        }
    }

    pub fn max_len(&mut self, field: &str, value: &str, max: usize) {
        if value.chars().count() > max {
            self.add(field, format!("máximo de {} caracteres", max));
        }
    }

    pub fn optional_email(&mut self, field: &str, value: Option<&str>) {
        if let Some(v) = value.filter(|v| !v.trim().is_empty()) {
            if !is_valid_email(v) {
                self.add(field, "e-mail inválido");
            }
        }
    }

    pub fn optional_cpf(&mut self, field: &str, value: Option<&str>) {
        if let Some(v) = value.filter(|v| !v.trim().is_empty()) {
            if !is_valid_cpf(v) {
                self.add(field, "CPF inválido");
            }
        }
    }

    pub fn optional_uf(&mut self, field: &str, value: Option<&str>) {
        if let Some(v) = value.filter(|v| !v.trim().is_empty()) {
            if !is_valid_uf(v) {
                self.add(field, "UF deve ter duas letras maiúsculas");
            }
        }
    }

    pub fn positive_amount(&mut self, field: &str, centavos: i64) {
        if centavos <= 0 {
            self.add(field, "valor deve ser maior que zero");
        } else if centavos > MAX_VALOR_CENTAVOS {
            self.add(field, "valor acima do limite permitido");
        }
    }

    pub fn date_order(&mut self, field: &str, start: NaiveDate, end: NaiveDate) {
        if end < start {
            self.add(field, "data final anterior à inicial");
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|(field, msgs)| format!("{}: {}", field, msgs.join(", ")))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

/// Implemented by every create/update payload
pub trait Validate {
    fn validate(&self) -> Result<(), FieldErrors>;
}

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email regex is valid")
    })
}

pub fn is_valid_email(value: &str) -> bool {
    email_regex().is_match(value.trim())
}

/// Strip everything but digits
pub fn digits_only(value: &str) -> String {
    value.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// CPF with both check digits. Punctuation is ignored.
pub fn is_valid_cpf(value: &str) -> bool {
    let digits: Vec<u32> = digits_only(value)
        .chars()
        .filter_map(|c| c.to_digit(10))
        .collect();

    if digits.len() != 11 || digits.iter().all(|d| *d == digits[0]) {
        return false;
    }

    let check = |len: usize| -> u32 {
        let sum: u32 = digits[..len]
            .iter()
            .enumerate()
            .map(|(i, d)| d * (len as u32 + 1 - i as u32))
            .sum();
        let rest = (sum * 10) % 11;
        if rest == 10 {
            0
        } else {
            rest
        }
    };

    check(9) == digits[9] && check(10) == digits[10]
}

/// CNPJ with both check digits. Punctuation is ignored.
pub fn is_valid_cnpj(value: &str) -> bool {
    let digits: Vec<u32> = digits_only(value)
        .chars()
        .filter_map(|c| c.to_digit(10))
        .collect();

    if digits.len() != 14 || digits.iter().all(|d| *d == digits[0]) {
        return false;
    }

    let check = |weights: &[u32]| -> u32 {
        let sum: u32 = digits
            .iter()
            .zip(weights.iter())
            .map(|(d, w)| d * w)
            .sum();
        let rest = sum % 11;
        if rest < 2 {
            0
        } else {
            11 - rest
        }
    };

    let first = check(&[5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2]);
    let second = check(&[6, 5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2]);
    first == digits[12] && second == digits[13]
}

pub fn is_valid_cpf_cnpj(value: &str) -> bool {
    match digits_only(value).len() {
        11 => is_valid_cpf(value),
        14 => is_valid_cnpj(value),
        _ => false,
    }
}

pub fn is_valid_uf(value: &str) -> bool {
    value.len() == 2 && value.chars().all(|c| c.is_ascii_uppercase())
}

/// Empty strings from form inputs are stored as NULL
pub fn blank_to_none(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// CPF/CNPJ are stored as bare digits
pub fn normalize_document(value: Option<String>) -> Option<String> {
    blank_to_none(value).map(|v| digits_only(&v))
}

/// `52998224725` → `529.982.247-25`; anything else is returned unchanged
pub fn format_cpf(value: &str) -> String {
    let d = digits_only(value);
    if d.len() != 11 {
        return value.to_string();
    }
    format!("{}.{}.{}-{}", &d[0..3], &d[3..6], &d[6..9], &d[9..11])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpf_validation() {
        assert!(is_valid_cpf("529.982.247-25"));
        assert!(is_valid_cpf("52998224725"));
        assert!(!is_valid_cpf("529.982.247-26"));
        assert!(!is_valid_cpf("111.111.111-11"));
        assert!(!is_valid_cpf("1234"));
    }

    #[test]
    fn test_cnpj_validation() {
        assert!(is_valid_cnpj("11.222.333/0001-81"));
        assert!(!is_valid_cnpj("11.222.333/0001-82"));
        assert!(is_valid_cpf_cnpj("11222333000181"));
        assert!(is_valid_cpf_cnpj("529.982.247-25"));
        assert!(!is_valid_cpf_cnpj("123"));
    }

    #[test]
    fn test_email_validation() {
        assert!(is_valid_email("gabinete@camara.gov.br"));
        assert!(!is_valid_email("gabinete.camara.gov.br"));
        assert!(!is_valid_email("a b@c.d"));
    }

    #[test]
    fn test_required_field_error() {
        let mut errors = FieldErrors::new();
        errors.required("nome", "   ");
        errors.required("cidade", "Recife");

        assert!(errors.has("nome"));
        assert!(!errors.has("cidade"));
        assert_eq!(errors.get("nome").unwrap(), ["campo obrigatório"]);
        assert!(errors.into_result().is_err());
    }

    #[test]
    fn test_amount_bounds() {
        let mut errors = FieldErrors::new();
        errors.positive_amount("zero", 0);
        errors.positive_amount("teto", MAX_VALOR_CENTAVOS);
        errors.positive_amount("acima", MAX_VALOR_CENTAVOS + 1);
        errors.positive_amount("maximo", i64::MAX);

        assert!(errors.has("zero"));
        assert!(!errors.has("teto"));
        assert!(errors.has("acima"));
        assert!(errors.has("maximo"));
    }

    #[test]
    fn test_document_normalization() {
        assert_eq!(
            normalize_document(Some("529.982.247-25".to_string())),
            Some("52998224725".to_string())
        );
        assert_eq!(format_cpf("52998224725"), "529.982.247-25");
        assert_eq!(format_cpf("123"), "123");
    }

    #[test]
    fn test_blank_to_none() {
        assert_eq!(blank_to_none(Some("  ".to_string())), None);
        assert_eq!(blank_to_none(Some(" x ".to_string())), Some("x".to_string()));
        assert_eq!(blank_to_none(None), None);
    }
}
