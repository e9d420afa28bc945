use csv::Writer;

use super::Exportable;
use crate::error::MandatoError;

/// Header row followed by one record per row, UTF-8 with BOM so spreadsheet
/// apps pick up the accents.
pub fn to_csv<T: Exportable>(rows: &[T]) -> Result<Vec<u8>, MandatoError> {
    let mut buffer = vec![0xEF, 0xBB, 0xBF];
    {
        let mut wtr = Writer::from_writer(&mut buffer);
        wtr.write_record(T::headers())
            .map_err(|e| MandatoError::ExportError(format!("Failed to write CSV header: {}", e)))?;

        for row in rows {
            wtr.write_record(row.row())
                .map_err(|e| MandatoError::ExportError(format!("Failed to write CSV row: {}", e)))?;
        }

        wtr.flush()?;
    }
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Pessoa(&'static str, &'static str);

    impl Exportable for Pessoa {
        fn headers() -> &'static [&'static str] {
            &["nome", "bairro"]
        }

        fn row(&self) -> Vec<String> {
            vec![self.0.to_string(), self.1.to_string()]
        }
    }

    #[test]
    fn test_csv_quotes_and_accents() {
        let bytes = to_csv(&[Pessoa("Silva, José", "Várzea")]).unwrap();
        let text = String::from_utf8(bytes[3..].to_vec()).unwrap();

        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("nome,bairro"));
        assert_eq!(lines.next(), Some("\"Silva, José\",Várzea"));
        assert_eq!(lines.next(), None);
    }
}
