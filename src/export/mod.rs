//! CSV and PDF downloads of list screens

mod csv;
mod pdf;

pub use self::csv::to_csv;
pub use self::pdf::{to_pdf, PdfTable};

use serde::Deserialize;

use crate::error::MandatoError;

/// A row type that can be rendered as a table
pub trait Exportable {
    fn headers() -> &'static [&'static str];
    fn row(&self) -> Vec<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Pdf,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Pdf => "pdf",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv; charset=utf-8",
            ExportFormat::Pdf => "application/pdf",
        }
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = MandatoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "pdf" => Ok(ExportFormat::Pdf),
            other => Err(MandatoError::BadRequest(format!(
                "Unsupported export format: {}",
                other
            ))),
        }
    }
}

/// A rendered file ready to be sent as an attachment
#[derive(Debug, Clone)]
pub struct ExportFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Render `rows` in the requested format. `base_name` becomes the file name.
pub fn render<T: Exportable>(
    format: ExportFormat,
    title: &str,
    base_name: &str,
    rows: &[T],
) -> Result<ExportFile, MandatoError> {
    let bytes = match format {
        ExportFormat::Csv => to_csv(rows)?,
        ExportFormat::Pdf => {
            let cells: Vec<Vec<String>> = rows.iter().map(|r| r.row()).collect();
            to_pdf(title, T::headers(), &cells)
        }
    };

    Ok(ExportFile {
        file_name: format!("{}.{}", base_name, format.as_str()),
        content_type: format.content_type().to_string(),
        bytes,
    })
}
