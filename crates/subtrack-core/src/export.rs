use crate::files::{ensure_parent, write_atomic};
use crate::{models::Subscription, Error, Result};
use chrono::NaiveDate;
use std::path::Path;
use tracing::info;

/// CSV header row, in column order
pub const CSV_HEADER: &str = "name,date,price,category,status,daysRemaining,notes";

/// Export format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "json" => Some(ExportFormat::Json),
            "csv" => Some(ExportFormat::Csv),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
        }
    }
}

/// Exporter for subscription lists
pub struct Exporter;

impl Exporter {
    /// Export to a file, picking the format from its extension
    pub fn export_to_file<P: AsRef<Path>>(
        subscriptions: &[Subscription],
        path: P,
        today: NaiveDate,
    ) -> Result<()> {
        let path = path.as_ref();

        let format = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(ExportFormat::from_extension)
            .ok_or_else(|| {
                Error::ConfigError(
                    "Could not determine export format from extension. Use .json or .csv"
                        .to_string(),
                )
            })?;

        Self::export_to_file_with_format(subscriptions, path, format, today)
    }

    /// Export to a file with an explicit format
    ///
    /// Content goes to a temp file first and is renamed into place, so a
    /// failed export never leaves a truncated file at `path`.
    pub fn export_to_file_with_format<P: AsRef<Path>>(
        subscriptions: &[Subscription],
        path: P,
        format: ExportFormat,
        today: NaiveDate,
    ) -> Result<()> {
        let path = path.as_ref();
        let content = match format {
            ExportFormat::Json => Self::to_json(subscriptions)?,
            ExportFormat::Csv => Self::to_csv(subscriptions, today),
        };

        ensure_parent(path)?;
        write_atomic(path, content.as_bytes())?;

        info!(
            "Exported {} subscriptions as {} to {}",
            subscriptions.len(),
            format.extension(),
            path.display()
        );
        Ok(())
    }

    /// Same shape as the store file, so an export can be loaded back
    pub fn to_json(subscriptions: &[Subscription]) -> Result<String> {
        Ok(serde_json::to_string_pretty(subscriptions)?)
    }

    /// CSV with status and days remaining worked out as of `today`
    pub fn to_csv(subscriptions: &[Subscription], today: NaiveDate) -> String {
        let mut output = String::new();

        output.push_str(CSV_HEADER);
        output.push('\n');

        for sub in subscriptions {
            output.push_str(&format!(
                "{},{},{:.2},{},{},{},{}\n",
                Self::escape_csv(&sub.name),
                sub.date_str(),
                sub.price,
                Self::escape_csv(&sub.category),
                sub.status(today).label(),
                sub.days_remaining(today),
                Self::escape_csv(&sub.notes),
            ));
        }

        output
    }

    /// Escape CSV special characters
    fn escape_csv(s: &str) -> String {
        if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
            format!("\"{}\"", s.replace('"', "\"\""))
        } else {
            s.to_string()
        }
    }
}
