//! Spreadsheet export
//!
//! Projects records into a fixed set of columns and writes them as a single
//! `PQRs` sheet of an `.xlsx` workbook. The projection is read-only.

use std::path::Path;

use chrono::{DateTime, Utc};
use rust_xlsxwriter::{Format, Workbook, XlsxError};
use thiserror::Error;

use crate::models::PqrRecord;

/// Default workbook file name
pub const DEFAULT_EXPORT_FILE: &str = "reporte-pqrs.xlsx";

/// Name of the sheet holding the records
pub const SHEET_NAME: &str = "PQRs";

/// Longest text a worksheet cell accepts
pub const MAX_CELL_CHARS: usize = 32_767;

const TRUNCATION_MARK: &str = "...";

/// Column headers, in sheet order
pub const EXPORT_HEADERS: [&str; 27] = [
    "PQR",
    "Pedido",
    "Despacho",
    "Transportador",
    "Item",
    "Cantidad",
    "OC",
    "Descripción Item",
    "Línea de Negocio",
    "Tipo PQR",
    "Descripción",
    "Estado PQR",
    "Autorizado Por",
    "Fecha Autorización",
    "OC de Reemplazo",
    "Despacho de Reemplazo",
    "Guía de Recolección",
    "Valor Declarado",
    "Valor Flete",
    "Fecha NC",
    "DOC",
    "OC Salvamento",
    "Estado Mercancía",
    "Físico",
    "Guía Salvamento",
    "Estado Final",
    "Comentarios",
];

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Failed to write spreadsheet: {0}")]
    Xlsx(#[from] XlsxError),
}

/// One spreadsheet cell
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
}

impl Cell {
    fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    fn optional(value: &Option<String>) -> Self {
        Cell::Text(value.clone().unwrap_or_default())
    }

    /// Zero and absent amounts both export as a blank cell
    fn amount(value: Option<f64>) -> Self {
        match value {
            Some(v) if v != 0.0 => Cell::Number(v),
            _ => Cell::Text(String::new()),
        }
    }

    fn date(value: &Option<DateTime<Utc>>) -> Self {
        Cell::Text(
            value
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
        )
    }
}

/// Flatten the comment trace into one multi-line cell value
pub fn flatten_comments(record: &PqrRecord) -> String {
    record
        .comments
        .iter()
        .map(|c| {
            format!(
                "{} - {}: {}",
                c.created_at.format("%Y-%m-%d %H:%M:%S"),
                c.created_by,
                c.text
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Cut `text` down to what a cell accepts; the flag reports a cut
fn fit_cell(text: String) -> (String, bool) {
    if text.chars().count() <= MAX_CELL_CHARS {
        return (text, false);
    }
    let mut kept: String = text
        .chars()
        .take(MAX_CELL_CHARS - TRUNCATION_MARK.len())
        .collect();
    kept.push_str(TRUNCATION_MARK);
    (kept, true)
}

/// Project one record into cells aligned with [`EXPORT_HEADERS`]
pub fn export_row(record: &PqrRecord) -> Vec<Cell> {
    vec![
        Cell::text(&record.id),
        Cell::text(&record.order),
        Cell::text(&record.dispatch),
        Cell::text(&record.carrier),
        Cell::text(&record.item),
        Cell::Number(f64::from(record.quantity)),
        Cell::text(&record.purchase_order),
        Cell::text(&record.item_description),
        Cell::text(&record.business_line),
        Cell::text(&record.claim_type),
        Cell::text(&record.description),
        Cell::text(record.status.label()),
        Cell::optional(&record.authorized_by),
        Cell::date(&record.authorization_date),
        Cell::optional(&record.replacement_po),
        Cell::optional(&record.replacement_dispatch),
        Cell::optional(&record.pickup_waybill),
        Cell::amount(record.declared_value),
        Cell::amount(record.freight_value),
        Cell::date(&record.credit_note_date),
        Cell::optional(&record.document),
        Cell::optional(&record.salvage_po),
        Cell::optional(&record.merchandise_condition),
        Cell::optional(&record.physical),
        Cell::optional(&record.salvage_waybill),
        Cell::optional(&record.final_status),
        Cell::text(flatten_comments(record)),
    ]
}

/// Build a workbook with a header row followed by one row per record
pub fn build_workbook(records: &[PqrRecord]) -> Result<Workbook, ExportError> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();

    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET_NAME)?;

    for (col, header) in EXPORT_HEADERS.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *header, &header_format)?;
    }

    for (i, record) in records.iter().enumerate() {
        let row = (i + 1) as u32;
        for (col, cell) in export_row(record).into_iter().enumerate() {
            match cell {
                Cell::Text(s) => {
                    let (s, truncated) = fit_cell(s);
                    if truncated {
                        tracing::warn!(
                            "Truncated '{}' of {} to {} characters",
                            EXPORT_HEADERS[col],
                            record.id,
                            MAX_CELL_CHARS
                        );
                    }
                    worksheet.write_string(row, col as u16, s)?
                }
                Cell::Number(n) => worksheet.write_number(row, col as u16, n)?,
            };
        }
    }

    worksheet.set_freeze_panes(1, 0)?;
    Ok(workbook)
}

/// Write `records` to an `.xlsx` file at `path`
pub fn write_xlsx(records: &[PqrRecord], path: &Path) -> Result<(), ExportError> {
    let mut workbook = build_workbook(records)?;
    workbook.save(path)?;
    tracing::info!("Exported {} records to {:?}", records.len(), path);
    Ok(())
}
