//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use chrono::{DateTime, Utc};
use serde::Serialize;

use pqr_core::{Comment, PqrRecord};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Check if output is in quiet mode
    pub fn is_quiet(&self) -> bool {
        matches!(self.format, OutputFormat::Quiet)
    }

    /// Print a single record with its comment trace
    pub fn print_record(&self, record: &PqrRecord) {
        match self.format {
            OutputFormat::Human => {
                println!("ID:              {}", record.id);
                println!("Estado:          {}", record.status);
                println!("Pedido:          {}", record.order);
                println!("Despacho:        {}", record.dispatch);
                println!("Transportador:   {}", record.carrier);
                println!("Guía:            {}", record.waybill);
                println!("Item:            {}", record.item);
                println!("Cantidad:        {}", record.quantity);
                println!("OC:              {}", record.purchase_order);
                println!("Descripción Item: {}", record.item_description);
                println!("Línea Negocio:   {}", record.business_line);
                println!("Tipo PQR:        {}", record.claim_type);
                println!("Descripción:     {}", record.description);
                println!("Creado por:      {}", record.created_by);
                println!("Creado:          {}", record.created_at.format("%Y-%m-%d %H:%M"));

                let workflow = workflow_lines(record);
                if !workflow.is_empty() {
                    println!();
                    println!("── Seguimiento ──");
                    for (label, value) in workflow {
                        println!("{:<22} {}", format!("{}:", label), value);
                    }
                }

                if !record.attachments.is_empty() {
                    println!();
                    println!("── Archivos ({}) ──", record.attachments.len());
                    for attachment in &record.attachments {
                        println!("{} ({} bytes)", attachment.name(), attachment.size);
                    }
                }

                if !record.comments.is_empty() {
                    println!();
                    println!("── Comentarios ({}) ──", record.comments.len());
                    for comment in &record.comments {
                        println!(
                            "[{}] {}: {}",
                            comment.created_at.format("%Y-%m-%d %H:%M"),
                            comment.created_by,
                            truncate_line(&comment.text, 60)
                        );
                    }
                }
            }
            OutputFormat::Json => print_json(record),
            OutputFormat::Quiet => {
                println!("{}", record.id);
            }
        }
    }

    /// Print a list of records
    pub fn print_records(&self, records: &[PqrRecord]) {
        match self.format {
            OutputFormat::Human => {
                if records.is_empty() {
                    println!("No records found.");
                    return;
                }
                for record in records {
                    let comments_indicator = if record.comments.is_empty() {
                        String::new()
                    } else {
                        format!(" [{}]", record.comments.len())
                    };
                    println!(
                        "{} | {:<10} | {} | {} | {}{}",
                        record.id,
                        record.status,
                        truncate(&record.order, 15),
                        truncate(&record.carrier, 20),
                        truncate(&record.claim_type, 15),
                        comments_indicator
                    );
                }
                println!("\n{} record(s)", records.len());
            }
            OutputFormat::Json => print_json(&records),
            OutputFormat::Quiet => {
                for record in records {
                    println!("{}", record.id);
                }
            }
        }
    }

    /// Print a single comment
    pub fn print_comment(&self, comment: &Comment) {
        match self.format {
            OutputFormat::Human => {
                println!(
                    "[{}] {}: {}",
                    comment.created_at.format("%Y-%m-%d %H:%M"),
                    comment.created_by,
                    comment.text
                );
            }
            OutputFormat::Json => print_json(comment),
            OutputFormat::Quiet => {
                println!("{}", comment.id);
            }
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print a warning to stderr (suppressed in quiet mode)
    pub fn warn(&self, message: &str) {
        if !self.is_quiet() {
            eprintln!("⚠ {}", message);
        }
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{}", s),
        Err(e) => eprintln!("Failed to encode JSON output: {}", e),
    }
}

/// Workflow fields that have been filled in, as (label, value) pairs
fn workflow_lines(record: &PqrRecord) -> Vec<(&'static str, String)> {
    let text = |label, value: &Option<String>| value.clone().map(|v| (label, v));
    let date = |label, value: &Option<DateTime<Utc>>| {
        value.map(|d| (label, d.format("%Y-%m-%d").to_string()))
    };
    let amount = |label, value: Option<f64>| {
        value
            .filter(|v| *v != 0.0)
            .map(|v| (label, format!("{:.2}", v)))
    };

    [
        text("Autorizado Por", &record.authorized_by),
        date("Fecha Autorización", &record.authorization_date),
        text("OC de Reemplazo", &record.replacement_po),
        text("Despacho Reemplazo", &record.replacement_dispatch),
        text("Guía de Recolección", &record.pickup_waybill),
        amount("Valor Declarado", record.declared_value),
        amount("Valor Flete", record.freight_value),
        date("Fecha NC", &record.credit_note_date),
        text("DOC", &record.document),
        text("OC Salvamento", &record.salvage_po),
        text("Estado Mercancía", &record.merchandise_condition),
        text("Físico", &record.physical),
        text("Guía Salvamento", &record.salvage_waybill),
        text("Estado Final", &record.final_status),
    ]
    .into_iter()
    .flatten()
    .collect()
}

/// Truncate a string to max characters, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Truncate to first line and max length
fn truncate_line(s: &str, max_len: usize) -> String {
    let first_line = s.lines().next().unwrap_or("");
    truncate(first_line, max_len)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_flags() {
        assert_eq!(OutputFormat::from_flags(false, false), OutputFormat::Human);
        assert_eq!(OutputFormat::from_flags(true, false), OutputFormat::Json);
        assert_eq!(OutputFormat::from_flags(false, true), OutputFormat::Quiet);
        // Quiet wins over JSON
        assert_eq!(OutputFormat::from_flags(true, true), OutputFormat::Quiet);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a longer carrier name", 10), "a longe...");
        // Multi-byte characters are not split
        assert_eq!(truncate("Línea de Negocio", 8), "Línea...");
    }

    #[test]
    fn test_truncate_line() {
        assert_eq!(truncate_line("first\nsecond", 20), "first");
        assert_eq!(truncate_line("", 20), "");
    }

    #[test]
    fn test_workflow_lines_skip_empty_fields() {
        let mut record = PqrRecord::draft("jdoe@example.com");
        assert!(workflow_lines(&record).is_empty());

        record.authorized_by = Some("jdoe".to_string());
        record.freight_value = Some(42.0);
        let lines = workflow_lines(&record);
        assert_eq!(
            lines,
            vec![
                ("Autorizado Por", "jdoe".to_string()),
                ("Valor Flete", "42.00".to_string()),
            ]
        );
    }
}
