//! Record command handlers: list, search, show and edit

use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use clap::Args;

use pqr_core::{PqrRecord, PqrStatus};

use super::Store;
use crate::output::Output;

/// Workflow fields an editor may change
///
/// Fields left out keep their current value. An empty string clears an
/// optional text field.
#[derive(Args, Debug, Default, Clone)]
pub struct EditArgs {
    /// Workflow status (Pendiente, En Proceso, Autorizado, Rechazado)
    #[arg(long)]
    pub status: Option<PqrStatus>,
    #[arg(long)]
    pub authorized_by: Option<String>,
    /// Authorization date (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub authorization_date: Option<NaiveDate>,
    #[arg(long)]
    pub replacement_po: Option<String>,
    #[arg(long)]
    pub replacement_dispatch: Option<String>,
    #[arg(long)]
    pub pickup_waybill: Option<String>,
    #[arg(long)]
    pub declared_value: Option<f64>,
    #[arg(long)]
    pub freight_value: Option<f64>,
    /// Credit note date (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub credit_note_date: Option<NaiveDate>,
    /// Supporting document number (DOC)
    #[arg(long)]
    pub document: Option<String>,
    #[arg(long)]
    pub salvage_po: Option<String>,
    #[arg(long)]
    pub merchandise_condition: Option<String>,
    #[arg(long)]
    pub physical: Option<String>,
    #[arg(long)]
    pub salvage_waybill: Option<String>,
    #[arg(long)]
    pub final_status: Option<String>,
}

impl EditArgs {
    /// Whether any field was given
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.authorized_by.is_none()
            && self.authorization_date.is_none()
            && self.replacement_po.is_none()
            && self.replacement_dispatch.is_none()
            && self.pickup_waybill.is_none()
            && self.declared_value.is_none()
            && self.freight_value.is_none()
            && self.credit_note_date.is_none()
            && self.document.is_none()
            && self.salvage_po.is_none()
            && self.merchandise_condition.is_none()
            && self.physical.is_none()
            && self.salvage_waybill.is_none()
            && self.final_status.is_none()
    }

    /// Copy the given fields onto `record`
    pub fn apply(self, record: &mut PqrRecord) {
        if let Some(status) = self.status {
            record.status = status;
        }
        set_text(&mut record.authorized_by, self.authorized_by);
        set_date(&mut record.authorization_date, self.authorization_date);
        set_text(&mut record.replacement_po, self.replacement_po);
        set_text(&mut record.replacement_dispatch, self.replacement_dispatch);
        set_text(&mut record.pickup_waybill, self.pickup_waybill);
        if let Some(v) = self.declared_value {
            record.declared_value = Some(v);
        }
        if let Some(v) = self.freight_value {
            record.freight_value = Some(v);
        }
        set_date(&mut record.credit_note_date, self.credit_note_date);
        set_text(&mut record.document, self.document);
        set_text(&mut record.salvage_po, self.salvage_po);
        set_text(&mut record.merchandise_condition, self.merchandise_condition);
        set_text(&mut record.physical, self.physical);
        set_text(&mut record.salvage_waybill, self.salvage_waybill);
        set_text(&mut record.final_status, self.final_status);
    }
}

fn set_text(field: &mut Option<String>, value: Option<String>) {
    if let Some(v) = value {
        *field = if v.trim().is_empty() { None } else { Some(v) };
    }
}

/// Dates are stored as midnight UTC of the given day
fn set_date(field: &mut Option<DateTime<Utc>>, value: Option<NaiveDate>) {
    if let Some(day) = value {
        *field = day.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    }
}

/// List all records
pub fn list(store: &Store, output: &Output) -> Result<()> {
    let records = store.list_all().context("Failed to load records")?;
    output.print_records(&records);
    Ok(())
}

/// Search records
pub fn search(store: &Store, term: String, output: &Output) -> Result<()> {
    let records = store.search(&term).context("Failed to search records")?;
    output.print_records(&records);
    Ok(())
}

/// Show a single record
pub fn show(store: &Store, id: String, output: &Output) -> Result<()> {
    let record = find_record(store, &id)?;
    output.print_record(&record);
    Ok(())
}

/// Update workflow fields of a record
pub fn edit(store: &mut Store, id: String, changes: EditArgs, output: &Output) -> Result<()> {
    if changes.is_empty() {
        bail!("Nothing to change. Pass at least one field, e.g. --status Autorizado");
    }

    let mut record = find_record(store, &id)?;
    changes.apply(&mut record);

    store.update(&record).context("Failed to update record")?;

    output.success(&format!("Updated record: {}", record.id));
    output.print_record(&record);

    Ok(())
}

/// Resolve an operator-typed id to a stored record
pub(crate) fn find_record(store: &Store, id: &str) -> Result<PqrRecord> {
    store
        .find(id)?
        .ok_or_else(|| anyhow::anyhow!("Record not found: {}", id))
}
