//! Create command handler

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use pqr_core::notify::{notifier_from_config, notify_created};
use pqr_core::{Config, PqrRecord};

use super::Store;
use crate::output::Output;

/// Intake form fields
#[derive(Args, Debug, Default)]
pub struct CreateArgs {
    /// Requester email (defaults to user_email from config)
    #[arg(short, long)]
    pub email: Option<String>,
    /// Order number (pedido)
    #[arg(long)]
    pub order: String,
    /// Dispatch number (despacho)
    #[arg(long, default_value = "")]
    pub dispatch: String,
    /// Carrier (transportador)
    #[arg(long, default_value = "")]
    pub carrier: String,
    /// Carrier waybill (guía)
    #[arg(long, default_value = "")]
    pub waybill: String,
    /// Item code
    #[arg(long, default_value = "")]
    pub item: String,
    /// Quantity affected
    #[arg(long, default_value_t = 0)]
    pub quantity: u32,
    /// Purchase order (OC)
    #[arg(long, default_value = "")]
    pub purchase_order: String,
    /// Item description
    #[arg(long, default_value = "")]
    pub item_description: String,
    /// Line of business (e.g. "Línea 1")
    #[arg(long, default_value = "")]
    pub business_line: String,
    /// Claim type (Avería, Pérdida, Expoliación, Siniestro)
    #[arg(long, default_value = "")]
    pub claim_type: String,
    /// What happened
    #[arg(short, long)]
    pub description: String,
    /// Evidence files (repeatable; kept for this session only)
    #[arg(long = "attach", value_name = "FILE")]
    pub attachments: Vec<PathBuf>,
}

/// File a new record
pub fn create(store: &mut Store, config: &Config, args: CreateArgs, output: &Output) -> Result<()> {
    let draft = build_draft(args, config)?;
    draft.validate().context("Record is incomplete")?;

    let record = store.create(draft).context("Failed to create record")?;

    // Creation stands even if the notification fails
    match notifier_from_config(config) {
        Ok(notifier) => {
            if let Err(e) = notify_created(notifier.as_ref(), &record) {
                tracing::warn!("Notification for {} failed: {}", record.id, e);
                output.warn(&format!("Created {} but notification failed: {}", record.id, e));
            }
        }
        Err(e) => {
            tracing::warn!("Notifier unavailable: {}", e);
            output.warn(&format!("Created {} but notification is not sent: {}", record.id, e));
        }
    }

    output.success(&format!("Created record: {}", record.id));
    output.print_record(&record);

    Ok(())
}

/// Turn form fields into a draft record, reading attachment sizes from disk
fn build_draft(args: CreateArgs, config: &Config) -> Result<PqrRecord> {
    let email = args
        .email
        .or_else(|| config.user_email.clone())
        .unwrap_or_default();

    let mut draft = PqrRecord::draft(email.trim());
    draft.order = args.order;
    draft.dispatch = args.dispatch;
    draft.carrier = args.carrier;
    draft.waybill = args.waybill;
    draft.item = args.item;
    draft.quantity = args.quantity;
    draft.purchase_order = args.purchase_order;
    draft.item_description = args.item_description;
    draft.description = args.description;
    draft.business_line = args.business_line;
    draft.claim_type = args.claim_type;

    for path in args.attachments {
        let metadata = std::fs::metadata(&path)
            .with_context(|| format!("Cannot read attachment {:?}", path))?;
        draft.attach(path, metadata.len());
    }

    Ok(draft)
}
