//! Comment command handler

use anyhow::{Context, Result};

use pqr_core::Config;

use super::record::find_record;
use super::Store;
use crate::output::Output;

/// Append a comment to a record's trace
pub fn add(
    store: &mut Store,
    config: &Config,
    id: String,
    text: String,
    author: Option<String>,
    output: &Output,
) -> Result<()> {
    let author = author
        .or_else(|| config.user_email.clone())
        .filter(|a| !a.trim().is_empty())
        .ok_or_else(|| {
            anyhow::anyhow!(
                "No comment author. Pass --author or set one with:\n  pqr config set user_email you@example.com"
            )
        })?;

    let mut record = find_record(store, &id)?;
    let comment = record
        .add_comment(text, author)
        .context("Invalid comment")?;

    store.update(&record).context("Failed to save comment")?;

    output.success(&format!("Comment added to {}", record.id));
    output.print_comment(&comment);

    Ok(())
}
