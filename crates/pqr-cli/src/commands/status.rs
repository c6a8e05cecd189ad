//! Status command handler

use anyhow::Result;

use pqr_core::notify::read_outbox;
use pqr_core::{format_pqr_id, Config, PqrStatus};

use super::Store;
use crate::output::{Output, OutputFormat};

/// Show status information
pub fn show(store: &Store, config: &Config, output: &Output) -> Result<()> {
    let records = store.list_all()?;
    let last_sequence = store.last_sequence()?;
    let by_status: Vec<(PqrStatus, usize)> = PqrStatus::ALL
        .iter()
        .map(|s| (*s, records.iter().filter(|r| r.status == *s).count()))
        .collect();
    let last_id = (last_sequence > 0).then(|| format_pqr_id(last_sequence));
    let queued = match read_outbox(&config.outbox_path()) {
        Ok(queued) => Some(queued.len()),
        Err(e) => {
            tracing::warn!("Cannot read notification outbox: {}", e);
            None
        }
    };

    match output.format {
        OutputFormat::Json => {
            let counts: serde_json::Map<String, serde_json::Value> = by_status
                .iter()
                .map(|(s, n)| (s.label().to_string(), serde_json::json!(n)))
                .collect();
            println!(
                "{}",
                serde_json::json!({
                    "backend": config.backend.to_string(),
                    "data_dir": config.data_dir,
                    "records": records.len(),
                    "last_id": last_id,
                    "by_status": counts,
                    "notify_enabled": config.notify_enabled,
                    "notify_email": config.notify_email,
                    "notifications_queued": queued
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", records.len());
        }
        OutputFormat::Human => {
            println!("PQR Status");
            println!("==========");
            println!();
            println!("Storage:");
            println!("  Backend:  {}", config.backend);
            println!("  Location: {}", config.data_dir.display());
            println!();
            println!("Records:");
            println!("  Total:   {}", records.len());
            println!("  Last ID: {}", last_id.as_deref().unwrap_or("(none)"));
            for (status, count) in &by_status {
                println!("  {:<11} {}", format!("{}:", status), count);
            }
            println!();
            println!("Notifications:");
            println!(
                "  Status: {}",
                if config.notify_enabled {
                    "enabled"
                } else {
                    "disabled"
                }
            );
            if let Some(ref email) = config.notify_email {
                println!("  To:     {}", email);
            }
            match queued {
                Some(n) => println!("  Queued: {}", n),
                None => println!("  Queued: (outbox unreadable)"),
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::memory_store;
    use pqr_core::notify::{notify_created, OutboxNotifier};
    use pqr_core::PqrRecord;
    use tempfile::TempDir;

    #[test]
    fn test_status_counts_queued_notifications() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config {
            data_dir: temp_dir.path().to_path_buf(),
            ..Config::default()
        };
        let mut store = memory_store();
        let record = store.create(PqrRecord::draft("jdoe@example.com")).unwrap();

        let notifier = OutboxNotifier::new(config.outbox_path(), "ops@example.com");
        notify_created(&notifier, &record).unwrap();

        assert_eq!(read_outbox(&config.outbox_path()).unwrap().len(), 1);
        show(&store, &config, &Output::new(OutputFormat::Quiet)).unwrap();
    }
}
