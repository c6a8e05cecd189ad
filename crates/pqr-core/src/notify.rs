//! New-record notifications
//!
//! A notification is sent after a record is created. Delivery is separate
//! from creation: a failed notification never undoes a create, the caller
//! only reports it.
//!
//! `OutboxNotifier` appends each message as one JSON line to an outbox file
//! that a mail relay can drain.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::Config;
use crate::models::PqrRecord;

#[derive(Error, Debug)]
pub enum NotifyError {
    /// Notifications are enabled but no recipient is configured
    #[error("Notification configuration is incomplete: {0}")]
    NotConfigured(&'static str),

    #[error("Failed to deliver notification to '{path}': {source}")]
    Delivery {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to encode notification: {0}")]
    Encode(#[from] serde_json::Error),
}

/// An outgoing message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub to: String,
    pub from: String,
    pub subject: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// Message announcing a newly filed record
    pub fn record_created(record: &PqrRecord, to: impl Into<String>) -> Self {
        let message = format!(
            "Nueva PQR {}\n\
             Pedido: {}\n\
             Transportador: {}\n\
             OC: {}\n\
             Tipo PQR: {}\n\
             Descripción: {}",
            record.id,
            record.order,
            record.carrier,
            record.purchase_order,
            record.claim_type,
            record.description
        );
        Self {
            to: to.into(),
            from: record.created_by.clone(),
            subject: format!("Nueva PQR {}", record.id),
            message,
            created_at: Utc::now(),
        }
    }
}

/// Delivers notifications
pub trait Notifier {
    fn notify(&self, notification: &Notification) -> Result<(), NotifyError>;

    /// Recipient for messages this notifier sends, if any
    fn recipient(&self) -> Option<&str>;
}

/// Appends notifications to a JSON-lines outbox file
pub struct OutboxNotifier {
    path: PathBuf,
    recipient: String,
}

impl OutboxNotifier {
    pub fn new(path: impl Into<PathBuf>, recipient: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            recipient: recipient.into(),
        }
    }
}

/// Read back every notification queued in the outbox at `path`
///
/// A missing outbox holds nothing.
pub fn read_outbox(path: &Path) -> Result<Vec<Notification>, NotifyError> {
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(NotifyError::Delivery {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    content
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| serde_json::from_str(l).map_err(NotifyError::from))
        .collect()
}

impl Notifier for OutboxNotifier {
    fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        let line = serde_json::to_string(notification)?;
        let delivery_err = |source: io::Error| NotifyError::Delivery {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(delivery_err)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(delivery_err)?;
        writeln!(file, "{}", line).map_err(delivery_err)?;

        tracing::info!("Queued notification '{}' for {}", notification.subject, notification.to);
        Ok(())
    }

    fn recipient(&self) -> Option<&str> {
        Some(self.recipient.as_str())
    }
}

/// Drops every notification
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        tracing::debug!("Notifications disabled, dropping '{}'", notification.subject);
        Ok(())
    }

    fn recipient(&self) -> Option<&str> {
        None
    }
}

/// Build the notifier selected by the configuration
pub fn notifier_from_config(config: &Config) -> Result<Box<dyn Notifier>, NotifyError> {
    if !config.notify_enabled {
        return Ok(Box::new(NoopNotifier));
    }
    let recipient = config
        .notify_email
        .as_deref()
        .filter(|e| !e.trim().is_empty())
        .ok_or(NotifyError::NotConfigured("notify_email is not set"))?;
    Ok(Box::new(OutboxNotifier::new(config.outbox_path(), recipient)))
}

/// Notify about a freshly created record using `notifier`'s recipient
pub fn notify_created(notifier: &dyn Notifier, record: &PqrRecord) -> Result<(), NotifyError> {
    match notifier.recipient() {
        Some(to) => notifier.notify(&Notification::record_created(record, to)),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record() -> PqrRecord {
        let mut record = PqrRecord::draft("jdoe@example.com");
        record.id = "PQR-0003".to_string();
        record.order = "ORD-3".to_string();
        record.carrier = "ACME".to_string();
        record.description = "Missing pallet".to_string();
        record
    }

    #[test]
    fn test_record_created_message() {
        let n = Notification::record_created(&record(), "claims@example.com");
        assert_eq!(n.to, "claims@example.com");
        assert_eq!(n.from, "jdoe@example.com");
        assert_eq!(n.subject, "Nueva PQR PQR-0003");
        assert!(n.message.contains("Pedido: ORD-3"));
        assert!(n.message.contains("Missing pallet"));
    }

    #[test]
    fn test_outbox_appends_lines() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("outbox.jsonl");
        let notifier = OutboxNotifier::new(&path, "claims@example.com");
        assert!(read_outbox(&path).unwrap().is_empty());

        notify_created(&notifier, &record()).unwrap();
        notify_created(&notifier, &record()).unwrap();

        let pending = read_outbox(&path).unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].to, "claims@example.com");
    }

    #[test]
    fn test_outbox_unwritable_path_fails() {
        let temp_dir = TempDir::new().unwrap();
        // A directory where the outbox file should be
        let path = temp_dir.path().join("outbox.jsonl");
        fs::create_dir_all(&path).unwrap();

        let notifier = OutboxNotifier::new(&path, "claims@example.com");
        let err = notify_created(&notifier, &record()).unwrap_err();
        assert!(matches!(err, NotifyError::Delivery { .. }));
    }

    #[test]
    fn test_from_config() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config {
            data_dir: temp_dir.path().to_path_buf(),
            ..Config::default()
        };

        let notifier = notifier_from_config(&config).unwrap();
        assert!(notifier.recipient().is_none());

        config.notify_enabled = true;
        assert!(matches!(
            notifier_from_config(&config),
            Err(NotifyError::NotConfigured(_))
        ));

        config.notify_email = Some("claims@example.com".to_string());
        let notifier = notifier_from_config(&config).unwrap();
        assert_eq!(notifier.recipient(), Some("claims@example.com"));
    }
}
