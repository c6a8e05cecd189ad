//! Export command handler

use std::path::PathBuf;

use anyhow::{Context, Result};

use pqr_core::export::write_xlsx;

use super::Store;
use crate::output::Output;

/// Write records to a spreadsheet, optionally only those matching `search`
pub fn export(store: &Store, search: Option<String>, path: PathBuf, output: &Output) -> Result<()> {
    let records = match search {
        Some(ref term) => store.search(term)?,
        None => store.list_all()?,
    };

    write_xlsx(&records, &path).with_context(|| format!("Failed to export to {:?}", path))?;

    output.success(&format!(
        "Exported {} record(s) to {}",
        records.len(),
        path.display()
    ));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::memory_store;
    use crate::output::OutputFormat;
    use pqr_core::PqrRecord;
    use tempfile::TempDir;

    #[test]
    fn test_export_writes_workbook() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("out.xlsx");

        let mut store = memory_store();
        let mut draft = PqrRecord::draft("jdoe@example.com");
        draft.carrier = "ACME".to_string();
        store.create(draft).unwrap();

        let output = Output::new(OutputFormat::Quiet);
        export(&store, Some("acme".to_string()), path.clone(), &output).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..2], b"PK");
    }
}
