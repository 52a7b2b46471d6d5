//! Implements the `Ledger` trait using in-memory data.
//!
//! Note: this is compiled even in the "production" version of this app so that we can run the whole
//! app, top-to-bottom, without using Google Sheets (see `Mode::Test`).

use crate::api::Ledger;
use crate::error::Res;
use anyhow::{bail, Context};
use tokio::sync::Mutex;
use tracing::info;

/// An implementation of the `Ledger` trait that does not use Google sheets. Rows are held in memory
/// and lost when the process exits.
#[derive(Debug, Default)]
pub struct TestLedger {
    sheet_name: String,
    rows: Mutex<Vec<Vec<String>>>,
}

impl TestLedger {
    /// Create an empty ledger.
    pub fn new(sheet_name: impl Into<String>) -> Self {
        Self::with_rows(sheet_name, Vec::new())
    }

    /// Create a ledger that already holds `rows`.
    pub fn with_rows(sheet_name: impl Into<String>, rows: Vec<Vec<String>>) -> Self {
        Self {
            sheet_name: sheet_name.into(),
            rows: Mutex::new(rows),
        }
    }

    /// A copy of every row currently in the ledger.
    pub async fn rows(&self) -> Vec<Vec<String>> {
        self.rows.lock().await.clone()
    }
}

#[async_trait::async_trait]
impl Ledger for TestLedger {
    async fn append(&self, row: Vec<String>) -> Res<()> {
        info!("[test mode] append to {}: {row:?}", self.sheet_name);
        self.rows.lock().await.push(row);
        Ok(())
    }

    async fn column(&self, column: &str) -> Res<Vec<String>> {
        let index = column_index(column)?;
        let rows = self.rows.lock().await;
        Ok(rows
            .iter()
            .map(|row| row.get(index).cloned().unwrap_or_default())
            .collect())
    }
}

/// Converts a column letter like `E` into a zero-based index.
fn column_index(column: &str) -> Res<usize> {
    let mut chars = column.chars();
    let letter = chars
        .next()
        .with_context(|| format!("Invalid column '{column}'"))?;
    if chars.next().is_some() || !letter.is_ascii_uppercase() {
        bail!("Only single-letter columns are supported, got '{column}'");
    }
    Ok((letter as u8 - b'A') as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_append_then_read_column() {
        let ledger = TestLedger::with_rows("Sheet1", vec![vec!["2024-01-01".into()]]);
        ledger
            .append(vec!["2024-01-02".into(), "b".into(), "c".into(), "d".into(), "5".into()])
            .await
            .unwrap();
        assert_eq!(ledger.rows().await.len(), 2);
        assert_eq!(ledger.column("E").await.unwrap(), vec!["", "5"]);
        assert_eq!(ledger.column("A").await.unwrap(), vec!["2024-01-01", "2024-01-02"]);
    }

    #[test]
    fn test_column_index() {
        assert_eq!(column_index("A").unwrap(), 0);
        assert_eq!(column_index("E").unwrap(), 4);
        assert!(column_index("AA").is_err());
        assert!(column_index("e").is_err());
        assert!(column_index("").is_err());
    }
}
