//! Transaction ledger loading

use crate::error::{ForecastError, Result};
use chrono::NaiveDateTime;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;
use tracing::{info, warn};

/// Columns every ledger export must carry
pub const REQUIRED_COLUMNS: [&str; 10] = [
    "id",
    "postDate",
    "amount",
    "type",
    "status",
    "direction",
    "subClass_title",
    "subClass_code",
    "description",
    "institution",
];

const POST_DATE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"];

/// A single posted transaction, reduced to the fields used for modelling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Transaction identifier from the bank export
    pub id: String,
    /// Posting time with the zone marker removed
    pub post_date: NaiveDateTime,
    /// Signed amount; debits are negative
    pub amount: f64,
}

/// Chronologically ordered transactions of one account
#[derive(Debug, Clone)]
pub struct TransactionLedger {
    transactions: Vec<Transaction>,
    duplicate_id_rows: usize,
}

impl TransactionLedger {
    /// Build a ledger, ordering the transactions by posting time.
    ///
    /// The sort is stable, so rows sharing a timestamp keep their file order.
    pub fn from_transactions(mut transactions: Vec<Transaction>) -> Self {
        transactions.sort_by(|a, b| a.post_date.cmp(&b.post_date));

        let mut id_counts: HashMap<&str, usize> = HashMap::new();
        for tx in &transactions {
            *id_counts.entry(tx.id.as_str()).or_insert(0) += 1;
        }
        let duplicate_id_rows = id_counts.values().filter(|&&c| c > 1).sum();

        Self {
            transactions,
            duplicate_id_rows,
        }
    }

    /// Transactions in posting order
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Number of rows whose id occurs more than once, counting every occurrence
    pub fn duplicate_id_rows(&self) -> usize {
        self.duplicate_id_rows
    }

    /// Number of transactions
    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    /// Check if the ledger is empty
    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}

/// Loader for bank transaction exports
#[derive(Debug)]
pub struct LedgerLoader;

impl LedgerLoader {
    /// Load a transaction ledger from a CSV file
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<TransactionLedger> {
        let file = File::open(path)?;
        let df = CsvReader::new(file)
            .infer_schema(None)
            .has_header(true)
            .finish()?;

        Self::from_dataframe(df)
    }

    /// Create a ledger from an existing DataFrame
    pub fn from_dataframe(df: DataFrame) -> Result<TransactionLedger> {
        Self::check_columns(&df)?;

        let ids = Self::string_column(&df, "id")?;
        let post_dates = Self::string_column(&df, "postDate")?;
        let amounts = Self::float_column(&df, "amount")?;

        let transactions = ids
            .into_iter()
            .zip(post_dates)
            .zip(amounts)
            .map(|((id, raw_date), amount)| {
                Ok(Transaction {
                    id,
                    post_date: parse_post_date(&raw_date)?,
                    amount,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let ledger = TransactionLedger::from_transactions(transactions);
        info!(rows = ledger.len(), "loaded transaction ledger");
        if ledger.duplicate_id_rows() > 0 {
            warn!(
                rows = ledger.duplicate_id_rows(),
                "ledger contains duplicated transaction ids"
            );
        }

        Ok(ledger)
    }

    fn check_columns(df: &DataFrame) -> Result<()> {
        let present = df.get_column_names();
        for required in REQUIRED_COLUMNS {
            if !present.contains(&required) {
                return Err(ForecastError::MissingColumn(required.to_string()));
            }
        }
        Ok(())
    }

    fn string_column(df: &DataFrame, name: &str) -> Result<Vec<String>> {
        let series = df.column(name)?.cast(&DataType::Utf8)?;
        let values = series.utf8()?;

        values
            .into_iter()
            .enumerate()
            .map(|(row, value)| {
                value.map(str::to_string).ok_or_else(|| {
                    ForecastError::DataError(format!("Null '{}' in row {}", name, row))
                })
            })
            .collect()
    }

    fn float_column(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
        let series = df.column(name)?.cast(&DataType::Float64)?;
        let values = series.f64()?;

        values
            .into_iter()
            .enumerate()
            .map(|(row, value)| {
                value.ok_or_else(|| {
                    ForecastError::DataError(format!("Null '{}' in row {}", name, row))
                })
            })
            .collect()
    }
}

/// Parse a `postDate` value such as `2023-04-01T09:15:00Z`.
///
/// The trailing zone marker is stripped and the time is kept as naive.
pub fn parse_post_date(raw: &str) -> Result<NaiveDateTime> {
    let trimmed = raw.trim().trim_end_matches(['Z', 'z']);

    let mut last_error = None;
    for format in POST_DATE_FORMATS {
        match NaiveDateTime::parse_from_str(trimmed, format) {
            Ok(dt) => return Ok(dt),
            Err(e) => last_error = Some(e),
        }
    }

    Err(ForecastError::ParseError(format!(
        "Invalid postDate '{}': {}",
        raw,
        last_error.map(|e| e.to_string()).unwrap_or_default()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Timelike};

    fn tx(id: &str, ts: &str, amount: f64) -> Transaction {
        Transaction {
            id: id.to_string(),
            post_date: parse_post_date(ts).unwrap(),
            amount,
        }
    }

    #[test]
    fn test_parse_post_date_strips_zone_marker() {
        let dt = parse_post_date("2023-04-01T09:15:30Z").unwrap();
        assert_eq!(dt.date(), NaiveDate::from_ymd_opt(2023, 4, 1).unwrap());
        assert_eq!((dt.hour(), dt.minute(), dt.second()), (9, 15, 30));

        let fractional = parse_post_date("2023-04-01T09:15:30.250Z").unwrap();
        assert_eq!(fractional.second(), 30);
    }

    #[test]
    fn test_parse_post_date_rejects_garbage() {
        assert!(matches!(
            parse_post_date("01/04/2023"),
            Err(ForecastError::ParseError(_))
        ));
    }

    #[test]
    fn test_ledger_sorts_and_counts_duplicate_ids() {
        let ledger = TransactionLedger::from_transactions(vec![
            tx("b", "2023-01-02T10:00:00Z", -5.0),
            tx("a", "2023-01-01T10:00:00Z", 10.0),
            tx("b", "2023-01-03T10:00:00Z", -5.0),
        ]);

        let ids: Vec<&str> = ledger.transactions().iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "b"]);
        assert_eq!(ledger.duplicate_id_rows(), 2);
        assert_eq!(ledger.len(), 3);
    }
}
