//! Calendar features and the daily balance series

use crate::data::TransactionLedger;
use crate::error::{ForecastError, Result};
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Calendar features of one daily record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
    /// Monday = 0 through Sunday = 6
    pub day_of_week: u32,
}

impl FeatureRow {
    /// Column names in the order produced by [`FeatureRow::to_vec`]
    pub const NAMES: [&'static str; 7] = [
        "Year",
        "Month",
        "Day",
        "Hour",
        "Minute",
        "Second",
        "DayOfWeek",
    ];

    /// Features of a posting time
    pub fn from_datetime(dt: NaiveDateTime) -> Self {
        Self::from_parts(dt.date(), dt.time())
    }

    fn from_parts(date: NaiveDate, clock: NaiveTime) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
            day: date.day(),
            hour: clock.hour(),
            minute: clock.minute(),
            second: clock.second(),
            day_of_week: date.weekday().num_days_from_monday(),
        }
    }

    /// Numeric feature vector for the regressor
    pub fn to_vec(&self) -> Vec<f64> {
        vec![
            self.year as f64,
            self.month as f64,
            self.day as f64,
            self.hour as f64,
            self.minute as f64,
            self.second as f64,
            self.day_of_week as f64,
        ]
    }
}

/// Balance per calendar day over a gap-free run of dates
#[derive(Debug, Clone, PartialEq)]
pub struct DailyBalanceSeries {
    dates: Vec<NaiveDate>,
    balances: Vec<f64>,
}

impl DailyBalanceSeries {
    /// Create a series, checking that the dates are consecutive days
    pub fn new(dates: Vec<NaiveDate>, balances: Vec<f64>) -> Result<Self> {
        if dates.len() != balances.len() {
            return Err(ForecastError::ValidationError(format!(
                "Dates length ({}) doesn't match balances length ({})",
                dates.len(),
                balances.len()
            )));
        }

        if let Some(pair) = dates.windows(2).find(|w| w[1] - w[0] != Duration::days(1)) {
            return Err(ForecastError::ValidationError(format!(
                "Dates are not consecutive: {} is followed by {}",
                pair[0], pair[1]
            )));
        }

        Ok(Self { dates, balances })
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn balances(&self) -> &[f64] {
        &self.balances
    }

    /// Get the length of the series
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    /// Check if the series is empty
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Copy of the rows in `start..end`
    pub fn slice(&self, start: usize, end: usize) -> Self {
        Self {
            dates: self.dates[start..end].to_vec(),
            balances: self.balances[start..end].to_vec(),
        }
    }
}

/// Feature rows aligned by index with a [`DailyBalanceSeries`]
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    rows: Vec<FeatureRow>,
}

impl FeatureTable {
    pub fn new(rows: Vec<FeatureRow>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[FeatureRow] {
        &self.rows
    }

    /// Rows as numeric vectors, one per day
    pub fn matrix(&self) -> Vec<Vec<f64>> {
        self.rows.iter().map(FeatureRow::to_vec).collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Copy of the rows in `start..end`
    pub fn slice(&self, start: usize, end: usize) -> Self {
        Self {
            rows: self.rows[start..end].to_vec(),
        }
    }
}

/// Counters collected while building the daily frame
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildReport {
    /// Transactions in the ledger
    pub transactions: usize,
    /// Rows whose id occurs more than once; reported only
    pub duplicate_id_rows: usize,
    /// Transactions dropped because an earlier one has the same posting time
    pub dropped_duplicate_timestamps: usize,
    /// Days with at least one retained transaction
    pub observed_days: usize,
    /// Days inserted by forward-fill
    pub filled_days: usize,
}

/// Features, target series and build counters for one ledger
#[derive(Debug, Clone)]
pub struct DailyFrame {
    pub features: FeatureTable,
    pub series: DailyBalanceSeries,
    pub report: BuildReport,
}

impl DailyFrame {
    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

struct ObservedDay {
    date: NaiveDate,
    total: f64,
    first_clock: NaiveTime,
}

/// Builds the daily frame from a ledger
#[derive(Debug)]
pub struct DailyBalanceBuilder;

impl DailyBalanceBuilder {
    /// Aggregate the ledger into one row per calendar day.
    ///
    /// The balance of a day is the running total of all retained amounts up to
    /// the end of that day. Days without transactions repeat the previous day's
    /// balance and clock fields; their calendar fields follow the day itself.
    pub fn build(ledger: &TransactionLedger) -> Result<DailyFrame> {
        if ledger.is_empty() {
            return Err(ForecastError::DataError(
                "Cannot build a balance series from an empty ledger".to_string(),
            ));
        }

        let mut report = BuildReport {
            transactions: ledger.len(),
            duplicate_id_rows: ledger.duplicate_id_rows(),
            ..BuildReport::default()
        };

        let mut observed: Vec<ObservedDay> = Vec::new();
        let mut last_post_date: Option<NaiveDateTime> = None;

        for tx in ledger.transactions() {
            if last_post_date == Some(tx.post_date) {
                report.dropped_duplicate_timestamps += 1;
                continue;
            }
            last_post_date = Some(tx.post_date);

            let date = tx.post_date.date();
            match observed.last_mut() {
                Some(day) if day.date == date => day.total += tx.amount,
                _ => observed.push(ObservedDay {
                    date,
                    total: tx.amount,
                    first_clock: tx.post_date.time(),
                }),
            }
        }

        if report.dropped_duplicate_timestamps > 0 {
            warn!(
                dropped = report.dropped_duplicate_timestamps,
                "dropped transactions sharing a posting time with an earlier one"
            );
        }

        report.observed_days = observed.len();

        let mut dates = Vec::new();
        let mut balances = Vec::new();
        let mut rows = Vec::new();

        let mut running = 0.0;
        let mut clock = observed[0].first_clock;
        let mut date = observed[0].date;
        let mut pending = observed.iter().peekable();

        while let Some(next) = pending.peek() {
            if next.date == date {
                running += next.total;
                clock = next.first_clock;
                pending.next();
            } else {
                report.filled_days += 1;
            }

            dates.push(date);
            balances.push(running);
            rows.push(FeatureRow::from_parts(date, clock));

            if pending.peek().is_none() {
                break;
            }
            date = date
                .succ_opt()
                .ok_or_else(|| ForecastError::DataError(format!("Date overflow after {}", date)))?;
        }

        info!(
            days = dates.len(),
            observed = report.observed_days,
            filled = report.filled_days,
            "built daily balance series"
        );

        Ok(DailyFrame {
            features: FeatureTable::new(rows),
            series: DailyBalanceSeries::new(dates, balances)?,
            report,
        })
    }
}
