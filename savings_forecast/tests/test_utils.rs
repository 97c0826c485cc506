use chrono::{Duration, NaiveDate};
use rstest::rstest;
use savings_forecast::data::{Transaction, TransactionLedger};
use savings_forecast::features::DailyBalanceBuilder;
use savings_forecast::utils::{binomial, chronological_split, difference, split_boundary};
use savings_forecast::ForecastError;

fn daily_ledger(days: i64) -> TransactionLedger {
    let start = NaiveDate::from_ymd_opt(2023, 1, 1)
        .unwrap()
        .and_hms_opt(9, 0, 0)
        .unwrap();
    TransactionLedger::from_transactions(
        (0..days)
            .map(|i| Transaction {
                id: format!("t{}", i),
                post_date: start + Duration::days(i),
                amount: (i % 5) as f64 - 1.5,
            })
            .collect(),
    )
}

#[rstest]
#[case(10, 7)]
#[case(100, 70)]
#[case(3, 2)]
#[case(11, 7)]
#[case(365, 255)]
fn test_split_boundary_is_floor(#[case] len: usize, #[case] expected: usize) {
    assert_eq!(split_boundary(len, 0.7).unwrap(), expected);
}

#[rstest]
#[case(0.0)]
#[case(1.0)]
#[case(-0.2)]
#[case(f64::NAN)]
fn test_split_rejects_bad_fraction(#[case] fraction: f64) {
    assert!(matches!(
        split_boundary(10, fraction),
        Err(ForecastError::InvalidParameter(_))
    ));
}

#[rstest]
#[case(1)]
#[case(0)]
fn test_split_rejects_empty_partition(#[case] len: usize) {
    assert!(matches!(
        split_boundary(len, 0.7),
        Err(ForecastError::InsufficientData(_))
    ));
}

#[test]
fn test_chronological_split_is_disjoint_and_ordered() {
    let frame = DailyBalanceBuilder::build(&daily_ledger(20)).unwrap();
    let split = chronological_split(&frame, 0.7).unwrap();

    assert_eq!(split.boundary, 14);
    assert_eq!(split.train_series.len(), 14);
    assert_eq!(split.validation_series.len(), 6);
    assert_eq!(split.train_features.len(), 14);
    assert_eq!(split.validation_features.len(), 6);

    let last_train = split.train_series.dates().last().unwrap();
    let first_validation = split.validation_series.dates().first().unwrap();
    assert_eq!(*first_validation - *last_train, Duration::days(1));

    let mut joined = split.train_series.balances().to_vec();
    joined.extend_from_slice(split.validation_series.balances());
    assert_eq!(joined, frame.series.balances().to_vec());
}

#[test]
fn test_difference() {
    let series = vec![1.0, 4.0, 9.0, 16.0, 25.0];
    assert_eq!(difference(&series, 0), series);
    assert_eq!(difference(&series, 1), vec![3.0, 5.0, 7.0, 9.0]);
    assert_eq!(difference(&series, 2), vec![2.0, 2.0, 2.0]);
    assert!(difference(&[1.0], 1).is_empty());
}

#[test]
fn test_binomial() {
    assert_eq!(binomial(4, 2), 6.0);
    assert_eq!(binomial(5, 0), 1.0);
    assert_eq!(binomial(2, 3), 0.0);
}
