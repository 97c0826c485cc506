use savings_forecast::config::PipelineConfig;
use savings_forecast::error::ForecastError;
use std::io;

#[test]
fn test_error_conversion() {
    // Test IO error conversion
    let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
    let forecast_error = ForecastError::from(io_error);
    assert!(matches!(forecast_error, ForecastError::IoError(_)));

    // Test parse error
    let parse_error = "invalid data".parse::<i32>().unwrap_err();
    let forecast_error = ForecastError::from(parse_error);
    assert!(matches!(forecast_error, ForecastError::ParseError(_)));

    // Chrono parse errors are parse errors too
    let chrono_error = chrono::NaiveDate::parse_from_str("2023-02-30", "%Y-%m-%d").unwrap_err();
    assert!(matches!(
        ForecastError::from(chrono_error),
        ForecastError::ParseError(_)
    ));

    // JSON errors keep their own variant
    let json_error = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
    assert!(matches!(
        ForecastError::from(json_error),
        ForecastError::JsonError(_)
    ));
}

#[test]
fn test_config_errors() {
    let result = PipelineConfig::from_toml_str("train_fraction = [1, 2]");
    assert!(matches!(result, Err(ForecastError::ConfigError(_))));
}

#[test]
fn test_error_display() {
    let error = ForecastError::MissingColumn("postDate".to_string());
    assert_eq!(error.to_string(), "Missing column: postDate");

    let error = ForecastError::NoConvergedOrder(27);
    assert!(error.to_string().contains("27 candidates"));

    let io_error = io::Error::new(io::ErrorKind::PermissionDenied, "permission denied");
    let error = ForecastError::from(io_error);
    let error_string = format!("{}", error);
    assert!(error_string.contains("IO error"));
    assert!(error_string.contains("permission denied"));
}

#[test]
fn test_only_fit_failures_are_skippable() {
    let skippable = [
        ForecastError::InsufficientData("3 observations".to_string()),
        ForecastError::ConvergenceError("iteration cap".to_string()),
    ];
    let fatal = [
        ForecastError::DataError("NaN".to_string()),
        ForecastError::ValidationError("length".to_string()),
        ForecastError::MathError("overflow".to_string()),
        ForecastError::PlotError("font".to_string()),
        ForecastError::ModelNotFitted,
    ];

    assert!(skippable.iter().all(ForecastError::is_fit_failure));
    assert!(!fatal.iter().any(ForecastError::is_fit_failure));
}
