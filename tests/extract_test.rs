//! Log extraction tests

use pid_analyzer::extract::{LogSampleExtractor, OperatingMode};
use pid_analyzer::{Error, Stage};
use std::io::Write;

const BENCH_LOG: &str = "\
I (312) wifi: connected
[Air Mode] {heater: 255, fan: 1, input: 24.80, error: 12.20}
[Air Mode] {heater: 240, fan: 1, input: 29.10, error: 7.90}
[Baby Mode] {heater: 30, fan: 0, input: 36.20, error: 0.80}
[Air Mode] {heater: 90, fan: 1, input: 36.70, error: 0.30}
[Humidity Mode] {heater: 0, fan: 1, input: 58.00, error: 2.00}
[Air Mode] {heater: 60, fan: 1, input: 37.20, error: -0.20}
";

#[test]
fn test_each_mode_only_sees_its_own_lines() {
    let counts: Vec<usize> = OperatingMode::ALL
        .iter()
        .map(|&mode| {
            LogSampleExtractor::new(mode, 37.0)
                .unwrap()
                .extract(BENCH_LOG)
                .unwrap()
                .samples()
                .len()
        })
        .collect();
    assert_eq!(counts, vec![4, 1, 1]);
}

#[test]
fn test_samples_keep_log_order_and_values() {
    let extraction = LogSampleExtractor::new(OperatingMode::AirTemp, 37.0)
        .unwrap()
        .extract(BENCH_LOG)
        .unwrap();

    assert_eq!(extraction.mode(), OperatingMode::AirTemp);
    assert_eq!(extraction.input_series(), vec![24.8, 29.1, 36.7, 37.2]);

    let last = extraction.samples()[3];
    assert_eq!(last.heater_output, 60);
    assert!((last.error + 0.2).abs() < 1e-12);
    assert!((last.setpoint - 37.0).abs() < f64::EPSILON);
}

#[test]
fn test_no_matching_line_fails_instead_of_empty_success() {
    let err = LogSampleExtractor::new(OperatingMode::Humidity, 60.0)
        .unwrap()
        .extract("[Air Mode] {heater: 1, fan: 1, input: 2.0, error: 3.0}\n")
        .unwrap_err();

    assert!(matches!(
        err,
        Error::Extraction {
            ref mode,
            lines_scanned: 1
        } if mode == "Humidity"
    ));
    assert_eq!(err.stage(), Stage::Extraction);
}

#[test]
fn test_empty_log_fails() {
    let result = LogSampleExtractor::new(OperatingMode::Baby, 37.0)
        .unwrap()
        .extract("");
    assert!(matches!(result, Err(Error::Extraction { lines_scanned: 0, .. })));
}

#[test]
fn test_malformed_lines_are_skipped() {
    let log = "\
[Baby Mode] {heater: , fan: 0, input: 36.00, error: 1.00}
[Baby Mode] {heater: 12, fan: 0, input: abc, error: 1.00}
[Baby Mode] {heater: 12, fan: 0, input: 36.50, error: 0.50}
";
    let extraction = LogSampleExtractor::new(OperatingMode::Baby, 37.0)
        .unwrap()
        .extract(log)
        .unwrap();
    assert_eq!(extraction.samples().len(), 1);
    assert_eq!(extraction.lines_scanned(), 3);
}

#[test]
fn test_from_input_validates_operator_fields() {
    assert!(LogSampleExtractor::from_input("Air Temp", "37").is_ok());
    assert!(matches!(
        LogSampleExtractor::from_input("", "37"),
        Err(Error::Input(_))
    ));
    assert!(matches!(
        LogSampleExtractor::from_input("Baby", "  "),
        Err(Error::Input(_))
    ));
    assert!(matches!(
        LogSampleExtractor::from_input("Baby", "thirty"),
        Err(Error::Input(_))
    ));
}

#[test]
fn test_non_finite_setpoint_rejected() {
    assert!(matches!(
        LogSampleExtractor::new(OperatingMode::Baby, f64::INFINITY),
        Err(Error::Input(_))
    ));
}

#[test]
fn test_extract_file_tolerates_invalid_utf8() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"\xff\xfe garbage\n").unwrap();
    file.write_all(BENCH_LOG.as_bytes()).unwrap();
    file.flush().unwrap();

    let extraction = LogSampleExtractor::new(OperatingMode::AirTemp, 37.0)
        .unwrap()
        .extract_file(file.path())
        .unwrap();
    assert_eq!(extraction.samples().len(), 4);
}

#[test]
fn test_extract_file_missing_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = LogSampleExtractor::new(OperatingMode::AirTemp, 37.0)
        .unwrap()
        .extract_file(dir.path().join("missing.log"));
    assert!(matches!(result, Err(Error::Io(_))));
}
