//! Tabular export/import (Arrow/Parquet) and tuning artifacts
//!
//! Two table layouts, every column non-nullable:
//!
//! ```text
//! samples:      setpoint f64 | heater i64 | input f64 | error f64
//! experiments:  setpoint f64 | kp f64 | ki f64 | kd f64 |
//!               rise_time f64 | settling_time f64 | overshoot f64 | steady_state_error f64 |
//!               recorded_at timestamp[us, UTC]
//! ```
//!
//! Tables are written whole in one record batch to a sibling temporary file
//! that then replaces the target, so a failed write leaves the previous table
//! intact. Readers accept any number of batches and any extra columns.

use crate::analysis::StepMetrics;
use crate::estimator::GainRecommendation;
use crate::experiment::{ExperimentResult, Gains};
use crate::extract::Sample;
use crate::{Error, Result};
use arrow::array::{
    Array, ArrayRef, Float64Array, Int64Array, RecordBatch, TimestampMicrosecondArray,
};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef, TimeUnit};
use chrono::{DateTime, Utc};
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

/// Numeric experiment table columns, in order
pub const EXPERIMENT_COLUMNS: [&str; 8] = [
    "setpoint",
    "kp",
    "ki",
    "kd",
    "rise_time",
    "settling_time",
    "overshoot",
    "steady_state_error",
];

/// Creation timestamp column of the experiment table, after the numeric columns
pub const RECORDED_AT_COLUMN: &str = "recorded_at";

/// File name of the `index`-th sample export
#[must_use]
pub fn sample_file_name(index: u64) -> String {
    format!("Data_monitor{index}.parquet")
}

/// Arrow schema of the sample table
#[must_use]
pub fn sample_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("setpoint", DataType::Float64, false),
        Field::new("heater", DataType::Int64, false),
        Field::new("input", DataType::Float64, false),
        Field::new("error", DataType::Float64, false),
    ]))
}

/// Arrow schema of the experiment table
#[must_use]
pub fn experiment_schema() -> SchemaRef {
    let mut fields: Vec<Field> = EXPERIMENT_COLUMNS
        .iter()
        .map(|name| Field::new(*name, DataType::Float64, false))
        .collect();
    fields.push(Field::new(
        RECORDED_AT_COLUMN,
        DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into())),
        false,
    ));
    Arc::new(Schema::new(fields))
}

/// Convert samples to a record batch.
///
/// # Errors
///
/// Returns error if Arrow rejects the batch
pub fn samples_to_batch(samples: &[Sample]) -> Result<RecordBatch> {
    let columns: Vec<ArrayRef> = vec![
        Arc::new(Float64Array::from_iter_values(samples.iter().map(|s| s.setpoint))),
        Arc::new(Int64Array::from_iter_values(samples.iter().map(|s| s.heater_output))),
        Arc::new(Float64Array::from_iter_values(samples.iter().map(|s| s.input_value))),
        Arc::new(Float64Array::from_iter_values(samples.iter().map(|s| s.error))),
    ];
    Ok(RecordBatch::try_new(sample_schema(), columns)?)
}

/// Convert experiment records to a record batch.
///
/// # Errors
///
/// Returns error if Arrow rejects the batch
pub fn experiments_to_batch(records: &[ExperimentResult]) -> Result<RecordBatch> {
    let column = |f: fn(&ExperimentResult) -> f64| -> ArrayRef {
        Arc::new(Float64Array::from_iter_values(records.iter().map(f)))
    };
    let columns = vec![
        column(ExperimentResult::setpoint),
        column(ExperimentResult::kp),
        column(ExperimentResult::ki),
        column(ExperimentResult::kd),
        column(|r| r.metrics().rise_time),
        column(|r| r.metrics().settling_time),
        column(|r| r.metrics().overshoot),
        column(|r| r.metrics().steady_state_error),
        Arc::new(
            TimestampMicrosecondArray::from_iter_values(
                records.iter().map(|r| r.recorded_at().timestamp_micros()),
            )
            .with_timezone("UTC"),
        ),
    ];
    Ok(RecordBatch::try_new(experiment_schema(), columns)?)
}

/// Write samples to a Parquet file, replacing it if present.
///
/// # Errors
///
/// Returns error if the file cannot be created or written
pub fn write_samples_parquet<P: AsRef<Path>>(path: P, samples: &[Sample]) -> Result<()> {
    write_parquet(path.as_ref(), &samples_to_batch(samples)?)
}

/// Write experiment records to a Parquet file, replacing it if present.
///
/// # Errors
///
/// Returns error if the file cannot be created or written
pub fn write_experiments_parquet<P: AsRef<Path>>(
    path: P,
    records: &[ExperimentResult],
) -> Result<()> {
    write_parquet(path.as_ref(), &experiments_to_batch(records)?)
}

/// Read a sample table.
///
/// # Errors
///
/// Returns [`Error::Storage`] if a column is missing, mistyped or has nulls
pub fn read_samples_parquet<P: AsRef<Path>>(path: P) -> Result<Vec<Sample>> {
    let mut samples = Vec::new();
    for batch in read_parquet(path.as_ref())? {
        let setpoint = f64_column(&batch, "setpoint")?;
        let heater = i64_column(&batch, "heater")?;
        let input = f64_column(&batch, "input")?;
        let error = f64_column(&batch, "error")?;
        samples.extend((0..batch.num_rows()).map(|i| Sample {
            setpoint: setpoint.value(i),
            heater_output: heater.value(i),
            input_value: input.value(i),
            error: error.value(i),
        }));
    }
    Ok(samples)
}

/// Read an experiment table.
///
/// Tables without a `recorded_at` column (written by other tools) get the
/// read time as creation time.
///
/// # Errors
///
/// Returns [`Error::Storage`] if a column is missing, mistyped, has nulls, or
/// holds an out-of-range timestamp
pub fn read_experiments_parquet<P: AsRef<Path>>(path: P) -> Result<Vec<ExperimentResult>> {
    let read_at = Utc::now();
    let mut records = Vec::new();
    for batch in read_parquet(path.as_ref())? {
        let cols = EXPERIMENT_COLUMNS
            .iter()
            .map(|name| f64_column(&batch, name))
            .collect::<Result<Vec<_>>>()?;
        let stamps = if batch.column_by_name(RECORDED_AT_COLUMN).is_some() {
            Some(typed_column::<TimestampMicrosecondArray>(
                &batch,
                RECORDED_AT_COLUMN,
                "Timestamp(Microsecond)",
            )?)
        } else {
            None
        };

        for i in 0..batch.num_rows() {
            let recorded_at = match stamps {
                Some(stamps) => micros_to_utc(stamps.value(i))?,
                None => read_at,
            };
            let metrics = StepMetrics {
                rise_time: cols[4].value(i),
                settling_time: cols[5].value(i),
                overshoot: cols[6].value(i),
                steady_state_error: cols[7].value(i),
            };
            let gains = Gains::new(cols[1].value(i), cols[2].value(i), cols[3].value(i));
            records.push(
                ExperimentResult::builder(cols[0].value(i), gains, metrics)
                    .recorded_at(recorded_at)
                    .build(),
            );
        }
    }
    Ok(records)
}

fn micros_to_utc(micros: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_micros(micros)
        .ok_or_else(|| Error::Storage(format!("Timestamp {micros}us is out of range")))
}

/// Write the three-line `Kp:`/`Ki:`/`Kd:` tuning result file.
///
/// # Errors
///
/// Returns [`Error::Io`] if the file cannot be written
pub fn write_tuning_result<P: AsRef<Path>>(path: P, recommendation: &GainRecommendation) -> Result<()> {
    std::fs::write(path.as_ref(), recommendation.to_string())?;
    tracing::info!(path = %path.as_ref().display(), "wrote tuning result");
    Ok(())
}

fn write_parquet(path: &Path, batch: &RecordBatch) -> Result<()> {
    use parquet::arrow::ArrowWriter;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let staging = tempfile::NamedTempFile::new_in(dir).map_err(|e| {
        Error::Storage(format!("Failed to create {}: {e}", path.display()))
    })?;

    let mut writer = ArrowWriter::try_new(staging.reopen()?, batch.schema(), None)?;
    writer.write(batch)?;
    writer.close()?;

    staging.persist(path).map_err(|e| {
        Error::Storage(format!("Failed to replace {}: {}", path.display(), e.error))
    })?;

    tracing::debug!(path = %path.display(), rows = batch.num_rows(), "wrote parquet table");
    Ok(())
}

fn read_parquet(path: &Path) -> Result<Vec<RecordBatch>> {
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

    let file = File::open(path).map_err(|e| {
        Error::Storage(format!("Failed to open Parquet file {}: {e}", path.display()))
    })?;

    let builder = ParquetRecordBatchReaderBuilder::try_new(file).map_err(|e| {
        Error::Storage(format!("Failed to parse Parquet file: {e}"))
    })?;

    let reader = builder.build().map_err(|e| {
        Error::Storage(format!("Failed to create Parquet reader: {e}"))
    })?;

    let mut batches = Vec::new();
    for batch in reader {
        let batch = batch.map_err(|e| {
            Error::Storage(format!("Failed to read record batch: {e}"))
        })?;
        batches.push(batch);
    }
    Ok(batches)
}

fn f64_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a Float64Array> {
    typed_column(batch, name, "Float64")
}

fn i64_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a Int64Array> {
    typed_column(batch, name, "Int64")
}

fn typed_column<'a, A: Array + 'static>(
    batch: &'a RecordBatch,
    name: &str,
    expected: &str,
) -> Result<&'a A> {
    let column = batch
        .column_by_name(name)
        .ok_or_else(|| Error::Storage(format!("Missing column {name:?}")))?;
    if column.null_count() > 0 {
        return Err(Error::Storage(format!(
            "Column {name:?} has {} null values",
            column.null_count()
        )));
    }
    column.as_any().downcast_ref::<A>().ok_or_else(|| {
        Error::Storage(format!(
            "Column {name:?} has type {}, expected {expected}",
            column.data_type()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(i: i64) -> Sample {
        #[allow(clippy::cast_precision_loss)]
        let x = i as f64;
        Sample {
            setpoint: 37.0,
            heater_output: 255 - i,
            input_value: 20.0 + x,
            error: 17.0 - x,
        }
    }

    #[test]
    fn test_samples_to_batch_schema() {
        let batch = samples_to_batch(&[sample(0), sample(1)]).unwrap();
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.num_columns(), 4);
        assert_eq!(batch.schema().field(1).name(), "heater");
        assert_eq!(batch.schema().field(1).data_type(), &DataType::Int64);
    }

    #[test]
    fn test_experiments_to_batch_column_order() {
        let batch = experiments_to_batch(&[]).unwrap();
        let names: Vec<&str> = batch
            .schema_ref()
            .fields()
            .iter()
            .map(|f| f.name().as_str())
            .collect();
        assert_eq!(&names[..8], EXPERIMENT_COLUMNS);
        assert_eq!(names[8], RECORDED_AT_COLUMN);
    }

    #[test]
    fn test_missing_column_is_storage_error() {
        let schema = Arc::new(Schema::new(vec![Field::new("input", DataType::Float64, false)]));
        let batch = RecordBatch::try_new(
            schema,
            vec![Arc::new(Float64Array::from(vec![1.0])) as ArrayRef],
        )
        .unwrap();
        assert!(matches!(f64_column(&batch, "setpoint"), Err(Error::Storage(_))));
    }

    #[test]
    fn test_mistyped_column_is_storage_error() {
        let batch = samples_to_batch(&[sample(0)]).unwrap();
        let err = f64_column(&batch, "heater").unwrap_err();
        assert!(format!("{err}").contains("expected Float64"));
    }

    #[test]
    fn test_sample_file_name() {
        assert_eq!(sample_file_name(7), "Data_monitor7.parquet");
    }
}
