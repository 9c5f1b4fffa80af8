use std::io::Write;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use arrow_array::builder::{BooleanBuilder, Float64Builder, Int64Builder, StringBuilder};
use arrow_array::{ArrayRef, RecordBatch};
use arrow_schema::{DataType, Field, Schema, SchemaRef};
use parquet::arrow::arrow_writer::ArrowWriter;
use usage::{SyscallStats, WindowReport};

/// One named value of a window report
#[derive(Debug, Clone, PartialEq)]
pub struct MetricPoint {
    pub metric: String,
    pub value: f64,
}

impl MetricPoint {
    fn new(metric: String, value: impl Into<f64>) -> Self {
        Self {
            metric,
            value: value.into(),
        }
    }
}

/// Create the schema of the metric time series
pub fn create_metric_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("window_start", DataType::Int64, false),
        Field::new("window_end", DataType::Int64, false),
        Field::new("is_final", DataType::Boolean, false),
        Field::new("metric", DataType::Utf8, false),
        Field::new("value", DataType::Float64, false),
    ]))
}

/// Flattens a report into metric points named by dotted paths, e.g.
/// `cpu.0.busy_pct` or `task.1234.syscall.read.count`
pub fn metric_points(report: &WindowReport) -> Vec<MetricPoint> {
    let mut points = vec![MetricPoint::new(
        "overall.busy_pct".to_string(),
        report.overall_busy_pct(),
    )];

    for cpu in &report.cpus {
        points.push(MetricPoint::new(format!("cpu.{}.busy_ns", cpu.cpu), cpu.busy_ns as f64));
        points.push(MetricPoint::new(format!("cpu.{}.busy_pct", cpu.cpu), cpu.busy_pct));
    }

    for task in &report.tasks {
        let prefix = format!("task.{}", task.tid);
        points.push(MetricPoint::new(format!("{}.busy_ns", prefix), task.busy_ns as f64));
        points.push(MetricPoint::new(format!("{}.busy_pct", prefix), task.busy_pct));
        points.push(MetricPoint::new(
            format!("{}.migrations", prefix),
            task.migration_count as f64,
        ));
        push_syscalls(&mut points, &format!("{}.syscall", prefix), &task.syscalls);
    }

    push_syscalls(&mut points, "syscall", &report.syscalls);

    for disk in &report.disks {
        let prefix = format!("disk.{}", disk.device);
        points.push(MetricPoint::new(format!("{}.queued", prefix), disk.queued_count as f64));
        points.push(MetricPoint::new(
            format!("{}.completed", prefix),
            disk.completed_count as f64,
        ));
        points.push(MetricPoint::new(format!("{}.sectors", prefix), disk.total_sectors as f64));
        if let Some(avg) = disk.avg_request_time_ns {
            points.push(MetricPoint::new(
                format!("{}.avg_request_time_ns", prefix),
                avg as f64,
            ));
        }
    }

    points
}

fn push_syscalls(points: &mut Vec<MetricPoint>, prefix: &str, syscalls: &[SyscallStats]) {
    for syscall in syscalls {
        points.push(MetricPoint::new(
            format!("{}.{}.count", prefix, syscall.name),
            syscall.count as f64,
        ));
        if let Some(avg) = syscall.avg_duration_ns {
            points.push(MetricPoint::new(
                format!("{}.{}.completed", prefix, syscall.name),
                syscall.completed as f64,
            ));
            points.push(MetricPoint::new(
                format!("{}.{}.avg_duration_ns", prefix, syscall.name),
                avg as f64,
            ));
        }
    }
}

/// Convert a report to a RecordBatch with one row per metric point
pub fn report_to_batch(report: &WindowReport, schema: SchemaRef) -> Result<RecordBatch> {
    let points = metric_points(report);
    let count = points.len();

    let mut window_start_builder = Int64Builder::with_capacity(count);
    let mut window_end_builder = Int64Builder::with_capacity(count);
    let mut is_final_builder = BooleanBuilder::with_capacity(count);
    // Estimate 24 bytes per metric path
    let mut metric_builder = StringBuilder::with_capacity(count, count * 24);
    let mut value_builder = Float64Builder::with_capacity(count);

    for point in points {
        window_start_builder.append_value(report.window.start_ts as i64);
        window_end_builder.append_value(report.window.end_ts as i64);
        is_final_builder.append_value(report.window.is_final);
        metric_builder.append_value(point.metric);
        value_builder.append_value(point.value);
    }

    let arrays: Vec<ArrayRef> = vec![
        Arc::new(window_start_builder.finish()),
        Arc::new(window_end_builder.finish()),
        Arc::new(is_final_builder.finish()),
        Arc::new(metric_builder.finish()),
        Arc::new(value_builder.finish()),
    ];

    RecordBatch::try_new(schema, arrays).map_err(|e| anyhow!("Failed to create RecordBatch: {}", e))
}

/// Writes window reports to a Parquet metric time series
pub struct ReportWriter<W: Write + Send> {
    writer: ArrowWriter<W>,
    schema: SchemaRef,
}

impl<W: Write + Send> ReportWriter<W> {
    /// Creates a new ReportWriter with the provided writer
    pub fn new(writer: W) -> Result<Self> {
        let schema = create_metric_schema();

        let arrow_writer = ArrowWriter::try_new(writer, schema.clone(), None)
            .map_err(|e| anyhow!("Failed to create Arrow writer: {}", e))?;

        Ok(Self {
            writer: arrow_writer,
            schema,
        })
    }

    /// Appends the metric points of one report
    pub fn write(&mut self, report: &WindowReport) -> Result<()> {
        let batch = report_to_batch(report, self.schema.clone())?;

        self.writer
            .write(&batch)
            .map_err(|e| anyhow!("Failed to write batch to Parquet: {}", e))
    }

    /// Finishes the Parquet file and returns the underlying writer
    pub fn close(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| anyhow!("Failed to close Parquet writer: {}", e))
    }
}
