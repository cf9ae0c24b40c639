//! Summaries of a finished run, printed to the terminal or written as JSON.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use bytesize::ByteSize;
use serde::Serialize;
use sketches_ddsketch::DDSketch;
use yansi::Paint;

use crate::metrics::{Metrics, TaskMetrics};
use crate::task::Task;

/// Latency percentiles in seconds.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Latency {
    /// Mean latency.
    pub avg: f64,
    /// Median latency.
    pub p50: f64,
    /// 90th percentile.
    pub p90: f64,
    /// 99th percentile.
    pub p99: f64,
    /// Slowest request.
    pub max: f64,
}

impl Latency {
    fn from_sketch(sketch: &DDSketch) -> Option<Self> {
        let count = sketch.count();
        if count == 0 {
            return None;
        }
        let quantile = |q| sketch.quantile(q).ok().flatten();
        Some(Self {
            avg: sketch.sum()? / count as f64,
            p50: quantile(0.5)?,
            p90: quantile(0.9)?,
            p99: quantile(0.99)?,
            max: sketch.max()?,
        })
    }
}

/// Summary of a single task, or of all tasks combined.
#[derive(Clone, Debug, Serialize)]
pub struct TaskSummary {
    /// Requests issued, including failed ones.
    pub requests: u64,
    /// Failed requests.
    pub failures: u64,
    /// Total size of successful response bodies.
    pub bytes: u64,
    /// Latency of all requests, `None` if no request was issued.
    pub latency: Option<Latency>,
    /// Failures grouped by reason.
    pub failure_reasons: BTreeMap<String, u64>,
}

impl TaskSummary {
    fn new(metrics: &TaskMetrics) -> Self {
        Self {
            requests: metrics.requests(),
            failures: metrics.failures,
            bytes: metrics.bytes,
            latency: Latency::from_sketch(&metrics.timing),
            failure_reasons: metrics.failure_reasons.clone(),
        }
    }
}

/// The result of a load test run.
#[derive(Clone, Debug, Serialize)]
pub struct Report {
    /// Name of the scenario.
    pub scenario: String,
    /// The host the requests were sent to.
    pub host: String,
    /// Name of the catalog users browsed.
    pub catalog: String,
    /// Number of simulated users.
    pub users: usize,
    /// Time from the start of the run until the last user stopped.
    #[serde(with = "humantime_serde")]
    pub elapsed: Duration,
    /// Per-task summaries, keyed by task name.
    pub tasks: BTreeMap<Task, TaskSummary>,
    /// All tasks combined.
    pub total: TaskSummary,
}

impl Report {
    pub(crate) fn new(
        scenario: &str,
        host: &str,
        catalog: &str,
        users: usize,
        elapsed: Duration,
        metrics: &Metrics,
    ) -> Result<Self> {
        let tasks = Task::ALL
            .into_iter()
            .map(|task| (task, TaskSummary::new(metrics.task(task))))
            .collect();
        let total = TaskSummary::new(&metrics.total()?);

        Ok(Self {
            scenario: scenario.to_owned(),
            host: host.to_owned(),
            catalog: catalog.to_owned(),
            users,
            elapsed,
            tasks,
            total,
        })
    }

    /// Returns the summary of a single task.
    pub fn task(&self, task: Task) -> &TaskSummary {
        // Every task is inserted on construction.
        &self.tasks[&task]
    }

    /// Writes the report as pretty-printed JSON.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path)
            .with_context(|| format!("failed to create report file {}", path.display()))?;
        serde_json::to_writer_pretty(file, self).context("failed to write JSON report")?;
        Ok(())
    }

    /// Prints the report to stdout.
    pub fn print(&self) {
        println!();
        println!(
            "{} {} (host: {}, users: {}, catalog: {})",
            "## Scenario".bold(),
            self.scenario.bold().blue(),
            self.host,
            self.users.bold(),
            self.catalog,
        );
        for (task, summary) in &self.tasks {
            print_summary(&format!("{}:", task.name().to_uppercase()), summary, self.elapsed);
        }

        println!();
        println!("{}", "## TOTALS".bold());
        print_summary("ALL:", &self.total, self.elapsed);

        if !self.total.failure_reasons.is_empty() {
            println!();
            println!("{}", "## FAILURES".bold());
            for (task, summary) in &self.tasks {
                for (reason, count) in &summary.failure_reasons {
                    println!("  {task} {}: {}", reason.red(), count.bold());
                }
            }
        }
        println!();
    }
}

fn print_summary(label: &str, summary: &TaskSummary, elapsed: Duration) {
    let Some(latency) = summary.latency else {
        println!("{} (no requests)", label.bold().dim());
        return;
    };

    print!("{} ({} requests", label.bold().green(), summary.requests.bold());
    if summary.failures > 0 {
        print!(
            ", {}",
            format!("{} FAILURES", summary.failures).bold().red()
        );
    }
    println!(")");

    print_ops(summary.requests, elapsed);
    print_throughput(summary.bytes, elapsed);
    print_percentiles(&latency, Duration::from_secs_f64);
}

fn print_percentiles<T: fmt::Debug>(latency: &Latency, map: impl Fn(f64) -> T) {
    let avg = map(latency.avg);
    let p50 = map(latency.p50);
    let p90 = map(latency.p90);
    let p99 = map(latency.p99);
    let max = map(latency.max);
    println!(
        "  avg: {:.2?}; p50: {p50:.2?}; p90: {p90:.2?}; p99: {p99:.2?}; max: {max:.2?}",
        avg.bold()
    );
}

fn print_ops(ops: u64, elapsed: Duration) {
    let ops_ps = ops as f64 / elapsed.as_secs_f64();
    print!("  {:.2} requests/s", ops_ps.bold());
}

fn print_throughput(total: u64, elapsed: Duration) {
    let throughput = (total as f64 / elapsed.as_secs_f64()) as u64;
    println!(", {:.2}/s", ByteSize::b(throughput).bold());
}

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;

    use crate::http;

    use super::*;

    #[test]
    fn summarizes_metrics() {
        let mut metrics = Metrics::default();
        for millis in [10, 20, 30, 40] {
            metrics.record(
                Task::BrowseProduct,
                Duration::from_millis(millis),
                &Ok(http::Response {
                    status: StatusCode::OK,
                    bytes: 10,
                }),
            );
        }
        metrics.record(
            Task::ListHats,
            Duration::from_millis(5),
            &Err(http::Error::Status(StatusCode::INTERNAL_SERVER_ERROR)),
        );

        let report = Report::new(
            "test",
            "http://localhost",
            "kube",
            2,
            Duration::from_secs(1),
            &metrics,
        )
        .unwrap();

        let browse = report.task(Task::BrowseProduct);
        assert_eq!(browse.requests, 4);
        assert_eq!(browse.bytes, 40);
        let latency = browse.latency.unwrap();
        assert!((latency.avg - 0.025).abs() < 1e-9);
        assert!(latency.max >= latency.p99 * 0.98);

        assert!(report.task(Task::Index).latency.is_none());
        assert_eq!(report.total.requests, 5);
        assert_eq!(report.total.failures, 1);
        assert_eq!(report.total.failure_reasons.get("HTTP 500"), Some(&1));
    }

    #[test]
    fn writes_json() {
        let report = Report::new(
            "test",
            "http://localhost",
            "compose",
            1,
            Duration::from_secs(3),
            &Metrics::default(),
        )
        .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        report.write_json(&path).unwrap();

        let value: serde_json::Value =
            serde_json::from_reader(std::fs::File::open(&path).unwrap()).unwrap();
        assert_eq!(value["catalog"], "compose");
        assert_eq!(value["elapsed"], "3s");
        assert_eq!(value["tasks"]["browse"]["requests"], 0);
        assert!(value["tasks"]["index"]["latency"].is_null());
    }
}
