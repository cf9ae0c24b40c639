//! Per-task request statistics collected by simulated users.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use anyhow::{Result, anyhow};
use sketches_ddsketch::DDSketch;

use crate::http;
use crate::task::Task;

/// Statistics of a single task.
#[derive(Default)]
pub struct TaskMetrics {
    /// Latency of every request in seconds, including failed ones.
    pub timing: DDSketch,
    /// Number of failed requests.
    pub failures: u64,
    /// Total size of all successful response bodies.
    pub bytes: u64,
    /// Failures grouped by [`http::Error::reason`].
    pub failure_reasons: BTreeMap<String, u64>,
}

impl TaskMetrics {
    /// Number of requests issued, including failed ones.
    pub fn requests(&self) -> u64 {
        self.timing.count() as u64
    }

    fn merge(&mut self, other: &TaskMetrics) -> Result<()> {
        self.timing
            .merge(&other.timing)
            .map_err(|err| anyhow!("failed to merge latency sketches: {err:?}"))?;
        self.failures += other.failures;
        self.bytes += other.bytes;
        for (reason, count) in &other.failure_reasons {
            *self.failure_reasons.entry(reason.clone()).or_default() += count;
        }
        Ok(())
    }
}

impl fmt::Debug for TaskMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskMetrics")
            .field("requests", &self.requests())
            .field("failures", &self.failures)
            .field("bytes", &self.bytes)
            .field("failure_reasons", &self.failure_reasons)
            .finish()
    }
}

/// Statistics of all tasks, indexed by [`Task::index`].
#[derive(Debug, Default)]
pub struct Metrics {
    tasks: [TaskMetrics; 3],
}

impl Metrics {
    /// Records the outcome of a single request.
    pub fn record(&mut self, task: Task, elapsed: Duration, result: &http::Result<http::Response>) {
        let metrics = &mut self.tasks[task.index()];
        metrics.timing.add(elapsed.as_secs_f64());
        match result {
            Ok(response) => metrics.bytes += response.bytes,
            Err(err) => {
                metrics.failures += 1;
                *metrics.failure_reasons.entry(err.reason()).or_default() += 1;
            }
        }
    }

    /// Returns the statistics of a single task.
    pub fn task(&self, task: Task) -> &TaskMetrics {
        &self.tasks[task.index()]
    }

    /// Adds all statistics of `other` into this instance.
    pub fn merge(&mut self, other: &Metrics) -> Result<()> {
        for (ours, theirs) in self.tasks.iter_mut().zip(&other.tasks) {
            ours.merge(theirs)?;
        }
        Ok(())
    }

    /// Combines the statistics of all tasks.
    pub fn total(&self) -> Result<TaskMetrics> {
        let mut total = TaskMetrics::default();
        for metrics in &self.tasks {
            total.merge(metrics)?;
        }
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;

    use super::*;

    fn ok(bytes: u64) -> http::Result<http::Response> {
        Ok(http::Response {
            status: StatusCode::OK,
            bytes,
        })
    }

    #[test]
    fn records_per_task() {
        let mut metrics = Metrics::default();
        metrics.record(Task::Index, Duration::from_millis(10), &ok(100));
        metrics.record(Task::BrowseProduct, Duration::from_millis(20), &ok(50));
        metrics.record(
            Task::BrowseProduct,
            Duration::from_millis(30),
            &Err(http::Error::Status(StatusCode::BAD_REQUEST)),
        );

        assert_eq!(metrics.task(Task::Index).requests(), 1);
        assert_eq!(metrics.task(Task::Index).bytes, 100);
        assert_eq!(metrics.task(Task::ListHats).requests(), 0);

        let browse = metrics.task(Task::BrowseProduct);
        assert_eq!(browse.requests(), 2);
        assert_eq!(browse.failures, 1);
        assert_eq!(browse.bytes, 50);
        assert_eq!(browse.failure_reasons.get("HTTP 400"), Some(&1));
    }

    #[test]
    fn merge_and_total() {
        let mut a = Metrics::default();
        a.record(Task::ListHats, Duration::from_millis(5), &ok(10));
        a.record(
            Task::ListHats,
            Duration::from_millis(5),
            &Err(http::Error::Status(StatusCode::BAD_GATEWAY)),
        );

        let mut b = Metrics::default();
        b.record(Task::ListHats, Duration::from_millis(7), &ok(20));
        b.record(Task::Index, Duration::from_millis(1), &ok(1));
        b.record(
            Task::Index,
            Duration::from_millis(1),
            &Err(http::Error::Status(StatusCode::BAD_GATEWAY)),
        );

        a.merge(&b).unwrap();
        let list = a.task(Task::ListHats);
        assert_eq!(list.requests(), 3);
        assert_eq!(list.bytes, 30);

        let total = a.total().unwrap();
        assert_eq!(total.requests(), 5);
        assert_eq!(total.failures, 2);
        assert_eq!(total.failure_reasons.get("HTTP 502"), Some(&2));
    }
}
