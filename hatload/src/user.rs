//! A single simulated user browsing the storefront.

use std::sync::Arc;
use std::time::Instant;

use rand::SeedableRng;
use rand::rngs::SmallRng;
use tokio_util::sync::CancellationToken;

use crate::http::HttpRemote;
use crate::metrics::Metrics;
use crate::scenario::Scenario;
use crate::task::Task;

/// A simulated user.
///
/// The user visits the homepage once, then keeps picking weighted tasks with a random pause in
/// between until the run is cancelled.
#[derive(Debug)]
pub(crate) struct User {
    id: usize,
    rng: SmallRng,
    scenario: Arc<Scenario>,
    remote: Arc<HttpRemote>,
    metrics: Metrics,
}

impl User {
    pub(crate) fn new(id: usize, scenario: Arc<Scenario>, remote: Arc<HttpRemote>) -> Self {
        let rng = SmallRng::seed_from_u64(scenario.seed.wrapping_add(id as u64));
        Self {
            id,
            rng,
            scenario,
            remote,
            metrics: Metrics::default(),
        }
    }

    /// Runs the user until `cancel` fires and returns its statistics.
    ///
    /// Cancellation interrupts the pause between tasks. A request that is already in flight runs
    /// to completion and is recorded.
    pub(crate) async fn run(mut self, cancel: CancellationToken) -> Metrics {
        if cancel.is_cancelled() {
            return self.metrics;
        }

        tracing::trace!(user = self.id, "user started");
        let task = self.scenario.tasks.on_start();
        self.execute(task).await;

        loop {
            if cancel.is_cancelled() {
                break;
            }

            let task = self.scenario.tasks.next_task(&mut self.rng);
            self.execute(task).await;

            let pause = self.scenario.wait_time.sample(&mut self.rng);
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(pause) => {}
            }
        }

        tracing::trace!(user = self.id, "user stopped");
        self.metrics
    }

    async fn execute(&mut self, task: Task) {
        let path = task.path(&mut self.rng, &self.scenario.catalog);

        let start = Instant::now();
        let result = self.remote.get(&path).await;
        let elapsed = start.elapsed();

        match &result {
            Ok(response) => {
                tracing::trace!(user = self.id, %task, path = %path, status = %response.status, ?elapsed);
            }
            Err(error) => {
                tracing::debug!(user = self.id, %task, path = %path, %error, "request failed");
            }
        }

        self.metrics.record(task, elapsed, &result);
    }
}
