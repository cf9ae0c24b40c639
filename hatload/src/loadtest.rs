//! Run a scenario's simulated users concurrently against the storefront and print a report.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tokio_util::sync::CancellationToken;

use crate::http::HttpRemote;
use crate::metrics::Metrics;
use crate::report::Report;
use crate::scenario::Scenario;
use crate::user::User;

/// Runs the scenario against the remote for the given duration.
///
/// All users share the remote's connection pool. When the duration elapses, users stop after
/// their current request. The report is printed and returned.
pub async fn run(remote: HttpRemote, scenario: Scenario, duration: Duration) -> Result<Report> {
    run_until(remote, scenario, duration, CancellationToken::new()).await
}

/// Like [`run`], but also stops early once `cancel` fires.
pub async fn run_until(
    remote: HttpRemote,
    scenario: Scenario,
    duration: Duration,
    cancel: CancellationToken,
) -> Result<Report> {
    let remote = Arc::new(remote);
    let scenario = Arc::new(scenario);

    tracing::info!(
        scenario = scenario.name(),
        host = remote.host(),
        users = scenario.users(),
        catalog = scenario.catalog().name(),
        ?duration,
        "starting load test"
    );

    let bar = ProgressBar::new_spinner()
        .with_style(ProgressStyle::with_template("{spinner} {msg} {elapsed}")?)
        .with_message(format!("Running {} users:", scenario.users()));
    bar.enable_steady_tick(Duration::from_millis(100));

    let start = Instant::now();

    // Stops all users once the duration has elapsed.
    let deadline = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(duration) => cancel.cancel(),
                _ = cancel.cancelled() => {}
            }
        })
    };

    let users: Vec<_> = (0..scenario.users())
        .map(|id| {
            let scenario = Arc::clone(&scenario);
            let remote = Arc::clone(&remote);
            let cancel = cancel.clone();
            tokio::spawn(async move {
                let delay = scenario.spawn_delay(id);
                tokio::select! {
                    _ = cancel.cancelled() => return Metrics::default(),
                    _ = tokio::time::sleep(delay) => {}
                }
                User::new(id, scenario, remote).run(cancel).await
            })
        })
        .collect();

    let finished = futures::future::join_all(users).await;
    let elapsed = start.elapsed();
    bar.finish_and_clear();

    cancel.cancel();
    deadline.await.context("deadline task failed")?;

    let mut metrics = Metrics::default();
    for user in finished {
        let user_metrics = user.context("simulated user panicked")?;
        metrics.merge(&user_metrics)?;
    }

    let report = Report::new(
        scenario.name(),
        remote.host(),
        scenario.catalog().name(),
        scenario.users(),
        elapsed,
        &metrics,
    )?;

    tracing::info!(
        requests = report.total.requests,
        failures = report.total.failures,
        ?elapsed,
        "load test finished"
    );
    report.print();

    Ok(report)
}
