//! A module for defining a [`Scenario`]: who visits the storefront, and how often.

use std::ops::RangeInclusive;
use std::time::Duration;

use rand::Rng;

use crate::catalog::Catalog;
use crate::task::{TaskSet, TaskWeights, WeightsError};

/// Errors when building a [`Scenario`].
#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    /// A scenario without users would not send any traffic.
    #[error("a scenario needs at least one user")]
    NoUsers,
    /// The spawn rate is zero, negative or not a number.
    #[error("spawn rate must be a positive number of users per second, got {0}")]
    InvalidSpawnRate(f64),
    /// The lower bound of the wait time exceeds the upper bound.
    #[error("wait time minimum {min:?} exceeds maximum {max:?}")]
    InvalidWaitTime {
        /// Lower bound.
        min: Duration,
        /// Upper bound.
        max: Duration,
    },
    /// No task has a positive weight.
    #[error(transparent)]
    Weights(#[from] WeightsError),
}

/// A uniformly distributed pause between two actions of the same user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WaitTime {
    min: Duration,
    max: Duration,
}

impl WaitTime {
    /// Waits between `min` and `max`, inclusive.
    pub fn between(min: Duration, max: Duration) -> Result<Self, ScenarioError> {
        if min > max {
            return Err(ScenarioError::InvalidWaitTime { min, max });
        }
        Ok(Self { min, max })
    }

    /// The bounds of the wait time.
    pub fn range(&self) -> RangeInclusive<Duration> {
        self.min..=self.max
    }

    /// Samples the next pause.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> Duration {
        if self.min == self.max {
            return self.min;
        }
        let secs = rng.random_range(self.min.as_secs_f64()..=self.max.as_secs_f64());
        // Float rounding can land outside the bounds, or beyond `Duration::MAX`.
        Duration::try_from_secs_f64(secs)
            .map_or(self.max, |pause| pause.clamp(self.min, self.max))
    }
}

impl Default for WaitTime {
    fn default() -> Self {
        Self {
            min: Duration::from_secs(1),
            max: Duration::from_secs(2),
        }
    }
}

/// A builder for creating a [`Scenario`].
#[derive(Debug)]
pub struct ScenarioBuilder {
    name: String,
    users: usize,
    spawn_rate: Option<f64>,
    wait_time: (Duration, Duration),
    weights: TaskWeights,
    catalog: Catalog,
    seed: u64,
}

impl ScenarioBuilder {
    /// The number of simulated users that run concurrently.
    pub fn users(mut self, users: usize) -> Self {
        self.users = users;
        self
    }

    /// How many users are started per second until all are running.
    ///
    /// By default, all users start at once.
    pub fn spawn_rate(mut self, users_per_second: f64) -> Self {
        self.spawn_rate = Some(users_per_second);
        self
    }

    /// The pause each user takes between two tasks.
    pub fn wait_time(mut self, min: Duration, max: Duration) -> Self {
        self.wait_time = (min, max);
        self
    }

    /// The ratio between index, list and browse tasks.
    pub fn task_weights(mut self, weights: TaskWeights) -> Self {
        self.weights = weights;
        self
    }

    /// The styles users browse.
    pub fn catalog(mut self, catalog: Catalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Seed for all randomness, making the sequence of requests per user reproducible.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Validates the settings and creates the scenario.
    pub fn build(self) -> Result<Scenario, ScenarioError> {
        if self.users == 0 {
            return Err(ScenarioError::NoUsers);
        }
        match self.spawn_rate {
            Some(rate) if !(rate.is_finite() && rate > 0.0) => {
                return Err(ScenarioError::InvalidSpawnRate(rate));
            }
            _ => (),
        }

        let (min, max) = self.wait_time;
        let wait_time = WaitTime::between(min, max)?;
        let tasks = TaskSet::new(self.weights)?;

        Ok(Scenario {
            name: self.name,
            users: self.users,
            spawn_rate: self.spawn_rate,
            wait_time,
            tasks,
            catalog: self.catalog,
            seed: self.seed,
        })
    }
}

/// Specification of the simulated traffic sent to the storefront.
#[derive(Clone, Debug)]
pub struct Scenario {
    /// Name of the scenario for identification in logs and the report.
    pub(crate) name: String,
    /// Number of users running concurrently.
    pub(crate) users: usize,
    /// Users started per second, or `None` to start all at once.
    pub(crate) spawn_rate: Option<f64>,
    pub(crate) wait_time: WaitTime,
    pub(crate) tasks: TaskSet,
    pub(crate) catalog: Catalog,
    /// Base seed, combined with the user id for every user's RNG.
    pub(crate) seed: u64,
}

impl Scenario {
    /// Constructs a new scenario builder with the given name.
    pub fn builder(name: impl Into<String>) -> ScenarioBuilder {
        let wait_time = WaitTime::default();
        ScenarioBuilder {
            name: name.into(),
            users: 10,
            spawn_rate: None,
            wait_time: (wait_time.min, wait_time.max),
            weights: TaskWeights::default(),
            catalog: Catalog::default(),
            seed: rand::random(),
        }
    }

    /// Name of the scenario.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of simulated users.
    pub fn users(&self) -> usize {
        self.users
    }

    /// The styles users browse.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// The weighted tasks users pick from.
    pub fn tasks(&self) -> &TaskSet {
        &self.tasks
    }

    /// The pause between two tasks of the same user.
    pub fn wait_time(&self) -> &WaitTime {
        &self.wait_time
    }

    /// Delay after the start of the run before the given user is started.
    pub(crate) fn spawn_delay(&self, user_id: usize) -> Duration {
        match self.spawn_rate {
            Some(rate) => {
                Duration::try_from_secs_f64(user_id as f64 / rate).unwrap_or(Duration::MAX)
            }
            None => Duration::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use crate::catalog::CatalogVariant;

    use super::*;

    #[test]
    fn defaults() {
        let scenario = Scenario::builder("test").build().unwrap();
        assert_eq!(scenario.users(), 10);
        assert_eq!(scenario.tasks().weights(), TaskWeights::default());
        assert_eq!(
            scenario.wait_time().range(),
            Duration::from_secs(1)..=Duration::from_secs(2)
        );
        assert_eq!(scenario.catalog().name(), "kube");
        assert_eq!(scenario.spawn_delay(9), Duration::ZERO);
    }

    #[test]
    fn both_variants_keep_weights() {
        for variant in [CatalogVariant::Kube, CatalogVariant::Compose] {
            let scenario = Scenario::builder("test")
                .catalog(Catalog::variant(variant))
                .build()
                .unwrap();
            let weights = scenario.tasks().weights();
            assert_eq!((weights.index, weights.list, weights.browse), (1, 4, 20));
        }
    }

    #[test]
    fn spawn_delay_follows_rate() {
        let scenario = Scenario::builder("test")
            .users(4)
            .spawn_rate(2.0)
            .build()
            .unwrap();
        assert_eq!(scenario.spawn_delay(0), Duration::ZERO);
        assert_eq!(scenario.spawn_delay(3), Duration::from_millis(1500));
    }

    #[test]
    fn rejects_invalid_settings() {
        assert!(matches!(
            Scenario::builder("test").users(0).build(),
            Err(ScenarioError::NoUsers)
        ));
        assert!(matches!(
            Scenario::builder("test").spawn_rate(0.0).build(),
            Err(ScenarioError::InvalidSpawnRate(_))
        ));
        assert!(matches!(
            Scenario::builder("test").spawn_rate(f64::NAN).build(),
            Err(ScenarioError::InvalidSpawnRate(_))
        ));
        assert!(matches!(
            Scenario::builder("test")
                .wait_time(Duration::from_secs(2), Duration::from_secs(1))
                .build(),
            Err(ScenarioError::InvalidWaitTime { .. })
        ));
        assert!(matches!(
            Scenario::builder("test")
                .task_weights(TaskWeights {
                    index: 0,
                    list: 0,
                    browse: 0
                })
                .build(),
            Err(ScenarioError::Weights(_))
        ));
    }

    #[test]
    fn wait_time_within_bounds() {
        let mut rng = SmallRng::seed_from_u64(5);
        let wait = WaitTime::default();
        for _ in 0..1000 {
            let pause = wait.sample(&mut rng);
            assert!(wait.range().contains(&pause), "{pause:?}");
        }

        let fixed = WaitTime::between(Duration::from_millis(5), Duration::from_millis(5)).unwrap();
        assert_eq!(fixed.sample(&mut rng), Duration::from_millis(5));
    }

    #[test]
    fn huge_wait_time_saturates() {
        let mut rng = SmallRng::seed_from_u64(5);
        let min = Duration::from_secs(u64::MAX - 1000);
        let wait = WaitTime::between(min, Duration::MAX).unwrap();
        for _ in 0..100 {
            let pause = wait.sample(&mut rng);
            assert!(wait.range().contains(&pause), "{pause:?}");
        }
    }

    #[test]
    fn tiny_spawn_rate_saturates() {
        let scenario = Scenario::builder("test")
            .users(2)
            .spawn_rate(1e-20)
            .build()
            .unwrap();
        assert_eq!(scenario.spawn_delay(0), Duration::ZERO);
        assert_eq!(scenario.spawn_delay(1), Duration::MAX);
    }
}
