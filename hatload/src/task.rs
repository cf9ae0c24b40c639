//! The actions a simulated user performs against the storefront.

use std::fmt;

use rand::Rng;
use rand_distr::Distribution;
use rand_distr::weighted::WeightedIndex;
use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;

/// A single kind of request a simulated user can issue.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Task {
    /// Visit the homepage at `/`.
    Index,
    /// List all hats at `/list`.
    #[serde(rename = "list")]
    ListHats,
    /// Show a hat at `/hatme?style=<style>`.
    #[serde(rename = "browse")]
    BrowseProduct,
}

impl Task {
    /// All tasks in reporting order.
    pub const ALL: [Task; 3] = [Task::Index, Task::ListHats, Task::BrowseProduct];

    /// Short label used in the report and in configuration keys.
    pub fn name(self) -> &'static str {
        match self {
            Task::Index => "index",
            Task::ListHats => "list",
            Task::BrowseProduct => "browse",
        }
    }

    /// Position of this task in [`Task::ALL`].
    pub fn index(self) -> usize {
        match self {
            Task::Index => 0,
            Task::ListHats => 1,
            Task::BrowseProduct => 2,
        }
    }

    /// The relative frequency this task is picked with unless configured otherwise.
    pub fn default_weight(self) -> u32 {
        match self {
            Task::Index => 1,
            Task::ListHats => 4,
            Task::BrowseProduct => 20,
        }
    }

    /// Builds the request path for this task.
    ///
    /// Only [`Task::BrowseProduct`] consumes randomness, to pick a style from the catalog.
    pub fn path<R: Rng>(self, rng: &mut R, catalog: &Catalog) -> String {
        match self {
            Task::Index => "/".to_owned(),
            Task::ListHats => "/list".to_owned(),
            Task::BrowseProduct => format!("/hatme?style={}", catalog.choose(rng)),
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Relative weights of the tasks.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TaskWeights {
    /// Weight of [`Task::Index`].
    pub index: u32,
    /// Weight of [`Task::ListHats`].
    pub list: u32,
    /// Weight of [`Task::BrowseProduct`].
    pub browse: u32,
}

impl TaskWeights {
    /// Returns the weight of a single task.
    pub fn get(&self, task: Task) -> u32 {
        match task {
            Task::Index => self.index,
            Task::ListHats => self.list,
            Task::BrowseProduct => self.browse,
        }
    }

    fn as_array(&self) -> [u32; 3] {
        Task::ALL.map(|task| self.get(task))
    }
}

impl Default for TaskWeights {
    fn default() -> Self {
        Self {
            index: Task::Index.default_weight(),
            list: Task::ListHats.default_weight(),
            browse: Task::BrowseProduct.default_weight(),
        }
    }
}

/// Error returned when no task could ever be picked.
#[derive(Debug, thiserror::Error)]
#[error("invalid task weights: {0}")]
pub struct WeightsError(#[from] rand_distr::weighted::Error);

/// The weighted set of tasks every simulated user draws from.
#[derive(Clone, Debug)]
pub struct TaskSet {
    weights: TaskWeights,
    distribution: WeightedIndex<u32>,
}

impl TaskSet {
    /// Creates a task set from the given weights.
    ///
    /// Fails if all weights are zero.
    pub fn new(weights: TaskWeights) -> Result<Self, WeightsError> {
        let distribution = WeightedIndex::new(weights.as_array())?;
        Ok(Self {
            weights,
            distribution,
        })
    }

    /// The weights this set was created with.
    pub fn weights(&self) -> TaskWeights {
        self.weights
    }

    /// The task every user runs once before entering its loop.
    pub fn on_start(&self) -> Task {
        Task::Index
    }

    /// Picks the next task with probability proportional to its weight.
    pub fn next_task<R: Rng>(&self, rng: &mut R) -> Task {
        Task::ALL[self.distribution.sample(rng)]
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use crate::catalog::CatalogVariant;

    use super::*;

    #[test]
    fn default_weights_ratio() {
        let weights = TaskWeights::default();
        assert_eq!((weights.index, weights.list, weights.browse), (1, 4, 20));
        assert_eq!(TaskSet::new(TaskWeights::default()).unwrap().weights(), weights);
    }

    #[test]
    fn paths_follow_templates() {
        let mut rng = SmallRng::seed_from_u64(3);
        let catalog = Catalog::variant(CatalogVariant::Kube);

        assert_eq!(Task::Index.path(&mut rng, &catalog), "/");
        assert_eq!(Task::ListHats.path(&mut rng, &catalog), "/list");

        for _ in 0..100 {
            let path = Task::BrowseProduct.path(&mut rng, &catalog);
            let style = path.strip_prefix("/hatme?style=").unwrap();
            assert!(catalog.contains(style));
        }
    }

    #[test]
    fn sampling_follows_weights() {
        let mut rng = SmallRng::seed_from_u64(42);
        let tasks = TaskSet::new(TaskWeights::default()).unwrap();

        let mut counts = [0u32; 3];
        for _ in 0..25_000 {
            counts[tasks.next_task(&mut rng).index()] += 1;
        }

        // Expected 1000 / 4000 / 20000.
        assert!((800..1200).contains(&counts[0]), "{counts:?}");
        assert!((3600..4400).contains(&counts[1]), "{counts:?}");
        assert!((19_000..21_000).contains(&counts[2]), "{counts:?}");
    }

    #[test]
    fn zero_weight_is_never_picked() {
        let mut rng = SmallRng::seed_from_u64(0);
        let tasks = TaskSet::new(TaskWeights {
            index: 0,
            list: 1,
            browse: 1,
        })
        .unwrap();

        for _ in 0..1000 {
            assert_ne!(tasks.next_task(&mut rng), Task::Index);
        }
    }

    #[test]
    fn all_zero_weights_rejected() {
        let weights = TaskWeights {
            index: 0,
            list: 0,
            browse: 0,
        };
        assert!(TaskSet::new(weights).is_err());
    }

    #[test]
    fn on_start_is_index() {
        assert_eq!(TaskSet::new(TaskWeights::default()).unwrap().on_start(), Task::Index);
    }
}
