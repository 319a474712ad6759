use serde::{Deserialize, Serialize};

use crate::{
    classify::{Classifier, Direction, SwitchTarget},
    engine::{RunBudget, RunSetup},
    error::{SimError, SimResult},
    event::{EventTable, RateLaw},
    params::ParameterSet,
    state::InitialSplit,
    types::{SiteCount, SimTime, Step},
};

pub const DEFAULT_SEED: u64 = 42;
pub const DEFAULT_CHECKPOINT_INTERVAL: Step = 100;
pub const DEFAULT_BATCH_SIZE: u64 = 10;

/// On-disk shape. Optional fields fall back to the defaults below.
#[derive(Debug, Clone, Deserialize)]
struct SimConfigFile {
    population: SiteCount,
    #[serde(default)]
    initial_split: Option<InitialSplit>,
    max_steps: Step,
    #[serde(default)]
    max_time: Option<SimTime>,
    #[serde(default)]
    seed: Option<u64>,
    #[serde(default)]
    rate_law: RateLaw,
    #[serde(default)]
    parameters: Option<ParameterSet>,
    #[serde(default)]
    classifier: Classifier,
    #[serde(default)]
    switch_direction: Direction,
    #[serde(default)]
    secondary_threshold: Option<f64>,
    #[serde(default)]
    checkpoint_interval: Option<Step>,
    #[serde(default)]
    batch_size: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SimConfig {
    pub population: SiteCount,
    pub initial_split: InitialSplit,
    pub max_steps: Step,
    pub max_time: Option<SimTime>,
    pub seed: u64,
    pub rate_law: RateLaw,
    pub parameters: ParameterSet,
    pub classifier: Classifier,
    pub switch_direction: Direction,
    pub secondary_threshold: Option<f64>,
    pub checkpoint_interval: Step,
    pub batch_size: u64,
}

impl SimConfig {
    /// Load a run configuration from a JSON file.
    /// In tests, use SimConfig::default_test().
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config = Self::from_json(&content)
            .map_err(|e| anyhow::anyhow!("Invalid config {path}: {e}"))?;
        Ok(config)
    }

    pub fn from_json(content: &str) -> SimResult<Self> {
        let file: SimConfigFile = serde_json::from_str(content)?;
        let config = Self {
            population: file.population,
            initial_split: file.initial_split.unwrap_or(InitialSplit::Even),
            max_steps: file.max_steps,
            max_time: file.max_time,
            seed: file.seed.unwrap_or(DEFAULT_SEED),
            rate_law: file.rate_law,
            parameters: file
                .parameters
                .unwrap_or_else(|| ParameterSet::default_for_population(file.population)),
            classifier: file.classifier,
            switch_direction: file.switch_direction,
            secondary_threshold: file.secondary_threshold,
            checkpoint_interval: file.checkpoint_interval.unwrap_or(DEFAULT_CHECKPOINT_INTERVAL),
            batch_size: file.batch_size.unwrap_or(DEFAULT_BATCH_SIZE),
        };
        config.validate()?;
        Ok(config)
    }

    /// Config with hardcoded defaults for use in tests:
    /// 100 sites split evenly, collaborative rates, 10 000 steps.
    pub fn default_test() -> Self {
        Self {
            population: 100,
            initial_split: InitialSplit::Even,
            max_steps: 10_000,
            max_time: None,
            seed: DEFAULT_SEED,
            rate_law: RateLaw::Collaborative,
            parameters: ParameterSet::default_for_population(100),
            classifier: Classifier::default(),
            switch_direction: Direction::Unmethylated,
            secondary_threshold: Some(0.3),
            checkpoint_interval: DEFAULT_CHECKPOINT_INTERVAL,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Checks everything that does not need a run to discover.
    pub fn validate(&self) -> SimResult<()> {
        if self.population == 0 {
            return Err(SimError::config("population must be at least 1"));
        }
        self.initial_split
            .snapshot(self.population)
            .hemimethylated(self.population, 0)?;
        self.budget().validate()?;
        self.classifier.validate()?;
        self.table().validate(&self.parameters)?;
        self.switch_target()?;
        Ok(())
    }

    pub fn table(&self) -> EventTable {
        EventTable::for_law(self.rate_law)
    }

    pub fn budget(&self) -> RunBudget {
        RunBudget {
            max_steps: self.max_steps,
            max_time: self.max_time,
        }
    }

    pub fn switch_target(&self) -> SimResult<SwitchTarget> {
        SwitchTarget::new(self.switch_direction, self.classifier, self.secondary_threshold)
    }

    /// Borrow this config as a run setup over `table`.
    pub fn setup<'a>(&'a self, table: &'a EventTable) -> RunSetup<'a> {
        RunSetup {
            population: self.population,
            split: self.initial_split,
            budget: self.budget(),
            params: &self.parameters,
            table,
        }
    }
}
