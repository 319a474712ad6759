//! Switching-time runs and batch tallies.

use methylation_core::{
    batch::{run_switch_batch, BatchTally},
    classify::{Classifier, Direction, MacroState, SwitchTarget},
    config::SimConfig,
    engine::{
        run_long, run_simulation, run_until_switch, BudgetLimit, RunBudget, RunSetup, RunStatus,
        SwitchOutcome,
    },
    error::SimError,
    event::EventTable,
    params::ParameterSet,
    rng::{RngBank, RunRng},
    state::{InitialSplit, Snapshot},
    types::TIMEOUT_SENTINEL,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn default_switching_run_returns_time_or_sentinel() {
    init_logging();
    let config = SimConfig::default_test();
    let table = config.table();
    let target = SwitchTarget::new(Direction::Unmethylated, Classifier::default(), Some(0.3)).unwrap();

    for seed in 0..20 {
        let outcome = run_until_switch(&config.setup(&table), &target, RunRng::new(seed, 0)).unwrap();
        let t = outcome.sentinel_time();
        assert!(
            t >= 0.0 || t == TIMEOUT_SENTINEL,
            "seed {seed}: invalid switching time {t}"
        );
    }
}

#[test]
fn run_inside_the_secondary_band_switches_on_first_step() {
    let mut config = SimConfig::default_test();
    config.initial_split = InitialSplit::Explicit { methylated: 25, unmethylated: 40 };
    let table = config.table();
    let target = SwitchTarget::new(Direction::Unmethylated, Classifier::default(), Some(0.3)).unwrap();

    let outcome = run_until_switch(&config.setup(&table), &target, RunRng::new(9, 0)).unwrap();
    match outcome {
        SwitchOutcome::Switched { time, step } => {
            assert_eq!(step, 1);
            assert!(time >= 0.0);
        }
        other => panic!("expected a switch, got {other:?}"),
    }
    assert_eq!(outcome.status(), RunStatus::TerminatedByAbsorption);
}

fn no_maintenance_params() -> ParameterSet {
    ParameterSet::from_map([
        ("r_hm", 0.0),
        ("r_uh", 1.0),
        ("r_mh", 1.0),
        ("r_hu", 1.0),
        ("birth_rate", 1.0),
    ])
    .unwrap()
}

#[test]
fn unreachable_target_times_out_with_sentinel() {
    let params = no_maintenance_params();
    let table = EventTable::basic();
    let setup = RunSetup {
        population: 100,
        split: InitialSplit::Explicit { methylated: 10, unmethylated: 10 },
        budget: RunBudget::steps(500),
        params: &params,
        table: &table,
    };
    let target = SwitchTarget::new(Direction::Methylated, Classifier::default(), None).unwrap();

    let outcome = run_until_switch(&setup, &target, RunRng::new(1, 0)).unwrap();
    assert!(
        matches!(outcome, SwitchOutcome::TimedOut { step: 500, limit: BudgetLimit::Steps, .. }),
        "got {outcome:?}"
    );
    assert_eq!(outcome.sentinel_time(), TIMEOUT_SENTINEL);
    assert_eq!(outcome.switching_time(), None);
    assert_eq!(outcome.status(), RunStatus::TerminatedByStepBudget);
}

#[test]
fn time_budget_ends_switching_run_with_time_status() {
    let params = no_maintenance_params();
    let table = EventTable::basic();
    let setup = RunSetup {
        population: 100,
        split: InitialSplit::Explicit { methylated: 10, unmethylated: 10 },
        budget: RunBudget::steps(u64::MAX).with_time(0.5),
        params: &params,
        table: &table,
    };
    let target = SwitchTarget::new(Direction::Methylated, Classifier::default(), None).unwrap();

    let outcome = run_until_switch(&setup, &target, RunRng::new(2, 0)).unwrap();
    match outcome {
        SwitchOutcome::TimedOut { time, limit, .. } => {
            assert_eq!(limit, BudgetLimit::Time);
            assert!(time >= 0.5);
        }
        other => panic!("expected a time-budget stop, got {other:?}"),
    }
    assert_eq!(outcome.sentinel_time(), TIMEOUT_SENTINEL);
    assert_eq!(outcome.status(), RunStatus::TerminatedByTimeBudget);
}

fn frozen_params() -> ParameterSet {
    ParameterSet::from_map([
        ("r_hm", 0.0),
        ("r_uh", 0.0),
        ("r_mh", 0.0),
        ("r_hu", 0.0),
        ("birth_rate", 0.0),
    ])
    .unwrap()
}

#[test]
fn degenerate_state_stalls_a_switching_run() {
    let params = frozen_params();
    let table = EventTable::basic();
    let setup = RunSetup {
        population: 100,
        split: InitialSplit::Even,
        budget: RunBudget::steps(100),
        params: &params,
        table: &table,
    };
    let target = SwitchTarget::new(Direction::Unmethylated, Classifier::default(), None).unwrap();

    let outcome = run_until_switch(&setup, &target, RunRng::new(1, 0)).unwrap();
    assert_eq!(outcome, SwitchOutcome::Stalled { time: 0.0, step: 1 });
    assert_eq!(outcome.sentinel_time(), TIMEOUT_SENTINEL);
    assert_eq!(outcome.status(), RunStatus::TerminatedByDegenerateState);
}

#[test]
fn degenerate_state_is_fatal_for_fixed_budget_runs() {
    let params = frozen_params();
    let table = EventTable::basic();
    let setup = RunSetup {
        population: 100,
        split: InitialSplit::Even,
        budget: RunBudget::steps(100),
        params: &params,
        table: &table,
    };
    assert!(matches!(
        run_simulation(&setup, RunRng::new(1, 0)),
        Err(SimError::DegenerateState { step: 1, .. })
    ));
    assert!(matches!(
        run_long(&setup, &Classifier::default(), 10, RunRng::new(1, 0)),
        Err(SimError::DegenerateState { .. })
    ));
}

#[test]
fn classifier_bands() {
    let c = Classifier::default();
    assert_eq!(c.classify(&Snapshot::new(71, 0), 100), MacroState::High);
    assert_eq!(c.classify(&Snapshot::new(70, 0), 100), MacroState::Mixed);
    assert_eq!(c.classify(&Snapshot::new(0, 71), 100), MacroState::Low);
    assert_eq!(c.classify(&Snapshot::new(29, 40), 100), MacroState::MostlyLow);
    assert_eq!(c.classify(&Snapshot::new(30, 40), 100), MacroState::Mixed);
}

#[test]
fn secondary_threshold_widens_the_unmethylated_target() {
    let strict = SwitchTarget::new(Direction::Unmethylated, Classifier::default(), None).unwrap();
    let loose = SwitchTarget::new(Direction::Unmethylated, Classifier::default(), Some(0.3)).unwrap();
    let mostly_low = Snapshot::new(10, 50);
    assert!(!strict.reached(&mostly_low, 100));
    assert!(loose.reached(&mostly_low, 100));
    assert!(strict.reached(&Snapshot::new(0, 80), 100));
    assert!(!loose.reached(&Snapshot::new(80, 0), 100));
}

#[test]
fn direction_signs() {
    assert_eq!(Direction::from_sign(-1).unwrap(), Direction::Unmethylated);
    assert_eq!(Direction::from_sign(1).unwrap().sign(), 1);
    assert!(Direction::from_sign(0).is_err());
}

#[test]
fn batch_tally_accounts_for_every_run() {
    let mut config = SimConfig::default_test();
    config.max_steps = 2_000;
    let table = config.table();
    let target = config.switch_target().unwrap();
    let bank = RngBank::new(config.seed);

    let tally = run_switch_batch(&config.setup(&table), &target, &bank, 12).unwrap();
    assert_eq!(tally.total_runs(), 12);
    assert!(tally.samples.iter().all(|t| *t >= 0.0), "sentinel leaked into samples");

    let again = run_switch_batch(&config.setup(&table), &target, &bank, 12).unwrap();
    assert_eq!(tally, again, "batch is not reproducible");
}

#[test]
fn tally_from_sentinel_times_filters_timeouts() {
    let tally = BatchTally::from_sentinel_times(&[1.5, TIMEOUT_SENTINEL, 0.25, TIMEOUT_SENTINEL]);
    assert_eq!(tally.samples, vec![1.5, 0.25]);
    assert_eq!(tally.timeouts, 2);
    assert_eq!(tally.total_runs(), 4);
}
