//! Event transitions and event-table construction.

use methylation_core::{
    error::SimError,
    event::{
        birth_event, birth_rate, demethylation_event, denovo_event, denovo_rate,
        maintenance_event, EventKind, EventTable, RateFn, TransitionFn,
    },
    params::{ParamKey, ParameterSet},
    rng::RunRng,
    state::Snapshot,
    stepper::apply,
};

#[test]
fn birth_clears_methylation_and_only_adds_unmethylated() {
    let mut rng = RunRng::new(2024, 0);
    let population = 100;
    for (m, u) in [(50, 50), (30, 20), (0, 0), (70, 0), (10, 85), (0, 100)] {
        let prev = Snapshot::new(m, u);
        for _ in 0..50 {
            let next = birth_event(&prev, population, 1, &mut rng).unwrap();
            assert_eq!(next.methylated, 0, "birth left methylated sites from {prev:?}");
            assert!(next.unmethylated >= prev.unmethylated, "birth lost unmethylated sites");
            assert!(
                next.unmethylated <= population - prev.methylated,
                "birth unmethylated more than the hemimethylated pool"
            );
        }
    }
}

#[test]
fn birth_with_no_hemimethylated_sites_keeps_unmethylated() {
    let mut rng = RunRng::new(1, 0);
    let next = birth_event(&Snapshot::new(60, 40), 100, 1, &mut rng).unwrap();
    assert_eq!(next, Snapshot::new(0, 40));
}

#[test]
fn single_site_transitions_move_one_site() {
    let mut rng = RunRng::new(1, 0);
    let prev = Snapshot::new(40, 30);
    assert_eq!(maintenance_event(&prev, 100, 1, &mut rng).unwrap(), Snapshot::new(41, 30));
    assert_eq!(denovo_event(&prev, 100, 1, &mut rng).unwrap(), Snapshot::new(40, 29));
    assert_eq!(demethylation_event(&prev, 100, 1, &mut rng).unwrap(), Snapshot::new(39, 30));
}

#[test]
fn transitions_refuse_to_leave_the_population() {
    let mut rng = RunRng::new(1, 0);
    let full = Snapshot::new(60, 40);
    assert!(matches!(
        maintenance_event(&full, 100, 3, &mut rng),
        Err(SimError::InvariantViolation { step: 3, .. })
    ));
    assert!(matches!(
        denovo_event(&Snapshot::new(10, 0), 100, 3, &mut rng),
        Err(SimError::InvariantViolation { .. })
    ));
    assert!(matches!(
        demethylation_event(&Snapshot::new(0, 10), 100, 3, &mut rng),
        Err(SimError::InvariantViolation { .. })
    ));
}

#[test]
fn stepper_applies_the_named_event() {
    let mut rng = RunRng::new(5, 0);
    let table = EventTable::collaborative();
    let next = apply(
        &Snapshot::new(20, 20),
        100,
        1,
        EventKind::MaintenanceDemethylation,
        &table,
        &mut rng,
    )
    .unwrap();
    assert_eq!(next, Snapshot::new(20, 21));
}

#[test]
fn stepper_rejects_events_outside_the_table() {
    let rates: Vec<(EventKind, RateFn)> = vec![(EventKind::Birth, birth_rate as RateFn)];
    let transitions: Vec<(EventKind, TransitionFn)> =
        vec![(EventKind::Birth, birth_event as TransitionFn)];
    let table = EventTable::from_parts(rates, transitions).unwrap();
    let mut rng = RunRng::new(5, 0);
    let err = apply(&Snapshot::new(5, 5), 100, 1, EventKind::Demethylation, &table, &mut rng)
        .unwrap_err();
    assert!(matches!(err, SimError::Configuration { .. }));
}

#[test]
fn preset_tables_use_the_default_order() {
    let kinds: Vec<EventKind> = EventTable::collaborative().kinds().collect();
    assert_eq!(kinds, EventTable::DEFAULT_ORDER.to_vec());
    assert_eq!(EventTable::basic().len(), 5);
}

#[test]
fn rate_without_transition_is_a_configuration_error() {
    let rates: Vec<(EventKind, RateFn)> = vec![
        (EventKind::Birth, birth_rate as RateFn),
        (EventKind::DeNovoMethylation, denovo_rate as RateFn),
    ];
    let transitions: Vec<(EventKind, TransitionFn)> =
        vec![(EventKind::Birth, birth_event as TransitionFn)];
    let err = EventTable::from_parts(rates, transitions).unwrap_err();
    assert!(
        matches!(err, SimError::Configuration { ref reason } if reason.contains("de novo")),
        "unexpected error: {err}"
    );
}

#[test]
fn transition_without_rate_is_a_configuration_error() {
    let rates: Vec<(EventKind, RateFn)> = vec![(EventKind::Birth, birth_rate as RateFn)];
    let transitions: Vec<(EventKind, TransitionFn)> = vec![
        (EventKind::Birth, birth_event as TransitionFn),
        (EventKind::DeNovoMethylation, denovo_event as TransitionFn),
    ];
    assert!(matches!(
        EventTable::from_parts(rates, transitions),
        Err(SimError::Configuration { .. })
    ));
}

#[test]
fn duplicate_events_are_rejected() {
    let rates: Vec<(EventKind, RateFn)> =
        vec![(EventKind::Birth, birth_rate as RateFn), (EventKind::Birth, birth_rate as RateFn)];
    let transitions: Vec<(EventKind, TransitionFn)> =
        vec![(EventKind::Birth, birth_event as TransitionFn)];
    assert!(matches!(
        EventTable::from_parts(rates, transitions),
        Err(SimError::Configuration { .. })
    ));
}

#[test]
fn validation_names_the_missing_parameter() {
    let params = ParameterSet::from_map([
        ("r_hm", 0.5),
        ("r_hm_m", 20.0),
        ("r_hm_h", 10.0),
        ("r_uh", 0.35),
        ("r_uh_m", 11.0),
        ("r_uh_h", 5.5),
        ("r_mh", 0.1),
        ("r_mh_u", 10.0),
        ("r_mh_h", 5.0),
        ("r_hu", 0.1),
        ("r_hu_u", 10.0),
        ("r_hu_h", 5.0),
    ])
    .unwrap();
    let err = EventTable::collaborative().validate(&params).unwrap_err();
    assert!(
        matches!(err, SimError::MissingParameter { key: "birth_rate", event: "birth" }),
        "unexpected error: {err}"
    );

    let complete = params.with(ParamKey::BirthRate, 1.0).unwrap();
    EventTable::collaborative().validate(&complete).unwrap();
}

#[test]
fn basic_table_needs_only_linear_coefficients() {
    let params = ParameterSet::from_map([
        ("r_hm", 0.5),
        ("r_uh", 0.35),
        ("r_mh", 0.1),
        ("r_hu", 0.1),
        ("birth_rate", 1.0),
    ])
    .unwrap();
    EventTable::basic().validate(&params).unwrap();
    assert!(EventTable::collaborative().validate(&params).is_err());
}
