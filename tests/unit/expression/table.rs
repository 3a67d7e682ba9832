use super::*;

fn table(mode: TableMode, pairs: &[(f32, f32)]) -> TableDef {
    TableDef::new(
        "t",
        mode,
        pairs
            .iter()
            .map(|&(input, output)| TableSample { input, output })
            .collect(),
    )
}

#[test]
fn empty_table_yields_zero() {
    let t = table(TableMode::Wrap, &[]);
    assert_eq!(t.lookup(0.7), 0.0);
}

#[test]
fn single_sample_table_yields_its_output() {
    let t = table(TableMode::Clamp, &[(0.0, 3.5)]);
    assert_eq!(t.lookup(-10.0), 3.5);
    assert_eq!(t.lookup(10.0), 3.5);
}

#[test]
fn interpolates_between_samples() {
    let t = table(TableMode::Clamp, &[(0.0, 0.0), (1.0, 2.0)]);
    assert_eq!(t.lookup(0.25), 0.5);
    assert_eq!(t.lookup(0.5), 1.0);
}

#[test]
fn wrap_reduces_indices_modulo_the_domain() {
    let t = table(TableMode::Wrap, &[(0.0, 0.0), (1.0, 1.0)]);
    // Domain [0, 1]: 2.5 lands on the same sample position as 0.5.
    assert_eq!(t.lookup(2.5), t.lookup(0.5));
    assert_eq!(t.lookup(-0.25), t.lookup(0.75));
}

#[test]
fn clamp_pins_to_the_endpoints() {
    let t = table(TableMode::Clamp, &[(0.0, 0.0), (2.0, 4.0)]);
    // Domain [0, 2]: 5 behaves as 2, -1 as 0.
    assert_eq!(t.lookup(5.0), t.lookup(2.0));
    assert_eq!(t.lookup(-1.0), t.lookup(0.0));
    assert_eq!(t.lookup(5.0), 4.0);
}

#[test]
fn snap_takes_the_sample_at_or_below() {
    let t = table(TableMode::Snap, &[(0.0, 10.0), (1.0, 20.0), (2.0, 30.0)]);
    assert_eq!(t.lookup(0.0), 10.0);
    assert_eq!(t.lookup(0.9), 10.0);
    assert_eq!(t.lookup(1.5), 20.0);
    // Snap still wraps out-of-domain indices.
    assert_eq!(t.lookup(2.5), 10.0);
}

#[test]
fn snap_at_an_exact_sample_yields_that_sample() {
    let t = table(TableMode::Snap, &[(0.0, 10.0), (1.0, 20.0), (2.0, 30.0)]);
    assert_eq!(t.lookup(1.0), 20.0);
    // The exact domain end wraps back to the first sample.
    assert_eq!(t.lookup(2.0), 10.0);
}

#[test]
fn domain_need_not_start_at_zero() {
    let t = table(TableMode::Clamp, &[(1.0, 1.0), (3.0, 5.0)]);
    assert_eq!(t.lookup(2.0), 3.0);
    assert_eq!(t.lookup(0.0), 1.0);
}

#[test]
fn table_defs_round_trip_through_json() {
    let t = table(TableMode::Snap, &[(0.0, 1.0), (1.0, 2.0)]);
    let json = serde_json::to_string(&t).unwrap();
    let back: TableDef = serde_json::from_str(&json).unwrap();
    assert_eq!(back, t);
}

#[test]
fn table_set_resolves_by_name() {
    let mut set = TableSet::new();
    set.insert(table(TableMode::Wrap, &[(0.0, 0.0), (1.0, 1.0)]));
    assert!(set.table("t").is_some());
    assert!(set.table("missing").is_none());
}
