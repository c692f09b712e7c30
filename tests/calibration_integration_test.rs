//! Integration tests for the calibration workflow
//!
//! These tests run the bundled reference dataset through the public API:
//! - Base fit and lookup-table derivation
//! - One- and two-point recalibration, and restore
//! - Error reporting for unusable anchors
//! - Melting-curve inverse lookups at the fixed points

use approx::assert_abs_diff_eq;
use mct_thermometry::calibration::{AnchorPoint, CalibrationKind, DEFAULT_DATASET_PATH};
use mct_thermometry::config::CalibrationConfig;
use mct_thermometry::error::CalibrationError;
use mct_thermometry::managers::{CalibrationEventKind, CalibrationManager};
use mct_thermometry::melting_curve::{shared_curve, FIXED_POINTS, P_MIN};
use mct_thermometry::ReferenceDataset;

fn manager() -> CalibrationManager {
    CalibrationManager::new(&CalibrationConfig::default()).expect("bundled dataset loads")
}

#[test]
fn test_reference_curve_has_single_minimum() {
    let curve = shared_curve();
    assert_eq!(curve.len(), 2000);
    assert_eq!(curve.p_min_index(), 1623);
    assert!(curve.has_single_minimum());
    assert_abs_diff_eq!(curve.min_pressure(), P_MIN.pressure_mpa, epsilon = 1e-4);
}

#[test]
fn test_base_fit_has_requested_degree() {
    let manager = manager();
    let coefficients = manager.coefficients().unwrap();
    assert_eq!(coefficients.len(), 5);
    assert!(coefficients.iter().all(|c| c.is_finite()));

    let summary = manager.summary().unwrap();
    assert_eq!(summary.kind, CalibrationKind::Base);
    assert_eq!(summary.coefficients, summary.base_coefficients);
    assert_eq!(summary.table_len, 2000);
}

#[test]
fn test_base_fit_reproduces_dataset() {
    let manager = manager();
    let snapshot = manager.snapshot().unwrap();
    let dataset = ReferenceDataset::load(DEFAULT_DATASET_PATH).unwrap();

    for (&c, &p) in dataset.capacitance_pf().iter().zip(dataset.pressure_mpa()) {
        let fitted = 1.0 / snapshot.current().evaluate(p);
        assert_abs_diff_eq!(fitted, c, epsilon = 0.01);
    }
}

#[test]
fn test_low_branch_temperature_in_expected_range() {
    let manager = manager();
    let t = manager.capacitance_to_temperature_low(74.0).unwrap();
    assert!(t > 80.0 && t < 95.0, "T_low(74 pF) = {t} mK");

    // Larger capacitance means higher pressure, so colder on this branch
    let colder = manager.capacitance_to_temperature_low(80.0).unwrap();
    assert!(colder < t);
}

#[test]
fn test_high_branch_is_above_minimum() {
    let manager = manager();
    let t = manager.capacitance_to_temperature_high(74.0).unwrap();
    assert!(t > P_MIN.temperature_mk, "T_high(74 pF) = {t} mK");
}

#[test]
fn test_high_branch_pressure_matches_temperature() {
    let manager = manager();
    let p = manager.capacitance_to_pressure_high(74.0).unwrap();
    let t = manager.capacitance_to_temperature_high(74.0).unwrap();
    assert!(p > P_MIN.pressure_mpa);
    assert_abs_diff_eq!(manager.temperature_to_pressure(t), p, epsilon = 1e-3);
}

#[test]
fn test_out_of_range_capacitance_clamps() {
    let manager = manager();
    let far_below = manager.capacitance_to_temperature_low(10.0).unwrap();
    let just_below = manager.capacitance_to_temperature_low(60.0).unwrap();
    assert_eq!(far_below, just_below);
    assert!(far_below > 300.0 && far_below < P_MIN.temperature_mk);

    let far_above = manager.capacitance_to_temperature_low(500.0).unwrap();
    assert_abs_diff_eq!(
        far_above,
        shared_curve().temperatures_k()[0] * 1e3,
        epsilon = 1e-9
    );
}

#[test]
fn test_one_point_recalibration_pins_anchor() {
    let manager = manager();
    let base = manager.coefficients().unwrap();
    let updated = manager
        .recalibrate(&[AnchorPoint::new(65.06, 2.93113)])
        .unwrap();

    // Only the constant term moves
    assert_eq!(updated.len(), base.len());
    assert_eq!(&updated[..4], &base[..4]);
    assert_ne!(updated[4], base[4]);

    let snapshot = manager.snapshot().unwrap();
    assert_abs_diff_eq!(
        snapshot.current().evaluate(2.93113),
        1.0 / 65.06,
        epsilon = 1e-9
    );

    let p = manager.capacitance_to_pressure_low(65.06).unwrap();
    assert_abs_diff_eq!(p, 2.93113, epsilon = 1e-4);
}

#[test]
fn test_lookup_branches_are_monotonic() {
    let manager = manager();
    let snapshot = manager.snapshot().unwrap();
    let table = snapshot.table();

    for branch in [
        table.low_temperature_branch(),
        table.high_temperature_branch(),
        table.low_pressure_branch(),
        table.high_pressure_branch(),
    ] {
        assert!(!branch.is_empty());
        assert!(branch.is_monotonic());
    }
    assert!(table
        .low_pressure_branch()
        .capacitance_pf()
        .iter()
        .all(|&c| c < 75.0));
}

#[test]
fn test_two_point_recalibration_pins_both_anchors() {
    let manager = manager();
    let anchors = [AnchorPoint::new(66.0, 2.95), AnchorPoint::new(72.0, 3.1)];
    let updated = manager.recalibrate(&anchors).unwrap();

    let snapshot = manager.snapshot().unwrap();
    assert_eq!(snapshot.kind(), CalibrationKind::TwoPoint);
    for anchor in anchors {
        let inverse = snapshot.current().evaluate(anchor.pressure_mpa);
        assert_abs_diff_eq!(inverse, 1.0 / anchor.capacitance_pf, epsilon = 1e-12);
    }
    assert_eq!(updated, snapshot.current().coefficients());
}

#[test]
fn test_repeated_recalibration_does_not_compound() {
    let manager = manager();
    let anchor = [AnchorPoint::new(65.2, 2.93113)];
    let first = manager.recalibrate(&anchor).unwrap();
    let second = manager.recalibrate(&anchor).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_equal_pressure_anchors_rejected() {
    let manager = manager();
    let before = manager.coefficients().unwrap();

    let result = manager.recalibrate(&[
        AnchorPoint::new(66.0, 3.0),
        AnchorPoint::new(70.0, 3.0),
    ]);
    assert!(matches!(result, Err(CalibrationError::NumericError { .. })));
    assert_eq!(manager.coefficients().unwrap(), before);
}

#[test]
fn test_wrong_anchor_count_rejected() {
    let manager = manager();
    assert!(matches!(
        manager.recalibrate(&[]),
        Err(CalibrationError::InvalidArgument { .. })
    ));

    let three = [
        AnchorPoint::new(66.0, 2.95),
        AnchorPoint::new(68.0, 3.0),
        AnchorPoint::new(72.0, 3.1),
    ];
    assert!(matches!(
        manager.recalibrate(&three),
        Err(CalibrationError::InvalidArgument { .. })
    ));
}

#[test]
fn test_restore_original_returns_base_fit() {
    let manager = manager();
    let base = manager.coefficients().unwrap();
    let base_low = manager.capacitance_to_temperature_low(74.0).unwrap();

    manager.recalibrate_from_pmin(65.3).unwrap();
    assert_ne!(manager.coefficients().unwrap(), base);

    let restored = manager.restore_original().unwrap();
    assert_eq!(restored, base);
    assert_eq!(manager.capacitance_to_temperature_low(74.0).unwrap(), base_low);
    assert_eq!(manager.summary().unwrap().kind, CalibrationKind::Base);
}

#[test]
fn test_subscribers_see_each_swap() {
    let manager = manager();
    let mut events = manager.subscribe();

    manager.recalibrate(&[AnchorPoint::new(65.06, 2.93113)]).unwrap();
    manager.restore_original().unwrap();

    let first = events.try_recv().unwrap();
    assert_eq!(first.kind, CalibrationEventKind::Recalibrated);
    assert_eq!(first.summary.kind, CalibrationKind::OnePoint);

    let second = events.try_recv().unwrap();
    assert_eq!(second.kind, CalibrationEventKind::Restored);
    assert!(events.try_recv().is_err());
}

#[test]
fn test_fixed_points_invert_on_low_branch() {
    let manager = manager();
    for point in FIXED_POINTS.iter().filter(|p| p.name != P_MIN.name) {
        let (low, high) = manager
            .pressure_to_temperatures(point.pressure_mpa)
            .expect("fixed point lies on the curve");
        assert_abs_diff_eq!(low, point.temperature_mk, epsilon = 0.005);
        assert!(high > P_MIN.temperature_mk);
    }
}

#[test]
fn test_pressure_below_minimum_has_no_temperature() {
    let manager = manager();
    assert!(manager.pressure_to_temperatures(2.9).is_none());

    let p = manager.temperature_to_pressure(P_MIN.temperature_mk);
    assert_abs_diff_eq!(p, P_MIN.pressure_mpa, epsilon = 1e-4);
}

#[test]
fn test_missing_dataset_reports_path() {
    let config = CalibrationConfig {
        dataset_path: "/nonexistent/mct_reference.tsv".into(),
        ..CalibrationConfig::default()
    };
    match CalibrationManager::new(&config) {
        Err(CalibrationError::DatasetNotFound { path }) => {
            assert!(path.ends_with("mct_reference.tsv"));
        }
        other => panic!("expected DatasetNotFound, got {:?}", other.err()),
    }
}

#[tokio::test]
async fn test_async_subscriber_receives_recalibration() {
    let manager = manager();
    let mut events = manager.subscribe();

    let listener = tokio::spawn(async move { events.recv().await });
    manager.recalibrate_from_pmin(65.1).unwrap();

    let event = listener.await.unwrap().unwrap();
    assert_eq!(event.kind, CalibrationEventKind::Recalibrated);
    assert_eq!(event.summary.anchors.len(), 1);
    assert_abs_diff_eq!(
        event.summary.anchors[0].pressure_mpa,
        P_MIN.pressure_mpa,
        epsilon = 1e-12
    );
}
