//! End-to-end checks: classification into cuts, edge-fitted calibration
//! and an optimizer run against a synthetic measured spectrum.

use approx::assert_relative_eq;
use tofe_algorithms::{
    area_between_curves, classify, form_box_recoil, pick_final_solutions, prepare_measured,
    sum_abs_difference, CalibrationHistogram, NoStopping, Nsga2, Nsga2Config, Selection,
    SpectrumEvaluator, TofCalibration, TofCalibrationPoint,
};
use tofe_core::{BeamParams, DetectionType, DetectorGeometry, Element, EventPoint};

fn rect_selection(symbol: &str, x0: f64, x1: f64, y0: f64, y1: f64) -> Selection {
    Selection::new(
        DetectionType::Erd,
        Element::new(symbol),
        None,
        1.0,
        "red",
        vec![(x0, y0), (x1, y0), (x1, y1), (x0, y1)],
    )
}

#[test]
fn classification_feeds_calibration() {
    // Two populations of events; the hydrogen one carries an edge in its
    // ToF column.
    let mut events = Vec::new();
    let mut n = 0;
    for ch in 200_i64..280 {
        let count = if ch < 230 { (ch - 199) / 3 } else { 15 };
        for _ in 0..count {
            events.push(EventPoint::new(ch, 100, n));
            n += 1;
        }
    }
    for i in 0..50 {
        events.push(EventPoint::new(600, 400, n + i));
    }

    let selections = vec![
        rect_selection("H", 150.0, 350.0, 50.0, 150.0),
        rect_selection("Si", 550.0, 650.0, 350.0, 450.0),
    ];
    let cuts = classify(&events, &selections);
    assert_eq!(cuts.len(), 2);
    assert_eq!(cuts[1].events.len(), 50);
    let total: usize = cuts.iter().map(|c| c.events.len()).sum();
    assert_eq!(total, events.len());

    let histogram = CalibrationHistogram::from_events(&cuts[0].events, 2.0).unwrap();
    let edge = histogram.find_leading_edge();
    assert!(edge.is_some());
}

#[test]
fn calibration_line_from_two_elements() {
    let beam = BeamParams::default();
    let detector = DetectorGeometry::default();

    let mut calibration = TofCalibration::new();
    for (channel, symbol, isotope) in [(450.0, "H", 1), (820.0, "Si", 28)] {
        let target = Element::with_isotope(symbol, isotope);
        let point = TofCalibrationPoint::new(
            channel,
            DetectionType::Erd,
            &target,
            &beam,
            &detector,
            &NoStopping,
        )
        .unwrap();
        calibration.add_point(point);
    }
    let (slope, offset) = calibration.fit_linear().unwrap();
    assert!(slope.is_finite() && offset.is_finite());

    // The line reproduces its own calibration points.
    for point in &calibration.points {
        let seconds = calibration.channel_to_seconds(point.tof_channel).unwrap();
        assert_relative_eq!(seconds, point.tof_seconds, max_relative = 1e-9);
    }
}

/// Compares candidate box distributions against a fixed target box by
/// spectrum area and channel difference.
struct BoxTarget {
    target: Vec<(f64, f64)>,
}

impl SpectrumEvaluator for BoxTarget {
    fn evaluate(&self, genes: &[f64]) -> Option<[f64; 2]> {
        let candidate = form_box_recoil(genes)?;
        Some([
            area_between_curves(&candidate, &self.target, 1.0)?,
            sum_abs_difference(&candidate, &self.target, 1.0)?,
        ])
    }
}

#[test]
fn optimizer_recovers_a_box_distribution() {
    let evaluator = BoxTarget {
        target: form_box_recoil(&[40.0, 0.5]).unwrap(),
    };
    let mut config = Nsga2Config::new(30, 25, vec![1.0, 0.01], vec![110.0, 1.0]);
    config.seed = Some(42);

    let front = Nsga2::new(config).run(&evaluator);
    assert!(!front.is_empty());

    let [min_area, _median, min_distance] = pick_final_solutions(&front).unwrap();
    assert!(min_area.objectives[0].is_finite());
    assert!(min_distance.objective_distance().is_finite());
    // The best candidate should land close to the target box.
    assert!(min_area.objectives[0] < 5.0, "area = {}", min_area.objectives[0]);
}

#[test]
fn measured_preparation_preserves_total_shape() {
    let measured: Vec<(f64, f64)> = (0..20).map(|i| (f64::from(i), 100.0)).collect();
    let prepared = prepare_measured(&measured);
    assert_eq!(prepared.len(), measured.len() + 1);
    // Interior midpoints keep the plateau level.
    for p in &prepared[1..prepared.len() - 1] {
        assert_relative_eq!(p.1, 100.0);
    }
    assert_relative_eq!(prepared[0].1, 50.0);
}
