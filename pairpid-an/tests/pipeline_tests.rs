//! End-to-end runs through the engine
//!
//! Covers the K*(892) → K+π- reconstruction, ghost pair rejection, the
//! file-based input/output path and calibration loading.

mod helpers;

use helpers::*;
use pairpid_an::calibration::CalibrationSet;
use pairpid_an::sink::write_result;
use pairpid_an::{Engine, FinalResult, JsonLinesSource, MemorySource, PidTier, Progress};
use pairpid_common::config::AnalysisConfig;
use pairpid_common::{Charge, Detector, Error, Species, Track};
use std::sync::Arc;
use tempfile::TempDir;

const KSTAR_MASS: f64 = 0.892;

fn engine(config: &AnalysisConfig) -> Engine {
    Engine::from_parts(config, open_table_arc(), Arc::new(CalibrationSet::fallback())).unwrap()
}

fn run(engine: &Engine, events: Vec<Vec<Track>>) -> FinalResult {
    let mut source = MemorySource::new(events);
    engine.run(&mut source, &Progress::new()).unwrap()
}

/// K+ and π- in the west TOF wall with an opening angle giving 892 MeV/c²
fn kstar_legs() -> (Track, Track, f64) {
    let (mk, mpi) = (Species::Kaon.mass(), Species::Pion.mass());
    let angle = opening_angle(1.0, mk, mpi, KSTAR_MASS);
    let kaon = tof_track(Charge::Positive, Detector::TofW, 1.0, -0.2, 0.02, 0.0, mk);
    let pion = tof_track(Charge::Negative, Detector::TofW, 1.0, -0.2 + angle, -0.03, 30.0, mpi);
    (kaon, pion, pair_pt(1.0, angle))
}

fn minv_entries(result: &FinalResult) -> u64 {
    result
        .aggregates
        .iter()
        .filter(|(name, _)| name.starts_with("minv_"))
        .map(|(_, agg)| agg.entries())
        .sum()
}

#[test]
fn test_kstar_pair_fills_tof_double_pid() {
    let config = AnalysisConfig {
        threads: Some(2),
        ..AnalysisConfig::default()
    };
    let (kaon, pion, pt) = kstar_legs();
    let result = run(&engine(&config), vec![vec![kaon, pion]]);

    assert_eq!(result.stats.events, 1);
    assert_eq!(result.stats.eligible_tracks, 2);
    assert_eq!(result.stats.pairs, 1);
    assert_eq!(result.stats.classified.get(PidTier::TofDoublePid), 1);
    assert_eq!(result.stats.classified.total(), 1);

    let h = result
        .aggregate("minv_tofdoublepid")
        .and_then(|a| a.as_2d())
        .unwrap();
    let (ix, iy) = h.locate(pt, KSTAR_MASS).unwrap();
    assert_eq!(h.sumw(ix, iy), 1.0);
    assert_eq!(h.integral(), 1.0);

    // Weaker tiers see the same pair; the calorimeter tier does not
    for name in ["minv_nopid", "minv_singlepid", "minv_doublepid"] {
        assert_eq!(result.aggregate(name).unwrap().integral(), 1.0, "{name}");
    }
    assert_eq!(result.aggregate("minv_emcdoublepid").unwrap().entries(), 0);
    assert_eq!(
        result.aggregate("minv_tofdoublepid_sailor").unwrap().integral(),
        1.0
    );
    assert_eq!(
        result.aggregate("minv_tofdoublepid_cowboy").unwrap().entries(),
        0
    );
}

#[test]
fn test_ghost_pair_excluded_from_every_mass_histogram() {
    let config = AnalysisConfig::default();
    let (mk, mpi) = (Species::Kaon.mass(), Species::Pion.mass());
    let kaon = tof_track(Charge::Positive, Detector::TofW, 1.0, 0.1, 0.02, 0.0, mk);
    let pion = tof_track(Charge::Negative, Detector::TofW, 1.0, 0.105, -0.01, 0.0, mpi);

    let result = run(&engine(&config), vec![vec![kaon, pion]]);
    assert_eq!(result.stats.pairs, 1);
    assert_eq!(result.stats.ghost_vetoed, 1);
    assert_eq!(result.stats.classified.total(), 0);
    assert_eq!(minv_entries(&result), 0);
}

#[test]
fn test_pairs_across_arms_vetoed_by_default() {
    let config = AnalysisConfig::default();
    let (mk, mpi) = (Species::Kaon.mass(), Species::Pion.mass());
    let kaon = tof_track(Charge::Positive, Detector::TofW, 1.0, 0.1, 0.02, 0.0, mk);
    let pion = tof_track(Charge::Negative, Detector::TofE, 1.0, 3.0, -0.03, 10.0, mpi);

    let result = run(&engine(&config), vec![vec![kaon, pion]]);
    assert_eq!(result.stats.one_arm_vetoed, 1);
    assert_eq!(minv_entries(&result), 0);
}

#[test]
fn test_same_charge_tracks_never_pair() {
    let config = AnalysisConfig::default();
    let mk = Species::Kaon.mass();
    let a = tof_track(Charge::Positive, Detector::TofW, 1.0, 0.1, 0.02, 0.0, mk);
    let b = tof_track(Charge::Positive, Detector::TofW, 1.2, 0.6, 0.05, 40.0, mk);

    let result = run(&engine(&config), vec![vec![a, b]]);
    assert_eq!(result.stats.eligible_tracks, 2);
    assert_eq!(result.stats.pairs, 0);
}

#[test]
fn test_json_lines_file_to_result_file() {
    let dir = TempDir::new().unwrap();
    let table = write_open_table(dir.path());

    let (kaon, pion, _) = kstar_legs();
    let event = serde_json::json!({ "tracks": [kaon, pion] });
    let input = dir.path().join("events.jsonl");
    let content = format!("{event}\n\n{}\n", serde_json::json!({ "tracks": [] }));
    std::fs::write(&input, content).unwrap();

    let mut config = AnalysisConfig {
        threads: Some(1),
        ..AnalysisConfig::default()
    };
    config.dead_area.table = Some(table);
    let engine = Engine::from_config(&config).unwrap();

    let mut source = JsonLinesSource::open(&input).unwrap();
    let result = engine.run(&mut source, &Progress::new()).unwrap();
    assert_eq!(result.stats.events, 2);
    assert_eq!(result.stats.classified.get(PidTier::TofDoublePid), 1);

    let output = dir.path().join("result.json");
    write_result(&output, &result, "custom").unwrap();
    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(written["stats"]["classified"]["tofdoublepid"], 1);
    assert_eq!(written["aggregates"]["minv_tofdoublepid"]["entries"], 1);
}

#[test]
fn test_unreadable_track_counted_not_fatal() {
    let dir = TempDir::new().unwrap();
    let (kaon, _, _) = kstar_legs();
    let event = serde_json::json!({ "tracks": [kaon, { "charge": 0, "pt": 1.0 }] });
    let input = dir.path().join("events.jsonl");
    std::fs::write(&input, format!("{event}\n")).unwrap();

    let result = {
        let mut source = JsonLinesSource::open(&input).unwrap();
        engine(&AnalysisConfig::default())
            .run(&mut source, &Progress::new())
            .unwrap()
    };
    assert_eq!(result.stats.tracks, 2);
    assert_eq!(result.stats.invalid_tracks, 1);
    assert_eq!(result.stats.eligible_tracks, 1);
}

#[test]
fn test_unreadable_event_ends_run() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("events.jsonl");
    std::fs::write(&input, "{\"tracks\": []}\nnot json\n").unwrap();

    let mut source = JsonLinesSource::open(&input).unwrap();
    let err = engine(&AnalysisConfig::default())
        .run(&mut source, &Progress::new())
        .unwrap_err();
    assert!(matches!(err, Error::InvalidInput(msg) if msg.contains("line 2")));
}

#[test]
fn test_unused_calibration_file_selects_fallback() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("pc3.txt"), "0\nthis is not read ### 1 2 x\n").unwrap();

    let mut config = AnalysisConfig::default();
    config.calibration.directory = Some(dir.path().to_path_buf());
    config
        .calibration
        .files
        .insert(Detector::Pc3, "pc3.txt".into());

    let set = CalibrationSet::load(&config.calibration).unwrap();
    assert!(!set.calibration(Detector::Pc3).is_fitted());
    Engine::from_config(&config).unwrap();
}

#[test]
fn test_broken_calibration_file_is_fatal() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("emc.txt");
    std::fs::write(&path, "1\n2 1\n0.1 0.2\n").unwrap();

    let mut config = AnalysisConfig::default();
    config.calibration.files.insert(Detector::Emc, path);
    assert!(matches!(
        Engine::from_config(&config),
        Err(Error::CalibrationFormat { .. })
    ));
}
