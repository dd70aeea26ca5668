//! End-to-end runs: config file → bars → trades → artifacts on disk.

use std::fs;

use shockflip_core::domain::Trade;
use shockflip_runner::export::save_run_artifacts;
use shockflip_runner::{
    generate_bars, read_bars_csv, run_from_config, DataSource, RunConfig, SyntheticSpec,
};

const RUN_TOML: &str = r#"
name = "pipeline"

[data]
type = "SYNTHETIC"
bars = 6000
seed = 21
shock_probability = 0.01

[strategy]
cooldown_bars = 2

[strategy.features]
z_window = 60
donchian_window = 30

[strategy.detector]
jump_band = 1.5
persistence_bars = 3
persistence_ratio = 0.34
"#;

#[test]
fn synthetic_run_writes_artifacts() {
    // GIVEN a TOML run file over seeded synthetic bars
    let config = RunConfig::from_toml_str(RUN_TOML).unwrap();
    assert_eq!(config.name, "pipeline");

    // WHEN the run executes and its artifacts are saved
    let report = run_from_config(&config).unwrap();
    let dir = tempfile::tempdir().unwrap();
    save_run_artifacts(&report, dir.path()).unwrap();

    // THEN every artifact exists and trades.json reads back identically
    for name in ["events.csv", "trades.csv", "trades.json", "summary.json"] {
        assert!(dir.path().join(name).exists(), "missing {name}");
    }
    let trades: Vec<Trade> =
        serde_json::from_str(&fs::read_to_string(dir.path().join("trades.json")).unwrap())
            .unwrap();
    assert_eq!(trades, report.trades);

    let events_csv = fs::read_to_string(dir.path().join("events.csv")).unwrap();
    assert_eq!(events_csv.lines().count(), report.events.len() + 1);

    let summary: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("summary.json")).unwrap())
            .unwrap();
    assert_eq!(summary["name"], "pipeline");
    assert_eq!(summary["bars"], 6000);
    assert_eq!(summary["schema_version"], 1);
}

#[test]
fn same_config_same_run() {
    let config = RunConfig::from_toml_str(RUN_TOML).unwrap();
    let a = run_from_config(&config).unwrap();
    let b = run_from_config(&config).unwrap();
    assert_eq!(a, b);
    assert_eq!(config.run_id().unwrap(), config.clone().run_id().unwrap());
}

#[test]
fn csv_source_matches_in_memory_bars() {
    // GIVEN synthetic bars written out as a bar CSV next to a run file
    let spec = SyntheticSpec {
        bars: 2_500,
        seed: 4,
        shock_probability: 0.01,
        ..SyntheticSpec::default()
    };
    let bars = generate_bars(&spec);
    let dir = tempfile::tempdir().unwrap();
    let mut wtr = csv::Writer::from_path(dir.path().join("bars.csv")).unwrap();
    for bar in &bars {
        wtr.serialize(bar).unwrap();
    }
    wtr.flush().unwrap();

    let toml = RUN_TOML.replace(
        "type = \"SYNTHETIC\"\nbars = 6000\nseed = 21\nshock_probability = 0.01",
        "type = \"CSV\"\npath = \"bars.csv\"",
    );
    let config_path = dir.path().join("run.toml");
    fs::write(&config_path, toml).unwrap();

    // WHEN the run file is loaded (relative path resolved against its dir)
    let config = RunConfig::from_file(&config_path).unwrap();
    assert!(matches!(config.data, DataSource::Csv { .. }));
    assert_eq!(read_bars_csv(&dir.path().join("bars.csv")).unwrap(), bars);

    // THEN the CSV run equals the synthetic run except for provenance
    let from_csv = run_from_config(&config).unwrap();
    let from_memory = run_from_config(&RunConfig {
        data: DataSource::Synthetic(spec),
        ..config.clone()
    })
    .unwrap();
    assert!(!from_csv.summary.synthetic);
    assert!(from_memory.summary.synthetic);
    assert_eq!(from_csv.summary.dataset_hash, from_memory.summary.dataset_hash);
    assert_eq!(from_csv.trades, from_memory.trades);
    assert_eq!(from_csv.events, from_memory.events);
}

#[test]
fn malformed_csv_row_fails_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.csv");
    fs::write(
        &path,
        "open_time,close_time,open,high,low,close,buy_volume,sell_volume,volume\n\
         2024-01-01T00:00:00Z,2024-01-01T00:01:00Z,100,99,101,100,1,1,2\n",
    )
    .unwrap();
    let config = RunConfig {
        data: DataSource::Csv { path },
        ..RunConfig::default()
    };
    let err = run_from_config(&config).unwrap_err();
    assert!(err.to_string().contains("data error"), "{err}");
}
