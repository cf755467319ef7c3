use std::io::Write;

use collatz_bench::config::{BenchConfig, ConfigError};
use collatz_bench::montecarlo;
use collatz_bench::{BenchmarkHarness, Strategy};
use utils::{reference_steps, TestHelper};

mod utils;

#[test]
fn harness_from_config_file() {
    TestHelper::with_timeout(|| {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
items = 20000
workers = 3
queue_capacity = 50
strategies = ["interleaved", "pipeline", "static"]
"#
        )
        .unwrap();

        let config = BenchConfig::from_file(file.path()).unwrap();
        let comparison = BenchmarkHarness::from_config(&config).run();

        assert!(comparison.failures.is_empty());
        comparison.verify().unwrap();
        let order: Vec<_> = comparison.runs.iter().map(|r| r.strategy).collect();
        assert_eq!(
            order,
            vec![Strategy::Interleaved, Strategy::Pipeline, Strategy::Static]
        );
        let baseline = comparison.baseline().unwrap();
        assert_eq!(baseline.strategy, Strategy::Interleaved);
        assert_eq!(comparison.speedup(baseline), 1.0);
        for run in &comparison.runs {
            assert_eq!(run.aggregate.total_steps, reference_steps(20_000));
            assert_eq!(run.aggregate.total_count, 20_000);
        }
        let fastest = comparison.fastest().unwrap();
        assert!(comparison.runs.iter().all(|r| r.elapsed >= fastest.elapsed));
    });
}

#[test]
fn missing_config_file() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        BenchConfig::from_file(dir.path().join("missing.toml")),
        Err(ConfigError::Io(_))
    ));
}

#[test]
fn comparison_as_json() {
    TestHelper::with_timeout(|| {
        let config = BenchConfig {
            items: 1_000,
            workers: 2,
            ..Default::default()
        };
        let comparison = BenchmarkHarness::from_config(&config).run();
        let json: serde_json::Value = serde_json::to_value(&comparison).unwrap();

        assert_eq!(json["job"]["items"], 1_000);
        let runs = json["runs"].as_array().unwrap();
        assert_eq!(runs.len(), 3);
        assert_eq!(runs[0]["strategy"], "static");
        assert_eq!(runs[2]["strategy"], "pipeline");
        assert_eq!(runs[1]["aggregate"]["total_count"], 1_000);
        assert!(json["failures"].as_array().unwrap().is_empty());
    });
}

#[test]
fn pi_report_file() {
    TestHelper::with_timeout(|| {
        let rows = montecarlo::sweep(40_000, &[1, 2, 4], 3).unwrap();
        assert_eq!(rows.len(), 3);
        for row in &rows {
            assert!((row.estimate.pi - std::f64::consts::PI).abs() < 0.1);
        }

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.txt");
        let mut file = std::fs::File::create(&path).unwrap();
        montecarlo::write_report(&mut file, 40_000, &rows).unwrap();
        drop(file);

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("Monte Carlo Pi Calculation Performance Report\n"));
        assert!(text.contains("Total points: 40000"));
        assert_eq!(text.lines().filter(|l| l.ends_with('x')).count(), 3);
    });
}
