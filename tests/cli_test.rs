//! CLI Integration Tests
//!
//! These tests run the binary as a subprocess against small dataset
//! directories and check exit codes, output files and the JSON report.

use std::fs;
use std::process::Command;

const TEST_DATA_DIR: &str = "test_data_cli";
const CLI: &str = env!("CARGO_BIN_EXE_poi-topology");

fn setup_test_environment(test_name: &str) -> std::io::Result<String> {
    let test_dir = format!("{}_{}", TEST_DATA_DIR, test_name);
    let _ = fs::remove_dir_all(&test_dir);
    fs::create_dir_all(format!("{}/cleaned", test_dir))?;
    Ok(test_dir)
}

fn cleanup_test_environment(test_dir: &str) {
    let _ = fs::remove_dir_all(test_dir);
}

fn create_dataset(test_dir: &str, category: &str, points: &[(u64, f64, f64)]) -> std::io::Result<()> {
    let mut doc = String::from(
        "@prefix schema: <http://schema.org/> .\n\
         @prefix geo: <http://www.opengis.net/ont/geosparql#> .\n",
    );
    for (id, lat, lon) in points {
        doc.push_str(&format!(
            "<urn:ngsi-ld:PointOfInterest:Hanoi:{}:{}> a schema:Place ; geo:asWKT \"POINT({} {})\"^^geo:wktLiteral .\n",
            category, id, lon, lat
        ));
    }
    fs::write(format!("{}/cleaned/data_hanoi_{}_cleaned.ttl", test_dir, category), doc)
}

#[test]
fn test_cli_help_flag() {
    let output = Command::new(CLI).arg("--help").output().expect("Failed to run CLI");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("generate"));
    assert!(stdout.contains("inspect"));
}

#[test]
fn test_cli_generate_and_inspect() {
    let test_dir = setup_test_environment("generate").unwrap();
    create_dataset(&test_dir, "bus_stop", &[(1, 21.0, 105.8)]).unwrap();
    create_dataset(&test_dir, "school", &[(1, 21.0001, 105.8), (2, 21.003, 105.8)]).unwrap();
    let report_path = format!("{}/report.json", test_dir);

    let output = Command::new(CLI)
        .args(["generate", "--data-root", &test_dir, "--report", &report_path])
        .output()
        .expect("Failed to run CLI");

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("TOPOLOGY GENERATION REPORT"));

    let topology = format!("{}/data_hanoi_topology.ttl", test_dir);
    let text = fs::read_to_string(&topology).unwrap();
    assert!(text.contains("containedInPlace"));
    assert!(text.contains("amenityFeature"));

    let report: serde_json::Value = serde_json::from_str(&fs::read_to_string(&report_path).unwrap()).unwrap();
    assert_eq!(report["strategy"], "exhaustive");
    assert!(report["unique_relations"].as_u64().unwrap() >= 2);

    let inspected = Command::new(CLI)
        .args(["inspect", &topology, "--top", "3"])
        .output()
        .expect("Failed to run CLI");
    assert!(inspected.status.success());
    assert!(String::from_utf8_lossy(&inspected.stdout).contains("Total triples"));

    cleanup_test_environment(&test_dir);
}

#[test]
fn test_cli_grid_strategy_matches_exhaustive() {
    let test_dir = setup_test_environment("grid").unwrap();
    create_dataset(&test_dir, "cafe", &[(1, 21.0, 105.8), (2, 21.0005, 105.8012)]).unwrap();
    create_dataset(&test_dir, "restaurant", &[(1, 21.0003, 105.8), (2, 21.01, 105.81)]).unwrap();

    let mut outputs = Vec::new();
    for strategy in ["exhaustive", "grid"] {
        let out = format!("{}/{}.nt", test_dir, strategy);
        let status = Command::new(CLI)
            .args(["generate", "--data-root", &test_dir, "--strategy", strategy, "--output", &out])
            .status()
            .expect("Failed to run CLI");
        assert!(status.success());
        let mut lines: Vec<String> = fs::read_to_string(&out).unwrap().lines().map(String::from).collect();
        lines.sort();
        outputs.push(lines);
    }
    assert_eq!(outputs[0], outputs[1]);

    cleanup_test_environment(&test_dir);
}

#[test]
fn test_cli_rejects_unknown_strategy() {
    let test_dir = setup_test_environment("bad_strategy").unwrap();

    let output = Command::new(CLI)
        .args(["generate", "--data-root", &test_dir, "--strategy", "quadtree"])
        .output()
        .expect("Failed to run CLI");

    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("unknown join strategy"));

    cleanup_test_environment(&test_dir);
}

#[test]
fn test_cli_malformed_rule_file_fails() {
    let test_dir = setup_test_environment("bad_rules").unwrap();
    let rules = format!("{}/rules.json", test_dir);
    fs::write(&rules, "{ not json").unwrap();

    let output = Command::new(CLI)
        .args(["generate", "--data-root", &test_dir, "--rules", &rules])
        .output()
        .expect("Failed to run CLI");

    assert!(!output.status.success());
    assert!(!std::path::Path::new(&format!("{}/data_hanoi_topology.ttl", test_dir)).exists());

    cleanup_test_environment(&test_dir);
}
