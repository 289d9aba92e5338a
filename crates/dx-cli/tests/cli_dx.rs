use std::path::PathBuf;
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::Value;

fn bin_path() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_dx"))
}

fn tmp_path(name: &str) -> PathBuf {
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
    let mut p = std::env::temp_dir();
    p.push(format!("dx_cli_{}_{}_{}", std::process::id(), nanos, name));
    p
}

fn write_input(name: &str, json: &str) -> PathBuf {
    let p = tmp_path(name);
    std::fs::write(&p, json).unwrap();
    p
}

fn run(args: &[&str]) -> Output {
    Command::new(bin_path())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("failed to run {:?} {:?}: {}", bin_path(), args, e))
}

fn run_json(args: &[&str]) -> Value {
    let out = run(args);
    assert!(
        out.status.success(),
        "{:?} should succeed, stderr={}",
        args,
        String::from_utf8_lossy(&out.stderr)
    );
    serde_json::from_slice(&out.stdout).unwrap()
}

fn as_f64(v: &Value) -> f64 {
    match v {
        Value::Number(n) => n.as_f64().unwrap(),
        Value::String(s) if s == "-inf" => f64::NEG_INFINITY,
        Value::String(s) if s == "inf" => f64::INFINITY,
        Value::String(s) if s == "nan" => f64::NAN,
        other => panic!("not a number: {other}"),
    }
}

#[test]
fn log_prob_zipf_outside_support_is_neg_inf() {
    let input = write_input("zipf.json", r#"{"family": "zipf", "power": 2.0}"#);
    let v = run_json(&["log-prob", "--input", input.to_str().unwrap(), "--x", "[0, 1, 2]"]);
    let lp: Vec<f64> = v["log_prob"].as_array().unwrap().iter().map(as_f64).collect();
    assert_eq!(lp[0], f64::NEG_INFINITY);
    let zeta2 = std::f64::consts::PI.powi(2) / 6.0;
    assert!((lp[1] + zeta2.ln()).abs() < 1e-10, "{lp:?}");
    assert!((lp[2] + 4.0f64.ln() + zeta2.ln()).abs() < 1e-10, "{lp:?}");
    let p = v["prob"].as_array().unwrap();
    assert_eq!(as_f64(&p[0]), 0.0);
}

#[test]
fn cdf_chi2_writes_output_file() {
    let input = write_input("chi2.json", r#"{"family": "chi2", "df": [2.0]}"#);
    let output = tmp_path("chi2_cdf_out.json");
    let out = run(&[
        "cdf",
        "--input",
        input.to_str().unwrap(),
        "--x",
        "[[1.0], [-1.0]]",
        "--output",
        output.to_str().unwrap(),
    ]);
    assert!(out.status.success(), "stderr={}", String::from_utf8_lossy(&out.stderr));
    let v: Value = serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    let cdf = as_f64(&v["cdf"][0][0]);
    assert!((cdf - (1.0 - (-0.5f64).exp())).abs() < 1e-12);
    assert_eq!(as_f64(&v["cdf"][1][0]), 0.0);
    assert_eq!(as_f64(&v["log_cdf"][1][0]), f64::NEG_INFINITY);
}

#[test]
fn sample_is_reproducible_for_a_seed() {
    let input = write_input(
        "vmf.json",
        r#"{"family": "von_mises_fisher", "mean_direction": [0.0, 0.6, 0.8], "concentration": [1.0, 10.0]}"#,
    );
    let args = ["sample", "--input", input.to_str().unwrap(), "-n", "4", "--seed", "42"];
    let a = run_json(&args);
    let b = run_json(&args);
    assert_eq!(a["samples"], b["samples"]);
    assert_eq!(a["shape"], serde_json::json!([4, 2, 3]));
    for draw in a["samples"].as_array().unwrap() {
        for row in draw.as_array().unwrap() {
            let norm: f64 = row.as_array().unwrap().iter().map(|x| as_f64(x).powi(2)).sum();
            assert!((norm - 1.0).abs() < 1e-9);
        }
    }
}

#[test]
fn stats_skips_undefined_moments() {
    let input = write_input("zipf_heavy.json", r#"{"family": "zipf", "power": 1.5}"#);
    let v = run_json(&["stats", "--input", input.to_str().unwrap()]);
    assert_eq!(v["family"], "zipf");
    assert_eq!(as_f64(&v["mode"]), 1.0);
    assert_eq!(as_f64(&v["mean"]), f64::INFINITY);
    assert!(v.get("entropy").is_none());

    let strict = write_input(
        "zipf_strict.json",
        r#"{"family": "zipf", "power": 1.5, "config": {"allow_nan_stats": false}}"#,
    );
    let v = run_json(&["stats", "--input", strict.to_str().unwrap()]);
    assert!(v.get("mean").is_none());
    assert!(v.get("variance").is_none());
    assert_eq!(as_f64(&v["mode"]), 1.0);
}

#[test]
fn stats_reports_vmf_covariance() {
    let input = write_input(
        "vmf_stats.json",
        r#"{"family": "von_mises_fisher", "mean_direction": [1.0, 0.0], "concentration": 0.0}"#,
    );
    let v = run_json(&["stats", "--input", input.to_str().unwrap()]);
    assert_eq!(v["event_shape"], serde_json::json!([2]));
    assert_eq!(v["covariance"], serde_json::json!([[0.5, 0.0], [0.0, 0.5]]));
    assert_eq!(v["mean"], serde_json::json!([0.0, 0.0]));
}

#[test]
fn kl_vmf_to_spherical_uniform() {
    let p = write_input(
        "kl_p.json",
        r#"{"family": "von_mises_fisher", "mean_direction": [0.0, 0.0, 1.0], "concentration": [0.0, 5.0]}"#,
    );
    let q = write_input("kl_q.json", r#"{"family": "spherical_uniform", "dimension": 3}"#);
    let v = run_json(&["kl", "--input", p.to_str().unwrap(), "--other", q.to_str().unwrap()]);
    let kl: Vec<f64> = v["kl"].as_array().unwrap().iter().map(as_f64).collect();
    assert_eq!(kl[0], 0.0);
    assert!(kl[1] > 0.0);
}

#[test]
fn invalid_parameters_fail_with_message() {
    let input = write_input(
        "zipf_bad.json",
        r#"{"family": "zipf", "power": 0.5, "config": {"validate_args": true}}"#,
    );
    let out = run(&["stats", "--input", input.to_str().unwrap()]);
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("must be greater than 1"), "stderr={stderr}");
}

#[test]
fn unregistered_kl_pair_fails() {
    let p = write_input("kl_zipf.json", r#"{"family": "zipf", "power": 3.0}"#);
    let q = write_input("kl_chi2.json", r#"{"family": "chi2", "df": 2.0}"#);
    let out = run(&["kl", "--input", p.to_str().unwrap(), "--other", q.to_str().unwrap()]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("no KL divergence registered"));
}
