use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

fn dora_exp() -> Command {
    Command::new(env!("CARGO_BIN_EXE_dora_exp"))
}

fn write_inputs(dir: &Path, out_dir: &Path) -> std::path::PathBuf {
    let mut fit = String::from("1,2\n");
    for i in 0..8 {
        fit.push_str(&format!("{},{}\n", i as f64, (i * 3 % 5) as f64));
    }
    std::fs::write(dir.join("fit.csv"), &fit).unwrap();
    std::fs::write(dir.join("score.csv"), "1,2\n0.5,1\n9,9\n3,2\n").unwrap();

    let yaml = format!(
        "data_loader:\n  name: featurevector\n\
         data_to_fit: {}\n\
         data_to_score: {}\n\
         features:\n  - type: raw\n    field: data\n\
         outlier_detection:\n  rx: {{}}\n\
         out_dir: {}\n\
         top_n: 2\n",
        dir.join("fit.csv").display(),
        dir.join("score.csv").display(),
        out_dir.display()
    );
    let config = dir.join("config.yml");
    std::fs::write(&config, yaml).unwrap();
    config
}

#[test]
fn test_missing_config_exits_with_error() {
    let tmp = TempDir::new().unwrap();
    let output = dora_exp()
        .current_dir(tmp.path())
        .arg("missing.yml")
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("[ERROR] Configuration file not found"));
    assert!(stderr.contains("missing.yml"));
    assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
}

#[test]
fn test_out_dir_flag_and_log_file() {
    let tmp = TempDir::new().unwrap();
    let configured = tmp.path().join("configured");
    let overridden = tmp.path().join("overridden");
    let log_file = tmp.path().join("logs").join("run.log");
    let config = write_inputs(tmp.path(), &configured);

    let status = dora_exp()
        .arg(&config)
        .arg("--out_dir")
        .arg(&overridden)
        .arg("--log_file")
        .arg(&log_file)
        .arg("--seed")
        .arg("5")
        .status()
        .unwrap();

    assert!(status.success());
    assert!(!configured.exists());
    let selections = std::fs::read_to_string(overridden.join("rx").join("selections.csv")).unwrap();
    let first = selections.lines().nth(1).unwrap();
    // Sample 1 (9,9) sits far from the fit set.
    assert!(first.starts_with("1,1,1,"));
    let log = std::fs::read_to_string(&log_file).unwrap();
    assert!(log.contains("Outlier detection [1/1]: rx"));
}

#[test]
fn test_unknown_algorithm_exits_with_error() {
    let tmp = TempDir::new().unwrap();
    let out_dir = tmp.path().join("out");
    let config = write_inputs(tmp.path(), &out_dir);
    let yaml = std::fs::read_to_string(&config)
        .unwrap()
        .replace("rx: {}", "nonexistent: {}");
    std::fs::write(&config, yaml).unwrap();

    let output = dora_exp().arg(&config).output().unwrap();

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("nonexistent"));
    assert!(!out_dir.exists());
}
