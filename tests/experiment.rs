use dora_exp::results::{METADATA_FILE, SCORES_FILE, SELECTIONS_FILE};
use dora_exp::{start, DoraConfig, DoraError, ExperimentDriver};
use pretty_assertions::assert_eq;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn write_csv(dir: &Path, name: &str, prefix: &str, rows: usize) -> PathBuf {
    let mut content = String::from("name,a,b,c\n");
    for i in 0..rows {
        let x = i as f64;
        content.push_str(&format!(
            "{prefix}{i},{},{},{}\n",
            x * 0.5,
            (x * 1.7).sin(),
            (x * x) % 7.0
        ));
    }
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

fn write_config(dir: &Path, out_dir: &Path, algorithms: &str, extra: &str) -> PathBuf {
    let fit = write_csv(dir, "fit.csv", "f", 10);
    let score = write_csv(dir, "score.csv", "s", 5);
    let yaml = format!(
        "data_loader:\n  name: featurevector\n  params:\n    id_column: name\n\
         data_to_fit: {}\n\
         data_to_score: {}\n\
         features:\n  - type: raw\n    field: data\n\
         zscore_normalization: true\n\
         outlier_detection:\n{algorithms}\
         out_dir: {}\n\
         top_n: 3\n{extra}",
        fit.display(),
        score.display(),
        out_dir.display()
    );
    let path = dir.join("config.yml");
    std::fs::write(&path, yaml).unwrap();
    path
}

fn selected_ids(out_dir: &Path, algorithm: &str) -> Vec<String> {
    let content = std::fs::read_to_string(out_dir.join(algorithm).join(SELECTIONS_FILE)).unwrap();
    content
        .lines()
        .skip(1)
        .map(|line| line.split(',').nth(2).unwrap().to_string())
        .collect()
}

#[test]
fn test_random_selects_distinct_score_ids() {
    let tmp = TempDir::new().unwrap();
    let out_dir = tmp.path().join("out");
    let config = write_config(tmp.path(), &out_dir, "  random: {}\n", "");

    let summary = start(&config, None, 42).unwrap();
    assert_eq!(summary.completed, vec!["random"]);

    let mut ids = selected_ids(&out_dir, "random");
    assert_eq!(ids.len(), 3);
    assert!(ids.iter().all(|id| id.starts_with('s')));
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 3);
    assert!(out_dir.join("random").join(METADATA_FILE).exists());
    assert!(!out_dir.join("random").join(SCORES_FILE).exists());
}

#[test]
fn test_same_seed_reproduces_selections() {
    let tmp = TempDir::new().unwrap();
    let first = tmp.path().join("first");
    let second = tmp.path().join("second");
    let config = write_config(tmp.path(), &first, "  random: {}\n  iforest: {}\n", "");

    start(&config, None, 42).unwrap();
    start(&config, Some(&second), 42).unwrap();

    for algorithm in ["random", "iforest"] {
        let a = std::fs::read(first.join(algorithm).join(SELECTIONS_FILE)).unwrap();
        let b = std::fs::read(second.join(algorithm).join(SELECTIONS_FILE)).unwrap();
        assert_eq!(a, b, "{algorithm} output differs between runs");
    }
}

#[test]
fn test_out_dir_override_wins() {
    let tmp = TempDir::new().unwrap();
    let configured = tmp.path().join("configured");
    let overridden = tmp.path().join("overridden");
    let config = write_config(tmp.path(), &configured, "  rx: {}\n", "");

    let summary = start(&config, Some(&overridden), 7).unwrap();

    assert_eq!(summary.out_dir, overridden);
    assert!(overridden.join("rx").join(SELECTIONS_FILE).exists());
    assert!(!configured.exists());
}

#[test]
fn test_every_builtin_algorithm_runs() {
    let tmp = TempDir::new().unwrap();
    let out_dir = tmp.path().join("out");
    let plan = "  random: {}\n  rx: {}\n  pca:\n    k: 2\n  iforest:\n    n_estimators: 20\n  \
                loda: {}\n  knn:\n    k: 3\n  demud:\n    k: 1\n  negative_sampling: {}\n";
    let config = write_config(
        tmp.path(),
        &out_dir,
        plan,
        "results:\n  save_scores: true\n",
    );

    let summary = start(&config, None, 3).unwrap();

    assert_eq!(
        summary.completed,
        vec![
            "random",
            "rx",
            "pca",
            "iforest",
            "loda",
            "knn",
            "demud",
            "negative_sampling"
        ]
    );
    for algorithm in &summary.completed {
        assert_eq!(selected_ids(&out_dir, algorithm).len(), 3);
        let scores =
            std::fs::read_to_string(out_dir.join(algorithm).join(SCORES_FILE)).unwrap();
        assert_eq!(scores.lines().count(), 6);
    }
}

#[test]
fn test_non_finite_cell_fails_before_any_algorithm() {
    let tmp = TempDir::new().unwrap();
    let out_dir = tmp.path().join("out");
    let config = write_config(tmp.path(), &out_dir, "  random: {}\n", "");
    std::fs::write(tmp.path().join("fit.csv"), "name,a,b,c\nf0,1,2,3\nf1,nan,2,3\n").unwrap();

    let err = start(&config, None, 1).unwrap_err();

    assert!(matches!(err, DoraError::DataLoad { .. }));
    assert!(err.to_string().contains("line 3"));
    assert!(!out_dir.join("random").exists());
}

#[test]
fn test_unregistered_algorithm_leaves_no_output() {
    let tmp = TempDir::new().unwrap();
    let out_dir = tmp.path().join("out");
    let config = write_config(tmp.path(), &out_dir, "  nonexistent: {}\n", "");

    let err = start(&config, None, 1).unwrap_err();

    match err {
        DoraError::NotFound { kind, name } => {
            assert_eq!(kind, "algorithm");
            assert_eq!(name, "nonexistent");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!out_dir.exists());
}

#[test]
fn test_missing_data_file() {
    let tmp = TempDir::new().unwrap();
    let out_dir = tmp.path().join("out");
    let config_path = write_config(tmp.path(), &out_dir, "  rx: {}\n", "");
    std::fs::remove_file(tmp.path().join("score.csv")).unwrap();

    let config = DoraConfig::load(&config_path).unwrap();
    let err = ExperimentDriver::with_defaults()
        .unwrap()
        .run(&config, 1)
        .unwrap_err();
    assert!(matches!(err, DoraError::DataLoad { .. }));
}

#[test]
fn test_unknown_config_key_rejected() {
    let tmp = TempDir::new().unwrap();
    let out_dir = tmp.path().join("out");
    let config = write_config(tmp.path(), &out_dir, "  rx: {}\n", "zscore: true\n");

    let err = start(&config, None, 1).unwrap_err();
    assert!(matches!(err, DoraError::Config(_) | DoraError::Yaml(_)));
    assert!(!out_dir.exists());
}
