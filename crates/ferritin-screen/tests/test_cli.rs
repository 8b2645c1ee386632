use assert_cmd::Command;
use ferritin_test_data::TestFile;

#[test]
fn test_cli_cv() {
    let (train_csv, _tmp) = TestFile::antibodies_train_01().create_temp().unwrap();
    let outdir = tempfile::tempdir().unwrap();
    let out_csv = outdir.path().join("cv").join("oof.csv");
    let report = outdir.path().join("report.json");

    let mut cmd = Command::cargo_bin("ferritin-screen").unwrap();
    cmd.arg("cv")
        .arg("--train-csv")
        .arg(&train_csv)
        .arg("--out-csv")
        .arg(&out_csv)
        .arg("--report-json")
        .arg(&report)
        .arg("--embedder")
        .arg("composition");
    cmd.assert().success();

    let text = std::fs::read_to_string(&out_csv).unwrap();
    let header = text.lines().next().unwrap();
    assert_eq!(
        header,
        "antibody_name,vh_protein_sequence,vl_protein_sequence,\
         hierarchical_cluster_IgG_isotype_stratified_fold,HIC,Tm2"
    );
    assert_eq!(text.lines().count(), 13);

    let json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&report).unwrap()).unwrap();
    let results = json["results"].as_array().unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[1]["property"], "Tm2");
    assert_eq!(results[1]["folds"].as_array().unwrap().len(), 3);
}

#[test]
fn test_cli_predict() {
    let (train_csv, _tmp1) = TestFile::antibodies_train_01().create_temp().unwrap();
    let (heldout_csv, _tmp2) = TestFile::antibodies_heldout_01().create_temp().unwrap();
    let outdir = tempfile::tempdir().unwrap();
    let out_train = outdir.path().join("train_preds.csv");
    let out_heldout = outdir.path().join("heldout_preds.csv");

    let mut cmd = Command::cargo_bin("ferritin-screen").unwrap();
    cmd.arg("predict")
        .arg("--train-csv")
        .arg(&train_csv)
        .arg("--heldout-csv")
        .arg(&heldout_csv)
        .arg("--out-train-csv")
        .arg(&out_train)
        .arg("--out-heldout-csv")
        .arg(&out_heldout)
        .arg("--embedder")
        .arg("composition")
        .arg("--property")
        .arg("Tm2")
        .arg("--no-ensemble");
    cmd.assert().success();

    let heldout = std::fs::read_to_string(&out_heldout).unwrap();
    let lines: Vec<&str> = heldout.lines().collect();
    assert_eq!(lines.len(), 5);
    assert!(lines[0].ends_with(",Tm2"));
    assert!(lines[1..].iter().all(|l| !l.ends_with(',')));
    assert!(out_train.exists());
}

#[test]
fn test_cli_missing_required_column_fails() {
    let dir = tempfile::tempdir().unwrap();
    let bad = dir.path().join("bad.csv");
    std::fs::write(&bad, "antibody_name,vh_protein_sequence,Tm2\nab1,EVQL,70.1\n").unwrap();
    let out = dir.path().join("out.csv");

    let mut cmd = Command::cargo_bin("ferritin-screen").unwrap();
    cmd.arg("cv")
        .arg("--train-csv")
        .arg(&bad)
        .arg("--out-csv")
        .arg(&out)
        .arg("--embedder")
        .arg("composition");
    cmd.assert().failure();
    assert!(!out.exists());
}

#[test]
fn test_cli_missing_fold_column_fails() {
    let (train_csv, _tmp) = TestFile::antibodies_train_01().create_temp().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out.csv");

    let mut cmd = Command::cargo_bin("ferritin-screen").unwrap();
    cmd.arg("cv")
        .arg("--train-csv")
        .arg(&train_csv)
        .arg("--out-csv")
        .arg(&out)
        .arg("--fold-column")
        .arg("no_such_fold")
        .arg("--embedder")
        .arg("composition");
    cmd.assert().failure();
    assert!(!out.exists());
}

#[test]
fn test_cli_unwritable_report_leaves_no_predictions() {
    let (train_csv, _tmp) = TestFile::antibodies_train_01().create_temp().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let out_csv = dir.path().join("oof.csv");
    // a regular file where the report's parent directory should be
    let blocker = dir.path().join("reports");
    std::fs::write(&blocker, "").unwrap();
    let report = blocker.join("report.json");

    let mut cmd = Command::cargo_bin("ferritin-screen").unwrap();
    cmd.arg("cv")
        .arg("--train-csv")
        .arg(&train_csv)
        .arg("--out-csv")
        .arg(&out_csv)
        .arg("--report-json")
        .arg(&report)
        .arg("--embedder")
        .arg("composition")
        .arg("--property")
        .arg("Tm2")
        .arg("--no-ensemble");
    cmd.assert().failure();
    assert!(!out_csv.exists());
}
