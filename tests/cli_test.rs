use assert_cmd::Command;
use predicates::prelude::*;

const TARGET: &str = "0x00000000000000000000000000000000000000aa";

fn burnpay() -> Command {
    Command::cargo_bin("burnpay").unwrap()
}

#[test]
fn test_pays_explicit_target_and_destroys_wallet() {
    burnpay()
        .args(["--target", TARGET, "--balance", "10"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[oracle]"))
        .stdout(predicate::str::contains("[transfer]"))
        .stdout(predicate::str::contains("[done] Payment complete"))
        .stdout(predicate::str::contains("paid "));
}

#[test]
fn test_insufficient_balance_exits_with_failure() {
    burnpay()
        .args(["--target", TARGET, "--balance", "0.0001"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("payment failed"));
}

#[test]
fn test_rejects_malformed_target() {
    burnpay()
        .args(["--target", "not-an-address"])
        .assert()
        .failure();
}

#[test]
fn test_discovery_resolves_when_target_omitted() {
    burnpay()
        .args(["--balance", "10"])
        .assert()
        .success()
        .stdout(predicate::str::contains("looking for counterparty"))
        .stdout(predicate::str::contains("resolved 0x"));
}

#[test]
fn test_contract_vault_mode_completes() {
    // The position is seeded through the on-chain vault instead of the
    // in-memory ledger; the burner can pay on its own so the run completes.
    burnpay()
        .args([
            "--target",
            TARGET,
            "--balance",
            "10",
            "--yield-balance",
            "3",
            "--vault-mode",
            "contract",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("[done] Payment complete"));
}

#[cfg(not(feature = "storage-rocksdb"))]
#[test]
fn test_db_path_without_feature_warns_and_falls_back() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("secrets_db");

    burnpay()
        .args(["--target", TARGET])
        .arg("--db-path")
        .arg(&db_path)
        .assert()
        .success()
        .stderr(predicate::str::contains(
            "WARNING: Persistent storage requested via --db-path",
        ));
}

#[cfg(feature = "storage-rocksdb")]
#[test]
fn test_db_path_with_feature_uses_rocksdb_silently() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("secrets_db");

    burnpay()
        .args(["--target", TARGET])
        .arg("--db-path")
        .arg(&db_path)
        .assert()
        .success()
        .stderr(predicate::str::contains("WARNING: Persistent storage").not());

    // The store survives the process: a second session opens the same DB.
    burnpay()
        .args(["--target", TARGET])
        .arg("--db-path")
        .arg(&db_path)
        .assert()
        .success();
}
