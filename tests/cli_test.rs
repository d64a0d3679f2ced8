mod common;

use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use common::{config_file, request_file};
use predicates::prelude::*;
use std::process::Command;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[test]
fn test_check_config() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin!("sagepay-direct"));
    cmd.arg("check-config")
        .arg("--config")
        .arg("tests/fixtures/config.toml");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("configuration OK"));

    let dir = tempfile::tempdir()?;
    let bad = dir.path().join("bad.toml");
    std::fs::write(&bad, "vendor = \"\"\n")?;
    let mut cmd = Command::new(cargo_bin!("sagepay-direct"));
    cmd.arg("check-config").arg("--config").arg(&bad);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("vendor is required"));

    Ok(())
}

#[test]
fn test_bad_amount_is_rejected_before_sending() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    // Nothing listens here; a request would fail with a transport error.
    let config = config_file(dir.path(), "http://127.0.0.1:9");
    let request = request_file(dir.path(), &[("amount = \"10.99\"", "amount = \"ten\"")]);

    let mut cmd = Command::new(cargo_bin!("sagepay-direct"));
    cmd.arg("capture")
        .arg("--config")
        .arg(&config)
        .arg("--request")
        .arg(&request)
        .arg("--session")
        .arg("s1");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Validation error"))
        .stderr(predicate::str::contains("Transport error").not());

    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_capture_end_to_end() -> Result<(), Box<dyn std::error::Error>> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/vspdirect-register.vsp"))
        .and(body_string_contains("TxType=PAYMENT"))
        .and(body_string_contains("Amount=10.99"))
        .and(body_string_contains("CardType=VISA"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("VPSProtocol=4.00\r\nStatus=OK\r\nVPSTxId={TX-9}\r\n"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir()?;
    let config = config_file(dir.path(), &server.uri());
    let request = request_file(dir.path(), &[]);
    let log = dir.path().join("log.csv");

    let mut cmd = Command::new(cargo_bin!("sagepay-direct"));
    cmd.arg("capture")
        .arg("--config")
        .arg(&config)
        .arg("--request")
        .arg(&request)
        .arg("--session")
        .arg("s1")
        .arg("--log-csv")
        .arg(&log);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Status=OK"))
        .stdout(predicate::str::contains("VPSTxId={TX-9}"))
        .stdout(predicate::str::contains("Mode=live"))
        .stdout(predicate::str::contains("RedirectRequired=0"))
        .stdout(predicate::str::contains("Succeeded=1"))
        .stdout(predicate::str::contains("RedirectTarget=/checkout/thanks"));

    let written = std::fs::read_to_string(&log)?;
    let mut lines = written.lines();
    assert_eq!(lines.next(), Some("mode,status,vendor_tx_code"));
    assert!(lines.next().is_some_and(|row| row.starts_with("L,OK,web-")));

    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_repeated_captures_share_one_csv_header() -> Result<(), Box<dyn std::error::Error>> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/vspdirect-register.vsp"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Status=OK\r\n"))
        .expect(2)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir()?;
    let config = config_file(dir.path(), &server.uri());
    let request = request_file(dir.path(), &[]);
    let log = dir.path().join("log.csv");

    for session in ["s1", "s2"] {
        let mut cmd = Command::new(cargo_bin!("sagepay-direct"));
        cmd.arg("capture")
            .arg("--config")
            .arg(&config)
            .arg("--request")
            .arg(&request)
            .arg("--session")
            .arg(session)
            .arg("--log-csv")
            .arg(&log);
        cmd.assert().success();
    }

    let written = std::fs::read_to_string(&log)?;
    let lines: Vec<&str> = written.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], "mode,status,vendor_tx_code");
    assert!(lines[1..].iter().all(|row| row.starts_with("L,OK,web-")));

    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_capture_prints_challenge_form() -> Result<(), Box<dyn std::error::Error>> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/vspdirect-register.vsp"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "Status=3DAUTH\nACSURL=https://issuer.example/acs\nCReq=creq-1\nVPSTxId={TX-2}\n",
        ))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir()?;
    let config = config_file(dir.path(), &server.uri());
    let request = request_file(dir.path(), &[("Jo Bloggs", "CHALLENGE")]);

    let mut cmd = Command::new(cargo_bin!("sagepay-direct"));
    cmd.arg("capture")
        .arg("--config")
        .arg(&config)
        .arg("--request")
        .arg(&request)
        .arg("--session")
        .arg("s1");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Mode=test"))
        .stdout(predicate::str::contains("RedirectRequired=1"))
        .stdout(predicate::str::contains("ChallengeFormId=sp4-3ds-iframe-form"))
        .stdout(predicate::str::contains("ChallengeURL=https://issuer.example/acs"))
        .stdout(predicate::str::contains("Challenge.creq=creq-1"));

    Ok(())
}

#[test]
fn test_complete_without_pending_challenge_fails() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_file(dir.path(), "http://127.0.0.1:9");

    let mut cmd = Command::new(cargo_bin!("sagepay-direct"));
    cmd.arg("complete")
        .arg("--config")
        .arg(&config)
        .arg("--session")
        .arg("s1")
        .arg("--field")
        .arg("cres=abc");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Validation error"));
}
