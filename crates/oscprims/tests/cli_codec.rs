#![cfg(feature = "cli")]

use std::process::{Command, Output};

fn oscprims(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_oscprims"))
        .arg("--log-level")
        .arg("error")
        .args(args)
        .output()
        .expect("oscprims should run")
}

#[test]
fn encode_prints_fader_datagram() {
    let output = oscprims(&["--format", "pretty", "encode", "/ch/01/mix/fader", "0.75"]);

    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        "2F 63 68 2F 30 31 2F 6D 69 78 2F 66 61 64 65 72 00 00 00 00 2C 66 00 00 3F 40 00 00"
    );
}

#[test]
fn encode_json_reports_size() {
    let output = oscprims(&["--format", "json", "encode", "/xremote"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"size\":16"), "{stdout}");
    assert!(stdout.contains("2F 78 72 65 6D 6F 74 65 00 00 00 00 2C 00 00 00"));
}

#[test]
fn encode_rejects_address_without_slash() {
    let output = oscprims(&["encode", "xremote"]);
    assert_eq!(output.status.code(), Some(64));
    assert!(String::from_utf8_lossy(&output.stderr).contains("invalid OSC address"));
}

#[test]
fn encode_rejects_null_argument() {
    let output = oscprims(&["encode", "/a", "null"]);
    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn decode_prints_sanitized_message() {
    let output = oscprims(&[
        "--format",
        "json",
        "decode",
        "2F 61 00 00 2C 69 73 00 00 00 00 07 68 69 00 00",
    ]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"kind\":\"message\""), "{stdout}");
    assert!(stdout.contains("\"packet\":[\"/a\",7,\"hi\"]"), "{stdout}");
}

#[test]
fn decode_prints_bundle_with_immediate_timetag() {
    let output = oscprims(&[
        "--format",
        "json",
        "decode",
        "23 62 75 6E 64 6C 65 00 00 00 00 00 00 00 00 01 00 00 00 08 2F 61 00 00 2C 00 00 00",
    ]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("\"packet\":{\"timetag\":\"immediate\",\"elements\":[[\"/a\"]]}"),
        "{stdout}"
    );
}

#[test]
fn decode_truncated_datagram_is_data_invalid() {
    let output = oscprims(&["decode", "2F 61 00 00 2C 69 00 00 00 00"]);
    assert_eq!(output.status.code(), Some(60));
    assert!(String::from_utf8_lossy(&output.stderr).contains("truncated"));
}

#[test]
fn decode_rejects_bad_hex() {
    let output = oscprims(&["decode", "2F 6"]);
    assert_eq!(output.status.code(), Some(60));
}

#[test]
fn version_prints_package_version() {
    let output = oscprims(&["version"]);
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        format!("oscprims {}", env!("CARGO_PKG_VERSION"))
    );
}
