//! Argument handling and exit codes

use crate::prelude::*;

#[test]
fn no_arguments_prints_usage_and_exits_1() {
    cli()
        .fails()
        .code(1)
        .stderr_has("Usage")
        .stdout_is_empty();
}

#[test]
fn extra_positional_argument_prints_usage() {
    cli().args(&["2", "3"]).fails().code(1).stderr_has("Usage");
}

#[test]
fn unknown_flag_prints_usage() {
    cli()
        .args(&["2", "--no-such-flag"])
        .fails()
        .code(1)
        .stderr_has("Usage");
}

#[test]
fn non_numeric_client_count_is_rejected() {
    cli().args(&["abc"]).fails().code(1).stderr_has("abc");
}

#[test]
fn zero_clients_is_rejected() {
    cli().args(&["0"]).fails().code(1);
}

#[test]
fn negative_client_count_is_rejected() {
    cli().args(&["--", "-3"]).fails().code(1);
}

#[test]
fn help_exits_0() {
    cli()
        .args(&["--help"])
        .passes()
        .stdout_has("Usage")
        .stdout_has("--soak-ms");
}

#[test]
fn missing_config_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("absent.toml");
    cli()
        .args(&["1", "--config", missing.to_str().unwrap()])
        .fails()
        .code(1)
        .stderr_has("Error:");
}
