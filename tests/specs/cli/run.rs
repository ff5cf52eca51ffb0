//! Full load test runs against a stub language server

use crate::prelude::*;

#[test]
fn run_prints_summary_and_cleans_up() {
    let server = Server::start();
    let workspaces = tempfile::tempdir().unwrap();

    cli()
        .args(&[
            "2",
            "--addr",
            &server.addr(),
            "--soak-ms",
            RUN_SOAK_MS,
            "--max-delay-ms",
            RUN_MAX_DELAY_MS,
            "--seed",
            "7",
        ])
        .env("LSPLOAD_WORKSPACE_DIR", workspaces.path())
        .passes()
        .stdout_has("CLIENT")
        .stdout_has("client-0")
        .stdout_has("client-1")
        .stdout_has("2 of 2 clients ran");

    assert_eq!(entries(workspaces.path()), 0);

    let stats = server.finish();
    assert_eq!(stats.requests("initialize"), 2);
    assert_eq!(stats.notifications("initialized"), 2);
    assert_eq!(stats.requests("shutdown"), 2);
}

#[test]
fn shared_workspace_run_uses_one_directory() {
    let server = Server::start();
    let workspaces = tempfile::tempdir().unwrap();

    cli()
        .args(&[
            "3",
            "--addr",
            &server.addr(),
            "--soak-ms",
            RUN_SOAK_MS,
            "--max-delay-ms",
            RUN_MAX_DELAY_MS,
            "--shared-workspace",
            "--concurrent-init",
        ])
        .env("LSPLOAD_WORKSPACE_DIR", workspaces.path())
        .passes()
        .stdout_has("3 of 3 clients ran");

    assert_eq!(entries(workspaces.path()), 0);
    assert_eq!(server.finish().requests("initialize"), 3);
}

#[test]
fn environment_supplies_server_address() {
    let server = Server::start();
    let workspaces = tempfile::tempdir().unwrap();

    cli()
        .args(&["1", "--soak-ms", RUN_SOAK_MS])
        .env("LSPLOAD_ADDR", server.addr())
        .env("LSPLOAD_MAX_DELAY_MS", RUN_MAX_DELAY_MS)
        .env("LSPLOAD_WORKSPACE_DIR", workspaces.path())
        .passes()
        .stdout_has("1 of 1 clients ran");
}

#[test]
fn unreachable_server_fails_without_leaving_workspaces() {
    let workspaces = tempfile::tempdir().unwrap();

    cli()
        .args(&["2", "--addr", &closed_addr(), "--soak-ms", RUN_SOAK_MS])
        .env("LSPLOAD_WORKSPACE_DIR", workspaces.path())
        .fails()
        .code(1)
        .stderr_has("Error:");

    assert_eq!(entries(workspaces.path()), 0);
}

#[test]
fn log_file_receives_client_events() {
    let server = Server::start();
    let workspaces = tempfile::tempdir().unwrap();
    let log = workspaces.path().join("run.log");

    cli()
        .args(&[
            "1",
            "--addr",
            &server.addr(),
            "--soak-ms",
            RUN_SOAK_MS,
            "--max-delay-ms",
            RUN_MAX_DELAY_MS,
            "--log-file",
            log.to_str().unwrap(),
        ])
        .env("LSPLOAD_WORKSPACE_DIR", workspaces.path())
        .env("RUST_LOG", "info")
        .passes();

    let contents = std::fs::read_to_string(&log).unwrap();
    assert!(contents.contains("client initialized"), "log: {contents}");
}
