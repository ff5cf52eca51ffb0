// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::config::ExecutionMode;
use crate::error::ProvisionError;
use crate::workspace::TemplateSource;
use lspload_adapters::{FakeClientFactory, StubServer, TcpClientFactory};
use lspload_core::SequentialIdGen;
use tempfile::TempDir;
use yare::parameterized;

fn test_config(base: &TempDir) -> LoadTestConfig {
    LoadTestConfig {
        soak_ms: 50,
        max_delay_ms: 5,
        seed: Some(1),
        workspace_base: Some(base.path().to_path_buf()),
        ..LoadTestConfig::default()
    }
}

fn provisioner(base: &TempDir) -> WorkspaceProvisioner<SequentialIdGen> {
    WorkspaceProvisioner::with_id_gen(
        base.path(),
        TemplateSource::Bundled,
        SequentialIdGen::new("ws"),
    )
}

fn orchestrator(
    base: &TempDir,
    factory: &FakeClientFactory,
    config: LoadTestConfig,
) -> Orchestrator<FakeClientFactory, SequentialIdGen> {
    Orchestrator::new(factory.clone(), provisioner(base), config)
}

fn remaining_dirs(base: &TempDir) -> usize {
    std::fs::read_dir(base.path()).unwrap().count()
}

#[parameterized(
    one = { 1 },
    three = { 3 },
    eight = { 8 },
)]
fn spawn_clients_registers_exactly_n(n: usize) {
    let base = TempDir::new().unwrap();
    let factory = FakeClientFactory::new();
    let mut orch = orchestrator(&base, &factory, test_config(&base));

    let workspaces = orch.provision(n).unwrap();
    assert_eq!(orch.spawn_clients(n, &workspaces), n);
    assert_eq!(orch.clients().len(), n);
    assert_eq!(factory.clients().len(), n);
    orch.cleanup();
}

#[test]
fn per_client_workspaces_are_distinct() {
    let base = TempDir::new().unwrap();
    let factory = FakeClientFactory::new();
    let mut orch = orchestrator(&base, &factory, test_config(&base));

    let workspaces = orch.provision(3).unwrap();
    orch.spawn_clients(3, &workspaces);

    let projects: Vec<_> = orch.clients().iter().map(|c| c.workspace().project().to_string()).collect();
    assert_eq!(projects, vec!["client-0", "client-1", "client-2"]);
    let names: Vec<_> = orch.clients().iter().map(|c| c.name().to_string()).collect();
    assert_eq!(names, vec!["client-0", "client-1", "client-2"]);
    assert_eq!(remaining_dirs(&base), 3);

    orch.cleanup();
    assert_eq!(remaining_dirs(&base), 0);
    assert!(orch.workspaces().is_empty());
}

#[test]
fn shared_workspace_is_bound_to_every_client() {
    let base = TempDir::new().unwrap();
    let factory = FakeClientFactory::new();
    let config = LoadTestConfig {
        workspace_mode: WorkspaceMode::Shared,
        ..test_config(&base)
    };
    let mut orch = orchestrator(&base, &factory, config);

    let workspaces = orch.provision(4).unwrap();
    assert_eq!(workspaces.len(), 1);
    assert_eq!(workspaces[0].project(), "client-shared");
    orch.spawn_clients(4, &workspaces);

    assert!(orch
        .clients()
        .iter()
        .all(|c| Arc::ptr_eq(c.workspace(), &workspaces[0])));
    orch.cleanup();
}

#[test]
fn spawn_clients_without_workspace_registers_none() {
    let base = TempDir::new().unwrap();
    let factory = FakeClientFactory::new();
    let mut orch = orchestrator(&base, &factory, test_config(&base));
    assert_eq!(orch.spawn_clients(2, &[]), 0);
    assert!(orch.clients().is_empty());
}

#[tokio::test]
async fn failed_init_excludes_client() {
    let base = TempDir::new().unwrap();
    let factory = FakeClientFactory::new();
    factory.fail_init_for("client-1");
    let mut orch = orchestrator(&base, &factory, test_config(&base));

    let workspaces = orch.provision(3).unwrap();
    orch.spawn_clients(3, &workspaces);
    let timings = orch.init_clients().await;

    assert_eq!(timings.len(), 3);
    assert!(timings[0].succeeded());
    assert!(!timings[1].succeeded());
    assert!(timings[2].succeeded());
    assert_eq!(orch.clients().len(), 2);
    assert_eq!(factory.client("client-1").unwrap().exit_count(), 1);
    orch.cleanup();
}

#[tokio::test]
async fn concurrent_init_overlaps_and_keeps_order() {
    let base = TempDir::new().unwrap();
    let factory = FakeClientFactory::new();
    factory.set_init_delay(Duration::from_millis(100));
    let config = LoadTestConfig {
        init_mode: InitMode::Concurrent,
        ..test_config(&base)
    };
    let mut orch = orchestrator(&base, &factory, config);

    let workspaces = orch.provision(4).unwrap();
    orch.spawn_clients(4, &workspaces);
    let start = Instant::now();
    let timings = orch.init_clients().await;

    assert!(start.elapsed() < Duration::from_millis(350));
    let names: Vec<_> = timings.iter().map(|t| t.name.to_string()).collect();
    assert_eq!(names, vec!["client-0", "client-1", "client-2", "client-3"]);
    assert!(timings.iter().all(InitTiming::succeeded));
    orch.cleanup();
}

#[tokio::test]
async fn kill_all_stops_hung_clients() {
    let base = TempDir::new().unwrap();
    let factory = FakeClientFactory::new();
    factory.hang_requests();
    let mut orch = orchestrator(&base, &factory, test_config(&base));

    let workspaces = orch.provision(3).unwrap();
    orch.spawn_clients(3, &workspaces);
    orch.init_clients().await;
    assert_eq!(orch.run_clients(), 3);
    assert_eq!(orch.pending_tasks(), 3);
    tokio::time::sleep(Duration::from_millis(20)).await;

    let reports = tokio::time::timeout(Duration::from_secs(2), orch.kill_all())
        .await
        .unwrap();

    assert_eq!(reports.len(), 3);
    assert_eq!(orch.pending_tasks(), 0);
    for (_, client) in factory.clients() {
        assert_eq!(client.state(), ClientState::Closed);
        assert_eq!(client.exit_count(), 1);
    }
    orch.cleanup();
}

#[tokio::test]
async fn kill_all_exits_clients_that_never_ran() {
    let base = TempDir::new().unwrap();
    let factory = FakeClientFactory::new();
    let mut orch = orchestrator(&base, &factory, test_config(&base));

    let workspaces = orch.provision(2).unwrap();
    orch.spawn_clients(2, &workspaces);
    orch.init_clients().await;
    orch.kill_all().await;

    assert!(orch.clients().is_empty());
    for (_, client) in factory.clients() {
        assert_eq!(client.state(), ClientState::Closed);
    }
    orch.cleanup();
}

#[tokio::test]
async fn launch_test_runs_every_phase_and_cleans_up() {
    let base = TempDir::new().unwrap();
    let factory = FakeClientFactory::new();
    let mut orch = orchestrator(&base, &factory, test_config(&base));

    let summary = orch.launch_test(3).await.unwrap();

    assert_eq!(summary.timings.len(), 3);
    assert!(summary.timings.iter().all(InitTiming::succeeded));
    assert_eq!(summary.reports.len(), 3);
    assert!(summary.reports.iter().all(|r| r.cancelled && r.iterations > 0));
    assert_eq!(
        orch.phase_history(),
        &[
            RunPhase::Idle,
            RunPhase::Provisioning,
            RunPhase::Initializing,
            RunPhase::Running,
            RunPhase::Draining,
            RunPhase::Terminated,
        ]
    );
    assert_eq!(orch.pending_tasks(), 0);
    assert_eq!(remaining_dirs(&base), 0);
}

#[tokio::test]
async fn launch_test_detached_mode_completes() {
    let base = TempDir::new().unwrap();
    let factory = FakeClientFactory::new();
    let config = LoadTestConfig {
        execution_mode: ExecutionMode::Detached,
        with_edits: true,
        ..test_config(&base)
    };
    let mut orch = orchestrator(&base, &factory, config);

    let summary = orch.launch_test(2).await.unwrap();
    assert_eq!(summary.reports.len(), 2);
    assert!(summary.reports.iter().all(|r| r.failures == 0));
    for (_, client) in factory.clients() {
        assert_eq!(client.exit_count(), 1);
    }
    assert_eq!(remaining_dirs(&base), 0);
}

#[tokio::test]
async fn launch_test_fails_when_no_client_initializes() {
    let base = TempDir::new().unwrap();
    let factory = FakeClientFactory::new();
    factory.fail_init_for("client-0");
    factory.fail_init_for("client-1");
    let mut orch = orchestrator(&base, &factory, test_config(&base));

    let err = orch.launch_test(2).await.unwrap_err();

    assert!(matches!(
        err,
        OrchestratorError::NoClientsInitialized { attempted: 2 }
    ));
    assert_eq!(orch.phase(), RunPhase::Terminated);
    assert!(!orch.phase_history().contains(&RunPhase::Running));
    assert_eq!(remaining_dirs(&base), 0);
}

#[tokio::test]
async fn launch_test_provision_failure_drains() {
    let base = TempDir::new().unwrap();
    let factory = FakeClientFactory::new();
    let provisioner = WorkspaceProvisioner::with_id_gen(
        base.path(),
        TemplateSource::Directory(base.path().join("missing")),
        SequentialIdGen::new("ws"),
    );
    let mut orch = Orchestrator::new(factory.clone(), provisioner, test_config(&base));

    let err = orch.launch_test(2).await.unwrap_err();

    assert!(matches!(
        err,
        OrchestratorError::Provision(ProvisionError::TemplatesNotFound(_))
    ));
    assert_eq!(
        orch.phase_history(),
        &[
            RunPhase::Idle,
            RunPhase::Provisioning,
            RunPhase::Draining,
            RunPhase::Terminated,
        ]
    );
    assert!(factory.clients().is_empty());
}

#[tokio::test]
async fn interrupt_ends_soak_early() {
    let base = TempDir::new().unwrap();
    let factory = FakeClientFactory::new();
    let config = LoadTestConfig {
        soak_ms: 60_000,
        ..test_config(&base)
    };
    let mut orch = orchestrator(&base, &factory, config);

    let start = Instant::now();
    let summary = orch
        .launch_test_until(2, tokio::time::sleep(Duration::from_millis(50)))
        .await
        .unwrap();

    assert!(start.elapsed() < Duration::from_secs(5));
    assert_eq!(summary.reports.len(), 2);
    assert_eq!(remaining_dirs(&base), 0);
}

#[tokio::test]
async fn interrupt_during_init_drains() {
    for init_mode in [InitMode::Sequential, InitMode::Concurrent] {
        let base = TempDir::new().unwrap();
        let factory = FakeClientFactory::new();
        factory.set_init_delay(Duration::from_secs(30));
        let config = LoadTestConfig {
            init_mode,
            ..test_config(&base)
        };
        let mut orch = orchestrator(&base, &factory, config);

        let start = Instant::now();
        let err = orch
            .launch_test_until(2, tokio::time::sleep(Duration::from_millis(50)))
            .await
            .unwrap_err();

        assert!(start.elapsed() < Duration::from_secs(5));
        assert!(matches!(
            err,
            OrchestratorError::Interrupted(RunPhase::Initializing)
        ));
        assert_eq!(
            orch.phase_history(),
            &[
                RunPhase::Idle,
                RunPhase::Provisioning,
                RunPhase::Initializing,
                RunPhase::Draining,
                RunPhase::Terminated,
            ]
        );
        assert_eq!(factory.clients().len(), 2);
        for (_, client) in factory.clients() {
            assert_eq!(client.state(), ClientState::Closed);
            assert_eq!(client.exit_count(), 1);
        }
        assert_eq!(remaining_dirs(&base), 0);
    }
}

#[tokio::test]
async fn interrupt_before_init_skips_handshakes() {
    let base = TempDir::new().unwrap();
    let factory = FakeClientFactory::new();
    let mut orch = orchestrator(&base, &factory, test_config(&base));

    let err = orch
        .launch_test_until(2, std::future::ready(()))
        .await
        .unwrap_err();

    assert!(matches!(err, OrchestratorError::Interrupted(_)));
    for (_, client) in factory.clients() {
        assert!(!client
            .calls()
            .iter()
            .any(|c| matches!(c, lspload_adapters::ClientCall::Init { .. })));
        assert_eq!(client.exit_count(), 1);
    }
    assert_eq!(remaining_dirs(&base), 0);
}

#[tokio::test]
async fn second_launch_is_rejected() {
    let base = TempDir::new().unwrap();
    let factory = FakeClientFactory::new();
    let mut orch = orchestrator(&base, &factory, test_config(&base));

    orch.launch_test(1).await.unwrap();
    let err = orch.launch_test(1).await.unwrap_err();
    assert!(matches!(err, OrchestratorError::InvalidPhase(_)));
}

#[tokio::test]
async fn dropping_undrained_orchestrator_removes_workspaces() {
    let base = TempDir::new().unwrap();
    let factory = FakeClientFactory::new();
    factory.hang_requests();
    let mut orch = orchestrator(&base, &factory, test_config(&base));

    let workspaces = orch.provision(2).unwrap();
    orch.spawn_clients(2, &workspaces);
    orch.init_clients().await;
    orch.run_clients();
    assert_eq!(remaining_dirs(&base), 2);

    drop(orch);
    assert_eq!(remaining_dirs(&base), 0);
}

#[tokio::test]
async fn dropping_orchestrator_releases_unlaunched_clients() {
    let base = TempDir::new().unwrap();
    let factory = FakeClientFactory::new();
    let mut orch = orchestrator(&base, &factory, test_config(&base));

    let workspaces = orch.provision(1).unwrap();
    orch.spawn_clients(1, &workspaces);
    drop(workspaces);
    let client = factory.client("client-0").unwrap();
    // factory, orchestrator, and this test
    assert_eq!(client.handle_count(), 3);

    drop(orch);
    assert_eq!(client.handle_count(), 2);
    assert_eq!(remaining_dirs(&base), 0);
}

#[tokio::test]
async fn cancelled_launch_still_removes_workspaces() {
    let base = TempDir::new().unwrap();
    let factory = FakeClientFactory::new();
    let config = LoadTestConfig {
        soak_ms: 60_000,
        ..test_config(&base)
    };
    let mut orch = orchestrator(&base, &factory, config);

    let launch = orch.launch_test(2);
    let _ = tokio::time::timeout(Duration::from_millis(50), launch).await;
    drop(orch);

    assert_eq!(remaining_dirs(&base), 0);
}

#[tokio::test]
async fn launch_test_against_stub_server() {
    let server = StubServer::start().await.unwrap();
    let base = TempDir::new().unwrap();
    let config = LoadTestConfig {
        address: server.addr().to_string(),
        soak_ms: 300,
        max_delay_ms: 20,
        ..test_config(&base)
    };
    let factory = TcpClientFactory::new(config.address.clone())
        .with_shutdown_grace(Duration::from_millis(500));
    let mut orch = Orchestrator::new(factory, provisioner(&base), config);

    let summary = orch.launch_test(3).await.unwrap();

    assert_eq!(summary.timings.len(), 3);
    assert!(summary.timings.iter().all(InitTiming::succeeded));
    assert_eq!(summary.reports.len(), 3);
    assert!(summary.reports.iter().all(|r| r.cancelled));
    assert_eq!(orch.pending_tasks(), 0);
    assert_eq!(remaining_dirs(&base), 0);

    tokio::time::sleep(Duration::from_millis(50)).await;
    let stats = server.stats();
    assert_eq!(stats.connections, 3);
    assert_eq!(stats.requests("initialize"), 3);
    assert_eq!(stats.notifications("initialized"), 3);
    assert_eq!(stats.requests("shutdown"), 3);
    assert_eq!(stats.exits, 3);
    // A run loop cancelled mid-operation leaves its document open
    let opens = stats.notifications("textDocument/didOpen");
    let closes = stats.notifications("textDocument/didClose");
    assert!(closes > 0);
    assert!(opens >= closes && opens - closes <= 3);
}
