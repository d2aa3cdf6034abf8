//! Unit tests for bootstrap and serving.

use std::sync::Arc;

use relay_core::MatchMode;
use rstest::{fixture, rstest};

use super::support::{
    ConversationSignal, FailingConfigLoader, HealthEvent, RecordingHealthReporter,
    TempConfigLoader,
};
use crate::bootstrap::{BootstrapError, bootstrap_with};
use crate::run_daemon;

#[fixture]
fn reporter() -> Arc<RecordingHealthReporter> {
    Arc::new(RecordingHealthReporter::default())
}

#[rstest]
fn bootstrap_reports_each_stage(reporter: Arc<RecordingHealthReporter>) {
    let loader = TempConfigLoader::new();

    let daemon = bootstrap_with(&loader, reporter.clone()).expect("bootstrap should succeed");

    assert_eq!(
        reporter.events(),
        vec![HealthEvent::BootstrapStarting, HealthEvent::BootstrapSucceeded]
    );
    let shared = daemon.router();
    let router = shared.lock().expect("router mutex");
    assert!(router.commands().contains("ping"));
    assert_eq!(router.events().match_mode(), MatchMode::Exact);
    assert!(
        loader
            .socket_path()
            .parent()
            .is_some_and(|parent| parent.is_dir()),
        "socket directory should be prepared"
    );
}

#[rstest]
fn bootstrap_imports_configured_hooks(reporter: Arc<RecordingHealthReporter>) {
    let mut loader = TempConfigLoader::new();
    loader.write_hooks(
        r#"{
            "deploy": {"callback": ["Relay\\Audit:record", "Relay\\Log::info"], "reset": true},
            "cleanup": {"callback": ["Relay\\Log::info"], "remove": true}
        }"#,
    );
    loader.enable_pattern_groups();

    let daemon = bootstrap_with(&loader, reporter.clone()).expect("bootstrap should succeed");

    assert!(reporter.events().contains(&HealthEvent::HooksImported(3)));
    let shared = daemon.router();
    let router = shared.lock().expect("router mutex");
    assert_eq!(router.events().count(), 2);
    assert!(router.events().group("deploy").is_some_and(|group| group.reset()));
    assert_eq!(router.events().match_mode(), MatchMode::Pattern);
}

#[rstest]
fn missing_hook_files_fail_bootstrap(reporter: Arc<RecordingHealthReporter>) {
    let mut loader = TempConfigLoader::new();
    loader.point_hooks_at_missing_file();

    let error = bootstrap_with(&loader, reporter.clone()).expect_err("bootstrap should fail");

    assert!(matches!(error, BootstrapError::Hooks { .. }));
    assert!(matches!(
        reporter.events().last(),
        Some(HealthEvent::BootstrapFailed(_))
    ));
}

#[rstest]
fn configuration_errors_fail_bootstrap(reporter: Arc<RecordingHealthReporter>) {
    let error =
        bootstrap_with(&FailingConfigLoader, reporter.clone()).expect_err("bootstrap should fail");

    assert!(matches!(error, BootstrapError::Configuration { .. }));
    assert_eq!(reporter.events().len(), 2);
}

#[rstest]
fn serve_answers_until_the_signal_returns(reporter: Arc<RecordingHealthReporter>) {
    let loader = TempConfigLoader::new();
    let signal = ConversationSignal::new(loader.socket_path(), "ping\necho up\nquit\n");

    run_daemon(&loader, reporter.clone(), &signal).expect("relay should serve");

    assert_eq!(signal.replies(), vec!["pong", "up", "bye"]);
    let events = reporter.events();
    assert!(events.contains(&HealthEvent::ListenerReady));
    assert_eq!(events.last(), Some(&HealthEvent::ListenerStopped));
}
