//! Integration tests for session persistence, revalidation, and the route
//! guard across restarts.

mod helpers;

use std::sync::Arc;
use std::time::Duration;

use fmiis_api::mock::MockStaffApi;
use fmiis_auth::{DecisionStatus, GuardState, RevalidationStatus};
use fmiis_core::error::AppError;
use fmiis_core::traits::store::DurableStore;
use fmiis_entity::{Identity, Role};
use fmiis_storage::file::FileStore;

use helpers::{TestConsole, identity, settle, test_config};

fn file_store(dir: &tempfile::TempDir) -> Arc<dyn DurableStore> {
    Arc::new(FileStore::new(dir.path()).unwrap())
}

#[tokio::test(start_paused = true)]
async fn test_persisted_session_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let hr = identity("hr@x.com", Role::Hr);
    let api = Arc::new(MockStaffApi::new());
    api.set_whoami(Some(hr.clone()));

    let first = TestConsole::with_store(api.clone(), file_store(&dir), test_config());
    first.engine.session().rehydrate();
    first.engine.session().login(hr.clone());
    settle().await;
    first.engine.shutdown().await;

    let second = TestConsole::with_store(api.clone(), file_store(&dir), test_config());
    settle().await;
    assert_eq!(second.engine.guard().state, GuardState::Unknown);
    assert_eq!(second.engine.guard().decision.status, DecisionStatus::Pending);

    second.engine.session().rehydrate();
    settle().await;

    assert_eq!(second.engine.session().current(), Some(hr));
    assert_eq!(second.engine.location(), "/hr");
    assert_eq!(second.engine.guard().state, GuardState::Allowed);
    assert_eq!(
        second.engine.revalidator().status(),
        RevalidationStatus::Confirmed
    );

    second.engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_corrupted_record_rehydrates_signed_out() {
    let dir = tempfile::tempdir().unwrap();
    let store = file_store(&dir);
    store.set("user", "{\"email\": 42").unwrap();

    let console = TestConsole::with_store(Arc::new(MockStaffApi::new()), store, test_config());
    console.engine.navigate("/dev");
    console.engine.session().rehydrate();
    settle().await;

    assert!(console.engine.session().current().is_none());
    assert_eq!(console.engine.guard().state, GuardState::Denied);
    assert_eq!(console.engine.location(), "/");
    assert_eq!(console.store.get("user").unwrap(), None);

    console.engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_logout_then_rehydrate_stays_signed_out() {
    let console = TestConsole::new(Arc::new(MockStaffApi::new()));
    console.engine.session().rehydrate();
    console.engine.session().login(identity("dev@x.com", Role::Dev));
    settle().await;
    assert_eq!(console.engine.location(), "/dev");

    console.engine.session().logout();
    console.engine.session().rehydrate();
    settle().await;

    assert!(console.engine.session().current().is_none());
    assert_eq!(console.engine.guard().state, GuardState::Denied);
    assert_eq!(console.engine.location(), "/");
    // Denied at the root does not redirect to itself.
    assert_eq!(console.engine.guard().navigate, None);

    console.engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_failed_probe_keeps_identity_by_default() {
    let api = Arc::new(MockStaffApi::new());
    api.push_whoami(Err(AppError::service_unavailable("backend down")));

    let console = TestConsole::new(api.clone());
    let record = serde_json::to_string(&identity("glob@x.com", Role::Glob)).unwrap();
    console.store.set("user", &record).unwrap();
    console.engine.session().rehydrate();
    settle().await;

    assert!(console.engine.session().current().is_some());
    assert!(matches!(
        console.engine.revalidator().status(),
        RevalidationStatus::Failed { .. }
    ));
    assert_eq!(console.engine.location(), "/glob");
    assert_eq!(console.engine.guard().state, GuardState::Allowed);
    assert_eq!(api.whoami_calls(), 1);

    console.engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_failed_probe_signs_out_when_configured() {
    let api = Arc::new(MockStaffApi::new());
    let mut config = test_config();
    config.session.logout_on_probe_failure = true;

    let console = TestConsole::with_store(
        api.clone(),
        Arc::new(fmiis_storage::memory::MemoryStore::new()),
        config,
    );
    let record = serde_json::to_string(&identity("gm@x.com", Role::Gm)).unwrap();
    console.store.set("user", &record).unwrap();
    console.engine.navigate("/gm-md/notifications");
    console.engine.session().rehydrate();
    settle().await;

    assert!(console.engine.session().current().is_none());
    assert_eq!(console.store.get("user").unwrap(), None);
    assert_eq!(console.engine.location(), "/");
    assert_eq!(console.engine.guard().state, GuardState::Denied);
    assert!(!console.engine.push().is_connected());

    console.engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_probe_for_another_account_is_a_failure() {
    let api = Arc::new(MockStaffApi::new());
    api.set_whoami(Some(identity("someone-else@x.com", Role::Hr)));

    let console = TestConsole::new(api.clone());
    console.engine.session().rehydrate();
    console.engine.session().login(identity("dev@x.com", Role::Dev));
    settle().await;

    match console.engine.revalidator().status() {
        RevalidationStatus::Failed { reason } => assert!(reason.contains("someone-else@x.com")),
        other => panic!("expected a failed probe, got {other:?}"),
    }
    assert_eq!(
        console.engine.session().current().map(|i| i.email),
        Some("dev@x.com".to_string())
    );
    assert_eq!(console.engine.location(), "/dev");

    console.engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_reconciled_profile_does_not_reprobe() {
    let api = Arc::new(MockStaffApi::new());
    let server = Identity {
        display_name: "Renamed".to_string(),
        ..identity("md@x.com", Role::Md)
    };
    api.set_whoami(Some(server));

    let console = TestConsole::new(api.clone());
    console.engine.session().rehydrate();
    console.engine.session().login(identity("md@x.com", Role::Md));
    settle().await;
    tokio::time::sleep(Duration::from_secs(5)).await;

    let current = console.engine.session().current().unwrap();
    assert_eq!(current.display_name, "Renamed");
    assert_eq!(api.whoami_calls(), 1);
    assert_eq!(console.engine.location(), "/gm-md");

    console.engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_periodic_revalidation() {
    let api = Arc::new(MockStaffApi::new());
    api.set_whoami(Some(identity("hr@x.com", Role::Hr)));
    let mut config = test_config();
    config.session.revalidate_interval_seconds = 60;

    let console = TestConsole::with_store(
        api.clone(),
        Arc::new(fmiis_storage::memory::MemoryStore::new()),
        config,
    );
    console.engine.session().rehydrate();
    console.engine.session().login(identity("hr@x.com", Role::Hr));
    settle().await;
    assert_eq!(api.whoami_calls(), 1);

    tokio::time::sleep(Duration::from_secs(61)).await;
    assert_eq!(api.whoami_calls(), 2);

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(api.whoami_calls(), 3);

    console.engine.shutdown().await;
}
