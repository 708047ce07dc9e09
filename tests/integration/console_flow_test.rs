//! Integration tests for the wired console: login, push-driven refreshes,
//! read acknowledgements, identity switches, and logout.

mod helpers;

use std::sync::Arc;
use std::time::Duration;

use fmiis_api::mock::MockStaffApi;
use fmiis_auth::GuardState;
use fmiis_entity::{NotificationType, Role, Section};
use fmiis_realtime::{AckState, ReceiverTarget};

use helpers::{TestConsole, identity, notification, settle};

#[tokio::test(start_paused = true)]
async fn test_login_push_refresh_ack_logout() {
    let hr = identity("hr@x.com", Role::Hr);
    let api = Arc::new(MockStaffApi::new());
    api.set_login(Some(hr.clone()));
    api.set_whoami(Some(hr.clone()));
    api.set_notifications(vec![
        notification("n1", &[("hr@x.com", false)]),
        notification("n2", &[("hr@x.com", true), ("dev@x.com", false)]),
    ]);

    let console = TestConsole::new(api.clone());
    let engine = &console.engine;
    engine.session().rehydrate();
    settle().await;
    assert_eq!(engine.guard().state, GuardState::Denied);

    engine.manager().login("hr@x.com", "secret").await.unwrap();
    settle().await;

    assert_eq!(engine.location(), "/hr");
    assert_eq!(engine.guard().state, GuardState::Allowed);
    assert!(engine.push().is_connected());
    assert_eq!(console.connector.attempts(), vec!["hr@x.com"]);
    assert_eq!(engine.ledger().unseen_count(), 1);

    // A push event makes the ledger pick up the new server state.
    api.set_notifications(vec![
        notification("n1", &[("hr@x.com", false)]),
        notification("n2", &[("hr@x.com", true), ("dev@x.com", false)]),
        notification("n3", &[("hr@x.com", false)]),
    ]);
    console.connector.emit("new_notification");
    settle().await;
    assert_eq!(engine.ledger().unseen_count(), 2);

    let ack = engine.ledger().mark_seen("n1").expect("n1 is unseen");
    assert_eq!(engine.ledger().unseen_count(), 1);
    ack.await.unwrap();
    assert_eq!(api.acks(), vec![("n1".to_string(), "hr@x.com".to_string())]);
    assert!(matches!(
        engine.ledger().pending_acks().get("n1"),
        Some(AckState::Acked { .. })
    ));
    assert!(engine.ledger().mark_seen("n1").is_none());
    assert_eq!(api.acks().len(), 1);

    engine.manager().logout().await;
    settle().await;

    assert!(!engine.push().is_connected());
    assert!(console.connector.newest_closed());
    assert!(engine.ledger().notifications().is_empty());
    assert_eq!(engine.ledger().unseen_count(), 0);
    assert_eq!(engine.location(), "/");
    assert_eq!(engine.guard().state, GuardState::Denied);
    assert_eq!(api.logout_calls(), 1);

    engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_identity_switch_reconnects_and_replaces_cache() {
    let api = Arc::new(MockStaffApi::new());
    api.set_notifications(vec![
        notification("a1", &[("a@x.com", false)]),
        notification("b1", &[("b@x.com", false)]),
        notification("b2", &[("b@x.com", false)]),
    ]);

    let console = TestConsole::new(api.clone());
    let engine = &console.engine;
    engine.session().rehydrate();
    engine.session().login(identity("a@x.com", Role::Dev));
    settle().await;
    assert_eq!(engine.location(), "/dev");
    assert_eq!(engine.ledger().unseen_count(), 1);

    engine.session().login(identity("b@x.com", Role::Glob));
    settle().await;

    assert_eq!(console.connector.attempts(), vec!["a@x.com", "b@x.com"]);
    assert!(engine.push().is_connected());
    assert_eq!(engine.location(), "/glob");
    assert_eq!(engine.ledger().unseen_count(), 2);
    assert!(api.fetches().iter().any(|email| email == "b@x.com"));

    engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_slow_fetch_for_previous_identity_is_discarded() {
    let api = Arc::new(MockStaffApi::new());
    api.set_notifications(vec![notification("n1", &[("a@x.com", false)])]);
    api.set_fetch_delay(Some(Duration::from_secs(2)));

    let console = TestConsole::new(api.clone());
    let engine = &console.engine;
    engine.session().rehydrate();
    engine.session().login(identity("a@x.com", Role::Dev));
    settle().await;
    assert!(engine.ledger().is_loading());

    engine.session().logout();
    settle().await;
    tokio::time::sleep(Duration::from_secs(3)).await;

    assert!(engine.ledger().notifications().is_empty());
    assert_eq!(engine.ledger().unseen_count(), 0);
    assert!(!engine.ledger().is_loading());

    engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_failed_ack_is_reconciled_on_next_push_refresh() {
    let api = Arc::new(MockStaffApi::new());
    api.set_notifications(vec![notification("n1", &[("hr@x.com", false)])]);
    api.fail_acks(true);

    let console = TestConsole::new(api.clone());
    let engine = &console.engine;
    engine.session().rehydrate();
    engine.session().login(identity("hr@x.com", Role::Hr));
    settle().await;

    engine.ledger().mark_seen("n1").unwrap().await.unwrap();
    assert_eq!(engine.ledger().unseen_count(), 0);
    assert_eq!(
        engine.ledger().pending_acks().get("n1"),
        Some(&AckState::Failed)
    );

    console.connector.emit("notification_updated");
    settle().await;

    assert_eq!(engine.ledger().unseen_count(), 1);
    assert!(engine.ledger().pending_acks().is_empty());

    engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_push_outage_keeps_session_and_recovers() {
    let api = Arc::new(MockStaffApi::new());
    api.set_notifications(vec![notification("n1", &[("md@x.com", false)])]);

    let console = TestConsole::new(api.clone());
    console.connector.refuse(true);
    let engine = &console.engine;
    engine.session().rehydrate();
    engine.session().login(identity("md@x.com", Role::Md));
    settle().await;

    assert!(!engine.push().is_connected());
    assert_eq!(engine.location(), "/gm-md");
    assert_eq!(engine.ledger().unseen_count(), 1);

    console.connector.refuse(false);
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert!(engine.push().is_connected());
    assert!(console.connector.attempts().len() >= 2);
    assert!(engine.session().current().is_some());

    engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_management_sends_to_section() {
    let api = Arc::new(MockStaffApi::new());
    api.set_employees(vec![
        fmiis_entity::Employee {
            id: "1".to_string(),
            name: "Dev One".to_string(),
            email: "dev1@x.com".to_string(),
            role: Role::Dev,
        },
        fmiis_entity::Employee {
            id: "2".to_string(),
            name: "HR".to_string(),
            email: "hr@x.com".to_string(),
            role: Role::Hr,
        },
    ]);

    let console = TestConsole::new(api.clone());
    let engine = &console.engine;
    let gm = identity("gm@x.com", Role::Gm);

    let created = engine
        .composer()
        .send(
            &gm,
            NotificationType::DeveloperMeeting,
            &ReceiverTarget::Section(Section::Dev),
            Some("Standup moved to 11AM"),
        )
        .await
        .unwrap();

    assert_eq!(created.receivers.len(), 1);
    assert_eq!(created.receivers[0].email, "dev1@x.com");
    let sent = api.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].content, "Standup moved to 11AM");

    engine.shutdown().await;
}
