//! Integration tests for IPX peering

mod common;

use common::{create_test_session, make_ready, BUNDLE_URL};
use jsdos_core::{DosError, IpxStatus, NetworkError, NetworkType, Step, IPX_PORT};
use jsdos_harness::{ConnectCall, MockCommandInterface};
use std::sync::Arc;
use tokio::time::Duration;

const RELAY: &str = "wss://relay.example";

#[tokio::test]
async fn test_connect_builds_sanitized_endpoint() {
    let session = create_test_session();
    let ci = Arc::new(MockCommandInterface::new());
    make_ready(&session, ci.clone()).await;

    session
        .controller
        .connect_peering("a@b@c", RELAY)
        .await
        .unwrap();

    assert_eq!(
        ci.connects(),
        vec![ConnectCall {
            network_type: NetworkType::DosboxIpx,
            address: "wss://relay.example:1900/ipx/a_b_c".to_string(),
            port: IPX_PORT,
        }]
    );
    assert_eq!(session.controller.session().network.ipx, IpxStatus::Connected);
}

#[tokio::test]
async fn test_connecting_is_observed_before_resolution() {
    let session = create_test_session();
    let ci = Arc::new(MockCommandInterface::new().with_latency(Duration::from_millis(20)));
    make_ready(&session, ci).await;
    let controller = &session.controller;

    let observe = async {
        tokio::task::yield_now().await;
        controller.session().network.ipx
    };
    let (result, seen) = tokio::join!(controller.connect_peering("lobby", RELAY), observe);

    assert!(result.is_ok());
    assert_eq!(seen, IpxStatus::Connecting);
    assert_eq!(controller.session().network.ipx, IpxStatus::Connected);
}

#[tokio::test]
async fn test_back_to_back_connects_then_already_connected() {
    let session = create_test_session();
    let ci = Arc::new(MockCommandInterface::new());
    make_ready(&session, ci.clone()).await;
    let controller = &session.controller;

    // The second call starts while the first is still connecting
    let (first, second) = tokio::join!(
        controller.connect_peering("lobby", RELAY),
        controller.connect_peering("lobby", RELAY)
    );
    assert!(first.is_ok());
    assert!(second.is_ok());
    assert_eq!(controller.session().network.ipx, IpxStatus::Connected);
    assert_eq!(ci.connects().len(), 2);

    let history = controller.history().len();
    let err = controller.connect_peering("lobby", RELAY).await.unwrap_err();
    assert!(matches!(err, DosError::Network(NetworkError::AlreadyConnected)));
    assert_eq!(err.to_string(), "Already connected");
    assert_eq!(controller.session().network.ipx, IpxStatus::Connected);
    assert_eq!(controller.history().len(), history);
    assert_eq!(ci.connects().len(), 2);
}

#[tokio::test]
async fn test_connect_without_command_interface() {
    let session = create_test_session();
    let controller = &session.controller;
    controller.init_emulators().await.unwrap();
    let history = controller.history().len();

    let err = controller.connect_peering("lobby", RELAY).await.unwrap_err();
    assert!(matches!(err, DosError::Network(NetworkError::NotStarted)));
    assert_eq!(err.to_string(), "DOS is not started");
    assert_eq!(controller.session().network.ipx, IpxStatus::Disconnected);
    assert_eq!(controller.history().len(), history);
}

#[tokio::test]
async fn test_transport_failure_sets_error_status() {
    let session = create_test_session();
    let ci = Arc::new(MockCommandInterface::failing("relay unreachable"));
    make_ready(&session, ci.clone()).await;
    let controller = &session.controller;

    let err = controller.connect_peering("lobby", RELAY).await.unwrap_err();
    assert!(matches!(
        err,
        DosError::Network(NetworkError::Transport { ref reason }) if reason == "relay unreachable"
    ));
    let state = controller.session();
    assert_eq!(state.network.ipx, IpxStatus::Error);
    assert_eq!(state.step, Step::BndReady);
    assert_eq!(state.error, None);

    // No automatic retry; an explicit one may succeed
    assert_eq!(ci.connects().len(), 1);
    ci.set_failure(None);
    controller.connect_peering("lobby", RELAY).await.unwrap();
    assert_eq!(controller.session().network.ipx, IpxStatus::Connected);
}

#[tokio::test]
async fn test_disconnect() {
    let session = create_test_session();
    let ci = Arc::new(MockCommandInterface::new());
    make_ready(&session, ci.clone()).await;
    let controller = &session.controller;

    controller.connect_peering("lobby", RELAY).await.unwrap();
    controller.disconnect_peering().unwrap();

    assert_eq!(controller.session().network.ipx, IpxStatus::Disconnected);
    assert_eq!(ci.disconnects(), vec![NetworkType::DosboxIpx]);
}

#[tokio::test]
async fn test_disconnect_when_already_disconnected() {
    let session = create_test_session();
    let controller = &session.controller;

    // No command interface at all
    controller.disconnect_peering().unwrap();
    assert_eq!(controller.session().network.ipx, IpxStatus::Disconnected);

    let ci = Arc::new(MockCommandInterface::new());
    make_ready(&session, ci.clone()).await;
    controller.disconnect_peering().unwrap();
    controller.disconnect_peering().unwrap();
    assert_eq!(controller.session().network.ipx, IpxStatus::Disconnected);
    assert_eq!(ci.disconnects().len(), 2);
}

#[tokio::test]
async fn test_reload_during_connect_discards_result() {
    let session = create_test_session();
    let ci = Arc::new(MockCommandInterface::new().with_latency(Duration::from_millis(20)));
    make_ready(&session, ci.clone()).await;
    let controller = &session.controller;

    let reload = async {
        tokio::task::yield_now().await;
        controller
            .load_bundle(BUNDLE_URL, None, &session.fetcher)
            .await
    };
    let (connect, reloaded) = tokio::join!(controller.connect_peering("lobby", RELAY), reload);

    assert!(reloaded.is_ok());
    assert!(matches!(
        connect.unwrap_err(),
        DosError::Network(NetworkError::Superseded)
    ));
    let state = controller.session();
    assert_eq!(state.network.ipx, IpxStatus::Disconnected);
    assert_eq!(state.step, Step::BndConfig);
    assert!(!state.ci);
    // The link being brought up was closed with the old instance
    assert_eq!(ci.disconnects(), vec![NetworkType::DosboxIpx]);
}

#[tokio::test]
async fn test_disconnect_during_connect_discards_result() {
    let session = create_test_session();
    let ci = Arc::new(MockCommandInterface::new().with_latency(Duration::from_millis(20)));
    make_ready(&session, ci.clone()).await;
    let controller = &session.controller;

    let disconnect = async {
        tokio::task::yield_now().await;
        let seen = controller.session().network.ipx;
        controller.disconnect_peering().map(|()| seen)
    };
    let (connect, disconnected) =
        tokio::join!(controller.connect_peering("lobby", RELAY), disconnect);

    assert_eq!(disconnected.unwrap(), IpxStatus::Connecting);
    let err = connect.unwrap_err();
    assert!(matches!(err, DosError::Network(NetworkError::Superseded)));
    assert_eq!(err.to_string(), "Peering attempt was cancelled while connecting");

    // The late success does not resurrect the closed link
    let state = controller.session();
    assert_eq!(state.network.ipx, IpxStatus::Disconnected);
    assert_eq!(state.step, Step::BndReady);
    assert!(state.ci);
    assert_eq!(ci.connects().len(), 1);
    assert_eq!(ci.disconnects(), vec![NetworkType::DosboxIpx]);

    // A fresh attempt still works
    controller.connect_peering("lobby", RELAY).await.unwrap();
    assert_eq!(controller.session().network.ipx, IpxStatus::Connected);
}

#[tokio::test]
async fn test_disconnect_during_failed_connect_keeps_disconnected() {
    let session = create_test_session();
    let ci = Arc::new(
        MockCommandInterface::failing("relay unreachable").with_latency(Duration::from_millis(20)),
    );
    make_ready(&session, ci.clone()).await;
    let controller = &session.controller;

    let disconnect = async {
        tokio::task::yield_now().await;
        controller.disconnect_peering()
    };
    let (connect, disconnected) =
        tokio::join!(controller.connect_peering("lobby", RELAY), disconnect);

    disconnected.unwrap();
    assert!(matches!(
        connect.unwrap_err(),
        DosError::Network(NetworkError::Superseded)
    ));
    assert_eq!(controller.session().network.ipx, IpxStatus::Disconnected);
}
