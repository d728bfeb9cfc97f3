#![allow(clippy::unwrap_used)]
// Long-polling sessions against a wiremock Engine.IO server.

use std::time::Duration;

use adminlink_api::{
    AuthPayload, SocketEvent, SocketHandle, SocketOptions, TransportConfig, TransportKind,
};
use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use url::Url;
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

const OPEN: &str = r#"0{"sid":"eio-1","upgrades":[],"pingInterval":25000,"pingTimeout":20000,"maxPayload":1000000}"#;

fn options(server: &MockServer, transports: &[TransportKind]) -> SocketOptions {
    let mut options = SocketOptions::new(Url::parse(&server.uri()).unwrap(), "/admin").with_auth(
        AuthPayload {
            token: SecretString::from("t0k".to_string()),
            role: "admin".into(),
            username: "ops".into(),
        },
    );
    options.transport = TransportConfig {
        transports: transports.to_vec(),
        timeout: Duration::from_secs(5),
        cookie: Some(SecretString::from("io=sticky".to_string())),
        ..TransportConfig::default()
    };
    options
}

async fn next_event(events: &mut tokio::sync::mpsc::Receiver<SocketEvent>) -> SocketEvent {
    tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("timed out waiting for socket event")
        .expect("event channel closed")
}

async fn mount_session(server: &MockServer, first_poll: &str) {
    Mock::given(method("GET"))
        .and(path("/socket.io/"))
        .and(query_param("EIO", "4"))
        .and(query_param("transport", "polling"))
        .and(query_param_is_missing("sid"))
        .respond_with(ResponseTemplate::new(200).set_body_string(OPEN))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/socket.io/"))
        .and(query_param("sid", "eio-1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(first_poll))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(server)
        .await;

    // Later polls hang like an idle server would.
    Mock::given(method("GET"))
        .and(path("/socket.io/"))
        .and(query_param("sid", "eio-1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("6")
                .set_delay(Duration::from_secs(30)),
        )
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/socket.io/"))
        .and(query_param("sid", "eio-1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(server)
        .await;
}

/// The namespace CONNECT body, waiting for the client's POST to land.
async fn posted_connect(server: &MockServer) -> String {
    for _ in 0..100 {
        let requests = server.received_requests().await.unwrap();
        let connect = requests
            .iter()
            .filter(|r| r.method.as_str() == "POST")
            .filter_map(|r| std::str::from_utf8(&r.body).ok())
            .flat_map(|body| body.split('\x1e'))
            .find_map(|packet| packet.strip_prefix("40/admin,"))
            .map(str::to_owned);
        if let Some(connect) = connect {
            return connect;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("namespace CONNECT was never posted");
}

#[tokio::test]
async fn polling_session_joins_namespace_and_delivers_events() {
    let server = MockServer::start().await;
    mount_session(
        &server,
        "40/admin,{\"sid\":\"nsp-1\"}\x1e42/admin,[\"ip_banned\",\"1.2.3.4\"]",
    )
    .await;

    let cancel = CancellationToken::new();
    let (handle, mut events) =
        SocketHandle::connect(options(&server, &[TransportKind::Polling]), cancel.clone())
            .unwrap();

    assert_eq!(next_event(&mut events).await, SocketEvent::Connected);
    assert_eq!(
        next_event(&mut events).await,
        SocketEvent::Message {
            name: "ip_banned".into(),
            payload: json!("1.2.3.4"),
        }
    );
    assert!(handle.is_connected());

    let connect = posted_connect(&server).await;
    assert_eq!(
        serde_json::from_str::<Value>(&connect).unwrap(),
        json!({ "token": "t0k", "role": "admin", "username": "ops" })
    );

    let handshake = &server.received_requests().await.unwrap()[0];
    assert_eq!(
        handshake.headers.get("cookie").map(|v| v.to_str().unwrap()),
        Some("io=sticky")
    );

    handle.shutdown();
    assert_eq!(
        next_event(&mut events).await,
        SocketEvent::Disconnected {
            reason: "io client disconnect".into(),
        }
    );
}

#[tokio::test]
async fn refused_namespace_reports_connect_error_and_retries() {
    let server = MockServer::start().await;
    mount_session(
        &server,
        "44/admin,{\"message\":\"Authentication error\"}",
    )
    .await;

    let cancel = CancellationToken::new();
    let (handle, mut events) =
        SocketHandle::connect(options(&server, &[TransportKind::Polling]), cancel.clone())
            .unwrap();

    match next_event(&mut events).await {
        SocketEvent::ConnectError { message } => {
            assert!(message.contains("Authentication error"), "{message}");
        }
        other => panic!("expected ConnectError, got {other:?}"),
    }
    assert_eq!(
        next_event(&mut events).await,
        SocketEvent::Reconnecting { attempt: 1 }
    );
    assert!(!handle.is_connected());

    cancel.cancel();
}

#[tokio::test]
async fn upgrade_capable_client_stays_on_polling_without_an_offer() {
    let server = MockServer::start().await;
    mount_session(
        &server,
        "40/admin,{\"sid\":\"nsp-1\"}\x1e42/admin,[\"session_created\",{\"id\":\"abc\"}]",
    )
    .await;

    let cancel = CancellationToken::new();
    let (handle, mut events) = SocketHandle::connect(
        options(&server, &[TransportKind::WebSocket, TransportKind::Polling]),
        cancel.clone(),
    )
    .unwrap();

    assert_eq!(next_event(&mut events).await, SocketEvent::Connected);
    assert_eq!(
        next_event(&mut events).await,
        SocketEvent::Message {
            name: "session_created".into(),
            payload: json!({ "id": "abc" }),
        }
    );
    assert!(handle.is_connected());

    // Every request went over long-polling; no WebSocket upgrade was tried.
    let requests = server.received_requests().await.unwrap();
    assert!(requests.iter().all(|r| {
        r.url
            .query_pairs()
            .all(|(key, value)| key != "transport" || value == "polling")
    }));

    cancel.cancel();
}
