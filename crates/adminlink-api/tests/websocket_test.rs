#![allow(clippy::unwrap_used)]
// WebSocket sessions against an in-process Engine.IO server.

use std::time::Duration;

use adminlink_api::{
    AuthPayload, SocketEvent, SocketHandle, SocketOptions, TransportConfig, TransportKind,
};
use futures_util::{SinkExt, StreamExt};
use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use url::Url;

const OPEN: &str = r#"0{"sid":"eio-ws","upgrades":[],"pingInterval":25000,"pingTimeout":20000}"#;

type ServerSocket = WebSocketStream<TcpStream>;

async fn listen() -> (TcpListener, Url) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let origin = Url::parse(&format!("http://{}", listener.local_addr().unwrap())).unwrap();
    (listener, origin)
}

async fn accept(listener: &TcpListener) -> ServerSocket {
    let (tcp, _) = listener.accept().await.unwrap();
    tokio_tungstenite::accept_async(tcp).await.unwrap()
}

/// Next text frame from the client.
async fn read_text(ws: &mut ServerSocket) -> String {
    loop {
        match ws.next().await.unwrap().unwrap() {
            Message::Text(text) => return text.to_string(),
            Message::Close(_) => panic!("client closed the socket"),
            _ => {}
        }
    }
}

fn options(origin: Url) -> SocketOptions {
    let mut options = SocketOptions::new(origin, "/admin").with_auth(AuthPayload {
        token: SecretString::from("t0k".to_string()),
        role: "admin".into(),
        username: "ops".into(),
    });
    options.transport = TransportConfig {
        transports: vec![TransportKind::WebSocket],
        timeout: Duration::from_secs(5),
        ..TransportConfig::default()
    };
    options
}

async fn next_event(events: &mut mpsc::Receiver<SocketEvent>) -> SocketEvent {
    tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("timed out waiting for socket event")
        .expect("event channel closed")
}

#[tokio::test]
async fn websocket_session_round_trip() {
    let (listener, origin) = listen().await;

    let server = tokio::spawn(async move {
        let mut ws = accept(&listener).await;
        ws.send(Message::text(OPEN)).await.unwrap();

        let connect = read_text(&mut ws).await;
        let auth: Value = serde_json::from_str(connect.strip_prefix("40/admin,").unwrap()).unwrap();
        assert_eq!(auth, json!({ "token": "t0k", "role": "admin", "username": "ops" }));

        ws.send(Message::text(r#"40/admin,{"sid":"nsp-ws"}"#)).await.unwrap();
        ws.send(Message::text("2")).await.unwrap();
        assert_eq!(read_text(&mut ws).await, "3");
        ws.send(Message::text(r#"42/admin,["ip_banned","1.2.3.4"]"#))
            .await
            .unwrap();

        // The client's command, then its goodbye.
        let emitted = read_text(&mut ws).await;
        let leave = read_text(&mut ws).await;
        (emitted, leave)
    });

    let (handle, mut events) =
        SocketHandle::connect(options(origin), CancellationToken::new()).unwrap();

    assert_eq!(next_event(&mut events).await, SocketEvent::Connected);
    assert_eq!(
        next_event(&mut events).await,
        SocketEvent::Message {
            name: "ip_banned".into(),
            payload: json!("1.2.3.4"),
        }
    );

    assert!(handle.emit("unban_ip", Some(json!("1.2.3.4"))));
    // Give the socket task a moment to flush before leaving.
    tokio::time::sleep(Duration::from_millis(50)).await;
    handle.shutdown();

    let (emitted, leave) = server.await.unwrap();
    assert_eq!(emitted, r#"42/admin,["unban_ip","1.2.3.4"]"#);
    assert!(leave.starts_with("41/admin"), "{leave}");

    assert_eq!(
        next_event(&mut events).await,
        SocketEvent::Disconnected {
            reason: "io client disconnect".into(),
        }
    );
}

#[tokio::test]
async fn server_disconnect_triggers_reconnect() {
    let (listener, origin) = listen().await;

    let server = tokio::spawn(async move {
        for round in 0..2 {
            let mut ws = accept(&listener).await;
            ws.send(Message::text(OPEN)).await.unwrap();
            let _connect = read_text(&mut ws).await;
            let ack = format!(r#"40/admin,{{"sid":"nsp-{round}"}}"#);
            ws.send(Message::text(ack)).await.unwrap();
            if round == 0 {
                ws.send(Message::text("41/admin,")).await.unwrap();
            } else {
                // Hold the second session open until the client leaves.
                let _ = ws.next().await;
            }
        }
    });

    let mut options = options(origin);
    options.reconnect.min_delay = Duration::from_millis(10);
    let cancel = CancellationToken::new();
    let (handle, mut events) = SocketHandle::connect(options, cancel.clone()).unwrap();

    assert_eq!(next_event(&mut events).await, SocketEvent::Connected);
    assert!(matches!(
        next_event(&mut events).await,
        SocketEvent::Disconnected { .. }
    ));
    assert_eq!(
        next_event(&mut events).await,
        SocketEvent::Reconnecting { attempt: 1 }
    );
    assert_eq!(next_event(&mut events).await, SocketEvent::Connected);
    assert!(handle.is_connected());

    cancel.cancel();
    server.await.unwrap();
}
