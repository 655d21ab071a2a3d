// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Integration tests for the sync module.
//!
//! These run the coordinator against an in-process WebSocket server:
//! - Bearer credential and subscription handshake
//! - Updates landing in the mirrored store
//! - Reconnect after a server restart
//! - In-band session rejection

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chansync_core::{ConnectionConfig, CredentialStore, SubscribeFrame, SyncTuning};
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::header;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

use super::coordinator::SyncCoordinator;
use super::machine::ConnectionState;
use super::test_helpers::TestCollaborators;

/// What the test server saw.
#[derive(Default)]
struct ServerLog {
    authorization: Vec<String>,
    subscriptions: Vec<SubscribeFrame>,
}

/// Accepts one client and reads its subscription handshake.
async fn accept(listener: &TcpListener, log: &Arc<Mutex<ServerLog>>) -> WebSocketStream<TcpStream> {
    let (stream, _) = listener.accept().await.unwrap();
    let header_log = Arc::clone(log);
    let mut ws = tokio_tungstenite::accept_hdr_async(
        stream,
        move |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
            let value = req
                .headers()
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string();
            header_log.lock().unwrap().authorization.push(value);
            Ok(resp)
        },
    )
    .await
    .unwrap();

    let mut received = 0;
    while received < 2 {
        if let Message::Text(text) = ws.next().await.unwrap().unwrap() {
            let frame = SubscribeFrame::from_json(&text).unwrap();
            log.lock().unwrap().subscriptions.push(frame);
            received += 1;
        }
    }
    ws
}

async fn send_json(ws: &mut WebSocketStream<TcpStream>, value: serde_json::Value) {
    ws.send(Message::Text(value.to_string().into()))
        .await
        .unwrap();
}

/// Reads until the client goes away.
async fn drain(ws: &mut WebSocketStream<TcpStream>) {
    while let Some(Ok(_)) = ws.next().await {}
}

/// Polls `condition` in real time for up to two seconds.
async fn wait_for(condition: impl Fn() -> bool) -> bool {
    for _ in 0..200 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

#[tokio::test]
async fn syncs_and_reconnects_after_server_restart() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let log = Arc::new(Mutex::new(ServerLog::default()));

    let server_log = Arc::clone(&log);
    let server = tokio::spawn(async move {
        let mut first = accept(&listener, &server_log).await;
        send_json(
            &mut first,
            json!({ "value": { "channel": "stats", "round": 0, "type": "sync" } }),
        )
        .await;
        first
            .close(Some(CloseFrame {
                code: CloseCode::from(1001),
                reason: "restart".into(),
            }))
            .await
            .unwrap();
        drain(&mut first).await;

        let mut second = accept(&listener, &server_log).await;
        send_json(
            &mut second,
            json!({ "value": { "channel": "stats", "round": 1, "type": "sync" } }),
        )
        .await;
        send_json(
            &mut second,
            json!({ "value": { "channel": "workers", "count": 3 } }),
        )
        .await;
        drain(&mut second).await;
    });

    let collab = TestCollaborators::with_token("secret");
    let tuning = SyncTuning {
        reconnect_delay_ms: 50,
        ..Default::default()
    };
    let coordinator = SyncCoordinator::websocket(tuning, collab.collaborators());
    coordinator.connect(ConnectionConfig::new(format!("ws://{}", addr), "testnet"));

    let store = collab.store.clone();
    assert!(
        wait_for(|| {
            store
                .get("stats")
                .is_some_and(|v| v.contains("\"round\":1"))
                && store.get("workers").is_some()
        })
        .await
    );

    assert_eq!(coordinator.transports_opened(), 2);
    assert_eq!(coordinator.state(), ConnectionState::Open);
    assert_eq!(coordinator.retry_count(), 0);
    assert_eq!(collab.status.hashes().len(), 2);

    coordinator.reset_websocket_state().await;
    assert_eq!(coordinator.state(), ConnectionState::ClosedByUser);
    server.await.unwrap();

    let log = log.lock().unwrap();
    assert_eq!(log.authorization, vec!["Bearer secret", "Bearer secret"]);
    assert_eq!(log.subscriptions.len(), 4);
    assert!(log
        .subscriptions
        .iter()
        .all(|frame| frame.webfix == "testnet" && frame.method == "subscribe"));
}

#[tokio::test]
async fn in_band_rejection_expires_the_session() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let log = Arc::new(Mutex::new(ServerLog::default()));

    let server_log = Arc::clone(&log);
    let server = tokio::spawn(async move {
        let mut ws = accept(&listener, &server_log).await;
        send_json(&mut ws, json!({ "value": { "channel": "stats", "n": 1 } })).await;
        send_json(&mut ws, json!({ "error": "Unauthorized: token expired" })).await;
        drain(&mut ws).await;
    });

    let collab = TestCollaborators::with_token("stale");
    let coordinator = SyncCoordinator::websocket(SyncTuning::default(), collab.collaborators());
    coordinator.connect(ConnectionConfig::new(format!("ws://{}", addr), "testnet"));

    let auth = Arc::clone(&collab.auth);
    assert!(wait_for(|| auth.resets() == 1).await);

    assert_eq!(coordinator.state(), ConnectionState::Expired);
    assert!(coordinator.status().session_expired);
    assert_eq!(collab.auth.modal_calls(), vec![true]);
    assert!(collab.credentials.load().is_none());
    // The update received before the rejection was kept
    assert!(collab.store.get("stats").is_some());
    server.await.unwrap();
    assert_eq!(coordinator.transports_opened(), 1);
}
