//! End-to-end chat flows against an in-process fake daemon.
//!
//! The daemon serves the subscription connection with a scripted list of
//! inbound frames, acks every command connection, and records each command
//! it reads.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chat_dispatch::{ChatDispatcher, DispatchError, HandlerError, Reply};
use regex::Captures;
use serde_json::{json, Value};
use signald_client::{ClientConfig, DaemonAddress, Message, SignaldClient};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::mpsc;

fn test_config(path: &Path) -> ClientConfig {
    let mut config = ClientConfig::with_address("+15550001111", DaemonAddress::unix(path));
    config.response_timeout = Duration::from_millis(300);
    config.drain_window = Duration::from_millis(20);
    config
}

fn spawn_daemon(listener: UnixListener, frames: Vec<String>) -> mpsc::UnboundedReceiver<Value> {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            let tx = tx.clone();
            let frames = frames.clone();
            tokio::spawn(handle_conn(stream, frames, tx));
        }
    });
    rx
}

async fn handle_conn(stream: UnixStream, frames: Vec<String>, tx: mpsc::UnboundedSender<Value>) {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let Ok(request) = serde_json::from_str::<Value>(&line) else {
            continue;
        };
        if request["type"] == "subscribe" {
            for frame in &frames {
                if writer.write_all(frame.as_bytes()).await.is_err() {
                    return;
                }
                if writer.write_all(b"\n").await.is_err() {
                    return;
                }
            }
            // Close the subscription once the script is written.
            return;
        }
        let id = request["id"].as_str().unwrap_or_default().to_string();
        let _ = tx.send(request);
        let reply = json!({"type": "ack", "id": id, "data": {}});
        let mut bytes = reply.to_string().into_bytes();
        bytes.push(b'\n');
        let _ = writer.write_all(&bytes).await;
    }
}

fn direct_message(source: &str, text: &str) -> String {
    json!({
        "type": "message",
        "data": {
            "username": "+15550001111",
            "source": source,
            "dataMessage": {"body": text, "timestamp": 42}
        }
    })
    .to_string()
}

fn group_message(source: &str, group_id: &str, text: &str) -> String {
    json!({
        "type": "message",
        "data": {
            "username": "+15550001111",
            "source": source,
            "dataMessage": {"body": text, "group": {"groupId": group_id}}
        }
    })
    .to_string()
}

fn empty_message(source: &str) -> String {
    json!({
        "type": "message",
        "data": {"username": "+15550001111", "source": source, "dataMessage": {}}
    })
    .to_string()
}

async fn assert_no_more_sends(sends: &mut mpsc::UnboundedReceiver<Value>) {
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(sends.try_recv().is_err());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn ping_reply_routes_to_the_sender_and_stops() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("signald.sock");
    let listener = UnixListener::bind(&path).unwrap();
    let mut sends = spawn_daemon(listener, vec![direct_message("+15551234567", "ping")]);

    let mut dispatcher = ChatDispatcher::new(SignaldClient::new(test_config(&path)));
    let later_hits = Arc::new(AtomicUsize::new(0));
    dispatcher
        .register_handler_with_order(
            10,
            "ping",
            |_message: &Message, _captures: &Captures<'_>| -> Result<Reply, HandlerError> {
                Ok(Reply::text("pong"))
            },
        )
        .unwrap();
    let hits = later_hits.clone();
    dispatcher
        .register_handler_with_order(
            20,
            "ping",
            move |_message: &Message, _captures: &Captures<'_>| -> Result<Reply, HandlerError> {
                hits.fetch_add(1, Ordering::SeqCst);
                Ok(Reply::text("second"))
            },
        )
        .unwrap();

    let err = dispatcher.run().await.unwrap_err();
    assert!(matches!(err, DispatchError::Client(_)));

    let send = sends.recv().await.unwrap();
    assert_eq!(send["type"], "send");
    assert_eq!(send["recipientAddress"], "+15551234567");
    assert_eq!(send["messageBody"], "pong");
    assert!(send.get("recipientGroupId").is_none());

    assert_eq!(later_hits.load(Ordering::SeqCst), 0);
    assert_no_more_sends(&mut sends).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn group_messages_reply_through_the_group() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("signald.sock");
    let listener = UnixListener::bind(&path).unwrap();
    let mut sends = spawn_daemon(
        listener,
        vec![group_message("+15551234567", "R3JvdXAx", "hello bot")],
    );

    let mut dispatcher = ChatDispatcher::new(SignaldClient::new(test_config(&path)));
    dispatcher
        .register_handler(
            "hello",
            |_message: &Message, _captures: &Captures<'_>| -> Result<Reply, HandlerError> {
                Ok(Reply::text("hi there"))
            },
        )
        .unwrap();

    let err = dispatcher.run().await.unwrap_err();
    assert!(matches!(err, DispatchError::Client(_)));

    let send = sends.recv().await.unwrap();
    assert_eq!(send["type"], "send");
    assert_eq!(send["recipientGroupId"], "R3JvdXAx");
    assert_eq!(send["messageBody"], "hi there");
    assert!(send.get("recipientAddress").is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn failing_handler_skips_the_message_but_not_the_loop() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("signald.sock");
    let listener = UnixListener::bind(&path).unwrap();
    let mut sends = spawn_daemon(
        listener,
        vec![
            direct_message("+15551234567", "boom now"),
            direct_message("+15557654321", "status"),
        ],
    );

    let mut dispatcher = ChatDispatcher::new(SignaldClient::new(test_config(&path)));
    dispatcher
        .register_handler_with_order(
            10,
            "boom",
            |_message: &Message, _captures: &Captures<'_>| -> Result<Reply, HandlerError> {
                Err(HandlerError::new("exploded"))
            },
        )
        .unwrap();
    let fallback_hits = Arc::new(AtomicUsize::new(0));
    let hits = fallback_hits.clone();
    dispatcher
        .register_handler_with_order(
            20,
            ".",
            move |message: &Message, _captures: &Captures<'_>| -> Result<Reply, HandlerError> {
                hits.fetch_add(1, Ordering::SeqCst);
                Ok(Reply::text(format!("saw: {}", message.text)))
            },
        )
        .unwrap();

    let err = dispatcher.run().await.unwrap_err();
    assert!(matches!(err, DispatchError::Client(_)));

    // The failing handler ended the first message's processing early, so
    // only the second message produced a reply.
    let send = sends.recv().await.unwrap();
    assert_eq!(send["recipientAddress"], "+15557654321");
    assert_eq!(send["messageBody"], "saw: status");
    assert_eq!(fallback_hits.load(Ordering::SeqCst), 1);
    assert_no_more_sends(&mut sends).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn continue_replies_let_later_handlers_fire() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("signald.sock");
    let listener = UnixListener::bind(&path).unwrap();
    let mut sends = spawn_daemon(listener, vec![direct_message("+15551234567", "multi")]);

    let mut dispatcher = ChatDispatcher::new(SignaldClient::new(test_config(&path)));
    dispatcher
        .register_handler_with_order(
            10,
            "multi",
            |_message: &Message, _captures: &Captures<'_>| -> Result<Reply, HandlerError> {
                Ok(Reply::and_continue("first"))
            },
        )
        .unwrap();
    dispatcher
        .register_handler_with_order(
            20,
            "multi",
            |_message: &Message, _captures: &Captures<'_>| -> Result<Reply, HandlerError> {
                Ok(Reply::text("second"))
            },
        )
        .unwrap();

    let err = dispatcher.run().await.unwrap_err();
    assert!(matches!(err, DispatchError::Client(_)));

    let first = sends.recv().await.unwrap();
    assert_eq!(first["messageBody"], "first");
    let second = sends.recv().await.unwrap();
    assert_eq!(second["messageBody"], "second");
    assert_no_more_sends(&mut sends).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn empty_text_never_reaches_a_handler() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("signald.sock");
    let listener = UnixListener::bind(&path).unwrap();
    let mut sends = spawn_daemon(listener, vec![empty_message("+15551234567")]);

    let mut dispatcher = ChatDispatcher::new(SignaldClient::new(test_config(&path)));
    let hits = Arc::new(AtomicUsize::new(0));
    let handler_hits = hits.clone();
    dispatcher
        .register_handler(
            ".",
            move |_message: &Message, _captures: &Captures<'_>| -> Result<Reply, HandlerError> {
                handler_hits.fetch_add(1, Ordering::SeqCst);
                Ok(Reply::text("never"))
            },
        )
        .unwrap();

    let err = dispatcher.run().await.unwrap_err();
    assert!(matches!(err, DispatchError::Client(_)));

    assert_eq!(hits.load(Ordering::SeqCst), 0);
    assert_no_more_sends(&mut sends).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn shutdown_signal_stops_the_loop_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("signald.sock");
    let listener = UnixListener::bind(&path).unwrap();

    // A daemon that keeps the subscription open without sending anything.
    tokio::spawn(async move {
        let Ok((stream, _)) = listener.accept().await else {
            return;
        };
        let (reader, writer) = stream.into_split();
        let mut lines = BufReader::new(reader).lines();
        // Keep the write half open so the subscription stays alive until
        // the client hangs up.
        while let Ok(Some(_)) = lines.next_line().await {}
        drop(writer);
    });

    let dispatcher = ChatDispatcher::new(SignaldClient::new(test_config(&path)));
    let result = dispatcher
        .run_with_shutdown(async {
            tokio::time::sleep(Duration::from_millis(50)).await;
        })
        .await;
    assert!(result.is_ok());
}
