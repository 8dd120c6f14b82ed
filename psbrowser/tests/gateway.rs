//! End-to-end tests: the shell over the TCP transport against an in-process
//! fake gateway.

use std::collections::BTreeSet;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::json;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;

use psbrowser::TransportError;
use psbrowser::protocol::{ClientFrame, ITEM_NOT_FOUND, Operation, Reply, ServerFrame};
use psbrowser::router::Router;
use psbrowser::session::Session;
use psbrowser::shell::{ScriptedInput, Shell};
use psbrowser::transport::{Credentials, TcpTransport, authenticate};

const JID: &str = "alice@example.org";
const SERVICE: &str = "pubsub.example.org";
const PASSWORD: &str = "secret";

#[derive(Clone, Copy)]
enum Mode {
    Serve,
    /// Hang up as soon as the first request arrives.
    HangUp,
}

type Received = Arc<Mutex<Vec<ClientFrame>>>;

fn children(nodes: &BTreeSet<String>, parent: Option<&str>) -> Vec<serde_json::Value> {
    nodes
        .iter()
        .filter(|n| match parent {
            None => !n.contains('/'),
            Some(p) => n
                .strip_prefix(p)
                .and_then(|rest| rest.strip_prefix('/'))
                .is_some_and(|rest| !rest.contains('/')),
        })
        .map(|n| json!({"node": n}))
        .collect()
}

fn answer(nodes: &mut BTreeSet<String>, operation: &Operation) -> Reply {
    match operation {
        Operation::QueryChildren { node: None } => {
            Reply::result(json!({"items": children(nodes, None)}))
        }
        Operation::QueryChildren { node: Some(n) } if nodes.contains(n) => {
            Reply::result(json!({"items": children(nodes, Some(n))}))
        }
        Operation::CreateNode { node, .. } => {
            if nodes.insert(node.clone()) {
                Reply::result(json!({}))
            } else {
                Reply::error("conflict")
            }
        }
        Operation::DeleteNode { node } if nodes.remove(node) => Reply::result(json!({})),
        Operation::Subscribe { .. } | Operation::Unsubscribe { .. } => Reply::result(json!({})),
        Operation::QueryAffiliations => Reply::result(json!({
            "affiliations": [{"node": "blog", "affiliation": "owner"}]
        })),
        _ => Reply::error(ITEM_NOT_FOUND),
    }
}

/// Accept one connection and serve it until the client goes away.
async fn spawn_gateway(seed: &[&str], mode: Mode) -> (SocketAddr, Received) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let received: Received = Arc::default();
    let log = received.clone();
    let mut nodes: BTreeSet<String> = seed.iter().map(|s| s.to_string()).collect();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.expect("accept");
        let (read_half, mut write_half) = stream.into_split();
        let mut lines = BufReader::new(read_half).lines();

        while let Ok(Some(line)) = lines.next_line().await {
            let frame: ClientFrame = serde_json::from_str(&line).expect("client frame");
            log.lock().expect("log").push(frame.clone());

            let response = match frame {
                ClientFrame::Auth { password, .. } if password == PASSWORD => {
                    ServerFrame::Authenticated
                }
                ClientFrame::Auth { .. } => ServerFrame::AuthenticationFailed {
                    reason: Some("not-authorized".into()),
                },
                ClientFrame::Presence { .. } => continue,
                ClientFrame::Request { .. } if matches!(mode, Mode::HangUp) => return,
                ClientFrame::Request { id, request } => ServerFrame::Reply {
                    id,
                    reply: answer(&mut nodes, &request.operation),
                },
            };
            let mut out = serde_json::to_string(&response).expect("server frame");
            out.push('\n');
            if write_half.write_all(out.as_bytes()).await.is_err() {
                return;
            }
        }
    });

    (addr, received)
}

async fn login(addr: SocketAddr, password: &str) -> Result<TcpTransport, TransportError> {
    let credentials = Credentials {
        jid: JID.into(),
        password: password.into(),
    };
    let (transport, mut events) =
        TcpTransport::connect(&addr.ip().to_string(), addr.port(), &credentials, 1 << 20).await?;
    authenticate(&transport, &mut events, Duration::from_secs(5)).await?;
    Ok(transport)
}

fn shell(transport: TcpTransport) -> Shell<TcpTransport, Vec<u8>> {
    Shell::new(
        Session::new(JID, SERVICE),
        Router::new(transport, Duration::from_secs(5)),
        Vec::new(),
    )
}

#[tokio::test]
async fn browses_and_edits_the_tree() {
    let (addr, received) = spawn_gateway(&["blog"], Mode::Serve).await;
    let transport = login(addr, PASSWORD).await.expect("login");
    let mut shell = shell(transport);
    let mut input = ScriptedInput::new([
        "ls",
        "mkdir news",
        "cd news/",
        "mkdir news/sports",
        "ls",
        "cd ghost",
        "pwd",
        "affiliations",
    ]);

    shell.run(&mut input).await.expect("run");

    let out = String::from_utf8(shell.output().clone()).expect("utf8");
    assert_eq!(
        out,
        "blog\nnews/sports\nNode 'ghost' not found\nnews\nblog (owner)\n\n"
    );
    assert_eq!(input.prompts().last().map(String::as_str), Some("alice@example.org:news> "));

    let frames = received.lock().expect("log").clone();
    assert!(matches!(&frames[0], ClientFrame::Auth { jid, .. } if jid == JID));
    assert_eq!(frames[1], ClientFrame::online());
    let ids: Vec<_> = frames
        .iter()
        .filter_map(|f| match f {
            ClientFrame::Request { id, .. } => Some(id.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(ids.len(), 7);
    assert_eq!(ids[0], "psb-1");
    assert_eq!(ids[6], "psb-7");
}

#[tokio::test]
async fn wrong_password_is_fatal() {
    let (addr, received) = spawn_gateway(&[], Mode::Serve).await;

    let err = login(addr, "wrong").await.unwrap_err();

    assert!(matches!(err, TransportError::AuthenticationFailed(ref reason) if reason == "not-authorized"));
    // No presence after a failed login.
    let frames = received.lock().expect("log").clone();
    assert!(!frames.contains(&ClientFrame::online()));
}

#[tokio::test]
async fn connection_refused_reports_address() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let err = login(addr, PASSWORD).await.unwrap_err();
    assert!(matches!(err, TransportError::Connect { .. }));
    assert!(err.to_string().contains(&addr.port().to_string()));
}

#[tokio::test]
async fn hang_up_mid_request_ends_the_shell() {
    let (addr, _received) = spawn_gateway(&["blog"], Mode::HangUp).await;
    let transport = login(addr, PASSWORD).await.expect("login");
    let mut shell = shell(transport);
    let mut input = ScriptedInput::new(["cd blog", "pwd"]);

    let err = shell.run(&mut input).await.unwrap_err();

    assert!(err.to_string().contains("lost"));
    let out = String::from_utf8(shell.output().clone()).expect("utf8");
    assert_eq!(out, "Connection lost while waiting for 'cd'\n");
    assert_eq!(shell.session().current_node(), None);
    // `pwd` never ran.
    assert_eq!(input.prompts().len(), 1);
}
