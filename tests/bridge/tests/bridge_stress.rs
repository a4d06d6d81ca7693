//! Lifecycle stress: connection churn, abrupt disconnects, and handshake
//! over real sockets.

use std::net::SocketAddr;
use std::time::Duration;

use serde_json::json;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};

use nexus_mcp::config::ServerConfig;
use nexus_mcp::types::{ClientCapabilities, McpError, NotificationParams, Prompt, Resource, Tool};
use nexus_mcp::{HostSession, PeerSession};

// ─── Helpers ───────────────────────────────────────────────────────────────

async fn start_host() -> (HostSession, SocketAddr) {
    let config = ServerConfig {
        tools: vec![Tool::new("noop", "Acknowledges", json!({}))],
        resources: vec![Resource::new("memory://scratch", "memory", "scratch", "")],
        prompts: vec![Prompt::new("greet", "", "Hello {{name}}")],
        ..ServerConfig::default()
    };
    let host = HostSession::from_config(&config).await.unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let serving = host.clone();
    tokio::spawn(async move { serving.serve(listener).await });
    (host, addr)
}

async fn settle(host: &HostSession, count: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while host.connections().await.len() != count {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("connection table never settled");
}

// ─── Tests ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_handshake_over_tcp() {
    let (host, addr) = start_host().await;
    let peer = PeerSession::connect(&addr.to_string(), ClientCapabilities::all())
        .await
        .unwrap();

    let caps = peer.initialize("file:///tcp").await.unwrap();
    assert!(caps.tools.supported);
    assert_eq!(caps.resources.types, vec!["file", "memory"]);
    assert_eq!(
        peer.call_tool("noop", json!({})).await.unwrap(),
        json!({"status": "success"})
    );

    peer.close().await;
    settle(&host, 0).await;
    host.shutdown();
}

#[tokio::test]
async fn test_connection_churn() {
    let (host, addr) = start_host().await;

    for round in 0..25 {
        let peer = PeerSession::connect(&addr.to_string(), ClientCapabilities::all())
            .await
            .unwrap();
        peer.initialize(format!("round-{round}")).await.unwrap();
        assert_eq!(peer.list_prompts().await.unwrap().len(), 1);
        peer.close().await;
    }

    settle(&host, 0).await;
    assert_eq!(host.registries().len::<Tool>().await, 1);
    host.shutdown();
}

#[tokio::test]
async fn test_abrupt_disconnect_is_isolated() {
    let (host, addr) = start_host().await;
    let survivor = PeerSession::connect(&addr.to_string(), ClientCapabilities::all())
        .await
        .unwrap();
    survivor.initialize("survivor").await.unwrap();

    // A raw socket that sends half a frame and vanishes.
    let mut rogue = TcpStream::connect(addr).await.unwrap();
    rogue.write_all(b"{\"jsonrpc\":\"2.0\",\"id\":1,\"meth").await.unwrap();
    settle(&host, 2).await;
    drop(rogue);
    settle(&host, 1).await;

    // A raw socket that sends garbage.
    let mut garbage = TcpStream::connect(addr).await.unwrap();
    garbage.write_all(b"\x00\x01 not json\n").await.unwrap();
    settle(&host, 1).await;

    let resource = survivor.read_resource("memory://scratch").await.unwrap();
    assert_eq!(resource.kind, "memory");
    host.shutdown();
}

#[tokio::test]
async fn test_host_shutdown_fails_outstanding_peer_requests() {
    let (host, addr) = start_host().await;
    let peer = PeerSession::connect(&addr.to_string(), ClientCapabilities::all())
        .await
        .unwrap();
    peer.initialize("").await.unwrap();

    host.shutdown();
    settle(&host, 0).await;

    let err = tokio::time::timeout(Duration::from_secs(2), peer.list_tools())
        .await
        .expect("request hung after host shutdown")
        .unwrap_err();
    assert!(matches!(
        err,
        McpError::ConnectionClosed | McpError::Transport(_)
    ));
}

#[tokio::test]
async fn test_broadcast_skips_departed_peers() {
    let (host, addr) = start_host().await;
    let staying = PeerSession::connect(&addr.to_string(), ClientCapabilities::all())
        .await
        .unwrap();
    staying.initialize("").await.unwrap();
    let leaving = PeerSession::connect(&addr.to_string(), ClientCapabilities::all())
        .await
        .unwrap();
    leaving.initialize("").await.unwrap();
    settle(&host, 2).await;

    leaving.close().await;
    settle(&host, 1).await;

    let delivered = host
        .broadcast(NotificationParams::new("info", "still here?"))
        .await
        .unwrap();
    assert_eq!(delivered, 1);
    host.shutdown();
}
