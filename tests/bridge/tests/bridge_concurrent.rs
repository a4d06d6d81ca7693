//! Concurrent access: many peers and many in-flight requests over TCP.
//!
//! Tests verify that every caller receives exactly its own response, no
//! matter how requests from different peers and tasks interleave.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::Barrier;

use nexus_mcp::types::{ClientCapabilities, McpResult, Tool};
use nexus_mcp::{HostSession, PeerSession, RequestContext, ToolHandler};

// ─── Helpers ───────────────────────────────────────────────────────────────

/// Echoes its `tag` after an argument-controlled delay. One connection is
/// served in order, so the delay only interleaves responses across
/// connections.
struct DelayedEcho;

#[async_trait]
impl ToolHandler for DelayedEcho {
    async fn call(&self, ctx: RequestContext, arguments: Value) -> McpResult<Value> {
        let delay = arguments["delay_ms"].as_u64().unwrap_or(0);
        tokio::time::sleep(Duration::from_millis(delay)).await;
        Ok(json!({"tag": arguments["tag"], "root": ctx.root_uri}))
    }
}

async fn start_host() -> (HostSession, SocketAddr) {
    let host = HostSession::default();
    host.register_tool(Tool::new(
        "delayed_echo",
        "Echo a tag after a delay",
        json!({
            "type": "object",
            "properties": {"tag": {"type": "string"}, "delay_ms": {"type": "integer"}},
            "required": ["tag"]
        }),
    ))
    .await
    .unwrap();
    host.bind_tool_handler("delayed_echo", Arc::new(DelayedEcho))
        .await
        .unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let serving = host.clone();
    tokio::spawn(async move { serving.serve(listener).await });
    (host, addr)
}

async fn connect(addr: SocketAddr, root: &str) -> PeerSession {
    let peer = PeerSession::connect(&addr.to_string(), ClientCapabilities::all())
        .await
        .expect("connect failed");
    peer.initialize(root).await.expect("handshake failed");
    peer
}

// ─── Tests ─────────────────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_one_peer_many_inflight_requests() {
    let (host, addr) = start_host().await;
    let peer = Arc::new(connect(addr, "file:///solo").await);

    const N: usize = 100;
    let barrier = Arc::new(Barrier::new(N));
    let mut handles = Vec::with_capacity(N);
    for i in 0..N {
        let peer = peer.clone();
        let barrier = barrier.clone();
        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            let tag = format!("req-{i}");
            let result = peer
                .call_tool("delayed_echo", json!({"tag": tag.clone()}))
                .await
                .expect("call failed");
            (tag, result)
        }));
    }

    for handle in handles {
        let (tag, result) = handle.await.unwrap();
        assert_eq!(result["tag"], tag.as_str());
        assert_eq!(result["root"], "file:///solo");
    }
    host.shutdown();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_many_peers_in_parallel() {
    let (host, addr) = start_host().await;

    const PEERS: usize = 8;
    const CALLS: usize = 10;
    let barrier = Arc::new(Barrier::new(PEERS));
    let mut handles = Vec::new();

    for p in 0..PEERS {
        let barrier = barrier.clone();
        handles.push(tokio::spawn(async move {
            let root = format!("file:///peer-{p}");
            let peer = connect(addr, &root).await;
            barrier.wait().await;

            for c in 0..CALLS {
                let tag = format!("{p}-{c}");
                // Later peers answer faster, interleaving responses across
                // connections.
                let delay = ((PEERS - p) * 2) as u64;
                let result = peer
                    .call_tool("delayed_echo", json!({"tag": tag.clone(), "delay_ms": delay}))
                    .await
                    .unwrap();
                assert_eq!(result["tag"], tag.as_str());
                assert_eq!(result["root"], root.as_str());
            }
            peer.close().await;
        }));
    }

    for handle in handles {
        handle.await.unwrap();
    }
    host.shutdown();
}

#[tokio::test]
async fn test_slow_connection_does_not_block_others() {
    let (host, addr) = start_host().await;
    let slow = Arc::new(connect(addr, "slow").await);
    let fast = connect(addr, "fast").await;

    let caller = slow.clone();
    let slow_call = tokio::spawn(async move {
        caller
            .call_tool("delayed_echo", json!({"tag": "slow", "delay_ms": 500}))
            .await
    });
    tokio::time::sleep(Duration::from_millis(20)).await;

    let started = tokio::time::Instant::now();
    let result = fast
        .call_tool("delayed_echo", json!({"tag": "fast"}))
        .await
        .unwrap();
    assert_eq!(result["tag"], "fast");
    assert!(started.elapsed() < Duration::from_millis(400));

    assert_eq!(slow_call.await.unwrap().unwrap()["tag"], "slow");
    host.shutdown();
}
