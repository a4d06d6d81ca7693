//! Phase 2: Registry tests. Keyed stores, concurrent registration, prompt
//! rendering, prompt sources.

mod common;

use std::sync::Arc;

use serde_json::{json, Map, Value};
use tokio::sync::Barrier;

use nexus_mcp::prompts::{render, PromptSource};
use nexus_mcp::registry::Registries;
use nexus_mcp::types::{McpError, Prompt, Resource, Tool};
use nexus_mcp::HostSession;

use common::fixtures::{echo_tool, greet_prompt, notes_resource};

fn vars(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
}

#[tokio::test]
async fn test_duplicate_registration_rejected() {
    let registries = Registries::new();
    registries.add(echo_tool()).await.unwrap();

    let mut other = echo_tool();
    other.description = "impostor".into();
    let err = registries.add(other).await.unwrap_err();
    assert_eq!(err.to_string(), "tool echo already registered");

    let kept: Tool = registries.require("echo").await.unwrap();
    assert_eq!(kept.description, "Echo the text argument");
    assert_eq!(registries.len::<Tool>().await, 1);
}

#[tokio::test]
async fn test_same_key_in_different_registries() {
    let registries = Registries::new();
    registries
        .add(Tool::new("greet", "", json!({})))
        .await
        .unwrap();
    registries.add(greet_prompt()).await.unwrap();

    assert!(registries.get::<Tool>("greet").await.is_some());
    assert!(registries.get::<Prompt>("greet").await.is_some());
}

#[tokio::test]
async fn test_concurrent_registration_of_one_key() {
    let registries = Arc::new(Registries::new());
    let barrier = Arc::new(Barrier::new(16));

    let mut handles = Vec::new();
    for i in 0..16 {
        let registries = registries.clone();
        let barrier = barrier.clone();
        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            registries
                .add(Tool::new("shared", format!("writer {i}"), json!({})))
                .await
        }));
    }

    let mut accepted = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(()) => accepted += 1,
            Err(McpError::DuplicateKey { .. }) => {}
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    assert_eq!(accepted, 1);
    assert_eq!(registries.len::<Tool>().await, 1);
}

#[tokio::test]
async fn test_resource_metadata_write() {
    let registries = Registries::new();
    registries.add(notes_resource()).await.unwrap();

    registries
        .write_resource_metadata("file:///notes.md", json!({"tags": ["draft"]}))
        .await
        .unwrap();
    let resource: Resource = registries.require("file:///notes.md").await.unwrap();
    assert_eq!(resource.metadata, Some(json!({"tags": ["draft"]})));
    assert_eq!(resource.name, "notes");

    let err = registries
        .write_resource_metadata("file:///missing", json!({}))
        .await
        .unwrap_err();
    assert!(matches!(err, McpError::NotFound { .. }));
    assert_eq!(registries.len::<Resource>().await, 1);
}

#[tokio::test]
async fn test_remove_entries() {
    let host = HostSession::default();
    host.register_tool(echo_tool()).await.unwrap();
    host.bind_tool_handler("echo", Arc::new(common::fixtures::Echo))
        .await
        .unwrap();

    let removed = host.remove_tool("echo").await.unwrap();
    assert_eq!(removed.name, "echo");
    assert!(!host.handler().tools().is_bound("echo").await);
    assert!(matches!(
        host.remove_tool("echo").await,
        Err(McpError::NotFound { .. })
    ));
    assert!(matches!(
        host.remove_prompt("greet").await,
        Err(McpError::NotFound { .. })
    ));
}

#[test]
fn test_render_substitutes_every_occurrence() {
    let out = render(
        "{{name}} meets {{other}}; bye {{name}}",
        &vars(json!({"name": "Ada", "other": "Alan"})),
    );
    assert_eq!(out, "Ada meets Alan; bye Ada");
}

#[tokio::test]
async fn test_load_prompts_from_source() {
    struct Fixed;
    impl PromptSource for Fixed {
        fn load_prompts(&self) -> nexus_mcp::types::McpResult<Vec<Prompt>> {
            Ok(vec![
                Prompt::new("a", "", "A"),
                Prompt::new("b", "", "B {{x}}"),
            ])
        }
    }

    let host = HostSession::default();
    assert_eq!(host.load_prompts(&Fixed).await.unwrap(), 2);
    assert_eq!(host.registries().len::<Prompt>().await, 2);

    let err = host.load_prompts(&Fixed).await.unwrap_err();
    assert!(matches!(err, McpError::DuplicateKey { .. }));
}
