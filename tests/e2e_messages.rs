//! E2E tests for direct messages

mod common;

use common::TestServer;
use serde_json::Value;

#[tokio::test]
async fn test_conversation_round_trip() {
    let server = TestServer::new().await;
    let alice = server.login("alice").await;
    let bob = server.login("bob").await;

    let (status, created) = server
        .post_form(&alice, "/messages", &[("username", "bob")])
        .await;
    assert_eq!(status, 200);
    let conversation_id = created["conversation_id"].as_i64().unwrap();

    // Bob starting a conversation with alice lands in the same one
    let (_, reused) = server
        .post_form(&bob, "/messages", &[("username", "alice")])
        .await;
    assert_eq!(reused["conversation_id"], conversation_id);

    let path = format!("/messages/{conversation_id}");
    let (status, sent) = server
        .post_form(&alice, &path, &[("message", "hi bob")])
        .await;
    assert_eq!(status, 200);
    assert!(sent["message_id"].as_i64().is_some());
    server.post_form(&bob, &path, &[("message", "hi alice")]).await;

    let (status, conversation) = server.get_json(&bob, &path).await;
    assert_eq!(status, 200);
    let texts: Vec<&str> = conversation["messages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["text"].as_str().unwrap())
        .collect();
    assert_eq!(texts, vec!["hi bob", "hi alice"]);

    let (status, listed) = server.get_json(&alice, "/messages").await;
    assert_eq!(status, 200);
    assert_eq!(listed[0]["id"], conversation_id);
    assert_eq!(listed[0]["other_username"], "bob");
    assert_eq!(listed[0]["last_message_text"], "hi alice");
}

#[tokio::test]
async fn test_outsider_cannot_post_or_read() {
    let server = TestServer::new().await;
    let alice = server.login("alice").await;
    server.login("bob").await;
    let mallory = server.login("mallory").await;

    let (_, created) = server
        .post_form(&alice, "/messages", &[("username", "bob")])
        .await;
    let path = format!("/messages/{}", created["conversation_id"]);

    let (status, sent) = server
        .post_form(&mallory, &path, &[("message", "let me in")])
        .await;
    assert_eq!(status, 200);
    assert_eq!(sent["message_id"], Value::Null);

    let (status, _) = server.get_json(&mallory, &path).await;
    assert_eq!(status, 403);

    let (_, conversation) = server.get_json(&alice, &path).await;
    assert_eq!(conversation["messages"], Value::Array(vec![]));
}

#[tokio::test]
async fn test_new_conversation_is_listed_empty() {
    let server = TestServer::new().await;
    let alice = server.login("alice").await;
    server.login("bob").await;

    server
        .post_form(&alice, "/messages", &[("username", "bob")])
        .await;

    let (_, listed) = server.get_json(&alice, "/messages").await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["last_message_text"], "");
    assert_eq!(listed[0]["other_username"], "bob");
}

#[tokio::test]
async fn test_messaging_yourself_or_strangers_fails() {
    let server = TestServer::new().await;
    let alice = server.login("alice").await;

    let (status, _) = server
        .post_form(&alice, "/messages", &[("username", "alice")])
        .await;
    assert_eq!(status, 400);

    let (status, _) = server
        .post_form(&alice, "/messages", &[("username", "nobody")])
        .await;
    assert_eq!(status, 404);
}
