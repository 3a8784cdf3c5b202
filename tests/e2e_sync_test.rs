//! End-to-end: a real server on a loopback port driven through [`HttpPostApi`].

mod common;

use std::sync::Arc;

use vignette::api::BookmarkState;
use vignette::client::{HttpPostApi, Notice, PostApi, PostStore, SyncError, Synchronizer};
use vignette::routes;

use common::test_state;

async fn spawn_server() -> (tempfile::TempDir, String) {
    let (dir, state) = test_state();
    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (dir, format!("http://{}", addr))
}

async fn signed_in(base: &str, username: &str) -> Synchronizer<HttpPostApi> {
    let api = HttpPostApi::new(base).unwrap();
    api.register(username, "hunter22").await.unwrap();
    let me = api.login(username, "hunter22").await.unwrap();
    assert_eq!(me.message, format!("Welcome back {}", username));
    let (sync, _notices) = Synchronizer::new(api, Arc::new(PostStore::new()), me.data);
    sync
}

#[tokio::test]
async fn full_session_round_trip() {
    let (_dir, base) = spawn_server().await;
    let sync = signed_in(&base, "ana").await;
    let me = sync.caller().id.clone();

    let post = sync
        .create_post("first light", "https://img.example/1.jpg")
        .await
        .unwrap();
    assert_eq!(sync.store().len(), 1);

    assert!(sync.toggle_like(&post.id).await.unwrap());
    assert!(sync.store().get(&post.id).unwrap().is_liked_by(&me));

    let comment = sync.add_comment(&post.id, "  lovely  ").await.unwrap();
    assert_eq!(comment.text, "lovely");
    let server_id = comment.server_id().unwrap().to_string();

    assert_eq!(sync.bookmark(&post.id).await.unwrap(), BookmarkState::Saved);

    // A fresh load agrees with what the optimistic path left behind.
    sync.refresh().await.unwrap();
    let reloaded = sync.store().get(&post.id).unwrap();
    assert_eq!(reloaded.likes, vec![me.clone()]);
    assert_eq!(reloaded.comments.len(), 1);
    assert_eq!(reloaded.comments[0].server_id(), Some(server_id.as_str()));
    assert!(reloaded.bookmarked);

    assert!(!sync.toggle_like(&post.id).await.unwrap());
    sync.delete_post(&post.id).await.unwrap();
    assert!(sync.store().is_empty());

    sync.refresh().await.unwrap();
    assert!(sync.store().is_empty());
}

#[tokio::test]
async fn anonymous_client_is_turned_away() {
    let (_dir, base) = spawn_server().await;
    let api = HttpPostApi::new(&base).unwrap();

    let err = api.fetch_feed().await.unwrap_err();

    assert!(err.is_unauthenticated());
    assert_eq!(err.user_message(), "User not authenticated");
}

#[tokio::test]
async fn like_on_a_post_deleted_elsewhere_is_reverted() {
    let (_dir, base) = spawn_server().await;
    let ana = signed_in(&base, "ana").await;
    let post = ana
        .create_post("", "https://img.example/2.jpg")
        .await
        .unwrap();

    let api = HttpPostApi::new(&base).unwrap();
    api.register("bo", "hunter22").await.unwrap();
    let bo_user = api.login("bo", "hunter22").await.unwrap().data;
    let (bo, mut notices) = Synchronizer::new(api, Arc::new(PostStore::new()), bo_user);
    bo.refresh().await.unwrap();
    assert!(bo.store().get(&post.id).is_some());

    ana.delete_post(&post.id).await.unwrap();

    let err = bo.toggle_like(&post.id).await.unwrap_err();
    assert!(matches!(err, SyncError::Rejected { status: 404, .. }));
    assert!(bo.store().get(&post.id).unwrap().likes.is_empty());
    assert_eq!(notices.recv().await, Some(Notice::Error("Post not found".into())));
}

#[tokio::test]
async fn logout_ends_the_session() {
    let (_dir, base) = spawn_server().await;
    let sync = signed_in(&base, "ana").await;
    sync.refresh().await.unwrap();

    sync.api().logout().await.unwrap();

    let err = sync.refresh().await.unwrap_err();
    assert!(err.is_unauthenticated());
}
