use async_trait::async_trait;

use crate::api::{BookmarkState, CommentView, PostView};
use crate::client::error::SyncError;

/// A successful server answer: its message plus any confirmed data.
#[derive(Debug, Clone, PartialEq)]
pub struct Ack<T = ()> {
    pub message: String,
    pub data: T,
}

/// The remote operations the synchronizer depends on.
///
/// Credentials are attached by the implementation; callers never pass them.
#[async_trait]
pub trait PostApi: Send + Sync {
    async fn fetch_feed(&self) -> Result<Ack<Vec<PostView>>, SyncError>;

    async fn create_post(&self, caption: &str, image: &str) -> Result<Ack<PostView>, SyncError>;

    async fn like(&self, post_id: &str) -> Result<Ack, SyncError>;

    async fn dislike(&self, post_id: &str) -> Result<Ack, SyncError>;

    async fn add_comment(&self, post_id: &str, text: &str) -> Result<Ack<CommentView>, SyncError>;

    async fn delete_post(&self, post_id: &str) -> Result<Ack, SyncError>;

    async fn bookmark(&self, post_id: &str) -> Result<Ack<BookmarkState>, SyncError>;
}
