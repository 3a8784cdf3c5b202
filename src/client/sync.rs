use std::sync::Arc;

use tokio::sync::mpsc;

use crate::api::{AuthorView, BookmarkState};
use crate::client::api::PostApi;
use crate::client::error::SyncError;
use crate::client::model::{Comment, Post};
use crate::client::store::PostStore;

/// User-facing outcome of a mutation, the equivalent of a toast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Success(String),
    Error(String),
}

/// Applies user actions to the shared [`PostStore`] and reconciles them with
/// the server.
///
/// Likes and comments are optimistic and are reverted if the request fails.
/// Deletes, bookmarks and new posts only touch the store once the server has
/// said yes. Every settled request emits one [`Notice`].
pub struct Synchronizer<A> {
    api: A,
    store: Arc<PostStore>,
    caller: AuthorView,
    notices: mpsc::UnboundedSender<Notice>,
}

impl<A: PostApi> Synchronizer<A> {
    pub fn new(
        api: A,
        store: Arc<PostStore>,
        caller: AuthorView,
    ) -> (Self, mpsc::UnboundedReceiver<Notice>) {
        let (notices, rx) = mpsc::unbounded_channel();
        (
            Self {
                api,
                store,
                caller,
                notices,
            },
            rx,
        )
    }

    pub fn store(&self) -> &Arc<PostStore> {
        &self.store
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn caller(&self) -> &AuthorView {
        &self.caller
    }

    fn succeed(&self, message: String) {
        if !message.is_empty() {
            let _ = self.notices.send(Notice::Success(message));
        }
    }

    fn fail(&self, action: &str, err: &SyncError) {
        tracing::warn!("{} failed: {}", action, err);
        let _ = self.notices.send(Notice::Error(err.user_message()));
    }

    /// Load the feed from the server, replacing the cached posts.
    pub async fn refresh(&self) -> Result<usize, SyncError> {
        match self.api.fetch_feed().await {
            Ok(ack) => {
                let count = ack.data.len();
                self.store
                    .replace_all(ack.data.into_iter().map(Post::from).collect());
                Ok(count)
            }
            Err(e) => {
                self.fail("refresh", &e);
                Err(e)
            }
        }
    }

    pub async fn create_post(&self, caption: &str, image: &str) -> Result<Arc<Post>, SyncError> {
        match self.api.create_post(caption, image).await {
            Ok(ack) => {
                let post = Post::from(ack.data);
                let id = post.id.clone();
                self.store.prepend(post);
                self.succeed(ack.message);
                self.store
                    .get(&id)
                    .ok_or(SyncError::UnknownPost(id))
            }
            Err(e) => {
                self.fail("create post", &e);
                Err(e)
            }
        }
    }

    /// Like or unlike, whichever flips the caller's current state.
    /// Returns the state that was requested.
    pub async fn toggle_like(&self, post_id: &str) -> Result<bool, SyncError> {
        let caller_id = self.caller.id.as_str();
        let pending = self
            .store
            .begin_like(post_id, caller_id)
            .ok_or_else(|| SyncError::UnknownPost(post_id.to_string()))?;

        tracing::debug!("Post {} liked={} (seq {})", post_id, pending.liked, pending.seq);
        let result = if pending.liked {
            self.api.like(post_id).await
        } else {
            self.api.dislike(post_id).await
        };

        match result {
            Ok(ack) => {
                self.store.settle_like(post_id, caller_id, pending, true);
                self.succeed(ack.message);
                Ok(pending.liked)
            }
            Err(e) => {
                self.store.settle_like(post_id, caller_id, pending, false);
                self.fail("like", &e);
                Err(e)
            }
        }
    }

    /// Post a comment. Blank text is rejected before anything happens.
    pub async fn add_comment(&self, post_id: &str, text: &str) -> Result<Comment, SyncError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SyncError::EmptyComment);
        }

        let placeholder = self
            .store
            .push_pending_comment(post_id, self.caller.clone(), text.to_string())
            .ok_or_else(|| SyncError::UnknownPost(post_id.to_string()))?;

        match self.api.add_comment(post_id, text).await {
            Ok(ack) => {
                let comment = Comment::from(ack.data);
                self.store
                    .confirm_comment(post_id, &placeholder, comment.clone());
                self.succeed(ack.message);
                Ok(comment)
            }
            Err(e) => {
                self.store.discard_pending_comment(post_id, &placeholder);
                self.fail("comment", &e);
                Err(e)
            }
        }
    }

    /// Delete a post. It stays in the cache until the server confirms.
    pub async fn delete_post(&self, post_id: &str) -> Result<(), SyncError> {
        if self.store.get(post_id).is_none() {
            return Err(SyncError::UnknownPost(post_id.to_string()));
        }

        match self.api.delete_post(post_id).await {
            Ok(ack) => {
                self.store.remove_post(post_id);
                self.succeed(ack.message);
                Ok(())
            }
            Err(e) => {
                self.fail("delete", &e);
                Err(e)
            }
        }
    }

    /// Toggle the caller's bookmark. The store follows the server's answer.
    pub async fn bookmark(&self, post_id: &str) -> Result<BookmarkState, SyncError> {
        if self.store.get(post_id).is_none() {
            return Err(SyncError::UnknownPost(post_id.to_string()));
        }

        match self.api.bookmark(post_id).await {
            Ok(ack) => {
                self.store
                    .set_bookmarked(post_id, ack.data == BookmarkState::Saved);
                self.succeed(ack.message);
                Ok(ack.data)
            }
            Err(e) => {
                self.fail("bookmark", &e);
                Err(e)
            }
        }
    }
}
