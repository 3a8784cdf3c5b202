//! The shared post cache.
//!
//! All mutation goes through [`PostStore`]'s update actions. A changed post is
//! always a new `Arc`, so observers can detect changes with `Arc::ptr_eq`.
//! Observers subscribe to a `watch` channel and are only woken when an action
//! actually changed something.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tokio::sync::watch;

use crate::api::AuthorView;
use crate::client::model::{Comment, CommentId, Post};

/// A like/unlike that has been applied locally but not yet settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingLike {
    pub seq: u64,
    /// The state this request asks the server for.
    pub liked: bool,
}

/// Tracks one user's like on one post while requests are in flight.
#[derive(Debug)]
struct LikeLedger {
    /// Last state the server acknowledged.
    confirmed: bool,
    /// In-flight targets by issue order.
    pending: BTreeMap<u64, bool>,
}

impl LikeLedger {
    /// Newest in-flight intent wins; with nothing in flight, the server's word.
    fn displayed(&self) -> bool {
        self.pending
            .values()
            .next_back()
            .copied()
            .unwrap_or(self.confirmed)
    }
}

#[derive(Debug, Default)]
pub struct FeedState {
    posts: Vec<Arc<Post>>,
    likes: HashMap<(String, String), LikeLedger>,
    next_seq: u64,
}

impl FeedState {
    pub fn posts(&self) -> &[Arc<Post>] {
        &self.posts
    }

    pub fn get(&self, post_id: &str) -> Option<&Arc<Post>> {
        self.posts.iter().find(|p| p.id == post_id)
    }

    pub fn has_pending_like(&self, post_id: &str, user_id: &str) -> bool {
        self.likes
            .contains_key(&(post_id.to_string(), user_id.to_string()))
    }

    fn next_seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    /// Copy-on-write update of one post. `f` reports whether it changed anything;
    /// the slot is only replaced when it did.
    fn update_post(&mut self, post_id: &str, f: impl FnOnce(&mut Post) -> bool) -> bool {
        let Some(slot) = self.posts.iter_mut().find(|p| p.id == post_id) else {
            return false;
        };
        let mut next = Post::clone(slot);
        if !f(&mut next) {
            return false;
        }
        *slot = Arc::new(next);
        true
    }
}

pub struct PostStore {
    state: watch::Sender<FeedState>,
}

impl Default for PostStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PostStore {
    pub fn new() -> Self {
        let (state, _) = watch::channel(FeedState::default());
        Self { state }
    }

    pub fn subscribe(&self) -> watch::Receiver<FeedState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> Vec<Arc<Post>> {
        self.state.borrow().posts.clone()
    }

    pub fn get(&self, post_id: &str) -> Option<Arc<Post>> {
        self.state.borrow().get(post_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.state.borrow().posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Replace the feed with server data.
    ///
    /// In-flight work survives: pending comment placeholders are carried over
    /// and pending likes are re-applied on top of the fresh liker sets.
    pub fn replace_all(&self, posts: Vec<Post>) {
        self.state.send_modify(|state| {
            let mut fresh = posts;

            for post in fresh.iter_mut() {
                if let Some(old) = state.posts.iter().find(|p| p.id == post.id) {
                    post.comments
                        .extend(old.comments.iter().filter(|c| c.is_pending()).cloned());
                }
            }

            state.likes.retain(|(post_id, user_id), ledger| {
                let Some(post) = fresh.iter_mut().find(|p| &p.id == post_id) else {
                    return false;
                };
                ledger.confirmed = post.is_liked_by(user_id);
                post.set_liked(user_id, ledger.displayed());
                true
            });

            state.posts = fresh.into_iter().map(Arc::new).collect();
        });
    }

    /// Put a newly created post at the top of the feed.
    pub fn prepend(&self, post: Post) -> bool {
        self.state.send_if_modified(|state| {
            if state.get(&post.id).is_some() {
                return false;
            }
            state.posts.insert(0, Arc::new(post));
            true
        })
    }

    pub fn remove_post(&self, post_id: &str) -> Option<Arc<Post>> {
        let mut removed = None;
        self.state.send_if_modified(|state| {
            let Some(index) = state.posts.iter().position(|p| p.id == post_id) else {
                return false;
            };
            removed = Some(state.posts.remove(index));
            state.likes.retain(|(pid, _), _| pid != post_id);
            true
        });
        removed
    }

    /// Flip `user_id`'s like locally and record the request about to be sent.
    /// `None` when the post is not cached.
    pub fn begin_like(&self, post_id: &str, user_id: &str) -> Option<PendingLike> {
        let mut issued = None;
        self.state.send_if_modified(|state| {
            let Some(currently) = state.get(post_id).map(|p| p.is_liked_by(user_id)) else {
                return false;
            };
            let seq = state.next_seq();
            let ledger = state
                .likes
                .entry((post_id.to_string(), user_id.to_string()))
                .or_insert_with(|| LikeLedger {
                    confirmed: currently,
                    pending: BTreeMap::new(),
                });
            let liked = !ledger.displayed();
            ledger.pending.insert(seq, liked);
            issued = Some(PendingLike { seq, liked });

            state.update_post(post_id, |p| p.set_liked(user_id, liked))
        });
        issued
    }

    /// Settle a like request. An acknowledgement becomes the confirmed state
    /// in arrival order, even when an older request is acknowledged after a
    /// newer one; a failure just withdraws the request, which reverts the
    /// display unless a newer request is still in flight.
    pub fn settle_like(&self, post_id: &str, user_id: &str, like: PendingLike, acknowledged: bool) {
        self.state.send_if_modified(|state| {
            let key = (post_id.to_string(), user_id.to_string());
            let Some(ledger) = state.likes.get_mut(&key) else {
                return false;
            };
            if ledger.pending.remove(&like.seq).is_none() {
                return false;
            }
            if acknowledged {
                ledger.confirmed = like.liked;
            }
            let shown = ledger.displayed();
            if ledger.pending.is_empty() {
                state.likes.remove(&key);
            }

            state.update_post(post_id, |p| p.set_liked(user_id, shown))
        });
    }

    /// Append a placeholder comment. `None` when the post is not cached.
    pub fn push_pending_comment(
        &self,
        post_id: &str,
        author: AuthorView,
        text: String,
    ) -> Option<CommentId> {
        let mut placeholder = None;
        self.state.send_if_modified(|state| {
            let id = CommentId::Pending(state.next_seq());
            let comment = Comment {
                id: id.clone(),
                author,
                text,
                created_at: None,
            };
            let changed = state.update_post(post_id, |p| {
                p.comments.push(comment);
                true
            });
            if changed {
                placeholder = Some(id);
            }
            changed
        });
        placeholder
    }

    /// Swap a placeholder for the server's comment. If the placeholder is gone
    /// (the feed was refreshed meanwhile) the comment is appended instead,
    /// unless a comment with the same server id is already present.
    pub fn confirm_comment(&self, post_id: &str, placeholder: &CommentId, comment: Comment) -> bool {
        self.state.send_if_modified(|state| {
            state.update_post(post_id, |p| {
                let duplicate = comment
                    .server_id()
                    .is_some_and(|sid| p.comments.iter().any(|c| c.server_id() == Some(sid)));
                let slot = p.comments.iter().position(|c| &c.id == placeholder);

                match (slot, duplicate) {
                    (Some(i), true) => {
                        p.comments.remove(i);
                    }
                    (Some(i), false) => p.comments[i] = comment,
                    (None, true) => return false,
                    (None, false) => p.comments.push(comment),
                }
                true
            })
        })
    }

    pub fn discard_pending_comment(&self, post_id: &str, placeholder: &CommentId) -> bool {
        self.state.send_if_modified(|state| {
            state.update_post(post_id, |p| {
                let before = p.comments.len();
                p.comments.retain(|c| &c.id != placeholder);
                p.comments.len() != before
            })
        })
    }

    pub fn set_bookmarked(&self, post_id: &str, bookmarked: bool) -> bool {
        self.state.send_if_modified(|state| {
            state.update_post(post_id, |p| {
                if p.bookmarked == bookmarked {
                    return false;
                }
                p.bookmarked = bookmarked;
                true
            })
        })
    }
}
