//! Client side of the feed: an observable post cache kept in sync with the
//! server through optimistic updates.

pub mod api;
pub mod error;
pub mod http;
pub mod model;
pub mod store;
pub mod sync;

pub use api::{Ack, PostApi};
pub use error::SyncError;
pub use http::HttpPostApi;
pub use model::{Comment, CommentId, Post};
pub use store::{FeedState, PostStore};
pub use sync::{Notice, Synchronizer};
