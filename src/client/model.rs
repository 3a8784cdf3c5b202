use chrono::{DateTime, Utc};

use crate::api::{AuthorView, CommentView, PostView};

/// Comment identity in the cache. Pending comments exist only while their
/// request is in flight; they are replaced or dropped when it settles.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CommentId {
    Pending(u64),
    Confirmed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub id: CommentId,
    pub author: AuthorView,
    pub text: String,
    pub created_at: Option<DateTime<Utc>>,
}

impl Comment {
    pub fn is_pending(&self) -> bool {
        matches!(self.id, CommentId::Pending(_))
    }

    /// The server-assigned id, once confirmed.
    pub fn server_id(&self) -> Option<&str> {
        match &self.id {
            CommentId::Confirmed(id) => Some(id),
            CommentId::Pending(_) => None,
        }
    }
}

impl From<CommentView> for Comment {
    fn from(view: CommentView) -> Self {
        Self {
            id: CommentId::Confirmed(view.id),
            author: view.author,
            text: view.text,
            created_at: Some(view.created_at),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Post {
    pub id: String,
    pub author: AuthorView,
    pub caption: String,
    pub image: String,
    pub comments: Vec<Comment>,
    /// Ids of users who like the post; each appears at most once.
    pub likes: Vec<String>,
    pub bookmarked: bool,
    pub created_at: DateTime<Utc>,
}

impl Post {
    pub fn like_count(&self) -> usize {
        self.likes.len()
    }

    pub fn is_liked_by(&self, user_id: &str) -> bool {
        self.likes.iter().any(|id| id == user_id)
    }

    /// Make `user_id`'s membership in the liker set match `liked`.
    /// Returns whether anything changed.
    pub(crate) fn set_liked(&mut self, user_id: &str, liked: bool) -> bool {
        match (liked, self.is_liked_by(user_id)) {
            (true, false) => {
                self.likes.push(user_id.to_string());
                true
            }
            (false, true) => {
                self.likes.retain(|id| id != user_id);
                true
            }
            _ => false,
        }
    }
}

impl From<PostView> for Post {
    fn from(view: PostView) -> Self {
        let mut likes: Vec<String> = Vec::with_capacity(view.likes.len());
        for id in view.likes {
            if !likes.contains(&id) {
                likes.push(id);
            }
        }

        Self {
            id: view.id,
            author: view.author,
            caption: view.caption,
            image: view.image,
            comments: view.comments.into_iter().map(Comment::from).collect(),
            likes,
            bookmarked: view.bookmarked,
            created_at: view.created_at,
        }
    }
}
