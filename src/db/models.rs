use chrono::{DateTime, Utc};
use rusqlite::Row;

use crate::api::{AuthorView, CommentView};

#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub username: String,
    pub password_hash: String,
}

impl User {
    pub fn author(&self) -> AuthorView {
        AuthorView {
            id: self.id.clone(),
            username: self.username.clone(),
        }
    }
}

/// A post row joined with its author's username.
#[derive(Debug, Clone)]
pub struct Post {
    pub id: String,
    pub author_id: String,
    pub author_username: String,
    pub caption: String,
    pub image: String,
    pub created_at: DateTime<Utc>,
}

impl Post {
    /// Expects columns `id, author_id, username, caption, image, created_at`.
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            author_id: row.get(1)?,
            author_username: row.get(2)?,
            caption: row.get(3)?,
            image: row.get(4)?,
            created_at: row.get(5)?,
        })
    }
}

/// A comment row joined with its author's username.
#[derive(Debug, Clone)]
pub struct Comment {
    pub id: String,
    pub post_id: String,
    pub author_id: String,
    pub author_username: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl Comment {
    /// Expects columns `id, post_id, author_id, username, text, created_at`.
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            post_id: row.get(1)?,
            author_id: row.get(2)?,
            author_username: row.get(3)?,
            text: row.get(4)?,
            created_at: row.get(5)?,
        })
    }
}

impl From<Comment> for CommentView {
    fn from(c: Comment) -> Self {
        CommentView {
            id: c.id,
            text: c.text,
            author: AuthorView {
                id: c.author_id,
                username: c.author_username,
            },
            post_id: c.post_id,
            created_at: c.created_at,
        }
    }
}
