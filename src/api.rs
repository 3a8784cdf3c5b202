//! Wire types shared by the server routes and the sync client.
//!
//! Every response body is an [`Envelope`]: `{ "success": bool, "message": string, ...data }`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(flatten)]
    pub data: T,
}

/// Payload for envelopes that carry nothing besides `success` and `message`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoData {}

impl<T> Envelope<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
        }
    }
}

impl Envelope<NoData> {
    pub fn done(message: impl Into<String>) -> Self {
        Self::ok(message, NoData {})
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: NoData {},
        }
    }
}

// --- Views ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorView {
    pub id: String,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    pub id: String,
    pub text: String,
    pub author: AuthorView,
    pub post_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
    pub id: String,
    pub author: AuthorView,
    pub caption: String,
    pub image: String,
    pub comments: Vec<CommentView>,
    pub likes: Vec<String>,
    #[serde(default)]
    pub bookmarked: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookmarkState {
    Saved,
    Unsaved,
}

// --- Request bodies ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPost {
    pub caption: String,
    pub image: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewComment {
    pub text: String,
}

// --- Response payloads ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserData {
    pub user: AuthorView,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedData {
    pub posts: Vec<PostView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostData {
    pub post: PostView,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentData {
    pub comment: CommentView,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentsData {
    pub comments: Vec<CommentView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookmarkData {
    #[serde(rename = "type")]
    pub state: BookmarkState,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn failure_envelope_has_only_success_and_message() {
        let value = serde_json::to_value(Envelope::failure("nope")).unwrap();
        assert_eq!(value, json!({ "success": false, "message": "nope" }));
    }

    #[test]
    fn data_fields_are_flattened_next_to_message() {
        let envelope = Envelope::ok(
            "Post bookmarked",
            BookmarkData {
                state: BookmarkState::Saved,
            },
        );
        let value = serde_json::to_value(envelope).unwrap();
        assert_eq!(
            value,
            json!({ "success": true, "message": "Post bookmarked", "type": "saved" })
        );
    }

    #[test]
    fn missing_message_defaults_to_empty() {
        let envelope: Envelope<NoData> = serde_json::from_str(r#"{"success":true}"#).unwrap();
        assert!(envelope.success);
        assert_eq!(envelope.message, "");
    }

    #[test]
    fn comment_view_uses_camel_case() {
        let comment = CommentView {
            id: "c1".into(),
            text: "hi".into(),
            author: AuthorView {
                id: "u1".into(),
                username: "ana".into(),
            },
            post_id: "p1".into(),
            created_at: Utc::now(),
        };
        let value = serde_json::to_value(&comment).unwrap();
        assert_eq!(value["postId"], "p1");
        assert!(value.get("createdAt").is_some());
    }
}
