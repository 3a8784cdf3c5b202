use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;

use crate::api::{
    AuthorView, BookmarkData, BookmarkState, CommentData, CommentView, Credentials, Envelope,
    FeedData, NewComment, NewPost, NoData, PostData, PostView, UserData,
};
use crate::client::api::{Ack, PostApi};
use crate::client::error::SyncError;

const UNEXPECTED_RESPONSE: &str = "Unexpected response from server";

/// [`PostApi`] over HTTP. The cookie store attaches the credential set by
/// [`login`](HttpPostApi::login) to every later request.
pub struct HttpPostApi {
    client: Client,
    base_url: String,
}

impl HttpPostApi {
    pub fn new(base_url: impl Into<String>) -> Result<Self, SyncError> {
        let client = Client::builder().cookie_store(true).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.base_url, path)
    }

    pub async fn register(&self, username: &str, password: &str) -> Result<Ack<AuthorView>, SyncError> {
        let resp = self
            .client
            .post(self.url("/user/register"))
            .json(&Credentials {
                username: username.to_string(),
                password: password.to_string(),
            })
            .send()
            .await?;
        let ack: Ack<UserData> = decode(resp).await?;
        Ok(Ack {
            message: ack.message,
            data: ack.data.user,
        })
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<Ack<AuthorView>, SyncError> {
        let resp = self
            .client
            .post(self.url("/user/login"))
            .json(&Credentials {
                username: username.to_string(),
                password: password.to_string(),
            })
            .send()
            .await?;
        let ack: Ack<UserData> = decode(resp).await?;
        Ok(Ack {
            message: ack.message,
            data: ack.data.user,
        })
    }

    pub async fn logout(&self) -> Result<Ack, SyncError> {
        let resp = self.client.get(self.url("/user/logout")).send().await?;
        decode::<NoData>(resp).await.map(unit)
    }
}

#[async_trait]
impl PostApi for HttpPostApi {
    async fn fetch_feed(&self) -> Result<Ack<Vec<PostView>>, SyncError> {
        let resp = self.client.get(self.url("/post/all")).send().await?;
        let ack: Ack<FeedData> = decode(resp).await?;
        Ok(Ack {
            message: ack.message,
            data: ack.data.posts,
        })
    }

    async fn create_post(&self, caption: &str, image: &str) -> Result<Ack<PostView>, SyncError> {
        let resp = self
            .client
            .post(self.url("/post/addpost"))
            .json(&NewPost {
                caption: caption.to_string(),
                image: image.to_string(),
            })
            .send()
            .await?;
        let ack: Ack<PostData> = decode(resp).await?;
        Ok(Ack {
            message: ack.message,
            data: ack.data.post,
        })
    }

    async fn like(&self, post_id: &str) -> Result<Ack, SyncError> {
        let resp = self
            .client
            .get(self.url(&format!("/post/{}/like", post_id)))
            .send()
            .await?;
        decode::<NoData>(resp).await.map(unit)
    }

    async fn dislike(&self, post_id: &str) -> Result<Ack, SyncError> {
        let resp = self
            .client
            .get(self.url(&format!("/post/{}/dislike", post_id)))
            .send()
            .await?;
        decode::<NoData>(resp).await.map(unit)
    }

    async fn add_comment(&self, post_id: &str, text: &str) -> Result<Ack<CommentView>, SyncError> {
        let resp = self
            .client
            .post(self.url(&format!("/post/{}/comment", post_id)))
            .json(&NewComment {
                text: text.to_string(),
            })
            .send()
            .await?;
        let ack: Ack<CommentData> = decode(resp).await?;
        Ok(Ack {
            message: ack.message,
            data: ack.data.comment,
        })
    }

    async fn delete_post(&self, post_id: &str) -> Result<Ack, SyncError> {
        let resp = self
            .client
            .delete(self.url(&format!("/post/delete/{}", post_id)))
            .send()
            .await?;
        decode::<NoData>(resp).await.map(unit)
    }

    async fn bookmark(&self, post_id: &str) -> Result<Ack<BookmarkState>, SyncError> {
        let resp = self
            .client
            .get(self.url(&format!("/post/{}/bookmark", post_id)))
            .send()
            .await?;
        let ack: Ack<BookmarkData> = decode(resp).await?;
        Ok(Ack {
            message: ack.message,
            data: ack.data.state,
        })
    }
}

fn unit(ack: Ack<NoData>) -> Ack {
    Ack {
        message: ack.message,
        data: (),
    }
}

/// Decode a response into its typed envelope.
async fn decode<T: DeserializeOwned>(resp: Response) -> Result<Ack<T>, SyncError> {
    let status = resp.status().as_u16();
    let body = resp.bytes().await?;
    interpret(status, &body)
}

/// Map status + body to an [`Ack`] or a [`SyncError::Rejected`].
///
/// A body that does not match the envelope never escapes as a parse error:
/// it becomes a rejection with a fixed message.
pub(crate) fn interpret<T: DeserializeOwned>(status: u16, body: &[u8]) -> Result<Ack<T>, SyncError> {
    let is_success = (200..300).contains(&status);

    if is_success {
        return match serde_json::from_slice::<Envelope<T>>(body) {
            Ok(envelope) if envelope.success => Ok(Ack {
                message: envelope.message,
                data: envelope.data,
            }),
            Ok(envelope) => Err(SyncError::Rejected {
                status,
                message: envelope.message,
            }),
            Err(e) => {
                tracing::warn!("Malformed success response ({}): {}", status, e);
                Err(SyncError::Rejected {
                    status,
                    message: UNEXPECTED_RESPONSE.to_string(),
                })
            }
        };
    }

    let message = serde_json::from_slice::<Envelope<NoData>>(body)
        .ok()
        .map(|e| e.message)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| UNEXPECTED_RESPONSE.to_string());

    Err(SyncError::Rejected { status, message })
}
