use axum::extract::{Path, State};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

use crate::api::{
    AuthorView, BookmarkData, BookmarkState, CommentData, CommentView, CommentsData, Envelope,
    FeedData, NewComment, NewPost, NoData, PostData, PostView,
};
use crate::db::models::{Comment, Post};
use crate::error::{AppError, AppResult};
use crate::extractors::{AppJson, CallerId};
use crate::state::AppState;

const MAX_CAPTION_LEN: usize = 2200;
const MAX_COMMENT_LEN: usize = 500;
const FEED_LIMIT: i64 = 50;

// --- Router ---

/// Post routes. Every one of them expects the auth gate in front.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/post/all", get(feed))
        .route("/api/v1/post/addpost", post(add_post))
        .route("/api/v1/post/{id}/like", get(like))
        .route("/api/v1/post/{id}/dislike", get(dislike))
        .route("/api/v1/post/{id}/comment", post(add_comment))
        .route("/api/v1/post/{id}/comment/all", get(list_comments))
        .route("/api/v1/post/delete/{id}", delete(delete_post))
        .route("/api/v1/post/{id}/bookmark", get(bookmark))
}

// --- Handlers ---

async fn feed(
    State(state): State<AppState>,
    caller: CallerId,
) -> AppResult<Json<Envelope<FeedData>>> {
    let conn = state.db.get()?;
    let posts = query_feed(&conn, caller.as_str())?;
    Ok(Json(Envelope::ok("", FeedData { posts })))
}

async fn add_post(
    State(state): State<AppState>,
    caller: CallerId,
    AppJson(req): AppJson<NewPost>,
) -> AppResult<Json<Envelope<PostData>>> {
    let caption = req.caption.trim().to_string();
    let image = req.image.trim().to_string();
    if image.is_empty() {
        return Err(AppError::BadRequest("Image required".into()));
    }
    if caption.chars().count() > MAX_CAPTION_LEN {
        return Err(AppError::BadRequest(format!(
            "Caption must be {} characters or less",
            MAX_CAPTION_LEN
        )));
    }

    let conn = state.db.get()?;
    let author = load_author(&conn, caller.as_str())?;
    let post_id = uuid::Uuid::now_v7().to_string();
    let created_at = Utc::now();
    conn.execute(
        "INSERT INTO posts (id, author_id, caption, image, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![post_id, author.id, caption, image, created_at],
    )?;

    let post = PostView {
        id: post_id,
        author,
        caption,
        image,
        comments: Vec::new(),
        likes: Vec::new(),
        bookmarked: false,
        created_at,
    };
    Ok(Json(Envelope::ok("New post added", PostData { post })))
}

async fn like(
    State(state): State<AppState>,
    caller: CallerId,
    Path(post_id): Path<String>,
) -> AppResult<Json<Envelope<NoData>>> {
    let conn = state.db.get()?;
    ensure_post_exists(&conn, &post_id)?;
    ensure_caller_exists(&conn, caller.as_str())?;

    // The composite key makes a repeated like a no-op.
    conn.execute(
        "INSERT OR IGNORE INTO likes (post_id, user_id) VALUES (?1, ?2)",
        params![post_id, caller.as_str()],
    )?;

    Ok(Json(Envelope::done("Post liked")))
}

async fn dislike(
    State(state): State<AppState>,
    caller: CallerId,
    Path(post_id): Path<String>,
) -> AppResult<Json<Envelope<NoData>>> {
    let conn = state.db.get()?;
    ensure_post_exists(&conn, &post_id)?;
    ensure_caller_exists(&conn, caller.as_str())?;

    conn.execute(
        "DELETE FROM likes WHERE post_id = ?1 AND user_id = ?2",
        params![post_id, caller.as_str()],
    )?;

    Ok(Json(Envelope::done("Post disliked")))
}

async fn add_comment(
    State(state): State<AppState>,
    caller: CallerId,
    Path(post_id): Path<String>,
    AppJson(req): AppJson<NewComment>,
) -> AppResult<Json<Envelope<CommentData>>> {
    let text = req.text.trim().to_string();
    if text.is_empty() {
        return Err(AppError::BadRequest("Text is required".into()));
    }
    if text.chars().count() > MAX_COMMENT_LEN {
        return Err(AppError::BadRequest(format!(
            "Comment must be {} characters or less",
            MAX_COMMENT_LEN
        )));
    }

    let conn = state.db.get()?;
    ensure_post_exists(&conn, &post_id)?;
    let author = load_author(&conn, caller.as_str())?;

    let comment = CommentView {
        id: uuid::Uuid::now_v7().to_string(),
        text,
        author,
        post_id,
        created_at: Utc::now(),
    };
    conn.execute(
        "INSERT INTO comments (id, post_id, author_id, text, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            comment.id,
            comment.post_id,
            comment.author.id,
            comment.text,
            comment.created_at
        ],
    )?;

    Ok(Json(Envelope::ok("Comment added", CommentData { comment })))
}

async fn list_comments(
    State(state): State<AppState>,
    _caller: CallerId,
    Path(post_id): Path<String>,
) -> AppResult<Json<Envelope<CommentsData>>> {
    let conn = state.db.get()?;
    ensure_post_exists(&conn, &post_id)?;
    let comments = query_comments(&conn, &post_id)?;
    Ok(Json(Envelope::ok("", CommentsData { comments })))
}

async fn delete_post(
    State(state): State<AppState>,
    caller: CallerId,
    Path(post_id): Path<String>,
) -> AppResult<Json<Envelope<NoData>>> {
    let conn = state.db.get()?;

    let author_id: String = conn
        .query_row(
            "SELECT author_id FROM posts WHERE id = ?1",
            params![post_id],
            |r| r.get(0),
        )
        .optional()?
        .ok_or_else(post_not_found)?;

    if author_id != caller.as_str() {
        return Err(AppError::Forbidden("Only the author can delete a post".into()));
    }

    // Comments, likes and bookmarks go with it via ON DELETE CASCADE.
    conn.execute("DELETE FROM posts WHERE id = ?1", params![post_id])?;
    tracing::info!("Post {} deleted by {}", post_id, author_id);

    Ok(Json(Envelope::done("Post deleted")))
}

/// Toggles: a second call on the same post removes the bookmark.
async fn bookmark(
    State(state): State<AppState>,
    caller: CallerId,
    Path(post_id): Path<String>,
) -> AppResult<Json<Envelope<BookmarkData>>> {
    let mut conn = state.db.get()?;
    let bookmark = toggle_bookmark(&mut conn, &post_id, caller.as_str())?;

    let message = match bookmark {
        BookmarkState::Saved => "Post bookmarked",
        BookmarkState::Unsaved => "Post removed from bookmarks",
    };
    Ok(Json(Envelope::ok(message, BookmarkData { state: bookmark })))
}

// --- Query helpers ---

fn post_not_found() -> AppError {
    AppError::NotFound("Post not found".into())
}

fn ensure_post_exists(conn: &Connection, post_id: &str) -> AppResult<()> {
    conn.query_row(
        "SELECT 1 FROM posts WHERE id = ?1",
        params![post_id],
        |_| Ok(()),
    )
    .optional()?
    .ok_or_else(post_not_found)
}

/// Flip the caller's bookmark on a post. Runs as one write transaction so
/// concurrent toggles from the same caller serialize.
fn toggle_bookmark(conn: &mut Connection, post_id: &str, user_id: &str) -> AppResult<BookmarkState> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    ensure_post_exists(&tx, post_id)?;
    ensure_caller_exists(&tx, user_id)?;

    let removed = tx.execute(
        "DELETE FROM bookmarks WHERE post_id = ?1 AND user_id = ?2",
        params![post_id, user_id],
    )?;
    let bookmark = if removed > 0 {
        BookmarkState::Unsaved
    } else {
        tx.execute(
            "INSERT INTO bookmarks (post_id, user_id) VALUES (?1, ?2)",
            params![post_id, user_id],
        )?;
        BookmarkState::Saved
    };

    tx.commit()?;
    Ok(bookmark)
}

/// A valid token can outlive its user; treat that caller as unauthenticated.
fn ensure_caller_exists(conn: &Connection, user_id: &str) -> AppResult<()> {
    load_author(conn, user_id).map(|_| ())
}

fn load_author(conn: &Connection, user_id: &str) -> AppResult<AuthorView> {
    conn.query_row(
        "SELECT id, username FROM users WHERE id = ?1",
        params![user_id],
        |row| {
            Ok(AuthorView {
                id: row.get(0)?,
                username: row.get(1)?,
            })
        },
    )
    .optional()?
    // A valid token for a user that no longer exists.
    .ok_or(AppError::Unauthenticated)
}

fn query_feed(conn: &Connection, caller_id: &str) -> AppResult<Vec<PostView>> {
    let mut stmt = conn.prepare(
        "SELECT p.id, p.author_id, u.username, p.caption, p.image, p.created_at
         FROM posts p
         JOIN users u ON u.id = p.author_id
         ORDER BY p.created_at DESC, p.id DESC
         LIMIT ?1",
    )?;
    let posts = stmt
        .query_map(params![FEED_LIMIT], Post::from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    let mut likes_stmt =
        conn.prepare("SELECT user_id FROM likes WHERE post_id = ?1 ORDER BY created_at, user_id")?;
    let mut bookmarked_stmt =
        conn.prepare("SELECT COUNT(*) > 0 FROM bookmarks WHERE post_id = ?1 AND user_id = ?2")?;

    let mut views = Vec::with_capacity(posts.len());
    for post in posts {
        let likes = likes_stmt
            .query_map(params![post.id], |r| r.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        let bookmarked: bool =
            bookmarked_stmt.query_row(params![post.id, caller_id], |r| r.get(0))?;
        let comments = query_comments(conn, &post.id)?;

        views.push(PostView {
            id: post.id,
            author: AuthorView {
                id: post.author_id,
                username: post.author_username,
            },
            caption: post.caption,
            image: post.image,
            comments,
            likes,
            bookmarked,
            created_at: post.created_at,
        });
    }

    Ok(views)
}

fn query_comments(conn: &Connection, post_id: &str) -> AppResult<Vec<CommentView>> {
    let mut stmt = conn.prepare(
        "SELECT c.id, c.post_id, c.author_id, u.username, c.text, c.created_at
         FROM comments c
         JOIN users u ON u.id = c.author_id
         WHERE c.post_id = ?1
         ORDER BY c.created_at ASC, c.id ASC",
    )?;

    let comments = stmt
        .query_map(params![post_id], Comment::from_row)?
        .map(|r| r.map(CommentView::from))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(comments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn seeded_pool() -> (tempfile::TempDir, crate::state::DbPool) {
        let tmp = tempfile::tempdir().unwrap();
        let pool = db::create_pool(&tmp.path().join("test.db")).unwrap();
        db::run_migrations(&pool).unwrap();
        let conn = pool.get().unwrap();
        conn.execute(
            "INSERT INTO users (id, username, password_hash) VALUES ('u1', 'ana', 'x')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO posts (id, author_id, caption, image, created_at)
             VALUES ('p1', 'u1', '', 'img', ?1)",
            params![Utc::now()],
        )
        .unwrap();
        (tmp, pool)
    }

    #[test]
    fn toggle_bookmark_alternates() {
        let (_tmp, pool) = seeded_pool();
        let mut conn = pool.get().unwrap();
        assert_eq!(toggle_bookmark(&mut conn, "p1", "u1").unwrap(), BookmarkState::Saved);
        assert_eq!(toggle_bookmark(&mut conn, "p1", "u1").unwrap(), BookmarkState::Unsaved);
    }

    #[test]
    fn concurrent_toggles_never_collide() {
        let (_tmp, pool) = seeded_pool();

        let workers: Vec<_> = (0..4)
            .map(|_| {
                let pool = pool.clone();
                std::thread::spawn(move || {
                    let mut conn = pool.get().unwrap();
                    for _ in 0..25 {
                        toggle_bookmark(&mut conn, "p1", "u1").unwrap();
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        // An even number of toggles leaves nothing saved.
        let conn = pool.get().unwrap();
        let saved: i64 = conn
            .query_row("SELECT COUNT(*) FROM bookmarks", [], |r| r.get(0))
            .unwrap();
        assert_eq!(saved, 0);
    }

    #[test]
    fn toggle_for_missing_user_is_unauthenticated() {
        let (_tmp, pool) = seeded_pool();
        let mut conn = pool.get().unwrap();
        let result = toggle_bookmark(&mut conn, "p1", "ghost");
        assert!(matches!(result, Err(AppError::Unauthenticated)));
    }
}
