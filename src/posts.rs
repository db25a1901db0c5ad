use actix_web::{web, HttpRequest, HttpResponse};

use crate::auth::authenticate;
use crate::config::{post_key, user_key, FEED_KEY, MAX_TEXT_LENGTH};
use crate::core::db::Store;
use crate::core::errors::{internal_error, ApiError};
use crate::core::helpers::{new_id, now_iso, sanitize_text};
use crate::core::pagination::{slice_page, PageQuery};
use crate::media;
use crate::models::models::{
    Comment, CommentView, NotificationKind, Post, PostView, User, UserSummary,
};
use crate::notifications::notify;
use crate::AppState;

// === Feed assembly ===

fn load_post(store: &Store, post_id: &str) -> Result<Post, ApiError> {
    store
        .get_json(&post_key(post_id))
        .map_err(internal_error("load_post"))?
        .ok_or_else(|| ApiError::NotFound("Post not found".to_string()))
}

/// All posts in the global feed, newest first. Dangling feed entries are
/// skipped.
pub fn load_feed_posts(store: &Store) -> anyhow::Result<Vec<Post>> {
    let mut posts = Vec::new();
    for id in store.get_list(FEED_KEY)? {
        if let Some(p) = store.get_json::<Post>(&post_key(&id))? {
            posts.push(p);
        }
    }
    Ok(posts)
}

pub fn posts_by_author(store: &Store, author_id: &str) -> anyhow::Result<Vec<Post>> {
    let mut posts = load_feed_posts(store)?;
    posts.retain(|p| p.user == author_id);
    Ok(posts)
}

/// Post projection with every related record joined in explicitly: owner
/// summary, liker summaries, comment author summaries, resolved image.
pub fn build_post_view(store: &Store, post: &Post) -> anyhow::Result<PostView> {
    let owner = store
        .get_json::<User>(&user_key(&post.user))?
        .ok_or_else(|| anyhow::anyhow!("post {} has no owner record", post.id))?;

    let mut likes = Vec::with_capacity(post.likes.len());
    for id in &post.likes {
        if let Some(u) = store.get_json::<User>(&user_key(id))? {
            likes.push(UserSummary::from(&u));
        }
    }

    let mut comments = Vec::with_capacity(post.comments.len());
    for comment in &post.comments {
        if let Some(u) = store.get_json::<User>(&user_key(&comment.user))? {
            comments.push(CommentView {
                id: comment.id.clone(),
                user: UserSummary::from(&u),
                text: comment.text.clone(),
                created_at: comment.created_at.clone(),
            });
        }
    }

    Ok(PostView {
        id: post.id.clone(),
        user: UserSummary::from(&owner),
        image: media::fetch(store, &post.image)?.unwrap_or_default(),
        text: post.text.clone(),
        likes_count: likes.len(),
        likes,
        comments,
        created_at: post.created_at.clone(),
        updated_at: post.updated_at.clone(),
    })
}

fn build_views(store: &Store, posts: &[Post]) -> anyhow::Result<Vec<PostView>> {
    let mut views = Vec::with_capacity(posts.len());
    for post in posts {
        views.push(build_post_view(store, post)?);
    }
    Ok(views)
}

fn page_response(
    store: &Store,
    posts: Vec<Post>,
    query: &PageQuery,
    operation: &'static str,
) -> Result<HttpResponse, ApiError> {
    let (page, pagination) = slice_page(&posts, query);
    let views = build_views(store, &page).map_err(internal_error(operation))?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Posts fetched successfully",
        "posts": views,
        "pagination": pagination,
    })))
}

fn validate_text(text: &str) -> Result<(), ApiError> {
    if text.chars().count() > MAX_TEXT_LENGTH {
        return Err(ApiError::BadRequest("Text must not exceed 500 characters".to_string()));
    }
    Ok(())
}

// === Handlers ===

#[derive(serde::Deserialize)]
pub struct CreatePostRequest {
    image: Option<String>,
    text: Option<String>,
}

/// POST /api/posts/create: image is required, text optional.
pub async fn create_post(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<CreatePostRequest>,
) -> Result<HttpResponse, ApiError> {
    let ctx = authenticate(&req, &state)?;
    let store = &state.store;

    let text = match body.text.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(text) => {
            validate_text(text)?;
            Some(sanitize_text(text))
        }
    };

    // Validates the data URL and the 5MB cap before anything is written.
    let image = media::store_image(store, body.image.as_deref().unwrap_or(""))?;

    let post = Post {
        id: new_id(),
        user: ctx.user.id.clone(),
        image,
        text,
        likes: Vec::new(),
        comments: Vec::new(),
        created_at: now_iso(),
        updated_at: None,
    };

    store
        .set_json(&post_key(&post.id), &post)
        .map_err(internal_error("create_post"))?;

    let mut feed = store.get_list(FEED_KEY).map_err(internal_error("create_post"))?;
    feed.insert(0, post.id.clone()); // prepend newest
    store
        .set_json(FEED_KEY, &feed)
        .map_err(internal_error("create_post"))?;

    let view = build_post_view(store, &post).map_err(internal_error("create_post"))?;
    Ok(HttpResponse::Created().json(serde_json::json!({
        "message": "Post created successfully",
        "post": view,
    })))
}

#[derive(serde::Deserialize)]
pub struct UpdatePostRequest {
    image: Option<String>,
    text: Option<String>,
}

/// PUT /api/posts/{id}: owner only; either field may change. Replacing the
/// image releases the prior media resource.
pub async fn update_post(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<UpdatePostRequest>,
) -> Result<HttpResponse, ApiError> {
    let ctx = authenticate(&req, &state)?;
    let store = &state.store;

    let mut post = load_post(store, &path)?;
    if post.user != ctx.user.id {
        return Err(ApiError::Forbidden);
    }

    if let Some(text) = body.text.as_deref().map(str::trim) {
        validate_text(text)?;
        post.text = if text.is_empty() { None } else { Some(sanitize_text(text)) };
    }

    if let Some(data_url) = body.image.as_deref() {
        let new_media = media::store_image(store, data_url)?;
        let old = std::mem::replace(&mut post.image, new_media);
        media::release(store, &old);
    }

    post.updated_at = Some(now_iso());
    store
        .set_json(&post_key(&post.id), &post)
        .map_err(internal_error("update_post"))?;

    let view = build_post_view(store, &post).map_err(internal_error("update_post"))?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Post updated successfully",
        "post": view,
    })))
}

/// DELETE /api/posts/{id}: owner only. Drops the post from the feed index,
/// releases its media and prunes it from every user's liked list.
pub async fn delete_post(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let ctx = authenticate(&req, &state)?;
    let store = &state.store;

    let post = load_post(store, &path)?;
    if post.user != ctx.user.id {
        return Err(ApiError::Forbidden);
    }

    store
        .delete(&post_key(&post.id))
        .map_err(internal_error("delete_post"))?;

    let mut feed = store.get_list(FEED_KEY).map_err(internal_error("delete_post"))?;
    feed.retain(|id| id != &post.id);
    store
        .set_json(FEED_KEY, &feed)
        .map_err(internal_error("delete_post"))?;

    media::release(store, &post.image);

    // Keep likedPosts agreement: the deleted post may still be referenced.
    for liker_id in &post.likes {
        let Some(mut liker) = store
            .get_json::<User>(&user_key(liker_id))
            .map_err(internal_error("delete_post"))?
        else {
            continue;
        };
        liker.liked_posts.retain(|id| id != &post.id);
        store
            .set_json(&user_key(liker_id), &liker)
            .map_err(internal_error("delete_post"))?;
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "Post deleted successfully" })))
}

/// GET /api/posts/all: the global feed, newest first.
pub async fn get_all_posts(
    req: HttpRequest,
    state: web::Data<AppState>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, ApiError> {
    authenticate(&req, &state)?;
    let posts = load_feed_posts(&state.store).map_err(internal_error("get_all_posts"))?;
    page_response(&state.store, posts, &query, "get_all_posts")
}

/// GET /api/posts/user/{id}: posts by one author.
pub async fn get_user_posts(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, ApiError> {
    authenticate(&req, &state)?;
    let posts =
        posts_by_author(&state.store, &path).map_err(internal_error("get_user_posts"))?;
    page_response(&state.store, posts, &query, "get_user_posts")
}

/// GET /api/posts/followed: posts from the caller's follow set. An empty
/// follow set yields an empty page, not an error.
pub async fn get_followed_posts(
    req: HttpRequest,
    state: web::Data<AppState>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, ApiError> {
    let ctx = authenticate(&req, &state)?;
    let mut posts =
        load_feed_posts(&state.store).map_err(internal_error("get_followed_posts"))?;
    posts.retain(|p| ctx.user.following.contains(&p.user));
    page_response(&state.store, posts, &query, "get_followed_posts")
}

/// GET /api/posts/liked: posts the caller has liked, newest first.
pub async fn get_liked_posts(
    req: HttpRequest,
    state: web::Data<AppState>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, ApiError> {
    let ctx = authenticate(&req, &state)?;
    let store = &state.store;

    let mut posts = Vec::with_capacity(ctx.user.liked_posts.len());
    for id in &ctx.user.liked_posts {
        if let Some(p) = store
            .get_json::<Post>(&post_key(id))
            .map_err(internal_error("get_liked_posts"))?
        {
            posts.push(p);
        }
    }
    posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    page_response(store, posts, &query, "get_liked_posts")
}

/// PUT /api/posts/{id}/like: like when not liked, unlike when liked.
/// `Post.likes` and the caller's `likedPosts` move together (two writes,
/// no cross-record transaction). Only the liked transition notifies the
/// owner, and never for the owner's own post.
pub async fn toggle_like(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let ctx = authenticate(&req, &state)?;
    let store = &state.store;

    let mut post = load_post(store, &path)?;
    let mut caller = ctx.user;

    let was_liked = post.likes.contains(&caller.id);
    if was_liked {
        post.likes.retain(|id| id != &caller.id);
        caller.liked_posts.retain(|id| id != &post.id);
    } else {
        post.likes.push(caller.id.clone());
        caller.liked_posts.push(post.id.clone());
    }

    store
        .set_json(&post_key(&post.id), &post)
        .map_err(internal_error("toggle_like"))?;
    store
        .set_json(&user_key(&caller.id), &caller)
        .map_err(internal_error("toggle_like"))?;

    if !was_liked && post.user != caller.id {
        notify(store, &caller.id, &post.user, NotificationKind::Like, Some(&post.id));
    }

    let message = if was_liked {
        "Post unliked successfully"
    } else {
        "Post liked successfully"
    };
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": message,
        "likesCount": post.likes.len(),
    })))
}

#[derive(serde::Deserialize)]
pub struct CommentRequest {
    text: Option<String>,
}

/// POST /api/posts/{id}/comment: append-only, server-assigned timestamp.
pub async fn comment_on_post(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<CommentRequest>,
) -> Result<HttpResponse, ApiError> {
    let ctx = authenticate(&req, &state)?;
    let store = &state.store;

    let text = body.text.as_deref().unwrap_or("").trim().to_string();
    if text.is_empty() {
        return Err(ApiError::BadRequest("Comment text is required".to_string()));
    }
    validate_text(&text)?;

    let mut post = load_post(store, &path)?;

    let comment = Comment {
        id: new_id(),
        user: ctx.user.id.clone(),
        text: sanitize_text(&text),
        created_at: now_iso(),
    };
    post.comments.push(comment.clone());

    store
        .set_json(&post_key(&post.id), &post)
        .map_err(internal_error("comment_on_post"))?;

    if post.user != ctx.user.id {
        notify(store, &ctx.user.id, &post.user, NotificationKind::Comment, Some(&post.id));
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Comment added successfully",
        "comment": CommentView {
            id: comment.id,
            user: UserSummary::from(&ctx.user),
            text: comment.text,
            created_at: comment.created_at,
        },
    })))
}
