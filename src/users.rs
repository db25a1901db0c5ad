use std::sync::OnceLock;

use actix_web::{web, HttpRequest, HttpResponse};
use regex::Regex;

use crate::auth::authenticate;
use crate::config::*;
use crate::core::db::Store;
use crate::core::errors::{internal_error, ApiError};
use crate::core::helpers::{hash_password, sanitize_text, verify_password};
use crate::core::pagination::{slice_page, PageQuery};
use crate::media;
use crate::models::models::{User, UserSummary, UserView};
use crate::posts::{build_post_view, posts_by_author};
use crate::AppState;

// === Field validation (shared with signup) ===

fn username_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"^[A-Za-z0-9]+$").expect("Regex should compile"))
}

fn full_name_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"^[A-Za-zĄąĆćĘęŁłŃńÓóŚśŹźŻż\s]+$").expect("Regex should compile")
    })
}

fn email_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("Regex should compile"))
}

fn link_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"^https?://\S+$").expect("Regex should compile"))
}

pub fn validate_username(username: &str) -> Result<(), ApiError> {
    if username.is_empty() {
        return Err(ApiError::BadRequest("Username is required".to_string()));
    }
    let len = username.chars().count();
    if len < MIN_USERNAME_LENGTH || len > MAX_USERNAME_LENGTH {
        return Err(ApiError::BadRequest("Username must be 3-15 characters long".to_string()));
    }
    if !username_regex().is_match(username) {
        return Err(ApiError::BadRequest(
            "Username must contain only letters and numbers".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_full_name(full_name: &str) -> Result<(), ApiError> {
    if full_name.is_empty() {
        return Err(ApiError::BadRequest("Full name is required".to_string()));
    }
    let len = full_name.chars().count();
    if len < MIN_FULL_NAME_LENGTH || len > MAX_FULL_NAME_LENGTH {
        return Err(ApiError::BadRequest("Full name must be 6-30 characters long".to_string()));
    }
    if !full_name_regex().is_match(full_name) {
        return Err(ApiError::BadRequest(
            "Full name must contain only letters and spaces".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), ApiError> {
    if email.is_empty() {
        return Err(ApiError::BadRequest("Email is required".to_string()));
    }
    if !email_regex().is_match(email) {
        return Err(ApiError::BadRequest("Invalid email format".to_string()));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.is_empty() {
        return Err(ApiError::BadRequest("Password is required".to_string()));
    }
    let len = password.chars().count();
    if len < MIN_PASSWORD_LENGTH || len > MAX_PASSWORD_LENGTH {
        return Err(ApiError::BadRequest("Password must be 6-30 characters long".to_string()));
    }
    Ok(())
}

fn validate_link(link: &str) -> Result<(), ApiError> {
    if !link_regex().is_match(link) {
        return Err(ApiError::BadRequest("Invalid URL format".to_string()));
    }
    Ok(())
}

// === Lookups ===

/// Exact, case-sensitive username match over the user index.
pub fn find_user_by_username(store: &Store, username: &str) -> anyhow::Result<Option<User>> {
    for id in store.get_list(USERS_LIST_KEY)? {
        if let Some(u) = store.get_json::<User>(&user_key(&id))? {
            if u.username == username {
                return Ok(Some(u));
            }
        }
    }
    Ok(None)
}

pub fn find_user_by_email(store: &Store, email: &str) -> anyhow::Result<Option<User>> {
    for id in store.get_list(USERS_LIST_KEY)? {
        if let Some(u) = store.get_json::<User>(&user_key(&id))? {
            if u.email == email {
                return Ok(Some(u));
            }
        }
    }
    Ok(None)
}

/// Denormalized summaries for a list of user ids. Ids whose record has
/// vanished are skipped rather than failing the whole view.
pub fn summaries_for(store: &Store, ids: &[String]) -> anyhow::Result<Vec<UserSummary>> {
    let mut summaries = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(u) = store.get_json::<User>(&user_key(id))? {
            summaries.push(UserSummary::from(&u));
        }
    }
    Ok(summaries)
}

/// Full profile projection: password stripped, follow edges populated,
/// avatar resolved to its data URL.
pub fn build_user_view(store: &Store, user: &User) -> anyhow::Result<UserView> {
    Ok(UserView {
        id: user.id.clone(),
        username: user.username.clone(),
        full_name: user.full_name.clone(),
        email: user.email.clone(),
        bio: user.bio.clone(),
        link: user.link.clone(),
        profile_img: match &user.profile_img {
            Some(media_id) => media::fetch(store, media_id)?,
            None => None,
        },
        followers: summaries_for(store, &user.followers)?,
        following: summaries_for(store, &user.following)?,
        liked_posts: user.liked_posts.clone(),
        created_at: user.created_at.clone(),
    })
}

// === Handlers ===

/// GET /api/user/{id}: profile plus that user's posts, newest first.
pub async fn get_user_profile(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, ApiError> {
    authenticate(&req, &state)?;
    let user_id = path.into_inner();

    let user: User = state
        .store
        .get_json(&user_key(&user_id))
        .map_err(internal_error("get_user_profile"))?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let posts = posts_by_author(&state.store, &user.id)
        .map_err(internal_error("get_user_profile"))?;
    let (page, pagination) = slice_page(&posts, &query);
    let mut views = Vec::with_capacity(page.len());
    for post in &page {
        views.push(build_post_view(&state.store, post).map_err(internal_error("get_user_profile"))?);
    }

    let profile = build_user_view(&state.store, &user).map_err(internal_error("get_user_profile"))?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "User profile fetched successfully",
        "profile": profile,
        "posts": views,
        "pagination": pagination,
    })))
}

/// GET /api/user/suggested: users the caller does not follow yet,
/// newest-registered first.
pub async fn get_suggested_users(
    req: HttpRequest,
    state: web::Data<AppState>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, ApiError> {
    let ctx = authenticate(&req, &state)?;
    let store = &state.store;

    let mut candidates: Vec<UserSummary> = Vec::new();
    let mut ids = store
        .get_list(USERS_LIST_KEY)
        .map_err(internal_error("get_suggested_users"))?;
    ids.reverse();
    for id in ids {
        if id == ctx.user.id || ctx.user.following.contains(&id) {
            continue;
        }
        if let Some(u) = store
            .get_json::<User>(&user_key(&id))
            .map_err(internal_error("get_suggested_users"))?
        {
            candidates.push(UserSummary::from(&u));
        }
    }

    let (users, pagination) = slice_page(&candidates, &query);

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Suggested users fetched successfully",
        "users": users,
        "pagination": pagination,
    })))
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    username: Option<String>,
    full_name: Option<String>,
    email: Option<String>,
    bio: Option<String>,
    link: Option<String>,
    profile_img: Option<String>,
    current_password: Option<String>,
    new_password: Option<String>,
}

/// PUT /api/user/update: partial profile update. Username and email
/// changes re-check uniqueness against other records; password change
/// requires the current password; avatar replacement releases the prior
/// media resource.
pub async fn update_user(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<UpdateUserRequest>,
) -> Result<HttpResponse, ApiError> {
    let ctx = authenticate(&req, &state)?;
    let store = &state.store;
    let mut user = ctx.user;

    if let Some(username) = body.username.as_deref() {
        let username = sanitize_text(username.trim());
        validate_username(&username)?;
        if username != user.username {
            if let Some(other) = find_user_by_username(store, &username)
                .map_err(internal_error("update_user"))?
            {
                if other.id != user.id {
                    return Err(ApiError::Conflict("username is already taken".to_string()));
                }
            }
            user.username = username;
        }
    }

    if let Some(full_name) = body.full_name.as_deref() {
        let full_name = full_name.trim().to_string();
        validate_full_name(&full_name)?;
        user.full_name = full_name;
    }

    if let Some(email) = body.email.as_deref() {
        let email = email.trim().to_string();
        validate_email(&email)?;
        if email != user.email {
            if let Some(other) =
                find_user_by_email(store, &email).map_err(internal_error("update_user"))?
            {
                if other.id != user.id {
                    return Err(ApiError::Conflict("Email is already taken".to_string()));
                }
            }
            user.email = email;
        }
    }

    if let Some(bio) = body.bio.as_deref() {
        if bio.chars().count() > MAX_BIO_LENGTH {
            return Err(ApiError::BadRequest("Bio must not exceed 200 characters".to_string()));
        }
        let sanitized = sanitize_text(bio);
        user.bio = if sanitized.is_empty() { None } else { Some(sanitized) };
    }

    if let Some(link) = body.link.as_deref() {
        if link.is_empty() {
            user.link = None;
        } else {
            validate_link(link)?;
            user.link = Some(link.to_string());
        }
    }

    // Password change: both fields together or neither.
    match (body.current_password.as_deref(), body.new_password.as_deref()) {
        (None, None) => {}
        (Some(current), Some(new)) => {
            validate_password(new)?;
            if !verify_password(current, &user.password) {
                return Err(ApiError::Unauthorized("Current password is incorrect".to_string()));
            }
            user.password = hash_password(new).map_err(internal_error("update_user"))?;
        }
        _ => {
            return Err(ApiError::BadRequest(
                "Both current and new password are required to change password".to_string(),
            ));
        }
    }

    if let Some(data_url) = body.profile_img.as_deref() {
        let new_media = media::store_image(store, data_url)?;
        if let Some(old) = user.profile_img.replace(new_media) {
            media::release(store, &old);
        }
    }

    store
        .set_json(&user_key(&user.id), &user)
        .map_err(internal_error("update_user"))?;

    let view = build_user_view(store, &user).map_err(internal_error("update_user"))?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "User updated successfully",
        "user": view,
    })))
}
