use actix_web::{web, HttpRequest, HttpResponse};

use crate::auth::authenticate;
use crate::config::user_key;
use crate::core::errors::{internal_error, ApiError};
use crate::models::models::{NotificationKind, User};
use crate::notifications::notify;
use crate::AppState;

/// Flip the follow edge between two loaded records, keeping both sides in
/// agreement. Returns `true` when the caller was already following (the
/// call unfollowed), `false` when it followed.
pub fn toggle_edge(caller: &mut User, target: &mut User) -> bool {
    let was_following = caller.following.contains(&target.id);
    if was_following {
        caller.following.retain(|id| id != &target.id);
        target.followers.retain(|id| id != &caller.id);
    } else {
        caller.following.push(target.id.clone());
        target.followers.push(caller.id.clone());
    }
    was_following
}

/// PUT /api/user/{id}/follow: follow when not following, unfollow when
/// following. A fresh follow notifies the target; an unfollow does not.
///
/// The two user records are persisted with two independent writes; there
/// is no cross-record transaction (see `core::db`).
pub async fn toggle_follow(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let ctx = authenticate(&req, &state)?;
    let target_id = path.into_inner();
    let store = &state.store;

    if target_id == ctx.user.id {
        return Err(ApiError::BadRequest("You can't follow yourself".to_string()));
    }

    let mut target: User = store
        .get_json(&user_key(&target_id))
        .map_err(internal_error("toggle_follow"))?
        .ok_or_else(|| ApiError::NotFound("Target user not found".to_string()))?;
    let mut caller = ctx.user;

    let was_following = toggle_edge(&mut caller, &mut target);

    store
        .set_json(&user_key(&caller.id), &caller)
        .map_err(internal_error("toggle_follow"))?;
    store
        .set_json(&user_key(&target.id), &target)
        .map_err(internal_error("toggle_follow"))?;

    if !was_following {
        notify(store, &caller.id, &target.id, NotificationKind::Follow, None);
    }

    let message = if was_following {
        "Unfollowed user successfully"
    } else {
        "Followed user successfully"
    };
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": message,
        "followersCount": target.followers.len(),
        "followingCount": caller.following.len(),
    })))
}
