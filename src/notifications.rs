use actix_web::{web, HttpRequest, HttpResponse};

use crate::auth::authenticate;
use crate::config::{notification_key, notifications_list_key};
use crate::core::db::Store;
use crate::core::errors::{internal_error, ApiError};
use crate::core::helpers::{new_id, now_iso};
use crate::core::pagination::{slice_page, PageQuery};
use crate::models::models::{Notification, NotificationKind, NotificationView, UserSummary, User};
use crate::AppState;

/// Emit a notification as a side effect of a follow/like/comment action.
///
/// Delivery is best-effort by design: a storage failure is logged and
/// swallowed so the triggering request still succeeds.
pub fn notify(
    store: &Store,
    from_user: &str,
    to_user: &str,
    kind: NotificationKind,
    post_id: Option<&str>,
) {
    let notification = Notification {
        id: new_id(),
        from_user: from_user.to_string(),
        to_user: to_user.to_string(),
        kind,
        post_id: post_id.map(str::to_string),
        read: false,
        created_at: now_iso(),
    };

    if let Err(e) = store_notification(store, &notification) {
        tracing::warn!("Error creating notification ({:?}): {:#}", kind, e);
    }
}

fn store_notification(store: &Store, notification: &Notification) -> anyhow::Result<()> {
    store.set_json(&notification_key(&notification.id), notification)?;

    let list_key = notifications_list_key(&notification.to_user);
    let mut ids = store.get_list(&list_key)?;
    ids.insert(0, notification.id.clone()); // newest first
    store.set_json(&list_key, &ids)?;
    Ok(())
}

/// Resolve the caller's notification ids into views, newest first. Ids
/// whose notification or sender record has vanished are dropped here, so
/// pagination downstream counts only what a page can actually show.
fn load_notification_views(store: &Store, user_id: &str) -> anyhow::Result<Vec<NotificationView>> {
    let mut views = Vec::new();
    for id in store.get_list(&notifications_list_key(user_id))? {
        let Some(n) = store.get_json::<Notification>(&notification_key(&id))? else {
            continue;
        };
        let Some(sender) = store.get_json::<User>(&crate::config::user_key(&n.from_user))? else {
            continue;
        };
        views.push(NotificationView {
            id: n.id,
            from_user: UserSummary::from(&sender),
            kind: n.kind,
            post_id: n.post_id,
            read: n.read,
            created_at: n.created_at,
        });
    }
    Ok(views)
}

/// GET /api/notifications: the caller's notifications, newest first, with
/// the sender's denormalized summary attached.
pub async fn get_all_notifications(
    req: HttpRequest,
    state: web::Data<AppState>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, ApiError> {
    let ctx = authenticate(&req, &state)?;

    let views = load_notification_views(&state.store, &ctx.user.id)
        .map_err(internal_error("get_all_notifications"))?;
    let (notifications, pagination) = slice_page(&views, &query);

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Notifications fetched successfully",
        "notifications": notifications,
        "pagination": pagination,
    })))
}

/// DELETE /api/notifications/delete: bulk delete everything addressed to
/// the caller, returning the count.
pub async fn delete_all_notifications(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let ctx = authenticate(&req, &state)?;
    let store = &state.store;
    let list_key = notifications_list_key(&ctx.user.id);

    let ids = store
        .get_list(&list_key)
        .map_err(internal_error("delete_all_notifications"))?;
    for id in &ids {
        store
            .delete(&notification_key(id))
            .map_err(internal_error("delete_all_notifications"))?;
    }
    store
        .delete(&list_key)
        .map_err(internal_error("delete_all_notifications"))?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "All notifications deleted successfully",
        "deletedCount": ids.len(),
    })))
}
