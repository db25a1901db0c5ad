//! Social-network REST backend: accounts, posts, likes, comments, follow
//! edges and notifications over a JSON document store, with a stateless
//! signed-cookie session.

use actix_web::web;

pub mod auth;
pub mod config;
pub mod core;
pub mod follow;
pub mod media;
pub mod models;
pub mod notifications;
pub mod posts;
pub mod users;

use crate::config::Config;
use crate::core::db::Store;

/// Shared per-process state: configuration built once at startup and the
/// document store. Handlers receive it via `web::Data`.
pub struct AppState {
    pub config: Config,
    pub store: Store,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            store: Store::new(),
        }
    }
}

/// The full route table. Literal segments are registered before dynamic
/// ones so `/api/user/suggested` is not captured by `/api/user/{id}`.
pub fn routes(cfg: &mut web::ServiceConfig) {
    // Image uploads arrive as base64 JSON fields; the 5MB media cap plus
    // envelope must fit under the extractor limit.
    cfg.app_data(web::JsonConfig::default().limit(8 * 1024 * 1024))
        .service(
            web::scope("/api/auth")
                .route("/signup", web::post().to(auth::signup))
                .route("/login", web::post().to(auth::login))
                .route("/logout", web::post().to(auth::logout))
                .route("/user", web::get().to(auth::current_user)),
        )
        .service(
            web::scope("/api/user")
                .route("/suggested", web::get().to(users::get_suggested_users))
                .route("/update", web::put().to(users::update_user))
                .route("/{id}/follow", web::put().to(follow::toggle_follow))
                .route("/{id}", web::get().to(users::get_user_profile)),
        )
        .service(
            web::scope("/api/posts")
                .route("/create", web::post().to(posts::create_post))
                .route("/all", web::get().to(posts::get_all_posts))
                .route("/followed", web::get().to(posts::get_followed_posts))
                .route("/liked", web::get().to(posts::get_liked_posts))
                .route("/user/{id}", web::get().to(posts::get_user_posts))
                .route("/{id}/comment", web::post().to(posts::comment_on_post))
                .route("/{id}/like", web::put().to(posts::toggle_like))
                .route("/{id}", web::put().to(posts::update_post))
                .route("/{id}", web::delete().to(posts::delete_post)),
        )
        .service(
            web::scope("/api/notifications")
                .route("", web::get().to(notifications::get_all_notifications))
                .route("/delete", web::delete().to(notifications::delete_all_notifications)),
        );
}
