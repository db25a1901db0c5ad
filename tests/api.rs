use actix_web::http::StatusCode;
use actix_web::{test, web, App};
use serde_json::{json, Value};

use flock::config::Config;
use flock::{routes, AppState};

const TINY_PNG: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUg";

macro_rules! test_app {
    () => {
        test::init_service(
            App::new()
                .app_data(web::Data::new(AppState::new(Config::for_tests())))
                .configure(routes),
        )
        .await
    };
}

/// Sign a user up and hand back the session cookie plus the new user id.
macro_rules! signup {
    ($app:expr, $username:expr, $email:expr) => {{
        let req = test::TestRequest::post()
            .uri("/api/auth/signup")
            .set_json(json!({
                "fullName": "Test Person",
                "username": $username,
                "email": $email,
                "password": "hunter22",
            }))
            .to_request();
        let resp = test::call_service(&$app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let cookie = resp
            .response()
            .cookies()
            .find(|c| c.name() == "jwt")
            .expect("signup should set the session cookie")
            .into_owned();
        let body: Value = test::read_body_json(resp).await;
        let user_id = body["user"]["id"].as_str().unwrap().to_string();
        (cookie, user_id)
    }};
}

macro_rules! create_post {
    ($app:expr, $cookie:expr, $text:expr) => {{
        let req = test::TestRequest::post()
            .uri("/api/posts/create")
            .cookie($cookie.clone())
            .set_json(json!({ "image": TINY_PNG, "text": $text }))
            .to_request();
        let resp = test::call_service(&$app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(resp).await;
        body["post"]["id"].as_str().unwrap().to_string()
    }};
}

#[actix_web::test]
async fn signup_issues_session_and_hides_password() {
    let app = test_app!();

    let req = test::TestRequest::post()
        .uri("/api/auth/signup")
        .set_json(json!({
            "fullName": "Alice Example",
            "username": "alice1",
            "email": "alice@example.com",
            "password": "hunter22",
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let cookie = resp
        .response()
        .cookies()
        .find(|c| c.name() == "jwt")
        .expect("session cookie missing")
        .into_owned();
    assert!(cookie.http_only().unwrap_or(false));

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["user"]["username"], "alice1");
    assert!(body["user"].get("password").is_none());
    assert!(!serde_json::to_string(&body).unwrap().contains("password"));

    // the cookie resolves to the caller's identity
    let req = test::TestRequest::get()
        .uri("/api/auth/user")
        .cookie(cookie)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let me: Value = test::read_body_json(resp).await;
    assert_eq!(me["email"], "alice@example.com");
}

#[actix_web::test]
async fn duplicate_username_and_email_rejected() {
    let app = test_app!();
    signup!(app, "alice1", "alice@example.com");

    let req = test::TestRequest::post()
        .uri("/api/auth/signup")
        .set_json(json!({
            "fullName": "Other Person",
            "username": "alice1",
            "email": "other@example.com",
            "password": "hunter22",
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::post()
        .uri("/api/auth/signup")
        .set_json(json!({
            "fullName": "Other Person",
            "username": "bob123",
            "email": "alice@example.com",
            "password": "hunter22",
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn login_failures_and_success() {
    let app = test_app!();
    signup!(app, "alice1", "alice@example.com");

    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "username": "nobody", "password": "hunter22" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "username": "alice1", "password": "wrongpass" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    // identifier may also be the email
    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "email": "alice@example.com", "password": "hunter22" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.response().cookies().any(|c| c.name() == "jwt"));
}

#[actix_web::test]
async fn protected_routes_require_session() {
    let app = test_app!();

    let req = test::TestRequest::post()
        .uri("/api/posts/create")
        .set_json(json!({ "image": TINY_PNG }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::get().uri("/api/posts/all").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::get().uri("/api/notifications").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn post_lifecycle_with_ownership_checks() {
    let app = test_app!();
    let (alice, _) = signup!(app, "alice1", "alice@example.com");
    let (bob, _) = signup!(app, "bob123", "bob@example.com");

    let post_id = create_post!(app, alice, "first post");

    // a stranger may neither edit nor delete
    let req = test::TestRequest::put()
        .uri(&format!("/api/posts/{}", post_id))
        .cookie(bob.clone())
        .set_json(json!({ "text": "hijacked" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::delete()
        .uri(&format!("/api/posts/{}", post_id))
        .cookie(bob)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    // the owner may edit
    let req = test::TestRequest::put()
        .uri(&format!("/api/posts/{}", post_id))
        .cookie(alice.clone())
        .set_json(json!({ "text": "edited post" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["post"]["text"], "edited post");
    assert!(body["post"]["updatedAt"].is_string());

    // and delete; the feed is empty afterwards
    let req = test::TestRequest::delete()
        .uri(&format!("/api/posts/{}", post_id))
        .cookie(alice.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri("/api/posts/all")
        .cookie(alice)
        .to_request();
    let resp = test::call_service(&app, req).await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["pagination"]["totalCount"], 0);
    assert_eq!(body["posts"].as_array().unwrap().len(), 0);
}

#[actix_web::test]
async fn oversized_image_is_rejected_and_nothing_persists() {
    let app = test_app!();
    let (alice, _) = signup!(app, "alice1", "alice@example.com");

    let oversized = format!("data:image/png;base64,{}", "A".repeat(6 * 1024 * 1024));
    let req = test::TestRequest::post()
        .uri("/api/posts/create")
        .cookie(alice.clone())
        .set_json(json!({ "image": oversized }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::get()
        .uri("/api/posts/all")
        .cookie(alice)
        .to_request();
    let resp = test::call_service(&app, req).await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["pagination"]["totalCount"], 0);
}

#[actix_web::test]
async fn follow_unfollow_scenario() {
    let app = test_app!();
    let (alice, alice_id) = signup!(app, "alice1", "alice@example.com");
    let (bob, bob_id) = signup!(app, "bob123", "bob@example.com");

    // self-follow always fails
    let req = test::TestRequest::put()
        .uri(&format!("/api/user/{}/follow", bob_id))
        .cookie(bob.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // bob follows alice
    let req = test::TestRequest::put()
        .uri(&format!("/api/user/{}/follow", alice_id))
        .cookie(bob.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["followersCount"], 1);
    assert_eq!(body["followingCount"], 1);

    // both sides of the edge agree
    let req = test::TestRequest::get()
        .uri("/api/auth/user")
        .cookie(alice.clone())
        .to_request();
    let me: Value = test::read_body_json(test::call_service(&app, req).await).await;
    assert_eq!(me["followers"].as_array().unwrap().len(), 1);
    assert_eq!(me["followers"][0]["username"], "bob123");

    // alice got exactly one follow notification
    let req = test::TestRequest::get()
        .uri("/api/notifications")
        .cookie(alice.clone())
        .to_request();
    let body: Value = test::read_body_json(test::call_service(&app, req).await).await;
    let notifications = body["notifications"].as_array().unwrap();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0]["type"], "follow");
    assert_eq!(notifications[0]["fromUser"]["username"], "bob123");

    // bob unfollows; edge gone, no new notification
    let req = test::TestRequest::put()
        .uri(&format!("/api/user/{}/follow", alice_id))
        .cookie(bob)
        .to_request();
    let body: Value = test::read_body_json(test::call_service(&app, req).await).await;
    assert_eq!(body["followersCount"], 0);
    assert_eq!(body["followingCount"], 0);

    let req = test::TestRequest::get()
        .uri("/api/notifications")
        .cookie(alice.clone())
        .to_request();
    let body: Value = test::read_body_json(test::call_service(&app, req).await).await;
    assert_eq!(body["notifications"].as_array().unwrap().len(), 1);

    // bulk delete reports the count
    let req = test::TestRequest::delete()
        .uri("/api/notifications/delete")
        .cookie(alice)
        .to_request();
    let body: Value = test::read_body_json(test::call_service(&app, req).await).await;
    assert_eq!(body["deletedCount"], 1);
}

#[actix_web::test]
async fn like_toggle_round_trips() {
    let app = test_app!();
    let (alice, _) = signup!(app, "alice1", "alice@example.com");
    let (bob, _) = signup!(app, "bob123", "bob@example.com");
    let post_id = create_post!(app, alice, "like me");

    let like = |cookie: actix_web::cookie::Cookie<'static>| {
        test::TestRequest::put()
            .uri(&format!("/api/posts/{}/like", post_id))
            .cookie(cookie)
            .to_request()
    };

    let body: Value = test::read_body_json(test::call_service(&app, like(bob.clone())).await).await;
    assert_eq!(body["likesCount"], 1);

    // liked feed and likedPosts agree with the post's like list
    let req = test::TestRequest::get()
        .uri("/api/posts/liked")
        .cookie(bob.clone())
        .to_request();
    let body: Value = test::read_body_json(test::call_service(&app, req).await).await;
    assert_eq!(body["posts"].as_array().unwrap().len(), 1);
    assert_eq!(body["posts"][0]["likes"][0]["username"], "bob123");

    // unlike returns to the original state
    let body: Value = test::read_body_json(test::call_service(&app, like(bob.clone())).await).await;
    assert_eq!(body["likesCount"], 0);

    let req = test::TestRequest::get()
        .uri("/api/posts/liked")
        .cookie(bob)
        .to_request();
    let body: Value = test::read_body_json(test::call_service(&app, req).await).await;
    assert_eq!(body["pagination"]["totalCount"], 0);

    // only the liked transition notified the owner
    let req = test::TestRequest::get()
        .uri("/api/notifications")
        .cookie(alice)
        .to_request();
    let body: Value = test::read_body_json(test::call_service(&app, req).await).await;
    let notifications = body["notifications"].as_array().unwrap();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0]["type"], "like");
}

#[actix_web::test]
async fn comment_length_boundaries() {
    let app = test_app!();
    let (alice, _) = signup!(app, "alice1", "alice@example.com");
    let post_id = create_post!(app, alice, "comments welcome");

    let comment = |text: String| {
        test::TestRequest::post()
            .uri(&format!("/api/posts/{}/comment", post_id))
            .cookie(alice.clone())
            .set_json(json!({ "text": text }))
            .to_request()
    };

    // blank after trimming
    let resp = test::call_service(&app, comment("   ".to_string())).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // exactly at the limit
    let resp = test::call_service(&app, comment("a".repeat(500))).await;
    assert_eq!(resp.status(), StatusCode::OK);

    // one over
    let resp = test::call_service(&app, comment("a".repeat(501))).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // missing entirely
    let req = test::TestRequest::post()
        .uri(&format!("/api/posts/{}/comment", post_id))
        .cookie(alice.clone())
        .set_json(json!({}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // commenting on an unknown post is a 404
    let req = test::TestRequest::post()
        .uri("/api/posts/does-not-exist/comment")
        .cookie(alice)
        .set_json(json!({ "text": "hello" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn pagination_over_twenty_five_posts() {
    let app = test_app!();
    let (alice, alice_id) = signup!(app, "alice1", "alice@example.com");

    for i in 0..25 {
        create_post!(app, alice, format!("post {}", i));
    }

    let req = test::TestRequest::get()
        .uri("/api/posts/all?page=3&limit=10")
        .cookie(alice.clone())
        .to_request();
    let body: Value = test::read_body_json(test::call_service(&app, req).await).await;
    assert_eq!(body["posts"].as_array().unwrap().len(), 5);
    assert_eq!(body["pagination"]["totalCount"], 25);
    assert_eq!(body["pagination"]["totalPages"], 3);
    assert_eq!(body["pagination"]["currentPage"], 3);

    // the author feed and the profile listing share the contract
    let req = test::TestRequest::get()
        .uri(&format!("/api/user/{}?page=2&limit=20", alice_id))
        .cookie(alice)
        .to_request();
    let body: Value = test::read_body_json(test::call_service(&app, req).await).await;
    assert_eq!(body["posts"].as_array().unwrap().len(), 5);
    assert_eq!(body["pagination"]["totalPages"], 2);
}

#[actix_web::test]
async fn followed_feed_and_suggestions() {
    let app = test_app!();
    let (alice, alice_id) = signup!(app, "alice1", "alice@example.com");
    let (bob, _) = signup!(app, "bob123", "bob@example.com");
    signup!(app, "carol7", "carol@example.com");
    create_post!(app, alice, "from alice");

    // empty follow set yields an empty page, not an error
    let req = test::TestRequest::get()
        .uri("/api/posts/followed")
        .cookie(bob.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["pagination"]["totalCount"], 0);

    let req = test::TestRequest::put()
        .uri(&format!("/api/user/{}/follow", alice_id))
        .cookie(bob.clone())
        .to_request();
    test::call_service(&app, req).await;

    let req = test::TestRequest::get()
        .uri("/api/posts/followed")
        .cookie(bob.clone())
        .to_request();
    let body: Value = test::read_body_json(test::call_service(&app, req).await).await;
    assert_eq!(body["posts"].as_array().unwrap().len(), 1);
    assert_eq!(body["posts"][0]["user"]["username"], "alice1");

    // suggestions exclude the caller and everyone already followed
    let req = test::TestRequest::get()
        .uri("/api/user/suggested")
        .cookie(bob)
        .to_request();
    let body: Value = test::read_body_json(test::call_service(&app, req).await).await;
    let users = body["users"].as_array().unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0]["username"], "carol7");
}

#[actix_web::test]
async fn profile_update_rules() {
    let app = test_app!();
    let (alice, _) = signup!(app, "alice1", "alice@example.com");

    // new password without the current one
    let req = test::TestRequest::put()
        .uri("/api/user/update")
        .cookie(alice.clone())
        .set_json(json!({ "newPassword": "changed99" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // wrong current password
    let req = test::TestRequest::put()
        .uri("/api/user/update")
        .cookie(alice.clone())
        .set_json(json!({ "currentPassword": "wrongpass", "newPassword": "changed99" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    // a proper update: bio plus password change
    let req = test::TestRequest::put()
        .uri("/api/user/update")
        .cookie(alice.clone())
        .set_json(json!({
            "bio": "writes tests",
            "currentPassword": "hunter22",
            "newPassword": "changed99",
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["user"]["bio"], "writes tests");

    // the new password works, the old one does not
    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "username": "alice1", "password": "hunter22" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "username": "alice1", "password": "changed99" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    // duplicate username collision on update
    signup!(app, "bob123", "bob@example.com");
    let req = test::TestRequest::put()
        .uri("/api/user/update")
        .cookie(alice)
        .set_json(json!({ "username": "bob123" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
