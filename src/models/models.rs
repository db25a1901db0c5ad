use serde::{Serialize, Deserialize};

/// Stored user record. `followers`/`following` hold the redundant follow
/// edge (if A follows B, both records carry it) and `liked_posts` mirrors
/// `Post::likes`. The password field is the argon2 PHC string and must
/// never reach a response; use [`UserView`] or [`UserSummary`].
#[derive(Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    pub full_name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    /// Media id of the avatar, resolved through the media store.
    #[serde(default)]
    pub profile_img: Option<String>,
    #[serde(default)]
    pub followers: Vec<String>,
    #[serde(default)]
    pub following: Vec<String>,
    #[serde(default)]
    pub liked_posts: Vec<String>,
    pub created_at: String,
}

#[derive(Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    /// Owner's user id.
    pub user: String,
    /// Media id of the required image.
    pub image: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub likes: Vec<String>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    pub created_at: String,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Append-only sub-record of a post.
#[derive(Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub user: String,
    pub text: String,
    pub created_at: String,
}

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Follow,
    Like,
    Comment,
}

#[derive(Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub from_user: String,
    pub to_user: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    #[serde(default)]
    pub post_id: Option<String>,
    #[serde(default)]
    pub read: bool,
    pub created_at: String,
}

// === Response projections ===

/// Denormalized author summary attached to posts, likers, comment authors
/// and notification senders.
#[derive(Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: String,
    pub username: String,
    pub full_name: String,
    pub email: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            full_name: user.full_name.clone(),
            email: user.email.clone(),
        }
    }
}

/// Full profile minus the password hash.
#[derive(Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: String,
    pub username: String,
    pub full_name: String,
    pub email: String,
    pub bio: Option<String>,
    pub link: Option<String>,
    pub profile_img: Option<String>,
    pub followers: Vec<UserSummary>,
    pub following: Vec<UserSummary>,
    pub liked_posts: Vec<String>,
    pub created_at: String,
}

#[derive(Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    pub id: String,
    pub user: UserSummary,
    pub text: String,
    pub created_at: String,
}

#[derive(Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
    pub id: String,
    pub user: UserSummary,
    /// The stored data URL, resolved from the media id.
    pub image: String,
    pub text: Option<String>,
    pub likes: Vec<UserSummary>,
    pub likes_count: usize,
    pub comments: Vec<CommentView>,
    pub created_at: String,
    pub updated_at: Option<String>,
}

#[derive(Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NotificationView {
    pub id: String,
    pub from_user: UserSummary,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub post_id: Option<String>,
    pub read: bool,
    pub created_at: String,
}
