use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use blog_backend::{
    AppState, MemoryRepository, MockMediaService,
    auth::Identity,
    config::AppConfig,
    error::ApiError,
    handlers::{IdParam, auth, categories, comments, posts, system, users},
    models::{
        CreateCategoryRequest, CreateCommentRequest, Image, LoginRequest, Post, PostFilter,
        RegisterUserRequest, UpdateCommentRequest, UpdatePostRequest, UpdateUserRequest, User,
    },
    policy::{AdminOnly, SelfOnly, SelfOrAdmin},
    repository::{NewComment, NewPost, NewUser, Repository},
};
use std::sync::Arc;
use uuid::Uuid;

// --- Test Harness ---

struct Harness {
    state: AppState,
    repo: Arc<MemoryRepository>,
    media: MockMediaService,
}

impl Harness {
    fn new() -> Self {
        Self::with_config(AppConfig::default())
    }

    fn with_config(config: AppConfig) -> Self {
        let repo = Arc::new(MemoryRepository::new());
        let media = MockMediaService::new();
        let state = AppState::new(repo.clone(), Arc::new(media.clone()), config);
        Self { state, repo, media }
    }

    fn state(&self) -> State<AppState> {
        State(self.state.clone())
    }

    async fn user(&self, name: &str) -> (User, Identity) {
        let user = self
            .repo
            .create_user(NewUser {
                username: name.to_string(),
                email: format!("{name}@example.com"),
                password_hash: "not-a-real-hash".to_string(),
            })
            .await
            .unwrap();
        let identity = Identity {
            subject_id: user.id,
            is_admin: false,
        };
        (user, identity)
    }

    fn admin(&self) -> Identity {
        let admin = self.repo.insert_admin(NewUser {
            username: "admin".to_string(),
            email: "admin@example.com".to_string(),
            password_hash: "not-a-real-hash".to_string(),
        });
        Identity {
            subject_id: admin.id,
            is_admin: true,
        }
    }

    async fn post(&self, owner: Uuid, title: &str, category: &str) -> Post {
        self.repo
            .create_post(NewPost {
                user_id: owner,
                title: title.to_string(),
                description: "a description long enough".to_string(),
                category: category.to_string(),
                image: Image {
                    url: format!("http://localhost:9000/mock-bucket/images/{title}.png"),
                    public_id: Some(format!("images/{title}.png")),
                },
            })
            .await
            .unwrap()
    }

    async fn comment(&self, post_id: Uuid, author: &User, text: &str) -> Uuid {
        self.repo
            .create_comment(NewComment {
                post_id,
                user_id: author.id,
                text: text.to_string(),
                username: author.username.clone(),
            })
            .await
            .unwrap()
            .id
    }
}

fn forbidden(message: &str) -> ApiError {
    ApiError::Forbidden(message.to_string())
}

// --- Auth ---

#[tokio::test]
async fn test_register_then_login() {
    let h = Harness::new();
    let register = RegisterUserRequest {
        username: "  alice  ".to_string(),
        email: "alice@example.com".to_string(),
        password: "correct-horse".to_string(),
    };

    let (status, Json(body)) = auth::register(h.state(), Json(register.clone()))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body.message, "User created successfully");

    // Same email again.
    let duplicate = auth::register(h.state(), Json(register)).await.unwrap_err();
    assert_eq!(duplicate, ApiError::BadRequest("User already exists".to_string()));

    let wrong = auth::login(
        h.state(),
        Json(LoginRequest {
            email: "alice@example.com".to_string(),
            password: "wrong-password".to_string(),
        }),
    )
    .await
    .unwrap_err();
    assert_eq!(
        wrong,
        ApiError::BadRequest("Invalid email or password".to_string())
    );

    let Json(login) = auth::login(
        h.state(),
        Json(LoginRequest {
            email: "alice@example.com".to_string(),
            password: "correct-horse".to_string(),
        }),
    )
    .await
    .unwrap();
    assert!(!login.is_admin);
    assert_eq!(login.profile_photo.public_id, None);

    let claims = h.state.auth.codec.decode(&login.token).unwrap();
    assert_eq!(claims.sub, login.id);

    let stored = h.repo.get_user(login.id).await.unwrap().unwrap();
    assert_eq!(stored.username, "alice");
}

#[tokio::test]
async fn test_login_unknown_email_matches_wrong_password() {
    let h = Harness::new();
    let err = auth::login(
        h.state(),
        Json(LoginRequest {
            email: "nobody@example.com".to_string(),
            password: "whatever-password".to_string(),
        }),
    )
    .await
    .unwrap_err();
    assert_eq!(err, ApiError::BadRequest("Invalid email or password".to_string()));
}

#[tokio::test]
async fn test_register_rejects_invalid_body() {
    let h = Harness::new();
    let err = auth::register(
        h.state(),
        Json(RegisterUserRequest {
            username: "bob".to_string(),
            email: "bob@example.com".to_string(),
            password: "short".to_string(),
        }),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)));
    assert_eq!(h.repo.count_users().await.unwrap(), 0);
}

#[tokio::test]
async fn test_logout_revokes_the_presented_token() {
    let h = Harness::new();
    let (_, identity) = h.user("carol").await;
    let token = h.state.auth.codec.issue(&identity).unwrap();
    let claims = h.state.auth.codec.decode(&token).unwrap();

    auth::logout(claims.clone(), h.state()).await;
    assert!(h.state.auth.revoked.is_revoked(claims.jti));
}

// --- Users ---

#[tokio::test]
async fn test_get_user_profile_includes_posts() {
    let h = Harness::new();
    let (alice, _) = h.user("alice").await;
    h.post(alice.id, "first", "music").await;
    h.post(alice.id, "second", "music").await;

    let Json(view) = users::get_user_profile(h.state(), IdParam(alice.id))
        .await
        .unwrap();
    assert_eq!(view.user.id, alice.id);
    let titles: Vec<&str> = view.posts.iter().map(|p| p.title.as_str()).collect();
    assert_eq!(titles, vec!["second", "first"]);

    let missing = users::get_user_profile(h.state(), IdParam(Uuid::new_v4()))
        .await
        .unwrap_err();
    assert_eq!(missing, ApiError::NotFound("User not found".to_string()));
}

#[tokio::test]
async fn test_update_user_profile() {
    let h = Harness::new();
    let (alice, identity) = h.user("alice").await;

    let Json(updated) = users::update_user_profile(
        SelfOnly(identity),
        h.state(),
        IdParam(alice.id),
        Json(UpdateUserRequest {
            username: " alice2 ".to_string(),
            password: None,
            bio: Some("hello".to_string()),
        }),
    )
    .await
    .unwrap();

    assert_eq!(updated.username, "alice2");
    assert_eq!(updated.bio.as_deref(), Some("hello"));
}

#[tokio::test]
async fn test_delete_user_cascades() {
    let h = Harness::new();
    let (alice, identity) = h.user("alice").await;
    let (bob, _) = h.user("bob").await;

    h.repo
        .set_profile_photo(
            alice.id,
            Image {
                url: "http://localhost:9000/mock-bucket/images/me.png".to_string(),
                public_id: Some("images/me.png".to_string()),
            },
        )
        .await
        .unwrap();
    let alice_post = h.post(alice.id, "alice-post", "travel").await;
    let bob_post = h.post(bob.id, "bob-post", "travel").await;
    h.comment(bob_post.id, &alice, "nice trip").await;
    h.comment(bob_post.id, &bob, "thanks").await;

    let Json(body) = users::delete_user_profile(SelfOrAdmin(identity), h.state(), IdParam(alice.id))
        .await
        .unwrap();
    assert_eq!(body.message, "your profile has been deleted");

    assert!(h.repo.get_user(alice.id).await.unwrap().is_none());
    assert!(h.repo.get_post(alice_post.id).await.unwrap().is_none());
    assert!(h.repo.get_post(bob_post.id).await.unwrap().is_some());

    let remaining = h.repo.comments_for_post(bob_post.id).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].user_id, bob.id);

    let removed = h.media.removed_ids();
    assert!(removed.contains(&"images/alice-post.png".to_string()));
    assert!(removed.contains(&"images/me.png".to_string()));
    assert!(!removed.contains(&"images/bob-post.png".to_string()));
}

#[tokio::test]
async fn test_delete_unknown_user_is_not_found() {
    let h = Harness::new();
    let admin = h.admin();
    let err = users::delete_user_profile(SelfOrAdmin(admin), h.state(), IdParam(Uuid::new_v4()))
        .await
        .unwrap_err();
    assert_eq!(err, ApiError::NotFound("User not found".to_string()));
}

// --- Posts ---

#[tokio::test]
async fn test_owner_updates_post() {
    let h = Harness::new();
    let (alice, identity) = h.user("alice").await;
    let post = h.post(alice.id, "draft", "music").await;

    let Json(updated) = posts::update_post(
        identity,
        h.state(),
        IdParam(post.id),
        Json(UpdatePostRequest {
            title: Some("  final  ".to_string()),
            ..UpdatePostRequest::default()
        }),
    )
    .await
    .unwrap();

    assert_eq!(updated.title, "final");
    assert_eq!(updated.category, "music");
}

#[tokio::test]
async fn test_admin_cannot_update_others_post_by_default() {
    let h = Harness::new();
    let (alice, _) = h.user("alice").await;
    let admin = h.admin();
    let post = h.post(alice.id, "draft", "music").await;

    let err = posts::update_post(
        admin,
        h.state(),
        IdParam(post.id),
        Json(UpdatePostRequest {
            title: Some("hijacked".to_string()),
            ..UpdatePostRequest::default()
        }),
    )
    .await
    .unwrap_err();
    assert_eq!(err, forbidden("access denied, you are not allowed"));
    assert_eq!(h.repo.get_post(post.id).await.unwrap().unwrap().title, "draft");
}

#[tokio::test]
async fn test_admin_can_update_when_enabled() {
    let h = Harness::with_config(AppConfig {
        admin_can_edit: true,
        ..AppConfig::default()
    });
    let (alice, _) = h.user("alice").await;
    let admin = h.admin();
    let post = h.post(alice.id, "draft", "music").await;

    let result = posts::update_post(
        admin,
        h.state(),
        IdParam(post.id),
        Json(UpdatePostRequest {
            category: Some("news".to_string()),
            ..UpdatePostRequest::default()
        }),
    )
    .await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_admin_deletes_any_post_with_comments_and_image() {
    let h = Harness::new();
    let (alice, _) = h.user("alice").await;
    let admin = h.admin();
    let post = h.post(alice.id, "doomed", "music").await;
    h.comment(post.id, &alice, "first!").await;

    let Json(body) = posts::delete_post(admin, h.state(), IdParam(post.id))
        .await
        .unwrap();
    assert_eq!(body.message, "Post deleted successfully");
    assert_eq!(body.id, post.id);

    assert!(h.repo.get_post(post.id).await.unwrap().is_none());
    assert!(h.repo.comments_for_post(post.id).await.unwrap().is_empty());
    assert_eq!(h.media.removed_ids(), vec!["images/doomed.png".to_string()]);
}

#[tokio::test]
async fn test_non_owner_cannot_delete_post() {
    let h = Harness::new();
    let (alice, _) = h.user("alice").await;
    let (_, mallory) = h.user("mallory").await;
    let post = h.post(alice.id, "mine", "music").await;

    let err = posts::delete_post(mallory, h.state(), IdParam(post.id))
        .await
        .unwrap_err();
    assert_eq!(err, forbidden("access denied, you are not allowed"));
    assert!(h.media.removed_ids().is_empty());
}

#[tokio::test]
async fn test_missing_post_is_not_found_before_ownership() {
    let h = Harness::new();
    let (_, identity) = h.user("alice").await;
    let err = posts::delete_post(identity, h.state(), IdParam(Uuid::new_v4()))
        .await
        .unwrap_err();
    assert_eq!(err, ApiError::NotFound("Post not found".to_string()));
}

#[tokio::test]
async fn test_like_toggle_is_its_own_inverse() {
    let h = Harness::new();
    let (alice, identity) = h.user("alice").await;
    let post = h.post(alice.id, "likeable", "music").await;

    let Json(liked) = posts::toggle_like(identity, h.state(), IdParam(post.id))
        .await
        .unwrap();
    assert_eq!(liked.likes, vec![alice.id]);

    let Json(unliked) = posts::toggle_like(identity, h.state(), IdParam(post.id))
        .await
        .unwrap();
    assert!(unliked.likes.is_empty());
}

#[tokio::test]
async fn test_list_posts_pages_and_filters() {
    let h = Harness::new();
    let (alice, _) = h.user("alice").await;
    for i in 0..8 {
        let category = if i % 2 == 0 { "even" } else { "odd" };
        h.post(alice.id, &format!("post-{i}"), category).await;
    }

    let Json(page_one) = posts::list_posts(
        h.state(),
        Query(PostFilter {
            page_number: Some(1),
            category: None,
        }),
    )
    .await
    .unwrap();
    assert_eq!(page_one.len(), 6);
    assert_eq!(page_one[0].post.title, "post-7");
    assert_eq!(page_one[0].user.as_ref().map(|u| u.id), Some(alice.id));

    // The page number wins over the category.
    let Json(page_two) = posts::list_posts(
        h.state(),
        Query(PostFilter {
            page_number: Some(2),
            category: Some("odd".to_string()),
        }),
    )
    .await
    .unwrap();
    let titles: Vec<&str> = page_two.iter().map(|v| v.post.title.as_str()).collect();
    assert_eq!(titles, vec!["post-1", "post-0"]);

    let Json(odd) = posts::list_posts(
        h.state(),
        Query(PostFilter {
            page_number: None,
            category: Some("odd".to_string()),
        }),
    )
    .await
    .unwrap();
    assert_eq!(odd.len(), 4);
    assert!(odd.iter().all(|v| v.post.category == "odd"));

    let Json(all) = posts::list_posts(h.state(), Query(PostFilter::default()))
        .await
        .unwrap();
    assert_eq!(all.len(), 8);

    let Json(count) = posts::count_posts(h.state()).await.unwrap();
    assert_eq!(count, 8);
}

#[tokio::test]
async fn test_get_post_includes_author_and_comments() {
    let h = Harness::new();
    let (alice, _) = h.user("alice").await;
    let (bob, _) = h.user("bob").await;
    let post = h.post(alice.id, "detail", "music").await;
    h.comment(post.id, &bob, "great").await;

    let Json(view) = posts::get_post(h.state(), IdParam(post.id)).await.unwrap();
    assert_eq!(view.user.map(|u| u.username), Some("alice".to_string()));
    assert_eq!(view.comments.len(), 1);
    assert_eq!(view.comments[0].username, "bob");
}

// --- Comments ---

#[tokio::test]
async fn test_create_comment_copies_username() {
    let h = Harness::new();
    let (alice, _) = h.user("alice").await;
    let (_, bob) = h.user("bob").await;
    let post = h.post(alice.id, "topic", "music").await;

    let (status, Json(comment)) = comments::create_comment(
        bob,
        h.state(),
        Json(CreateCommentRequest {
            post_id: post.id,
            text: " hi ".to_string(),
        }),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(comment.username, "bob");
    assert_eq!(comment.text, "hi");
}

#[tokio::test]
async fn test_create_comment_on_missing_post() {
    let h = Harness::new();
    let (_, bob) = h.user("bob").await;
    let err = comments::create_comment(
        bob,
        h.state(),
        Json(CreateCommentRequest {
            post_id: Uuid::new_v4(),
            text: "hello".to_string(),
        }),
    )
    .await
    .unwrap_err();
    assert_eq!(err, ApiError::NotFound("Post not found".to_string()));
}

#[tokio::test]
async fn test_non_owner_cannot_delete_comment() {
    // {u1, admin:false} deleting a comment owned by u2.
    let h = Harness::new();
    let (u1, u1_identity) = h.user("u1").await;
    let (u2, _) = h.user("u2").await;
    let post = h.post(u1.id, "topic", "music").await;
    let comment_id = h.comment(post.id, &u2, "mine").await;

    let err = comments::delete_comment(u1_identity, h.state(), IdParam(comment_id))
        .await
        .unwrap_err();
    assert_eq!(err, forbidden("access denied, you are not allowed"));
    assert!(h.repo.get_comment(comment_id).await.unwrap().is_some());

    let err = comments::update_comment(
        u1_identity,
        h.state(),
        IdParam(comment_id),
        Json(UpdateCommentRequest {
            text: "edited".to_string(),
        }),
    )
    .await
    .unwrap_err();
    assert_eq!(err, forbidden("access denied, you are not allowed"));
}

#[tokio::test]
async fn test_owner_updates_and_admin_deletes_comment() {
    let h = Harness::new();
    let (alice, identity) = h.user("alice").await;
    let admin = h.admin();
    let post = h.post(alice.id, "topic", "music").await;
    let comment_id = h.comment(post.id, &alice, "frist").await;

    let Json(updated) = comments::update_comment(
        identity,
        h.state(),
        IdParam(comment_id),
        Json(UpdateCommentRequest {
            text: "first".to_string(),
        }),
    )
    .await
    .unwrap();
    assert_eq!(updated.text, "first");

    let Json(body) = comments::delete_comment(admin, h.state(), IdParam(comment_id))
        .await
        .unwrap();
    assert_eq!(body.message, "Comment deleted successfully");
    assert!(h.repo.get_comment(comment_id).await.unwrap().is_none());
}

// --- Categories ---

#[tokio::test]
async fn test_category_lifecycle() {
    let h = Harness::new();
    let admin = h.admin();

    let (status, Json(category)) = categories::create_category(
        AdminOnly(admin),
        h.state(),
        Json(CreateCategoryRequest {
            title: "music".to_string(),
        }),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(category.user_id, admin.subject_id);

    let Json(all) = categories::list_categories(h.state()).await.unwrap();
    assert_eq!(all.len(), 1);

    let Json(body) = categories::delete_category(h.state(), IdParam(category.id))
        .await
        .unwrap();
    assert_eq!(body.message, "Category deleted successfully");

    let err = categories::delete_category(h.state(), IdParam(category.id))
        .await
        .unwrap_err();
    assert_eq!(err, ApiError::NotFound("Category not found".to_string()));
}

// --- System ---

#[tokio::test]
async fn test_health_check_reports_environment() {
    let h = Harness::new();
    let Json(health) = system::health_check(h.state()).await;
    assert_eq!(health.status, "ok");
    assert_eq!(health.service, "blog-backend");
    assert_eq!(health.environment, "local");
}
