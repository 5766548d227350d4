use chrono::{Duration, Utc};
use serde_json::{json, Value};
use social_plus::auth::issue_reset_token;
use social_plus::config::reset_key;
use social_plus::core::fetch::ImageFetcher;
use social_plus::core::kv::{Kv, MemoryStore};
use social_plus::models::models::ResetToken;
use social_plus::router::route;
use spin_sdk::http::{Method, Request, Response};

/// Serves a tiny fake PNG for any URL except ones mentioning `missing`.
struct FakeFetcher;

impl ImageFetcher for FakeFetcher {
    fn fetch(&self, url: &str) -> anyhow::Result<Vec<u8>> {
        if url.contains("missing") {
            anyhow::bail!("{} responded with status 404", url);
        }
        Ok(b"\x89PNG fake image".to_vec())
    }
}

fn call(store: &MemoryStore, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Response {
    let body = body.map(|b| serde_json::to_vec(&b).unwrap()).unwrap_or_default();
    let mut builder = Request::builder();
    builder.method(method).uri(uri);
    if let Some(token) = token {
        builder.header("Authorization", format!("Bearer {}", token));
    }
    let req = builder.body(body).build();
    route(store, &FakeFetcher, req).expect("router returned an error")
}

fn status(resp: &Response) -> u16 {
    *resp.status()
}

fn body_json(resp: &Response) -> Value {
    serde_json::from_slice(resp.body()).unwrap_or_else(|e| {
        panic!("body is not JSON ({}): {}", e, String::from_utf8_lossy(resp.body()))
    })
}

fn register(store: &MemoryStore, username: &str) -> Response {
    call(
        store,
        Method::Post,
        "/register/",
        None,
        Some(json!({
            "username": username,
            "first_name": username,
            "email": format!("{}@example.com", username),
            "password": "secret",
            "password2": "secret"
        })),
    )
}

fn login(store: &MemoryStore, username: &str, password: &str) -> Response {
    call(
        store,
        Method::Post,
        "/login/",
        None,
        Some(json!({"username": username, "password": password})),
    )
}

/// Registers and logs in, returning `(user_id, token)`.
fn signed_in(store: &MemoryStore, username: &str) -> (String, String) {
    assert_eq!(status(&register(store, username)), 201);
    let resp = login(store, username, "secret");
    assert_eq!(status(&resp), 200);
    let data = body_json(&resp);
    (
        data["user_id"].as_str().unwrap().to_string(),
        data["token"].as_str().unwrap().to_string(),
    )
}

fn publish_post(store: &MemoryStore, token: &str, title: &str, body: &str, tags: Value) -> Value {
    let resp = call(
        store,
        Method::Post,
        "/blog/posts/",
        Some(token),
        Some(json!({"title": title, "body": body, "status": "PB", "tags": tags})),
    );
    assert_eq!(status(&resp), 201, "{}", String::from_utf8_lossy(resp.body()));
    body_json(&resp)
}

fn add_image(store: &MemoryStore, token: &str, section: &str, title: &str) -> Value {
    let resp = call(
        store,
        Method::Post,
        &format!("/{}/create/", section),
        Some(token),
        Some(json!({"title": title, "url": "https://example.com/photos/Pic.JPG", "description": ""})),
    );
    assert_eq!(status(&resp), 302, "{}", String::from_utf8_lossy(resp.body()));
    body_json(&resp)
}

#[test]
fn test_registration_and_login() {
    let store = MemoryStore::new();

    let resp = register(&store, "alice");
    assert_eq!(status(&resp), 201);
    let user = body_json(&resp);
    assert_eq!(user["username"], "alice");
    assert!(user.get("password").is_none(), "password leaked: {:?}", user);

    // Duplicate username
    assert_eq!(status(&register(&store, "alice")), 409);

    let resp = call(
        &store,
        Method::Post,
        "/register/",
        None,
        Some(json!({
            "username": "bob",
            "email": "alice@example.com",
            "password": "secret",
            "password2": "other"
        })),
    );
    assert_eq!(status(&resp), 400);
    let errors = body_json(&resp)["errors"].clone();
    assert_eq!(errors["password2"][0], "Passwords don't match.");
    assert_eq!(errors["email"][0], "Email already in use.");

    assert_eq!(status(&login(&store, "alice", "wrong")), 401);
    let resp = login(&store, "alice", "secret");
    assert_eq!(status(&resp), 200);
    let token = body_json(&resp)["token"].as_str().unwrap().to_string();

    let resp = call(&store, Method::Get, "/dashboard/", Some(&token), None);
    assert_eq!(status(&resp), 200);
    assert_eq!(body_json(&resp)["user"]["username"], "alice");

    assert_eq!(status(&call(&store, Method::Get, "/dashboard/", None, None)), 401);

    assert_eq!(status(&call(&store, Method::Post, "/logout/", Some(&token), None)), 200);
    assert_eq!(status(&call(&store, Method::Get, "/dashboard/", Some(&token), None)), 401);
}

#[test]
fn test_profile_edit() {
    let store = MemoryStore::new();
    let (_, token) = signed_in(&store, "carol");
    signed_in(&store, "dave");

    let resp = call(
        &store,
        Method::Put,
        "/edit/",
        Some(&token),
        Some(json!({"last_name": "Jones", "date_of_birth": "1990-04-01"})),
    );
    assert_eq!(status(&resp), 200);
    let data = body_json(&resp);
    assert_eq!(data["user"]["last_name"], "Jones");
    assert_eq!(data["profile"]["date_of_birth"], "1990-04-01");

    let resp = call(
        &store,
        Method::Put,
        "/edit/",
        Some(&token),
        Some(json!({"email": "dave@example.com", "date_of_birth": "not a date"})),
    );
    assert_eq!(status(&resp), 400);
    let errors = body_json(&resp)["errors"].clone();
    assert_eq!(errors["email"][0], "Email already in use.");
    assert_eq!(errors["date_of_birth"][0], "Enter a valid date.");
}

#[test]
fn test_password_change_revokes_sessions() {
    let store = MemoryStore::new();
    let (_, token) = signed_in(&store, "erin");

    let resp = call(
        &store,
        Method::Post,
        "/password-change/",
        Some(&token),
        Some(json!({"old_password": "nope", "new_password1": "fresh", "new_password2": "fresh"})),
    );
    assert_eq!(status(&resp), 400);

    let resp = call(
        &store,
        Method::Post,
        "/password-change/",
        Some(&token),
        Some(json!({"old_password": "secret", "new_password1": "fresh", "new_password2": "fresh"})),
    );
    assert_eq!(status(&resp), 200);
    let new_token = body_json(&resp)["token"].as_str().unwrap().to_string();

    assert_eq!(status(&call(&store, Method::Get, "/dashboard/", Some(&token), None)), 401);
    assert_eq!(status(&call(&store, Method::Get, "/dashboard/", Some(&new_token), None)), 200);
    assert_eq!(status(&login(&store, "erin", "secret")), 401);
    assert_eq!(status(&login(&store, "erin", "fresh")), 200);
}

#[test]
fn test_password_reset_does_not_reveal_accounts() {
    let store = MemoryStore::new();
    signed_in(&store, "frank");

    for email in ["frank@example.com", "nobody@example.com"] {
        let resp = call(&store, Method::Post, "/password-reset/", None, Some(json!({"email": email})));
        assert_eq!(status(&resp), 200);
        assert_eq!(body_json(&resp)["status"], "sent");
    }

    let resp = call(
        &store,
        Method::Post,
        "/password-reset/confirm/",
        None,
        Some(json!({"token": "bogus", "new_password1": "abc", "new_password2": "abc"})),
    );
    assert_eq!(status(&resp), 400);
}

#[test]
fn test_password_reset_link_sets_new_password() {
    let store = MemoryStore::new();
    let (user_id, session) = signed_in(&store, "fern");
    let token = issue_reset_token(&store, &user_id).unwrap();
    let link = format!("/password-reset/{}/", token);

    let resp = call(&store, Method::Get, &link, None, None);
    assert_eq!(status(&resp), 200);
    let check = body_json(&resp);
    assert_eq!(check["valid"], true);
    assert_eq!(check["username"], "fern");

    let resp = call(
        &store,
        Method::Post,
        &link,
        None,
        Some(json!({"new_password1": "fresh", "new_password2": "other"})),
    );
    assert_eq!(status(&resp), 400);

    let resp = call(
        &store,
        Method::Post,
        &link,
        None,
        Some(json!({"new_password1": "fresh", "new_password2": "fresh"})),
    );
    assert_eq!(status(&resp), 200);
    assert_eq!(body_json(&resp)["status"], "complete");

    assert_eq!(status(&call(&store, Method::Get, "/dashboard/", Some(&session), None)), 401);
    assert_eq!(status(&login(&store, "fern", "secret")), 401);
    assert_eq!(status(&login(&store, "fern", "fresh")), 200);

    // Single use
    assert_eq!(status(&call(&store, Method::Get, &link, None, None)), 400);
    let resp = call(
        &store,
        Method::Post,
        &link,
        None,
        Some(json!({"new_password1": "again", "new_password2": "again"})),
    );
    assert_eq!(status(&resp), 400);

    // Token in the body
    let token = issue_reset_token(&store, &user_id).unwrap();
    let resp = call(
        &store,
        Method::Post,
        "/password-reset/confirm/",
        None,
        Some(json!({"token": token, "new_password1": "newer", "new_password2": "newer"})),
    );
    assert_eq!(status(&resp), 200);
    assert_eq!(status(&login(&store, "fern", "newer")), 200);
}

#[test]
fn test_expired_reset_link_is_rejected_and_removed() {
    let store = MemoryStore::new();
    let (user_id, _) = signed_in(&store, "gus");
    let stale = ResetToken {
        user_id,
        created_at: (Utc::now() - Duration::hours(100)).to_rfc3339(),
    };
    store.set_json(&reset_key("old"), &stale).unwrap();

    let resp = call(
        &store,
        Method::Post,
        "/password-reset/old/",
        None,
        Some(json!({"new_password1": "fresh", "new_password2": "fresh"})),
    );
    assert_eq!(status(&resp), 400);
    assert!(!store.exists(&reset_key("old")).unwrap());
    assert_eq!(status(&login(&store, "gus", "secret")), 200);
}

#[test]
fn test_plain_text_fields_keep_what_was_typed() {
    let store = MemoryStore::new();

    let resp = call(
        &store,
        Method::Post,
        "/register/",
        None,
        Some(json!({
            "username": "tom",
            "first_name": "Tom & Jerry",
            "email": "tom@example.com",
            "password": "secret",
            "password2": "secret"
        })),
    );
    assert_eq!(status(&resp), 201);
    assert_eq!(body_json(&resp)["first_name"], "Tom & Jerry");

    let resp = login(&store, "tom", "secret");
    let token = body_json(&resp)["token"].as_str().unwrap().to_string();
    let post = publish_post(&store, &token, "Chip Shop", "Vinegar or not?", json!([]));
    let id = post["id"].as_u64().unwrap();

    let resp = call(
        &store,
        Method::Post,
        &format!("/blog/posts/{}/comment/", id),
        None,
        Some(json!({
            "name": "Fish & Chips",
            "email": "fish@example.com",
            "body": "Tasty <3 & cheap",
            "rating": 4
        })),
    );
    assert_eq!(status(&resp), 201);

    let detail = body_json(&call(&store, Method::Get, post["url"].as_str().unwrap(), None, None));
    assert_eq!(detail["comments"][0]["name"], "Fish & Chips");
    assert_eq!(detail["comments"][0]["body"], "Tasty <3 & cheap");
}

#[test]
fn test_blog_post_lifecycle() {
    let store = MemoryStore::new();
    let (user_id, token) = signed_in(&store, "gina");
    let (_, other_token) = signed_in(&store, "hank");

    // Drafts stay out of the list
    let resp = call(
        &store,
        Method::Post,
        "/blog/posts/",
        Some(&token),
        Some(json!({"title": "Baking Sourdough", "body": "Feed the starter daily."})),
    );
    assert_eq!(status(&resp), 201);
    let post = body_json(&resp);
    assert_eq!(post["slug"], "baking-sourdough");
    assert_eq!(post["status"], "DF");
    assert_eq!(post["author_id"], user_id.as_str());
    let id = post["id"].as_u64().unwrap();

    let list = body_json(&call(&store, Method::Get, "/blog/posts/", None, None));
    assert_eq!(list["count"], 0);

    // Only the author may edit
    let uri = format!("/blog/posts/{}/", id);
    let resp = call(&store, Method::Put, &uri, Some(&other_token), Some(json!({"status": "PB"})));
    assert_eq!(status(&resp), 403);

    let resp = call(&store, Method::Put, &uri, Some(&token), Some(json!({"status": "PB", "tags": ["Bread"]})));
    assert_eq!(status(&resp), 200);
    let post = body_json(&resp);
    assert_eq!(post["tags"], json!(["bread"]));
    let url = post["url"].as_str().unwrap().to_string();

    let list = body_json(&call(&store, Method::Get, "/blog/posts/", None, None));
    assert_eq!(list["count"], 1);
    assert_eq!(list["posts"][0]["id"], id);

    let tagged = body_json(&call(&store, Method::Get, "/blog/posts/tag/bread/", None, None));
    assert_eq!(tagged["count"], 1);
    let tagged = body_json(&call(&store, Method::Get, "/blog/posts/tag/cake/", None, None));
    assert_eq!(tagged["count"], 0);

    // Same slug on the same publish day is rejected
    let resp = call(
        &store,
        Method::Post,
        "/blog/posts/",
        Some(&token),
        Some(json!({"title": "Baking sourdough", "body": "again", "status": "PB"})),
    );
    assert_eq!(status(&resp), 400);
    assert_eq!(body_json(&resp)["errors"]["slug"][0], "Slug must be unique for Publish date.");

    // Comments
    let comment_uri = format!("/blog/posts/{}/comment/", id);
    let resp = call(
        &store,
        Method::Post,
        &comment_uri,
        None,
        Some(json!({"name": "Ivy", "email": "ivy@example.com", "body": "Lovely", "rating": 9})),
    );
    assert_eq!(status(&resp), 400);
    assert_eq!(
        body_json(&resp)["errors"]["rating"][0],
        "Select a valid choice. 9 is not one of the available choices."
    );

    let resp = call(
        &store,
        Method::Post,
        &comment_uri,
        None,
        Some(json!({"name": "Ivy", "email": "ivy@example.com", "body": "Lovely <b>loaf</b>", "rating": 5})),
    );
    assert_eq!(status(&resp), 201);
    assert_eq!(body_json(&resp)["entry"], url.as_str());

    let resp = call(&store, Method::Get, &url, None, None);
    assert_eq!(status(&resp), 200);
    let detail = body_json(&resp);
    assert_eq!(detail["title"], "Baking Sourdough");
    assert_eq!(detail["comments"].as_array().unwrap().len(), 1);
    assert_eq!(detail["comments"][0]["body"], "Lovely loaf");

    // Share
    let resp = call(
        &store,
        Method::Post,
        &format!("/blog/posts/{}/share/", id),
        None,
        Some(json!({"name": "Ivy", "email": "ivy@example.com", "to": "jo@example.com", "comments": "try it"})),
    );
    assert_eq!(status(&resp), 200);
    let shared = body_json(&resp);
    assert_eq!(shared["sent"], true);
    assert_eq!(shared["subject"], "Ivy (ivy@example.com) recommends you read Baking Sourdough");

    // Delete
    assert_eq!(status(&call(&store, Method::Delete, &uri, Some(&token), None)), 204);
    assert_eq!(status(&call(&store, Method::Get, &url, None, None)), 404);
}

#[test]
fn test_blog_pagination_search_and_feed() {
    let store = MemoryStore::new();
    let (_, token) = signed_in(&store, "jane");

    for i in 0..4 {
        publish_post(&store, &token, &format!("Recipe notes {}", i), "plain text", json!([]));
    }
    publish_post(&store, &token, "Sourdough starter", "flour and water", json!([]));
    publish_post(&store, &token, "Weekend plans", "baking sourdough bread", json!([]));

    let first = body_json(&call(&store, Method::Get, "/blog/posts/", None, None));
    assert_eq!(first["num_pages"], 2);
    assert_eq!(first["posts"].as_array().unwrap().len(), 3);
    assert_eq!(first["has_next"], true);

    let bogus = body_json(&call(&store, Method::Get, "/blog/posts/?page=abc", None, None));
    assert_eq!(bogus["page"], 1);
    let beyond = body_json(&call(&store, Method::Get, "/blog/posts/?page=99", None, None));
    assert_eq!(beyond["page"], 2);
    assert_eq!(beyond["has_next"], false);

    let resp = call(&store, Method::Get, "/blog/posts/search/?query=sourdough", None, None);
    assert_eq!(status(&resp), 200);
    let results = body_json(&resp)["results"].as_array().unwrap().clone();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["title"], "Sourdough starter");
    assert_eq!(results[1]["title"], "Weekend plans");

    assert_eq!(status(&call(&store, Method::Get, "/blog/posts/search/?query=", None, None)), 400);

    let resp = call(&store, Method::Get, "/blog/posts/feed/", None, None);
    assert_eq!(status(&resp), 200);
    let rss = String::from_utf8_lossy(resp.body()).to_string();
    assert!(rss.starts_with("<?xml") && rss.contains("<rss version=\"2.0\">"), "{}", rss);
    assert_eq!(rss.matches("<item>").count(), 5);

    let resp = call(&store, Method::Get, "/blog/sitemap.xml", None, None);
    assert_eq!(status(&resp), 200);
    let sitemap = String::from_utf8_lossy(resp.body()).to_string();
    assert_eq!(sitemap.matches("<url>").count(), 6);

    // Recipes are a separate collection
    let recipes = body_json(&call(&store, Method::Get, "/blog/recipes/", None, None));
    assert_eq!(recipes["count"], 0);
}

#[test]
fn test_image_bookmarking() {
    let store = MemoryStore::new();
    let (_, token) = signed_in(&store, "kate");

    let resp = call(
        &store,
        Method::Post,
        "/images/create/",
        None,
        Some(json!({"title": "Sunset", "url": "https://example.com/sunset.jpg"})),
    );
    assert_eq!(status(&resp), 401);

    let resp = call(
        &store,
        Method::Post,
        "/images/create/",
        Some(&token),
        Some(json!({"title": "Doc", "url": "https://example.com/file.pdf"})),
    );
    assert_eq!(status(&resp), 400);
    assert_eq!(
        body_json(&resp)["errors"]["url"][0],
        "The given URL does not match valid image extensions."
    );

    let resp = call(
        &store,
        Method::Post,
        "/images/create/",
        Some(&token),
        Some(json!({"title": "Gone", "url": "https://example.com/missing.png"})),
    );
    assert_eq!(status(&resp), 502);

    let resp = call(
        &store,
        Method::Post,
        "/images/create/",
        Some(&token),
        Some(json!({"title": "Sunset Beach", "url": "https://example.com/sunset.JPG", "description": "warm"})),
    );
    assert_eq!(status(&resp), 302);
    let image = body_json(&resp);
    let detail_url = image["detail_url"].as_str().unwrap().to_string();
    assert_eq!(
        resp.header("location").and_then(|v| v.as_str()),
        Some(detail_url.as_str())
    );
    assert!(image["file"].as_str().unwrap().ends_with("sunset-beach.jpg"));

    // The downloaded bytes are served back
    let media = call(&store, Method::Get, image["media_url"].as_str().unwrap(), None, None);
    assert_eq!(status(&media), 200);
    assert_eq!(media.body(), b"\x89PNG fake image");

    // The bookmarklet form echoes query values
    let resp = call(
        &store,
        Method::Get,
        "/images/create/?title=Sunset+Beach&url=https%3A%2F%2Fexample.com%2Fa.png",
        Some(&token),
        None,
    );
    assert_eq!(status(&resp), 200);
    let form = body_json(&resp);
    assert_eq!(form["form"]["title"], "Sunset Beach");
    assert_eq!(form["form"]["url"], "https://example.com/a.png");

    let first = call(&store, Method::Get, &detail_url, None, None);
    assert_eq!(body_json(&first)["total_views"], 1);
    let second = call(&store, Method::Get, &detail_url, None, None);
    assert_eq!(body_json(&second)["total_views"], 2);

    let wrong_slug = format!("/images/detail/{}/not-the-slug/", image["id"]);
    assert_eq!(status(&call(&store, Method::Get, &wrong_slug, None, None)), 404);
}

#[test]
fn test_ranking_orders_by_views() {
    let store = MemoryStore::new();
    let (_, token) = signed_in(&store, "liam");

    let quiet = add_image(&store, &token, "images", "Quiet");
    let popular = add_image(&store, &token, "images", "Popular");
    let recipe_image = add_image(&store, &token, "recipe-images", "Pie");

    for _ in 0..3 {
        call(&store, Method::Get, popular["detail_url"].as_str().unwrap(), None, None);
    }
    call(&store, Method::Get, quiet["detail_url"].as_str().unwrap(), None, None);

    // Recipe image counters do not leak into the image counters
    let resp = call(&store, Method::Get, recipe_image["detail_url"].as_str().unwrap(), None, None);
    assert_eq!(body_json(&resp)["total_views"], 1);

    let resp = call(&store, Method::Get, "/images/ranking/", Some(&token), None);
    assert_eq!(status(&resp), 200);
    let ranked = body_json(&resp)["most_viewed"].as_array().unwrap().clone();
    assert_eq!(ranked.len(), 2);
    assert_eq!(ranked[0]["title"], "Popular");
    assert_eq!(ranked[0]["total_views"], 3);
    assert_eq!(ranked[1]["title"], "Quiet");

    let resp = call(&store, Method::Get, "/recipe-images/ranking/", Some(&token), None);
    let ranked = body_json(&resp)["most_viewed"].as_array().unwrap().clone();
    assert_eq!(ranked.len(), 1);
    assert_eq!(ranked[0]["title"], "Pie");
}

#[test]
fn test_likes_follows_and_activity() {
    let store = MemoryStore::new();
    let (mia_id, mia) = signed_in(&store, "mia");
    let (_, noah) = signed_in(&store, "noah");

    let image = add_image(&store, &mia, "images", "Harbour");
    let id = image["id"].as_u64().unwrap();

    let resp = call(&store, Method::Post, "/images/like/", Some(&noah), Some(json!({"id": "x", "action": "like"})));
    assert_eq!(body_json(&resp)["status"], "error");

    for _ in 0..2 {
        let resp = call(
            &store,
            Method::Post,
            "/images/like/",
            Some(&noah),
            Some(json!({"id": id, "action": "like"})),
        );
        let data = body_json(&resp);
        assert_eq!(data["status"], "ok");
        assert_eq!(data["total_likes"], 1);
    }

    let resp = call(&store, Method::Post, "/users/follow/", Some(&noah), Some(json!({"id": mia_id, "action": "follow"})));
    assert_eq!(body_json(&resp)["status"], "ok");

    let resp = call(&store, Method::Post, "/users/follow/", Some(&mia), Some(json!({"id": mia_id, "action": "follow"})));
    assert_eq!(body_json(&resp)["status"], "error");

    let resp = call(&store, Method::Get, "/users/mia/", Some(&noah), None);
    assert_eq!(status(&resp), 200);
    let profile = body_json(&resp);
    assert_eq!(profile["total_followers"], 1);
    assert_eq!(profile["images"].as_array().unwrap().len(), 1);

    // Mia sees Noah's activity; a repeated like is recorded once
    let dashboard = body_json(&call(&store, Method::Get, "/dashboard/", Some(&mia), None));
    let verbs: Vec<&str> = dashboard["actions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["verb"].as_str().unwrap())
        .collect();
    assert_eq!(verbs.iter().filter(|v| **v == "likes").count(), 1);
    assert!(verbs.contains(&"is following"));
    assert!(!verbs.contains(&"bookmarked image"));

    // Noah follows Mia, so only her actions show up
    let dashboard = body_json(&call(&store, Method::Get, "/dashboard/", Some(&noah), None));
    assert_eq!(dashboard["actions"][0]["verb"], "bookmarked image");
    assert_eq!(dashboard["actions"][0]["user"], "mia");

    let resp = call(
        &store,
        Method::Post,
        "/images/like/",
        Some(&noah),
        Some(json!({"id": id, "action": "unlike"})),
    );
    assert_eq!(body_json(&resp)["total_likes"], 0);
}

#[test]
fn test_image_list_pagination() {
    let store = MemoryStore::new();
    let (_, token) = signed_in(&store, "olga");
    for i in 0..10 {
        add_image(&store, &token, "images", &format!("Shot {}", i));
    }

    let resp = call(&store, Method::Get, "/images/", Some(&token), None);
    let page = body_json(&resp);
    assert_eq!(page["num_pages"], 2);
    assert_eq!(page["images"].as_array().unwrap().len(), 8);

    let resp = call(&store, Method::Get, "/images/?images_only=1&page=2", Some(&token), None);
    assert_eq!(body_json(&resp).as_array().unwrap().len(), 2);

    // Past the end, infinite scroll gets an empty body
    let resp = call(&store, Method::Get, "/images/?images_only=1&page=3", Some(&token), None);
    assert_eq!(status(&resp), 200);
    assert!(resp.body().is_empty());

    let resp = call(&store, Method::Get, "/images/?page=3", Some(&token), None);
    assert_eq!(body_json(&resp)["page"], 2);

    assert_eq!(status(&call(&store, Method::Get, "/images/", None, None)), 401);
}

#[test]
fn test_static_routes() {
    let store = MemoryStore::new();

    let resp = call(&store, Method::Get, "/", None, None);
    assert_eq!(status(&resp), 200);

    let resp = call(&store, Method::Get, "/bookmarklet.js", None, None);
    assert_eq!(status(&resp), 200);
    let script = String::from_utf8_lossy(resp.body()).to_string();
    assert!(!script.contains("SITE_URL"));

    assert_eq!(status(&call(&store, Method::Get, "/media/../secret", None, None)), 404);
    assert_eq!(status(&call(&store, Method::Get, "/nowhere/", None, None)), 404);
}
