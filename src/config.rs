fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

pub fn token_expiration_hours() -> i64 {
    env_or("SOCIAL_TOKEN_EXPIRATION_HOURS", 24)
}

pub fn password_reset_hours() -> i64 {
    env_or("SOCIAL_PASSWORD_RESET_HOURS", 72)
}

/// Absolute origin used for feed links, the sitemap and the bookmarklet.
pub fn site_url() -> String {
    std::env::var("SOCIAL_SITE_URL")
        .map(|v| v.trim_end_matches('/').to_string())
        .unwrap_or_else(|_| "http://127.0.0.1:3000".to_string())
}

pub fn bind_addr() -> String {
    std::env::var("SOCIAL_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string())
}

pub fn seed_demo_data() -> bool {
    env_or("SOCIAL_SEED_DEMO", false)
}

pub fn log_filter() -> String {
    std::env::var("SOCIAL_LOG").unwrap_or_else(|_| "social_plus=info".to_string())
}

// === Limits ===
pub const MAX_USERNAME_LENGTH: usize = 150;
pub const MAX_NAME_LENGTH: usize = 150;
pub const MAX_EMAIL_LENGTH: usize = 254;
pub const MIN_PASSWORD_LENGTH: usize = 3;
pub const MAX_TITLE_LENGTH: usize = 250;
pub const MAX_SLUG_LENGTH: usize = 250;
pub const MAX_COMMENT_NAME_LENGTH: usize = 80;
pub const MAX_SHARE_NAME_LENGTH: usize = 25;
pub const MAX_IMAGE_TITLE_LENGTH: usize = 200;
pub const MAX_IMAGE_URL_LENGTH: usize = 2000;
pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;
pub const VALID_IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

pub const ENTRIES_PER_PAGE: usize = 3;
pub const IMAGES_PER_PAGE: usize = 8;
pub const FEED_SIZE: usize = 5;
pub const FEED_DESCRIPTION_WORDS: usize = 30;
pub const RANKING_SIZE: usize = 10;
pub const DASHBOARD_ACTIONS: usize = 10;
pub const ACTION_DEDUP_SECONDS: i64 = 60;
pub const SEARCH_TITLE_WEIGHT: f64 = 1.0;
pub const SEARCH_BODY_WEIGHT: f64 = 0.4;
pub const SEARCH_MIN_RANK: f64 = 0.3;

// === Key layout ===
pub const USERS_LIST_KEY: &str = "users_list";
pub const TOKENS_LIST_KEY: &str = "tokens_list";
pub const ACTIONS_LIST_KEY: &str = "actions_list";

pub fn user_key(id: &str) -> String {
    format!("user:{}", id)
}

pub fn profile_key(user_id: &str) -> String {
    format!("profile:{}", user_id)
}

pub fn token_key(token: &str) -> String {
    format!("token:{}", token)
}

pub fn reset_key(token: &str) -> String {
    format!("reset:{}", token)
}

pub fn followings_key(user_id: &str) -> String {
    format!("followings:{}", user_id)
}

pub fn action_key(id: u64) -> String {
    format!("action:{}", id)
}

pub fn sequence_key(name: &str) -> String {
    format!("seq:{}", name)
}

pub fn media_key(path: &str) -> String {
    format!("media:{}", path)
}
