use chrono::Utc;

use crate::auth::{create_user, RegistrationForm};
use crate::core::errors::ApiError;
use crate::core::helpers::next_id;
use crate::core::kv::Kv;
use crate::models::models::{Entry, EntryKind, Status};
use crate::users::find_user_by_username;

const DEMO_USERNAME: &str = "demo";

/// Creates the demo account with one published post and one published recipe.
/// Does nothing when the account already exists.
pub fn init_demo_data(store: &impl Kv) -> anyhow::Result<()> {
    if find_user_by_username(store, DEMO_USERNAME)?.is_some() {
        return Ok(());
    }

    let user = create_user(
        store,
        RegistrationForm {
            username: DEMO_USERNAME.to_string(),
            first_name: "Demo".to_string(),
            email: "demo@example.com".to_string(),
            password: "demo".to_string(),
            password2: "demo".to_string(),
        },
    )
    .map_err(|e: ApiError| anyhow::anyhow!("could not create demo user: {}", e))?;

    let samples = [
        (
            EntryKind::Post,
            "Welcome to the blog",
            "welcome-to-the-blog",
            "First post! Comments, sharing and search all work here.",
            vec!["news".to_string()],
        ),
        (
            EntryKind::Recipe,
            "Weeknight tomato pasta",
            "weeknight-tomato-pasta",
            "Simmer crushed tomatoes with garlic and olive oil, toss with pasta, finish with basil.",
            vec!["pasta".to_string(), "quick".to_string()],
        ),
    ];

    for (kind, title, slug, body, tags) in samples {
        let now = Utc::now();
        let entry = Entry {
            id: next_id(store, kind.prefix())?,
            kind,
            title: title.to_string(),
            slug: slug.to_string(),
            author_id: user.id.clone(),
            body: body.to_string(),
            publish: now,
            created: now,
            updated: now,
            status: Status::Published,
            tags,
        };
        store.set_json(&kind.entry_key(entry.id), &entry)?;

        let mut ids: Vec<u64> = store.get_json(&kind.list_key())?.unwrap_or_default();
        ids.insert(0, entry.id);
        store.set_json(&kind.list_key(), &ids)?;
    }

    tracing::info!(user_id = %user.id, "seeded demo data");
    Ok(())
}
