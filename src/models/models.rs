use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct User {
    pub id: String,
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    pub date_joined: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Profile {
    pub user_id: String,
    pub date_of_birth: Option<NaiveDate>,
    pub photo: Option<String>,
}

#[derive(Serialize, Deserialize)]
pub struct TokenData {
    pub user_id: String,
    pub created_at: String,
}

#[derive(Serialize, Deserialize)]
pub struct ResetToken {
    pub user_id: String,
    pub created_at: String,
}

/// Which blog collection an entry or comment belongs to.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Post,
    Recipe,
}

impl EntryKind {
    pub const ALL: [EntryKind; 2] = [EntryKind::Post, EntryKind::Recipe];

    pub fn from_segment(segment: &str) -> Option<Self> {
        match segment {
            "posts" => Some(EntryKind::Post),
            "recipes" => Some(EntryKind::Recipe),
            _ => None,
        }
    }

    pub fn segment(self) -> &'static str {
        match self {
            EntryKind::Post => "posts",
            EntryKind::Recipe => "recipes",
        }
    }

    pub fn prefix(self) -> &'static str {
        match self {
            EntryKind::Post => "post",
            EntryKind::Recipe => "recipe",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            EntryKind::Post => "Posts",
            EntryKind::Recipe => "Recipes",
        }
    }

    pub fn entry_key(self, id: u64) -> String {
        format!("{}:{}", self.prefix(), id)
    }

    pub fn list_key(self) -> String {
        format!("{}s_list", self.prefix())
    }

    pub fn comment_key(self, id: u64) -> String {
        format!("{}_comment:{}", self.prefix(), id)
    }

    pub fn comments_list_key(self, entry_id: u64) -> String {
        format!("{}_comments:{}", self.prefix(), entry_id)
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Status {
    #[default]
    #[serde(rename = "DF")]
    Draft,
    #[serde(rename = "PB")]
    Published,
}

/// A post or a recipe.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Entry {
    pub id: u64,
    pub kind: EntryKind,
    pub title: String,
    pub slug: String,
    pub author_id: String,
    pub body: String,
    pub publish: DateTime<Utc>,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    pub status: Status,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Entry {
    pub fn is_published(&self) -> bool {
        self.status == Status::Published
    }

    pub fn get_absolute_url(&self) -> String {
        format!(
            "/blog/{}/{}/{}/{}/{}/",
            self.kind.segment(),
            self.publish.year(),
            self.publish.month(),
            self.publish.day(),
            self.slug
        )
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Comment {
    pub id: u64,
    pub kind: EntryKind,
    pub entry_id: u64,
    pub name: String,
    pub email: String,
    pub body: String,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    pub active: bool,
    pub rating: u8,
}

/// Which bookmark collection an image belongs to.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ImageKind {
    Image,
    RecipeImage,
}

impl ImageKind {
    pub fn from_segment(segment: &str) -> Option<Self> {
        match segment {
            "images" => Some(ImageKind::Image),
            "recipe-images" => Some(ImageKind::RecipeImage),
            _ => None,
        }
    }

    pub fn segment(self) -> &'static str {
        match self {
            ImageKind::Image => "images",
            ImageKind::RecipeImage => "recipe-images",
        }
    }

    pub fn prefix(self) -> &'static str {
        match self {
            ImageKind::Image => "image",
            ImageKind::RecipeImage => "recipe_image",
        }
    }

    pub fn image_key(self, id: u64) -> String {
        format!("{}:{}", self.prefix(), id)
    }

    pub fn list_key(self) -> String {
        format!("{}s_list", self.prefix())
    }

    pub fn views_key(self, id: u64) -> String {
        format!("{}:{}:views", self.prefix(), id)
    }

    pub fn ranking_key(self) -> String {
        format!("{}_ranking", self.prefix())
    }

    /// Upload directory for downloaded files, before the date components.
    pub fn upload_dir(self) -> &'static str {
        match self {
            ImageKind::Image => "images",
            ImageKind::RecipeImage => "recipe_images",
        }
    }
}

/// A bookmarked image or recipe image.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Bookmark {
    pub id: u64,
    pub kind: ImageKind,
    pub user_id: String,
    pub title: String,
    pub slug: String,
    pub url: String,
    pub file: String,
    #[serde(default)]
    pub description: String,
    pub created: DateTime<Utc>,
    pub total_likes: u32,
    #[serde(default)]
    pub users_like: Vec<String>,
}

impl Bookmark {
    pub fn get_absolute_url(&self) -> String {
        format!("/{}/detail/{}/{}/", self.kind.segment(), self.id, self.slug)
    }
}

/// Object an activity refers to.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Target {
    User { id: String },
    Bookmark { kind: ImageKind, id: u64 },
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Action {
    pub id: u64,
    pub user_id: String,
    pub verb: String,
    pub target: Option<Target>,
    pub created: DateTime<Utc>,
}

pub type Followings = Vec<String>;
