use rusqlite::Row;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub full_name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub score: Option<i64>,
}

impl User {
    /// Columns: id, full_name, phone, address, score.
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            full_name: row.get(1)?,
            phone: row.get(2)?,
            address: row.get(3)?,
            score: row.get(4)?,
        })
    }
}

/// A validated user ready to insert; what the create endpoint echoes back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub full_name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub score: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: i64,
    pub bio: Option<String>,
    pub user_id: i64,
}

impl Profile {
    /// Columns: id, bio, user_id.
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            bio: row.get(1)?,
            user_id: row.get(2)?,
        })
    }
}

/// One row of the profile listing: profile columns joined with the owning
/// user's name and address. The profile side may be entirely NULL, since
/// the join keeps users that have no profile.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileWithOwner {
    pub id: Option<i64>,
    pub bio: Option<String>,
    pub user_id: Option<i64>,
    pub full_name: String,
    pub address: Option<String>,
}

impl ProfileWithOwner {
    /// Columns: profile id, bio, user_id, then full_name, address.
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            bio: row.get(1)?,
            user_id: row.get(2)?,
            full_name: row.get(3)?,
            address: row.get(4)?,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PostWithAuthor {
    pub id: i64,
    pub text: String,
    pub author_id: i64,
    pub author: User,
}

impl PostWithAuthor {
    /// Columns: post id, text, author_id, then the author's user columns.
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            text: row.get(1)?,
            author_id: row.get(2)?,
            author: User {
                id: row.get(3)?,
                full_name: row.get(4)?,
                phone: row.get(5)?,
                address: row.get(6)?,
                score: row.get(7)?,
            },
        })
    }
}

/// Category rows are only ever projected down to their name on this
/// surface; join-table columns never appear in responses.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryName {
    pub name: Option<String>,
}

/// A post with author and category names attached, for the single-post
/// detail endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct PostDetail {
    pub id: i64,
    pub text: String,
    pub author_id: i64,
    pub author: User,
    pub categories: Vec<CategoryName>,
}

/// A post as it appears inside a user aggregate: no author nesting (the
/// aggregate's root user is the author), categories attached.
#[derive(Debug, Clone, Serialize)]
pub struct PostWithCategories {
    pub id: i64,
    pub text: String,
    pub author_id: i64,
    pub categories: Vec<CategoryName>,
}

/// One row of the many-to-many join table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostCategory {
    pub post_id: i64,
    pub category_id: i64,
}

/// A user with every relation attached: the signup response payload.
#[derive(Debug, Clone, Serialize)]
pub struct UserGraph {
    pub id: i64,
    pub full_name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub score: Option<i64>,
    pub profile: Option<Profile>,
    pub posts: Vec<PostWithCategories>,
}
