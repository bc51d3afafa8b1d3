// Repository module - every SQL statement the API issues lives here.
use rusqlite::{params, Connection, OptionalExtension};

use crate::db::models::{
    CategoryName, NewUser, PostCategory, PostDetail, PostWithAuthor, PostWithCategories, Profile,
    ProfileWithOwner, User, UserGraph,
};
use crate::error::ApiError;
use crate::state::DbPool;

// Canned values for the walkthrough signup.
const DEMO_NAME: &str = "John Doe";
const DEMO_PHONE: &str = "555-0100";
const DEMO_SCORE: i64 = 80;
const DEMO_BIO: &str = "Just signed up";
const DEMO_STARTER_POSTS: [&str; 3] = ["First post", "Second post", "Third post"];
const DEMO_LINKED_POSTS: [&str; 2] = ["Fourth post", "Fifth post"];
const DEMO_CATEGORIES: [&str; 2] = ["Tech", "Travel"];

// -- Reads --

pub fn list_users(pool: &DbPool) -> Result<Vec<User>, ApiError> {
    let conn = pool.get()?;
    let mut stmt =
        conn.prepare("SELECT id, full_name, phone, address, score FROM users ORDER BY id")?;
    let users = stmt
        .query_map([], User::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(users)
}

/// The fixed showcase filter: id at least 5, and either a score above 70
/// or a name containing an "e". Rows with a NULL score only match through
/// the name clause.
pub fn filtered_users(pool: &DbPool) -> Result<Vec<User>, ApiError> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(
        "SELECT id, full_name, phone, address, score FROM users
         WHERE id >= 5 AND (score > 70 OR full_name LIKE '%e%')
         ORDER BY id",
    )?;
    let users = stmt
        .query_map([], User::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(users)
}

pub fn users_by_id(pool: &DbPool, id: i64) -> Result<Vec<User>, ApiError> {
    let conn = pool.get()?;
    let mut stmt =
        conn.prepare("SELECT id, full_name, phone, address, score FROM users WHERE id = ?1")?;
    let users = stmt
        .query_map(params![id], User::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(users)
}

/// Profiles joined to their owners, restricted to users without an
/// address. The left outer join keeps users that have no profile; their
/// profile columns come back NULL.
pub fn profiles_without_address(pool: &DbPool) -> Result<Vec<ProfileWithOwner>, ApiError> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(
        "SELECT p.id, p.bio, p.user_id, u.full_name, u.address
         FROM users u
         LEFT OUTER JOIN profiles p ON p.user_id = u.id
         WHERE u.address IS NULL
         ORDER BY u.id",
    )?;
    let profiles = stmt
        .query_map([], ProfileWithOwner::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(profiles)
}

/// The first post in storage order, author attached.
pub fn first_post_with_author(pool: &DbPool) -> Result<Option<PostWithAuthor>, ApiError> {
    let conn = pool.get()?;
    let post = conn
        .query_row(
            "SELECT p.id, p.text, p.author_id, u.id, u.full_name, u.phone, u.address, u.score
             FROM posts p
             JOIN users u ON u.id = p.author_id
             ORDER BY p.id LIMIT 1",
            [],
            PostWithAuthor::from_row,
        )
        .optional()?;
    Ok(post)
}

/// The given author's first post in storage order.
pub fn author_first_post(pool: &DbPool, author_id: i64) -> Result<Option<PostWithAuthor>, ApiError> {
    let conn = pool.get()?;
    let post = conn
        .query_row(
            "SELECT p.id, p.text, p.author_id, u.id, u.full_name, u.phone, u.address, u.score
             FROM posts p
             JOIN users u ON u.id = p.author_id
             WHERE p.author_id = ?1
             ORDER BY p.id LIMIT 1",
            params![author_id],
            PostWithAuthor::from_row,
        )
        .optional()?;
    Ok(post)
}

/// The first post in storage order with author and category names.
pub fn first_post_detail(pool: &DbPool) -> Result<Option<PostDetail>, ApiError> {
    let conn = pool.get()?;
    let post = conn
        .query_row(
            "SELECT p.id, p.text, p.author_id, u.id, u.full_name, u.phone, u.address, u.score
             FROM posts p
             JOIN users u ON u.id = p.author_id
             ORDER BY p.id LIMIT 1",
            [],
            PostWithAuthor::from_row,
        )
        .optional()?;
    let Some(post) = post else {
        return Ok(None);
    };
    Ok(Some(attach_categories(&conn, post)?))
}

/// A specific post of a specific author, with author and category names.
pub fn post_detail_for_author(
    pool: &DbPool,
    post_id: i64,
    author_id: i64,
) -> Result<Option<PostDetail>, ApiError> {
    let conn = pool.get()?;
    let post = conn
        .query_row(
            "SELECT p.id, p.text, p.author_id, u.id, u.full_name, u.phone, u.address, u.score
             FROM posts p
             JOIN users u ON u.id = p.author_id
             WHERE p.id = ?1 AND p.author_id = ?2",
            params![post_id, author_id],
            PostWithAuthor::from_row,
        )
        .optional()?;
    let Some(post) = post else {
        return Ok(None);
    };
    Ok(Some(attach_categories(&conn, post)?))
}

fn attach_categories(conn: &Connection, post: PostWithAuthor) -> Result<PostDetail, ApiError> {
    let categories = category_names_on(conn, post.id)?;
    Ok(PostDetail {
        id: post.id,
        text: post.text,
        author_id: post.author_id,
        author: post.author,
        categories,
    })
}

fn category_names_on(conn: &Connection, post_id: i64) -> Result<Vec<CategoryName>, ApiError> {
    let mut stmt = conn.prepare(
        "SELECT c.name
         FROM posts_to_categories pc
         JOIN categories c ON c.id = pc.category_id
         WHERE pc.post_id = ?1
         ORDER BY c.id",
    )?;
    let names = stmt
        .query_map(params![post_id], |row| {
            Ok(CategoryName { name: row.get(0)? })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(names)
}

/// Load a user with profile and posts, each post carrying its category
/// names. Returns None for an unknown id.
pub fn user_graph(pool: &DbPool, user_id: i64) -> Result<Option<UserGraph>, ApiError> {
    let conn = pool.get()?;
    user_graph_on(&conn, user_id)
}

fn user_graph_on(conn: &Connection, user_id: i64) -> Result<Option<UserGraph>, ApiError> {
    let user = conn
        .query_row(
            "SELECT id, full_name, phone, address, score FROM users WHERE id = ?1",
            params![user_id],
            User::from_row,
        )
        .optional()?;
    let Some(user) = user else {
        return Ok(None);
    };

    // One profile per user by convention; take the first if several exist.
    let profile = conn
        .query_row(
            "SELECT id, bio, user_id FROM profiles WHERE user_id = ?1 ORDER BY id LIMIT 1",
            params![user_id],
            Profile::from_row,
        )
        .optional()?;

    let mut stmt =
        conn.prepare("SELECT id, text, author_id FROM posts WHERE author_id = ?1 ORDER BY id")?;
    let post_rows = stmt
        .query_map(params![user_id], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut posts = Vec::with_capacity(post_rows.len());
    for (id, text, author_id) in post_rows {
        let categories = category_names_on(conn, id)?;
        posts.push(PostWithCategories {
            id,
            text,
            author_id,
            categories,
        });
    }

    Ok(Some(UserGraph {
        id: user.id,
        full_name: user.full_name,
        phone: user.phone,
        address: user.address,
        score: user.score,
        profile,
        posts,
    }))
}

// -- Writes --

pub fn insert_user(pool: &DbPool, user: &NewUser) -> Result<i64, ApiError> {
    let conn = pool.get()?;
    Ok(insert_user_on(&conn, user)?)
}

pub fn insert_profile(pool: &DbPool, user_id: i64, bio: &str) -> Result<i64, ApiError> {
    let conn = pool.get()?;
    Ok(insert_profile_on(&conn, user_id, bio)?)
}

fn insert_user_on(conn: &Connection, user: &NewUser) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO users (full_name, phone, address, score) VALUES (?1, ?2, ?3, ?4)",
        params![user.full_name, user.phone, user.address, user.score],
    )?;
    Ok(conn.last_insert_rowid())
}

fn insert_profile_on(conn: &Connection, user_id: i64, bio: &str) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO profiles (bio, user_id) VALUES (?1, ?2)",
        params![bio, user_id],
    )?;
    Ok(conn.last_insert_rowid())
}

fn insert_post_on(conn: &Connection, author_id: i64, text: &str) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO posts (text, author_id) VALUES (?1, ?2)",
        params![text, author_id],
    )?;
    Ok(conn.last_insert_rowid())
}

// -- The signup sequence --

/// Create the canned demo graph: one user, one profile, three starter
/// posts, two categories, two more posts crossed with both categories,
/// then read the whole thing back.
///
/// With `atomic` off, every statement is an independent call with no
/// rollback, and the starter posts are inserted by detached tasks that no
/// one waits for: the returned graph can miss some of them, and a failed
/// step leaves the earlier rows behind. With `atomic` on, the sequence
/// runs inside a single transaction and the starter posts are serialized
/// into it.
pub fn demo_signup(pool: &DbPool, atomic: bool) -> Result<UserGraph, ApiError> {
    if atomic {
        signup_atomic(pool)
    } else {
        signup_independent(pool)
    }
}

fn demo_user() -> NewUser {
    NewUser {
        full_name: DEMO_NAME.to_string(),
        phone: Some(DEMO_PHONE.to_string()),
        address: None,
        score: Some(DEMO_SCORE),
    }
}

/// Every post crossed with every category.
fn cross_links(post_ids: &[i64], category_ids: &[i64]) -> Vec<PostCategory> {
    let mut links = Vec::with_capacity(post_ids.len() * category_ids.len());
    for &post_id in post_ids {
        for &category_id in category_ids {
            links.push(PostCategory {
                post_id,
                category_id,
            });
        }
    }
    links
}

/// Insert the starter posts on detached tasks. Nothing joins these: the
/// caller can finish before some or all of them land, and a failed insert
/// is only logged. Needs a tokio runtime to be current.
fn spawn_starter_posts(pool: &DbPool, author_id: i64) {
    for text in DEMO_STARTER_POSTS {
        let pool = pool.clone();
        tokio::task::spawn_blocking(move || match pool.get() {
            Ok(conn) => {
                if let Err(e) = insert_post_on(&conn, author_id, text) {
                    tracing::warn!("Starter post insert failed: {}", e);
                }
            }
            Err(e) => tracing::warn!("Starter post insert could not get a connection: {}", e),
        });
    }
}

fn signup_independent(pool: &DbPool) -> Result<UserGraph, ApiError> {
    let conn = pool.get()?;

    let user_id = insert_user_on(&conn, &demo_user())?;
    insert_profile_on(&conn, user_id, DEMO_BIO)?;

    spawn_starter_posts(pool, user_id);

    let mut category_ids = Vec::with_capacity(DEMO_CATEGORIES.len());
    for name in DEMO_CATEGORIES {
        conn.execute("INSERT INTO categories (name) VALUES (?1)", params![name])?;
        category_ids.push(conn.last_insert_rowid());
    }

    let mut post_ids = Vec::with_capacity(DEMO_LINKED_POSTS.len());
    for text in DEMO_LINKED_POSTS {
        post_ids.push(insert_post_on(&conn, user_id, text)?);
    }

    for link in cross_links(&post_ids, &category_ids) {
        conn.execute(
            "INSERT INTO posts_to_categories (post_id, category_id) VALUES (?1, ?2)",
            params![link.post_id, link.category_id],
        )?;
    }

    drop(conn);
    user_graph(pool, user_id)?.ok_or(ApiError::InvalidData)
}

fn signup_atomic(pool: &DbPool) -> Result<UserGraph, ApiError> {
    let conn = pool.get()?;

    conn.execute("BEGIN IMMEDIATE", [])?;

    let result: Result<UserGraph, ApiError> = (|| {
        let user_id = insert_user_on(&conn, &demo_user())?;
        insert_profile_on(&conn, user_id, DEMO_BIO)?;

        for text in DEMO_STARTER_POSTS {
            insert_post_on(&conn, user_id, text)?;
        }

        let mut category_ids = Vec::with_capacity(DEMO_CATEGORIES.len());
        for name in DEMO_CATEGORIES {
            conn.execute("INSERT INTO categories (name) VALUES (?1)", params![name])?;
            category_ids.push(conn.last_insert_rowid());
        }

        let mut post_ids = Vec::with_capacity(DEMO_LINKED_POSTS.len());
        for text in DEMO_LINKED_POSTS {
            post_ids.push(insert_post_on(&conn, user_id, text)?);
        }

        for link in cross_links(&post_ids, &category_ids) {
            conn.execute(
                "INSERT INTO posts_to_categories (post_id, category_id) VALUES (?1, ?2)",
                params![link.post_id, link.category_id],
            )?;
        }

        user_graph_on(&conn, user_id)?.ok_or(ApiError::InvalidData)
    })();

    match result {
        Ok(graph) => {
            conn.execute("COMMIT", [])?;
            Ok(graph)
        }
        Err(e) => {
            conn.execute("ROLLBACK", [])?;
            Err(e)
        }
    }
}
