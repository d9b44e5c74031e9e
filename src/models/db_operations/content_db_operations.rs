use super::{json_column, like_pattern, StoreError, StoreResult};
use crate::helper::slug_helpers::{slugify, unique_slug};
use crate::models::{
    whatsapp_url, ContactInfo, ContactInfoDraft, FeedDraft, FeedItem, GalleryDraft, GalleryItem, News,
    NewsDraft, Partner, PartnerDraft, Profile, ProfileDraft, Project, ProjectDraft, SiteSettings,
    SiteSettingsDraft, Skill, SkillDraft, SocialLink, SocialLinkDraft,
};
use chrono::Utc;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Params, Row};
use std::collections::HashSet;

/// Every table the back office can address generically (counts, deletes,
/// bulk flag updates). Names never come from user input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Profiles,
    Projects,
    Skills,
    News,
    Partners,
    GalleryItems,
    FeedItems,
    NewsletterSubscribers,
    ContactMessages,
    SocialLinks,
    ContactInfo,
    SiteSettings,
}

impl Table {
    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Profiles => "profiles",
            Table::Projects => "projects",
            Table::Skills => "skills",
            Table::News => "news",
            Table::Partners => "partners",
            Table::GalleryItems => "gallery_items",
            Table::FeedItems => "feed_items",
            Table::NewsletterSubscribers => "newsletter_subscribers",
            Table::ContactMessages => "contact_messages",
            Table::SocialLinks => "social_links",
            Table::ContactInfo => "contact_info",
            Table::SiteSettings => "site_settings",
        }
    }
}

/// SQLite treats a negative LIMIT as "no limit".
fn sql_limit(limit: Option<u32>) -> i64 {
    limit.map(i64::from).unwrap_or(-1)
}

fn query_list<T, P: Params>(
    conn: &Connection,
    sql: &str,
    params: P,
    map: fn(&Row<'_>) -> rusqlite::Result<T>,
) -> StoreResult<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, map)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

fn query_one<T, P: Params>(
    conn: &Connection,
    sql: &str,
    params: P,
    map: fn(&Row<'_>) -> rusqlite::Result<T>,
) -> StoreResult<Option<T>> {
    Ok(conn.query_row(sql, params, map).optional()?)
}

fn ensure_updated(changed: usize, what: &str, id: i64) -> StoreResult<()> {
    if changed == 0 {
        return Err(StoreError::NotFound(format!("{} {}", what, id)));
    }
    Ok(())
}

// ====================================================================
// ========================= GENERIC HELPERS ==========================
// ====================================================================

pub fn count_rows(conn: &Connection, table: Table) -> StoreResult<i64> {
    let sql = format!("SELECT COUNT(*) FROM {}", table.as_str());
    Ok(conn.query_row(&sql, [], |row| row.get(0))?)
}

pub fn delete_row(conn: &Connection, table: Table, id: i64) -> StoreResult<usize> {
    let sql = format!("DELETE FROM {} WHERE id = ?1", table.as_str());
    Ok(conn.execute(&sql, [id])?)
}

/// Sets a boolean column on every selected row inside one transaction and
/// returns how many rows were addressed. Running it twice is harmless.
pub fn set_flag(
    conn: &mut Connection,
    table: Table,
    column: &'static str,
    ids: &[i64],
    value: bool,
) -> StoreResult<usize> {
    let mut ids = ids.to_vec();
    ids.sort_unstable();
    ids.dedup();

    let tx = conn.transaction()?;
    let mut affected = 0;
    {
        let sql = format!("UPDATE {} SET {} = ?1 WHERE id = ?2", table.as_str(), column);
        let mut stmt = tx.prepare(&sql)?;
        for id in &ids {
            affected += stmt.execute(params![value, id])?;
        }
    }
    tx.commit()?;
    Ok(affected)
}

/// Ids of the rows where any of `search_columns` contains `query`
/// (case-insensitive for ASCII) and every `(column, value)` condition holds.
/// An empty query skips the text match. Column names come from static
/// resource tables.
pub fn matching_ids(
    conn: &Connection,
    table: Table,
    search_columns: &[&'static str],
    query: &str,
    conditions: &[(&'static str, Value)],
) -> StoreResult<HashSet<i64>> {
    let mut clauses = Vec::new();
    let mut values = Vec::new();

    if !query.is_empty() && !search_columns.is_empty() {
        values.push(Value::Text(like_pattern(query)));
        let any = search_columns
            .iter()
            .map(|column| format!("{} LIKE ?1 ESCAPE '\\'", column))
            .collect::<Vec<_>>()
            .join(" OR ");
        clauses.push(format!("({})", any));
    }
    for (column, value) in conditions {
        values.push(value.clone());
        clauses.push(format!("{} = ?{}", column, values.len()));
    }

    let mut sql = format!("SELECT id FROM {}", table.as_str());
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
    let mut stmt = conn.prepare(&sql)?;
    let ids = stmt.query_map(params_from_iter(values), |row| row.get(0))?;
    Ok(ids.collect::<Result<HashSet<_>, _>>()?)
}

fn slug_taken(conn: &Connection, table: Table, slug: &str) -> rusqlite::Result<bool> {
    let sql = format!("SELECT EXISTS(SELECT 1 FROM {} WHERE slug = ?1)", table.as_str());
    conn.query_row(&sql, [slug], |row| row.get(0))
}

/// Resolves the slug for a new row: an explicit one is normalized and used as
/// is, otherwise a free one is derived from the title.
fn slug_for_insert(conn: &Connection, table: Table, explicit: Option<&str>, title: &str) -> StoreResult<String> {
    match explicit.map(slugify).filter(|s| !s.is_empty()) {
        Some(slug) => Ok(slug),
        None => Ok(unique_slug(title, |candidate| slug_taken(conn, table, candidate))?),
    }
}

// ====================================================================
// ============================= PROFILE ==============================
// ====================================================================

const PROFILE_COLUMNS: &str = "id, last_name, first_name, handle, title, bio, photo, created_at, updated_at";

fn profile_from_row(row: &Row<'_>) -> rusqlite::Result<Profile> {
    Ok(Profile {
        id: row.get(0)?,
        last_name: row.get(1)?,
        first_name: row.get(2)?,
        handle: row.get(3)?,
        title: row.get(4)?,
        bio: row.get(5)?,
        photo: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

/// The profile every page is built around: the oldest one.
pub fn read_primary_profile(conn: &Connection) -> StoreResult<Option<Profile>> {
    let sql = format!("SELECT {} FROM profiles ORDER BY id LIMIT 1", PROFILE_COLUMNS);
    query_one(conn, &sql, [], profile_from_row)
}

pub fn list_profiles(conn: &Connection) -> StoreResult<Vec<Profile>> {
    let sql = format!("SELECT {} FROM profiles ORDER BY id", PROFILE_COLUMNS);
    query_list(conn, &sql, [], profile_from_row)
}

pub fn read_profile(conn: &Connection, id: i64) -> StoreResult<Option<Profile>> {
    let sql = format!("SELECT {} FROM profiles WHERE id = ?1", PROFILE_COLUMNS);
    query_one(conn, &sql, [id], profile_from_row)
}

pub fn create_profile(conn: &Connection, draft: &ProfileDraft) -> StoreResult<i64> {
    let now = Utc::now();
    conn.execute(
        "INSERT INTO profiles (last_name, first_name, handle, title, bio, photo, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
        params![draft.last_name, draft.first_name, draft.handle, draft.title, draft.bio, draft.photo, now],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn update_profile(conn: &Connection, id: i64, draft: &ProfileDraft) -> StoreResult<()> {
    let changed = conn.execute(
        "UPDATE profiles SET last_name = ?1, first_name = ?2, handle = ?3, title = ?4, bio = ?5, photo = ?6, updated_at = ?7
         WHERE id = ?8",
        params![draft.last_name, draft.first_name, draft.handle, draft.title, draft.bio, draft.photo, Utc::now(), id],
    )?;
    ensure_updated(changed, "profile", id)
}

// ====================================================================
// ============================= PROJECTS =============================
// ====================================================================

const PROJECT_COLUMNS: &str = "id, title, slug, short_description, description, image, status, technologies, \
     display_order, featured, demo_url, repo_url, created_at, updated_at";

fn project_from_row(row: &Row<'_>) -> rusqlite::Result<Project> {
    let technologies: String = row.get(7)?;
    Ok(Project {
        id: row.get(0)?,
        title: row.get(1)?,
        slug: row.get(2)?,
        short_description: row.get(3)?,
        description: row.get(4)?,
        image: row.get(5)?,
        status: row.get(6)?,
        technologies: json_column(7, &technologies)?,
        display_order: row.get(8)?,
        featured: row.get(9)?,
        demo_url: row.get(10)?,
        repo_url: row.get(11)?,
        created_at: row.get(12)?,
        updated_at: row.get(13)?,
    })
}

/// Featured projects by display order. `None` returns all of them.
pub fn list_featured_projects(conn: &Connection, limit: Option<u32>) -> StoreResult<Vec<Project>> {
    let sql = format!(
        "SELECT {} FROM projects WHERE featured = 1 ORDER BY display_order ASC, id ASC LIMIT ?1",
        PROJECT_COLUMNS
    );
    query_list(conn, &sql, [sql_limit(limit)], project_from_row)
}

/// Full listing order: display order, then newest first.
pub fn list_projects(conn: &Connection, limit: u32, offset: u32) -> StoreResult<Vec<Project>> {
    let sql = format!(
        "SELECT {} FROM projects ORDER BY display_order ASC, created_at DESC, id DESC LIMIT ?1 OFFSET ?2",
        PROJECT_COLUMNS
    );
    query_list(conn, &sql, params![limit, offset], project_from_row)
}

pub fn list_all_projects(conn: &Connection) -> StoreResult<Vec<Project>> {
    let sql = format!(
        "SELECT {} FROM projects ORDER BY display_order ASC, created_at DESC, id DESC",
        PROJECT_COLUMNS
    );
    query_list(conn, &sql, [], project_from_row)
}

pub fn read_project(conn: &Connection, id: i64) -> StoreResult<Option<Project>> {
    let sql = format!("SELECT {} FROM projects WHERE id = ?1", PROJECT_COLUMNS);
    query_one(conn, &sql, [id], project_from_row)
}

pub fn read_project_by_slug(conn: &Connection, slug: &str) -> StoreResult<Option<Project>> {
    let sql = format!("SELECT {} FROM projects WHERE slug = ?1", PROJECT_COLUMNS);
    query_one(conn, &sql, [slug], project_from_row)
}

pub fn list_similar_projects(conn: &Connection, exclude_id: i64, limit: u32) -> StoreResult<Vec<Project>> {
    let sql = format!(
        "SELECT {} FROM projects WHERE featured = 1 AND id != ?1 ORDER BY display_order ASC, id ASC LIMIT ?2",
        PROJECT_COLUMNS
    );
    query_list(conn, &sql, params![exclude_id, limit], project_from_row)
}

pub fn search_projects(conn: &Connection, query: &str, limit: u32) -> StoreResult<Vec<Project>> {
    let sql = format!(
        "SELECT {} FROM projects WHERE title LIKE ?1 ESCAPE '\\' ORDER BY display_order ASC, id ASC LIMIT ?2",
        PROJECT_COLUMNS
    );
    query_list(conn, &sql, params![like_pattern(query), limit], project_from_row)
}

pub fn create_project(conn: &Connection, draft: &ProjectDraft) -> StoreResult<i64> {
    let slug = slug_for_insert(conn, Table::Projects, draft.slug.as_deref(), &draft.title)?;
    let technologies = serde_json::to_string(&draft.technologies)?;
    let now = Utc::now();
    conn.execute(
        "INSERT INTO projects (title, slug, short_description, description, image, status, technologies,
                               display_order, featured, demo_url, repo_url, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?12)",
        params![
            draft.title,
            slug,
            draft.short_description,
            draft.description,
            draft.image,
            draft.status,
            technologies,
            draft.display_order,
            draft.featured,
            draft.demo_url,
            draft.repo_url,
            now
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Updates a project. The slug only changes when one is given explicitly.
pub fn update_project(conn: &Connection, id: i64, draft: &ProjectDraft) -> StoreResult<()> {
    let slug = draft.slug.as_deref().map(slugify).filter(|s| !s.is_empty());
    let technologies = serde_json::to_string(&draft.technologies)?;
    let changed = conn.execute(
        "UPDATE projects SET title = ?1, slug = COALESCE(?2, slug), short_description = ?3, description = ?4,
                image = ?5, status = ?6, technologies = ?7, display_order = ?8, featured = ?9,
                demo_url = ?10, repo_url = ?11, updated_at = ?12
         WHERE id = ?13",
        params![
            draft.title,
            slug,
            draft.short_description,
            draft.description,
            draft.image,
            draft.status,
            technologies,
            draft.display_order,
            draft.featured,
            draft.demo_url,
            draft.repo_url,
            Utc::now(),
            id
        ],
    )?;
    ensure_updated(changed, "project", id)
}

// ====================================================================
// ============================== SKILLS ==============================
// ====================================================================

const SKILL_COLUMNS: &str = "id, name, description, icon_class, display_order, created_at";

fn skill_from_row(row: &Row<'_>) -> rusqlite::Result<Skill> {
    Ok(Skill {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        icon_class: row.get(3)?,
        display_order: row.get(4)?,
        created_at: row.get(5)?,
    })
}

pub fn list_skills(conn: &Connection) -> StoreResult<Vec<Skill>> {
    let sql = format!("SELECT {} FROM skills ORDER BY display_order ASC, name ASC", SKILL_COLUMNS);
    query_list(conn, &sql, [], skill_from_row)
}

pub fn read_skill(conn: &Connection, id: i64) -> StoreResult<Option<Skill>> {
    let sql = format!("SELECT {} FROM skills WHERE id = ?1", SKILL_COLUMNS);
    query_one(conn, &sql, [id], skill_from_row)
}

pub fn create_skill(conn: &Connection, draft: &SkillDraft) -> StoreResult<i64> {
    conn.execute(
        "INSERT INTO skills (name, description, icon_class, display_order, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![draft.name, draft.description, draft.icon_class, draft.display_order, Utc::now()],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn update_skill(conn: &Connection, id: i64, draft: &SkillDraft) -> StoreResult<()> {
    let changed = conn.execute(
        "UPDATE skills SET name = ?1, description = ?2, icon_class = ?3, display_order = ?4 WHERE id = ?5",
        params![draft.name, draft.description, draft.icon_class, draft.display_order, id],
    )?;
    ensure_updated(changed, "skill", id)
}

// ====================================================================
// =============================== NEWS ===============================
// ====================================================================

const NEWS_COLUMNS: &str = "id, title, description, image, link, platform, published_at, display_order";

fn news_from_row(row: &Row<'_>) -> rusqlite::Result<News> {
    Ok(News {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        image: row.get(3)?,
        link: row.get(4)?,
        platform: row.get(5)?,
        published_at: row.get(6)?,
        display_order: row.get(7)?,
    })
}

pub fn list_news(conn: &Connection, limit: Option<u32>) -> StoreResult<Vec<News>> {
    let sql = format!(
        "SELECT {} FROM news ORDER BY display_order ASC, published_at DESC, id DESC LIMIT ?1",
        NEWS_COLUMNS
    );
    query_list(conn, &sql, [sql_limit(limit)], news_from_row)
}

pub fn search_news(conn: &Connection, query: &str, limit: u32) -> StoreResult<Vec<News>> {
    let sql = format!(
        "SELECT {} FROM news WHERE title LIKE ?1 ESCAPE '\\' ORDER BY display_order ASC, published_at DESC, id DESC LIMIT ?2",
        NEWS_COLUMNS
    );
    query_list(conn, &sql, params![like_pattern(query), limit], news_from_row)
}

pub fn read_news(conn: &Connection, id: i64) -> StoreResult<Option<News>> {
    let sql = format!("SELECT {} FROM news WHERE id = ?1", NEWS_COLUMNS);
    query_one(conn, &sql, [id], news_from_row)
}

pub fn create_news(conn: &Connection, draft: &NewsDraft) -> StoreResult<i64> {
    conn.execute(
        "INSERT INTO news (title, description, image, link, platform, published_at, display_order)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![draft.title, draft.description, draft.image, draft.link, draft.platform, Utc::now(), draft.display_order],
    )?;
    Ok(conn.last_insert_rowid())
}

/// `published_at` is fixed at creation and never touched here.
pub fn update_news(conn: &Connection, id: i64, draft: &NewsDraft) -> StoreResult<()> {
    let changed = conn.execute(
        "UPDATE news SET title = ?1, description = ?2, image = ?3, link = ?4, platform = ?5, display_order = ?6
         WHERE id = ?7",
        params![draft.title, draft.description, draft.image, draft.link, draft.platform, draft.display_order, id],
    )?;
    ensure_updated(changed, "news", id)
}

// ====================================================================
// ============================= PARTNERS =============================
// ====================================================================

const PARTNER_COLUMNS: &str = "id, name, logo, site_url, description, display_order, active, created_at";

fn partner_from_row(row: &Row<'_>) -> rusqlite::Result<Partner> {
    Ok(Partner {
        id: row.get(0)?,
        name: row.get(1)?,
        logo: row.get(2)?,
        site_url: row.get(3)?,
        description: row.get(4)?,
        display_order: row.get(5)?,
        active: row.get(6)?,
        created_at: row.get(7)?,
    })
}

pub fn list_active_partners(conn: &Connection) -> StoreResult<Vec<Partner>> {
    let sql = format!(
        "SELECT {} FROM partners WHERE active = 1 ORDER BY display_order ASC, name ASC",
        PARTNER_COLUMNS
    );
    query_list(conn, &sql, [], partner_from_row)
}

pub fn list_partners(conn: &Connection) -> StoreResult<Vec<Partner>> {
    let sql = format!("SELECT {} FROM partners ORDER BY display_order ASC, name ASC", PARTNER_COLUMNS);
    query_list(conn, &sql, [], partner_from_row)
}

pub fn read_partner(conn: &Connection, id: i64) -> StoreResult<Option<Partner>> {
    let sql = format!("SELECT {} FROM partners WHERE id = ?1", PARTNER_COLUMNS);
    query_one(conn, &sql, [id], partner_from_row)
}

pub fn create_partner(conn: &Connection, draft: &PartnerDraft) -> StoreResult<i64> {
    conn.execute(
        "INSERT INTO partners (name, logo, site_url, description, display_order, active, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![draft.name, draft.logo, draft.site_url, draft.description, draft.display_order, draft.active, Utc::now()],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn update_partner(conn: &Connection, id: i64, draft: &PartnerDraft) -> StoreResult<()> {
    let changed = conn.execute(
        "UPDATE partners SET name = ?1, logo = ?2, site_url = ?3, description = ?4, display_order = ?5, active = ?6
         WHERE id = ?7",
        params![draft.name, draft.logo, draft.site_url, draft.description, draft.display_order, draft.active, id],
    )?;
    ensure_updated(changed, "partner", id)
}

// ====================================================================
// ============================= GALLERY ==============================
// ====================================================================

const GALLERY_COLUMNS: &str = "id, image, title, slug, short_description, content, display_order, created_at";

fn gallery_from_row(row: &Row<'_>) -> rusqlite::Result<GalleryItem> {
    Ok(GalleryItem {
        id: row.get(0)?,
        image: row.get(1)?,
        title: row.get(2)?,
        slug: row.get(3)?,
        short_description: row.get(4)?,
        content: row.get(5)?,
        display_order: row.get(6)?,
        created_at: row.get(7)?,
    })
}

pub fn list_gallery(conn: &Connection, limit: Option<u32>) -> StoreResult<Vec<GalleryItem>> {
    list_gallery_page(conn, sql_limit(limit), 0)
}

pub fn list_gallery_paginated(conn: &Connection, limit: u32, offset: u32) -> StoreResult<Vec<GalleryItem>> {
    list_gallery_page(conn, i64::from(limit), offset)
}

fn list_gallery_page(conn: &Connection, limit: i64, offset: u32) -> StoreResult<Vec<GalleryItem>> {
    let sql = format!(
        "SELECT {} FROM gallery_items ORDER BY display_order ASC, created_at DESC, id DESC LIMIT ?1 OFFSET ?2",
        GALLERY_COLUMNS
    );
    query_list(conn, &sql, params![limit, offset], gallery_from_row)
}

pub fn read_gallery_item(conn: &Connection, id: i64) -> StoreResult<Option<GalleryItem>> {
    let sql = format!("SELECT {} FROM gallery_items WHERE id = ?1", GALLERY_COLUMNS);
    query_one(conn, &sql, [id], gallery_from_row)
}

pub fn read_gallery_item_by_slug(conn: &Connection, slug: &str) -> StoreResult<Option<GalleryItem>> {
    let sql = format!("SELECT {} FROM gallery_items WHERE slug = ?1", GALLERY_COLUMNS);
    query_one(conn, &sql, [slug], gallery_from_row)
}

pub fn list_similar_gallery_items(conn: &Connection, exclude_id: i64, limit: u32) -> StoreResult<Vec<GalleryItem>> {
    let sql = format!(
        "SELECT {} FROM gallery_items WHERE id != ?1 ORDER BY display_order ASC, id ASC LIMIT ?2",
        GALLERY_COLUMNS
    );
    query_list(conn, &sql, params![exclude_id, limit], gallery_from_row)
}

pub fn search_gallery(conn: &Connection, query: &str, limit: u32) -> StoreResult<Vec<GalleryItem>> {
    let sql = format!(
        "SELECT {} FROM gallery_items WHERE title LIKE ?1 ESCAPE '\\' ORDER BY display_order ASC, id ASC LIMIT ?2",
        GALLERY_COLUMNS
    );
    query_list(conn, &sql, params![like_pattern(query), limit], gallery_from_row)
}

pub fn create_gallery_item(conn: &Connection, draft: &GalleryDraft) -> StoreResult<i64> {
    let slug = slug_for_insert(conn, Table::GalleryItems, draft.slug.as_deref(), &draft.title)?;
    conn.execute(
        "INSERT INTO gallery_items (image, title, slug, short_description, content, display_order, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![draft.image, draft.title, slug, draft.short_description, draft.content, draft.display_order, Utc::now()],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn update_gallery_item(conn: &Connection, id: i64, draft: &GalleryDraft) -> StoreResult<()> {
    let slug = draft.slug.as_deref().map(slugify).filter(|s| !s.is_empty());
    let changed = conn.execute(
        "UPDATE gallery_items SET image = ?1, title = ?2, slug = COALESCE(?3, slug), short_description = ?4,
                content = ?5, display_order = ?6
         WHERE id = ?7",
        params![draft.image, draft.title, slug, draft.short_description, draft.content, draft.display_order, id],
    )?;
    ensure_updated(changed, "gallery item", id)
}

// ====================================================================
// =============================== FEED ===============================
// ====================================================================

const FEED_COLUMNS: &str = "id, image, alt_text, display_order, created_at";

fn feed_from_row(row: &Row<'_>) -> rusqlite::Result<FeedItem> {
    Ok(FeedItem {
        id: row.get(0)?,
        image: row.get(1)?,
        alt_text: row.get(2)?,
        display_order: row.get(3)?,
        created_at: row.get(4)?,
    })
}

pub fn list_feed(conn: &Connection, limit: Option<u32>) -> StoreResult<Vec<FeedItem>> {
    let sql = format!(
        "SELECT {} FROM feed_items ORDER BY display_order ASC, created_at DESC, id DESC LIMIT ?1",
        FEED_COLUMNS
    );
    query_list(conn, &sql, [sql_limit(limit)], feed_from_row)
}

pub fn read_feed_item(conn: &Connection, id: i64) -> StoreResult<Option<FeedItem>> {
    let sql = format!("SELECT {} FROM feed_items WHERE id = ?1", FEED_COLUMNS);
    query_one(conn, &sql, [id], feed_from_row)
}

pub fn create_feed_item(conn: &Connection, draft: &FeedDraft) -> StoreResult<i64> {
    conn.execute(
        "INSERT INTO feed_items (image, alt_text, display_order, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![draft.image, draft.alt_text, draft.display_order, Utc::now()],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn update_feed_item(conn: &Connection, id: i64, draft: &FeedDraft) -> StoreResult<()> {
    let changed = conn.execute(
        "UPDATE feed_items SET image = ?1, alt_text = ?2, display_order = ?3 WHERE id = ?4",
        params![draft.image, draft.alt_text, draft.display_order, id],
    )?;
    ensure_updated(changed, "feed item", id)
}

// ====================================================================
// =========================== SOCIAL LINKS ===========================
// ====================================================================

const SOCIAL_LINK_COLUMNS: &str =
    "id, platform, url, display_name, display_order, active, sidebar_contact, created_at";

fn social_link_from_row(row: &Row<'_>) -> rusqlite::Result<SocialLink> {
    let platform: crate::models::SocialPlatform = row.get(1)?;
    Ok(SocialLink {
        id: row.get(0)?,
        platform,
        icon_class: platform.icon_class(),
        url: row.get(2)?,
        display_name: row.get(3)?,
        display_order: row.get(4)?,
        active: row.get(5)?,
        sidebar_contact: row.get(6)?,
        created_at: row.get(7)?,
    })
}

pub fn list_active_social_links(conn: &Connection) -> StoreResult<Vec<SocialLink>> {
    let sql = format!(
        "SELECT {} FROM social_links WHERE active = 1 ORDER BY display_order ASC, platform ASC",
        SOCIAL_LINK_COLUMNS
    );
    query_list(conn, &sql, [], social_link_from_row)
}

pub fn list_social_links(conn: &Connection) -> StoreResult<Vec<SocialLink>> {
    let sql = format!(
        "SELECT {} FROM social_links ORDER BY display_order ASC, platform ASC",
        SOCIAL_LINK_COLUMNS
    );
    query_list(conn, &sql, [], social_link_from_row)
}

pub fn read_social_link(conn: &Connection, id: i64) -> StoreResult<Option<SocialLink>> {
    let sql = format!("SELECT {} FROM social_links WHERE id = ?1", SOCIAL_LINK_COLUMNS);
    query_one(conn, &sql, [id], social_link_from_row)
}

pub fn create_social_link(conn: &Connection, draft: &SocialLinkDraft) -> StoreResult<i64> {
    conn.execute(
        "INSERT INTO social_links (platform, url, display_name, display_order, active, sidebar_contact, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            draft.platform,
            draft.url,
            draft.display_name,
            draft.display_order,
            draft.active,
            draft.sidebar_contact,
            Utc::now()
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn update_social_link(conn: &Connection, id: i64, draft: &SocialLinkDraft) -> StoreResult<()> {
    let changed = conn.execute(
        "UPDATE social_links SET platform = ?1, url = ?2, display_name = ?3, display_order = ?4, active = ?5,
                sidebar_contact = ?6
         WHERE id = ?7",
        params![
            draft.platform,
            draft.url,
            draft.display_name,
            draft.display_order,
            draft.active,
            draft.sidebar_contact,
            id
        ],
    )?;
    ensure_updated(changed, "social link", id)
}

// ====================================================================
// =========================== CONTACT INFO ===========================
// ====================================================================

const CONTACT_INFO_COLUMNS: &str =
    "id, phone, email, address, whatsapp, linkedin_url, show_sidebar, created_at, updated_at";

fn contact_info_from_row(row: &Row<'_>) -> rusqlite::Result<ContactInfo> {
    let whatsapp: String = row.get(4)?;
    Ok(ContactInfo {
        id: row.get(0)?,
        phone: row.get(1)?,
        email: row.get(2)?,
        address: row.get(3)?,
        whatsapp_url: whatsapp_url(&whatsapp),
        whatsapp,
        linkedin_url: row.get(5)?,
        show_sidebar: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

pub fn read_contact_info(conn: &Connection) -> StoreResult<Option<ContactInfo>> {
    let sql = format!("SELECT {} FROM contact_info ORDER BY id LIMIT 1", CONTACT_INFO_COLUMNS);
    query_one(conn, &sql, [], contact_info_from_row)
}

pub fn read_contact_info_by_id(conn: &Connection, id: i64) -> StoreResult<Option<ContactInfo>> {
    let sql = format!("SELECT {} FROM contact_info WHERE id = ?1", CONTACT_INFO_COLUMNS);
    query_one(conn, &sql, [id], contact_info_from_row)
}

pub fn list_contact_info(conn: &Connection) -> StoreResult<Vec<ContactInfo>> {
    let sql = format!("SELECT {} FROM contact_info ORDER BY id", CONTACT_INFO_COLUMNS);
    query_list(conn, &sql, [], contact_info_from_row)
}

/// Inserts the contact card unless one already exists. The conditional insert
/// and the `singleton` column together make this hold for every caller.
pub fn create_contact_info(conn: &Connection, draft: &ContactInfoDraft) -> StoreResult<i64> {
    let inserted = conn
        .execute(
            "INSERT INTO contact_info (phone, email, address, whatsapp, linkedin_url, show_sidebar, created_at, updated_at)
             SELECT ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7
             WHERE NOT EXISTS (SELECT 1 FROM contact_info)",
            params![
                draft.phone,
                draft.email,
                draft.address,
                draft.whatsapp,
                draft.linkedin_url,
                draft.show_sidebar,
                Utc::now()
            ],
        )
        .map_err(|e| match StoreError::from(e) {
            StoreError::Conflict(_) => StoreError::SingletonExists("contact info"),
            other => other,
        })?;

    if inserted == 0 {
        return Err(StoreError::SingletonExists("contact info"));
    }
    Ok(conn.last_insert_rowid())
}

pub fn update_contact_info(conn: &Connection, id: i64, draft: &ContactInfoDraft) -> StoreResult<()> {
    let changed = conn.execute(
        "UPDATE contact_info SET phone = ?1, email = ?2, address = ?3, whatsapp = ?4, linkedin_url = ?5,
                show_sidebar = ?6, updated_at = ?7
         WHERE id = ?8",
        params![
            draft.phone,
            draft.email,
            draft.address,
            draft.whatsapp,
            draft.linkedin_url,
            draft.show_sidebar,
            Utc::now(),
            id
        ],
    )?;
    ensure_updated(changed, "contact info", id)
}

// ====================================================================
// ========================== SITE SETTINGS ===========================
// ====================================================================

const SITE_SETTINGS_COLUMNS: &str =
    "id, site_name, description, logo, favicon, primary_color, analytics_id, created_at, updated_at";

fn site_settings_from_row(row: &Row<'_>) -> rusqlite::Result<SiteSettings> {
    Ok(SiteSettings {
        id: row.get(0)?,
        site_name: row.get(1)?,
        description: row.get(2)?,
        logo: row.get(3)?,
        favicon: row.get(4)?,
        primary_color: row.get(5)?,
        analytics_id: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

pub fn read_site_settings(conn: &Connection) -> StoreResult<Option<SiteSettings>> {
    let sql = format!("SELECT {} FROM site_settings ORDER BY id LIMIT 1", SITE_SETTINGS_COLUMNS);
    query_one(conn, &sql, [], site_settings_from_row)
}

pub fn read_site_settings_by_id(conn: &Connection, id: i64) -> StoreResult<Option<SiteSettings>> {
    let sql = format!("SELECT {} FROM site_settings WHERE id = ?1", SITE_SETTINGS_COLUMNS);
    query_one(conn, &sql, [id], site_settings_from_row)
}

pub fn list_site_settings(conn: &Connection) -> StoreResult<Vec<SiteSettings>> {
    let sql = format!("SELECT {} FROM site_settings ORDER BY id", SITE_SETTINGS_COLUMNS);
    query_list(conn, &sql, [], site_settings_from_row)
}

pub fn create_site_settings(conn: &Connection, draft: &SiteSettingsDraft) -> StoreResult<i64> {
    conn.execute(
        "INSERT INTO site_settings (site_name, description, logo, favicon, primary_color, analytics_id, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
        params![
            draft.site_name,
            draft.description,
            draft.logo,
            draft.favicon,
            draft.primary_color,
            draft.analytics_id,
            Utc::now()
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn update_site_settings(conn: &Connection, id: i64, draft: &SiteSettingsDraft) -> StoreResult<()> {
    let changed = conn.execute(
        "UPDATE site_settings SET site_name = ?1, description = ?2, logo = ?3, favicon = ?4, primary_color = ?5,
                analytics_id = ?6, updated_at = ?7
         WHERE id = ?8",
        params![
            draft.site_name,
            draft.description,
            draft.logo,
            draft.favicon,
            draft.primary_color,
            draft.analytics_id,
            Utc::now(),
            id
        ],
    )?;
    ensure_updated(changed, "site settings", id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ProjectStatus, SocialPlatform};
    use crate::setup::db_setup;

    fn conn() -> Connection {
        let mut conn = Connection::open_in_memory().unwrap();
        db_setup::setup_portfolio_db(&mut conn).unwrap();
        conn
    }

    pub(crate) fn project(title: &str, order: i64, featured: bool) -> ProjectDraft {
        ProjectDraft {
            title: title.to_string(),
            slug: None,
            short_description: "short".to_string(),
            description: "long".to_string(),
            image: "projects/a.png".to_string(),
            status: ProjectStatus::Launched,
            technologies: vec!["Rust".to_string(), "SQLite".to_string()],
            display_order: order,
            featured,
            demo_url: None,
            repo_url: Some("https://github.com/x/y".to_string()),
        }
    }

    fn gallery(title: &str) -> GalleryDraft {
        GalleryDraft {
            image: "gallery/a.png".to_string(),
            title: title.to_string(),
            slug: None,
            short_description: "short".to_string(),
            content: "content".to_string(),
            display_order: 0,
        }
    }

    fn contact_card() -> ContactInfoDraft {
        ContactInfoDraft {
            phone: "+242 06 000".to_string(),
            email: "me@example.com".to_string(),
            address: String::new(),
            whatsapp: "06 000 00 00".to_string(),
            linkedin_url: String::new(),
            show_sidebar: true,
        }
    }

    #[test]
    fn same_title_projects_get_suffixed_slugs() {
        let conn = conn();
        let slugs: Vec<String> = (0..3)
            .map(|_| {
                let id = create_project(&conn, &project("Portfolio Site", 0, false)).unwrap();
                read_project(&conn, id).unwrap().unwrap().slug
            })
            .collect();
        assert_eq!(slugs, vec!["portfolio-site", "portfolio-site-1", "portfolio-site-2"]);
    }

    #[test]
    fn same_title_gallery_items_get_suffixed_slugs() {
        let conn = conn();
        let first = create_gallery_item(&conn, &gallery("Conférence")).unwrap();
        let second = create_gallery_item(&conn, &gallery("Conférence")).unwrap();
        assert_eq!(read_gallery_item(&conn, first).unwrap().unwrap().slug, "conference");
        assert_eq!(read_gallery_item(&conn, second).unwrap().unwrap().slug, "conference-1");
    }

    #[test]
    fn slug_is_not_recomputed_on_update() {
        let conn = conn();
        let id = create_project(&conn, &project("Old Title", 0, false)).unwrap();
        update_project(&conn, id, &project("New Title", 0, false)).unwrap();
        let stored = read_project(&conn, id).unwrap().unwrap();
        assert_eq!(stored.title, "New Title");
        assert_eq!(stored.slug, "old-title");
    }

    #[test]
    fn explicit_duplicate_slug_is_a_conflict() {
        let conn = conn();
        let mut draft = project("A", 0, false);
        draft.slug = Some("taken".to_string());
        create_project(&conn, &draft).unwrap();
        let err = create_project(&conn, &draft).unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[test]
    fn featured_listing_filters_and_orders() {
        let conn = conn();
        create_project(&conn, &project("Third", 3, true)).unwrap();
        create_project(&conn, &project("Hidden", 0, false)).unwrap();
        create_project(&conn, &project("First", 1, true)).unwrap();
        create_project(&conn, &project("Second", 2, true)).unwrap();

        let featured = list_featured_projects(&conn, None).unwrap();
        let titles: Vec<&str> = featured.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["First", "Second", "Third"]);
        assert!(featured.iter().all(|p| p.featured));

        assert_eq!(list_featured_projects(&conn, Some(2)).unwrap().len(), 2);
    }

    #[test]
    fn technologies_keep_their_order() {
        let conn = conn();
        let id = create_project(&conn, &project("Tech", 0, false)).unwrap();
        let stored = read_project(&conn, id).unwrap().unwrap();
        assert_eq!(stored.technologies, vec!["Rust", "SQLite"]);
        assert_eq!(stored.status, ProjectStatus::Launched);
    }

    #[test]
    fn search_is_case_insensitive_and_literal() {
        let conn = conn();
        create_project(&conn, &project("Rust Web App", 0, false)).unwrap();
        create_project(&conn, &project("100% Python", 0, false)).unwrap();

        assert_eq!(search_projects(&conn, "rust", 6).unwrap().len(), 1);
        assert_eq!(search_projects(&conn, "WEB", 6).unwrap().len(), 1);
        assert_eq!(search_projects(&conn, "%", 6).unwrap().len(), 1);
        assert!(search_projects(&conn, "golang", 6).unwrap().is_empty());
    }

    #[test]
    fn matching_ids_combines_search_and_conditions() {
        let conn = conn();
        let rust = create_project(&conn, &project("Rust Web App", 0, true)).unwrap();
        let python = create_project(&conn, &project("100% Python", 0, false)).unwrap();
        let mut beta = project("Rust CLI", 0, false);
        beta.status = ProjectStatus::Beta;
        let cli = create_project(&conn, &beta).unwrap();
        let columns = ["title", "short_description"];

        let all = matching_ids(&conn, Table::Projects, &columns, "", &[]).unwrap();
        assert_eq!(all, HashSet::from([rust, python, cli]));

        let found = matching_ids(&conn, Table::Projects, &columns, "RUST", &[]).unwrap();
        assert_eq!(found, HashSet::from([rust, cli]));

        let literal = matching_ids(&conn, Table::Projects, &columns, "0%", &[]).unwrap();
        assert_eq!(literal, HashSet::from([python]));

        let featured = matching_ids(&conn, Table::Projects, &columns, "rust", &[("featured", Value::Integer(1))]).unwrap();
        assert_eq!(featured, HashSet::from([rust]));

        let by_status = matching_ids(
            &conn,
            Table::Projects,
            &columns,
            "",
            &[("status", Value::Text("beta".to_string())), ("featured", Value::Integer(0))],
        )
        .unwrap();
        assert_eq!(by_status, HashSet::from([cli]));
    }

    #[test]
    fn contact_info_is_a_singleton_at_the_store() {
        let conn = conn();
        create_contact_info(&conn, &contact_card()).unwrap();
        let err = create_contact_info(&conn, &contact_card()).unwrap_err();
        assert!(matches!(err, StoreError::SingletonExists(_)));
        assert_eq!(count_rows(&conn, Table::ContactInfo).unwrap(), 1);

        let card = read_contact_info(&conn).unwrap().unwrap();
        assert_eq!(card.whatsapp_url.as_deref(), Some("https://wa.me/24260000000"));
    }

    #[test]
    fn one_social_link_per_platform() {
        let conn = conn();
        let draft = SocialLinkDraft {
            platform: SocialPlatform::GitHub,
            url: "https://github.com/me".to_string(),
            display_name: "@me".to_string(),
            display_order: 0,
            active: true,
            sidebar_contact: false,
        };
        create_social_link(&conn, &draft).unwrap();
        assert!(matches!(create_social_link(&conn, &draft), Err(StoreError::Conflict(_))));
        let links = list_active_social_links(&conn).unwrap();
        assert_eq!(links[0].icon_class, "fab fa-github");
    }

    #[test]
    fn bulk_flag_counts_and_is_idempotent() {
        let mut conn = conn();
        let a = create_project(&conn, &project("A", 0, false)).unwrap();
        let b = create_project(&conn, &project("B", 0, false)).unwrap();

        assert_eq!(set_flag(&mut conn, Table::Projects, "featured", &[a, b, b], true).unwrap(), 2);
        assert_eq!(set_flag(&mut conn, Table::Projects, "featured", &[a, b], true).unwrap(), 2);
        assert_eq!(list_featured_projects(&conn, None).unwrap().len(), 2);

        assert_eq!(set_flag(&mut conn, Table::Projects, "featured", &[a, 999], false).unwrap(), 1);
        assert_eq!(list_featured_projects(&conn, None).unwrap().len(), 1);
    }

    #[test]
    fn news_publish_date_survives_updates() {
        let conn = conn();
        let draft = NewsDraft {
            title: "Talk".to_string(),
            description: "d".to_string(),
            image: String::new(),
            link: "https://example.com".to_string(),
            platform: crate::models::NewsPlatform::Blog,
            display_order: 0,
        };
        let id = create_news(&conn, &draft).unwrap();
        let before = read_news(&conn, id).unwrap().unwrap().published_at;
        update_news(&conn, id, &NewsDraft { title: "Talk v2".to_string(), ..draft }).unwrap();
        let after = read_news(&conn, id).unwrap().unwrap();
        assert_eq!(after.published_at, before);
        assert_eq!(after.title, "Talk v2");
    }

    #[test]
    fn updating_a_missing_row_is_not_found() {
        let conn = conn();
        let err = update_project(&conn, 42, &project("X", 0, false)).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }
}
