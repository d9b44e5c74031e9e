use crate::helper::form_helpers::field;
use crate::helper::intake_helpers::{self, ContactSubmission, IntakeError, SubscribeOutcome, MSG_CONTACT_SENT};
use crate::helper::mail_helpers::Mailer;
use crate::helper::sanitization_helpers::media_url;
use crate::models::db_operations::content_db_operations::{self as content, Table};
use crate::models::db_operations::{StoreError, StoreResult};
use crate::models::{
    ContactInfo, FeedItem, GalleryItem, News, Partner, Profile, Project, SiteSettings, Skill, SocialLink, Subscriber,
};
use crate::DbPool;
use actix_web::web;
use rusqlite::Connection;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt::Display;
use thiserror::Error;

pub const LANDING_PROJECTS: u32 = 6;
pub const LANDING_NEWS: u32 = 6;
pub const LANDING_GALLERY: u32 = 6;
pub const LANDING_FEED: u32 = 8;
pub const PROJECTS_PER_PAGE: u32 = 9;
pub const GALLERY_PER_PAGE: u32 = 12;
pub const SIMILAR_ITEMS: u32 = 3;
pub const SEARCH_LIMIT: u32 = 6;

#[derive(Error, Debug)]
pub enum PublicHelperError {
    #[error("R2D2 Pool error: {0}")]
    Pool(#[from] r2d2::Error),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("Intake error: {0}")]
    Intake(#[from] IntakeError),
}

type PooledConn = r2d2::PooledConnection<r2d2_sqlite::SqliteConnectionManager>;

fn get_conn(pool: &web::Data<DbPool>) -> Result<PooledConn, PublicHelperError> {
    pool.get().map_err(PublicHelperError::Pool)
}

/// Logs a failed section and renders it empty.
fn section<T: Default, E: Display>(name: &str, result: Result<T, E>) -> T {
    result.unwrap_or_else(|e| {
        log::error!("Failed to load the '{}' section: {}", name, e);
        T::default()
    })
}

// ====================================================================
// ============================== LAYOUT ==============================
// ====================================================================

/// Data every public page shares through the base template.
#[derive(Serialize, Default)]
pub struct Layout {
    pub profile: Option<Profile>,
    pub site_settings: Option<SiteSettings>,
    pub contact_info: Option<ContactInfo>,
    pub social_links: Vec<SocialLink>,
}

fn layout_from(conn: &Connection) -> Layout {
    Layout {
        profile: section("profile", content::read_primary_profile(conn)),
        site_settings: section("site settings", content::read_site_settings(conn)),
        contact_info: section("contact info", content::read_contact_info(conn)),
        social_links: section("social links", content::list_active_social_links(conn)),
    }
}

pub fn load_layout(pool: &web::Data<DbPool>) -> Layout {
    match get_conn(pool) {
        Ok(conn) => layout_from(&conn),
        Err(e) => {
            log::error!("Could not get DB connection for the page layout: {}", e);
            Layout::default()
        }
    }
}

// ====================================================================
// ============================= LANDING ==============================
// ====================================================================

#[derive(Serialize, Default)]
pub struct Landing {
    #[serde(flatten)]
    pub layout: Layout,
    pub projects: Vec<Project>,
    pub skills: Vec<Skill>,
    pub news: Vec<News>,
    pub partners: Vec<Partner>,
    pub gallery: Vec<GalleryItem>,
    pub feed: Vec<FeedItem>,
}

/// Every section is loaded on its own; one failing query leaves only that
/// section empty.
pub fn load_landing(pool: &web::Data<DbPool>) -> Landing {
    let conn = match get_conn(pool) {
        Ok(conn) => conn,
        Err(e) => {
            log::error!("Could not get DB connection for the landing page: {}", e);
            return Landing::default();
        }
    };

    Landing {
        layout: layout_from(&conn),
        projects: section("projects", content::list_featured_projects(&conn, Some(LANDING_PROJECTS))),
        skills: section("skills", content::list_skills(&conn)),
        news: section("news", content::list_news(&conn, Some(LANDING_NEWS))),
        partners: section("partners", content::list_active_partners(&conn)),
        gallery: section("gallery", content::list_gallery(&conn, Some(LANDING_GALLERY))),
        feed: section("feed", content::list_feed(&conn, Some(LANDING_FEED))),
    }
}

// ====================================================================
// ============================= DETAILS ==============================
// ====================================================================

#[derive(Serialize)]
pub struct Detail<T> {
    pub item: T,
    pub similar: Vec<T>,
}

pub fn load_project_detail(pool: &web::Data<DbPool>, slug: &str) -> Result<Option<Detail<Project>>, PublicHelperError> {
    let conn = get_conn(pool)?;
    let Some(item) = content::read_project_by_slug(&conn, slug)? else {
        return Ok(None);
    };
    let similar = content::list_similar_projects(&conn, item.id, SIMILAR_ITEMS)?;
    Ok(Some(Detail { item, similar }))
}

pub fn load_gallery_detail(
    pool: &web::Data<DbPool>,
    slug: &str,
) -> Result<Option<Detail<GalleryItem>>, PublicHelperError> {
    let conn = get_conn(pool)?;
    let Some(item) = content::read_gallery_item_by_slug(&conn, slug)? else {
        return Ok(None);
    };
    let similar = content::list_similar_gallery_items(&conn, item.id, SIMILAR_ITEMS)?;
    Ok(Some(Detail { item, similar }))
}

// ====================================================================
// ============================ PAGINATION ============================
// ====================================================================

#[derive(Serialize, Debug)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: u32,
    pub num_pages: u32,
    pub total: i64,
    pub has_previous: bool,
    pub has_next: bool,
    pub previous_page_number: u32,
    pub next_page_number: u32,
}

/// Maps the raw `page` parameter onto an existing page. Missing or
/// non-numeric values give page 1, out-of-range values the last page.
pub fn resolve_page(raw: Option<&str>, total: i64, per_page: u32) -> (u32, u32) {
    let per_page = i64::from(per_page.max(1));
    let num_pages = ((total.max(0) + per_page - 1) / per_page).max(1) as u32;
    let number = match raw.map(str::trim).and_then(|r| r.parse::<i64>().ok()) {
        None => 1,
        Some(n) if n < 1 || n > i64::from(num_pages) => num_pages,
        Some(n) => n as u32,
    };
    (number, num_pages)
}

fn paginate<T>(
    conn: &Connection,
    table: Table,
    raw_page: Option<&str>,
    per_page: u32,
    fetch: impl FnOnce(&Connection, u32, u32) -> StoreResult<Vec<T>>,
) -> Result<Page<T>, PublicHelperError> {
    let total = content::count_rows(conn, table)?;
    let (number, num_pages) = resolve_page(raw_page, total, per_page);
    let items = fetch(conn, per_page, (number - 1) * per_page)?;
    Ok(Page {
        items,
        number,
        num_pages,
        total,
        has_previous: number > 1,
        has_next: number < num_pages,
        previous_page_number: number.saturating_sub(1).max(1),
        next_page_number: (number + 1).min(num_pages),
    })
}

pub fn load_projects_page(pool: &web::Data<DbPool>, raw_page: Option<&str>) -> Result<Page<Project>, PublicHelperError> {
    let conn = get_conn(pool)?;
    paginate(&conn, Table::Projects, raw_page, PROJECTS_PER_PAGE, content::list_projects)
}

pub fn load_gallery_page(pool: &web::Data<DbPool>, raw_page: Option<&str>) -> Result<Page<GalleryItem>, PublicHelperError> {
    let conn = get_conn(pool)?;
    paginate(&conn, Table::GalleryItems, raw_page, GALLERY_PER_PAGE, content::list_gallery_paginated)
}

// ====================================================================
// ============================== SEARCH ==============================
// ====================================================================

#[derive(Serialize, Default, Debug)]
pub struct SearchResults {
    pub query: String,
    pub projects: Vec<Project>,
    pub gallery: Vec<GalleryItem>,
    pub news: Vec<News>,
    pub total_results: usize,
}

pub fn search(pool: &web::Data<DbPool>, raw_query: &str) -> Result<SearchResults, PublicHelperError> {
    let query = raw_query.trim();
    if query.is_empty() {
        return Ok(SearchResults::default());
    }

    let conn = get_conn(pool)?;
    let projects = content::search_projects(&conn, query, SEARCH_LIMIT)?;
    let gallery = content::search_gallery(&conn, query, SEARCH_LIMIT)?;
    let news = content::search_news(&conn, query, SEARCH_LIMIT)?;
    let total_results = projects.len() + gallery.len() + news.len();

    Ok(SearchResults { query: query.to_string(), projects, gallery, news, total_results })
}

// ====================================================================
// ================================ API ===============================
// ====================================================================

fn api_image(path: &str) -> Option<String> {
    (!path.is_empty()).then(|| media_url(path))
}

#[derive(Serialize)]
pub struct ProjectApiItem {
    pub id: i64,
    pub title: String,
    pub short_description: String,
    pub image: Option<String>,
    pub status: &'static str,
    pub status_color: &'static str,
    pub technologies: Vec<String>,
    pub url: String,
    pub demo_url: Option<String>,
    pub repo_url: Option<String>,
}

impl From<Project> for ProjectApiItem {
    fn from(p: Project) -> Self {
        ProjectApiItem {
            id: p.id,
            image: api_image(&p.image),
            status: p.status.label(),
            status_color: p.status.color_class(),
            url: p.absolute_url(),
            title: p.title,
            short_description: p.short_description,
            technologies: p.technologies,
            demo_url: p.demo_url,
            repo_url: p.repo_url,
        }
    }
}

#[derive(Serialize)]
pub struct GalleryApiItem {
    pub id: i64,
    pub title: String,
    pub short_description: String,
    pub image: Option<String>,
    pub url: String,
}

impl From<GalleryItem> for GalleryApiItem {
    fn from(g: GalleryItem) -> Self {
        GalleryApiItem {
            id: g.id,
            image: api_image(&g.image),
            url: g.absolute_url(),
            title: g.title,
            short_description: g.short_description,
        }
    }
}

#[derive(Serialize)]
pub struct FeedApiItem {
    pub id: i64,
    pub image: Option<String>,
    pub alt_text: String,
}

impl From<FeedItem> for FeedApiItem {
    fn from(f: FeedItem) -> Self {
        FeedApiItem { id: f.id, image: api_image(&f.image), alt_text: f.alt_text }
    }
}

pub fn api_projects(pool: &web::Data<DbPool>) -> Result<Vec<ProjectApiItem>, PublicHelperError> {
    let conn = get_conn(pool)?;
    Ok(content::list_featured_projects(&conn, None)?.into_iter().map(Into::into).collect())
}

pub fn api_gallery(pool: &web::Data<DbPool>) -> Result<Vec<GalleryApiItem>, PublicHelperError> {
    let conn = get_conn(pool)?;
    Ok(content::list_gallery(&conn, None)?.into_iter().map(Into::into).collect())
}

pub fn api_feed(pool: &web::Data<DbPool>) -> Result<Vec<FeedApiItem>, PublicHelperError> {
    let conn = get_conn(pool)?;
    Ok(content::list_feed(&conn, None)?.into_iter().map(Into::into).collect())
}

// ====================================================================
// ============================== INTAKE ==============================
// ====================================================================

#[derive(Serialize, Debug, PartialEq, Eq)]
pub struct JsonReply {
    pub success: bool,
    pub message: String,
}

impl JsonReply {
    pub fn ok(message: &str) -> Self {
        JsonReply { success: true, message: message.to_string() }
    }

    pub fn fail(message: &str) -> Self {
        JsonReply { success: false, message: message.to_string() }
    }
}

fn intake_failure(what: &str, e: &IntakeError) -> JsonReply {
    if let IntakeError::Store(store) = e {
        log::error!("{} failed: {}", what, store);
    }
    JsonReply::fail(e.user_message())
}

/// Newsletter signup. A welcome email goes out only for brand-new records.
pub fn newsletter_signup(pool: &web::Data<DbPool>, mailer: &Mailer, form: &HashMap<String, String>) -> JsonReply {
    let conn = match get_conn(pool) {
        Ok(conn) => conn,
        Err(e) => {
            log::error!("Newsletter signup failed: {}", e);
            return JsonReply::fail(intake_helpers::MSG_INTERNAL);
        }
    };

    match intake_helpers::subscribe(&conn, field(form, "email")) {
        Ok(outcome) => {
            let reply = match &outcome {
                SubscribeOutcome::AlreadySubscribed => JsonReply::fail(outcome.message()),
                _ => JsonReply::ok(outcome.message()),
            };
            match outcome {
                SubscribeOutcome::Subscribed(subscriber) => {
                    log::info!("New newsletter subscription: {}", subscriber.email);
                    mailer.dispatch(mailer.welcome_email(&subscriber));
                }
                SubscribeOutcome::Reactivated(subscriber) => {
                    log::info!("Newsletter subscription reactivated: {}", subscriber.email);
                }
                SubscribeOutcome::AlreadySubscribed => {}
            }
            reply
        }
        Err(e) => intake_failure("Newsletter signup", &e),
    }
}

/// Contact form. The owner is notified by email after the message is stored.
pub fn contact_submission(pool: &web::Data<DbPool>, mailer: &Mailer, form: &HashMap<String, String>) -> JsonReply {
    let submission = ContactSubmission {
        name: field(form, "nom").to_string(),
        email: field(form, "email").to_string(),
        subject: field(form, "sujet").to_string(),
        message: field(form, "message").to_string(),
    };

    let conn = match get_conn(pool) {
        Ok(conn) => conn,
        Err(e) => {
            log::error!("Contact submission failed: {}", e);
            return JsonReply::fail(intake_helpers::MSG_INTERNAL);
        }
    };

    match intake_helpers::submit_contact(&conn, &submission) {
        Ok(message) => {
            log::info!("New contact message from {} <{}>", message.name, message.email);
            mailer.dispatch(mailer.contact_notification(&message));
            JsonReply::ok(MSG_CONTACT_SENT)
        }
        Err(e) => intake_failure("Contact submission", &e),
    }
}

pub fn find_subscription(pool: &web::Data<DbPool>, token: &str) -> Result<Option<Subscriber>, PublicHelperError> {
    let conn = get_conn(pool)?;
    Ok(intake_helpers::find_subscription(&conn, token)?)
}

pub fn unsubscribe(pool: &web::Data<DbPool>, token: &str) -> Result<Option<Subscriber>, PublicHelperError> {
    let conn = get_conn(pool)?;
    let subscriber = intake_helpers::unsubscribe(&conn, token)?;
    if let Some(s) = &subscriber {
        log::info!("Newsletter unsubscribe: {}", s.email);
    }
    Ok(subscriber)
}

// ====================================================================
// ========================== TEMPLATE FILTERS ========================
// ====================================================================

/// Registers `media_url`, which turns a stored image reference into a URL.
pub fn register_filters(tera: &mut tera::Tera) {
    tera.register_filter(
        "media_url",
        |value: &tera::Value, _: &HashMap<String, tera::Value>| -> tera::Result<tera::Value> {
            let path = value.as_str().unwrap_or("");
            Ok(tera::Value::String(if path.is_empty() { String::new() } else { media_url(path) }))
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helper::mail_helpers::MemoryBackend;
    use crate::models::{GalleryDraft, NewsDraft, NewsPlatform, ProjectDraft, ProjectStatus};
    use crate::test_support::memory_pool;
    use rstest::rstest;
    use std::sync::Arc;

    fn project(title: &str, featured: bool, order: i64) -> ProjectDraft {
        ProjectDraft {
            title: title.to_string(),
            slug: None,
            short_description: "short".to_string(),
            description: "long".to_string(),
            image: format!("projects/{}.png", order),
            status: ProjectStatus::Launched,
            technologies: vec!["Rust".to_string()],
            display_order: order,
            featured,
            demo_url: None,
            repo_url: None,
        }
    }

    fn mailer() -> Mailer {
        Mailer::new(Arc::new(MemoryBackend::default()), "site@example.com", "owner@example.com", "http://localhost")
    }

    fn form(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[rstest]
    #[case(None, 30, (1, 4))]
    #[case(Some("2"), 30, (2, 4))]
    #[case(Some("abc"), 30, (1, 4))]
    #[case(Some("99"), 30, (4, 4))]
    #[case(Some("0"), 30, (4, 4))]
    #[case(Some("-3"), 30, (4, 4))]
    #[case(Some("1"), 0, (1, 1))]
    #[case(Some("5"), 0, (1, 1))]
    #[case(Some("3"), 27, (3, 3))]
    fn page_resolution(#[case] raw: Option<&str>, #[case] total: i64, #[case] expected: (u32, u32)) {
        assert_eq!(resolve_page(raw, total, 9), expected);
    }

    #[test]
    fn landing_renders_from_an_empty_store() {
        let pool = web::Data::new(memory_pool());
        let landing = load_landing(&pool);
        assert!(landing.layout.profile.is_none());
        assert!(landing.projects.is_empty());
        assert!(landing.layout.site_settings.is_some());
    }

    #[test]
    fn landing_shows_only_featured_projects() {
        let pool = web::Data::new(memory_pool());
        {
            let conn = pool.get().unwrap();
            content::create_project(&conn, &project("Later", true, 2)).unwrap();
            content::create_project(&conn, &project("Hidden", false, 0)).unwrap();
            content::create_project(&conn, &project("First", true, 1)).unwrap();
        }
        let titles: Vec<String> = load_landing(&pool).projects.into_iter().map(|p| p.title).collect();
        assert_eq!(titles, vec!["First", "Later"]);
    }

    #[test]
    fn last_project_page_holds_the_remainder() {
        let pool = web::Data::new(memory_pool());
        {
            let conn = pool.get().unwrap();
            for i in 0..11 {
                content::create_project(&conn, &project(&format!("P{}", i), false, i)).unwrap();
            }
        }
        let page = load_projects_page(&pool, Some("7")).unwrap();
        assert_eq!((page.number, page.num_pages), (2, 2));
        assert_eq!(page.items.len(), 2);
        assert!(page.has_previous && !page.has_next);
        assert_eq!(page.previous_page_number, 1);
    }

    #[test]
    fn search_with_no_match_is_empty() {
        let pool = web::Data::new(memory_pool());
        {
            let conn = pool.get().unwrap();
            content::create_project(&conn, &project("Rust site", true, 0)).unwrap();
        }
        let results = search(&pool, "cobol").unwrap();
        assert_eq!(results.total_results, 0);
        assert!(results.projects.is_empty() && results.gallery.is_empty() && results.news.is_empty());

        let blank = search(&pool, "   ").unwrap();
        assert_eq!(blank.total_results, 0);
        assert_eq!(blank.query, "");
    }

    #[test]
    fn search_aggregates_across_entities() {
        let pool = web::Data::new(memory_pool());
        {
            let conn = pool.get().unwrap();
            content::create_project(&conn, &project("Rust site", true, 0)).unwrap();
            content::create_gallery_item(
                &conn,
                &GalleryDraft {
                    image: String::new(),
                    title: "RUST meetup".to_string(),
                    slug: None,
                    short_description: "s".to_string(),
                    content: "c".to_string(),
                    display_order: 0,
                },
            )
            .unwrap();
            content::create_news(
                &conn,
                &NewsDraft {
                    title: "Talk about rust".to_string(),
                    description: "d".to_string(),
                    image: String::new(),
                    link: "https://example.com".to_string(),
                    platform: NewsPlatform::Blog,
                    display_order: 0,
                },
            )
            .unwrap();
        }
        let results = search(&pool, " rust ").unwrap();
        assert_eq!(results.query, "rust");
        assert_eq!(results.total_results, 3);
    }

    #[test]
    fn api_project_items_carry_display_values() {
        let pool = web::Data::new(memory_pool());
        {
            let conn = pool.get().unwrap();
            content::create_project(&conn, &project("Shop", true, 1)).unwrap();
            content::create_project(&conn, &project("Draft", false, 2)).unwrap();
        }
        let items = api_projects(&pool).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].status, "Launched");
        assert_eq!(items[0].status_color, "bg-green-500");
        assert_eq!(items[0].url, "/projet/shop/");
        assert_eq!(items[0].image.as_deref(), Some("/media/projects/1.png"));
    }

    #[actix_web::test]
    async fn signup_replies_follow_the_state_machine() {
        let pool = web::Data::new(memory_pool());
        let mailer = mailer();
        let first = newsletter_signup(&pool, &mailer, &form(&[("email", "Reader@Example.com")]));
        assert!(first.success);
        let again = newsletter_signup(&pool, &mailer, &form(&[("email", "reader@example.com")]));
        assert_eq!(again, JsonReply::fail(intake_helpers::MSG_ALREADY_SUBSCRIBED));
        let missing = newsletter_signup(&pool, &mailer, &form(&[]));
        assert_eq!(missing, JsonReply::fail(intake_helpers::MSG_EMAIL_REQUIRED));
    }

    #[actix_web::test]
    async fn contact_reads_the_form_field_names() {
        let pool = web::Data::new(memory_pool());
        let reply = contact_submission(
            &pool,
            &mailer(),
            &form(&[("nom", "Ana"), ("email", "ana@example.com"), ("sujet", "Hi"), ("message", "Hello")]),
        );
        assert_eq!(reply, JsonReply::ok(MSG_CONTACT_SENT));
    }
}
