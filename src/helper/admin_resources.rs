//! Back-office description of every managed entity.
//!
//! Each entity implements [`AdminResource`]: a field table for its form, the
//! cells shown in its list, the mapping from submitted form values to a
//! validated draft, and the bulk actions it offers. The generic handlers in
//! `routes::admin` drive all twelve resources through this trait.

use crate::helper::admin_helpers::AdminHelperError;
use crate::helper::form_helpers::{checkbox, field};
use crate::helper::intake_helpers;
use crate::helper::sanitization_helpers::{
    badge, color_swatch, icon_preview, image_preview, is_hex_color, is_valid_handle,
};
use crate::models::db_operations::content_db_operations::{self as content, Table};
use crate::models::db_operations::{intake_db_operations as intake, StoreResult};
use crate::models::{
    ContactInfo, ContactInfoDraft, ContactMessage, ContactMessageDraft, FeedDraft, FeedItem, GalleryDraft,
    GalleryItem, News, NewsDraft, NewsPlatform, Partner, PartnerDraft, Profile, ProfileDraft, Project,
    ProjectDraft, ProjectStatus, SiteSettings, SiteSettingsDraft, Skill, SkillDraft, SocialLink,
    SocialLinkDraft, SocialPlatform, Subscriber, SubscriberDraft,
};
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::Serialize;
use std::collections::HashMap;
use std::str::FromStr;

pub const SHORT_DESCRIPTION_MAX: usize = 300;

// ====================================================================
// ========================== FIELD TABLES ============================
// ====================================================================

#[derive(Debug, Clone, Copy)]
pub enum FieldKind {
    Text,
    TextArea,
    Number,
    Checkbox,
    Url,
    Email,
    Image,
    Color,
    /// Comma-separated list, stored as an ordered array.
    Technologies,
    Choice(fn() -> Vec<(&'static str, &'static str)>),
}

impl FieldKind {
    pub fn input_type(&self) -> &'static str {
        match self {
            FieldKind::Text | FieldKind::Image | FieldKind::Technologies => "text",
            FieldKind::TextArea => "textarea",
            FieldKind::Number => "number",
            FieldKind::Checkbox => "checkbox",
            FieldKind::Url => "url",
            FieldKind::Email => "email",
            FieldKind::Color => "color",
            FieldKind::Choice(_) => "select",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub help: &'static str,
}

impl FieldSpec {
    const fn new(name: &'static str, label: &'static str, kind: FieldKind) -> Self {
        FieldSpec { name, label, kind, required: false, help: "" }
    }

    const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    const fn help(mut self, help: &'static str) -> Self {
        self.help = help;
        self
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct BulkAction {
    pub name: &'static str,
    pub label: &'static str,
    pub column: &'static str,
    pub value: bool,
}

#[derive(Debug, Clone, Copy)]
pub enum FilterKind {
    /// Boolean column, narrowed to yes or no.
    Flag,
    /// Column holding one of a closed set of codes.
    Choice(fn() -> Vec<(&'static str, &'static str)>),
}

/// A list-screen filter. The query parameter is named after the column.
#[derive(Debug, Clone, Copy)]
pub struct ListFilter {
    pub column: &'static str,
    pub label: &'static str,
    pub kind: FilterKind,
}

impl ListFilter {
    const fn flag(column: &'static str, label: &'static str) -> Self {
        ListFilter { column, label, kind: FilterKind::Flag }
    }

    const fn choice(column: &'static str, label: &'static str, options: fn() -> Vec<(&'static str, &'static str)>) -> Self {
        ListFilter { column, label, kind: FilterKind::Choice(options) }
    }

    /// `(value, label)` pairs offered in the filter's select box.
    pub fn options(&self) -> Vec<(&'static str, &'static str)> {
        match self.kind {
            FilterKind::Flag => vec![("1", "Yes"), ("0", "No")],
            FilterKind::Choice(options) => options(),
        }
    }
}

/// One list cell. `html` cells are generated previews and rendered unescaped.
#[derive(Debug, Serialize)]
pub struct Cell {
    pub value: String,
    pub html: bool,
}

fn text(value: impl Into<String>) -> Cell {
    Cell { value: value.into(), html: false }
}

fn html(value: String) -> Cell {
    Cell { value, html: true }
}

fn yes_no(flag: bool) -> Cell {
    text(if flag { "Yes" } else { "No" })
}

fn date(at: &DateTime<Utc>) -> Cell {
    text(at.format("%Y-%m-%d %H:%M").to_string())
}

fn flag_value(flag: bool) -> String {
    if flag { "on".to_string() } else { String::new() }
}

pub type FormValues = HashMap<String, String>;

fn values<const N: usize>(pairs: [(&str, String); N]) -> FormValues {
    pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

pub trait AdminResource: 'static {
    type Record;
    type Draft;

    /// URL segment below the back-office root.
    const KEY: &'static str;
    const LABEL: &'static str;
    const SINGULAR: &'static str;
    const TABLE: Table;
    const COLUMNS: &'static [&'static str];
    const FIELDS: &'static [FieldSpec];
    const BULK_ACTIONS: &'static [BulkAction] = &[];
    /// Text columns matched by the list search box. Empty hides the box.
    const SEARCH_COLUMNS: &'static [&'static str] = &[];
    const FILTERS: &'static [ListFilter] = &[];

    fn list(conn: &Connection) -> StoreResult<Vec<Self::Record>>;
    fn get(conn: &Connection, id: i64) -> StoreResult<Option<Self::Record>>;
    fn id(record: &Self::Record) -> i64;
    fn cells(record: &Self::Record) -> Vec<Cell>;
    fn form_values(record: &Self::Record) -> FormValues;
    fn from_form(form: &FormValues) -> Result<Self::Draft, AdminHelperError>;
    fn insert(conn: &Connection, draft: &Self::Draft) -> StoreResult<i64>;
    fn update(conn: &Connection, id: i64, draft: &Self::Draft) -> StoreResult<()>;

    /// Values pre-filled on an empty creation form.
    fn defaults() -> FormValues {
        FormValues::new()
    }

    /// Read-only HTML previews keyed by field name.
    fn previews(_record: &Self::Record) -> Vec<(&'static str, String)> {
        Vec::new()
    }

    fn can_create(_conn: &Connection) -> StoreResult<bool> {
        Ok(true)
    }
}

// ====================================================================
// ========================== FORM READING ============================
// ====================================================================

/// Pulls typed values out of a submitted form, collecting every problem
/// instead of stopping at the first.
struct FormReader<'a> {
    form: &'a FormValues,
    errors: Vec<String>,
}

impl<'a> FormReader<'a> {
    fn new(form: &'a FormValues) -> Self {
        FormReader { form, errors: Vec::new() }
    }

    fn raw(&self, key: &str) -> &'a str {
        field(self.form, key)
    }

    fn optional(&self, key: &str) -> String {
        self.raw(key).to_string()
    }

    fn required(&mut self, key: &str, label: &str) -> String {
        let value = self.raw(key);
        if value.is_empty() {
            self.errors.push(format!("{} is required.", label));
        }
        value.to_string()
    }

    fn max_chars(&mut self, value: &str, label: &str, max: usize) {
        if value.chars().count() > max {
            self.errors.push(format!("{} cannot exceed {} characters.", label, max));
        }
    }

    fn check_url(&mut self, value: &str, label: &str) {
        if !value.is_empty() && !(value.starts_with("http://") || value.starts_with("https://")) {
            self.errors.push(format!("{} must start with http:// or https://.", label));
        }
    }

    fn url(&mut self, key: &str, label: &str) -> String {
        let value = self.required(key, label);
        self.check_url(&value, label);
        value
    }

    fn optional_url(&mut self, key: &str, label: &str) -> Option<String> {
        let value = self.raw(key);
        self.check_url(value, label);
        (!value.is_empty()).then(|| value.to_string())
    }

    fn number(&mut self, key: &str, label: &str) -> i64 {
        let value = self.raw(key);
        if value.is_empty() {
            return 0;
        }
        value.parse().unwrap_or_else(|_| {
            self.errors.push(format!("{} must be a whole number.", label));
            0
        })
    }

    fn flag(&self, key: &str) -> bool {
        checkbox(self.form, key)
    }

    fn choice<T: FromStr + Copy>(&mut self, key: &str, label: &str, fallback: T) -> T {
        self.raw(key).parse().unwrap_or_else(|_| {
            self.errors.push(format!("{} has an unknown value.", label));
            fallback
        })
    }

    fn finish<D>(self, draft: D) -> Result<D, AdminHelperError> {
        if self.errors.is_empty() {
            Ok(draft)
        } else {
            Err(AdminHelperError::Validation(self.errors.join(" ")))
        }
    }
}

fn parse_technologies(raw: &str) -> Vec<String> {
    raw.split(',').map(|t| t.trim().to_string()).filter(|t| !t.is_empty()).collect()
}

fn non_empty(value: String) -> Option<String> {
    (!value.is_empty()).then_some(value)
}

// ====================================================================
// ============================= PROFILE ==============================
// ====================================================================

pub struct ProfileAdmin;

impl AdminResource for ProfileAdmin {
    type Record = Profile;
    type Draft = ProfileDraft;

    const KEY: &'static str = "profiles";
    const LABEL: &'static str = "Profiles";
    const SINGULAR: &'static str = "profile";
    const TABLE: Table = Table::Profiles;
    const COLUMNS: &'static [&'static str] = &["Photo", "Full name", "Handle", "Title", "Updated"];
    const SEARCH_COLUMNS: &'static [&'static str] = &["last_name", "first_name", "handle"];
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::new("first_name", "First name", FieldKind::Text).required(),
        FieldSpec::new("last_name", "Last name", FieldKind::Text).required(),
        FieldSpec::new("handle", "Handle", FieldKind::Text).required().help("Letters, digits, dots and underscores, optional leading @."),
        FieldSpec::new("title", "Professional title", FieldKind::Text).required(),
        FieldSpec::new("bio", "Biography", FieldKind::TextArea).required(),
        FieldSpec::new("photo", "Photo", FieldKind::Image).help("Path below the media directory or absolute URL."),
    ];

    fn list(conn: &Connection) -> StoreResult<Vec<Profile>> {
        content::list_profiles(conn)
    }

    fn get(conn: &Connection, id: i64) -> StoreResult<Option<Profile>> {
        content::read_profile(conn, id)
    }

    fn id(record: &Profile) -> i64 {
        record.id
    }

    fn cells(p: &Profile) -> Vec<Cell> {
        vec![
            html(image_preview(&p.photo, 50)),
            text(p.full_name()),
            text(p.handle.as_str()),
            text(p.title.as_str()),
            date(&p.updated_at),
        ]
    }

    fn form_values(p: &Profile) -> FormValues {
        values([
            ("first_name", p.first_name.clone()),
            ("last_name", p.last_name.clone()),
            ("handle", p.handle.clone()),
            ("title", p.title.clone()),
            ("bio", p.bio.clone()),
            ("photo", p.photo.clone()),
        ])
    }

    fn from_form(form: &FormValues) -> Result<ProfileDraft, AdminHelperError> {
        let mut r = FormReader::new(form);
        let draft = ProfileDraft {
            first_name: r.required("first_name", "First name"),
            last_name: r.required("last_name", "Last name"),
            handle: r.required("handle", "Handle"),
            title: r.required("title", "Professional title"),
            bio: r.required("bio", "Biography"),
            photo: r.optional("photo"),
        };
        if !draft.handle.is_empty() && !is_valid_handle(&draft.handle) {
            r.errors.push("Handle may only contain letters, digits, dots and underscores.".to_string());
        }
        r.finish(draft)
    }

    fn insert(conn: &Connection, draft: &ProfileDraft) -> StoreResult<i64> {
        content::create_profile(conn, draft)
    }

    fn update(conn: &Connection, id: i64, draft: &ProfileDraft) -> StoreResult<()> {
        content::update_profile(conn, id, draft)
    }

    fn previews(p: &Profile) -> Vec<(&'static str, String)> {
        vec![("photo", image_preview(&p.photo, 200))]
    }
}

// ====================================================================
// ============================= PROJECTS =============================
// ====================================================================

pub struct ProjectAdmin;

impl AdminResource for ProjectAdmin {
    type Record = Project;
    type Draft = ProjectDraft;

    const KEY: &'static str = "projects";
    const LABEL: &'static str = "Projects";
    const SINGULAR: &'static str = "project";
    const TABLE: Table = Table::Projects;
    const COLUMNS: &'static [&'static str] = &["Image", "Title", "Status", "Featured", "Order", "Created"];
    const SEARCH_COLUMNS: &'static [&'static str] = &["title", "short_description"];
    const FILTERS: &'static [ListFilter] = &[
        ListFilter::choice("status", "Status", ProjectStatus::choices),
        ListFilter::flag("featured", "Featured"),
    ];
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::new("title", "Title", FieldKind::Text).required(),
        FieldSpec::new("slug", "Slug", FieldKind::Text).help("Leave empty to derive it from the title. Never changed automatically afterwards."),
        FieldSpec::new("short_description", "Short description", FieldKind::TextArea).required().help("At most 300 characters."),
        FieldSpec::new("description", "Description", FieldKind::TextArea).required(),
        FieldSpec::new("image", "Image", FieldKind::Image),
        FieldSpec::new("status", "Status", FieldKind::Choice(ProjectStatus::choices)).required(),
        FieldSpec::new("technologies", "Technologies", FieldKind::Technologies).help("Comma-separated, in display order."),
        FieldSpec::new("display_order", "Display order", FieldKind::Number),
        FieldSpec::new("featured", "Featured", FieldKind::Checkbox),
        FieldSpec::new("demo_url", "Demo URL", FieldKind::Url),
        FieldSpec::new("repo_url", "Repository URL", FieldKind::Url),
    ];
    const BULK_ACTIONS: &'static [BulkAction] = &[
        BulkAction { name: "mark_featured", label: "Mark as featured", column: "featured", value: true },
        BulkAction { name: "unmark_featured", label: "Remove from featured", column: "featured", value: false },
    ];

    fn defaults() -> FormValues {
        values([("status", ProjectStatus::default().as_str().to_string())])
    }

    fn list(conn: &Connection) -> StoreResult<Vec<Project>> {
        content::list_all_projects(conn)
    }

    fn get(conn: &Connection, id: i64) -> StoreResult<Option<Project>> {
        content::read_project(conn, id)
    }

    fn id(record: &Project) -> i64 {
        record.id
    }

    fn cells(p: &Project) -> Vec<Cell> {
        vec![
            html(image_preview(&p.image, 50)),
            text(p.title.as_str()),
            text(p.status.label()),
            yes_no(p.featured),
            text(p.display_order.to_string()),
            date(&p.created_at),
        ]
    }

    fn form_values(p: &Project) -> FormValues {
        values([
            ("title", p.title.clone()),
            ("slug", p.slug.clone()),
            ("short_description", p.short_description.clone()),
            ("description", p.description.clone()),
            ("image", p.image.clone()),
            ("status", p.status.as_str().to_string()),
            ("technologies", p.technologies.join(", ")),
            ("display_order", p.display_order.to_string()),
            ("featured", flag_value(p.featured)),
            ("demo_url", p.demo_url.clone().unwrap_or_default()),
            ("repo_url", p.repo_url.clone().unwrap_or_default()),
        ])
    }

    fn from_form(form: &FormValues) -> Result<ProjectDraft, AdminHelperError> {
        let mut r = FormReader::new(form);
        let draft = ProjectDraft {
            title: r.required("title", "Title"),
            slug: non_empty(r.optional("slug")),
            short_description: r.required("short_description", "Short description"),
            description: r.required("description", "Description"),
            image: r.optional("image"),
            status: r.choice("status", "Status", ProjectStatus::default()),
            technologies: parse_technologies(r.raw("technologies")),
            display_order: r.number("display_order", "Display order"),
            featured: r.flag("featured"),
            demo_url: r.optional_url("demo_url", "Demo URL"),
            repo_url: r.optional_url("repo_url", "Repository URL"),
        };
        r.max_chars(&draft.short_description, "Short description", SHORT_DESCRIPTION_MAX);
        r.finish(draft)
    }

    fn insert(conn: &Connection, draft: &ProjectDraft) -> StoreResult<i64> {
        content::create_project(conn, draft)
    }

    fn update(conn: &Connection, id: i64, draft: &ProjectDraft) -> StoreResult<()> {
        content::update_project(conn, id, draft)
    }

    fn previews(p: &Project) -> Vec<(&'static str, String)> {
        vec![("image", image_preview(&p.image, 200))]
    }
}

// ====================================================================
// ============================== SKILLS ==============================
// ====================================================================

pub struct SkillAdmin;

impl AdminResource for SkillAdmin {
    type Record = Skill;
    type Draft = SkillDraft;

    const KEY: &'static str = "skills";
    const LABEL: &'static str = "Skills";
    const SINGULAR: &'static str = "skill";
    const TABLE: Table = Table::Skills;
    const COLUMNS: &'static [&'static str] = &["Icon", "Name", "Order"];
    const SEARCH_COLUMNS: &'static [&'static str] = &["name", "description"];
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::new("name", "Name", FieldKind::Text).required(),
        FieldSpec::new("description", "Description", FieldKind::TextArea).required(),
        FieldSpec::new("icon_class", "Icon class", FieldKind::Text).required().help("Font Awesome class, e.g. fab fa-rust."),
        FieldSpec::new("display_order", "Display order", FieldKind::Number),
    ];

    fn list(conn: &Connection) -> StoreResult<Vec<Skill>> {
        content::list_skills(conn)
    }

    fn get(conn: &Connection, id: i64) -> StoreResult<Option<Skill>> {
        content::read_skill(conn, id)
    }

    fn id(record: &Skill) -> i64 {
        record.id
    }

    fn cells(s: &Skill) -> Vec<Cell> {
        vec![html(icon_preview(&s.icon_class)), text(s.name.as_str()), text(s.display_order.to_string())]
    }

    fn form_values(s: &Skill) -> FormValues {
        values([
            ("name", s.name.clone()),
            ("description", s.description.clone()),
            ("icon_class", s.icon_class.clone()),
            ("display_order", s.display_order.to_string()),
        ])
    }

    fn from_form(form: &FormValues) -> Result<SkillDraft, AdminHelperError> {
        let mut r = FormReader::new(form);
        let draft = SkillDraft {
            name: r.required("name", "Name"),
            description: r.required("description", "Description"),
            icon_class: r.required("icon_class", "Icon class"),
            display_order: r.number("display_order", "Display order"),
        };
        r.finish(draft)
    }

    fn insert(conn: &Connection, draft: &SkillDraft) -> StoreResult<i64> {
        content::create_skill(conn, draft)
    }

    fn update(conn: &Connection, id: i64, draft: &SkillDraft) -> StoreResult<()> {
        content::update_skill(conn, id, draft)
    }

    fn previews(s: &Skill) -> Vec<(&'static str, String)> {
        vec![("icon_class", icon_preview(&s.icon_class))]
    }
}

// ====================================================================
// =============================== NEWS ===============================
// ====================================================================

pub struct NewsAdmin;

impl AdminResource for NewsAdmin {
    type Record = News;
    type Draft = NewsDraft;

    const KEY: &'static str = "news";
    const LABEL: &'static str = "News";
    const SINGULAR: &'static str = "news item";
    const TABLE: Table = Table::News;
    const COLUMNS: &'static [&'static str] = &["Image", "Title", "Platform", "Published", "Order"];
    const SEARCH_COLUMNS: &'static [&'static str] = &["title", "description"];
    const FILTERS: &'static [ListFilter] = &[ListFilter::choice("platform", "Platform", NewsPlatform::choices)];
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::new("title", "Title", FieldKind::Text).required(),
        FieldSpec::new("description", "Description", FieldKind::TextArea).required(),
        FieldSpec::new("image", "Image", FieldKind::Image),
        FieldSpec::new("link", "Link", FieldKind::Url).required(),
        FieldSpec::new("platform", "Platform", FieldKind::Choice(NewsPlatform::choices)).required(),
        FieldSpec::new("display_order", "Display order", FieldKind::Number),
    ];

    fn list(conn: &Connection) -> StoreResult<Vec<News>> {
        content::list_news(conn, None)
    }

    fn get(conn: &Connection, id: i64) -> StoreResult<Option<News>> {
        content::read_news(conn, id)
    }

    fn id(record: &News) -> i64 {
        record.id
    }

    fn cells(n: &News) -> Vec<Cell> {
        vec![
            html(image_preview(&n.image, 50)),
            text(n.title.as_str()),
            html(badge(n.platform.label(), n.platform.badge_hex())),
            date(&n.published_at),
            text(n.display_order.to_string()),
        ]
    }

    fn form_values(n: &News) -> FormValues {
        values([
            ("title", n.title.clone()),
            ("description", n.description.clone()),
            ("image", n.image.clone()),
            ("link", n.link.clone()),
            ("platform", n.platform.as_str().to_string()),
            ("display_order", n.display_order.to_string()),
        ])
    }

    fn from_form(form: &FormValues) -> Result<NewsDraft, AdminHelperError> {
        let mut r = FormReader::new(form);
        let draft = NewsDraft {
            title: r.required("title", "Title"),
            description: r.required("description", "Description"),
            image: r.optional("image"),
            link: r.url("link", "Link"),
            platform: r.choice("platform", "Platform", NewsPlatform::Blog),
            display_order: r.number("display_order", "Display order"),
        };
        r.finish(draft)
    }

    fn insert(conn: &Connection, draft: &NewsDraft) -> StoreResult<i64> {
        content::create_news(conn, draft)
    }

    fn update(conn: &Connection, id: i64, draft: &NewsDraft) -> StoreResult<()> {
        content::update_news(conn, id, draft)
    }

    fn previews(n: &News) -> Vec<(&'static str, String)> {
        vec![
            ("image", image_preview(&n.image, 200)),
            ("platform", badge(n.platform.label(), n.platform.badge_hex())),
        ]
    }
}

// ====================================================================
// ============================= PARTNERS =============================
// ====================================================================

pub struct PartnerAdmin;

impl AdminResource for PartnerAdmin {
    type Record = Partner;
    type Draft = PartnerDraft;

    const KEY: &'static str = "partners";
    const LABEL: &'static str = "Partners";
    const SINGULAR: &'static str = "partner";
    const TABLE: Table = Table::Partners;
    const COLUMNS: &'static [&'static str] = &["Logo", "Name", "Website", "Active", "Order"];
    const SEARCH_COLUMNS: &'static [&'static str] = &["name", "description"];
    const FILTERS: &'static [ListFilter] = &[ListFilter::flag("active", "Active")];
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::new("name", "Name", FieldKind::Text).required(),
        FieldSpec::new("logo", "Logo", FieldKind::Image),
        FieldSpec::new("site_url", "Website", FieldKind::Url),
        FieldSpec::new("description", "Description", FieldKind::TextArea),
        FieldSpec::new("display_order", "Display order", FieldKind::Number),
        FieldSpec::new("active", "Active", FieldKind::Checkbox),
    ];
    const BULK_ACTIONS: &'static [BulkAction] = &[
        BulkAction { name: "activate", label: "Activate", column: "active", value: true },
        BulkAction { name: "deactivate", label: "Deactivate", column: "active", value: false },
    ];

    fn defaults() -> FormValues {
        values([("active", flag_value(true))])
    }

    fn list(conn: &Connection) -> StoreResult<Vec<Partner>> {
        content::list_partners(conn)
    }

    fn get(conn: &Connection, id: i64) -> StoreResult<Option<Partner>> {
        content::read_partner(conn, id)
    }

    fn id(record: &Partner) -> i64 {
        record.id
    }

    fn cells(p: &Partner) -> Vec<Cell> {
        vec![
            html(image_preview(&p.logo, 40)),
            text(p.name.as_str()),
            text(p.site_url.clone().unwrap_or_default()),
            yes_no(p.active),
            text(p.display_order.to_string()),
        ]
    }

    fn form_values(p: &Partner) -> FormValues {
        values([
            ("name", p.name.clone()),
            ("logo", p.logo.clone()),
            ("site_url", p.site_url.clone().unwrap_or_default()),
            ("description", p.description.clone()),
            ("display_order", p.display_order.to_string()),
            ("active", flag_value(p.active)),
        ])
    }

    fn from_form(form: &FormValues) -> Result<PartnerDraft, AdminHelperError> {
        let mut r = FormReader::new(form);
        let draft = PartnerDraft {
            name: r.required("name", "Name"),
            logo: r.optional("logo"),
            site_url: r.optional_url("site_url", "Website"),
            description: r.optional("description"),
            display_order: r.number("display_order", "Display order"),
            active: r.flag("active"),
        };
        r.finish(draft)
    }

    fn insert(conn: &Connection, draft: &PartnerDraft) -> StoreResult<i64> {
        content::create_partner(conn, draft)
    }

    fn update(conn: &Connection, id: i64, draft: &PartnerDraft) -> StoreResult<()> {
        content::update_partner(conn, id, draft)
    }

    fn previews(p: &Partner) -> Vec<(&'static str, String)> {
        vec![("logo", image_preview(&p.logo, 100))]
    }
}

// ====================================================================
// ============================= GALLERY ==============================
// ====================================================================

pub struct GalleryAdmin;

impl AdminResource for GalleryAdmin {
    type Record = GalleryItem;
    type Draft = GalleryDraft;

    const KEY: &'static str = "gallery";
    const LABEL: &'static str = "Social gallery";
    const SINGULAR: &'static str = "gallery item";
    const TABLE: Table = Table::GalleryItems;
    const COLUMNS: &'static [&'static str] = &["Image", "Title", "Slug", "Order", "Created"];
    const SEARCH_COLUMNS: &'static [&'static str] = &["title", "short_description"];
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::new("title", "Title", FieldKind::Text).required(),
        FieldSpec::new("slug", "Slug", FieldKind::Text).help("Leave empty to derive it from the title. Never changed automatically afterwards."),
        FieldSpec::new("image", "Image", FieldKind::Image),
        FieldSpec::new("short_description", "Short description", FieldKind::TextArea).required().help("At most 300 characters."),
        FieldSpec::new("content", "Content", FieldKind::TextArea).required(),
        FieldSpec::new("display_order", "Display order", FieldKind::Number),
    ];

    fn list(conn: &Connection) -> StoreResult<Vec<GalleryItem>> {
        content::list_gallery(conn, None)
    }

    fn get(conn: &Connection, id: i64) -> StoreResult<Option<GalleryItem>> {
        content::read_gallery_item(conn, id)
    }

    fn id(record: &GalleryItem) -> i64 {
        record.id
    }

    fn cells(g: &GalleryItem) -> Vec<Cell> {
        vec![
            html(image_preview(&g.image, 50)),
            text(g.title.as_str()),
            text(g.slug.as_str()),
            text(g.display_order.to_string()),
            date(&g.created_at),
        ]
    }

    fn form_values(g: &GalleryItem) -> FormValues {
        values([
            ("title", g.title.clone()),
            ("slug", g.slug.clone()),
            ("image", g.image.clone()),
            ("short_description", g.short_description.clone()),
            ("content", g.content.clone()),
            ("display_order", g.display_order.to_string()),
        ])
    }

    fn from_form(form: &FormValues) -> Result<GalleryDraft, AdminHelperError> {
        let mut r = FormReader::new(form);
        let draft = GalleryDraft {
            title: r.required("title", "Title"),
            slug: non_empty(r.optional("slug")),
            image: r.optional("image"),
            short_description: r.required("short_description", "Short description"),
            content: r.required("content", "Content"),
            display_order: r.number("display_order", "Display order"),
        };
        r.max_chars(&draft.short_description, "Short description", SHORT_DESCRIPTION_MAX);
        r.finish(draft)
    }

    fn insert(conn: &Connection, draft: &GalleryDraft) -> StoreResult<i64> {
        content::create_gallery_item(conn, draft)
    }

    fn update(conn: &Connection, id: i64, draft: &GalleryDraft) -> StoreResult<()> {
        content::update_gallery_item(conn, id, draft)
    }

    fn previews(g: &GalleryItem) -> Vec<(&'static str, String)> {
        vec![("image", image_preview(&g.image, 200))]
    }
}

// ====================================================================
// =============================== FEED ===============================
// ====================================================================

pub struct FeedAdmin;

impl AdminResource for FeedAdmin {
    type Record = FeedItem;
    type Draft = FeedDraft;

    const KEY: &'static str = "feed";
    const LABEL: &'static str = "Feed";
    const SINGULAR: &'static str = "feed item";
    const TABLE: Table = Table::FeedItems;
    const COLUMNS: &'static [&'static str] = &["Image", "Alt text", "Order", "Created"];
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::new("image", "Image", FieldKind::Image).required(),
        FieldSpec::new("alt_text", "Alt text", FieldKind::Text).required(),
        FieldSpec::new("display_order", "Display order", FieldKind::Number),
    ];

    fn list(conn: &Connection) -> StoreResult<Vec<FeedItem>> {
        content::list_feed(conn, None)
    }

    fn get(conn: &Connection, id: i64) -> StoreResult<Option<FeedItem>> {
        content::read_feed_item(conn, id)
    }

    fn id(record: &FeedItem) -> i64 {
        record.id
    }

    fn cells(f: &FeedItem) -> Vec<Cell> {
        vec![
            html(image_preview(&f.image, 50)),
            text(f.alt_text.as_str()),
            text(f.display_order.to_string()),
            date(&f.created_at),
        ]
    }

    fn form_values(f: &FeedItem) -> FormValues {
        values([
            ("image", f.image.clone()),
            ("alt_text", f.alt_text.clone()),
            ("display_order", f.display_order.to_string()),
        ])
    }

    fn from_form(form: &FormValues) -> Result<FeedDraft, AdminHelperError> {
        let mut r = FormReader::new(form);
        let draft = FeedDraft {
            image: r.required("image", "Image"),
            alt_text: r.required("alt_text", "Alt text"),
            display_order: r.number("display_order", "Display order"),
        };
        r.finish(draft)
    }

    fn insert(conn: &Connection, draft: &FeedDraft) -> StoreResult<i64> {
        content::create_feed_item(conn, draft)
    }

    fn update(conn: &Connection, id: i64, draft: &FeedDraft) -> StoreResult<()> {
        content::update_feed_item(conn, id, draft)
    }

    fn previews(f: &FeedItem) -> Vec<(&'static str, String)> {
        vec![("image", image_preview(&f.image, 200))]
    }
}

// ====================================================================
// ============================ NEWSLETTER ============================
// ====================================================================

pub struct SubscriberAdmin;

impl AdminResource for SubscriberAdmin {
    type Record = Subscriber;
    type Draft = SubscriberDraft;

    const KEY: &'static str = "newsletter";
    const LABEL: &'static str = "Newsletter subscribers";
    const SINGULAR: &'static str = "subscriber";
    const TABLE: Table = Table::NewsletterSubscribers;
    const COLUMNS: &'static [&'static str] = &["Email", "Active", "Subscribed"];
    const SEARCH_COLUMNS: &'static [&'static str] = &["email"];
    const FILTERS: &'static [ListFilter] = &[ListFilter::flag("active", "Active")];
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::new("email", "Email", FieldKind::Email).required(),
        FieldSpec::new("active", "Active", FieldKind::Checkbox),
    ];
    const BULK_ACTIONS: &'static [BulkAction] = &[
        BulkAction { name: "activate", label: "Activate", column: "active", value: true },
        BulkAction { name: "deactivate", label: "Deactivate", column: "active", value: false },
    ];

    fn defaults() -> FormValues {
        values([("active", flag_value(true))])
    }

    fn list(conn: &Connection) -> StoreResult<Vec<Subscriber>> {
        intake::list_subscribers(conn)
    }

    fn get(conn: &Connection, id: i64) -> StoreResult<Option<Subscriber>> {
        intake::read_subscriber(conn, id)
    }

    fn id(record: &Subscriber) -> i64 {
        record.id
    }

    fn cells(s: &Subscriber) -> Vec<Cell> {
        vec![text(s.email.as_str()), yes_no(s.active), date(&s.subscribed_at)]
    }

    fn form_values(s: &Subscriber) -> FormValues {
        values([("email", s.email.clone()), ("active", flag_value(s.active))])
    }

    fn from_form(form: &FormValues) -> Result<SubscriberDraft, AdminHelperError> {
        let mut r = FormReader::new(form);
        let email = match intake_helpers::validate_email(r.raw("email")) {
            Ok(email) => email,
            Err(e) => {
                r.errors.push(e.user_message().to_string());
                String::new()
            }
        };
        let draft = SubscriberDraft { email, active: r.flag("active") };
        r.finish(draft)
    }

    fn insert(conn: &Connection, draft: &SubscriberDraft) -> StoreResult<i64> {
        intake::create_subscriber(conn, draft).map(|s| s.id)
    }

    fn update(conn: &Connection, id: i64, draft: &SubscriberDraft) -> StoreResult<()> {
        intake::update_subscriber(conn, id, draft)
    }
}

// ====================================================================
// ========================= CONTACT MESSAGES =========================
// ====================================================================

pub struct ContactMessageAdmin;

impl AdminResource for ContactMessageAdmin {
    type Record = ContactMessage;
    type Draft = ContactMessageDraft;

    const KEY: &'static str = "messages";
    const LABEL: &'static str = "Contact messages";
    const SINGULAR: &'static str = "message";
    const TABLE: Table = Table::ContactMessages;
    const COLUMNS: &'static [&'static str] = &["Name", "Email", "Subject", "Read", "Sent"];
    const SEARCH_COLUMNS: &'static [&'static str] = &["name", "email", "subject", "message"];
    const FILTERS: &'static [ListFilter] = &[ListFilter::flag("read", "Read")];
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::new("name", "Name", FieldKind::Text).required(),
        FieldSpec::new("email", "Email", FieldKind::Email).required(),
        FieldSpec::new("subject", "Subject", FieldKind::Text).required(),
        FieldSpec::new("message", "Message", FieldKind::TextArea).required(),
        FieldSpec::new("read", "Read", FieldKind::Checkbox),
    ];
    const BULK_ACTIONS: &'static [BulkAction] = &[
        BulkAction { name: "mark_read", label: "Mark as read", column: "read", value: true },
        BulkAction { name: "mark_unread", label: "Mark as unread", column: "read", value: false },
    ];

    fn list(conn: &Connection) -> StoreResult<Vec<ContactMessage>> {
        intake::list_contact_messages(conn)
    }

    fn get(conn: &Connection, id: i64) -> StoreResult<Option<ContactMessage>> {
        intake::read_contact_message(conn, id)
    }

    fn id(record: &ContactMessage) -> i64 {
        record.id
    }

    fn cells(m: &ContactMessage) -> Vec<Cell> {
        vec![
            text(m.name.as_str()),
            text(m.email.as_str()),
            text(m.subject.as_str()),
            yes_no(m.read),
            date(&m.sent_at),
        ]
    }

    fn form_values(m: &ContactMessage) -> FormValues {
        values([
            ("name", m.name.clone()),
            ("email", m.email.clone()),
            ("subject", m.subject.clone()),
            ("message", m.message.clone()),
            ("read", flag_value(m.read)),
        ])
    }

    fn from_form(form: &FormValues) -> Result<ContactMessageDraft, AdminHelperError> {
        let mut r = FormReader::new(form);
        let draft = ContactMessageDraft {
            name: r.required("name", "Name"),
            email: r.required("email", "Email"),
            subject: r.required("subject", "Subject"),
            message: r.required("message", "Message"),
            read: r.flag("read"),
        };
        r.finish(draft)
    }

    fn insert(conn: &Connection, draft: &ContactMessageDraft) -> StoreResult<i64> {
        intake::create_contact_message(conn, draft).map(|m| m.id)
    }

    fn update(conn: &Connection, id: i64, draft: &ContactMessageDraft) -> StoreResult<()> {
        intake::update_contact_message(conn, id, draft)
    }
}

// ====================================================================
// =========================== SOCIAL LINKS ===========================
// ====================================================================

pub struct SocialLinkAdmin;

impl AdminResource for SocialLinkAdmin {
    type Record = SocialLink;
    type Draft = SocialLinkDraft;

    const KEY: &'static str = "social-links";
    const LABEL: &'static str = "Social links";
    const SINGULAR: &'static str = "social link";
    const TABLE: Table = Table::SocialLinks;
    const COLUMNS: &'static [&'static str] = &["Icon", "Platform", "Display name", "Active", "Floating widget", "Order"];
    const SEARCH_COLUMNS: &'static [&'static str] = &["display_name", "url"];
    const FILTERS: &'static [ListFilter] = &[
        ListFilter::choice("platform", "Platform", SocialPlatform::choices),
        ListFilter::flag("active", "Active"),
        ListFilter::flag("sidebar_contact", "Floating widget"),
    ];
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::new("platform", "Platform", FieldKind::Choice(SocialPlatform::choices)).required().help("One link per platform."),
        FieldSpec::new("url", "URL", FieldKind::Text).required(),
        FieldSpec::new("display_name", "Display name", FieldKind::Text).required(),
        FieldSpec::new("display_order", "Display order", FieldKind::Number),
        FieldSpec::new("active", "Active", FieldKind::Checkbox),
        FieldSpec::new("sidebar_contact", "Show in floating contact widget", FieldKind::Checkbox),
    ];
    const BULK_ACTIONS: &'static [BulkAction] = &[
        BulkAction { name: "activate", label: "Activate", column: "active", value: true },
        BulkAction { name: "deactivate", label: "Deactivate", column: "active", value: false },
    ];

    fn defaults() -> FormValues {
        values([("active", flag_value(true))])
    }

    fn list(conn: &Connection) -> StoreResult<Vec<SocialLink>> {
        content::list_social_links(conn)
    }

    fn get(conn: &Connection, id: i64) -> StoreResult<Option<SocialLink>> {
        content::read_social_link(conn, id)
    }

    fn id(record: &SocialLink) -> i64 {
        record.id
    }

    fn cells(l: &SocialLink) -> Vec<Cell> {
        vec![
            html(icon_preview(l.icon_class)),
            text(l.platform.label()),
            text(l.display_name.as_str()),
            yes_no(l.active),
            yes_no(l.sidebar_contact),
            text(l.display_order.to_string()),
        ]
    }

    fn form_values(l: &SocialLink) -> FormValues {
        values([
            ("platform", l.platform.as_str().to_string()),
            ("url", l.url.clone()),
            ("display_name", l.display_name.clone()),
            ("display_order", l.display_order.to_string()),
            ("active", flag_value(l.active)),
            ("sidebar_contact", flag_value(l.sidebar_contact)),
        ])
    }

    // The URL field also accepts mailto: links, so it is only checked for presence.
    fn from_form(form: &FormValues) -> Result<SocialLinkDraft, AdminHelperError> {
        let mut r = FormReader::new(form);
        let draft = SocialLinkDraft {
            platform: r.choice("platform", "Platform", SocialPlatform::Email),
            url: r.required("url", "URL"),
            display_name: r.required("display_name", "Display name"),
            display_order: r.number("display_order", "Display order"),
            active: r.flag("active"),
            sidebar_contact: r.flag("sidebar_contact"),
        };
        r.finish(draft)
    }

    fn insert(conn: &Connection, draft: &SocialLinkDraft) -> StoreResult<i64> {
        content::create_social_link(conn, draft)
    }

    fn update(conn: &Connection, id: i64, draft: &SocialLinkDraft) -> StoreResult<()> {
        content::update_social_link(conn, id, draft)
    }

    fn previews(l: &SocialLink) -> Vec<(&'static str, String)> {
        vec![("platform", icon_preview(l.icon_class))]
    }
}

// ====================================================================
// =========================== CONTACT INFO ===========================
// ====================================================================

pub struct ContactInfoAdmin;

impl AdminResource for ContactInfoAdmin {
    type Record = ContactInfo;
    type Draft = ContactInfoDraft;

    const KEY: &'static str = "contact-info";
    const LABEL: &'static str = "Contact information";
    const SINGULAR: &'static str = "contact information";
    const TABLE: Table = Table::ContactInfo;
    const COLUMNS: &'static [&'static str] = &["Email", "Phone", "WhatsApp", "Sidebar"];
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::new("phone", "Phone", FieldKind::Text).required(),
        FieldSpec::new("email", "Email", FieldKind::Email).required(),
        FieldSpec::new("address", "Address", FieldKind::TextArea),
        FieldSpec::new("whatsapp", "WhatsApp number", FieldKind::Text).help("Local numbers starting with 0 get the 242 country code."),
        FieldSpec::new("linkedin_url", "LinkedIn URL", FieldKind::Url),
        FieldSpec::new("show_sidebar", "Show in sidebar", FieldKind::Checkbox),
    ];

    fn defaults() -> FormValues {
        values([("show_sidebar", flag_value(true))])
    }

    fn list(conn: &Connection) -> StoreResult<Vec<ContactInfo>> {
        content::list_contact_info(conn)
    }

    fn get(conn: &Connection, id: i64) -> StoreResult<Option<ContactInfo>> {
        content::read_contact_info_by_id(conn, id)
    }

    fn id(record: &ContactInfo) -> i64 {
        record.id
    }

    fn cells(c: &ContactInfo) -> Vec<Cell> {
        vec![
            text(c.email.as_str()),
            text(c.phone.as_str()),
            text(c.whatsapp.as_str()),
            yes_no(c.show_sidebar),
        ]
    }

    fn form_values(c: &ContactInfo) -> FormValues {
        values([
            ("phone", c.phone.clone()),
            ("email", c.email.clone()),
            ("address", c.address.clone()),
            ("whatsapp", c.whatsapp.clone()),
            ("linkedin_url", c.linkedin_url.clone()),
            ("show_sidebar", flag_value(c.show_sidebar)),
        ])
    }

    fn from_form(form: &FormValues) -> Result<ContactInfoDraft, AdminHelperError> {
        let mut r = FormReader::new(form);
        let draft = ContactInfoDraft {
            phone: r.required("phone", "Phone"),
            email: r.required("email", "Email"),
            address: r.optional("address"),
            whatsapp: r.optional("whatsapp"),
            linkedin_url: r.optional_url("linkedin_url", "LinkedIn URL").unwrap_or_default(),
            show_sidebar: r.flag("show_sidebar"),
        };
        r.finish(draft)
    }

    fn insert(conn: &Connection, draft: &ContactInfoDraft) -> StoreResult<i64> {
        content::create_contact_info(conn, draft)
    }

    fn update(conn: &Connection, id: i64, draft: &ContactInfoDraft) -> StoreResult<()> {
        content::update_contact_info(conn, id, draft)
    }

    fn previews(c: &ContactInfo) -> Vec<(&'static str, String)> {
        match &c.whatsapp_url {
            Some(url) => vec![("whatsapp", html_escape::encode_text(url).into_owned())],
            None => Vec::new(),
        }
    }

    fn can_create(conn: &Connection) -> StoreResult<bool> {
        Ok(content::count_rows(conn, Table::ContactInfo)? == 0)
    }
}

// ====================================================================
// ========================== SITE SETTINGS ===========================
// ====================================================================

pub struct SiteSettingsAdmin;

impl AdminResource for SiteSettingsAdmin {
    type Record = SiteSettings;
    type Draft = SiteSettingsDraft;

    const KEY: &'static str = "site-settings";
    const LABEL: &'static str = "Site settings";
    const SINGULAR: &'static str = "site settings";
    const TABLE: Table = Table::SiteSettings;
    const COLUMNS: &'static [&'static str] = &["Site name", "Primary colour", "Updated"];
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::new("site_name", "Site name", FieldKind::Text).required(),
        FieldSpec::new("description", "Description", FieldKind::TextArea),
        FieldSpec::new("logo", "Logo", FieldKind::Image),
        FieldSpec::new("favicon", "Favicon", FieldKind::Image),
        FieldSpec::new("primary_color", "Primary colour", FieldKind::Color).required().help("Hex value, e.g. #e1306c."),
        FieldSpec::new("analytics_id", "Analytics ID", FieldKind::Text),
    ];

    fn defaults() -> FormValues {
        let defaults = SiteSettingsDraft::default();
        values([("site_name", defaults.site_name), ("primary_color", defaults.primary_color)])
    }

    fn list(conn: &Connection) -> StoreResult<Vec<SiteSettings>> {
        content::list_site_settings(conn)
    }

    fn get(conn: &Connection, id: i64) -> StoreResult<Option<SiteSettings>> {
        content::read_site_settings_by_id(conn, id)
    }

    fn id(record: &SiteSettings) -> i64 {
        record.id
    }

    fn cells(s: &SiteSettings) -> Vec<Cell> {
        vec![text(s.site_name.as_str()), html(color_swatch(&s.primary_color)), date(&s.updated_at)]
    }

    fn form_values(s: &SiteSettings) -> FormValues {
        values([
            ("site_name", s.site_name.clone()),
            ("description", s.description.clone()),
            ("logo", s.logo.clone()),
            ("favicon", s.favicon.clone()),
            ("primary_color", s.primary_color.clone()),
            ("analytics_id", s.analytics_id.clone()),
        ])
    }

    fn from_form(form: &FormValues) -> Result<SiteSettingsDraft, AdminHelperError> {
        let mut r = FormReader::new(form);
        let draft = SiteSettingsDraft {
            site_name: r.required("site_name", "Site name"),
            description: r.optional("description"),
            logo: r.optional("logo"),
            favicon: r.optional("favicon"),
            primary_color: r.required("primary_color", "Primary colour"),
            analytics_id: r.optional("analytics_id"),
        };
        if !draft.primary_color.is_empty() && !is_hex_color(&draft.primary_color) {
            r.errors.push("Primary colour must look like #rrggbb.".to_string());
        }
        r.finish(draft)
    }

    fn insert(conn: &Connection, draft: &SiteSettingsDraft) -> StoreResult<i64> {
        content::create_site_settings(conn, draft)
    }

    fn update(conn: &Connection, id: i64, draft: &SiteSettingsDraft) -> StoreResult<()> {
        content::update_site_settings(conn, id, draft)
    }

    fn previews(s: &SiteSettings) -> Vec<(&'static str, String)> {
        vec![
            ("logo", image_preview(&s.logo, 60)),
            ("favicon", image_preview(&s.favicon, 32)),
            ("primary_color", color_swatch(&s.primary_color)),
        ]
    }
}

/// Invokes `$action!(Type)`-style callbacks for every resource, keeping the
/// route table, the dashboard and the CSRF cookie paths in sync.
#[macro_export]
macro_rules! for_each_admin_resource {
    ($callback:ident) => {
        $callback!($crate::helper::admin_resources::ProfileAdmin);
        $callback!($crate::helper::admin_resources::ProjectAdmin);
        $callback!($crate::helper::admin_resources::SkillAdmin);
        $callback!($crate::helper::admin_resources::NewsAdmin);
        $callback!($crate::helper::admin_resources::PartnerAdmin);
        $callback!($crate::helper::admin_resources::GalleryAdmin);
        $callback!($crate::helper::admin_resources::FeedAdmin);
        $callback!($crate::helper::admin_resources::SubscriberAdmin);
        $callback!($crate::helper::admin_resources::ContactMessageAdmin);
        $callback!($crate::helper::admin_resources::SocialLinkAdmin);
        $callback!($crate::helper::admin_resources::ContactInfoAdmin);
        $callback!($crate::helper::admin_resources::SiteSettingsAdmin);
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(pairs: &[(&str, &str)]) -> FormValues {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn project_form_parses_every_field() {
        let draft = ProjectAdmin::from_form(&form(&[
            ("title", "Site"),
            ("short_description", "Short"),
            ("description", "Long"),
            ("status", "beta"),
            ("technologies", "Rust, Actix , ,SQLite"),
            ("display_order", "3"),
            ("featured", "on"),
            ("repo_url", "https://github.com/x/y"),
        ]))
        .unwrap();
        assert_eq!(draft.status, ProjectStatus::Beta);
        assert_eq!(draft.technologies, vec!["Rust", "Actix", "SQLite"]);
        assert_eq!(draft.display_order, 3);
        assert!(draft.featured);
        assert_eq!(draft.slug, None);
        assert_eq!(draft.demo_url, None);
    }

    #[test]
    fn project_form_collects_all_errors() {
        let long = "x".repeat(SHORT_DESCRIPTION_MAX + 1);
        let err = ProjectAdmin::from_form(&form(&[
            ("short_description", &long),
            ("description", "Long"),
            ("status", "archived"),
            ("display_order", "first"),
            ("demo_url", "ftp://nope"),
        ]))
        .unwrap_err();
        let AdminHelperError::Validation(msg) = err else { panic!("expected a validation error") };
        assert!(msg.contains("Title is required."));
        assert!(msg.contains("Status has an unknown value."));
        assert!(msg.contains("Display order must be a whole number."));
        assert!(msg.contains("Demo URL must start with"));
        assert!(msg.contains("cannot exceed 300 characters"));
    }

    #[test]
    fn settings_form_rejects_bad_colours() {
        let err = SiteSettingsAdmin::from_form(&form(&[("site_name", "Me"), ("primary_color", "red")]));
        assert!(matches!(err, Err(AdminHelperError::Validation(_))));
        let ok = SiteSettingsAdmin::from_form(&form(&[("site_name", "Me"), ("primary_color", "#112233")]));
        assert!(ok.is_ok());
    }

    #[test]
    fn subscriber_form_normalizes_email() {
        let draft = SubscriberAdmin::from_form(&form(&[("email", " A@B.io "), ("active", "on")])).unwrap();
        assert_eq!(draft.email, "a@b.io");
        assert!(draft.active);
    }

    #[test]
    fn unchecked_checkboxes_are_false() {
        let draft = PartnerAdmin::from_form(&form(&[("name", "Acme")])).unwrap();
        assert!(!draft.active);
        assert_eq!(draft.site_url, None);
    }

    #[test]
    fn form_values_round_trip_through_the_form_parser() {
        let conn = {
            let mut conn = Connection::open_in_memory().unwrap();
            crate::setup::db_setup::setup_portfolio_db(&mut conn).unwrap();
            conn
        };
        let draft = ProjectAdmin::from_form(&form(&[
            ("title", "Site"),
            ("short_description", "Short"),
            ("description", "Long"),
            ("status", "lance"),
            ("technologies", "Rust, SQLite"),
            ("featured", "on"),
        ]))
        .unwrap();
        let id = ProjectAdmin::insert(&conn, &draft).unwrap();
        let stored = ProjectAdmin::get(&conn, id).unwrap().unwrap();
        let again = ProjectAdmin::from_form(&ProjectAdmin::form_values(&stored)).unwrap();
        assert_eq!(again.technologies, draft.technologies);
        assert_eq!(again.slug.as_deref(), Some("site"));
        assert!(again.featured);
    }
}
