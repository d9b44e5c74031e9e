use crate::helper::admin_resources::{AdminResource, BulkAction, Cell, FieldKind, FilterKind, ListFilter};
use crate::models::db_operations::content_db_operations::{self, matching_ids, set_flag};
use crate::models::db_operations::{intake_db_operations, users_db_operations, StoreError};
use crate::DbPool;
use actix_web::web;
use rusqlite::types::Value;
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AdminHelperError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("R2D2 Pool error: {0}")]
    Pool(#[from] r2d2::Error),
    /// Form input the editor has to fix. Shown as is.
    #[error("{0}")]
    Validation(String),
    #[error("Record not found")]
    NotFound,
}

impl AdminHelperError {
    /// Text suitable for a back-office notification.
    pub fn user_message(&self) -> String {
        match self {
            AdminHelperError::Validation(msg) => msg.clone(),
            AdminHelperError::NotFound | AdminHelperError::Store(StoreError::NotFound(_)) => {
                "The requested record does not exist.".to_string()
            }
            AdminHelperError::Store(StoreError::SingletonExists(what)) => {
                format!("Only one {} record is allowed. Edit the existing one instead.", what)
            }
            AdminHelperError::Store(StoreError::Conflict(msg)) => msg.clone(),
            _ => "A database error occurred.".to_string(),
        }
    }
}

type PooledConn = r2d2::PooledConnection<r2d2_sqlite::SqliteConnectionManager>;

// Helper to get a connection from the pool
fn get_conn(pool: &web::Data<DbPool>) -> Result<PooledConn, AdminHelperError> {
    pool.get().map_err(AdminHelperError::Pool)
}

// ====================================================================
// ============================= ACCOUNTS =============================
// ====================================================================

/// Checks the credentials of an active account and stamps its login time.
pub fn login_admin(pool: &web::Data<DbPool>, username: &str, password: &str) -> Result<Option<String>, AdminHelperError> {
    let conn = get_conn(pool)?;
    let Some(username) = users_db_operations::verify_credentials(&conn, username, password) else {
        return Ok(None);
    };
    if let Err(e) = users_db_operations::update_last_login_time(&conn, &username) {
        log::warn!("Could not record login time for '{}': {}", username, e);
    }
    Ok(Some(username))
}

// ====================================================================
// ============================ DASHBOARD =============================
// ====================================================================

#[derive(Serialize)]
pub struct ResourceSummary {
    pub key: &'static str,
    pub label: &'static str,
    pub count: i64,
}

#[derive(Serialize)]
pub struct DashboardSummary {
    pub resources: Vec<ResourceSummary>,
    pub unread_messages: i64,
}

pub fn dashboard_summary(pool: &web::Data<DbPool>) -> Result<DashboardSummary, AdminHelperError> {
    let conn = get_conn(pool)?;
    let mut resources = Vec::new();

    macro_rules! summarize {
        ($resource:ty) => {
            resources.push(ResourceSummary {
                key: <$resource>::KEY,
                label: <$resource>::LABEL,
                count: content_db_operations::count_rows(&conn, <$resource>::TABLE)?,
            });
        };
    }
    crate::for_each_admin_resource!(summarize);

    Ok(DashboardSummary { resources, unread_messages: intake_db_operations::count_unread_messages(&conn)? })
}

#[derive(Serialize)]
pub struct NavEntry {
    pub key: &'static str,
    pub label: &'static str,
}

/// Every resource key, for navigation and for the pages that need a CSRF cookie.
pub fn resource_keys() -> Vec<NavEntry> {
    let mut keys = Vec::new();
    macro_rules! push_key {
        ($resource:ty) => {
            keys.push(NavEntry { key: <$resource>::KEY, label: <$resource>::LABEL });
        };
    }
    crate::for_each_admin_resource!(push_key);
    keys
}

// ====================================================================
// ============================ LIST VIEW =============================
// ====================================================================

#[derive(Serialize)]
pub struct ListRow {
    pub id: i64,
    pub cells: Vec<Cell>,
}

#[derive(Serialize)]
pub struct FilterView {
    pub column: &'static str,
    pub label: &'static str,
    pub options: Vec<ChoiceOption>,
}

#[derive(Serialize)]
pub struct ListView {
    pub columns: &'static [&'static str],
    pub rows: Vec<ListRow>,
    pub can_create: bool,
    pub bulk_actions: &'static [BulkAction],
    pub searchable: bool,
    pub search: String,
    pub filters: Vec<FilterView>,
    /// True when a search or a filter hides some rows.
    pub narrowed: bool,
}

fn filter_value(filter: &ListFilter, code: &str) -> Value {
    match filter.kind {
        FilterKind::Flag => Value::Integer(i64::from(code == "1")),
        FilterKind::Choice(_) => Value::Text(code.to_string()),
    }
}

/// Rows of a resource list, narrowed by the `q` search parameter and by one
/// parameter per declared filter. Filter values outside the offered options
/// are ignored.
pub fn load_list<R: AdminResource>(
    pool: &web::Data<DbPool>,
    params: &HashMap<String, String>,
) -> Result<ListView, AdminHelperError> {
    let conn = get_conn(pool)?;
    let searchable = !R::SEARCH_COLUMNS.is_empty();
    let search = match params.get("q") {
        Some(q) if searchable => q.trim().to_string(),
        _ => String::new(),
    };

    let mut conditions = Vec::new();
    let mut filters = Vec::new();
    for filter in R::FILTERS {
        let options = filter.options();
        let chosen = params
            .get(filter.column)
            .map(String::as_str)
            .filter(|value| options.iter().any(|(code, _)| code == value));
        if let Some(code) = chosen {
            conditions.push((filter.column, filter_value(filter, code)));
        }
        filters.push(FilterView {
            column: filter.column,
            label: filter.label,
            options: options
                .into_iter()
                .map(|(code, label)| ChoiceOption { value: code, label, selected: Some(code) == chosen })
                .collect(),
        });
    }

    let narrowed = !search.is_empty() || !conditions.is_empty();
    let keep = if narrowed {
        Some(matching_ids(&conn, R::TABLE, R::SEARCH_COLUMNS, &search, &conditions)?)
    } else {
        None
    };
    let rows = R::list(&conn)?
        .iter()
        .filter(|record| keep.as_ref().map_or(true, |ids| ids.contains(&R::id(record))))
        .map(|record| ListRow { id: R::id(record), cells: R::cells(record) })
        .collect();

    Ok(ListView {
        columns: R::COLUMNS,
        rows,
        can_create: R::can_create(&conn)?,
        bulk_actions: R::BULK_ACTIONS,
        searchable,
        search,
        filters,
        narrowed,
    })
}

// ====================================================================
// ============================ FORM VIEW =============================
// ====================================================================

#[derive(Serialize)]
pub struct ChoiceOption {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

#[derive(Serialize)]
pub struct FormField {
    pub name: &'static str,
    pub label: &'static str,
    pub input_type: &'static str,
    pub required: bool,
    pub help: &'static str,
    pub value: String,
    pub checked: bool,
    pub choices: Vec<ChoiceOption>,
    /// Pre-rendered HTML.
    pub preview: Option<String>,
}

/// Pairs every declared field with its current value and, when editing, its
/// read-only preview.
pub fn build_form_fields<R: AdminResource>(
    values: &HashMap<String, String>,
    previews: &[(&'static str, String)],
) -> Vec<FormField> {
    R::FIELDS
        .iter()
        .map(|spec| {
            let value = values.get(spec.name).cloned().unwrap_or_default();
            let choices = match spec.kind {
                FieldKind::Choice(options) => options()
                    .into_iter()
                    .map(|(code, label)| ChoiceOption { value: code, label, selected: code == value })
                    .collect(),
                _ => Vec::new(),
            };
            FormField {
                name: spec.name,
                label: spec.label,
                input_type: spec.kind.input_type(),
                required: spec.required,
                help: spec.help,
                checked: matches!(spec.kind, FieldKind::Checkbox) && !value.is_empty(),
                value,
                choices,
                preview: previews.iter().find(|(name, _)| *name == spec.name).map(|(_, html)| html.clone()),
            }
        })
        .collect()
}

/// Current values and previews of an existing record.
pub fn load_record<R: AdminResource>(
    pool: &web::Data<DbPool>,
    id: i64,
) -> Result<(HashMap<String, String>, Vec<(&'static str, String)>), AdminHelperError> {
    let conn = get_conn(pool)?;
    let record = R::get(&conn, id)?.ok_or(AdminHelperError::NotFound)?;
    Ok((R::form_values(&record), R::previews(&record)))
}

pub fn can_create<R: AdminResource>(pool: &web::Data<DbPool>) -> Result<bool, AdminHelperError> {
    let conn = get_conn(pool)?;
    Ok(R::can_create(&conn)?)
}

// ====================================================================
// ============================== WRITES ==============================
// ====================================================================

pub fn create_record<R: AdminResource>(
    pool: &web::Data<DbPool>,
    form: &HashMap<String, String>,
) -> Result<i64, AdminHelperError> {
    let draft = R::from_form(form)?;
    let conn = get_conn(pool)?;
    Ok(R::insert(&conn, &draft)?)
}

pub fn update_record<R: AdminResource>(
    pool: &web::Data<DbPool>,
    id: i64,
    form: &HashMap<String, String>,
) -> Result<(), AdminHelperError> {
    let draft = R::from_form(form)?;
    let conn = get_conn(pool)?;
    Ok(R::update(&conn, id, &draft)?)
}

pub fn delete_record<R: AdminResource>(pool: &web::Data<DbPool>, id: i64) -> Result<(), AdminHelperError> {
    let conn = get_conn(pool)?;
    match content_db_operations::delete_row(&conn, R::TABLE, id)? {
        0 => Err(AdminHelperError::NotFound),
        _ => Ok(()),
    }
}

/// Ids ticked in a list form. Checkboxes are named `id_<n>`.
pub fn selected_ids(form: &HashMap<String, String>) -> Vec<i64> {
    let mut ids: Vec<i64> = form
        .keys()
        .filter_map(|key| key.strip_prefix("id_"))
        .filter_map(|id| id.parse().ok())
        .collect();
    ids.sort_unstable();
    ids
}

/// Runs a named bulk action and returns how many rows it touched.
pub fn apply_bulk_action<R: AdminResource>(
    pool: &web::Data<DbPool>,
    action: &str,
    ids: &[i64],
) -> Result<usize, AdminHelperError> {
    let action = R::BULK_ACTIONS
        .iter()
        .find(|a| a.name == action)
        .ok_or_else(|| AdminHelperError::Validation("Unknown action.".to_string()))?;
    if ids.is_empty() {
        return Err(AdminHelperError::Validation("Select at least one row.".to_string()));
    }
    let mut conn = get_conn(pool)?;
    Ok(set_flag(&mut conn, R::TABLE, action.column, ids, action.value)?)
}
