use crate::config::Config;
use crate::helper::admin_helpers::{self, AdminHelperError};
use crate::helper::admin_resources::{AdminResource, FormValues};
use crate::middleware::{admin_guard, ip_guard, AuthenticatedAdmin, SESSION_ADMIN_KEY};
use crate::models::Notification;
use crate::DbPool;
use actix_csrf::extractor::{Csrf, CsrfGuarded, CsrfToken};
use actix_csrf::CsrfMiddleware;
use actix_session::{Session, SessionExt};
use actix_web::dev::HttpServiceFactory;
use actix_web::http::Method;
use actix_web::{guard, web, HttpResponse, Responder};
use rand::prelude::StdRng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tera::{Context, Tera};

#[derive(Deserialize)]
struct LoginForm {
    csrf_token: CsrfToken,
    username: String,
    password: String,
}

impl CsrfGuarded for LoginForm {
    fn csrf_token(&self) -> &CsrfToken {
        &self.csrf_token
    }
}

/// Any back-office form: the CSRF token plus whatever fields it carries.
#[derive(Deserialize)]
struct AdminForm {
    csrf_token: CsrfToken,
    #[serde(flatten)]
    fields: HashMap<String, String>,
}

impl CsrfGuarded for AdminForm {
    fn csrf_token(&self) -> &CsrfToken {
        &self.csrf_token
    }
}

#[derive(Serialize)]
struct ResourceMeta {
    key: &'static str,
    label: &'static str,
    singular: &'static str,
}

fn meta<R: AdminResource>() -> ResourceMeta {
    ResourceMeta { key: R::KEY, label: R::LABEL, singular: R::SINGULAR }
}

/// The whole back office, mounted under `/management/{prefix}`: login pages
/// open to allowed addresses, everything else additionally behind a session.
pub fn admin_scope(prefix: &str, allowed_ips: String) -> impl HttpServiceFactory {
    let root = format!("/management/{}", prefix);

    let mut csrf = CsrfMiddleware::<StdRng>::new()
        .set_cookie(Method::GET, format!("{}/login", root))
        .set_cookie(Method::GET, format!("{}/dashboard", root));
    for entry in admin_helpers::resource_keys() {
        let key = entry.key;
        csrf = csrf
            .set_cookie(Method::GET, format!("{}/{}", root, key))
            .set_cookie(Method::GET, format!("{}/{}/new", root, key))
            .set_cookie(Method::GET, format!("{}/{}/{{id}}/edit", root, key));
    }

    web::scope(&root)
        .wrap(csrf)
        .guard(guard::fn_guard(move |ctx| ip_guard(ctx, &allowed_ips)))
        .configure(config_login)
        .service(
            web::scope("")
                .guard(guard::fn_guard(|ctx| admin_guard(&ctx.get_session())))
                .configure(config_dashboard),
        )
}

pub fn config_login(cfg: &mut web::ServiceConfig) {
    cfg.route("/login", web::get().to(show_admin_login_form))
        .route("/login", web::post().to(handle_admin_login))
        .route("/logout", web::post().to(handle_admin_logout));
}

pub fn config_dashboard(cfg: &mut web::ServiceConfig) {
    cfg.route("/dashboard", web::get().to(show_admin_dashboard));
    macro_rules! register {
        ($resource:ty) => {
            cfg.configure(config_resource::<$resource>);
        };
    }
    crate::for_each_admin_resource!(register);
}

fn config_resource<R: AdminResource>(cfg: &mut web::ServiceConfig) {
    let base = format!("/{}", R::KEY);
    cfg.route(&base, web::get().to(show_list::<R>))
        .route(&format!("{}/new", base), web::get().to(show_create_form::<R>))
        .route(&format!("{}/new", base), web::post().to(create_action::<R>))
        .route(&format!("{}/bulk", base), web::post().to(bulk_action::<R>))
        .route(&format!("{}/{{id}}/edit", base), web::get().to(show_edit_form::<R>))
        .route(&format!("{}/{{id}}/edit", base), web::post().to(update_action::<R>))
        .route(&format!("{}/{{id}}/delete", base), web::post().to(delete_action::<R>));
}

fn admin_url(config: &Config, path: &str) -> String {
    format!("/management/{}/{}", config.admin_url_prefix, path)
}

fn redirect(location: String) -> HttpResponse {
    HttpResponse::Found().append_header(("location", location)).finish()
}

fn set_notification(session: &Session, message: &str, r#type: &str) {
    let notification = Notification { message: message.to_string(), r#type: r#type.to_string() };
    if let Err(e) = session.insert("notification", &notification) {
        log::error!("Failed to store notification in session: {}", e);
    }
}

fn render(tera: &Tera, template: &str, ctx: &Context) -> HttpResponse {
    match tera.render(template, ctx) {
        Ok(rendered) => HttpResponse::Ok().content_type("text/html; charset=utf-8").body(rendered),
        Err(err) => {
            log::error!("Template rendering error in {}: {}", template, err);
            HttpResponse::InternalServerError().body("Error rendering page.")
        }
    }
}

/// Values shared by every authenticated page: prefix, token, user, navigation
/// and a pending notification.
fn page_context(config: &Config, token: &CsrfToken, session: &Session, user: &AuthenticatedAdmin) -> Context {
    let mut ctx = Context::new();
    ctx.insert("admin_url_prefix", &config.admin_url_prefix);
    ctx.insert("csrf_token", token.get());
    ctx.insert("user", user);
    ctx.insert("navigation", &admin_helpers::resource_keys());
    if let Ok(Some(notification)) = session.get::<Notification>("notification") {
        ctx.insert("notification", &notification);
        session.remove("notification");
    }
    ctx
}

// ====================================================================
// ============================== LOGIN ===============================
// ====================================================================

async fn show_admin_login_form(
    session: Session,
    tera: web::Data<Tera>,
    token: CsrfToken,
    config: web::Data<Config>,
) -> impl Responder {
    if admin_guard(&session) {
        return redirect(admin_url(&config, "dashboard"));
    }

    let mut ctx = Context::new();
    ctx.insert("admin_url_prefix", &config.admin_url_prefix);
    ctx.insert("csrf_token", token.get());

    if let Ok(Some(error)) = session.get::<String>("error") {
        ctx.insert("error", &error);
        session.remove("error");
    }

    render(&tera, "admin/login.html", &ctx)
}

async fn handle_admin_login(
    session: Session,
    pool: web::Data<DbPool>,
    form: Csrf<web::Form<LoginForm>>,
    config: web::Data<Config>,
) -> impl Responder {
    let login_data = form.into_inner();

    match admin_helpers::login_admin(&pool, login_data.username.trim(), &login_data.password) {
        Ok(Some(username)) => {
            session.renew();
            session.remove("error");
            if let Err(e) = session.insert(SESSION_ADMIN_KEY, &username) {
                log::error!("Failed to store admin session for '{}': {}", username, e);
                return HttpResponse::InternalServerError().body("Session error.");
            }
            log::info!("Admin '{}' logged in.", username);
            redirect(admin_url(&config, "dashboard"))
        }
        Ok(None) => {
            log::warn!("Failed back-office login attempt for '{}'.", login_data.username);
            if let Err(e) = session.insert("error", "Invalid credentials or account suspended.") {
                log::error!("Failed to store login error in session: {}", e);
            }
            redirect(admin_url(&config, "login"))
        }
        Err(e) => {
            log::error!("Login failed on a database error: {}", e);
            HttpResponse::InternalServerError().body("A database error occurred.")
        }
    }
}

async fn handle_admin_logout(session: Session, config: web::Data<Config>) -> impl Responder {
    session.purge();
    redirect(admin_url(&config, "login"))
}

// ====================================================================
// ============================ DASHBOARD =============================
// ====================================================================

async fn show_admin_dashboard(
    auth_user: AuthenticatedAdmin,
    session: Session,
    tera: web::Data<Tera>,
    pool: web::Data<DbPool>,
    token: CsrfToken,
    config: web::Data<Config>,
) -> impl Responder {
    let mut ctx = page_context(&config, &token, &session, &auth_user);

    match admin_helpers::dashboard_summary(&pool) {
        Ok(summary) => ctx.insert("summary", &summary),
        Err(e) => {
            log::error!("Failed to load dashboard summary: {}", e);
            ctx.insert("error", "Could not load the dashboard counters.");
        }
    }

    render(&tera, "admin/dashboard.html", &ctx)
}

// ====================================================================
// ========================= RESOURCE PAGES ===========================
// ====================================================================

async fn show_list<R: AdminResource>(
    auth_user: AuthenticatedAdmin,
    session: Session,
    tera: web::Data<Tera>,
    pool: web::Data<DbPool>,
    token: CsrfToken,
    config: web::Data<Config>,
    query: web::Query<HashMap<String, String>>,
) -> impl Responder {
    let mut ctx = page_context(&config, &token, &session, &auth_user);
    ctx.insert("resource", &meta::<R>());

    match admin_helpers::load_list::<R>(&pool, &query) {
        Ok(list) => ctx.insert("list", &list),
        Err(e) => {
            log::error!("Failed to list {}: {}", R::KEY, e);
            return HttpResponse::InternalServerError().body("Error loading records.");
        }
    }

    render(&tera, "admin/list.html", &ctx)
}

/// Renders the create/edit form. `record_id` is `None` when creating.
fn render_form<R: AdminResource>(
    tera: &Tera,
    mut ctx: Context,
    record_id: Option<i64>,
    values: &FormValues,
    previews: &[(&'static str, String)],
    error: Option<String>,
) -> HttpResponse {
    ctx.insert("resource", &meta::<R>());
    ctx.insert("record_id", &record_id);
    ctx.insert("fields", &admin_helpers::build_form_fields::<R>(values, previews));
    if let Some(error) = error {
        ctx.insert("form_error", &error);
    }
    render(tera, "admin/form.html", &ctx)
}

async fn show_create_form<R: AdminResource>(
    auth_user: AuthenticatedAdmin,
    session: Session,
    tera: web::Data<Tera>,
    pool: web::Data<DbPool>,
    token: CsrfToken,
    config: web::Data<Config>,
) -> impl Responder {
    match admin_helpers::can_create::<R>(&pool) {
        Ok(true) => {}
        Ok(false) => {
            set_notification(&session, &format!("Only one {} record is allowed.", R::SINGULAR), "error");
            return redirect(admin_url(&config, R::KEY));
        }
        Err(e) => {
            log::error!("Failed to check whether {} can be created: {}", R::KEY, e);
            return HttpResponse::InternalServerError().body("A database error occurred.");
        }
    }
    let ctx = page_context(&config, &token, &session, &auth_user);
    render_form::<R>(&tera, ctx, None, &R::defaults(), &[], None)
}

async fn create_action<R: AdminResource>(
    auth_user: AuthenticatedAdmin,
    session: Session,
    tera: web::Data<Tera>,
    pool: web::Data<DbPool>,
    form: Csrf<web::Form<AdminForm>>,
    config: web::Data<Config>,
) -> impl Responder {
    let submitted = form.into_inner().into_inner();

    match admin_helpers::create_record::<R>(&pool, &submitted.fields) {
        Ok(id) => {
            log::info!("'{}' created {} {}", auth_user.username, R::SINGULAR, id);
            set_notification(&session, &format!("The {} was created.", R::SINGULAR), "success");
            redirect(admin_url(&config, R::KEY))
        }
        Err(AdminHelperError::Validation(msg)) => {
            let ctx = page_context(&config, &submitted.csrf_token, &session, &auth_user);
            render_form::<R>(&tera, ctx, None, &submitted.fields, &[], Some(msg))
        }
        Err(e) => {
            log::error!("Failed to create {}: {}", R::SINGULAR, e);
            set_notification(&session, &e.user_message(), "error");
            redirect(admin_url(&config, R::KEY))
        }
    }
}

async fn show_edit_form<R: AdminResource>(
    auth_user: AuthenticatedAdmin,
    session: Session,
    tera: web::Data<Tera>,
    pool: web::Data<DbPool>,
    token: CsrfToken,
    path: web::Path<i64>,
    config: web::Data<Config>,
) -> impl Responder {
    let id = path.into_inner();
    match admin_helpers::load_record::<R>(&pool, id) {
        Ok((values, previews)) => {
            let ctx = page_context(&config, &token, &session, &auth_user);
            render_form::<R>(&tera, ctx, Some(id), &values, &previews, None)
        }
        Err(e) => {
            if !matches!(e, AdminHelperError::NotFound) {
                log::error!("Failed to load {} {}: {}", R::SINGULAR, id, e);
            }
            set_notification(&session, &e.user_message(), "error");
            redirect(admin_url(&config, R::KEY))
        }
    }
}

async fn update_action<R: AdminResource>(
    auth_user: AuthenticatedAdmin,
    session: Session,
    tera: web::Data<Tera>,
    pool: web::Data<DbPool>,
    path: web::Path<i64>,
    form: Csrf<web::Form<AdminForm>>,
    config: web::Data<Config>,
) -> impl Responder {
    let id = path.into_inner();
    let submitted = form.into_inner().into_inner();

    match admin_helpers::update_record::<R>(&pool, id, &submitted.fields) {
        Ok(()) => {
            log::info!("'{}' updated {} {}", auth_user.username, R::SINGULAR, id);
            set_notification(&session, &format!("The {} was saved.", R::SINGULAR), "success");
            redirect(admin_url(&config, R::KEY))
        }
        Err(AdminHelperError::Validation(msg)) => {
            let previews = admin_helpers::load_record::<R>(&pool, id).map(|(_, p)| p).unwrap_or_default();
            let ctx = page_context(&config, &submitted.csrf_token, &session, &auth_user);
            render_form::<R>(&tera, ctx, Some(id), &submitted.fields, &previews, Some(msg))
        }
        Err(e) => {
            log::error!("Failed to update {} {}: {}", R::SINGULAR, id, e);
            set_notification(&session, &e.user_message(), "error");
            redirect(admin_url(&config, R::KEY))
        }
    }
}

async fn delete_action<R: AdminResource>(
    auth_user: AuthenticatedAdmin,
    session: Session,
    pool: web::Data<DbPool>,
    path: web::Path<i64>,
    _form: Csrf<web::Form<AdminForm>>,
    config: web::Data<Config>,
) -> impl Responder {
    let id = path.into_inner();
    match admin_helpers::delete_record::<R>(&pool, id) {
        Ok(()) => {
            log::info!("'{}' deleted {} {}", auth_user.username, R::SINGULAR, id);
            set_notification(&session, &format!("The {} was deleted.", R::SINGULAR), "success");
        }
        Err(e) => {
            log::error!("Failed to delete {} {}: {}", R::SINGULAR, id, e);
            set_notification(&session, &e.user_message(), "error");
        }
    }
    redirect(admin_url(&config, R::KEY))
}

async fn bulk_action<R: AdminResource>(
    auth_user: AuthenticatedAdmin,
    session: Session,
    pool: web::Data<DbPool>,
    form: Csrf<web::Form<AdminForm>>,
    config: web::Data<Config>,
) -> impl Responder {
    let submitted = form.into_inner().into_inner();
    let action = submitted.fields.get("action").map(|a| a.trim()).unwrap_or("");
    let ids = admin_helpers::selected_ids(&submitted.fields);

    match admin_helpers::apply_bulk_action::<R>(&pool, action, &ids) {
        Ok(count) => {
            log::info!("'{}' ran '{}' on {} {} row(s)", auth_user.username, action, count, R::KEY);
            set_notification(&session, &format!("{} row(s) updated.", count), "success");
        }
        Err(e) => {
            if !matches!(e, AdminHelperError::Validation(_)) {
                log::error!("Bulk action '{}' on {} failed: {}", action, R::KEY, e);
            }
            set_notification(&session, &e.user_message(), "error");
        }
    }
    redirect(admin_url(&config, R::KEY))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use crate::helper::admin_resources::ProjectAdmin;
    use crate::test_support::{memory_pool, tera};
    use actix_session::storage::CookieSessionStore;
    use actix_session::SessionMiddleware;
    use actix_web::cookie::Key;
    use actix_web::{http::StatusCode, test, App};

    async fn seed_session(session: Session) -> HttpResponse {
        session.insert(SESSION_ADMIN_KEY, "admin").unwrap();
        HttpResponse::Ok().finish()
    }

    macro_rules! admin_app {
        ($pool:expr, $allowed:expr) => {{
            let config = test_config();
            test::init_service(
                App::new()
                    .app_data(web::Data::new(config.clone()))
                    .app_data(web::Data::new(tera()))
                    .app_data(web::Data::new($pool))
                    .wrap(
                        SessionMiddleware::builder(CookieSessionStore::default(), Key::generate())
                            .cookie_secure(false)
                            .build(),
                    )
                    .route("/seed-session", web::get().to(seed_session))
                    .service(admin_scope(&config.admin_url_prefix, $allowed.to_string())),
            )
            .await
        }};
    }

    #[actix_web::test]
    async fn dashboard_requires_a_session() {
        let app = admin_app!(memory_pool(), "*");
        let req = test::TestRequest::get().uri("/management/test-admin/dashboard").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn login_page_is_hidden_from_other_addresses() {
        let app = admin_app!(memory_pool(), "10.1.2.3");
        let req = test::TestRequest::get()
            .uri("/management/test-admin/login")
            .insert_header(("X-Forwarded-For", "192.168.0.9"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn logged_in_admin_sees_resource_lists() {
        let pool = memory_pool();
        {
            let conn = pool.get().unwrap();
            let form: FormValues = [("title", "Shop front"), ("short_description", "s"), ("description", "d"), ("status", "beta")]
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
            let draft = ProjectAdmin::from_form(&form).unwrap();
            ProjectAdmin::insert(&conn, &draft).unwrap();
        }
        let app = admin_app!(pool, "*");

        let seeded = test::call_service(&app, test::TestRequest::get().uri("/seed-session").to_request()).await;
        let cookie = seeded.response().cookies().next().expect("session cookie").into_owned();

        let req = test::TestRequest::get()
            .uri("/management/test-admin/projects")
            .cookie(cookie)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
        assert!(body.contains("Shop front"));
    }

    #[actix_web::test]
    async fn list_search_comes_from_the_query_string() {
        let pool = memory_pool();
        {
            let conn = pool.get().unwrap();
            for title in ["Shop front", "Photo blog"] {
                let form: FormValues = [("title", title), ("short_description", "s"), ("description", "d"), ("status", "beta")]
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect();
                let draft = ProjectAdmin::from_form(&form).unwrap();
                ProjectAdmin::insert(&conn, &draft).unwrap();
            }
        }
        let app = admin_app!(pool, "*");

        let seeded = test::call_service(&app, test::TestRequest::get().uri("/seed-session").to_request()).await;
        let cookie = seeded.response().cookies().next().expect("session cookie").into_owned();

        let req = test::TestRequest::get()
            .uri("/management/test-admin/projects?q=photo&status=beta")
            .cookie(cookie)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
        assert!(body.contains("Photo blog"));
        assert!(!body.contains("Shop front"));
        assert!(body.contains(r#"value="photo""#));
    }
}
