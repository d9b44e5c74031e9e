use crate::helper::form_helpers::parse_payload;
use crate::helper::mail_helpers::Mailer;
use crate::helper::public_helpers::{self, JsonReply, Layout};
use crate::DbPool;
use actix_web::http::header::CONTENT_TYPE;
use actix_web::http::StatusCode;
use actix_web::{web, HttpRequest, HttpResponse, Responder};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use tera::{Context, Tera};

#[derive(Deserialize)]
pub struct PageQuery {
    page: Option<String>,
}

#[derive(Deserialize)]
pub struct SearchQuery {
    q: Option<String>,
}

pub fn config_public(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(index))
        .route("/projet/{slug}/", web::get().to(project_detail))
        .route("/galerie/{slug}/", web::get().to(gallery_detail))
        .route("/projets/", web::get().to(all_projects))
        .route("/galerie/", web::get().to(all_gallery))
        .route("/newsletter/", web::post().to(newsletter_subscribe))
        .route("/newsletter/unsubscribe/{token}/", web::get().to(show_unsubscribe))
        .route("/newsletter/unsubscribe/{token}/", web::post().to(confirm_unsubscribe))
        .route("/contact/", web::post().to(contact_message))
        .route("/search/", web::get().to(search))
        .configure(config_api);
}

pub fn config_api(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/projects/", web::get().to(api_projects))
            .route("/gallery/", web::get().to(api_gallery))
            .route("/feed/", web::get().to(api_feed)),
    );
}

fn layout_context(layout: &Layout) -> Context {
    let mut ctx = Context::new();
    ctx.insert("profile", &layout.profile);
    ctx.insert("site_settings", &layout.site_settings);
    ctx.insert("contact_info", &layout.contact_info);
    ctx.insert("social_links", &layout.social_links);
    ctx
}

fn render_with_status(tera: &Tera, template: &str, ctx: &Context, status: StatusCode) -> HttpResponse {
    match tera.render(template, ctx) {
        Ok(rendered) => HttpResponse::build(status).content_type("text/html; charset=utf-8").body(rendered),
        Err(err) => {
            log::error!("Template rendering error in {}: {}", template, err);
            HttpResponse::InternalServerError().body("Error rendering page.")
        }
    }
}

fn render(tera: &Tera, template: &str, ctx: &Context) -> HttpResponse {
    render_with_status(tera, template, ctx, StatusCode::OK)
}

fn not_found_page(tera: &Tera, pool: &web::Data<DbPool>) -> HttpResponse {
    let ctx = layout_context(&public_helpers::load_layout(pool));
    render_with_status(tera, "portfolio/404.html", &ctx, StatusCode::NOT_FOUND)
}

fn server_error_page(tera: &Tera, pool: &web::Data<DbPool>) -> HttpResponse {
    let ctx = layout_context(&public_helpers::load_layout(pool));
    render_with_status(tera, "portfolio/500.html", &ctx, StatusCode::INTERNAL_SERVER_ERROR)
}

/// Fallback for every unmatched route.
pub async fn not_found(tera: web::Data<Tera>, pool: web::Data<DbPool>) -> impl Responder {
    not_found_page(&tera, &pool)
}

// ====================================================================
// ============================== PAGES ===============================
// ====================================================================

async fn index(tera: web::Data<Tera>, pool: web::Data<DbPool>) -> impl Responder {
    let landing = public_helpers::load_landing(&pool);
    let mut ctx = layout_context(&landing.layout);
    ctx.insert("projects", &landing.projects);
    ctx.insert("skills", &landing.skills);
    ctx.insert("news", &landing.news);
    ctx.insert("partners", &landing.partners);
    ctx.insert("gallery", &landing.gallery);
    ctx.insert("feed", &landing.feed);
    render(&tera, "portfolio/index.html", &ctx)
}

async fn project_detail(slug: web::Path<String>, tera: web::Data<Tera>, pool: web::Data<DbPool>) -> impl Responder {
    match public_helpers::load_project_detail(&pool, &slug) {
        Ok(Some(detail)) => {
            let mut ctx = layout_context(&public_helpers::load_layout(&pool));
            ctx.insert("project", &detail.item);
            ctx.insert("similar_projects", &detail.similar);
            render(&tera, "portfolio/project_detail.html", &ctx)
        }
        Ok(None) => not_found_page(&tera, &pool),
        Err(e) => {
            log::error!("Failed to load project '{}': {}", slug, e);
            server_error_page(&tera, &pool)
        }
    }
}

async fn gallery_detail(slug: web::Path<String>, tera: web::Data<Tera>, pool: web::Data<DbPool>) -> impl Responder {
    match public_helpers::load_gallery_detail(&pool, &slug) {
        Ok(Some(detail)) => {
            let mut ctx = layout_context(&public_helpers::load_layout(&pool));
            ctx.insert("gallery_item", &detail.item);
            ctx.insert("similar_items", &detail.similar);
            render(&tera, "portfolio/gallery_detail.html", &ctx)
        }
        Ok(None) => not_found_page(&tera, &pool),
        Err(e) => {
            log::error!("Failed to load gallery item '{}': {}", slug, e);
            server_error_page(&tera, &pool)
        }
    }
}

async fn all_projects(query: web::Query<PageQuery>, tera: web::Data<Tera>, pool: web::Data<DbPool>) -> impl Responder {
    match public_helpers::load_projects_page(&pool, query.page.as_deref()) {
        Ok(page) => {
            let mut ctx = layout_context(&public_helpers::load_layout(&pool));
            ctx.insert("page", &page);
            render(&tera, "portfolio/projects.html", &ctx)
        }
        Err(e) => {
            log::error!("Failed to load the project listing: {}", e);
            server_error_page(&tera, &pool)
        }
    }
}

async fn all_gallery(query: web::Query<PageQuery>, tera: web::Data<Tera>, pool: web::Data<DbPool>) -> impl Responder {
    match public_helpers::load_gallery_page(&pool, query.page.as_deref()) {
        Ok(page) => {
            let mut ctx = layout_context(&public_helpers::load_layout(&pool));
            ctx.insert("page", &page);
            render(&tera, "portfolio/gallery.html", &ctx)
        }
        Err(e) => {
            log::error!("Failed to load the gallery listing: {}", e);
            server_error_page(&tera, &pool)
        }
    }
}

async fn search(query: web::Query<SearchQuery>, tera: web::Data<Tera>, pool: web::Data<DbPool>) -> impl Responder {
    let raw = query.q.as_deref().unwrap_or("");
    match public_helpers::search(&pool, raw) {
        Ok(results) => {
            let mut ctx = layout_context(&public_helpers::load_layout(&pool));
            ctx.insert("query", &results.query);
            ctx.insert("projects", &results.projects);
            ctx.insert("gallery", &results.gallery);
            ctx.insert("news", &results.news);
            ctx.insert("total_results", &results.total_results);
            render(&tera, "portfolio/search_results.html", &ctx)
        }
        Err(e) => {
            log::error!("Search for '{}' failed: {}", raw, e);
            server_error_page(&tera, &pool)
        }
    }
}

// ====================================================================
// ============================== INTAKE ==============================
// ====================================================================

fn read_payload(req: &HttpRequest, body: &web::Bytes) -> Result<HashMap<String, String>, JsonReply> {
    let content_type = req.headers().get(CONTENT_TYPE).and_then(|v| v.to_str().ok()).unwrap_or("");
    parse_payload(content_type, body).map_err(|e| JsonReply::fail(&e.to_string()))
}

async fn newsletter_subscribe(
    req: HttpRequest,
    body: web::Bytes,
    pool: web::Data<DbPool>,
    mailer: web::Data<Mailer>,
) -> impl Responder {
    let reply = match read_payload(&req, &body) {
        Ok(form) => public_helpers::newsletter_signup(&pool, &mailer, &form),
        Err(reply) => reply,
    };
    HttpResponse::Ok().json(reply)
}

async fn contact_message(
    req: HttpRequest,
    body: web::Bytes,
    pool: web::Data<DbPool>,
    mailer: web::Data<Mailer>,
) -> impl Responder {
    let reply = match read_payload(&req, &body) {
        Ok(form) => public_helpers::contact_submission(&pool, &mailer, &form),
        Err(reply) => reply,
    };
    HttpResponse::Ok().json(reply)
}

fn invalid_unsubscribe_link(tera: &Tera, pool: &web::Data<DbPool>) -> HttpResponse {
    let ctx = layout_context(&public_helpers::load_layout(pool));
    render_with_status(tera, "portfolio/newsletter_unsubscribe_error.html", &ctx, StatusCode::NOT_FOUND)
}

async fn show_unsubscribe(token: web::Path<String>, tera: web::Data<Tera>, pool: web::Data<DbPool>) -> impl Responder {
    match public_helpers::find_subscription(&pool, &token) {
        Ok(Some(subscriber)) => {
            let mut ctx = layout_context(&public_helpers::load_layout(&pool));
            ctx.insert("subscriber", &subscriber);
            ctx.insert("token", token.as_str());
            render(&tera, "portfolio/newsletter_unsubscribe.html", &ctx)
        }
        Ok(None) => invalid_unsubscribe_link(&tera, &pool),
        Err(e) => {
            log::error!("Failed to look up unsubscribe token: {}", e);
            server_error_page(&tera, &pool)
        }
    }
}

async fn confirm_unsubscribe(token: web::Path<String>, tera: web::Data<Tera>, pool: web::Data<DbPool>) -> impl Responder {
    match public_helpers::unsubscribe(&pool, &token) {
        Ok(Some(subscriber)) => {
            let mut ctx = layout_context(&public_helpers::load_layout(&pool));
            ctx.insert("subscriber", &subscriber);
            render(&tera, "portfolio/newsletter_unsubscribe_success.html", &ctx)
        }
        Ok(None) => invalid_unsubscribe_link(&tera, &pool),
        Err(e) => {
            log::error!("Failed to unsubscribe: {}", e);
            server_error_page(&tera, &pool)
        }
    }
}

// ====================================================================
// ================================ API ===============================
// ====================================================================

async fn api_projects(pool: web::Data<DbPool>) -> impl Responder {
    match public_helpers::api_projects(&pool) {
        Ok(projects) => HttpResponse::Ok().json(json!({ "success": true, "projects": projects })),
        Err(e) => {
            log::error!("API projects failed: {}", e);
            HttpResponse::Ok().json(JsonReply::fail("Error while loading the projects."))
        }
    }
}

async fn api_gallery(pool: web::Data<DbPool>) -> impl Responder {
    match public_helpers::api_gallery(&pool) {
        Ok(gallery) => HttpResponse::Ok().json(json!({ "success": true, "gallery": gallery })),
        Err(e) => {
            log::error!("API gallery failed: {}", e);
            HttpResponse::Ok().json(JsonReply::fail("Error while loading the gallery."))
        }
    }
}

async fn api_feed(pool: web::Data<DbPool>) -> impl Responder {
    match public_helpers::api_feed(&pool) {
        Ok(feed) => HttpResponse::Ok().json(json!({ "success": true, "feed": feed })),
        Err(e) => {
            log::error!("API feed failed: {}", e);
            HttpResponse::Ok().json(JsonReply::fail("Error while loading the feed."))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helper::mail_helpers::MemoryBackend;
    use crate::models::db_operations::{content_db_operations, intake_db_operations};
    use crate::models::{ProjectDraft, ProjectStatus, SubscriberDraft};
    use crate::test_support::{memory_pool, tera};
    use actix_web::{test, App};
    use std::sync::Arc;

    macro_rules! public_app {
        ($pool:expr) => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new($pool))
                    .app_data(web::Data::new(tera()))
                    .app_data(web::Data::new(Mailer::new(
                        Arc::new(MemoryBackend::default()),
                        "site@example.com",
                        "owner@example.com",
                        "http://localhost",
                    )))
                    .configure(config_public)
                    .default_service(web::to(not_found)),
            )
            .await
        };
    }

    fn seed_project(pool: &DbPool, title: &str) {
        let conn = pool.get().unwrap();
        let draft = ProjectDraft {
            title: title.to_string(),
            slug: None,
            short_description: "A short pitch".to_string(),
            description: "The long story".to_string(),
            image: String::new(),
            status: ProjectStatus::Beta,
            technologies: vec!["Rust".to_string(), "SQLite".to_string()],
            display_order: 0,
            featured: true,
            demo_url: Some("https://demo.example.com".to_string()),
            repo_url: None,
        };
        content_db_operations::create_project(&conn, &draft).unwrap();
    }

    async fn body_text(resp: actix_web::dev::ServiceResponse) -> String {
        String::from_utf8(test::read_body(resp).await.to_vec()).unwrap()
    }

    #[actix_web::test]
    async fn landing_page_renders_with_an_empty_store() {
        let app = public_app!(memory_pool());
        let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn project_detail_and_missing_slug() {
        let pool = memory_pool();
        seed_project(&pool, "Shop Front");
        let app = public_app!(pool);

        let resp = test::call_service(&app, test::TestRequest::get().uri("/projet/shop-front/").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(body_text(resp).await.contains("Shop Front"));

        let resp = test::call_service(&app, test::TestRequest::get().uri("/projet/nope/").to_request()).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = test::call_service(&app, test::TestRequest::get().uri("/galerie/nope/").to_request()).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn unknown_routes_get_the_not_found_page() {
        let app = public_app!(memory_pool());
        let resp = test::call_service(&app, test::TestRequest::get().uri("/does/not/exist").to_request()).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn listings_clamp_the_page_parameter() {
        let pool = memory_pool();
        seed_project(&pool, "Only one");
        let app = public_app!(pool);
        for uri in ["/projets/?page=99", "/projets/?page=abc", "/galerie/?page=-1", "/galerie/"] {
            let resp = test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
            assert_eq!(resp.status(), StatusCode::OK, "{}", uri);
        }
    }

    #[actix_web::test]
    async fn newsletter_accepts_json_and_form_bodies() {
        let pool = memory_pool();
        let app = public_app!(pool.clone());

        let req = test::TestRequest::post()
            .uri("/newsletter/")
            .insert_header((CONTENT_TYPE, "application/json"))
            .set_payload(r#"{"email": " Fan@Example.com "}"#)
            .to_request();
        let reply: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(reply["success"], true);

        let req = test::TestRequest::post()
            .uri("/newsletter/")
            .insert_header((CONTENT_TYPE, "application/x-www-form-urlencoded"))
            .set_payload("email=fan%40example.com")
            .to_request();
        let reply: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(reply["success"], false);

        let conn = pool.get().unwrap();
        assert!(intake_db_operations::read_subscriber_by_email(&conn, "fan@example.com").unwrap().is_some());
    }

    #[actix_web::test]
    async fn malformed_json_is_a_validation_reply() {
        let app = public_app!(memory_pool());
        for uri in ["/newsletter/", "/contact/"] {
            let req = test::TestRequest::post()
                .uri(uri)
                .insert_header((CONTENT_TYPE, "application/json"))
                .set_payload("{not json")
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::OK);
            let reply: serde_json::Value = test::read_body_json(resp).await;
            assert_eq!(reply["success"], false);
            assert_eq!(reply["message"], "Invalid JSON data.");
        }
    }

    #[actix_web::test]
    async fn contact_rejects_missing_fields() {
        let app = public_app!(memory_pool());
        let req = test::TestRequest::post()
            .uri("/contact/")
            .insert_header((CONTENT_TYPE, "application/json"))
            .set_payload(r#"{"nom": "Ana", "email": "ana@example.com", "sujet": "", "message": "Hi"}"#)
            .to_request();
        let reply: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(reply["success"], false);
    }

    #[actix_web::test]
    async fn unsubscribe_flow() {
        let pool = memory_pool();
        let subscriber = {
            let conn = pool.get().unwrap();
            intake_db_operations::create_subscriber(&conn, &SubscriberDraft { email: "a@b.io".to_string(), active: true })
                .unwrap()
        };
        let app = public_app!(pool.clone());
        let uri = format!("/newsletter/unsubscribe/{}/", subscriber.token);

        let resp = test::call_service(&app, test::TestRequest::get().uri(&uri).to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        {
            let conn = pool.get().unwrap();
            assert!(intake_db_operations::read_subscriber(&conn, subscriber.id).unwrap().unwrap().active);
        }

        for _ in 0..2 {
            let resp = test::call_service(&app, test::TestRequest::post().uri(&uri).to_request()).await;
            assert_eq!(resp.status(), StatusCode::OK);
        }
        {
            let conn = pool.get().unwrap();
            assert!(!intake_db_operations::read_subscriber(&conn, subscriber.id).unwrap().unwrap().active);
        }

        let resp = test::call_service(
            &app,
            test::TestRequest::post().uri("/newsletter/unsubscribe/not-a-token/").to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn search_pages_render() {
        let pool = memory_pool();
        seed_project(&pool, "Rust shop");
        let app = public_app!(pool);

        let resp = test::call_service(&app, test::TestRequest::get().uri("/search/?q=zzz").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let resp = test::call_service(&app, test::TestRequest::get().uri("/search/?q=rust").to_request()).await;
        assert!(body_text(resp).await.contains("Rust shop"));
        let resp = test::call_service(&app, test::TestRequest::get().uri("/search/").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn api_shapes() {
        let pool = memory_pool();
        seed_project(&pool, "Shop Front");
        let app = public_app!(pool);

        let reply: serde_json::Value =
            test::call_and_read_body_json(&app, test::TestRequest::get().uri("/api/projects/").to_request()).await;
        assert_eq!(reply["success"], true);
        let project = &reply["projects"][0];
        assert_eq!(project["title"], "Shop Front");
        assert_eq!(project["status"], "Beta");
        assert_eq!(project["status_color"], "bg-blue-500");
        assert_eq!(project["url"], "/projet/shop-front/");
        assert_eq!(project["technologies"][1], "SQLite");
        assert!(project["image"].is_null());
        assert!(project["repo_url"].is_null());

        let reply: serde_json::Value =
            test::call_and_read_body_json(&app, test::TestRequest::get().uri("/api/gallery/").to_request()).await;
        assert_eq!(reply, json!({ "success": true, "gallery": [] }));

        let reply: serde_json::Value =
            test::call_and_read_body_json(&app, test::TestRequest::get().uri("/api/feed/").to_request()).await;
        assert_eq!(reply, json!({ "success": true, "feed": [] }));
    }
}
