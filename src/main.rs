use actix_cors::Cors;
use actix_web::http::header;
use actix_web::middleware::{DefaultHeaders, Logger};
use actix_web::{cookie::Key, web, App, HttpServer};
use actix_session::{storage::CookieSessionStore, SessionMiddleware};
use clap::Parser;
use portfolio_backend::config::Config;
use portfolio_backend::helper::mail_helpers::{ConsoleBackend, EmailBackend, Mailer, SmtpBackend};
use portfolio_backend::helper::public_helpers;
use portfolio_backend::routes;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use std::convert::TryFrom;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tera::Tera;

#[derive(Parser, Debug)]
#[command(name = "portfolio_server", author, version, about = "Starts the portfolio web server.")]
struct Cli {
    /// Path to the .env configuration file.
    #[arg(long, required = true, value_name = "FILE")]
    env_file: PathBuf,
}

fn build_cors(allowed_origins: &str) -> Cors {
    let cors = if allowed_origins.trim() == "*" {
        Cors::default().allow_any_origin()
    } else {
        allowed_origins
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
    };
    cors.allowed_methods(vec!["GET", "POST"])
        .allowed_headers(vec![header::ACCEPT, header::CONTENT_TYPE])
        .supports_credentials()
        .max_age(3600)
}

fn build_mailer(config: &Config) -> Mailer {
    let backend: Arc<dyn EmailBackend> = match &config.smtp_host {
        Some(host) => match SmtpBackend::new(host, config.smtp_port, config.smtp_credentials()) {
            Ok(smtp) => {
                log::info!("Outgoing email goes through {}:{}", host, config.smtp_port);
                Arc::new(smtp)
            }
            Err(e) => {
                log::error!("SMTP relay '{}' is unusable ({}), falling back to console email", host, e);
                Arc::new(ConsoleBackend)
            }
        },
        None => {
            log::info!("SMTP_HOST is not set, outgoing email is written to the log");
            Arc::new(ConsoleBackend)
        }
    };
    Mailer::new(backend, &config.default_from_email, &config.default_from_email, &config.site_url)
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let cli = Cli::parse();

    let config = Config::from_env(&cli.env_file).expect("FATAL: Failed to load or parse configuration.");

    env_logger::init_from_env(env_logger::Env::new().default_filter_or(&config.log_level));

    let mut tera = Tera::new("templates/**/*.html").expect("Tera initialization failed");
    public_helpers::register_filters(&mut tera);

    fs::create_dir_all(&config.database_path).expect("Failed to create database directory");
    fs::create_dir_all(&config.media_path).expect("Failed to create media directory");

    let db_path = config.portfolio_db_path();
    if !db_path.exists() {
        panic!(
            "FATAL: portfolio.db not found at '{}'. Run 'cargo run --bin setup_cli -- --env-file <path> db setup'",
            db_path.display()
        );
    }
    let manager = SqliteConnectionManager::file(&db_path);
    let pool = Pool::builder()
        .build(manager)
        .expect("FATAL: Failed to create Rusqlite connection pool.");

    let mailer = web::Data::new(build_mailer(&config));

    let session_key_bytes = hex::decode(&config.session_secret_key)
        .expect("FATAL: SESSION_SECRET_KEY in .env is not a valid hex string.");
    let session_key = Key::try_from(session_key_bytes.as_slice())
        .expect("FATAL: The decoded SESSION_SECRET_KEY is not long enough (minimum 64 bytes required).");

    let server_address = format!("{}:{}", config.web.host, config.web.port);
    log::info!("Server starting at http://{}", server_address);

    HttpServer::new(move || {
        let session_mw = SessionMiddleware::builder(CookieSessionStore::default(), session_key.clone())
            .cookie_secure(config.use_secure_cookies)
            .cookie_http_only(true)
            .cookie_same_site(actix_web::cookie::SameSite::Lax)
            .build();

        App::new()
            .wrap(build_cors(&config.allowed_origins))
            .wrap(Logger::default())
            .wrap(
                DefaultHeaders::new()
                    .add(("X-Content-Type-Options", "nosniff"))
                    .add(("X-Frame-Options", "DENY"))
                    .add(("X-XSS-Protection", "1; mode=block")),
            )
            .app_data(web::Data::new(config.clone()))
            .app_data(web::Data::new(tera.clone()))
            .app_data(web::Data::new(pool.clone()))
            .app_data(mailer.clone())
            .service(actix_files::Files::new("/media", &config.media_path))
            .service(actix_files::Files::new("/static", "./static"))
            .configure(routes::public::config_public)
            // Sessions exist only for the back office.
            .service(
                web::scope("")
                    .wrap(session_mw)
                    .service(routes::admin::admin_scope(
                        &config.admin_url_prefix,
                        config.admin_login_accept_ip.clone(),
                    )),
            )
            .default_service(web::to(routes::public::not_found))
    })
    .bind(server_address)?
    .run()
    .await
}
