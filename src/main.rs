use actix_cors::Cors;
use actix_web::{http, middleware::Logger, web, App, HttpServer};
use env_logger::Env;
use log::info;
use sea_orm::Database;
use sea_orm_migration::MigratorTrait;

use taskflow::auth::Authentication;
use taskflow::config::Config;
use taskflow::migrator::Migrator;
use taskflow::AppState;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = Config::from_env();
    let db = Database::connect(&config.database_url)
        .await
        .expect("Failed to connect to the database");
    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    info!("Server running at http://{}", config.bind_addr);
    info!("Allowed CORS origin: {}", config.frontend_origin);

    let bind_addr = config.bind_addr.clone();
    let frontend_origin = config.frontend_origin.clone();
    let state = web::Data::new(AppState { db, config });

    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&frontend_origin)
            .allowed_methods(vec!["GET", "POST", "PATCH", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                http::header::CONTENT_TYPE,
                http::header::ACCEPT,
                http::header::AUTHORIZATION,
            ])
            .supports_credentials()
            .max_age(3600);

        App::new()
            .wrap(Logger::default())
            .wrap(cors)
            .wrap(Authentication)
            .app_data(state.clone())
            .configure(taskflow::configure)
    })
    .bind(&bind_addr)?
    .run()
    .await
}
