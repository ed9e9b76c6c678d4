use actix_cors::Cors;
use actix_web::{middleware::Logger, App, HttpServer};
use std::sync::Arc;

use taskhub::store::PgStore;
use taskhub::{AppState, Config};

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = Config::from_env()?;
    let state = match &config.database_url {
        Some(url) => {
            let store = PgStore::connect(url).await?;
            store.migrate().await?;
            log::info!("Connected to PostgreSQL, migrations applied");
            AppState::new(config.clone(), Arc::new(store))
        }
        None => {
            log::warn!("DATABASE_URL is not set, data will be kept in memory only");
            AppState::in_memory(config.clone())
        }
    };

    log::info!("Starting TaskHub server at {}", config.server_url());
    let frontend_url = config.frontend_url.clone();
    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&frontend_url)
            .allow_any_method()
            .allow_any_header()
            .supports_credentials()
            .max_age(3600);
        let state = state.clone();
        App::new()
            .wrap(cors)
            .wrap(Logger::default())
            .configure(move |cfg| state.configure(cfg))
    })
    .bind((config.server_host.as_str(), config.server_port))?
    .run()
    .await?;

    Ok(())
}
