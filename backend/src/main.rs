mod config;
mod decode;
mod error;
mod gemini;
mod pipeline;
mod schema;
mod services;
mod state;
mod store;
mod synthesis;
#[cfg(test)]
mod test_support;

use crate::config::AppConfig;
use crate::gemini::GeminiClient;
use crate::state::AppState;
use actix_web::{web, App, HttpServer};
use env_logger::Env;
use log::info;
use std::io;
use std::sync::Arc;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let config =
        AppConfig::from_env().map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err))?;
    let model =
        GeminiClient::new(&config).map_err(|err| io::Error::other(err.to_string()))?;

    let state = AppState {
        config: config.clone(),
        model: Arc::new(model),
    };

    info!("Server running at http://{}:{}", config.host, config.port);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .service(services::query::configure_routes())
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
