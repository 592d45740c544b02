mod app_config;
mod http_client;
mod http_method;
mod image_fetcher;
mod proxy_error;
mod proxy_service;
mod std_logger;
mod upstream_target;

#[cfg(test)]
mod test_upstream;

use std::io::{Error, ErrorKind, Result};
use std::sync::Arc;

use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};
use clap::Parser;
use log::info;

use app_config::{AppConfig, CliArgs, CorsSection};
use image_fetcher::ImageFetcher;
use proxy_error::ConfigError;
use proxy_service::{ProxyForwarder, ProxyRouteServiceFactory};
use upstream_target::UpstreamTarget;

#[actix_web::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    let config = AppConfig::load(&args).map_err(into_io_error)?;

    std_logger::init(config.log_level_filter()).map_err(|err| Error::new(ErrorKind::Other, err.to_string()))?;

    let target = UpstreamTarget::parse(&config.backend_url).map_err(into_io_error)?;
    let http_client = config
        .client
        .to_http_client_config()
        .to_client()
        .map_err(|err| into_io_error(ConfigError::Client(err)))?;

    let mount_path = config.normalized_mount_path();
    let image_path = config.image_path.clone();
    info!("Forwarding '{}' to '{}'.", mount_path, target.base_url());
    info!("Serving images at '{}'.", image_path);

    let forwarder = Arc::new(ProxyForwarder::new(
        target.clone(),
        http_client.clone(),
        config.debug_body_routes.clone(),
    ));
    let image_data = web::Data::new(ImageFetcher::new(
        target,
        http_client,
        &config.client.image_user_agent,
    ));
    let cors = config.cors.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(build_cors(&cors))
            .wrap(Logger::new("%a \"%r\" %s %b %T"))
            .app_data(image_data.clone())
            .route(&image_path, web::get().to(image_fetcher::fetch_image))
            .service(
                web::scope(&mount_path)
                    .default_service(ProxyRouteServiceFactory::create(forwarder.clone(), &mount_path)),
            )
    })
        .workers(config.workers)
        .bind((config.bind.as_str(), config.port))?
        .run()
        .await
}

fn build_cors(config: &CorsSection) -> Cors {
    if config.permissive {
        return Cors::permissive();
    }

    config
        .allowed_origins
        .iter()
        .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
        .allow_any_method()
        .allow_any_header()
        .max_age(3600)
}

fn into_io_error(err: ConfigError) -> Error {
    Error::new(ErrorKind::Other, err)
}
