use actix_web::{http, web, App, HttpServer};
use actix_web::dev::Server;
use tracing_actix_web::TracingLogger;
use std::net::TcpListener;
use actix_cors::Cors;

pub mod cache;
pub mod config;
pub mod db;
mod handlers;
pub mod league;
pub mod models;
mod routes;
pub mod services;
pub mod telemetry;

use crate::db::view_queries::PgViewSource;
use crate::league::views::ViewFetcher;
use crate::routes::init_routes;
use crate::services::change_feed::ChangeFeed;

pub fn run(
    listener: TcpListener,
    fetcher: ViewFetcher<PgViewSource>,
    change_feed: ChangeFeed,
    allowed_origins: Vec<String>,
) -> Result<Server, std::io::Error> {
    // Wrap using web::Data, which boils down to an Arc smart pointer
    let fetcher = web::Data::new(fetcher);
    let change_feed = web::Data::new(change_feed);

    let server = HttpServer::new(move || {
        let cors = allowed_origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
            .allowed_methods(vec!["GET"])
            .allowed_headers(vec![
                http::header::ACCEPT,
                http::header::CONTENT_TYPE,
                http::header::UPGRADE,
                http::header::CONNECTION,
            ])
            .max_age(3600);

        App::new()
            .wrap(TracingLogger::default())
            .wrap(cors)
            // Get a pointer copy and attach it to the application state
            .app_data(fetcher.clone())
            .app_data(change_feed.clone())
            .configure(init_routes)
    })
    .listen(listener)?
    .run();

    Ok(server)
}
