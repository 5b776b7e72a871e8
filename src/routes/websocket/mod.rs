mod connection;
mod messages;

use actix_web::{web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use uuid::Uuid;

use crate::db::view_queries::PgViewSource;
use crate::handlers::views_handler::StatusQuery;
use crate::league::views::ViewFetcher;
use crate::services::change_feed::ChangeFeed;
use crate::services::live_view::{matches_view, match_detail_view, standings_view, top_scorers_view};

pub use connection::LiveConnection;

/// `/ws/live/{view}`: standings, top-scorers or matches (`?status=` optional).
pub async fn live_view_route(
    req: HttpRequest,
    stream: web::Payload,
    path: web::Path<String>,
    query: web::Query<StatusQuery>,
    fetcher: web::Data<ViewFetcher<PgViewSource>>,
    change_feed: web::Data<ChangeFeed>,
) -> Result<HttpResponse, Error> {
    let view = path.into_inner();
    tracing::info!("New live view WebSocket connection request for {}", view);

    let fetcher = fetcher.get_ref().clone();
    let feed = change_feed.get_ref().clone();
    match view.as_str() {
        "standings" => ws::start(LiveConnection::new(standings_view(fetcher), feed), &req, stream),
        "top-scorers" => ws::start(LiveConnection::new(top_scorers_view(fetcher), feed), &req, stream),
        "matches" => {
            let status = query.parse().map_err(actix_web::error::ErrorBadRequest)?;
            ws::start(LiveConnection::new(matches_view(fetcher, status), feed), &req, stream)
        }
        other => {
            tracing::warn!("Unknown live view requested: {}", other);
            Err(actix_web::error::ErrorNotFound(format!("Unknown live view '{}'", other)))
        }
    }
}

/// `/ws/live/matches/{match_id}`: one match and its events.
pub async fn match_live_route(
    req: HttpRequest,
    stream: web::Payload,
    path: web::Path<Uuid>,
    fetcher: web::Data<ViewFetcher<PgViewSource>>,
    change_feed: web::Data<ChangeFeed>,
) -> Result<HttpResponse, Error> {
    let match_id = path.into_inner();
    tracing::info!("New live match WebSocket connection request for {}", match_id);

    let view = match_detail_view(fetcher.get_ref().clone(), match_id);
    ws::start(LiveConnection::new(view, change_feed.get_ref().clone()), &req, stream)
}
