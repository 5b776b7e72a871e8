use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::db::view_queries::PgViewSource;
use crate::league::views::ViewFetcher;
use crate::services::change_feed::ChangeFeed;

pub async fn backend_health_check(
    fetcher: web::Data<ViewFetcher<PgViewSource>>,
    change_feed: web::Data<ChangeFeed>,
) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "UP",
        "database_online": fetcher.network().is_online(),
        "active_channels": change_feed.active_channels()
    }))
}
