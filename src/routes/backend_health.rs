use actix_web::{get, web, Responder};

use crate::db::view_queries::PgViewSource;
use crate::handlers::backend_health_handler::backend_health_check;
use crate::league::views::ViewFetcher;
use crate::services::change_feed::ChangeFeed;

#[get("/backend_health")]
async fn backend_health(
    fetcher: web::Data<ViewFetcher<PgViewSource>>,
    change_feed: web::Data<ChangeFeed>,
) -> impl Responder {
    backend_health_check(fetcher, change_feed).await
}
