// src/routes/views.rs
use actix_web::{get, web, HttpResponse, Result};
use uuid::Uuid;

use crate::db::view_queries::PgViewSource;
use crate::handlers::views_handler::{self, StatusQuery};
use crate::league::views::ViewFetcher;

/// League table
#[get("/standings")]
async fn get_standings(
    fetcher: web::Data<ViewFetcher<PgViewSource>>,
) -> Result<HttpResponse> {
    views_handler::get_standings(fetcher).await
}

/// Top 20 scorers with competition ranks
#[get("/top-scorers")]
async fn get_top_scorers(
    fetcher: web::Data<ViewFetcher<PgViewSource>>,
) -> Result<HttpResponse> {
    views_handler::get_top_scorers(fetcher).await
}

/// All matches, optionally filtered by status
#[get("/matches")]
async fn get_matches(
    query: web::Query<StatusQuery>,
    fetcher: web::Data<ViewFetcher<PgViewSource>>,
) -> Result<HttpResponse> {
    views_handler::get_matches(query, fetcher).await
}

#[get("/matches/by-date")]
async fn get_matches_by_date(
    query: web::Query<StatusQuery>,
    fetcher: web::Data<ViewFetcher<PgViewSource>>,
) -> Result<HttpResponse> {
    views_handler::get_matches_by_date(query, fetcher).await
}

/// A single match with its event timeline
#[get("/matches/{match_id}")]
async fn get_match_detail(
    path: web::Path<Uuid>,
    fetcher: web::Data<ViewFetcher<PgViewSource>>,
) -> Result<HttpResponse> {
    let match_id = path.into_inner();
    views_handler::get_match_detail(match_id, fetcher).await
}
