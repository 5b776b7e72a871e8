use actix_web::{web, HttpResponse, Result};
use serde::Deserialize;
use serde_json::json;
use std::str::FromStr;
use uuid::Uuid;

use crate::db::view_queries::{FetchError, ViewSource};
use crate::league::schedule::group_by_day;
use crate::league::views::{ViewFetcher, TOP_SCORERS_LIMIT};
use crate::models::matches::MatchStatus;

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub status: Option<String>,
}

impl StatusQuery {
    /// `None` means every status. An unknown value is rejected.
    pub fn parse(&self) -> Result<Option<MatchStatus>, String> {
        self.status.as_deref().map(MatchStatus::from_str).transpose()
    }
}

fn fetch_failed(view: &str, e: FetchError) -> HttpResponse {
    tracing::error!("Failed to fetch {}: {}", view, e);
    HttpResponse::InternalServerError().json(json!({
        "success": false,
        "message": format!("Failed to fetch {}", view)
    }))
}

fn bad_status(reason: String) -> HttpResponse {
    tracing::warn!("Rejected match status filter: {}", reason);
    HttpResponse::BadRequest().json(json!({
        "success": false,
        "message": reason
    }))
}

#[tracing::instrument(name = "Get standings", skip(fetcher))]
pub async fn get_standings<S: ViewSource>(fetcher: web::Data<ViewFetcher<S>>) -> Result<HttpResponse> {
    match fetcher.fetch_standings().await {
        Ok(standings) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": standings,
            "offline": !fetcher.network().is_online()
        }))),
        Err(e) => Ok(fetch_failed("standings", e)),
    }
}

#[tracing::instrument(name = "Get top scorers", skip(fetcher))]
pub async fn get_top_scorers<S: ViewSource>(fetcher: web::Data<ViewFetcher<S>>) -> Result<HttpResponse> {
    match fetcher.fetch_top_scorers(TOP_SCORERS_LIMIT).await {
        Ok(scorers) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": scorers
        }))),
        Err(e) => Ok(fetch_failed("top scorers", e)),
    }
}

#[tracing::instrument(name = "Get matches", skip(fetcher))]
pub async fn get_matches<S: ViewSource>(
    query: web::Query<StatusQuery>,
    fetcher: web::Data<ViewFetcher<S>>,
) -> Result<HttpResponse> {
    let status = match query.parse() {
        Ok(status) => status,
        Err(reason) => return Ok(bad_status(reason)),
    };
    match fetcher.fetch_matches(status).await {
        Ok(matches) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": matches
        }))),
        Err(e) => Ok(fetch_failed("matches", e)),
    }
}

/// Matches grouped by calendar day, days ascending.
#[tracing::instrument(name = "Get matches by date", skip(fetcher))]
pub async fn get_matches_by_date<S: ViewSource>(
    query: web::Query<StatusQuery>,
    fetcher: web::Data<ViewFetcher<S>>,
) -> Result<HttpResponse> {
    let status = match query.parse() {
        Ok(status) => status,
        Err(reason) => return Ok(bad_status(reason)),
    };
    match fetcher.fetch_matches(status).await {
        Ok(matches) => {
            let days: Vec<_> = group_by_day(matches)
                .into_iter()
                .map(|(date, matches)| json!({ "date": date, "matches": matches }))
                .collect();
            Ok(HttpResponse::Ok().json(json!({
                "success": true,
                "data": days
            })))
        }
        Err(e) => Ok(fetch_failed("matches", e)),
    }
}

#[tracing::instrument(name = "Get match detail", skip(fetcher))]
pub async fn get_match_detail<S: ViewSource>(
    match_id: Uuid,
    fetcher: web::Data<ViewFetcher<S>>,
) -> Result<HttpResponse> {
    match fetcher.fetch_match_detail(match_id).await {
        Ok(Some(detail)) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": detail
        }))),
        Ok(None) => Ok(HttpResponse::NotFound().json(json!({
            "success": false,
            "message": format!("Match {} not found", match_id)
        }))),
        Err(e) => Ok(fetch_failed("match detail", e)),
    }
}
