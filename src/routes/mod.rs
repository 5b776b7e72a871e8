use actix_web::web;

pub mod backend_health;
pub mod views;
pub mod websocket;

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(backend_health::backend_health);

    cfg.service(
        web::scope("/api")
            .service(views::get_standings)
            .service(views::get_top_scorers)
            .service(views::get_matches)
            .service(views::get_matches_by_date)
            .service(views::get_match_detail)
    );
    // The match route must win over the generic `{view}` segment
    cfg.service(
        web::resource("/ws/live/matches/{match_id}")
            .route(web::get().to(websocket::match_live_route))
    );
    cfg.service(
        web::resource("/ws/live/{view}")
            .route(web::get().to(websocket::live_view_route))
    );
}
