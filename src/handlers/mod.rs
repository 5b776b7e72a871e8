pub mod backend_health_handler;
pub mod views_handler;
