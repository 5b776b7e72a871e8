pub mod ranking;
pub mod schedule;
pub mod views;
