pub mod cache;
pub mod redis;
pub mod settings;
