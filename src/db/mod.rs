pub mod view_queries;
