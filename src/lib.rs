pub mod actions;
pub mod api;
pub mod books;
pub mod cache;
pub mod cli;
pub mod covers;
pub mod db;
pub mod jobs;
pub mod paths;
pub mod subscription;
