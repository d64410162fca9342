pub mod config;
pub mod db;
pub mod handlers;
pub mod models;
pub mod payload;
pub mod routes;
pub mod state;
pub mod store;
pub mod uploads;
pub mod utils;
