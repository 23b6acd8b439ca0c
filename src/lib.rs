pub mod auth;
pub mod booking;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod schedule;
pub mod slots;
pub mod state;
pub mod time;
