use actix_web::web;

use crate::error::{json_error_handler, path_error_handler, query_error_handler};

pub mod admin;
pub mod events;
pub mod public;

/// Registers the whole API together with JSON error bodies for extractor failures.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .app_data(web::QueryConfig::default().error_handler(query_error_handler))
        .app_data(web::PathConfig::default().error_handler(path_error_handler))
        .configure(public::configure)
        .configure(admin::configure)
        .configure(events::configure);
}
