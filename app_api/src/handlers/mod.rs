mod common_handler;
mod user_handler;

use actix_web::web;

pub fn configure(cfg: &mut web::ServiceConfig) {
    common_handler::configure(cfg);
    user_handler::configure(cfg);
}
