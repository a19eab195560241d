use crate::result::result_data;
use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse, get, web};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(status);
}

#[utoipa::path(
    get,
    path = "/status",
    tag = "Common",
    summary = "Get the status of the service",
    responses(
        (status = 200, description = "Service is up", body = String)
    )
)]
#[get("/status")]
async fn status(req: HttpRequest) -> HttpResponse {
    result_data(StatusCode::OK, serde_json::json!({ "status": "ok" }), req.path())
}
