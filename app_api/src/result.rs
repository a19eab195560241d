use actix_web::HttpResponse;
use actix_web::http::StatusCode;
use biz_service::biz_service::avatar_service::AvatarService;
use biz_service::biz_service::external_service::ExternalDirectoryTrait;
use biz_service::biz_service::notify_service::NotifyService;
use biz_service::biz_service::user_service::UserRepositoryTrait;
use common::errors::AppError;
use common::util::date_util::build_time;
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

/// 显式装配好的依赖，握在 actix 的 Data 里传给各 handler
pub struct AppState {
    pub users: Arc<dyn UserRepositoryTrait>,
    pub directory: Arc<dyn ExternalDirectoryTrait>,
    pub avatars: Arc<AvatarService>,
    pub notify: Arc<NotifyService>,
}

/// 统一响应信封
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub meta: Meta,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Meta {
    pub timestamp: String,
    pub path: String,
}

impl Meta {
    fn new(path: &str) -> Self {
        Self { timestamp: build_time(), path: path.to_string() }
    }
}

pub fn result_data<T: Serialize>(status: StatusCode, data: T, path: &str) -> HttpResponse {
    HttpResponse::build(status).json(ApiResponse {
        success: true,
        data: Some(data),
        error: None,
        meta: Meta::new(path),
    })
}

pub fn result_empty(path: &str) -> HttpResponse {
    HttpResponse::build(StatusCode::OK).json(ApiResponse::<serde_json::Value> {
        success: true,
        data: None,
        error: None,
        meta: Meta::new(path),
    })
}

pub fn result_error(err: &AppError, path: &str) -> HttpResponse {
    HttpResponse::build(err.status_code()).json(ApiResponse::<serde_json::Value> {
        success: false,
        data: None,
        error: Some(err.public_message()),
        meta: Meta::new(path),
    })
}

/// handler 统一收口：成功走 status + data，失败映射错误分类
pub fn to_response<T: Serialize>(result: Result<T, AppError>, status: StatusCode, path: &str) -> HttpResponse {
    match result {
        Ok(data) => result_data(status, data, path),
        Err(err) => result_error(&err, path),
    }
}
