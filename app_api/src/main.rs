mod handlers;
mod result;

use crate::result::AppState;
use actix_web::middleware::Logger;
use actix_web::{App, HttpServer, web};
use biz_service::biz_service::avatar_service::AvatarService;
use biz_service::biz_service::avatar_store::AvatarStore;
use biz_service::biz_service::external_service::{ExternalDirectoryTrait, ExternalUserService};
use biz_service::biz_service::mail_service::MailService;
use biz_service::biz_service::mq_service::MqService;
use biz_service::biz_service::notify_service::NotifyService;
use biz_service::biz_service::user_service::{UserRepositoryTrait, UserService};
use common::config::AppConfig;
use common::db::init_db;
use log::warn;
use std::sync::Arc;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // 读取配置文件
    let app_cfg = AppConfig::new("main-config.toml");
    //初始化日志
    let log_level = app_cfg.get_sys().log_level;
    let log_level = if log_level.is_empty() { "info".to_string() } else { log_level };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level.as_str())).init();

    let db_cfg = app_cfg.get_database();
    let db = init_db(&db_cfg.url, &db_cfg.db_name).await.expect("Failed to connect to MongoDB");

    // 显式装配依赖，逐层传入，不走全局注册
    let user_service = Arc::new(UserService::new(db));
    user_service.ensure_indexes().await.expect("Failed to create MongoDB indexes");
    let users: Arc<dyn UserRepositoryTrait> = user_service;

    let directory: Arc<dyn ExternalDirectoryTrait> =
        Arc::new(ExternalUserService::new(&app_cfg.get_external()).expect("Failed to build external directory client"));

    let store = AvatarStore::new(app_cfg.get_avatar().dir).expect("Failed to prepare avatar directory");
    let avatars = Arc::new(AvatarService::new(users.clone(), directory.clone(), store));

    let mail = Arc::new(MailService::new(&app_cfg.get_smtp()).expect("Failed to build SMTP transport"));
    let mq = Arc::new(MqService::connect(&app_cfg.get_amqp()).await.expect("Failed to connect to AMQP broker"));
    let notify = Arc::new(NotifyService::new(mail, mq));

    let state = web::Data::new(AppState { users, directory, avatars, notify });

    let server_cfg = app_cfg.get_server();
    let address_and_port = format!("{}:{}", server_cfg.host, server_cfg.port);
    warn!("Starting server on {}", address_and_port);
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(state.clone())
            // 配置 控制器
            .configure(|cfg| {
                handlers::configure(cfg);
            })
    })
    .bind(address_and_port)?
    .run()
    .await
}
