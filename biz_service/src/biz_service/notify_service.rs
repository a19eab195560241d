use crate::biz_service::mail_service::MailServiceTrait;
use crate::biz_service::mq_service::MqServiceTrait;
use crate::entitys::user_entity::UserEntity;
use log::error;
use serde_json::Value;
use std::sync::Arc;

/// `user.created` 事件载荷（对外字段名用 camelCase）
pub fn user_created_event(user: &UserEntity) -> Value {
    serde_json::json!({
        "id": user.id_hex(),
        "firstName": user.first_name,
        "lastName": user.last_name,
        "email": user.email,
        "avatarUrl": user.avatar_url,
    })
}

/// 用户创建后的旁路通知：欢迎邮件 + 事件发布。
/// 记录此刻已经落库，这里的失败只记日志，不回滚创建也不让请求失败
pub struct NotifyService {
    mail: Arc<dyn MailServiceTrait>,
    mq: Arc<dyn MqServiceTrait>,
}

impl NotifyService {
    pub fn new(mail: Arc<dyn MailServiceTrait>, mq: Arc<dyn MqServiceTrait>) -> Self {
        Self { mail, mq }
    }

    pub async fn user_created(&self, user: &UserEntity) {
        if let Err(err) = self.mail.send_welcome(&user.email, &user.first_name).await {
            error!("welcome mail to {} failed: {:#}", user.email, err);
        }
        if let Err(err) = self.mq.emit("user.created", user_created_event(user)).await {
            error!("user.created publish for {} failed: {:#}", user.email, err);
        }
    }
}
