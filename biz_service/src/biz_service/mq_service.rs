use async_trait::async_trait;
use common::config::AmqpConfig;
use lapin::options::{BasicPublishOptions, QueueDeclareOptions};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties};
use log::debug;
use serde_json::Value;

#[async_trait]
pub trait MqServiceTrait: Send + Sync {
    async fn emit(&self, pattern: &str, data: Value) -> anyhow::Result<()>;
}

/// AMQP 事件发布，fire-and-forget；未启用时静默丢弃
pub struct MqService {
    inner: Option<MqChannel>,
    queue: String,
}

struct MqChannel {
    // 连接随服务同生命周期，掉了 channel 也就没了
    _conn: Connection,
    channel: Channel,
}

/// 消息体沿用 `{pattern, data}` 的包装
pub fn event_envelope(pattern: &str, data: Value) -> Value {
    serde_json::json!({ "pattern": pattern, "data": data })
}

impl MqService {
    pub async fn connect(cfg: &AmqpConfig) -> anyhow::Result<Self> {
        if !cfg.enabled {
            return Ok(Self { inner: None, queue: cfg.queue.clone() });
        }
        let conn = Connection::connect(&cfg.url, ConnectionProperties::default()).await?;
        let channel = conn.create_channel().await?;
        channel
            .queue_declare(
                &cfg.queue,
                QueueDeclareOptions { durable: true, ..Default::default() },
                FieldTable::default(),
            )
            .await?;
        Ok(Self { inner: Some(MqChannel { _conn: conn, channel }), queue: cfg.queue.clone() })
    }
}

#[async_trait]
impl MqServiceTrait for MqService {
    async fn emit(&self, pattern: &str, data: Value) -> anyhow::Result<()> {
        let Some(inner) = &self.inner else {
            debug!("amqp disabled, dropping {} event", pattern);
            return Ok(());
        };
        let payload = serde_json::to_vec(&event_envelope(pattern, data))?;
        inner
            .channel
            .basic_publish(
                "",
                &self.queue,
                BasicPublishOptions::default(),
                &payload,
                BasicProperties::default(),
            )
            .await?
            .await?;
        Ok(())
    }
}
