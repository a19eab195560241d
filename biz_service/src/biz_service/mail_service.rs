use async_trait::async_trait;
use common::config::SmtpConfig;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use log::info;

#[async_trait]
pub trait MailServiceTrait: Send + Sync {
    async fn send_welcome(&self, to: &str, first_name: &str) -> anyhow::Result<()>;
}

/// SMTP 欢迎邮件；dry_run 配置下只打日志不出网
pub struct MailService {
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
    from: Mailbox,
}

impl MailService {
    pub fn new(cfg: &SmtpConfig) -> anyhow::Result<Self> {
        let from: Mailbox = cfg.from.parse()?;
        if cfg.dry_run {
            return Ok(Self { transport: None, from });
        }
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::relay(&cfg.host)?;
        if let Some(port) = cfg.port {
            builder = builder.port(port);
        }
        if !cfg.user.is_empty() {
            builder = builder.credentials(Credentials::new(cfg.user.clone(), cfg.pass.clone()));
        }
        Ok(Self { transport: Some(builder.build()), from })
    }
}

#[async_trait]
impl MailServiceTrait for MailService {
    async fn send_welcome(&self, to: &str, first_name: &str) -> anyhow::Result<()> {
        let subject = "Welcome aboard";
        let body = format!("Hi {},\n\nyour account has been created.\n", first_name);

        let Some(transport) = &self.transport else {
            info!("dry-run mail to {}: {}", to, subject);
            return Ok(());
        };

        let message = Message::builder()
            .from(self.from.clone())
            .to(to.parse::<Mailbox>()?)
            .subject(subject)
            .body(body)?;
        transport.send(message).await?;
        Ok(())
    }
}
