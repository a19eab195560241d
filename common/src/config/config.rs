use config::Config;
use serde::Deserialize;

/// 应用配置：从配置文件 + APP_ 前缀环境变量加载，
/// 显式构造后向下传递，不注册全局单例
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    pub database: Option<DatabaseConfig>,
    pub server: Option<ServerConfig>,
    pub sys: Option<SysConfig>,
    pub external: Option<ExternalConfig>,
    pub avatar: Option<AvatarConfig>,
    pub smtp: Option<SmtpConfig>,
    pub amqp: Option<AmqpConfig>,
}

impl AppConfig {
    pub fn new(file: &str) -> Self {
        let config = Config::builder()
            .add_source(config::File::with_name(file).required(true))
            .add_source(config::Environment::with_prefix("APP").separator("_"))
            .build()
            .expect("Failed to build configuration");
        config.try_deserialize::<AppConfig>().expect("Failed to deserialize configuration")
    }

    pub fn get_database(&self) -> DatabaseConfig {
        self.database.clone().unwrap_or_default()
    }
    pub fn get_server(&self) -> ServerConfig {
        self.server.clone().unwrap_or_default()
    }
    pub fn get_sys(&self) -> SysConfig {
        self.sys.clone().unwrap_or_default()
    }
    pub fn get_external(&self) -> ExternalConfig {
        self.external.clone().unwrap_or_default()
    }
    pub fn get_avatar(&self) -> AvatarConfig {
        self.avatar.clone().unwrap_or_default()
    }
    pub fn get_smtp(&self) -> SmtpConfig {
        self.smtp.clone().unwrap_or_default()
    }
    pub fn get_amqp(&self) -> AmqpConfig {
        self.amqp.clone().unwrap_or_default()
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct DatabaseConfig {
    pub url: String,
    pub db_name: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct SysConfig {
    //全局日志级别
    pub log_level: String,
}

/// 外部用户目录（只读 API）
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ExternalConfig {
    pub base_url: String,
    //出站请求超时（秒）
    pub timeout_secs: Option<u64>,
}

/// 头像落盘目录
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AvatarConfig {
    pub dir: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct SmtpConfig {
    pub host: String,
    pub port: Option<u16>,
    pub user: String,
    pub pass: String,
    pub from: String,
    //true 时只打日志不真正发信
    pub dry_run: bool,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AmqpConfig {
    pub enabled: bool,
    pub url: String,
    pub queue: String,
}
