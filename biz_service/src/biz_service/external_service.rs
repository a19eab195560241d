use async_trait::async_trait;
use common::config::ExternalConfig;
use common::errors::AppError;
use serde::{Deserialize, Deserializer};
use std::time::Duration;

/// 外部目录返回的用户档案（`{"data": {...}}` 信封内层）
#[derive(Debug, Clone, Deserialize)]
pub struct ExternalUser {
    /// 目录侧 id，数字或字符串都归一成字符串
    #[serde(deserialize_with = "de_id_string")]
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub avatar: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct ExternalUserEnvelope {
    #[serde(default)]
    data: Option<ExternalUser>,
}

fn de_id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IdRepr {
        Num(i64),
        Str(String),
    }
    Ok(match IdRepr::deserialize(deserializer)? {
        IdRepr::Num(n) => n.to_string(),
        IdRepr::Str(s) => s,
    })
}

/// 外部用户目录 + 头像下载；查不到（含非 2xx）一律按 None 处理
#[async_trait]
pub trait ExternalDirectoryTrait: Send + Sync {
    async fn fetch_user(&self, external_id: &str) -> Result<Option<ExternalUser>, AppError>;
    async fn download(&self, url: &str) -> Result<Vec<u8>, AppError>;
}

pub struct ExternalUserService {
    http: reqwest::Client,
    base_url: String,
}

impl ExternalUserService {
    pub fn new(cfg: &ExternalConfig) -> Result<Self, AppError> {
        let timeout = Duration::from_secs(cfg.timeout_secs.unwrap_or(30));
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("http client init failed: {}", e)))?;
        Ok(Self { http, base_url: cfg.base_url.trim_end_matches('/').to_string() })
    }
}

#[async_trait]
impl ExternalDirectoryTrait for ExternalUserService {
    async fn fetch_user(&self, external_id: &str) -> Result<Option<ExternalUser>, AppError> {
        let url = format!("{}/{}", self.base_url, external_id);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::ExternalApi(format!("directory request failed: {}", e)))?;
        if !response.status().is_success() {
            log::debug!("external directory returned {} for {}", response.status(), url);
            return Ok(None);
        }
        let envelope = response
            .json::<ExternalUserEnvelope>()
            .await
            .map_err(|e| AppError::ExternalApi(format!("directory response malformed: {}", e)))?;
        Ok(envelope.data)
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, AppError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::ExternalApi(format!("avatar download failed: {}", e)))?;
        if !response.status().is_success() {
            return Err(AppError::ExternalApi(format!(
                "avatar download returned {} for {}",
                response.status(),
                url
            )));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| AppError::ExternalApi(format!("avatar download failed: {}", e)))?;
        Ok(bytes.to_vec())
    }
}
