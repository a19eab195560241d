use crate::biz_service::avatar_store::AvatarStore;
use crate::biz_service::external_service::ExternalDirectoryTrait;
use crate::biz_service::user_service::UserRepositoryTrait;
use crate::entitys::user_entity::{UserEntity, UserPatch};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use common::errors::AppError;
use common::util::common_utils::build_md5_bytes;
use dashmap::DashMap;
use log::warn;
use std::sync::Arc;
use tokio::sync::Mutex;

pub const SOURCE_EXTERNAL: &str = "external";

/// 头像获取与缓存流水线：
/// 本地/外部解析 → 缓存命中直接返回 → 否则下载、内容寻址落盘、
/// hash 与 base64 一次写回记录
pub struct AvatarService {
    users: Arc<dyn UserRepositoryTrait>,
    directory: Arc<dyn ExternalDirectoryTrait>,
    store: AvatarStore,
    // 按记录 id 单飞，下载+落盘+写回期间持锁
    download_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl AvatarService {
    pub fn new(
        users: Arc<dyn UserRepositoryTrait>,
        directory: Arc<dyn ExternalDirectoryTrait>,
        store: AvatarStore,
    ) -> Self {
        Self { users, directory, store, download_locks: DashMap::new() }
    }

    /// `source == "external"` 时 user_id 按外部目录 id 解释，否则按本地 id
    pub async fn get_avatar(&self, user_id: &str, source: Option<&str>) -> Result<String, AppError> {
        let external = source == Some(SOURCE_EXTERNAL);

        let mut user = if external {
            self.users.find_by_external_id(user_id).await?
        } else {
            self.users.find_by_id(user_id).await?
        };

        // 缓存命中是唯一的快路径
        if let Some(payload) = user.as_ref().and_then(|u| u.avatar_base64.clone()) {
            return Ok(payload);
        }

        if user.is_none() && external {
            user = self.materialize_external(user_id).await?;
        }

        let user = user
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", user_id)))?;
        let record_id = user
            .id_hex()
            .ok_or_else(|| AppError::Internal("resolved user has no id".to_string()))?;

        let lock = self.download_locks.entry(record_id.clone()).or_default().clone();
        let _guard = lock.lock().await;

        // 锁内复查：并发请求里先到的那一个可能已经把缓存写好了
        let user = self
            .users
            .find_by_id(&record_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", record_id)))?;
        if let Some(payload) = user.avatar_base64 {
            return Ok(payload);
        }

        let url = user
            .avatar_url
            .ok_or_else(|| AppError::NotFound(format!("User {} has no avatar source", record_id)))?;

        let bytes = self.directory.download(&url).await?;
        let hash = build_md5_bytes(&bytes);
        let payload = BASE64.encode(&bytes);

        self.store.write(&hash, &bytes).await?;
        self.users
            .update_avatar(&record_id, &hash, &payload)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", record_id)))?;

        Ok(payload)
    }

    /// 外部档案落地：按邮箱能对上本地记录就补 external_id / avatar_url，
    /// 对不上就新建一条
    async fn materialize_external(&self, external_id: &str) -> Result<Option<UserEntity>, AppError> {
        let ext = self.directory.fetch_user(external_id).await?.ok_or_else(|| {
            AppError::NotFound(format!("External user with id {} not found", external_id))
        })?;

        match self.users.find_by_email(&ext.email).await? {
            Some(local) => {
                let id = local
                    .id_hex()
                    .ok_or_else(|| AppError::Internal("stored user has no id".to_string()))?;
                let patch = UserPatch {
                    external_id: Some(ext.id.clone()),
                    avatar_url: ext.avatar.clone(),
                    ..Default::default()
                };
                self.users.update(&id, patch).await
            }
            None => Ok(Some(self.users.create(UserEntity::from_external(&ext)).await?)),
        }
    }

    /// 头像删除只认本地 id；盘上文件清不掉记日志不报错，记录字段照清
    pub async fn delete_avatar(&self, user_id: &str) -> Result<(), AppError> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", user_id)))?;

        if let Some(hash) = &user.avatar_hash {
            if let Err(err) = self.store.remove(hash).await {
                warn!("failed to remove avatar blob {}: {}", hash, err);
            }
        }

        let record_id = user
            .id_hex()
            .ok_or_else(|| AppError::Internal("stored user has no id".to_string()))?;
        self.users.clear_avatar(&record_id).await?;
        Ok(())
    }
}
