use crate::entitys::user_entity::{UserEntity, UserPatch};
use async_trait::async_trait;
use common::errors::{AppError, is_duplicate_key};
use common::repository_util::{BaseRepository, Repository, parse_object_id};
use common::util::date_util::now;
use mongodb::bson::{Document, doc};
use mongodb::options::IndexOptions;
use mongodb::{Database, IndexModel};

/// 用户记录存取契约；头像流水线与控制器都走这里，
/// 测试用内存实现替换
#[async_trait]
pub trait UserRepositoryTrait: Send + Sync {
    /// 邮箱重复时返回 Conflict
    async fn create(&self, user: UserEntity) -> Result<UserEntity, AppError>;
    async fn find_all(&self) -> Result<Vec<UserEntity>, AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<UserEntity>, AppError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<UserEntity>, AppError>;
    async fn find_by_external_id(&self, external_id: &str) -> Result<Option<UserEntity>, AppError>;
    /// 部分更新，目标不存在时返回 None
    async fn update(&self, id: &str, patch: UserPatch) -> Result<Option<UserEntity>, AppError>;
    /// hash 与 base64 必须一次写入（两者同生同灭的不变量）
    async fn update_avatar(&self, id: &str, hash: &str, base64: &str) -> Result<Option<UserEntity>, AppError>;
    async fn clear_avatar(&self, id: &str) -> Result<Option<UserEntity>, AppError>;
    async fn delete(&self, id: &str) -> Result<bool, AppError>;
}

pub struct UserService {
    pub dao: BaseRepository<UserEntity>,
}

impl UserService {
    pub fn new(db: Database) -> Self {
        let collection = db.collection("user_info");
        Self { dao: BaseRepository::new(collection) }
    }

    /// 启动时建 email 唯一索引
    pub async fn ensure_indexes(&self) -> Result<(), AppError> {
        let options = IndexOptions::builder().unique(true).build();
        let model = IndexModel::builder().keys(doc! { "email": 1 }).options(options).build();
        self.dao.collection.create_index(model).await?;
        Ok(())
    }

    fn patch_to_doc(patch: &UserPatch) -> Document {
        let mut set = doc! { "update_time": now() };
        if let Some(v) = &patch.first_name {
            set.insert("first_name", v.as_str());
        }
        if let Some(v) = &patch.last_name {
            set.insert("last_name", v.as_str());
        }
        if let Some(v) = &patch.email {
            set.insert("email", v.as_str());
        }
        if let Some(v) = &patch.avatar_url {
            set.insert("avatar_url", v.as_str());
        }
        if let Some(v) = &patch.external_id {
            set.insert("external_id", v.as_str());
        }
        doc! { "$set": set }
    }

    fn map_duplicate(err: AppError) -> AppError {
        match err {
            AppError::Mongo(e) if is_duplicate_key(&e) => {
                AppError::Conflict("A user with this email already exists".to_string())
            }
            other => other,
        }
    }
}

#[async_trait]
impl UserRepositoryTrait for UserService {
    async fn create(&self, user: UserEntity) -> Result<UserEntity, AppError> {
        let mut user = user;
        let inserted = self.dao.insert(&user).await.map_err(Self::map_duplicate)?;
        user.id = Some(inserted);
        Ok(user)
    }

    async fn find_all(&self) -> Result<Vec<UserEntity>, AppError> {
        self.dao.query_all().await
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<UserEntity>, AppError> {
        self.dao.find_by_id(id).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserEntity>, AppError> {
        self.dao.find_one(doc! { "email": email }).await
    }

    async fn find_by_external_id(&self, external_id: &str) -> Result<Option<UserEntity>, AppError> {
        self.dao.find_one(doc! { "external_id": external_id }).await
    }

    async fn update(&self, id: &str, patch: UserPatch) -> Result<Option<UserEntity>, AppError> {
        let obj_id = parse_object_id(id)?;
        let update = Self::patch_to_doc(&patch);
        self.dao
            .find_one_and_update(doc! { "_id": obj_id }, update)
            .await
            .map_err(Self::map_duplicate)
    }

    async fn update_avatar(&self, id: &str, hash: &str, base64: &str) -> Result<Option<UserEntity>, AppError> {
        let obj_id = parse_object_id(id)?;
        let update = doc! { "$set": { "avatar_hash": hash, "avatar_base64": base64, "update_time": now() } };
        self.dao.find_one_and_update(doc! { "_id": obj_id }, update).await
    }

    async fn clear_avatar(&self, id: &str) -> Result<Option<UserEntity>, AppError> {
        let obj_id = parse_object_id(id)?;
        let update = doc! {
            "$unset": { "avatar_hash": "", "avatar_base64": "" },
            "$set": { "update_time": now() },
        };
        self.dao.find_one_and_update(doc! { "_id": obj_id }, update).await
    }

    async fn delete(&self, id: &str) -> Result<bool, AppError> {
        let deleted = self.dao.delete_by_id(id).await?;
        Ok(deleted > 0)
    }
}
