use crate::errors::AppError;
use async_trait::async_trait;
use futures::stream::TryStreamExt;
use mongodb::bson::oid::ObjectId;
use mongodb::options::{FindOneAndUpdateOptions, ReturnDocument};
use mongodb::{Collection, bson::Document, bson::doc};
use serde::{Serialize, de::DeserializeOwned};

/// 路径参数里的 24 位十六进制 id，格式不对归为 Bad-Input 而不是 Not-Found
pub fn parse_object_id(id: &str) -> Result<ObjectId, AppError> {
    ObjectId::parse_str(id).map_err(|_| AppError::Validation("Invalid ID format".to_string()))
}

#[async_trait]
pub trait Repository<T> {
    async fn insert(&self, entity: &T) -> Result<ObjectId, AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<T>, AppError>;
    async fn find_one(&self, filter: Document) -> Result<Option<T>, AppError>;
    async fn query_all(&self) -> Result<Vec<T>, AppError>;
    /// 原子更新并返回更新后的文档，目标不存在时返回 None
    async fn find_one_and_update(&self, filter: Document, update: Document) -> Result<Option<T>, AppError>;
    async fn delete_by_id(&self, id: &str) -> Result<u64, AppError>;
}

pub struct BaseRepository<T: Send + Sync> {
    pub collection: Collection<T>, // 线程安全的数据库连接池
}

impl<T: Send + Sync> BaseRepository<T> {
    pub fn new(collection: Collection<T>) -> Self {
        Self { collection }
    }
}

#[async_trait]
impl<T: Send + Sync> Repository<T> for BaseRepository<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync,
{
    async fn insert(&self, entity: &T) -> Result<ObjectId, AppError> {
        let result = self.collection.insert_one(entity).await?;
        result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| AppError::Internal("inserted _id is not an ObjectId".to_string()))
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<T>, AppError> {
        let obj_id = parse_object_id(id)?;
        self.find_one(doc! { "_id": obj_id }).await
    }

    async fn find_one(&self, filter: Document) -> Result<Option<T>, AppError> {
        let result = self.collection.find_one(filter).await?;
        Ok(result)
    }

    async fn query_all(&self) -> Result<Vec<T>, AppError> {
        let mut cursor = self.collection.find(doc! {}).await?;
        let mut result = vec![];
        while let Some(doc) = cursor.try_next().await? {
            result.push(doc);
        }
        Ok(result)
    }

    async fn find_one_and_update(&self, filter: Document, update: Document) -> Result<Option<T>, AppError> {
        let options = FindOneAndUpdateOptions::builder().return_document(ReturnDocument::After).build();
        let result = self.collection.find_one_and_update(filter, update).with_options(options).await?;
        Ok(result)
    }

    async fn delete_by_id(&self, id: &str) -> Result<u64, AppError> {
        let obj_id = parse_object_id(id)?;
        let result = self.collection.delete_one(doc! { "_id": obj_id }).await?;
        Ok(result.deleted_count)
    }
}
