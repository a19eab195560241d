use common::util::date_util::now;
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::biz_service::external_service::ExternalUser;

/// 用户信息结构体，本地用户档案，email 全局唯一
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UserEntity {
    /// Mongo 分配的主键，插入前为 None
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    /// 名
    pub first_name: String,
    /// 姓
    pub last_name: String,
    /// 邮箱（唯一索引）
    pub email: String,
    /// 头像远程地址
    pub avatar_url: Option<String>,
    /// 缓存头像字节的十六进制 MD5，与 avatar_base64 同生同灭
    pub avatar_hash: Option<String>,
    /// 缓存头像的 base64 载荷，与 avatar_hash 同生同灭
    pub avatar_base64: Option<String>,
    /// 外部用户目录里的对应 id
    pub external_id: Option<String>,
    /// 创建时间（Unix 时间戳，秒）
    pub create_time: i64,
    /// 最后更新时间（Unix 时间戳，秒）
    pub update_time: i64,
}

impl UserEntity {
    pub fn new(first_name: &str, last_name: &str, email: &str, avatar_url: Option<String>) -> Self {
        let ts = now();
        Self {
            id: None,
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            email: email.to_string(),
            avatar_url,
            avatar_hash: None,
            avatar_base64: None,
            external_id: None,
            create_time: ts,
            update_time: ts,
        }
    }

    /// 外部目录档案落成本地记录
    pub fn from_external(ext: &ExternalUser) -> Self {
        let mut user = Self::new(&ext.first_name, &ext.last_name, &ext.email, ext.avatar.clone());
        user.external_id = Some(ext.id.clone());
        user
    }

    /// 主键的 24 位十六进制表示
    pub fn id_hex(&self) -> Option<String> {
        self.id.map(|oid| oid.to_hex())
    }
}

/// 显式的部分更新载体，None 字段不动
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
    pub external_id: Option<String>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.email.is_none()
            && self.avatar_url.is_none()
            && self.external_id.is_none()
    }
}
