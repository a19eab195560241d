use crate::result::{AppState, result_empty, result_error, to_response};
use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse, delete, get, post, put, web};
use biz_service::biz_service::avatar_service::SOURCE_EXTERNAL;
use biz_service::biz_service::external_service::ExternalUser;
use biz_service::entitys::user_entity::{UserEntity, UserPatch};
use common::errors::AppError;
use actix_web::web::{Data, Json, Path, Query};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(user_create);
    cfg.service(user_list);
    cfg.service(user_avatar_get);
    cfg.service(user_avatar_delete);
    cfg.service(user_get);
    cfg.service(user_update);
    cfg.service(user_delete);
}

#[derive(Serialize, Deserialize, Debug, Validate, ToSchema, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UserCreateDto {
    #[validate(length(min = 1, message = "firstName should not be empty"))]
    pub first_name: String,
    #[validate(length(min = 1, message = "lastName should not be empty"))]
    pub last_name: String,
    #[validate(email(message = "email must be an email"))]
    pub email: String,
    pub avatar: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Validate, ToSchema, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdateDto {
    #[validate(length(min = 1, message = "firstName should not be empty"))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, message = "lastName should not be empty"))]
    pub last_name: Option<String>,
    #[validate(email(message = "email must be an email"))]
    pub email: Option<String>,
    pub avatar: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SourceQuery {
    pub source: Option<String>,
}

/// 出网的用户表示；存储细节（hash、base64 缓存）不直接上线
#[derive(Serialize, Deserialize, Debug, ToSchema, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    pub id: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
}

impl UserDto {
    fn from_entity(user: &UserEntity) -> Self {
        Self {
            id: user.id_hex(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
            avatar: user.avatar_url.clone(),
            external_id: user.external_id.clone(),
        }
    }

    fn from_external(ext: &ExternalUser) -> Self {
        Self {
            id: Some(ext.id.clone()),
            first_name: ext.first_name.clone(),
            last_name: ext.last_name.clone(),
            email: ext.email.clone(),
            avatar: ext.avatar.clone(),
            external_id: Some(ext.id.clone()),
        }
    }
}

#[post("/api/users")]
async fn user_create(req: HttpRequest, state: Data<AppState>, dto: Json<UserCreateDto>) -> HttpResponse {
    to_response(create_user(&state, dto.into_inner()).await, StatusCode::CREATED, req.path())
}

async fn create_user(state: &AppState, dto: UserCreateDto) -> Result<UserDto, AppError> {
    dto.validate()?;
    let user = state
        .users
        .create(UserEntity::new(&dto.first_name, &dto.last_name, &dto.email, dto.avatar))
        .await?;
    // 创建已成功，旁路通知自己兜错
    state.notify.user_created(&user).await;
    Ok(UserDto::from_entity(&user))
}

#[get("/api/users")]
async fn user_list(req: HttpRequest, state: Data<AppState>) -> HttpResponse {
    let result = state
        .users
        .find_all()
        .await
        .map(|users| users.iter().map(UserDto::from_entity).collect::<Vec<_>>());
    to_response(result, StatusCode::OK, req.path())
}

#[get("/api/users/{id}")]
async fn user_get(
    req: HttpRequest,
    state: Data<AppState>,
    id: Path<String>,
    query: Query<SourceQuery>,
) -> HttpResponse {
    to_response(get_user(&state, &id, query.source.as_deref()).await, StatusCode::OK, req.path())
}

async fn get_user(state: &AppState, id: &str, source: Option<&str>) -> Result<UserDto, AppError> {
    if source == Some(SOURCE_EXTERNAL) {
        let ext = state
            .directory
            .fetch_user(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("External user with id {} not found", id)))?;
        return Ok(UserDto::from_external(&ext));
    }
    let user = state
        .users
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))?;
    Ok(UserDto::from_entity(&user))
}

#[put("/api/users/{id}")]
async fn user_update(
    req: HttpRequest,
    state: Data<AppState>,
    id: Path<String>,
    dto: Json<UserUpdateDto>,
) -> HttpResponse {
    to_response(update_user(&state, &id, dto.into_inner()).await, StatusCode::OK, req.path())
}

async fn update_user(state: &AppState, id: &str, dto: UserUpdateDto) -> Result<UserDto, AppError> {
    dto.validate()?;
    let patch = UserPatch {
        first_name: dto.first_name,
        last_name: dto.last_name,
        email: dto.email,
        avatar_url: dto.avatar,
        ..Default::default()
    };
    let user = state
        .users
        .update(id, patch)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))?;
    Ok(UserDto::from_entity(&user))
}

#[delete("/api/users/{id}")]
async fn user_delete(req: HttpRequest, state: Data<AppState>, id: Path<String>) -> HttpResponse {
    match delete_user(&state, &id).await {
        Ok(()) => result_empty(req.path()),
        Err(err) => result_error(&err, req.path()),
    }
}

async fn delete_user(state: &AppState, id: &str) -> Result<(), AppError> {
    if !state.users.delete(id).await? {
        return Err(AppError::NotFound(format!("User with id {} not found", id)));
    }
    Ok(())
}

#[get("/api/users/{user_id}/avatar")]
async fn user_avatar_get(
    req: HttpRequest,
    state: Data<AppState>,
    user_id: Path<String>,
    query: Query<SourceQuery>,
) -> HttpResponse {
    let result = state
        .avatars
        .get_avatar(&user_id, query.source.as_deref())
        .await
        .map(|payload| serde_json::json!({ "avatar": payload }));
    to_response(result, StatusCode::OK, req.path())
}

#[delete("/api/users/{user_id}/avatar")]
async fn user_avatar_delete(req: HttpRequest, state: Data<AppState>, user_id: Path<String>) -> HttpResponse {
    match state.avatars.delete_avatar(&user_id).await {
        Ok(()) => result_empty(req.path()),
        Err(err) => result_error(&err, req.path()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{App, test};
    use async_trait::async_trait;
    use biz_service::biz_service::avatar_service::AvatarService;
    use biz_service::biz_service::avatar_store::AvatarStore;
    use biz_service::biz_service::external_service::ExternalDirectoryTrait;
    use biz_service::biz_service::mail_service::MailServiceTrait;
    use biz_service::biz_service::mq_service::MqServiceTrait;
    use biz_service::biz_service::notify_service::NotifyService;
    use biz_service::biz_service::user_service::UserRepositoryTrait;
    use common::repository_util::parse_object_id;
    use mongodb::bson::oid::ObjectId;
    use serde_json::{Value, json};
    use std::sync::Arc;
    use tempfile::{TempDir, tempdir};

    #[derive(Default)]
    struct MemoryUsers {
        users: std::sync::Mutex<Vec<UserEntity>>,
    }

    #[async_trait]
    impl UserRepositoryTrait for MemoryUsers {
        async fn create(&self, mut user: UserEntity) -> Result<UserEntity, AppError> {
            let mut users = self.users.lock().unwrap();
            if users.iter().any(|u| u.email == user.email) {
                return Err(AppError::Conflict("A user with this email already exists".into()));
            }
            user.id = Some(ObjectId::new());
            users.push(user.clone());
            Ok(user)
        }

        async fn find_all(&self) -> Result<Vec<UserEntity>, AppError> {
            Ok(self.users.lock().unwrap().clone())
        }

        async fn find_by_id(&self, id: &str) -> Result<Option<UserEntity>, AppError> {
            parse_object_id(id)?;
            Ok(self.users.lock().unwrap().iter().find(|u| u.id_hex().as_deref() == Some(id)).cloned())
        }

        async fn find_by_email(&self, email: &str) -> Result<Option<UserEntity>, AppError> {
            Ok(self.users.lock().unwrap().iter().find(|u| u.email == email).cloned())
        }

        async fn find_by_external_id(&self, external_id: &str) -> Result<Option<UserEntity>, AppError> {
            Ok(self
                .users
                .lock()
                .unwrap()
                .iter()
                .find(|u| u.external_id.as_deref() == Some(external_id))
                .cloned())
        }

        async fn update(&self, id: &str, patch: UserPatch) -> Result<Option<UserEntity>, AppError> {
            parse_object_id(id)?;
            let mut users = self.users.lock().unwrap();
            let Some(user) = users.iter_mut().find(|u| u.id_hex().as_deref() == Some(id)) else {
                return Ok(None);
            };
            if let Some(v) = patch.first_name {
                user.first_name = v;
            }
            if let Some(v) = patch.last_name {
                user.last_name = v;
            }
            if let Some(v) = patch.email {
                user.email = v;
            }
            if let Some(v) = patch.avatar_url {
                user.avatar_url = Some(v);
            }
            if let Some(v) = patch.external_id {
                user.external_id = Some(v);
            }
            Ok(Some(user.clone()))
        }

        async fn update_avatar(&self, id: &str, hash: &str, base64: &str) -> Result<Option<UserEntity>, AppError> {
            let mut users = self.users.lock().unwrap();
            let Some(user) = users.iter_mut().find(|u| u.id_hex().as_deref() == Some(id)) else {
                return Ok(None);
            };
            user.avatar_hash = Some(hash.to_string());
            user.avatar_base64 = Some(base64.to_string());
            Ok(Some(user.clone()))
        }

        async fn clear_avatar(&self, id: &str) -> Result<Option<UserEntity>, AppError> {
            let mut users = self.users.lock().unwrap();
            let Some(user) = users.iter_mut().find(|u| u.id_hex().as_deref() == Some(id)) else {
                return Ok(None);
            };
            user.avatar_hash = None;
            user.avatar_base64 = None;
            Ok(Some(user.clone()))
        }

        async fn delete(&self, id: &str) -> Result<bool, AppError> {
            parse_object_id(id)?;
            let mut users = self.users.lock().unwrap();
            let before = users.len();
            users.retain(|u| u.id_hex().as_deref() != Some(id));
            Ok(users.len() < before)
        }
    }

    #[derive(Default)]
    struct StaticDirectory;

    #[async_trait]
    impl ExternalDirectoryTrait for StaticDirectory {
        async fn fetch_user(&self, external_id: &str) -> Result<Option<ExternalUser>, AppError> {
            if external_id != "7" {
                return Ok(None);
            }
            Ok(Some(ExternalUser {
                id: "7".into(),
                first_name: "John".into(),
                last_name: "Doe".into(),
                email: "john@x.com".into(),
                avatar: Some("http://x/a.jpg".into()),
            }))
        }

        async fn download(&self, _url: &str) -> Result<Vec<u8>, AppError> {
            Ok(b"jpeg".to_vec())
        }
    }

    struct NoopMail;

    #[async_trait]
    impl MailServiceTrait for NoopMail {
        async fn send_welcome(&self, _to: &str, _first_name: &str) -> anyhow::Result<()> {
            Ok(())
        }
    }

    struct NoopMq;

    #[async_trait]
    impl MqServiceTrait for NoopMq {
        async fn emit(&self, _pattern: &str, _data: Value) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn test_state(dir: &TempDir) -> Data<AppState> {
        let users: Arc<dyn UserRepositoryTrait> = Arc::new(MemoryUsers::default());
        let directory: Arc<dyn ExternalDirectoryTrait> = Arc::new(StaticDirectory);
        let store = AvatarStore::new(dir.path()).unwrap();
        let avatars = Arc::new(AvatarService::new(users.clone(), directory.clone(), store));
        let notify = Arc::new(NotifyService::new(Arc::new(NoopMail), Arc::new(NoopMq)));
        Data::new(AppState { users, directory, avatars, notify })
    }

    macro_rules! test_app {
        ($state:expr) => {
            test::init_service(App::new().app_data($state.clone()).configure(configure)).await
        };
    }

    #[actix_web::test]
    async fn create_then_fetch_roundtrip() {
        let dir = tempdir().unwrap();
        let state = test_state(&dir);
        let app = test_app!(state);

        let req = test::TestRequest::post()
            .uri("/api/users")
            .set_json(json!({ "firstName": "Jane", "lastName": "Doe", "email": "jane@x.com" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["email"], "jane@x.com");
        let id = body["data"]["id"].as_str().unwrap().to_string();

        let req = test::TestRequest::get().uri(&format!("/api/users/{}", id)).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["data"]["firstName"], "Jane");
        assert_eq!(body["data"]["lastName"], "Doe");
        assert_eq!(body["meta"]["path"], format!("/api/users/{}", id));
    }

    #[actix_web::test]
    async fn duplicate_email_conflicts_and_bad_input_is_rejected() {
        let dir = tempdir().unwrap();
        let state = test_state(&dir);
        let app = test_app!(state);

        let payload = json!({ "firstName": "Jane", "lastName": "Doe", "email": "jane@x.com" });
        let resp = test::call_service(
            &app,
            test::TestRequest::post().uri("/api/users").set_json(payload.clone()).to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let resp = test::call_service(
            &app,
            test::TestRequest::post().uri("/api/users").set_json(payload).to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().contains("already exists"));

        let resp = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/users")
                .set_json(json!({ "firstName": "", "lastName": "Doe", "email": "nope" }))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn lookup_misses_map_to_404_and_bad_ids_to_400() {
        let dir = tempdir().unwrap();
        let state = test_state(&dir);
        let app = test_app!(state);

        let absent = ObjectId::new().to_hex();
        let resp = test::call_service(
            &app,
            test::TestRequest::get().uri(&format!("/api/users/{}", absent)).to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = test::call_service(
            &app,
            test::TestRequest::get().uri("/api/users/not-a-hex-id").to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn update_and_delete_lifecycle() {
        let dir = tempdir().unwrap();
        let state = test_state(&dir);
        let app = test_app!(state);

        let resp = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/users")
                .set_json(json!({ "firstName": "Jane", "lastName": "Doe", "email": "jane@x.com" }))
                .to_request(),
        )
        .await;
        let body: Value = test::read_body_json(resp).await;
        let id = body["data"]["id"].as_str().unwrap().to_string();

        let resp = test::call_service(
            &app,
            test::TestRequest::put()
                .uri(&format!("/api/users/{}", id))
                .set_json(json!({ "firstName": "Janet" }))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["data"]["firstName"], "Janet");
        assert_eq!(body["data"]["email"], "jane@x.com");

        let resp = test::call_service(
            &app,
            test::TestRequest::delete().uri(&format!("/api/users/{}", id)).to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = test::call_service(
            &app,
            test::TestRequest::get().uri(&format!("/api/users/{}", id)).to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn external_avatar_flow_end_to_end() {
        let dir = tempdir().unwrap();
        let state = test_state(&dir);
        let app = test_app!(state);

        let resp = test::call_service(
            &app,
            test::TestRequest::get().uri("/api/users/7/avatar?source=external").to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["data"]["avatar"], "anBlZw==");

        // 落了本地记录，按外部 id 再取走缓存
        let resp = test::call_service(
            &app,
            test::TestRequest::get().uri("/api/users/7/avatar?source=external").to_request(),
        )
        .await;
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["data"]["avatar"], "anBlZw==");

        let user = state.users.find_by_email("john@x.com").await.unwrap().unwrap();
        let id = user.id_hex().unwrap();
        let resp = test::call_service(
            &app,
            test::TestRequest::delete().uri(&format!("/api/users/{}/avatar", id)).to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);

        let user = state.users.find_by_email("john@x.com").await.unwrap().unwrap();
        assert!(user.avatar_hash.is_none());
        assert!(user.avatar_base64.is_none());

        let resp = test::call_service(
            &app,
            test::TestRequest::get().uri("/api/users/7?source=external").to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["data"]["firstName"], "John");
    }
}
