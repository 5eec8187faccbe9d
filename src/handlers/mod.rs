pub mod assignments;
pub mod classes;
pub mod events;
pub mod health;
pub mod participants;
pub mod presents;
pub mod statistics;
pub mod users;

pub use assignments::assignments_config;
pub use classes::classes_config;
pub use events::events_config;
pub use health::health_config;
pub use participants::participants_config;
pub use presents::presents_config;
pub use statistics::statistics_config;
pub use users::users_config;

use actix_web::{HttpMessage, HttpRequest};

use crate::entities::user_entity;
use crate::error::{AppError, AppResult};
use crate::models::ExternalIdentity;
use crate::services::IdentityService;

/// 从请求扩展中取出外部身份（中间件在鉴权后注入）并同步为本地用户
pub(crate) async fn current_user(
    req: &HttpRequest,
    identity_service: &IdentityService,
) -> AppResult<user_entity::Model> {
    let identity = req
        .extensions()
        .get::<ExternalIdentity>()
        .cloned()
        .ok_or_else(|| AppError::AuthError("Missing access token".into()))?;
    identity_service.sync(&identity).await
}

/// 当前用户且必须为管理员
pub(crate) async fn current_admin(
    req: &HttpRequest,
    identity_service: &IdentityService,
) -> AppResult<user_entity::Model> {
    let user = current_user(req, identity_service).await?;
    if !user.role.is_admin() {
        return Err(AppError::PermissionDenied);
    }
    Ok(user)
}

#[cfg(test)]
mod tests;
