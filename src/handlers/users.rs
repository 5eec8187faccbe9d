use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

use super::{current_admin, current_user};
use crate::error::AppResult;
use crate::models::*;
use crate::services::IdentityService;

#[utoipa::path(
    get,
    path = "/api/users",
    tag = "users",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "获取当前用户成功", body = UserResponse),
        (status = 401, description = "未授权")
    )
)]
/// 当前用户资料（每次请求都会与身份提供方的资料同步）
pub async fn get_profile(
    identity_service: web::Data<IdentityService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    match current_user(&req, &identity_service).await {
        Ok(user) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": UserResponse::from(user)
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/api/users",
    tag = "users",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "同步成功", body = UserResponse),
        (status = 401, description = "未授权"),
        (status = 409, description = "并发同步冲突，可重试")
    )
)]
/// 显式同步当前用户
pub async fn sync_profile(
    identity_service: web::Data<IdentityService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    match current_user(&req, &identity_service).await {
        Ok(user) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": UserResponse::from(user),
            "message": "User synchronized"
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/api/users/list",
    tag = "users",
    params(PaginationParams),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "用户列表", body = PaginatedResponse<UserResponse>),
        (status = 401, description = "未授权"),
        (status = 403, description = "需要管理员权限")
    )
)]
/// 用户列表（管理员）
pub async fn list_users(
    identity_service: web::Data<IdentityService>,
    req: HttpRequest,
    query: web::Query<PaginationParams>,
) -> Result<HttpResponse> {
    let result: AppResult<_> = async {
        current_admin(&req, &identity_service).await?;
        identity_service.list_users(&query).await
    }
    .await;

    match result {
        Ok(page) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": page }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn users_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/users")
            .route("", web::get().to(get_profile))
            .route("", web::post().to(sync_profile))
            .route("/list", web::get().to(list_users)),
    );
}
