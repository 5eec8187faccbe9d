use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

use super::current_user;
use crate::error::AppResult;
use crate::models::*;
use crate::services::{ClassService, IdentityService};

#[utoipa::path(
    get,
    path = "/api/classes",
    tag = "classes",
    params(PaginationParams),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "班级列表", body = PaginatedResponse<ClassResponse>),
        (status = 401, description = "未授权")
    )
)]
pub async fn list_classes(
    identity_service: web::Data<IdentityService>,
    class_service: web::Data<ClassService>,
    req: HttpRequest,
    query: web::Query<PaginationParams>,
) -> Result<HttpResponse> {
    let result: AppResult<_> = async {
        current_user(&req, &identity_service).await?;
        class_service.list(&query).await
    }
    .await;

    match result {
        Ok(page) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": page }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/api/classes",
    tag = "classes",
    request_body = CreateClassRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 201, description = "创建成功", body = ClassResponse),
        (status = 400, description = "名称为空"),
        (status = 409, description = "班级已存在")
    )
)]
/// 创建班级（报名时找不到自己的班级可直接新建）
pub async fn create_class(
    identity_service: web::Data<IdentityService>,
    class_service: web::Data<ClassService>,
    req: HttpRequest,
    body: web::Json<CreateClassRequest>,
) -> Result<HttpResponse> {
    let result: AppResult<_> = async {
        current_user(&req, &identity_service).await?;
        class_service.create(body.into_inner().name).await
    }
    .await;

    match result {
        Ok(class) => Ok(HttpResponse::Created().json(json!({ "success": true, "data": class }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn classes_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/classes")
            .route("", web::get().to(list_classes))
            .route("", web::post().to(create_class)),
    );
}
