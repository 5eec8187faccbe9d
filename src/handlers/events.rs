use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;
use uuid::Uuid;

use super::{current_admin, current_user};
use crate::error::AppResult;
use crate::models::*;
use crate::services::{EventService, IdentityService};

#[utoipa::path(
    get,
    path = "/api/events",
    tag = "events",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "活动列表（管理员可见全部，其他用户仅激活的）", body = [EventResponse]),
        (status = 401, description = "未授权")
    )
)]
pub async fn list_events(
    identity_service: web::Data<IdentityService>,
    event_service: web::Data<EventService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let result: AppResult<_> = async {
        let user = current_user(&req, &identity_service).await?;
        event_service.list(user.role.is_admin()).await
    }
    .await;

    match result {
        Ok(list) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": list }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/api/events",
    tag = "events",
    request_body = CreateEventRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 201, description = "创建成功", body = EventResponse),
        (status = 400, description = "参数错误"),
        (status = 403, description = "需要管理员权限")
    )
)]
pub async fn create_event(
    identity_service: web::Data<IdentityService>,
    event_service: web::Data<EventService>,
    req: HttpRequest,
    body: web::Json<CreateEventRequest>,
) -> Result<HttpResponse> {
    let result: AppResult<_> = async {
        current_admin(&req, &identity_service).await?;
        event_service.create(body.into_inner()).await
    }
    .await;

    match result {
        Ok(event) => Ok(HttpResponse::Created().json(json!({ "success": true, "data": event }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/api/events/{id}",
    tag = "events",
    params(
        ("id" = Uuid, Path, description = "活动ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "活动详情", body = EventResponse),
        (status = 404, description = "活动不存在或不可见")
    )
)]
pub async fn get_event(
    identity_service: web::Data<IdentityService>,
    event_service: web::Data<EventService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let result: AppResult<_> = async {
        let user = current_user(&req, &identity_service).await?;
        event_service.get(*path, user.role.is_admin()).await
    }
    .await;

    match result {
        Ok(event) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": event }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/api/events/{id}",
    tag = "events",
    params(
        ("id" = Uuid, Path, description = "活动ID")
    ),
    request_body = UpdateEventRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "更新成功", body = EventResponse),
        (status = 400, description = "参数错误"),
        (status = 403, description = "需要管理员权限"),
        (status = 404, description = "活动不存在")
    )
)]
pub async fn update_event(
    identity_service: web::Data<IdentityService>,
    event_service: web::Data<EventService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
    body: web::Json<UpdateEventRequest>,
) -> Result<HttpResponse> {
    let result: AppResult<_> = async {
        current_admin(&req, &identity_service).await?;
        event_service.update(*path, body.into_inner()).await
    }
    .await;

    match result {
        Ok(event) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": event }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    patch,
    path = "/api/events/{id}",
    tag = "events",
    params(
        ("id" = Uuid, Path, description = "活动ID")
    ),
    request_body = PatchEventRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "更新成功", body = EventResponse),
        (status = 403, description = "需要管理员权限"),
        (status = 409, description = "分配锁存不可重置")
    )
)]
pub async fn patch_event(
    identity_service: web::Data<IdentityService>,
    event_service: web::Data<EventService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
    body: web::Json<PatchEventRequest>,
) -> Result<HttpResponse> {
    let result: AppResult<_> = async {
        current_admin(&req, &identity_service).await?;
        event_service.patch(*path, body.into_inner()).await
    }
    .await;

    match result {
        Ok(event) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": event }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    delete,
    path = "/api/events/{id}",
    tag = "events",
    params(
        ("id" = Uuid, Path, description = "活动ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "删除成功"),
        (status = 403, description = "需要管理员权限"),
        (status = 404, description = "活动不存在"),
        (status = 409, description = "活动已有报名或分配")
    )
)]
pub async fn delete_event(
    identity_service: web::Data<IdentityService>,
    event_service: web::Data<EventService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let result: AppResult<_> = async {
        current_admin(&req, &identity_service).await?;
        event_service.delete(*path).await
    }
    .await;

    match result {
        Ok(()) => Ok(HttpResponse::Ok().json(ApiResponse::message("Event deleted"))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn events_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/events")
            .route("", web::get().to(list_events))
            .route("", web::post().to(create_event))
            .route("/{id}", web::get().to(get_event))
            .route("/{id}", web::put().to(update_event))
            .route("/{id}", web::patch().to(patch_event))
            .route("/{id}", web::delete().to(delete_event)),
    );
}
