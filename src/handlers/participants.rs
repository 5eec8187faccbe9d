use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

use super::{current_admin, current_user};
use crate::error::AppResult;
use crate::models::*;
use crate::services::{EventService, IdentityService, ParticipantService};

#[utoipa::path(
    get,
    path = "/api/participants",
    tag = "participants",
    params(ParticipantListQuery),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "报名列表", body = PaginatedResponse<ParticipantDetail>),
        (status = 403, description = "需要管理员权限"),
        (status = 404, description = "活动不存在")
    )
)]
/// 活动报名列表（管理员），event_id 缺省时为当前激活的活动
pub async fn list_participants(
    identity_service: web::Data<IdentityService>,
    event_service: web::Data<EventService>,
    participant_service: web::Data<ParticipantService>,
    req: HttpRequest,
    query: web::Query<ParticipantListQuery>,
) -> Result<HttpResponse> {
    let result: AppResult<_> = async {
        current_admin(&req, &identity_service).await?;
        let event = event_service.resolve_target(query.event_id).await?;
        let params = PaginationParams::new(query.page, query.limit);
        participant_service.list(event.id, &params).await
    }
    .await;

    match result {
        Ok(page) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": page }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/api/participants",
    tag = "participants",
    request_body = AdminRegisterRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 201, description = "报名成功", body = RegistrationResponse),
        (status = 400, description = "班级无效"),
        (status = 403, description = "需要管理员权限"),
        (status = 409, description = "报名已关闭")
    )
)]
/// 管理员为指定用户报名
pub async fn register_participant(
    identity_service: web::Data<IdentityService>,
    participant_service: web::Data<ParticipantService>,
    req: HttpRequest,
    body: web::Json<AdminRegisterRequest>,
) -> Result<HttpResponse> {
    let result: AppResult<_> = async {
        current_admin(&req, &identity_service).await?;
        participant_service.admin_register(body.into_inner()).await
    }
    .await;

    match result {
        Ok(reg) => Ok(registration_response(reg)),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/api/register",
    tag = "participants",
    request_body = RegisterRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 201, description = "报名成功", body = RegistrationResponse),
        (status = 200, description = "已更新现有报名", body = RegistrationResponse),
        (status = 400, description = "班级无效"),
        (status = 409, description = "报名已关闭或已生成分配")
    )
)]
/// 当前用户报名（重复报名时更新班级与兴趣）
pub async fn register(
    identity_service: web::Data<IdentityService>,
    participant_service: web::Data<ParticipantService>,
    req: HttpRequest,
    body: web::Json<RegisterRequest>,
) -> Result<HttpResponse> {
    let result: AppResult<_> = async {
        let user = current_user(&req, &identity_service).await?;
        participant_service.register(user.id, body.into_inner()).await
    }
    .await;

    match result {
        Ok(reg) => Ok(registration_response(reg)),
        Err(e) => Ok(e.error_response()),
    }
}

fn registration_response(reg: RegistrationResponse) -> HttpResponse {
    if reg.updated {
        HttpResponse::Ok().json(ApiResponse::success_with_message(reg, "Registration updated"))
    } else {
        HttpResponse::Created().json(ApiResponse::success_with_message(reg, "Registered"))
    }
}

pub fn participants_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/participants")
            .route("", web::get().to(list_participants))
            .route("", web::post().to(register_participant)),
    )
    .route("/register", web::post().to(register));
}
