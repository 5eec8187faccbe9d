use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

use super::{current_admin, current_user};
use crate::error::{AppError, AppResult};
use crate::models::*;
use crate::services::{EventService, IdentityService, PresentService};

#[utoipa::path(
    get,
    path = "/api/presents",
    tag = "presents",
    params(EventQuery),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "管理员: PresentOverview; 普通用户: OwnPresents"),
        (status = 401, description = "未授权"),
        (status = 404, description = "活动不存在")
    )
)]
pub async fn get_presents(
    identity_service: web::Data<IdentityService>,
    event_service: web::Data<EventService>,
    present_service: web::Data<PresentService>,
    req: HttpRequest,
    query: web::Query<EventQuery>,
) -> Result<HttpResponse> {
    let result: AppResult<_> = async {
        let user = current_user(&req, &identity_service).await?;
        let event = event_service.resolve_target(query.event_id).await?;
        if user.role.is_admin() {
            Ok(json!(present_service.overview(event.id).await?))
        } else {
            Ok(json!(present_service.own(user.id, event.id).await?))
        }
    }
    .await;

    match result {
        Ok(data) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": data }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/api/presents",
    tag = "presents",
    request_body = PresentActionRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "操作成功", body = PresentResponse),
        (status = 400, description = "状态不允许该操作"),
        (status = 403, description = "需要管理员权限"),
        (status = 404, description = "礼物不存在")
    )
)]
/// 礼物操作（管理员）:
/// - mark_submitted: 赠送者提交礼物
/// - mark_delivered: 礼物已送达接收者
/// - update_description: 修改描述
pub async fn present_action(
    identity_service: web::Data<IdentityService>,
    present_service: web::Data<PresentService>,
    req: HttpRequest,
    body: web::Json<PresentActionRequest>,
) -> Result<HttpResponse> {
    let result: AppResult<_> = async {
        current_admin(&req, &identity_service).await?;
        let body = body.into_inner();
        match body.action {
            PresentAction::MarkSubmitted => {
                let giver = require_participant(&body)?;
                present_service.mark_submitted(giver, body.description).await
            }
            PresentAction::MarkDelivered => {
                let giver = require_participant(&body)?;
                present_service.mark_delivered(giver, body.description).await
            }
            PresentAction::UpdateDescription => {
                let present_id = body.present_id.ok_or_else(|| {
                    AppError::ValidationError("present_id is required".into())
                })?;
                present_service
                    .update_description(present_id, body.description)
                    .await
            }
        }
    }
    .await;

    match result {
        Ok(present) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": present }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    patch,
    path = "/api/presents",
    tag = "presents",
    request_body = PatchPresentRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "更新成功", body = PresentResponse),
        (status = 400, description = "状态不允许回退或参数缺失"),
        (status = 403, description = "需要管理员权限"),
        (status = 404, description = "礼物不存在")
    )
)]
pub async fn patch_present(
    identity_service: web::Data<IdentityService>,
    present_service: web::Data<PresentService>,
    req: HttpRequest,
    body: web::Json<PatchPresentRequest>,
) -> Result<HttpResponse> {
    let result: AppResult<_> = async {
        current_admin(&req, &identity_service).await?;
        let body = body.into_inner();
        let present_id = body
            .present_id
            .ok_or_else(|| AppError::ValidationError("present_id is required".into()))?;
        present_service
            .patch(present_id, body.status, body.description)
            .await
    }
    .await;

    match result {
        Ok(present) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": present }))),
        Err(e) => Ok(e.error_response()),
    }
}

fn require_participant(body: &PresentActionRequest) -> AppResult<uuid::Uuid> {
    body.participant_id
        .ok_or_else(|| AppError::ValidationError("participant_id is required".into()))
}

pub fn presents_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/presents")
            .route("", web::get().to(get_presents))
            .route("", web::post().to(present_action))
            .route("", web::patch().to(patch_present)),
    );
}
