use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

use super::{current_admin, current_user};
use crate::error::AppResult;
use crate::models::*;
use crate::services::{AssignmentService, EventService, IdentityService};

#[utoipa::path(
    get,
    path = "/api/assignments",
    tag = "assignments",
    params(EventQuery),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "管理员: 全部分配 [AssignmentDetail]; 普通用户: 自己的送礼对象 OwnAssignment 或 null"),
        (status = 401, description = "未授权"),
        (status = 404, description = "活动不存在")
    )
)]
pub async fn get_assignments(
    identity_service: web::Data<IdentityService>,
    event_service: web::Data<EventService>,
    assignment_service: web::Data<AssignmentService>,
    req: HttpRequest,
    query: web::Query<EventQuery>,
) -> Result<HttpResponse> {
    let result: AppResult<_> = async {
        let user = current_user(&req, &identity_service).await?;
        let event = event_service.resolve_target(query.event_id).await?;
        if user.role.is_admin() {
            let list = assignment_service.list_for_event(event.id).await?;
            Ok(json!(list))
        } else {
            let own = assignment_service.own_assignment(user.id, event.id).await?;
            Ok(json!(own))
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
    path = "/api/assignments",
    tag = "assignments",
    params(EventQuery),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 201, description = "分配生成成功", body = AssignmentGenerationResponse),
        (status = 403, description = "需要管理员权限"),
        (status = 404, description = "活动不存在"),
        (status = 409, description = "已生成过分配或参与者不足")
    )
)]
/// 为活动生成送礼分配（每个活动仅一次）
pub async fn create_assignments(
    identity_service: web::Data<IdentityService>,
    event_service: web::Data<EventService>,
    assignment_service: web::Data<AssignmentService>,
    req: HttpRequest,
    query: web::Query<EventQuery>,
) -> Result<HttpResponse> {
    let result: AppResult<_> = async {
        current_admin(&req, &identity_service).await?;
        let event = event_service.resolve_target(query.event_id).await?;
        assignment_service.create_assignments(event.id).await
    }
    .await;

    match result {
        Ok(data) => Ok(HttpResponse::Created().json(ApiResponse::success_with_message(
            data,
            "Assignments created",
        ))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn assignments_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/assignments")
            .route("", web::get().to(get_assignments))
            .route("", web::post().to(create_assignments)),
    );
}
