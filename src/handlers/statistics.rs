use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use chrono::Utc;
use serde_json::json;

use super::current_admin;
use crate::error::AppResult;
use crate::models::*;
use crate::services::{IdentityService, StatisticsService};

#[utoipa::path(
    get,
    path = "/api/statistics",
    tag = "statistics",
    params(EventQuery),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "仪表盘统计（未指定活动时统计全部）", body = DashboardStatistics),
        (status = 403, description = "需要管理员权限")
    )
)]
pub async fn get_statistics(
    identity_service: web::Data<IdentityService>,
    statistics_service: web::Data<StatisticsService>,
    req: HttpRequest,
    query: web::Query<EventQuery>,
) -> Result<HttpResponse> {
    let result: AppResult<_> = async {
        current_admin(&req, &identity_service).await?;
        statistics_service.dashboard(query.event_id, Utc::now()).await
    }
    .await;

    match result {
        Ok(stats) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": stats }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn statistics_config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/statistics").route("", web::get().to(get_statistics)));
}
