use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::{ClassSummary, PresentResponse, UserSummary};
use crate::entities::{ParticipantStatus, participant_entity as participants};

#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub class_id: Option<Uuid>,
    #[schema(example = "Bücher, Brettspiele")]
    pub interests: Option<String>,
    /// 缺省为当前激活的活动
    pub event_id: Option<Uuid>,
}

/// 管理员代为报名
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AdminRegisterRequest {
    pub user_id: Uuid,
    pub class_id: Option<Uuid>,
    pub interests: Option<String>,
    pub event_id: Option<Uuid>,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ParticipantListQuery {
    pub event_id: Option<Uuid>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ParticipantResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub event_id: Uuid,
    pub class_id: Option<Uuid>,
    pub interests: Option<String>,
    pub status: ParticipantStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<participants::Model> for ParticipantResponse {
    fn from(p: participants::Model) -> Self {
        Self {
            id: p.id,
            user_id: p.user_id,
            event_id: p.event_id,
            class_id: p.class_id,
            interests: p.interests,
            status: p.status,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

/// 参与者及其用户、班级展示信息（分配、礼物、列表中复用）
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ParticipantProfile {
    pub participant_id: Uuid,
    pub status: ParticipantStatus,
    pub interests: Option<String>,
    pub user: Option<UserSummary>,
    pub class: Option<ClassSummary>,
}

/// 管理员参与者列表中的一行
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ParticipantDetail {
    #[serde(flatten)]
    pub participant: ParticipantResponse,
    pub user: Option<UserSummary>,
    pub class: Option<ClassSummary>,
    /// 该参与者要送礼的对象
    pub giving_to: Option<ParticipantProfile>,
    pub present_given: Option<PresentResponse>,
}

/// 报名结果
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RegistrationResponse {
    pub participant: ParticipantResponse,
    pub user: Option<UserSummary>,
    pub class: Option<ClassSummary>,
    /// true 表示更新了已有报名
    pub updated: bool,
}
