use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{ParticipantProfile, ParticipantResponse};
use crate::entities::{PresentStatus, present_entity as presents};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PresentResponse {
    pub id: Uuid,
    pub assignment_id: Uuid,
    pub giver_id: Uuid,
    pub receiver_id: Uuid,
    pub status: PresentStatus,
    pub description: Option<String>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<presents::Model> for PresentResponse {
    fn from(p: presents::Model) -> Self {
        Self {
            id: p.id,
            assignment_id: p.assignment_id,
            giver_id: p.giver_id,
            receiver_id: p.receiver_id,
            status: p.status,
            description: p.description,
            submitted_at: p.submitted_at,
            delivered_at: p.delivered_at,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PresentAction {
    MarkSubmitted,
    MarkDelivered,
    UpdateDescription,
}

/// POST /presents 请求体
/// - mark_submitted / mark_delivered: 通过赠送者 participant_id 定位礼物
/// - update_description: 通过 present_id 定位礼物
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PresentActionRequest {
    pub action: PresentAction,
    pub participant_id: Option<Uuid>,
    pub present_id: Option<Uuid>,
    pub description: Option<String>,
}

/// PATCH /presents 请求体；description 为空字符串表示清空
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PatchPresentRequest {
    pub present_id: Option<Uuid>,
    pub status: Option<PresentStatus>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PresentDetail {
    #[serde(flatten)]
    pub present: PresentResponse,
    pub giver: ParticipantProfile,
    pub receiver: ParticipantProfile,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct PresentStats {
    pub total_participants: u64,
    /// SUBMITTED 或 DELIVERED
    pub submitted_count: u64,
    pub delivered_count: u64,
    pub pending_count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PresentOverview {
    pub event_id: Uuid,
    pub presents: Vec<PresentDetail>,
    pub stats: PresentStats,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OwnPresents {
    pub event_id: Uuid,
    pub participant: Option<ParticipantResponse>,
    pub present_given: Option<PresentResponse>,
    pub present_received: Option<PresentResponse>,
}
