use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{ParticipantProfile, PresentResponse};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AssignmentDetail {
    pub id: Uuid,
    pub event_id: Uuid,
    pub giver: ParticipantProfile,
    pub receiver: ParticipantProfile,
    pub created_at: DateTime<Utc>,
}

/// 普通用户查看自己的送礼对象
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OwnAssignment {
    pub assignment_id: Uuid,
    pub event_id: Uuid,
    pub receiver: ParticipantProfile,
    pub present: Option<PresentResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AssignmentGenerationResponse {
    pub event_id: Uuid,
    pub assignment_count: usize,
}
