use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::entities::event_entity as events;

#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct CreateEventRequest {
    #[schema(example = "Wichtelaktion 2024")]
    pub name: Option<String>,
    pub description: Option<String>,
    /// 缺省为当前时间
    pub registration_deadline: Option<DateTime<Utc>>,
    pub assignment_date: Option<DateTime<Utc>>,
    pub gift_deadline: Option<DateTime<Utc>>,
    pub delivery_date: Option<DateTime<Utc>>,
    /// 缺省为 true
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateEventRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub registration_deadline: Option<DateTime<Utc>>,
    pub assignment_date: Option<DateTime<Utc>>,
    pub gift_deadline: Option<DateTime<Utc>>,
    pub delivery_date: Option<DateTime<Utc>>,
    pub is_active: Option<bool>,
    pub is_registration_open: Option<bool>,
}

/// 部分更新，仅修改提供的字段
#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct PatchEventRequest {
    pub is_active: Option<bool>,
    pub are_assignments_created: Option<bool>,
    pub is_registration_open: Option<bool>,
}

/// 可选的活动定位参数；缺省时使用当前激活的活动
#[derive(Debug, Default, Clone, Serialize, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct EventQuery {
    pub event_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EventResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub registration_deadline: DateTime<Utc>,
    pub assignment_date: DateTime<Utc>,
    pub gift_deadline: DateTime<Utc>,
    pub delivery_date: DateTime<Utc>,
    pub is_active: bool,
    pub is_registration_open: bool,
    pub are_assignments_created: bool,
    pub participant_count: u64,
    pub assignment_count: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EventResponse {
    pub fn new(event: events::Model, participant_count: u64, assignment_count: u64) -> Self {
        Self {
            id: event.id,
            name: event.name,
            description: event.description,
            registration_deadline: event.registration_deadline,
            assignment_date: event.assignment_date,
            gift_deadline: event.gift_deadline,
            delivery_date: event.delivery_date,
            is_active: event.is_active,
            is_registration_open: event.is_registration_open,
            are_assignments_created: event.are_assignments_created,
            participant_count,
            assignment_count,
            created_at: event.created_at,
            updated_at: event.updated_at,
        }
    }
}
