use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Participant lifecycle. Variants are declared in lifecycle order and the
/// status only ever moves forward.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema, DeriveActiveEnum, EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParticipantStatus {
    #[sea_orm(string_value = "registered")]
    Registered,
    #[sea_orm(string_value = "assigned")]
    Assigned,
    #[sea_orm(string_value = "gift_submitted")]
    GiftSubmitted,
    #[sea_orm(string_value = "gift_delivered")]
    GiftDelivered,
}

impl ParticipantStatus {
    pub fn rank(&self) -> u8 {
        match self {
            ParticipantStatus::Registered => 0,
            ParticipantStatus::Assigned => 1,
            ParticipantStatus::GiftSubmitted => 2,
            ParticipantStatus::GiftDelivered => 3,
        }
    }

    /// Statuses that may legally advance to `self`.
    pub fn predecessors(&self) -> Vec<ParticipantStatus> {
        [
            ParticipantStatus::Registered,
            ParticipantStatus::Assigned,
            ParticipantStatus::GiftSubmitted,
        ]
        .into_iter()
        .filter(|s| s.rank() < self.rank())
        .collect()
    }
}

impl std::fmt::Display for ParticipantStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParticipantStatus::Registered => write!(f, "registered"),
            ParticipantStatus::Assigned => write!(f, "assigned"),
            ParticipantStatus::GiftSubmitted => write!(f, "gift_submitted"),
            ParticipantStatus::GiftDelivered => write!(f, "gift_delivered"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "participants")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub event_id: Uuid,
    pub class_id: Option<Uuid>,
    pub interests: Option<String>,
    pub status: ParticipantStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
