use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema, DeriveActiveEnum, EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PresentStatus {
    #[sea_orm(string_value = "not_submitted")]
    NotSubmitted,
    #[sea_orm(string_value = "submitted")]
    Submitted,
    #[sea_orm(string_value = "delivered")]
    Delivered,
}

impl std::fmt::Display for PresentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PresentStatus::NotSubmitted => write!(f, "not_submitted"),
            PresentStatus::Submitted => write!(f, "submitted"),
            PresentStatus::Delivered => write!(f, "delivered"),
        }
    }
}

/// 礼物跟踪实体
/// 说明:
/// - 与 assignments 一一对应，生成分配时同时创建 (NOT_SUBMITTED)
/// - 状态只能 NOT_SUBMITTED -> SUBMITTED -> DELIVERED
/// - description 可随时单独修改
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "presents")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
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

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
