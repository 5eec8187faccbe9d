use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct SummaryStats {
    pub total_participants: u64,
    pub total_classes: u64,
    pub total_users: u64,
    pub registered_count: u64,
    pub assigned_count: u64,
    pub submitted_presents: u64,
    pub delivered_presents: u64,
    pub average_participants_per_class: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct ClassCount {
    pub class_id: Option<Uuid>,
    pub class_name: String,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct DailyRegistrations {
    pub date: NaiveDate,
    pub count: u64,
    pub cumulative: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct GrowthMetrics {
    pub last_week_registrations: u64,
    pub previous_week_registrations: u64,
    /// 百分比，保留两位小数
    pub growth_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct RecentRegistration {
    pub participant_id: Uuid,
    pub user_name: String,
    pub user_email: String,
    pub class_name: String,
    pub registered_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct DashboardStatistics {
    pub event_id: Option<Uuid>,
    pub stats: SummaryStats,
    pub participants_by_class: Vec<ClassCount>,
    pub class_distribution: Vec<ClassCount>,
    pub registrations_by_date: Vec<DailyRegistrations>,
    pub growth_metrics: GrowthMetrics,
    pub recent_activity: Vec<RecentRegistration>,
}
