use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

/// 活动实体
/// 说明:
/// - 四个里程碑时间: 报名截止 / 分配日期 / 送礼截止 / 发放日期
/// - is_active: 全局最多一个活动处于激活状态
/// - are_assignments_created: 单向锁存，一旦为 true 不再允许生成分配
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "events")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
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
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    /// 是否仍可报名（开关打开且未过截止时间）
    pub fn accepts_registrations(&self, now: DateTime<Utc>) -> bool {
        self.is_registration_open && now < self.registration_deadline
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
