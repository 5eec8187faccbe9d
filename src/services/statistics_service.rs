//! 管理后台统计
//!
//! 数据库只负责加载行，所有汇总都是基于行与 `now` 的纯函数，便于单独测试。

use std::collections::HashMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
};
use uuid::Uuid;

use crate::entities::{
    ParticipantStatus, PresentStatus, assignment_entity as assignments, class_entity as classes,
    participant_entity as participants, present_entity as presents, user_entity as users,
};
use crate::error::AppResult;
use crate::models::{
    ClassCount, DailyRegistrations, DashboardStatistics, GrowthMetrics, RecentRegistration,
    SummaryStats,
};

pub const NO_CLASS_LABEL: &str = "No Class";
const RECENT_ACTIVITY_LIMIT: usize = 10;

#[derive(Clone)]
pub struct StatisticsService {
    pool: DatabaseConnection,
    window_days: i64,
}

impl StatisticsService {
    pub fn new(pool: DatabaseConnection, window_days: i64) -> Self {
        Self {
            pool,
            window_days: window_days.max(1),
        }
    }

    /// 仪表盘统计；event_id 为空时统计全部活动
    pub async fn dashboard(
        &self,
        event_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> AppResult<DashboardStatistics> {
        let mut participant_query = participants::Entity::find();
        if let Some(id) = event_id {
            participant_query = participant_query.filter(participants::Column::EventId.eq(id));
        }
        let rows = participant_query
            .order_by_asc(participants::Column::CreatedAt)
            .order_by_asc(participants::Column::Id)
            .all(&self.pool)
            .await?;

        let class_list = classes::Entity::find()
            .order_by_asc(classes::Column::Name)
            .all(&self.pool)
            .await?;
        let total_users = users::Entity::find().count(&self.pool).await?;

        let present_rows = match event_id {
            Some(id) => {
                let assignment_ids: Vec<Uuid> = assignments::Entity::find()
                    .filter(assignments::Column::EventId.eq(id))
                    .all(&self.pool)
                    .await?
                    .into_iter()
                    .map(|a| a.id)
                    .collect();
                if assignment_ids.is_empty() {
                    Vec::new()
                } else {
                    presents::Entity::find()
                        .filter(presents::Column::AssignmentId.is_in(assignment_ids))
                        .all(&self.pool)
                        .await?
                }
            }
            None => presents::Entity::find().all(&self.pool).await?,
        };

        let recent_rows: Vec<&participants::Model> =
            rows.iter().rev().take(RECENT_ACTIVITY_LIMIT).collect();
        let recent_user_ids: Vec<Uuid> = recent_rows.iter().map(|p| p.user_id).collect();
        let recent_users: HashMap<Uuid, users::Model> = if recent_user_ids.is_empty() {
            HashMap::new()
        } else {
            users::Entity::find()
                .filter(users::Column::Id.is_in(recent_user_ids))
                .all(&self.pool)
                .await?
                .into_iter()
                .map(|u| (u.id, u))
                .collect()
        };
        let class_names: HashMap<Uuid, String> =
            class_list.iter().map(|c| (c.id, c.name.clone())).collect();

        let created: Vec<DateTime<Utc>> = rows.iter().map(|p| p.created_at).collect();
        let (participants_by_class, class_distribution) = class_counts(&rows, &class_list);

        Ok(DashboardStatistics {
            event_id,
            stats: summarize(&rows, class_list.len() as u64, total_users, &present_rows),
            participants_by_class,
            class_distribution,
            registrations_by_date: registrations_by_date(
                &created,
                now.date_naive(),
                self.window_days,
            ),
            growth_metrics: growth_metrics(&created, now),
            recent_activity: recent_activity(&recent_rows, &recent_users, &class_names),
        })
    }
}

pub fn summarize(
    rows: &[participants::Model],
    total_classes: u64,
    total_users: u64,
    present_rows: &[presents::Model],
) -> SummaryStats {
    let total_participants = rows.len() as u64;
    let assigned_count = rows
        .iter()
        .filter(|p| p.status != ParticipantStatus::Registered)
        .count() as u64;
    let submitted_presents = present_rows
        .iter()
        .filter(|p| matches!(p.status, PresentStatus::Submitted | PresentStatus::Delivered))
        .count() as u64;
    let delivered_presents = present_rows
        .iter()
        .filter(|p| p.status == PresentStatus::Delivered)
        .count() as u64;
    let average_participants_per_class = if total_classes > 0 {
        (total_participants as f64 / total_classes as f64).round() as u64
    } else {
        0
    };

    SummaryStats {
        total_participants,
        total_classes,
        total_users,
        registered_count: total_participants,
        assigned_count,
        submitted_presents,
        delivered_presents,
        average_participants_per_class,
    }
}

/// 按班级计数: 第一项为全部班级（含 0），第二项仅保留有人的班级
pub fn class_counts(
    rows: &[participants::Model],
    class_list: &[classes::Model],
) -> (Vec<ClassCount>, Vec<ClassCount>) {
    let mut counts: HashMap<Option<Uuid>, u64> = HashMap::new();
    for p in rows {
        *counts.entry(p.class_id).or_default() += 1;
    }

    let mut by_class: Vec<ClassCount> = class_list
        .iter()
        .map(|c| ClassCount {
            class_id: Some(c.id),
            class_name: c.name.clone(),
            count: counts.get(&Some(c.id)).copied().unwrap_or(0),
        })
        .collect();

    // 班级被删除 (set null) 或未选班级
    let unclassified = counts.get(&None).copied().unwrap_or(0);
    if unclassified > 0 {
        by_class.push(ClassCount {
            class_id: None,
            class_name: NO_CLASS_LABEL.to_string(),
            count: unclassified,
        });
    }

    let distribution = by_class.iter().filter(|c| c.count > 0).cloned().collect();
    (by_class, distribution)
}

/// 截止到 today（含）的 window_days 天内每日报名数及窗口内累计
pub fn registrations_by_date(
    created: &[DateTime<Utc>],
    today: NaiveDate,
    window_days: i64,
) -> Vec<DailyRegistrations> {
    let mut per_day: HashMap<NaiveDate, u64> = HashMap::new();
    for ts in created {
        *per_day.entry(ts.date_naive()).or_default() += 1;
    }

    let mut cumulative = 0;
    (0..window_days)
        .rev()
        .map(|offset| {
            let date = today - Duration::days(offset);
            let count = per_day.get(&date).copied().unwrap_or(0);
            cumulative += count;
            DailyRegistrations {
                date,
                count,
                cumulative,
            }
        })
        .collect()
}

/// 最近 7 天与之前 7 天的报名对比
pub fn growth_metrics(created: &[DateTime<Utc>], now: DateTime<Utc>) -> GrowthMetrics {
    let week_ago = now - Duration::days(7);
    let two_weeks_ago = now - Duration::days(14);

    let last_week = created.iter().filter(|ts| **ts >= week_ago).count() as u64;
    let previous_week = created
        .iter()
        .filter(|ts| **ts >= two_weeks_ago && **ts < week_ago)
        .count() as u64;

    let rate = if previous_week > 0 {
        (last_week as f64 - previous_week as f64) / previous_week as f64 * 100.0
    } else if last_week > 0 {
        100.0
    } else {
        0.0
    };

    GrowthMetrics {
        last_week_registrations: last_week,
        previous_week_registrations: previous_week,
        growth_rate: (rate * 100.0).round() / 100.0,
    }
}

/// rows 需已按报名时间倒序
pub fn recent_activity(
    rows: &[&participants::Model],
    user_map: &HashMap<Uuid, users::Model>,
    class_names: &HashMap<Uuid, String>,
) -> Vec<RecentRegistration> {
    rows.iter()
        .take(RECENT_ACTIVITY_LIMIT)
        .map(|p| {
            let user = user_map.get(&p.user_id);
            RecentRegistration {
                participant_id: p.id,
                user_name: user.map_or_else(|| "User".to_string(), |u| u.display_name()),
                user_email: user.map(|u| u.email.clone()).unwrap_or_default(),
                class_name: p
                    .class_id
                    .and_then(|id| class_names.get(&id).cloned())
                    .unwrap_or_else(|| NO_CLASS_LABEL.to_string()),
                registered_at: p.created_at,
            }
        })
        .collect()
}
