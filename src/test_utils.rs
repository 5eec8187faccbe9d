//! 测试辅助: 内存 SQLite + 真实迁移，以及常用数据构造函数

use chrono::{DateTime, Duration, Utc};
use migration::{Migrator, MigratorTrait};
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, Set};
use uuid::Uuid;

use crate::config::{AdminConfig, EventsConfig};
use crate::entities::{
    ParticipantStatus, UserRole, class_entity as classes, event_entity as events,
    participant_entity as participants, user_entity as users,
};

pub async fn setup_db() -> DatabaseConnection {
    // 单连接: 每个连接对应一个独立的内存数据库
    let mut opts = ConnectOptions::new("sqlite::memory:".to_string());
    opts.max_connections(1).min_connections(1).sqlx_logging(false);
    let db = Database::connect(opts).await.unwrap();
    Migrator::up(&db, None).await.unwrap();
    db
}

pub fn events_config() -> EventsConfig {
    EventsConfig {
        default_event_name: "Wichtelaktion".to_string(),
        default_event_description: Some("Automatisch erstellt".to_string()),
        statistics_window_days: 30,
        registration_sweep_interval_secs: 60,
    }
}

pub fn admin_config(emails: &[&str]) -> AdminConfig {
    AdminConfig {
        emails: emails.iter().map(|e| e.to_string()).collect(),
    }
}

pub async fn create_user(db: &DatabaseConnection, email: &str, role: UserRole) -> users::Model {
    let now = Utc::now();
    users::ActiveModel {
        id: Set(Uuid::new_v4()),
        external_id: Set(format!("ext-{email}")),
        email: Set(email.to_string()),
        first_name: Set(Some(email.split('@').next().unwrap_or("user").to_string())),
        last_name: Set(Some("Test".to_string())),
        image_url: Set(None),
        role: Set(role),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .unwrap()
}

pub async fn create_class(db: &DatabaseConnection, name: &str) -> classes::Model {
    let now = Utc::now();
    classes::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .unwrap()
}

/// 激活且开放报名的活动，报名截止为 30 天后
pub async fn create_event(db: &DatabaseConnection, name: &str, is_active: bool) -> events::Model {
    let now = Utc::now();
    events::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        description: Set(None),
        registration_deadline: Set(now + Duration::days(30)),
        assignment_date: Set(now + Duration::days(31)),
        gift_deadline: Set(now + Duration::days(40)),
        delivery_date: Set(now + Duration::days(41)),
        is_active: Set(is_active),
        is_registration_open: Set(true),
        are_assignments_created: Set(false),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .unwrap()
}

pub async fn create_participant_at(
    db: &DatabaseConnection,
    user_id: Uuid,
    event_id: Uuid,
    class_id: Option<Uuid>,
    created_at: DateTime<Utc>,
) -> participants::Model {
    participants::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        event_id: Set(event_id),
        class_id: Set(class_id),
        interests: Set(Some("Bücher".to_string())),
        status: Set(ParticipantStatus::Registered),
        created_at: Set(created_at),
        updated_at: Set(created_at),
    }
    .insert(db)
    .await
    .unwrap()
}

/// 为活动创建 n 个报名用户（同一班级）
pub async fn seed_participants(
    db: &DatabaseConnection,
    event_id: Uuid,
    n: usize,
) -> Vec<participants::Model> {
    let class = create_class(db, &format!("class-{}", Uuid::new_v4())).await;
    let mut result = Vec::with_capacity(n);
    for i in 0..n {
        let user = create_user(db, &format!("student{i}-{}@school.de", Uuid::new_v4()), UserRole::User).await;
        let created_at = Utc::now() + Duration::milliseconds(i as i64);
        result.push(create_participant_at(db, user.id, event_id, Some(class.id), created_at).await);
    }
    result
}
