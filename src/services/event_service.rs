use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::config::EventsConfig;
use crate::entities::{
    assignment_entity as assignments, event_entity as events, participant_entity as participants,
};
use crate::error::{AppError, AppResult};
use crate::models::{
    CreateEventRequest, EventResponse, PatchEventRequest, UpdateEventRequest, normalize_text,
};

/// 活动管理
#[derive(Clone)]
pub struct EventService {
    pool: DatabaseConnection,
}

impl EventService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    /// 活动列表，最新的在前；非管理员只能看到激活的活动
    pub async fn list(&self, include_inactive: bool) -> AppResult<Vec<EventResponse>> {
        let mut query = events::Entity::find();
        if !include_inactive {
            query = query.filter(events::Column::IsActive.eq(true));
        }
        let items = query
            .order_by_desc(events::Column::CreatedAt)
            .all(&self.pool)
            .await?;
        self.with_counts(items).await
    }

    pub async fn get(&self, event_id: Uuid, include_inactive: bool) -> AppResult<EventResponse> {
        let event = self.find(event_id).await?;
        if !include_inactive && !event.is_active {
            return Err(AppError::NotFound("Event not found".into()));
        }
        let mut list = self.with_counts(vec![event]).await?;
        list.pop()
            .ok_or_else(|| AppError::InternalError("Event vanished while loading counts".into()))
    }

    pub async fn find(&self, event_id: Uuid) -> AppResult<events::Model> {
        events::Entity::find_by_id(event_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Event not found".into()))
    }

    pub async fn find_active(&self) -> AppResult<Option<events::Model>> {
        Ok(events::Entity::find()
            .filter(events::Column::IsActive.eq(true))
            .order_by_desc(events::Column::CreatedAt)
            .one(&self.pool)
            .await?)
    }

    /// 确定操作的目标活动: 显式指定的 id（必须存在），否则为当前激活的活动
    pub async fn resolve_target(&self, event_id: Option<Uuid>) -> AppResult<events::Model> {
        match event_id {
            Some(id) => self.find(id).await,
            None => self
                .find_active()
                .await?
                .ok_or_else(|| AppError::NotFound("No active event found".into())),
        }
    }

    /// 创建活动；若为激活状态，同一事务内取消其它活动的激活
    pub async fn create(&self, req: CreateEventRequest) -> AppResult<EventResponse> {
        let name = required_name(req.name)?;
        let now = Utc::now();
        let registration_deadline = req.registration_deadline.unwrap_or(now);
        let assignment_date = req.assignment_date.unwrap_or(now);
        let gift_deadline = req.gift_deadline.unwrap_or(now);
        let delivery_date = req.delivery_date.unwrap_or(now);
        validate_milestones(
            registration_deadline,
            assignment_date,
            gift_deadline,
            delivery_date,
        )?;
        let is_active = req.is_active.unwrap_or(true);

        let txn = self.pool.begin().await?;
        let id = Uuid::new_v4();
        if is_active {
            deactivate_others(&txn, id).await?;
        }
        let event = events::ActiveModel {
            id: Set(id),
            name: Set(name),
            description: Set(normalize_text(req.description)),
            registration_deadline: Set(registration_deadline),
            assignment_date: Set(assignment_date),
            gift_deadline: Set(gift_deadline),
            delivery_date: Set(delivery_date),
            is_active: Set(is_active),
            is_registration_open: Set(true),
            are_assignments_created: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;

        log::info!("Created event {} ({}), active: {is_active}", event.id, event.name);
        Ok(EventResponse::new(event, 0, 0))
    }

    /// 创建默认活动（首次报名时没有任何激活活动）
    pub async fn create_default(&self, config: &EventsConfig) -> AppResult<events::Model> {
        let now = Utc::now();
        let req = CreateEventRequest {
            name: Some(config.default_event_name.clone()),
            description: config.default_event_description.clone(),
            registration_deadline: Some(now + Duration::days(30)),
            assignment_date: Some(now + Duration::days(35)),
            gift_deadline: Some(now + Duration::days(60)),
            delivery_date: Some(now + Duration::days(65)),
            is_active: Some(true),
        };
        let created = self.create(req).await?;
        self.find(created.id).await
    }

    /// 整体更新（PUT）；未提供的里程碑与开关保持原值
    pub async fn update(&self, event_id: Uuid, req: UpdateEventRequest) -> AppResult<EventResponse> {
        let event = self.find(event_id).await?;
        let name = required_name(req.name)?;

        let registration_deadline = req
            .registration_deadline
            .unwrap_or(event.registration_deadline);
        let assignment_date = req.assignment_date.unwrap_or(event.assignment_date);
        let gift_deadline = req.gift_deadline.unwrap_or(event.gift_deadline);
        let delivery_date = req.delivery_date.unwrap_or(event.delivery_date);
        validate_milestones(
            registration_deadline,
            assignment_date,
            gift_deadline,
            delivery_date,
        )?;
        let is_active = req.is_active.unwrap_or(event.is_active);
        let is_registration_open = req
            .is_registration_open
            .unwrap_or(event.is_registration_open);

        let txn = self.pool.begin().await?;
        if is_active {
            deactivate_others(&txn, event_id).await?;
        }
        let mut am = event.into_active_model();
        am.name = Set(name);
        am.description = Set(normalize_text(req.description));
        am.registration_deadline = Set(registration_deadline);
        am.assignment_date = Set(assignment_date);
        am.gift_deadline = Set(gift_deadline);
        am.delivery_date = Set(delivery_date);
        am.is_active = Set(is_active);
        am.is_registration_open = Set(is_registration_open);
        am.updated_at = Set(Utc::now());
        am.update(&txn).await?;
        txn.commit().await?;

        self.get(event_id, true).await
    }

    /// 部分更新（PATCH）；are_assignments_created 为单向锁存，不能从 true 改回 false
    pub async fn patch(&self, event_id: Uuid, req: PatchEventRequest) -> AppResult<EventResponse> {
        let event = self.find(event_id).await?;

        if req.are_assignments_created == Some(false) && event.are_assignments_created {
            return Err(AppError::Conflict(
                "Assignments have already been created and cannot be reset".into(),
            ));
        }
        if req.is_active.is_none()
            && req.are_assignments_created.is_none()
            && req.is_registration_open.is_none()
        {
            return Err(AppError::ValidationError("No fields to update".into()));
        }

        let txn = self.pool.begin().await?;
        if req.is_active == Some(true) {
            deactivate_others(&txn, event_id).await?;
        }
        let mut am = event.into_active_model();
        if let Some(v) = req.is_active {
            am.is_active = Set(v);
        }
        if let Some(v) = req.are_assignments_created {
            am.are_assignments_created = Set(v);
        }
        if let Some(v) = req.is_registration_open {
            am.is_registration_open = Set(v);
        }
        am.updated_at = Set(Utc::now());
        am.update(&txn).await?;
        txn.commit().await?;

        self.get(event_id, true).await
    }

    /// 删除活动；已有报名或分配时拒绝
    pub async fn delete(&self, event_id: Uuid) -> AppResult<()> {
        let event = self.find(event_id).await?;

        let participant_count = participants::Entity::find()
            .filter(participants::Column::EventId.eq(event.id))
            .count(&self.pool)
            .await?;
        let assignment_count = assignments::Entity::find()
            .filter(assignments::Column::EventId.eq(event.id))
            .count(&self.pool)
            .await?;
        if participant_count > 0 || assignment_count > 0 {
            return Err(AppError::Conflict(
                "Cannot delete an event that has participants or assignments".into(),
            ));
        }

        events::Entity::delete_by_id(event.id).exec(&self.pool).await?;
        log::info!("Deleted event {}", event.id);
        Ok(())
    }

    /// 关闭已过报名截止时间的活动报名，返回受影响的活动数
    pub async fn close_expired_registrations(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let res = events::Entity::update_many()
            .col_expr(events::Column::IsRegistrationOpen, Expr::value(false))
            .col_expr(events::Column::UpdatedAt, Expr::value(now))
            .filter(events::Column::IsRegistrationOpen.eq(true))
            .filter(events::Column::RegistrationDeadline.lte(now))
            .exec(&self.pool)
            .await?;
        Ok(res.rows_affected)
    }

    async fn with_counts(&self, items: Vec<events::Model>) -> AppResult<Vec<EventResponse>> {
        let ids: Vec<Uuid> = items.iter().map(|e| e.id).collect();
        let participant_counts = self.count_by_event::<participants::Entity, _>(
            participants::Column::EventId,
            participants::Column::Id,
            &ids,
        )
        .await?;
        let assignment_counts = self.count_by_event::<assignments::Entity, _>(
            assignments::Column::EventId,
            assignments::Column::Id,
            &ids,
        )
        .await?;

        Ok(items
            .into_iter()
            .map(|e| {
                let p = participant_counts.get(&e.id).copied().unwrap_or(0);
                let a = assignment_counts.get(&e.id).copied().unwrap_or(0);
                EventResponse::new(e, p, a)
            })
            .collect())
    }

    async fn count_by_event<E, C>(
        &self,
        event_col: C,
        id_col: C,
        event_ids: &[Uuid],
    ) -> AppResult<HashMap<Uuid, u64>>
    where
        E: EntityTrait<Column = C>,
        C: ColumnTrait,
    {
        if event_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows: Vec<(Uuid, i64)> = E::find()
            .select_only()
            .column(event_col)
            .column_as(Expr::col(id_col).count(), "count")
            .filter(event_col.is_in(event_ids.iter().copied()))
            .group_by(event_col)
            .into_tuple()
            .all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(|(id, count)| (id, count.max(0) as u64))
            .collect())
    }
}

/// 取消除 keep_id 外所有活动的激活状态
async fn deactivate_others<C: ConnectionTrait>(conn: &C, keep_id: Uuid) -> AppResult<()> {
    let res = events::Entity::update_many()
        .col_expr(events::Column::IsActive, Expr::value(false))
        .col_expr(events::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(events::Column::IsActive.eq(true))
        .filter(events::Column::Id.ne(keep_id))
        .exec(conn)
        .await?;
    if res.rows_affected > 0 {
        log::info!("Deactivated {} other event(s)", res.rows_affected);
    }
    Ok(())
}

fn required_name(name: Option<String>) -> AppResult<String> {
    normalize_text(name).ok_or_else(|| AppError::ValidationError("Event name is required".into()))
}

/// 里程碑顺序: 报名截止 <= 分配日期 <= 送礼截止 <= 发放日期
fn validate_milestones(
    registration_deadline: DateTime<Utc>,
    assignment_date: DateTime<Utc>,
    gift_deadline: DateTime<Utc>,
    delivery_date: DateTime<Utc>,
) -> AppResult<()> {
    if registration_deadline > assignment_date {
        return Err(AppError::ValidationError(
            "Registration deadline must not be after the assignment date".into(),
        ));
    }
    if assignment_date > gift_deadline {
        return Err(AppError::ValidationError(
            "Assignment date must not be after the gift deadline".into(),
        ));
    }
    if gift_deadline > delivery_date {
        return Err(AppError::ValidationError(
            "Gift deadline must not be after the delivery date".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::UserRole;
    use crate::test_utils::*;

    fn create_req(name: &str, is_active: Option<bool>) -> CreateEventRequest {
        CreateEventRequest {
            name: Some(name.to_string()),
            is_active,
            ..Default::default()
        }
    }

    async fn active_count(db: &DatabaseConnection) -> u64 {
        events::Entity::find()
            .filter(events::Column::IsActive.eq(true))
            .count(db)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_defaults() {
        let db = setup_db().await;
        let svc = EventService::new(db);
        let event = svc
            .create(CreateEventRequest {
                name: Some("  Wichteln 2024 ".into()),
                description: Some("   ".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(event.name, "Wichteln 2024");
        assert_eq!(event.description, None);
        assert!(event.is_active);
        assert!(event.is_registration_open);
        assert!(!event.are_assignments_created);
    }

    #[tokio::test]
    async fn test_create_requires_name_and_ordered_milestones() {
        let db = setup_db().await;
        let svc = EventService::new(db);
        assert!(matches!(
            svc.create(create_req("  ", None)).await.unwrap_err(),
            AppError::ValidationError(_)
        ));

        let now = Utc::now();
        let err = svc
            .create(CreateEventRequest {
                name: Some("x".into()),
                registration_deadline: Some(now + Duration::days(10)),
                assignment_date: Some(now + Duration::days(5)),
                gift_deadline: Some(now + Duration::days(20)),
                delivery_date: Some(now + Duration::days(25)),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[tokio::test]
    async fn test_single_active_event_after_activation() {
        let db = setup_db().await;
        let svc = EventService::new(db.clone());
        let first = svc.create(create_req("A", None)).await.unwrap();
        let second = svc.create(create_req("B", None)).await.unwrap();
        assert_eq!(active_count(&db).await, 1);
        assert_eq!(svc.find_active().await.unwrap().unwrap().id, second.id);

        let inactive = svc.create(create_req("C", Some(false))).await.unwrap();
        assert_eq!(active_count(&db).await, 1);

        svc.patch(
            first.id,
            PatchEventRequest {
                is_active: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(active_count(&db).await, 1);
        assert_eq!(svc.find_active().await.unwrap().unwrap().id, first.id);

        svc.update(
            inactive.id,
            UpdateEventRequest {
                name: Some("C".into()),
                is_active: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(active_count(&db).await, 1);
        assert_eq!(svc.find_active().await.unwrap().unwrap().id, inactive.id);
    }

    #[tokio::test]
    async fn test_update_keeps_omitted_fields() {
        let db = setup_db().await;
        let event = create_event(&db, "Herbst", true).await;
        let svc = EventService::new(db);
        let updated = svc
            .update(
                event.id,
                UpdateEventRequest {
                    name: Some("Herbst 2".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Herbst 2");
        assert_eq!(updated.registration_deadline, event.registration_deadline);
        assert_eq!(updated.delivery_date, event.delivery_date);
        assert!(updated.is_active);
        assert!(updated.is_registration_open);
    }

    #[tokio::test]
    async fn test_patch_cannot_reset_assignment_latch() {
        let db = setup_db().await;
        let event = create_event(&db, "Latch", true).await;
        let svc = EventService::new(db);
        svc.patch(
            event.id,
            PatchEventRequest {
                are_assignments_created: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let err = svc
            .patch(
                event.id,
                PatchEventRequest {
                    are_assignments_created: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert!(svc.find(event.id).await.unwrap().are_assignments_created);
    }

    #[tokio::test]
    async fn test_delete_guard() {
        let db = setup_db().await;
        let svc = EventService::new(db.clone());
        let empty = create_event(&db, "Leer", false).await;
        svc.delete(empty.id).await.unwrap();
        assert!(matches!(
            svc.find(empty.id).await.unwrap_err(),
            AppError::NotFound(_)
        ));

        let busy = create_event(&db, "Voll", true).await;
        let user = create_user(&db, "x@school.de", UserRole::User).await;
        create_participant_at(&db, user.id, busy.id, None, Utc::now()).await;
        assert!(matches!(
            svc.delete(busy.id).await.unwrap_err(),
            AppError::Conflict(_)
        ));
        assert!(svc.find(busy.id).await.is_ok());

        assert!(matches!(
            svc.delete(Uuid::new_v4()).await.unwrap_err(),
            AppError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_visibility_for_non_admins() {
        let db = setup_db().await;
        let active = create_event(&db, "Aktiv", true).await;
        let hidden = create_event(&db, "Versteckt", false).await;
        let svc = EventService::new(db);

        assert_eq!(svc.list(false).await.unwrap().len(), 1);
        assert_eq!(svc.list(true).await.unwrap().len(), 2);
        assert!(svc.get(active.id, false).await.is_ok());
        assert!(matches!(
            svc.get(hidden.id, false).await.unwrap_err(),
            AppError::NotFound(_)
        ));
        assert!(svc.get(hidden.id, true).await.is_ok());
    }

    #[tokio::test]
    async fn test_list_counts_participants() {
        let db = setup_db().await;
        let event = create_event(&db, "Zähler", true).await;
        seed_participants(&db, event.id, 3).await;
        let svc = EventService::new(db);
        let list = svc.list(true).await.unwrap();
        assert_eq!(list[0].participant_count, 3);
        assert_eq!(list[0].assignment_count, 0);
    }

    #[tokio::test]
    async fn test_resolve_target() {
        let db = setup_db().await;
        let svc = EventService::new(db.clone());
        assert!(matches!(
            svc.resolve_target(None).await.unwrap_err(),
            AppError::NotFound(_)
        ));
        let inactive = create_event(&db, "Alt", false).await;
        let active = create_event(&db, "Neu", true).await;
        assert_eq!(svc.resolve_target(None).await.unwrap().id, active.id);
        assert_eq!(
            svc.resolve_target(Some(inactive.id)).await.unwrap().id,
            inactive.id
        );
        assert!(matches!(
            svc.resolve_target(Some(Uuid::new_v4())).await.unwrap_err(),
            AppError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_close_expired_registrations() {
        let db = setup_db().await;
        let event = create_event(&db, "Sweep", true).await;
        let svc = EventService::new(db);

        assert_eq!(svc.close_expired_registrations(Utc::now()).await.unwrap(), 0);
        let later = event.registration_deadline + Duration::minutes(1);
        assert_eq!(svc.close_expired_registrations(later).await.unwrap(), 1);
        assert!(!svc.find(event.id).await.unwrap().is_registration_open);
        assert_eq!(svc.close_expired_registrations(later).await.unwrap(), 0);
    }
}
