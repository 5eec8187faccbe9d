use std::collections::{HashMap, HashSet};

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    TransactionTrait, sea_query::Expr,
};
use uuid::Uuid;

use crate::config::EventsConfig;
use crate::entities::{
    ParticipantStatus, assignment_entity as assignments, class_entity as classes,
    event_entity as events, participant_entity as participants, present_entity as presents,
    user_entity as users,
};
use crate::error::{AppError, AppResult};
use crate::models::{
    AdminRegisterRequest, ClassSummary, PaginatedResponse, PaginationParams, ParticipantDetail,
    ParticipantProfile, ParticipantResponse, RegisterRequest, RegistrationResponse, UserSummary,
    normalize_text,
};
use crate::services::EventService;

/// 报名管理
#[derive(Clone)]
pub struct ParticipantService {
    pool: DatabaseConnection,
    event_service: EventService,
    events_config: EventsConfig,
}

impl ParticipantService {
    pub fn new(
        pool: DatabaseConnection,
        event_service: EventService,
        events_config: EventsConfig,
    ) -> Self {
        Self {
            pool,
            event_service,
            events_config,
        }
    }

    /// 用户自助报名
    pub async fn register(
        &self,
        user_id: Uuid,
        req: RegisterRequest,
    ) -> AppResult<RegistrationResponse> {
        self.register_user(user_id, req.class_id, req.interests, req.event_id)
            .await
    }

    /// 管理员代为报名
    pub async fn admin_register(&self, req: AdminRegisterRequest) -> AppResult<RegistrationResponse> {
        let exists = users::Entity::find_by_id(req.user_id)
            .one(&self.pool)
            .await?
            .is_some();
        if !exists {
            return Err(AppError::NotFound("User not found".into()));
        }
        self.register_user(req.user_id, req.class_id, req.interests, req.event_id)
            .await
    }

    /// 报名逻辑:
    /// 1. 班级必须存在
    /// 2. 活动: 显式指定 -> 当前激活 -> 自动创建默认活动
    /// 3. 报名关闭、已过截止或已生成分配时拒绝
    /// 4. 已报名则就地更新班级与兴趣，否则新建 REGISTERED 记录
    async fn register_user(
        &self,
        user_id: Uuid,
        class_id: Option<Uuid>,
        interests: Option<String>,
        event_id: Option<Uuid>,
    ) -> AppResult<RegistrationResponse> {
        let class_id =
            class_id.ok_or_else(|| AppError::ValidationError("Class is required".into()))?;
        let class = classes::Entity::find_by_id(class_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::ValidationError("Invalid class selected".into()))?;

        let event = self.registration_event(event_id).await?;
        if event.are_assignments_created {
            return Err(AppError::Conflict(
                "Assignments have already been created for this event".into(),
            ));
        }
        if !event.accepts_registrations(Utc::now()) {
            return Err(AppError::Conflict(
                "Registration is closed for this event".into(),
            ));
        }

        let interests = normalize_text(interests);
        // 并发重复报名时首个事务因唯一约束回滚，重试一次走就地更新
        let (participant, updated) = match self
            .save_registration(user_id, &event, class.id, interests.clone())
            .await
        {
            Err(e) if e.is_unique_violation() => {
                self.save_registration(user_id, &event, class.id, interests)
                    .await?
            }
            other => other?,
        };

        log::info!(
            "User {user_id} registered for event {} (updated: {updated})",
            event.id
        );

        let user = users::Entity::find_by_id(user_id).one(&self.pool).await?;
        Ok(RegistrationResponse {
            participant: participant.into(),
            user: user.as_ref().map(UserSummary::from),
            class: Some(ClassSummary::from(&class)),
            updated,
        })
    }

    async fn registration_event(&self, event_id: Option<Uuid>) -> AppResult<events::Model> {
        if let Some(id) = event_id {
            return self.event_service.find(id).await;
        }
        match self.event_service.find_active().await? {
            Some(event) => Ok(event),
            None => {
                log::info!("No active event, creating the default event");
                self.event_service.create_default(&self.events_config).await
            }
        }
    }

    /// 在同一事务内先对活动行做条件写入，再新增或更新报名。
    /// 分配生成会锁定同一活动行，两者串行化: 分配已生成或报名已关闭时写入 0 行，返回冲突。
    async fn save_registration(
        &self,
        user_id: Uuid,
        event: &events::Model,
        class_id: Uuid,
        interests: Option<String>,
    ) -> AppResult<(participants::Model, bool)> {
        let txn = self.pool.begin().await?;
        let now = Utc::now();

        let guard = events::Entity::update_many()
            .col_expr(events::Column::UpdatedAt, Expr::value(now))
            .filter(events::Column::Id.eq(event.id))
            .filter(events::Column::AreAssignmentsCreated.eq(false))
            .filter(events::Column::IsRegistrationOpen.eq(true))
            .filter(events::Column::RegistrationDeadline.gt(now))
            .exec(&txn)
            .await?;
        if guard.rows_affected == 0 {
            let current = events::Entity::find_by_id(event.id)
                .one(&txn)
                .await?
                .ok_or_else(|| AppError::NotFound("Event not found".into()))?;
            txn.rollback().await?;
            return Err(if current.are_assignments_created {
                AppError::Conflict("Assignments have already been created for this event".into())
            } else {
                AppError::Conflict("Registration is closed for this event".into())
            });
        }

        let existing = participants::Entity::find()
            .filter(participants::Column::UserId.eq(user_id))
            .filter(participants::Column::EventId.eq(event.id))
            .one(&txn)
            .await?;
        let saved = match existing {
            Some(existing) => {
                let mut am = existing.into_active_model();
                am.class_id = Set(Some(class_id));
                am.interests = Set(interests);
                am.updated_at = Set(now);
                (am.update(&txn).await?, true)
            }
            None => {
                let inserted = participants::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    user_id: Set(user_id),
                    event_id: Set(event.id),
                    class_id: Set(Some(class_id)),
                    interests: Set(interests),
                    status: Set(ParticipantStatus::Registered),
                    created_at: Set(now),
                    updated_at: Set(now),
                }
                .insert(&txn)
                .await?;
                (inserted, false)
            }
        };

        txn.commit().await?;
        Ok(saved)
    }

    pub async fn find_for_user(
        &self,
        user_id: Uuid,
        event_id: Uuid,
    ) -> AppResult<Option<participants::Model>> {
        Ok(participants::Entity::find()
            .filter(participants::Column::UserId.eq(user_id))
            .filter(participants::Column::EventId.eq(event_id))
            .one(&self.pool)
            .await?)
    }

    /// 管理员查看活动报名列表（分页，最新在前）
    pub async fn list(
        &self,
        event_id: Uuid,
        params: &PaginationParams,
    ) -> AppResult<PaginatedResponse<ParticipantDetail>> {
        let base_query =
            participants::Entity::find().filter(participants::Column::EventId.eq(event_id));
        let total = base_query.clone().count(&self.pool).await?;

        let page = base_query
            .order_by_desc(participants::Column::CreatedAt)
            .order_by_asc(participants::Column::Id)
            .limit(params.get_limit())
            .offset(params.get_offset())
            .all(&self.pool)
            .await?;

        let page_ids: Vec<Uuid> = page.iter().map(|p| p.id).collect();
        let giving: HashMap<Uuid, assignments::Model> = if page_ids.is_empty() {
            HashMap::new()
        } else {
            assignments::Entity::find()
                .filter(assignments::Column::EventId.eq(event_id))
                .filter(assignments::Column::GiverId.is_in(page_ids.iter().copied()))
                .all(&self.pool)
                .await?
                .into_iter()
                .map(|a| (a.giver_id, a))
                .collect()
        };
        let given: HashMap<Uuid, presents::Model> = if page_ids.is_empty() {
            HashMap::new()
        } else {
            presents::Entity::find()
                .filter(presents::Column::GiverId.is_in(page_ids.iter().copied()))
                .all(&self.pool)
                .await?
                .into_iter()
                .map(|p| (p.giver_id, p))
                .collect()
        };

        let receiver_ids: Vec<Uuid> = giving.values().map(|a| a.receiver_id).collect();
        let receivers = if receiver_ids.is_empty() {
            Vec::new()
        } else {
            participants::Entity::find()
                .filter(participants::Column::Id.is_in(receiver_ids))
                .all(&self.pool)
                .await?
        };
        let receiver_profiles = load_profiles(&self.pool, &receivers).await?;
        let page_profiles = load_profiles(&self.pool, &page).await?;

        let results = page
            .into_iter()
            .map(|p| {
                let profile = page_profiles.get(&p.id);
                let giving_to = giving
                    .get(&p.id)
                    .and_then(|a| receiver_profiles.get(&a.receiver_id))
                    .cloned();
                let present_given = given.get(&p.id).cloned().map(Into::into);
                ParticipantDetail {
                    user: profile.and_then(|pr| pr.user.clone()),
                    class: profile.and_then(|pr| pr.class.clone()),
                    participant: ParticipantResponse::from(p),
                    giving_to,
                    present_given,
                }
            })
            .collect();

        Ok(PaginatedResponse::new(results, params, total))
    }
}

/// 批量加载参与者的用户与班级展示信息，按 participant id 索引
pub(crate) async fn load_profiles<C: ConnectionTrait>(
    conn: &C,
    rows: &[participants::Model],
) -> AppResult<HashMap<Uuid, ParticipantProfile>> {
    if rows.is_empty() {
        return Ok(HashMap::new());
    }

    let user_ids: HashSet<Uuid> = rows.iter().map(|p| p.user_id).collect();
    let class_ids: HashSet<Uuid> = rows.iter().filter_map(|p| p.class_id).collect();

    let user_map: HashMap<Uuid, users::Model> = users::Entity::find()
        .filter(users::Column::Id.is_in(user_ids))
        .all(conn)
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();
    let class_map: HashMap<Uuid, classes::Model> = if class_ids.is_empty() {
        HashMap::new()
    } else {
        classes::Entity::find()
            .filter(classes::Column::Id.is_in(class_ids))
            .all(conn)
            .await?
            .into_iter()
            .map(|c| (c.id, c))
            .collect()
    };

    Ok(rows
        .iter()
        .map(|p| {
            let profile = ParticipantProfile {
                participant_id: p.id,
                status: p.status,
                interests: p.interests.clone(),
                user: user_map.get(&p.user_id).map(UserSummary::from),
                class: p
                    .class_id
                    .and_then(|id| class_map.get(&id))
                    .map(ClassSummary::from),
            };
            (p.id, profile)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::UserRole;
    use crate::services::AssignmentService;
    use crate::test_utils::*;
    use chrono::Duration;

    fn service(db: &DatabaseConnection) -> ParticipantService {
        ParticipantService::new(db.clone(), EventService::new(db.clone()), events_config())
    }

    fn request(class_id: Uuid, interests: &str) -> RegisterRequest {
        RegisterRequest {
            class_id: Some(class_id),
            interests: Some(interests.to_string()),
            event_id: None,
        }
    }

    #[tokio::test]
    async fn test_reregistration_updates_in_place() {
        let db = setup_db().await;
        let event = create_event(&db, "Winter", true).await;
        let class_a = create_class(&db, "6a").await;
        let class_b = create_class(&db, "6b").await;
        let user = create_user(&db, "lena@school.de", UserRole::User).await;
        let svc = service(&db);

        let first = svc.register(user.id, request(class_a.id, "Malen")).await.unwrap();
        assert!(!first.updated);
        assert_eq!(first.participant.event_id, event.id);
        assert_eq!(first.participant.status, ParticipantStatus::Registered);

        let second = svc.register(user.id, request(class_b.id, "  ")).await.unwrap();
        assert!(second.updated);
        assert_eq!(second.participant.id, first.participant.id);
        assert_eq!(second.participant.class_id, Some(class_b.id));
        assert_eq!(second.participant.interests, None);

        let count = participants::Entity::find()
            .filter(participants::Column::UserId.eq(user.id))
            .count(&db)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_register_validates_class() {
        let db = setup_db().await;
        create_event(&db, "Winter", true).await;
        let user = create_user(&db, "tom@school.de", UserRole::User).await;
        let svc = service(&db);

        let err = svc.register(user.id, request(Uuid::new_v4(), "")).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(ref m) if m == "Invalid class selected"));

        let err = svc
            .register(user.id, RegisterRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[tokio::test]
    async fn test_register_creates_default_event_when_none_active() {
        let db = setup_db().await;
        let class = create_class(&db, "8c").await;
        let user = create_user(&db, "mia@school.de", UserRole::User).await;
        let svc = service(&db);

        let reg = svc.register(user.id, request(class.id, "Musik")).await.unwrap();
        let event = EventService::new(db.clone())
            .find(reg.participant.event_id)
            .await
            .unwrap();
        assert_eq!(event.name, "Wichtelaktion");
        assert!(event.is_active);
        assert!(event.is_registration_open);
        assert!(event.registration_deadline > Utc::now() + Duration::days(29));
    }

    #[tokio::test]
    async fn test_register_rejected_when_registration_closed() {
        let db = setup_db().await;
        let event = create_event(&db, "Zu", true).await;
        let class = create_class(&db, "9a").await;
        let user = create_user(&db, "paul@school.de", UserRole::User).await;
        let mut am = event.into_active_model();
        am.is_registration_open = Set(false);
        am.update(&db).await.unwrap();

        let err = service(&db)
            .register(user.id, request(class.id, ""))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_register_rejected_after_deadline() {
        let db = setup_db().await;
        let event = create_event(&db, "Spät", true).await;
        let class = create_class(&db, "9b").await;
        let user = create_user(&db, "ida@school.de", UserRole::User).await;
        let mut am = event.into_active_model();
        am.registration_deadline = Set(Utc::now() - Duration::hours(1));
        am.update(&db).await.unwrap();

        let err = service(&db)
            .register(user.id, request(class.id, ""))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_register_rejected_after_assignments() {
        let db = setup_db().await;
        let event = create_event(&db, "Gezogen", true).await;
        seed_participants(&db, event.id, 2).await;
        AssignmentService::new(db.clone())
            .create_assignments(event.id)
            .await
            .unwrap();

        let class = create_class(&db, "10a").await;
        let user = create_user(&db, "neu@school.de", UserRole::User).await;
        let err = service(&db)
            .register(user.id, request(class.id, ""))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_save_registration_rechecks_event_inside_transaction() {
        let db = setup_db().await;
        let event = create_event(&db, "Knapp", true).await;
        let class = create_class(&db, "7a").await;
        let user = create_user(&db, "spaet@school.de", UserRole::User).await;
        let svc = service(&db);

        // 预检查之后分配已生成: 旧快照不能再写入报名
        let stale = event.clone();
        let mut am = event.into_active_model();
        am.are_assignments_created = Set(true);
        am.update(&db).await.unwrap();

        let err = svc
            .save_registration(user.id, &stale, class.id, None)
            .await
            .unwrap_err();
        assert!(
            matches!(err, AppError::Conflict(ref m) if m == "Assignments have already been created for this event")
        );
        assert!(svc.find_for_user(user.id, stale.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_registration_rejects_closed_event_snapshot() {
        let db = setup_db().await;
        let event = create_event(&db, "Geschlossen", true).await;
        let class = create_class(&db, "7b").await;
        let user = create_user(&db, "zu@school.de", UserRole::User).await;
        let svc = service(&db);

        let stale = event.clone();
        let mut am = event.into_active_model();
        am.is_registration_open = Set(false);
        am.update(&db).await.unwrap();

        let err = svc
            .save_registration(user.id, &stale, class.id, Some("Bücher".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(ref m) if m == "Registration is closed for this event"));
        assert!(svc.find_for_user(user.id, stale.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_register_racing_assignment_never_leaves_unassigned_participant() {
        let db = setup_db().await;
        let event = create_event(&db, "Rennen", true).await;
        seed_participants(&db, event.id, 3).await;
        let class = create_class(&db, "5c").await;
        let late = create_user(&db, "last@school.de", UserRole::User).await;
        let svc = service(&db);
        let assigner = AssignmentService::new(db.clone());

        let (registered, generated) = tokio::join!(
            svc.register(late.id, request(class.id, "Kekse")),
            assigner.create_assignments(event.id)
        );
        generated.unwrap();
        if let Err(e) = registered {
            assert!(matches!(e, AppError::Conflict(_)));
        }

        let members = participants::Entity::find()
            .filter(participants::Column::EventId.eq(event.id))
            .all(&db)
            .await
            .unwrap();
        let assigned = assignments::Entity::find()
            .filter(assignments::Column::EventId.eq(event.id))
            .count(&db)
            .await
            .unwrap();
        assert_eq!(members.len() as u64, assigned);
        assert!(members.iter().all(|p| p.status == ParticipantStatus::Assigned));
    }

    #[tokio::test]
    async fn test_admin_register_requires_existing_user() {
        let db = setup_db().await;
        create_event(&db, "Winter", true).await;
        let class = create_class(&db, "4a").await;
        let svc = service(&db);

        let err = svc
            .admin_register(AdminRegisterRequest {
                user_id: Uuid::new_v4(),
                class_id: Some(class.id),
                interests: None,
                event_id: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let user = create_user(&db, "kind@school.de", UserRole::User).await;
        let reg = svc
            .admin_register(AdminRegisterRequest {
                user_id: user.id,
                class_id: Some(class.id),
                interests: Some("Lego".into()),
                event_id: None,
            })
            .await
            .unwrap();
        assert_eq!(reg.participant.user_id, user.id);
    }

    #[tokio::test]
    async fn test_list_joins_and_paginates() {
        let db = setup_db().await;
        let event = create_event(&db, "Liste", true).await;
        seed_participants(&db, event.id, 3).await;
        AssignmentService::new(db.clone())
            .create_assignments(event.id)
            .await
            .unwrap();
        let svc = service(&db);

        let page = svc
            .list(event.id, &PaginationParams::new(Some(1), Some(2)))
            .await
            .unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.pages, 2);
        assert_eq!(page.results.len(), 2);
        for row in &page.results {
            assert!(row.user.is_some());
            assert!(row.class.is_some());
            let receiver = row.giving_to.as_ref().unwrap();
            assert_ne!(receiver.participant_id, row.participant.id);
            assert!(receiver.user.is_some());
            assert!(row.present_given.is_some());
        }
        assert!(page.results[0].participant.created_at >= page.results[1].participant.created_at);
    }
}
