use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use uuid::Uuid;

use crate::entities::{
    ParticipantStatus, PresentStatus, assignment_entity as assignments, event_entity as events,
    participant_entity as participants, present_entity as presents,
};
use crate::error::{AppError, AppResult};
use crate::models::{AssignmentDetail, AssignmentGenerationResponse, OwnAssignment};
use crate::services::participant_service::load_profiles;
use crate::utils::plan_cycle;

const MIN_PARTICIPANTS: u64 = 2;

/// 分配引擎: 为活动一次性生成送礼环
#[derive(Clone)]
pub struct AssignmentService {
    pool: DatabaseConnection,
}

impl AssignmentService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    /// 生成分配
    ///
    /// 前置检查（不产生任何写入）:
    /// - 活动存在
    /// - 尚未生成过分配
    /// - 至少 2 名参与者
    ///
    /// 单个事务内:
    /// 1. 条件更新锁存位 (where are_assignments_created = false)，0 行则冲突
    /// 2. 事务内重新读取参与者并再次校验人数
    /// 3. 随机打乱后按环形生成 giver -> receiver
    /// 4. 写入分配及对应的 NOT_SUBMITTED 礼物记录
    /// 5. 所有参与者状态推进到 ASSIGNED
    pub async fn create_assignments(&self, event_id: Uuid) -> AppResult<AssignmentGenerationResponse> {
        let event = events::Entity::find_by_id(event_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Event not found".into()))?;
        if event.are_assignments_created {
            return Err(already_created());
        }
        let participant_count = participants::Entity::find()
            .filter(participants::Column::EventId.eq(event_id))
            .count(&self.pool)
            .await?;
        if participant_count < MIN_PARTICIPANTS {
            return Err(not_enough_participants());
        }

        let txn = self.pool.begin().await?;
        let now = Utc::now();

        let latched = events::Entity::update_many()
            .col_expr(events::Column::AreAssignmentsCreated, Expr::value(true))
            .col_expr(events::Column::UpdatedAt, Expr::value(now))
            .filter(events::Column::Id.eq(event_id))
            .filter(events::Column::AreAssignmentsCreated.eq(false))
            .exec(&txn)
            .await?;
        if latched.rows_affected == 0 {
            return Err(already_created());
        }

        let members = participants::Entity::find()
            .filter(participants::Column::EventId.eq(event_id))
            .order_by_asc(participants::Column::CreatedAt)
            .order_by_asc(participants::Column::Id)
            .all(&txn)
            .await?;
        if (members.len() as u64) < MIN_PARTICIPANTS {
            return Err(not_enough_participants());
        }

        let ids: Vec<Uuid> = members.iter().map(|p| p.id).collect();
        let plan = {
            let mut rng = rand::thread_rng();
            plan_cycle(&ids, &mut rng)
        };

        let mut assignment_rows = Vec::with_capacity(plan.len());
        let mut present_rows = Vec::with_capacity(plan.len());
        for pairing in &plan {
            let assignment_id = Uuid::new_v4();
            assignment_rows.push(assignments::ActiveModel {
                id: Set(assignment_id),
                event_id: Set(event_id),
                giver_id: Set(pairing.giver),
                receiver_id: Set(pairing.receiver),
                created_at: Set(now),
            });
            present_rows.push(presents::ActiveModel {
                id: Set(Uuid::new_v4()),
                assignment_id: Set(assignment_id),
                giver_id: Set(pairing.giver),
                receiver_id: Set(pairing.receiver),
                status: Set(PresentStatus::NotSubmitted),
                description: Set(None),
                submitted_at: Set(None),
                delivered_at: Set(None),
                created_at: Set(now),
                updated_at: Set(now),
            });
        }

        assignments::Entity::insert_many(assignment_rows)
            .exec(&txn)
            .await?;
        presents::Entity::insert_many(present_rows).exec(&txn).await?;

        participants::Entity::update_many()
            .col_expr(
                participants::Column::Status,
                Expr::value(ParticipantStatus::Assigned),
            )
            .col_expr(participants::Column::UpdatedAt, Expr::value(now))
            .filter(participants::Column::EventId.eq(event_id))
            .filter(participants::Column::Status.is_in(ParticipantStatus::Assigned.predecessors()))
            .exec(&txn)
            .await?;

        txn.commit().await?;

        log::info!(
            "Created {} assignments for event {event_id} ({})",
            plan.len(),
            event.name
        );
        Ok(AssignmentGenerationResponse {
            event_id,
            assignment_count: plan.len(),
        })
    }

    /// 活动的全部分配（管理员），附带赠送者与接收者信息
    pub async fn list_for_event(&self, event_id: Uuid) -> AppResult<Vec<AssignmentDetail>> {
        let rows = assignments::Entity::find()
            .filter(assignments::Column::EventId.eq(event_id))
            .order_by_asc(assignments::Column::CreatedAt)
            .order_by_asc(assignments::Column::Id)
            .all(&self.pool)
            .await?;
        let members = participants::Entity::find()
            .filter(participants::Column::EventId.eq(event_id))
            .all(&self.pool)
            .await?;
        let profiles = load_profiles(&self.pool, &members).await?;

        rows.into_iter()
            .map(|a| {
                let giver = profiles.get(&a.giver_id).cloned();
                let receiver = profiles.get(&a.receiver_id).cloned();
                match (giver, receiver) {
                    (Some(giver), Some(receiver)) => Ok(AssignmentDetail {
                        id: a.id,
                        event_id: a.event_id,
                        giver,
                        receiver,
                        created_at: a.created_at,
                    }),
                    _ => Err(AppError::InternalError(format!(
                        "Assignment {} references a missing participant",
                        a.id
                    ))),
                }
            })
            .collect()
    }

    /// 当前用户在活动中的送礼对象
    pub async fn own_assignment(
        &self,
        user_id: Uuid,
        event_id: Uuid,
    ) -> AppResult<Option<OwnAssignment>> {
        let Some(me) = participants::Entity::find()
            .filter(participants::Column::UserId.eq(user_id))
            .filter(participants::Column::EventId.eq(event_id))
            .one(&self.pool)
            .await?
        else {
            return Ok(None);
        };

        let Some(assignment) = assignments::Entity::find()
            .filter(assignments::Column::EventId.eq(event_id))
            .filter(assignments::Column::GiverId.eq(me.id))
            .one(&self.pool)
            .await?
        else {
            return Ok(None);
        };

        let receiver = participants::Entity::find_by_id(assignment.receiver_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Receiver not found".into()))?;
        let receiver_id = receiver.id;
        let mut profiles = load_profiles(&self.pool, &[receiver]).await?;
        let receiver = profiles
            .remove(&receiver_id)
            .ok_or_else(|| AppError::InternalError("Receiver profile missing".into()))?;

        let present = presents::Entity::find()
            .filter(presents::Column::AssignmentId.eq(assignment.id))
            .one(&self.pool)
            .await?;

        Ok(Some(OwnAssignment {
            assignment_id: assignment.id,
            event_id,
            receiver,
            present: present.map(Into::into),
        }))
    }
}

fn already_created() -> AppError {
    AppError::Conflict("Assignments have already been created for this event".into())
}

fn not_enough_participants() -> AppError {
    AppError::Conflict("At least 2 participants are required to create assignments".into())
}
