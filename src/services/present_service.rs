use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    TransactionTrait,
};
use uuid::Uuid;

use crate::entities::{
    ParticipantStatus, PresentStatus, assignment_entity as assignments,
    participant_entity as participants, present_entity as presents,
};
use crate::error::{AppError, AppResult};
use crate::models::{
    OwnPresents, PresentDetail, PresentOverview, PresentResponse, PresentStats, normalize_text,
};
use crate::services::participant_service::load_profiles;

/// 礼物状态跟踪: NOT_SUBMITTED -> SUBMITTED -> DELIVERED
#[derive(Clone)]
pub struct PresentService {
    pool: DatabaseConnection,
}

impl PresentService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    /// 标记礼物已提交（按赠送者 participant id 定位）
    pub async fn mark_submitted(
        &self,
        giver_id: Uuid,
        description: Option<String>,
    ) -> AppResult<PresentResponse> {
        let txn = self.pool.begin().await?;
        let present = find_by_giver(&txn, giver_id).await?;
        if present.status != PresentStatus::NotSubmitted {
            return Err(AppError::ValidationError(
                "Present has already been submitted".into(),
            ));
        }

        let now = Utc::now();
        let mut update = presents::Entity::update_many()
            .col_expr(presents::Column::Status, Expr::value(PresentStatus::Submitted))
            .col_expr(presents::Column::SubmittedAt, Expr::value(now))
            .col_expr(presents::Column::UpdatedAt, Expr::value(now));
        if let Some(text) = description {
            update = update.col_expr(presents::Column::Description, Expr::value(normalize_text(Some(text))));
        }
        let res = update
            .filter(presents::Column::Id.eq(present.id))
            .filter(presents::Column::Status.eq(PresentStatus::NotSubmitted))
            .exec(&txn)
            .await?;
        if res.rows_affected == 0 {
            return Err(AppError::ValidationError(
                "Present has already been submitted".into(),
            ));
        }

        advance_participant(&txn, present.giver_id, ParticipantStatus::GiftSubmitted).await?;
        let updated = reload(&txn, present.id).await?;
        txn.commit().await?;

        log::info!("Present {} submitted by participant {giver_id}", updated.id);
        Ok(updated.into())
    }

    /// 标记礼物已送达；必须先提交。描述随同一次条件更新写入
    pub async fn mark_delivered(
        &self,
        giver_id: Uuid,
        description: Option<String>,
    ) -> AppResult<PresentResponse> {
        let txn = self.pool.begin().await?;
        let present = find_by_giver(&txn, giver_id).await?;
        if present.status != PresentStatus::Submitted {
            return Err(not_submitted());
        }

        let now = Utc::now();
        // delivered_at 不早于 submitted_at
        let delivered_at = present.submitted_at.map_or(now, |s| s.max(now));
        let mut update = presents::Entity::update_many()
            .col_expr(presents::Column::Status, Expr::value(PresentStatus::Delivered))
            .col_expr(presents::Column::DeliveredAt, Expr::value(delivered_at))
            .col_expr(presents::Column::UpdatedAt, Expr::value(now));
        if let Some(text) = description {
            update = update.col_expr(presents::Column::Description, Expr::value(normalize_text(Some(text))));
        }
        let res = update
            .filter(presents::Column::Id.eq(present.id))
            .filter(presents::Column::Status.eq(PresentStatus::Submitted))
            .exec(&txn)
            .await?;
        if res.rows_affected == 0 {
            return Err(not_submitted());
        }

        advance_participant(&txn, present.receiver_id, ParticipantStatus::GiftDelivered).await?;
        let updated = reload(&txn, present.id).await?;
        txn.commit().await?;

        log::info!("Present {} delivered to participant {}", updated.id, updated.receiver_id);
        Ok(updated.into())
    }

    /// 修改礼物描述，不影响状态
    pub async fn update_description(
        &self,
        present_id: Uuid,
        description: Option<String>,
    ) -> AppResult<PresentResponse> {
        let res = presents::Entity::update_many()
            .col_expr(presents::Column::Description, Expr::value(normalize_text(description)))
            .col_expr(presents::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(presents::Column::Id.eq(present_id))
            .exec(&self.pool)
            .await?;
        if res.rows_affected == 0 {
            return Err(AppError::NotFound("Present not found".into()));
        }
        Ok(reload(&self.pool, present_id).await?.into())
    }

    /// PATCH: 状态只能前进，描述可单独修改
    pub async fn patch(
        &self,
        present_id: Uuid,
        status: Option<PresentStatus>,
        description: Option<String>,
    ) -> AppResult<PresentResponse> {
        let present = reload(&self.pool, present_id).await?;

        match status {
            Some(PresentStatus::NotSubmitted) => Err(AppError::ValidationError(
                "Present status cannot be moved backwards".into(),
            )),
            Some(PresentStatus::Submitted) => {
                self.mark_submitted(present.giver_id, description).await
            }
            Some(PresentStatus::Delivered) => {
                self.mark_delivered(present.giver_id, description).await
            }
            None => match description {
                Some(text) => self.update_description(present_id, Some(text)).await,
                None => Err(AppError::ValidationError("No fields to update".into())),
            },
        }
    }

    /// 管理员: 活动全部礼物及统计
    pub async fn overview(&self, event_id: Uuid) -> AppResult<PresentOverview> {
        let members = participants::Entity::find()
            .filter(participants::Column::EventId.eq(event_id))
            .all(&self.pool)
            .await?;
        let assignment_ids: Vec<Uuid> = assignments::Entity::find()
            .filter(assignments::Column::EventId.eq(event_id))
            .all(&self.pool)
            .await?
            .into_iter()
            .map(|a| a.id)
            .collect();
        let rows = if assignment_ids.is_empty() {
            Vec::new()
        } else {
            presents::Entity::find()
                .filter(presents::Column::AssignmentId.is_in(assignment_ids))
                .order_by_asc(presents::Column::CreatedAt)
                .order_by_asc(presents::Column::Id)
                .all(&self.pool)
                .await?
        };

        let stats = present_stats(members.len() as u64, &rows);
        let profiles = load_profiles(&self.pool, &members).await?;

        let mut details = Vec::with_capacity(rows.len());
        for p in rows {
            let (Some(giver), Some(receiver)) = (
                profiles.get(&p.giver_id).cloned(),
                profiles.get(&p.receiver_id).cloned(),
            ) else {
                return Err(AppError::InternalError(format!(
                    "Present {} references a missing participant",
                    p.id
                )));
            };
            details.push(PresentDetail {
                present: p.into(),
                giver,
                receiver,
            });
        }

        Ok(PresentOverview {
            event_id,
            presents: details,
            stats,
        })
    }

    /// 普通用户: 自己的参与记录、送出的与收到的礼物
    pub async fn own(&self, user_id: Uuid, event_id: Uuid) -> AppResult<OwnPresents> {
        let me = participants::Entity::find()
            .filter(participants::Column::UserId.eq(user_id))
            .filter(participants::Column::EventId.eq(event_id))
            .one(&self.pool)
            .await?;

        let (present_given, present_received) = match &me {
            Some(p) => {
                let given = presents::Entity::find()
                    .filter(presents::Column::GiverId.eq(p.id))
                    .one(&self.pool)
                    .await?;
                let received = presents::Entity::find()
                    .filter(presents::Column::ReceiverId.eq(p.id))
                    .one(&self.pool)
                    .await?;
                (given, received)
            }
            None => (None, None),
        };

        Ok(OwnPresents {
            event_id,
            participant: me.map(Into::into),
            present_given: present_given.map(Into::into),
            present_received: present_received.map(Into::into),
        })
    }
}

/// 礼物统计；submitted_count 包含已送达
pub fn present_stats(total_participants: u64, rows: &[presents::Model]) -> PresentStats {
    let submitted_count = rows
        .iter()
        .filter(|p| matches!(p.status, PresentStatus::Submitted | PresentStatus::Delivered))
        .count() as u64;
    let delivered_count = rows
        .iter()
        .filter(|p| p.status == PresentStatus::Delivered)
        .count() as u64;
    PresentStats {
        total_participants,
        submitted_count,
        delivered_count,
        pending_count: rows.len() as u64 - submitted_count,
    }
}

async fn find_by_giver<C: ConnectionTrait>(conn: &C, giver_id: Uuid) -> AppResult<presents::Model> {
    presents::Entity::find()
        .filter(presents::Column::GiverId.eq(giver_id))
        .one(conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Present not found for participant".into()))
}

async fn reload<C: ConnectionTrait>(conn: &C, present_id: Uuid) -> AppResult<presents::Model> {
    presents::Entity::find_by_id(present_id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Present not found".into()))
}

/// 参与者状态只前进: 仅当当前状态位于目标之前时更新
async fn advance_participant<C: ConnectionTrait>(
    conn: &C,
    participant_id: Uuid,
    target: ParticipantStatus,
) -> AppResult<()> {
    participants::Entity::update_many()
        .col_expr(participants::Column::Status, Expr::value(target))
        .col_expr(participants::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(participants::Column::Id.eq(participant_id))
        .filter(participants::Column::Status.is_in(target.predecessors()))
        .exec(conn)
        .await?;
    Ok(())
}

fn not_submitted() -> AppError {
    AppError::ValidationError(
        "Present must be submitted before it can be marked as delivered".into(),
    )
}
