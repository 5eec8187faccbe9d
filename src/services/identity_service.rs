use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use crate::config::AdminConfig;
use crate::entities::{UserRole, user_entity as users};
use crate::error::{AppError, AppResult};
use crate::models::{ExternalIdentity, PaginatedResponse, PaginationParams, UserResponse};

const SYNC_ATTEMPTS: usize = 3;

/// 外部身份与本地用户的同步
#[derive(Clone)]
pub struct IdentityService {
    pool: DatabaseConnection,
    admin: AdminConfig,
}

impl IdentityService {
    pub fn new(pool: DatabaseConnection, admin: AdminConfig) -> Self {
        Self { pool, admin }
    }

    /// 同步外部身份到本地用户（每个鉴权请求都会调用）
    ///
    /// 1. 按 external_id 查找并刷新资料
    /// 2. 否则按 email 查找并绑定 external_id
    /// 3. 否则新建用户
    ///
    /// 并发创建导致唯一约束冲突时整体重试，最多 3 次
    pub async fn sync(&self, identity: &ExternalIdentity) -> AppResult<users::Model> {
        if identity.email.trim().is_empty() {
            return Err(AppError::AuthError("Identity has no email address".into()));
        }

        for attempt in 1..=SYNC_ATTEMPTS {
            match self.try_sync(identity).await {
                Ok(user) => return Ok(user),
                Err(e) if e.is_unique_violation() => {
                    log::warn!(
                        "User sync for {} hit a unique constraint (attempt {attempt}/{SYNC_ATTEMPTS})",
                        identity.external_id
                    );
                }
                Err(e) => return Err(e),
            }
        }

        Err(AppError::Conflict(
            "User synchronization conflicted, please retry".into(),
        ))
    }

    async fn try_sync(&self, identity: &ExternalIdentity) -> AppResult<users::Model> {
        let now = Utc::now();

        if let Some(user) = users::Entity::find()
            .filter(users::Column::ExternalId.eq(identity.external_id.as_str()))
            .one(&self.pool)
            .await?
        {
            let role = self.resolve_role(user.role, &identity.email);
            let mut am = user.into_active_model();
            am.email = Set(identity.email.clone());
            am.first_name = Set(identity.first_name.clone());
            am.last_name = Set(identity.last_name.clone());
            am.image_url = Set(identity.image_url.clone());
            am.role = Set(role);
            am.updated_at = Set(now);
            return Ok(am.update(&self.pool).await?);
        }

        // 邮箱已存在但 external_id 不同: 绑定到新的外部身份
        if let Some(user) = users::Entity::find()
            .filter(users::Column::Email.eq(identity.email.as_str()))
            .one(&self.pool)
            .await?
        {
            log::info!(
                "Attaching external id {} to existing user {}",
                identity.external_id,
                user.id
            );
            let role = self.resolve_role(user.role, &identity.email);
            let mut am = user.into_active_model();
            am.external_id = Set(identity.external_id.clone());
            am.first_name = Set(identity.first_name.clone());
            am.last_name = Set(identity.last_name.clone());
            am.image_url = Set(identity.image_url.clone());
            am.role = Set(role);
            am.updated_at = Set(now);
            return Ok(am.update(&self.pool).await?);
        }

        let user = users::ActiveModel {
            id: Set(Uuid::new_v4()),
            external_id: Set(identity.external_id.clone()),
            email: Set(identity.email.clone()),
            first_name: Set(identity.first_name.clone()),
            last_name: Set(identity.last_name.clone()),
            image_url: Set(identity.image_url.clone()),
            role: Set(self.resolve_role(UserRole::User, &identity.email)),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.pool)
        .await?;

        log::info!("Created user {} for external id {}", user.id, user.external_id);
        Ok(user)
    }

    /// 配置中的管理员邮箱提升为 ADMIN；不会自动降级
    fn resolve_role(&self, current: UserRole, email: &str) -> UserRole {
        if self.admin.is_admin_email(email) {
            UserRole::Admin
        } else {
            current
        }
    }

    pub async fn get_user(&self, user_id: Uuid) -> AppResult<users::Model> {
        users::Entity::find_by_id(user_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".into()))
    }

    /// 用户列表（管理员，分页，按注册时间倒序）
    pub async fn list_users(
        &self,
        params: &PaginationParams,
    ) -> AppResult<PaginatedResponse<UserResponse>> {
        let base_query = users::Entity::find();
        let total = base_query.clone().count(&self.pool).await?;

        let items = base_query
            .order_by_desc(users::Column::CreatedAt)
            .order_by_asc(users::Column::Id)
            .limit(params.get_limit())
            .offset(params.get_offset())
            .all(&self.pool)
            .await?;

        Ok(PaginatedResponse::new(
            items.into_iter().map(Into::into).collect(),
            params,
            total,
        ))
    }
}
