use std::collections::HashMap;

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use crate::entities::{class_entity as classes, participant_entity as participants};
use crate::error::{AppError, AppResult, is_unique_violation};
use crate::models::{ClassResponse, PaginatedResponse, PaginationParams};

#[derive(Clone)]
pub struct ClassService {
    pool: DatabaseConnection,
}

impl ClassService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    /// 班级列表（分页，按创建时间倒序，附带报名人数）
    pub async fn list(&self, params: &PaginationParams) -> AppResult<PaginatedResponse<ClassResponse>> {
        let base_query = classes::Entity::find();
        let total = base_query.clone().count(&self.pool).await?;

        let items = base_query
            .order_by_desc(classes::Column::CreatedAt)
            .order_by_asc(classes::Column::Id)
            .limit(params.get_limit())
            .offset(params.get_offset())
            .all(&self.pool)
            .await?;

        let ids: Vec<Uuid> = items.iter().map(|c| c.id).collect();
        let counts = self.participant_counts(&ids).await?;

        let results = items
            .into_iter()
            .map(|c| {
                let count = counts.get(&c.id).copied().unwrap_or(0);
                ClassResponse::new(c, count)
            })
            .collect();

        Ok(PaginatedResponse::new(results, params, total))
    }

    /// 创建班级，名称去除首尾空白后必须非空且唯一
    pub async fn create(&self, name: Option<String>) -> AppResult<ClassResponse> {
        let name = name.map(|n| n.trim().to_string()).unwrap_or_default();
        if name.is_empty() {
            return Err(AppError::ValidationError("Class name is required".into()));
        }

        let exists = classes::Entity::find()
            .filter(classes::Column::Name.eq(name.as_str()))
            .count(&self.pool)
            .await?
            > 0;
        if exists {
            return Err(AppError::Conflict("Class already exists".into()));
        }

        let now = Utc::now();
        let inserted = classes::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.pool)
        .await;

        match inserted {
            Ok(class) => Ok(ClassResponse::new(class, 0)),
            Err(e) if is_unique_violation(&e) => {
                Err(AppError::Conflict("Class already exists".into()))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn find(&self, class_id: Uuid) -> AppResult<Option<classes::Model>> {
        Ok(classes::Entity::find_by_id(class_id).one(&self.pool).await?)
    }

    async fn participant_counts(&self, class_ids: &[Uuid]) -> AppResult<HashMap<Uuid, u64>> {
        if class_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows: Vec<(Option<Uuid>, i64)> = participants::Entity::find()
            .select_only()
            .column(participants::Column::ClassId)
            .column_as(Expr::col(participants::Column::Id).count(), "count")
            .filter(participants::Column::ClassId.is_in(class_ids.iter().copied()))
            .group_by(participants::Column::ClassId)
            .into_tuple()
            .all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(id, count)| id.map(|id| (id, count.max(0) as u64)))
            .collect())
    }
}
