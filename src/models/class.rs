use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::class_entity as classes;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateClassRequest {
    #[schema(example = "7b")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ClassResponse {
    pub id: Uuid,
    pub name: String,
    pub participant_count: u64,
    pub created_at: DateTime<Utc>,
}

impl ClassResponse {
    pub fn new(class: classes::Model, participant_count: u64) -> Self {
        Self {
            id: class.id,
            name: class.name,
            participant_count,
            created_at: class.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ClassSummary {
    pub id: Uuid,
    pub name: String,
}

impl From<&classes::Model> for ClassSummary {
    fn from(class: &classes::Model) -> Self {
        Self {
            id: class.id,
            name: class.name.clone(),
        }
    }
}
