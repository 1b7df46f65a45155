//! Review entity.

use sea_orm::{ActiveValue, ConnectionTrait, entity::prelude::*};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "review")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Reviewed place ID
    #[sea_orm(indexed)]
    pub place_id: String,

    /// Author user ID; unique together with `place_id`
    #[sea_orm(indexed)]
    pub user_id: String,

    /// Star rating (1-5)
    pub rating: i16,

    #[sea_orm(nullable)]
    pub title: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub comment: Option<String>,

    /// IDs of users who found this review helpful
    #[sea_orm(column_type = "JsonBinary")]
    pub helpful_users: Json,

    /// Always `helpful_users.len()`; maintained in `before_save`
    #[sea_orm(default_value = 0)]
    pub helpful_count: i32,

    #[sea_orm(default_value = true)]
    pub is_active: bool,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

impl Model {
    /// Users who marked this review helpful.
    #[must_use]
    pub fn helpful_user_ids(&self) -> Vec<String> {
        helpful_set(&self.helpful_users)
    }
}

/// Distinct user IDs from a JSON array, in first-seen order.
fn helpful_set(users: &Json) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();
    if let Some(items) = users.as_array() {
        for id in items.iter().filter_map(Json::as_str) {
            if !ids.iter().any(|existing| existing == id) {
                ids.push(id.to_string());
            }
        }
    }
    ids
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::place::Entity",
        from = "Column::PlaceId",
        to = "super::place::Column::Id",
        on_delete = "Cascade"
    )]
    Place,
}

impl Related<super::place::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Place.def()
    }
}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    /// Normalize the helpful set and derive its count before every write.
    async fn before_save<C>(mut self, _db: &C, _insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        if let ActiveValue::Set(users) | ActiveValue::Unchanged(users) = &self.helpful_users {
            let ids = helpful_set(users);
            let count = ids.len() as i32;
            self.helpful_users = ActiveValue::Set(Json::from(ids));
            self.helpful_count = ActiveValue::Set(count);
        }
        Ok(self)
    }
}
