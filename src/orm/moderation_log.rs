//! SeaORM Entity for moderation_log table
//!
//! Append-only. Rows are never updated or deleted; the review detail view
//! and the stats endpoint read from here.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "moderation_log")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Author of the content, or the user acted upon.
    pub user_id: i32,
    /// NULL for automatic (gate) decisions.
    pub moderator_id: Option<i32>,
    pub content_kind: String,
    pub content_id: i32,
    pub action: String,
    #[sea_orm(column_type = "Text")]
    pub reason: String,
    pub notes: Option<String>,
    pub trust_score_change: Option<i32>,
    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Subject,
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::ModeratorId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "SetNull"
    )]
    Moderator,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Subject.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
