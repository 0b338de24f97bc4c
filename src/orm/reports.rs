//! SeaORM Entity for reports table

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "reports")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub reporter_id: i32,
    /// "post", "comment" or "user"
    pub content_kind: String,
    pub content_id: i32,
    /// Owner of the reported content, or the reported user themselves.
    pub reported_user_id: i32,
    pub reason: String,
    pub description: Option<String>,
    /// 1..=5, higher is more urgent.
    pub priority: i32,
    /// "pending", "reviewing", "resolved" or "dismissed"
    pub status: String,
    pub reviewer_id: Option<i32>,
    pub review_note: Option<String>,
    pub resolved_at: Option<chrono::NaiveDateTime>,
    pub created_at: chrono::NaiveDateTime,
    pub updated_at: chrono::NaiveDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::ReporterId",
        to = "super::users::Column::Id"
    )]
    Reporter,
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::ReportedUserId",
        to = "super::users::Column::Id"
    )]
    ReportedUser,
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::ReviewerId",
        to = "super::users::Column::Id"
    )]
    Reviewer,
}

impl ActiveModelBehavior for ActiveModel {}
