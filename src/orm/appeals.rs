//! SeaORM Entity for appeals table
//!
//! The target kind is written once at filing time and is the only thing
//! resolution dispatches on. Appeals resolve exactly once.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "appeals")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// "post", "comment" or "account"
    pub target_kind: String,
    pub target_id: i32,
    pub appellant_id: i32,
    #[sea_orm(column_type = "Text")]
    pub reason: String,
    /// "open", "approved" or "rejected"
    pub status: String,
    pub resolution_notes: Option<String>,
    pub resolved_by: Option<i32>,
    pub resolved_at: Option<DateTime>,
    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::AppellantId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Appellant,
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::ResolvedBy",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "SetNull"
    )]
    Resolver,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Appellant.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
