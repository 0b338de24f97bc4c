//! SeaORM Entity for users table
//!
//! Carries the per-user moderation profile: trust score, violation counter
//! and ban state. Only the trust module may mutate the moderation columns.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub email: Option<String>,
    /// "member", "moderator" or "admin"
    pub role: String,
    /// Bounded 0..=100. New accounts start at 70.
    pub trust_score: i32,
    pub violations: i32,
    pub report_count: i32,
    pub is_banned: bool,
    pub banned_reason: Option<String>,
    /// NULL while is_banned is set means a permanent ban.
    pub banned_until: Option<DateTime>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::posts::Entity")]
    Posts,
    #[sea_orm(has_many = "super::comments::Entity")]
    Comments,
    #[sea_orm(has_many = "super::sessions::Entity")]
    Sessions,
}

impl Related<super::posts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Posts.def()
    }
}

impl Related<super::sessions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sessions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
