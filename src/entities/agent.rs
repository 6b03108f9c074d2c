use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "agents")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    #[sea_orm(unique)]
    pub phone: String,
    pub role: Role,
    pub panchayath_id: Uuid,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::panchayath::Entity",
        from = "Column::PanchayathId",
        to = "super::panchayath::Column::Id",
        on_delete = "Restrict"
    )]
    Panchayath,
    #[sea_orm(has_many = "super::daily_activity::Entity")]
    DailyActivity,
    #[sea_orm(has_many = "super::management_team_member::Entity")]
    TeamMembership,
}

impl Related<super::panchayath::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Panchayath.def()
    }
}

impl Related<super::daily_activity::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DailyActivity.def()
    }
}

impl Related<super::management_team_member::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TeamMembership.def()
    }
}

/// Role determines the per-activity point weight, see `ops::points`.
#[derive(
    Copy, Clone, Debug, EnumIter, DeriveActiveEnum, Eq, PartialEq, Hash, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    #[sea_orm(string_value = "coordinator")]
    Coordinator,
    #[sea_orm(string_value = "supervisor")]
    Supervisor,
    #[sea_orm(string_value = "group-leader")]
    GroupLeader,
    #[sea_orm(string_value = "pro")]
    Pro,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Coordinator => "coordinator",
            Role::Supervisor => "supervisor",
            Role::GroupLeader => "group-leader",
            Role::Pro => "pro",
        }
    }
}

impl ActiveModelBehavior for ActiveModel {}
