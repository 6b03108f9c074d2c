use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Member self-registration. Approved rows double as the credential record
/// checked at member login; there is no separate member table.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "user_registration_requests")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub username: String,
    pub mobile_number: String,
    pub panchayath_id: Uuid,
    pub status: Status,
    pub approved_by: Option<String>,
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
}

impl Related<super::panchayath::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Panchayath.def()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveActiveEnum, Eq, PartialEq, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "approved")]
    Approved,
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

impl ActiveModelBehavior for ActiveModel {}
