//! `SeaORM` Entity for provisioning_request table
//!
//! Lifecycle marks per data revision. `finalized_at` NULL encodes a
//! provisioning request still pending.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "provisioning_request")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub data_id: String,
    pub configuration_id: String,
    pub provisioned_at: DateTimeUtc,
    pub finalized_at: Option<DateTimeUtc>,
    #[sea_orm(column_type = "JsonBinary")]
    pub tasks: Json,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::configuration_data::Entity",
        from = "Column::DataId",
        to = "super::configuration_data::Column::DataId"
    )]
    ConfigurationData,
}

impl Related<super::configuration_data::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ConfigurationData.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
