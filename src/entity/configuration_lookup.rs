//! `SeaORM` Entity for configuration_lookup table

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "configuration_lookup")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub configuration_id: String,
    pub lookup_id: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::lookup_registry::Entity",
        from = "Column::LookupId",
        to = "super::lookup_registry::Column::LookupId"
    )]
    LookupRegistry,
    #[sea_orm(has_many = "super::configuration_data::Entity")]
    ConfigurationData,
}

impl Related<super::lookup_registry::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LookupRegistry.def()
    }
}

impl Related<super::configuration_data::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ConfigurationData.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
