//! `SeaORM` Entity for lookup_registry table

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "lookup_registry")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub lookup_id: String,
    pub host_id: i64,
    pub metric: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::configuration_lookup::Entity")]
    ConfigurationLookup,
}

impl Related<super::configuration_lookup::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ConfigurationLookup.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
