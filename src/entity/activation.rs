//! `SeaORM` Entity for activation table

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "activation")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub configuration_id: String,
    pub activated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::configuration_lookup::Entity",
        from = "Column::ConfigurationId",
        to = "super::configuration_lookup::Column::ConfigurationId"
    )]
    ConfigurationLookup,
}

impl Related<super::configuration_lookup::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ConfigurationLookup.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
