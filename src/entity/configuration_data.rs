//! `SeaORM` Entity for configuration_data table
//!
//! One row per configuration revision. `valid_until` NULL encodes an
//! open (+infinity) validity interval; the schema carries an exclusion
//! constraint keeping intervals of one configuration non-overlapping.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "configuration_data")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub data_id: String,
    pub configuration_id: String,
    pub lookup_id: String,
    pub valid_from: DateTimeUtc,
    pub valid_until: Option<DateTimeUtc>,
    #[sea_orm(column_type = "JsonBinary")]
    pub payload: Json,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::configuration_lookup::Entity",
        from = "Column::ConfigurationId",
        to = "super::configuration_lookup::Column::ConfigurationId"
    )]
    ConfigurationLookup,
    #[sea_orm(has_one = "super::provisioning_request::Entity")]
    ProvisioningRequest,
}

impl Related<super::configuration_lookup::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ConfigurationLookup.def()
    }
}

impl Related<super::provisioning_request::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProvisioningRequest.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
