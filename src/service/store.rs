//! Configuration store primitives
//!
//! Composable statements used by the write state machine, each callable
//! inside an ambient transaction. Every write primitive hands back the
//! rows-affected count so the caller can enforce its row-count contract
//! via [`expect_rows`]; a count outside the expected set aborts the
//! surrounding transaction with `InvariantViolation`.

use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, EntityTrait, QueryFilter, QuerySelect, Set,
};

use crate::entity::{
    activation, configuration_data, configuration_lookup, lookup_registry, provisioning_request,
};
use crate::error::EyeError;
use crate::model::configuration::Task;

/// Enforce the row-count contract of a store statement.
pub fn expect_rows(statement: &str, affected: u64, expected: &[u64]) -> Result<(), EyeError> {
    if expected.contains(&affected) {
        return Ok(());
    }
    Err(EyeError::InvariantViolation {
        statement: statement.to_string(),
        affected,
    })
}

/// Idempotent registration of a content-derived lookup hash.
pub async fn register_lookup_hash<C: ConnectionTrait>(
    db: &C,
    hash: &str,
    host_id: u64,
    metric: &str,
) -> Result<u64, EyeError> {
    let row = lookup_registry::ActiveModel {
        lookup_id: Set(hash.to_string()),
        host_id: Set(host_id as i64),
        metric: Set(metric.to_string()),
    };
    let affected = lookup_registry::Entity::insert(row)
        .on_conflict(
            OnConflict::column(lookup_registry::Column::LookupId)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;
    Ok(affected)
}

/// Idempotent binding of a configuration id to its lookup hash.
pub async fn bind_configuration<C: ConnectionTrait>(
    db: &C,
    configuration_id: &str,
    hash: &str,
) -> Result<u64, EyeError> {
    let row = configuration_lookup::ActiveModel {
        configuration_id: Set(configuration_id.to_string()),
        lookup_id: Set(hash.to_string()),
    };
    let affected = configuration_lookup::Entity::insert(row)
        .on_conflict(
            OnConflict::column(configuration_lookup::Column::ConfigurationId)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;
    Ok(affected)
}

/// Select the configuration's open revision with a row-level write lock.
/// `None` is the non-error "first revision" branch.
pub async fn select_open_validity<C: ConnectionTrait>(
    db: &C,
    configuration_id: &str,
) -> Result<Option<(String, DateTime<Utc>)>, EyeError> {
    let found = configuration_data::Entity::find()
        .filter(configuration_data::Column::ConfigurationId.eq(configuration_id))
        .filter(configuration_data::Column::ValidUntil.is_null())
        .lock_exclusive()
        .one(db)
        .await?;
    Ok(found.map(|row| (row.data_id, row.valid_from)))
}

/// Close a revision's validity interval at `new_valid_until`.
pub async fn close_validity<C: ConnectionTrait>(
    db: &C,
    data_id: &str,
    valid_from: DateTime<Utc>,
    new_valid_until: DateTime<Utc>,
) -> Result<u64, EyeError> {
    let res = configuration_data::Entity::update_many()
        .col_expr(
            configuration_data::Column::ValidUntil,
            Expr::value(new_valid_until),
        )
        .filter(configuration_data::Column::DataId.eq(data_id))
        .filter(configuration_data::Column::ValidFrom.eq(valid_from))
        .exec(db)
        .await?;
    Ok(res.rows_affected)
}

/// Open a new revision, valid from `valid_from` to +infinity.
pub async fn insert_data<C: ConnectionTrait>(
    db: &C,
    data_id: &str,
    configuration_id: &str,
    lookup_id: &str,
    valid_from: DateTime<Utc>,
    payload: serde_json::Value,
) -> Result<u64, EyeError> {
    let row = configuration_data::ActiveModel {
        data_id: Set(data_id.to_string()),
        configuration_id: Set(configuration_id.to_string()),
        lookup_id: Set(lookup_id.to_string()),
        valid_from: Set(valid_from),
        valid_until: Set(None),
        payload: Set(payload),
    };
    let affected = configuration_data::Entity::insert(row)
        .exec_without_returning(db)
        .await?;
    Ok(affected)
}

/// Record the provisioning request attached to a fresh revision.
pub async fn insert_provisioning<C: ConnectionTrait>(
    db: &C,
    data_id: &str,
    configuration_id: &str,
    provisioned_at: DateTime<Utc>,
    tasks: &[Task],
) -> Result<u64, EyeError> {
    let row = provisioning_request::ActiveModel {
        data_id: Set(data_id.to_string()),
        configuration_id: Set(configuration_id.to_string()),
        provisioned_at: Set(provisioned_at),
        finalized_at: Set(None),
        tasks: Set(serde_json::to_value(tasks)?),
    };
    let affected = provisioning_request::Entity::insert(row)
        .exec_without_returning(db)
        .await?;
    Ok(affected)
}

/// Move a provisioning request into the finalized state, recording the
/// updated task sequence.
pub async fn finalize_provisioning<C: ConnectionTrait>(
    db: &C,
    data_id: &str,
    finalized_at: DateTime<Utc>,
    tasks: &[Task],
) -> Result<u64, EyeError> {
    let res = provisioning_request::Entity::update_many()
        .col_expr(
            provisioning_request::Column::FinalizedAt,
            Expr::value(finalized_at),
        )
        .col_expr(
            provisioning_request::Column::Tasks,
            Expr::value(serde_json::to_value(tasks)?),
        )
        .filter(provisioning_request::Column::DataId.eq(data_id))
        .exec(db)
        .await?;
    Ok(res.rows_affected)
}

/// Load the revision valid at `at` together with its provisioning
/// record, write-locked. `None` means there is nothing to deprovision.
pub async fn load_active<C: ConnectionTrait>(
    db: &C,
    configuration_id: &str,
    at: DateTime<Utc>,
) -> Result<Option<(configuration_data::Model, provisioning_request::Model)>, EyeError> {
    let data = configuration_data::Entity::find()
        .filter(configuration_data::Column::ConfigurationId.eq(configuration_id))
        .filter(configuration_data::Column::ValidFrom.lte(at))
        .filter(
            Condition::any()
                .add(configuration_data::Column::ValidUntil.is_null())
                .add(configuration_data::Column::ValidUntil.gt(at)),
        )
        .lock_exclusive()
        .one(db)
        .await?;
    let data = match data {
        Some(row) => row,
        None => return Ok(None),
    };

    match provisioning_request::Entity::find_by_id(data.data_id.clone())
        .one(db)
        .await?
    {
        Some(prov) => Ok(Some((data, prov))),
        None => Err(EyeError::ServerError(format!(
            "provisioning record missing for data {}",
            data.data_id
        ))),
    }
}

/// In-place rewrite of the open revision: payload and lookup linkage.
pub async fn update_configuration<C: ConnectionTrait>(
    db: &C,
    configuration_id: &str,
    hash: &str,
    payload: serde_json::Value,
) -> Result<u64, EyeError> {
    let res = configuration_data::Entity::update_many()
        .col_expr(configuration_data::Column::LookupId, Expr::value(hash))
        .col_expr(configuration_data::Column::Payload, Expr::value(payload))
        .filter(configuration_data::Column::ConfigurationId.eq(configuration_id))
        .filter(configuration_data::Column::ValidUntil.is_null())
        .exec(db)
        .await?;
    Ok(res.rows_affected)
}

/// Query whether and when a configuration was activated.
pub async fn get_activation<C: ConnectionTrait>(
    db: &C,
    configuration_id: &str,
) -> Result<Option<DateTime<Utc>>, EyeError> {
    let found = activation::Entity::find_by_id(configuration_id.to_string())
        .one(db)
        .await?;
    Ok(found.map(|row| row.activated_at))
}

/// Flip the activation toggle. 0 rows means it was already set.
pub async fn set_activation<C: ConnectionTrait>(
    db: &C,
    configuration_id: &str,
    at: DateTime<Utc>,
) -> Result<u64, EyeError> {
    let row = activation::ActiveModel {
        configuration_id: Set(configuration_id.to_string()),
        activated_at: Set(at),
    };
    let affected = activation::Entity::insert(row)
        .on_conflict(
            OnConflict::column(activation::Column::ConfigurationId)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;
    Ok(affected)
}

/// Drop the activation toggle. 0 rows is valid: resetting an inactive
/// configuration is not an error.
pub async fn clear_activation<C: ConnectionTrait>(
    db: &C,
    configuration_id: &str,
) -> Result<u64, EyeError> {
    let res = activation::Entity::delete_many()
        .filter(activation::Column::ConfigurationId.eq(configuration_id))
        .exec(db)
        .await?;
    Ok(res.rows_affected)
}
