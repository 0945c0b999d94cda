//! Write state machine for configuration lifecycle requests
//!
//! A single worker drains the bounded request queue serially and holds at
//! most one open database transaction at a time. This is the
//! serialization point for the validity-interval invariant: every new
//! revision closes the prior open interval at the same transaction
//! instant it opens its own. Every request produces exactly one result
//! on its reply sink, failure included.

use chrono::{DateTime, Duration, Utc};
use sea_orm::{DatabaseConnection, TransactionTrait};
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};
use uuid::Uuid;

use crate::core::msg::{self, Action};
use crate::error::EyeError;
use crate::model::common::DEPROVISION_GRACE_MINUTES;
use crate::model::configuration::{Configuration, MetaInformation, Task};
use crate::model::validity::{Activation, Provision, Validity};
use crate::service::store::{self, expect_rows};

pub struct ConfigurationWrite {
    input: mpsc::Receiver<msg::Request>,
    shutdown: watch::Receiver<bool>,
    db: DatabaseConnection,
}

impl ConfigurationWrite {
    pub fn new(
        input: mpsc::Receiver<msg::Request>,
        shutdown: watch::Receiver<bool>,
        db: DatabaseConnection,
    ) -> Self {
        ConfigurationWrite {
            input,
            shutdown,
            db,
        }
    }

    /// Drain the input queue until shutdown is signalled. An in-flight
    /// request always completes before the shutdown signal is observed.
    pub async fn run(mut self) {
        info!("configuration write handler started");
        loop {
            tokio::select! {
                _ = self.shutdown.changed() => break,
                maybe = self.input.recv() => match maybe {
                    Some(request) => self.process(request).await,
                    None => break,
                },
            }
        }
        info!("configuration write handler stopped");
    }

    async fn process(&self, mut q: msg::Request) {
        let reply = q.reply.take();
        let mut result = msg::Result::from_request(&q);

        match q.action {
            Action::Add => self.add(&mut q, &mut result).await,
            Action::Remove => self.remove(&q, &mut result).await,
            Action::Update => self.update(&q, &mut result).await,
            Action::Activate => self.activate(&q, &mut result).await,
            Action::Nop => result.ok(),
            _ => result.unknown_request(&q),
        }

        if result.has_failed() {
            warn!(
                "request {} {} on {} failed: status={} error={:?}",
                q.action, q.configuration.id, q.section, result.code, result.error
            );
        } else {
            info!(
                "request {} {} on {} completed: status={}",
                q.action, q.configuration.id, q.section, result.code
            );
        }

        if let Some(tx) = reply {
            if tx.send(result).is_err() {
                warn!("reply sink for request {} already dropped", q.id);
            }
        }
    }

    /// Insert a configuration profile as a fresh data revision.
    async fn add(&self, q: &mut msg::Request, mr: &mut msg::Result) {
        let rollout_ts = Utc::now();
        let data_id = Uuid::new_v4().to_string();

        // fully populate the configuration before it is serialized into
        // the payload blob; the metadata is rebuilt after commit
        q.configuration.lookup_id = q.lookup_hash.clone();
        q.configuration.activated_at = Activation::Unknown;
        let mut data = match q.configuration.data.first().cloned() {
            Some(data) => data,
            None => {
                mr.bad_request(EyeError::MalformedInput(
                    "configuration carries no data".to_string(),
                ));
                return;
            }
        };
        data.id = data_id.clone();
        data.info = None;
        q.configuration.data = vec![data.clone()];

        match self.add_tx(q, &data_id, rollout_ts).await {
            Ok(()) => {
                data.info = Some(MetaInformation {
                    valid_from: Validity::At(rollout_ts),
                    valid_until: Validity::Infinity,
                    provisioned_at: Provision::At(rollout_ts),
                    deprovisioned_at: Provision::Never,
                    tasks: vec![Task::Rollout],
                });
                q.configuration.data = vec![data];
                mr.configurations.push(q.configuration.clone());
                mr.ok();
            }
            Err(err) => mr.absorb(&err),
        }
    }

    async fn add_tx(
        &self,
        q: &mut msg::Request,
        data_id: &str,
        rollout_ts: DateTime<Utc>,
    ) -> Result<(), EyeError> {
        let payload = serde_json::to_value(&q.configuration)?;
        let txn = self.db.begin().await?;

        let res = store::register_lookup_hash(
            &txn,
            &q.lookup_hash,
            q.configuration.host_id,
            &q.configuration.metric,
        )
        .await?;
        expect_rows("lookup registration", res, &[0, 1])?;

        let res = store::bind_configuration(&txn, &q.configuration.id, &q.lookup_hash).await?;
        expect_rows("configuration binding", res, &[0, 1])?;

        // the exclusion constraint backstops overlapping validity ranges
        if let Some((previous_data_id, previous_valid_from)) =
            store::select_open_validity(&txn, &q.configuration.id).await?
        {
            let res =
                store::close_validity(&txn, &previous_data_id, previous_valid_from, rollout_ts)
                    .await?;
            expect_rows("validity update", res, &[1])?;
        }

        let res = store::insert_data(
            &txn,
            data_id,
            &q.configuration.id,
            &q.lookup_hash,
            rollout_ts,
            payload,
        )
        .await?;
        expect_rows("data insert", res, &[1])?;

        let res = store::insert_provisioning(
            &txn,
            data_id,
            &q.configuration.id,
            rollout_ts,
            &[Task::Rollout],
        )
        .await?;
        expect_rows("provisioning insert", res, &[1])?;

        q.configuration.activated_at = match store::get_activation(&txn, &q.configuration.id)
            .await?
        {
            Some(at) => Activation::At(at),
            None => Activation::Never,
        };

        txn.commit().await?;
        Ok(())
    }

    /// Deprovision or delete the currently active revision.
    async fn remove(&self, q: &msg::Request, mr: &mut msg::Result) {
        match self.remove_tx(q).await {
            Ok(Some(configuration)) => {
                mr.configurations.push(configuration);
                mr.ok();
            }
            Ok(None) => mr.ok(),
            Err(err) => mr.absorb(&err),
        }
    }

    async fn remove_tx(&self, q: &msg::Request) -> Result<Option<Configuration>, EyeError> {
        let now = Utc::now();
        let txn = self.db.begin().await?;

        // the active revision is loaded even when about to be deleted:
        // the alarm clearing event needs its metadata
        let (data_row, prov_row) =
            match store::load_active(&txn, &q.configuration.id, now).await? {
                Some(rows) => rows,
                None => {
                    // that which does not exist can not be deleted
                    txn.commit().await?;
                    return Ok(None);
                }
            };

        let mut configuration: Configuration = serde_json::from_value(data_row.payload.clone())?;
        let mut tasks: Vec<Task> = serde_json::from_value(prov_row.tasks.clone())?;

        let (task, valid_until, transaction_ts) = removal_schedule(
            now,
            q.configuration_task == Some(Task::Delete),
            q.flags.alarm_clearing,
            data_row.valid_until,
            prov_row.finalized_at,
        );
        tasks.push(task);

        let res =
            store::close_validity(&txn, &data_row.data_id, data_row.valid_from, valid_until)
                .await?;
        expect_rows("validity update", res, &[1])?;

        let res =
            store::finalize_provisioning(&txn, &data_row.data_id, transaction_ts, &tasks).await?;
        expect_rows("provisioning finalize", res, &[1])?;

        if q.flags.reset_activation {
            let res = store::clear_activation(&txn, &q.configuration.id).await?;
            // 0: activation reset on inactive configurations is valid
            expect_rows("activation reset", res, &[0, 1])?;
        }

        txn.commit().await?;

        let mut data = match configuration.data.first().cloned() {
            Some(data) => data,
            None => {
                return Err(EyeError::ServerError(format!(
                    "stored payload for data {} carries no data entry",
                    data_row.data_id
                )))
            }
        };
        data.id = data_row.data_id.clone();
        data.info = Some(MetaInformation {
            valid_from: Validity::At(data_row.valid_from),
            valid_until: Validity::At(valid_until),
            provisioned_at: Provision::At(prov_row.provisioned_at),
            deprovisioned_at: Provision::At(transaction_ts),
            tasks,
        });
        configuration.data = vec![data];
        Ok(Some(configuration))
    }

    /// Replace a configuration in place, without opening a new revision.
    async fn update(&self, q: &msg::Request, mr: &mut msg::Result) {
        match self.update_tx(q).await {
            Ok(()) => mr.ok(),
            Err(err) => mr.absorb(&err),
        }
    }

    async fn update_tx(&self, q: &msg::Request) -> Result<(), EyeError> {
        let payload = serde_json::to_value(&q.configuration)?;
        let txn = self.db.begin().await?;

        let res =
            store::update_configuration(&txn, &q.configuration.id, &q.lookup_hash, payload)
                .await?;
        expect_rows("update statement", res, &[1])?;

        txn.commit().await?;
        Ok(())
    }

    /// Record a configuration activation. Runs outside a transaction.
    async fn activate(&self, q: &msg::Request, mr: &mut msg::Result) {
        match store::set_activation(&self.db, &q.configuration.id, Utc::now()).await {
            // 1: newly activated, the caller learns by receiving the payload
            Ok(1) => {
                mr.configurations.push(q.configuration.clone());
                mr.ok();
            }
            // 0: already active
            Ok(0) => mr.ok(),
            Ok(affected) => mr.absorb(&EyeError::InvariantViolation {
                statement: "activation set".to_string(),
                affected,
            }),
            Err(err) => mr.absorb(&err),
        }
    }
}

/// Resolve the task, validity deadline and transaction instant of a
/// removal against the state of the loaded revision.
fn removal_schedule(
    now: DateTime<Utc>,
    delete: bool,
    alarm_clearing: bool,
    existing_valid_until: Option<DateTime<Utc>>,
    existing_finalized_at: Option<DateTime<Utc>>,
) -> (Task, DateTime<Utc>, DateTime<Utc>) {
    // deprovision requests keep a grace window so downstream agents can
    // push replacement configuration data
    let mut task = Task::Deprovision;
    let mut valid_until = now + Duration::minutes(DEPROVISION_GRACE_MINUTES);

    // final deletions are granted no grace period
    if delete {
        task = Task::Delete;
        valid_until = now;
    }

    // record that this request had the clearing flag set
    if task == Task::Deprovision && alarm_clearing {
        task = Task::Clearing;
    }

    // a revision that is already expiring keeps its earlier deadline
    if let Some(existing) = existing_valid_until {
        valid_until = existing;
    }

    // an existing earlier deprovisioning instant backdates this
    // transaction instead of moving forward
    let mut transaction_ts = now;
    if let Some(finalized) = existing_finalized_at {
        if finalized < transaction_ts {
            transaction_ts = finalized;
        }
    }

    (task, valid_until, transaction_ts)
}
