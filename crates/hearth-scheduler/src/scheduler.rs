//! Deferred effects: delayed message delivery and standup auto-close.
//!
//! Every item moves `pending -> fired` exactly once. The pending state lives
//! in the store (a `pending-message` record, or a channel's `standup_time`),
//! so a snapshot carries it across restarts. Firing removes that state and
//! applies the effect inside one store transaction; a second fire of the
//! same key finds nothing pending and is a no-op. That is what lets a live
//! timer and boot recovery race on the same item.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::runtime::Handle;
use tracing::{debug, error, info};

use hearth_db::{Store, StoreError, StoreResult, StoreState};
use hearth_types::api::Recovery;
use hearth_types::events::{DeferredItem, DeferredKey, Scheduled};
use hearth_types::models::{DELETED_USER_ID, Kind, MessageRecord, Record};

use crate::clock::Clock;
use crate::error::{SchedulerError, SchedulerResult};

#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<SchedulerInner>,
}

struct SchedulerInner {
    store: Arc<Store>,
    clock: Arc<dyn Clock>,
    /// Timers are spawned here so `fire`/`schedule` can be called from
    /// blocking threads too.
    runtime: Handle,
}

impl Scheduler {
    /// Must be called from within a Tokio runtime.
    pub fn new(store: Arc<Store>, clock: Arc<dyn Clock>) -> SchedulerResult<Self> {
        let runtime = Handle::try_current().map_err(|_| SchedulerError::NoRuntime)?;
        Ok(Self {
            inner: Arc::new(SchedulerInner {
                store,
                clock,
                runtime,
            }),
        })
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.inner.store
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.inner.clock.now()
    }

    /// Apply `item` at `fire_time`. A fire time that has already passed is
    /// applied before this returns; otherwise the item is recorded as pending
    /// and a timer is armed.
    pub fn schedule(&self, item: DeferredItem, fire_time: DateTime<Utc>) -> SchedulerResult<Scheduled> {
        let now = self.now();
        let key = item.key();

        // Recording the item and an overdue fire share one critical section,
        // so nobody observes an overdue item as pending.
        let fired = self.inner.store.transaction(|state| {
            match item {
                DeferredItem::Message(mut message) => {
                    if message.id >= state.peek_next_id(Kind::Message) {
                        return Err(SchedulerError::UnallocatedId(message.id));
                    }
                    if state.find(Kind::PendingMessage, message.id).is_some()
                        || state.find(Kind::Message, message.id).is_some()
                    {
                        return Err(SchedulerError::AlreadyScheduled(key));
                    }
                    message.time_created = fire_time;
                    state.push(Record::PendingMessage(message))?;
                }
                DeferredItem::Standup {
                    channel_id,
                    creator,
                } => {
                    let channel = state
                        .find_mut(Kind::Channel, channel_id)
                        .and_then(Record::as_channel_mut)
                        .ok_or(SchedulerError::ChannelNotFound(channel_id))?;
                    if channel.has_standup() {
                        return Err(SchedulerError::StandupActive(channel_id));
                    }
                    channel.standup_time = Some(fire_time);
                    channel.standup_creator = Some(creator);
                    channel.standup_buffer.clear();
                }
            }
            Ok(fire_time <= now && apply(state, key, now)?)
        })?;

        if fired {
            info!("Fired {:?} inline", key);
            return Ok(Scheduled::Fired);
        }

        debug!("Armed {:?} for {}", key, fire_time);
        self.arm(key, fire_time);
        Ok(Scheduled::Armed { fire_time })
    }

    /// Start a standup on `channel_id` that closes at `fire_time`. Rejected
    /// while another standup is running on the channel.
    pub fn schedule_standup(
        &self,
        channel_id: u64,
        creator: u64,
        fire_time: DateTime<Utc>,
    ) -> SchedulerResult<Scheduled> {
        self.schedule(DeferredItem::Standup { channel_id, creator }, fire_time)
    }

    /// Apply the effect for `key` if it is still pending and due. Returns
    /// whether this call fired it.
    pub fn fire(&self, key: DeferredKey) -> SchedulerResult<bool> {
        let now = self.now();
        let fired = self.inner.store.transaction(|state| apply(state, key, now))?;

        if fired {
            info!("Fired {:?}", key);
        } else {
            debug!("{:?} not fired (already fired, missing or not yet due)", key);
        }
        Ok(fired)
    }

    /// Fire time of `key` while it is still pending.
    pub fn pending_fire_time(&self, key: DeferredKey) -> SchedulerResult<Option<DateTime<Utc>>> {
        Ok(self.inner.store.with_state(|state| match key {
            DeferredKey::Message(id) => state
                .find(Kind::PendingMessage, id)
                .and_then(Record::as_message)
                .map(|m| m.time_created),
            DeferredKey::Standup(channel_id) => state
                .find(Kind::Channel, channel_id)
                .and_then(Record::as_channel)
                .and_then(|c| c.standup_time),
        })?)
    }

    /// Every item still pending in the store, in collection order.
    pub fn pending_items(&self) -> SchedulerResult<Vec<(DeferredKey, DateTime<Utc>)>> {
        Ok(self.inner.store.with_state(|state| {
            let messages = state
                .records(Kind::PendingMessage)
                .iter()
                .filter_map(Record::as_message)
                .map(|m| (DeferredKey::Message(m.id), m.time_created));
            let standups = state
                .records(Kind::Channel)
                .iter()
                .filter_map(Record::as_channel)
                .filter_map(|c| c.standup_time.map(|t| (DeferredKey::Standup(c.id), t)));
            messages.chain(standups).collect()
        })?)
    }

    /// Replay pending work after a restore: fire what came due while the
    /// process was down and arm timers for the rest.
    pub fn recover_pending(&self) -> SchedulerResult<Recovery> {
        let now = self.now();
        let mut recovery = Recovery::default();

        for (key, fire_time) in self.pending_items()? {
            if fire_time <= now {
                if self.fire(key)? {
                    recovery.fired += 1;
                }
            } else {
                self.arm(key, fire_time);
                recovery.armed += 1;
            }
        }

        info!(
            "Recovered deferred work: {} fired, {} armed",
            recovery.fired, recovery.armed
        );
        Ok(recovery)
    }

    /// Spawn a detached one-shot timer. The task owns its key, so timers
    /// armed in a loop never share a target.
    fn arm(&self, key: DeferredKey, fire_time: DateTime<Utc>) {
        let scheduler = self.clone();
        self.inner
            .runtime
            .spawn(async move { scheduler.run_timer(key, fire_time).await });
    }

    async fn run_timer(self, key: DeferredKey, mut fire_time: DateTime<Utc>) {
        loop {
            let wait = (fire_time - self.now()).to_std().unwrap_or(Duration::ZERO);
            tokio::time::sleep(wait).await;

            match self.fire(key) {
                Ok(true) => return,
                Ok(false) => match self.pending_fire_time(key) {
                    // Woke before the clock reached the fire time.
                    Ok(Some(t)) => fire_time = t,
                    Ok(None) => return,
                    Err(e) => {
                        error!("Timer for {:?} lost its store: {}", key, e);
                        return;
                    }
                },
                Err(e) => {
                    error!("Timer for {:?} failed to fire: {}", key, e);
                    return;
                }
            }
        }
    }
}

fn apply(state: &mut StoreState, key: DeferredKey, now: DateTime<Utc>) -> StoreResult<bool> {
    match key {
        DeferredKey::Message(id) => fire_message(state, id, now),
        DeferredKey::Standup(channel_id) => fire_standup(state, channel_id, now),
    }
}

/// Move a due pending message into the committed collection. The pending
/// record stays put if its id is somehow already committed.
fn fire_message(state: &mut StoreState, id: u64, now: DateTime<Utc>) -> StoreResult<bool> {
    let due = state
        .find(Kind::PendingMessage, id)
        .and_then(Record::as_message)
        .is_some_and(|m| m.time_created <= now);
    if !due {
        return Ok(false);
    }
    if state.find(Kind::Message, id).is_some() {
        return Err(StoreError::DuplicateId {
            kind: Kind::Message,
            id,
        });
    }

    match state.take(Kind::PendingMessage, id).and_then(Record::into_message) {
        Some(message) => {
            state.commit_message(message)?;
            Ok(true)
        }
        None => Ok(false),
    }
}

/// Close a due standup: post its buffer as one message and reset the
/// channel's standup fields.
fn fire_standup(state: &mut StoreState, channel_id: u64, now: DateTime<Utc>) -> StoreResult<bool> {
    let Some(channel) = state
        .find_mut(Kind::Channel, channel_id)
        .and_then(Record::as_channel_mut)
    else {
        return Ok(false);
    };
    let Some(closed_at) = channel.standup_time.filter(|t| *t <= now) else {
        return Ok(false);
    };

    let creator = channel.standup_creator.unwrap_or(DELETED_USER_ID);
    let contents = std::mem::take(&mut channel.standup_buffer);
    channel.clear_standup();

    let id = state.allocate_id(Kind::Message);
    state.commit_message(MessageRecord::new(id, creator, channel_id, contents, closed_at))?;
    Ok(true)
}
