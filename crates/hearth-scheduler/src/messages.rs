use chrono::{DateTime, Utc};
use tracing::debug;

use hearth_types::events::DeferredItem;
use hearth_types::models::{Kind, MessageRecord};

use crate::error::{SchedulerError, SchedulerResult};
use crate::scheduler::Scheduler;

impl Scheduler {
    /// Post a message now. Returns its id.
    pub fn send_message(&self, sender_id: u64, channel_id: u64, contents: &str) -> SchedulerResult<u64> {
        let now = self.now();
        self.store().transaction(|state| {
            if state.find(Kind::Channel, channel_id).is_none() {
                return Err(SchedulerError::ChannelNotFound(channel_id));
            }
            let id = state.allocate_id(Kind::Message);
            state.commit_message(MessageRecord::new(id, sender_id, channel_id, contents, now))?;
            Ok(id)
        })
    }

    /// Post a message at `send_at`. The id is handed out immediately and the
    /// message sits in `pending-message` until it fires.
    pub fn send_later(
        &self,
        sender_id: u64,
        channel_id: u64,
        contents: &str,
        send_at: DateTime<Utc>,
    ) -> SchedulerResult<u64> {
        let now = self.now();
        if send_at < now {
            return Err(SchedulerError::FireTimeInPast(send_at));
        }
        if send_at == now {
            return self.send_message(sender_id, channel_id, contents);
        }

        let exists = self
            .store()
            .with_state(|state| state.find(Kind::Channel, channel_id).is_some())?;
        if !exists {
            return Err(SchedulerError::ChannelNotFound(channel_id));
        }

        let id = self.store().allocate_id(Kind::PendingMessage)?;
        let message = MessageRecord::new(id, sender_id, channel_id, contents, send_at);
        self.schedule(DeferredItem::Message(message), send_at)?;
        debug!("Message {} queued for {}", id, send_at);
        Ok(id)
    }
}
