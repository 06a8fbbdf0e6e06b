use chrono::{DateTime, Duration, Utc};

use hearth_db::StoreState;
use hearth_types::api::StandupStatus;
use hearth_types::events::Scheduled;
use hearth_types::models::{Kind, Record};

use crate::error::{SchedulerError, SchedulerResult};
use crate::scheduler::Scheduler;

impl Scheduler {
    /// Open a standup of `length` on a channel. Returns when it closes.
    pub fn start_standup(
        &self,
        channel_id: u64,
        creator: u64,
        length: Duration,
    ) -> SchedulerResult<DateTime<Utc>> {
        let time_finish = self.now() + length;
        match self.schedule_standup(channel_id, creator, time_finish)? {
            Scheduled::Armed { fire_time } => Ok(fire_time),
            Scheduled::Fired => Ok(time_finish),
        }
    }

    /// A standup counts as active until its close time has passed, even if
    /// the close has not been applied yet.
    pub fn standup_active(&self, channel_id: u64) -> SchedulerResult<StandupStatus> {
        let now = self.now();
        let standup_time = self
            .store()
            .with_state(|state| {
                state
                    .find(Kind::Channel, channel_id)
                    .and_then(Record::as_channel)
                    .map(|c| c.standup_time)
            })?
            .ok_or(SchedulerError::ChannelNotFound(channel_id))?;

        Ok(match standup_time {
            Some(t) if now <= t => StandupStatus {
                is_active: true,
                time_finish: Some(t),
            },
            _ => StandupStatus::inactive(),
        })
    }

    /// Add a line to the running standup, prefixed with the author's handle.
    pub fn standup_send(&self, channel_id: u64, user_id: u64, text: &str) -> SchedulerResult<()> {
        let now = self.now();
        self.store().transaction(|state| {
            let handle = author_handle(state, user_id);
            let channel = state
                .find_mut(Kind::Channel, channel_id)
                .and_then(Record::as_channel_mut)
                .ok_or(SchedulerError::ChannelNotFound(channel_id))?;
            if !channel.standup_time.is_some_and(|t| now <= t) {
                return Err(SchedulerError::NoActiveStandup(channel_id));
            }

            if !channel.standup_buffer.is_empty() {
                channel.standup_buffer.push('\n');
            }
            channel.standup_buffer.push_str(&handle);
            channel.standup_buffer.push_str(": ");
            channel.standup_buffer.push_str(text);
            Ok(())
        })
    }
}

fn author_handle(state: &StoreState, user_id: u64) -> String {
    let user = state
        .find(Kind::User, user_id)
        .and_then(Record::as_user)
        .map(|u| u.handle.clone());
    let special = || match state.find(Kind::SpecialUser, user_id) {
        Some(Record::SpecialUser(u)) => Some(u.handle.clone()),
        _ => None,
    };
    user.or_else(special).unwrap_or_else(|| user_id.to_string())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use hearth_db::Store;
    use hearth_types::models::{ChannelRecord, UserRecord, PERMISSION_MEMBER};

    use super::*;
    use crate::clock::SystemClock;

    fn setup() -> (Scheduler, u64) {
        let store = Arc::new(Store::new());
        let user = store.allocate_id(Kind::User).unwrap();
        store
            .append(
                Kind::User,
                Record::User(UserRecord {
                    id: user,
                    email: "ada@example.com".into(),
                    name_first: "Ada".into(),
                    name_last: "Lovelace".into(),
                    handle: "adalovelace".into(),
                    password_hash: String::new(),
                    permission_id: PERMISSION_MEMBER,
                    profile_img_url: String::new(),
                }),
            )
            .unwrap();
        let channel = store.allocate_id(Kind::Channel).unwrap();
        store
            .append(
                Kind::Channel,
                Record::Channel(ChannelRecord::new(channel, "general", true, user)),
            )
            .unwrap();
        let scheduler = Scheduler::new(store, Arc::new(SystemClock::new())).unwrap();
        (scheduler, channel)
    }

    #[tokio::test]
    async fn send_requires_an_active_standup() {
        let (scheduler, channel) = setup();
        let err = scheduler.standup_send(channel, 0, "hello").unwrap_err();
        assert!(matches!(err, SchedulerError::NoActiveStandup(_)));
    }

    #[tokio::test]
    async fn lines_are_buffered_with_handles() {
        let (scheduler, channel) = setup();
        let finish = scheduler
            .start_standup(channel, 0, Duration::minutes(10))
            .unwrap();

        let status = scheduler.standup_active(channel).unwrap();
        assert_eq!(
            status,
            StandupStatus {
                is_active: true,
                time_finish: Some(finish)
            }
        );

        scheduler.standup_send(channel, 0, "fixed the build").unwrap();
        scheduler.standup_send(channel, 77, "reviewing").unwrap();

        let buffer = scheduler
            .store()
            .get_by_id(Kind::Channel, channel)
            .unwrap()
            .and_then(Record::into_channel)
            .unwrap()
            .standup_buffer;
        assert_eq!(buffer, "adalovelace: fixed the build\n77: reviewing");
    }

    #[tokio::test]
    async fn inactive_channel_reports_no_finish_time() {
        let (scheduler, channel) = setup();
        assert_eq!(
            scheduler.standup_active(channel).unwrap(),
            StandupStatus::inactive()
        );
        assert!(matches!(
            scheduler.standup_active(99),
            Err(SchedulerError::ChannelNotFound(99))
        ));
    }
}
