use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use hearth_types::api::StoreStats;
use hearth_types::models::{Kind, MessageRecord, Record};

use crate::error::{StoreError, StoreResult};

/// Everything the store holds: one ordered collection per kind plus the id
/// counters. This is also the unit that gets snapshotted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreState {
    collections: BTreeMap<Kind, Vec<Record>>,
    next_id: BTreeMap<Kind, u64>,
}

impl Default for StoreState {
    fn default() -> Self {
        Self {
            collections: Kind::ALL.iter().map(|&k| (k, Vec::new())).collect(),
            next_id: Kind::ALL.iter().map(|&k| (k.id_space(), 0)).collect(),
        }
    }
}

impl StoreState {
    /// Hand out the next id of `kind`'s id space and advance the counter.
    pub fn allocate_id(&mut self, kind: Kind) -> u64 {
        let counter = self.next_id.entry(kind.id_space()).or_insert(0);
        let id = *counter;
        *counter += 1;
        id
    }

    /// The id the next allocation will return, without consuming it.
    pub fn peek_next_id(&self, kind: Kind) -> u64 {
        self.next_id.get(&kind.id_space()).copied().unwrap_or(0)
    }

    pub fn records(&self, kind: Kind) -> &[Record] {
        self.collections.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn find(&self, kind: Kind, id: u64) -> Option<&Record> {
        self.records(kind).iter().find(|r| r.id() == id)
    }

    pub fn find_mut(&mut self, kind: Kind, id: u64) -> Option<&mut Record> {
        self.collections
            .get_mut(&kind)?
            .iter_mut()
            .find(|r| r.id() == id)
    }

    /// Append a record to the collection named by its own kind. Nothing is
    /// written when that collection already holds the record's id.
    pub fn push(&mut self, record: Record) -> StoreResult<()> {
        let (kind, id) = (record.kind(), record.id());
        let records = self.collections.entry(kind).or_default();
        if records.iter().any(|r| r.id() == id) {
            return Err(StoreError::DuplicateId { kind, id });
        }
        records.push(record);
        Ok(())
    }

    /// Remove and return the record with `id`, if present.
    pub fn take(&mut self, kind: Kind, id: u64) -> Option<Record> {
        let records = self.collections.get_mut(&kind)?;
        let pos = records.iter().position(|r| r.id() == id)?;
        Some(records.remove(pos))
    }

    /// Keep only the records of `kind` matching `keep`. Returns how many
    /// were dropped.
    pub fn retain<F>(&mut self, kind: Kind, keep: F) -> usize
    where
        F: FnMut(&Record) -> bool,
    {
        let Some(records) = self.collections.get_mut(&kind) else {
            return 0;
        };
        let before = records.len();
        records.retain(keep);
        before - records.len()
    }

    pub fn replace(&mut self, kind: Kind, id: u64, record: Record) -> StoreResult<bool> {
        check_kind(kind, &record)?;
        match self.find_mut(kind, id) {
            Some(slot) => {
                *slot = record;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Remove the first record equal to `record`.
    pub fn remove(&mut self, kind: Kind, record: &Record) -> StoreResult<bool> {
        check_kind(kind, record)?;
        let Some(records) = self.collections.get_mut(&kind) else {
            return Ok(false);
        };
        match records.iter().position(|r| r == record) {
            Some(pos) => {
                records.remove(pos);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn set(&mut self, kind: Kind, records: Vec<Record>) -> StoreResult<()> {
        for record in &records {
            check_kind(kind, record)?;
        }
        self.collections.insert(kind, records);
        Ok(())
    }

    /// Append a message and link its id into the owning channel. Returns
    /// false when the channel does not exist; the message is stored anyway.
    /// An id that is already committed is rejected before anything changes.
    pub fn commit_message(&mut self, message: MessageRecord) -> StoreResult<bool> {
        let id = message.id;
        let channel_id = message.channel_id;
        self.push(Record::Message(message))?;
        match self
            .find_mut(Kind::Channel, channel_id)
            .and_then(Record::as_channel_mut)
        {
            Some(channel) => {
                channel.messages.push(id);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Remove a committed message and unlink it from its channel.
    pub fn delete_message(&mut self, id: u64) -> bool {
        let Some(message) = self.take(Kind::Message, id).and_then(Record::into_message) else {
            return false;
        };
        if let Some(channel) = self
            .find_mut(Kind::Channel, message.channel_id)
            .and_then(Record::as_channel_mut)
        {
            channel.messages.retain(|&m| m != id);
        }
        true
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            counts: Kind::ALL
                .iter()
                .map(|&k| (k, self.records(k).len()))
                .collect(),
        }
    }
}

fn check_kind(expected: Kind, record: &Record) -> StoreResult<()> {
    let found = record.kind();
    if found != expected {
        return Err(StoreError::KindMismatch { expected, found });
    }
    Ok(())
}
