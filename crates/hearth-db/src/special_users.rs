use tracing::info;

use hearth_types::models::{DELETED_USER_ID, HANGMAN_BOT_ID, Kind, Record, SpecialUserRecord};

use crate::error::StoreResult;
use crate::Store;

fn special_users() -> Vec<Record> {
    vec![
        Record::SpecialUser(SpecialUserRecord {
            id: HANGMAN_BOT_ID,
            handle: "hangman_bot".into(),
            name_first: "Hangman".into(),
            name_last: "Bot".into(),
        }),
        Record::SpecialUser(SpecialUserRecord {
            id: DELETED_USER_ID,
            handle: "deleted_user".into(),
            name_first: "Deleted".into(),
            name_last: "User".into(),
        }),
    ]
}

impl Store {
    /// (Re)write the built-in special users. Runs on every boot.
    pub fn seed_special_users(&self) -> StoreResult<()> {
        self.set_all(Kind::SpecialUser, special_users())
    }

    /// Wipe the workspace back to a fresh install.
    pub fn reset_workspace(&self) -> StoreResult<()> {
        self.clear_all()?;
        self.seed_special_users()?;
        info!("Workspace reset");
        Ok(())
    }
}
