use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use sha2::{Digest, Sha256};
use tracing::debug;

use hearth_types::models::{Kind, Record, ResetCodeRecord, TokenRecord};

use crate::error::StoreResult;
use crate::Store;

const TOKEN_BYTES: usize = 32;
const RESET_CODE_BYTES: usize = 8;

/// Token -> user id index over the `valid-token` collection.
///
/// Tokens are random and only their SHA-256 is stored, so a leaked snapshot
/// does not leak live sessions.
#[derive(Clone)]
pub struct SessionIndex {
    store: Arc<Store>,
}

impl SessionIndex {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// Start a new session for `user_id`. Earlier sessions stay valid.
    pub fn issue(&self, user_id: u64) -> StoreResult<String> {
        let token = random_token(TOKEN_BYTES);
        let token_hash = hash_token(&token);
        self.store.transaction(|state| {
            let id = state.allocate_id(Kind::ValidToken);
            state.push(Record::ValidToken(TokenRecord {
                id,
                user_id,
                token_hash,
            }))
        })?;
        debug!("Issued session for user {}", user_id);
        Ok(token)
    }

    /// The user a token belongs to; `None` means unauthenticated.
    pub fn lookup(&self, token: &str) -> StoreResult<Option<u64>> {
        let token_hash = hash_token(token);
        self.store.with_state(|state| {
            state
                .records(Kind::ValidToken)
                .iter()
                .filter_map(Record::as_token)
                .find(|t| t.token_hash == token_hash)
                .map(|t| t.user_id)
        })
    }

    /// End one session. Returns whether the token was live.
    pub fn revoke(&self, token: &str) -> StoreResult<bool> {
        let token_hash = hash_token(token);
        self.store.with_state_mut(|state| {
            let id = state
                .records(Kind::ValidToken)
                .iter()
                .filter_map(Record::as_token)
                .find(|t| t.token_hash == token_hash)
                .map(|t| t.id);
            id.and_then(|id| state.take(Kind::ValidToken, id)).is_some()
        })
    }

    /// End every session of a user. Returns how many were removed.
    pub fn revoke_all(&self, user_id: u64) -> StoreResult<usize> {
        self.store.with_state_mut(|state| {
            state.retain(Kind::ValidToken, |r| {
                r.as_token().is_none_or(|t| t.user_id != user_id)
            })
        })
    }

    // -- Password reset codes --

    pub fn issue_reset_code(&self, email: &str) -> StoreResult<String> {
        let code = hex::encode_upper(random_bytes(RESET_CODE_BYTES));
        let stored = code.clone();
        self.store.transaction(|state| {
            let id = state.allocate_id(Kind::ResetCode);
            state.push(Record::ResetCode(ResetCodeRecord {
                id,
                email: email.to_string(),
                code: stored,
            }))
        })?;
        Ok(code)
    }

    /// Consume a reset code. A code can be redeemed once.
    pub fn redeem_reset_code(&self, code: &str) -> StoreResult<Option<String>> {
        self.store.with_state_mut(|state| {
            let id = state
                .records(Kind::ResetCode)
                .iter()
                .filter_map(Record::as_reset_code)
                .find(|r| r.code == code)
                .map(|r| r.id)?;
            state
                .take(Kind::ResetCode, id)
                .and_then(|r| r.as_reset_code().map(|r| r.email.clone()))
        })
    }
}

fn random_bytes(len: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    rand::rng().fill_bytes(&mut bytes);
    bytes
}

fn random_token(len: usize) -> String {
    URL_SAFE_NO_PAD.encode(random_bytes(len))
}

fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}
