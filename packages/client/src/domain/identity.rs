//! Session identity.
//!
//! A tab keeps one `sessionId` for its whole life (it survives reloads through
//! the identity store) and a display name resolved once per load.

use std::collections::BTreeMap;

use base64::{
    Engine as _,
    engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD},
};
use rand::Rng;
use serde_json::Value;

use crate::error::IdentityError;

pub const SESSION_ID_KEY: &str = "sessionId";
pub const TOKEN_KEY: &str = "token";

const SUFFIX_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const SUFFIX_LENGTH: usize = 4;

/// Persistent string map, the equivalent of browser local storage
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), IdentityError>;
}

impl KeyValueStore for BTreeMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        BTreeMap::get(self, key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), IdentityError> {
        self.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Identity of this tab in a room
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIdentity {
    pub session_id: String,
    pub username: String,
}

/// Key under which the generated display name of a session is stored
pub fn username_key(session_id: &str) -> String {
    format!("username-{}", session_id)
}

/// Generate a session id of the form `tab-<millis>-<4 base36 chars>`
pub fn generate_session_id<R: Rng + ?Sized>(now_millis: i64, rng: &mut R) -> String {
    let suffix: String = (0..SUFFIX_LENGTH)
        .map(|_| SUFFIX_ALPHABET[rng.gen_range(0..SUFFIX_ALPHABET.len())] as char)
        .collect();
    format!("tab-{}-{}", now_millis, suffix)
}

/// Random part of a session id, used to tell generated names apart
pub fn session_suffix(session_id: &str) -> &str {
    session_id
        .rsplit('-')
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or(session_id)
}

/// Display name claimed by a JWT-shaped token.
///
/// # Returns
///
/// * `Some(name)` - the `username` claim, else `sub`, else `"User"`
/// * `None` - the token payload could not be decoded
pub fn token_username(token: &str) -> Option<String> {
    let payload = token.split('.').nth(1)?;
    let trimmed = payload.trim_end_matches('=');
    let bytes = URL_SAFE_NO_PAD
        .decode(trimmed)
        .or_else(|_| STANDARD_NO_PAD.decode(trimmed))
        .ok()?;
    let claims: Value = serde_json::from_slice(&bytes).ok()?;

    let claim = |name: &str| {
        claims
            .get(name)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };
    Some(
        claim("username")
            .or_else(|| claim("sub"))
            .unwrap_or_else(|| "User".to_string()),
    )
}

/// Resolve the display name for this load.
///
/// A decodable token always wins. Otherwise the name stored for the session is
/// reused, or a new `User-<suffix>` (undecodable token) / `Guest-<suffix>`
/// (no token) is generated.
pub fn resolve_username(token: Option<&str>, stored: Option<String>, session_id: &str) -> String {
    let suffix = session_suffix(session_id);
    match token {
        Some(token) => token_username(token)
            .or(stored)
            .unwrap_or_else(|| format!("User-{}", suffix)),
        None => stored.unwrap_or_else(|| format!("Guest-{}", suffix)),
    }
}

/// Load this tab's identity, creating and persisting it on first use.
pub fn load_or_create<S, R>(
    store: &mut S,
    now_millis: i64,
    rng: &mut R,
) -> Result<SessionIdentity, IdentityError>
where
    S: KeyValueStore + ?Sized,
    R: Rng + ?Sized,
{
    let session_id = match store.get(SESSION_ID_KEY) {
        Some(id) if !id.is_empty() => id,
        _ => generate_session_id(now_millis, rng),
    };
    store.set(SESSION_ID_KEY, &session_id)?;

    let token = store.get(TOKEN_KEY).filter(|t| !t.is_empty());
    let key = username_key(&session_id);
    let username = resolve_username(token.as_deref(), store.get(&key), &session_id);
    store.set(&key, &username)?;

    Ok(SessionIdentity {
        session_id,
        username,
    })
}
