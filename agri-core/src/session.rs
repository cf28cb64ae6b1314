//! Authenticated session: the bearer token plus the user it belongs to.
//!
//! A `Session` is created once at startup, restored from persisted storage
//! with [`Session::restore`], and handed by `Arc` to whatever needs to
//! authenticate. [`Session::logout`] clears both the in-memory and the
//! persisted copies.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    error::{ClientError, ClientResult},
    storage::{KEY_AUTH_TOKEN, KEY_TOKEN, KEY_USER, KEY_USER_PROFILE, KeyValueStore},
};

const DEFAULT_PHONE: &str = "+91 0000000000";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: String,
    pub email: String,
    pub phone: String,
}

impl UserProfile {
    pub fn guest() -> Self {
        Self {
            name: "Guest User".to_string(),
            email: "guest@farm.com".to_string(),
            phone: DEFAULT_PHONE.to_string(),
        }
    }
}

#[derive(Debug, Default)]
struct SessionState {
    token: Option<String>,
    user: Option<UserProfile>,
}

#[derive(Debug, Default)]
pub struct Session {
    state: RwLock<SessionState>,
}

impl Session {
    /// An anonymous session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the session from persisted storage.
    ///
    /// `token` is tried first, then `user`; the first one whose JWT payload
    /// carries an `email` wins. A stored `auth_token` without a decodable
    /// user still authenticates requests. Anything unreadable is treated as
    /// "no session".
    pub fn restore(store: &dyn KeyValueStore) -> Self {
        let session = Self::new();

        for key in [KEY_TOKEN, KEY_USER] {
            let raw = match store.get(key) {
                Ok(Some(raw)) => raw,
                Ok(None) => continue,
                Err(err) => {
                    tracing::warn!(key, error = %err, "could not read stored session token");
                    continue;
                }
            };

            if let Some(user) = user_from_token(&raw) {
                {
                    let mut state = session.state.write();
                    state.token = Some(raw);
                    state.user = Some(user);
                }
                return session;
            }
        }

        match store.get(KEY_AUTH_TOKEN) {
            Ok(Some(raw)) if !raw.is_empty() => session.state.write().token = Some(raw),
            Ok(_) => {}
            Err(err) => tracing::warn!(error = %err, "could not read stored auth token"),
        }

        session
    }

    /// Adopt `token` and persist it under both token keys.
    pub fn login(&self, token: &str, store: &dyn KeyValueStore) -> ClientResult<Option<UserProfile>> {
        let user = user_from_token(token);

        store.set(KEY_TOKEN, token)?;
        store.set(KEY_AUTH_TOKEN, token)?;

        let mut state = self.state.write();
        state.token = Some(token.to_string());
        state.user = user.clone();

        Ok(user)
    }

    /// Forget the session in memory and in storage.
    pub fn logout(&self, store: &dyn KeyValueStore) -> ClientResult<()> {
        {
            let mut state = self.state.write();
            state.token = None;
            state.user = None;
        }

        for key in [KEY_TOKEN, KEY_AUTH_TOKEN, KEY_USER, KEY_USER_PROFILE] {
            store.remove(key)?;
        }

        Ok(())
    }

    pub fn token(&self) -> Option<String> {
        self.state.read().token.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.read().token.is_some()
    }

    pub fn user(&self) -> Option<UserProfile> {
        self.state.read().user.clone()
    }

    /// The signed-in user, or the guest profile.
    pub fn current_user(&self) -> UserProfile {
        self.user().unwrap_or_else(UserProfile::guest)
    }
}

fn user_from_token(token: &str) -> Option<UserProfile> {
    let claims = match decode_jwt_claims(token) {
        Ok(claims) => claims,
        Err(err) => {
            tracing::warn!(error = %err, "discarding undecodable session token");
            return None;
        }
    };

    let email = claims.get("email")?.as_str()?.to_string();
    let text = |key: &str| claims.get(key).and_then(Value::as_str).map(str::to_string);

    Some(UserProfile {
        name: text("name").or_else(|| text("username")).unwrap_or_else(|| "User".to_string()),
        email,
        phone: text("phone").unwrap_or_else(|| DEFAULT_PHONE.to_string()),
    })
}

/// Decode the (unverified) payload segment of a JWT.
pub fn decode_jwt_claims(token: &str) -> ClientResult<Value> {
    let payload = token
        .split('.')
        .nth(1)
        .ok_or_else(|| ClientError::Decode("token has no payload segment".into()))?;

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| ClientError::Decode(e.to_string()))?;

    serde_json::from_slice(&bytes).map_err(|e| ClientError::Decode(e.to_string()))
}

#[cfg(test)]
pub(crate) fn encode_test_token(claims: &Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.signature")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use serde_json::json;

    #[test]
    fn restore_prefers_token_key() {
        let store = MemoryStore::new();
        let token = encode_test_token(&json!({"email": "asha@farm.in", "name": "Asha"}));
        store.set(KEY_TOKEN, &token).unwrap();
        store.set(KEY_USER, &encode_test_token(&json!({"email": "other@farm.in"}))).unwrap();

        let session = Session::restore(&store);
        assert_eq!(session.token().as_deref(), Some(token.as_str()));
        let user = session.current_user();
        assert_eq!(user.email, "asha@farm.in");
        assert_eq!(user.name, "Asha");
        assert_eq!(user.phone, DEFAULT_PHONE);
    }

    #[test]
    fn restore_falls_back_to_user_key_and_username() {
        let store = MemoryStore::new();
        store.set(KEY_TOKEN, "garbage").unwrap();
        store
            .set(KEY_USER, &encode_test_token(&json!({"email": "r@farm.in", "username": "ravi"})))
            .unwrap();

        let session = Session::restore(&store);
        assert_eq!(session.current_user().name, "ravi");
    }

    #[test]
    fn token_without_email_is_no_session() {
        let store = MemoryStore::new();
        store.set(KEY_TOKEN, &encode_test_token(&json!({"sub": "42"}))).unwrap();

        let session = Session::restore(&store);
        assert!(!session.is_authenticated());
        assert_eq!(session.current_user(), UserProfile::guest());
    }

    #[test]
    fn bare_auth_token_still_authenticates() {
        let store = MemoryStore::new();
        store.set(KEY_AUTH_TOKEN, "opaque").unwrap();

        let session = Session::restore(&store);
        assert_eq!(session.token().as_deref(), Some("opaque"));
        assert!(session.user().is_none());
    }

    #[test]
    fn decode_errors_are_typed() {
        assert!(matches!(decode_jwt_claims("nodots"), Err(ClientError::Decode(_))));
        assert!(matches!(decode_jwt_claims("a.!!!.c"), Err(ClientError::Decode(_))));
    }

    #[test]
    fn login_then_logout_clears_memory_and_storage() {
        let store = MemoryStore::new();
        let session = Session::new();
        let token = encode_test_token(&json!({"email": "asha@farm.in"}));

        let user = session.login(&token, &store).unwrap();
        assert_eq!(user.map(|u| u.name), Some("User".to_string()));
        assert_eq!(store.get(KEY_AUTH_TOKEN).unwrap().as_deref(), Some(token.as_str()));
        store.set(KEY_USER_PROFILE, "{}").unwrap();

        session.logout(&store).unwrap();
        assert!(!session.is_authenticated());
        for key in [KEY_TOKEN, KEY_AUTH_TOKEN, KEY_USER, KEY_USER_PROFILE] {
            assert_eq!(store.get(key).unwrap(), None);
        }
    }
}
