use crate::{
    auth::file_store::{SessionStorage, StoredEntries},
    error::BouncerResult,
};
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;

pub mod file_store;
pub mod gate;

pub const AUTHENTICATED_KEY: &str = "authenticated";
pub const COOKIES_KEY: &str = "cookies";

/// The console's one login session against the bouncer server.
///
/// The token is the whole session: being authenticated means holding a token, so the two can
/// never disagree. Every change goes through [`AuthStore::login`] or [`AuthStore::logout`],
/// both of which also update the [`SessionStorage`].
#[derive(Debug)]
pub struct AuthStore {
    token: Option<SecretString>,
    restored: bool,
    storage: Arc<dyn SessionStorage>,
}

impl AuthStore {
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        Self {
            token: None,
            restored: false,
            storage,
        }
    }

    pub const fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    pub const fn token(&self) -> Option<&SecretString> {
        self.token.as_ref()
    }

    /// Whether the persisted session has been looked at yet.
    pub const fn is_restored(&self) -> bool {
        self.restored
    }

    pub fn storage(&self) -> Arc<dyn SessionStorage> {
        self.storage.clone()
    }

    /// Persists the token, then holds it. If persisting fails nothing changes in memory.
    pub async fn login(&mut self, token: SecretString) -> BouncerResult<()> {
        let entries: StoredEntries = [
            (AUTHENTICATED_KEY.to_string(), "true".to_string()),
            (COOKIES_KEY.to_string(), token.expose_secret().to_string()),
        ]
        .into_iter()
        .collect();

        self.storage.save(&entries).await?;
        self.token = Some(token);
        self.restored = true;

        info!("logged in");
        Ok(())
    }

    /// Drops the in-memory session first so a storage failure still leaves us logged out.
    pub async fn logout(&mut self) -> BouncerResult<()> {
        self.token = None;
        self.restored = true;

        self.storage.clear().await?;

        info!("logged out");
        Ok(())
    }

    #[cfg(test)]
    pub async fn restore(&mut self) {
        let loaded = self.storage.load().await;
        self.finish_restore(loaded);
    }

    /// Applies a load done elsewhere (so the load itself need not hold a lock on the store).
    /// Only the first call has any effect.
    pub fn finish_restore(&mut self, loaded: BouncerResult<Option<StoredEntries>>) {
        if self.restored {
            return;
        }
        self.restored = true;

        self.token = match loaded {
            Ok(Some(entries)) => {
                let token = token_from_entries(&entries);
                if token.is_none() {
                    warn!("persisted session is incomplete or malformed, starting logged out");
                }
                token
            }
            Ok(None) => None,
            Err(e) => {
                warn!(?e, "unable to load persisted session, starting logged out");
                None
            }
        };

        if self.token.is_some() {
            info!("restored persisted session");
        }
    }
}

fn token_from_entries(entries: &StoredEntries) -> Option<SecretString> {
    let authenticated = entries.get(AUTHENTICATED_KEY)?;
    if authenticated != "true" {
        return None;
    }

    let cookies = entries.get(COOKIES_KEY)?;
    if cookies.trim().is_empty() {
        return None;
    }

    Some(SecretString::from(cookies.clone()))
}
