use crate::auth::AuthStore;
use secrecy::SecretString;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatePhase {
    Restoring,
    Authenticated,
    Unauthenticated,
}

/// What the guarded view should do after polling the gate.
#[derive(Debug)]
pub enum GateTransition {
    /// Session restore hasn't finished: show the loading state, go nowhere.
    Wait,
    /// Just became authenticated: carry on and fetch with this token.
    Proceed(SecretString),
    /// Just became unauthenticated: go to the login view.
    RedirectToLogin,
    /// The gate already left `Restoring` earlier in this mount.
    Settled,
}

/// Guards one mount of a protected view.
///
/// It leaves [`GatePhase::Restoring`] at most once, so however many times it is polled it
/// hands out at most one `Proceed` or `RedirectToLogin`.
#[derive(Debug)]
pub struct SessionGate {
    phase: GatePhase,
}

impl Default for SessionGate {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionGate {
    pub const fn new() -> Self {
        Self {
            phase: GatePhase::Restoring,
        }
    }

    pub const fn phase(&self) -> GatePhase {
        self.phase
    }

    pub fn poll(&mut self, store: &AuthStore) -> GateTransition {
        if self.phase != GatePhase::Restoring {
            return GateTransition::Settled;
        }
        if !store.is_restored() {
            return GateTransition::Wait;
        }

        match store.token() {
            Some(token) => {
                self.phase = GatePhase::Authenticated;
                GateTransition::Proceed(token.clone())
            }
            None => {
                self.phase = GatePhase::Unauthenticated;
                GateTransition::RedirectToLogin
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::file_store::MemorySessionStore;
    use secrecy::ExposeSecret;
    use std::sync::Arc;

    fn store() -> AuthStore {
        AuthStore::new(Arc::new(MemorySessionStore::default()))
    }

    #[test]
    fn waits_while_restoring() {
        let store = store();
        let mut gate = SessionGate::new();

        for _ in 0..3 {
            assert!(matches!(gate.poll(&store), GateTransition::Wait));
            assert_eq!(gate.phase(), GatePhase::Restoring);
        }
    }

    #[tokio::test]
    async fn redirects_exactly_once_when_logged_out() {
        let mut store = store();
        let mut gate = SessionGate::new();
        assert!(matches!(gate.poll(&store), GateTransition::Wait));

        store.restore().await;

        let redirects = (0..5)
            .filter(|_| matches!(gate.poll(&store), GateTransition::RedirectToLogin))
            .count();
        assert_eq!(redirects, 1);
        assert_eq!(gate.phase(), GatePhase::Unauthenticated);
    }

    #[tokio::test]
    async fn proceeds_once_with_the_stored_token() {
        let mut store = store();
        store
            .login(SecretString::from("sid=42".to_string()))
            .await
            .unwrap();
        let mut gate = SessionGate::new();

        let GateTransition::Proceed(token) = gate.poll(&store) else {
            panic!("expected to proceed");
        };
        assert_eq!(token.expose_secret(), "sid=42");
        assert!(matches!(gate.poll(&store), GateTransition::Settled));
        assert_eq!(gate.phase(), GatePhase::Authenticated);
    }

    #[tokio::test]
    async fn later_store_changes_do_not_renavigate() {
        let mut store = store();
        store
            .login(SecretString::from("sid=1".to_string()))
            .await
            .unwrap();
        let mut gate = SessionGate::new();
        assert!(matches!(gate.poll(&store), GateTransition::Proceed(_)));

        store.logout().await.unwrap();

        assert!(matches!(gate.poll(&store), GateTransition::Settled));
    }
}
