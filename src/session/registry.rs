//! Live debug sessions, keyed by session id
//!
//! Child-session notifications from the IDE carry the parent's
//! `rnDebugSessionId`; the registry routes them to the right session.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::common::config::Config;
use crate::common::{Error, Result};

use super::actor::{self, SessionHandle};
use super::host::HostIde;
use super::launcher::AppLauncher;

pub struct SessionRegistry {
    config: Arc<Config>,
    launcher: Arc<dyn AppLauncher>,
    sessions: RwLock<HashMap<String, SessionHandle>>,
}

impl SessionRegistry {
    pub fn new(config: Arc<Config>, launcher: Arc<dyn AppLauncher>) -> Self {
        Self {
            config,
            launcher,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Start a session under a fresh id
    pub async fn create(&self, host: Arc<dyn HostIde>) -> Result<SessionHandle> {
        let id = uuid::Uuid::new_v4().to_string();
        self.create_with_id(id, host).await
    }

    pub async fn create_with_id(&self, id: String, host: Arc<dyn HostIde>) -> Result<SessionHandle> {
        let mut sessions = self.sessions.write().await;
        if sessions.get(&id).is_some_and(|session| !session.is_finished()) {
            return Err(Error::SessionAlreadyStarted(id));
        }
        let handle = actor::spawn(id.clone(), self.config.clone(), host, self.launcher.clone())?;
        tracing::debug!(session = %id, "Registered debug session");
        sessions.insert(id, handle.clone());
        Ok(handle)
    }

    /// Look up a live session; finished ones are forgotten on the way
    pub async fn get(&self, id: &str) -> Result<SessionHandle> {
        let handle = self.sessions.read().await.get(id).cloned();
        match handle {
            Some(handle) if !handle.is_finished() => Ok(handle),
            Some(_) => {
                self.sessions.write().await.remove(id);
                tracing::debug!(session = %id, "Removed finished debug session");
                Err(Error::SessionNotFound(id.to_string()))
            }
            None => Err(Error::SessionNotFound(id.to_string())),
        }
    }

    pub async fn child_started(&self, session_id: &str, child_id: String) -> Result<()> {
        self.get(session_id).await?.child_started(child_id).await
    }

    pub async fn child_terminated(&self, session_id: &str, child_id: String) -> Result<()> {
        let session = self.get(session_id).await?;
        if session.child_terminated(child_id).await.is_err() {
            // The session finished between the lookup and the send
            self.sessions.write().await.remove(session_id);
        }
        Ok(())
    }

    /// Stop a session and forget it
    pub async fn disconnect(&self, session_id: &str, forced_stop: bool) -> Result<()> {
        let session = self
            .sessions
            .write()
            .await
            .remove(session_id)
            .ok_or_else(|| Error::SessionNotFound(session_id.to_string()))?;
        session.disconnect(forced_stop).await
    }

    /// Stop every session
    pub async fn disconnect_all(&self, forced_stop: bool) {
        let sessions: Vec<_> = self.sessions.write().await.drain().map(|(_, s)| s).collect();
        for session in sessions {
            if let Err(e) = session.disconnect(forced_stop).await {
                tracing::warn!(session = %session.id(), error = %e, "Failed to stop session");
            }
        }
    }

    /// Number of live sessions
    pub async fn len(&self) -> usize {
        self.prune().await;
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn prune(&self) {
        self.sessions
            .write()
            .await
            .retain(|_, session| !session.is_finished());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::args::LaunchArgs;
    use crate::session::host::ChildSessionConfig;
    use crate::session::launcher::PlatformMonitor;
    use async_trait::async_trait;

    struct QuietHost;

    #[async_trait]
    impl HostIde for QuietHost {
        async fn start_child_session(&self, _config: &ChildSessionConfig) -> Result<bool> {
            Ok(true)
        }
        async fn terminate_child_session(&self, _session_id: &str, _child_id: &str) -> Result<()> {
            Ok(())
        }
        async fn session_terminated(&self, _session_id: &str, _forced_stop: bool) {}
    }

    struct NoLaunch;

    #[async_trait]
    impl AppLauncher for NoLaunch {
        async fn launch(&self, _args: &LaunchArgs) -> Result<Vec<Box<dyn PlatformMonitor>>> {
            Ok(Vec::new())
        }
    }

    fn registry() -> SessionRegistry {
        SessionRegistry::new(Arc::new(Config::default()), Arc::new(NoLaunch))
    }

    #[tokio::test]
    async fn test_sessions_are_routed_by_id() {
        let registry = registry();
        let a = registry.create(Arc::new(QuietHost)).await.unwrap();
        let b = registry.create(Arc::new(QuietHost)).await.unwrap();
        assert_ne!(a.id(), b.id());
        assert_eq!(registry.len().await, 2);

        assert_eq!(registry.get(a.id()).await.unwrap().id(), a.id());
        registry.child_started(b.id(), "child".into()).await.unwrap();

        let err = registry.child_started("nope", "child".into()).await.unwrap_err();
        assert!(matches!(err, Error::SessionNotFound(_)));
    }

    #[tokio::test]
    async fn test_disconnect_removes_session() {
        let registry = registry();
        let session = registry
            .create_with_id("rn".into(), Arc::new(QuietHost))
            .await
            .unwrap();
        assert!(matches!(
            registry.create_with_id("rn".into(), Arc::new(QuietHost)).await,
            Err(Error::SessionAlreadyStarted(_))
        ));

        registry.disconnect("rn", true).await.unwrap();
        assert!(session.is_finished());
        assert!(registry.is_empty().await);
        assert!(session.status().await.is_err());
        assert!(matches!(
            registry.disconnect("rn", true).await,
            Err(Error::SessionNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_finished_sessions_are_forgotten() {
        let registry = registry();
        let session = registry.create(Arc::new(QuietHost)).await.unwrap();
        let other = registry.create(Arc::new(QuietHost)).await.unwrap();

        // Ends without going through the registry, as a flow teardown does
        session.disconnect(false).await.unwrap();
        assert!(session.is_finished());

        assert!(matches!(
            registry.get(session.id()).await,
            Err(Error::SessionNotFound(_))
        ));
        assert_eq!(registry.len().await, 1);
        assert!(registry.get(other.id()).await.is_ok());
    }
}
