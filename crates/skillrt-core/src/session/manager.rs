//! Per-conversation session state.
//!
//! Each session holds an ordered, de-duplicated, capacity-bounded list of
//! active skill keys. Sessions live in a concurrent map with one async mutex
//! each, so mutations on one session are serialized while different
//! sessions proceed independently.

use std::sync::Arc;

use dashmap::DashMap;
use skillrt_types::error::SkillError;
use skillrt_types::session::SessionInfo;
use skillrt_types::skill::{LoadMode, SkillDef, SkillFilter, SkillRecord};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::skill::registry::SkillRegistry;

/// Which skills an unload removes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnloadTarget {
    /// Skills matching any of these references. Absent names are ignored.
    Names(Vec<String>),
    All,
}

#[derive(Debug)]
struct SessionState {
    id: Uuid,
    active: Vec<SkillDef>,
    max_active: usize,
    filter: SkillFilter,
}

impl SessionState {
    fn info(&self) -> SessionInfo {
        SessionInfo {
            session_id: self.id,
            active_skills: self.active.clone(),
            max_active: self.max_active,
        }
    }
}

/// Owns every live session. Shared as `Arc<SessionManager>`.
pub struct SessionManager {
    registry: Arc<SkillRegistry>,
    sessions: DashMap<Uuid, Arc<Mutex<SessionState>>>,
    default_max_active: usize,
}

impl SessionManager {
    pub fn new(registry: Arc<SkillRegistry>, default_max_active: usize) -> Self {
        Self {
            registry,
            sessions: DashMap::new(),
            default_max_active,
        }
    }

    pub fn registry(&self) -> &Arc<SkillRegistry> {
        &self.registry
    }

    /// Create a session seeded with `initial` as if by a replace-mode load.
    ///
    /// `max_active` falls back to the configured default; zero is rejected.
    /// If seeding fails no session is created.
    pub fn create_session(
        &self,
        max_active: Option<usize>,
        initial: &[String],
        filter: SkillFilter,
    ) -> Result<SessionInfo, SkillError> {
        let max_active = max_active.unwrap_or(self.default_max_active);
        if max_active == 0 {
            return Err(SkillError::InvalidArgument(
                "max_active must be at least 1".to_owned(),
            ));
        }
        self.registry.ensure_available()?;

        let resolved = self.resolve_loadable(initial, &filter)?;
        let active = merge(&[], resolved, LoadMode::Replace);
        check_cap(active.len(), max_active)?;

        let state = SessionState {
            id: Uuid::now_v7(),
            active,
            max_active,
            filter,
        };
        let info = state.info();
        self.sessions
            .insert(info.session_id, Arc::new(Mutex::new(state)));

        tracing::info!(
            session_id = %info.session_id,
            max_active,
            active = info.active_skills.len(),
            "Session created"
        );
        Ok(info)
    }

    /// Remove a session. Returns whether it existed.
    pub fn close_session(&self, id: Uuid) -> bool {
        let removed = self.sessions.remove(&id).is_some();
        if removed {
            tracing::info!(session_id = %id, "Session closed");
        }
        removed
    }

    pub fn list_sessions(&self) -> Vec<Uuid> {
        let mut ids: Vec<Uuid> = self.sessions.iter().map(|e| *e.key()).collect();
        ids.sort();
        ids
    }

    /// Activate skills by name. All-or-nothing.
    ///
    /// Every name must resolve to an enabled, visible skill, and the
    /// resulting list must fit the session cap; otherwise the session is
    /// left exactly as it was.
    pub async fn load(
        &self,
        id: Uuid,
        names: &[String],
        mode: LoadMode,
    ) -> Result<Vec<Arc<SkillRecord>>, SkillError> {
        self.registry.ensure_available()?;
        let session = self.session(id)?;
        let mut state = session.lock().await;

        let resolved = self.resolve_loadable(names, &state.filter)?;
        let next = merge(&state.active, resolved, mode);
        check_cap(next.len(), state.max_active)?;

        state.active = next;
        tracing::debug!(
            session_id = %id,
            ?mode,
            active = state.active.len(),
            "Skills loaded"
        );
        Ok(self.records_for(id, &state.active))
    }

    /// Deactivate skills. Always succeeds for a live session.
    pub async fn unload(
        &self,
        id: Uuid,
        target: UnloadTarget,
    ) -> Result<Vec<Arc<SkillRecord>>, SkillError> {
        let session = self.session(id)?;
        let mut state = session.lock().await;

        match target {
            UnloadTarget::All => state.active.clear(),
            UnloadTarget::Names(names) => state
                .active
                .retain(|def| !names.iter().any(|n| def.matches_reference(n))),
        }

        tracing::debug!(session_id = %id, active = state.active.len(), "Skills unloaded");
        Ok(self.records_for(id, &state.active))
    }

    pub async fn get_active(&self, id: Uuid) -> Result<Vec<SkillDef>, SkillError> {
        let session = self.session(id)?;
        let state = session.lock().await;
        Ok(state.active.clone())
    }

    /// The active list resolved to records, in active order.
    pub async fn active_records(&self, id: Uuid) -> Result<Vec<Arc<SkillRecord>>, SkillError> {
        let session = self.session(id)?;
        let state = session.lock().await;
        Ok(self.records_for(id, &state.active))
    }

    pub async fn session_info(&self, id: Uuid) -> Result<SessionInfo, SkillError> {
        let session = self.session(id)?;
        let state = session.lock().await;
        Ok(state.info())
    }

    /// The visibility filter the session was created with.
    pub async fn filter(&self, id: Uuid) -> Result<SkillFilter, SkillError> {
        let session = self.session(id)?;
        let state = session.lock().await;
        Ok(state.filter.clone())
    }

    fn session(&self, id: Uuid) -> Result<Arc<Mutex<SessionState>>, SkillError> {
        self.sessions
            .get(&id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(SkillError::SessionNotFound(id))
    }

    fn resolve_loadable(
        &self,
        names: &[String],
        filter: &SkillFilter,
    ) -> Result<Vec<SkillDef>, SkillError> {
        names
            .iter()
            .map(|name| {
                let record = self.registry.resolve_name(name, filter)?;
                if !record.enabled {
                    return Err(SkillError::Disabled {
                        name: record.def.name.clone(),
                    });
                }
                Ok(record.def.clone())
            })
            .collect()
    }

    fn records_for(&self, id: Uuid, active: &[SkillDef]) -> Vec<Arc<SkillRecord>> {
        active
            .iter()
            .filter_map(|def| match self.registry.resolve(def) {
                Ok(record) => Some(record),
                Err(_) => {
                    tracing::warn!(session_id = %id, skill = %def, "Active skill no longer indexed");
                    None
                }
            })
            .collect()
    }
}

/// Combine the current list with newly resolved keys, first occurrence wins.
fn merge(current: &[SkillDef], resolved: Vec<SkillDef>, mode: LoadMode) -> Vec<SkillDef> {
    let mut next: Vec<SkillDef> = match mode {
        LoadMode::Replace => Vec::with_capacity(resolved.len()),
        LoadMode::Add => current.to_vec(),
    };
    for def in resolved {
        if !next.contains(&def) {
            next.push(def);
        }
    }
    next
}

fn check_cap(requested: usize, max: usize) -> Result<(), SkillError> {
    if requested > max {
        return Err(SkillError::CapExceeded { requested, max });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skill::registry::fixtures::{embedded_registry, LenHasher, ScriptedSource};
    use skillrt_types::skill::SkillKind;

    fn s(items: &[&str]) -> Vec<String> {
        items.iter().map(|i| (*i).to_owned()).collect()
    }

    async fn active_names(manager: &SessionManager, id: Uuid) -> Vec<String> {
        manager
            .get_active(id)
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.name)
            .collect()
    }

    async fn manager(skills: &[&str]) -> SessionManager {
        SessionManager::new(embedded_registry(skills).await, 8)
    }

    #[tokio::test]
    async fn replace_sets_exact_list() {
        let m = manager(&["a", "b", "c"]).await;
        let id = m.create_session(None, &[], SkillFilter::all()).unwrap().session_id;

        m.load(id, &s(&["a", "b"]), LoadMode::Replace).await.unwrap();
        m.load(id, &s(&["b", "c"]), LoadMode::Replace).await.unwrap();

        assert_eq!(active_names(&m, id).await, s(&["b", "c"]));
    }

    #[tokio::test]
    async fn add_deduplicates() {
        let m = manager(&["a", "b", "c"]).await;
        let id = m.create_session(None, &[], SkillFilter::all()).unwrap().session_id;

        m.load(id, &s(&["a", "b"]), LoadMode::Replace).await.unwrap();
        m.load(id, &s(&["b", "c", "c"]), LoadMode::Add).await.unwrap();

        assert_eq!(active_names(&m, id).await, s(&["a", "b", "c"]));
    }

    #[tokio::test]
    async fn replace_collapses_duplicate_names() {
        let m = manager(&["a", "b"]).await;
        let id = m.create_session(None, &[], SkillFilter::all()).unwrap().session_id;

        let receipt = m
            .load(id, &s(&["b", "a", "b", "embedded:a"]), LoadMode::Replace)
            .await
            .unwrap();

        let got: Vec<&str> = receipt.iter().map(|r| r.name()).collect();
        assert_eq!(got, vec!["b", "a"]);
    }

    #[tokio::test]
    async fn cap_rejection_is_atomic() {
        let m = manager(&["a", "b", "c"]).await;
        let id = m
            .create_session(Some(2), &s(&["a", "b"]), SkillFilter::all())
            .unwrap()
            .session_id;

        let err = m.load(id, &s(&["c"]), LoadMode::Add).await.unwrap_err();
        assert_eq!(err, SkillError::CapExceeded { requested: 3, max: 2 });
        assert_eq!(active_names(&m, id).await, s(&["a", "b"]));

        let err = m
            .load(id, &s(&["a", "b", "c"]), LoadMode::Replace)
            .await
            .unwrap_err();
        assert!(matches!(err, SkillError::CapExceeded { .. }));
        assert_eq!(active_names(&m, id).await, s(&["a", "b"]));
    }

    #[tokio::test]
    async fn unknown_name_fails_whole_call() {
        let m = manager(&["a", "b"]).await;
        let id = m
            .create_session(None, &s(&["a"]), SkillFilter::all())
            .unwrap()
            .session_id;

        let err = m
            .load(id, &s(&["b", "nope"]), LoadMode::Add)
            .await
            .unwrap_err();
        assert_eq!(err, SkillError::NotFound { name: "nope".into() });
        assert_eq!(active_names(&m, id).await, s(&["a"]));
    }

    #[tokio::test]
    async fn disabled_skill_cannot_load() {
        let source = ScriptedSource::new("fs", SkillKind::Filesystem);
        source.set_skills(&[("legacy", "old"), ("pdf", "p")]);
        let registry = Arc::new(
            SkillRegistry::new(vec![source], Box::new(LenHasher))
                .with_disabled(["legacy".to_owned()]),
        );
        registry.refresh().await;
        let m = SessionManager::new(registry, 4);
        let id = m.create_session(None, &[], SkillFilter::all()).unwrap().session_id;

        let err = m
            .load(id, &s(&["pdf", "legacy"]), LoadMode::Replace)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "disabled");
        assert!(active_names(&m, id).await.is_empty());
    }

    #[tokio::test]
    async fn unload_by_name_and_all() {
        let m = manager(&["a", "b", "c"]).await;
        let id = m
            .create_session(None, &s(&["a", "b", "c"]), SkillFilter::all())
            .unwrap()
            .session_id;

        m.unload(id, UnloadTarget::Names(s(&["b", "missing"])))
            .await
            .unwrap();
        assert_eq!(active_names(&m, id).await, s(&["a", "c"]));

        let remaining = m.unload(id, UnloadTarget::All).await.unwrap();
        assert!(remaining.is_empty());
        assert!(m.get_active(id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_session_validation() {
        let m = manager(&["a", "b"]).await;

        assert!(matches!(
            m.create_session(Some(0), &[], SkillFilter::all()),
            Err(SkillError::InvalidArgument(_))
        ));
        assert!(matches!(
            m.create_session(Some(1), &s(&["a", "b"]), SkillFilter::all()),
            Err(SkillError::CapExceeded { .. })
        ));
        assert!(m.list_sessions().is_empty());

        let info = m.create_session(None, &s(&["b", "a"]), SkillFilter::all()).unwrap();
        assert_eq!(info.max_active, 8);
        assert_eq!(info.active_skills.len(), 2);
        assert_eq!(m.list_sessions(), vec![info.session_id]);
    }

    #[tokio::test]
    async fn closed_session_rejects_mutation() {
        let m = manager(&["a"]).await;
        let id = m.create_session(None, &[], SkillFilter::all()).unwrap().session_id;

        assert!(m.close_session(id));
        assert!(!m.close_session(id));
        assert_eq!(
            m.load(id, &s(&["a"]), LoadMode::Add).await.unwrap_err(),
            SkillError::SessionNotFound(id)
        );
        assert!(m.unload(id, UnloadTarget::All).await.is_err());
    }

    #[tokio::test]
    async fn session_filter_hides_skills() {
        let m = manager(&["alpha", "beta"]).await;
        let filter = SkillFilter::all().with_name_prefix("al");
        let id = m.create_session(None, &[], filter).unwrap().session_id;

        assert!(m.load(id, &s(&["alpha"]), LoadMode::Add).await.is_ok());
        assert!(matches!(
            m.load(id, &s(&["beta"]), LoadMode::Add).await,
            Err(SkillError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn unavailable_registry_is_a_hard_error() {
        let source = ScriptedSource::new("fs", SkillKind::Filesystem);
        let registry = Arc::new(SkillRegistry::new(vec![source], Box::new(LenHasher)));
        let m = SessionManager::new(registry, 4);

        assert!(matches!(
            m.create_session(None, &[], SkillFilter::all()),
            Err(SkillError::SourceUnavailable { .. })
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_adds_respect_cap() {
        let m = Arc::new(manager(&["a", "b", "c", "d", "e", "f"]).await);
        let id = m
            .create_session(Some(3), &[], SkillFilter::all())
            .unwrap()
            .session_id;

        let handles: Vec<_> = ["a", "b", "c", "d", "e", "f"]
            .into_iter()
            .map(|name| {
                let m = Arc::clone(&m);
                tokio::spawn(async move { m.load(id, &[name.to_owned()], LoadMode::Add).await })
            })
            .collect();

        let mut ok = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                ok += 1;
            }
        }
        assert_eq!(ok, 3);
        assert_eq!(m.get_active(id).await.unwrap().len(), 3);
    }
}
