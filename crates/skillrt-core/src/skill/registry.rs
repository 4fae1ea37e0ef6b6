//! The skill registry: an immutable, atomically swapped index of every
//! skill the configured sources provide.
//!
//! Readers clone an `Arc<RegistrySnapshot>` and never wait on a scan.
//! `refresh` rebuilds the snapshot from all sources, keeping the previous
//! records of any source that fails.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::Serialize;
use skillrt_types::error::SkillError;
use skillrt_types::presence::PresenceObservation;
use skillrt_types::skill::{SkillDef, SkillFilter, SkillKind, SkillRecord};

use crate::service::hash::ContentHasher;
use crate::skill::manifest::load_skill_md;
use crate::skill::source::{SkillSource, SourceEntry};

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Records contributed by one source, sorted by name then location.
#[derive(Debug, Clone, Default)]
pub struct SourceSlot {
    pub source_id: String,
    pub records: Vec<Arc<SkillRecord>>,
    /// Error from the most recent scan, if it failed.
    pub last_error: Option<String>,
}

/// One immutable generation of the registry.
#[derive(Debug, Default)]
pub struct RegistrySnapshot {
    slots: Vec<SourceSlot>,
    ordered: Vec<Arc<SkillRecord>>,
    index: HashMap<SkillDef, Arc<SkillRecord>>,
    generation: u64,
    usable: bool,
}

impl RegistrySnapshot {
    fn build(slots: Vec<SourceSlot>, generation: u64, usable: bool) -> Self {
        let mut ordered = Vec::new();
        let mut index = HashMap::new();
        for slot in &slots {
            for record in &slot.records {
                if index.contains_key(&record.def) {
                    tracing::debug!(
                        skill = %record.def,
                        source = %slot.source_id,
                        "Skill already provided by an earlier source, skipping"
                    );
                    continue;
                }
                index.insert(record.def.clone(), Arc::clone(record));
                ordered.push(Arc::clone(record));
            }
        }
        Self {
            slots,
            ordered,
            index,
            generation,
            usable,
        }
    }

    /// All records in list order.
    pub fn records(&self) -> &[Arc<SkillRecord>] {
        &self.ordered
    }

    pub fn slots(&self) -> &[SourceSlot] {
        &self.slots
    }

    pub fn get(&self, def: &SkillDef) -> Option<&Arc<SkillRecord>> {
        self.index.get(def)
    }

    /// Incremented on every swap. Zero until the first refresh lands.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Refresh report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct SourceOutcome {
    pub source_id: String,
    /// Records indexed from this source after the refresh.
    pub skills: usize,
    /// Manifests that were found but omitted.
    pub parse_errors: Vec<String>,
    /// Set when the whole source was unavailable.
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DefObservation {
    pub def: SkillDef,
    pub observation: PresenceObservation,
}

/// Outcome of one [`SkillRegistry::refresh`] call.
#[derive(Debug, Clone, Serialize)]
pub struct RefreshReport {
    pub generation: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub sources: Vec<SourceOutcome>,
    pub observations: Vec<DefObservation>,
    /// True when every source failed and the previous snapshot was kept.
    pub failed: bool,
}

impl RefreshReport {
    /// The first unavailable source, as an error.
    pub fn first_error(&self) -> Option<SkillError> {
        self.sources.iter().find_map(|outcome| {
            outcome
                .error
                .as_ref()
                .map(|reason| SkillError::SourceUnavailable {
                    source_id: outcome.source_id.clone(),
                    reason: reason.clone(),
                })
        })
    }

    pub fn failed_sources(&self) -> usize {
        self.sources.iter().filter(|s| s.error.is_some()).count()
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Indexes skill sources into an atomically swapped snapshot.
///
/// Constructed once and shared as `Arc<SkillRegistry>`.
pub struct SkillRegistry {
    sources: Vec<Arc<dyn SkillSource>>,
    hasher: Box<dyn ContentHasher>,
    disabled: HashSet<String>,
    snapshot: RwLock<Arc<RegistrySnapshot>>,
    refresh_lock: tokio::sync::Mutex<()>,
}

impl SkillRegistry {
    pub fn new(sources: Vec<Arc<dyn SkillSource>>, hasher: Box<dyn ContentHasher>) -> Self {
        let slots = sources
            .iter()
            .map(|s| SourceSlot {
                source_id: s.id().to_owned(),
                ..SourceSlot::default()
            })
            .collect();
        Self {
            sources,
            hasher,
            disabled: HashSet::new(),
            snapshot: RwLock::new(Arc::new(RegistrySnapshot::build(slots, 0, false))),
            refresh_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Mark skill names as administratively disabled.
    pub fn with_disabled(mut self, names: impl IntoIterator<Item = String>) -> Self {
        self.disabled.extend(names);
        self
    }

    pub fn source_ids(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.id().to_owned()).collect()
    }

    /// The current snapshot. Never blocks on a refresh.
    pub fn snapshot(&self) -> Arc<RegistrySnapshot> {
        let guard = self.snapshot.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    pub fn resolve(&self, def: &SkillDef) -> Result<Arc<SkillRecord>, SkillError> {
        self.snapshot()
            .get(def)
            .cloned()
            .ok_or_else(|| SkillError::NotFound {
                name: def.name.clone(),
            })
    }

    /// Records matching `filter`, in source order, then name, then location.
    pub fn list(&self, filter: &SkillFilter) -> Vec<Arc<SkillRecord>> {
        self.snapshot()
            .records()
            .iter()
            .filter(|r| filter.matches(&r.def))
            .cloned()
            .collect()
    }

    /// Resolve `name` or `type:name` to the first visible record in list order.
    pub fn resolve_name(
        &self,
        reference: &str,
        filter: &SkillFilter,
    ) -> Result<Arc<SkillRecord>, SkillError> {
        self.snapshot()
            .records()
            .iter()
            .find(|r| r.def.matches_reference(reference) && filter.matches(&r.def))
            .cloned()
            .ok_or_else(|| SkillError::NotFound {
                name: reference.to_owned(),
            })
    }

    /// Fail unless some refresh has produced a usable snapshot.
    pub fn ensure_available(&self) -> Result<(), SkillError> {
        let snapshot = self.snapshot();
        if snapshot.usable {
            return Ok(());
        }

        let failed: Vec<&SourceSlot> = snapshot
            .slots
            .iter()
            .filter(|s| s.last_error.is_some())
            .collect();
        let reason = if failed.is_empty() {
            "no refresh has completed yet".to_owned()
        } else {
            failed
                .iter()
                .map(|s| format!("{}: {}", s.source_id, s.last_error.as_deref().unwrap_or("")))
                .collect::<Vec<_>>()
                .join("; ")
        };
        Err(SkillError::SourceUnavailable {
            source_id: "registry".to_owned(),
            reason,
        })
    }

    /// Re-scan every source and swap in a new snapshot.
    ///
    /// Refreshes are serialized. A failing source keeps its previous records
    /// and contributes `error` observations for them. If every source fails
    /// the snapshot is left untouched and the report is marked failed.
    pub async fn refresh(&self) -> RefreshReport {
        let _guard = self.refresh_lock.lock().await;
        let started_at = Utc::now();
        let previous = self.snapshot();

        let mut slots = Vec::with_capacity(self.sources.len());
        let mut outcomes = Vec::with_capacity(self.sources.len());
        let mut observations = Vec::new();

        for (i, source) in self.sources.iter().enumerate() {
            let prior = previous.slots.get(i).map(|s| s.records.as_slice()).unwrap_or(&[]);

            match scan_source(Arc::clone(source)).await {
                Ok(entries) => {
                    let (records, parse_errors) = self.index_entries(source.kind(), entries);

                    observations.extend(records.iter().map(|r| DefObservation {
                        def: r.def.clone(),
                        observation: PresenceObservation::Present,
                    }));
                    observations.extend(
                        prior
                            .iter()
                            .filter(|old| !records.iter().any(|r| r.def == old.def))
                            .map(|old| DefObservation {
                                def: old.def.clone(),
                                observation: PresenceObservation::Missing,
                            }),
                    );

                    tracing::debug!(
                        source = %source.id(),
                        skills = records.len(),
                        skipped = parse_errors.len(),
                        "Indexed skill source"
                    );
                    outcomes.push(SourceOutcome {
                        source_id: source.id().to_owned(),
                        skills: records.len(),
                        parse_errors,
                        error: None,
                    });
                    slots.push(SourceSlot {
                        source_id: source.id().to_owned(),
                        records,
                        last_error: None,
                    });
                }
                Err(e) => {
                    let reason = e.to_string();
                    tracing::warn!(source = %source.id(), error = %reason, "Skill source unavailable");

                    observations.extend(prior.iter().map(|old| DefObservation {
                        def: old.def.clone(),
                        observation: PresenceObservation::Error(reason.clone()),
                    }));
                    outcomes.push(SourceOutcome {
                        source_id: source.id().to_owned(),
                        skills: prior.len(),
                        parse_errors: Vec::new(),
                        error: Some(reason.clone()),
                    });
                    slots.push(SourceSlot {
                        source_id: source.id().to_owned(),
                        records: prior.to_vec(),
                        last_error: Some(reason),
                    });
                }
            }
        }

        // When every source failed the slots hold exactly the previous
        // records; only their errors change, so generation and usability stay.
        let failed = !self.sources.is_empty() && outcomes.iter().all(|o| o.error.is_some());
        let (generation, usable) = if failed {
            tracing::error!("Every skill source failed, keeping previous snapshot");
            (previous.generation, previous.usable)
        } else {
            (previous.generation + 1, true)
        };
        let next = Arc::new(RegistrySnapshot::build(slots, generation, usable));
        {
            let mut guard = self.snapshot.write().unwrap_or_else(|e| e.into_inner());
            *guard = next;
        }

        RefreshReport {
            generation,
            started_at,
            finished_at: Utc::now(),
            sources: outcomes,
            observations,
            failed,
        }
    }

    /// Parse a source's entries into sorted records, collecting parse errors.
    fn index_entries(
        &self,
        kind: SkillKind,
        entries: Vec<SourceEntry>,
    ) -> (Vec<Arc<SkillRecord>>, Vec<String>) {
        let mut records: Vec<Arc<SkillRecord>> = Vec::with_capacity(entries.len());
        let mut parse_errors = Vec::new();

        for entry in entries {
            match self.build_record(kind, entry) {
                Ok(record) => {
                    if records.iter().any(|r| r.def == record.def) {
                        continue;
                    }
                    records.push(Arc::new(record));
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping malformed skill manifest");
                    parse_errors.push(e.to_string());
                }
            }
        }

        records.sort_by(|a, b| {
            a.def
                .name
                .cmp(&b.def.name)
                .then_with(|| a.def.location.cmp(&b.def.location))
        });
        (records, parse_errors)
    }

    fn build_record(&self, kind: SkillKind, entry: SourceEntry) -> Result<SkillRecord, SkillError> {
        let parsed = load_skill_md(&entry.content, entry.dir_name.as_deref()).map_err(|e| {
            SkillError::ParseError {
                location: entry.location.clone(),
                reason: format!("{e:#}"),
            }
        })?;

        let digest = self.hasher.compute_hash(&parsed.body);
        let enabled =
            !parsed.manifest.disabled && !self.disabled.contains(&parsed.manifest.name);

        Ok(SkillRecord {
            def: SkillDef::new(kind, parsed.manifest.name.clone(), entry.location),
            description: parsed.manifest.description,
            root_dir: entry.root_dir,
            properties: parsed.properties,
            instructions: parsed.body,
            digest,
            enabled,
        })
    }
}

/// Run a source's blocking scan off the async worker threads.
async fn scan_source(source: Arc<dyn SkillSource>) -> Result<Vec<SourceEntry>, SkillError> {
    let id = source.id().to_owned();
    tokio::task::spawn_blocking(move || source.scan())
        .await
        .unwrap_or_else(|join_err| {
            Err(SkillError::SourceUnavailable {
                source_id: id,
                reason: format!("scan task failed: {join_err}"),
            })
        })
}

// ---------------------------------------------------------------------------
// Test fixtures
// ---------------------------------------------------------------------------
