//! Optimistic reaction engine.
//!
//! One engine per reactable entity. State moves
//! `Uninitialized -> Hydrating -> Idle -> Syncing -> Idle`; a failed sync
//! returns to `Idle` with the exact pre-toggle summary. While `Syncing` every
//! further mutation is dropped, so at most one like/unlike request per
//! entity is ever outstanding.
//!
//! Hydration paints from the durable cache before the server answers. The
//! cache is then written with the optimistic value as soon as a toggle
//! starts, and with server truth (or the restored snapshot) when it settles.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use memeshare_shared::{EntityRef, ReactionSummary};

use crate::cache::ReactionCache;
use crate::repository::ReactionRepository;
use crate::{Outcome, ReactionConfig, Skip};

pub const TRACING_TARGET: &str = "memeshare_sync::reaction";

/// Called with the settled summary after hydration or a confirmed toggle.
pub type SettleCallback = Arc<dyn Fn(EntityRef, &ReactionSummary) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionPhase {
    Uninitialized,
    Hydrating,
    Idle,
    Syncing,
}

#[derive(Debug)]
struct EngineState {
    phase: ReactionPhase,
    summary: ReactionSummary,
    /// Summary shown before the in-flight toggle, restored on failure.
    rollback: Option<ReactionSummary>,
    detached: bool,
}

pub struct ReactionEngine {
    entity: EntityRef,
    reaction_kind: String,
    repo: Arc<dyn ReactionRepository>,
    cache: ReactionCache,
    on_settle: Option<SettleCallback>,
    state: Mutex<EngineState>,
}

impl fmt::Debug for ReactionEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReactionEngine")
            .field("entity", &self.entity)
            .field("state", &*self.lock())
            .finish_non_exhaustive()
    }
}

impl ReactionEngine {
    pub fn new(
        entity: EntityRef,
        repo: Arc<dyn ReactionRepository>,
        cache: ReactionCache,
        config: &ReactionConfig,
    ) -> Self {
        Self {
            entity,
            reaction_kind: config.reaction_kind.clone(),
            repo,
            cache,
            on_settle: None,
            state: Mutex::new(EngineState {
                phase: ReactionPhase::Uninitialized,
                summary: ReactionSummary::default(),
                rollback: None,
                detached: false,
            }),
        }
    }

    /// Starts from a summary the server already delivered, e.g. the one
    /// embedded in a comment page. The engine is immediately `Idle`.
    pub fn seeded(self, summary: ReactionSummary) -> Self {
        {
            let mut state = self.lock();
            state.summary = summary;
            state.phase = ReactionPhase::Idle;
        }
        self
    }

    pub fn on_settle(mut self, callback: SettleCallback) -> Self {
        self.on_settle = Some(callback);
        self
    }

    pub fn entity(&self) -> EntityRef {
        self.entity
    }

    pub fn summary(&self) -> ReactionSummary {
        self.lock().summary.clone()
    }

    pub fn phase(&self) -> ReactionPhase {
        self.lock().phase
    }

    pub fn is_syncing(&self) -> bool {
        self.phase() == ReactionPhase::Syncing
    }

    /// Marks the owning element gone. Late responses still reach the cache
    /// but no longer notify.
    pub fn detach(&self) {
        self.lock().detached = true;
    }

    fn lock(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self, summary: &ReactionSummary) {
        if let Some(callback) = &self.on_settle {
            callback(self.entity, summary);
        }
    }

    /// Paints the cached summary, then converges on the server's.
    pub async fn hydrate(&self) -> Outcome {
        let had_guess = {
            let mut state = self.lock();
            if matches!(
                state.phase,
                ReactionPhase::Syncing | ReactionPhase::Hydrating
            ) {
                return Skip::Busy.into();
            }
            let mut had_guess = state.phase == ReactionPhase::Idle;
            state.phase = ReactionPhase::Hydrating;
            if let Some(cached) = self.cache.load(self.entity) {
                state.summary = cached;
                had_guess = true;
            }
            had_guess
        };

        tracing::debug!(
            target: TRACING_TARGET,
            entity = %self.entity,
            "Hydrating reaction"
        );

        match self.repo.fetch_reaction(self.entity).await {
            Ok(counts) => {
                let summary = ReactionSummary::from_counts(&counts, &self.reaction_kind);
                let detached = {
                    let mut state = self.lock();
                    state.summary = summary.clone();
                    state.phase = ReactionPhase::Idle;
                    state.detached
                };
                self.cache.store(self.entity, &summary);
                if !detached {
                    self.notify(&summary);
                }
                Outcome::Done
            }
            Err(error) => {
                tracing::error!(
                    target: TRACING_TARGET,
                    entity = %self.entity,
                    error = %error,
                    "Failed to fetch reaction"
                );
                if error.is_not_found() {
                    // Entity deleted server-side; the cached guess is dead weight.
                    self.cache.clear(self.entity);
                    let mut state = self.lock();
                    state.summary = ReactionSummary::default();
                    state.phase = ReactionPhase::Uninitialized;
                } else {
                    self.lock().phase = if had_guess {
                        ReactionPhase::Idle
                    } else {
                        ReactionPhase::Uninitialized
                    };
                }
                error.into()
            }
        }
    }

    /// Flips the user's reaction.
    pub async fn toggle(&self) -> Outcome {
        self.mutate(None).await
    }

    /// Adds the reaction; only available while the user has not reacted.
    pub async fn react(&self) -> Outcome {
        self.mutate(Some(true)).await
    }

    async fn mutate(&self, only: Option<bool>) -> Outcome {
        let (target, previous) = {
            let mut state = self.lock();
            match state.phase {
                ReactionPhase::Syncing => {
                    tracing::debug!(
                        target: TRACING_TARGET,
                        entity = %self.entity,
                        "Reaction already syncing, dropping request"
                    );
                    return Skip::Busy.into();
                }
                ReactionPhase::Uninitialized | ReactionPhase::Hydrating => {
                    return Skip::NotReady.into();
                }
                ReactionPhase::Idle => {}
            }

            let previous = state.summary.clone();
            let turn_on = !previous.has_reacted;
            if only.is_some_and(|wanted| wanted != turn_on) {
                return Skip::AlreadyReacted.into();
            }

            let target = ReactionSummary {
                has_reacted: turn_on,
                reaction_kind: turn_on.then(|| self.reaction_kind.clone()),
                count: if turn_on {
                    previous.count + 1
                } else {
                    previous.count.saturating_sub(1)
                },
            };
            state.summary = target.clone();
            state.rollback = Some(previous.clone());
            state.phase = ReactionPhase::Syncing;
            (target, previous)
        };
        self.cache.store(self.entity, &target);

        tracing::debug!(
            target: TRACING_TARGET,
            entity = %self.entity,
            has_reacted = target.has_reacted,
            count = target.count,
            "Syncing reaction"
        );

        let result = if target.has_reacted {
            self.repo.like(self.entity).await
        } else {
            self.repo.unlike(self.entity).await
        };

        match result {
            Ok(counts) => {
                let summary = ReactionSummary::from_counts(&counts, &self.reaction_kind);
                let detached = {
                    let mut state = self.lock();
                    state.summary = summary.clone();
                    state.rollback = None;
                    state.phase = ReactionPhase::Idle;
                    state.detached
                };
                self.cache.store(self.entity, &summary);
                if !detached {
                    self.notify(&summary);
                }
                Outcome::Done
            }
            Err(error) => {
                tracing::error!(
                    target: TRACING_TARGET,
                    entity = %self.entity,
                    error = %error,
                    "Failed to sync reaction, rolling back"
                );
                {
                    let mut state = self.lock();
                    state.summary = state.rollback.take().unwrap_or(previous);
                    state.phase = ReactionPhase::Idle;
                    self.cache.store(self.entity, &state.summary);
                }
                error.into()
            }
        }
    }
}

/// One engine per entity, shared by every control rendered for it.
///
/// Re-rendering a control must not create a second engine: the new one
/// would start `Idle` while the old request is still outstanding.
#[derive(Default)]
pub struct ReactionRegistry {
    engines: Mutex<HashMap<EntityRef, Arc<ReactionEngine>>>,
}

impl fmt::Debug for ReactionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReactionRegistry")
            .field("engines", &self.len())
            .finish()
    }
}

impl ReactionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<EntityRef, Arc<ReactionEngine>>> {
        self.engines.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, entity: EntityRef) -> Option<Arc<ReactionEngine>> {
        self.lock().get(&entity).cloned()
    }

    /// Returns the registered engine, building one with `create` on first use.
    pub fn get_or_insert_with(
        &self,
        entity: EntityRef,
        create: impl FnOnce() -> ReactionEngine,
    ) -> Arc<ReactionEngine> {
        if let Some(engine) = self.get(entity) {
            return engine;
        }
        let engine = Arc::new(create());
        self.lock().entry(entity).or_insert(engine).clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Detaches every engine; called when their owner goes away.
    pub fn detach_all(&self) {
        for engine in self.lock().values() {
            engine.detach();
        }
    }
}
