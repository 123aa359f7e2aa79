use crate::commit::{self, BeginOutcome, CommitPhase, CommitTransaction};
use crate::detect::{DetectOutcome, StabilityDetector};
use crate::host::{Candidate, HostPage, NodeId};
use crate::overlay::{self, OverlayState};
use crate::relay;
use crate::settings::Settings;
use crate::watcher::{self, WatchVerdict};
use std::time::Instant;

/// The currently bound host elements. Exactly one exists at a time, owned
/// by the [`Engine`]; the generation stamps every deferred effect so work
/// computed against a superseded binding is discarded before it lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostHandle {
    pub editable: NodeId,
    pub action: NodeId,
    pub container: NodeId,
    pub generation: u64,
}

/// Coordinator for the whole overlay lifecycle: discovery, surface sync,
/// input relay, commit hand-off, and replacement recovery.
///
/// Single-threaded and cooperative. The embedder funnels its notification
/// sources into the `on_*` entry points and pumps [`Engine::tick`] from a
/// timer; the engine itself never blocks, sleeps, or spawns.
pub struct Engine {
    settings: Settings,
    generation: u64,
    detector: Option<StabilityDetector>,
    handle: Option<HostHandle>,
    overlay: Option<OverlayState>,
    transaction: Option<CommitTransaction>,
    last_safety_sync: Option<Instant>,
}

impl Engine {
    /// Build the engine and arm the initial discovery attempt.
    pub fn new(settings: Settings, now: Instant) -> Self {
        let detector = StabilityDetector::new(settings.candidate_query(), &settings, now);
        tracing::info!(relay = %settings.relay_policy, "engine started; waiting for the composer");
        Self {
            settings,
            generation: 0,
            detector: Some(detector),
            handle: None,
            overlay: None,
            transaction: None,
            last_safety_sync: None,
        }
    }

    /// Timer pump: discovery polling, safety-net geometry sync, host
    /// reverse-sync, and commit stepping all hang off this.
    pub fn tick(&mut self, host: &mut dyn HostPage, now: Instant) {
        if let Some(mut detector) = self.detector.take() {
            match detector.poll(host, now) {
                DetectOutcome::Pending => self.detector = Some(detector),
                DetectOutcome::Found(candidate) => self.bind(host, candidate, now),
                DetectOutcome::TimedOut => {
                    // Terminal for this attempt; only new subtree activity
                    // arms the next one.
                    tracing::warn!("no stable composer appeared before the discovery timeout");
                }
            }
        }

        let (Some(handle), Some(state)) = (self.handle.as_ref(), self.overlay.as_mut()) else {
            return;
        };

        let safety_due = self
            .last_safety_sync
            .map_or(true, |last| {
                now.duration_since(last) >= self.settings.sync_safety_interval()
            });
        if safety_due {
            self.last_safety_sync = Some(now);
            overlay::sync(host, state, handle, &self.settings, now, true);
        }

        if let Some(mut tx) = self.transaction.take() {
            if tx.generation != handle.generation {
                tracing::warn!(
                    tx_generation = tx.generation,
                    bound_generation = handle.generation,
                    "dropping commit transaction from a superseded binding"
                );
                return;
            }
            commit::step(&mut tx, host, state, handle, &self.settings, now);
            match tx.phase {
                CommitPhase::Done => {
                    tracing::info!(chars = tx.text.len(), "message handed off to the host");
                }
                CommitPhase::Aborted => {
                    tracing::warn!("commit aborted; buffer kept for retry");
                }
                _ => self.transaction = Some(tx),
            }
        } else {
            relay::reverse_sync(host, state, handle);
        }
    }

    /// Multiplexed layout-relevant notification (resize, scroll, attribute
    /// mutation). Frame-throttled internally.
    pub fn on_layout_change(&mut self, host: &mut dyn HostPage, now: Instant) {
        if let (Some(handle), Some(state)) = (self.handle.as_ref(), self.overlay.as_mut()) {
            overlay::sync(host, state, handle, &self.settings, now, false);
        }
    }

    /// Structural mutation of the host subtree.
    pub fn on_subtree_mutation(&mut self, host: &mut dyn HostPage, now: Instant) {
        let query = self.settings.candidate_query();
        match self.handle.as_ref() {
            Some(handle) => match watcher::inspect(host, handle, &query) {
                WatchVerdict::Unchanged | WatchVerdict::NoCandidate => {}
                WatchVerdict::Replaced(_) => {
                    self.invalidate(host);
                    self.arm_detector(now);
                }
            },
            None => {
                if self.detector.is_none() {
                    tracing::debug!("subtree activity while unbound; arming a discovery attempt");
                    self.arm_detector(now);
                }
            }
        }
    }

    /// The user edited the overlay surface.
    pub fn on_overlay_edit(&mut self, host: &mut dyn HostPage, _now: Instant) {
        if let (Some(handle), Some(state)) = (self.handle.as_ref(), self.overlay.as_mut()) {
            relay::on_overlay_edit(host, state, handle, self.settings.relay_policy);
        }
    }

    /// The user asked to send (overlay submit, or an interceptor tap).
    pub fn on_send_gesture(&mut self, host: &mut dyn HostPage, now: Instant) {
        let (Some(handle), Some(state)) = (self.handle.as_ref(), self.overlay.as_mut()) else {
            tracing::debug!("send gesture with no bound composer; ignored");
            return;
        };
        if self.transaction.is_some() {
            // One transaction at a time; a queued gesture could replay
            // stale text after the host state has moved on.
            tracing::info!("send gesture while a commit is in flight; ignored");
            return;
        }
        match commit::begin(host, state, handle, &self.settings, now) {
            BeginOutcome::Started(tx) => self.transaction = Some(tx),
            BeginOutcome::EmptyBuffer => {}
        }
    }

    fn bind(&mut self, host: &mut dyn HostPage, candidate: Candidate, now: Instant) {
        self.generation += 1;
        let handle = HostHandle {
            editable: candidate.editable,
            action: candidate.action,
            container: candidate.container,
            generation: self.generation,
        };
        let mut state = overlay::create(host, &handle, self.overlay.take(), &self.settings);
        overlay::sync(host, &mut state, &handle, &self.settings, now, true);
        tracing::info!(
            editable = handle.editable,
            action = handle.action,
            generation = handle.generation,
            "composer bound; overlay active"
        );
        self.handle = Some(handle);
        self.overlay = Some(state);
        self.last_safety_sync = Some(now);
    }

    fn invalidate(&mut self, host: &mut dyn HostPage) {
        if self.transaction.take().is_some() {
            tracing::warn!("binding lost mid-commit; transaction abandoned");
        }
        overlay::destroy(host, self.overlay.take());
        if let Some(handle) = self.handle.take() {
            tracing::info!(editable = handle.editable, "composer binding invalidated");
        }
        self.last_safety_sync = None;
    }

    fn arm_detector(&mut self, now: Instant) {
        self.detector = Some(StabilityDetector::new(
            self.settings.candidate_query(),
            &self.settings,
            now,
        ));
    }

    /// Currently bound composer, if any.
    pub fn handle(&self) -> Option<&HostHandle> {
        self.handle.as_ref()
    }

    /// Live overlay state, if bound.
    pub fn overlay(&self) -> Option<&OverlayState> {
        self.overlay.as_ref()
    }

    /// Phase of the in-flight commit, if any.
    pub fn commit_phase(&self) -> Option<CommitPhase> {
        self.transaction.as_ref().map(|tx| tx.phase)
    }

    /// Whether a discovery attempt is currently running.
    pub fn detecting(&self) -> bool {
        self.detector.is_some()
    }
}
