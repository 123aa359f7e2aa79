use crate::engine::HostHandle;
use crate::host::{HostPage, NodeId};
use crate::overlay::{self, OverlayState};
use crate::settings::{ReadySignal, Settings};
use std::time::Instant;

/// Where an in-flight commit currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitPhase {
    /// Buffer written into the host composer, input notification dispatched.
    Injected,
    /// Waiting for the send control to become actionable.
    AwaitingActionable,
    /// Send control invoked.
    Clicked,
    /// Waiting for the host to signal it has finished processing the send.
    AwaitingReady,
    /// Completed; both surfaces cleared and the overlay unlocked.
    Done,
    /// Given up before clicking; buffer preserved, overlay unlocked.
    Aborted,
}

/// One hand-off of buffered text into the host. At most one exists per
/// bound composer; it never outlives its completion.
#[derive(Debug)]
pub struct CommitTransaction {
    pub text: String,
    pub started_at: Instant,
    pub phase: CommitPhase,
    /// Generation of the handle this transaction was started against.
    /// Effects are discarded once the binding moves on.
    pub generation: u64,
    deadline: Instant,
    retry_extended: bool,
}

impl CommitTransaction {
    pub fn is_terminal(&self) -> bool {
        matches!(self.phase, CommitPhase::Done | CommitPhase::Aborted)
    }
}

/// Outcome of a send gesture hitting the protocol.
#[derive(Debug)]
pub enum BeginOutcome {
    Started(CommitTransaction),
    /// Nothing to send. A no-op, not an error.
    EmptyBuffer,
}

/// Start a commit: inject the buffer into the host composer and lock the
/// overlay. The caller guarantees no other transaction is in flight.
pub fn begin(
    host: &mut dyn HostPage,
    state: &mut OverlayState,
    handle: &HostHandle,
    settings: &Settings,
    now: Instant,
) -> BeginOutcome {
    if state.buffered_text.is_empty() {
        tracing::debug!("send gesture with empty buffer; nothing to commit");
        return BeginOutcome::EmptyBuffer;
    }
    let text = state.buffered_text.clone();
    host.set_value_raw(handle.editable, &text);
    host.dispatch_input(handle.editable);
    state.last_host_value = text.clone();
    overlay::set_locked(host, state, true);
    tracing::debug!(chars = text.len(), "buffer injected into host composer");
    BeginOutcome::Started(CommitTransaction {
        text,
        started_at: now,
        phase: CommitPhase::Injected,
        generation: handle.generation,
        deadline: now + settings.actionable_timeout(),
        retry_extended: false,
    })
}

/// Advance the transaction by one step. Driven from the engine tick; every
/// wait is a deadline check, so a stalled host always resolves to `Done` or
/// `Aborted` rather than hanging.
pub fn step(
    tx: &mut CommitTransaction,
    host: &mut dyn HostPage,
    state: &mut OverlayState,
    handle: &HostHandle,
    settings: &Settings,
    now: Instant,
) {
    match tx.phase {
        CommitPhase::Injected => {
            tx.phase = CommitPhase::AwaitingActionable;
        }
        CommitPhase::AwaitingActionable => {
            if actionable(host, handle.action, settings) {
                host.click(handle.action);
                tx.phase = CommitPhase::Clicked;
            } else if now >= tx.deadline {
                if !tx.retry_extended {
                    tx.retry_extended = true;
                    tx.deadline = now + settings.actionable_timeout();
                    tracing::debug!("send control still not actionable; extending the wait once");
                } else {
                    // Clicking a non-actionable control risks tripping host
                    // error states; keep the user's text and stand down.
                    tracing::warn!("send control never became actionable; commit aborted");
                    overlay::set_locked(host, state, false);
                    tx.phase = CommitPhase::Aborted;
                }
            }
        }
        CommitPhase::Clicked => {
            tx.phase = CommitPhase::AwaitingReady;
            tx.deadline = now + settings.ready_timeout();
        }
        CommitPhase::AwaitingReady => {
            let ready = match settings.ready_signal {
                ReadySignal::Editable => host.is_editable(handle.editable),
                ReadySignal::Emptied => host.value(handle.editable).is_empty(),
            };
            if ready || now >= tx.deadline {
                if !ready {
                    tracing::debug!("host never signalled readiness; treating the send as done");
                }
                finish(host, state, handle);
                tx.phase = CommitPhase::Done;
            }
        }
        CommitPhase::Done | CommitPhase::Aborted => {}
    }
}

/// The message is on its way: clear both surfaces and hand the overlay back.
fn finish(host: &mut dyn HostPage, state: &mut OverlayState, handle: &HostHandle) {
    state.buffered_text.clear();
    host.set_overlay_text(state.node, "");
    host.set_value_raw(handle.editable, "");
    host.dispatch_input(handle.editable);
    state.last_host_value.clear();
    overlay::set_locked(host, state, false);
}

fn actionable(host: &dyn HostPage, action: NodeId, settings: &Settings) -> bool {
    host.is_attached(action)
        && !host.is_disabled(action)
        && host.rendered_opacity(action) >= settings.actionable_opacity_min
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay;
    use crate::sim::SimPage;
    use std::time::Duration;

    fn setup() -> (SimPage, HostHandle, OverlayState) {
        let mut page = SimPage::new();
        let (editable, action) = page.install_composer("Type a message", "Send message");
        let handle = HostHandle {
            editable,
            action,
            container: page.container(),
            generation: 1,
        };
        let state = overlay::create(&mut page, &handle, None, &Settings::default());
        (page, handle, state)
    }

    fn typed(page: &mut SimPage, state: &mut OverlayState, text: &str) {
        page.user_types(state.node, text);
        state.buffered_text = text.to_string();
    }

    #[test]
    fn empty_buffer_is_a_no_op() {
        let settings = Settings::default();
        let (mut page, handle, mut state) = setup();
        let outcome = begin(&mut page, &mut state, &handle, &settings, Instant::now());
        assert!(matches!(outcome, BeginOutcome::EmptyBuffer));
        assert!(!state.locked);
        assert_eq!(page.clicks_on(handle.action), 0);
    }

    #[test]
    fn injection_locks_and_writes_through_the_raw_pathway() {
        let settings = Settings::default();
        let (mut page, handle, mut state) = setup();
        typed(&mut page, &mut state, "hello");
        let outcome = begin(&mut page, &mut state, &handle, &settings, Instant::now());
        let tx = match outcome {
            BeginOutcome::Started(tx) => tx,
            other => panic!("expected a started transaction, got {other:?}"),
        };
        assert_eq!(tx.phase, CommitPhase::Injected);
        assert!(state.locked);
        assert_eq!(page.value(handle.editable), "hello");
        assert_eq!(page.raw_writes_on(handle.editable), 1);
        assert_eq!(page.input_events_on(handle.editable), 1);
    }

    #[test]
    fn waits_for_the_send_control_then_clicks() {
        let settings = Settings::default();
        let (mut page, handle, mut state) = setup();
        page.set_action_disabled(true);
        typed(&mut page, &mut state, "hello");
        let t0 = Instant::now();
        let mut tx = match begin(&mut page, &mut state, &handle, &settings, t0) {
            BeginOutcome::Started(tx) => tx,
            other => panic!("unexpected {other:?}"),
        };
        step(&mut tx, &mut page, &mut state, &handle, &settings, t0);
        assert_eq!(tx.phase, CommitPhase::AwaitingActionable);
        step(
            &mut tx,
            &mut page,
            &mut state,
            &handle,
            &settings,
            t0 + Duration::from_millis(100),
        );
        assert_eq!(tx.phase, CommitPhase::AwaitingActionable);
        assert_eq!(page.clicks_on(handle.action), 0);

        // Host enables the button 150ms in, well inside the 700ms window.
        page.set_action_disabled(false);
        step(
            &mut tx,
            &mut page,
            &mut state,
            &handle,
            &settings,
            t0 + Duration::from_millis(150),
        );
        assert_eq!(tx.phase, CommitPhase::Clicked);
        assert_eq!(page.clicks_on(handle.action), 1);
    }

    #[test]
    fn completes_once_the_host_is_editable_again() {
        let settings = Settings::default();
        let (mut page, handle, mut state) = setup();
        typed(&mut page, &mut state, "hello");
        let t0 = Instant::now();
        let mut tx = match begin(&mut page, &mut state, &handle, &settings, t0) {
            BeginOutcome::Started(tx) => tx,
            other => panic!("unexpected {other:?}"),
        };
        for ms in [0, 10, 20] {
            step(
                &mut tx,
                &mut page,
                &mut state,
                &handle,
                &settings,
                t0 + Duration::from_millis(ms),
            );
        }
        assert_eq!(tx.phase, CommitPhase::AwaitingReady);
        // Host goes busy, then returns the composer to an editable state.
        page.set_composer_editable(false);
        step(
            &mut tx,
            &mut page,
            &mut state,
            &handle,
            &settings,
            t0 + Duration::from_millis(200),
        );
        assert_eq!(tx.phase, CommitPhase::AwaitingReady);
        page.set_composer_editable(true);
        step(
            &mut tx,
            &mut page,
            &mut state,
            &handle,
            &settings,
            t0 + Duration::from_millis(400),
        );
        assert_eq!(tx.phase, CommitPhase::Done);
        assert_eq!(state.buffered_text, "");
        assert_eq!(page.value(handle.editable), "");
        assert_eq!(page.overlay_text(state.node), "");
        assert!(!state.locked);
    }

    #[test]
    fn never_clicks_a_control_that_stays_disabled() {
        let settings = Settings::default();
        let (mut page, handle, mut state) = setup();
        page.set_action_disabled(true);
        typed(&mut page, &mut state, "hello");
        let t0 = Instant::now();
        let mut tx = match begin(&mut page, &mut state, &handle, &settings, t0) {
            BeginOutcome::Started(tx) => tx,
            other => panic!("unexpected {other:?}"),
        };
        // Pump well past the window plus the single retry extension.
        let mut at = 0u64;
        while !tx.is_terminal() && at < 3_000 {
            step(
                &mut tx,
                &mut page,
                &mut state,
                &handle,
                &settings,
                t0 + Duration::from_millis(at),
            );
            at += 50;
        }
        assert_eq!(tx.phase, CommitPhase::Aborted);
        assert_eq!(page.clicks_on(handle.action), 0);
        assert_eq!(state.buffered_text, "hello");
        assert!(!state.locked);
    }

    #[test]
    fn low_opacity_counts_as_not_actionable() {
        let settings = Settings::default();
        let (mut page, handle, mut state) = setup();
        page.set_action_opacity(0.2);
        typed(&mut page, &mut state, "hello");
        let t0 = Instant::now();
        let mut tx = match begin(&mut page, &mut state, &handle, &settings, t0) {
            BeginOutcome::Started(tx) => tx,
            other => panic!("unexpected {other:?}"),
        };
        step(&mut tx, &mut page, &mut state, &handle, &settings, t0);
        step(
            &mut tx,
            &mut page,
            &mut state,
            &handle,
            &settings,
            t0 + Duration::from_millis(50),
        );
        assert_eq!(tx.phase, CommitPhase::AwaitingActionable);
        assert_eq!(page.clicks_on(handle.action), 0);
    }

    #[test]
    fn readiness_timeout_is_best_effort_success() {
        let settings = Settings {
            ready_timeout_ms: 1_000,
            ..Settings::default()
        };
        let (mut page, handle, mut state) = setup();
        typed(&mut page, &mut state, "hello");
        let t0 = Instant::now();
        let mut tx = match begin(&mut page, &mut state, &handle, &settings, t0) {
            BeginOutcome::Started(tx) => tx,
            other => panic!("unexpected {other:?}"),
        };
        for ms in [0, 10, 20] {
            step(
                &mut tx,
                &mut page,
                &mut state,
                &handle,
                &settings,
                t0 + Duration::from_millis(ms),
            );
        }
        assert_eq!(tx.phase, CommitPhase::AwaitingReady);
        // Composer stays busy past the whole window.
        page.set_composer_editable(false);
        step(
            &mut tx,
            &mut page,
            &mut state,
            &handle,
            &settings,
            t0 + Duration::from_millis(1_200),
        );
        assert_eq!(tx.phase, CommitPhase::Done);
        assert_eq!(state.buffered_text, "");
        assert!(!state.locked);
    }

    #[test]
    fn emptied_signal_completes_when_the_host_clears() {
        let settings = Settings {
            ready_signal: ReadySignal::Emptied,
            ..Settings::default()
        };
        let (mut page, handle, mut state) = setup();
        typed(&mut page, &mut state, "hello");
        let t0 = Instant::now();
        let mut tx = match begin(&mut page, &mut state, &handle, &settings, t0) {
            BeginOutcome::Started(tx) => tx,
            other => panic!("unexpected {other:?}"),
        };
        for ms in [0, 10, 20] {
            step(
                &mut tx,
                &mut page,
                &mut state,
                &handle,
                &settings,
                t0 + Duration::from_millis(ms),
            );
        }
        assert_eq!(tx.phase, CommitPhase::AwaitingReady);
        // Value still present: not ready yet.
        step(
            &mut tx,
            &mut page,
            &mut state,
            &handle,
            &settings,
            t0 + Duration::from_millis(100),
        );
        assert_eq!(tx.phase, CommitPhase::AwaitingReady);
        page.host_rewrites_value(handle.editable, "");
        step(
            &mut tx,
            &mut page,
            &mut state,
            &handle,
            &settings,
            t0 + Duration::from_millis(200),
        );
        assert_eq!(tx.phase, CommitPhase::Done);
    }
}
