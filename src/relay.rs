use crate::engine::HostHandle;
use crate::host::HostPage;
use crate::overlay::OverlayState;
use crate::settings::RelayPolicy;

/// Feed an overlay edit through the configured policy.
///
/// Live relay replays the overlay's current text into the host composer at
/// once, through the raw value pathway so the host's reactive logic sees it
/// as user input. Buffered relay touches nothing outside the overlay state.
pub fn on_overlay_edit(
    host: &mut dyn HostPage,
    state: &mut OverlayState,
    handle: &HostHandle,
    policy: RelayPolicy,
) {
    if state.locked {
        tracing::debug!("overlay edit ignored while locked");
        return;
    }
    let text = host.overlay_text(state.node);
    state.buffered_text = text.clone();
    if policy == RelayPolicy::Live {
        host.set_value_raw(handle.editable, &text);
        host.dispatch_input(handle.editable);
        state.last_host_value = text;
    }
}

/// Pull a unilateral host-side value change back into the overlay.
///
/// The host occasionally rewrites its own composer (auto-correct, a
/// programmatic reset). When the value no longer matches what this engine
/// last put there, the overlay adopts it so the two surfaces cannot
/// diverge. Returns whether anything changed.
pub fn reverse_sync(
    host: &mut dyn HostPage,
    state: &mut OverlayState,
    handle: &HostHandle,
) -> bool {
    let host_value = host.value(handle.editable);
    if host_value == state.last_host_value {
        return false;
    }
    tracing::debug!(
        from = %state.last_host_value,
        to = %host_value,
        "host composer changed unilaterally; adopting its value"
    );
    state.last_host_value = host_value.clone();
    state.buffered_text = host_value.clone();
    host.set_overlay_text(state.node, &host_value);
    true
}
