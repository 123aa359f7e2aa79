use crate::engine::HostHandle;
use crate::geometry::GeometrySnapshot;
use crate::host::{HostPage, NodeId};
use crate::settings::{InsertMode, Settings};
use std::time::Instant;

/// State of the surrogate input surface. Owned by the engine; exists exactly
/// as long as a composer is bound.
#[derive(Debug)]
pub struct OverlayState {
    pub node: NodeId,
    /// Transparent hit target over the send control, when enabled.
    pub interceptor: Option<NodeId>,
    /// Text the user has typed into the overlay and not yet committed.
    pub buffered_text: String,
    /// True while a commit is in flight; edits are rejected.
    pub locked: bool,
    /// Last geometry written to the overlay; used to skip redundant writes.
    pub last_applied: Option<GeometrySnapshot>,
    /// Host composer value as of the last write or reverse-sync through this
    /// engine; anything else that shows up there was the host acting alone.
    pub last_host_value: String,
    last_sync: Option<Instant>,
}

/// Create the overlay surface for a freshly bound composer. Idempotent: an
/// existing overlay that is still attached is reused, never duplicated.
pub fn create(
    host: &mut dyn HostPage,
    handle: &HostHandle,
    existing: Option<OverlayState>,
    settings: &Settings,
) -> OverlayState {
    if let Some(state) = existing {
        if host.is_attached(state.node) {
            return state;
        }
    }
    let attrs = host.static_attributes(handle.editable);
    let node = host.create_overlay(&attrs);
    let interceptor = if settings.intercept_send {
        Some(host.create_send_interceptor(handle.action))
    } else {
        None
    };
    tracing::debug!(node, interceptor = ?interceptor, "overlay surface created");
    OverlayState {
        node,
        interceptor,
        buffered_text: String::new(),
        locked: false,
        last_applied: None,
        last_host_value: host.value(handle.editable),
        last_sync: None,
    }
}

/// Probe the composer and bring the overlay's geometry up to date.
///
/// Throttled to one probe per `sync_min_interval` unless `forced`; the
/// engine forces the initial sync after binding and the safety-net resyncs.
pub fn sync(
    host: &mut dyn HostPage,
    state: &mut OverlayState,
    handle: &HostHandle,
    settings: &Settings,
    now: Instant,
    forced: bool,
) {
    if !forced {
        if let Some(last) = state.last_sync {
            if now.duration_since(last) < settings.sync_min_interval() {
                return;
            }
        }
    }
    state.last_sync = Some(now);
    let Some(probed) = host.geometry(handle.editable) else {
        return;
    };
    apply_geometry(host, state, placed_geometry(probed, settings));
}

/// Write a snapshot onto the overlay unless it matches the last one applied.
pub fn apply_geometry(host: &mut dyn HostPage, state: &mut OverlayState, snapshot: GeometrySnapshot) {
    if state
        .last_applied
        .as_ref()
        .is_some_and(|applied| applied.approx_eq(&snapshot))
    {
        return;
    }
    host.apply_overlay_geometry(state.node, &snapshot);
    state.last_applied = Some(snapshot);
}

/// Translate a composer probe into the overlay's target rectangle.
fn placed_geometry(probed: GeometrySnapshot, settings: &Settings) -> GeometrySnapshot {
    match settings.insert_mode {
        InsertMode::Layered => probed,
        InsertMode::Adjacent => GeometrySnapshot {
            top: probed.top - probed.height - settings.gutter_px,
            ..probed
        },
    }
}

/// Lock or unlock the surface. Locked means read-only and dimmed at the
/// presentation layer; the buffer keeps whatever it held.
pub fn set_locked(host: &mut dyn HostPage, state: &mut OverlayState, locked: bool) {
    if state.locked == locked {
        return;
    }
    state.locked = locked;
    host.set_overlay_locked(state.node, locked);
}

/// Detach the overlay and its interceptor. No-op when nothing exists.
pub fn destroy(host: &mut dyn HostPage, state: Option<OverlayState>) {
    let Some(state) = state else {
        return;
    };
    host.remove_node(state.node);
    if let Some(interceptor) = state.interceptor {
        host.remove_node(interceptor);
    }
    tracing::debug!(node = state.node, "overlay surface destroyed");
}
