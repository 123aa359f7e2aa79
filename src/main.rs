use anyhow::Context;
use mirror_input::engine::Engine;
use mirror_input::logging;
use mirror_input::settings::Settings;
use mirror_input::sim::SimPage;

use std::time::{Duration, Instant};

/// Demo run against the simulated host page: the composer appears after a
/// short boot churn, the user types and sends, the host processes the send,
/// then replaces its composer node. Watch the log to follow the engine.
fn main() -> anyhow::Result<()> {
    let settings = Settings::load("mirror_input.json")?;
    logging::init(settings.debug_logging);

    let mut page = SimPage::new();
    let mut engine = Engine::new(settings, Instant::now());

    // Host boot: composer shows up as a zero-size skeleton first.
    page.install_composer("Type a message", "Send message");
    page.set_composer_size(0.0, 0.0);
    engine.on_subtree_mutation(&mut page, Instant::now());

    let mut grown = false;
    let started = Instant::now();
    while engine.handle().is_none() {
        if !grown && started.elapsed() >= Duration::from_millis(300) {
            page.set_composer_size(320.0, 48.0);
            engine.on_layout_change(&mut page, Instant::now());
            grown = true;
        }
        engine.tick(&mut page, Instant::now());
        std::thread::sleep(Duration::from_millis(20));
    }

    let overlay_node = engine
        .overlay()
        .map(|state| state.node)
        .context("no overlay after binding")?;
    page.user_types(overlay_node, "hello from the overlay");
    engine.on_overlay_edit(&mut page, Instant::now());

    // The host keeps its send control disabled until the click lands.
    page.set_action_disabled(true);
    engine.on_send_gesture(&mut page, Instant::now());
    let mut enabled = false;
    let sent_at = Instant::now();
    while engine.commit_phase().is_some() {
        if !enabled && sent_at.elapsed() >= Duration::from_millis(150) {
            page.set_action_disabled(false);
            enabled = true;
        }
        engine.tick(&mut page, Instant::now());
        std::thread::sleep(Duration::from_millis(20));
    }

    // Host re-render swaps the composer node out; the engine rebinds.
    page.replace_composer();
    engine.on_subtree_mutation(&mut page, Instant::now());
    let replaced = Instant::now();
    while engine.handle().is_none() && replaced.elapsed() < Duration::from_secs(2) {
        engine.tick(&mut page, Instant::now());
        std::thread::sleep(Duration::from_millis(20));
    }

    tracing::info!("demo finished");
    Ok(())
}
