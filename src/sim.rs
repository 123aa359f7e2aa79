use crate::geometry::GeometrySnapshot;
use crate::host::{Candidate, CandidateQuery, HostPage, NodeId, SurfaceAttributes};
use std::collections::HashMap;

/// One element of the simulated document.
#[derive(Debug, Clone)]
struct SimNode {
    attached: bool,
    geometry: GeometrySnapshot,
    value: String,
    disabled: bool,
    readonly: bool,
    opacity: f64,
    attrs: SurfaceAttributes,
    title: String,
    locked: bool,
    is_overlay: bool,
    clicks: usize,
    raw_writes: usize,
    input_events: usize,
    /// Writes that went through the host's own guarded value setter.
    intercepted_writes: usize,
}

impl Default for SimNode {
    fn default() -> Self {
        Self {
            attached: true,
            geometry: GeometrySnapshot::default(),
            value: String::new(),
            disabled: false,
            readonly: false,
            opacity: 1.0,
            attrs: SurfaceAttributes::default(),
            title: String::new(),
            locked: false,
            is_overlay: false,
            clicks: 0,
            raw_writes: 0,
            input_events: 0,
            intercepted_writes: 0,
        }
    }
}

fn composer_geometry() -> GeometrySnapshot {
    GeometrySnapshot {
        top: 480.0,
        left: 24.0,
        width: 320.0,
        height: 48.0,
        padding: "8px 12px".into(),
        border: "1px solid rgb(220, 220, 220)".into(),
        font: "14px sans-serif".into(),
        line_height: "20px".into(),
        color: "rgb(17, 17, 17)".into(),
        background: "rgb(255, 255, 255)".into(),
        border_radius: "8px".into(),
        box_shadow: "none".into(),
        caret_color: "auto".into(),
    }
}

/// In-memory host page. Stands in for the live document in tests and the
/// demo binary: nodes carry geometry, disabled/read-only/opacity flags, and
/// counters for clicks, raw writes, and input notifications, so assertions
/// can see exactly what the engine did to the page.
pub struct SimPage {
    nodes: HashMap<NodeId, SimNode>,
    next_id: NodeId,
    container: NodeId,
    composer: Option<NodeId>,
    action: Option<NodeId>,
    overlay_geometry_writes: usize,
}

impl SimPage {
    pub fn new() -> Self {
        let mut nodes = HashMap::new();
        let container = 1;
        nodes.insert(container, SimNode::default());
        Self {
            nodes,
            next_id: 2,
            container,
            composer: None,
            action: None,
            overlay_geometry_writes: 0,
        }
    }

    fn insert(&mut self, node: SimNode) -> NodeId {
        let id = self.next_id;
        self.next_id += 1;
        self.nodes.insert(id, node);
        id
    }

    fn node(&self, id: NodeId) -> &SimNode {
        self.nodes.get(&id).expect("unknown sim node")
    }

    fn node_mut(&mut self, id: NodeId) -> &mut SimNode {
        self.nodes.get_mut(&id).expect("unknown sim node")
    }

    pub fn container(&self) -> NodeId {
        self.container
    }

    /// Insert a composer and its send control into the document.
    pub fn install_composer(&mut self, placeholder: &str, action_title: &str) -> (NodeId, NodeId) {
        let composer = self.insert(SimNode {
            geometry: composer_geometry(),
            attrs: SurfaceAttributes {
                placeholder: placeholder.to_string(),
                autocapitalize: "sentences".into(),
                spellcheck: true,
                rows: 1,
            },
            ..SimNode::default()
        });
        let action = self.insert(SimNode {
            geometry: GeometrySnapshot {
                top: 484.0,
                left: 352.0,
                width: 40.0,
                height: 40.0,
                ..composer_geometry()
            },
            title: action_title.to_string(),
            ..SimNode::default()
        });
        self.composer = Some(composer);
        self.action = Some(action);
        (composer, action)
    }

    /// Detach the current composer pair and install a fresh one, slightly
    /// moved, the way a host re-render swaps its nodes out.
    pub fn replace_composer(&mut self) -> (NodeId, NodeId) {
        let placeholder = self
            .composer
            .map(|id| self.node(id).attrs.placeholder.clone())
            .unwrap_or_default();
        let title = self
            .action
            .map(|id| self.node(id).title.clone())
            .unwrap_or_default();
        self.detach_composer();
        let (composer, action) = self.install_composer(&placeholder, &title);
        self.node_mut(composer).geometry.top += 40.0;
        self.node_mut(action).geometry.top += 40.0;
        (composer, action)
    }

    /// Remove the composer pair without a successor.
    pub fn detach_composer(&mut self) {
        if let Some(id) = self.composer.take() {
            self.node_mut(id).attached = false;
        }
        if let Some(id) = self.action.take() {
            self.node_mut(id).attached = false;
        }
    }

    /// The composer pair as the discovery query would report it.
    pub fn candidate(&self) -> Option<Candidate> {
        let editable = self.composer.filter(|id| self.node(*id).attached)?;
        let action = self.action.filter(|id| self.node(*id).attached)?;
        Some(Candidate {
            editable,
            action,
            container: self.container,
        })
    }

    pub fn set_composer_size(&mut self, width: f64, height: f64) {
        let id = self.composer.expect("no composer installed");
        let node = self.node_mut(id);
        node.geometry.width = width;
        node.geometry.height = height;
    }

    pub fn move_composer(&mut self, dy: f64) {
        let id = self.composer.expect("no composer installed");
        self.node_mut(id).geometry.top += dy;
    }

    pub fn set_composer_opacity(&mut self, opacity: f64) {
        let id = self.composer.expect("no composer installed");
        self.node_mut(id).opacity = opacity;
    }

    pub fn set_composer_editable(&mut self, editable: bool) {
        let id = self.composer.expect("no composer installed");
        self.node_mut(id).readonly = !editable;
    }

    pub fn set_action_disabled(&mut self, disabled: bool) {
        let id = self.action.expect("no send control installed");
        self.node_mut(id).disabled = disabled;
    }

    pub fn set_action_opacity(&mut self, opacity: f64) {
        let id = self.action.expect("no send control installed");
        self.node_mut(id).opacity = opacity;
    }

    /// Keystrokes landing on a surface. Honors the locked flag the way a
    /// read-only element would.
    pub fn user_types(&mut self, node: NodeId, text: &str) {
        let node = self.node_mut(node);
        if node.locked {
            return;
        }
        node.value = text.to_string();
    }

    /// The host rewriting its own composer through its guarded setter
    /// (auto-correct, programmatic reset).
    pub fn host_rewrites_value(&mut self, node: NodeId, text: &str) {
        let node = self.node_mut(node);
        node.value = text.to_string();
        node.intercepted_writes += 1;
    }

    pub fn geometry_of(&self, node: NodeId) -> GeometrySnapshot {
        self.node(node).geometry.clone()
    }

    pub fn node_attributes(&self, node: NodeId) -> SurfaceAttributes {
        self.node(node).attrs.clone()
    }

    pub fn overlay_count(&self) -> usize {
        self.nodes
            .values()
            .filter(|n| n.is_overlay && n.attached)
            .count()
    }

    pub fn overlay_geometry_writes(&self) -> usize {
        self.overlay_geometry_writes
    }

    pub fn clicks_on(&self, node: NodeId) -> usize {
        self.node(node).clicks
    }

    pub fn raw_writes_on(&self, node: NodeId) -> usize {
        self.node(node).raw_writes
    }

    pub fn input_events_on(&self, node: NodeId) -> usize {
        self.node(node).input_events
    }

    pub fn intercepted_writes_on(&self, node: NodeId) -> usize {
        self.node(node).intercepted_writes
    }

    pub fn is_locked(&self, node: NodeId) -> bool {
        self.node(node).locked
    }
}

impl Default for SimPage {
    fn default() -> Self {
        Self::new()
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

impl HostPage for SimPage {
    fn find_candidate(&self, query: &CandidateQuery) -> Option<Candidate> {
        let candidate = self.candidate()?;
        let composer = self.node(candidate.editable);
        let action = self.node(candidate.action);
        if contains_ignore_case(&composer.attrs.placeholder, &query.placeholder_fragment)
            && contains_ignore_case(&action.title, &query.action_title_fragment)
        {
            Some(candidate)
        } else {
            None
        }
    }

    fn is_attached(&self, node: NodeId) -> bool {
        self.nodes.get(&node).is_some_and(|n| n.attached)
    }

    fn geometry(&self, node: NodeId) -> Option<GeometrySnapshot> {
        self.nodes
            .get(&node)
            .filter(|n| n.attached)
            .map(|n| n.geometry.clone())
    }

    fn value(&self, node: NodeId) -> String {
        self.node(node).value.clone()
    }

    fn set_value_raw(&mut self, node: NodeId, text: &str) {
        let node = self.node_mut(node);
        node.value = text.to_string();
        node.raw_writes += 1;
    }

    fn dispatch_input(&mut self, node: NodeId) {
        self.node_mut(node).input_events += 1;
    }

    fn click(&mut self, node: NodeId) {
        self.node_mut(node).clicks += 1;
    }

    fn is_disabled(&self, node: NodeId) -> bool {
        self.node(node).disabled
    }

    fn is_editable(&self, node: NodeId) -> bool {
        let node = self.node(node);
        node.attached && !node.disabled && !node.readonly
    }

    fn rendered_opacity(&self, node: NodeId) -> f64 {
        self.node(node).opacity
    }

    fn static_attributes(&self, node: NodeId) -> SurfaceAttributes {
        self.node(node).attrs.clone()
    }

    fn create_overlay(&mut self, attrs: &SurfaceAttributes) -> NodeId {
        self.insert(SimNode {
            attrs: attrs.clone(),
            is_overlay: true,
            ..SimNode::default()
        })
    }

    fn apply_overlay_geometry(&mut self, node: NodeId, snapshot: &GeometrySnapshot) {
        self.node_mut(node).geometry = snapshot.clone();
        self.overlay_geometry_writes += 1;
    }

    fn overlay_text(&self, node: NodeId) -> String {
        self.node(node).value.clone()
    }

    fn set_overlay_text(&mut self, node: NodeId, text: &str) {
        self.node_mut(node).value = text.to_string();
    }

    fn set_overlay_locked(&mut self, node: NodeId, locked: bool) {
        self.node_mut(node).locked = locked;
    }

    fn create_send_interceptor(&mut self, target: NodeId) -> NodeId {
        let geometry = self.node(target).geometry.clone();
        self.insert(SimNode {
            geometry,
            opacity: 0.0,
            ..SimNode::default()
        })
    }

    fn remove_node(&mut self, node: NodeId) {
        if let Some(node) = self.nodes.get_mut(&node) {
            node.attached = false;
        }
    }
}
