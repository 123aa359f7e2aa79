use crate::geometry::GeometrySnapshot;

/// Opaque identifier for a node in the host page.
pub type NodeId = u64;

/// Result of running the discovery query: the host's editable composer, the
/// control that triggers its send behavior, and the container both live in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub editable: NodeId,
    pub action: NodeId,
    pub container: NodeId,
}

/// The host-markup-specific discovery predicate expressed as data. One value
/// per host markup revision; matching is substring-based because the host's
/// attribute values carry localisation noise around the stable fragment.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateQuery {
    /// Fragment of the composer's placeholder text.
    pub placeholder_fragment: String,
    /// Fragment of the send control's title or label.
    pub action_title_fragment: String,
}

/// Static attributes copied from the host composer onto the overlay once at
/// creation, so the surrogate behaves like the original for the keyboard.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SurfaceAttributes {
    pub placeholder: String,
    pub autocapitalize: String,
    pub spellcheck: bool,
    pub rows: u32,
}

/// Everything the engine consumes from, or exposes into, the live host page.
///
/// Implementations wrap whatever the platform actually provides (DOM
/// queries, computed styles, synthetic event dispatch). The engine never
/// touches the page through any other path, so a plain in-memory
/// implementation is enough to drive it end to end.
pub trait HostPage {
    /// Run the discovery predicate against the current document.
    fn find_candidate(&self, query: &CandidateQuery) -> Option<Candidate>;

    /// Whether the node is still part of the document.
    fn is_attached(&self, node: NodeId) -> bool;

    /// Current position/size/style of a node, or `None` once detached.
    fn geometry(&self, node: NodeId) -> Option<GeometrySnapshot>;

    /// Current value of an editable node.
    fn value(&self, node: NodeId) -> String;

    /// Write a value through the low-level property pathway, bypassing any
    /// value interceptor the host has installed. The host's own reactive
    /// logic still observes the write once [`dispatch_input`] fires.
    ///
    /// [`dispatch_input`]: HostPage::dispatch_input
    fn set_value_raw(&mut self, node: NodeId, text: &str);

    /// Dispatch the platform's synthetic input notification on a node.
    fn dispatch_input(&mut self, node: NodeId);

    /// Synthetically invoke a control.
    fn click(&mut self, node: NodeId);

    /// Whether the node carries an explicit disabled flag.
    fn is_disabled(&self, node: NodeId) -> bool;

    /// Whether an editable node currently accepts edits (not disabled, not
    /// read-only).
    fn is_editable(&self, node: NodeId) -> bool;

    /// Effective rendered opacity of the node, 0.0..=1.0.
    fn rendered_opacity(&self, node: NodeId) -> f64;

    /// Accessibility-relevant attributes of an editable node.
    fn static_attributes(&self, node: NodeId) -> SurfaceAttributes;

    /// Insert the overlay surface into the document and return its node.
    fn create_overlay(&mut self, attrs: &SurfaceAttributes) -> NodeId;

    /// Position and restyle the overlay surface.
    fn apply_overlay_geometry(&mut self, node: NodeId, snapshot: &GeometrySnapshot);

    /// Current text of the overlay surface.
    fn overlay_text(&self, node: NodeId) -> String;

    /// Replace the text of the overlay surface.
    fn set_overlay_text(&mut self, node: NodeId, text: &str);

    /// Present the overlay as read-only and dimmed while a commit is in
    /// flight, or restore it.
    fn set_overlay_locked(&mut self, node: NodeId, locked: bool);

    /// Insert a transparent hit target layered over `target`. The host makes
    /// it interactive only while `target` itself is disabled and reports its
    /// taps as send gestures.
    fn create_send_interceptor(&mut self, target: NodeId) -> NodeId;

    /// Detach a node created by this engine. Unknown or already-removed
    /// nodes are ignored.
    fn remove_node(&mut self, node: NodeId);
}
