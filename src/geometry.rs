/// Positional tolerance in CSS pixels. Sub-pixel jitter from the host's
/// layout engine must not count as movement.
pub const POSITION_TOLERANCE: f64 = 1.0;

/// Snapshot of a host node's position, size and visual style, taken in one
/// probe. Values are absolute document coordinates (viewport offset already
/// folded in by the host collaborator).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GeometrySnapshot {
    pub top: f64,
    pub left: f64,
    pub width: f64,
    pub height: f64,
    pub padding: String,
    pub border: String,
    pub font: String,
    pub line_height: String,
    pub color: String,
    pub background: String,
    pub border_radius: String,
    pub box_shadow: String,
    pub caret_color: String,
}

impl GeometrySnapshot {
    /// True when the node occupies any rendered area at all.
    pub fn has_area(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }

    /// True when both rectangles agree on every axis within `tolerance`.
    pub fn same_rect(&self, other: &Self, tolerance: f64) -> bool {
        (self.top - other.top).abs() <= tolerance
            && (self.left - other.left).abs() <= tolerance
            && (self.width - other.width).abs() <= tolerance
            && (self.height - other.height).abs() <= tolerance
    }

    /// Equality for sync purposes: rectangle within [`POSITION_TOLERANCE`],
    /// style strings exact. Used to skip redundant writes to the overlay.
    pub fn approx_eq(&self, other: &Self) -> bool {
        self.same_rect(other, POSITION_TOLERANCE)
            && self.padding == other.padding
            && self.border == other.border
            && self.font == other.font
            && self.line_height == other.line_height
            && self.color == other.color
            && self.background == other.background
            && self.border_radius == other.border_radius
            && self.box_shadow == other.box_shadow
            && self.caret_color == other.caret_color
    }
}
