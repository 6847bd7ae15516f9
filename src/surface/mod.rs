pub mod terminal;

use thiserror::Error;

use crate::drag::PointerCapture;
use crate::geometry::{self, Bounds, OverlayGeometry, Point, Viewport};
use crate::input::PointerId;

pub use terminal::TerminalSurface;

/// Interactive sub-regions every overlay must expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    HeaderBlank,
    ResizeHandle,
    CloseButton,
}

impl Region {
    pub const ALL: [Region; 3] = [
        Region::HeaderBlank,
        Region::ResizeHandle,
        Region::CloseButton,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Region::HeaderBlank => "header-blank",
            Region::ResizeHandle => "resize-handle",
            Region::CloseButton => "close-button",
        }
    }
}

/// Opaque reference to a region, handed out by the backend at lookup time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionHandle {
    pub region: Region,
    pub slot: usize,
}

#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("overlay `{surface}` is missing its `{region}` region")]
    MissingRegion {
        surface: String,
        region: &'static str,
    },
    #[error("failed to mount overlay `{0}`")]
    Mount(String),
}

/// Rendering capability behind an overlay.
pub trait SurfaceBackend: PointerCapture {
    fn mount(&mut self, id: &str) -> Result<(), SurfaceError>;

    /// Keep host styling from bleeding into the overlay.
    fn apply_style_isolation(&mut self);

    fn query_named_region(&self, region: Region) -> Option<RegionHandle>;

    /// Where `handle` sits for an overlay occupying `frame`.
    fn region_bounds(&self, handle: RegionHandle, frame: Bounds) -> Bounds;

    /// Columns taken by decorations; the width floor never goes below this.
    fn chrome_width(&self) -> i32;

    /// Rendered height of `content` at `width`, decorations included.
    fn measure_height(&self, width: i32, content: &str) -> i32;

    /// How many content rows are hidden at `width` and can be scrolled to.
    fn scroll_limit(&self, width: i32, content: &str) -> u16;

    fn apply_visibility(&mut self, visible: bool);
    fn apply_geometry(&mut self, geometry: OverlayGeometry);
    fn apply_content(&mut self, content: &str);
    fn apply_font_size(&mut self, size: u16);
    fn apply_content_scroll(&mut self, offset: u16);
}

#[derive(Debug, Clone, Copy)]
struct RegionHandles {
    header_blank: RegionHandle,
    resize_handle: RegionHandle,
    close_button: RegionHandle,
}

impl RegionHandles {
    fn get(&self, region: Region) -> RegionHandle {
        match region {
            Region::HeaderBlank => self.header_blank,
            Region::ResizeHandle => self.resize_handle,
            Region::CloseButton => self.close_button,
        }
    }
}

#[derive(Debug)]
pub struct OverlaySurface<B> {
    id: String,
    backend: B,
    regions: RegionHandles,
    geometry: OverlayGeometry,
    visible: bool,
    content: String,
    content_scroll: u16,
}

impl<B: SurfaceBackend> OverlaySurface<B> {
    /// Mount `backend` and wire up every named region.
    ///
    /// Fails if any region is missing; there is no partially wired overlay.
    pub fn new(
        mut backend: B,
        id: impl Into<String>,
        width: i32,
        min_width: i32,
    ) -> Result<Self, SurfaceError> {
        let id = id.into();
        backend.mount(&id)?;
        backend.apply_style_isolation();
        let lookup = |region: Region| {
            backend
                .query_named_region(region)
                .ok_or_else(|| SurfaceError::MissingRegion {
                    surface: id.clone(),
                    region: region.name(),
                })
        };
        let regions = RegionHandles {
            header_blank: lookup(Region::HeaderBlank)?,
            resize_handle: lookup(Region::ResizeHandle)?,
            close_button: lookup(Region::CloseButton)?,
        };
        let floor = min_width.max(backend.chrome_width());
        let geometry = OverlayGeometry::new(width, floor);
        let mut surface = Self {
            id,
            backend,
            regions,
            geometry,
            visible: false,
            content: String::new(),
            content_scroll: 0,
        };
        surface.backend.apply_geometry(surface.geometry);
        surface.backend.apply_visibility(false);
        Ok(surface)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn display(&mut self) {
        self.visible = true;
        self.backend.apply_visibility(true);
    }

    pub fn hide(&mut self) {
        self.visible = false;
        self.backend.apply_visibility(false);
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn geometry(&self) -> OverlayGeometry {
        self.geometry
    }

    pub fn left(&self) -> i32 {
        self.geometry.left
    }

    pub fn top(&self) -> i32 {
        self.geometry.top
    }

    pub fn width(&self) -> i32 {
        self.geometry.width
    }

    pub fn min_width(&self) -> i32 {
        self.geometry.min_width
    }

    pub fn height(&self) -> i32 {
        self.backend.measure_height(self.geometry.width, &self.content)
    }

    /// Set the width, never going below the floor.
    pub fn set_width(&mut self, width: i32) {
        self.geometry.width = self.geometry.clamp_width(width);
        self.clamp_content_scroll();
        self.backend.apply_geometry(self.geometry);
    }

    pub fn set_left(&mut self, left: i32) {
        self.geometry.left = left;
        self.backend.apply_geometry(self.geometry);
    }

    pub fn set_top(&mut self, top: i32) {
        self.geometry.top = top;
        self.backend.apply_geometry(self.geometry);
    }

    /// Replace the displayed text wholesale.
    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = content.into();
        if self.content.is_empty() {
            self.content_scroll = 0;
            self.backend.apply_content_scroll(0);
        }
        self.backend.apply_content(&self.content);
        self.clamp_content_scroll();
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn set_font_size(&mut self, size: u16) {
        self.backend.apply_font_size(size);
    }

    pub fn content_scroll(&self) -> u16 {
        self.content_scroll
    }

    /// Scroll the text inside the overlay by `delta` rows.
    pub fn scroll_content(&mut self, delta: i32) {
        let limit = self.backend.scroll_limit(self.geometry.width, &self.content);
        let next = (self.content_scroll as i32 + delta).clamp(0, limit as i32) as u16;
        if next != self.content_scroll {
            self.content_scroll = next;
            self.backend.apply_content_scroll(next);
        }
    }

    /// Pull the overlay back inside the viewport horizontally, shifting first
    /// and shrinking only if shifting is not enough.
    pub fn make_width_within_viewport(&mut self, viewport: Viewport) {
        let (left, width) =
            geometry::fit_width_to_viewport(self.geometry.left, self.geometry.width, viewport);
        if left != self.geometry.left {
            self.set_left(left);
        }
        if width != self.geometry.width {
            self.set_width(width);
        }
    }

    pub fn frame(&self) -> Bounds {
        self.geometry.frame(self.height())
    }

    /// True when `point` lands on the visible overlay.
    pub fn contains(&self, point: Point) -> bool {
        self.visible && self.frame().contains(point)
    }

    /// True when `bounds` intersects the visible overlay.
    pub fn overlaps(&self, bounds: &Bounds) -> bool {
        self.visible && self.frame().intersects(bounds)
    }

    pub fn region_bounds(&self, region: Region) -> Bounds {
        self.backend
            .region_bounds(self.regions.get(region), self.frame())
    }

    /// The interactive region under `point`, if any. The close control wins
    /// over the header it sits in.
    pub fn region_at(&self, point: Point) -> Option<Region> {
        if !self.contains(point) {
            return None;
        }
        [Region::CloseButton, Region::ResizeHandle, Region::HeaderBlank]
            .into_iter()
            .find(|region| self.region_bounds(*region).contains(point))
    }

    fn clamp_content_scroll(&mut self) {
        let limit = self.backend.scroll_limit(self.geometry.width, &self.content);
        if self.content_scroll > limit {
            self.content_scroll = limit;
            self.backend.apply_content_scroll(limit);
        }
    }
}

impl<B: SurfaceBackend> PointerCapture for OverlaySurface<B> {
    fn set_pointer_capture(&mut self, region: Region, pointer: PointerId) {
        self.backend.set_pointer_capture(region, pointer);
    }

    fn release_pointer_capture(&mut self, region: Region, pointer: PointerId) {
        self.backend.release_pointer_capture(region, pointer);
    }

    fn set_text_selection_enabled(&mut self, enabled: bool) {
        self.backend.set_text_selection_enabled(enabled);
    }
}
