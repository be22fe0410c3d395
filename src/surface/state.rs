//! Double-buffered surface state

use super::SurfaceId;

/// Axis-aligned rectangle in surface-local coordinates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// Right edge, exclusive. Widened so client-supplied extents cannot overflow.
    fn right(&self) -> i64 {
        i64::from(self.x) + i64::from(self.width)
    }

    /// Bottom edge, exclusive
    fn bottom(&self) -> i64 {
        i64::from(self.y) + i64::from(self.height)
    }

    /// Check if this rectangle fully covers another
    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    /// Check if this rectangle intersects with another
    pub fn intersects(&self, other: &Rect) -> bool {
        i64::from(self.x) < other.right()
            && self.right() > i64::from(other.x)
            && i64::from(self.y) < other.bottom()
            && self.bottom() > i64::from(other.y)
    }

    pub fn contains_point(&self, x: i32, y: i32) -> bool {
        x >= self.x && y >= self.y && i64::from(x) < self.right() && i64::from(y) < self.bottom()
    }

    /// Smallest rectangle covering both. Extents saturate at `i32::MAX`.
    pub fn bounding(&self, other: &Rect) -> Rect {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let width = self.right().max(other.right()) - i64::from(x);
        let height = self.bottom().max(other.bottom()) - i64::from(y);
        Rect::new(x, y, saturate(width), saturate(height))
    }
}

fn saturate(extent: i64) -> i32 {
    i32::try_from(extent).unwrap_or(i32::MAX)
}

/// Union of rectangles.
///
/// Rectangles fully covered by another member are dropped on insertion, so
/// adding the same damage twice never grows the region.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Region {
    rects: Vec<Rect>,
}

impl Region {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rect(rect: Rect) -> Self {
        let mut region = Self::new();
        region.add(rect);
        region
    }

    pub fn add(&mut self, rect: Rect) {
        if rect.is_empty() || self.rects.iter().any(|r| r.contains_rect(&rect)) {
            return;
        }
        self.rects.retain(|r| !rect.contains_rect(r));
        self.rects.push(rect);
    }

    pub fn union(&mut self, other: &Region) {
        for rect in &other.rects {
            self.add(*rect);
        }
    }

    pub fn rects(&self) -> &[Rect] {
        &self.rects
    }

    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    pub fn contains_point(&self, x: i32, y: i32) -> bool {
        self.rects.iter().any(|r| r.contains_point(x, y))
    }

    pub fn bounds(&self) -> Option<Rect> {
        let mut rects = self.rects.iter();
        let first = *rects.next()?;
        Some(rects.fold(first, |acc, r| acc.bounding(r)))
    }
}

/// Reference to client buffer contents. Pixel data is handled elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferRef {
    pub id: u32,
    pub width: i32,
    pub height: i32,
}

/// Stacking request relative to a sibling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Above(SurfaceId),
    Below(SurfaceId),
}

impl Placement {
    pub fn sibling(&self) -> SurfaceId {
        match self {
            Placement::Above(sibling) | Placement::Below(sibling) => *sibling,
        }
    }
}

/// A single mutation of pending state
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceDelta {
    Attach(Option<BufferRef>),
    Damage(Rect),
    SetPosition { x: i32, y: i32 },
    SetBufferScale(i32),
    SetOpaqueRegion(Region),
    SetInputRegion(Option<Region>),
}

/// Uncommitted mutations. `None` fields are left untouched on apply.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PendingState {
    /// `Some(None)` detaches the current buffer
    pub buffer: Option<Option<BufferRef>>,
    pub position: Option<(i32, i32)>,
    pub damage: Region,
    pub scale: Option<i32>,
    pub opaque_region: Option<Region>,
    pub input_region: Option<Option<Region>>,
    pub placement: Option<Placement>,
}

impl PendingState {
    pub fn apply_delta(&mut self, delta: SurfaceDelta) {
        match delta {
            SurfaceDelta::Attach(buffer) => self.buffer = Some(buffer),
            SurfaceDelta::Damage(rect) => self.damage.add(rect),
            SurfaceDelta::SetPosition { x, y } => self.position = Some((x, y)),
            SurfaceDelta::SetBufferScale(scale) => self.scale = Some(scale),
            SurfaceDelta::SetOpaqueRegion(region) => self.opaque_region = Some(region),
            SurfaceDelta::SetInputRegion(region) => self.input_region = Some(region),
        }
    }

    /// Fold a newer pending state on top of this one
    pub fn merge(&mut self, newer: PendingState) {
        if newer.buffer.is_some() {
            self.buffer = newer.buffer;
        }
        if newer.position.is_some() {
            self.position = newer.position;
        }
        self.damage.union(&newer.damage);
        if newer.scale.is_some() {
            self.scale = newer.scale;
        }
        if newer.opaque_region.is_some() {
            self.opaque_region = newer.opaque_region;
        }
        if newer.input_region.is_some() {
            self.input_region = newer.input_region;
        }
        if newer.placement.is_some() {
            self.placement = newer.placement;
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == PendingState::default()
    }
}

/// State visible to the compositor
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceState {
    pub buffer: Option<BufferRef>,
    /// Offset relative to the parent, meaningful for subsurfaces
    pub position: (i32, i32),
    /// Damage of the most recent application
    pub damage: Region,
    pub scale: i32,
    pub opaque_region: Region,
    /// `None` means the whole surface accepts input
    pub input_region: Option<Region>,
    /// Number of times pending state has been applied
    pub serial: u64,
}

impl Default for SurfaceState {
    fn default() -> Self {
        Self {
            buffer: None,
            position: (0, 0),
            damage: Region::new(),
            scale: 1,
            opaque_region: Region::new(),
            input_region: None,
            serial: 0,
        }
    }
}

impl SurfaceState {
    /// Promote pending state. Stacking is handled by the tree.
    pub(crate) fn apply(&mut self, pending: &PendingState) {
        if let Some(buffer) = pending.buffer {
            self.buffer = buffer;
        }
        if let Some(position) = pending.position {
            self.position = position;
        }
        self.damage = pending.damage.clone();
        if let Some(scale) = pending.scale {
            self.scale = scale;
        }
        if let Some(region) = &pending.opaque_region {
            self.opaque_region = region.clone();
        }
        if let Some(region) = &pending.input_region {
            self.input_region = region.clone();
        }
        self.serial += 1;
    }

    /// Size of the attached buffer in surface coordinates
    pub fn size(&self) -> Option<(i32, i32)> {
        let scale = self.scale.max(1);
        self.buffer
            .map(|buffer| (buffer.width / scale, buffer.height / scale))
    }
}
