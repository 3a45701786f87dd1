//! Per-page registry of rendered surface dimensions
//!
//! The external renderer reports the pixel size of every surface it draws;
//! anchor resolution always reads the latest entry, so annotations follow
//! zoom-triggered re-renders automatically.

use std::collections::HashMap;

use crate::anchor::SurfaceDimensions;

/// Tracks the current rendered surface dimensions per page number.
///
/// Entries are overwritten on every render pass for a page; a missing entry
/// means the page has not been drawn (or was unmounted) and no anchor can be
/// resolved against it.
#[derive(Debug, Default)]
pub struct PageSurfaceRegistry {
    surfaces: HashMap<u32, SurfaceDimensions>,
}

impl PageSurfaceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the dimensions of a freshly drawn surface, replacing any
    /// previous render pass for that page.
    pub fn record(&mut self, page: u32, dims: SurfaceDimensions) {
        self.surfaces.insert(page, dims);
    }

    pub fn dimensions(&self, page: u32) -> Option<SurfaceDimensions> {
        self.surfaces.get(&page).copied()
    }

    /// Drop a page's entry when its surface is unmounted.
    pub fn forget(&mut self, page: u32) {
        self.surfaces.remove(&page);
    }

    /// Drop everything, e.g. when the document is switched out.
    pub fn clear(&mut self) {
        self.surfaces.clear();
    }

    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_and_overwrites() {
        let mut registry = PageSurfaceRegistry::new();
        assert!(registry.dimensions(1).is_none());

        registry.record(1, SurfaceDimensions::new(400.0, 500.0));
        registry.record(1, SurfaceDimensions::new(800.0, 1000.0));

        let dims = registry.dimensions(1).unwrap();
        assert_eq!(dims.width_px, 800.0);
        assert_eq!(dims.height_px, 1000.0);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn forget_and_clear() {
        let mut registry = PageSurfaceRegistry::new();
        registry.record(1, SurfaceDimensions::new(400.0, 500.0));
        registry.record(2, SurfaceDimensions::new(400.0, 500.0));

        registry.forget(1);
        assert!(registry.dimensions(1).is_none());
        assert!(registry.dimensions(2).is_some());

        registry.clear();
        assert!(registry.is_empty());
    }
}
