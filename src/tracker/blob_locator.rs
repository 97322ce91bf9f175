//! Ball localisation: centroid of the largest connected region in a mask.

use std::cmp::Reverse;

use image::Luma;
use imageproc::region_labelling::{Connectivity, connected_components};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::tracker::mask::Mask;

/// Parameters for [`BlobLocator`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlobParams {
    /// Smallest region (in pixels) accepted as a ball. Smaller regions are noise.
    pub min_area: usize,
    /// Erode/dilate passes applied to the mask before labelling.
    pub open_iterations: usize,
}

impl Default for BlobParams {
    fn default() -> Self {
        Self {
            min_area: 20,
            open_iterations: 2,
        }
    }
}

/// A located region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Blob {
    /// Mean of member pixel coordinates.
    pub centroid: Point2<f64>,
    /// Number of member pixels.
    pub area: usize,
    /// Inclusive bounding box `[min_x, min_y, max_x, max_y]`.
    pub bbox: [usize; 4],
}

/// Finds the largest 8-connected foreground region of a mask.
///
/// Regions are discovered in raster order; when two regions have the same
/// area the one discovered first wins.
#[derive(Debug, Clone, Default)]
pub struct BlobLocator {
    params: BlobParams,
}

impl BlobLocator {
    pub fn new(params: BlobParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &BlobParams {
        &self.params
    }

    /// Clean the mask with the configured opening.
    pub fn prepare(&self, mask: &Mask) -> Mask {
        mask.opened(self.params.open_iterations)
    }

    /// Locate the ball centroid on a raw mask (cleanup included).
    pub fn locate(&self, mask: &Mask) -> Option<Point2<f64>> {
        self.locate_blob(&self.prepare(mask)).map(|b| b.centroid)
    }

    /// Largest region of an already-cleaned mask, or `None` when it is below `min_area`.
    pub fn locate_blob(&self, mask: &Mask) -> Option<Blob> {
        let best = largest_component(mask)?;
        if best.area < self.params.min_area.max(1) {
            log::trace!(
                "largest region has {} px, below min_area {}",
                best.area,
                self.params.min_area
            );
            return None;
        }
        Some(best)
    }
}

/// Label 8-connected regions and return the largest one.
pub fn largest_component(mask: &Mask) -> Option<Blob> {
    if mask.is_empty() {
        return None;
    }
    let labels = connected_components(&mask.to_gray_image(), Connectivity::Eight, Luma([0u8]));

    let mut regions: Vec<Region> = Vec::new();
    for (x, y, label) in labels.enumerate_pixels() {
        let label = label[0] as usize;
        if label == 0 {
            continue;
        }
        if regions.len() < label {
            regions.resize(label, Region::default());
        }
        regions[label - 1].add(x as usize, y as usize, y as usize * mask.width() + x as usize);
    }

    regions
        .iter()
        .filter(|r| r.area > 0)
        .max_by_key(|r| (r.area, Reverse(r.first)))
        .map(Region::to_blob)
}

// Running sums for one label.
#[derive(Debug, Clone, Copy)]
struct Region {
    area: usize,
    sum_x: f64,
    sum_y: f64,
    bbox: [usize; 4],
    // Raster index of the first pixel seen.
    first: usize,
}

impl Default for Region {
    fn default() -> Self {
        Self {
            area: 0,
            sum_x: 0.0,
            sum_y: 0.0,
            bbox: [usize::MAX, usize::MAX, 0, 0],
            first: usize::MAX,
        }
    }
}

impl Region {
    fn add(&mut self, x: usize, y: usize, raster: usize) {
        self.area += 1;
        self.sum_x += x as f64;
        self.sum_y += y as f64;
        self.bbox = [
            self.bbox[0].min(x),
            self.bbox[1].min(y),
            self.bbox[2].max(x),
            self.bbox[3].max(y),
        ];
        self.first = self.first.min(raster);
    }

    fn to_blob(&self) -> Blob {
        Blob {
            centroid: Point2::new(self.sum_x / self.area as f64, self.sum_y / self.area as f64),
            area: self.area,
            bbox: self.bbox,
        }
    }
}
