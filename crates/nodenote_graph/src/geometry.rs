// SPDX-License-Identifier: MIT OR Apache-2.0
//! Small 2D helpers used by layout and collision.

use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in document space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    /// Top-left corner
    pub min: [f32; 2],
    /// Bottom-right corner
    pub max: [f32; 2],
}

impl Rect {
    /// Create a rectangle from a position and a size
    pub fn from_pos_size(pos: [f32; 2], size: [f32; 2]) -> Self {
        Self {
            min: pos,
            max: [pos[0] + size[0], pos[1] + size[1]],
        }
    }

    /// Smallest rectangle containing every point
    pub fn bounding(points: &[[f32; 2]]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let mut rect = Self { min: *first, max: *first };
        for p in rest {
            rect.min[0] = rect.min[0].min(p[0]);
            rect.min[1] = rect.min[1].min(p[1]);
            rect.max[0] = rect.max[0].max(p[0]);
            rect.max[1] = rect.max[1].max(p[1]);
        }
        Some(rect)
    }

    /// Width of the rectangle
    pub fn width(&self) -> f32 {
        self.max[0] - self.min[0]
    }

    /// Height of the rectangle
    pub fn height(&self) -> f32 {
        self.max[1] - self.min[1]
    }

    /// Whether the two rectangles share any area or edge
    pub fn intersects(&self, other: &Rect) -> bool {
        self.min[0] <= other.max[0]
            && other.min[0] <= self.max[0]
            && self.min[1] <= other.max[1]
            && other.min[1] <= self.max[1]
    }

    /// Area of the overlap between two rectangles (0 if disjoint)
    pub fn overlap_area(&self, other: &Rect) -> f32 {
        let w = self.max[0].min(other.max[0]) - self.min[0].max(other.min[0]);
        let h = self.max[1].min(other.max[1]) - self.min[1].max(other.min[1]);
        if w <= 0.0 || h <= 0.0 {
            0.0
        } else {
            w * h
        }
    }

    /// Whether the point lies inside the rectangle
    pub fn contains(&self, p: [f32; 2]) -> bool {
        p[0] >= self.min[0] && p[0] <= self.max[0] && p[1] >= self.min[1] && p[1] <= self.max[1]
    }
}

/// Whether segment `a0-a1` crosses segment `b0-b1`
pub fn segments_intersect(a0: [f32; 2], a1: [f32; 2], b0: [f32; 2], b1: [f32; 2]) -> bool {
    fn cross(o: [f32; 2], a: [f32; 2], b: [f32; 2]) -> f32 {
        (a[0] - o[0]) * (b[1] - o[1]) - (a[1] - o[1]) * (b[0] - o[0])
    }
    fn on_segment(p: [f32; 2], q: [f32; 2], r: [f32; 2]) -> bool {
        q[0] <= p[0].max(r[0]) && q[0] >= p[0].min(r[0]) && q[1] <= p[1].max(r[1]) && q[1] >= p[1].min(r[1])
    }

    let d1 = cross(b0, b1, a0);
    let d2 = cross(b0, b1, a1);
    let d3 = cross(a0, a1, b0);
    let d4 = cross(a0, a1, b1);

    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
    {
        return true;
    }

    (d1 == 0.0 && on_segment(b0, a0, b1))
        || (d2 == 0.0 && on_segment(b0, a1, b1))
        || (d3 == 0.0 && on_segment(a0, b0, a1))
        || (d4 == 0.0 && on_segment(a0, b1, a1))
}

/// Sample a cubic bezier into `segments + 1` points
pub fn sample_cubic(p0: [f32; 2], c0: [f32; 2], c1: [f32; 2], p1: [f32; 2], segments: usize) -> Vec<[f32; 2]> {
    let segments = segments.max(1);
    (0..=segments)
        .map(|i| {
            let t = i as f32 / segments as f32;
            let u = 1.0 - t;
            let a = u * u * u;
            let b = 3.0 * u * u * t;
            let c = 3.0 * u * t * t;
            let d = t * t * t;
            [
                a * p0[0] + b * c0[0] + c * c1[0] + d * p1[0],
                a * p0[1] + b * c0[1] + c * c1[1] + d * p1[1],
            ]
        })
        .collect()
}
