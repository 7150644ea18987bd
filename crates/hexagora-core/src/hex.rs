//! Axial hex coordinates (q, r) for the game board.
//!
//! Tiles are addressed by axial coordinates; nodes and edges are *not*
//! coordinate types here. The board generator computes the six corner
//! positions of each tile in pixel space and dedups them by rounded
//! position, so the only geometry this module needs is the center
//! projection and the corner offsets.

use serde::{Deserialize, Serialize};

/// Axial coordinate for the hex grid.
///
/// `q` increases going east, `r` increases going southeast. The implicit
/// third coordinate satisfies q + r + s = 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct HexCoord {
    pub q: i32,
    pub r: i32,
}

impl HexCoord {
    pub const fn new(q: i32, r: i32) -> Self {
        Self { q, r }
    }

    /// The implicit third coordinate (s = -q - r)
    pub const fn s(&self) -> i32 {
        -self.q - self.r
    }

    /// The six neighboring hexes in clockwise order starting from East
    pub fn neighbors(&self) -> [HexCoord; 6] {
        [
            HexCoord::new(self.q + 1, self.r),
            HexCoord::new(self.q + 1, self.r - 1),
            HexCoord::new(self.q, self.r - 1),
            HexCoord::new(self.q - 1, self.r),
            HexCoord::new(self.q - 1, self.r + 1),
            HexCoord::new(self.q, self.r + 1),
        ]
    }

    /// Distance to another hex (in hex steps)
    pub fn distance_to(&self, other: &HexCoord) -> u32 {
        let dq = (self.q - other.q).abs();
        let dr = (self.r - other.r).abs();
        let ds = (self.s() - other.s()).abs();
        ((dq + dr + ds) / 2) as u32
    }

    /// Center of the hex in pixel coordinates, pointy-top orientation.
    pub fn to_pixel(&self, hex_size: f64) -> (f64, f64) {
        let x = hex_size * (3.0_f64.sqrt() * self.q as f64 + 3.0_f64.sqrt() / 2.0 * self.r as f64);
        let y = hex_size * (3.0 / 2.0 * self.r as f64);
        (x, y)
    }

    /// The six corner positions of this hex in pixel coordinates,
    /// clockwise. Corners shared with a neighboring hex land on the same
    /// position, which is what the board generator dedups on.
    pub fn corner_pixels(&self, hex_size: f64) -> [(f64, f64); 6] {
        let (cx, cy) = self.to_pixel(hex_size);
        let mut corners = [(0.0, 0.0); 6];
        for (k, corner) in corners.iter_mut().enumerate() {
            let angle = std::f64::consts::PI / 180.0 * (60.0 * k as f64 - 30.0);
            *corner = (cx + hex_size * angle.cos(), cy + hex_size * angle.sin());
        }
        corners
    }

    /// All coordinates within `radius` steps of the origin.
    pub fn disc(radius: i32) -> Vec<HexCoord> {
        let mut coords = Vec::new();
        for q in -radius..=radius {
            let lo = (-radius).max(-q - radius);
            let hi = radius.min(-q + radius);
            for r in lo..=hi {
                coords.push(HexCoord::new(q, r));
            }
        }
        coords
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_hex_neighbors() {
        let center = HexCoord::new(0, 0);
        let neighbors = center.neighbors();

        let unique: HashSet<_> = neighbors.iter().collect();
        assert_eq!(unique.len(), 6);

        for neighbor in &neighbors {
            assert_eq!(center.distance_to(neighbor), 1);
        }
    }

    #[test]
    fn test_hex_distance() {
        let a = HexCoord::new(0, 0);
        let b = HexCoord::new(2, -1);
        assert_eq!(a.distance_to(&b), 2);

        let c = HexCoord::new(-3, 3);
        assert_eq!(a.distance_to(&c), 3);
    }

    #[test]
    fn test_disc_sizes() {
        assert_eq!(HexCoord::disc(0).len(), 1);
        assert_eq!(HexCoord::disc(1).len(), 7);
        assert_eq!(HexCoord::disc(2).len(), 19);
        assert_eq!(HexCoord::disc(3).len(), 37);
    }

    #[test]
    fn test_adjacent_hexes_share_corners() {
        let a = HexCoord::new(0, 0);
        let b = HexCoord::new(1, 0);

        let close =
            |p: (f64, f64), q: (f64, f64)| (p.0 - q.0).abs() < 1e-6 && (p.1 - q.1).abs() < 1e-6;

        // Two adjacent hexes share exactly two corner positions
        let shared = a
            .corner_pixels(1.0)
            .iter()
            .filter(|pa| b.corner_pixels(1.0).iter().any(|pb| close(**pa, *pb)))
            .count();
        assert_eq!(shared, 2);
    }

    #[test]
    fn test_corner_distance_from_center() {
        let hex = HexCoord::new(2, -1);
        let (cx, cy) = hex.to_pixel(60.0);
        for (x, y) in hex.corner_pixels(60.0) {
            let dist = ((x - cx).powi(2) + (y - cy).powi(2)).sqrt();
            assert!((dist - 60.0).abs() < 1e-6);
        }
    }
}
