// Layout Module - Per-board coordinate model mapping physical LED index to spatial position
//
// Every board exposes, per physical pixel, an angle (256 units == 360 degrees),
// a radius proxy (monotone "distance from centre", 0..=255) and optionally a
// Cartesian position. Spiral boards additionally carry the radial-order
// bijection between physical index and rank along the Vogel spiral.

use std::fmt;

/// Configuration and lookup failures for a pixel layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    /// Layout has no pixels.
    Empty,
    /// A table's length does not match the board's pixel count.
    LengthMismatch {
        table: &'static str,
        expected: usize,
        actual: usize,
    },
    /// The declared topology requires a table the asset does not provide.
    MissingTable {
        table: &'static str,
        topology: &'static str,
    },
    /// A radial-order table repeats a value or contains one out of range.
    NotAPermutation { table: &'static str, value: usize },
    /// `radial_order_inverse[radial_order[p]] != p`.
    InverseMismatch { physical: usize, rank: usize },
    /// Radius rescale constants are undefined for this pixel count.
    UnsupportedPixelCount(usize),
    /// Index outside `[0, pixel_count)`.
    OutOfRange { index: usize, len: usize },
    /// Board has no spiral radial order.
    NoRadialOrder,
    /// Board has no radius proxy.
    NoRadiusProxy,
    /// Board has no coordinate map.
    NoCoordinates,
}

impl fmt::Display for LayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "layout has no pixels"),
            Self::LengthMismatch { table, expected, actual } => write!(
                f,
                "table '{}' has {} entries, expected {}",
                table, actual, expected
            ),
            Self::MissingTable { table, topology } => {
                write!(f, "{} topology requires table '{}'", topology, table)
            }
            Self::NotAPermutation { table, value } => write!(
                f,
                "table '{}' is not a permutation (bad or repeated value {})",
                table, value
            ),
            Self::InverseMismatch { physical, rank } => write!(
                f,
                "radial order inverse mismatch: physical {} -> rank {} does not map back",
                physical, rank
            ),
            Self::UnsupportedPixelCount(n) => write!(
                f,
                "no radius rescale constants for {} pixels (need a power of two or 34)",
                n
            ),
            Self::OutOfRange { index, len } => {
                write!(f, "index {} out of range for {} pixels", index, len)
            }
            Self::NoRadialOrder => write!(f, "board has no radial order"),
            Self::NoRadiusProxy => write!(f, "board has no radius proxy"),
            Self::NoCoordinates => write!(f, "board has no coordinate map"),
        }
    }
}

impl std::error::Error for LayoutError {}

/// Constants that rescale a radial rank `0..pixel_count` into the shared
/// `0..=255` radius-proxy space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RadiusScale {
    pub multiplier: u8,
    pub divisor: u8,
}

impl RadiusScale {
    /// Topologies whose proxy is already in `0..=255`.
    pub const IDENTITY: RadiusScale = RadiusScale { multiplier: 1, divisor: 1 };

    /// Largest pixel count whose divisor still fits in a `u8`.
    pub const MAX_PIXELS: usize = 256 * 128;

    pub fn for_pixel_count(pixel_count: usize) -> Result<Self, LayoutError> {
        let power_of_two = pixel_count.is_power_of_two();
        if pixel_count == 34 {
            // 34 * 8 overshoots 255; apply() saturates
            return Ok(RadiusScale { multiplier: 8, divisor: 1 });
        }
        if !power_of_two || pixel_count < 2 || pixel_count > Self::MAX_PIXELS {
            return Err(LayoutError::UnsupportedPixelCount(pixel_count));
        }
        if pixel_count >= 256 {
            Ok(RadiusScale {
                multiplier: 1,
                divisor: (pixel_count / 256) as u8,
            })
        } else {
            Ok(RadiusScale {
                multiplier: (256 / pixel_count) as u8,
                divisor: 1,
            })
        }
    }

    pub fn apply(&self, rank: usize) -> u8 {
        let scaled = rank * self.multiplier as usize / self.divisor as usize;
        scaled.min(255) as u8
    }
}

/// Physical index <-> radial rank bijection for spiral boards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RadialOrder {
    to_rank: Vec<u16>,
    to_physical: Vec<u16>,
}

impl RadialOrder {
    /// Build from `radial_order` (physical -> rank) and its inverse, checking
    /// that both are permutations and that they invert each other.
    pub fn new(to_rank: Vec<u16>, to_physical: Vec<u16>) -> Result<Self, LayoutError> {
        let n = to_rank.len();
        if n == 0 {
            return Err(LayoutError::Empty);
        }
        if to_physical.len() != n {
            return Err(LayoutError::LengthMismatch {
                table: "radial_order_inverse",
                expected: n,
                actual: to_physical.len(),
            });
        }
        check_permutation("radial_order", &to_rank)?;
        check_permutation("radial_order_inverse", &to_physical)?;
        for (physical, &rank) in to_rank.iter().enumerate() {
            if to_physical[rank as usize] as usize != physical {
                return Err(LayoutError::InverseMismatch {
                    physical,
                    rank: rank as usize,
                });
            }
        }
        Ok(RadialOrder { to_rank, to_physical })
    }

    /// Build from `radial_order` alone, deriving the inverse.
    pub fn from_ranks(to_rank: Vec<u16>) -> Result<Self, LayoutError> {
        check_permutation("radial_order", &to_rank)?;
        let mut to_physical = vec![0u16; to_rank.len()];
        for (physical, &rank) in to_rank.iter().enumerate() {
            to_physical[rank as usize] = physical as u16;
        }
        Self::new(to_rank, to_physical)
    }

    pub fn len(&self) -> usize {
        self.to_rank.len()
    }

    pub fn rank(&self, physical: usize) -> Result<usize, LayoutError> {
        self.to_rank
            .get(physical)
            .map(|&r| r as usize)
            .ok_or(LayoutError::OutOfRange { index: physical, len: self.len() })
    }

    pub fn physical(&self, rank: usize) -> Result<usize, LayoutError> {
        self.to_physical
            .get(rank)
            .map(|&p| p as usize)
            .ok_or(LayoutError::OutOfRange { index: rank, len: self.len() })
    }

    pub fn ranks(&self) -> &[u16] {
        &self.to_rank
    }

    pub fn physicals(&self) -> &[u16] {
        &self.to_physical
    }
}

fn check_permutation(table: &'static str, values: &[u16]) -> Result<(), LayoutError> {
    let mut seen = vec![false; values.len()];
    for &v in values {
        let v = v as usize;
        if v >= values.len() || seen[v] {
            return Err(LayoutError::NotAPermutation { table, value: v });
        }
        seen[v] = true;
    }
    Ok(())
}

/// Board topology, chosen once when the layout is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Topology {
    /// Vogel spiral; the radius proxy is the rescaled radial rank.
    Spiral(RadialOrder),
    /// Hand-assigned per-segment distance (e.g. body + tentacles).
    Segment,
    /// Angles (and maybe coordinates) only.
    Unmapped,
}

impl Topology {
    pub fn name(&self) -> &'static str {
        match self {
            Topology::Spiral(_) => "spiral",
            Topology::Segment => "segment",
            Topology::Unmapped => "unmapped",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coordinates {
    pub x: Vec<u8>,
    pub y: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelLayout {
    name: String,
    angles: Vec<u8>,
    radius_proxy: Option<Vec<u8>>,
    radius_scale: RadiusScale,
    coords: Option<Coordinates>,
    topology: Topology,
}

impl PixelLayout {
    pub fn spiral(
        name: &str,
        angles: Vec<u8>,
        coords: Option<Coordinates>,
        radial_order: RadialOrder,
    ) -> Result<Self, LayoutError> {
        let n = check_angles(&angles)?;
        check_len("radial_order", n, radial_order.len())?;
        check_coords(n, coords.as_ref())?;
        let radius_scale = RadiusScale::for_pixel_count(n)?;
        let radius_proxy = radial_order
            .ranks()
            .iter()
            .map(|&rank| radius_scale.apply(rank as usize))
            .collect();
        Ok(PixelLayout {
            name: name.to_string(),
            angles,
            radius_proxy: Some(radius_proxy),
            radius_scale,
            coords,
            topology: Topology::Spiral(radial_order),
        })
    }

    pub fn segment(
        name: &str,
        angles: Vec<u8>,
        coords: Option<Coordinates>,
        distance: Vec<u8>,
    ) -> Result<Self, LayoutError> {
        let n = check_angles(&angles)?;
        check_len("segment_distance", n, distance.len())?;
        check_coords(n, coords.as_ref())?;
        Ok(PixelLayout {
            name: name.to_string(),
            angles,
            radius_proxy: Some(distance),
            radius_scale: RadiusScale::IDENTITY,
            coords,
            topology: Topology::Segment,
        })
    }

    pub fn unmapped(
        name: &str,
        angles: Vec<u8>,
        coords: Option<Coordinates>,
    ) -> Result<Self, LayoutError> {
        let n = check_angles(&angles)?;
        check_coords(n, coords.as_ref())?;
        Ok(PixelLayout {
            name: name.to_string(),
            angles,
            radius_proxy: None,
            radius_scale: RadiusScale::IDENTITY,
            coords,
            topology: Topology::Unmapped,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pixel_count(&self) -> usize {
        self.angles.len()
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn radius_scale(&self) -> RadiusScale {
        self.radius_scale
    }

    pub fn angles(&self) -> &[u8] {
        &self.angles
    }

    pub fn radius_proxies(&self) -> Option<&[u8]> {
        self.radius_proxy.as_deref()
    }

    pub fn coordinates(&self) -> Option<&Coordinates> {
        self.coords.as_ref()
    }

    pub fn radial_order(&self) -> Option<&RadialOrder> {
        match &self.topology {
            Topology::Spiral(order) => Some(order),
            _ => None,
        }
    }

    pub fn angle(&self, i: usize) -> Result<u8, LayoutError> {
        self.angles.get(i).copied().ok_or(self.out_of_range(i))
    }

    pub fn radius_proxy(&self, i: usize) -> Result<u8, LayoutError> {
        let radii = self.radius_proxies().ok_or(LayoutError::NoRadiusProxy)?;
        radii.get(i).copied().ok_or(self.out_of_range(i))
    }

    pub fn coord_x(&self, i: usize) -> Result<u8, LayoutError> {
        let coords = self.coords.as_ref().ok_or(LayoutError::NoCoordinates)?;
        coords.x.get(i).copied().ok_or(self.out_of_range(i))
    }

    pub fn coord_y(&self, i: usize) -> Result<u8, LayoutError> {
        let coords = self.coords.as_ref().ok_or(LayoutError::NoCoordinates)?;
        coords.y.get(i).copied().ok_or(self.out_of_range(i))
    }

    pub fn radial_rank(&self, physical: usize) -> Result<usize, LayoutError> {
        self.radial_order()
            .ok_or(LayoutError::NoRadialOrder)?
            .rank(physical)
    }

    pub fn physical_index(&self, rank: usize) -> Result<usize, LayoutError> {
        self.radial_order()
            .ok_or(LayoutError::NoRadialOrder)?
            .physical(rank)
    }

    pub fn is_spiral(&self) -> bool {
        matches!(self.topology, Topology::Spiral(_))
    }

    fn out_of_range(&self, index: usize) -> LayoutError {
        LayoutError::OutOfRange { index, len: self.pixel_count() }
    }
}

fn check_angles(angles: &[u8]) -> Result<usize, LayoutError> {
    if angles.is_empty() {
        return Err(LayoutError::Empty);
    }
    Ok(angles.len())
}

fn check_len(table: &'static str, expected: usize, actual: usize) -> Result<(), LayoutError> {
    if expected != actual {
        return Err(LayoutError::LengthMismatch { table, expected, actual });
    }
    Ok(())
}

fn check_coords(n: usize, coords: Option<&Coordinates>) -> Result<(), LayoutError> {
    if let Some(c) = coords {
        check_len("coords_x", n, c.x.len())?;
        check_len("coords_y", n, c.y.len())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn four_pixel_spiral() -> PixelLayout {
        let order = RadialOrder::from_ranks(vec![2, 0, 3, 1]).unwrap();
        PixelLayout::spiral("test4", vec![0, 64, 128, 192], None, order).unwrap()
    }

    #[test]
    fn test_radius_scale_constants() {
        assert_eq!(RadiusScale::for_pixel_count(256).unwrap(), RadiusScale::IDENTITY);
        assert_eq!(
            RadiusScale::for_pixel_count(512).unwrap(),
            RadiusScale { multiplier: 1, divisor: 2 }
        );
        assert_eq!(
            RadiusScale::for_pixel_count(64).unwrap(),
            RadiusScale { multiplier: 4, divisor: 1 }
        );
        assert_eq!(
            RadiusScale::for_pixel_count(34).unwrap(),
            RadiusScale { multiplier: 8, divisor: 1 }
        );
        assert_eq!(
            RadiusScale::for_pixel_count(100),
            Err(LayoutError::UnsupportedPixelCount(100))
        );
        assert!(RadiusScale::for_pixel_count(1).is_err());
        assert!(RadiusScale::for_pixel_count(65536).is_err());
    }

    #[test]
    fn test_radius_scale_saturates_for_34() {
        let scale = RadiusScale::for_pixel_count(34).unwrap();
        assert_eq!(scale.apply(31), 248);
        assert_eq!(scale.apply(32), 255);
        assert_eq!(scale.apply(33), 255);
    }

    #[test]
    fn test_radius_proxy_is_rescaled_rank() {
        let layout = four_pixel_spiral();
        assert_eq!(layout.radius_proxies().unwrap(), &[128, 0, 192, 64]);
        assert_eq!(layout.radius_proxy(2), Ok(192));
    }

    #[test]
    fn test_radial_lookups() {
        let layout = four_pixel_spiral();
        assert_eq!(layout.radial_rank(0), Ok(2));
        assert_eq!(layout.physical_index(2), Ok(0));
        assert_eq!(
            layout.radial_rank(4),
            Err(LayoutError::OutOfRange { index: 4, len: 4 })
        );
        assert_eq!(
            layout.physical_index(9),
            Err(LayoutError::OutOfRange { index: 9, len: 4 })
        );
    }

    #[test]
    fn test_non_spiral_has_no_radial_order() {
        let layout = PixelLayout::segment("seg", vec![0, 1], None, vec![0, 255]).unwrap();
        assert_eq!(layout.radial_rank(0), Err(LayoutError::NoRadialOrder));
        assert_eq!(layout.radius_proxy(1), Ok(255));
        assert_eq!(layout.coord_x(0), Err(LayoutError::NoCoordinates));

        let bare = PixelLayout::unmapped("bare", vec![0, 1], None).unwrap();
        assert_eq!(bare.radius_proxy(0), Err(LayoutError::NoRadiusProxy));
        assert!(bare.radius_proxies().is_none());
    }

    #[test]
    fn test_rejects_broken_permutation() {
        assert_eq!(
            RadialOrder::from_ranks(vec![0, 1, 1, 3]),
            Err(LayoutError::NotAPermutation { table: "radial_order", value: 1 })
        );
        assert_eq!(
            RadialOrder::new(vec![0, 1], vec![0, 2]),
            Err(LayoutError::NotAPermutation { table: "radial_order_inverse", value: 2 })
        );
        assert_eq!(
            RadialOrder::new(vec![1, 0, 2], vec![0, 1, 2]),
            Err(LayoutError::InverseMismatch { physical: 0, rank: 1 })
        );
    }

    #[test]
    fn test_rejects_length_mismatch() {
        let order = RadialOrder::from_ranks(vec![0, 1]).unwrap();
        let err = PixelLayout::spiral("x", vec![0, 1, 2, 3], None, order).unwrap_err();
        assert_eq!(
            err,
            LayoutError::LengthMismatch { table: "radial_order", expected: 4, actual: 2 }
        );
        let coords = Coordinates { x: vec![0; 2], y: vec![0; 3] };
        assert!(PixelLayout::unmapped("x", vec![0, 0], Some(coords)).is_err());
        assert_eq!(PixelLayout::unmapped("x", vec![], None), Err(LayoutError::Empty));
    }

    #[test]
    fn test_spiral_rejects_unscalable_count() {
        let order = RadialOrder::from_ranks(vec![0, 1, 2]).unwrap();
        assert_eq!(
            PixelLayout::spiral("x", vec![0, 1, 2], None, order),
            Err(LayoutError::UnsupportedPixelCount(3))
        );
    }

    fn permutation(max: usize) -> impl Strategy<Value = Vec<u16>> {
        prop::sample::select(vec![2usize, 4, 8, 16, 32, 34, 64, 128])
            .prop_filter("fits", move |n| *n <= max)
            .prop_flat_map(|n| Just((0..n as u16).collect::<Vec<_>>()).prop_shuffle())
    }

    proptest! {
        #[test]
        fn radial_order_is_a_bijection(ranks in permutation(128)) {
            let n = ranks.len();
            let order = RadialOrder::from_ranks(ranks).unwrap();
            for k in 0..n {
                prop_assert_eq!(order.rank(order.physical(k).unwrap()).unwrap(), k);
            }
            for p in 0..n {
                prop_assert_eq!(order.physical(order.rank(p).unwrap()).unwrap(), p);
            }
        }

        #[test]
        fn radius_proxy_is_monotone_in_rank(ranks in permutation(128)) {
            let n = ranks.len();
            let order = RadialOrder::from_ranks(ranks).unwrap();
            let layout = PixelLayout::spiral("p", vec![0; n], None, order).unwrap();
            let mut last = 0u8;
            for k in 0..n {
                let r = layout.radius_proxy(layout.physical_index(k).unwrap()).unwrap();
                prop_assert!(r >= last);
                last = r;
            }
        }
    }
}
