// 8-bit math helpers - saturating and wrapping arithmetic on u8 channels and angles

/// Saturating add, clamps at 255.
pub fn qadd8(a: u8, b: u8) -> u8 {
    a.saturating_add(b)
}

/// Saturating subtract, clamps at 0.
pub fn qsub8(a: u8, b: u8) -> u8 {
    a.saturating_sub(b)
}

/// Wrapping subtract (mod 256). In angle space this is the forward
/// distance from `b` to `a`.
pub fn sub8(a: u8, b: u8) -> u8 {
    a.wrapping_sub(b)
}

/// Scale `value` by `scale / 256`, with 255 acting as identity.
pub fn scale8(value: u8, scale: u8) -> u8 {
    ((value as u16 * (1 + scale as u16)) >> 8) as u8
}

/// Integer linear re-map of `x` from `[in_min, in_max]` onto `[out_min, out_max]`.
///
/// A degenerate input range maps everything to `out_min`.
pub fn map8(x: u8, in_min: u8, in_max: u8, out_min: u8, out_max: u8) -> u8 {
    if in_min == in_max {
        return out_min;
    }
    let x = x as i32;
    let (in_min, in_max) = (in_min as i32, in_max as i32);
    let (out_min, out_max) = (out_min as i32, out_max as i32);
    let mapped = (x - in_min) * (out_max - out_min) / (in_max - in_min) + out_min;
    mapped.clamp(0, 255) as u8
}

/// Sawtooth phase that wraps `bpm` times per minute.
pub fn beat8(bpm: u8, elapsed_ms: u64) -> u8 {
    ((elapsed_ms.wrapping_mul(bpm as u64).wrapping_mul(280)) >> 16) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_saturating_ops() {
        assert_eq!(qadd8(200, 100), 255);
        assert_eq!(qadd8(1, 2), 3);
        assert_eq!(qsub8(10, 20), 0);
        assert_eq!(qsub8(20, 10), 10);
    }

    #[test]
    fn test_sub8_wraps() {
        assert_eq!(sub8(2, 254), 4);
        assert_eq!(sub8(254, 2), 252);
        assert_eq!(sub8(0, 1), 255);
    }

    #[test]
    fn test_scale8() {
        assert_eq!(scale8(200, 255), 200);
        assert_eq!(scale8(200, 0), 0);
        assert_eq!(scale8(255, 127), 127);
    }

    #[test]
    fn test_map8() {
        assert_eq!(map8(0, 0, 10, 0, 255), 0);
        assert_eq!(map8(10, 0, 10, 0, 255), 255);
        assert_eq!(map8(5, 0, 10, 0, 255), 127);
        assert_eq!(map8(3, 0, 0, 0, 255), 0);
    }

    #[test]
    fn test_beat8_advances_and_wraps() {
        assert_eq!(beat8(60, 0), 0);
        // one full cycle per second at 60 bpm, give or take rounding
        let quarter = beat8(60, 250);
        assert!((60..=70).contains(&quarter), "quarter beat was {}", quarter);
        assert!(beat8(60, 990) > 240);
        assert!(beat8(60, 1010) < 10);
    }
}
