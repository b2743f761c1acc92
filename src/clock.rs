// Clock Module - Wall-clock source and cached clock-hand angles
use anyhow::Result;
use std::time::{Duration, Instant};
use time::{OffsetDateTime, UtcOffset};

/// Supplies the current time of day.
pub trait TimeSource {
    /// (hour, minute, second) in the configured zone, 24-hour clock.
    fn now_hms(&self) -> (u8, u8, u8);
}

/// System clock shifted to a fixed UTC offset.
pub struct WallClock {
    offset: UtcOffset,
}

impl WallClock {
    pub fn new(offset: UtcOffset) -> Self {
        WallClock { offset }
    }

    pub fn offset(&self) -> UtcOffset {
        self.offset
    }

    pub fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc().to_offset(self.offset)
    }
}

impl TimeSource for WallClock {
    fn now_hms(&self) -> (u8, u8, u8) {
        self.now().to_hms()
    }
}

/// A clock stuck at one moment, for tests and still renders.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl TimeSource for FixedClock {
    fn now_hms(&self) -> (u8, u8, u8) {
        (self.hour, self.minute, self.second)
    }
}

/// Parse "local", "utc", or a signed "HH[:MM]" offset such as "+05:30".
///
/// "local" must be resolved before any threads are spawned; it falls back to
/// UTC when the platform cannot report the local offset safely.
pub fn parse_utc_offset(s: &str) -> Result<UtcOffset> {
    let s = s.trim();
    match s.to_lowercase().as_str() {
        "local" => {
            return Ok(UtcOffset::current_local_offset().unwrap_or_else(|_| {
                tracing::warn!("local UTC offset unavailable, using UTC");
                UtcOffset::UTC
            }))
        }
        "utc" | "z" | "" => return Ok(UtcOffset::UTC),
        _ => {}
    }

    let (sign, rest) = match s.as_bytes()[0] {
        b'-' => (-1i8, &s[1..]),
        b'+' => (1i8, &s[1..]),
        _ => (1i8, s),
    };
    let mut parts = rest.split(':');
    let hours: i8 = parts
        .next()
        .unwrap_or("0")
        .parse()
        .map_err(|_| anyhow::anyhow!("Invalid UTC offset: {}", s))?;
    let minutes: i8 = match parts.next() {
        Some(m) => m.parse().map_err(|_| anyhow::anyhow!("Invalid UTC offset: {}", s))?,
        None => 0,
    };
    Ok(UtcOffset::from_hms(sign * hours, sign * minutes, 0)?)
}

/// Hand angle in unit-256. Angles shrink as time advances so the hands
/// sweep clockwise on the board.
fn hand_angle(value: f32, units_per_turn: f32) -> u8 {
    let angle = 256.0 - value * 256.0 / units_per_turn;
    angle.rem_euclid(256.0) as u8
}

/// (hour, minute, second) hand angles for a time of day.
pub fn hand_angles(hour: u8, minute: u8, second: u8) -> (u8, u8, u8) {
    let second = second as f32;
    let minute = minute as f32 + second / 60.0;
    let hour = hour as f32 + minute / 60.0;
    (
        hand_angle(hour, 12.0),
        hand_angle(minute, 60.0),
        hand_angle(second, 60.0),
    )
}

/// Hand angles cached between refreshes so every frame in a tick agrees.
#[derive(Debug, Clone, Default)]
pub struct ClockHands {
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    last_refresh: Option<Instant>,
}

impl ClockHands {
    pub const REFRESH_INTERVAL: Duration = Duration::from_millis(100);

    /// Re-read the time source if the refresh interval has passed.
    pub fn tick(&mut self, now: Instant, source: &dyn TimeSource) {
        let due = match self.last_refresh {
            Some(last) => now.duration_since(last) >= Self::REFRESH_INTERVAL,
            None => true,
        };
        if !due {
            return;
        }
        let (h, m, s) = source.now_hms();
        (self.hour, self.minute, self.second) = hand_angles(h, m, s);
        self.last_refresh = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hand_angles_at_noon_point_up() {
        assert_eq!(hand_angles(0, 0, 0), (0, 0, 0));
        assert_eq!(hand_angles(12, 0, 0), (0, 0, 0));
    }

    #[test]
    fn test_hand_angles_quarter_past_three() {
        let (h, m, s) = hand_angles(3, 15, 0);
        // quarter turn clockwise is 256 - 64
        assert_eq!(m, 192);
        // 3:15 puts the hour hand a little past the quarter
        assert!(h < 192 && h > 180, "hour angle {}", h);
        assert_eq!(s, 0);
    }

    #[test]
    fn test_seconds_sweep() {
        assert_eq!(hand_angles(0, 0, 30).2, 128);
        assert_eq!(hand_angles(0, 0, 15).2, 192);
    }

    #[test]
    fn test_afternoon_hours_wrap() {
        assert_eq!(hand_angles(15, 0, 0).0, hand_angles(3, 0, 0).0);
    }

    #[test]
    fn test_clock_hands_refresh_gate() {
        let start = Instant::now();
        let mut hands = ClockHands::default();
        hands.tick(start, &FixedClock { hour: 0, minute: 0, second: 30 });
        assert_eq!(hands.second, 128);

        // within the interval the cached angle holds
        hands.tick(start + Duration::from_millis(50), &FixedClock { hour: 0, minute: 0, second: 15 });
        assert_eq!(hands.second, 128);

        hands.tick(start + Duration::from_millis(100), &FixedClock { hour: 0, minute: 0, second: 15 });
        assert_eq!(hands.second, 192);
    }

    #[test]
    fn test_parse_utc_offset() {
        assert_eq!(parse_utc_offset("utc").unwrap(), UtcOffset::UTC);
        assert_eq!(
            parse_utc_offset("+05:30").unwrap(),
            UtcOffset::from_hms(5, 30, 0).unwrap()
        );
        assert_eq!(
            parse_utc_offset("-8").unwrap(),
            UtcOffset::from_hms(-8, 0, 0).unwrap()
        );
        assert!(parse_utc_offset("+5:xx").is_err());
        assert!(parse_utc_offset("+30").is_err());
    }
}
