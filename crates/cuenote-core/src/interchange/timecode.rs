//! Subtitle timecode formatting and parsing.
//!
//! SRT writes `HH:MM:SS,mmm`, WebVTT writes `HH:MM:SS.mmm`. The parser
//! accepts either separator plus the short `MM:SS.mmm` form some files use,
//! and returns `None` instead of failing so cue parsing can skip bad blocks.

const MS_PER_HOUR: u64 = 3_600_000;
const MS_PER_MINUTE: u64 = 60_000;

/// Format seconds as an SRT timecode (`00:02:05,500`).
pub fn format_srt(seconds: f64) -> String {
    format_with(seconds, ',')
}

/// Format seconds as a WebVTT timecode (`00:02:05.500`).
pub fn format_vtt(seconds: f64) -> String {
    format_with(seconds, '.')
}

fn format_with(seconds: f64, separator: char) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;
    let hours = total_ms / MS_PER_HOUR;
    let minutes = (total_ms % MS_PER_HOUR) / MS_PER_MINUTE;
    let secs = (total_ms % MS_PER_MINUTE) / 1000;
    let millis = total_ms % 1000;
    format!("{hours:02}:{minutes:02}:{secs:02}{separator}{millis:03}")
}

/// Parse a timecode into seconds. Accepts `HH:MM:SS,mmm`, `HH:MM:SS.mmm`,
/// and `MM:SS.mmm`; fractional digits beyond or short of three are scaled.
pub fn parse(input: &str) -> Option<f64> {
    let normalized = input.trim().replace(',', ".");
    let parts: Vec<&str> = normalized.split(':').collect();
    if parts.len() < 2 || parts.len() > 3 {
        return None;
    }

    let (hours, minutes, seconds_part) = if parts.len() == 3 {
        (
            parts[0].parse::<u64>().ok()?,
            parts[1].parse::<u64>().ok()?,
            parts[2],
        )
    } else {
        (0, parts[0].parse::<u64>().ok()?, parts[1])
    };

    let mut seconds_split = seconds_part.splitn(2, '.');
    let whole = seconds_split.next()?.parse::<u64>().ok()?;
    let millis = match seconds_split.next() {
        Some(fraction) if !fraction.is_empty() => {
            let digits = fraction.parse::<u64>().ok()?;
            match fraction.len() {
                1 => digits * 100,
                2 => digits * 10,
                3 => digits,
                extra => digits / 10_u64.pow(extra as u32 - 3),
            }
        }
        _ => 0,
    };

    let total_ms = hours * MS_PER_HOUR + minutes * MS_PER_MINUTE + whole * 1000 + millis;
    Some(total_ms as f64 / 1000.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_srt() {
        assert_eq!(format_srt(0.0), "00:00:00,000");
        assert_eq!(format_srt(10.0), "00:00:10,000");
        assert_eq!(format_srt(20.5), "00:00:20,500");
        assert_eq!(format_srt(3725.042), "01:02:05,042");
    }

    #[test]
    fn test_format_vtt() {
        assert_eq!(format_vtt(10.0), "00:00:10.000");
        assert_eq!(format_vtt(7384.9), "02:03:04.900");
    }

    #[test]
    fn test_parse_both_separators() {
        assert_eq!(parse("00:00:10,000"), Some(10.0));
        assert_eq!(parse("00:00:10.000"), Some(10.0));
        assert_eq!(parse("01:02:05,042"), Some(3725.042));
    }

    #[test]
    fn test_parse_short_form() {
        assert_eq!(parse("02:30.5"), Some(150.5));
        assert_eq!(parse("05:00"), Some(300.0));
    }

    #[test]
    fn test_parse_odd_fraction_lengths() {
        assert_eq!(parse("00:00:01.5"), Some(1.5));
        assert_eq!(parse("00:00:01.25"), Some(1.25));
        assert_eq!(parse("00:00:01.2505"), Some(1.25));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse("not a time").is_none());
        assert!(parse("10").is_none());
        assert!(parse("a:b:c").is_none());
        assert!(parse("1:2:3:4").is_none());
    }

    #[test]
    fn test_roundtrip_canonical() {
        for input in ["00:00:00,000", "00:00:20,500", "12:34:56,789"] {
            let seconds = parse(input).unwrap();
            assert_eq!(format_srt(seconds), input);
        }
    }
}
