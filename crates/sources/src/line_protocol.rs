//! Protocol adapter for the sensor unit's line-oriented transport
//!
//! Line format (comma-delimited ASCII, CRLF terminated):
//!
//! ```text
//! timestamp,speed,ph,salinity,pressure,turbidity,energy,load,leak,depth,
//! altitude,itemp,etemp,cond,acc,gyro
//! ```
//!
//! Lines with fewer than [`MIN_LINE_FIELDS`] fields are rejected as
//! malformed. Trailing fields may be missing (they normalize to zero) and
//! fields beyond the sixteenth are ignored.

use tidewatch_core::{Result, TelemetryError, LINE_DELIMITER, LINE_FIELD_COUNT, MIN_LINE_FIELDS};
use tidewatch_types::{clock_timestamp, parse_flag, parse_number, RawFields, Record};

/// Longest line accepted before the framer discards the partial frame
pub const MAX_LINE_BYTES: usize = 1024;

/// Parse one transport line into a record
pub fn parse_line(line: &str) -> Result<Record> {
    parse_line_with_clock(line, clock_timestamp)
}

/// Parse one transport line, using `now` when the line carries no clock string
pub fn parse_line_with_clock(line: &str, now: impl FnOnce() -> String) -> Result<Record> {
    parse_fields(line).map(|raw| Record::from_raw_with_clock(raw, now))
}

/// Map the positional fields of a line onto [`RawFields`]
pub fn parse_fields(line: &str) -> Result<RawFields> {
    let parts: Vec<&str> = line
        .trim_end_matches(['\r', '\n'])
        .split(LINE_DELIMITER)
        .take(LINE_FIELD_COUNT)
        .collect();

    if parts.len() < MIN_LINE_FIELDS {
        return Err(TelemetryError::MalformedLine {
            fields: parts.len(),
            minimum: MIN_LINE_FIELDS,
        });
    }

    let number = |index: usize| parts.get(index).and_then(|text| parse_number(text));
    let timestamp = parts
        .first()
        .map(|text| text.trim())
        .filter(|text| !text.is_empty())
        .map(str::to_string);

    Ok(RawFields {
        timestamp,
        speed: number(1),
        ph: number(2),
        salinity: number(3),
        pressure: number(4),
        turbidity: number(5),
        energy: number(6),
        load: number(7),
        leak: parts.get(8).and_then(|text| parse_flag(text)),
        depth: number(9),
        altitude: number(10),
        int_temp: number(11),
        ext_temp: number(12),
        conductivity: number(13),
        acc: number(14),
        gyro: number(15),
        ..RawFields::default()
    })
}

/// Reassembles complete lines from arbitrarily chunked transport reads.
///
/// Lines end at LF; a preceding CR is stripped. Bytes that are not valid
/// UTF-8 are replaced rather than failing the line. A frame that outgrows
/// [`MAX_LINE_BYTES`] is dropped whole, up to and including its line end.
#[derive(Debug, Default)]
pub struct LineFramer {
    pending: Vec<u8>,
    discarding: bool,
}

impl LineFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of bytes, returning every line it completes
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();

        for &byte in chunk {
            if self.discarding {
                if byte == b'\n' {
                    self.discarding = false;
                }
            } else if byte == b'\n' {
                let mut frame = std::mem::take(&mut self.pending);
                if frame.last() == Some(&b'\r') {
                    frame.pop();
                }
                if !frame.is_empty() {
                    lines.push(String::from_utf8_lossy(&frame).into_owned());
                }
            } else if self.pending.len() < MAX_LINE_BYTES {
                self.pending.push(byte);
            } else {
                log::debug!("Discarding frame longer than {} bytes", MAX_LINE_BYTES);
                self.pending.clear();
                self.discarding = true;
            }
        }

        lines
    }

    /// Bytes received since the last complete line
    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_clock() -> String {
        "09:15:00".to_string()
    }

    #[test]
    fn test_full_line() {
        let record =
            parse_line("08:00:00,5,7.1,1900,104,1.2,3800,40,0,2,1,32,24,55,0.1,10").unwrap();

        assert_eq!(record.timestamp, "08:00:00");
        assert_eq!(record.speed, 5.0);
        assert_eq!(record.ph, 7.1);
        assert_eq!(record.salinity, 1900.0);
        assert_eq!(record.pressure, 104.0);
        assert_eq!(record.turbidity, 1.2);
        assert_eq!(record.energy, 3800.0);
        assert_eq!(record.load, 40.0);
        assert!(!record.leak);
        assert_eq!(record.depth, 2.0);
        assert_eq!(record.altitude, 1.0);
        assert_eq!(record.int_temp, 32.0);
        assert_eq!(record.ext_temp, 24.0);
        assert_eq!(record.conductivity, 55.0);
        assert_eq!(record.acceleration(), [0.1, 0.1, 0.1]);
        assert_eq!(record.angular_rate(), [10.0, 10.0, 10.0]);
    }

    #[test]
    fn test_short_lines_are_malformed() {
        for line in ["", "08:00:00", "1,2,3,4,5,6,7,8,9"] {
            let err = parse_line(line).unwrap_err();
            assert!(matches!(err, TelemetryError::MalformedLine { minimum: 10, .. }));
        }
    }

    #[test]
    fn test_partial_lines_are_accepted() {
        // Lines with 10-15 fields are accepted as-is. Whether the sensor unit
        // ever sends them on purpose or they are truncated frames is unknown.
        let record = parse_line_with_clock("08:00:00,5,7.1,1900,104,1.2,3800,40,1,2", fixed_clock)
            .unwrap();

        assert_eq!(record.depth, 2.0);
        assert!(record.leak);
        assert_eq!(record.altitude, 0.0);
        assert_eq!(record.conductivity, 0.0);
        assert_eq!(record.acceleration(), [0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_numeric_fields_always_finite() {
        let lines = [
            "x,abc,NaN,inf,-inf,,  ,1e400,?,--,1,2,3,4,5,6",
            ",,,,,,,,,,,,,,,",
            "12:00:00,1,2,3,4,5,6,7,8,9,10,11,12,13,14,15,16,17,18",
        ];
        for line in lines {
            let record = parse_line_with_clock(line, fixed_clock).unwrap();
            let json = serde_json::to_value(&record).unwrap();
            for (key, value) in json.as_object().unwrap() {
                if let Some(number) = value.as_f64() {
                    assert!(number.is_finite(), "{} not finite for {:?}", key, line);
                }
            }
        }
    }

    #[test]
    fn test_timestamp_substituted_when_not_a_clock() {
        let record = parse_line_with_clock("1712,5,7,1900,104,1,3800,40,0,2", fixed_clock).unwrap();
        assert_eq!(record.timestamp, "09:15:00");

        let record = parse_line_with_clock(",5,7,1900,104,1,3800,40,0,2", fixed_clock).unwrap();
        assert_eq!(record.timestamp, "09:15:00");
    }

    #[test]
    fn test_extra_fields_ignored() {
        let record = parse_line_with_clock(
            "08:00:00,5,7.1,1900,104,1.2,3800,40,0,2,1,32,24,55,0.1,10,999,888",
            fixed_clock,
        )
        .unwrap();
        assert_eq!(record.gyro_z, 10.0);
    }

    #[test]
    fn test_framer_handles_split_reads() {
        let mut framer = LineFramer::new();

        assert!(framer.push(b"08:00:00,5,7").is_empty());
        assert_eq!(framer.pending(), 12);

        let lines = framer.push(b".1\r\n08:00:01,6\r\n\r\npartial");
        assert_eq!(lines, vec!["08:00:00,5,7.1", "08:00:01,6"]);
        assert_eq!(framer.pending(), 7);

        assert_eq!(framer.push(b"\n"), vec!["partial"]);
    }

    #[test]
    fn test_framer_discards_runaway_frames() {
        let mut framer = LineFramer::new();
        let garbage = vec![b'x'; MAX_LINE_BYTES + 10];

        assert!(framer.push(&garbage).is_empty());
        assert_eq!(framer.pending(), 0);
        assert_eq!(framer.push(b"\n1,2\n"), vec!["1,2"]);
    }

    #[test]
    fn test_framer_drops_tail_of_overlong_frame() {
        let mut framer = LineFramer::new();
        let mut frame = "9,".repeat(MAX_LINE_BYTES / 2 + 100).into_bytes();
        frame.extend_from_slice(b"\r\n");

        assert!(framer.push(&frame).is_empty());
        assert_eq!(framer.pending(), 0);

        let line = "08:00:00,5,7.1,1900,104,1.2,3800,40,0,2,1,32,24,55,0.1,10\r\n";
        let lines = framer.push(line.as_bytes());
        assert_eq!(lines.len(), 1);
        assert_eq!(parse_line(&lines[0]).unwrap().ph, 7.1);
    }
}
