use crate::error::ParseError;

/// Two raw FSR readings taken from one sensor line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorFrame {
    pub fsr1: i32,
    pub fsr2: i32,
}

impl SensorFrame {
    pub fn new(fsr1: i32, fsr2: i32) -> Self {
        Self { fsr1, fsr2 }
    }
}

/// Parse `"<label1>: <int1>, <label2>: <int2>, <anything>"`.
///
/// The third field is required but never inspected. Labels are not checked
/// either, so firmware that renames `FSR1`/`FSR2` still parses.
pub fn parse_line(line: &str) -> Result<SensorFrame, ParseError> {
    let line = line.trim();
    if line.is_empty() {
        return Err(ParseError::Empty);
    }

    let fields: Vec<&str> = line.split(',').collect();
    if fields.len() != 3 {
        return Err(ParseError::FieldCount(fields.len()));
    }

    Ok(SensorFrame {
        fsr1: field_value(fields[0])?,
        fsr2: field_value(fields[1])?,
    })
}

fn field_value(field: &str) -> Result<i32, ParseError> {
    let (_, raw) = field
        .split_once(": ")
        .ok_or_else(|| ParseError::MissingValue(field.trim().to_string()))?;
    let raw = raw.trim();
    raw.parse::<i32>()
        .map_err(|_| ParseError::InvalidInteger(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_firmware_line() {
        let frame = parse_line("FSR1: 712, FSR2: 688, Avg: 700").unwrap();
        assert_eq!(frame, SensorFrame::new(712, 688));
    }

    #[test]
    fn keeps_integers_exactly() {
        for (a, b) in [(0, 0), (305, 306), (-4, 1023), (i32::MAX, i32::MIN)] {
            let line = format!("FSR1: {a}, FSR2: {b}, ignored");
            assert_eq!(parse_line(&line).unwrap(), SensorFrame::new(a, b));
        }
    }

    #[test]
    fn tolerates_trailing_newline_and_carriage_return() {
        let frame = parse_line("FSR1: 400, FSR2: 410, x\r\n").unwrap();
        assert_eq!(frame, SensorFrame::new(400, 410));
    }

    #[test]
    fn rejects_wrong_field_count() {
        assert_eq!(
            parse_line("FSR1: 400, FSR2: 410"),
            Err(ParseError::FieldCount(2))
        );
        assert_eq!(
            parse_line("FSR1: 400, FSR2: 410, a, b"),
            Err(ParseError::FieldCount(4))
        );
    }

    #[test]
    fn rejects_non_integer_values() {
        assert_eq!(
            parse_line("FSR1: 4x0, FSR2: 410, a"),
            Err(ParseError::InvalidInteger("4x0".into()))
        );
        assert_eq!(
            parse_line("FSR1: 400, FSR2: 41.5, a"),
            Err(ParseError::InvalidInteger("41.5".into()))
        );
    }

    #[test]
    fn rejects_garbled_fragments() {
        assert!(matches!(
            parse_line("SR1 400, FSR2: 410, a"),
            Err(ParseError::MissingValue(_))
        ));
        assert_eq!(parse_line("   "), Err(ParseError::Empty));
    }
}
