use std::cmp::Ordering;
use std::str::FromStr;

/// Separates the numeric prefix of a record from its payload.
pub const DELIMITER: &str = ". ";

/// A single `<integer>. <payload>` line.
///
/// The record owns the line without its terminator and remembers where the first delimiter
/// starts. Records are ordered by payload, byte by byte, and then by the numeric value of the
/// prefix.
#[derive(Debug, Clone)]
pub struct LineRecord {
    line: String,
    split: usize,
}

impl LineRecord {
    /// Wrap a line. A line without the delimiter is handed back as the error.
    pub fn new(line: String) -> Result<LineRecord, String> {
        match line.find(DELIMITER) {
            Some(split) => Ok(
                LineRecord {
                    line,
                    split,
                }
            ),
            None => Err(line),
        }
    }

    pub fn line(&self) -> &str {
        self.line.as_str()
    }

    pub fn into_line(self) -> String {
        self.line
    }

    pub fn prefix(&self) -> &str {
        &self.line[..self.split]
    }

    pub fn payload(&self) -> &str {
        &self.line[self.split + DELIMITER.len()..]
    }

    fn number(&self) -> Option<i64> {
        i64::from_str(self.prefix().trim()).ok()
    }
}

/// Compare two raw lines the way the sort orders them.
///
/// Returns None when either line is not a record.
pub fn compare(a: &str, b: &str) -> Option<Ordering> {
    let a = LineRecord::new(a.to_string()).ok()?;
    let b = LineRecord::new(b.to_string()).ok()?;
    Some(a.cmp(&b))
}

impl Eq for LineRecord {}

impl PartialEq<Self> for LineRecord {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl PartialOrd<Self> for LineRecord {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LineRecord {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.payload().as_bytes().cmp(other.payload().as_bytes()) {
            Ordering::Equal => {
                // an unparsable prefix on either side leaves the records tied
                match (self.number(), other.number()) {
                    (Some(a), Some(b)) => a.cmp(&b),
                    _ => Ordering::Equal,
                }
            }
            ordering => ordering,
        }
    }
}
