//! Dashboard history sampling over the CSV log

use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

use csv_core::ReadRecordResult;

const ROW_FIELDS: usize = 7;

/// Pick at most `points` evenly spaced data rows from the whole log text.
///
/// The first line is the header and is skipped, as are blank lines. With
/// fewer rows than `points` every row is returned.
pub fn sample_history(log: &str, points: usize) -> Vec<&str> {
    if points == 0 {
        return Vec::new();
    }

    let rows: Vec<&str> = log
        .lines()
        .skip(1)
        .map(str::trim_end)
        .filter(|line| !line.is_empty())
        .collect();
    let stride = (rows.len() / points).max(1);

    rows.into_iter().step_by(stride).take(points).collect()
}

/// One data row of the log, split into its seven fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRow {
    /// Unquoted field contents back to back.
    text: String,
    ends: [usize; ROW_FIELDS],
}

impl HistoryRow {
    pub const FIELDS: usize = ROW_FIELDS;

    /// `None` unless the line is a single CSV record of exactly seven fields.
    pub fn parse(line: &str) -> Option<Self> {
        let mut input = String::with_capacity(line.len() + 1);
        input.push_str(line);
        input.push('\n');

        let mut output = vec![0u8; input.len()];
        // One spare slot so an eighth field is caught instead of truncated
        let mut ends = [0usize; Self::FIELDS + 1];
        let mut reader = csv_core::Reader::new();
        let (result, _, nout, nend) = reader.read_record(input.as_bytes(), &mut output, &mut ends);
        if !matches!(result, ReadRecordResult::Record) || nend != Self::FIELDS {
            return None;
        }

        output.truncate(nout);
        let text = String::from_utf8(output).ok()?;
        let mut row_ends = [0usize; Self::FIELDS];
        row_ends.copy_from_slice(&ends[..Self::FIELDS]);
        Some(Self {
            text,
            ends: row_ends,
        })
    }

    /// Field `index`, surrounding whitespace removed.
    fn field(&self, index: usize) -> &str {
        let start = match index {
            0 => 0,
            i => self.ends[i - 1],
        };
        self.text[start..self.ends[index]].trim()
    }

    pub fn timestamp(&self) -> &str {
        self.field(0)
    }

    pub fn temperature(&self) -> &str {
        self.field(1)
    }

    pub fn humidity(&self) -> &str {
        self.field(2)
    }

    pub fn pressure(&self) -> &str {
        self.field(3)
    }

    pub fn altitude(&self) -> &str {
        self.field(4)
    }

    pub fn light(&self) -> &str {
        self.field(5)
    }

    pub fn uv(&self) -> &str {
        self.field(6)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        (0..Self::FIELDS).map(|i| self.field(i))
    }
}
