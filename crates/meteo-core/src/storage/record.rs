//! CSV record encoding on top of `csv-core`

use core::fmt::{self, Display, Write};

use csv_core::WriteResult;

/// Longest formatted field before quoting.
const FIELD_CAPACITY: usize = 48;

/// Fits a field of `FIELD_CAPACITY` bytes that is all quotes, plus the
/// enclosing quotes and a delimiter.
const ENCODE_BUFFER: usize = 2 * FIELD_CAPACITY + 4;

/// Writes one CSV record field by field into any `fmt::Write`.
///
/// Fields containing a comma, quote or line break are quoted. The record
/// terminator is left to the caller, [`DataLog`](super::DataLog) adds it.
pub struct RecordWriter<'w, W> {
    out: &'w mut W,
    csv: csv_core::Writer,
    fields: usize,
}

impl<'w, W: Write> RecordWriter<'w, W> {
    pub fn new(out: &'w mut W) -> Self {
        Self {
            out,
            csv: csv_core::Writer::new(),
            fields: 0,
        }
    }

    /// Append `value` as the next field.
    pub fn field(&mut self, value: impl Display) -> fmt::Result {
        let mut text = heapless::String::<FIELD_CAPACITY>::new();
        write!(text, "{value}")?;

        let mut buf = [0u8; ENCODE_BUFFER];
        if self.fields > 0 {
            let (_, n) = self.csv.delimiter(&mut buf);
            self.emit(&buf[..n])?;
        }

        let mut input = text.as_bytes();
        loop {
            let (result, nin, nout) = self.csv.field(input, &mut buf);
            self.emit(&buf[..nout])?;
            input = &input[nin..];
            if let WriteResult::InputEmpty = result {
                break;
            }
        }

        self.fields += 1;
        Ok(())
    }

    /// Close the record and return its field count.
    pub fn finish(mut self) -> Result<usize, fmt::Error> {
        let mut buf = [0u8; 4];
        let (_, n) = self.csv.finish(&mut buf);
        self.emit(&buf[..n])?;
        Ok(self.fields)
    }

    fn emit(&mut self, bytes: &[u8]) -> fmt::Result {
        let text = core::str::from_utf8(bytes).map_err(|_| fmt::Error)?;
        self.out.write_str(text)
    }
}
