//! Six-digit segment entry: `M SS mmm`.
//!
//! Decoding is permissive. A field without a digit contributes 0 and decoding
//! never fails. [`DigitEntry`] is the input adapter around it: every accepted
//! digit advances focus, and the sixth digit submits the entry.

use serde::Serialize;

pub const FIELDS: usize = 6;

/// Fields in order: minute, tens-sec, units-sec, hundreds-ms, tens-ms, units-ms.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SegmentDigits([Option<u8>; FIELDS]);

impl SegmentDigits {
    pub fn new(fields: [Option<u8>; FIELDS]) -> Self {
        Self(fields.map(|f| f.filter(|d| *d <= 9)))
    }

    /// Build from raw text fields; anything that is not a single digit is absent.
    pub fn from_fields(fields: [&str; FIELDS]) -> Self {
        Self(fields.map(field_digit))
    }

    pub fn fields(&self) -> &[Option<u8>; FIELDS] {
        &self.0
    }

    pub fn is_complete(&self) -> bool {
        self.0.iter().all(Option::is_some)
    }

    pub fn decode_ms(&self) -> u64 {
        let [m, s1, s2, ms1, ms2, ms3] = self.0.map(|f| u64::from(f.unwrap_or(0)));
        m * 60_000 + (s1 * 10 + s2) * 1_000 + (ms1 * 100 + ms2 * 10 + ms3)
    }

    /// Render with `_` for empty fields, e.g. `1:2_.___`.
    pub fn render(&self) -> String {
        let c = self.0.map(|f| f.map(|d| char::from(b'0' + d)).unwrap_or('_'));
        format!("{}:{}{}.{}{}{}", c[0], c[1], c[2], c[3], c[4], c[5])
    }
}

fn field_digit(raw: &str) -> Option<u8> {
    let mut chars = raw.trim().chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => c.to_digit(10).map(|d| d as u8),
        _ => None,
    }
}

/// What a single keystroke did to the entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    Ignored,
    Advanced { focus: usize },
    Submitted { segment_ms: u64 },
}

/// Focus-tracking entry over [`SegmentDigits`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DigitEntry {
    digits: SegmentDigits,
    focus: usize,
}

impl DigitEntry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn focus(&self) -> usize {
        self.focus
    }

    pub fn digits(&self) -> &SegmentDigits {
        &self.digits
    }

    pub fn is_empty(&self) -> bool {
        self.digits.0.iter().all(Option::is_none)
    }

    pub fn push_char(&mut self, c: char) -> KeyOutcome {
        let Some(d) = c.to_digit(10) else {
            return KeyOutcome::Ignored;
        };
        self.digits.0[self.focus] = Some(d as u8);
        if self.digits.is_complete() {
            let segment_ms = self.digits.decode_ms();
            self.clear();
            return KeyOutcome::Submitted { segment_ms };
        }
        // next empty field after the current one, wrapping
        self.focus = (1..=FIELDS)
            .map(|step| (self.focus + step) % FIELDS)
            .find(|&i| self.digits.0[i].is_none())
            .unwrap_or(self.focus);
        KeyOutcome::Advanced { focus: self.focus }
    }

    /// Feed a whole line; returns every segment submitted along the way.
    pub fn push_str(&mut self, s: &str) -> Vec<u64> {
        s.chars()
            .filter_map(|c| match self.push_char(c) {
                KeyOutcome::Submitted { segment_ms } => Some(segment_ms),
                _ => None,
            })
            .collect()
    }

    pub fn backspace(&mut self) {
        if self.digits.0[self.focus].is_none() && self.focus > 0 {
            self.focus -= 1;
        }
        self.digits.0[self.focus] = None;
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
