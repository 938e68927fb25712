use serde::{Deserialize, Serialize};

pub(crate) const CR: u16 = b'\r' as u16;
pub(crate) const LF: u16 = b'\n' as u16;

const LF_UNITS: [u16; 1] = [LF];
const CRLF_UNITS: [u16; 2] = [CR, LF];

/// Line terminator used when presenting or rewriting line breaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndOfLine {
    #[default]
    Lf,
    Crlf,
}

impl EndOfLine {
    pub fn as_str(self) -> &'static str {
        match self {
            EndOfLine::Lf => "\n",
            EndOfLine::Crlf => "\r\n",
        }
    }

    pub fn as_utf16(self) -> &'static [u16] {
        match self {
            EndOfLine::Lf => &LF_UNITS,
            EndOfLine::Crlf => &CRLF_UNITS,
        }
    }
}

/// Number of each kind of line break seen in a text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EolCounts {
    pub cr: usize,
    pub lf: usize,
    pub crlf: usize,
}

impl EolCounts {
    pub fn scan(text: &[u16]) -> Self {
        let mut counts = Self::default();
        let mut i = 0;
        while i < text.len() {
            match text[i] {
                CR if text.get(i + 1) == Some(&LF) => {
                    counts.crlf += 1;
                    i += 1;
                }
                CR => counts.cr += 1,
                LF => counts.lf += 1,
                _ => {}
            }
            i += 1;
        }
        counts
    }

    pub fn total(&self) -> usize {
        self.cr + self.lf + self.crlf
    }

    pub fn merge(&mut self, other: EolCounts) {
        self.cr += other.cr;
        self.lf += other.lf;
        self.crlf += other.crlf;
    }

    /// The terminator most of the text already uses, or `default` when
    /// there are no line breaks at all.
    pub fn dominant(&self, default: EndOfLine) -> EndOfLine {
        let total = self.total();
        if total == 0 {
            return default;
        }
        if (self.cr + self.crlf) * 2 > total {
            EndOfLine::Crlf
        } else {
            EndOfLine::Lf
        }
    }

    /// Whether rewriting every break to `eol` would change the text.
    pub fn differs_from(&self, eol: EndOfLine) -> bool {
        match eol {
            EndOfLine::Lf => self.cr > 0 || self.crlf > 0,
            EndOfLine::Crlf => self.cr > 0 || self.lf > 0,
        }
    }
}

/// Whether `unit` opens a surrogate pair.
pub fn is_high_surrogate(unit: u16) -> bool {
    (0xD800..=0xDBFF).contains(&unit)
}

/// Number of line breaks in `text`, counting `\r\n` once.
pub fn count_line_breaks(text: &[u16]) -> usize {
    let counts = EolCounts::scan(text);
    counts.total()
}

/// Splits `text` on `\r\n`, `\r` and `\n`. There is always at least one
/// (possibly empty) line, and a trailing break yields a trailing empty line.
pub fn split_lines(text: &[u16]) -> Vec<&[u16]> {
    let mut lines = Vec::new();
    let mut line_start = 0;
    let mut i = 0;
    while i < text.len() {
        match text[i] {
            CR => {
                lines.push(&text[line_start..i]);
                if text.get(i + 1) == Some(&LF) {
                    i += 1;
                }
                line_start = i + 1;
            }
            LF => {
                lines.push(&text[line_start..i]);
                line_start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    lines.push(&text[line_start..]);
    lines
}

/// Rewrites every line break in `text` to `eol`.
pub fn normalize_eol(text: &[u16], eol: EndOfLine) -> Vec<u16> {
    let lines = split_lines(text);
    let mut out = Vec::with_capacity(text.len());
    for (i, line) in lines.iter().enumerate() {
        if i > 0 {
            out.extend_from_slice(eol.as_utf16());
        }
        out.extend_from_slice(line);
    }
    out
}
