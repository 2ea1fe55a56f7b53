//! Line-level rewriting of simulator decks.
//!
//! The edits are: `INCLUDE` statements after section keywords, replacement
//! of a one-line record (`DIMENS`), and replacement of `TSTEP` blocks, either
//! by a fixed schedule or by per-step boundary-property includes. Everything
//! else is copied through verbatim.

use std::path::Path;

use super::ArchiveError;
use crate::time::{SECONDS_PER_DAY, Schedule};

/// Tolerance in seconds when comparing deck and schedule times.
const TIME_EPS: f64 = 1e-6;

/// A deck held as lines.
///
/// # Example
///
/// ```
/// use expreccs::io::DeckRewriter;
/// use expreccs::time::{SECONDS_PER_DAY, Schedule};
///
/// let mut deck = DeckRewriter::parse("GRID\nINIT\nSCHEDULE\nTSTEP\n2*10 /\nEND\n");
/// deck.include_after("GRID", &["BCCON.INC"]);
/// assert_eq!(deck.tstep_days().unwrap(), vec![10.0, 10.0]);
///
/// let days = |d: f64| d * SECONDS_PER_DAY;
/// let target = Schedule::new(vec![0.0, days(5.0), days(10.0), days(20.0)]).unwrap();
/// assert_eq!(deck.replace_tsteps(&target, "bc").unwrap(), 3);
/// let text = deck.render();
/// assert!(text.contains("GRID\nINCLUDE\n'BCCON.INC' /\n"));
/// assert!(text.contains("'bc/BCPROP3.INC' /\nTSTEP\n10 /\n"));
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct DeckRewriter {
    lines: Vec<String>,
}

/// Keyword of a line: first token, comments stripped, uppercased.
fn keyword(line: &str) -> String {
    let code = line.split("--").next().unwrap_or("");
    code.split_whitespace()
        .next()
        .map(str::to_ascii_uppercase)
        .unwrap_or_default()
}

/// Expand `n*v` repeats.
fn expand_token(token: &str, line: usize) -> Result<Vec<f64>, ArchiveError> {
    let bad = || ArchiveError::Deck {
        line: line + 1,
        reason: format!("cannot read TSTEP value '{token}'"),
    };
    match token.split_once('*') {
        Some((n, v)) => {
            let n: usize = n.parse().map_err(|_| bad())?;
            let v: f64 = v.parse().map_err(|_| bad())?;
            Ok(vec![v; n])
        }
        None => Ok(vec![token.parse().map_err(|_| bad())?]),
    }
}

/// A `TSTEP` block: lines `[start, end]` inclusive and its step lengths.
struct TstepBlock {
    start: usize,
    end: usize,
    days: Vec<f64>,
}

impl DeckRewriter {
    /// Split deck text into lines.
    pub fn parse(text: &str) -> Self {
        Self {
            lines: text.lines().map(|l| l.replace('\t', " ")).collect(),
        }
    }

    /// Read a deck file.
    pub fn from_file(path: &Path) -> Result<Self, ArchiveError> {
        let text = std::fs::read_to_string(path).map_err(|e| ArchiveError::io(path, e))?;
        Ok(Self::parse(&text))
    }

    /// Deck lines.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Insert `INCLUDE 'file' /` statements right after the first line whose
    /// keyword is `section`. Returns false if the section is absent.
    pub fn include_after(&mut self, section: &str, files: &[&str]) -> bool {
        let section = section.to_ascii_uppercase();
        let Some(at) = self.lines.iter().position(|l| keyword(l) == section) else {
            tracing::warn!(section, "section not found in deck, includes skipped");
            return false;
        };
        let inserted = files
            .iter()
            .flat_map(|f| ["INCLUDE".to_string(), format!("'{f}' /")]);
        self.lines.splice(at + 1..at + 1, inserted);
        true
    }

    fn tstep_blocks(&self) -> Result<Vec<TstepBlock>, ArchiveError> {
        let mut blocks = Vec::new();
        let mut n = 0;
        while n < self.lines.len() {
            if keyword(&self.lines[n]) != "TSTEP" {
                n += 1;
                continue;
            }
            let start = n;
            let mut days = Vec::new();
            let mut closed = false;
            n += 1;
            while n < self.lines.len() && !closed {
                let code = self.lines[n].split("--").next().unwrap_or("");
                for token in code.split_whitespace() {
                    if let Some(head) = token.strip_suffix('/') {
                        if !head.is_empty() {
                            days.extend(expand_token(head, n)?);
                        }
                        closed = true;
                        break;
                    }
                    days.extend(expand_token(token, n)?);
                }
                n += 1;
            }
            if !closed {
                return Err(ArchiveError::Deck {
                    line: start + 1,
                    reason: "TSTEP without terminating '/'".into(),
                });
            }
            blocks.push(TstepBlock {
                start,
                end: n - 1,
                days,
            });
        }
        Ok(blocks)
    }

    /// All `TSTEP` lengths in days, in deck order.
    pub fn tstep_days(&self) -> Result<Vec<f64>, ArchiveError> {
        Ok(self.tstep_blocks()?.into_iter().flat_map(|b| b.days).collect())
    }

    /// Replace every `TSTEP` block by one `INCLUDE '<dir>/BCPROP{n}.INC' /`
    /// plus `TSTEP dt /` pair per target step inside the block's time span.
    ///
    /// Step `n` (one-based) ends at `target.times()[n]`. A block ending between
    /// target times gets a final partial step using the next target index, so
    /// the deck's total simulated time is unchanged. Returns the number of
    /// steps written.
    pub fn replace_tsteps(&mut self, target: &Schedule, dir: &str) -> Result<usize, ArchiveError> {
        let blocks = self.tstep_blocks()?;
        let times = target.times();
        let last = target.n_steps().max(1);
        let mut out = Vec::with_capacity(self.lines.len());
        let mut copied = 0;
        let mut clock = 0.0;
        let mut written = 0;
        for block in blocks {
            out.extend_from_slice(&self.lines[copied..block.start]);
            copied = block.end + 1;
            let end = clock + block.days.iter().sum::<f64>() * SECONDS_PER_DAY;
            let mut points: Vec<f64> = times
                .iter()
                .copied()
                .filter(|t| *t > clock + TIME_EPS && *t <= end + TIME_EPS)
                .collect();
            if points.last().is_none_or(|t| *t < end - TIME_EPS) {
                points.push(end);
            }
            let mut previous = clock;
            for p in points {
                let n = times.partition_point(|t| *t < p - TIME_EPS).clamp(1, last);
                let dt = (p.min(end) - previous) / SECONDS_PER_DAY;
                out.push("INCLUDE".to_string());
                out.push(format!("'{dir}/BCPROP{n}.INC' /"));
                out.push("TSTEP".to_string());
                out.push(format!("{dt} /"));
                previous = p.min(end);
                written += 1;
            }
            clock = end;
        }
        out.extend_from_slice(&self.lines[copied..]);
        self.lines = out;
        tracing::debug!(steps = written, "rewrote deck schedule");
        Ok(written)
    }

    /// Replace the record following `keyword` (up to and including its `/`)
    /// by the single line `{record} /`. Returns false if the keyword is absent.
    pub fn set_record(&mut self, keyword_name: &str, record: &str) -> bool {
        let name = keyword_name.to_ascii_uppercase();
        let Some(at) = self.lines.iter().position(|l| keyword(l) == name) else {
            return false;
        };
        let end = self.lines[at + 1..]
            .iter()
            .position(|l| l.split("--").next().unwrap_or("").contains('/'))
            .map_or(self.lines.len(), |n| at + 1 + n + 1);
        self.lines.splice(at + 1..end, [format!("{record} /")]);
        true
    }

    /// Replace all `TSTEP` blocks by one block holding every step of
    /// `schedule`, placed where the first block was. Returns false if the deck
    /// has no `TSTEP`.
    pub fn set_tsteps(&mut self, schedule: &Schedule) -> Result<bool, ArchiveError> {
        let blocks = self.tstep_blocks()?;
        let Some(first) = blocks.first().map(|b| b.start) else {
            return Ok(false);
        };
        for block in blocks.iter().rev() {
            self.lines.drain(block.start..=block.end);
        }
        let mut inserted = vec!["TSTEP".to_string()];
        inserted.extend(
            schedule
                .step_sizes()
                .iter()
                .map(|dt| format!("{}", dt / SECONDS_PER_DAY)),
        );
        inserted.push("/".to_string());
        self.lines.splice(first..first, inserted);
        Ok(true)
    }

    /// Deck text with a trailing newline.
    pub fn render(&self) -> String {
        let mut s = self.lines.join("\n");
        s.push('\n');
        s
    }

    /// Write the deck.
    pub fn write(&self, path: &Path) -> Result<(), ArchiveError> {
        std::fs::write(path, self.render()).map_err(|e| ArchiveError::io(path, e))
    }
}
