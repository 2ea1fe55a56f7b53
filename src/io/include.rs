//! Include files read by the simulator deck.
//!
//! Every file starts with two comment lines, then the keyword, one value or
//! row per line, and a closing `/`:
//!
//! ```text
//! -- Copyright (C) expreccs contributors
//! -- This file was generated by expreccs
//! FIPNUM
//! 4
//! 1
//! /
//! ```

use std::fmt::Display;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use super::ArchiveError;
use crate::types::{FaceId, Side};

const COPYRIGHT: &str = "-- Copyright (C) expreccs contributors";
const GENERATED: &str = "-- This file was generated by expreccs";

fn header<W: Write>(w: &mut W, keyword: &str) -> std::io::Result<()> {
    writeln!(w, "{COPYRIGHT}")?;
    writeln!(w, "{GENERATED}")?;
    writeln!(w, "{keyword}")
}

/// Write a keyword with one value per line.
pub fn write_values<W, T>(w: &mut W, keyword: &str, values: &[T]) -> std::io::Result<()>
where
    W: Write,
    T: Display,
{
    header(w, keyword)?;
    for v in values {
        writeln!(w, "{v}")?;
    }
    writeln!(w, "/")
}

fn to_file(path: &Path, f: impl FnOnce(&mut BufWriter<File>) -> std::io::Result<()>) -> Result<(), ArchiveError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| ArchiveError::io(parent, e))?;
        }
    }
    let file = File::create(path).map_err(|e| ArchiveError::io(path, e))?;
    let mut w = BufWriter::new(file);
    f(&mut w)
        .and_then(|()| w.flush())
        .map_err(|e| ArchiveError::io(path, e))
}

/// Region tags (`FIPNUM`, `OPERNUM`, `SATNUM`).
pub fn write_int_include(path: &Path, keyword: &str, values: &[i32]) -> Result<(), ArchiveError> {
    to_file(path, |w| write_values(w, keyword, values))
}

/// Real-valued cell arrays (`MULTX`, `MULTPV`, ...).
pub fn write_real_include(path: &Path, keyword: &str, values: &[f64]) -> Result<(), ArchiveError> {
    to_file(path, |w| write_values(w, keyword, values))
}

/// One `BCCON` connection: a single cell face.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BcconRow {
    /// Face id.
    pub id: FaceId,
    /// Zero-based `(i, j, k)` of the site cell.
    pub cell: [usize; 3],
    /// Side, written as its face label.
    pub side: Side,
}

/// Write `BCCON` rows `id i i j j k k 'DIR' /` (one-based).
pub fn write_bccon<W: Write>(w: &mut W, rows: &[BcconRow]) -> std::io::Result<()> {
    header(w, "BCCON")?;
    for r in rows {
        let [i, j, k] = r.cell.map(|c| c + 1);
        writeln!(
            w,
            "{} {i} {i} {j} {j} {k} {k} '{}' /",
            r.id.deck_id(),
            r.side.face_label()
        )?;
    }
    writeln!(w, "/")
}

/// File variant of [`write_bccon`].
pub fn write_bccon_file(path: &Path, rows: &[BcconRow]) -> Result<(), ArchiveError> {
    to_file(path, |w| write_bccon(w, rows))
}

/// What a `BCPROP` row prescribes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BcpropKind {
    /// `DIRICHLET` pressure in bar.
    Dirichlet,
    /// `RATE` inflow.
    Rate,
}

/// Write `BCPROP` rows for the faces whose value is finite.
///
/// `values[n]` belongs to `ids[n]`; non-finite entries are faces without a
/// condition for this step and are left out.
pub fn write_bcprop<W: Write>(
    w: &mut W,
    kind: BcpropKind,
    component: &str,
    ids: &[FaceId],
    values: &[f64],
) -> std::io::Result<usize> {
    header(w, "BCPROP")?;
    let mut written = 0;
    for (id, v) in ids.iter().zip(values) {
        if !v.is_finite() {
            continue;
        }
        match kind {
            BcpropKind::Dirichlet => writeln!(w, "{} DIRICHLET {component} 1* {v} /", id.deck_id())?,
            BcpropKind::Rate => writeln!(w, "{} RATE {component} {v} /", id.deck_id())?,
        }
        written += 1;
    }
    writeln!(w, "/")?;
    Ok(written)
}

/// File variant of [`write_bcprop`]; returns the number of rows written.
pub fn write_bcprop_file(
    path: &Path,
    kind: BcpropKind,
    component: &str,
    ids: &[FaceId],
    values: &[f64],
) -> Result<usize, ArchiveError> {
    let mut written = 0;
    to_file(path, |w| {
        written = write_bcprop(w, kind, component, ids, values)?;
        Ok(())
    })?;
    Ok(written)
}
