//! Keyword records of the ECL binary family (`EGRID`, `INIT`, `UNRST`,
//! `Xnnnn`).
//!
//! Files are sequences of big-endian Fortran unformatted records, each framed
//! as `[i32 length][payload][i32 length]`. A keyword occupies one 16-byte
//! header record (8-char name, `i32` element count, 4-char type) followed by
//! data records of at most 1000 numeric or 105 string elements.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::ArchiveError;
use super::archive::SimulationArchive;
use crate::grid::CornerPointGrid;
use crate::time::SECONDS_PER_DAY;

const NUMERIC_BLOCK: usize = 1000;
const STRING_BLOCK: usize = 105;

/// Typed payload of one keyword.
#[derive(Clone, Debug, PartialEq)]
pub enum EclValues {
    /// `INTE`
    Int(Vec<i32>),
    /// `REAL`
    Real(Vec<f32>),
    /// `DOUB`
    Double(Vec<f64>),
    /// `LOGI`
    Logical(Vec<bool>),
    /// `CHAR` (width 8) or `C0nn` (width `nn`).
    Char {
        /// Element width in bytes.
        width: usize,
        /// Elements, right-trimmed.
        values: Vec<String>,
    },
    /// `MESS`, no data.
    Message,
}

impl EclValues {
    /// Number of elements.
    pub fn len(&self) -> usize {
        match self {
            EclValues::Int(v) => v.len(),
            EclValues::Real(v) => v.len(),
            EclValues::Double(v) => v.len(),
            EclValues::Logical(v) => v.len(),
            EclValues::Char { values, .. } => values.len(),
            EclValues::Message => 0,
        }
    }

    /// True without elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn type_tag(&self) -> String {
        match self {
            EclValues::Int(_) => "INTE".into(),
            EclValues::Real(_) => "REAL".into(),
            EclValues::Double(_) => "DOUB".into(),
            EclValues::Logical(_) => "LOGI".into(),
            EclValues::Char { width: 8, .. } => "CHAR".into(),
            EclValues::Char { width, .. } => format!("C{width:03}"),
            EclValues::Message => "MESS".into(),
        }
    }

    /// Numeric values widened to `f64`.
    pub fn to_f64(&self) -> Option<Vec<f64>> {
        match self {
            EclValues::Int(v) => Some(v.iter().map(|x| *x as f64).collect()),
            EclValues::Real(v) => Some(v.iter().map(|x| *x as f64).collect()),
            EclValues::Double(v) => Some(v.clone()),
            EclValues::Logical(v) => Some(v.iter().map(|x| if *x { 1.0 } else { 0.0 }).collect()),
            EclValues::Char { .. } | EclValues::Message => None,
        }
    }

    /// Integer values.
    pub fn as_ints(&self) -> Option<&[i32]> {
        match self {
            EclValues::Int(v) => Some(v),
            _ => None,
        }
    }
}

/// One keyword and its data.
#[derive(Clone, Debug, PartialEq)]
pub struct EclRecord {
    /// Keyword, right-trimmed.
    pub keyword: String,
    /// Payload.
    pub values: EclValues,
}

impl EclRecord {
    /// Create a record.
    pub fn new(keyword: impl Into<String>, values: EclValues) -> Self {
        Self {
            keyword: keyword.into(),
            values,
        }
    }
}

// =============================================================================
// Fortran record framing
// =============================================================================

fn read_frame<R: Read>(reader: &mut R) -> std::io::Result<Option<Vec<u8>>> {
    let mut len = [0u8; 4];
    match reader.read_exact(&mut len) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    }
    let n = i32::from_be_bytes(len);
    if n < 0 {
        return Err(std::io::Error::new(ErrorKind::InvalidData, "negative record length"));
    }
    let mut payload = vec![0u8; n as usize];
    reader.read_exact(&mut payload)?;
    let mut tail = [0u8; 4];
    reader.read_exact(&mut tail)?;
    if tail != len {
        return Err(std::io::Error::new(ErrorKind::InvalidData, "record length markers differ"));
    }
    Ok(Some(payload))
}

fn write_frame<W: Write>(writer: &mut W, payload: &[u8]) -> std::io::Result<()> {
    let len = (payload.len() as i32).to_be_bytes();
    writer.write_all(&len)?;
    writer.write_all(payload)?;
    writer.write_all(&len)
}

fn element_width(tag: &str) -> Option<usize> {
    match tag {
        "INTE" | "REAL" | "LOGI" => Some(4),
        "DOUB" => Some(8),
        "CHAR" => Some(8),
        "MESS" => Some(0),
        t if t.starts_with("C0") => t[1..].parse().ok(),
        _ => None,
    }
}

fn decode(tag: &str, width: usize, bytes: &[u8]) -> Option<EclValues> {
    let words = |w: usize| bytes.chunks_exact(w);
    Some(match tag {
        "INTE" => EclValues::Int(
            words(4)
                .map(|b| i32::from_be_bytes([b[0], b[1], b[2], b[3]]))
                .collect(),
        ),
        "REAL" => EclValues::Real(
            words(4)
                .map(|b| f32::from_be_bytes([b[0], b[1], b[2], b[3]]))
                .collect(),
        ),
        "DOUB" => EclValues::Double(
            words(8)
                .map(|b| f64::from_be_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]))
                .collect(),
        ),
        "LOGI" => EclValues::Logical(
            words(4)
                .map(|b| i32::from_be_bytes([b[0], b[1], b[2], b[3]]) != 0)
                .collect(),
        ),
        "MESS" => EclValues::Message,
        _ => EclValues::Char {
            width,
            values: words(width)
                .map(|b| String::from_utf8_lossy(b).trim_end().to_string())
                .collect(),
        },
    })
}

/// Read all keyword records from a stream.
pub fn read_records<R: Read>(reader: &mut R) -> std::io::Result<Vec<EclRecord>> {
    let invalid = |msg: String| std::io::Error::new(ErrorKind::InvalidData, msg);
    let mut records = Vec::new();
    while let Some(header) = read_frame(reader)? {
        if header.len() != 16 {
            return Err(invalid(format!("header record of {} bytes", header.len())));
        }
        let keyword = String::from_utf8_lossy(&header[..8]).trim_end().to_string();
        let count = i32::from_be_bytes([header[8], header[9], header[10], header[11]]);
        let tag = String::from_utf8_lossy(&header[12..16]).to_string();
        let width = element_width(&tag).ok_or_else(|| invalid(format!("{keyword}: unknown type {tag}")))?;
        let count = usize::try_from(count).map_err(|_| invalid(format!("{keyword}: negative count")))?;

        let mut bytes = Vec::with_capacity(count * width);
        while bytes.len() < count * width {
            let block = read_frame(reader)?
                .ok_or_else(|| invalid(format!("{keyword}: data ends early")))?;
            bytes.extend_from_slice(&block);
        }
        if bytes.len() != count * width {
            return Err(invalid(format!("{keyword}: data overruns count")));
        }
        let values = decode(&tag, width, &bytes).ok_or_else(|| invalid(format!("{keyword}: bad data")))?;
        records.push(EclRecord { keyword, values });
    }
    Ok(records)
}

fn encode(values: &EclValues) -> (usize, Vec<Vec<u8>>) {
    fn blocks<T>(v: &[T], size: usize, f: impl Fn(&T, &mut Vec<u8>)) -> Vec<Vec<u8>> {
        v.chunks(size)
            .map(|chunk| {
                let mut out = Vec::new();
                for x in chunk {
                    f(x, &mut out);
                }
                out
            })
            .collect()
    }
    match values {
        EclValues::Int(v) => (v.len(), blocks(v, NUMERIC_BLOCK, |x, o| o.extend(x.to_be_bytes()))),
        EclValues::Real(v) => (v.len(), blocks(v, NUMERIC_BLOCK, |x, o| o.extend(x.to_be_bytes()))),
        EclValues::Double(v) => (v.len(), blocks(v, NUMERIC_BLOCK, |x, o| o.extend(x.to_be_bytes()))),
        EclValues::Logical(v) => (
            v.len(),
            blocks(v, NUMERIC_BLOCK, |x, o| o.extend((if *x { -1i32 } else { 0 }).to_be_bytes())),
        ),
        EclValues::Char { width, values } => (
            values.len(),
            blocks(values, STRING_BLOCK, |s, o| o.extend(pad(s, *width))),
        ),
        EclValues::Message => (0, Vec::new()),
    }
}

fn pad(s: &str, width: usize) -> Vec<u8> {
    let mut b: Vec<u8> = s.bytes().take(width).collect();
    b.resize(width, b' ');
    b
}

/// Write keyword records to a stream.
pub fn write_records<W: Write>(writer: &mut W, records: &[EclRecord]) -> std::io::Result<()> {
    for record in records {
        let (count, blocks) = encode(&record.values);
        let mut header = pad(&record.keyword, 8);
        header.extend((count as i32).to_be_bytes());
        header.extend(pad(&record.values.type_tag(), 4));
        write_frame(writer, &header)?;
        for block in blocks {
            write_frame(writer, &block)?;
        }
    }
    Ok(())
}

/// Read a whole file.
pub fn read_file(path: &Path) -> Result<Vec<EclRecord>, ArchiveError> {
    let file = File::open(path).map_err(|e| ArchiveError::io(path, e))?;
    read_records(&mut BufReader::new(file)).map_err(|e| ArchiveError::io(path, e))
}

/// Write a whole file.
pub fn write_file(path: &Path, records: &[EclRecord]) -> Result<(), ArchiveError> {
    let file = File::create(path).map_err(|e| ArchiveError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    write_records(&mut writer, records)
        .and_then(|()| writer.flush())
        .map_err(|e| ArchiveError::io(path, e))
}

// =============================================================================
// Cases on disk
// =============================================================================

/// How restart steps are stored.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RestartLayout {
    /// One `.UNRST` file, steps separated by `SEQNUM`.
    #[default]
    Unified,
    /// One `.Xnnnn` file per step.
    Separate,
}

fn with_extension(case: &Path, ext: &str) -> PathBuf {
    let mut name = case.as_os_str().to_owned();
    name.push(".");
    name.push(ext);
    PathBuf::from(name)
}

fn first_values<'a>(records: &'a [EclRecord], keyword: &str) -> Option<&'a EclValues> {
    records.iter().find(|r| r.keyword == keyword).map(|r| &r.values)
}

/// Grid, init arrays and restart steps of one simulation case.
///
/// `case` is the path without extension, e.g. `output/regional/REGIONAL`.
#[derive(Clone, Debug)]
pub struct EclArchive {
    case: PathBuf,
    grid: CornerPointGrid,
    init: HashMap<String, EclValues>,
    times: Vec<f64>,
    steps: Vec<HashMap<String, EclValues>>,
}

impl EclArchive {
    /// Load `case.EGRID`, `case.INIT` and the restart steps.
    pub fn open(case: impl AsRef<Path>, layout: RestartLayout) -> Result<Self, ArchiveError> {
        let case = case.as_ref().to_path_buf();
        let grid = read_egrid(&with_extension(&case, "EGRID"))?;

        let init_path = with_extension(&case, "INIT");
        let init = read_file(&init_path)?
            .into_iter()
            .map(|r| (r.keyword, r.values))
            .collect();

        let step_records: Vec<Vec<EclRecord>> = match layout {
            RestartLayout::Unified => split_at_seqnum(read_file(&with_extension(&case, "UNRST"))?),
            RestartLayout::Separate => {
                let mut steps = Vec::new();
                loop {
                    let path = with_extension(&case, &format!("X{:04}", steps.len()));
                    if !path.exists() {
                        break;
                    }
                    steps.push(read_file(&path)?);
                }
                steps
            }
        };

        let mut times = Vec::with_capacity(step_records.len());
        let mut steps = Vec::with_capacity(step_records.len());
        for records in step_records {
            let days = first_values(&records, "DOUBHEAD")
                .and_then(|v| v.to_f64())
                .and_then(|v| v.first().copied())
                .ok_or_else(|| ArchiveError::MissingKeyword {
                    keyword: "DOUBHEAD".into(),
                })?;
            times.push(days * SECONDS_PER_DAY);
            steps.push(records.into_iter().map(|r| (r.keyword, r.values)).collect());
        }
        tracing::debug!(
            case = %case.display(),
            steps = steps.len(),
            cells = grid.n_cells(),
            active = grid.n_active(),
            "opened simulation case"
        );
        Ok(Self {
            case,
            grid,
            init,
            times,
            steps,
        })
    }

    /// Case path without extension.
    pub fn case(&self) -> &Path {
        &self.case
    }
}

fn split_at_seqnum(records: Vec<EclRecord>) -> Vec<Vec<EclRecord>> {
    let mut steps: Vec<Vec<EclRecord>> = Vec::new();
    for record in records {
        if record.keyword == "SEQNUM" || steps.is_empty() {
            steps.push(Vec::new());
        }
        if let Some(step) = steps.last_mut() {
            step.push(record);
        }
    }
    steps
}

/// Read a corner-point grid from an `EGRID` file.
pub fn read_egrid(path: &Path) -> Result<CornerPointGrid, ArchiveError> {
    let records = read_file(path)?;
    let missing = |keyword: &str| ArchiveError::MissingKeyword {
        keyword: keyword.into(),
    };
    let head = first_values(&records, "GRIDHEAD")
        .and_then(EclValues::as_ints)
        .ok_or_else(|| missing("GRIDHEAD"))?;
    if head.len() < 4 {
        return Err(ArchiveError::malformed(path, "GRIDHEAD shorter than 4"));
    }
    let dims = [head[1] as usize, head[2] as usize, head[3] as usize];
    let coord = first_values(&records, "COORD")
        .and_then(EclValues::to_f64)
        .ok_or_else(|| missing("COORD"))?;
    let zcorn = first_values(&records, "ZCORN")
        .and_then(EclValues::to_f64)
        .ok_or_else(|| missing("ZCORN"))?;
    let actnum = first_values(&records, "ACTNUM").and_then(EclValues::as_ints);
    Ok(CornerPointGrid::from_arrays(dims, coord, zcorn, actnum)?)
}

/// `EGRID` records for a grid.
pub fn egrid_records(grid: &CornerPointGrid) -> Vec<EclRecord> {
    let [nx, ny, nz] = grid.dims();
    let mut head = vec![0i32; 100];
    head[0] = 1;
    head[1] = nx as i32;
    head[2] = ny as i32;
    head[3] = nz as i32;
    vec![
        EclRecord::new("GRIDHEAD", EclValues::Int(head)),
        EclRecord::new("COORD", EclValues::Real(grid.coord().iter().map(|x| *x as f32).collect())),
        EclRecord::new("ZCORN", EclValues::Real(grid.zcorn().iter().map(|x| *x as f32).collect())),
        EclRecord::new("ACTNUM", EclValues::Int(grid.actnum())),
    ]
}

/// Write a case in the layout [`EclArchive::open`] reads.
///
/// Each step gets `SEQNUM` and `DOUBHEAD` (days) ahead of its records.
pub fn write_case(
    case: &Path,
    layout: RestartLayout,
    grid: &CornerPointGrid,
    init: &[EclRecord],
    steps: &[(f64, Vec<EclRecord>)],
) -> Result<(), ArchiveError> {
    write_file(&with_extension(case, "EGRID"), &egrid_records(grid))?;
    write_file(&with_extension(case, "INIT"), init)?;
    let framed: Vec<Vec<EclRecord>> = steps
        .iter()
        .enumerate()
        .map(|(n, (seconds, records))| {
            let mut all = vec![
                EclRecord::new("SEQNUM", EclValues::Int(vec![n as i32])),
                EclRecord::new("DOUBHEAD", EclValues::Double(vec![seconds / SECONDS_PER_DAY])),
            ];
            all.extend(records.iter().cloned());
            all
        })
        .collect();
    match layout {
        RestartLayout::Unified => {
            let all: Vec<EclRecord> = framed.into_iter().flatten().collect();
            write_file(&with_extension(case, "UNRST"), &all)
        }
        RestartLayout::Separate => {
            for (n, records) in framed.iter().enumerate() {
                write_file(&with_extension(case, &format!("X{n:04}")), records)?;
            }
            Ok(())
        }
    }
}

impl SimulationArchive for EclArchive {
    fn grid(&self) -> &CornerPointGrid {
        &self.grid
    }

    fn report_times(&self) -> &[f64] {
        &self.times
    }

    fn init_keyword(&self, keyword: &str) -> Result<Vec<f64>, ArchiveError> {
        self.init
            .get(keyword)
            .and_then(EclValues::to_f64)
            .ok_or_else(|| ArchiveError::MissingKeyword {
                keyword: keyword.into(),
            })
    }

    fn restart_keyword(&self, keyword: &str, step: usize) -> Result<Vec<f64>, ArchiveError> {
        let records = self.steps.get(step).ok_or(ArchiveError::StepOutOfRange {
            step,
            available: self.steps.len(),
        })?;
        records
            .get(keyword)
            .and_then(EclValues::to_f64)
            .ok_or_else(|| ArchiveError::MissingKeyword {
                keyword: keyword.into(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_record_framing() {
        let records = vec![EclRecord::new("SEQNUM", EclValues::Int(vec![7]))];
        let mut buf = Vec::new();
        write_records(&mut buf, &records).unwrap();
        // header frame (4 + 16 + 4) + data frame (4 + 4 + 4)
        assert_eq!(buf.len(), 24 + 12);
        assert_eq!(&buf[0..4], &16i32.to_be_bytes());
        assert_eq!(&buf[4..12], b"SEQNUM  ");
        assert_eq!(&buf[16..20], b"INTE");
        assert_eq!(&buf[28..32], &7i32.to_be_bytes());
    }

    #[test]
    fn test_blocks_split_long_arrays() {
        let values: Vec<f64> = (0..2500).map(|x| x as f64).collect();
        let names: Vec<String> = (0..200).map(|i| format!("W{i}")).collect();
        let records = vec![
            EclRecord::new("PRESSURE", EclValues::Double(values.clone())),
            EclRecord::new("NAMES", EclValues::Char { width: 8, values: names.clone() }),
            EclRecord::new("LONGNAME", EclValues::Char { width: 10, values: vec!["abc".into()] }),
            EclRecord::new("FLAGS", EclValues::Logical(vec![true, false])),
            EclRecord::new("ENDSOL", EclValues::Message),
        ];
        let mut buf = Vec::new();
        write_records(&mut buf, &records).unwrap();
        let back = read_records(&mut Cursor::new(buf)).unwrap();
        assert_eq!(back, records);
    }

    #[test]
    fn test_truncated_data_is_an_error() {
        let mut buf = Vec::new();
        write_records(&mut buf, &[EclRecord::new("PORV", EclValues::Real(vec![1.0; 10]))]).unwrap();
        buf.truncate(buf.len() - 8);
        assert!(read_records(&mut Cursor::new(buf)).is_err());
    }

    #[test]
    fn test_seqnum_split() {
        let r = |k: &str| EclRecord::new(k, EclValues::Message);
        let steps = split_at_seqnum(vec![r("SEQNUM"), r("A"), r("SEQNUM"), r("B"), r("C")]);
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[1].len(), 3);
    }

    #[test]
    fn test_type_tags() {
        assert_eq!(EclValues::Char { width: 8, values: vec![] }.type_tag(), "CHAR");
        assert_eq!(EclValues::Char { width: 42, values: vec![] }.type_tag(), "C042");
        assert_eq!(element_width("C042"), Some(42));
        assert_eq!(element_width("XXXX"), None);
    }
}
