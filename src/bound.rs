//! Lower/upper bounds and optimal makespans of benchmark instances.
//!
//! The benchmark publishes one solution file per dataset:
//!
//! ```ignore
//! <26 header lines>
//!   1  1 43 43
//!   1  2 47 47
//!   3  1 45 43
//! <trailer>
//! ```
//!
//! Columns are the parameter index, the instance index, the upper bound and
//! the lower bound. The optimum is known only when both bounds agree.

use crate::cursor::LineCursor;
use crate::errors::*;
use csv;
use regex::Regex;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Lines before the first bound row of a solution file.
pub const BOUND_HEADER_LINES: usize = 26;

/// Lines before the makespan row of a legacy optimal file.
pub const LEGACY_HEADER_LINES: usize = 14;

/// One row of the bounds table.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct BoundRecord {
    /// `<file name>_<x>_<y>`
    pub ins: String,
    /// Lower bound.
    pub lb: i64,
    /// Upper bound.
    pub ub: i64,
    /// Set only when `lb == ub`.
    pub opt: Option<i64>,
}

impl BoundRecord {
    /// Creates a record; rejects `lb > ub`.
    pub fn new(ins: String, lb: i64, ub: i64) -> Result<Self> {
        if lb > ub {
            bail!(ErrorKind::InvalidBound(ins, lb, ub));
        }
        let opt = if lb == ub { Some(lb) } else { None };
        Ok(BoundRecord {
            ins: ins,
            lb: lb,
            ub: ub,
            opt: opt,
        })
    }
}

/// The bounds table keyed by instance id.
pub type Bounds = HashMap<String, BoundRecord>;

/// Parses one solution file. `name` is the file name, which prefixes every
/// instance id. Stops at the first line that is not a bound row.
pub fn parse_bound_file<R: BufRead>(name: &str, reader: R) -> Result<Vec<BoundRecord>> {
    let row = Regex::new(r"^ *(\d{1,3}) *(\d{1,3}) *(\d{1,3}) *(\d{1,3})")?;
    let mut cursor = LineCursor::new(reader, name);
    cursor.skip_header(BOUND_HEADER_LINES)?;

    let mut records = Vec::new();
    while let Some(line) = cursor.next_line()? {
        let caps = match row.captures(&line) {
            Some(caps) => caps,
            None => break,
        };
        let x = &caps[1];
        let y = &caps[2];
        let ub = caps[3].parse::<i64>()?;
        let lb = caps[4].parse::<i64>()?;
        records.push(BoundRecord::new(format!("{}_{}_{}", name, x, y), lb, ub)?);
    }
    trace!("{}: {} bound rows", name, records.len());
    Ok(records)
}

fn sorted_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).chain_err(|| format!("cannot list {:?}", dir))? {
        let path = entry?.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Parses every solution file in `dir`.
pub fn extract_bounds<P: AsRef<Path>>(dir: P) -> Result<Vec<BoundRecord>> {
    let mut records = Vec::new();
    for path in sorted_files(dir.as_ref())? {
        let file = File::open(&path)?;
        records.extend(parse_bound_file(&file_name(&path), BufReader::new(file))?);
    }
    info!("extracted {} bounds from {:?}", records.len(), dir.as_ref());
    Ok(records)
}

/// Writes `optimals.csv`.
pub fn write_bounds<P: AsRef<Path>>(path: P, records: &[BoundRecord]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Loads `optimals.csv` as a lookup table.
pub fn load_bounds<P: AsRef<Path>>(path: P) -> Result<Bounds> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path).chain_err(|| format!("no bounds file {:?}", path))?;
    let mut bounds = Bounds::new();
    for record in reader.deserialize() {
        let record: BoundRecord = record?;
        bounds.insert(record.ins.clone(), record);
    }
    Ok(bounds)
}

/// Optimal makespan from the older per-instance files.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LegacyOptimal {
    /// `J30_<parameter>_<instance>`
    pub ins: String,
    /// Optimal makespan.
    pub mk: i64,
}

/// Parses one legacy file (`j30<x>_<y>.sm`). Only the J30 set was published
/// in this format; new pipelines read `optimals.csv` instead.
pub fn parse_legacy_optimal<R: BufRead>(name: &str, reader: R) -> Result<LegacyOptimal> {
    let re = Regex::new(r"(?:[0-9]+ *){3}([0-9]*)")?;
    let mut cursor = LineCursor::new(reader, name);
    cursor.skip_header(LEGACY_HEADER_LINES)?;
    let groups = cursor.expect_match(&re)?;
    let stem = name.trim_start_matches("j30").trim_end_matches(".sm");
    Ok(LegacyOptimal {
        ins: format!("J30_{}", stem),
        mk: groups[0].parse()?,
    })
}

/// Parses every legacy file in `dir`.
pub fn extract_legacy_optimals<P: AsRef<Path>>(dir: P) -> Result<Vec<LegacyOptimal>> {
    let mut optimals = Vec::new();
    for path in sorted_files(dir.as_ref())? {
        let file = File::open(&path)?;
        optimals.push(parse_legacy_optimal(&file_name(&path), BufReader::new(file))?);
    }
    info!("extracted {} legacy optimals from {:?}", optimals.len(), dir.as_ref());
    Ok(optimals)
}

/// Writes `j30_opt.csv`.
pub fn write_legacy_optimals<P: AsRef<Path>>(path: P, optimals: &[LegacyOptimal]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for optimal in optimals {
        writer.serialize(optimal)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn header(n: usize) -> String {
        (0..n).map(|i| format!("header {}\n", i)).collect()
    }

    #[test]
    fn bound_row_without_optimum() {
        let text = format!("{}  3  1 45 43\n", header(BOUND_HEADER_LINES));
        let records = parse_bound_file("J30", text.as_bytes()).unwrap();
        assert_eq!(
            records,
            vec![BoundRecord {
                ins: "J30_3_1".to_string(),
                lb: 43,
                ub: 45,
                opt: None,
            }]
        );
    }

    #[test]
    fn stops_at_trailer() {
        let text = format!(
            "{}  1  1 43 43\n  1  2 47 47\n  3  1 45 43\n\n***********\n  9  9 99 99\n",
            header(BOUND_HEADER_LINES)
        );
        let records = parse_bound_file("J30", text.as_bytes()).unwrap();
        assert_eq!(records.len(), 3);
        for r in &records {
            assert!(r.lb <= r.ub);
            if r.lb == r.ub {
                assert_eq!(r.opt, Some(r.lb));
            } else {
                assert_eq!(r.opt, None);
            }
        }
        assert_eq!(records[1].ins, "J30_1_2");
    }

    #[test]
    fn short_file_fails() {
        let text = header(BOUND_HEADER_LINES - 1);
        match parse_bound_file("J60", text.as_bytes()) {
            Err(Error(ErrorKind::FileTooShort(_, n), _)) => assert_eq!(n, BOUND_HEADER_LINES),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn inverted_bounds_fail() {
        let text = format!("{}  3  1 40 43\n", header(BOUND_HEADER_LINES));
        assert!(parse_bound_file("J30", text.as_bytes()).is_err());
    }

    #[test]
    fn legacy_optimal() {
        let text = format!("{}      1     30     43     43\nrest\n", header(LEGACY_HEADER_LINES));
        let optimal = parse_legacy_optimal("j307_3.sm", text.as_bytes()).unwrap();
        assert_eq!(optimal.ins, "J30_7_3");
        assert_eq!(optimal.mk, 43);
    }

    #[test]
    fn extract_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = File::create(dir.path().join("J30")).unwrap();
        write!(file, "{}  1  1 43 43\n  3  1 45 43\n", header(BOUND_HEADER_LINES)).unwrap();
        drop(file);

        let records = extract_bounds(dir.path()).unwrap();
        let csv_path = dir.path().join("optimals.csv");
        write_bounds(&csv_path, &records).unwrap();

        let bounds = load_bounds(&csv_path).unwrap();
        assert_eq!(bounds.len(), 2);
        assert_eq!(bounds["J30_1_1"].opt, Some(43));
        assert_eq!(bounds["J30_3_1"].opt, None);
        assert_eq!(bounds["J30_3_1"].ub, 45);
    }
}
