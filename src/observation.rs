//! Observations: one row per solution a solver run reported.

use crate::errors::*;
use std::fmt;
use std::path::Path;

/// Value the parsers use for "unknown" before casting.
pub const SENTINEL: i64 = -1;

/// How a run ended.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// Optimality proven.
    #[serde(rename = "OPT")]
    Opt,
    /// A solution was found, optimality not proven.
    #[serde(rename = "SAT")]
    Sat,
    /// Nothing found before the timeout.
    #[serde(rename = "UNS")]
    Uns,
}

impl Outcome {
    /// Classifies the first line after the statistics blocks of a log.
    pub fn classify(line: &str) -> Outcome {
        if line.contains("Unknown") {
            Outcome::Uns
        } else if line.contains("satisfiable") {
            Outcome::Sat
        } else {
            Outcome::Opt
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match *self {
            Outcome::Opt => "OPT",
            Outcome::Sat => "SAT",
            Outcome::Uns => "UNS",
        };
        write!(f, "{}", s)
    }
}

/// A row as parsed from a log, before casting. Unknown numbers are
/// `SENTINEL`.
#[derive(Debug, Clone, PartialEq)]
pub struct RawObservation {
    /// Instance id, e.g. `J30_7_1`.
    pub ins: String,
    /// Strategy codename.
    pub strt: String,
    /// Timeout of the run.
    pub to: f64,
    /// Solver time when the solution was found.
    pub t: f64,
    /// Makespan.
    pub mk: i64,
    /// Decisions made so far.
    pub dc: i64,
    /// How the run ended.
    pub out: Outcome,
    /// Resource utilization.
    pub ru: f64,
    /// Secondary metric reported next to `ru`.
    pub pre: i64,
}

impl RawObservation {
    /// The row recorded for a run that found nothing.
    pub fn unsolved(ins: &str, strt: &str) -> Self {
        let unknown = SENTINEL as f64;
        RawObservation {
            ins: ins.to_string(),
            strt: strt.to_string(),
            to: unknown,
            t: unknown,
            mk: SENTINEL,
            dc: SENTINEL,
            out: Outcome::Uns,
            ru: unknown,
            pre: SENTINEL,
        }
    }
}

/// A typed result row. Missing numbers are `None` and show up as empty CSV
/// cells. `lb`, `ub`, `opt` are filled by the join against the bounds table
/// and `dev` is derived from `opt` and `mk`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Observation {
    /// Instance id.
    pub ins: String,
    /// Strategy codename.
    pub strt: String,
    /// Timeout.
    pub to: Option<f64>,
    /// Solver time.
    pub t: Option<f64>,
    /// Makespan.
    pub mk: Option<i64>,
    /// Decision count.
    pub dc: Option<i64>,
    /// How the run ended.
    pub out: Outcome,
    /// Resource utilization.
    pub ru: Option<f64>,
    /// Secondary metric.
    pub pre: Option<i64>,
    /// Lower bound of the instance.
    pub lb: Option<i64>,
    /// Upper bound of the instance.
    pub ub: Option<i64>,
    /// Optimal makespan, known only when `lb == ub`.
    pub opt: Option<i64>,
    /// Percentage gap between `opt` and `mk`.
    pub dev: Option<f64>,
}

fn known_i64(v: i64) -> Option<i64> {
    if v == SENTINEL {
        None
    } else {
        Some(v)
    }
}

fn known_f64(v: f64) -> Option<f64> {
    if v == SENTINEL as f64 || v.is_nan() {
        None
    } else {
        Some(v)
    }
}

impl From<RawObservation> for Observation {
    fn from(raw: RawObservation) -> Self {
        Observation {
            ins: raw.ins,
            strt: raw.strt,
            to: known_f64(raw.to),
            t: known_f64(raw.t),
            mk: known_i64(raw.mk),
            dc: known_i64(raw.dc),
            out: raw.out,
            ru: known_f64(raw.ru),
            pre: known_i64(raw.pre),
            lb: None,
            ub: None,
            opt: None,
            dev: None,
        }
    }
}

impl Observation {
    /// Signed percentage gap: positive when the run beat the reference.
    pub fn signed_dev(&self) -> Option<f64> {
        match (self.opt, self.mk) {
            (Some(opt), Some(mk)) => Some((opt - mk) as f64 / opt as f64 * 100.0),
            _ => None,
        }
    }

    /// Absolute percentage gap, as older result sets report it.
    pub fn absolute_dev(&self) -> Option<f64> {
        match (self.opt, self.mk) {
            (Some(opt), Some(mk)) => Some((mk - opt).abs() as f64 / opt as f64 * 100.0),
            _ => None,
        }
    }
}

/// Writes a table with a header row.
pub fn write_rows<P: AsRef<Path>>(path: P, rows: &[Observation]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Reads a table written by `write_rows`.
pub fn read_rows<P: AsRef<Path>>(path: P) -> Result<Vec<Observation>> {
    let path = path.as_ref();
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .chain_err(|| format!("no table {:?}", path))?;
    let mut rows = Vec::new();
    for record in reader.deserialize() {
        let row: Observation = record?;
        rows.push(row);
    }
    Ok(rows)
}

#[cfg(test)]
pub mod tests {
    //! Row builders shared by the other test modules.

    use super::*;

    /// A solved row with only the fields the tests vary.
    pub fn row(ins: &str, strt: &str, mk: i64, out: Outcome) -> Observation {
        Observation {
            ins: ins.to_string(),
            strt: strt.to_string(),
            to: Some(60000.0),
            t: Some(1000.0),
            mk: Some(mk),
            dc: Some(10),
            out: out,
            ru: Some(0.5),
            pre: Some(1),
            lb: None,
            ub: None,
            opt: None,
            dev: None,
        }
    }

    #[test]
    fn classify_outcome() {
        assert_eq!(Outcome::classify("=====UNKNOWN===== Unknown"), Outcome::Uns);
        assert_eq!(Outcome::classify("unsatisfiable"), Outcome::Sat);
        assert_eq!(Outcome::classify("=========="), Outcome::Opt);
        assert_eq!(Outcome::classify(""), Outcome::Opt);
    }

    #[test]
    fn cast_turns_sentinel_into_missing() {
        let obs = Observation::from(RawObservation::unsolved("J30_1_1", "vslw"));
        assert_eq!(obs.to, None);
        assert_eq!(obs.t, None);
        assert_eq!(obs.mk, None);
        assert_eq!(obs.dc, None);
        assert_eq!(obs.ru, None);
        assert_eq!(obs.pre, None);
        assert_eq!(obs.out, Outcome::Uns);
    }

    #[test]
    fn deviation() {
        let mut obs = row("J30_1_1", "vslw", 47, Outcome::Sat);
        assert_eq!(obs.signed_dev(), None);
        obs.opt = Some(43);
        let expected = (43.0 - 47.0) / 43.0 * 100.0;
        assert!((obs.signed_dev().unwrap() - expected).abs() < 1e-9);
        assert!((obs.absolute_dev().unwrap() + expected).abs() < 1e-9);
    }

    #[test]
    fn csv_keeps_missing_cells() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("raw.csv");
        let mut solved = row("J30_1_1", "vslw", 47, Outcome::Opt);
        solved.opt = Some(47);
        solved.dev = Some(0.0);
        let unsolved = Observation::from(RawObservation::unsolved("J30_1_2", "vslw"));
        write_rows(&path, &[solved.clone(), unsolved.clone()]).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("ins,strt,to,t,mk,dc,out,ru,pre,lb,ub,opt,dev\n"));
        assert!(text.contains("J30_1_2,vslw,,,,,UNS,,,,,,"));

        let rows = read_rows(&path).unwrap();
        assert_eq!(rows, vec![solved, unsolved]);
    }
}
