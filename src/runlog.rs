//! Parsers for solver run logs.
//!
//! A result folder holds `runs_<start>-<end>` directories, each with one
//! `run_<index>/run.log` per index in `[start, end]` (indices are
//! zero-padded to the width of `start`). A log looks like:
//!
//! ```ignore
//! Running "/instances/J30/J30_7_1.dzn" with strategy vslw with timeout 60000
//! %%%mzn-stat: objective=49
//! %%%mzn-stat: numberOfDecisions=120
//! <5 lines>
//! %%%mzn-stat: timeSpentInSolverInMilliseconds=31
//! <2 lines>
//! ... more statistics blocks, one per improving solution ...
//! ==========
//! RU(0.71), PRE(4)
//! RU(0.74), PRE(5)
//! ```
//!
//! The `RU/PRE` lines pair up with the statistics blocks in order.

use crate::cursor::{LineCursor, ScanState};
use crate::errors::*;
use crate::observation::{Observation, Outcome, RawObservation};
use regex::Regex;
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Marks a solver statistics line.
const STAT_MARKER: &str = "%%%";

/// Lines between `numberOfDecisions` and `timeSpentInSolverInMilliseconds`.
const DECISIONS_TO_TIME: usize = 5;

/// Lines after `timeSpentInSolverInMilliseconds` that close a block.
const BLOCK_TRAILER: usize = 2;

/// Instances whose first run must be thrown away because it was re-run.
///
/// The set is consumed while parsing: the first log of a listed instance is
/// dropped and the id removed, so the re-run is kept. The batch that holds
/// the re-runs therefore has to be parsed before any other batch.
#[derive(Debug, Clone, Default)]
pub struct BadRuns {
    ids: HashSet<String>,
}

impl BadRuns {
    /// Creates a set; a `.dzn` suffix on an id is ignored.
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        BadRuns {
            ids: ids
                .into_iter()
                .map(|id| strip_model_suffix(id.as_ref()).to_string())
                .collect(),
        }
    }

    /// Removes `ins` if present; returns whether the run is to be dropped.
    pub fn take(&mut self, ins: &str) -> bool {
        self.ids.remove(ins)
    }

    /// Ids not consumed yet, sorted.
    pub fn remaining(&self) -> Vec<String> {
        let mut ids = self.ids.iter().cloned().collect::<Vec<_>>();
        ids.sort();
        ids
    }

    /// Number of ids not consumed yet.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether every id has been consumed.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

fn strip_model_suffix(name: &str) -> &str {
    name.trim_end_matches(".dzn")
}

/// A contiguous range of numbered runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRange {
    /// The `runs_<start>-<end>` directory.
    pub dir: PathBuf,
    /// First run index.
    pub start: usize,
    /// Last run index (inclusive).
    pub end: usize,
    width: usize,
}

impl RunRange {
    /// Path to every `run.log` of the range, in index order.
    pub fn log_paths(&self) -> Vec<PathBuf> {
        (self.start..=self.end)
            .map(|i| {
                self.dir
                    .join(format!("run_{:0width$}", i, width = self.width))
                    .join("run.log")
            })
            .collect()
    }
}

/// Finds every `runs_<start>-<end>` directory under `root`, ordered by
/// `start`.
pub fn run_ranges<P: AsRef<Path>>(root: P) -> Result<Vec<RunRange>> {
    let root = root.as_ref();
    let re = Regex::new(r"^runs_([0-9]+)-([0-9]+)$")?;
    let mut ranges = Vec::new();
    for entry in fs::read_dir(root).chain_err(|| format!("cannot list {:?}", root))? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if let Some(caps) = re.captures(&name) {
            ranges.push(RunRange {
                dir: entry.path(),
                start: caps[1].parse()?,
                end: caps[2].parse()?,
                width: caps[1].len(),
            });
        }
    }
    if ranges.is_empty() {
        bail!(ErrorKind::NoRunRanges(root.display().to_string()));
    }
    ranges.sort_by_key(|r| (r.start, r.end));
    Ok(ranges)
}

#[derive(Debug, Default)]
struct RunHeader {
    instance: String,
    strategy: String,
    timeout: f64,
}

#[derive(Debug)]
struct StatBlock {
    mk: i64,
    dc: i64,
    t: f64,
}

/// Compiled patterns for both log formats.
pub struct RunLogParser {
    header: Regex,
    objective: Regex,
    decisions: Regex,
    time: Regex,
    metrics: Regex,
    legacy_header: Regex,
    legacy_row: Regex,
}

impl RunLogParser {
    /// Compiles the patterns.
    pub fn new() -> Result<Self> {
        Ok(RunLogParser {
            header: Regex::new(r#".*(J\d{2,3}.*)" with strategy (.*) with timeout (.*)"#)?,
            objective: Regex::new(r"%%%mzn-stat: objective=(\d+)")?,
            decisions: Regex::new(r"%%%mzn-stat: numberOfDecisions=(\d+)")?,
            time: Regex::new(r"%%%mzn-stat: timeSpentInSolverInMilliseconds=(\d+)")?,
            metrics: Regex::new(r"RU\((.*)\), PRE\((.*)\)")?,
            legacy_header: Regex::new(
                r#".*instances/j.{0,3}/(.*)" with strategy (.*) with timeout (.*)"#,
            )?,
            legacy_row: Regex::new(r"T\((.*)\), M\((.*)\), RU\((.*)\), DC\((.*)\), PRE\((.*)\)")?,
        })
    }

    /// Parses one `run.log`. Returns no rows when the run is listed in
    /// `bad_runs` (and consumes that entry).
    pub fn parse<R: BufRead>(
        &self,
        reader: R,
        source: &str,
        bad_runs: &mut BadRuns,
    ) -> Result<Vec<Observation>> {
        let mut scan = RunScan {
            parser: self,
            cursor: LineCursor::new(reader, source),
            header: RunHeader::default(),
            blocks: Vec::new(),
            metrics: Vec::new(),
            outcome_line: None,
            outcome: Outcome::Opt,
            discarded: false,
        };

        let mut state = ScanState::Header;
        while state != ScanState::Done {
            state = scan.step(state, bad_runs)?;
        }
        Ok(scan.finish().into_iter().map(Observation::from).collect())
    }

    /// Parses one log of the older format: a single outcome line after the
    /// header, then one `T(..), M(..), RU(..), DC(..), PRE(..)` line per
    /// solution. Times are converted to seconds.
    pub fn parse_legacy<R: BufRead>(&self, reader: R, source: &str) -> Result<Vec<Observation>> {
        let mut cursor = LineCursor::new(reader, source);
        let header = cursor.expect_match(&self.legacy_header)?;
        let instance = strip_model_suffix(&header[0]);
        let strategy = &header[1];
        let timeout = header[2].trim().parse::<f64>()? / 1000.0;

        let outcome = Outcome::classify(&cursor.next_line()?.unwrap_or_default());
        let mut rows = Vec::new();
        if outcome == Outcome::Uns {
            let mut unsolved = RawObservation::unsolved(instance, strategy);
            unsolved.to = timeout;
            unsolved.pre = 0;
            rows.push(unsolved);
        }

        for line in cursor.rest()? {
            let fields = cursor.captures(&self.legacy_row, &line)?;
            rows.push(RawObservation {
                ins: instance.to_string(),
                strt: strategy.to_string(),
                to: timeout,
                t: fields[0].trim().parse::<f64>()? / 1000.0,
                mk: fields[1].trim().parse()?,
                dc: fields[3].trim().parse()?,
                out: outcome,
                ru: fields[2].trim().parse()?,
                pre: fields[4].trim().parse()?,
            });
        }
        Ok(rows.into_iter().map(Observation::from).collect())
    }
}

/// Scanner state for one log in the current format.
struct RunScan<'p, R> {
    parser: &'p RunLogParser,
    cursor: LineCursor<R>,
    header: RunHeader,
    blocks: Vec<StatBlock>,
    metrics: Vec<(f64, i64)>,
    outcome_line: Option<String>,
    outcome: Outcome,
    discarded: bool,
}

impl<'p, R: BufRead> RunScan<'p, R> {
    fn step(&mut self, state: ScanState, bad_runs: &mut BadRuns) -> Result<ScanState> {
        match state {
            ScanState::Header => {
                let fields = self.cursor.expect_match(&self.parser.header)?;
                self.header = RunHeader {
                    instance: strip_model_suffix(&fields[0]).to_string(),
                    strategy: fields[1].clone(),
                    timeout: fields[2].trim().parse()?,
                };
                if bad_runs.take(&self.header.instance) {
                    info!(
                        "dropping first run of {} ({})",
                        self.header.instance,
                        self.cursor.source()
                    );
                    self.discarded = true;
                    return Ok(ScanState::Done);
                }
                Ok(ScanState::Statistics)
            }
            ScanState::Statistics => match self.cursor.next_line()? {
                Some(ref line) if line.contains(STAT_MARKER) => {
                    let block = self.read_block(line)?;
                    trace!("{}: block {:?}", self.cursor.source(), block);
                    self.blocks.push(block);
                    Ok(ScanState::Statistics)
                }
                line => {
                    self.outcome_line = line;
                    Ok(ScanState::Outcome)
                }
            },
            ScanState::Outcome => {
                let line = self.outcome_line.take().unwrap_or_default();
                self.outcome = Outcome::classify(&line);
                if self.outcome == Outcome::Uns {
                    Ok(ScanState::Done)
                } else {
                    Ok(ScanState::Metrics)
                }
            }
            ScanState::Metrics => {
                for line in self.cursor.rest()? {
                    let fields = self.cursor.captures(&self.parser.metrics, &line)?;
                    let ru = fields[0].trim().parse::<f64>()?;
                    let pre = fields[1].trim().parse::<i64>()?;
                    self.metrics.push((ru, pre));
                }
                Ok(ScanState::Done)
            }
            ScanState::Done => Ok(ScanState::Done),
        }
    }

    fn read_block(&mut self, marker_line: &str) -> Result<StatBlock> {
        let mk = self.cursor.captures(&self.parser.objective, marker_line)?[0].parse::<i64>()?;
        let dc = self.cursor.expect_match(&self.parser.decisions)?[0].parse::<i64>()?;
        self.cursor.skip(DECISIONS_TO_TIME)?;
        let t = self.cursor.expect_match(&self.parser.time)?[0].parse::<f64>()?;
        self.cursor.skip(BLOCK_TRAILER)?;
        Ok(StatBlock { mk: mk, dc: dc, t: t })
    }

    fn finish(self) -> Vec<RawObservation> {
        if self.discarded {
            return Vec::new();
        }
        let header = self.header;
        if self.outcome == Outcome::Uns {
            return vec![RawObservation::unsolved(&header.instance, &header.strategy)];
        }
        if self.blocks.len() != self.metrics.len() {
            debug!(
                "{}: {} statistics blocks but {} metric lines",
                self.cursor.source(),
                self.blocks.len(),
                self.metrics.len()
            );
        }
        let outcome = self.outcome;
        self.blocks
            .into_iter()
            .zip(self.metrics.into_iter())
            .map(|(block, (ru, pre))| RawObservation {
                ins: header.instance.clone(),
                strt: header.strategy.clone(),
                to: header.timeout,
                t: block.t,
                mk: block.mk,
                dc: block.dc,
                out: outcome,
                ru: ru,
                pre: pre,
            })
            .collect()
    }
}

fn open_log(path: &Path) -> Result<BufReader<File>> {
    let file = File::open(path).chain_err(|| format!("no run log {:?}", path))?;
    Ok(BufReader::new(file))
}

/// Parses every run of every range under `root`.
pub fn parse_batch<P: AsRef<Path>>(root: P, bad_runs: &mut BadRuns) -> Result<Vec<Observation>> {
    let parser = RunLogParser::new()?;
    let mut rows = Vec::new();
    for range in run_ranges(root.as_ref())? {
        debug!("parsing runs {}-{} in {:?}", range.start, range.end, range.dir);
        for path in range.log_paths() {
            let source = path.display().to_string();
            rows.extend(parser.parse(open_log(&path)?, &source, bad_runs)?);
        }
    }
    info!("parsed {} observations from {:?}", rows.len(), root.as_ref());
    Ok(rows)
}

/// Parses a result folder of the older format. Only the first
/// `runs_<start>-<end>` directory is read.
pub fn parse_legacy_batch<P: AsRef<Path>>(root: P) -> Result<Vec<Observation>> {
    let parser = RunLogParser::new()?;
    let ranges = run_ranges(root.as_ref())?;
    let mut rows = Vec::new();
    for path in ranges[0].log_paths() {
        let source = path.display().to_string();
        rows.extend(parser.parse_legacy(open_log(&path)?, &source)?);
    }
    info!("parsed {} legacy observations from {:?}", rows.len(), root.as_ref());
    Ok(rows)
}
