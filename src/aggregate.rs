//! Joining, ordering and reducing observation tables.
//!
//! Every function takes a table and returns a new one, so a pipeline reads
//! as a chain of calls:
//!
//! ```ignore
//! let rows = update_dev(join_bounds(parse_batch(root, &mut bad_runs)?, &bounds));
//! let (opt, sat) = separate_sat_opt(aggregate(&sort_rows(rows, &order)));
//! ```

use crate::bound::Bounds;
use crate::errors::*;
use crate::observation::{Observation, Outcome};
use crate::runlog::{parse_batch, parse_legacy_batch, BadRuns};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::Path;

/// Left join on the instance id. Instances without a bound row keep
/// `lb`, `ub` and `opt` empty.
pub fn join_bounds(rows: Vec<Observation>, bounds: &Bounds) -> Vec<Observation> {
    let mut missing = 0;
    let rows = rows
        .into_iter()
        .map(|mut row| {
            match bounds.get(&row.ins) {
                Some(b) => {
                    row.lb = Some(b.lb);
                    row.ub = Some(b.ub);
                    row.opt = b.opt;
                }
                None => {
                    missing += 1;
                    row.lb = None;
                    row.ub = None;
                    row.opt = None;
                }
            }
            row
        })
        .collect();
    if missing > 0 {
        debug!("{} rows without a bound row", missing);
    }
    rows
}

/// Recomputes `dev = (opt - mk) / opt * 100`.
pub fn update_dev(rows: Vec<Observation>) -> Vec<Observation> {
    rows.into_iter()
        .map(|mut row| {
            row.dev = row.signed_dev();
            row
        })
        .collect()
}

/// Recomputes `dev = |mk - opt| / opt * 100`, the convention of the older
/// result sets.
pub fn update_dev_absolute(rows: Vec<Observation>) -> Vec<Observation> {
    rows.into_iter()
        .map(|mut row| {
            row.dev = row.absolute_dev();
            row
        })
        .collect()
}

/// Parses a result folder and attaches bounds and deviation.
pub fn load_batch<P: AsRef<Path>>(
    root: P,
    bounds: &Bounds,
    bad_runs: &mut BadRuns,
) -> Result<Vec<Observation>> {
    let rows = parse_batch(root, bad_runs)?;
    Ok(update_dev(join_bounds(rows, bounds)))
}

/// `load_batch` for result folders of the older log format.
pub fn load_legacy_batch<P: AsRef<Path>>(root: P, bounds: &Bounds) -> Result<Vec<Observation>> {
    let rows = parse_legacy_batch(root)?;
    Ok(update_dev_absolute(join_bounds(rows, bounds)))
}

/// Loads the corrective batch and then every other batch, threading
/// `bad_runs` through. Rows come back in `batches` order followed by the
/// corrective batch, together with whatever `bad_runs` was not consumed.
pub fn process_batches<P: AsRef<Path>>(
    corrective: P,
    batches: &[P],
    bounds: &Bounds,
    mut bad_runs: BadRuns,
) -> Result<(Vec<Observation>, BadRuns)> {
    let reruns = load_batch(corrective, bounds, &mut bad_runs)?;
    let mut loaded = Vec::with_capacity(batches.len());
    for batch in batches {
        loaded.push(load_batch(batch, bounds, &mut bad_runs)?);
    }
    loaded.push(reruns);

    if !bad_runs.is_empty() {
        warn!("bad runs never seen: {:?}", bad_runs.remaining());
    }
    Ok((concat(loaded), bad_runs))
}

/// Concatenates tables in order.
pub fn concat(tables: Vec<Vec<Observation>>) -> Vec<Observation> {
    tables.into_iter().flat_map(|t| t.into_iter()).collect()
}

/// The fixed display order of strategies.
#[derive(Debug, Clone)]
pub struct StrategyOrder {
    names: Vec<String>,
}

impl StrategyOrder {
    /// Creates an order from codenames, first to last.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        StrategyOrder { names: names.into_iter().map(Into::into).collect() }
    }

    /// Position of `strategy`; unlisted strategies share the last position.
    pub fn rank(&self, strategy: &str) -> usize {
        self.names
            .iter()
            .position(|s| s == strategy)
            .unwrap_or_else(|| self.names.len())
    }

    /// Whether `strategy` is listed.
    pub fn contains(&self, strategy: &str) -> bool {
        self.names.iter().any(|s| s == strategy)
    }

    /// Compares two strategies by rank, then by name.
    pub fn compare(&self, a: &str, b: &str) -> Ordering {
        self.rank(a).cmp(&self.rank(b)).then_with(|| {
            if self.contains(a) {
                Ordering::Equal
            } else {
                a.cmp(b)
            }
        })
    }
}

impl Default for StrategyOrder {
    fn default() -> Self {
        StrategyOrder::new(vec!["default", "grdlw", "vslw"])
    }
}

/// Descending, with missing values last.
fn desc_missing_last(a: Option<i64>, b: Option<i64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Sorts by strategy order, then instance, then makespan (largest first).
pub fn sort_rows(mut rows: Vec<Observation>, order: &StrategyOrder) -> Vec<Observation> {
    let mut unknown = rows
        .iter()
        .filter(|r| !order.contains(&r.strt))
        .map(|r| r.strt.clone())
        .collect::<Vec<_>>();
    unknown.sort();
    unknown.dedup();
    if !unknown.is_empty() {
        warn!("strategies outside the display order: {:?}", unknown);
    }

    rows.sort_by(|a, b| {
        order
            .compare(&a.strt, &b.strt)
            .then_with(|| a.ins.cmp(&b.ins))
            .then_with(|| desc_missing_last(a.mk, b.mk))
    });
    rows
}

/// Keeps, per (instance, strategy), the rows with the smallest makespan.
/// Ties are all kept. Rows without a makespan never qualify.
pub fn aggregate(rows: &[Observation]) -> Vec<Observation> {
    let mut best: HashMap<(&str, &str), i64> = HashMap::new();
    for row in rows {
        if let Some(mk) = row.mk {
            let entry = best.entry((row.ins.as_str(), row.strt.as_str())).or_insert(mk);
            if mk < *entry {
                *entry = mk;
            }
        }
    }

    rows.iter()
        .filter(|row| {
            let min = best.get(&(row.ins.as_str(), row.strt.as_str()));
            row.mk.is_some() && row.mk.as_ref() == min
        })
        .cloned()
        .collect()
}

/// Splits into (proven optimal, everything else).
pub fn separate_sat_opt(rows: Vec<Observation>) -> (Vec<Observation>, Vec<Observation>) {
    rows.into_iter().partition(|r| r.out == Outcome::Opt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bound::BoundRecord;
    use crate::observation::tests::row;
    use crate::observation::RawObservation;

    fn bounds() -> Bounds {
        let mut bounds = Bounds::new();
        for record in vec![
            BoundRecord::new("A".to_string(), 10, 10).unwrap(),
            BoundRecord::new("B".to_string(), 40, 45).unwrap(),
        ] {
            bounds.insert(record.ins.clone(), record);
        }
        bounds
    }

    #[test]
    fn join_is_left_join() {
        let rows = vec![
            row("A", "x", 12, Outcome::Sat),
            row("B", "x", 44, Outcome::Sat),
            row("C", "x", 50, Outcome::Sat),
        ];
        let joined = update_dev(join_bounds(rows, &bounds()));
        assert_eq!(joined.len(), 3);
        assert_eq!(joined[0].opt, Some(10));
        assert!((joined[0].dev.unwrap() - (10.0 - 12.0) / 10.0 * 100.0).abs() < 1e-9);
        assert_eq!((joined[1].lb, joined[1].ub, joined[1].opt), (Some(40), Some(45), None));
        assert_eq!(joined[1].dev, None);
        assert_eq!((joined[2].lb, joined[2].opt, joined[2].dev), (None, None, None));
    }

    #[test]
    fn absolute_deviation() {
        let rows = update_dev_absolute(join_bounds(vec![row("A", "x", 12, Outcome::Sat)], &bounds()));
        assert!((rows[0].dev.unwrap() - 20.0).abs() < 1e-9);
    }

    #[test]
    fn aggregate_keeps_group_minimum() {
        let rows = vec![
            row("A", "x", 10, Outcome::Opt),
            row("A", "x", 15, Outcome::Sat),
            row("A", "y", 7, Outcome::Opt),
        ];
        let agg = aggregate(&rows);
        assert_eq!(agg.len(), 2);
        assert_eq!((agg[0].strt.as_str(), agg[0].mk), ("x", Some(10)));
        assert_eq!((agg[1].strt.as_str(), agg[1].mk), ("y", Some(7)));
    }

    #[test]
    fn aggregate_keeps_ties_and_drops_unsolved() {
        let rows = vec![
            row("A", "x", 10, Outcome::Sat),
            row("A", "x", 10, Outcome::Opt),
            Observation::from(RawObservation::unsolved("A", "x")),
            Observation::from(RawObservation::unsolved("B", "x")),
        ];
        let agg = aggregate(&rows);
        assert_eq!(agg.len(), 2);
        assert!(agg.iter().all(|r| r.mk == Some(10)));
    }

    #[test]
    fn partitions_are_exhaustive() {
        let rows = vec![
            row("A", "x", 10, Outcome::Opt),
            row("B", "x", 10, Outcome::Sat),
            row("C", "y", 7, Outcome::Opt),
            Observation::from(RawObservation::unsolved("D", "x")),
        ];
        let (opt, rest) = separate_sat_opt(rows.clone());
        assert_eq!(opt.len() + rest.len(), rows.len());
        assert!(opt.iter().all(|r| r.out == Outcome::Opt));
        assert!(rest.iter().all(|r| r.out != Outcome::Opt));
        for r in &rows {
            assert!(opt.contains(r) != rest.contains(r));
        }
    }

    #[test]
    fn sort_follows_strategy_order() {
        let rows = vec![
            row("B", "vslw", 5, Outcome::Sat),
            row("A", "vslw", 3, Outcome::Sat),
            Observation::from(RawObservation::unsolved("A", "vslw")),
            row("A", "vslw", 9, Outcome::Sat),
            row("Z", "default", 1, Outcome::Sat),
            row("A", "other", 1, Outcome::Sat),
        ];
        let sorted = sort_rows(rows, &StrategyOrder::default());
        let keys = sorted
            .iter()
            .map(|r| (r.strt.as_str(), r.ins.as_str(), r.mk))
            .collect::<Vec<_>>();
        assert_eq!(
            keys,
            vec![
                ("default", "Z", Some(1)),
                ("vslw", "A", Some(9)),
                ("vslw", "A", Some(3)),
                ("vslw", "A", None),
                ("vslw", "B", Some(5)),
                ("other", "A", Some(1)),
            ]
        );
    }

    #[test]
    fn corrective_batch_goes_first() {
        use std::fs::{self, File};
        use std::io::Write;

        let root = tempfile::tempdir().unwrap();
        let log = |batch: &str, run: usize, ins: &str, mk: i64| {
            let dir = root
                .path()
                .join(batch)
                .join("runs_1-2")
                .join(format!("run_{}", run));
            fs::create_dir_all(&dir).unwrap();
            let mut file = File::create(dir.join("run.log")).unwrap();
            write!(
                file,
                "Running \"{}.dzn\" with strategy vslw with timeout 1000\n\
                 %%%mzn-stat: objective={}\n%%%mzn-stat: numberOfDecisions=1\n\
                 \n\n\n\n\n%%%mzn-stat: timeSpentInSolverInMilliseconds=1\n\n\n\
                 ==========\nRU(0.5), PRE(1)\n",
                ins, mk
            )
            .unwrap();
        };
        // first run of J30_7_1 is faulty, the second one is its re-run
        log("reruns", 1, "J30_7_1", 60);
        log("reruns", 2, "J30_7_1", 43);
        log("other", 1, "J30_7_2", 50);
        log("other", 2, "J30_7_1", 44);

        let mut bounds = Bounds::new();
        let record = BoundRecord::new("J30_7_1".to_string(), 43, 43).unwrap();
        bounds.insert(record.ins.clone(), record);

        let batches = vec![root.path().join("other")];
        let bad_runs = BadRuns::new(vec!["J30_7_1.dzn", "J30_9_9.dzn"]);
        let (rows, left) =
            process_batches(root.path().join("reruns"), &batches, &bounds, bad_runs).unwrap();

        let keys = rows.iter().map(|r| (r.ins.as_str(), r.mk)).collect::<Vec<_>>();
        assert_eq!(
            keys,
            vec![("J30_7_2", Some(50)), ("J30_7_1", Some(44)), ("J30_7_1", Some(43))]
        );
        assert_eq!(rows[2].dev, Some(0.0));
        assert_eq!(left.remaining(), vec!["J30_9_9".to_string()]);
    }
}
