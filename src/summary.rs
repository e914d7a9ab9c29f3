//! Table transformations and grouped summary statistics for reporting.

use crate::aggregate::StrategyOrder;
use crate::errors::*;
use crate::observation::{Observation, Outcome};
use average::Mean;
use itertools::Itertools;
use std::collections::{BTreeMap, HashMap};

/// Name of the group that holds every row.
pub const ALL_GROUP: &str = "all";

/// Position in the instance id of the character naming the dataset
/// (`J30_..` -> `'3'`, `J120_..` -> `'1'`).
const DATASET_CHAR: usize = 1;

/// Which bound stands in for the optimum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    /// Lower bound.
    Lower,
    /// Upper bound.
    Upper,
}

/// The benchmark datasets by their dataset character.
pub fn default_datasets() -> BTreeMap<char, String> {
    vec![('1', "J120"), ('3', "J30"), ('6', "J60"), ('9', "J90")]
        .into_iter()
        .map(|(c, name)| (c, name.to_string()))
        .collect()
}

fn with_bound(mut row: Observation, bound: Bound) -> Observation {
    row.opt = match bound {
        Bound::Lower => row.lb,
        Bound::Upper => row.ub,
    };
    row.dev = row.signed_dev();
    row
}

/// Replaces `opt` with the chosen bound and recomputes the deviation.
pub fn include_bounds(rows: Vec<Observation>, bound: Bound) -> Vec<Observation> {
    rows.into_iter().map(|row| with_bound(row, bound)).collect()
}

/// Keeps rows whose (instance, outcome) pair occurs more than twice, i.e.
/// instances every strategy solved the same way.
pub fn keep_matching(rows: Vec<Observation>) -> Vec<Observation> {
    let mut sizes: HashMap<(String, Outcome), usize> = HashMap::new();
    for row in &rows {
        *sizes.entry((row.ins.clone(), row.out)).or_insert(0) += 1;
    }
    rows.into_iter()
        .filter(|row| sizes[&(row.ins.clone(), row.out)] > 2)
        .collect()
}

fn in_seconds(mut row: Observation) -> Observation {
    row.t = row.t.map(|t| t / 1000.0);
    row
}

/// Converts solver time from milliseconds to seconds.
pub fn as_seconds(rows: Vec<Observation>) -> Vec<Observation> {
    rows.into_iter().map(in_seconds).collect()
}

/// Dataset name of an instance id.
pub fn dataset_of(ins: &str, datasets: &BTreeMap<char, String>) -> Result<String> {
    ins.chars()
        .nth(DATASET_CHAR)
        .and_then(|c| datasets.get(&c))
        .cloned()
        .ok_or_else(|| ErrorKind::UnknownDataset(ins.to_string()).into())
}

/// A row tagged with the group it is summarized under.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupedRow {
    /// Dataset name or `ALL_GROUP`.
    pub group: String,
    /// The observation.
    pub row: Observation,
    /// Whether the row beat a known optimum (`dev > 0` at grouping time).
    pub improved: bool,
}

fn improved(row: &Observation) -> bool {
    row.dev.map_or(false, |d| d > 0.0)
}

/// Tags every row with its dataset, then appends a copy of every row in
/// `ALL_GROUP`. The improvement flag is taken from the deviation the rows
/// carry now, so group before substituting bounds for `opt`.
pub fn with_groups(
    rows: Vec<Observation>,
    datasets: &BTreeMap<char, String>,
) -> Result<Vec<GroupedRow>> {
    let mut grouped = Vec::with_capacity(rows.len() * 2);
    for row in &rows {
        grouped.push(GroupedRow {
            group: dataset_of(&row.ins, datasets)?,
            row: row.clone(),
            improved: improved(row),
        });
    }
    grouped.extend(rows.into_iter().map(|row| GroupedRow {
        group: ALL_GROUP.to_string(),
        improved: improved(&row),
        row: row,
    }));
    Ok(grouped)
}

/// Summary statistics of one (group, strategy) cell.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct SummaryRow {
    /// Dataset group.
    pub group: String,
    /// Strategy codename.
    pub strt: String,
    /// Mean deviation.
    pub dev: Option<f64>,
    /// Mean resource utilization.
    pub ru: Option<f64>,
    /// Runs that beat a known optimum.
    pub imp: usize,
    /// Mean decision count.
    pub dc: Option<f64>,
    /// Mean solver time.
    pub t: Option<f64>,
    /// Mean of the secondary metric.
    pub pre: Option<f64>,
    /// Runs with the outcome the table is about.
    pub count: usize,
}

/// Mean over the present values; `None` if there are none.
pub fn mean<I: IntoIterator<Item = Option<f64>>>(values: I) -> Option<f64> {
    let m: Mean = values.into_iter().flatten().collect();
    if m.is_empty() {
        None
    } else {
        Some(m.mean())
    }
}

/// Groups by (group, strategy) and computes the summary of each cell.
/// `outcome` is what `count` counts. Groups are ordered by name, strategies
/// by `order`.
pub fn summarize(rows: &[GroupedRow], outcome: Outcome, order: &StrategyOrder) -> Vec<SummaryRow> {
    let mut sorted = rows.iter().collect::<Vec<_>>();
    sorted.sort_by(|a, b| {
        a.group
            .cmp(&b.group)
            .then_with(|| order.compare(&a.row.strt, &b.row.strt))
    });

    let cells = sorted
        .into_iter()
        .group_by(|g| (g.group.clone(), g.row.strt.clone()));
    let summary = cells
        .into_iter()
        .map(|((group, strt), members)| {
            let members = members.collect::<Vec<_>>();
            let imp = members.iter().filter(|g| g.improved).count();
            let members = members.into_iter().map(|g| &g.row).collect::<Vec<_>>();
            SummaryRow {
                group: group,
                strt: strt,
                dev: mean(members.iter().map(|r| r.dev)),
                ru: mean(members.iter().map(|r| r.ru)),
                imp: imp,
                dc: mean(members.iter().map(|r| r.dc.map(|v| v as f64))),
                t: mean(members.iter().map(|r| r.t)),
                pre: mean(members.iter().map(|r| r.pre.map(|v| v as f64))),
                count: members.iter().filter(|r| r.out == outcome).count(),
            }
        })
        .collect::<Vec<_>>();
    summary
}

/// The standard summary of a partition: rows are grouped per dataset plus
/// `ALL_GROUP`, then lower bounds stand in for missing optima and time is
/// converted to seconds. `imp` only counts runs that beat a known optimum.
pub fn metric_means(
    rows: Vec<Observation>,
    outcome: Outcome,
    datasets: &BTreeMap<char, String>,
    order: &StrategyOrder,
) -> Result<Vec<SummaryRow>> {
    let grouped = with_groups(rows, datasets)?
        .into_iter()
        .map(|mut g| {
            g.row = in_seconds(with_bound(g.row, Bound::Lower));
            g
        })
        .collect::<Vec<_>>();
    let summary = summarize(&grouped, outcome, order);
    debug!("{} summary cells for {}", summary.len(), outcome);
    Ok(summary)
}

/// Mean search speed (decisions per second of solver time) per strategy.
/// Rows without a positive time or without a decision count are skipped.
pub fn nodes_per_second(rows: &[Observation], order: &StrategyOrder) -> Vec<(String, f64)> {
    let mut rates: BTreeMap<(usize, String), Vec<f64>> = BTreeMap::new();
    for row in rows {
        if let (Some(t), Some(dc)) = (row.t, row.dc) {
            if t > 0.0 {
                rates
                    .entry((order.rank(&row.strt), row.strt.clone()))
                    .or_insert_with(Vec::new)
                    .push(dc as f64 / (t / 1000.0));
            }
        }
    }
    rates
        .into_iter()
        .filter_map(|((_, strt), r)| mean(r.into_iter().map(Some)).map(|m| (strt, m)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observation::tests::row;

    fn bounded(ins: &str, strt: &str, mk: i64, lb: i64, out: Outcome) -> Observation {
        let mut r = row(ins, strt, mk, out);
        r.lb = Some(lb);
        r.ub = Some(lb + 5);
        r
    }

    #[test]
    fn bounds_replace_optimum() {
        let rows = vec![bounded("J30_1_1", "vslw", 48, 50, Outcome::Sat)];
        let lower = include_bounds(rows.clone(), Bound::Lower);
        assert_eq!(lower[0].opt, Some(50));
        assert!((lower[0].dev.unwrap() - 4.0).abs() < 1e-9);
        let upper = include_bounds(rows, Bound::Upper);
        assert_eq!(upper[0].opt, Some(55));
    }

    #[test]
    fn groups_from_instance_id() {
        let datasets = default_datasets();
        assert_eq!(dataset_of("J30_7_1", &datasets).unwrap(), "J30");
        assert_eq!(dataset_of("J120_1_1", &datasets).unwrap(), "J120");
        assert!(dataset_of("J40_1_1", &datasets).is_err());
        assert!(dataset_of("J", &datasets).is_err());

        let rows = vec![row("J60_1_1", "vslw", 1, Outcome::Opt), row("J90_1_1", "vslw", 1, Outcome::Opt)];
        let grouped = with_groups(rows, &datasets).unwrap();
        let groups = grouped.iter().map(|g| g.group.as_str()).collect::<Vec<_>>();
        assert_eq!(groups, vec!["J60", "J90", "all", "all"]);
    }

    #[test]
    fn matching_needs_three_rows() {
        let rows = vec![
            row("A", "default", 1, Outcome::Opt),
            row("A", "grdlw", 1, Outcome::Opt),
            row("A", "vslw", 1, Outcome::Opt),
            row("B", "default", 1, Outcome::Opt),
            row("B", "grdlw", 1, Outcome::Opt),
            row("B", "vslw", 1, Outcome::Sat),
        ];
        let kept = keep_matching(rows);
        assert_eq!(kept.len(), 3);
        assert!(kept.iter().all(|r| r.ins == "A"));
    }

    #[test]
    fn summary_cells() {
        let mut slow = bounded("J30_1_1", "vslw", 48, 50, Outcome::Opt);
        slow.t = Some(3000.0);
        slow.dc = Some(30);
        let mut better = bounded("J30_1_2", "vslw", 49, 50, Outcome::Opt);
        better.ub = Some(50);
        better.opt = Some(50);
        better.dev = better.signed_dev();
        let rows = vec![
            slow,
            better,
            bounded("J30_1_1", "default", 52, 50, Outcome::Sat),
            bounded("J120_1_1", "default", 100, 100, Outcome::Opt),
        ];
        let summary = metric_means(rows, Outcome::Opt, &default_datasets(), &StrategyOrder::default()).unwrap();
        let keys = summary
            .iter()
            .map(|s| (s.group.as_str(), s.strt.as_str()))
            .collect::<Vec<_>>();
        assert_eq!(
            keys,
            vec![
                ("J120", "default"),
                ("J30", "default"),
                ("J30", "vslw"),
                ("all", "default"),
                ("all", "vslw"),
            ]
        );

        let j30_vslw = &summary[2];
        assert!((j30_vslw.dev.unwrap() - 3.0).abs() < 1e-9);
        assert_eq!(j30_vslw.imp, 1);
        assert_eq!(j30_vslw.count, 2);
        assert!((j30_vslw.t.unwrap() - 2.0).abs() < 1e-9);
        assert!((j30_vslw.dc.unwrap() - 20.0).abs() < 1e-9);

        let all_default = &summary[3];
        assert_eq!(all_default.count, 1);
        assert_eq!(all_default.imp, 0);
    }

    #[test]
    fn improvement_needs_known_optimum() {
        // mk below the lower bound, but the optimum is unknown
        let rows = vec![bounded("J30_1_1", "vslw", 48, 50, Outcome::Sat)];
        let summary = metric_means(rows, Outcome::Sat, &default_datasets(), &StrategyOrder::default()).unwrap();
        assert_eq!(summary.len(), 2);
        assert!(summary.iter().all(|s| s.imp == 0));
        assert!((summary[0].dev.unwrap() - 4.0).abs() < 1e-9);
    }

    #[test]
    fn mean_skips_missing() {
        assert_eq!(mean(vec![None, None]), None);
        assert_eq!(mean(vec![Some(1.0), None, Some(3.0)]), Some(2.0));
    }

    #[test]
    fn search_speed() {
        let mut fast = row("A", "vslw", 1, Outcome::Opt);
        fast.t = Some(500.0);
        fast.dc = Some(100);
        let mut idle = row("B", "vslw", 1, Outcome::Opt);
        idle.t = Some(0.0);
        let rows = vec![fast, idle, row("A", "default", 1, Outcome::Opt)];
        let speeds = nodes_per_second(&rows, &StrategyOrder::default());
        assert_eq!(speeds, vec![("default".to_string(), 10.0), ("vslw".to_string(), 200.0)]);
    }
}
