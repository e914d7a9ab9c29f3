//! Stacked, log-scaled histograms of run metrics per strategy.

use crate::errors::*;
use crate::observation::Observation;
use crate::setting::Setting;
use crate::summary::{as_seconds, with_groups};
use plotters::prelude::*;
use std::collections::BTreeMap;
use std::fmt::Display;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Bins per histogram.
pub const BINS: usize = 30;

/// A numeric column of an observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    /// Solver time.
    Time,
    /// Decision count.
    Decisions,
    /// Makespan.
    Makespan,
    /// Resource utilization.
    Utilization,
    /// Secondary metric.
    Pre,
}

impl Metric {
    /// The value of this column in `row`.
    pub fn value(&self, row: &Observation) -> Option<f64> {
        match *self {
            Metric::Time => row.t,
            Metric::Decisions => row.dc.map(|v| v as f64),
            Metric::Makespan => row.mk.map(|v| v as f64),
            Metric::Utilization => row.ru,
            Metric::Pre => row.pre.map(|v| v as f64),
        }
    }

    /// Column name as used in the CSV tables.
    pub fn column(&self) -> &'static str {
        match *self {
            Metric::Time => "t",
            Metric::Decisions => "dc",
            Metric::Makespan => "mk",
            Metric::Utilization => "ru",
            Metric::Pre => "pre",
        }
    }
}

impl FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> ::std::result::Result<Metric, String> {
        match s {
            "t" => Ok(Metric::Time),
            "dc" => Ok(Metric::Decisions),
            "mk" => Ok(Metric::Makespan),
            "ru" => Ok(Metric::Utilization),
            "pre" => Ok(Metric::Pre),
            other => Err(format!("unknown metric {:?}", other)),
        }
    }
}

/// Bin edges and per-layer counts of a stacked histogram.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    /// `BINS + 1` edges, evenly spaced in log10.
    pub edges: Vec<f64>,
    /// One layer per label, bottom first.
    pub layers: Vec<(String, Vec<u32>)>,
}

impl Histogram {
    /// Height of the tallest stack.
    pub fn max_height(&self) -> u32 {
        (0..self.edges.len() - 1)
            .map(|b| self.layers.iter().map(|(_, c)| c[b]).sum::<u32>())
            .max()
            .unwrap_or(0)
    }
}

/// Bins labelled samples on a log10 scale. Layers follow `labels`; labels
/// not listed are appended in order of appearance. Non-positive samples
/// cannot be placed on a log axis and are dropped. Returns `None` if nothing
/// is left.
pub fn log_histogram(samples: &[(String, f64)], bins: usize, labels: &[String]) -> Option<Histogram> {
    let logs = samples
        .iter()
        .filter(|(_, v)| *v > 0.0 && v.is_finite())
        .map(|(l, v)| (l.as_str(), v.log10()))
        .collect::<Vec<_>>();
    if logs.is_empty() || bins == 0 {
        return None;
    }

    let mut lo = logs.iter().map(|s| s.1).fold(f64::INFINITY, f64::min);
    let mut hi = logs.iter().map(|s| s.1).fold(f64::NEG_INFINITY, f64::max);
    if hi - lo < 1e-12 {
        lo -= 0.5;
        hi += 0.5;
    }
    let width = (hi - lo) / bins as f64;
    let edges = (0..=bins).map(|i| 10f64.powf(lo + width * i as f64)).collect();

    let mut order = labels.to_vec();
    for (label, _) in &logs {
        if !order.iter().any(|l| l == label) {
            order.push(label.to_string());
        }
    }
    let mut layers = order
        .into_iter()
        .map(|l| (l, vec![0u32; bins]))
        .collect::<Vec<_>>();
    for (label, v) in logs {
        let bin = (((v - lo) / width) as usize).min(bins - 1);
        if let Some(layer) = layers.iter_mut().find(|(l, _)| l == label) {
            layer.1[bin] += 1;
        }
    }
    layers.retain(|(_, counts)| counts.iter().any(|&c| c > 0));

    Some(Histogram {
        edges: edges,
        layers: layers,
    })
}

fn plot_err<E: Display>(err: E) -> Error {
    ErrorKind::Plot(err.to_string()).into()
}

/// Registers the TrueType font that axis text and legends are drawn with.
/// Must be called before drawing.
pub fn load_font<P: AsRef<Path>>(path: P) -> Result<()> {
    let path = path.as_ref();
    let bytes = fs::read(path).chain_err(|| format!("no font file {:?}", path))?;
    let bytes: &'static [u8] = Box::leak(bytes.into_boxed_slice());
    plotters::style::register_font("sans-serif", plotters::style::FontStyle::Normal, bytes)
        .map_err(|_| ErrorKind::Plot(format!("invalid font file {:?}", path)))?;
    debug!("registered font {:?}", path);
    Ok(())
}

/// Draws a stacked histogram into a PNG file.
pub fn draw_histogram<P: AsRef<Path>>(hist: &Histogram, path: P, x_desc: &str, y_desc: &str) -> Result<()> {
    let lo = hist.edges[0];
    let hi = hist.edges[hist.edges.len() - 1];
    let top = hist.max_height() + 1;

    let root = BitMapBackend::new(path.as_ref(), (1200, 800)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;
    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d((lo..hi).log_scale(), 0u32..top)
        .map_err(plot_err)?;
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc(x_desc)
        .y_desc(y_desc)
        .draw()
        .map_err(plot_err)?;

    let bins = hist.edges.len() - 1;
    let mut base = vec![0u32; bins];
    for (i, (label, counts)) in hist.layers.iter().enumerate() {
        let color = Palette99::pick(i).to_rgba();
        let bars = (0..bins)
            .map(|b| {
                let bottom = base[b];
                Rectangle::new(
                    [(hist.edges[b], bottom), (hist.edges[b + 1], bottom + counts[b])],
                    color.filled(),
                )
            })
            .collect::<Vec<_>>();
        for b in 0..bins {
            base[b] += counts[b];
        }
        chart
            .draw_series(bars)
            .map_err(plot_err)?
            .label(label.as_str())
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
    }

    chart
        .configure_series_labels()
        .background_style(&WHITE)
        .border_style(&BLACK)
        .draw()
        .map_err(plot_err)?;
    root.present().map_err(plot_err)?;
    info!("wrote {:?}", path.as_ref());
    Ok(())
}

fn display_labels(setting: &Setting) -> Vec<String> {
    setting
        .strategies
        .iter()
        .map(|s| setting.display_name(s).to_string())
        .collect()
}

fn samples(rows: &[Observation], metric: Metric, setting: &Setting) -> Vec<(String, f64)> {
    rows.iter()
        .filter_map(|r| metric.value(r).map(|v| (setting.display_name(&r.strt).to_string(), v)))
        .collect()
}

fn histogram_file(setting: &Setting, rows: &[Observation], metric: Metric, file: &str, y_desc: &str) -> Result<()> {
    let x_desc = match metric {
        Metric::Time => "Seconds spent in solver (log10)".to_string(),
        other => format!("{} (log10)", other.column()),
    };
    match log_histogram(&samples(rows, metric, setting), BINS, &display_labels(setting)) {
        Some(hist) => {
            fs::create_dir_all(&setting.figure_dir)?;
            let path = Path::new(&setting.figure_dir).join(file);
            draw_histogram(&hist, path, &x_desc, y_desc)
        }
        None => {
            warn!("nothing to plot for {}", file);
            Ok(())
        }
    }
}

/// The first (lowest) value of `metric` per (strategy, instance); rows
/// without a value are dropped.
pub fn first_per_instance(rows: &[Observation], metric: Metric) -> Vec<Observation> {
    let mut first: BTreeMap<(String, String), (f64, &Observation)> = BTreeMap::new();
    for row in rows {
        if let Some(v) = metric.value(row) {
            let key = (row.strt.clone(), row.ins.clone());
            let replace = first.get(&key).map_or(true, |(best, _)| v < *best);
            if replace {
                first.insert(key, (v, row));
            }
        }
    }
    first.into_iter().map(|(_, (_, row))| row.clone()).collect()
}

/// How long it took each strategy to prove optimality (`opt.csv` rows).
pub fn plot_opt_progress(rows: Vec<Observation>, metric: Metric, setting: &Setting) -> Result<()> {
    let rows = as_seconds(rows);
    histogram_file(
        setting,
        &rows,
        metric,
        &format!("opt_runtime_{}.png", metric.column()),
        "Optimal solutions found",
    )
}

/// How long it took each strategy to find a first solution (`raw.csv`
/// rows).
pub fn plot_sat_progress(rows: Vec<Observation>, metric: Metric, setting: &Setting) -> Result<()> {
    let rows = first_per_instance(&as_seconds(rows), metric);
    histogram_file(
        setting,
        &rows,
        metric,
        &format!("sat_runtime_{}.png", metric.column()),
        "First satisfiable assignment found",
    )
}

/// Decision-count histograms of `opt.csv` rows, one per dataset group.
pub fn plot_opt_separately(rows: Vec<Observation>, setting: &Setting) -> Result<()> {
    plot_per_group(rows, setting, "opt", "Optimal solutions found")
}

/// Decision-count histograms of the first solutions in `raw.csv`, one per
/// dataset group.
pub fn plot_sat_separately(rows: Vec<Observation>, setting: &Setting) -> Result<()> {
    let rows = first_per_instance(&rows, Metric::Decisions);
    plot_per_group(rows, setting, "sat", "First satisfiable assignment found")
}

fn plot_per_group(rows: Vec<Observation>, setting: &Setting, prefix: &str, y_desc: &str) -> Result<()> {
    let mut groups: BTreeMap<String, Vec<Observation>> = BTreeMap::new();
    for g in with_groups(rows, &setting.datasets)? {
        groups.entry(g.group).or_insert_with(Vec::new).push(g.row);
    }
    for (group, rows) in groups {
        let file = format!("{}_dc_{}.png", prefix, group);
        histogram_file(setting, &rows, Metric::Decisions, &file, y_desc)?;
    }
    Ok(())
}
