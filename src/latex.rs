//! LaTeX tables of summary statistics.
//!
//! `LatexTable::render` lays the summary out as a two-level (group,
//! strategy) table with booktabs rules. `post_process` then adapts it to the
//! document's own environments (`tabe`, `tabi`), swaps strategy codenames for
//! display names and moves the J120 block behind the smaller datasets.

use crate::errors::*;
use crate::summary::SummaryRow;
use regex::Regex;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

const COLUMNS: [&str; 7] = ["dev", "ru", "imp", "dc", "t", "pre", "count"];

/// Table-level options.
#[derive(Debug, Clone, Default)]
pub struct LatexTable {
    /// `\caption{..}`; omitted when empty.
    pub caption: String,
    /// `\label{..}`; omitted when empty.
    pub label: String,
    /// Column format of the tabular environment.
    pub column_format: String,
}

fn float_cell(v: Option<f64>) -> String {
    match v {
        Some(v) if !v.is_nan() => format!("{:.2}", v),
        _ => "NaN".to_string(),
    }
}

fn int_cell(v: Option<f64>) -> String {
    match v {
        Some(v) if v.is_finite() => format!("{}", v.trunc() as i64),
        _ => "NaN".to_string(),
    }
}

impl LatexTable {
    /// Creates a table with the given column format.
    pub fn new(column_format: &str) -> Self {
        LatexTable {
            column_format: column_format.to_string(),
            ..Default::default()
        }
    }

    /// Sets the caption.
    pub fn caption(mut self, caption: &str) -> Self {
        self.caption = caption.to_string();
        self
    }

    /// Sets the label.
    pub fn label(mut self, label: &str) -> Self {
        self.label = label.to_string();
        self
    }

    /// Renders the rows, which must be ordered by group.
    pub fn render(&self, rows: &[SummaryRow]) -> String {
        let ncols = COLUMNS.len() + 2;
        let floating = !self.caption.is_empty() || !self.label.is_empty();
        let mut out = String::new();

        if floating {
            out.push_str("\\begin{table}\n");
            if !self.caption.is_empty() {
                out.push_str(&format!("\\caption{{{}}}\n", self.caption));
            }
            if !self.label.is_empty() {
                out.push_str(&format!("\\label{{{}}}\n", self.label));
            }
        }
        out.push_str(&format!("\\begin{{tabular}}{{{}}}\n", self.column_format));
        out.push_str("\\toprule\n");
        out.push_str(&format!(" &  & {} \\\\\n", COLUMNS.join(" & ")));
        out.push_str(&format!("group & strt & {} \\\\\n", vec![""; COLUMNS.len()].join(" & ")));
        out.push_str("\\midrule\n");

        let mut start = 0;
        while start < rows.len() {
            let group = &rows[start].group;
            let end = rows[start..]
                .iter()
                .position(|r| &r.group != group)
                .map_or(rows.len(), |n| start + n);

            for (i, row) in rows[start..end].iter().enumerate() {
                let lead = if i == 0 {
                    format!("\\multirow[t]{{{}}}{{*}}{{{}}}", end - start, group)
                } else {
                    String::new()
                };
                let cells = vec![
                    float_cell(row.dev),
                    float_cell(row.ru),
                    row.imp.to_string(),
                    int_cell(row.dc),
                    float_cell(row.t),
                    int_cell(row.pre),
                    row.count.to_string(),
                ];
                out.push_str(&format!("{} & {} & {} \\\\\n", lead, row.strt, cells.join(" & ")));
            }
            out.push_str(&format!("\\cline{{1-{}}}\n", ncols));
            start = end;
        }

        out.push_str("\\bottomrule\n");
        out.push_str("\\end{tabular}\n");
        if floating {
            out.push_str("\\end{table}\n");
        }
        out
    }
}

/// Rewrites a rendered table for the thesis template.
pub fn post_process(latex: &str, strategy_names: &BTreeMap<String, String>) -> Result<String> {
    let mut latex = latex
        .replace("table", "tabe")
        .replace("\\begin{tabular}", "\\begin{tabi}[.45]")
        .replace("tabular", "tabi")
        .replace("cline", "cmidrule")
        .replace("[t]", "[c]");
    for (codename, name) in strategy_names {
        latex = latex.replace(codename.as_str(), name);
    }
    let latex = latex.replace("all", "All");

    // J120 block (row with the group cell, two more rows, rule) goes after
    // the three blocks that follow it
    let reorder = Regex::new(r"(.*J120(?:.*\n){4})((?:.*\n){12})")?;
    let latex = reorder.replace(&latex, "${2}${1}").into_owned();

    let last_rule = Regex::new(r" *\\cmidrule\{.*\}\n(.*\\bottomrule)")?;
    let latex = last_rule.replace(&latex, "${1}").into_owned();

    Ok(indent(&latex))
}

/// Indents every `\begin`..`\end` level by four spaces.
pub fn indent(latex: &str) -> String {
    let mut indented = String::new();
    let mut level: usize = 4;
    for line in latex.split('\n') {
        if line.contains("\\end") {
            level = level.saturating_sub(4);
        }
        indented.push_str(&" ".repeat(level));
        indented.push_str(line);
        indented.push('\n');
        if line.contains("\\begin") {
            level += 4;
        }
    }
    indented
}

/// Renders, post-processes and writes `<dir>/<name>.tex`.
pub fn write_latex<P: AsRef<Path>>(
    dir: P,
    name: &str,
    rows: &[SummaryRow],
    table: &LatexTable,
    strategy_names: &BTreeMap<String, String>,
) -> Result<()> {
    fs::create_dir_all(dir.as_ref())?;
    let path = dir.as_ref().join(format!("{}.tex", name));
    let latex = post_process(&table.render(rows), strategy_names)?;
    let mut file = File::create(&path)?;
    file.write_all(latex.as_bytes())?;
    info!("wrote {:?}", path);
    Ok(())
}
