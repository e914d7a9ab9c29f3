//! This binary summarizes the tables written by `process`: mean metrics per
//! dataset and strategy as LaTeX (`opt_means.tex`, `sat_means.tex`), the
//! search speed of every strategy, and with `--plots` the runtime and
//! decision-count histograms.

use log::info;
use rcpsp_eval::errors::*;
use rcpsp_eval::*;
use std::path::Path;
use structopt::StructOpt;

const COLUMN_FORMAT: &str = "cc llllll";

fn main() {
    logger::init();
    let opt = Opt::from_args();
    if let Err(e) = run(&opt) {
        logger::report(&e);
        ::std::process::exit(1);
    }
}

fn write_summary(setting: &Setting, name: &str, caption: &str, rows: &[SummaryRow]) -> Result<()> {
    let table = LatexTable::new(COLUMN_FORMAT)
        .caption(caption)
        .label(&format!("tab:{}", name));
    write_latex(&setting.tex_dir, name, rows, &table, &setting.strategy_names)?;

    let mut writer = csv::Writer::from_path(Path::new(&setting.csv_dir).join(format!("{}.csv", name)))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

fn run(opt: &Opt) -> Result<()> {
    let setting = Setting::init(&opt.setting)?;
    let order = StrategyOrder::new(setting.strategies.iter().cloned());

    let opt_rows = read_rows(setting.csv_file("opt.csv"))?;
    let sat_rows = read_rows(setting.csv_file("sat.csv"))?;

    let opt_means = metric_means(opt_rows.clone(), Outcome::Opt, &setting.datasets, &order)?;
    write_summary(&setting, "opt_means", "Runs that proved optimality", &opt_means)?;
    let sat_means = metric_means(sat_rows, Outcome::Sat, &setting.datasets, &order)?;
    write_summary(&setting, "sat_means", "Runs that did not prove optimality", &sat_means)?;

    let raw = read_rows(setting.csv_file("raw.csv"))?;
    for (strt, speed) in nodes_per_second(&raw, &order) {
        info!("{}: {:.1} decisions per second", setting.display_name(&strt), speed);
    }

    if opt.plots {
        plot::load_font(&setting.font_file)?;
        plot::plot_opt_progress(opt_rows.clone(), Metric::Time, &setting)?;
        plot::plot_sat_progress(raw.clone(), Metric::Time, &setting)?;
        plot::plot_opt_separately(opt_rows, &setting)?;
        plot::plot_sat_separately(raw, &setting)?;
    }
    Ok(())
}

#[derive(StructOpt, Debug)]
#[structopt(name = "visualize")]
#[structopt(about = "Summarize processed tables as LaTeX and histograms.")]
struct Opt {
    /// The setting file.
    #[structopt(short = "s", long = "setting", default_value = "Setting.toml")]
    setting: String,

    /// Also draw the histograms.
    #[structopt(short = "p", long = "plots")]
    plots: bool,
}
