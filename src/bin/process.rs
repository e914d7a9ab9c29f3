//! This binary parses the solver logs of every result folder named in the
//! setting and writes four tables to the CSV folder: every reported solution
//! (`raw.csv`), the best solutions per instance and strategy
//! (`aggregates.csv`) and the latter split into proven optimal (`opt.csv`)
//! and merely satisfiable (`sat.csv`) runs.

use log::info;
use rcpsp_eval::aggregate::{load_legacy_batch, StrategyOrder};
use rcpsp_eval::errors::*;
use rcpsp_eval::*;
use std::fs;
use structopt::StructOpt;

fn main() {
    logger::init();
    let opt = Opt::from_args();
    if let Err(e) = run(&opt) {
        logger::report(&e);
        ::std::process::exit(1);
    }
}

fn run(opt: &Opt) -> Result<()> {
    let setting = Setting::init(&opt.setting)?;
    fs::create_dir_all(&setting.csv_dir)?;
    let bounds = load_bounds(setting.csv_file("optimals.csv"))?;
    info!("loaded {} bounds", bounds.len());

    if let Some(ref dir) = opt.legacy {
        let rows = load_legacy_batch(dir, &bounds)?;
        let outfile = setting.csv_file("legacy.csv");
        write_rows(&outfile, &rows)?;
        info!("wrote {} legacy rows to {}", rows.len(), outfile);
        return Ok(());
    }

    let order = StrategyOrder::new(setting.strategies.iter().cloned());
    let bad_runs = BadRuns::new(&setting.bad_runs);
    let (rows, leftover) = process_batches(
        setting.corrective_batch.as_str(),
        &setting.batches.iter().map(|b| b.as_str()).collect::<Vec<_>>(),
        &bounds,
        bad_runs,
    )?;
    if !leftover.is_empty() {
        info!("{} bad runs were not found in any batch", leftover.len());
    }

    let raw = sort_rows(rows, &order);
    write_rows(setting.csv_file("raw.csv"), &raw)?;

    let aggregates = aggregate(&raw);
    write_rows(setting.csv_file("aggregates.csv"), &aggregates)?;

    let (opt_rows, sat_rows) = separate_sat_opt(aggregates);
    write_rows(setting.csv_file("opt.csv"), &opt_rows)?;
    write_rows(setting.csv_file("sat.csv"), &sat_rows)?;
    info!(
        "{} raw rows, {} optimal, {} satisfiable",
        raw.len(),
        opt_rows.len(),
        sat_rows.len()
    );
    Ok(())
}

#[derive(StructOpt, Debug)]
#[structopt(name = "process")]
#[structopt(about = "Parse solver logs into raw, aggregated, optimal and satisfiable tables.")]
struct Opt {
    /// The setting file.
    #[structopt(short = "s", long = "setting", default_value = "Setting.toml")]
    setting: String,

    /// A result folder in the older log format; when given, only this
    /// folder is converted (to `legacy.csv`).
    #[structopt(short = "l", long = "legacy")]
    legacy: Option<String>,
}
