//! This binary reads the benchmark solution files in the `optimals_dir` of a
//! setting and writes their bounds to `optimals.csv`. With `--legacy` it
//! also converts the older per-instance J30 files into `j30_opt.csv`.

use rcpsp_eval::errors::*;
use rcpsp_eval::{bound, logger, Setting};
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

    let records = bound::extract_bounds(&setting.optimals_dir)?;
    let outfile = setting.csv_file("optimals.csv");
    bound::write_bounds(&outfile, &records)?;
    log::info!("wrote {} bounds to {}", records.len(), outfile);

    if opt.legacy {
        let optimals = bound::extract_legacy_optimals(&setting.legacy_optimals_dir)?;
        let outfile = setting.csv_file("j30_opt.csv");
        bound::write_legacy_optimals(&outfile, &optimals)?;
        log::info!("wrote {} legacy optimals to {}", optimals.len(), outfile);
    }
    Ok(())
}

#[derive(StructOpt, Debug)]
#[structopt(name = "extract")]
#[structopt(about = "Extract instance bounds from benchmark solution files.")]
struct Opt {
    /// The setting file.
    #[structopt(short = "s", long = "setting", default_value = "Setting.toml")]
    setting: String,

    /// Also convert the legacy J30 optimal files.
    #[structopt(short = "l", long = "legacy")]
    legacy: bool,
}
