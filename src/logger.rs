//! Timestamped logging for the binaries.

use crate::errors::Error;
use error_chain::ChainedError;
use log::LevelFilter;
use std::env;
use std::io::Write;

/// Installs a logger that prefixes every record with a UTC timestamp. The
/// default level is `info`; `RUST_LOG` overrides it.
pub fn init() {
    let mut builder = env_logger::Builder::new();
    builder.format(|buf, record| {
        let t = chrono::Utc::now();
        writeln!(
            buf,
            "{} {:5} {}",
            t.format("%Y-%m-%d %H:%M:%S%.3f"),
            record.level(),
            record.args()
        )
    });
    builder.filter_level(LevelFilter::Info);
    if let Ok(filters) = env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    if builder.try_init().is_err() {
        warn!("logger already initialized");
    }
}

/// Logs an error together with its causes.
pub fn report(err: &Error) {
    error!("{}", err.display_chain().to_string().trim_end());
}
