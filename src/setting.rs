//! Paths, strategy names and data-quality exceptions of an experiment, kept
//! in TOML.

use crate::errors::*;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// The experiment setting.
#[derive(Deserialize, Debug, Clone)]
pub struct Setting {
    /// Folder with the benchmark solution files (26-line header format).
    pub optimals_dir: String,

    /// Folder with the legacy single-value optimal files.
    pub legacy_optimals_dir: String,

    /// Where CSV tables are read from and written to.
    pub csv_dir: String,

    /// Where rendered LaTeX fragments go.
    pub tex_dir: String,

    /// Where PNG figures go.
    pub figure_dir: String,

    /// TrueType font used for the text in figures.
    #[serde(default = "default_font_file")]
    pub font_file: String,

    /// The batch holding the re-runs of `bad_runs`. It is always parsed
    /// before `batches`.
    pub corrective_batch: String,

    /// The remaining result folders, in concatenation order.
    pub batches: Vec<String>,

    /// Strategy codenames in display order.
    pub strategies: Vec<String>,

    /// Instances whose first run is discarded.
    #[serde(default)]
    pub bad_runs: Vec<String>,

    /// Strategy codename to the name printed in tables and figures.
    #[serde(default)]
    pub strategy_names: BTreeMap<String, String>,

    /// Second character of an instance id to its dataset name.
    #[serde(default = "crate::summary::default_datasets")]
    pub datasets: BTreeMap<char, String>,
}

fn default_font_file() -> String {
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf".to_string()
}

impl Setting {
    /// Initialize from a file.
    pub fn init<P: AsRef<Path>>(path: P) -> Result<Setting> {
        let mut file = File::open(path.as_ref())
            .chain_err(|| format!("no setting file {:?}", path.as_ref()))?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;
        Setting::parse(&contents)
    }

    /// Parses a setting from TOML text.
    pub fn parse(contents: &str) -> Result<Setting> {
        Ok(toml::from_str(contents)?)
    }

    /// Joins a file name onto the CSV folder.
    pub fn csv_file(&self, name: &str) -> String {
        format!("{}/{}", self.csv_dir, name)
    }

    /// Display name of a strategy; the codename itself if unmapped.
    pub fn display_name<'a>(&'a self, strategy: &'a str) -> &'a str {
        self.strategy_names
            .get(strategy)
            .map(|s| s.as_str())
            .unwrap_or(strategy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SETTING: &str = r#"
optimals_dir = "optimals"
legacy_optimals_dir = "online"
csv_dir = "csvs"
tex_dir = "tex"
figure_dir = "figures"
corrective_batch = "db_runs/db_reruns"
batches = ["db_runs/db_vslw", "db_runs/db_default"]
strategies = ["default", "grdlw", "vslw"]
bad_runs = ["J30_7_1.dzn"]

[strategy_names]
default = "VS/SG"

[datasets]
1 = "J120"
3 = "J30"
"#;

    #[test]
    fn parse_setting() {
        let setting = Setting::parse(SETTING).unwrap();
        assert_eq!(setting.batches.len(), 2);
        assert_eq!(setting.bad_runs, vec!["J30_7_1.dzn".to_string()]);
        assert_eq!(setting.datasets.get(&'1').map(|s| s.as_str()), Some("J120"));
        assert_eq!(setting.display_name("default"), "VS/SG");
        assert_eq!(setting.display_name("vslw"), "vslw");
        assert_eq!(setting.csv_file("raw.csv"), "csvs/raw.csv");
        assert!(setting.font_file.ends_with("DejaVuSans.ttf"));
    }

    #[test]
    fn bundled_setting_parses() {
        let path = format!("{}/Setting.toml", env!("CARGO_MANIFEST_DIR"));
        let setting = Setting::init(path).unwrap();
        assert_eq!(setting.strategies, vec!["default", "grdlw", "vslw"]);
        assert_eq!(setting.bad_runs.len(), 19);
    }
}
