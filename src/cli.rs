use clap::Parser;
use std::path::PathBuf;
use taxofilter::config::FilterConfig;
use taxofilter::error::Result;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// File with one name per line. Reads stdin when omitted or "-".
    #[arg(short, long, value_name = "FILE")]
    pub input_file: Option<PathBuf>,

    /// Path of the TSV report. Defaults to <input>_taxofilter.tsv, or stdout for stdin input.
    #[arg(short, long, value_name = "FILE")]
    pub output_file: Option<PathBuf>,

    /// TOML configuration file.
    #[arg(short, long, value_name = "FILE", env = "TAXOFILTER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Structural checks only; no requests are sent.
    #[arg(long, env = "TAXOFILTER_OFFLINE")]
    pub offline: bool,

    /// Skip partial/fuzzy resolution of unconfirmed names.
    #[arg(long)]
    pub no_partial: bool,

    /// Names checked at once.
    #[arg(long, value_name = "N", default_value_t = 4)]
    pub concurrency: usize,

    /// Entries kept per cached operation; 0 disables caching.
    #[arg(long, value_name = "N", env = "TAXOFILTER_CACHE_CAPACITY")]
    pub cache_capacity: Option<usize>,

    /// Debug logging.
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Config file (or defaults) with command-line flags applied on top.
    pub fn load_config(&self) -> Result<FilterConfig> {
        let mut config = match &self.config {
            Some(path) => FilterConfig::from_file(path)?,
            None => FilterConfig::default(),
        };
        self.apply_overrides(&mut config);
        config.validate()?;
        Ok(config)
    }

    fn apply_overrides(&self, config: &mut FilterConfig) {
        if self.offline {
            config.external_validation = false;
        }
        if self.no_partial {
            config.partial_matching = false;
        }
        if let Some(capacity) = self.cache_capacity {
            config.cache_capacity = capacity;
        }
    }

    /// `None` means stdin.
    pub fn input_path(&self) -> Option<&PathBuf> {
        self.input_file.as_ref().filter(|p| p.as_os_str() != "-")
    }
}
