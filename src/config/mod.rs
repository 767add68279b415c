pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
use clap::{Parser, ValueEnum};
#[cfg(feature = "cli")]
use toml_config::TomlConfig;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum IndicatorSelection {
    All,
    Salary,
    Currency,
    Unemployment,
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "indicator-etl")]
#[command(about = "Scrapes regional salary, exchange rate and unemployment series")]
pub struct CliArgs {
    /// Path to a TOML configuration file; built-in defaults are used without one
    #[arg(short, long)]
    pub config: Option<String>,

    /// Which indicators to extract
    #[arg(long, value_enum, default_value = "all")]
    pub indicator: IndicatorSelection,

    /// Re-scrape a single year of salary and currency data
    #[arg(long)]
    pub year: Option<i32>,

    /// Override load.output_path from the config
    #[arg(long)]
    pub output_path: Option<String>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, value_enum, default_value = "text")]
    pub log_format: LogFormat,

    /// Print the URLs that would be fetched and exit
    #[arg(long)]
    pub dry_run: bool,
}

#[cfg(feature = "cli")]
impl CliArgs {
    /// 應用命令列覆蓋設定
    pub fn apply_to(&self, config: &mut TomlConfig) {
        match self.indicator {
            IndicatorSelection::All => {}
            selected => {
                config.salary.enabled = selected == IndicatorSelection::Salary;
                config.currency.enabled = selected == IndicatorSelection::Currency;
                config.unemployment.enabled = selected == IndicatorSelection::Unemployment;
            }
        }

        if let Some(year) = self.year {
            config.restrict_to_year(year);
        }

        if let Some(path) = &self.output_path {
            config.load.output_path = path.clone();
        }
    }
}
