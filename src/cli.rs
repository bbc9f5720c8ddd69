//! Command-line interface argument parsing.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args as ClapArgs, Parser, Subcommand};

use crate::batch::RunConfig;
use crate::catalog::{Catalog, load_catalog};
use crate::chart::ImageFormat;

/// Survey trends - longitudinal World Values Survey charts for one country
///
/// Without a subcommand, runs the whole chart batch with default settings.
///
/// Examples:
///   survey-trends
///   survey-trends plot --data us_time_series.csv --out figs --format png
///   survey-trends plot --data WVS_TimeSeries.csv --country USA
///   survey-trends extract --source WVS_TimeSeries.csv --dest us_time_series.csv
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run in quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Aggregate every configured question and write the charts
    Plot(PlotArgs),
    /// Write one country's rows of the multi-country export to a new CSV
    Extract(ExtractArgs),
}

#[derive(ClapArgs, Debug, Clone)]
pub struct PlotArgs {
    /// Survey table to read (.csv, .json or .parquet)
    #[arg(short, long, default_value = "us_time_series.csv", value_name = "FILE")]
    pub data: PathBuf,

    /// Output root; charts go to <OUT>/series and <OUT>/bar
    #[arg(short, long, default_value = "figs", value_name = "DIR")]
    pub out: PathBuf,

    /// Chart image format
    #[arg(long, default_value = "svg", value_name = "FORMAT")]
    pub format: ImageFormat,

    /// JSON question catalog replacing the built-in question groups
    #[arg(long, value_name = "FILE")]
    pub catalog: Option<PathBuf>,

    /// Column holding the survey year
    #[arg(long, default_value = "S020", value_name = "COLUMN")]
    pub year_column: String,

    /// Column holding the country code
    #[arg(long, default_value = "COUNTRY_ALPHA", value_name = "COLUMN")]
    pub country_column: String,

    /// Keep only respondents of this country (for multi-country files)
    #[arg(long, value_name = "CODE")]
    pub country: Option<String>,
}

impl Default for PlotArgs {
    fn default() -> Self {
        let defaults = RunConfig::default();
        Self {
            data: defaults.data,
            out: defaults.out,
            format: defaults.format,
            catalog: None,
            year_column: defaults.year_column,
            country_column: defaults.country_column,
            country: None,
        }
    }
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ExtractArgs {
    /// Multi-country survey export
    #[arg(long, default_value = "WVS_TimeSeries_1981_2020_ascii_v2_0.csv", value_name = "FILE")]
    pub source: PathBuf,

    /// Where to write the single-country subset
    #[arg(long, default_value = "us_time_series.csv", value_name = "FILE")]
    pub dest: PathBuf,

    /// Country code to keep
    #[arg(long, default_value = "USA", value_name = "CODE")]
    pub country: String,

    /// Column holding the country code
    #[arg(long, default_value = "COUNTRY_ALPHA", value_name = "COLUMN")]
    pub country_column: String,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }
        match &self.command {
            Some(Command::Plot(plot)) => plot.validate(),
            Some(Command::Extract(extract)) => {
                if extract.source == extract.dest {
                    return Err("--source and --dest must be different files".to_string());
                }
                if extract.country.trim().is_empty() {
                    return Err("--country must not be empty".to_string());
                }
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// Default `env_logger` filter for the chosen verbosity.
    pub fn log_level(&self) -> log::LevelFilter {
        if self.quiet {
            log::LevelFilter::Error
        } else if self.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        }
    }
}

impl PlotArgs {
    fn validate(&self) -> Result<(), String> {
        if self.year_column.trim().is_empty() {
            return Err("--year-column must not be empty".to_string());
        }
        if self.country.as_deref().is_some_and(|c| c.trim().is_empty()) {
            return Err("--country must not be empty".to_string());
        }
        Ok(())
    }

    /// Resolve into a run configuration, reading the catalog file if given.
    pub fn into_config(self) -> anyhow::Result<RunConfig> {
        let catalog = match &self.catalog {
            Some(path) => load_catalog(path)?,
            None => Catalog::default(),
        };
        Ok(RunConfig {
            data: self.data,
            out: self.out,
            format: self.format,
            year_column: self.year_column,
            country_column: self.country_column,
            country: self.country,
            catalog,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subcommand_runs_batch_defaults() {
        let args = Args::try_parse_from(["survey-trends"]).unwrap();
        assert!(args.command.is_none());
        assert!(args.validate().is_ok());
        let config = PlotArgs::default().into_config().unwrap();
        assert_eq!(config.data, PathBuf::from("us_time_series.csv"));
        assert_eq!(config.out, PathBuf::from("figs"));
        assert_eq!(config.year_column, "S020");
        assert_eq!(config.catalog, Catalog::default());
    }

    #[test]
    fn test_plot_flags() {
        let args = Args::try_parse_from([
            "survey-trends",
            "plot",
            "--data",
            "wvs.parquet",
            "--format",
            "png",
            "--country",
            "USA",
        ])
        .unwrap();
        let Some(Command::Plot(plot)) = args.command else {
            panic!("expected plot subcommand");
        };
        assert_eq!(plot.format, ImageFormat::Png);
        assert_eq!(plot.country.as_deref(), Some("USA"));
        assert_eq!(plot.country_column, "COUNTRY_ALPHA");
    }

    #[test]
    fn test_extract_defaults() {
        let args = Args::try_parse_from(["survey-trends", "extract"]).unwrap();
        let Some(Command::Extract(extract)) = &args.command else {
            panic!("expected extract subcommand");
        };
        assert_eq!(extract.country, "USA");
        assert_eq!(extract.dest, PathBuf::from("us_time_series.csv"));
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let args = Args::try_parse_from(["survey-trends", "-v", "-q"]).unwrap();
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_same_source_and_dest() {
        let args = Args::try_parse_from([
            "survey-trends",
            "extract",
            "--source",
            "a.csv",
            "--dest",
            "a.csv",
        ])
        .unwrap();
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_log_level() {
        let mut args = Args::try_parse_from(["survey-trends"]).unwrap();
        assert_eq!(args.log_level(), log::LevelFilter::Info);
        args.verbose = true;
        assert_eq!(args.log_level(), log::LevelFilter::Debug);
        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), log::LevelFilter::Error);
    }

    #[test]
    fn test_unknown_format_rejected() {
        assert!(Args::try_parse_from(["survey-trends", "plot", "--format", "pdf"]).is_err());
    }
}
