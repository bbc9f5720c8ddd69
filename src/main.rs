mod batch;
mod catalog;
mod chart;
mod cli;
mod color;
mod data;
mod output;
mod stats;

use std::process::ExitCode;

use anyhow::Result;

use cli::{Args, Command, PlotArgs};

fn main() -> ExitCode {
    let args = Args::parse_args();

    env_logger::Builder::new()
        .filter_level(args.log_level())
        .parse_default_env()
        .init();

    if let Err(msg) = args.validate() {
        log::error!("{msg}");
        return ExitCode::from(2);
    }

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<()> {
    match args.command {
        Some(Command::Extract(extract)) => {
            data::filter::extract_country(
                &extract.source,
                &extract.dest,
                &extract.country_column,
                &extract.country,
            )?;
        }
        Some(Command::Plot(plot)) => plot_batch(plot)?,
        None => plot_batch(PlotArgs::default())?,
    }
    Ok(())
}

fn plot_batch(plot: PlotArgs) -> Result<()> {
    let config = plot.into_config()?;
    let summary = batch::run(&config)?;
    if !summary.empty_questions.is_empty() {
        log::warn!(
            "{} question(s) had no usable answers: {}",
            summary.empty_questions.len(),
            summary.empty_questions.join(", ")
        );
    }
    Ok(())
}
