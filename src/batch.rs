use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::catalog::{Catalog, QuestionGroup};
use crate::chart::{ImageFormat, Renderer, render_bar};
use crate::data::filter::retain_matching;
use crate::data::loader::{LoadOptions, load_file};
use crate::data::model::SurveyDataset;
use crate::output::OutputLayout;
use crate::stats::aggregate_question;

// ---------------------------------------------------------------------------
// Run configuration
// ---------------------------------------------------------------------------

/// Everything one batch run needs to know.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub data: PathBuf,
    pub out: PathBuf,
    pub format: ImageFormat,
    pub year_column: String,
    pub country_column: String,
    /// Keep only this country's respondents; `None` charts every row.
    pub country: Option<String>,
    pub catalog: Catalog,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            data: PathBuf::from("us_time_series.csv"),
            out: PathBuf::from("figs"),
            format: ImageFormat::default(),
            year_column: "S020".to_string(),
            country_column: "COUNTRY_ALPHA".to_string(),
            country: None,
            catalog: Catalog::default(),
        }
    }
}

/// What a run produced.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct BatchSummary {
    pub respondents: usize,
    pub groups: usize,
    pub series_files: Vec<PathBuf>,
    pub bar_files: Vec<PathBuf>,
    /// Labels of questions with no in-domain answer in any year.
    pub empty_questions: Vec<String>,
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

/// Load the dataset named in `config` and chart every question group.
pub fn run(config: &RunConfig) -> Result<BatchSummary> {
    let mut columns = config.catalog.columns();
    columns.insert(config.year_column.clone());
    if config.country.is_some() {
        columns.insert(config.country_column.clone());
    }
    let mut dataset = load_file(&config.data, &LoadOptions::project(columns))?;

    if let Some(country) = &config.country {
        let kept = retain_matching(&mut dataset, &config.country_column, country);
        log::info!("Kept {kept} respondents where {} = {country}", config.country_column);
    }

    run_on(&dataset, config)
}

/// Chart every question group of `config.catalog` from an already loaded
/// dataset. Each group is processed exactly once.
pub fn run_on(dataset: &SurveyDataset, config: &RunConfig) -> Result<BatchSummary> {
    config.catalog.validate().context("invalid question catalog")?;
    config.format.ensure_available()?;

    if dataset.is_empty() {
        log::warn!("No respondents to chart; every score will be missing");
    }
    let years = dataset.distinct(&config.year_column);
    log::info!(
        "{} respondents across {} survey years, {} questions",
        dataset.len(),
        years.len(),
        config.catalog.question_count()
    );

    let layout = OutputLayout::new(&config.out, config.format);
    layout.prepare()?;

    let mut renderer = Renderer::new(config.format);
    let mut summary = BatchSummary {
        respondents: dataset.len(),
        ..Default::default()
    };

    for group in &config.catalog.groups {
        log::info!(
            "Charting group '{}' ({} questions)",
            group.name,
            group.questions.len()
        );
        chart_group(dataset, config, group, &layout, &mut renderer, &mut summary)
            .with_context(|| format!("charting question group '{}'", group.name))?;
        summary.groups += 1;
    }

    log::info!(
        "Wrote {} series and {} bar charts under {}",
        summary.series_files.len(),
        summary.bar_files.len(),
        layout.root().display()
    );
    Ok(summary)
}

fn chart_group(
    dataset: &SurveyDataset,
    config: &RunConfig,
    group: &QuestionGroup,
    layout: &OutputLayout,
    renderer: &mut Renderer,
    summary: &mut BatchSummary,
) -> Result<()> {
    let specs = group.specs();

    // Series overlay: one line per question.
    renderer.clear_series();
    renderer.set_series_title(&group.title);
    for spec in &specs {
        let series = aggregate_question(dataset, &config.year_column, spec)?;
        let scored = series.values().filter(|agg| agg.has_data()).count();
        if scored == 0 {
            log::warn!("{} ({}): no usable answers in any year", spec.label, spec.code);
            summary.empty_questions.push(spec.label.clone());
        } else {
            log::debug!(
                "{} ({}): {scored}/{} years scored",
                spec.label,
                spec.code,
                series.len()
            );
        }
        renderer.render_series(&series, &spec.label);
    }
    let series_path = layout.series_path(&group.name);
    log::debug!(
        "Saving {} lines to {}",
        renderer.active_series().lines().len(),
        series_path.display()
    );
    renderer.save_series(&series_path)?;
    summary.series_files.push(series_path);

    // Per-question distributions, each on a fresh figure.
    for spec in &specs {
        let series = aggregate_question(dataset, &config.year_column, spec)?;
        let figure = render_bar(&series, &spec.valid_options, &spec.label);
        let bar_path = layout.bar_path(&spec.label);
        renderer.save_bar(&figure, &bar_path)?;
        summary.bar_files.push(bar_path);
    }
    Ok(())
}
