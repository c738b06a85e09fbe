use crate::infra::{parse_date, read_donors};
use chrono::{Local, NaiveDate};
use clap::Args;
use donor_match::config::{AppConfig, TrainingConfig};
use donor_match::error::AppError;
use donor_match::matching::dataset::{
    read_dataset_path, read_requests_json_path, write_dataset_path,
};
use donor_match::matching::{
    build, build_partitioned, load_model, rank_donors, save_model, train_examples,
    InferenceError, InferenceGateway, LabeledExample, MatchModel, OrganRequest,
};
use donor_match::telemetry;
use serde_json::{json, Value};
use std::fs::File;
use std::io::BufReader;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

pub(crate) const DEFAULT_DATASET_PATH: &str = "donor_match_dataset.csv";

#[derive(Args, Debug)]
pub(crate) struct DatasetBuildArgs {
    /// Donor export (CSV, or JSON when the file ends in .json)
    #[arg(long)]
    pub(crate) donors: PathBuf,
    /// Organ request export (JSON array)
    #[arg(long)]
    pub(crate) requests: PathBuf,
    /// Destination for the labeled dataset CSV
    #[arg(long, default_value = DEFAULT_DATASET_PATH)]
    pub(crate) output: PathBuf,
    /// Split the cross-join across this many worker threads
    #[arg(long)]
    pub(crate) workers: Option<NonZeroUsize>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct TrainingOverrides {
    /// Override the configured classifier seed
    #[arg(long)]
    pub(crate) seed: Option<u64>,
    /// Override the configured forest size
    #[arg(long)]
    pub(crate) trees: Option<usize>,
    /// Override the configured holdout fraction
    #[arg(long)]
    pub(crate) test_ratio: Option<f64>,
    /// Cap tree depth
    #[arg(long)]
    pub(crate) max_depth: Option<usize>,
}

impl TrainingOverrides {
    pub(crate) fn apply(&self, mut config: TrainingConfig) -> Result<TrainingConfig, AppError> {
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(trees) = self.trees {
            config.trees = trees;
        }
        if let Some(test_ratio) = self.test_ratio {
            config.test_ratio = test_ratio;
        }
        if let Some(max_depth) = self.max_depth {
            config.max_depth = Some(max_depth);
        }
        config.validate()?;
        Ok(config)
    }
}

#[derive(Args, Debug)]
pub(crate) struct TrainArgs {
    /// Labeled dataset CSV produced by `dataset build`
    #[arg(long, default_value = DEFAULT_DATASET_PATH)]
    pub(crate) dataset: PathBuf,
    /// Destination for the model artifact (defaults to APP_MODEL_PATH)
    #[arg(long)]
    pub(crate) model: Option<PathBuf>,
    #[command(flatten)]
    pub(crate) overrides: TrainingOverrides,
}

#[derive(Args, Debug)]
pub(crate) struct PredictArgs {
    /// JSON payload: `{donor, request}` or the six feature fields
    #[arg(long)]
    pub(crate) payload: PathBuf,
    /// Model artifact to score with (defaults to APP_MODEL_PATH)
    #[arg(long)]
    pub(crate) model: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub(crate) struct RankArgs {
    /// Single organ request (JSON object)
    #[arg(long)]
    pub(crate) request: PathBuf,
    /// Donor pool export (CSV, or JSON when the file ends in .json)
    #[arg(long)]
    pub(crate) donors: PathBuf,
    /// Model artifact to score with (defaults to APP_MODEL_PATH)
    #[arg(long)]
    pub(crate) model: Option<PathBuf>,
    /// Reference date for the blood donation cooldown (defaults to today)
    #[arg(long, value_parser = parse_date)]
    pub(crate) today: Option<NaiveDate>,
}

fn prepare() -> Result<AppConfig, AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;
    Ok(config)
}

pub(crate) fn build_dataset(args: DatasetBuildArgs) -> Result<(), AppError> {
    prepare()?;
    let examples = build_dataset_file(&args)?;
    let positives = examples.iter().filter(|example| example.label == 1).count();
    println!(
        "Wrote {} labeled rows ({} positive) to {}",
        examples.len(),
        positives,
        args.output.display()
    );
    Ok(())
}

pub(crate) fn build_dataset_file(
    args: &DatasetBuildArgs,
) -> Result<Vec<LabeledExample>, AppError> {
    let donors = read_donors(&args.donors)?;
    let requests = read_requests_json_path(&args.requests)?;

    let examples = match args.workers {
        Some(workers) => build_partitioned(&donors, &requests, workers),
        None => build(&donors, &requests),
    };
    write_dataset_path(&args.output, &examples)?;
    Ok(examples)
}

pub(crate) fn train(args: TrainArgs) -> Result<(), AppError> {
    let config = prepare()?;
    let training = args.overrides.apply(config.training.clone())?;
    let model_path = args.model.unwrap_or(config.model.path);

    let model = train_model_file(&args.dataset, &model_path, &training)?;
    match model.holdout() {
        Some(report) => println!(
            "Holdout evaluation (accuracy {:.3})\n{report}",
            report.accuracy
        ),
        None => println!("Holdout evaluation skipped: too few rows"),
    }
    println!("Saved model to {}", model_path.display());
    Ok(())
}

pub(crate) fn train_model_file(
    dataset: &Path,
    model_path: &Path,
    training: &TrainingConfig,
) -> Result<MatchModel, AppError> {
    let examples = read_dataset_path(dataset)?;
    let model = train_examples(&examples, training)?;
    save_model(&model, model_path)?;
    info!(path = %model_path.display(), trees = training.trees, "model artifact written");
    Ok(model)
}

pub(crate) fn predict(args: PredictArgs) -> Result<(), AppError> {
    let config = prepare()?;
    let gateway = strict_gateway(&args.model.unwrap_or(config.model.path))?;
    let payload: Value = read_json_file(&args.payload)?;

    let prediction = gateway.predict_payload(payload)?;
    println!("{}", json!(prediction));
    Ok(())
}

pub(crate) fn rank(args: RankArgs) -> Result<(), AppError> {
    let config = prepare()?;
    let gateway = strict_gateway(&args.model.unwrap_or(config.model.path))?;
    let request: OrganRequest = read_json_file(&args.request)?;
    let donors = read_donors(&args.donors)?;
    let today = args.today.unwrap_or_else(|| Local::now().date_naive());

    let ranked = rank_donors(&gateway, &request, &donors, today)?;
    println!("{:#}", json!({ "matchedDonors": ranked }));
    Ok(())
}

/// One-shot commands fail fast instead of running unloaded.
fn strict_gateway(path: &Path) -> Result<InferenceGateway, AppError> {
    let model = load_model(path)?;
    Ok(InferenceGateway::new(Arc::new(model)))
}

fn read_json_file<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, AppError> {
    let reader = BufReader::new(File::open(path)?);
    serde_json::from_reader(reader).map_err(|err| {
        AppError::from(InferenceError::MalformedInput(format!(
            "{}: {err}",
            path.display()
        )))
    })
}
