use crate::commands::TrainingOverrides;
use crate::infra::parse_date;
use chrono::{Local, NaiveDate};
use clap::Args;
use donor_match::config::AppConfig;
use donor_match::error::AppError;
use donor_match::matching::dataset::{read_donors_csv, read_requests_json};
use donor_match::matching::{
    build, rank_donors, save_model, train_examples, Donor, InferenceGateway, MatchModel,
    OrganRequest, RequestKind,
};
use std::path::PathBuf;
use std::sync::Arc;

const DEMO_DONORS: &str = include_str!("../../../crates/donor-match/data/donors.csv");
const DEMO_REQUESTS: &str = include_str!("../../../crates/donor-match/data/organ_requests.json");

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Reference date for the blood donation cooldown (defaults to today)
    #[arg(long, value_parser = parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Number of requests to walk through in the prediction section
    #[arg(long, default_value_t = 3)]
    pub(crate) samples: usize,
    /// Persist the demo model to this path
    #[arg(long)]
    pub(crate) save_model: Option<PathBuf>,
    #[command(flatten)]
    pub(crate) overrides: TrainingOverrides,
}

pub(crate) fn demo_registry() -> Result<(Vec<Donor>, Vec<OrganRequest>), AppError> {
    let donors = read_donors_csv(DEMO_DONORS.as_bytes())?;
    let requests = read_requests_json(DEMO_REQUESTS.as_bytes())?;
    Ok((donors, requests))
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        today,
        samples,
        save_model: model_path,
        overrides,
    } = args;

    let config = AppConfig::load()?;
    let training = overrides.apply(config.training)?;
    let today = today.unwrap_or_else(|| Local::now().date_naive());

    println!("Donor match demo");
    let (donors, requests) = demo_registry()?;
    let examples = build(&donors, &requests);
    let positives = examples.iter().filter(|example| example.label == 1).count();
    println!(
        "- {} donors x {} requests -> {} labeled pairs ({} historical matches)",
        donors.len(),
        requests.len(),
        examples.len(),
        positives
    );

    let model = train_examples(&examples, &training)?;
    render_training(&model, training.trees);

    if let Some(path) = model_path {
        save_model(&model, &path)?;
        println!("- Model saved to {}", path.display());
    }

    let gateway = InferenceGateway::new(Arc::new(model));

    println!("\nBest-scoring donor per request");
    for request in requests.iter().take(samples) {
        let mut best: Option<(&Donor, f64)> = None;
        for donor in &donors {
            let prediction = gateway.predict(donor, request)?;
            if best.map_or(true, |(_, probability)| prediction.probability > probability) {
                best = Some((donor, prediction.probability));
            }
        }
        match best {
            Some((donor, probability)) => println!(
                "  - {} ({} {}, {}) -> {} at {:.2}",
                request.patient_id,
                request.blood_group,
                request.organ_needed,
                request.urgency,
                donor.donor_id,
                probability
            ),
            None => println!("  - {}: no donors on file", request.patient_id),
        }
    }

    println!("\nRanked donors (reference date {today})");
    for request in &requests {
        let ranked = rank_donors(&gateway, request, &donors, today)?;
        let kind = match request.request_type {
            RequestKind::Organ => request.organ_needed.as_str(),
            RequestKind::Blood => "blood",
        };
        if ranked.is_empty() {
            println!("  - {} [{}]: no eligible donors", request.patient_id, kind);
            continue;
        }
        let listing: Vec<String> = ranked
            .iter()
            .map(|candidate| {
                format!(
                    "{} (age gap {}, p={:.2})",
                    candidate.donor.donor_id, candidate.age_gap, candidate.probability
                )
            })
            .collect();
        println!(
            "  - {} [{}]: {}",
            request.patient_id,
            kind,
            listing.join(", ")
        );
    }

    Ok(())
}

fn render_training(model: &MatchModel, trees: usize) {
    if model.is_constant() {
        println!("- Training labels held a single class; serving a constant model");
    } else {
        println!(
            "- Trained a {}-tree forest on {} rows (seed {})",
            trees, model.trained_rows, model.seed
        );
    }
    match model.holdout() {
        Some(report) => println!("Holdout evaluation\n{report}"),
        None => println!("Holdout evaluation skipped: too few rows"),
    }
}
