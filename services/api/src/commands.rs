use crate::cli::SnapshotArgs;
use crate::infra::{apply_snapshot_overrides, bootstrap, load_recommender};
use chrono::Local;
use clap::Args;
use internship_match::error::AppError;
use internship_match::recommender::catalog::{
    derive_catalog, load_pincodes, load_training_records, save_vacancies,
};
use internship_match::recommender::model::{BoostingParams, GradientBoostingTrainer};
use internship_match::recommender::{
    CandidateProfile, ModelArtifact, Pincode, Qualification, RecommendationEntry,
    TrainingConfig, TrainingOrchestrator, TrainingReport,
};
use std::path::PathBuf;

#[derive(Args, Debug, Default)]
pub(crate) struct TrainArgs {
    /// Historical interactions CSV (defaults to APP_TRAINING_CSV)
    #[arg(long)]
    pub(crate) history: Option<PathBuf>,
    /// Pincode coordinate CSV (defaults to APP_PINCODES_CSV)
    #[arg(long)]
    pub(crate) pincodes: Option<PathBuf>,
    /// Where to write the model artifact (defaults to APP_MODEL_PATH)
    #[arg(long)]
    pub(crate) output: Option<PathBuf>,
    /// Seed for the train/test split and tree sampling
    #[arg(long)]
    pub(crate) seed: Option<u64>,
    /// Number of boosting rounds
    #[arg(long)]
    pub(crate) estimators: Option<usize>,
    /// Maximum depth of each tree
    #[arg(long)]
    pub(crate) max_depth: Option<usize>,
}

#[derive(Args, Debug)]
pub(crate) struct RecommendArgs {
    /// Candidate qualification label, e.g. "B.Tech"
    #[arg(long)]
    pub(crate) qualification: String,
    /// Candidate branch, e.g. "CS"
    #[arg(long)]
    pub(crate) branch: String,
    /// Free-text interest tag
    #[arg(long, default_value = "")]
    pub(crate) interest: String,
    /// Candidate pincode
    #[arg(long)]
    pub(crate) pincode: u32,
    /// Print the response payload as JSON instead of a table
    #[arg(long)]
    pub(crate) json: bool,
    #[command(flatten)]
    pub(crate) snapshot: SnapshotArgs,
}

#[derive(Args, Debug, Default)]
pub(crate) struct CatalogDeriveArgs {
    /// Historical interactions CSV (defaults to APP_TRAINING_CSV)
    #[arg(long)]
    pub(crate) history: Option<PathBuf>,
    /// Destination vacancy CSV (defaults to APP_VACANCIES_CSV)
    #[arg(long)]
    pub(crate) output: Option<PathBuf>,
}

pub(crate) fn run_train(args: TrainArgs) -> Result<(), AppError> {
    let config = bootstrap()?;

    let TrainArgs {
        history,
        pincodes,
        output,
        seed,
        estimators,
        max_depth,
    } = args;
    let history = history.unwrap_or(config.data.training_path);
    let pincodes = pincodes.unwrap_or(config.data.pincodes_path);
    let output = output.unwrap_or(config.data.model_path);

    let mut training = TrainingConfig::default();
    let mut params = BoostingParams::default();
    if let Some(seed) = seed {
        training.seed = seed;
        params.seed = seed;
    }
    if let Some(estimators) = estimators {
        params.n_estimators = estimators;
    }
    if let Some(max_depth) = max_depth {
        params.max_depth = max_depth;
    }

    let records = load_training_records(&history)?;
    let directory = load_pincodes(&pincodes)?;
    let orchestrator = TrainingOrchestrator::new(GradientBoostingTrainer::new(params), training);
    let outcome = orchestrator.run(&records, &directory)?;

    outcome.model.save(&output)?;
    println!("{}", render_training_report(&outcome.report, &outcome.model));
    println!("Model saved to {}", output.display());
    Ok(())
}

pub(crate) fn run_recommend(args: RecommendArgs) -> Result<(), AppError> {
    let RecommendArgs {
        qualification,
        branch,
        interest,
        pincode,
        json,
        snapshot,
    } = args;

    let mut config = bootstrap()?;
    apply_snapshot_overrides(&mut config.data, snapshot);
    let recommender = load_recommender(&config.data)?;

    let candidate = CandidateProfile {
        qualification: Qualification::parse(&qualification),
        branch,
        interest_emoji: interest,
        pincode: Pincode(pincode),
    };
    let entries = recommender.recommend(&candidate)?;

    if json {
        let payload = serde_json::json!({ "recommendations": entries });
        match serde_json::to_string_pretty(&payload) {
            Ok(body) => println!("{body}"),
            Err(err) => println!("Recommendations unavailable as JSON: {err}"),
        }
    } else {
        println!("{}", render_recommendations(&candidate, &entries));
    }
    Ok(())
}

pub(crate) fn run_catalog_derive(args: CatalogDeriveArgs) -> Result<(), AppError> {
    let config = bootstrap()?;
    let history = args.history.unwrap_or(config.data.training_path);
    let output = args.output.unwrap_or(config.data.vacancies_path);

    let records = load_training_records(&history)?;
    let catalog = derive_catalog(&records);
    save_vacancies(&output, &catalog)?;

    println!(
        "Derived {} unique vacancies from {} rows into {}",
        catalog.len(),
        records.len(),
        output.display()
    );
    Ok(())
}

pub(crate) fn render_training_report(report: &TrainingReport, artifact: &ModelArtifact) -> String {
    let mut lines = vec![
        "Training summary".to_string(),
        format!(
            "  Rows: {} read, {} usable, {} dropped",
            report.total_records, report.usable_rows, report.dropped_rows
        ),
        format!(
            "  Labels: {} accepted, {} not accepted",
            report.accepted_rows, report.rejected_rows
        ),
        format!(
            "  Split: {} train / {} test",
            report.train_rows, report.test_rows
        ),
        format!(
            "  Precision: {:.3} ({} of {} predicted acceptances correct)",
            report.precision, report.true_positive, report.predicted_positive
        ),
        format!(
            "  Model: {} trees over {} encoded columns, trained {}",
            artifact.ensemble().tree_count(),
            artifact.encoder().width(),
            artifact
                .trained_at
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M:%S")
        ),
    ];
    if report.predicted_positive == 0 {
        lines.push("  Warning: no held-out pair was predicted as accepted".to_string());
    }
    lines.join("\n")
}

pub(crate) fn render_recommendations(
    candidate: &CandidateProfile,
    entries: &[RecommendationEntry],
) -> String {
    let mut lines = vec![format!(
        "Top {} vacancies for {} / {} near {}",
        entries.len(),
        candidate.qualification,
        candidate.branch,
        candidate.pincode
    )];
    for (rank, entry) in entries.iter().enumerate() {
        let distance = entry
            .distance_km
            .map(|km| format!("{km:.1} km"))
            .unwrap_or_else(|| "distance unknown".to_string());
        lines.push(format!(
            "  {:>2}. [{}] {} ({} / {}) stipend {} | {} | score {:.3}",
            rank + 1,
            entry.vacancy_id,
            entry.title,
            entry.required_qualification,
            entry.required_branch,
            entry.stipend,
            distance,
            entry.score
        ));
    }
    lines.join("\n")
}
