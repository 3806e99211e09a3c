use crate::cli::SnapshotArgs;
use internship_match::config::{AppConfig, DataConfig};
use internship_match::error::AppError;
use internship_match::recommender::catalog::{load_pincodes, load_vacancies};
use internship_match::recommender::model::load_for_serving;
use internship_match::recommender::Recommender;
use internship_match::telemetry;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Loads configuration and installs the log subscriber. Every command starts here.
pub(crate) fn bootstrap() -> Result<AppConfig, AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;
    Ok(config)
}

pub(crate) fn apply_snapshot_overrides(data: &mut DataConfig, overrides: SnapshotArgs) {
    let SnapshotArgs {
        vacancies,
        pincodes,
        model,
        top_k,
    } = overrides;

    if let Some(path) = vacancies {
        data.vacancies_path = path;
    }
    if let Some(path) = pincodes {
        data.pincodes_path = path;
    }
    if let Some(path) = model {
        data.model_path = path;
    }
    if let Some(top_k) = top_k {
        data.top_k = top_k;
    }
}

/// Loads the catalog, pincode table and model into one immutable serving snapshot.
pub(crate) fn load_recommender(data: &DataConfig) -> Result<Recommender, AppError> {
    let catalog = load_vacancies(&data.vacancies_path)?;
    if catalog.is_empty() {
        warn!(
            path = %data.vacancies_path.display(),
            "vacancy catalog is empty, recommendations will be refused"
        );
    }
    let directory = load_pincodes(&data.pincodes_path)?;
    let model = load_for_serving(&data.model_path)?;

    let recommender = Recommender::new(catalog, directory, model, data.top_k);
    info!(
        vacancies = recommender.catalog_len(),
        pincodes = recommender.pincode_count(),
        top_k = recommender.top_k(),
        "recommendation snapshot ready"
    );
    Ok(recommender)
}
