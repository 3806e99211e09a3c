use crate::commands::{
    run_catalog_derive, run_recommend, run_train, CatalogDeriveArgs, RecommendArgs, TrainArgs,
};
use crate::server;
use clap::{Args, Parser, Subcommand};
use internship_match::error::AppError;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "Internship Match",
    about = "Serve, train and query the internship vacancy recommender",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Fit a scoring model from historical interactions and save the artifact
    Train(TrainArgs),
    /// Rank the vacancy catalog for one candidate and print the result
    Recommend(RecommendArgs),
    /// Maintain the vacancy catalog snapshot
    Catalog {
        #[command(subcommand)]
        command: CatalogCommand,
    },
}

#[derive(Subcommand, Debug)]
enum CatalogCommand {
    /// Extract the unique vacancies referenced by a training history file
    Derive(CatalogDeriveArgs),
}

/// Snapshot locations shared by every command that builds a recommender.
#[derive(Args, Debug, Default, Clone)]
pub(crate) struct SnapshotArgs {
    /// Override the vacancy catalog CSV
    #[arg(long)]
    pub(crate) vacancies: Option<PathBuf>,
    /// Override the pincode coordinate CSV
    #[arg(long)]
    pub(crate) pincodes: Option<PathBuf>,
    /// Override the model artifact path
    #[arg(long)]
    pub(crate) model: Option<PathBuf>,
    /// Override how many vacancies are returned per request
    #[arg(long, value_parser = parse_top_k_arg)]
    pub(crate) top_k: Option<usize>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    #[command(flatten)]
    pub(crate) snapshot: SnapshotArgs,
}

pub(crate) fn parse_top_k_arg(raw: &str) -> Result<usize, String> {
    internship_match::config::parse_top_k(raw).map_err(|err| err.to_string())
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Train(args) => run_train(args),
        Command::Recommend(args) => run_recommend(args),
        Command::Catalog {
            command: CatalogCommand::Derive(args),
        } => run_catalog_derive(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_subcommand_defaults_to_serve() {
        let cli = Cli::try_parse_from(["internship-match-api"]).expect("parses");
        assert!(cli.command.is_none());
    }

    #[test]
    fn serve_accepts_snapshot_overrides() {
        let cli = Cli::try_parse_from([
            "internship-match-api",
            "serve",
            "--port",
            "8080",
            "--top-k",
            "5",
            "--model",
            "artifacts/model.json",
        ])
        .expect("parses");

        match cli.command {
            Some(Command::Serve(args)) => {
                assert_eq!(args.port, Some(8080));
                assert_eq!(args.snapshot.top_k, Some(5));
                assert_eq!(
                    args.snapshot.model,
                    Some(PathBuf::from("artifacts/model.json"))
                );
            }
            other => panic!("expected serve, got {other:?}"),
        }
    }

    #[test]
    fn zero_top_k_is_rejected_at_parse_time() {
        let result = Cli::try_parse_from(["internship-match-api", "serve", "--top-k", "0"]);
        assert!(result.is_err());
    }

    #[test]
    fn recommend_requires_candidate_fields() {
        let result = Cli::try_parse_from(["internship-match-api", "recommend", "--branch", "CS"]);
        assert!(result.is_err());

        let cli = Cli::try_parse_from([
            "internship-match-api",
            "recommend",
            "--qualification",
            "B.Tech",
            "--branch",
            "CS",
            "--interest",
            "💻 computer",
            "--pincode",
            "110001",
        ])
        .expect("parses");
        assert!(matches!(cli.command, Some(Command::Recommend(_))));
    }

    #[test]
    fn catalog_derive_is_nested() {
        let cli = Cli::try_parse_from([
            "internship-match-api",
            "catalog",
            "derive",
            "--output",
            "vacancies.csv",
        ])
        .expect("parses");
        assert!(matches!(
            cli.command,
            Some(Command::Catalog {
                command: CatalogCommand::Derive(_)
            })
        ));
    }
}
