use crate::commands::{
    build_dataset, predict, rank, train, DatasetBuildArgs, PredictArgs, RankArgs, TrainArgs,
};
use crate::demo::{run_demo, DemoArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use donor_match::error::AppError;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "Donor Match",
    about = "Build match datasets, train the donor/recipient classifier, and serve predictions",
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
    /// Labeled dataset operations
    Dataset {
        #[command(subcommand)]
        command: DatasetCommand,
    },
    /// Train the match classifier from a dataset CSV and persist the model
    Train(TrainArgs),
    /// Score one JSON payload against a persisted model
    Predict(PredictArgs),
    /// Rank a donor pool for a single request
    Rank(RankArgs),
    /// Run the full pipeline on the bundled synthetic registry
    Demo(DemoArgs),
}

#[derive(Subcommand, Debug)]
enum DatasetCommand {
    /// Cross-join donor and request exports into a labeled dataset CSV
    Build(DatasetBuildArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Override the configured model artifact path
    #[arg(long)]
    pub(crate) model: Option<PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Dataset {
            command: DatasetCommand::Build(args),
        } => build_dataset(args),
        Command::Train(args) => train(args),
        Command::Predict(args) => predict(args),
        Command::Rank(args) => rank(args),
        Command::Demo(args) => run_demo(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn missing_subcommand_defaults_to_serve() {
        let cli = Cli::try_parse_from(["donor-match"]).expect("parses");
        assert!(cli.command.is_none());
    }

    #[test]
    fn dataset_build_parses_paths() {
        let cli = Cli::try_parse_from([
            "donor-match",
            "dataset",
            "build",
            "--donors",
            "donors.csv",
            "--requests",
            "organ_requests.json",
            "--workers",
            "4",
        ])
        .expect("parses");

        match cli.command {
            Some(Command::Dataset {
                command: DatasetCommand::Build(args),
            }) => {
                assert_eq!(args.donors, PathBuf::from("donors.csv"));
                assert_eq!(args.output, PathBuf::from("donor_match_dataset.csv"));
                assert_eq!(args.workers.map(|workers| workers.get()), Some(4));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rank_accepts_reference_date() {
        let cli = Cli::try_parse_from([
            "donor-match",
            "rank",
            "--request",
            "request.json",
            "--donors",
            "donors.csv",
            "--today",
            "2024-06-01",
        ])
        .expect("parses");

        let Some(Command::Rank(args)) = cli.command else {
            panic!("expected rank command");
        };
        assert_eq!(
            args.today,
            chrono::NaiveDate::from_ymd_opt(2024, 6, 1)
        );
    }
}
