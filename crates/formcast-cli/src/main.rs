//! formcast - prediction forms over pre-trained tabular models
//!
//! Usage:
//!   formcast --app diamonds --data diamonds.csv --model reg_diamond.json inspect
//!   formcast --config formcast.json predict --set carat=0.3 --set cut=Ideal ...
//!   formcast --config formcast.json batch upload.csv -o predictions.csv
//!   formcast --config formcast.json serve --port 8080

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

mod commands;
mod error;
mod output;
mod render;

use commands::serve::ServerConfig;
use commands::{batch, inspect, predict, serve, Settings};

/// formcast - Prediction forms for pre-trained tabular models
///
/// Turns form input into the exact feature row a model was trained on,
/// then shows the prediction with a confidence or a prediction interval.
#[derive(Parser)]
#[command(name = "formcast")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON config file (app, data, model, unknown_categories, alpha, assets)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Built-in app: airline or diamonds
    #[arg(long, global = true)]
    app: Option<String>,

    /// Reference CSV
    #[arg(long, global = true, value_name = "FILE")]
    data: Option<PathBuf>,

    /// Model artifact (.json or bincode)
    #[arg(long, global = true, value_name = "FILE")]
    model: Option<PathBuf>,

    /// Miscoverage level for prediction intervals, in (0, 1)
    #[arg(long, global = true)]
    alpha: Option<f64>,

    /// Reject categories that never appear in the reference data
    #[arg(long, global = true)]
    strict_categories: bool,

    /// Directory with insight images (defaults to the reference CSV's directory)
    #[arg(long, global = true, value_name = "DIR")]
    assets: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Predict one record given as field=value pairs
    Predict {
        /// Input field, repeatable (e.g. --set cut=Ideal)
        #[arg(long = "set", value_name = "FIELD=VALUE", value_parser = predict::parse_assignment)]
        assignments: Vec<(String, String)>,

        /// Also print the encoded feature row
        #[arg(long)]
        show_vector: bool,
    },

    /// Predict every row of a CSV file
    Batch {
        /// CSV with the app's feature columns
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output CSV (stdout if omitted)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Inspect reference data, model and column alignment
    Inspect {
        /// Number of reference rows to preview
        #[arg(long, default_value = "5")]
        head: usize,
    },

    /// Serve the prediction form over HTTP
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },
}

fn init_logging(verbose: bool, quiet: bool) {
    let default = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "warn"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp(None)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let settings = Settings {
        config: cli.config,
        app: cli.app,
        data: cli.data,
        model: cli.model,
        alpha: cli.alpha,
        strict_categories: cli.strict_categories,
        assets: cli.assets,
    };

    let result = match cli.command {
        Commands::Predict {
            assignments,
            show_vector,
        } => predict::run(&settings, &assignments, show_vector, cli.json),

        Commands::Batch { input, output } => {
            batch::run(&settings, &input, output.as_deref(), cli.json)
        }

        Commands::Inspect { head } => inspect::run(&settings, head, cli.json),

        Commands::Serve { port, host } => {
            let config = ServerConfig { port, host };
            serve::run(&settings, &config)
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            e.exit_code()
        }
    }
}
