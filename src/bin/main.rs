//! svm-registry Command Line Interface
//!
//! Trains, inspects and applies SVM models through the same handle-based
//! session a host integration uses.

use clap::{Args, Parser, Subcommand, ValueEnum};
use env_logger::Env;
use log::{error, info};
use std::error::Error;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process;
use svm_registry::api::Session;
use svm_registry::core::{KernelType, SvmType};
use svm_registry::data::{self, DataFormat, Dataset};
use svm_registry::parameter::SvmParameter;
use svm_registry::persistence::SerializableModel;

type CliResult = std::result::Result<(), Box<dyn Error>>;

#[derive(Parser)]
#[command(name = "svm-registry")]
#[command(about = "Handle-based SVM training and inference")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = "svm-registry contributors")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Train a model and report its summary
    Train(TrainArgs),
    /// Show a data file as the problem table a host would see
    Inspect(InspectArgs),
    /// Make predictions using a saved model
    Predict(PredictArgs),
    /// Display model information
    Info(InfoArgs),
    /// Print the crate and solver versions
    Version,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum CliFormat {
    Auto,
    Csv,
    Libsvm,
}

impl CliFormat {
    fn resolve(self, path: &Path) -> DataFormat {
        match self {
            CliFormat::Auto => data::detect_format(path),
            CliFormat::Csv => DataFormat::Csv,
            CliFormat::Libsvm => DataFormat::LibSvm,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum CliSvmType {
    #[value(name = "c-svc")]
    CSvc,
    #[value(name = "nu-svc")]
    NuSvc,
    #[value(name = "one-class")]
    OneClass,
    #[value(name = "epsilon-svr")]
    EpsilonSvr,
    #[value(name = "nu-svr")]
    NuSvr,
}

impl From<CliSvmType> for SvmType {
    fn from(cli_type: CliSvmType) -> Self {
        match cli_type {
            CliSvmType::CSvc => SvmType::CSvc,
            CliSvmType::NuSvc => SvmType::NuSvc,
            CliSvmType::OneClass => SvmType::OneClass,
            CliSvmType::EpsilonSvr => SvmType::EpsilonSvr,
            CliSvmType::NuSvr => SvmType::NuSvr,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum CliKernel {
    Linear,
    Polynomial,
    Rbf,
    Sigmoid,
    Precomputed,
}

impl From<CliKernel> for KernelType {
    fn from(cli_kernel: CliKernel) -> Self {
        match cli_kernel {
            CliKernel::Linear => KernelType::Linear,
            CliKernel::Polynomial => KernelType::Polynomial,
            CliKernel::Rbf => KernelType::Rbf,
            CliKernel::Sigmoid => KernelType::Sigmoid,
            CliKernel::Precomputed => KernelType::Precomputed,
        }
    }
}

#[derive(Args)]
struct TrainArgs {
    /// Training data file (LibSVM or CSV format)
    #[arg(long)]
    data: PathBuf,

    /// Data format
    #[arg(short, long, value_enum, default_value = "auto")]
    format: CliFormat,

    /// SVM formulation
    #[arg(short = 's', long, value_enum, default_value = "c-svc")]
    svm_type: CliSvmType,

    /// Kernel function
    #[arg(short = 't', long, value_enum, default_value = "rbf")]
    kernel: CliKernel,

    /// Degree of the polynomial kernel
    #[arg(long, default_value = "3")]
    degree: i32,

    /// Kernel gamma; 0 means 1/num_features
    #[arg(short, long, default_value = "0")]
    gamma: f64,

    /// Kernel coef0
    #[arg(short = 'r', long, default_value = "0")]
    coef0: f64,

    /// Kernel cache size in MB
    #[arg(short = 'm', long, default_value = "100")]
    cache_size: f64,

    /// Stopping tolerance
    #[arg(short, long, default_value = "0.001")]
    eps: f64,

    /// Cost parameter C
    #[arg(short, long, default_value = "1")]
    c: f64,

    /// nu of nu-SVC, one-class and nu-SVR
    #[arg(short, long, default_value = "0.5")]
    nu: f64,

    /// Epsilon-tube width of epsilon-SVR
    #[arg(short, long, default_value = "0.1")]
    p: f64,

    /// Disable the shrinking heuristic
    #[arg(long)]
    no_shrinking: bool,

    /// Save the trained model to this file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print support vectors and coefficients
    #[arg(long)]
    support_vectors: bool,
}

impl TrainArgs {
    fn parameter(&self) -> SvmParameter {
        SvmParameter {
            svm_type: self.svm_type.into(),
            kernel_type: self.kernel.into(),
            degree: self.degree,
            gamma: self.gamma,
            coef0: self.coef0,
            cache_size: self.cache_size,
            eps: self.eps,
            c: self.c,
            nu: self.nu,
            p: self.p,
            shrinking: !self.no_shrinking,
            ..SvmParameter::default()
        }
    }
}

#[derive(Args)]
struct InspectArgs {
    /// Data file
    #[arg(long)]
    data: PathBuf,

    /// Data format
    #[arg(short, long, value_enum, default_value = "auto")]
    format: CliFormat,
}

#[derive(Args)]
struct PredictArgs {
    /// Trained model file
    #[arg(short, long)]
    model: PathBuf,

    /// Input data file
    #[arg(long)]
    data: PathBuf,

    /// Data format
    #[arg(short, long, value_enum, default_value = "auto")]
    format: CliFormat,

    /// Output predictions file (optional, prints to stdout if not specified)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct InfoArgs {
    /// Model file
    model: PathBuf,
}

fn main() {
    let cli = Cli::parse();

    let log_level = if cli.debug {
        "debug"
    } else if cli.verbose {
        "info"
    } else {
        "warn"
    };

    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    let result = match cli.command {
        Commands::Train(args) => train_command(args),
        Commands::Inspect(args) => inspect_command(args),
        Commands::Predict(args) => predict_command(args),
        Commands::Info(args) => info_command(args),
        Commands::Version => version_command(),
    };

    if let Err(e) = result {
        error!("Error: {e}");
        process::exit(1);
    }
}

fn load_dataset(path: &Path, format: CliFormat) -> Result<Box<dyn Dataset>, Box<dyn Error>> {
    let format = format.resolve(path);
    info!("Loading {path:?} as {format:?}");
    let dataset = data::load(path, format)?;
    info!(
        "Loaded {} samples with {} dimensions",
        dataset.len(),
        dataset.dim()
    );
    Ok(dataset)
}

fn train_command(args: TrainArgs) -> CliResult {
    let dataset = load_dataset(&args.data, args.format)?;
    let param = args.parameter();
    info!(
        "Parameters: type={:?}, kernel={:?}, C={}, nu={}, eps={}",
        param.svm_type, param.kernel_type, param.c, param.nu, param.eps
    );

    let mut session = Session::default();
    let problem = session.problem_create(dataset.labels(), dataset.features())?;
    let parameter = session.parameter_create_full(param)?;
    let model = session.model_create(problem, parameter)?;
    info!("Training completed successfully");

    print!("{}", session.model_query(model)?);
    if args.support_vectors {
        println!();
        print!("{}", session.model_support_vectors(model)?);
    }

    let predictions = session.model_predict(model, dataset.features())?;
    report_fit(dataset.labels(), &predictions, args.svm_type.into());

    if let Some(output) = &args.output {
        session.model_save(model, output)?;
        info!("Model saved to: {output:?}");
    }

    session.unload();
    Ok(())
}

/// Log accuracy or mean squared error on the given labels
fn report_fit(labels: &[f64], predictions: &[f64], svm_type: SvmType) {
    if labels.is_empty() {
        return;
    }
    match svm_type {
        SvmType::EpsilonSvr | SvmType::NuSvr => {
            let mse = labels
                .iter()
                .zip(predictions)
                .map(|(y, p)| (y - p).powi(2))
                .sum::<f64>()
                / labels.len() as f64;
            info!("Mean squared error: {mse:.6}");
        }
        _ => {
            let correct = labels
                .iter()
                .zip(predictions)
                .filter(|(y, p)| y == p)
                .count();
            info!(
                "Accuracy: {:.2}% ({correct}/{})",
                100.0 * correct as f64 / labels.len() as f64,
                labels.len()
            );
        }
    }
}

fn inspect_command(args: InspectArgs) -> CliResult {
    let dataset = load_dataset(&args.data, args.format)?;

    let mut session = Session::default();
    let problem = session.problem_create(dataset.labels(), dataset.features())?;
    print!("{}", session.problem_query(problem)?);
    Ok(())
}

fn predict_command(args: PredictArgs) -> CliResult {
    info!("Loading model from: {:?}", args.model);
    let mut session = Session::default();
    let model = session.model_load(&args.model)?;

    let dataset = load_dataset(&args.data, args.format)?;
    let predictions = session.model_predict(model, dataset.features())?;
    let summary = session.model_query(model)?;
    let code = summary.number(1, 0).unwrap_or_default() as i32;
    report_fit(dataset.labels(), &predictions, SvmType::try_from(code)?);

    match &args.output {
        Some(output_path) => {
            let file = File::create(output_path)?;
            let mut writer = BufWriter::new(file);
            write_predictions(&mut writer, &predictions)?;
            writer.flush()?;
            info!("Predictions saved to: {output_path:?}");
        }
        None => {
            let stdout = std::io::stdout();
            write_predictions(&mut stdout.lock(), &predictions)?;
        }
    }
    Ok(())
}

fn write_predictions<W: Write>(writer: &mut W, predictions: &[f64]) -> std::io::Result<()> {
    writeln!(writer, "# Predictions for {} samples", predictions.len())?;
    writeln!(writer, "# Format: sample_index prediction")?;
    for (i, prediction) in predictions.iter().enumerate() {
        writeln!(writer, "{i} {prediction}")?;
    }
    Ok(())
}

fn info_command(args: InfoArgs) -> CliResult {
    info!("Loading model from: {:?}", args.model);
    let stored = SerializableModel::load_from_file(&args.model)?;
    stored.validate()?;
    stored.print_summary();

    println!("\nSupport Vector Details:");
    println!("  Total: {}", stored.support_vectors.len());
    if let Some(first_sv) = stored.support_vectors.first() {
        println!("  First SV dimensions: {}", first_sv.indices.len());
    }
    if !stored.n_sv.is_empty() {
        println!("  Per class: {:?}", stored.n_sv);
    }
    println!("  Decision offsets (rho): {:?}", stored.rho);
    Ok(())
}

fn version_command() -> CliResult {
    let session = Session::default();
    println!(
        "svm-registry {} (libsvm {})",
        env!("CARGO_PKG_VERSION"),
        session.version()
    );
    Ok(())
}
