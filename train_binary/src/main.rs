mod plot;
mod synth;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use neural_network::{AdamBuilder, Network, NetworkConfig};
use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;
use training::{
    Accuracy, BceWithLogits, Dataset, F1, InMemoryLoader, Precision, ProgressObserver,
    RangeFinderOutcome, RangeFinderResult, Recall, TOP_MODEL_GROUP, Trainer, TrainingConfig,
    set_trainable, triangular_schedule, unfreeze,
};

const BODY_GROUP: &str = "body";

/// Binary confusion counts.
#[derive(Debug, Default, PartialEq)]
struct ConfusionMatrix {
    true_negatives: usize,
    false_positives: usize,
    false_negatives: usize,
    true_positives: usize,
}

impl ConfusionMatrix {
    fn from_predictions(predictions: &[bool], labels: &[f64]) -> Self {
        let mut confusion = Self::default();
        for (&predicted, &label) in predictions.iter().zip(labels) {
            let cell = match (label > 0.5, predicted) {
                (false, false) => &mut confusion.true_negatives,
                (false, true) => &mut confusion.false_positives,
                (true, false) => &mut confusion.false_negatives,
                (true, true) => &mut confusion.true_positives,
            };
            *cell += 1;
        }
        confusion
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "\nConfusion Matrix:")?;
        writeln!(f, "      Predicted →")?;
        writeln!(f, "Actual       0      1")?;
        writeln!(f, "  ↓   +--------------")?;
        writeln!(
            f,
            "  0   | {:6} {:6}",
            self.true_negatives, self.false_positives
        )?;
        writeln!(
            f,
            "  1   | {:6} {:6}",
            self.false_negatives, self.true_positives
        )
    }
}

fn load_config(path: Option<&Path>) -> Result<TrainingConfig> {
    match path {
        Some(path) => TrainingConfig::load(path)
            .with_context(|| format!("Failed to load training config from {}", path.display())),
        None => Ok(TrainingConfig::default()),
    }
}

fn build_network(path: Option<&Path>, inputs: usize) -> Result<Network> {
    let config = match path {
        Some(path) => NetworkConfig::load(path)
            .with_context(|| format!("Failed to load network config from {}", path.display()))?,
        None => NetworkConfig::binary_classifier(inputs),
    };
    if config.inputs != inputs {
        return Err(anyhow!(
            "Network expects {} inputs but the dataset has {} features",
            config.inputs,
            inputs
        ));
    }
    Ok(Network::new(&config))
}

fn run_synth(
    output: &Path,
    examples: usize,
    features: usize,
    separation: f64,
    noise: f64,
) -> Result<()> {
    let dataset = synth::two_clusters(examples, features, separation, noise)
        .context("Failed to generate dataset")?;
    dataset
        .save(output)
        .with_context(|| format!("Failed to save dataset to {}", output.display()))?;
    println!("Wrote {} examples to {}", dataset.len(), output.display());
    Ok(())
}

fn run_find_lr(
    data: &Path,
    config: Option<&Path>,
    network: Option<&Path>,
    output: &Path,
    graph: &Path,
) -> Result<()> {
    let config = load_config(config)?;
    let dataset = Dataset::load(data)
        .with_context(|| format!("Failed to load dataset from {}", data.display()))?;
    let model = build_network(network, dataset.features())?;
    let train = InMemoryLoader::new(dataset, config.batch_size, config.shuffle)?;

    let mut trainer = Trainer::new(model, BceWithLogits, AdamBuilder::default());
    let result = trainer
        .find_learning_rate(&train, &config.range_finder)
        .context("Learning rate range test failed")?;

    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent).context("Failed to create models directory")?;
    }
    let writer = BufWriter::new(File::create(output).context("Failed to create result file")?);
    serde_json::to_writer_pretty(writer, &result).context("Failed to write result")?;
    plot::plot_lr(&result, graph)?;

    match result.outcome {
        RangeFinderOutcome::Exhausted => println!("Swept all {} rates", result.len()),
        RangeFinderOutcome::Diverged { step } => println!("Loss diverged at step {step}"),
    }
    if let Some(rate) = result.min_loss_rate() {
        println!("Lowest smoothed loss at learning rate {rate:.3e}");
    }
    println!("Graph saved to {}", graph.display());
    Ok(())
}

fn run_graph(input: &Path, output: &Path) -> Result<()> {
    let reader = BufReader::new(
        File::open(input).with_context(|| format!("Failed to open {}", input.display()))?,
    );
    let result: RangeFinderResult =
        serde_json::from_reader(reader).context("Failed to parse range finder result")?;
    plot::plot_lr(&result, output)?;
    println!("Graph saved to {}", output.display());
    Ok(())
}

fn run_schedule(low: f64, high: f64, steps: usize, pct: f64) -> Result<()> {
    let schedule = triangular_schedule(low, high, steps, pct)?;
    println!("{:>6} {:>12} {:>10}", "step", "rate", "momentum");
    for (step, (rate, momentum)) in schedule.rates.iter().zip(&schedule.momenta).enumerate() {
        println!("{:>6} {:>12.6e} {:>10.4}", step + 1, rate, momentum);
    }
    Ok(())
}

struct TrainArgs<'a> {
    data: &'a Path,
    config: Option<&'a Path>,
    network: Option<&'a Path>,
    valid_fraction: f64,
    model: &'a Path,
    progressive: bool,
}

fn run_train(args: TrainArgs<'_>) -> Result<()> {
    let config = load_config(args.config)?;
    let dataset = Dataset::load(args.data)
        .with_context(|| format!("Failed to load dataset from {}", args.data.display()))?;
    let model = build_network(args.network, dataset.features())?;
    let (train_set, valid_set) = dataset.split(args.valid_fraction)?;
    info!(train = train_set.len(), valid = valid_set.len(), "split dataset");

    let train = InMemoryLoader::new(train_set, config.batch_size, config.shuffle)?;
    let valid = InMemoryLoader::new(valid_set, config.batch_size, false)?;

    let mut trainer = Trainer::new(model, BceWithLogits, AdamBuilder::default())
        .with_metrics(vec![
            Box::new(Accuracy),
            Box::new(Precision),
            Box::new(Recall),
            Box::new(F1),
        ])
        .with_observer(ProgressObserver::new());

    if args.progressive {
        let body_layers = trainer
            .model()
            .group(BODY_GROUP)
            .map_or(0, |group| group.layers().len());
        let top_layers = trainer
            .model()
            .group(TOP_MODEL_GROUP)
            .map_or(0, |group| group.layers().len());

        set_trainable(trainer.model_mut(), false);
        for index in 0..top_layers {
            unfreeze(trainer.model_mut(), index, TOP_MODEL_GROUP)?;
        }
        let inner = config.training_loop.triangular();
        for step in 0..config.training_loop.steps {
            println!("\nProgressive step {} of {}", step + 1, config.training_loop.steps);
            let history = trainer.train_triangular_policy(&train, &valid, &inner)?;
            history.print_summary();
            if step < body_layers {
                unfreeze(trainer.model_mut(), body_layers - 1 - step, BODY_GROUP)?;
            }
        }
    } else {
        trainer.training_loop(&train, &valid, &config.training_loop)?;
    }

    let metrics = trainer.evaluate(&valid)?;
    println!("\nValidation: {metrics}");
    let (predictions, labels) = trainer.predict_with_labels(&valid)?;
    println!("{}", ConfusionMatrix::from_predictions(&predictions, &labels));

    if let Some(parent) = args.model.parent() {
        std::fs::create_dir_all(parent).context("Failed to create models directory")?;
    }
    trainer
        .model()
        .save(args.model)
        .with_context(|| format!("Failed to save network to {}", args.model.display()))?;
    println!("Network saved to {}", args.model.display());
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match args.command {
        Command::Synth {
            output,
            examples,
            features,
            separation,
            noise,
        } => run_synth(&output, examples, features, separation, noise),
        Command::FindLr {
            data,
            config,
            network,
            output,
            graph,
        } => run_find_lr(&data, config.as_deref(), network.as_deref(), &output, &graph),
        Command::Graph { input, output } => run_graph(&input, &output),
        Command::Schedule {
            low,
            high,
            steps,
            pct,
        } => run_schedule(low, high, steps, pct),
        Command::Train {
            data,
            config,
            network,
            valid_fraction,
            model,
            progressive,
        } => run_train(TrainArgs {
            data: &data,
            config: config.as_deref(),
            network: network.as_deref(),
            valid_fraction,
            model: &model,
            progressive,
        }),
    }
}

#[derive(clap::Parser)]
#[command(name = "train_binary", about = "Binary classifier training", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
#[command(about = "Learning rate search and cyclical training")]
enum Command {
    /// Generate a two-cluster dataset
    Synth {
        #[arg(long, default_value = "data/clusters.json")]
        output: PathBuf,
        #[arg(long, default_value_t = 1000)]
        examples: usize,
        #[arg(long, default_value_t = 2)]
        features: usize,
        #[arg(long, default_value_t = 1.5)]
        separation: f64,
        #[arg(long, default_value_t = 1.0)]
        noise: f64,
    },
    /// Run the learning rate range test and plot the losses
    FindLr {
        #[arg(long)]
        data: PathBuf,
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        network: Option<PathBuf>,
        #[arg(long, default_value = "models/lr_finder.json")]
        output: PathBuf,
        #[arg(long, default_value = "graphs/lr_finder.svg")]
        graph: PathBuf,
    },
    /// Re-render a saved range test
    Graph {
        #[arg(long, default_value = "models/lr_finder.json")]
        input: PathBuf,
        #[arg(long, default_value = "graphs/lr_finder.svg")]
        output: PathBuf,
    },
    /// Print a triangular learning rate and momentum schedule
    Schedule {
        #[arg(long, default_value_t = 1e-5)]
        low: f64,
        #[arg(long, default_value_t = 0.01)]
        high: f64,
        #[arg(long, default_value_t = 100)]
        steps: usize,
        #[arg(long, default_value_t = 0.45)]
        pct: f64,
    },
    /// Train with the triangular policy and save the network
    Train {
        #[arg(long)]
        data: PathBuf,
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        network: Option<PathBuf>,
        #[arg(long, default_value_t = 0.2)]
        valid_fraction: f64,
        #[arg(long, default_value = "models/trained_network.json")]
        model: PathBuf,
        /// Start from the head and unfreeze one body layer per step
        #[arg(long)]
        progressive: bool,
    },
}
