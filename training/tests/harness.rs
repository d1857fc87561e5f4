use matrix::Matrix;
use neural_network::{
    ActivationType, AdamBuilder, GroupConfig, LayerConfig, Network, NetworkConfig,
};
use tempfile::tempdir;
use training::{
    BceWithLogits, Dataset, F1, InMemoryLoader, RangeFinderConfigBuilder, RangeFinderOutcome,
    StateDict, TOP_MODEL_GROUP, Trainer, TrainingError, TriangularConfig, set_trainable, unfreeze,
};

/// Two mirrored square clusters: positives around (+2, +2), negatives around (-2, -2).
fn clusters() -> Dataset {
    let mut rows = Vec::new();
    let mut labels = Vec::new();
    for i in 0..10 {
        for j in 0..10 {
            let (x, y) = (1.5 + 0.1 * i as f64, 1.5 + 0.1 * j as f64);
            rows.push(vec![x, y]);
            labels.push(1.0);
            rows.push(vec![-x, -y]);
            labels.push(0.0);
        }
    }
    Dataset::new(Matrix::from_rows(&rows).unwrap(), labels).unwrap()
}

fn logistic_regression() -> Network {
    Network::new(&NetworkConfig {
        inputs: 2,
        groups: vec![GroupConfig {
            name: TOP_MODEL_GROUP.to_string(),
            layers: vec![LayerConfig::new(1, ActivationType::Identity)],
        }],
    })
}

fn top_bias(network: &Network) -> Matrix {
    network
        .group(TOP_MODEL_GROUP)
        .and_then(|group| group.layers().first())
        .unwrap()
        .bias()
        .value()
        .clone()
}

#[test]
fn test_triangular_policy_fits_separable_clusters() -> Result<(), TrainingError> {
    let train = InMemoryLoader::new(clusters(), 20, true)?;
    let valid = InMemoryLoader::new(clusters(), 50, false)?;
    let mut trainer = Trainer::new(logistic_regression(), BceWithLogits, AdamBuilder::default())
        .with_metrics(vec![Box::new(training::Accuracy), Box::new(F1)]);

    let before = trainer.evaluate(&valid)?;
    let config = TriangularConfig {
        low_rate: 1e-3,
        high_rate: 0.1,
        epochs: 8,
        half_cycle_pct: 0.45,
    };
    let history = trainer.train_triangular_policy(&train, &valid, &config)?;

    assert_eq!(history.epochs.len(), 8);
    let last = history.last().unwrap();
    assert!(last.metrics.val_loss() < before.val_loss());
    assert!(last.metrics.get("accuracy_score").unwrap() >= 0.95);
    assert!(last.metrics.get("f1_score").unwrap() >= 0.95);

    let (predictions, labels) = trainer.predict_with_labels(&valid)?;
    assert_eq!(predictions.len(), 200);
    assert_eq!(labels.len(), 200);
    Ok(())
}

#[test]
fn test_range_finder_on_a_network() -> Result<(), TrainingError> {
    let dir = tempdir()?;
    let train = InMemoryLoader::new(clusters(), 10, true)?;
    let mut trainer = Trainer::new(
        Network::new(&NetworkConfig::binary_classifier(2)),
        BceWithLogits,
        AdamBuilder::default(),
    );
    let before = StateDict::capture(trainer.model());
    let config = RangeFinderConfigBuilder::default()
        .snapshot_path(dir.path().join("models").join("tmp.json"))
        .build()
        .unwrap();

    let result = trainer.find_learning_rate(&train, &config)?;

    assert_eq!(result.log_rates.len(), result.losses.len());
    assert_eq!(result.smoothed_losses.len(), result.losses.len());
    match result.outcome {
        RangeFinderOutcome::Exhausted => {
            assert_eq!(result.len(), 20);
            assert_eq!(StateDict::capture(trainer.model()), before);
        }
        RangeFinderOutcome::Diverged { step } => {
            assert!(step > 1);
            assert_eq!(result.len(), step - 1);
        }
    }
    Ok(())
}

#[test]
fn test_progressive_unfreezing_only_moves_open_layers() -> Result<(), TrainingError> {
    let train = InMemoryLoader::new(clusters(), 25, false)?;
    let valid = InMemoryLoader::new(clusters(), 100, false)?;
    let mut trainer = Trainer::new(
        Network::new(&NetworkConfig::binary_classifier(2)),
        BceWithLogits,
        AdamBuilder::default(),
    );

    set_trainable(trainer.model_mut(), false);
    unfreeze(trainer.model_mut(), 0, TOP_MODEL_GROUP)?;
    let body_before = trainer.model().group("body").unwrap().layers().to_vec();
    let top_before = top_bias(trainer.model());

    let config = TriangularConfig {
        epochs: 1,
        ..TriangularConfig::default()
    };
    trainer.train_triangular_policy(&train, &valid, &config)?;

    let body_after = trainer.model().group("body").unwrap().layers();
    for (before, after) in body_before.iter().zip(body_after) {
        assert_eq!(before.weights().value(), after.weights().value());
        assert_eq!(before.bias().value(), after.bias().value());
    }
    assert_ne!(top_bias(trainer.model()), top_before);
    Ok(())
}

#[test]
fn test_unfreeze_reports_bad_group_and_index() {
    let mut network = Network::new(&NetworkConfig::binary_classifier(2));
    assert!(matches!(
        unfreeze(&mut network, 0, "head"),
        Err(TrainingError::MissingGroup { .. })
    ));
    assert!(matches!(
        unfreeze(&mut network, 1, TOP_MODEL_GROUP),
        Err(TrainingError::LayerIndexOutOfRange { index: 1, len: 1 })
    ));
}
