use matrix::Matrix;
use rand::Rng;
use training::{Dataset, TrainingError};

/// Two noisy clusters centred on `(+separation, ..)` (label 1) and
/// `(-separation, ..)` (label 0), alternating by example.
pub fn two_clusters(
    examples: usize,
    features: usize,
    separation: f64,
    noise: f64,
) -> Result<Dataset, TrainingError> {
    let mut rng = rand::rng();
    let mut values = Vec::with_capacity(examples * features);
    let mut labels = Vec::with_capacity(examples);
    for i in 0..examples {
        let positive = i % 2 == 0;
        let centre = if positive { separation } else { -separation };
        for _ in 0..features {
            let jitter = if noise > 0.0 {
                rng.random_range(-noise..noise)
            } else {
                0.0
            };
            values.push(centre + jitter);
        }
        labels.push(if positive { 1.0 } else { 0.0 });
    }
    let inputs = Matrix::from_shape_vec(examples, features, values)
        .map_err(|e| TrainingError::DataMismatch(e.to_string()))?;
    Dataset::new(inputs, labels)
}
