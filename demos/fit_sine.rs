//! Fits a small network to one period of a sine wave.
//!
//! Usage: `cargo run --example fit_sine [network.json]`. Without a config file the
//! network is `dense(16) -> tanh -> dense(1)`.

use std::env;
use std::f32::consts::PI;

use scnn::{
    config::{LayerConfig, NetworkConfig},
    loss::MeanSquared,
    optimizer::{DefaultOptimizer, GradientDescent},
    LayerKind,
};

const POINTS: usize = 64;
const EPOCHS: usize = 5000;

fn data() -> (Vec<f32>, Vec<f32>) {
    let inputs = (0..POINTS)
        .map(|x| x as f32 / (POINTS - 1) as f32 * 2. - 1.)
        .collect::<Vec<_>>();
    let targets = inputs.iter().map(|x| (x * PI).sin()).collect();
    (inputs, targets)
}

fn default_config() -> NetworkConfig {
    NetworkConfig {
        batch_size: POINTS,
        input: 1,
        layers: vec![
            LayerConfig {
                kind: LayerKind::Dense,
                out: Some(16),
            },
            LayerConfig {
                kind: LayerKind::TanH,
                out: None,
            },
            LayerConfig {
                kind: LayerKind::Dense,
                out: Some(1),
            },
        ],
    }
}

fn main() -> anyhow::Result<()> {
    let config = match env::args().nth(1) {
        Some(path) => NetworkConfig::from_file(path)?,
        None => default_config(),
    };
    anyhow::ensure!(
        config.batch_size == POINTS && config.input == 1,
        "The network must take batches of {} single values",
        POINTS
    );

    let (inputs, targets) = data();
    let network = config.build()?;
    println!(
        "Fitting a network with {} layers and {} parameters",
        network.size(),
        network.parameter_count()
    );

    let optimizer = GradientDescent::builder().l_rate(0.05).build();
    let mut trainer = DefaultOptimizer::new(network, optimizer, MeanSquared);
    for epoch in 0..EPOCHS {
        let loss = trainer.process(&inputs, &targets)?;
        if epoch % 500 == 0 {
            println!("Epoch {}: loss {}", epoch, loss);
        }
    }
    println!(
        "Finished fitting with loss {}",
        trainer.test(&inputs, &targets)?
    );

    let output = trainer.forward(&inputs)?.to_vec();
    for i in (0..POINTS).step_by(8) {
        println!(
            "sin({:.3}) = {:.3}, predicted {:.3}",
            inputs[i] * PI,
            targets[i],
            output[i]
        );
    }

    let mut network = trainer.into_network();
    network.free();
    Ok(())
}
