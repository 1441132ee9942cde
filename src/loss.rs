use std::fmt::Debug;

/// Loss value of a batch together with its gradient with respect to the network output.
pub struct Loss {
    pub loss: f32,
    pub grads: Vec<f32>,
}

pub trait LossFunc: Debug {
    /// Evaluates the loss of the flat output batch `val` against `target`.
    fn eval(&self, val: &[f32], target: &[f32]) -> Loss;
}

/// Squared error averaged over every value in the batch.
#[derive(Clone, Copy, Debug, Default)]
pub struct MeanSquared;

impl LossFunc for MeanSquared {
    fn eval(&self, val: &[f32], target: &[f32]) -> Loss {
        assert_eq!(
            val.len(),
            target.len(),
            "Value vector must be the same length as target vector. val: {}, target: {}",
            val.len(),
            target.len()
        );

        let recip = 1. / val.len() as f32;
        let mut grads = Vec::with_capacity(val.len());
        let mut loss = 0.;
        for (val, target) in val.iter().copied().zip(target.iter().copied()) {
            let diff = val - target;
            loss += diff * diff;
            grads.push(2. * diff * recip);
        }

        Loss {
            loss: loss * recip,
            grads,
        }
    }
}
