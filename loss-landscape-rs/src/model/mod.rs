//! Model abstraction used for loss evaluation.
//!
//! The loss grid only needs three things from a model: read its parameters as
//! one flat vector, overwrite them from one, and evaluate loss over a dataset
//! without training. [`ParameterModel`] captures exactly that.
//!
//! Grid evaluation treats the model's parameters as a scratch buffer.
//! [`with_checkpoint`] and [`evaluate_at`] make that safe: the parameters the
//! model held on entry are always put back, whether evaluation succeeded or
//! not.

mod mlp;

pub use mlp::{ClassificationDataset, MlpClassifier};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{LandscapeError, Result};

/// Result of one forward evaluation over a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    /// Mean loss over the dataset.
    pub loss: f32,
    /// Accuracy, when the model has a notion of it.
    pub accuracy: Option<f32>,
}

impl Evaluation {
    /// An evaluation with loss only.
    pub fn loss(loss: f32) -> Self {
        Self {
            loss,
            accuracy: None,
        }
    }
}

/// A model whose parameters can be read and written as one flat vector.
pub trait ParameterModel {
    /// Data the model evaluates on.
    type Dataset: ?Sized;

    /// Total number of trainable parameters.
    fn num_params(&self) -> usize;

    /// Current parameters, flattened in the model's fixed order.
    fn flat_params(&self) -> Result<Vec<f32>>;

    /// Overwrite every parameter from a flat vector.
    ///
    /// Must reject vectors whose length is not [`Self::num_params`] with
    /// [`LandscapeError::ParameterCountMismatch`].
    fn load_flat_params(&mut self, params: &[f32]) -> Result<()>;

    /// Evaluate over the whole dataset. No gradients, no parameter updates.
    fn evaluate(&self, data: &Self::Dataset) -> Result<Evaluation>;
}

/// Run `f` on the model, then restore the parameters it held on entry.
///
/// Restoration happens on success and on failure. If both `f` and the
/// restore fail, the error from `f` is returned.
pub fn with_checkpoint<M, T, F>(model: &mut M, f: F) -> Result<T>
where
    M: ParameterModel + ?Sized,
    F: FnOnce(&mut M) -> Result<T>,
{
    let checkpoint = model.flat_params()?;
    let result = f(model);
    let restored = model.load_flat_params(&checkpoint);

    match (result, restored) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(e)) => Err(e),
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(restore_err)) => {
            warn!("Failed to restore model parameters: {}", restore_err);
            Err(e)
        }
    }
}

/// Evaluate the model at `params` without changing its parameters.
pub fn evaluate_at<M>(model: &mut M, params: &[f32], data: &M::Dataset) -> Result<Evaluation>
where
    M: ParameterModel + ?Sized,
{
    with_checkpoint(model, |m| {
        m.load_flat_params(params)?;
        m.evaluate(data)
    })
}

/// Adapts a plain loss function over a flat weight vector to [`ParameterModel`].
///
/// # Example
///
/// ```
/// use loss_landscape_rs::model::{evaluate_at, LossFnModel, ParameterModel};
///
/// let mut model = LossFnModel::new(vec![1.0, 1.0], |w: &[f32]| w.iter().map(|x| x * x).sum());
/// let eval = evaluate_at(&mut model, &[0.0, 0.0], &())?;
/// assert_eq!(eval.loss, 0.0);
/// assert_eq!(model.flat_params()?, vec![1.0, 1.0]);
/// # Ok::<(), loss_landscape_rs::LandscapeError>(())
/// ```
#[derive(Debug, Clone)]
pub struct LossFnModel<F> {
    weights: Vec<f32>,
    loss_fn: F,
}

impl<F> LossFnModel<F>
where
    F: Fn(&[f32]) -> f32,
{
    /// Wrap `loss_fn` with initial weights.
    pub fn new(weights: Vec<f32>, loss_fn: F) -> Self {
        Self { weights, loss_fn }
    }

    /// Current weights.
    pub fn weights(&self) -> &[f32] {
        &self.weights
    }
}

impl<F> ParameterModel for LossFnModel<F>
where
    F: Fn(&[f32]) -> f32,
{
    type Dataset = ();

    fn num_params(&self) -> usize {
        self.weights.len()
    }

    fn flat_params(&self) -> Result<Vec<f32>> {
        Ok(self.weights.clone())
    }

    fn load_flat_params(&mut self, params: &[f32]) -> Result<()> {
        if params.len() != self.weights.len() {
            return Err(LandscapeError::ParameterCountMismatch {
                expected: self.weights.len(),
                got: params.len(),
            });
        }
        self.weights.copy_from_slice(params);
        Ok(())
    }

    fn evaluate(&self, _data: &()) -> Result<Evaluation> {
        Ok(Evaluation::loss((self.loss_fn)(&self.weights)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quadratic(w: &[f32]) -> f32 {
        w.iter().map(|x| x * x).sum()
    }

    #[test]
    fn test_evaluate_at_restores() {
        let mut model = LossFnModel::new(vec![1.0, 2.0], quadratic);
        let eval = evaluate_at(&mut model, &[3.0, 4.0], &()).unwrap();

        assert_eq!(eval.loss, 25.0);
        assert_eq!(model.weights(), &[1.0, 2.0]);
    }

    #[test]
    fn test_evaluate_at_restores_on_error() {
        let mut model = LossFnModel::new(vec![1.0, 2.0], quadratic);
        let result = evaluate_at(&mut model, &[3.0], &());

        assert!(matches!(
            result,
            Err(LandscapeError::ParameterCountMismatch {
                expected: 2,
                got: 1
            })
        ));
        assert_eq!(model.weights(), &[1.0, 2.0]);
    }

    #[test]
    fn test_with_checkpoint_propagates_closure_error() {
        let mut model = LossFnModel::new(vec![0.5], quadratic);
        let result: Result<()> = with_checkpoint(&mut model, |m| {
            m.load_flat_params(&[9.0])?;
            Err(LandscapeError::evaluation("boom"))
        });

        assert!(matches!(result, Err(LandscapeError::Evaluation(_))));
        assert_eq!(model.weights(), &[0.5]);
    }
}
