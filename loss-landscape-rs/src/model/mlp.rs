//! Candle-backed multilayer perceptron classifier.
//!
//! Fully connected layers with ReLU between them and softmax cross-entropy
//! on the logits. Parameters are held as [`Var`]s so the same model can be
//! trained with a candle optimizer and then evaluated on the loss grid.
//!
//! Flattening order: for each layer, the `(out, in)` weight matrix in
//! row-major order, then the bias.

use candle_core::{DType, Device, Tensor, Var, D};
use rand_chacha::rand_core::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, StandardNormal};

use super::{Evaluation, ParameterModel};
use crate::error::{LandscapeError, Result};

/// Inputs and integer class labels for a classification model.
#[derive(Debug, Clone)]
pub struct ClassificationDataset {
    inputs: Tensor,
    labels: Tensor,
    len: usize,
    input_dim: usize,
    num_classes: usize,
}

impl ClassificationDataset {
    /// Build a dataset from row vectors and labels.
    pub fn new(inputs: Vec<Vec<f32>>, labels: Vec<u32>, device: &Device) -> Result<Self> {
        if inputs.is_empty() {
            return Err(LandscapeError::invalid_config("dataset has no samples"));
        }
        if inputs.len() != labels.len() {
            return Err(LandscapeError::invalid_config(format!(
                "dataset has {} inputs but {} labels",
                inputs.len(),
                labels.len()
            )));
        }

        let len = inputs.len();
        let input_dim = inputs[0].len();
        let mut flat = Vec::with_capacity(len * input_dim);
        for (i, row) in inputs.into_iter().enumerate() {
            if row.len() != input_dim {
                return Err(LandscapeError::invalid_config(format!(
                    "sample {} has {} features, expected {}",
                    i,
                    row.len(),
                    input_dim
                )));
            }
            flat.extend(row);
        }
        let num_classes = labels.iter().copied().max().map_or(0, |m| m as usize + 1);

        Ok(Self {
            inputs: Tensor::from_vec(flat, (len, input_dim), device)?,
            labels: Tensor::from_vec(labels, len, device)?,
            len,
            input_dim,
            num_classes,
        })
    }

    /// Input tensor `(len, input_dim)`.
    pub fn inputs(&self) -> &Tensor {
        &self.inputs
    }

    /// Label tensor `(len,)`, `u32`.
    pub fn labels(&self) -> &Tensor {
        &self.labels
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the dataset is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Features per sample.
    pub fn input_dim(&self) -> usize {
        self.input_dim
    }

    /// Number of distinct classes (largest label + 1).
    pub fn num_classes(&self) -> usize {
        self.num_classes
    }
}

#[derive(Debug)]
struct DenseLayer {
    weight: Var,
    bias: Var,
    in_dim: usize,
    out_dim: usize,
}

impl DenseLayer {
    fn param_count(&self) -> usize {
        self.out_dim * self.in_dim + self.out_dim
    }
}

/// Fully connected ReLU classifier.
#[derive(Debug)]
pub struct MlpClassifier {
    layers: Vec<DenseLayer>,
    layer_sizes: Vec<usize>,
    device: Device,
}

impl MlpClassifier {
    /// Create a classifier with layer widths `layer_sizes` (input first,
    /// classes last), initialised deterministically from `seed`.
    ///
    /// Weights are drawn from `N(0, 1/fan_in)`, biases start at zero.
    pub fn new(layer_sizes: &[usize], seed: u64, device: &Device) -> Result<Self> {
        if layer_sizes.len() < 2 {
            return Err(LandscapeError::invalid_config(
                "an MLP needs at least an input and an output layer",
            ));
        }
        if layer_sizes.contains(&0) {
            return Err(LandscapeError::invalid_config("layer sizes must be positive"));
        }

        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut layers = Vec::with_capacity(layer_sizes.len() - 1);
        for pair in layer_sizes.windows(2) {
            let (in_dim, out_dim) = (pair[0], pair[1]);
            let scale = (1.0 / in_dim as f64).sqrt();
            let weights: Vec<f32> = (0..out_dim * in_dim)
                .map(|_| {
                    let val: f64 = StandardNormal.sample(&mut rng);
                    (val * scale) as f32
                })
                .collect();

            let weight = Var::from_tensor(&Tensor::from_vec(weights, (out_dim, in_dim), device)?)?;
            let bias = Var::from_tensor(&Tensor::zeros(out_dim, DType::F32, device)?)?;
            layers.push(DenseLayer {
                weight,
                bias,
                in_dim,
                out_dim,
            });
        }

        Ok(Self {
            layers,
            layer_sizes: layer_sizes.to_vec(),
            device: device.clone(),
        })
    }

    /// Create a classifier and load `params` into it.
    pub fn from_flat_params(
        layer_sizes: &[usize],
        params: &[f32],
        device: &Device,
    ) -> Result<Self> {
        let mut model = Self::new(layer_sizes, 0, device)?;
        model.load_flat_params(params)?;
        Ok(model)
    }

    /// Layer widths, input first.
    pub fn layer_sizes(&self) -> &[usize] {
        &self.layer_sizes
    }

    /// Trainable variables, in flattening order.
    pub fn vars(&self) -> Vec<Var> {
        self.layers
            .iter()
            .flat_map(|l| [l.weight.clone(), l.bias.clone()])
            .collect()
    }

    /// Logits for a batch `(n, input_dim)`.
    pub fn forward(&self, x: &Tensor) -> candle_core::Result<Tensor> {
        let last = self.layers.len() - 1;
        let mut h = x.clone();
        for (i, layer) in self.layers.iter().enumerate() {
            h = h.matmul(&layer.weight.t()?)?.broadcast_add(&layer.bias)?;
            if i < last {
                h = h.relu()?;
            }
        }
        Ok(h)
    }

    /// Mean cross-entropy loss tensor, differentiable for training.
    pub fn loss(&self, data: &ClassificationDataset) -> candle_core::Result<Tensor> {
        let logits = self.forward(data.inputs())?;
        candle_nn::loss::cross_entropy(&logits, data.labels())
    }

    fn evaluate_tensors(&self, data: &ClassificationDataset) -> candle_core::Result<Evaluation> {
        let logits = self.forward(data.inputs())?;
        let loss = candle_nn::loss::cross_entropy(&logits, data.labels())?.to_scalar::<f32>()?;
        let accuracy = logits
            .argmax(D::Minus1)?
            .eq(data.labels())?
            .to_dtype(DType::F32)?
            .mean_all()?
            .to_scalar::<f32>()?;
        Ok(Evaluation {
            loss,
            accuracy: Some(accuracy),
        })
    }
}

impl ParameterModel for MlpClassifier {
    type Dataset = ClassificationDataset;

    fn num_params(&self) -> usize {
        self.layers.iter().map(DenseLayer::param_count).sum()
    }

    fn flat_params(&self) -> Result<Vec<f32>> {
        let mut flat = Vec::with_capacity(self.num_params());
        for layer in &self.layers {
            flat.extend(layer.weight.flatten_all()?.to_vec1::<f32>()?);
            flat.extend(layer.bias.to_vec1::<f32>()?);
        }
        Ok(flat)
    }

    fn load_flat_params(&mut self, params: &[f32]) -> Result<()> {
        let expected = self.num_params();
        if params.len() != expected {
            return Err(LandscapeError::ParameterCountMismatch {
                expected,
                got: params.len(),
            });
        }

        let mut offset = 0;
        for layer in &self.layers {
            let w_len = layer.out_dim * layer.in_dim;
            let weight = Tensor::from_slice(
                &params[offset..offset + w_len],
                (layer.out_dim, layer.in_dim),
                &self.device,
            )?;
            offset += w_len;
            let bias = Tensor::from_slice(
                &params[offset..offset + layer.out_dim],
                layer.out_dim,
                &self.device,
            )?;
            offset += layer.out_dim;

            layer.weight.set(&weight)?;
            layer.bias.set(&bias)?;
        }
        Ok(())
    }

    fn evaluate(&self, data: &ClassificationDataset) -> Result<Evaluation> {
        self.evaluate_tensors(data)
            .map_err(|e| LandscapeError::evaluation(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy_data() -> ClassificationDataset {
        ClassificationDataset::new(
            vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![-1.0, 0.0], vec![0.0, -1.0]],
            vec![0, 1, 0, 1],
            &Device::Cpu,
        )
        .unwrap()
    }

    #[test]
    fn test_param_count_and_roundtrip() {
        let mut model = MlpClassifier::new(&[2, 5, 3], 1, &Device::Cpu).unwrap();
        // 2*5 + 5 + 5*3 + 3
        assert_eq!(model.num_params(), 33);

        let params: Vec<f32> = (0..33).map(|i| i as f32 * 0.01).collect();
        model.load_flat_params(&params).unwrap();
        assert_eq!(model.flat_params().unwrap(), params);
    }

    #[test]
    fn test_flatten_order_weight_then_bias() {
        let params: Vec<f32> = (0..9).map(|i| i as f32).collect();
        // 2 -> 3: weight (3, 2) = [0..6], bias = [6, 7, 8]
        let model = MlpClassifier::from_flat_params(&[2, 3], &params, &Device::Cpu).unwrap();
        let x = Tensor::new(&[[1.0f32, 0.0]], &Device::Cpu).unwrap();
        let out: Vec<Vec<f32>> = model.forward(&x).unwrap().to_vec2().unwrap();

        // row i of the weight dotted with [1, 0] is weight[i][0] = 2i, plus bias
        assert_eq!(out, vec![vec![6.0, 9.0, 12.0]]);
    }

    #[test]
    fn test_deterministic_init() {
        let a = MlpClassifier::new(&[2, 4, 2], 9, &Device::Cpu).unwrap();
        let b = MlpClassifier::new(&[2, 4, 2], 9, &Device::Cpu).unwrap();
        assert_eq!(a.flat_params().unwrap(), b.flat_params().unwrap());
    }

    #[test]
    fn test_evaluate_zero_weights() {
        let model = MlpClassifier::from_flat_params(&[2, 2], &[0.0; 6], &Device::Cpu).unwrap();
        let eval = model.evaluate(&toy_data()).unwrap();

        // Uniform logits over two classes: loss = ln 2
        assert!((eval.loss - std::f32::consts::LN_2).abs() < 1e-5);
        assert!(eval.accuracy.is_some());
    }

    #[test]
    fn test_wrong_length_rejected() {
        let mut model = MlpClassifier::new(&[2, 2], 0, &Device::Cpu).unwrap();
        assert!(matches!(
            model.load_flat_params(&[0.0; 5]),
            Err(LandscapeError::ParameterCountMismatch {
                expected: 6,
                got: 5
            })
        ));
    }

    #[test]
    fn test_input_shape_mismatch_is_evaluation_error() {
        let model = MlpClassifier::new(&[3, 2], 0, &Device::Cpu).unwrap();
        assert!(matches!(
            model.evaluate(&toy_data()),
            Err(LandscapeError::Evaluation(_))
        ));
    }

    #[test]
    fn test_dataset_validation() {
        let device = Device::Cpu;
        assert!(ClassificationDataset::new(vec![], vec![], &device).is_err());
        assert!(ClassificationDataset::new(vec![vec![1.0]], vec![0, 1], &device).is_err());
        assert!(
            ClassificationDataset::new(vec![vec![1.0], vec![1.0, 2.0]], vec![0, 1], &device)
                .is_err()
        );

        let data = toy_data();
        assert_eq!(data.len(), 4);
        assert_eq!(data.input_dim(), 2);
        assert_eq!(data.num_classes(), 2);
    }
}
