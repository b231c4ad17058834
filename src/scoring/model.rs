//! Scoring models.

use crate::error::{Error, Result};

/// A loaded model that maps a feature vector to a score.
pub trait Model: Send + Sync {
    /// Score one feature vector.
    fn score(&self, features: &[f32]) -> Result<f32>;

    /// Model name, for logs.
    fn name(&self) -> &str;

    /// Expected input length, if fixed.
    fn dimension(&self) -> Option<usize> {
        None
    }
}

/// Output link function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Link {
    /// Raw linear output.
    #[default]
    Identity,
    /// Logistic sigmoid, for probabilities.
    Logistic,
}

impl Link {
    #[inline]
    fn apply(self, x: f32) -> f32 {
        match self {
            Link::Identity => x,
            Link::Logistic => 1.0 / (1.0 + (-x).exp()),
        }
    }
}

/// Generalized linear model: `link(w · x + b)`.
#[derive(Debug, Clone)]
pub struct LinearModel {
    name: String,
    weights: Vec<f32>,
    bias: f32,
    link: Link,
}

impl LinearModel {
    /// Create a linear model with identity link.
    pub fn new(weights: Vec<f32>, bias: f32) -> Self {
        Self {
            name: String::from("linear"),
            weights,
            bias,
            link: Link::Identity,
        }
    }

    /// Set the link function.
    pub fn with_link(mut self, link: Link) -> Self {
        self.link = link;
        self
    }

    /// Set a custom name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// The link function in use.
    pub fn link(&self) -> Link {
        self.link
    }
}

impl Model for LinearModel {
    fn score(&self, features: &[f32]) -> Result<f32> {
        if features.len() != self.weights.len() {
            return Err(Error::Model(format!(
                "model '{}': expected {} features, got {}",
                self.name,
                self.weights.len(),
                features.len()
            )));
        }
        let dot: f32 = self
            .weights
            .iter()
            .zip(features)
            .map(|(w, x)| w * x)
            .sum();
        Ok(self.link.apply(dot + self.bias))
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn dimension(&self) -> Option<usize> {
        Some(self.weights.len())
    }
}
