//! Solver configuration
//!
//! [`SvmParameter`] is the plain configuration record handed to the solver.
//! [`Parameter`] is the long-lived entity a handle refers to; it embeds the
//! record by value and adds nothing the solver would see.

use crate::core::{KernelType, SvmType};
use serde::{Deserialize, Serialize};

/// Flat solver configuration
///
/// Fields are stored verbatim. Cross-field consistency (for example
/// `nr_weight` against the weight arrays) is checked by the solver when a
/// model is trained, not here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SvmParameter {
    pub svm_type: SvmType,
    pub kernel_type: KernelType,
    /// Degree of the polynomial kernel
    pub degree: i32,
    /// Kernel gamma; 0 means `1 / columns` at training time
    pub gamma: f64,
    /// Independent term of the polynomial and sigmoid kernels
    pub coef0: f64,
    /// Kernel cache size in MB
    pub cache_size: f64,
    /// Stopping tolerance
    pub eps: f64,
    /// Cost parameter for C-SVC, epsilon-SVR and nu-SVR
    pub c: f64,
    /// Declared length of `weight_label` and `weight`
    pub nr_weight: i32,
    pub weight_label: Vec<i32>,
    pub weight: Vec<f64>,
    /// nu for nu-SVC, one-class and nu-SVR
    pub nu: f64,
    /// Width of the epsilon tube for epsilon-SVR
    pub p: f64,
    pub shrinking: bool,
    pub probability: bool,
}

impl Default for SvmParameter {
    fn default() -> Self {
        Self {
            svm_type: SvmType::CSvc,
            kernel_type: KernelType::Rbf,
            degree: 3,
            gamma: 0.0,
            coef0: 0.0,
            cache_size: 100.0,
            eps: 1e-3,
            c: 1.0,
            nr_weight: 0,
            weight_label: Vec::new(),
            weight: Vec::new(),
            nu: 0.5,
            p: 0.1,
            shrinking: true,
            probability: false,
        }
    }
}

/// Parameter entity owned by a handle
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    config: SvmParameter,
}

impl Parameter {
    /// Wrap a configuration record; no validation happens here
    pub fn new(config: SvmParameter) -> Self {
        Self { config }
    }

    /// Start a builder from the default configuration
    pub fn builder() -> ParameterBuilder {
        ParameterBuilder::default()
    }

    pub fn config(&self) -> &SvmParameter {
        &self.config
    }

    /// Every field as a key-value record
    ///
    /// Enums are reported by their integer code and flags as 0/1.
    pub fn query(&self) -> Vec<(&'static str, f64)> {
        let c = &self.config;
        vec![
            ("svm_type", c.svm_type.code() as f64),
            ("kernel_type", c.kernel_type.code() as f64),
            ("degree", c.degree as f64),
            ("gamma", c.gamma),
            ("coef0", c.coef0),
            ("cache_size", c.cache_size),
            ("eps", c.eps),
            ("C", c.c),
            ("nr_weight", c.nr_weight as f64),
            ("nu", c.nu),
            ("p", c.p),
            ("shrinking", if c.shrinking { 1.0 } else { 0.0 }),
            ("probability", if c.probability { 1.0 } else { 0.0 }),
        ]
    }
}

impl Default for Parameter {
    fn default() -> Self {
        Self::new(SvmParameter::default())
    }
}

impl From<SvmParameter> for Parameter {
    fn from(config: SvmParameter) -> Self {
        Self::new(config)
    }
}

/// Builder for [`Parameter`]
#[derive(Debug, Clone, Default)]
pub struct ParameterBuilder {
    config: SvmParameter,
}

impl ParameterBuilder {
    pub fn with_svm_type(mut self, svm_type: SvmType) -> Self {
        self.config.svm_type = svm_type;
        self
    }

    pub fn with_kernel_type(mut self, kernel_type: KernelType) -> Self {
        self.config.kernel_type = kernel_type;
        self
    }

    pub fn with_degree(mut self, degree: i32) -> Self {
        self.config.degree = degree;
        self
    }

    pub fn with_gamma(mut self, gamma: f64) -> Self {
        self.config.gamma = gamma;
        self
    }

    pub fn with_coef0(mut self, coef0: f64) -> Self {
        self.config.coef0 = coef0;
        self
    }

    /// Set kernel cache size in MB
    pub fn with_cache_size(mut self, cache_size: f64) -> Self {
        self.config.cache_size = cache_size;
        self
    }

    pub fn with_eps(mut self, eps: f64) -> Self {
        self.config.eps = eps;
        self
    }

    pub fn with_c(mut self, c: f64) -> Self {
        self.config.c = c;
        self
    }

    /// Set per-class weights; `nr_weight` follows the number of pairs
    pub fn with_weights(mut self, weights: &[(i32, f64)]) -> Self {
        self.config.nr_weight = weights.len() as i32;
        self.config.weight_label = weights.iter().map(|&(label, _)| label).collect();
        self.config.weight = weights.iter().map(|&(_, w)| w).collect();
        self
    }

    /// Set `nr_weight` alone, leaving the weight arrays untouched
    pub fn with_nr_weight(mut self, nr_weight: i32) -> Self {
        self.config.nr_weight = nr_weight;
        self
    }

    pub fn with_nu(mut self, nu: f64) -> Self {
        self.config.nu = nu;
        self
    }

    pub fn with_p(mut self, p: f64) -> Self {
        self.config.p = p;
        self
    }

    pub fn with_shrinking(mut self, shrinking: bool) -> Self {
        self.config.shrinking = shrinking;
        self
    }

    pub fn with_probability(mut self, probability: bool) -> Self {
        self.config.probability = probability;
        self
    }

    pub fn build(self) -> Parameter {
        Parameter::new(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(record: &[(&'static str, f64)], key: &str) -> f64 {
        record
            .iter()
            .find(|(k, _)| *k == key)
            .map(|&(_, v)| v)
            .expect("key should be present")
    }

    #[test]
    fn test_default_query() {
        let record = Parameter::default().query();
        assert_eq!(record.len(), 13);
        assert_eq!(lookup(&record, "svm_type"), 0.0);
        assert_eq!(lookup(&record, "kernel_type"), 2.0);
        assert_eq!(lookup(&record, "degree"), 3.0);
        assert_eq!(lookup(&record, "gamma"), 0.0);
        assert_eq!(lookup(&record, "coef0"), 0.0);
        assert_eq!(lookup(&record, "cache_size"), 100.0);
        assert_eq!(lookup(&record, "eps"), 1e-3);
        assert_eq!(lookup(&record, "C"), 1.0);
        assert_eq!(lookup(&record, "nr_weight"), 0.0);
        assert_eq!(lookup(&record, "nu"), 0.5);
        assert_eq!(lookup(&record, "p"), 0.1);
        assert_eq!(lookup(&record, "shrinking"), 1.0);
        assert_eq!(lookup(&record, "probability"), 0.0);
    }

    #[test]
    fn test_query_key_order() {
        let keys: Vec<&str> = Parameter::default().query().iter().map(|(k, _)| *k).collect();
        assert_eq!(
            &keys[..9],
            &[
                "svm_type",
                "kernel_type",
                "degree",
                "gamma",
                "coef0",
                "cache_size",
                "eps",
                "C",
                "nr_weight"
            ]
        );
    }

    #[test]
    fn test_builder_copies_fields_verbatim() {
        // Nonsensical pairings are accepted; the solver rejects them later.
        let param = Parameter::builder()
            .with_svm_type(SvmType::NuSvr)
            .with_kernel_type(KernelType::Linear)
            .with_degree(-4)
            .with_nu(7.0)
            .with_cache_size(-1.0)
            .build();

        assert_eq!(param.config().svm_type, SvmType::NuSvr);
        assert_eq!(param.config().degree, -4);
        assert_eq!(param.config().nu, 7.0);
        assert_eq!(param.config().cache_size, -1.0);
    }

    #[test]
    fn test_with_weights_sets_count() {
        let param = Parameter::builder()
            .with_weights(&[(1, 2.0), (-1, 0.5)])
            .build();
        assert_eq!(param.config().nr_weight, 2);
        assert_eq!(param.config().weight_label, vec![1, -1]);
        assert_eq!(param.config().weight, vec![2.0, 0.5]);
    }
}
