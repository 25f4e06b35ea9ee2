//! Weighted sum of per-mission terminal outputs.

use std::fmt::Write as _;

use composer_core::CaseReader;
use serde::{Deserialize, Serialize};

/// Whether the compound objective is driven down or up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectiveSense {
    Minimize,
    #[default]
    Maximize,
}

impl ObjectiveSense {
    /// Scaler applied when handing the objective to a minimizing solver.
    pub fn scaler(self) -> f64 {
        match self {
            ObjectiveSense::Minimize => 1.0,
            ObjectiveSense::Maximize => -1.0,
        }
    }
}

/// One weighted contribution: `weight * <terminal value of source>`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectiveTerm {
    pub alias: String,
    pub source: String,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectiveAggregator {
    output: String,
    terms: Vec<ObjectiveTerm>,
}

impl ObjectiveAggregator {
    pub fn new(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            terms: Vec::new(),
        }
    }

    pub fn with_term(
        mut self,
        alias: impl Into<String>,
        source: impl Into<String>,
        weight: f64,
    ) -> Self {
        self.terms.push(ObjectiveTerm {
            alias: alias.into(),
            source: source.into(),
            weight,
        });
        self
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn terms(&self) -> &[ObjectiveTerm] {
        &self.terms
    }

    pub fn weights(&self) -> Vec<f64> {
        self.terms.iter().map(|t| t.weight).collect()
    }

    /// `Σ weight_i * output_i` over `(output, weight)` pairs. No normalization.
    pub fn value(outputs: &[(f64, f64)]) -> f64 {
        outputs
            .iter()
            .fold(0.0, |acc, (output, weight)| acc + weight * output)
    }

    /// Rendered as `<output>=<w0>*<alias0>+<w1>*<alias1>...`.
    pub fn expression(&self) -> String {
        let mut expr = format!("{}=", self.output);
        for (i, term) in self.terms.iter().enumerate() {
            if i > 0 {
                expr.push('+');
            }
            let _ = write!(expr, "{}*{}", term.weight, term.alias);
        }
        expr
    }

    /// Evaluate from the terminal value of each term's source. `None` if any is missing.
    pub fn evaluate(&self, reader: &impl CaseReader) -> Option<f64> {
        let pairs = self
            .terms
            .iter()
            .map(|term| reader.terminal(&term.source).map(|v| (v, term.weight)))
            .collect::<Option<Vec<_>>>()?;
        Some(Self::value(&pairs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use composer_core::Case;

    #[test]
    fn empty_sum_is_zero() {
        assert_eq!(ObjectiveAggregator::value(&[]), 0.0);
    }

    #[test]
    fn expression_lists_weighted_aliases() {
        let agg = ObjectiveAggregator::new("compound_range")
            .with_term("r0", "group_0.traj.descent.states:r", 2.0)
            .with_term("r1", "group_1.traj.descent.states:r", 1.2);
        assert_eq!(agg.expression(), "compound_range=2*r0+1.2*r1");
    }

    #[test]
    fn evaluate_reads_terminal_nodes() {
        let agg = ObjectiveAggregator::new("compound_range")
            .with_term("r0", "a", 2.0)
            .with_term("r1", "b", 0.5);
        let mut case = Case::new();
        case.set_val("a", vec![0.0, 10.0]);
        assert_eq!(agg.evaluate(&case), None);
        case.set_val("b", vec![0.0, 4.0]);
        assert_eq!(agg.evaluate(&case), Some(22.0));
    }
}
