//! The outcome of a successful fit.

use crate::uncertainty::GoodnessOfFit;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One fitted parameter as reported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportedParameter {
    pub name: String,
    /// 0-based dataset index
    pub dataset: usize,
    /// Position in the dataset's parameter vector
    pub slot: usize,
    pub value: f64,
    /// NaN when it could not be estimated
    #[serde(with = "crate::utils::serde_nan")]
    pub stderr: f64,
    pub vary: bool,
    pub expr: Option<String>,
}

/// Aggregate diagnostics and fitted values of a fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitReport {
    /// Objective evaluations, Jacobian columns included
    pub nfev: usize,
    pub statistics: GoodnessOfFit,
    pub message: String,
    pub parameters: Vec<ReportedParameter>,
}

impl FitReport {
    pub fn ndata(&self) -> usize {
        self.statistics.ndata
    }

    pub fn nvarys(&self) -> usize {
        self.statistics.nvarys
    }

    pub fn chisqr(&self) -> f64 {
        self.statistics.chisqr
    }

    pub fn redchi(&self) -> f64 {
        self.statistics.redchi
    }

    pub fn aic(&self) -> f64 {
        self.statistics.aic
    }

    pub fn bic(&self) -> f64 {
        self.statistics.bic
    }

    pub fn parameter(&self, name: &str) -> Option<&ReportedParameter> {
        self.parameters.iter().find(|p| p.name == name)
    }
}

impl fmt::Display for FitReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = &self.statistics;
        writeln!(f, "[[Fit Statistics]]")?;
        writeln!(f, "    # function evals   = {}", self.nfev)?;
        writeln!(f, "    # data points      = {}", s.ndata)?;
        writeln!(f, "    # variables        = {}", s.nvarys)?;
        writeln!(f, "    chi-square         = {:.8e}", s.chisqr)?;
        writeln!(f, "    reduced chi-square = {:.8e}", s.redchi)?;
        writeln!(f, "    Akaike info crit   = {:.6}", s.aic)?;
        writeln!(f, "    Bayesian info crit = {:.6}", s.bic)?;
        writeln!(f, "[[Variables]]")?;

        let width = self.parameters.iter().map(|p| p.name.len()).max().unwrap_or(0) + 1;
        for p in &self.parameters {
            let label = format!("{}:", p.name);
            write!(f, "    {:<width$} {:.8e}", label, p.value, width = width)?;
            match &p.expr {
                Some(expr) => writeln!(f, " +/- {:.8e} == '{}'", p.stderr, expr)?,
                None if !p.vary => writeln!(f, " (fixed)")?,
                None => writeln!(f, " +/- {:.8e}", p.stderr)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> FitReport {
        FitReport {
            nfev: 12,
            statistics: GoodnessOfFit::new(6, 1, 0.5),
            message: "ok".to_string(),
            parameters: vec![
                ReportedParameter {
                    name: "Add_Constant_1_1".to_string(),
                    dataset: 0,
                    slot: 0,
                    value: 3.0,
                    stderr: 0.1,
                    vary: true,
                    expr: None,
                },
                ReportedParameter {
                    name: "Add_Constant_1_2".to_string(),
                    dataset: 1,
                    slot: 0,
                    value: 3.0,
                    stderr: f64::NAN,
                    vary: true,
                    expr: Some("Add_Constant_1_1".to_string()),
                },
            ],
        }
    }

    #[test]
    fn test_display() {
        let text = report().to_string();
        assert!(text.contains("# function evals   = 12"));
        assert!(text.contains("# data points      = 6"));
        assert!(text.contains("== 'Add_Constant_1_1'"));
    }

    #[test]
    fn test_json_round_trip_with_nan() {
        let report = report();
        let json = serde_json::to_string(&report).unwrap();
        let back: FitReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back.nfev, 12);
        assert!(back.parameters[1].stderr.is_nan());
        assert_eq!(back.parameter("Add_Constant_1_1").unwrap().value, 3.0);
    }
}
