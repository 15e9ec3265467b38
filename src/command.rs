//! Textual entry points: token lists in, user-facing messages out.

use crate::dataset::{DataMatrix, FittingContext};
use crate::error::FitError;
use crate::fit::{fit, FitOptions};
use crate::models::ModelRegistry;

const INVALID_PARAMETERS: &str = "Invalid Parameters!  Try Function: ap .";
const INVALID_LINKS: &str = "Parameter Linking Scheme is Invalid!";
const UNEQUAL_POINTS: &str =
    "All Buffers Must Be the Same Number of Points!  Try Commands: pl or res or tri";

/// Fit the datasets in `ctx` and describe the outcome.
///
/// Tokens follow [`FitOptions::from_tokens`]: an integer evaluation budget
/// and `-debug`; anything else is ignored.
pub fn fit_command(
    matrix: &mut DataMatrix,
    registry: &ModelRegistry,
    ctx: &FittingContext,
    tokens: &[&str],
) -> String {
    match fit(matrix, registry, ctx, FitOptions::from_tokens(tokens)) {
        Ok(_) => "Data Fitting Complete!".to_string(),
        Err(err) => fit_message(&err),
    }
}

/// The message shown for a fit that did not complete.
pub fn fit_message(err: &FitError) -> String {
    match err {
        FitError::UninitializedParameters { .. } | FitError::InvalidParameters(_) => {
            INVALID_PARAMETERS.to_string()
        }
        FitError::LinkingScheme { .. } => INVALID_LINKS.to_string(),
        FitError::ShapeMismatch { .. } => UNEQUAL_POINTS.to_string(),
        FitError::SolverFailure(reason) => format!("Fit Failed!\n\t{}", reason),
        other => format!("Fit Failed!\n\t{}", other),
    }
}

/// Catalog help. No tokens lists the function table; `info` or `?`,
/// optionally followed by a model id, shows help for that model or the
/// catalog summary.
pub fn function_command(registry: &ModelRegistry, tokens: &[&str]) -> String {
    match tokens {
        [] => registry.table(),
        [cmd, rest @ ..] if is_info(cmd) => {
            let id = rest.first().and_then(|t| t.trim().parse().ok());
            registry.info(id)
        }
        _ => registry.info(None),
    }
}

fn is_info(token: &str) -> bool {
    token.eq_ignore_ascii_case("info") || token == "?"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Dataset;
    use crate::model::apply_models;
    use ndarray::{array, Array1};

    fn registry() -> &'static ModelRegistry {
        ModelRegistry::builtin()
    }

    #[test]
    fn test_fit_messages() {
        let mut matrix = DataMatrix::new();
        matrix.push(Dataset::new(array![0.0, 1.0, 2.0], array![1.0, 1.0, 1.0]));
        let ctx = FittingContext::all();
        assert_eq!(fit_command(&mut matrix, registry(), &ctx, &[]), INVALID_PARAMETERS);

        apply_models(&mut matrix, registry(), &ctx, &[1]).unwrap();
        let mut second = Dataset::new(array![0.0, 1.0], array![1.0, 1.0]);
        second.fit = matrix.get(0).unwrap().fit.clone();
        matrix.push(second);
        assert_eq!(fit_command(&mut matrix, registry(), &ctx, &[]), UNEQUAL_POINTS);

        let ctx = FittingContext::span(0, 0);
        matrix.get_mut(0).unwrap().fit.links[0] = Some("Missing_1_1".to_string());
        assert_eq!(fit_command(&mut matrix, registry(), &ctx, &[]), INVALID_LINKS);
    }

    #[test]
    fn test_fit_complete_and_failed() {
        let mut matrix = DataMatrix::new();
        let x = Array1::linspace(0.0, 4.0, 5);
        matrix.push(Dataset::new(x, array![2.0, 2.0, 2.0, 2.0, 2.0]));
        let ctx = FittingContext::all();
        apply_models(&mut matrix, registry(), &ctx, &[1]).unwrap();

        let failed = fit_command(&mut matrix, registry(), &ctx, &["1"]);
        assert!(failed.starts_with("Fit Failed!\n\t"));
        assert!(matrix.get(0).unwrap().fit.fit_failed);

        matrix.get_mut(0).unwrap().fit.parameters[0] = 0.0;
        let done = fit_command(&mut matrix, registry(), &ctx, &["fit", "-debug"]);
        assert_eq!(done, "Data Fitting Complete!");
        assert!(!matrix.get(0).unwrap().fit.fit_failed);
    }

    #[test]
    fn test_function_command() {
        assert_eq!(function_command(registry(), &["info", "27"]), registry().info(Some(27)));
        assert_eq!(function_command(registry(), &["?"]), registry().info(None));
        assert_eq!(function_command(registry(), &["info", "abc"]), registry().info(None));
        assert_eq!(function_command(registry(), &[]), registry().table());
    }
}
