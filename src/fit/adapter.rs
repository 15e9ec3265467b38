//! Running the solver over a dataset range and storing the outcome.

use crate::dataset::{DataMatrix, Dataset, FittingContext, Trace};
use crate::error::{FitError, Result};
use crate::fit::objective::{dataset_residuals, DatasetResiduals, GlobalObjective};
use crate::fit::options::{FitOptions, NanPolicy};
use crate::fit::report::{FitReport, ReportedParameter};
use crate::fit::sampler::generate_model;
use crate::fit::session::OptimizationSession;
use crate::lm::{IterationReport, LevenbergMarquardt, LmResult};
use crate::model::ComposedModel;
use crate::models::ModelRegistry;
use crate::parameters::Parameters;
use crate::problem::Problem;
use crate::uncertainty::{parameter_standard_errors, GoodnessOfFit};
use ndarray::{array, Array1};
use std::ops::RangeInclusive;

// Everything a converged solve leaves behind, computed before any dataset
// is touched.
struct Solution {
    params: Parameters,
    errors: Vec<f64>,
    per_dataset: Vec<DatasetResiduals>,
    statistics: GoodnessOfFit,
    nfev: usize,
    message: String,
}

/// Fit every dataset in the context's range at once.
///
/// Problems found before the solver starts (no parameters, a bad link,
/// unequal point counts) are returned as their own error kinds and leave the
/// datasets untouched. When the solver fails, is cancelled, or a model cannot
/// be evaluated, every dataset in range is marked failed and
/// [`FitError::SolverFailure`] is returned with the reason. Its parameters
/// and errors become `-1` once per parameter of the whole fit, and its
/// display curve is cut to the first and last data points.
pub fn fit(
    matrix: &mut DataMatrix,
    registry: &ModelRegistry,
    ctx: &FittingContext,
    mut options: FitOptions,
) -> Result<FitReport> {
    let range = matrix.indices(ctx.range)?;
    let session = OptimizationSession::build(matrix, registry, range.clone())?;
    let initial = session.parameters().varying_internal_values()?;

    let budget = options.evaluation_budget(session.parameter_count());
    let solver = LevenbergMarquardt::new().with_max_evaluations(budget);
    log::debug!(
        "fitting datasets {}..={}: {} parameters, {} varying, budget {} evaluations",
        range.start(),
        range.end(),
        session.parameter_count(),
        session.varying_count(),
        budget
    );

    let debug = options.debug;
    let mut user_observer = options.observer.take();
    let mut observe = |report: &IterationReport| {
        if debug {
            log::debug!("Iteration {}\tRsq: {}", report.nfev, report.sum_sq);
        }
        if let Some(callback) = user_observer.as_mut() {
            callback(report);
        }
    };

    let outcome = {
        let objective =
            GlobalObjective::new(&session, matrix, options.nan_policy, options.cancel.clone());
        solver
            .minimize_observed(&objective, initial, &mut observe)
            .and_then(|result| solution(&objective, result))
    };

    match outcome {
        Ok(solution) => Ok(store(matrix, &session, solution, options.sample_points)),
        Err(err) => {
            let reason = match err {
                FitError::Cancelled => "fit cancelled".to_string(),
                FitError::SolverFailure(message) => message,
                other => other.to_string(),
            };
            log::warn!("fit failed: {}", reason);
            mark_failed(matrix, range, &reason, session.parameter_count());
            Err(FitError::SolverFailure(reason))
        }
    }
}

fn solution(objective: &GlobalObjective<'_>, result: LmResult) -> Result<Solution> {
    if !result.success {
        return Err(FitError::SolverFailure(result.message));
    }

    let squared = objective.eval(&result.params)?;
    let (params, per_dataset) = objective.latest();
    let chisqr = squared.iter().map(|r| r * r).sum();
    let statistics = GoodnessOfFit::new(squared.len(), objective.parameter_count(), chisqr);

    let errors = match standard_errors(&params, &result, statistics.redchi) {
        Ok(errors) => errors,
        Err(e) => {
            log::warn!("parameter uncertainties could not be estimated: {}", e);
            vec![f64::NAN; params.len()]
        }
    };
    // fixed parameters carry no uncertainty
    let errors = params
        .iter()
        .zip(errors)
        .map(|(p, err)| if p.vary || p.expr().is_some() { err } else { 0.0 })
        .collect();

    Ok(Solution {
        params,
        errors,
        per_dataset,
        statistics,
        nfev: result.func_evals,
        message: result.message,
    })
}

fn standard_errors(params: &Parameters, result: &LmResult, redchi: f64) -> Result<Vec<f64>> {
    let jacobian = result.jacobian.as_ref().ok_or(FitError::SingularMatrix)?;
    let sensitivity = params.external_sensitivity(&result.params.to_vec())?;
    let errors = parameter_standard_errors(jacobian, redchi, &sensitivity)?;
    Ok(errors.to_vec())
}

fn store(
    matrix: &mut DataMatrix,
    session: &OptimizationSession,
    solution: Solution,
    sample_points: usize,
) -> FitReport {
    let values = solution.params.values();
    let all: Vec<_> = solution.params.iter().collect();
    let mut reported = Vec::with_capacity(all.len());
    let mut omitted = 0;

    for (entry, part) in session.entries().iter().zip(solution.per_dataset) {
        for (slot, &k) in entry.param_indices.iter().enumerate() {
            reported.push(ReportedParameter {
                name: all[k].name().to_string(),
                dataset: entry.index,
                slot,
                value: values[k],
                stderr: solution.errors[k],
                vary: all[k].is_free(),
                expr: all[k].expr().map(str::to_string),
            });
        }

        let Some(dataset) = matrix.get_mut(entry.index) else { continue };
        let fit = &mut dataset.fit;
        fit.parameters = entry.param_indices.iter().map(|&k| values[k]).collect();
        fit.errors = entry.param_indices.iter().map(|&k| solution.errors[k]).collect();
        fit.fit_failed = false;
        fit.failure_reason = None;
        omitted += part.omitted;
        store_residuals(dataset, part);

        let params = dataset.fit.parameters.clone();
        dataset.model = display_curve(dataset, &entry.model, &params, sample_points);
    }

    if omitted > 0 {
        log::warn!("{} non-finite residuals were omitted at the solution", omitted);
    }

    let report = FitReport {
        nfev: solution.nfev,
        statistics: solution.statistics,
        message: solution.message,
        parameters: reported,
    };
    log::info!("fit converged: {}\n{}", report.message, report);
    report
}

fn store_residuals(dataset: &mut Dataset, part: DatasetResiduals) {
    dataset.residuals = Trace::new(dataset.data.x.clone(), part.residuals);
    dataset.fit.rsq = part.statistics.rsq;
    dataset.fit.chisq = part.statistics.chisq;
}

fn display_curve(dataset: &Dataset, model: &ComposedModel, params: &[f64], points: usize) -> Trace {
    generate_model(dataset, model, params, points).unwrap_or_else(|e| {
        log::warn!("display curve could not be generated: {}", e);
        Trace::default()
    })
}

fn endpoints(values: &Array1<f64>) -> Array1<f64> {
    match values.len() {
        0 | 1 => Array1::zeros(0),
        n => array![values[0], values[n - 1]],
    }
}

fn mark_failed(
    matrix: &mut DataMatrix,
    range: RangeInclusive<usize>,
    reason: &str,
    count: usize,
) {
    for i in range {
        let Some(dataset) = matrix.get_mut(i) else { continue };
        dataset.fit.mark_failed(reason, count);
        dataset.model = Trace {
            x: endpoints(&dataset.data.x),
            y: endpoints(&dataset.data.y),
            z: endpoints(&dataset.data.z),
        };
    }
}

/// Re-evaluate the stored model of every dataset in range: residuals,
/// statistics and display curve, without fitting.
pub fn regenerate(
    matrix: &mut DataMatrix,
    registry: &ModelRegistry,
    ctx: &FittingContext,
    sample_points: usize,
) -> Result<()> {
    for i in matrix.indices(ctx.range)? {
        let Some(dataset) = matrix.get_mut(i) else { continue };
        if dataset.fit.parameters.is_empty() {
            return Err(FitError::UninitializedParameters { dataset: i });
        }
        let model = ComposedModel::compose(registry, &dataset.fit.model_ids)?;
        let params = dataset.fit.parameters.clone();
        let part = dataset_residuals(dataset, &model, &params, NanPolicy::Omit)?;

        store_residuals(dataset, part);
        dataset.model = display_curve(dataset, &model, &params, sample_points);
    }
    Ok(())
}
