//! Model composition and evaluation.
//!
//! A dataset's model is the sum of one or more catalog models. Composition
//! lays their parameters out back to back in selection order, so the first
//! model owns slots `0..k1`, the second `k1..k1+k2`, and so on, and renumbers
//! each formula's `P[k]` references into that shared layout.

use crate::dataset::{DataMatrix, FittingContext};
use crate::error::{FitError, Result};
use crate::models::{ModelRegistry, ModelScript};
use crate::parameters::{Bounds, EvaluationContext, ExprResult, Expression, ExpressionError};
use ndarray::{Array1, ArrayView1};
use thiserror::Error;

/// Errors raised while composing a model from catalog ids.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ComposeError {
    #[error("Unknown model id {0}")]
    UnknownModel(u32),

    #[error("No models selected")]
    NoModels,

    #[error("Model {0} has neither an expression nor a script")]
    MissingBody(u32),
}

/// The arrays a model is evaluated against.
///
/// `x` is the primary coordinate and fixes the output length. The other
/// channels may be empty; a formula that reads one whose length differs from
/// `x` fails to evaluate.
#[derive(Debug, Clone, Copy)]
pub struct Coordinates<'a> {
    pub x: ArrayView1<'a, f64>,
    pub y: ArrayView1<'a, f64>,
    pub z: ArrayView1<'a, f64>,
    pub ir_x: ArrayView1<'a, f64>,
    pub ir_y: ArrayView1<'a, f64>,
    pub ir_z: ArrayView1<'a, f64>,
}

impl<'a> Coordinates<'a> {
    /// Coordinates with only the primary channel populated.
    pub fn from_x(x: ArrayView1<'a, f64>) -> Self {
        let empty = ArrayView1::from(&[] as &[f64]);
        Self {
            x,
            y: empty,
            z: empty,
            ir_x: empty,
            ir_y: empty,
            ir_z: empty,
        }
    }

    /// The same ancillary channels over a different primary coordinate.
    pub fn with_x(self, x: ArrayView1<'a, f64>) -> Self {
        Self { x, ..self }
    }
}

// Point-wise view handed to the expression evaluator.
struct PointContext<'c, 'a> {
    coords: &'c Coordinates<'a>,
    params: &'c [f64],
    point: usize,
}

impl<'a> PointContext<'_, 'a> {
    fn channel(&self, name: &str) -> Option<ArrayView1<'a, f64>> {
        let c = self.coords;
        match name {
            "X" => Some(c.x),
            "Y" => Some(c.y),
            "Z" => Some(c.z),
            "IRX" => Some(c.ir_x),
            "IRY" => Some(c.ir_y),
            "IRZ" => Some(c.ir_z),
            _ => None,
        }
    }
}

impl EvaluationContext for PointContext<'_, '_> {
    fn get_variable(&self, name: &str) -> ExprResult<f64> {
        match self.channel(name) {
            Some(values) if values.len() == self.coords.x.len() => Ok(values[self.point]),
            Some(values) => Err(ExpressionError::InvalidOperation {
                message: format!(
                    "{} has {} values but X has {}",
                    name,
                    values.len(),
                    self.coords.x.len()
                ),
            }),
            None => Err(ExpressionError::UndefinedVariable {
                name: name.to_string(),
            }),
        }
    }

    fn get_indexed(&self, name: &str, index: usize) -> ExprResult<f64> {
        match (name, self.params.get(index)) {
            ("P", Some(&value)) => Ok(value),
            _ => Err(ExpressionError::UndefinedVariable {
                name: format!("{}[{}]", name, index),
            }),
        }
    }

    fn has_variable(&self, name: &str) -> bool {
        self.channel(name).is_some()
    }
}

/// Layout entry for one parameter of a composed model.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSlot {
    pub identifier: String,
    pub default: f64,
    pub bounds: Bounds,
    /// Catalog id of the model owning this slot
    pub model_id: u32,
    /// Position in the flat parameter vector
    pub slot: usize,
}

#[derive(Debug, Clone)]
enum Term {
    Expression(Expression),
    Script {
        script: ModelScript,
        offset: usize,
        len: usize,
    },
}

/// A sum of catalog models over one flat parameter vector.
#[derive(Debug, Clone)]
pub struct ComposedModel {
    ids: Vec<u32>,
    slots: Vec<ParameterSlot>,
    formula: String,
    terms: Vec<Term>,
}

impl ComposedModel {
    /// Compose the models `ids`, in order.
    pub fn compose(registry: &ModelRegistry, ids: &[u32]) -> std::result::Result<Self, ComposeError> {
        if ids.is_empty() {
            return Err(ComposeError::NoModels);
        }

        let mut slots = Vec::new();
        let mut formulas = Vec::with_capacity(ids.len());
        let mut terms = Vec::with_capacity(ids.len());

        for &id in ids {
            let def = registry.get(id).ok_or(ComposeError::UnknownModel(id))?;
            let offset = slots.len();
            let len = def.parameter_count();

            for (k, identifier) in def.parameter_ids.iter().enumerate() {
                slots.push(ParameterSlot {
                    identifier: identifier.clone(),
                    default: def.defaults[k],
                    bounds: def.bounds[k],
                    model_id: id,
                    slot: offset + k,
                });
            }

            // registry entries are validated, so a present expression parses
            let expression = def
                .expression
                .as_deref()
                .and_then(|text| Expression::parse(text).ok())
                .map(|expr| expr.renumber("P", offset));

            formulas.push(match &expression {
                Some(expr) => expr.to_string(),
                None => format!("model{}(P[{}..{}])", id, offset, offset + len),
            });

            terms.push(match (def.script, expression) {
                (Some(script), _) => Term::Script {
                    script,
                    offset,
                    len,
                },
                (None, Some(expr)) => Term::Expression(expr),
                (None, None) => return Err(ComposeError::MissingBody(id)),
            });
        }

        Ok(Self {
            ids: ids.to_vec(),
            slots,
            formula: formulas.join("+"),
            terms,
        })
    }

    pub fn ids(&self) -> &[u32] {
        &self.ids
    }

    pub fn slots(&self) -> &[ParameterSlot] {
        &self.slots
    }

    /// Composite formula text, the renumbered model formulas joined by `+`.
    pub fn formula(&self) -> &str {
        &self.formula
    }

    pub fn parameter_count(&self) -> usize {
        self.slots.len()
    }

    pub fn identifiers(&self) -> Vec<&str> {
        self.slots.iter().map(|s| s.identifier.as_str()).collect()
    }

    pub fn defaults(&self) -> Vec<f64> {
        self.slots.iter().map(|s| s.default).collect()
    }

    pub fn bounds(&self) -> Vec<Bounds> {
        self.slots.iter().map(|s| s.bounds).collect()
    }

    /// Evaluate the model at every point of `coords.x`.
    ///
    /// Pure: the same parameters and coordinates always give the same output.
    pub fn evaluate(&self, params: &[f64], coords: &Coordinates<'_>) -> Result<Array1<f64>> {
        if params.len() != self.slots.len() {
            return Err(FitError::DimensionMismatch(format!(
                "Model takes {} parameters, got {}",
                self.slots.len(),
                params.len()
            )));
        }

        let n = coords.x.len();
        let mut total = Array1::zeros(n);
        for term in &self.terms {
            match term {
                Term::Expression(expr) => {
                    for (point, out) in total.iter_mut().enumerate() {
                        let ctx = PointContext {
                            coords,
                            params,
                            point,
                        };
                        *out += expr.evaluate(&ctx)?;
                    }
                }
                Term::Script {
                    script,
                    offset,
                    len,
                } => {
                    let part = script(&params[*offset..offset + len], coords)?;
                    if part.len() != n {
                        return Err(FitError::Evaluation(format!(
                            "script returned {} values for {} points",
                            part.len(),
                            n
                        )));
                    }
                    total += &part;
                }
            }
        }
        Ok(total)
    }
}

/// Select `ids` as the model of every dataset in the context's range.
///
/// A dataset whose previous selection differs (or whose parameter vector has
/// the wrong length) is reset to the composed defaults; otherwise its values,
/// flags and links are kept. Nothing is modified when composition or the
/// range is invalid.
pub fn apply_models(
    matrix: &mut DataMatrix,
    registry: &ModelRegistry,
    ctx: &FittingContext,
    ids: &[u32],
) -> Result<ComposedModel> {
    let composed = ComposedModel::compose(registry, ids)?;
    let range = matrix.indices(ctx.range)?;

    for i in range {
        if let Some(dataset) = matrix.get_mut(i) {
            let fit = &mut dataset.fit;
            if fit.model_ids != ids || fit.parameters.len() != composed.parameter_count() {
                fit.reset_to(&composed);
            }
            fit.formula = composed.formula().to_string();
        }
    }
    Ok(composed)
}
