//! Ordered collection of named parameters with link-expression resolution.
//!
//! Insertion order is preserved: it fixes the order of the solver's varying
//! coordinates and of every report. Link expressions are parsed once, checked
//! for unknown names and cycles, and then evaluated in dependency order each
//! time the varying values change.

use crate::parameters::expression::{EvaluationContext, ExprResult, Expression, ExpressionError};
use crate::parameters::parameter::{Parameter, ParameterError};
use ndarray::{Array1, Array2};
use std::collections::{HashMap, HashSet};

/// A collection of parameters addressed by name, similar to lmfit's
/// `Parameters`.
#[derive(Debug, Clone, Default)]
pub struct Parameters {
    params: Vec<Parameter>,
    index: HashMap<String, usize>,
    /// Parsed links in evaluation order; `None` until resolved.
    links: Option<Vec<(usize, Expression)>>,
}

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter. Names must be unique.
    pub fn add(&mut self, param: Parameter) -> Result<(), ParameterError> {
        if self.index.contains_key(param.name()) {
            return Err(ParameterError::DuplicateParameter {
                name: param.name().to_string(),
            });
        }
        self.index.insert(param.name().to_string(), self.params.len());
        self.params.push(param);
        self.links = None;
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.index.get(name).map(|&i| &self.params[i])
    }

    /// Mutable access. Any link change is picked up by the next
    /// [`resolve_links`](Self::resolve_links).
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Parameter> {
        self.links = None;
        let i = *self.index.get(name)?;
        Some(&mut self.params[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.params.iter()
    }

    pub fn values(&self) -> Vec<f64> {
        self.params.iter().map(Parameter::value).collect()
    }

    /// Positions of the parameters the solver moves, in insertion order.
    pub fn varying_indices(&self) -> Vec<usize> {
        self.params
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_free())
            .map(|(i, _)| i)
            .collect()
    }

    pub fn varying_count(&self) -> usize {
        self.params.iter().filter(|p| p.is_free()).count()
    }

    /// Internal (bound-free) coordinates of the varying parameters.
    pub fn varying_internal_values(&self) -> Result<Array1<f64>, ParameterError> {
        self.params
            .iter()
            .filter(|p| p.is_free())
            .map(Parameter::to_internal)
            .collect::<Result<Vec<_>, _>>()
            .map(Array1::from)
    }

    /// Parse every link expression, check that each name it references
    /// exists, and order the links so that dependencies come first.
    pub fn resolve_links(&mut self) -> Result<(), ParameterError> {
        let mut parsed: HashMap<usize, Expression> = HashMap::new();
        for (i, param) in self.params.iter().enumerate() {
            let Some(text) = param.expr() else { continue };
            let expr =
                Expression::parse(text).map_err(|e| ParameterError::ExpressionEvaluation {
                    name: param.name().to_string(),
                    message: e.to_string(),
                })?;
            for var in expr.variables() {
                if !self.index.contains_key(&var) && var != "pi" && var != "e" {
                    return Err(ParameterError::ParameterNotFound { name: var });
                }
            }
            parsed.insert(i, expr);
        }

        let order = self.link_order(&parsed)?;
        let links = order
            .into_iter()
            .filter_map(|i| parsed.remove(&i).map(|expr| (i, expr)))
            .collect();
        self.links = Some(links);
        Ok(())
    }

    // Depth-first topological sort over link dependencies.
    fn link_order(&self, parsed: &HashMap<usize, Expression>) -> Result<Vec<usize>, ParameterError> {
        fn visit(
            node: usize,
            params: &Parameters,
            parsed: &HashMap<usize, Expression>,
            done: &mut HashSet<usize>,
            active: &mut HashSet<usize>,
            order: &mut Vec<usize>,
        ) -> Result<(), ParameterError> {
            if done.contains(&node) {
                return Ok(());
            }
            if !active.insert(node) {
                return Err(ParameterError::CircularDependency {
                    name: params.params[node].name().to_string(),
                });
            }
            if let Some(expr) = parsed.get(&node) {
                for var in expr.variables() {
                    if let Some(&dep) = params.index.get(&var) {
                        visit(dep, params, parsed, done, active, order)?;
                    }
                }
            }
            active.remove(&node);
            done.insert(node);
            order.push(node);
            Ok(())
        }

        let mut done = HashSet::new();
        let mut active = HashSet::new();
        let mut order = Vec::with_capacity(self.params.len());
        let mut nodes: Vec<usize> = parsed.keys().copied().collect();
        nodes.sort_unstable();
        for node in nodes {
            visit(node, self, parsed, &mut done, &mut active, &mut order)?;
        }
        Ok(order)
    }

    /// Recompute every linked parameter from the current values. Results are
    /// pulled onto the linked parameter's bounds.
    pub fn update_expressions(&mut self) -> Result<(), ParameterError> {
        if self.links.is_none() {
            self.resolve_links()?;
        }
        let links = self.links.take().unwrap_or_default();

        let mut outcome = Ok(());
        for (i, expr) in &links {
            match expr.evaluate(&*self) {
                Ok(value) => self.params[*i].set_value_clamped(value),
                Err(e) => {
                    outcome = Err(ParameterError::ExpressionEvaluation {
                        name: self.params[*i].name().to_string(),
                        message: e.to_string(),
                    });
                    break;
                }
            }
        }

        self.links = Some(links);
        outcome
    }

    /// Set the varying parameters from internal coordinates and refresh links.
    pub fn update_from_internal(&mut self, values: &[f64]) -> Result<(), ParameterError> {
        let varying = self.varying_indices();
        if values.len() != varying.len() {
            return Err(ParameterError::ValueCount {
                expected: varying.len(),
                found: values.len(),
            });
        }
        for (&i, &internal) in varying.iter().zip(values) {
            let external = self.params[i].from_internal(internal);
            self.params[i].set_value_clamped(external);
        }
        self.update_expressions()
    }

    /// Sensitivity of every parameter's external value to each varying
    /// internal coordinate, evaluated at `internal`.
    ///
    /// Rows follow insertion order, columns follow [`varying_indices`].
    /// Free parameters use the bound transform derivative; linked parameters
    /// are differentiated through their link expressions by central
    /// differences; fixed parameters have zero rows.
    ///
    /// [`varying_indices`]: Self::varying_indices
    pub fn external_sensitivity(&self, internal: &[f64]) -> Result<Array2<f64>, ParameterError> {
        let varying = self.varying_indices();
        let mut sens = Array2::zeros((self.params.len(), varying.len()));

        let mut probe = self.clone();
        probe.update_from_internal(internal)?;

        for (col, &i) in varying.iter().enumerate() {
            sens[[i, col]] = self.params[i].bounds_transform().derivative(internal[col]);
        }

        let linked: Vec<usize> = self
            .params
            .iter()
            .enumerate()
            .filter(|(_, p)| p.expr().is_some())
            .map(|(i, _)| i)
            .collect();
        if linked.is_empty() {
            return Ok(sens);
        }

        let mut shifted = internal.to_vec();
        for col in 0..varying.len() {
            let h = 1e-6 * internal[col].abs().max(1.0);

            shifted[col] = internal[col] + h;
            probe.update_from_internal(&shifted)?;
            let upper: Vec<f64> = linked.iter().map(|&i| probe.params[i].value()).collect();

            shifted[col] = internal[col] - h;
            probe.update_from_internal(&shifted)?;
            for (&i, up) in linked.iter().zip(&upper) {
                sens[[i, col]] = (up - probe.params[i].value()) / (2.0 * h);
            }

            shifted[col] = internal[col];
        }

        Ok(sens)
    }
}

impl EvaluationContext for Parameters {
    fn get_variable(&self, name: &str) -> ExprResult<f64> {
        self.get(name)
            .map(Parameter::value)
            .ok_or_else(|| ExpressionError::UndefinedVariable {
                name: name.to_string(),
            })
    }

    fn has_variable(&self, name: &str) -> bool {
        self.contains(name)
    }
}
