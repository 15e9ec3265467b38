//! The model catalog.
//!
//! Every model is a [`ModelDefinition`] keyed by a positive integer id: its
//! parameter identifiers, defaults and bounds, plus either a formula in the
//! expression language or a native script (or both). The catalog is fixed
//! once built; [`ModelRegistry::builtin`] holds the models shipped with the
//! crate.

use crate::error::Result;
use crate::model::Coordinates;
use crate::parameters::{Bounds, Expression};
use ndarray::Array1;
use std::collections::{BTreeMap, HashSet};
use std::sync::OnceLock;
use thiserror::Error;

mod binding;
mod folding;
mod generic;
mod kinetics;

/// Native evaluation body of a model.
///
/// Receives only this model's parameters, in declaration order, and returns
/// one value per point of `coords.x`.
pub type ModelScript = fn(&[f64], &Coordinates<'_>) -> Result<Array1<f64>>;

/// Defects found while building a catalog.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistryError {
    #[error("Model ids must be positive")]
    ZeroId,

    #[error("Model {0} is registered twice")]
    DuplicateId(u32),

    #[error("Model {id}: '{name}' is not a valid parameter identifier")]
    InvalidIdentifier { id: u32, name: String },

    #[error("Model {id}: parameter '{name}' is declared twice")]
    DuplicateParameter { id: u32, name: String },

    #[error("Model {id}: bounds of '{name}' are inverted")]
    InvalidBounds { id: u32, name: String },

    #[error("Model {id}: {identifiers} identifiers, {defaults} defaults and {bounds} bounds")]
    LengthMismatch {
        id: u32,
        identifiers: usize,
        defaults: usize,
        bounds: usize,
    },

    #[error("Model {id}: expression does not parse: {message}")]
    Expression { id: u32, message: String },

    #[error("Model {id}: expression uses P[{index}] but the model has {count} parameters")]
    ParameterIndex { id: u32, index: usize, count: usize },

    #[error("Model {0} has neither an expression nor a script")]
    MissingBody(u32),

    #[error("Model {0} is script-only but has no script")]
    MissingScript(u32),
}

/// One catalog entry.
#[derive(Debug, Clone)]
pub struct ModelDefinition {
    pub id: u32,
    pub category: String,
    pub name: String,
    pub help: String,
    pub parameter_ids: Vec<String>,
    pub bounds: Vec<Bounds>,
    pub defaults: Vec<f64>,
    /// Formula in terms of `X` and `P[k]`, `k` local to this model
    pub expression: Option<String>,
    pub script: Option<ModelScript>,
    /// The expression is a placeholder; only the script is authoritative
    pub script_only: bool,
}

impl ModelDefinition {
    pub fn new(id: u32, category: &str, name: &str) -> Self {
        Self {
            id,
            category: category.to_string(),
            name: name.to_string(),
            help: String::new(),
            parameter_ids: Vec::new(),
            bounds: Vec::new(),
            defaults: Vec::new(),
            expression: None,
            script: None,
            script_only: false,
        }
    }

    pub fn help(mut self, text: &str) -> Self {
        self.help = text.to_string();
        self
    }

    /// Append a parameter. `min`/`max` may be infinite.
    pub fn parameter(mut self, identifier: &str, default: f64, min: f64, max: f64) -> Self {
        self.parameter_ids.push(identifier.to_string());
        self.defaults.push(default);
        self.bounds.push(Bounds { min, max });
        self
    }

    pub fn expression(mut self, formula: &str) -> Self {
        self.expression = Some(formula.to_string());
        self
    }

    pub fn script(mut self, script: ModelScript) -> Self {
        self.script = Some(script);
        self
    }

    pub fn script_only(mut self) -> Self {
        self.script_only = true;
        self
    }

    pub fn parameter_count(&self) -> usize {
        self.parameter_ids.len()
    }

    /// Text shown by `info <id>`: the catalog line followed by the help body.
    pub fn describe(&self) -> String {
        format!("{}: {}\n{}", self.category, self.name, self.help)
    }

    fn validate(&self) -> std::result::Result<(), RegistryError> {
        let id = self.id;
        if id == 0 {
            return Err(RegistryError::ZeroId);
        }

        let count = self.parameter_ids.len();
        if self.defaults.len() != count || self.bounds.len() != count {
            return Err(RegistryError::LengthMismatch {
                id,
                identifiers: count,
                defaults: self.defaults.len(),
                bounds: self.bounds.len(),
            });
        }

        let mut seen = HashSet::new();
        for (name, bounds) in self.parameter_ids.iter().zip(&self.bounds) {
            if !is_identifier(name) {
                return Err(RegistryError::InvalidIdentifier {
                    id,
                    name: name.clone(),
                });
            }
            if !seen.insert(name.as_str()) {
                return Err(RegistryError::DuplicateParameter {
                    id,
                    name: name.clone(),
                });
            }
            if Bounds::new(bounds.min, bounds.max).is_err() {
                return Err(RegistryError::InvalidBounds {
                    id,
                    name: name.clone(),
                });
            }
        }

        if self.script_only && self.script.is_none() {
            return Err(RegistryError::MissingScript(id));
        }

        match &self.expression {
            Some(text) => {
                let expr = Expression::parse(text).map_err(|e| RegistryError::Expression {
                    id,
                    message: e.to_string(),
                })?;
                if let Some(index) = expr.max_index("P") {
                    if index >= count {
                        return Err(RegistryError::ParameterIndex { id, index, count });
                    }
                }
                Ok(())
            }
            None if self.script.is_some() => Ok(()),
            None => Err(RegistryError::MissingBody(id)),
        }
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Immutable catalog of models, keyed by id.
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    models: BTreeMap<u32, ModelDefinition>,
}

impl ModelRegistry {
    /// Validate and index a set of definitions.
    pub fn from_definitions<I>(definitions: I) -> std::result::Result<Self, RegistryError>
    where
        I: IntoIterator<Item = ModelDefinition>,
    {
        let mut models = BTreeMap::new();
        for def in definitions {
            def.validate()?;
            let id = def.id;
            if models.insert(id, def).is_some() {
                return Err(RegistryError::DuplicateId(id));
            }
        }
        Ok(Self { models })
    }

    /// The models shipped with the crate, built on first use.
    ///
    /// # Panics
    ///
    /// Panics if a built-in definition is malformed.
    pub fn builtin() -> &'static ModelRegistry {
        static BUILTIN: OnceLock<ModelRegistry> = OnceLock::new();
        BUILTIN.get_or_init(|| {
            let definitions = generic::definitions()
                .into_iter()
                .chain(folding::definitions())
                .chain(kinetics::definitions())
                .chain(binding::definitions());
            match ModelRegistry::from_definitions(definitions) {
                Ok(registry) => registry,
                Err(e) => panic!("built-in model catalog is malformed: {}", e),
            }
        })
    }

    pub fn get(&self, id: u32) -> Option<&ModelDefinition> {
        self.models.get(&id)
    }

    /// All registered ids, ascending.
    pub fn list_ids(&self) -> Vec<u32> {
        self.models.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Help for one model, or the catalog summary when `id` is `None` or
    /// unknown.
    pub fn info(&self, id: Option<u32>) -> String {
        match id.and_then(|id| self.get(id)) {
            Some(def) => def.describe(),
            None => self.summary(),
        }
    }

    fn summary(&self) -> String {
        let ids: Vec<String> = self.models.keys().map(u32::to_string).collect();
        format!(
            "\n\tType [info|?] fxn_index to get more help about particular command\n\
             \n\tAvailable Functions: \n\t{}\n",
            ids.join("  ")
        )
    }

    /// The function table: models grouped under their category, categories
    /// and ids ascending, each row padded with dots up to its id.
    pub fn table(&self) -> String {
        const ROW_WIDTH: usize = 86;

        let mut out = format!(
            "\n\t     Function Name{}Function Number\n{}\n",
            " ".repeat(60),
            "_".repeat(100)
        );

        let mut by_category: BTreeMap<&str, Vec<&ModelDefinition>> = BTreeMap::new();
        for def in self.models.values() {
            by_category.entry(def.category.as_str()).or_default().push(def);
        }

        for (category, defs) in by_category {
            out.push_str(category);
            out.push_str(":\n");
            for def in defs {
                let id = def.id.to_string();
                let dots = ROW_WIDTH.saturating_sub(def.name.len() + id.len());
                out.push_str(&format!("\t{}{}{}\n", def.name, ".".repeat(dots), id));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::INFINITY;

    fn line() -> ModelDefinition {
        ModelDefinition::new(7, "Test", "Line")
            .parameter("Slope", 1.0, -INFINITY, INFINITY)
            .parameter("Offset", 0.0, -INFINITY, INFINITY)
            .expression("P[0]*X + P[1]")
    }

    #[test]
    fn test_builtin_catalog() {
        let registry = ModelRegistry::builtin();
        assert_eq!(
            registry.list_ids(),
            vec![1, 2, 3, 14, 27, 30, 39, 40, 41, 42, 43]
        );
        for id in registry.list_ids() {
            let def = registry.get(id).unwrap();
            assert_eq!(def.parameter_ids.len(), def.defaults.len());
            if def.script_only {
                assert!(def.script.is_some());
            }
        }
        assert_eq!(registry.get(39).unwrap().parameter_count(), 11);
    }

    #[test]
    fn test_info() {
        let registry = ModelRegistry::builtin();
        let summary = registry.info(None);
        assert!(summary.contains("Available Functions"));
        assert!(summary.contains("1  2  3  14"));
        assert_eq!(registry.info(Some(999)), summary);
        assert!(registry.info(Some(2)).starts_with("Generic Function: Exponential"));
    }

    #[test]
    fn test_table_groups_by_category() {
        let table = ModelRegistry::builtin().table();
        let generic = table.find("Generic Function:").unwrap();
        let binding = table.find("Molecular Equilibrium Binding Function:").unwrap();
        assert!(generic < binding);
        let row = table
            .lines()
            .find(|l| l.contains("Linear"))
            .unwrap();
        assert!(row.ends_with(".27"));
        assert_eq!(row.trim_start_matches('\t').len(), 86);
    }

    #[test]
    fn test_validation_errors() {
        assert!(ModelRegistry::from_definitions(vec![line()]).is_ok());

        let dup = ModelRegistry::from_definitions(vec![line(), line()]);
        assert_eq!(dup.unwrap_err(), RegistryError::DuplicateId(7));

        let bad_index = line().expression("P[2]*X");
        assert!(matches!(
            ModelRegistry::from_definitions(vec![bad_index]),
            Err(RegistryError::ParameterIndex { index: 2, count: 2, .. })
        ));

        let bad_name = ModelDefinition::new(8, "Test", "Bad")
            .parameter("2x", 0.0, 0.0, 1.0)
            .expression("P[0]");
        assert!(matches!(
            ModelRegistry::from_definitions(vec![bad_name]),
            Err(RegistryError::InvalidIdentifier { .. })
        ));

        let inverted = ModelDefinition::new(9, "Test", "Inverted")
            .parameter("a", 0.0, 1.0, 0.0)
            .expression("P[0]");
        assert!(matches!(
            ModelRegistry::from_definitions(vec![inverted]),
            Err(RegistryError::InvalidBounds { .. })
        ));

        let no_script = line().script_only();
        assert_eq!(
            ModelRegistry::from_definitions(vec![no_script]).unwrap_err(),
            RegistryError::MissingScript(7)
        );

        let bodiless = ModelDefinition::new(7, "Test", "Empty").parameter("a", 0.0, 0.0, 1.0);
        let err = ModelRegistry::from_definitions(vec![bodiless]).unwrap_err();
        assert_eq!(err, RegistryError::MissingBody(7));
        assert_eq!(err.to_string(), "Model 7 has neither an expression nor a script");
    }
}
