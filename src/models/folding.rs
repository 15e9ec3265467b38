//! Protein folding equilibria.

use super::ModelDefinition;
use crate::error::Result;
use crate::model::Coordinates;
use ndarray::Array1;
use std::f64::INFINITY;

/// Gas constant in cal/(mol K).
const GAS_CONSTANT: f64 = 1.9872036;

pub(crate) fn definitions() -> Vec<ModelDefinition> {
    vec![ModelDefinition::new(
        14,
        "Protein Folding Equilibrium",
        "2-state Equilibrium, Chemical Denaturant",
    )
    .help(
        "Description: Model for equilibrium titration data describing 2 thermodynamic states (U->N)\n\
         Parameters:\n\
         \tdG\t(Delta G in kcal/Mol)\n\
         \tm \t(m-value, denaturant dependence of transition in kcal/mol/M)\n\
         \tCn\t(Y-intercept of Native Baseline)\n\
         \tCu\t(Y-intercept of Unfolded Baseline)\n\
         \tMn\t(Slope of Native Baseline)\n\
         \tMu\t(Slope of Unfolded Baseline)\n\
         \tT \t(Temperature in Kelvin)\n\
         Note: X must be the denaturant concentration and Y the signal at that concentration.\n",
    )
    .parameter("dG", 5.0, -INFINITY, INFINITY)
    .parameter("m", 1.8, -INFINITY, INFINITY)
    .parameter("Cn", 0.0, -INFINITY, INFINITY)
    .parameter("Cu", 25000.0, -INFINITY, INFINITY)
    .parameter("Mn", 1000.0, -INFINITY, INFINITY)
    .parameter("Mu", 2.0, -INFINITY, INFINITY)
    .parameter("T", 298.15, -INFINITY, INFINITY)
    .expression(
        "exp(-(P[0]+P[1]*X)/(1.9872036*P[6]))/(1+exp(-(P[0]+P[1]*X)/(1.9872036*P[6])))*(P[3]+P[5]*X) \
         + (1-exp(-(P[0]+P[1]*X)/(1.9872036*P[6]))/(1+exp(-(P[0]+P[1]*X)/(1.9872036*P[6]))))*(P[2]+P[4]*X)",
    )
    .script(two_state_denaturation)
    .script_only()]
}

/// Fraction-unfolded weighted sum of the native and unfolded baselines.
fn two_state_denaturation(p: &[f64], coords: &Coordinates<'_>) -> Result<Array1<f64>> {
    let (dg, m, cn, cu, mn, mu, t) = (p[0], p[1], p[2], p[3], p[4], p[5], p[6]);
    Ok(coords.x.mapv(|x| {
        let k = (-(dg + m * x) / (GAS_CONSTANT * t)).exp();
        let unfolded = k / (1.0 + k);
        unfolded * (cu + mu * x) + (1.0 - unfolded) * (cn + mn * x)
    }))
}
