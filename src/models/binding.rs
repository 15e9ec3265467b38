//! Equilibrium binding isotherms.

use super::ModelDefinition;
use std::f64::INFINITY;

const CATEGORY: &str = "Molecular Equilibrium Binding Function";

pub(crate) fn definitions() -> Vec<ModelDefinition> {
    vec![
        ModelDefinition::new(41, CATEGORY, "Hill equation")
            .help(
                "Description: 1:1 Stoichiometry binding model for molecular interactions. \
                 Hill equation estimate of EC50.\n\
                 Parameters:\n\
                 \tEC50    \t(Effective concentration for 50% binding)\n\
                 \tHillCoef\t(Hill coefficient)\n\
                 \tminY    \t(Minimum Y-value)\n\
                 \tmaxY    \t(Maximum Y-value)\n",
            )
            .parameter("EC50", 5.0, 0.0, INFINITY)
            .parameter("HillCoef", 1.0, -1000.0, 1000.0)
            .parameter("minY", 0.0, -INFINITY, INFINITY)
            .parameter("maxY", 100.0, -INFINITY, INFINITY)
            .expression("P[2]+(P[3]-P[2])/(1+(P[0]/X)^P[1])"),
        ModelDefinition::new(42, CATEGORY, "Quadratic")
            .help(
                "Description: 1:1 Stoichiometry binding model for molecular interactions. \
                 Quadratic equation estimate of Keq.\n\
                 Parameters:\n\
                 \tKeq\t(Equilibrium dissociation constant)\n\
                 \tC  \t(Concentration of constant component)\n\
                 \tAmp\t(Signal Amplitude [max_Y - min_Y])\n\
                 \tS0 \t(background signal of unbound [min_Y])\n",
            )
            .parameter("Keq", 0.5, 0.0, INFINITY)
            .parameter("C", 100.0, 0.0, INFINITY)
            .parameter("Amp", 1000.0, -INFINITY, INFINITY)
            .parameter("S0", 0.0, -INFINITY, INFINITY)
            .expression("(P[3]+P[2])*((P[1]+X+P[0])-((P[1]+X+P[0])^2-4*P[1]*X)^0.5)/(2*P[1])"),
        ModelDefinition::new(43, CATEGORY, "Single-site binding potential")
            .help(
                "Description: 1:1 Stoichiometry binding potential model for molecular interactions. \
                 Binding Potential estimate of Keq.\n\
                 Parameters:\n\
                 \tKeq \t(Equilibrium dissociation constant)\n\
                 \tBmax\t(Signal of maximum binding [max_Y])\n\
                 \tS0  \t(background signal of unbound [min_Y])\n\
                 Note: binding potential BP = Bmax/Keq (receptor density * affinity)\n",
            )
            .parameter("Keq", 0.5, 0.0, INFINITY)
            .parameter("Bmax", 1000.0, 0.0, INFINITY)
            .parameter("S0", 0.0, -INFINITY, INFINITY)
            .expression("(P[1]*X)/(P[0]+X)+P[2]"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameters::{Expression, SimpleContext};
    use approx::assert_relative_eq;

    fn eval(id: u32, params: &[f64], x: f64) -> f64 {
        let def = definitions().into_iter().find(|d| d.id == id).unwrap();
        let expr = Expression::parse(def.expression.as_deref().unwrap()).unwrap();
        let mut ctx = SimpleContext::new();
        ctx.set_variable("X", x);
        ctx.set_array("P", params.to_vec());
        expr.evaluate(&ctx).unwrap()
    }

    #[test]
    fn test_hill_midpoint() {
        assert_relative_eq!(eval(41, &[5.0, 2.0, 10.0, 110.0], 5.0), 60.0);
    }

    #[test]
    fn test_quadratic_saturates() {
        // ligand far in excess: fraction bound approaches one
        let y = eval(42, &[0.01, 1.0, 100.0, 0.0], 1e6);
        assert_relative_eq!(y, 100.0, max_relative = 1e-4);
        assert_relative_eq!(eval(42, &[0.5, 1.0, 100.0, 0.0], 0.0), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_single_site_half_occupancy() {
        assert_relative_eq!(eval(43, &[2.0, 1000.0, 5.0], 2.0), 505.0);
    }
}
