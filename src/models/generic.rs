//! General-purpose curve shapes.

use super::ModelDefinition;
use std::f64::INFINITY;

const CATEGORY: &str = "Generic Function";

pub(crate) fn definitions() -> Vec<ModelDefinition> {
    vec![
        ModelDefinition::new(1, CATEGORY, "Constant (Additive)")
            .help(
                "Description: Function in the form of: Y = C + 0X\n\
                 Parameters:\n\
                 \tAdd_Constant\t(constant value)\n",
            )
            .parameter("Add_Constant", 0.0, -INFINITY, INFINITY)
            .expression("X*0 + P[0]"),
        ModelDefinition::new(2, CATEGORY, "Exponential")
            .help(
                "Description: Function in the form of: Y = A*e^(-X/t)\n\
                 Parameters:\n\
                 \tAmplitude    \t(exponential amplitude)\n\
                 \tTime_Constant\t(exponential time constant)\n",
            )
            .parameter("Amplitude", 1.0, -INFINITY, INFINITY)
            .parameter("Time_Constant", 1.0, 0.0, INFINITY)
            .expression("P[0]*exp(-X/P[1])"),
        ModelDefinition::new(3, CATEGORY, "Gaussian 1-D")
            .help(
                "Description: Function in the form of: \
                 Y = A/(sqrt(2*pi)*WHM)*exp(-(X-Xcen)^2/(2*WHM^2))\n\
                 Parameters:\n\
                 \tAmplitude\t(area under the peak)\n\
                 \tWHM      \t(peak width)\n\
                 \tXcen     \t(peak centre)\n",
            )
            .parameter("Amplitude", 10.0, -INFINITY, INFINITY)
            .parameter("WHM", 5.0, 0.0, INFINITY)
            .parameter("Xcen", 5.0, -INFINITY, INFINITY)
            .expression("(P[0]/(sqrt(2*pi)*P[1]))*exp(-(X-P[2])^2/(2*P[1]^2))"),
        ModelDefinition::new(27, CATEGORY, "Linear")
            .help(
                "Description: Function in the form of: Y = M*X + C\n\
                 Parameters:\n\
                 \tSlope      \t(slope)\n\
                 \tY_intercept\t(value at X = 0)\n",
            )
            .parameter("Slope", 1.0, -INFINITY, INFINITY)
            .parameter("Y_intercept", 0.0, -INFINITY, INFINITY)
            .expression("P[0]*X + P[1]"),
        ModelDefinition::new(30, CATEGORY, "Constant (Multiplicative)")
            .help(
                "Description: Function in the form of: Y = M*X\n\
                 Parameters:\n\
                 \tMul_Constant\t(constant value)\n",
            )
            .parameter("Mul_Constant", 0.0, -INFINITY, INFINITY)
            .expression("X*P[0]"),
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
    fn test_shapes() {
        assert_eq!(eval(1, &[3.0], 17.0), 3.0);
        assert_relative_eq!(eval(2, &[2.0, 4.0], 4.0), 2.0 / std::f64::consts::E);
        assert_eq!(eval(27, &[2.0, 1.0], 3.0), 7.0);
        assert_eq!(eval(30, &[0.5], 8.0), 4.0);
    }

    #[test]
    fn test_gaussian_peak() {
        let amplitude = 10.0;
        let width = 2.0;
        let peak = eval(3, &[amplitude, width, 1.0], 1.0);
        assert_relative_eq!(
            peak,
            amplitude / ((2.0 * std::f64::consts::PI).sqrt() * width),
            epsilon = 1e-12
        );
        assert_relative_eq!(
            eval(3, &[amplitude, width, 1.0], 0.0),
            eval(3, &[amplitude, width, 1.0], 2.0),
            epsilon = 1e-12
        );
    }
}
