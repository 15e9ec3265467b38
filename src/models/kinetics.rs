//! Binding kinetics: association and dissociation phases of an
//! interaction trace, with and without mass-transport limitation.

use super::ModelDefinition;
use crate::error::{FitError, Result};
use crate::model::Coordinates;
use crate::utils::special::lambert_w;
use ndarray::Array1;
use std::f64::consts::PI;
use std::f64::INFINITY;

const CATEGORY: &str = "Molecular Kinetics Function";

const BOLTZMANN: f64 = 1.381e-23;
const AVOGADRO: f64 = 6.022e23;

// Flow cell geometry in cm. L1 and L2 are the distances from the inlet to
// the start and end of the detection spot.
const SPOT_LENGTH: f64 = 0.16;
const L1: f64 = 0.03;
const L2: f64 = L1 + SPOT_LENGTH;
const CELL_WIDTH: f64 = 0.05;
const CELL_HEIGHT: f64 = 0.005;

pub(crate) fn definitions() -> Vec<ModelDefinition> {
    vec![
        ModelDefinition::new(39, CATEGORY, "CFCA (SPR, Biacore 8K)")
            .help(
                "Description: Calibration-Free Concentration Analysis for SPR data. Requires 2 datasets \
                 of concentration series data collected at different flow rates. One data set should \
                 have kinetics that are at least partially limited by mass transport. Calculation \
                 assumes Biacore 8K flow cell.\n\
                 Parameters:\n\
                 \tFd  \t(Fold Dilution from max concentration in series)\n\
                 \tF   \t(Flow Rate in uL/min)\n\
                 \tMW  \t(Molecular Weight of Analyte in Da)\n\
                 \tT   \t(Temperature of experiment in Celsius)\n\
                 \tRmax\t(Maximum SPR Response)\n\
                 \tka  \t(Association Rate Constant in 1/Ms)\n\
                 \tkd  \t(Dissociation Rate Constant in 1/s)\n\
                 \tCa  \t(Concentration of Analyte in M)\n\
                 \tt0  \t(Time Zero of Dissociation Data in s)\n\
                 \tkc  \t(Mass Transport Coefficient in cm/s. 0 estimates it from the Einstein-Sutherland equation.)\n\
                 \tG   \t(Concentration G-Factor in Rcm^2/g)\n",
            )
            .parameter("Fd", 1.0, 0.0, INFINITY)
            .parameter("F", 30.0, 0.0, INFINITY)
            .parameter("MW", 14300.0, 0.0, INFINITY)
            .parameter("T", 25.0, 0.0, INFINITY)
            .parameter("Rmax", 25.0, 0.0, INFINITY)
            .parameter("ka", 2.3e6, 0.0, INFINITY)
            .parameter("kd", 9.85e-11, 0.0, INFINITY)
            .parameter("Ca", 5e-9, 0.0, INFINITY)
            .parameter("t0", 300.0, -INFINITY, INFINITY)
            .parameter("kc", 0.0, 0.0, INFINITY)
            .parameter("G", 1.0e10, 0.0, INFINITY)
            .expression("X+P[0]")
            .script(calibration_free_concentration)
            .script_only(),
        ModelDefinition::new(40, CATEGORY, "1-to-1 binding (on & off)")
            .help(
                "Description: 1:1 Stoichiometry binding model for molecular interactions. Full trace, \
                 association and dissociation in the same buffer.\n\
                 Parameters:\n\
                 \tRmax\t(Response maximum value)\n\
                 \tkd  \t(Dissociation rate)\n\
                 \tka  \t(Association rate)\n\
                 \tCp  \t(Concentration of analyte in solution in Molar)\n\
                 \tm   \t(Linear approximation of slow phase)\n\
                 \tc   \t(Dissociation asymptote)\n\
                 \tX0  \t(Dissociation phase time offset)\n\
                 \tkds \t(Dissociation phase scalar)\n",
            )
            .parameter("Rmax", 25.0, 0.0, INFINITY)
            .parameter("kd", 0.001, 0.0, INFINITY)
            .parameter("ka", 60000.0, 0.0, INFINITY)
            .parameter("Cp", 100e-9, 0.0, INFINITY)
            .parameter("m", 0.0, -INFINITY, INFINITY)
            .parameter("c", 0.0, -INFINITY, INFINITY)
            .parameter("X0", 180.0, -INFINITY, INFINITY)
            .parameter("kds", 1.0, -6.0, 6.0)
            .expression(
                "(P[0]/(1+(P[1]/(P[2]*P[3]))))*(1-exp(-X*(P[2]*P[3]+P[1]))) \
                 + P[7]*((P[0]/(1+(P[1]/(P[2]*P[3]))))*(1-exp(-P[6]*(P[2]*P[3]+P[1])))-P[5])\
                 *exp(-P[1]*(X-P[6])) + P[4]*(X-P[6]) + P[5]",
            )
            .script(one_to_one_binding),
    ]
}

/// Two-compartment binding under partial mass transport, solved in closed
/// form through the Lambert W function. Points up to `t0` follow the
/// association phase; later points decay from the last association response.
fn calibration_free_concentration(p: &[f64], coords: &Coordinates<'_>) -> Result<Array1<f64>> {
    let mut p = p.to_vec();

    let ckc = 1.47 * ((1.0 - (L1 / L2).powf(0.6666666667)) / (1.0 - L1 / L2));
    let diffusion = (BOLTZMANN * (298.15 + p[3]))
        / (6.0
            * PI
            * (3.0 * PI * p[2] * (7.3e-4 / (4.0 * PI * AVOGADRO))).powf(0.3333333333)
            * 0.001
            * 1.2);

    // concentration for the dilution step, flow to uL/s, temperature to K
    p[7] /= p[0];
    p[1] *= 60.0;
    p[3] += 273.15;
    if p[9] == 0.0 {
        p[9] = ckc
            * ((diffusion * diffusion * p[1]) / (CELL_HEIGHT.powi(2) * CELL_WIDTH * L2))
                .powf(0.3333333333);
    }

    let (mw, rmax, ka, kd, conc, t0, kc, g) = (p[2], p[4], p[5], p[6], p[7], p[8], p[9], p[10]);
    let on = conc * ka + kd;
    let transport = kc * mw * g;

    let k1 = conc * ka / on;
    let k2 = conc * ka * ka * rmax / (on * transport + ka * kd * rmax);
    let k3 = on * on * transport / (kd * (on * transport + ka * kd * rmax));
    let k5 = transport / (transport + ka * rmax);
    let k6 = (transport + ka * rmax) / ka;

    let mut out = Array1::zeros(coords.x.len());
    let mut last_association: Option<f64> = None;
    for (r, &x) in out.iter_mut().zip(coords.x.iter()) {
        if x <= t0 {
            let w = lambert_w(k2 * (k2 - k3 * kd * x).exp());
            *r = rmax * k1 * (1.0 - w / k2);
            last_association = Some(*r);
        } else {
            let rz = last_association.ok_or_else(|| {
                FitError::Evaluation(
                    "dissociation data precede every association point".to_string(),
                )
            })?;
            let w = lambert_w((-rz / k6) * (-(rz / k6 + k5 * kd * (x - t0))).exp());
            *r = -k6 * w;
        }
    }
    Ok(out)
}

/// Langmuir association up to `X0`, then exponential dissociation with a
/// linear drift term.
fn one_to_one_binding(p: &[f64], coords: &Coordinates<'_>) -> Result<Array1<f64>> {
    let (rmax, kd, ka, mut cp, m, c, x0, kds) = (p[0], p[1], p[2], p[3], p[4], p[5], p[6], p[7]);
    if cp == 0.0 {
        cp = 1e-15;
    }
    let plateau = rmax / (1.0 + kd / (ka * cp));
    let kobs = ka * cp + kd;

    Ok(coords.x.mapv(|x| {
        if x <= x0 {
            plateau * (1.0 - (-x * kobs).exp())
        } else {
            let at_switch = plateau * (1.0 - (-x0 * kobs).exp());
            kds * (at_switch - c) * (-kd * (x - x0)).exp() + m * (x - x0) + c
        }
    }))
}
