//! Seawater oxygen conversions.
//!
//! Argo reports adjusted oxygen in µmol/kg. These helpers give the saturation concentration for
//! comparison, and convert to ml/L for work with older bottle data.

/// µmol of oxygen in one ml of gas at STP.
const O2_UMOL_PER_ML: f64 = 44.6596;

/// Nominal seawater density in kg/L used for the saturation conversion.
const NOMINAL_DENSITY: f64 = 1.025;

/// Oxygen saturation in µmol/kg for salinity (PSU) and temperature (°C) at one atmosphere.
///
/// Garcia & Gordon (1992) fit in ml/L, converted at the nominal density.
pub fn o2sat(sal: f64, temp: f64) -> f64 {
    const A: [f64; 6] = [
        2.00907,
        3.22014,
        4.05010,
        4.94457,
        -2.56847e-1,
        3.88767,
    ];
    const B: [f64; 4] = [-6.24523e-3, -7.37614e-3, -1.03410e-2, -8.17083e-3];
    const C0: f64 = -4.88682e-7;

    let ts = ((298.15 - temp) / (273.15 + temp)).ln();

    let a = polynomial(&A, ts);
    let b = polynomial(&B, ts);
    let mll = (a + sal * b + C0 * sal * sal).exp();

    mll * O2_UMOL_PER_ML / NOMINAL_DENSITY
}

/// Seawater density in kg/m³ from salinity (PSU), temperature (°C) and pressure (dbar).
///
/// UNESCO 1981 equation of state (EOS-80).
pub fn seawater_density(sal: f64, temp: f64, pres: f64) -> f64 {
    let t = temp;
    let s = sal;
    let s15 = s * s.sqrt();
    // The secant bulk modulus is fit in bars.
    let p = pres / 10.0;

    let smow = polynomial(
        &[
            999.842594,
            6.793952e-2,
            -9.095290e-3,
            1.001685e-4,
            -1.120083e-6,
            6.536332e-9,
        ],
        t,
    );
    let rho0 = smow
        + s * polynomial(&[0.824493, -4.0899e-3, 7.6438e-5, -8.2467e-7, 5.3875e-9], t)
        + s15 * polynomial(&[-5.72466e-3, 1.0227e-4, -1.6546e-6], t)
        + 4.8314e-4 * s * s;

    if p == 0.0 {
        return rho0;
    }

    let kw = polynomial(&[19652.21, 148.4206, -2.327105, 1.360477e-2, -5.155288e-5], t);
    let aw = polynomial(&[3.239908, 1.43713e-3, 1.16092e-4, -5.77905e-7], t);
    let bw = polynomial(&[8.50935e-5, -6.12293e-6, 5.2787e-8], t);

    let k0 = kw
        + s * polynomial(&[54.6746, -0.603459, 1.09987e-2, -6.1670e-5], t)
        + s15 * polynomial(&[7.944e-2, 1.6483e-2, -5.3009e-4], t);
    let a = aw + s * polynomial(&[2.2838e-3, -1.0981e-5, -1.6078e-6], t) + 1.91075e-4 * s15;
    let b = bw + s * polynomial(&[-9.9348e-7, 2.0816e-8, 9.1697e-10], t);

    let k = k0 + a * p + b * p * p;

    rho0 / (1.0 - p / k)
}

/// Convert oxygen from µmol/kg to ml/L using the in situ seawater density.
pub fn convert_to_mll(o2: f64, sal: f64, temp: f64, pres: f64) -> f64 {
    let umol_per_l = o2 * seawater_density(sal, temp, pres) / 1000.0;
    umol_per_l / O2_UMOL_PER_ML
}

/// Evaluate `coeffs[0] + coeffs[1] x + coeffs[2] x² + ...`
fn polynomial(coeffs: &[f64], x: f64) -> f64 {
    coeffs.iter().rev().fold(0.0, |acc, &c| acc * x + c)
}
