//! Special functions not covered by `statrs`: Hurwitz zeta and a log-space
//! modified Bessel function of the first kind.

use statrs::function::gamma::ln_gamma;

const MACHEP: f64 = 1.11022302462515654042e-16;

/// Euler-Maclaurin coefficients `(2k)! / B_2k`.
const ZETA_A: [f64; 12] = [
    12.0,
    -720.0,
    30240.0,
    -1209600.0,
    47900160.0,
    -1.8924375803183791606e9,
    7.47242496e10,
    -2.950130727918164224e12,
    1.1646782814350067249e14,
    -4.5979787224074726105e15,
    1.8152105401943546773e17,
    -7.1661652561756670113e18,
];

/// Hurwitz zeta `ζ(s, q) = Σ_{k>=0} (k + q)^{-s}`.
///
/// Defined for `s > 1`, `q > 0`. Returns `+inf` at `s = 1`, NaN for `s < 1`
/// or `q <= 0`, and `0` for `q = +inf`.
pub fn hurwitz_zeta(s: f64, q: f64) -> f64 {
    if s.is_nan() || q.is_nan() {
        return f64::NAN;
    }
    if s == 1.0 {
        return f64::INFINITY;
    }
    if s < 1.0 || q <= 0.0 {
        return f64::NAN;
    }
    if q.is_infinite() {
        return 0.0;
    }
    if s.is_infinite() {
        return if q == 1.0 { 1.0 } else if q < 1.0 { f64::INFINITY } else { 0.0 };
    }

    // Direct summation until the tail can be handled by Euler-Maclaurin.
    let mut sum = q.powf(-s);
    let mut a = q;
    let mut b = 0.0;
    let mut i = 0;
    while i < 9 || a <= 9.0 {
        i += 1;
        a += 1.0;
        b = a.powf(-s);
        sum += b;
        if (b / sum).abs() < MACHEP {
            return sum;
        }
    }

    let w = a;
    sum += b * w / (s - 1.0);
    sum -= 0.5 * b;
    let mut fac = 1.0;
    let mut k = 0.0;
    for coef in ZETA_A {
        fac *= s + k;
        b /= w;
        let t = fac * b / coef;
        sum += t;
        if (t / sum).abs() < MACHEP {
            return sum;
        }
        k += 1.0;
        fac *= s + k;
        b /= w;
        k += 1.0;
    }
    sum
}

/// Riemann zeta `ζ(s)` for `s > 1`.
#[inline]
pub fn riemann_zeta(s: f64) -> f64 {
    hurwitz_zeta(s, 1.0)
}

const BESSEL_MAX_TERMS: usize = 1_000_000;

/// `ln I_v(x)`, the log of the modified Bessel function of the first kind.
///
/// Valid for `v > -1` and `x >= 0`. The power series is summed in log space
/// (all terms are positive); large arguments switch to the Hankel expansion.
pub fn log_bessel_i(v: f64, x: f64) -> f64 {
    if v.is_nan() || x.is_nan() || v <= -1.0 || x < 0.0 {
        return f64::NAN;
    }
    if x == 0.0 {
        return if v == 0.0 {
            0.0
        } else if v > 0.0 {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        };
    }
    if x.is_infinite() {
        return f64::INFINITY;
    }
    if x > 500.0 && x > v * v {
        log_bessel_i_large_x(v, x)
    } else {
        log_bessel_i_series(v, x)
    }
}

fn log_bessel_i_series(v: f64, x: f64) -> f64 {
    let lh = (0.5 * x).ln();
    let mut t = v * lh - ln_gamma(v + 1.0);
    // Running log-sum-exp: total = m + ln(acc).
    let mut m = t;
    let mut acc = 1.0;
    for k in 0..BESSEL_MAX_TERMS {
        let kf = k as f64 + 1.0;
        t += 2.0 * lh - kf.ln() - (kf + v).ln();
        if t > m {
            acc = acc * (m - t).exp() + 1.0;
            m = t;
        } else {
            acc += (t - m).exp();
            // Terms are unimodal in k; past the peak they only shrink.
            if t < m - 40.0 {
                break;
            }
        }
    }
    m + acc.ln()
}

fn log_bessel_i_large_x(v: f64, x: f64) -> f64 {
    let mu = 4.0 * v * v;
    let mut term = 1.0;
    let mut sum = 1.0;
    for k in 1..60 {
        let kf = k as f64;
        let odd = 2.0 * kf - 1.0;
        term *= -(mu - odd * odd) / (8.0 * kf * x);
        sum += term;
        if term.abs() < MACHEP * sum.abs() {
            break;
        }
    }
    x - 0.5 * (2.0 * std::f64::consts::PI * x).ln() + sum.ln()
}

/// `ln |S^{d-1}|`, the log surface area of the unit sphere in `R^d`.
pub fn log_sphere_area(d: f64) -> f64 {
    std::f64::consts::LN_2 + 0.5 * d * std::f64::consts::PI.ln() - ln_gamma(0.5 * d)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    #[test]
    fn test_riemann_zeta_known_values() {
        assert_relative_eq!(riemann_zeta(2.0), PI * PI / 6.0, max_relative = 1e-13);
        assert_relative_eq!(riemann_zeta(4.0), PI.powi(4) / 90.0, max_relative = 1e-13);
        assert_relative_eq!(riemann_zeta(3.0), 1.2020569031595942, max_relative = 1e-13);
        assert_relative_eq!(riemann_zeta(1.5), 2.612375348685488, max_relative = 1e-12);
        assert_relative_eq!(riemann_zeta(5.5), 1.0252045799546856, max_relative = 1e-13);
    }

    #[test]
    fn test_hurwitz_zeta_shift_and_half() {
        assert_relative_eq!(hurwitz_zeta(2.0, 0.5), PI * PI / 2.0, max_relative = 1e-13);
        for &(s, q) in &[(1.5, 1.0), (2.5, 3.0), (7.0, 12.5)] {
            let lhs = hurwitz_zeta(s, q + 1.0);
            let rhs = hurwitz_zeta(s, q) - q.powf(-s);
            assert_relative_eq!(lhs, rhs, max_relative = 1e-12);
        }
    }

    #[test]
    fn test_hurwitz_zeta_domain() {
        assert_eq!(hurwitz_zeta(1.0, 1.0), f64::INFINITY);
        assert!(hurwitz_zeta(0.5, 1.0).is_nan());
        assert!(hurwitz_zeta(2.0, 0.0).is_nan());
        assert_eq!(hurwitz_zeta(2.0, f64::INFINITY), 0.0);
    }

    #[test]
    fn test_log_bessel_i0_at_one() {
        assert_relative_eq!(log_bessel_i(0.0, 1.0), 1.2660658777520082f64.ln(), max_relative = 1e-13);
    }

    #[test]
    fn test_log_bessel_i_half_order_closed_form() {
        // I_{1/2}(x) = sqrt(2 / (pi x)) sinh(x)
        for x in [0.1, 1.0, 5.0, 50.0, 400.0, 3000.0] {
            let expected =
                x - 0.5 * (2.0 * PI * x).ln() + (-(-2.0 * x).exp()).ln_1p();
            assert_relative_eq!(log_bessel_i(0.5, x), expected, max_relative = 1e-12);
        }
    }

    #[test]
    fn test_log_bessel_i_branches_agree() {
        for v in [0.0, 1.0, 3.5] {
            let x = 900.0;
            assert_relative_eq!(
                log_bessel_i_series(v, x),
                log_bessel_i_large_x(v, x),
                max_relative = 1e-12
            );
        }
    }

    #[test]
    fn test_log_bessel_i_at_zero() {
        assert_eq!(log_bessel_i(0.0, 0.0), 0.0);
        assert_eq!(log_bessel_i(1.0, 0.0), f64::NEG_INFINITY);
    }

    #[test]
    fn test_log_sphere_area() {
        // |S^1| = 2 pi, |S^2| = 4 pi
        assert_relative_eq!(log_sphere_area(2.0), (2.0 * PI).ln(), max_relative = 1e-14);
        assert_relative_eq!(log_sphere_area(3.0), (4.0 * PI).ln(), max_relative = 1e-14);
    }
}
