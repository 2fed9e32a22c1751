use super::constants::{
    EULER_MASCHERONI, GAMMA_ASYMPTOTIC_X, GAMMA_DENOMINATOR_COEF, GAMMA_NUMERATOR_COEF,
    GAMMA_SMALL_X, HALF_LOG_TWO_PI, LGAMMA_EXPANSION_COEF, LOG_PI, PI,
};

/// `sin(πx)` with exact zeros at the integers.
pub fn sin_pi(x: f32) -> f32 {
    if x == x.trunc() {
        return 0.0;
    }
    // sin(πx) has period 2; reduce before scaling so πx never gets large.
    let r = x - 2.0 * (x * 0.5).floor();
    (PI * r).sin()
}

/// Real Γ(x) in single precision. Only meaningful for `x > 0`; `log_gamma`
/// handles the negative half-line through reflection.
pub fn gamma(x: f32) -> f32 {
    if x < GAMMA_SMALL_X {
        // 1/Γ(x) = x + γx² + O(x³), relative error below 6e-7 here.
        return 1.0 / (x * (1.0 + EULER_MASCHERONI * x));
    }
    if x >= GAMMA_ASYMPTOTIC_X {
        return stirling_log_gamma(x).exp();
    }

    let less_than_one = x < 1.0;
    let mut y = x;
    let mut n = 0i32;
    if less_than_one {
        y += 1.0;
    } else {
        n = x.floor() as i32 - 1;
        y -= n as f32;
    }

    // (y - 1) is x itself when we shifted up.
    let z = if less_than_one { x } else { y - 1.0 };
    let mut num = 0.0f32;
    let mut den = 1.0f32;
    for i in 0..8 {
        num = (num + GAMMA_NUMERATOR_COEF[i]) * z;
        den = den * z + GAMMA_DENOMINATOR_COEF[i];
    }
    let mut result = num / den + 1.0;

    if less_than_one {
        // Γ(z) = Γ(z+1)/z
        result /= x;
    } else {
        // Γ(z+n) = z(z+1)…(z+n-1)Γ(z)
        for _ in 0..n {
            result *= y;
            y += 1.0;
        }
    }
    result
}

/// Asymptotic log Γ(x) for `x ≥ 12` (Abramowitz & Stegun 6.1.41).
pub fn stirling_log_gamma(x: f32) -> f32 {
    let z = 1.0 / (x * x);
    let mut sum = LGAMMA_EXPANSION_COEF[7];
    for i in (0..7).rev() {
        sum *= z;
        sum += LGAMMA_EXPANSION_COEF[i];
    }
    let series = sum / x;
    (x - 0.5) * x.ln() - x + HALF_LOG_TWO_PI + series
}

/// log|Γ(x)|.
pub fn log_gamma(x: f32) -> f32 {
    let is_negative = x < 0.0;
    let x = x.abs();
    if x == 0.0 || x.is_infinite() {
        return f32::INFINITY;
    }

    let log_gamma = if x < GAMMA_ASYMPTOTIC_X {
        gamma(x).abs().ln()
    } else {
        stirling_log_gamma(x)
    };

    if is_negative {
        return LOG_PI - log_gamma - (x * sin_pi(x)).abs().ln();
    }
    log_gamma
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rel_err(a: f32, b: f32) -> f32 {
        ((a - b) / b).abs()
    }

    #[test]
    fn gamma_recurrence_below_one() {
        for &x in &[0.0005f32, 0.002, 0.01, 0.1, 0.25, 0.5, 0.75, 0.9, 0.999] {
            let lhs = gamma(x);
            let rhs = gamma(x + 1.0) / x;
            assert!(rel_err(lhs, rhs) < 1e-5, "x={x} lhs={lhs} rhs={rhs}");
        }
    }

    #[test]
    fn gamma_integers_are_factorials() {
        let mut factorial = 1.0f32;
        for n in 1..12 {
            assert!(rel_err(gamma(n as f32), factorial) < 1e-5, "n={n}");
            factorial *= n as f32;
        }
        assert!(rel_err(gamma(0.5), std::f32::consts::PI.sqrt()) < 1e-5);
    }

    #[test]
    fn gamma_large_argument_uses_stirling() {
        // Γ(15) = 14!
        assert!(rel_err(gamma(15.0), 87_178_291_200.0) < 1e-4);
    }

    #[test]
    fn log_gamma_reference_values() {
        let cases = [
            (0.5f32, 0.572_364_9f32),
            (1.0, 0.0),
            (2.0, 0.0),
            (5.5, 3.957_813_9),
            (20.0, 39.339_885),
            (-0.5, 1.265_512_1),
            (-2.5, -0.056_243_66),
        ];
        for (x, want) in cases {
            let got = log_gamma(x);
            assert!((got - want).abs() < 1e-4, "x={x} got={got} want={want}");
        }
    }

    #[test]
    fn log_gamma_poles_are_infinite() {
        assert_eq!(log_gamma(0.0), f32::INFINITY);
        assert_eq!(log_gamma(-0.0), f32::INFINITY);
        assert_eq!(log_gamma(-3.0), f32::INFINITY);
    }

    #[test]
    fn log_gamma_of_infinity_is_infinite() {
        assert_eq!(log_gamma(f32::INFINITY), f32::INFINITY);
        assert_eq!(log_gamma(f32::NEG_INFINITY), f32::INFINITY);
        assert!(log_gamma(f32::NAN).is_nan());
    }

    #[test]
    fn sin_pi_is_exact_at_integers() {
        assert_eq!(sin_pi(4.0), 0.0);
        assert_eq!(sin_pi(-7.0), 0.0);
        assert!((sin_pi(0.5) - 1.0).abs() < 1e-6);
        assert!((sin_pi(-0.5) + 1.0).abs() < 1e-6);
        assert!((sin_pi(1001.25) - sin_pi(1.25)).abs() < 1e-6);
    }
}
