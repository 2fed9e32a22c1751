use super::constants::PI_SQUARED;
use super::digamma::digamma;
use super::gamma::{gamma, sin_pi};
use super::zeta::calc_zeta;

/// ψ'(x), polygamma of order 1.
pub fn calc_trigamma(x: f32) -> f32 {
    let mut x = x;
    let mut sign = 1.0f32;
    let mut result = 0.0f32;
    if x < 0.5 {
        // ψ'(1-x) + ψ'(x) = π²/sin²(πx)
        sign = -1.0;
        let sin_pi_x = sin_pi(x);
        result -= PI_SQUARED / (sin_pi_x * sin_pi_x);
        x = 1.0 - x;
    }
    for _ in 0..6 {
        result += 1.0 / (x * x);
        x += 1.0;
    }
    let ixx = 1.0 / (x * x);
    result += (1.0 + 1.0 / (2.0 * x) + ixx * (1.0 / 6.0 - ixx * (1.0 / 30.0 - ixx * (1.0 / 42.0))))
        / x;
    sign * result
}

/// ψ⁽ⁿ⁾(x) = (-1)^(n+1) n! ζ(n+1, x) for `n ≥ 2`.
pub fn calc_polygamma(order: i64, x: f32) -> f32 {
    let n = order as f32;
    let sign = if order % 2 == 1 { 1.0f32 } else { -1.0 };
    sign * gamma(n + 1.0) * calc_zeta(n + 1.0, x)
}

/// Order-dispatched polygamma: 0 is digamma, 1 is trigamma, the rest go
/// through the zeta formula.
pub fn polygamma(order: i64, x: f32) -> f32 {
    match order {
        0 => digamma(x),
        1 => calc_trigamma(x),
        _ => calc_polygamma(order, x),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rel_err(a: f32, b: f32) -> f32 {
        ((a - b) / b).abs()
    }

    #[test]
    fn trigamma_reference_values() {
        let cases = [
            (1.0f32, 1.644_934_1f32),
            (0.25, 17.197_329),
            (3.0, 0.394_934_07),
            (25.0, 0.040_810_66),
            (-0.5, 8.934_802),
            (0.1, 101.433_3),
        ];
        for (x, want) in cases {
            let got = calc_trigamma(x);
            assert!(rel_err(got, want) < 1e-4, "x={x} got={got} want={want}");
        }
    }

    #[test]
    fn trigamma_poles_are_positive_infinity() {
        assert_eq!(calc_trigamma(0.0), f32::INFINITY);
        assert_eq!(calc_trigamma(-3.0), f32::INFINITY);
    }

    #[test]
    fn higher_orders_carry_alternating_sign() {
        let cases = [
            (2i64, 1.0f32, -2.404_113_8f32),
            (3, 2.5, 0.223_905_85),
            (2, 0.3, -75.272_54),
            (4, 7.0, -0.003_296_772),
            (2, -0.5, -0.828_796_6),
        ];
        for (n, x, want) in cases {
            let got = polygamma(n, x);
            assert!(rel_err(got, want) < 1e-3, "n={n} x={x} got={got} want={want}");
        }
    }

    #[test]
    fn low_orders_route_to_dedicated_kernels() {
        let mut x = 0.05f32;
        while x < 50.0 {
            assert!((polygamma(0, x) - digamma(x)).abs() < 1e-4);
            assert!((polygamma(1, x) - calc_trigamma(x)).abs() < 1e-4);
            x += 0.73;
        }
    }
}
