use super::constants::{
    DIGAMMA_ASYMPTOTIC_LIMIT, DIGAMMA_COEF, DIGAMMA_SHIFT_TARGET, PI, PSI_10,
};

/// How an argument is routed through [`digamma`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigammaDomain {
    /// Negative integer.
    Pole,
    /// Signed zero.
    Zero,
    NegativeNonInteger,
    /// Positive reals, plus NaN and +∞ which flow through unchanged.
    Positive,
}

impl DigammaDomain {
    pub fn classify(x: f32) -> Self {
        if x < 0.0 {
            if x == x.trunc() {
                DigammaDomain::Pole
            } else {
                DigammaDomain::NegativeNonInteger
            }
        } else if x == 0.0 {
            DigammaDomain::Zero
        } else {
            DigammaDomain::Positive
        }
    }
}

/// ψ(x) for `x > 0`.
pub fn calc_digamma_positive_domain(x: f32) -> f32 {
    let mut x = x;
    let mut result = 0.0f32;
    while x < DIGAMMA_SHIFT_TARGET {
        result -= 1.0 / x;
        x += 1.0;
    }
    if x == DIGAMMA_SHIFT_TARGET {
        return result + PSI_10;
    }

    let mut y = 0.0f32;
    if x < DIGAMMA_ASYMPTOTIC_LIMIT {
        let z = 1.0 / (x * x);
        // Power loop, A[0] (highest power) summed first.
        let mut poly = 0.0f32;
        for (i, coef) in DIGAMMA_COEF.iter().enumerate() {
            poly += coef * z.powi(6 - i as i32);
        }
        y = z * poly;
    }
    result + x.ln() - 0.5 / x - y
}

pub fn digamma(x: f32) -> f32 {
    match DigammaDomain::classify(x) {
        DigammaDomain::Pole => f32::NAN,
        DigammaDomain::Zero => f32::INFINITY.copysign(-x),
        DigammaDomain::NegativeNonInteger => {
            // tan(π·frac(x)) == tan(πx) but avoids forming πx for large |x|.
            let r = x - x.floor();
            calc_digamma_positive_domain(1.0 - x) - PI / (PI * r).tan()
        }
        DigammaDomain::Positive => calc_digamma_positive_domain(x),
    }
}
