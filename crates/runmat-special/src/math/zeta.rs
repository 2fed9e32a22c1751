use super::constants::{MACHEP, ZETA_EXPANSION};

/// Hurwitz zeta ζ(x, q) = Σ (q+k)^-x, used by polygamma orders ≥ 2.
///
/// Direct summation until the base passes 9, then an Euler–Maclaurin tail
/// with the fixed expansion constants.
pub fn calc_zeta(x: f32, q: f32) -> f32 {
    if x == 1.0 {
        return f32::INFINITY;
    }
    if x < 1.0 {
        return f32::NAN;
    }
    if q <= 0.0 {
        if q == q.trunc() {
            return f32::INFINITY;
        }
        if x != x.trunc() {
            return f32::NAN;
        }
    }

    let mut s = q.powf(-x);
    let mut a = q;
    let mut i = 0;
    let mut b = 0.0f32;
    while i < 9 || a <= 9.0 {
        i += 1;
        a += 1.0;
        b = a.powf(-x);
        s += b;
        if -MACHEP * s < b && b < MACHEP * s {
            return s;
        }
    }

    let w = a;
    s += b * w / (x - 1.0);
    s -= 0.5 * b;
    let mut a = 1.0f32;
    let mut k = 0.0f32;
    for expansion in ZETA_EXPANSION {
        a *= x + k;
        b /= w;
        let t = a * b / expansion;
        s += t;
        if (t / s).abs() < MACHEP {
            return s;
        }
        k += 1.0;
        a *= x + k;
        b /= w;
        k += 1.0;
    }
    s
}
