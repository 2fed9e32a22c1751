//! WGSL source for the special-function program.
//!
//! `@IN@` / `@OUT@` are replaced with the element type names of the
//! [`ProgramKey`](crate::types::ProgramKey) and `@WG@` with the workgroup
//! size. Every helper matches its twin in `crate::math`.

pub const SPECIAL_SHADER_TEMPLATE: &str = r#"
struct SrcTensor {
    data: array<@IN@>,
};

struct DstTensor {
    data: array<@OUT@>,
};

struct Params {
    len: u32,
    offset: u32,
    order_lo: u32,
    order_hi: i32,
};

@group(0) @binding(0) var<storage, read> Src: SrcTensor;
@group(0) @binding(1) var<storage, read_write> Dst: DstTensor;
@group(0) @binding(2) var<uniform> params: Params;

const EULER_MASCHERONI: f32 = 0.577215664901532860606512090;
const HALF_LOG_TWO_PI: f32 = 0.91893853320467274178032973640562;
const LOG_PI: f32 = 1.14472988584940017414342735135305;
const PI: f32 = 3.14159265358979323846264338327;
const PI_SQUARED: f32 = 9.86960440108935861883449099987615;
const MACHEP: f32 = 1.11022302462515654042e-16;
const PSI_10: f32 = 2.25175258906672110764;

var<private> DIGAMMA_COEF: array<f32, 7> = array<f32, 7>(
    8.33333333333333333333e-2, -2.10927960927960927961e-2, 7.57575757575757575758e-3,
    -4.16666666666666666667e-3, 3.96825396825396825397e-3, -8.33333333333333333333e-3,
    8.33333333333333333333e-2
);

var<private> GAMMA_NUMERATOR_COEF: array<f32, 8> = array<f32, 8>(
    -1.71618513886549492533811e0, 2.47656508055759199108314e1, -3.79804256470945635097577e2,
    6.29331155312818442661052e2, 8.66966202790413211295064e2, -3.14512729688483675254357e4,
    -3.61444134186911729807069e4, 6.64561438202405440627855e4
);

var<private> GAMMA_DENOMINATOR_COEF: array<f32, 8> = array<f32, 8>(
    -3.08402300119738975254353e1, 3.15350626979604161529144e2, -1.01515636749021914166146e3,
    -3.10777167157231109440444e3, 2.25381184209801510330112e4, 4.75584627752788110767815e3,
    -1.34659959864969306392456e5, -1.15132259675553483497211e5
);

var<private> LGAMMA_EXPANSION_COEF: array<f32, 8> = array<f32, 8>(
    8.33333333333333333333e-2, -2.77777777777777777778e-3, 7.93650793650793650794e-4,
    -5.95238095238095238095e-4, 8.41750841750841750842e-4, -1.91752691752691752692e-3,
    6.41025641025641025641e-3, -2.95506535947712418301e-2
);

var<private> ZETA_EXPANSION: array<f32, 12> = array<f32, 12>(
    12.0, -720.0, 30240.0, -1209600.0, 47900160.0,
    -1.8924375803183791606e9, 7.47242496e10, -2.950130727918164224e12,
    1.1646782814350067249e14, -4.5979787224074726105e15,
    1.8152105401943546773e17, -7.1661652561756670113e18
);

fn inf_f32() -> f32 {
    return bitcast<f32>(0x7f800000u);
}

fn nan_f32() -> f32 {
    return bitcast<f32>(0x7fc00000u);
}

fn copysign_f32(magnitude: f32, sign_source: f32) -> f32 {
    let bits = (bitcast<u32>(magnitude) & 0x7fffffffu) | (bitcast<u32>(sign_source) & 0x80000000u);
    return bitcast<f32>(bits);
}

fn sin_pi(x: f32) -> f32 {
    if (x == trunc(x)) {
        return 0.0;
    }
    let r = x - 2.0 * floor(x * 0.5);
    return sin(PI * r);
}

// pow() is undefined for negative bases; integral exponents keep their sign.
fn pow_signed(base: f32, exponent: f32) -> f32 {
    if (base < 0.0 && exponent == trunc(exponent)) {
        let magnitude = pow(-base, exponent);
        let halved = exponent * 0.5;
        if (halved != trunc(halved)) {
            return -magnitude;
        }
        return magnitude;
    }
    return pow(base, exponent);
}

fn stirling_log_gamma(x: f32) -> f32 {
    let z = 1.0 / (x * x);
    var sum = LGAMMA_EXPANSION_COEF[7];
    for (var i: i32 = 6; i >= 0; i = i - 1) {
        sum = sum * z;
        sum = sum + LGAMMA_EXPANSION_COEF[i];
    }
    let series = sum / x;
    return (x - 0.5) * log(x) - x + HALF_LOG_TWO_PI + series;
}

fn gamma_fn(x: f32) -> f32 {
    if (x < 0.001) {
        return 1.0 / (x * (1.0 + EULER_MASCHERONI * x));
    }
    if (x >= 12.0) {
        return exp(stirling_log_gamma(x));
    }
    let less_than_one = x < 1.0;
    var y = x;
    var n: i32 = 0;
    if (less_than_one) {
        y = y + 1.0;
    } else {
        n = i32(floor(x)) - 1;
        y = y - f32(n);
    }
    var z = y - 1.0;
    if (less_than_one) {
        z = x;
    }
    var num: f32 = 0.0;
    var den: f32 = 1.0;
    for (var i: i32 = 0; i < 8; i = i + 1) {
        num = (num + GAMMA_NUMERATOR_COEF[i]) * z;
        den = den * z + GAMMA_DENOMINATOR_COEF[i];
    }
    var result = num / den + 1.0;
    if (less_than_one) {
        result = result / x;
    } else {
        for (var i: i32 = 0; i < n; i = i + 1) {
            result = result * y;
            y = y + 1.0;
        }
    }
    return result;
}

fn log_gamma(x_in: f32) -> f32 {
    let is_negative = x_in < 0.0;
    let x = abs(x_in);
    if (x == 0.0 || x == inf_f32()) {
        return inf_f32();
    }
    var lg: f32;
    if (x < 12.0) {
        lg = log(abs(gamma_fn(x)));
    } else {
        lg = stirling_log_gamma(x);
    }
    if (is_negative) {
        return LOG_PI - lg - log(abs(x * sin_pi(x)));
    }
    return lg;
}

fn calc_digamma_positive_domain(x_in: f32) -> f32 {
    var x = x_in;
    var result: f32 = 0.0;
    while (x < 10.0) {
        result = result - 1.0 / x;
        x = x + 1.0;
    }
    if (x == 10.0) {
        return result + PSI_10;
    }
    var y: f32 = 0.0;
    if (x < 1.0e17) {
        let z = 1.0 / (x * x);
        var poly: f32 = 0.0;
        for (var i: i32 = 0; i <= 6; i = i + 1) {
            poly = poly + DIGAMMA_COEF[i] * pow(z, f32(6 - i));
        }
        y = z * poly;
    }
    return result + log(x) - 0.5 / x - y;
}

fn digamma_value(x: f32) -> f32 {
    if (x < 0.0) {
        if (x == trunc(x)) {
            return nan_f32();
        }
        let r = fract(x);
        return calc_digamma_positive_domain(1.0 - x) - PI / tan(PI * r);
    }
    if (x == 0.0) {
        return copysign_f32(inf_f32(), -x);
    }
    return calc_digamma_positive_domain(x);
}

fn calc_zeta(x: f32, q: f32) -> f32 {
    if (x == 1.0) {
        return inf_f32();
    }
    if (x < 1.0) {
        return nan_f32();
    }
    if (q <= 0.0) {
        if (q == trunc(q)) {
            return inf_f32();
        }
        if (x != trunc(x)) {
            return nan_f32();
        }
    }
    var s = pow_signed(q, -x);
    var a = q;
    var i: i32 = 0;
    var b: f32 = 0.0;
    while (i < 9 || a <= 9.0) {
        i = i + 1;
        a = a + 1.0;
        b = pow_signed(a, -x);
        s = s + b;
        if (-MACHEP * s < b && b < MACHEP * s) {
            return s;
        }
    }
    let w = a;
    s = s + b * w / (x - 1.0);
    s = s - 0.5 * b;
    a = 1.0;
    var k: f32 = 0.0;
    for (var j: i32 = 0; j < 12; j = j + 1) {
        a = a * (x + k);
        b = b / w;
        let t = a * b / ZETA_EXPANSION[j];
        s = s + t;
        if (abs(t / s) < MACHEP) {
            return s;
        }
        k = k + 1.0;
        a = a * (x + k);
        b = b / w;
        k = k + 1.0;
    }
    return s;
}

fn calc_trigamma(x_in: f32) -> f32 {
    var x = x_in;
    var sgn: f32 = 1.0;
    var result: f32 = 0.0;
    if (x < 0.5) {
        sgn = -1.0;
        let sin_pi_x = sin_pi(x);
        result = result - PI_SQUARED / (sin_pi_x * sin_pi_x);
        x = 1.0 - x;
    }
    for (var i: i32 = 0; i < 6; i = i + 1) {
        result = result + 1.0 / (x * x);
        x = x + 1.0;
    }
    let ixx = 1.0 / (x * x);
    result = result + (1.0 + 1.0 / (2.0 * x) + ixx * (1.0 / 6.0 - ixx * (1.0 / 30.0 - ixx * (1.0 / 42.0)))) / x;
    return sgn * result;
}

fn calc_polygamma(x: f32) -> f32 {
    let n = f32(params.order_hi) * 4294967296.0 + f32(params.order_lo);
    var sgn: f32 = -1.0;
    if ((params.order_lo & 1u) == 1u) {
        sgn = 1.0;
    }
    return sgn * gamma_fn(n + 1.0) * calc_zeta(n + 1.0, x);
}

fn load_input(idx: u32) -> f32 {
    return f32(Src.data[idx]);
}

fn store_output(idx: u32, value: f32) {
    Dst.data[idx] = @OUT@(value);
}

@compute @workgroup_size(@WG@)
fn lgamma(@builtin(global_invocation_id) gid: vec3<u32>) {
    let lane = gid.x;
    if (lane >= params.len) {
        return;
    }
    let idx = params.offset + lane;
    store_output(idx, log_gamma(load_input(idx)));
}

@compute @workgroup_size(@WG@)
fn digamma(@builtin(global_invocation_id) gid: vec3<u32>) {
    let lane = gid.x;
    if (lane >= params.len) {
        return;
    }
    let idx = params.offset + lane;
    store_output(idx, digamma_value(load_input(idx)));
}

@compute @workgroup_size(@WG@)
fn trigamma(@builtin(global_invocation_id) gid: vec3<u32>) {
    let lane = gid.x;
    if (lane >= params.len) {
        return;
    }
    let idx = params.offset + lane;
    store_output(idx, calc_trigamma(load_input(idx)));
}

@compute @workgroup_size(@WG@)
fn polygamma(@builtin(global_invocation_id) gid: vec3<u32>) {
    let lane = gid.x;
    if (lane >= params.len) {
        return;
    }
    let idx = params.offset + lane;
    store_output(idx, calc_polygamma(load_input(idx)));
}
"#;
