//! Shared numeric constants. The WGSL template in `shaders::special` carries
//! the same values; keep both in sync.

pub const EULER_MASCHERONI: f32 = 0.577_215_664_901_532_860_606_512_090;
pub const HALF_LOG_TWO_PI: f32 = 0.918_938_533_204_672_741_780_329_736_405_62;
pub const LOG_PI: f32 = 1.144_729_885_849_400_174_143_427_351_353_05;
pub const PI: f32 = std::f32::consts::PI;
pub const PI_SQUARED: f32 = 9.869_604_401_089_358_618_834_490_999_876_15;
pub const MACHEP: f32 = 1.110_223_024_625_156_540_42e-16;
/// ψ(10)
pub const PSI_10: f32 = 2.251_752_589_066_721_107_64;

/// Gamma reduction thresholds.
pub const GAMMA_SMALL_X: f32 = 0.001;
pub const GAMMA_ASYMPTOTIC_X: f32 = 12.0;

pub const DIGAMMA_SHIFT_TARGET: f32 = 10.0;
pub const DIGAMMA_ASYMPTOTIC_LIMIT: f32 = 1.0e17;

/// Asymptotic digamma coefficients, highest power of `1/x²` first.
pub const DIGAMMA_COEF: [f32; 7] = [
    8.333_333_333_333_333_333_33e-2,
    -2.109_279_609_279_609_279_61e-2,
    7.575_757_575_757_575_757_58e-3,
    -4.166_666_666_666_666_666_67e-3,
    3.968_253_968_253_968_253_97e-3,
    -8.333_333_333_333_333_333_33e-3,
    8.333_333_333_333_333_333_33e-2,
];

/// Rational approximation of Γ over (1,2), numerator.
pub const GAMMA_NUMERATOR_COEF: [f32; 8] = [
    -1.716_185_138_865_494_925_338_11e0,
    2.476_565_080_557_591_991_083_14e1,
    -3.798_042_564_709_456_350_975_77e2,
    6.293_311_553_128_184_426_610_52e2,
    8.669_662_027_904_132_112_950_64e2,
    -3.145_127_296_884_836_752_543_57e4,
    -3.614_441_341_869_117_298_070_69e4,
    6.645_614_382_024_054_406_278_55e4,
];

/// Rational approximation of Γ over (1,2), denominator.
pub const GAMMA_DENOMINATOR_COEF: [f32; 8] = [
    -3.084_023_001_197_389_752_543_53e1,
    3.153_506_269_796_041_615_291_44e2,
    -1.015_156_367_490_219_141_661_46e3,
    -3.107_771_671_572_311_094_404_44e3,
    2.253_811_842_098_015_103_301_12e4,
    4.755_846_277_527_881_107_678_15e3,
    -1.346_599_598_649_693_063_924_56e5,
    -1.151_322_596_755_534_834_972_11e5,
];

/// Stirling series coefficients for log Γ, lowest power of `1/x²` first.
pub const LGAMMA_EXPANSION_COEF: [f32; 8] = [
    1.0 / 12.0,
    -1.0 / 360.0,
    1.0 / 1260.0,
    -1.0 / 1680.0,
    1.0 / 1188.0,
    -691.0 / 360_360.0,
    1.0 / 156.0,
    -3617.0 / 122_400.0,
];

/// Euler–Maclaurin denominators for the Hurwitz zeta tail.
pub const ZETA_EXPANSION: [f32; 12] = [
    12.0,
    -720.0,
    30240.0,
    -1_209_600.0,
    47_900_160.0,
    -1.892_437_580_318_379_160_6e9,
    7.472_424_96e10,
    -2.950_130_727_918_164_224e12,
    1.164_678_281_435_006_724_9e14,
    -4.597_978_722_407_472_610_5e15,
    1.815_210_540_194_354_677_3e17,
    -7.166_165_256_175_667_011_3e18,
];
