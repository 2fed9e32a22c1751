use bytemuck::{Pod, Zeroable};

/// Uniform block at binding 2. The polygamma order is split into two words
/// because WGSL has no 64-bit integers.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct SpecialParams {
    pub len: u32,
    pub offset: u32,
    pub order_lo: u32,
    pub order_hi: i32,
}

impl SpecialParams {
    pub fn new(len: u32, offset: u32, order: i64) -> Self {
        Self {
            len,
            offset,
            order_lo: order as u32,
            order_hi: (order >> 32) as i32,
        }
    }
}
