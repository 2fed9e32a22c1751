//! Autograd fallback policy for custom numerical operators.
//!
//! Operators that ship without their own differentiation rule (the special
//! function kernels among them) are reached through a boxed fallback on every
//! autograd dispatch key. The fallback does not record a graph node: it
//! forwards to the primal computation, so results carry no gradient support.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DispatchKey {
    AutogradOther,
    AutogradCPU,
    AutogradXPU,
    AutogradCUDA,
    AutogradXLA,
    AutogradLazy,
    AutogradMPS,
    AutogradMeta,
    AutogradHPU,
    ADInplaceOrView,
    AutogradPrivateUse1,
    AutogradPrivateUse2,
    AutogradPrivateUse3,
    CPU,
    CUDA,
    MPS,
    Wgpu,
}

impl DispatchKey {
    pub const ALL: [DispatchKey; 17] = [
        DispatchKey::AutogradOther,
        DispatchKey::AutogradCPU,
        DispatchKey::AutogradXPU,
        DispatchKey::AutogradCUDA,
        DispatchKey::AutogradXLA,
        DispatchKey::AutogradLazy,
        DispatchKey::AutogradMPS,
        DispatchKey::AutogradMeta,
        DispatchKey::AutogradHPU,
        DispatchKey::ADInplaceOrView,
        DispatchKey::AutogradPrivateUse1,
        DispatchKey::AutogradPrivateUse2,
        DispatchKey::AutogradPrivateUse3,
        DispatchKey::CPU,
        DispatchKey::CUDA,
        DispatchKey::MPS,
        DispatchKey::Wgpu,
    ];

    pub fn is_autograd(self) -> bool {
        !matches!(
            self,
            DispatchKey::CPU | DispatchKey::CUDA | DispatchKey::MPS | DispatchKey::Wgpu
        )
    }
}

/// Fallback registered for a dispatch key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FallbackKind {
    /// Boxed autograd fallback, see [`autograd_fallback`].
    AutogradFallback,
    /// Skip the key entirely and continue with the next one.
    Fallthrough,
}

/// Fallback for `key`, or `None` when nothing is registered.
///
/// Private-use autograd keys are left for extensions to fill. Backend keys
/// never carry a fallback.
pub fn fallback_for(key: DispatchKey) -> Option<FallbackKind> {
    match key {
        DispatchKey::AutogradOther
        | DispatchKey::AutogradCPU
        | DispatchKey::AutogradXPU
        | DispatchKey::AutogradCUDA
        | DispatchKey::AutogradXLA
        | DispatchKey::AutogradLazy
        | DispatchKey::AutogradMPS
        | DispatchKey::AutogradMeta
        | DispatchKey::AutogradHPU => Some(FallbackKind::AutogradFallback),
        DispatchKey::ADInplaceOrView => Some(FallbackKind::Fallthrough),
        DispatchKey::AutogradPrivateUse1
        | DispatchKey::AutogradPrivateUse2
        | DispatchKey::AutogradPrivateUse3 => None,
        DispatchKey::CPU | DispatchKey::CUDA | DispatchKey::MPS | DispatchKey::Wgpu => None,
    }
}

/// What the boxed fallback does once invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AutogradDecision {
    /// Builds without variable hooks: re-dispatch with every autograd key
    /// masked off.
    RedispatchBelowAutograd,
    /// Builds with hooks: the "not implemented" fallback runs the primal op
    /// and marks outputs as non-differentiable.
    NotImplementedFallback,
}

pub fn autograd_fallback(hooks_available: bool) -> AutogradDecision {
    if hooks_available {
        AutogradDecision::NotImplementedFallback
    } else {
        AutogradDecision::RedispatchBelowAutograd
    }
}
