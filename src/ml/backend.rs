// ============================================================
// Layer 5: Compute Backend Selection
// ============================================================
// Decides once, at startup, where tensors live:
//
//   Wgpu    → GPU through wgpu (Vulkan / Metal / DX12)
//   NdArray → CPU
//
// With the `auto` choice the GPU is tested by running one tiny
// tensor op; if wgpu cannot initialise an adapter the check
// panics inside catch_unwind and we fall back to the CPU.

use std::{panic, sync::Arc, thread};

use burn::{
    backend::{ndarray::NdArrayDevice, wgpu::WgpuDevice},
    prelude::*,
};
use serde::{Deserialize, Serialize};

pub type GpuBackend = burn::backend::Wgpu;
pub type CpuBackend = burn::backend::NdArray;

/// What the user asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendChoice {
    #[default]
    Auto,
    Wgpu,
    Cpu,
}

/// What the run actually uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComputeBackend {
    Wgpu,
    Cpu,
}

impl ComputeBackend {
    pub fn resolve(choice: BackendChoice) -> Self {
        let backend = match choice {
            BackendChoice::Cpu  => Self::Cpu,
            BackendChoice::Wgpu => Self::Wgpu,
            BackendChoice::Auto if wgpu_available() => Self::Wgpu,
            BackendChoice::Auto => {
                tracing::warn!("No usable GPU adapter, falling back to the CPU backend");
                Self::Cpu
            }
        };
        tracing::info!("Compute backend: {:?}", backend);
        backend
    }

    pub fn wgpu_device() -> WgpuDevice {
        WgpuDevice::default()
    }

    pub fn cpu_device() -> NdArrayDevice {
        NdArrayDevice::Cpu
    }
}

fn wgpu_available() -> bool {
    succeeds_quietly(|| {
        let device = WgpuDevice::default();
        let sample = Tensor::<GpuBackend, 1>::from_floats([1.0, 2.0], &device);
        sample.sum().into_scalar().elem::<f32>()
    })
}

/// Runs `f` and reports whether it returned without panicking.
///
/// The panic hook is process-wide. The replacement only swallows
/// panics raised on the calling thread and forwards all others,
/// and `resolve` is called once at startup before any loader
/// threads exist.
fn succeeds_quietly<R>(f: impl FnOnce() -> R + panic::UnwindSafe) -> bool {
    let previous = Arc::new(panic::take_hook());
    let caller = thread::current().id();
    {
        let previous = Arc::clone(&previous);
        panic::set_hook(Box::new(move |info| {
            if thread::current().id() != caller {
                previous(info);
            }
        }));
    }

    let ok = panic::catch_unwind(f).is_ok();

    panic::set_hook(Box::new(move |info| previous(info)));
    ok
}
