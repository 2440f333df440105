// ============================================================
// Layer 5 — Compute Device Selection
// ============================================================
// Maps the `--device` flag onto a Burn backend:
//
//   gpu → Autodiff<Wgpu>     (Vulkan / Metal / DX12 via wgpu)
//   cpu → Autodiff<NdArray>
//
// Everything downstream is generic over AutodiffBackend, so the
// choice is made exactly once, in the application layer.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

pub type GpuBackend      = burn::backend::Autodiff<burn::backend::Wgpu>;
pub type CpuBackend      = burn::backend::Autodiff<burn::backend::NdArray>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    Gpu,
    Cpu,
}

impl DeviceKind {
    pub fn gpu_device() -> burn::backend::wgpu::WgpuDevice {
        burn::backend::wgpu::WgpuDevice::default()
    }

    pub fn cpu_device() -> burn::backend::ndarray::NdArrayDevice {
        burn::backend::ndarray::NdArrayDevice::Cpu
    }
}
