//! Backend selection for the Burn framework.
//!
//! The backend is a compile-time choice with a fixed preference order:
//! CUDA when the `cuda` feature is enabled, otherwise WGPU when the `wgpu`
//! feature is enabled, otherwise the NdArray CPU backend. Runtime probing
//! only reports whether the compiled backend matches the hardware it finds.

use burn::backend::Autodiff;

#[cfg(feature = "cuda")]
pub type DefaultBackend = burn::backend::Cuda;

#[cfg(all(feature = "wgpu", not(feature = "cuda")))]
pub type DefaultBackend = burn::backend::Wgpu;

#[cfg(all(not(feature = "cuda"), not(feature = "wgpu")))]
pub type DefaultBackend = burn::backend::NdArray;

/// The autodiff backend used for training
pub type TrainingBackend = Autodiff<DefaultBackend>;

/// Get the default device for the selected backend
pub fn default_device() -> <DefaultBackend as burn::tensor::backend::Backend>::Device {
    Default::default()
}

/// Human-readable name for the compiled backend
pub fn backend_name() -> &'static str {
    #[cfg(feature = "cuda")]
    {
        "CUDA (GPU)"
    }
    #[cfg(all(feature = "wgpu", not(feature = "cuda")))]
    {
        "WGPU (GPU)"
    }
    #[cfg(all(not(feature = "cuda"), not(feature = "wgpu")))]
    {
        "NdArray (CPU)"
    }
}

/// Check whether an NVIDIA GPU is visible to this process
pub fn has_nvidia_gpu() -> bool {
    #[cfg(target_os = "linux")]
    {
        std::path::Path::new("/proc/driver/nvidia/version").exists()
            || std::path::Path::new("/dev/nvidia0").exists()
            || std::env::var("CUDA_VISIBLE_DEVICES").is_ok()
    }

    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("nvidia-smi.exe")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    #[cfg(not(any(target_os = "linux", target_os = "windows")))]
    {
        false
    }
}

/// Report the compiled backend and warn when it does not match the hardware
/// this process can see.
pub fn report_backend_choice() {
    tracing::info!("Backend: {}", backend_name());

    let gpu = has_nvidia_gpu();
    if gpu && cfg!(not(any(feature = "cuda", feature = "wgpu"))) {
        tracing::warn!(
            "NVIDIA GPU detected but built for the CPU backend; rebuild with --features cuda or wgpu"
        );
    }
    if cfg!(feature = "cuda") && !gpu {
        tracing::warn!("built with the CUDA backend but no NVIDIA GPU was detected");
    }
}
