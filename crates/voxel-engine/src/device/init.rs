/// Initialization parameters for the GPU layer.
#[derive(Debug, Clone)]
pub struct GpuInit {
    /// Prefer an sRGB surface format when available.
    pub prefer_srgb: bool,

    pub present_mode: wgpu::PresentMode,

    /// Used when the surface supports it; otherwise the first supported mode.
    pub alpha_mode: Option<wgpu::CompositeAlphaMode>,

    pub required_features: wgpu::Features,

    /// Baseline limits requested from the device.
    pub required_limits: wgpu::Limits,

    /// Raise the buffer size limits to whatever the adapter offers.
    ///
    /// Fragment storage grows with the window area and the transparency
    /// depth; the portable defaults cap it at 128 MiB.
    pub adapter_buffer_limits: bool,

    /// Hint; support depends on platform/backend.
    pub desired_maximum_frame_latency: u32,
}

impl Default for GpuInit {
    fn default() -> Self {
        Self {
            prefer_srgb: true,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: None,
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            adapter_buffer_limits: true,
            desired_maximum_frame_latency: 2,
        }
    }
}

impl GpuInit {
    /// Limits to request from `adapter`.
    ///
    /// Falls back to the downlevel defaults (at the adapter's texture
    /// resolution) when the adapter cannot satisfy `required_limits`. Buffer
    /// sizes never exceed what the adapter reports.
    pub(crate) fn limits_for(&self, adapter: &wgpu::Limits) -> wgpu::Limits {
        let mut limits = if self.required_limits.check_limits(adapter) {
            self.required_limits.clone()
        } else {
            log::warn!("adapter is below the requested limits; using downlevel defaults");
            wgpu::Limits::downlevel_defaults().using_resolution(adapter.clone())
        };

        if self.adapter_buffer_limits {
            limits.max_buffer_size = adapter.max_buffer_size;
            limits.max_storage_buffer_binding_size = adapter.max_storage_buffer_binding_size;
        } else {
            limits.max_buffer_size = limits.max_buffer_size.min(adapter.max_buffer_size);
            limits.max_storage_buffer_binding_size = limits
                .max_storage_buffer_binding_size
                .min(adapter.max_storage_buffer_binding_size);
        }
        limits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adapter_buffer_limits_follow_the_adapter() {
        let adapter = wgpu::Limits {
            max_buffer_size: 1 << 34,
            max_storage_buffer_binding_size: 1 << 31,
            ..wgpu::Limits::default()
        };
        let init = GpuInit::default();
        let limits = init.limits_for(&adapter);
        assert_eq!(limits.max_buffer_size, 1 << 34);
        assert_eq!(limits.max_storage_buffer_binding_size, 1 << 31);
        assert!(limits.check_limits(&adapter));

        let fixed = GpuInit { adapter_buffer_limits: false, ..GpuInit::default() };
        assert_eq!(fixed.limits_for(&adapter), wgpu::Limits::default());
    }

    #[test]
    fn downlevel_adapter_gets_limits_it_supports() {
        let adapter = wgpu::Limits {
            max_buffer_size: 1 << 20,
            ..wgpu::Limits::downlevel_defaults()
        };
        assert!(!wgpu::Limits::default().check_limits(&adapter));

        for init in [GpuInit::default(), GpuInit { adapter_buffer_limits: false, ..GpuInit::default() }] {
            let limits = init.limits_for(&adapter);
            assert!(limits.check_limits(&adapter), "{:?}", init.adapter_buffer_limits);
            assert_eq!(limits.max_buffer_size, 1 << 20);
        }
    }
}
