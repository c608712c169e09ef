//! Owned wgpu device context for the wgpu backend.

use std::fmt;
use std::sync::Arc;

/// Errors raised while creating a [`GraphicsContext`].
#[derive(Debug)]
pub enum GraphicsError {
    /// No adapter matched the requested options.
    NoAdapter(wgpu::RequestAdapterError),
    /// The adapter refused to create a device.
    DeviceRequest(wgpu::RequestDeviceError),
}

impl fmt::Display for GraphicsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphicsError::NoAdapter(err) => {
                write!(f, "Failed to find a suitable GPU adapter: {}", err)
            }
            GraphicsError::DeviceRequest(err) => write!(f, "Failed to create device: {}", err),
        }
    }
}

impl std::error::Error for GraphicsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GraphicsError::NoAdapter(err) => Some(err),
            GraphicsError::DeviceRequest(err) => Some(err),
        }
    }
}

/// Options for [`GraphicsContext::new_owned_with_descriptor`].
#[derive(Debug, Clone)]
pub struct GraphicsContextDescriptor {
    pub backends: wgpu::Backends,
    pub power_preference: wgpu::PowerPreference,
    pub force_fallback_adapter: bool,
    pub limits: wgpu::Limits,
    pub label: Option<&'static str>,
}

impl Default for GraphicsContextDescriptor {
    fn default() -> Self {
        Self {
            backends: wgpu::Backends::all(),
            power_preference: wgpu::PowerPreference::HighPerformance,
            force_fallback_adapter: false,
            limits: wgpu::Limits::default(),
            label: Some("spritebatch device"),
        }
    }
}

/// A shared wgpu instance, adapter, device and queue.
///
/// ```rust,no_run
/// use spritebatch::GraphicsContext;
///
/// let ctx = GraphicsContext::new_owned_sync().expect("graphics context");
/// let ctx2 = ctx.clone(); // Arc clone
/// ```
pub struct GraphicsContext {
    pub instance: wgpu::Instance,
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
}

impl GraphicsContext {
    pub async fn new_owned() -> Result<Arc<Self>, GraphicsError> {
        Self::new_owned_with_descriptor(GraphicsContextDescriptor::default()).await
    }

    /// Blocks the current thread until the context is created.
    pub fn new_owned_sync() -> Result<Arc<Self>, GraphicsError> {
        pollster::block_on(Self::new_owned())
    }

    pub async fn new_owned_with_descriptor(
        descriptor: GraphicsContextDescriptor,
    ) -> Result<Arc<Self>, GraphicsError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: descriptor.backends,
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: descriptor.power_preference,
                compatible_surface: None,
                force_fallback_adapter: descriptor.force_fallback_adapter,
            })
            .await
            .map_err(GraphicsError::NoAdapter)?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                required_features: wgpu::Features::empty(),
                required_limits: descriptor.limits.clone(),
                label: descriptor.label,
                ..Default::default()
            })
            .await
            .map_err(GraphicsError::DeviceRequest)?;

        tracing::info!(adapter = ?adapter.get_info().name, "created graphics context");

        Ok(Arc::new(Self {
            instance,
            adapter,
            device,
            queue,
        }))
    }

    pub fn info(&self) -> wgpu::AdapterInfo {
        self.adapter.get_info()
    }

    pub fn limits(&self) -> wgpu::Limits {
        self.device.limits()
    }
}

impl fmt::Debug for GraphicsContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphicsContext")
            .field("adapter", &self.adapter.get_info().name)
            .finish_non_exhaustive()
    }
}
