//! Metal device context and the [`Backend`] implementation.

use crate::error::{MetalError, Result};
use crate::kernels::MetalKernel;
use metal::{Buffer, CommandQueue, Device, MTLResourceOptions};
use spmm_tune::{Backend, DevicePtr, KernelParam, LaunchGeometry};
use std::time::{Duration, Instant};

/// Row alignment, in bytes, of buffers tagged `align`.
pub const ALIGNMENT_BYTES: usize = 32;

/// Metal context for autotuned sparse multiplies.
///
/// Holds the device and its command queue. Kernels are compiled on demand
/// from generated source, so unlike a fixed-kernel context there is no
/// pipeline table here; compiled kernels live in the kernel cache.
pub struct MetalContext {
    device: Device,
    command_queue: CommandQueue,
    epoch: Instant,
}

impl MetalContext {
    /// Create a new Metal context on the default system device.
    pub fn new() -> Result<Self> {
        let device = Device::system_default().ok_or(MetalError::NoDevice)?;
        Ok(Self::from_device(device))
    }

    /// Create a context from an existing device.
    pub fn from_device(device: Device) -> Self {
        let command_queue = device.new_command_queue();
        log::debug!("Metal context on {}", device.name());
        Self {
            device,
            command_queue,
            epoch: Instant::now(),
        }
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn command_queue(&self) -> &CommandQueue {
        &self.command_queue
    }

    /// Get GPU device name.
    pub fn device_name(&self) -> String {
        self.device.name().to_string()
    }

    /// Allocate a zeroed shared-storage buffer of `len` bytes.
    pub fn alloc_buffer(&self, len: usize) -> Result<Buffer> {
        // Metal rejects zero-length buffers
        let byte_len = len.max(1);
        let buffer = self
            .device
            .new_buffer(byte_len as u64, MTLResourceOptions::StorageModeShared);
        let ptr = buffer.contents() as *mut u8;
        if ptr.is_null() {
            return Err(MetalError::BufferCreation(format!(
                "no host mapping for {byte_len}-byte buffer"
            )));
        }
        unsafe {
            std::ptr::write_bytes(ptr, 0, byte_len);
        }
        Ok(buffer)
    }
}

impl Backend for MetalContext {
    type Buffer = Buffer;
    type Kernel = MetalKernel;
    type Queue = CommandQueue;
    type Error = MetalError;

    fn queue(&self) -> &CommandQueue {
        &self.command_queue
    }

    fn alignment_bytes(&self) -> usize {
        ALIGNMENT_BYTES
    }

    fn compile(&self, name: &str, source: &str, params: &[KernelParam]) -> Result<MetalKernel> {
        MetalKernel::compile(&self.device, name, source, params)
    }

    fn launch(
        &self,
        queue: &CommandQueue,
        kernel: &MetalKernel,
        geometry: &LaunchGeometry,
        args: &[DevicePtr<'_, Self>],
    ) -> Result<()> {
        kernel.launch(queue, geometry, args)
    }

    fn buffer_len(&self, buffer: &Buffer) -> usize {
        buffer.length() as usize
    }

    fn read_buffer(&self, buffer: &Buffer) -> Result<Vec<u8>> {
        let len = buffer.length() as usize;
        let ptr = buffer.contents() as *const u8;
        if ptr.is_null() {
            return Err(MetalError::BufferCreation(
                "buffer has no host mapping".to_string(),
            ));
        }
        let mut data = vec![0u8; len];
        unsafe {
            std::ptr::copy_nonoverlapping(ptr, data.as_mut_ptr(), len);
        }
        Ok(data)
    }

    fn write_buffer(&self, buffer: &Buffer, bytes: &[u8]) -> Result<()> {
        let len = buffer.length() as usize;
        if bytes.len() != len {
            return Err(MetalError::DimensionMismatch(format!(
                "buffer holds {len} bytes, got {}",
                bytes.len()
            )));
        }
        let ptr = buffer.contents() as *mut u8;
        if ptr.is_null() {
            return Err(MetalError::BufferCreation(
                "buffer has no host mapping".to_string(),
            ));
        }
        unsafe {
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), ptr, len);
        }
        Ok(())
    }

    fn timestamp(&self) -> Duration {
        self.epoch.elapsed()
    }
}
