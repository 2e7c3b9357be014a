//! Device/runtime seam.
//!
//! A [`Backend`] compiles kernel source at runtime, launches kernels against
//! raw device addresses, and moves buffer contents to and from the host.

use std::fmt;
use std::time::Duration;

/// Kind of a compiled kernel parameter, in binding order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelParam {
    /// A device address (buffer + byte offset).
    DevicePtr,
}

/// Grid and group shape used to dispatch a kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LaunchGeometry {
    /// Number of groups along each axis.
    pub grid: [u64; 3],
    /// Threads per group along each axis.
    pub group: [u64; 3],
}

impl LaunchGeometry {
    pub fn new(grid: [u64; 3], group: [u64; 3]) -> Self {
        Self { grid, group }
    }

    /// One-dimensional dispatch of `groups` groups of `threads` threads.
    pub fn linear(groups: u64, threads: u64) -> Self {
        Self::new([groups, 1, 1], [threads, 1, 1])
    }
}

impl fmt::Display for LaunchGeometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "grid={:?} group={:?}", self.grid, self.group)
    }
}

/// A device address: a buffer plus a byte offset into it.
pub struct DevicePtr<'a, B: Backend + ?Sized> {
    pub buffer: &'a B::Buffer,
    pub offset: usize,
}

impl<'a, B: Backend + ?Sized> Clone for DevicePtr<'a, B> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, B: Backend + ?Sized> Copy for DevicePtr<'a, B> {}

/// Compiles and launches kernels on one device.
///
/// Launches are blocking: `launch` returns once the device has finished
/// executing the kernel.
pub trait Backend {
    /// Device buffer owned by a direct matrix.
    type Buffer;
    /// Compiled, launchable kernel.
    type Kernel;
    /// Execution queue that kernels are submitted to.
    type Queue;
    type Error: std::error::Error + Send + Sync + 'static;

    /// Default execution queue.
    fn queue(&self) -> &Self::Queue;

    /// Row alignment of buffers tagged `align`, in bytes.
    fn alignment_bytes(&self) -> usize;

    /// Compile `source` and look up the entry point `name`.
    fn compile(
        &self,
        name: &str,
        source: &str,
        params: &[KernelParam],
    ) -> Result<Self::Kernel, Self::Error>;

    /// Launch `kernel` and wait for completion.
    fn launch(
        &self,
        queue: &Self::Queue,
        kernel: &Self::Kernel,
        geometry: &LaunchGeometry,
        args: &[DevicePtr<'_, Self>],
    ) -> Result<(), Self::Error>;

    /// Size of a buffer in bytes.
    fn buffer_len(&self, buffer: &Self::Buffer) -> usize;

    /// Copy a whole buffer to the host.
    fn read_buffer(&self, buffer: &Self::Buffer) -> Result<Vec<u8>, Self::Error>;

    /// Overwrite a whole buffer from the host.
    fn write_buffer(&self, buffer: &Self::Buffer, bytes: &[u8]) -> Result<(), Self::Error>;

    /// Monotonic timestamp used for benchmarking.
    fn timestamp(&self) -> Duration;
}
