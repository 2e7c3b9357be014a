//! Compiled Metal kernels and their dispatch.

use crate::context::MetalContext;
use crate::error::{MetalError, Result};
use metal::{
    CommandQueue, CompileOptions, ComputePipelineState, Device, MTLCommandBufferStatus, MTLSize,
};
use spmm_tune::{DevicePtr, KernelParam, LaunchGeometry};

/// A compute pipeline built from generated source.
///
/// Each parameter is bound as a buffer at its position in the parameter
/// list, with the argument's byte offset.
pub struct MetalKernel {
    name: String,
    pipeline: ComputePipelineState,
    num_params: usize,
}

impl MetalKernel {
    /// Compile `source` and build a pipeline for the function `name`.
    pub fn compile(
        device: &Device,
        name: &str,
        source: &str,
        params: &[KernelParam],
    ) -> Result<Self> {
        let options = CompileOptions::new();
        let library = device
            .new_library_with_source(source, &options)
            .map_err(|e| MetalError::ShaderCompile(format!("{name}: {e}")))?;
        let function = library
            .get_function(name, None)
            .map_err(|e| MetalError::KernelNotFound(format!("{name}: {e}")))?;
        let pipeline = device
            .new_compute_pipeline_state_with_function(&function)
            .map_err(|e| MetalError::Library(format!("Pipeline for {name}: {e}")))?;

        log::trace!(
            "compiled {name}: {} param(s), max {} threads per group",
            params.len(),
            pipeline.max_total_threads_per_threadgroup()
        );
        Ok(Self {
            name: name.to_string(),
            pipeline,
            num_params: params.len(),
        })
    }

    /// Largest threadgroup the pipeline accepts.
    pub fn max_threads_per_group(&self) -> u64 {
        self.pipeline.max_total_threads_per_threadgroup()
    }

    /// Encode one dispatch on `queue` and wait for it to finish.
    pub fn launch(
        &self,
        queue: &CommandQueue,
        geometry: &LaunchGeometry,
        args: &[DevicePtr<'_, MetalContext>],
    ) -> Result<()> {
        if args.len() != self.num_params {
            return Err(MetalError::DimensionMismatch(format!(
                "{} takes {} argument(s), got {}",
                self.name,
                self.num_params,
                args.len()
            )));
        }
        let group_threads: u64 = geometry.group.iter().product();
        if group_threads == 0 || group_threads > self.max_threads_per_group() {
            return Err(MetalError::Execution(format!(
                "{}: group of {group_threads} threads, pipeline allows 1..={}",
                self.name,
                self.max_threads_per_group()
            )));
        }

        let command_buffer = queue.new_command_buffer();
        let encoder = command_buffer.new_compute_command_encoder();

        encoder.set_compute_pipeline_state(&self.pipeline);
        for (index, arg) in args.iter().enumerate() {
            encoder.set_buffer(index as u64, Some(arg.buffer), arg.offset as u64);
        }

        encoder.dispatch_thread_groups(mtl_size(geometry.grid), mtl_size(geometry.group));
        encoder.end_encoding();

        command_buffer.commit();
        command_buffer.wait_until_completed();

        match command_buffer.status() {
            MTLCommandBufferStatus::Completed => Ok(()),
            MTLCommandBufferStatus::Error => Err(MetalError::Execution(format!(
                "{}: command buffer failed at {geometry}",
                self.name
            ))),
            _ => Err(MetalError::CommandBuffer(format!(
                "{}: command buffer did not complete",
                self.name
            ))),
        }
    }
}

fn mtl_size([x, y, z]: [u64; 3]) -> MTLSize {
    MTLSize::new(x, y, z)
}
