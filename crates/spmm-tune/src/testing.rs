//! Host backend and scripted generators for unit tests.
//!
//! "Kernel source" here is a JSON [`HostProgram`]: the scaled constant
//! matrix plus a synthetic cost. Launching a program performs the real
//! multiply on host buffers and advances a virtual clock by its cost, so
//! benchmark results are exact.

use crate::backend::{Backend, DevicePtr, KernelParam, LaunchGeometry};
use crate::generator::{Candidate, CandidateGenerator, Feedback, GenerationRequest, KernelGenerator};
use crate::types::{DType, DenseMatrix, Matrix, OperandDescriptor};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum HostError {
    #[error("compile error: {0}")]
    Compile(String),
    #[error("launch error: {0}")]
    Launch(String),
    #[error("buffer error: {0}")]
    Buffer(String),
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct HostProgram {
    cost_ms: u64,
    fail: bool,
    rows: usize,
    k: usize,
    n: usize,
    a: Vec<f64>,
    beta: f64,
    ldb: usize,
    ldc: usize,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug, Default)]
pub(crate) struct HostBackend {
    clock_ns: AtomicU64,
    compiles: AtomicUsize,
    launches: AtomicUsize,
}

impl HostBackend {
    pub(crate) const ALIGNMENT: usize = 32;

    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn buffer(&self, bytes: Vec<u8>) -> Mutex<Vec<u8>> {
        Mutex::new(bytes)
    }

    pub(crate) fn advance(&self, by: Duration) {
        self.clock_ns.fetch_add(by.as_nanos() as u64, Ordering::SeqCst);
    }

    pub(crate) fn compiles(&self) -> usize {
        self.compiles.load(Ordering::SeqCst)
    }

    pub(crate) fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }
}

impl Backend for HostBackend {
    type Buffer = Mutex<Vec<u8>>;
    type Kernel = Arc<HostProgram>;
    type Queue = ();
    type Error = HostError;

    fn queue(&self) -> &() {
        &()
    }

    fn alignment_bytes(&self) -> usize {
        Self::ALIGNMENT
    }

    fn compile(
        &self,
        _name: &str,
        source: &str,
        params: &[KernelParam],
    ) -> Result<Self::Kernel, HostError> {
        self.compiles.fetch_add(1, Ordering::SeqCst);
        if params.len() != 2 {
            return Err(HostError::Compile(format!("expected 2 params, got {}", params.len())));
        }
        let program: HostProgram =
            serde_json::from_str(source).map_err(|e| HostError::Compile(e.to_string()))?;
        if program.fail {
            return Err(HostError::Compile("candidate rejected".to_string()));
        }
        Ok(Arc::new(program))
    }

    fn launch(
        &self,
        _queue: &(),
        kernel: &Self::Kernel,
        _geometry: &LaunchGeometry,
        args: &[DevicePtr<'_, Self>],
    ) -> Result<(), HostError> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        let [b, out] = args else {
            return Err(HostError::Launch(format!("expected 2 args, got {}", args.len())));
        };
        let p = kernel.as_ref();
        let item = DType::F64.item_size();
        let read = |bytes: &[u8], at: usize| {
            bytes
                .get(at..at + item)
                .and_then(|chunk| DType::F64.read(chunk))
                .ok_or_else(|| HostError::Launch(format!("read at byte {at} out of range")))
        };

        let b_bytes = lock(b.buffer).clone();
        let mut out_bytes = lock(out.buffer);
        for i in 0..p.rows {
            for j in 0..p.n {
                let mut acc = 0.0;
                for kk in 0..p.k {
                    let coeff = p.a[i * p.k + kk];
                    if coeff != 0.0 {
                        acc += coeff * read(&b_bytes, b.offset + (kk * p.ldb + j) * item)?;
                    }
                }
                let at = out.offset + (i * p.ldc + j) * item;
                if p.beta != 0.0 {
                    acc += p.beta * read(&out_bytes, at)?;
                }
                let slot = out_bytes
                    .get_mut(at..at + item)
                    .ok_or_else(|| HostError::Launch(format!("write at byte {at} out of range")))?;
                DType::F64.write(acc, slot);
            }
        }
        drop(out_bytes);

        self.advance(Duration::from_millis(p.cost_ms));
        Ok(())
    }

    fn buffer_len(&self, buffer: &Self::Buffer) -> usize {
        lock(buffer).len()
    }

    fn read_buffer(&self, buffer: &Self::Buffer) -> Result<Vec<u8>, HostError> {
        Ok(lock(buffer).clone())
    }

    fn write_buffer(&self, buffer: &Self::Buffer, bytes: &[u8]) -> Result<(), HostError> {
        let mut guard = lock(buffer);
        if guard.len() != bytes.len() {
            return Err(HostError::Buffer(format!(
                "size mismatch: buffer {} bytes, data {} bytes",
                guard.len(),
                bytes.len()
            )));
        }
        guard.copy_from_slice(bytes);
        Ok(())
    }

    fn timestamp(&self) -> Duration {
        Duration::from_nanos(self.clock_ns.load(Ordering::SeqCst))
    }
}

/// Allocate a host matrix and fill it with row-major `values`.
pub(crate) fn host_matrix(
    dev: &HostBackend,
    desc: OperandDescriptor,
    values: &[f64],
) -> Matrix<HostBackend> {
    assert_eq!(values.len(), desc.rows * desc.cols);
    let bytes = vec![0u8; desc.span_bytes()];
    let m = Matrix::new(dev, desc, dev.buffer(bytes)).unwrap();
    let dense = DenseMatrix::from_vec(m.rows(), m.cols(), values.to_vec()).unwrap();
    m.set(dev, &dense).unwrap();
    m
}

/// `alpha * a * b + beta * c` computed densely.
pub(crate) fn reference_mul(
    a: &DenseMatrix,
    b: &DenseMatrix,
    c: &DenseMatrix,
    alpha: f64,
    beta: f64,
) -> DenseMatrix {
    let mut data = Vec::with_capacity(a.rows() * b.cols());
    for i in 0..a.rows() {
        for j in 0..b.cols() {
            let dot: f64 = (0..a.cols()).map(|k| a.get(i, k) * b.get(k, j)).sum();
            data.push(alpha * dot + beta * c.get(i, j));
        }
    }
    DenseMatrix::from_vec(a.rows(), b.cols(), data).unwrap()
}

#[derive(Debug, Default)]
struct ScriptLog {
    instantiations: usize,
    proposed: usize,
    feedback: Vec<Option<Duration>>,
    last_request: Option<GenerationRequest>,
}

/// Generator whose candidates have fixed synthetic costs.
///
/// Candidate `i` is dispatched with group width [`group_width(i)`](Self::group_width)
/// so tests can tell which candidate won.
#[derive(Debug, Clone)]
pub(crate) struct ScriptedKernels {
    costs: Arc<Vec<u64>>,
    endless: Option<u64>,
    failing: Arc<Vec<usize>>,
    panic_at: Option<usize>,
    log: Arc<Mutex<ScriptLog>>,
}

impl ScriptedKernels {
    /// One candidate per cost (milliseconds), then exhaustion.
    pub(crate) fn new(costs_ms: &[u64]) -> Self {
        Self {
            costs: Arc::new(costs_ms.to_vec()),
            endless: None,
            failing: Arc::new(Vec::new()),
            panic_at: None,
            log: Arc::default(),
        }
    }

    /// Never exhausted; every candidate costs `cost_ms`.
    pub(crate) fn endless(cost_ms: u64) -> Self {
        Self {
            endless: Some(cost_ms),
            ..Self::new(&[])
        }
    }

    /// Candidates at these indices fail to compile.
    pub(crate) fn failing_at(mut self, indices: &[usize]) -> Self {
        self.failing = Arc::new(indices.to_vec());
        self
    }

    /// The generator panics when asked for candidate `index`.
    pub(crate) fn panicking_at(mut self, index: usize) -> Self {
        self.panic_at = Some(index);
        self
    }

    pub(crate) fn group_width(index: usize) -> u64 {
        32 * (index as u64 + 1)
    }

    pub(crate) fn instantiations(&self) -> usize {
        lock(&self.log).instantiations
    }

    pub(crate) fn proposed(&self) -> usize {
        lock(&self.log).proposed
    }

    pub(crate) fn feedback_log(&self) -> Vec<Option<Duration>> {
        lock(&self.log).feedback.clone()
    }

    pub(crate) fn last_request(&self) -> Option<GenerationRequest> {
        lock(&self.log).last_request.clone()
    }
}

pub(crate) struct ScriptedRun {
    script: ScriptedKernels,
    request: GenerationRequest,
    index: usize,
}

impl KernelGenerator for ScriptedKernels {
    type Generator = ScriptedRun;

    fn kernels(&self, request: GenerationRequest) -> ScriptedRun {
        {
            let mut log = lock(&self.log);
            log.instantiations += 1;
            log.last_request = Some(request.clone());
        }
        ScriptedRun {
            script: self.clone(),
            request,
            index: 0,
        }
    }
}

impl CandidateGenerator for ScriptedRun {
    fn next(&mut self, feedback: Option<&Feedback>) -> Option<Candidate> {
        if self.script.panic_at == Some(self.index) {
            panic!("generator failed at candidate {}", self.index);
        }
        let mut log = lock(&self.script.log);
        log.feedback.push(feedback.map(|f| f.runtime));

        let cost_ms = match self.script.endless {
            Some(cost) => cost,
            None => *self.script.costs.get(self.index)?,
        };
        let req = &self.request;
        let program = HostProgram {
            cost_ms,
            fail: self.script.failing.contains(&self.index),
            rows: req.a.rows(),
            k: req.a.cols(),
            n: req.n,
            a: req.a.as_slice().to_vec(),
            beta: req.beta,
            ldb: req.ldb,
            ldc: req.ldc,
        };
        let source = serde_json::to_string(&program).ok()?;
        let geometry = LaunchGeometry::linear(1, ScriptedKernels::group_width(self.index));

        self.index += 1;
        log.proposed += 1;
        Some(Candidate::new(source, geometry))
    }
}
