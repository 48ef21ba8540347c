//! Device-compute boundary.
//!
//! A [`DeviceCompute`] backend builds a named kernel into a [`Program`] and
//! runs it synchronously over a 2-D `f32` buffer, optionally with a mask.
//! Outcomes are all-or-nothing. A program that fails to build is reported as
//! [`ComputeError::Build`] together with the backend's build log, distinct
//! from a failure while running.
//!
//! The pipeline does not call into this module; it is the boundary that
//! offloaded kernels such as convolution or prefix scan are consumed through.
//! [`CpuDevice`] is the host reference backend.

mod cpu;

pub use cpu::CpuDevice;

use thiserror::Error;

/// Kernel name of the 2-D convolution program.
pub const CONVOLVE_KERNEL: &str = "convolve";

/// Kernel name of the inclusive prefix-scan program.
pub const SCAN_KERNEL: &str = "scan";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ComputeError {
    #[error("Failed to build kernel '{kernel}':\n{log}")]
    Build { kernel: String, log: String },

    #[error("Kernel '{kernel}' failed: {message}")]
    Execution { kernel: String, message: String },

    #[error("Buffer of {len} values does not have shape {rows}x{cols}")]
    ShapeMismatch { rows: usize, cols: usize, len: usize },
}

/// Program text plus the entry point to build from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelSource {
    pub name: String,
    pub source: String,
}

impl KernelSource {
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
        }
    }

    /// The convolution entry point with no program text; enough for
    /// backends that ship their kernels built in.
    pub fn convolve() -> Self {
        Self::new(CONVOLVE_KERNEL, "")
    }

    pub fn scan() -> Self {
        Self::new(SCAN_KERNEL, "")
    }
}

/// A built kernel, ready to run on the backend that built it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    kernel: String,
}

impl Program {
    pub fn new(kernel: impl Into<String>) -> Self {
        Self {
            kernel: kernel.into(),
        }
    }

    pub fn kernel(&self) -> &str {
        &self.kernel
    }
}

/// Row-major 2-D buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct Buffer2 {
    rows: usize,
    cols: usize,
    data: Vec<f32>,
}

impl Buffer2 {
    pub fn new(rows: usize, cols: usize, data: Vec<f32>) -> Result<Self, ComputeError> {
        if data.len() != rows * cols {
            return Err(ComputeError::ShapeMismatch {
                rows,
                cols,
                len: data.len(),
            });
        }
        Ok(Self { rows, cols, data })
    }

    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    /// Square buffer of side `n`.
    pub fn square(n: usize, data: Vec<f32>) -> Result<Self, ComputeError> {
        Self::new(n, n, data)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Value at (`row`, `col`), or 0 outside the buffer.
    #[inline]
    pub fn get_or_zero(&self, row: isize, col: isize) -> f32 {
        if row < 0 || col < 0 {
            return 0.0;
        }
        let (row, col) = (row as usize, col as usize);
        if row >= self.rows || col >= self.cols {
            return 0.0;
        }
        self.data[row * self.cols + col]
    }
}

/// A synchronous compute backend.
#[cfg_attr(test, mockall::automock)]
pub trait DeviceCompute {
    /// Compile `source` into a runnable program.
    fn build(&self, source: &KernelSource) -> Result<Program, ComputeError>;

    /// Run `program` over `input`. The output has the same shape as `input`.
    fn run<'a>(
        &self,
        program: &Program,
        input: &Buffer2,
        mask: Option<&'a Buffer2>,
    ) -> Result<Buffer2, ComputeError>;
}

/// Build and run in one step. Nothing runs if the build fails.
pub fn execute<D: DeviceCompute + ?Sized>(
    device: &D,
    source: &KernelSource,
    input: &Buffer2,
    mask: Option<&Buffer2>,
) -> Result<Buffer2, ComputeError> {
    let program = device.build(source)?;
    tracing::debug!(kernel = program.kernel(), rows = input.rows(), cols = input.cols(), "running kernel");
    device.run(&program, input, mask)
}
