//! Host reference backend.

use super::{Buffer2, ComputeError, DeviceCompute, KernelSource, Program, CONVOLVE_KERNEL, SCAN_KERNEL};

/// Runs the built-in kernels on the calling thread.
///
/// Program text is ignored; only the kernel name selects what runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct CpuDevice;

impl CpuDevice {
    pub fn new() -> Self {
        Self
    }

    /// Convolve `input` with an odd-sided square `mask` centered on every
    /// cell. Cells outside `input` read as 0.
    pub fn convolve(input: &Buffer2, mask: &Buffer2) -> Result<Buffer2, ComputeError> {
        let (mask_rows, mask_cols) = mask.shape();
        if mask_rows != mask_cols || mask_rows % 2 == 0 {
            return Err(ComputeError::Execution {
                kernel: CONVOLVE_KERNEL.to_string(),
                message: format!("mask must be an odd-sided square, got {mask_rows}x{mask_cols}"),
            });
        }

        let radius = (mask_rows / 2) as isize;
        let mut out = Buffer2::zeros(input.rows(), input.cols());
        let cols = input.cols();

        for row in 0..input.rows() {
            for col in 0..cols {
                let mut acc = 0.0f32;
                for mr in 0..mask_rows {
                    for mc in 0..mask_cols {
                        let r = row as isize + mr as isize - radius;
                        let c = col as isize + mc as isize - radius;
                        acc += input.get_or_zero(r, c) * mask.data()[mr * mask_cols + mc];
                    }
                }
                out.data_mut()[row * cols + col] = acc;
            }
        }
        Ok(out)
    }

    /// Inclusive prefix sum over the row-major data.
    pub fn scan(input: &Buffer2) -> Buffer2 {
        let mut out = input.clone();
        let mut running = 0.0f32;
        for value in out.data_mut() {
            running += *value;
            *value = running;
        }
        out
    }
}

impl DeviceCompute for CpuDevice {
    fn build(&self, source: &KernelSource) -> Result<Program, ComputeError> {
        match source.name.as_str() {
            CONVOLVE_KERNEL | SCAN_KERNEL => Ok(Program::new(source.name.clone())),
            other => Err(ComputeError::Build {
                kernel: other.to_string(),
                log: format!(
                    "no kernel named '{other}'; available: {CONVOLVE_KERNEL}, {SCAN_KERNEL}"
                ),
            }),
        }
    }

    fn run(
        &self,
        program: &Program,
        input: &Buffer2,
        mask: Option<&Buffer2>,
    ) -> Result<Buffer2, ComputeError> {
        match program.kernel() {
            CONVOLVE_KERNEL => {
                let mask = mask.ok_or_else(|| ComputeError::Execution {
                    kernel: CONVOLVE_KERNEL.to_string(),
                    message: "convolution requires a mask buffer".to_string(),
                })?;
                Self::convolve(input, mask)
            }
            SCAN_KERNEL => Ok(Self::scan(input)),
            other => Err(ComputeError::Execution {
                kernel: other.to_string(),
                message: "program was not built by this device".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::execute;

    #[test]
    fn test_identity_mask() {
        let input = Buffer2::square(3, (1..=9).map(|v| v as f32).collect()).unwrap();
        let mask = Buffer2::square(3, vec![0., 0., 0., 0., 1., 0., 0., 0., 0.]).unwrap();
        let out = execute(&CpuDevice, &KernelSource::convolve(), &input, Some(&mask)).unwrap();
        assert_eq!(out, input);
    }

    #[test]
    fn test_box_mask_zero_pads_edges() {
        let input = Buffer2::square(3, vec![1.0; 9]).unwrap();
        let mask = Buffer2::square(3, vec![1.0; 9]).unwrap();
        let out = CpuDevice::convolve(&input, &mask).unwrap();
        assert_eq!(out.data(), &[4., 6., 4., 6., 9., 6., 4., 6., 4.]);
        assert_eq!(out.shape(), input.shape());
    }

    #[test]
    fn test_even_mask_rejected() {
        let input = Buffer2::zeros(4, 4);
        let mask = Buffer2::square(2, vec![1.0; 4]).unwrap();
        assert!(matches!(
            CpuDevice::convolve(&input, &mask),
            Err(ComputeError::Execution { .. })
        ));
    }

    #[test]
    fn test_missing_mask_is_execution_error() {
        let input = Buffer2::zeros(2, 2);
        let err = execute(&CpuDevice, &KernelSource::convolve(), &input, None).unwrap_err();
        assert!(matches!(err, ComputeError::Execution { .. }));
    }

    #[test]
    fn test_inclusive_scan() {
        let input = Buffer2::new(2, 3, vec![1., 2., 3., 4., 5., 6.]).unwrap();
        let out = execute(&CpuDevice, &KernelSource::scan(), &input, None).unwrap();
        assert_eq!(out.data(), &[1., 3., 6., 10., 15., 21.]);
    }

    #[test]
    fn test_unknown_kernel_is_build_error() {
        let err = CpuDevice
            .build(&KernelSource::new("local_scan", "__kernel void local_scan() {}"))
            .unwrap_err();
        match err {
            ComputeError::Build { kernel, log } => {
                assert_eq!(kernel, "local_scan");
                assert!(log.contains(CONVOLVE_KERNEL));
            }
            other => panic!("expected build error, got {other:?}"),
        }
    }
}
