// Forward and inverse MRI signal model for single 2-D slices
// k-space is stored with the DC sample in the center of the matrix, so both directions run a
// centered fft: ifftshift -> fft -> fftshift

use crate::fftshift::{fftshift2, ifftshift2};
use ndarray::{Array2, ArrayView2};
use num_complex::{Complex32, Complex64};
use rustfft::{FftDirection, FftPlanner};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelDirection {
    /// image -> k-space
    Forward,
    /// k-space -> image
    Inverse,
}

impl From<ModelDirection> for FftDirection {
    fn from(direction: ModelDirection) -> Self {
        match direction {
            ModelDirection::Forward => FftDirection::Forward,
            ModelDirection::Inverse => FftDirection::Inverse,
        }
    }
}

/// runs the 1-D transform over every row of a standard layout array
fn fft_rows(x: &mut Array2<Complex64>, planner: &mut FftPlanner<f64>, direction: FftDirection) {
    if !x.is_standard_layout() {
        let standard = x.as_standard_layout().to_owned();
        *x = standard;
    }
    let n = x.ncols();
    let fft = planner.plan_fft(n, direction);
    let mut scratch = vec![Complex64::new(0., 0.); fft.get_inplace_scratch_len()];
    if let Some(data) = x.as_slice_mut() {
        // rustfft transforms each consecutive chunk of length n
        fft.process_with_scratch(data, &mut scratch);
    }
}

/// 2-D discrete Fourier transform in place. The forward transform is unscaled and the inverse
/// transform is scaled by 1/N, the same convention as numpy.fft.fft2 / ifft2.
pub fn fft2(x: &mut Array2<Complex64>, direction: ModelDirection) {
    let (rows, cols) = x.dim();
    if rows == 0 || cols == 0 {
        return;
    }
    let mut planner = FftPlanner::<f64>::new();

    fft_rows(x, &mut planner, direction.into());

    // columns are transformed as the rows of the transpose
    let mut transposed = x.t().as_standard_layout().to_owned();
    fft_rows(&mut transposed, &mut planner, direction.into());
    x.assign(&transposed.t());

    if direction == ModelDirection::Inverse {
        let scale = 1. / (rows * cols) as f64;
        x.mapv_inplace(|v| v * scale);
    }
}

/// centered 2-D transform of a slice. The DC sample is expected in the center of the matrix
/// (index n/2 along each axis) on both sides of the transform.
pub fn signal_model(x: &mut Array2<Complex64>, direction: ModelDirection) {
    ifftshift2(x);
    fft2(x, direction);
    fftshift2(x);
}

/// reconstructs the magnitude image of a single k-space slice
pub fn reconstruct_magnitude(kspace: ArrayView2<Complex32>) -> Array2<f64> {
    let mut x = kspace.mapv(|k| Complex64::new(k.re as f64, k.im as f64));
    signal_model(&mut x, ModelDirection::Inverse);
    x.mapv(|v| v.norm())
}
