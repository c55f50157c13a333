use ndarray::Array2;
use rayon::prelude::*;

fn coord_to_col_maj_index(coords: &[i32], dims: &[usize]) -> usize {
    assert_eq!(coords.len(), dims.len(), "coordinate length and number of dimensions disagree");
    let mut idx = 0;
    let mut stride = 1;
    for (coord, dim) in coords.iter().zip(dims.iter()) {
        let c = coord.rem_euclid(*dim as i32) as usize;
        idx += c * stride;
        stride *= dim;
    }
    idx
}

fn col_maj_index_to_coord(idx: usize, dims: &[usize], coord: &mut [i32]) {
    assert_eq!(dims.len(), coord.len(), "coordinate length and number of dimensions disagree");
    let mut tmp = idx;
    for (i, &dim_size) in dims.iter().enumerate() {
        coord[i] = (tmp % dim_size) as i32;
        tmp /= dim_size;
    }
}

/// circular shift of a col-maj ordered array with up to 3 dimensions. Missing trailing
/// dimensions are treated as singletons.
fn circshift3_col_maj<T: Copy + Send + Sync>(dims: &[usize], shift: &[i32], data: &mut [T]) {
    assert!(dims.len() <= 3, "greater than 3 dimensions is not supported here");
    assert_eq!(dims.iter().product::<usize>(), data.len(), "dims and source size must agree");
    assert_eq!(dims.len(), shift.len(), "the shift must have the same number of dimensions as dims");

    let mut dims3 = [1usize; 3];
    let mut shift3 = [0i32; 3];
    dims3.iter_mut().zip(dims.iter()).for_each(|(d, i)| *d = *i);
    shift3.iter_mut().zip(shift.iter()).for_each(|(s, i)| *s = *i);

    let result = (0..data.len())
        .into_par_iter()
        .map(|final_idx| {
            let mut coord = [0i32; 3];
            col_maj_index_to_coord(final_idx, &dims3, &mut coord);
            // reverse the shift to find the source coordinate
            for (c, &s) in coord.iter_mut().zip(&shift3) {
                *c -= s;
            }
            let source_idx = coord_to_col_maj_index(&coord, &dims3);
            data[source_idx]
        })
        .collect::<Vec<_>>();
    data.copy_from_slice(&result);
}

/// forward fft shift of col-maj ordered array
pub fn fftshift<T: Copy + Send + Sync>(dims: &[usize], data: &mut [T]) {
    assert!(dims.len() <= 3, "greater than 3 dimensions is not supported here");
    let shift = dims.iter().map(|d| (*d / 2) as i32).collect::<Vec<_>>();
    circshift3_col_maj(dims, &shift, data);
}

/// inverse fft shift of col-maj ordered array
pub fn ifftshift<T: Copy + Send + Sync>(dims: &[usize], data: &mut [T]) {
    assert!(dims.len() <= 3, "greater than 3 dimensions is not supported here");
    let shift = dims.iter().map(|d| ((*d + 1) / 2) as i32).collect::<Vec<_>>();
    circshift3_col_maj(dims, &shift, data);
}

/// Returns the col-maj dims of a row-major 2-D array, forcing the array into standard layout.
/// A row-major `[rows, cols]` buffer is the same memory as a col-maj `[cols, rows]` buffer.
fn standard_layout_dims<T: Copy>(x: &mut Array2<T>) -> [usize; 2] {
    if !x.is_standard_layout() {
        let standard = x.as_standard_layout().to_owned();
        *x = standard;
    }
    let (rows, cols) = x.dim();
    [cols, rows]
}

/// forward fft shift along both axes of a 2-D array
pub fn fftshift2<T: Copy + Send + Sync>(x: &mut Array2<T>) {
    let dims = standard_layout_dims(x);
    if let Some(data) = x.as_slice_mut() {
        fftshift(&dims, data);
    }
}

/// inverse fft shift along both axes of a 2-D array
pub fn ifftshift2<T: Copy + Send + Sync>(x: &mut Array2<T>) {
    let dims = standard_layout_dims(x);
    if let Some(data) = x.as_slice_mut() {
        ifftshift(&dims, data);
    }
}

#[cfg(test)]
mod tests {
    use crate::fftshift::{col_maj_index_to_coord, coord_to_col_maj_index, fftshift, fftshift2, ifftshift, ifftshift2};
    use ndarray::{array, Array2, Array3, ShapeBuilder};

    #[test]
    fn negative_coords_wrap() {
        let test_coord = [0, 0, -1];
        let mut result_coord = [0, 0, 0];
        let dims = [256, 128, 256];
        let idx = coord_to_col_maj_index(&test_coord, &dims);
        col_maj_index_to_coord(idx, &dims, &mut result_coord);
        assert_eq!(result_coord, [0, 0, 255]);
    }

    #[test]
    fn shift_1d_matches_numpy() {
        // numpy.fft.fftshift(arange(5)) == [3, 4, 0, 1, 2]
        let mut odd = vec![0, 1, 2, 3, 4];
        fftshift(&[5], &mut odd);
        assert_eq!(odd, vec![3, 4, 0, 1, 2]);
        // numpy.fft.ifftshift(arange(5)) == [2, 3, 4, 0, 1]
        let mut odd = vec![0, 1, 2, 3, 4];
        ifftshift(&[5], &mut odd);
        assert_eq!(odd, vec![2, 3, 4, 0, 1]);

        let mut even = vec![0, 1, 2, 3];
        fftshift(&[4], &mut even);
        assert_eq!(even, vec![2, 3, 0, 1]);
    }

    #[test]
    fn shift_2d_swaps_quadrants() {
        let mut x = array![[0, 1, 2], [3, 4, 5]];
        fftshift2(&mut x);
        // numpy.fft.fftshift([[0, 1, 2], [3, 4, 5]]) == [[5, 3, 4], [2, 0, 1]]
        assert_eq!(x, array![[5, 3, 4], [2, 0, 1]]);
        ifftshift2(&mut x);
        assert_eq!(x, array![[0, 1, 2], [3, 4, 5]]);
    }

    #[test]
    fn shift_2d_handles_fortran_layout() {
        let mut x = Array2::from_shape_fn((3, 4).f(), |(i, j)| i * 4 + j);
        let mut expected = Array2::from_shape_fn((3, 4), |(i, j)| i * 4 + j);
        fftshift2(&mut x);
        fftshift2(&mut expected);
        assert_eq!(x, expected);
    }

    #[test]
    fn ifftshift_undoes_fftshift() {
        let a = Array3::from_shape_fn((5, 4, 3).f(), |(i, j, k)| (i + 10 * j + 100 * k) as i32);
        let mut b = a.clone();
        let dims = a.shape().to_vec();
        fftshift(&dims, b.as_slice_memory_order_mut().unwrap());
        assert_ne!(a, b);
        ifftshift(&dims, b.as_slice_memory_order_mut().unwrap());
        assert_eq!(a, b);
    }
}
