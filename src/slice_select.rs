/// Picks `n_frames` slice indices evenly spaced over `[0, total_slices - 1]`, both ends included.
///
/// Index `i` is `i * (total_slices - 1) / (n_frames - 1)` rounded to the nearest integer (halves
/// round up), evaluated in integer arithmetic so the sequence never depends on float rounding.
/// Indices repeat when `n_frames` exceeds `total_slices`. A single frame selects slice 0.
pub fn select_slice_indices(total_slices: usize, n_frames: usize) -> Vec<usize> {
    if total_slices == 0 || n_frames == 0 {
        return vec![];
    }
    if n_frames == 1 {
        return vec![0];
    }
    let last = (total_slices - 1) as u128;
    let div = (n_frames - 1) as u128;
    (0..n_frames as u128)
        .map(|i| ((2 * i * last + div) / (2 * div)) as usize)
        .collect()
}
