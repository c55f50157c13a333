use ndarray::Array2;

/// Percentile of a set of values using linear interpolation between the closest ranks,
/// `q` in [0, 100]. NaN values sort after every number. Returns None for an empty set.
pub fn percentile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let rank = (q.clamp(0., 100.) / 100.) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = (lower + 1).min(sorted.len() - 1);
    let frac = rank - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * frac)
}

/// Scales a magnitude image so that the given percentile maps to 255, clipping everything above
/// it. A percentile of zero (or one that is not finite) yields a black image.
pub fn normalize_to_u8(magnitude: &Array2<f64>, q: f64) -> Array2<u8> {
    let threshold = magnitude
        .as_slice()
        .map(|s| percentile(s, q))
        .unwrap_or_else(|| percentile(&magnitude.iter().copied().collect::<Vec<_>>(), q))
        .unwrap_or(0.);

    if !(threshold.is_finite() && threshold > 0.) {
        return Array2::zeros(magnitude.dim());
    }

    magnitude.mapv(|v| quantize(v / threshold * 255.))
}

/// clip to [0, 255] and truncate
#[inline]
fn quantize(v: f64) -> u8 {
    if v.is_nan() {
        0
    } else {
        v.clamp(0., 255.) as u8
    }
}

#[cfg(test)]
mod tests {
    use crate::normalize::{normalize_to_u8, percentile};
    use ndarray::{array, Array2, ShapeBuilder};

    #[test]
    fn percentile_interpolates_like_numpy() {
        let values = (1..=10).map(|v| v as f64).collect::<Vec<_>>();
        // numpy.percentile(range(1, 11), 99) == 9.91
        assert!((percentile(&values, 99.).unwrap() - 9.91).abs() < 1e-12);
        assert_eq!(percentile(&values, 0.).unwrap(), 1.);
        assert_eq!(percentile(&values, 100.).unwrap(), 10.);
        assert_eq!(percentile(&values, 50.).unwrap(), 5.5);
        assert_eq!(percentile(&[4., 1., 3., 2.], 50.).unwrap(), 2.5);
        assert_eq!(percentile(&[7.], 99.).unwrap(), 7.);
        assert_eq!(percentile(&[], 99.), None);
    }

    #[test]
    fn all_zero_slice_gives_black_image() {
        let mag = Array2::<f64>::zeros((16, 16));
        let img = normalize_to_u8(&mag, 99.);
        assert_eq!(img.dim(), (16, 16));
        assert!(img.iter().all(|&p| p == 0));
    }

    #[test]
    fn values_above_threshold_saturate() {
        // 100 pixels at 1.0 and one outlier far above the 99th percentile
        let mut mag = Array2::from_elem((10, 10), 1.);
        mag[[3, 7]] = 1e6;
        let img = normalize_to_u8(&mag, 99.);
        assert_eq!(img[[3, 7]], 255);
        assert!(img.iter().filter(|&&p| p == 255).count() >= 1);

        let mag = array![[0., 1., 2.], [3., 4., 1000.]];
        let img = normalize_to_u8(&mag, 50.);
        // 50th percentile is 2.5
        assert_eq!(img, array![[0, 102, 204], [255, 255, 255]]);
    }

    #[test]
    fn pixels_are_truncated() {
        let mag = array![[0., 0.5, 1.], [1., 1., 1.]];
        let img = normalize_to_u8(&mag, 100.);
        // 0.5 * 255 == 127.5 truncates to 127
        assert_eq!(img, array![[0, 127, 255], [255, 255, 255]]);
    }

    #[test]
    fn layout_does_not_change_result() {
        let c = Array2::from_shape_fn((4, 5), |(i, j)| (i * 5 + j) as f64);
        let f = Array2::from_shape_fn((4, 5).f(), |(i, j)| (i * 5 + j) as f64);
        assert_eq!(normalize_to_u8(&c, 99.), normalize_to_u8(&f, 99.));
    }

    #[test]
    fn nan_pixels_become_zero() {
        let mag = array![[f64::NAN, 1.], [2., 3.]];
        let img = normalize_to_u8(&mag, 50.);
        assert_eq!(img[[0, 0]], 0);
    }
}
