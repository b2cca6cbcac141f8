//! Splitting a signal into analysis windows

/// Consecutive non-overlapping windows of `window_size` samples. A trailing
/// partial window is dropped.
pub fn split_windows(samples: &[f32], window_size: usize) -> Vec<Vec<f32>> {
    if window_size == 0 {
        return Vec::new();
    }
    samples
        .chunks_exact(window_size)
        .map(|chunk| chunk.to_vec())
        .collect()
}
