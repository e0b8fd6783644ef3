//! Piecewise aggregation and cubic-interpolation resizing of raw signals.

/// Averages consecutive blocks of `factor` samples.
///
/// The output has `signal.len() / factor` values; a trailing partial block is
/// dropped. A factor of 0 or 1 returns the signal unchanged.
pub fn paa(signal: &[f32], factor: usize) -> Vec<f32> {
    if factor <= 1 {
        return signal.to_vec();
    }
    signal
        .chunks_exact(factor)
        .map(|block| (block.iter().map(|&v| v as f64).sum::<f64>() / factor as f64) as f32)
        .collect()
}

/// Cubic interpolation between `y1` and `y2` at position `mu` in `[0, 1]`,
/// shaped by the outer neighbours `y0` and `y3`.
pub fn cubic_interpolate(y0: f64, y1: f64, y2: f64, y3: f64, mu: f64) -> f64 {
    let mu2 = mu * mu;
    let a0 = y3 - y2 - y0 + y1;
    let a1 = y0 - y1 - a0;
    let a2 = y2 - y0;
    let a3 = y1;
    a0 * mu * mu2 + a1 * mu2 + a2 * mu + a3
}

/// Returns `samples` stretched or cut to `new_len`.
///
/// Growing inserts one cubic midpoint at a time, starting a quarter of the
/// way in and stepping two samples forward so insertions spread across the
/// buffer; the cursor wraps back to the start when it runs off the end.
/// Neighbours past either edge are clamped. Shrinking truncates.
pub fn resize(samples: &[f64], new_len: usize) -> Vec<f64> {
    if new_len <= samples.len() {
        return samples[..new_len].to_vec();
    }
    let mut out = Vec::with_capacity(new_len);
    out.extend_from_slice(samples);
    if out.is_empty() {
        out.resize(new_len, 0.0);
        return out;
    }

    let mut cursor = (out.len() / 4).max(1);
    while out.len() < new_len {
        let last = out.len() as isize - 1;
        let at = |i: isize| out[i.clamp(0, last) as usize];
        let c = cursor as isize;
        let value = cubic_interpolate(at(c - 2), at(c - 1), at(c), at(c + 1), 0.5);
        out.insert(cursor, value);

        cursor += 2;
        if cursor >= out.len() {
            cursor = 1;
        }
    }
    out
}
