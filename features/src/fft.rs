//! Hann windowing and recursive radix-2 FFT.

use std::f64::consts::PI;
use std::ops::{Add, Mul, Sub};

/// A complex sample.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Complex {
    pub re: f64,
    pub im: f64,
}

impl Complex {
    pub fn new(re: f64, im: f64) -> Self {
        Self { re, im }
    }

    /// Magnitude `|z|`.
    pub fn norm(self) -> f64 {
        self.re.hypot(self.im)
    }
}

impl Add for Complex {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.re + rhs.re, self.im + rhs.im)
    }
}

impl Sub for Complex {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.re - rhs.re, self.im - rhs.im)
    }
}

impl Mul for Complex {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        Self::new(
            self.re * rhs.re - self.im * rhs.im,
            self.re * rhs.im + self.im * rhs.re,
        )
    }
}

/// Generates a periodic Hann window of the given length.
pub fn hann_window(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f64 / n as f64).cos()))
        .collect()
}

/// Recursive radix-2 Cooley-Tukey FFT.
///
/// `input.len()` must be a power of two. Every level returns a freshly owned
/// buffer, so no scratch space is shared between recursive calls.
pub fn fft(input: &[Complex]) -> Vec<Complex> {
    let n = input.len();
    if n <= 1 {
        return input.to_vec();
    }
    debug_assert!(n.is_power_of_two(), "fft length must be a power of two, got {n}");

    let even: Vec<Complex> = input.iter().step_by(2).copied().collect();
    let odd: Vec<Complex> = input.iter().skip(1).step_by(2).copied().collect();
    let even = fft(&even);
    let odd = fft(&odd);

    let half = n / 2;
    let mut out = vec![Complex::default(); n];
    for k in 0..half {
        let angle = -2.0 * PI * k as f64 / n as f64;
        let t = Complex::new(angle.cos(), angle.sin()) * odd[k];
        out[k] = even[k] + t;
        out[k + half] = even[k] - t;
    }
    out
}

/// Returns the first `frame.len() / 2` FFT magnitudes of a real frame.
pub fn magnitudes(frame: &[f64]) -> Vec<f64> {
    let input: Vec<Complex> = frame.iter().map(|&v| Complex::new(v, 0.0)).collect();
    fft(&input)
        .into_iter()
        .take(frame.len() / 2)
        .map(Complex::norm)
        .collect()
}
