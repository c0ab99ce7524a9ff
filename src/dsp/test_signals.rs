//! Signal generators and spectrum probes shared by the DSP unit tests.

use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

/// Sine of `len` samples. Phase is computed in f64 so long buffers stay clean.
pub fn sine(freq: f64, amp: f32, sample_rate: f64, len: usize) -> Vec<f32> {
    (0..len)
        .map(|n| {
            let phase = 2.0 * std::f64::consts::PI * freq * n as f64 / sample_rate;
            amp * phase.sin() as f32
        })
        .collect()
}

/// FFT magnitudes of `signal` at the given bins.
pub fn harmonic_magnitudes(signal: &[f32], bins: &[usize]) -> Vec<f32> {
    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(signal.len());

    let mut buf: Vec<Complex<f32>> = signal.iter().map(|&x| Complex::new(x, 0.0)).collect();
    fft.process(&mut buf);

    bins.iter().map(|&b| buf[b].norm()).collect()
}
