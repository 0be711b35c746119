// Full disclosure, the FFT factorization here follows the same
// pre-twiddle / FFT / post-twiddle shape as Symphonia's and ffmpeg's
// MDCT implementations.

use rustfft::{num_complex::Complex, FftPlanner};
use std::f64::consts::PI;
use std::sync::{Arc, LazyLock};

use crate::core::types::{BlockSizeMode, NUM_BANDS};

/// Half sine window applied over the 32-sample overlap between MDCT blocks:
/// `SINE_WINDOW[i] = sin((i + 0.5) * PI / 64)`
pub static SINE_WINDOW: LazyLock<[f64; 32]> = LazyLock::new(|| {
    let mut window = [0.0; 32];
    for (i, w) in window.iter_mut().enumerate() {
        *w = ((i as f64 + 0.5) * PI / 64.0).sin();
    }
    window
});

/// FFT-backed MDCT/IMDCT pair for one transform size.
///
/// The forward transform maps N samples to N/2 coefficients:
///
///   X[k] = 4/N * sum x[n] * cos((PI/(N/2)) * (n + 0.5 + N/4) * (k + 0.5))
///
/// and the inverse applies the symmetric kernel without further scaling,
/// so that MDCT -> IMDCT -> windowed overlap-add reconstructs the input
/// (the TDAC property). Both directions reduce to an N/2-point DCT-IV
/// computed with an N/4-point complex FFT.
pub struct Mdct {
    /// Window size (N)
    n: usize,
    /// Forward FFT of size N/4
    fft: Arc<dyn rustfft::Fft<f64>>,
    /// Twiddle factors e^(-i*PI/(N/2) * (j + 1/8))
    twiddle: Vec<Complex<f64>>,
}

impl Mdct {
    pub fn new(n: usize) -> Self {
        assert!(n >= 8 && n.is_power_of_two(), "unsupported MDCT size");
        let l = n / 2;

        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(l / 2);

        let twiddle: Vec<Complex<f64>> = (0..l / 2)
            .map(|j| {
                let theta = PI / l as f64 * (j as f64 + 0.125);
                Complex::new(theta.cos(), -theta.sin())
            })
            .collect();

        Self { n, fft, twiddle }
    }

    /// Window size N
    pub fn size(&self) -> usize {
        self.n
    }

    /// N/2-point DCT-IV via the N/4-point FFT
    fn dct4(&self, s: &[f64]) -> Vec<f64> {
        let l = self.n / 2;
        let m = l / 2;

        let mut z: Vec<Complex<f64>> = (0..m)
            .map(|j| Complex::new(s[2 * j], s[l - 1 - 2 * j]) * self.twiddle[j])
            .collect();

        self.fft.process(&mut z);

        let mut out = vec![0.0; l];
        for (k, &zk) in z.iter().enumerate() {
            let d = zk * self.twiddle[k];
            out[2 * k] = d.re;
            out[l - 1 - 2 * k] = -d.im;
        }
        out
    }

    /// Forward MDCT: N samples -> N/2 coefficients
    pub fn forward(&self, samples: &[f64]) -> Vec<f64> {
        let n = self.n;
        assert!(samples.len() >= n, "not enough samples for MDCT");
        let n4 = n / 4;
        let n34 = 3 * n4;
        let scale = 4.0 / n as f64;

        // fold N samples into the N/2-point DCT-IV input
        let mut s = vec![0.0; n / 2];
        for m in 0..n4 {
            s[m] = scale * (-samples[n34 + m] - samples[n34 - 1 - m]);
        }
        for m in n4..n / 2 {
            s[m] = scale * (samples[m - n4] - samples[n34 - 1 - m]);
        }

        self.dct4(&s)
    }

    /// Inverse MDCT: N/2 coefficients -> N aliased samples
    pub fn inverse(&self, spec: &[f64]) -> Vec<f64> {
        let n = self.n;
        assert!(spec.len() >= n / 2, "not enough coefficients for IMDCT");
        let n4 = n / 4;
        let n34 = 3 * n4;

        let u = self.dct4(&spec[..n / 2]);

        // unfold back to N samples
        let mut out = vec![0.0; n];
        for i in 0..n4 {
            out[i] = u[i + n4];
        }
        for i in n4..n34 {
            out[i] = -u[n34 - 1 - i];
        }
        for i in n34..n {
            out[i] = -u[i - n34];
        }
        out
    }
}

/// The symmetric windowed overlap between the previous block tail and the
/// head of the next IMDCT output, 16+16 samples around the block joint.
fn vector_fmul_window(dst: &mut [f64], prev: &[f64; 16], cur: &[f64]) {
    let win = &*SINE_WINDOW;
    for t in 0..16 {
        let j = 15 - t;
        dst[t] = prev[t] * win[31 - t] - cur[j] * win[t];
        dst[31 - t] = prev[t] * win[t] + cur[j] * win[31 - t];
    }
}

/// Per-band windowed MDCT stage shared by the encoder and the decoder.
///
/// Operates on the three persistent band delay lines (low[256], mid[256],
/// hi[512]); the upper half of each buffer carries the windowed overlap
/// tail between consecutive sound units.
pub struct Atrac1Mdct {
    mdct64: Mdct,
    mdct256: Mdct,
    mdct512: Mdct,
}

impl Atrac1Mdct {
    pub fn new() -> Self {
        Self {
            mdct64: Mdct::new(64),
            mdct256: Mdct::new(256),
            mdct512: Mdct::new(512),
        }
    }

    fn transform_of(&self, band: usize, num_blocks: usize) -> &Mdct {
        match (num_blocks, band) {
            (1, 2) => &self.mdct512,
            (1, _) => &self.mdct256,
            _ => &self.mdct64,
        }
    }

    /// Window the band buffers and transform one sound unit into the
    /// 512-line spectrum. Mid and hi blocks are frequency-reversed in
    /// place after the transform.
    pub fn mdct_frame(
        &self,
        specs: &mut [f64],
        low: &mut [f64],
        mid: &mut [f64],
        hi: &mut [f64],
        mode: BlockSizeMode,
    ) {
        assert_eq!(specs.len(), 512);
        let mut pos = 0;
        for band in 0..NUM_BANDS {
            let num_blocks = mode.block_count(band);
            let buf: &mut [f64] = match band {
                0 => &mut *low,
                1 => &mut *mid,
                _ => &mut *hi,
            };
            let buf_sz = if band == 2 { 256 } else { 128 };
            let block_sz = if num_blocks == 1 { buf_sz } else { 32 };
            let win_start = if num_blocks == 1 {
                if band == 2 {
                    112
                } else {
                    48
                }
            } else {
                0
            };
            // level compensation for the hi band in short window mode
            let multiple = if num_blocks != 1 && band == 2 { 2.0 } else { 1.0 };

            let mut tmp = [0.0; 512];
            let mut block_pos = 0;
            for _ in 0..num_blocks {
                // previous tail, already windowed, ahead of the block
                tmp[win_start..win_start + 32].copy_from_slice(&buf[buf_sz..buf_sz + 32]);
                for i in 0..32 {
                    let s = buf[block_pos + block_sz - 32 + i];
                    buf[buf_sz + i] = SINE_WINDOW[i] * s;
                    buf[block_pos + block_sz - 32 + i] = SINE_WINDOW[31 - i] * s;
                }
                tmp[win_start + 32..win_start + 32 + block_sz]
                    .copy_from_slice(&buf[block_pos..block_pos + block_sz]);

                let transform = self.transform_of(band, num_blocks);
                let sp = transform.forward(&tmp[..transform.size()]);
                for (i, &v) in sp.iter().enumerate() {
                    specs[block_pos + pos + i] = v * multiple;
                }
                if band != 0 {
                    specs[block_pos + pos..block_pos + pos + sp.len()].reverse();
                }
                block_pos += 32;
            }
            pos += buf_sz;
        }
    }

    /// Inverse of `mdct_frame`: rebuild the band buffers from the
    /// spectrum with windowed overlap-add. `specs` is consumed in place
    /// (the mid/hi frequency reversal is undone during the pass).
    pub fn imdct_frame(
        &self,
        specs: &mut [f64],
        mode: BlockSizeMode,
        low: &mut [f64],
        mid: &mut [f64],
        hi: &mut [f64],
    ) {
        assert_eq!(specs.len(), 512);
        let mut pos = 0;
        for band in 0..NUM_BANDS {
            let num_blocks = mode.block_count(band);
            let dst: &mut [f64] = match band {
                0 => &mut *low,
                1 => &mut *mid,
                _ => &mut *hi,
            };
            let buf_sz = if band == 2 { 256 } else { 128 };
            let block_sz = if num_blocks == 1 { buf_sz } else { 32 };
            // undo the encoder-side level compensation
            let multiple = if num_blocks != 1 && band == 2 { 0.5 } else { 1.0 };

            let mut inv_buf = [0.0; 512];
            let mut prev = [0.0; 16];
            prev.copy_from_slice(&dst[buf_sz * 2 - 16..buf_sz * 2]);

            let mut start = 0;
            for _ in 0..num_blocks {
                let block = &mut specs[pos..pos + block_sz];
                if band != 0 {
                    block.reverse();
                }
                if multiple != 1.0 {
                    for v in block.iter_mut() {
                        *v *= multiple;
                    }
                }
                let transform = self.transform_of(band, num_blocks);
                let inv = transform.inverse(block);

                // keep the middle half of the aliased output
                let half = inv.len() / 2;
                inv_buf[start..start + half].copy_from_slice(&inv[half / 2..half / 2 + half]);

                let cur: [f64; 16] = inv_buf[start..start + 16].try_into().unwrap();
                vector_fmul_window(&mut dst[start..start + 32], &prev, &cur);
                prev.copy_from_slice(&inv_buf[start + 16..start + 32]);

                start += block_sz;
                pos += block_sz;
            }
            if num_blocks == 1 {
                let tail = if band == 2 { 240 } else { 112 };
                dst[32..32 + tail].copy_from_slice(&inv_buf[16..16 + tail]);
            }
            // save the last 16 samples for the next unit's joint
            for j in 0..16 {
                dst[buf_sz * 2 - 16 + j] = inv_buf[buf_sz - 16 + j];
            }
        }
    }
}

impl Default for Atrac1Mdct {
    fn default() -> Self {
        Self::new()
    }
}
