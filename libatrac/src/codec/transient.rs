//! Per-band transient detection driving the short window decision.
//!
//! The band signal is high-pass filtered, the RMS level of each
//! 32-sample sub-block is taken in dB, and a jump between adjacent
//! sub-blocks (including the last one of the previous sound unit)
//! flags a transient.

/// 21-tap symmetric half-band high pass, center tap 0.5
const FIR_COEF: [f64; 10] = [
    -8.65163e-18 * 2.0,
    -0.00851586 * 2.0,
    -6.74764e-18 * 2.0,
    0.0209036 * 2.0,
    -3.36639e-17 * 2.0,
    -0.0438162 * 2.0,
    -1.54175e-17 * 2.0,
    0.0931738 * 2.0,
    -5.52212e-17 * 2.0,
    -0.313819 * 2.0,
];

const FIR_LEN: usize = 21;
const PREV_BUF_SZ: usize = 20;

/// Level rise that declares an attack, in dB
const ATTACK_DB: f64 = 16.0;
/// Level drop that declares a release, in dB
const RELEASE_DB: f64 = 20.0;

/// RMS floor, well below one LSB of 16-bit PCM
const RMS_FLOOR: f64 = 1e-6;

pub struct TransientDetector {
    short_sz: usize,
    block_sz: usize,
    n_short_blocks: usize,
    hpf_history: Vec<f64>,
    /// dB level of the last sub-block of the previous unit
    last_level: Option<f64>,
}

impl TransientDetector {
    pub fn new(short_sz: usize, block_sz: usize) -> Self {
        assert!(block_sz % short_sz == 0);
        Self {
            short_sz,
            block_sz,
            n_short_blocks: block_sz / short_sz,
            hpf_history: vec![0.0; PREV_BUF_SZ],
            last_level: None,
        }
    }

    fn hp_filter(&mut self, input: &[f64], out: &mut [f64]) {
        let mut buf = vec![0.0; PREV_BUF_SZ + self.block_sz];
        buf[..PREV_BUF_SZ].copy_from_slice(&self.hpf_history);
        buf[PREV_BUF_SZ..].copy_from_slice(input);

        for (i, o) in out.iter_mut().enumerate() {
            let mut s = buf[i + FIR_LEN / 2] * 0.5;
            for (j, &c) in FIR_COEF.iter().enumerate() {
                s += c * (buf[i + j] + buf[i + FIR_LEN - 1 - j]);
            }
            *o = s;
        }

        self.hpf_history
            .copy_from_slice(&input[self.block_sz - PREV_BUF_SZ..]);
    }

    /// Analyze one sound unit worth of band samples; true selects the
    /// short window mode for the band.
    pub fn detect(&mut self, buf: &[f64]) -> bool {
        debug_assert_eq!(buf.len(), self.block_sz);
        let mut filtered = vec![0.0; self.block_sz];
        self.hp_filter(buf, &mut filtered);

        let mut transient = false;
        let mut last = self.last_level;
        for blk in 0..self.n_short_blocks {
            let chunk = &filtered[blk * self.short_sz..(blk + 1) * self.short_sz];
            let rms = (chunk.iter().map(|&v| v * v).sum::<f64>() / self.short_sz as f64).sqrt();
            let level = 20.0 * rms.max(RMS_FLOOR).log10();
            if let Some(prev) = last {
                if level - prev > ATTACK_DB || prev - level > RELEASE_DB {
                    transient = true;
                }
            }
            last = Some(level);
        }
        self.last_level = last;
        transient
    }

    pub fn reset(&mut self) {
        self.hpf_history.fill(0.0);
        self.last_level = None;
    }
}

/// Negate every odd sample, mirroring the band spectrum around half the
/// band rate so the detector sees the mid/hi bands as baseband signals.
pub fn invert_spectrum(buf: &[f64]) -> Vec<f64> {
    buf.iter()
        .enumerate()
        .map(|(i, &v)| if i & 1 == 1 { -v } else { v })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silence_stays_long() {
        let mut det = TransientDetector::new(32, 128);
        for _ in 0..4 {
            assert!(!det.detect(&[0.0; 128]));
        }
    }

    #[test]
    fn attack_is_detected() {
        let mut det = TransientDetector::new(32, 128);
        assert!(!det.detect(&[0.0; 128]));

        // sharp onset in the middle of the unit
        let mut buf = [0.0; 128];
        for (i, v) in buf.iter_mut().enumerate().skip(64) {
            *v = if i % 2 == 0 { 15000.0 } else { -15000.0 };
        }
        assert!(det.detect(&buf));
    }

    #[test]
    fn onset_across_unit_boundary_is_detected() {
        let mut det = TransientDetector::new(32, 128);
        assert!(!det.detect(&[0.0; 128]));

        let buf: Vec<f64> = (0..128)
            .map(|i| if i % 2 == 0 { 12000.0 } else { -12000.0 })
            .collect();
        assert!(det.detect(&buf));
    }

    #[test]
    fn steady_tone_stays_long() {
        let mut det = TransientDetector::new(32, 128);
        let buf: Vec<f64> = (0..128)
            .map(|i| (i as f64 * 0.9).sin() * 8000.0)
            .collect();
        det.detect(&buf);
        for _ in 0..4 {
            assert!(!det.detect(&buf));
        }
    }

    #[test]
    fn invert_spectrum_flips_odd_samples() {
        let inv = invert_spectrum(&[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(inv, vec![1.0, -2.0, 3.0, -4.0]);
    }
}
