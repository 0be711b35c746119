//! Two-stage polyphase QMF bank splitting 512 input samples into the
//! low (128), mid (128) and hi (256) bands, and the mirror synthesis.
//!
//! Each stage is a 48-tap half-band pair with 46 samples of persistent
//! filter history; one analysis+synthesis round trip through a stage
//! delays the signal by 46 samples at the stage input rate. The hi band
//! bypasses the second stage and is delayed by 39 samples on each side
//! instead, which together with the MDCT stage keeps the three band
//! paths aligned.

/// Published ATRAC1 half tap set; the 48-tap prototype is its mirror.
const QMF_TAP_HALF: [f64; 24] = [
    -0.00001461907,
    -0.00009205479,
    -0.000056157569,
    0.00030117269,
    0.0002422519,
    -0.00085293897,
    -0.0005205574,
    0.0020340169,
    0.00078333891,
    -0.0042153862,
    -0.00075614988,
    0.0078402944,
    -0.000061169922,
    -0.01344162,
    0.0024626821,
    0.021736089,
    -0.007801671,
    -0.034090221,
    0.01880949,
    0.054326009,
    -0.043596379,
    -0.099384367,
    0.13207909,
    0.46424159,
];

const TAPS: usize = 48;
const HISTORY: usize = TAPS - 2;

/// Delay applied to the hi band on each side of the codec so it lines
/// up with the low/mid path through the second QMF stage and the MDCT.
const HI_BAND_DELAY: usize = 39;

/// One 48-tap half-band QMF with persistent history.
struct Qmf {
    window: [f64; TAPS],
    /// Analysis filter history
    history: [f64; HISTORY],
    /// Synthesis overlap carried between calls
    delay: [f64; HISTORY],
}

impl Qmf {
    fn new() -> Self {
        let mut window = [0.0; TAPS];
        for (i, &tap) in QMF_TAP_HALF.iter().enumerate() {
            window[i] = tap;
            window[TAPS - 1 - i] = tap;
        }
        Self {
            window,
            history: [0.0; HISTORY],
            delay: [0.0; HISTORY],
        }
    }

    /// Split `input` (even length n) into n/2 lower + n/2 upper samples.
    fn analysis(&mut self, input: &[f64], lower: &mut [f64], upper: &mut [f64]) {
        let n = input.len();
        debug_assert_eq!(n % 2, 0);
        debug_assert!(lower.len() >= n / 2 && upper.len() >= n / 2);

        let mut buf = vec![0.0; HISTORY + n];
        buf[..HISTORY].copy_from_slice(&self.history);
        buf[HISTORY..].copy_from_slice(input);

        for j in (0..n).step_by(2) {
            let mut lo = 0.0;
            let mut hi = 0.0;
            for i in 0..TAPS / 2 {
                lo += self.window[2 * i] * buf[TAPS - 1 + j - 2 * i];
                hi += self.window[2 * i + 1] * buf[TAPS - 2 + j - 2 * i];
            }
            lower[j / 2] = lo + hi;
            upper[j / 2] = lo - hi;
        }

        self.history.copy_from_slice(&buf[n..]);
    }

    /// Merge n/2 lower + n/2 upper samples back into n output samples.
    fn synthesis(&mut self, out: &mut [f64], lower: &[f64], upper: &[f64]) {
        let half = lower.len();
        debug_assert_eq!(upper.len(), half);
        debug_assert!(out.len() >= half * 2);

        let mut merged = vec![0.0; HISTORY + 2 * half];
        merged[..HISTORY].copy_from_slice(&self.delay);
        for m in 0..half {
            merged[HISTORY + 2 * m] = lower[m] + upper[m];
            merged[HISTORY + 2 * m + 1] = lower[m] - upper[m];
        }

        for m in 0..half {
            let mut s1 = 0.0;
            let mut s2 = 0.0;
            for i in 0..TAPS / 2 {
                s1 += merged[2 * m + 2 * i] * self.window[2 * i];
                s2 += merged[2 * m + 2 * i + 1] * self.window[2 * i + 1];
            }
            out[2 * m] = s2 * 2.0;
            out[2 * m + 1] = s1 * 2.0;
        }

        self.delay.copy_from_slice(&merged[2 * half..]);
    }
}

/// Three-band analysis bank, one instance per channel.
pub struct SplitFilterBank {
    qmf1: Qmf,
    qmf2: Qmf,
    hi_delay: Vec<f64>,
}

impl SplitFilterBank {
    pub fn new() -> Self {
        Self {
            qmf1: Qmf::new(),
            qmf2: Qmf::new(),
            hi_delay: vec![0.0; HI_BAND_DELAY + 256],
        }
    }

    /// Split 512 PCM samples into low[128], mid[128] and hi[256].
    pub fn split(&mut self, pcm: &[f64], low: &mut [f64], mid: &mut [f64], hi: &mut [f64]) {
        debug_assert_eq!(pcm.len(), 512);
        let mut mid_low = [0.0; 256];

        self.hi_delay.copy_within(256.., 0);
        self.qmf1
            .analysis(pcm, &mut mid_low, &mut self.hi_delay[HI_BAND_DELAY..]);
        self.qmf2.analysis(&mid_low, low, mid);
        hi[..256].copy_from_slice(&self.hi_delay[..256]);
    }
}

impl Default for SplitFilterBank {
    fn default() -> Self {
        Self::new()
    }
}

/// Three-band synthesis bank, one instance per channel.
pub struct SynthesisFilterBank {
    qmf1: Qmf,
    qmf2: Qmf,
    hi_delay: Vec<f64>,
}

impl SynthesisFilterBank {
    pub fn new() -> Self {
        Self {
            qmf1: Qmf::new(),
            qmf2: Qmf::new(),
            hi_delay: vec![0.0; HI_BAND_DELAY + 256],
        }
    }

    /// Merge low[128], mid[128] and hi[256] back into 512 PCM samples.
    pub fn synthesis(&mut self, pcm: &mut [f64], low: &[f64], mid: &[f64], hi: &[f64]) {
        debug_assert_eq!(pcm.len(), 512);
        let mut mid_low = [0.0; 256];

        self.hi_delay.copy_within(256.., 0);
        self.hi_delay[HI_BAND_DELAY..].copy_from_slice(&hi[..256]);

        self.qmf2.synthesis(&mut mid_low, &low[..128], &mid[..128]);
        let delayed_hi: [f64; 256] = self.hi_delay[..256].try_into().unwrap();
        self.qmf1.synthesis(pcm, &mid_low, &delayed_hi);
    }
}

impl Default for SynthesisFilterBank {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // one stage analysis->synthesis must reproduce the input after the
    // 46 sample stage delay
    #[test]
    fn single_stage_round_trip() {
        let mut analysis = Qmf::new();
        let mut synthesis = Qmf::new();

        let total = 2048;
        let signal: Vec<f64> = (0..total)
            .map(|i| {
                let t = i as f64;
                (t * 0.11).sin() * 1000.0 + (t * 0.51).cos() * 300.0
            })
            .collect();

        let mut output = Vec::new();
        for chunk in signal.chunks(512) {
            let mut lower = [0.0; 256];
            let mut upper = [0.0; 256];
            analysis.analysis(chunk, &mut lower, &mut upper);
            let mut out = [0.0; 512];
            synthesis.synthesis(&mut out, &lower, &upper);
            output.extend_from_slice(&out);
        }

        let mut signal_power = 0.0;
        let mut error_power = 0.0;
        for i in 0..total - HISTORY {
            let err = output[i + HISTORY] - signal[i];
            signal_power += signal[i] * signal[i];
            error_power += err * err;
        }
        let snr = 10.0 * (signal_power / error_power.max(1e-30)).log10();
        assert!(snr > 45.0, "stage round trip SNR too low: {snr:.1} dB");
    }

    // a DC input must land in the low band with unit gain
    #[test]
    fn dc_goes_to_lower_band() {
        let mut qmf = Qmf::new();
        let input = [100.0; 512];
        let mut lower = [0.0; 256];
        let mut upper = [0.0; 256];
        qmf.analysis(&input, &mut lower, &mut upper);
        // skip the warmup region affected by the zero history
        assert!((lower[128] - 100.0).abs() < 0.1);
        assert!(upper[128].abs() < 0.1);
    }
}
