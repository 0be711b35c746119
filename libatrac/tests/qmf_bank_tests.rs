#[cfg(test)]
mod qmf_bank_tests {
    use libatrac_audio::{SplitFilterBank, SynthesisFilterBank, CODEC_DELAY, NUM_SAMPLES};

    /// Stands in for the MDCT/overlap-add stage between the banks: a
    /// plain 32-sample delay per band, which is what a transparent
    /// transform stage contributes to the path.
    struct BandDelay {
        carry: Vec<f64>,
    }

    impl BandDelay {
        fn new() -> Self {
            BandDelay {
                carry: vec![0.0; 32],
            }
        }

        fn process(&mut self, band: &[f64]) -> Vec<f64> {
            let mut out = self.carry.clone();
            out.extend_from_slice(&band[..band.len() - 32]);
            self.carry.copy_from_slice(&band[band.len() - 32..]);
            out
        }
    }

    #[test]
    fn three_band_split_and_merge_reconstructs() {
        let mut split = SplitFilterBank::new();
        let mut merge = SynthesisFilterBank::new();
        let mut delays = [BandDelay::new(), BandDelay::new(), BandDelay::new()];

        let total = NUM_SAMPLES * 16;
        let signal: Vec<f64> = (0..total)
            .map(|i| {
                let t = i as f64;
                (t * 0.031).sin() * 9000.0 + (t * 0.47).sin() * 4000.0 + (t * 1.9).sin() * 2000.0
            })
            .collect();

        let mut output = Vec::with_capacity(total);
        for chunk in signal.chunks(NUM_SAMPLES) {
            let mut low = [0.0; 128];
            let mut mid = [0.0; 128];
            let mut hi = [0.0; 256];
            split.split(chunk, &mut low, &mut mid, &mut hi);

            let low = delays[0].process(&low);
            let mid = delays[1].process(&mid);
            let hi = delays[2].process(&hi);

            let mut out = [0.0; NUM_SAMPLES];
            merge.synthesis(&mut out, &low, &mid, &hi);
            output.extend_from_slice(&out);
        }

        let mut signal_power = 0.0;
        let mut error_power = 0.0;
        for i in 0..total - CODEC_DELAY {
            let err = output[i + CODEC_DELAY] - signal[i];
            signal_power += signal[i] * signal[i];
            error_power += err * err;
        }
        let snr = 10.0 * (signal_power / error_power.max(1e-30)).log10();
        assert!(snr > 45.0, "band path SNR too low: {snr:.1} dB");
    }
}
