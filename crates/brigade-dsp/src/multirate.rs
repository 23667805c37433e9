/// Power-of-two multirate conversion built from cascaded half-band stages.
///
/// `Upsampler<N>` turns one base-rate sample into N oversampled samples;
/// `Decimator<N>` turns N oversampled samples back into one. N must be one of
/// 2, 4, 8, 16, 32; anything else fails to compile at `new()`.
///
/// Stage `o` (octave) converts between 2^o and 2^(o+1) times the base rate.
/// Each stage owns its output buffer: the buffers are 2, 4, .. N samples long,
/// allocated once at construction and reused for every frame.
use crate::halfband::HalfBandStage;
use crate::tables;

/// Round-trip DC group delay of an N-times up+down pair, in base-rate samples.
fn round_trip_delay(stages: &[HalfBandStage]) -> f64 {
    stages
        .iter()
        .enumerate()
        .map(|(octave, s)| s.round_trip_delay() / (1u32 << octave) as f64)
        .sum()
}

fn build_stages(count: usize) -> Vec<HalfBandStage> {
    (0..count).map(HalfBandStage::for_octave).collect()
}

fn build_buffers(count: usize) -> Vec<Box<[f64]>> {
    (0..count)
        .map(|octave| vec![0.0; 2usize << octave].into_boxed_slice())
        .collect()
}

/// One sample in, N samples out.
#[derive(Clone, Debug)]
pub struct Upsampler<const N: usize> {
    stages: Vec<HalfBandStage>,
    /// `buffers[o]` holds the 2^(o+1) samples stage `o` emitted this frame.
    buffers: Vec<Box<[f64]>>,
}

impl<const N: usize> Upsampler<N> {
    const FACTOR_OK: () = assert!(
        N.is_power_of_two() && N >= 2 && N <= tables::MAX_FACTOR,
        "multirate factor must be 2, 4, 8, 16 or 32"
    );
    pub const STAGES: usize = N.trailing_zeros() as usize;

    pub fn new() -> Self {
        let () = Self::FACTOR_OK;
        Self {
            stages: build_stages(Self::STAGES),
            buffers: build_buffers(Self::STAGES),
        }
    }

    pub fn factor(&self) -> usize {
        N
    }

    /// Interpolate one base-rate sample into N oversampled samples.
    #[inline]
    pub fn process(&mut self, x: f64) -> [f64; N] {
        self.run(x);
        let mut out = [0.0; N];
        out.copy_from_slice(&self.buffers[Self::STAGES - 1]);
        out
    }

    fn run(&mut self, x: f64) {
        let first = self.stages[0].interpolate(x);
        self.buffers[0].copy_from_slice(&first);
        for octave in 1..Self::STAGES {
            let (done, rest) = self.buffers.split_at_mut(octave);
            let src = &done[octave - 1];
            let dst = &mut rest[0];
            let stage = &mut self.stages[octave];
            for (i, &s) in src.iter().enumerate() {
                let [even, odd] = stage.interpolate(s);
                dst[2 * i] = even;
                dst[2 * i + 1] = odd;
            }
        }
    }

    /// Interpolate a block into `output`, `N` samples per input sample.
    /// Stops at whichever buffer runs out first and returns the number of
    /// input samples consumed.
    pub fn process_block(&mut self, input: &[f64], output: &mut [f64]) -> usize {
        let count = input.len().min(output.len() / N);
        for (&x, frame) in input[..count].iter().zip(output.chunks_exact_mut(N)) {
            self.run(x);
            frame.copy_from_slice(&self.buffers[Self::STAGES - 1]);
        }
        count
    }

    /// DC group delay of the interpolation cascade alone, in base-rate samples.
    pub fn group_delay(&self) -> f64 {
        // Interleaving puts the lower path half an output sample late.
        self.stages
            .iter()
            .enumerate()
            .map(|(octave, s)| (s.round_trip_delay() + 0.5) / (2u32 << octave) as f64)
            .sum()
    }

    /// Nominal latency of an `Upsampler<N>` + `Decimator<N>` round trip,
    /// rounded to whole base-rate samples.
    pub fn latency_samples(&self) -> usize {
        round_trip_delay(&self.stages).round() as usize
    }

    pub fn reset(&mut self) {
        for stage in &mut self.stages {
            stage.reset();
        }
        for buf in &mut self.buffers {
            buf.fill(0.0);
        }
    }

    pub fn is_silent(&self) -> bool {
        self.stages.iter().all(HalfBandStage::is_silent)
            && self.buffers.iter().all(|b| b.iter().all(|&v| v == 0.0))
    }
}

impl<const N: usize> Default for Upsampler<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// N samples in, one sample out.
#[derive(Clone, Debug)]
pub struct Decimator<const N: usize> {
    stages: Vec<HalfBandStage>,
    /// `buffers[o]` holds the 2^(o+1) samples stage `o` consumes this frame.
    buffers: Vec<Box<[f64]>>,
}

impl<const N: usize> Decimator<N> {
    const FACTOR_OK: () = assert!(
        N.is_power_of_two() && N >= 2 && N <= tables::MAX_FACTOR,
        "multirate factor must be 2, 4, 8, 16 or 32"
    );
    pub const STAGES: usize = N.trailing_zeros() as usize;

    pub fn new() -> Self {
        let () = Self::FACTOR_OK;
        Self {
            stages: build_stages(Self::STAGES),
            buffers: build_buffers(Self::STAGES),
        }
    }

    pub fn factor(&self) -> usize {
        N
    }

    /// Filter and decimate one frame of N oversampled samples.
    #[inline]
    pub fn process(&mut self, frame: &[f64; N]) -> f64 {
        self.run(frame)
    }

    fn run(&mut self, frame: &[f64]) -> f64 {
        let top = Self::STAGES - 1;
        self.buffers[top].copy_from_slice(frame);
        for octave in (1..Self::STAGES).rev() {
            let (below, from) = self.buffers.split_at_mut(octave);
            let src = &from[0];
            let dst = &mut below[octave - 1];
            let stage = &mut self.stages[octave];
            for (i, out) in dst.iter_mut().enumerate() {
                *out = stage.decimate(src[2 * i], src[2 * i + 1]);
            }
        }
        let last = &self.buffers[0];
        self.stages[0].decimate(last[0], last[1])
    }

    /// Decimate `N` input samples into each output sample. Stops at whichever
    /// buffer runs out first and returns the number of outputs written; a
    /// trailing partial frame is left unread.
    pub fn process_block(&mut self, input: &[f64], output: &mut [f64]) -> usize {
        let count = output.len().min(input.len() / N);
        for (frame, out) in input.chunks_exact(N).zip(output[..count].iter_mut()) {
            *out = self.run(frame);
        }
        count
    }

    /// DC group delay of the decimation cascade alone, in base-rate samples.
    pub fn group_delay(&self) -> f64 {
        // Output is aligned to the even input, so the upper path reads half a sample early.
        self.stages
            .iter()
            .enumerate()
            .map(|(octave, s)| (s.round_trip_delay() - 0.5) / (2u32 << octave) as f64)
            .sum()
    }

    /// Nominal latency of an `Upsampler<N>` + `Decimator<N>` round trip,
    /// rounded to whole base-rate samples.
    pub fn latency_samples(&self) -> usize {
        round_trip_delay(&self.stages).round() as usize
    }

    pub fn reset(&mut self) {
        for stage in &mut self.stages {
            stage.reset();
        }
        for buf in &mut self.buffers {
            buf.fill(0.0);
        }
    }

    pub fn is_silent(&self) -> bool {
        self.stages.iter().all(HalfBandStage::is_silent)
            && self.buffers.iter().all(|b| b.iter().all(|&v| v == 0.0))
    }
}

impl<const N: usize> Default for Decimator<N> {
    fn default() -> Self {
        Self::new()
    }
}
