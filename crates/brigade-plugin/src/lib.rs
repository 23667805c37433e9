// Brigade: bucket-brigade echo plugin (CLAP + VST3).

use brigade_dsp::control::CvCurve;
use brigade_dsp::echo::{BbdEcho, EchoConfig};
use nih_plug::prelude::*;
use std::num::NonZeroU32;
use std::sync::Arc;

mod params;
use params::BrigadeParams;

const MAX_CHANNELS: usize = 2;

struct Brigade {
    params: Arc<BrigadeParams>,

    // One independent echo lane per channel
    lanes: Vec<BbdEcho>,

    sample_rate: f64,
}

impl Default for Brigade {
    fn default() -> Self {
        let sr = 44100.0;
        // No CV inputs on the plugin: the knob alone sets the time.
        let config = EchoConfig {
            time_curve: CvCurve::Clip,
            ..EchoConfig::default()
        };
        Self {
            params: Arc::new(BrigadeParams::default()),
            lanes: (0..MAX_CHANNELS).map(|_| BbdEcho::new(&config, sr)).collect(),
            sample_rate: sr,
        }
    }
}

impl Plugin for Brigade {
    const NAME: &'static str = "Brigade";
    const VENDOR: &'static str = "Brigade";
    const URL: &'static str = "";
    const EMAIL: &'static str = "";
    const VERSION: &'static str = env!("CARGO_PKG_VERSION");

    const AUDIO_IO_LAYOUTS: &'static [AudioIOLayout] = &[
        AudioIOLayout {
            main_input_channels: NonZeroU32::new(2),
            main_output_channels: NonZeroU32::new(2),
            aux_input_ports: &[],
            aux_output_ports: &[],
            names: PortNames::const_default(),
        },
        AudioIOLayout {
            main_input_channels: NonZeroU32::new(1),
            main_output_channels: NonZeroU32::new(1),
            aux_input_ports: &[],
            aux_output_ports: &[],
            names: PortNames::const_default(),
        },
    ];

    const SAMPLE_ACCURATE_AUTOMATION: bool = true;

    type SysExMessage = ();
    type BackgroundTask = ();

    fn params(&self) -> Arc<dyn Params> {
        self.params.clone()
    }

    fn initialize(
        &mut self,
        _audio_io_layout: &AudioIOLayout,
        buffer_config: &BufferConfig,
        _context: &mut impl InitContext<Self>,
    ) -> bool {
        self.sample_rate = buffer_config.sample_rate as f64;

        // Rediscretize in place; the lanes keep their buffers.
        for lane in &mut self.lanes {
            lane.set_sample_rate(self.sample_rate);
        }
        nih_log!(
            "brigade initialized at {} Hz, echo delay {:.1} ms",
            self.sample_rate,
            self.lanes[0].delay_seconds() * 1000.0
        );

        true
    }

    fn reset(&mut self) {
        for lane in &mut self.lanes {
            lane.reset();
        }
    }

    fn process(
        &mut self,
        buffer: &mut Buffer,
        _aux: &mut AuxiliaryBuffers,
        _context: &mut impl ProcessContext<Self>,
    ) -> ProcessStatus {
        for mut channel_samples in buffer.iter_samples() {
            // Per-sample smoothing keeps clock sweeps free of steps
            let time = self.params.time.smoothed.next() as f64;
            let feedback = self.params.feedback.smoothed.next() as f64;
            let mix = self.params.mix.smoothed.next();

            for (lane, s) in self.lanes.iter_mut().zip(channel_samples.iter_mut()) {
                lane.set_time(time);
                lane.set_feedback(feedback);
                let wet = lane.process(*s as f64) as f32;
                *s = *s * (1.0 - mix) + wet * mix;
            }
        }

        ProcessStatus::Normal
    }
}

impl ClapPlugin for Brigade {
    const CLAP_ID: &'static str = "com.brigade.bbd-echo";
    const CLAP_DESCRIPTION: Option<&'static str> =
        Some("Bucket-brigade echo with a clocked BBD emulation");
    const CLAP_MANUAL_URL: Option<&'static str> = None;
    const CLAP_SUPPORT_URL: Option<&'static str> = None;
    const CLAP_FEATURES: &'static [ClapFeature] = &[
        ClapFeature::AudioEffect,
        ClapFeature::Delay,
        ClapFeature::Stereo,
        ClapFeature::Mono,
    ];
}

impl Vst3Plugin for Brigade {
    const VST3_CLASS_ID: [u8; 16] = *b"BrigadeBbdEchoFX";
    const VST3_SUBCATEGORIES: &'static [Vst3SubCategory] =
        &[Vst3SubCategory::Fx, Vst3SubCategory::Delay];
}

nih_export_clap!(Brigade);
nih_export_vst3!(Brigade);
