/// Brigade Bench: measurement CLI for the BBD and multirate DSP core.
///
/// Usage:
///   brigade-bench latency [--clock HZ]
///   brigade-bench dc [--clock HZ] [--level L]
///   brigade-bench sweep [--clock HZ] [--start F1] [--end F2] [--points N] [--csv FILE]
///   brigade-bench halfband [--probe F]
///   brigade-bench render [--time T] [--feedback FB] [--mix M] [--duration D] [-o FILE]
///   brigade-bench design -o FILE
///
/// Every subcommand accepts `--design FILE.json` to replace the default
/// Juno-60 filter pair and `--stages N` to change the line length.
mod color_logger;

use std::error::Error;
use std::f64::consts::PI;
use std::path::{Path, PathBuf};

use brigade_dsp::bbd::{Bbd, BbdConfig};
use brigade_dsp::control::CvCurve;
use brigade_dsp::echo::{BbdEcho, EchoConfig};
use brigade_dsp::halfband::HalfBandStage;
use brigade_dsp::multirate::{Decimator, Upsampler};
use brigade_dsp::tables::MAX_OCTAVES;
use clap::{Args, Parser, Subcommand};
use color_logger::ColorLogger;
use colored::Colorize;
use log::{debug, info};

const BASE_SR: f64 = 44100.0;

#[derive(Parser)]
#[command(name = "brigade-bench", version, about = "BBD and multirate DSP measurements")]
struct Cli {
    #[command(flatten)]
    design: DesignArgs,

    /// Debug logging from the DSP core
    #[arg(short = 'v', long = "verbose", global = true)]
    verbose: bool,

    /// Silence all logging
    #[arg(short = 'q', long = "quiet", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct DesignArgs {
    /// BBD filter design as JSON (see the `design` subcommand)
    #[arg(long = "design", global = true)]
    design: Option<PathBuf>,

    /// Number of BBD stages (overrides the design file)
    #[arg(long = "stages", global = true)]
    stages: Option<usize>,
}

#[derive(Subcommand)]
enum Command {
    /// Round-trip latency of the multirate engine and step delay of the BBD
    Latency {
        #[arg(long, default_value = "10000")]
        clock: f64,
    },
    /// Settled output for a constant input, against the analytic DC gain
    Dc {
        #[arg(long, default_value = "10000")]
        clock: f64,
        #[arg(long, default_value = "0.5")]
        level: f64,
    },
    /// Sine-measured BBD frequency response (log scale)
    Sweep {
        #[arg(long, default_value = "40000")]
        clock: f64,
        #[arg(long, default_value = "50")]
        start: f64,
        #[arg(long, default_value = "18000")]
        end: f64,
        #[arg(long, default_value = "24")]
        points: usize,
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Per-octave half-band passband gain and stopband rejection
    Halfband {
        /// Stopband probe, as a fraction of the high rate
        #[arg(long, default_value = "0.4")]
        probe: f64,
    },
    /// Run plucks (or a WAV file) through the echo and write a 24-bit WAV
    Render {
        #[arg(long, default_value = "0.5")]
        time: f64,
        #[arg(long, default_value = "0.4")]
        feedback: f64,
        #[arg(long, default_value = "0.5")]
        mix: f64,
        #[arg(short = 'd', long, default_value = "2.0")]
        duration: f64,
        /// Mono WAV input; plucks are synthesized when absent
        #[arg(short = 'i', long)]
        input: Option<PathBuf>,
        #[arg(short = 'o', long, default_value = "brigade_render.wav")]
        output: PathBuf,
    },
    /// Write the active BBD design as JSON
    Design {
        #[arg(short = 'o', long)]
        output: PathBuf,
    },
}

fn main() {
    if let Err(e) = run() {
        eprintln!("{} {e}", "error:".red().bold());
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    ColorLogger::new(cli.quiet, cli.verbose).init()?;

    let config = load_config(&cli.design)?;
    match cli.command {
        Command::Latency { clock } => cmd_latency(&config, clock),
        Command::Dc { clock, level } => cmd_dc(&config, clock, level),
        Command::Sweep {
            clock,
            start,
            end,
            points,
            csv,
        } => cmd_sweep(&config, clock, start, end, points, csv.as_deref())?,
        Command::Halfband { probe } => cmd_halfband(probe),
        Command::Render {
            time,
            feedback,
            mix,
            duration,
            input,
            output,
        } => cmd_render(&config, time, feedback, mix, duration, input.as_deref(), &output)?,
        Command::Design { output } => {
            std::fs::write(&output, serde_json::to_string_pretty(&config)?)?;
            info!("design written to {}", output.display());
        }
    }
    Ok(())
}

fn load_config(args: &DesignArgs) -> Result<BbdConfig, Box<dyn Error>> {
    let mut config = match &args.design {
        Some(path) => {
            let text = std::fs::read_to_string(path)?;
            let config: BbdConfig = serde_json::from_str(&text)?;
            debug!("loaded design from {}", path.display());
            config
        }
        None => BbdConfig::default(),
    };
    if let Some(stages) = args.stages {
        config.stages = stages;
    }
    config.validate()?;
    Ok(config)
}

// ─── Latency ────────────────────────────────────────────────────────────────

fn round_trip<const N: usize>() -> (f64, f64, usize) {
    let up = Upsampler::<N>::new();
    let down = Decimator::<N>::new();
    (up.group_delay(), down.group_delay(), up.latency_samples())
}

/// Index of the first output sample at or above half the settled step level.
fn step_half_crossing(bbd: &mut Bbd, config: &BbdConfig, limit: usize) -> Option<usize> {
    let half = 0.5 * config.input.dc_gain() * config.output.dc_gain();
    (0..limit).find(|_| bbd.process(1.0) >= half)
}

fn cmd_latency(config: &BbdConfig, clock: f64) {
    println!("Multirate round trip (base-rate samples)");
    println!("{:>6}  {:>10}  {:>10}  {:>10}  {:>8}", "Factor", "Up", "Down", "Total", "Latency");
    println!("{:-<6}  {:-<10}  {:-<10}  {:-<10}  {:-<8}", "", "", "", "", "");
    let rows = [
        (2, round_trip::<2>()),
        (4, round_trip::<4>()),
        (8, round_trip::<8>()),
        (16, round_trip::<16>()),
        (32, round_trip::<32>()),
    ];
    for (factor, (up, down, latency)) in rows {
        println!(
            "{factor:>6}  {up:>10.4}  {down:>10.4}  {:>10.4}  {latency:>8}",
            up + down
        );
    }

    let mut bbd = Bbd::new(config, BASE_SR);
    bbd.set_clock_hz(clock);
    let nominal = bbd.delay_seconds() * BASE_SR;
    let limit = 4 * nominal as usize + 1024;
    println!();
    println!("BBD step delay ({} stages)", config.stages);
    println!("  Clock:      {:.1} Hz", bbd.clock_hz());
    println!("  Nominal:    {nominal:.1} samples ({:.2} ms)", bbd.delay_seconds() * 1000.0);
    match step_half_crossing(&mut bbd, config, limit) {
        Some(lag) => println!("  Measured:   {lag} samples (half-scale crossing)"),
        None => println!("  Measured:   no crossing within {limit} samples"),
    }
}

// ─── DC steady state ────────────────────────────────────────────────────────

fn cmd_dc(config: &BbdConfig, clock: f64, level: f64) {
    let mut bbd = Bbd::new(config, BASE_SR);
    bbd.set_clock_hz(clock);
    let settle = ((bbd.delay_seconds() + 2.0 / bbd.clock_hz()) * BASE_SR) as usize
        + (BASE_SR * 0.1) as usize;
    let mut y = 0.0;
    for _ in 0..settle {
        y = bbd.process(level);
    }
    let expected = level * config.input.dc_gain() * config.output.dc_gain();

    println!("DC steady state");
    println!("  Clock:      {:.1} Hz", bbd.clock_hz());
    println!("  Input:      {level:.6}");
    println!("  Settled:    {y:.9}");
    println!("  Expected:   {expected:.9}");
    println!("  Error:      {:.3e}", (y - expected).abs());
}

// ─── Frequency sweep ────────────────────────────────────────────────────────

/// RMS gain of the BBD for a sine at `freq`, after the line has filled.
fn measure_gain_at(config: &BbdConfig, clock: f64, freq: f64) -> f64 {
    let mut bbd = Bbd::new(config, BASE_SR);
    bbd.set_clock_hz(clock);
    let n_settle = (bbd.delay_seconds() * BASE_SR) as usize + (BASE_SR * 0.05) as usize;
    let n_measure = (BASE_SR * 0.1) as usize;

    let (mut e_in, mut e_out) = (0.0, 0.0);
    for i in 0..n_settle + n_measure {
        let x = (2.0 * PI * freq * i as f64 / BASE_SR).sin();
        let y = bbd.process(x);
        if i >= n_settle {
            e_in += x * x;
            e_out += y * y;
        }
    }
    (e_out / e_in).sqrt()
}

fn cmd_sweep(
    config: &BbdConfig,
    clock: f64,
    start: f64,
    end: f64,
    points: usize,
    csv_path: Option<&Path>,
) -> Result<(), Box<dyn Error>> {
    let log_start = start.ln();
    let log_end = end.ln();

    let mut csv_lines = vec!["freq_hz,measured_db,analytic_db".to_string()];

    println!("BBD frequency response (clock = {clock:.0} Hz)");
    println!("{:>10}  {:>12}  {:>12}", "Freq (Hz)", "Measured dB", "Filters dB");
    println!("{:-<10}  {:-<12}  {:-<12}", "", "", "");

    for i in 0..points {
        let frac = i as f64 / (points.max(2) - 1) as f64;
        let freq = (log_start + frac * (log_end - log_start)).exp();

        let measured_db = 20.0 * measure_gain_at(config, clock, freq).log10();
        let analytic = config.input.response(freq) * config.output.response(freq);
        let analytic_db = 20.0 * analytic.norm().log10();

        println!("{freq:>10.1}  {measured_db:>12.2}  {analytic_db:>12.2}");
        csv_lines.push(format!("{freq:.1},{measured_db:.3},{analytic_db:.3}"));
    }

    if let Some(path) = csv_path {
        std::fs::write(path, csv_lines.join("\n") + "\n")?;
        println!("\nCSV written to {}", path.display());
    }
    Ok(())
}

// ─── Half-band stages ───────────────────────────────────────────────────────

/// RMS gain of one decimating stage for a sine at `f` cycles per high-rate sample.
fn halfband_gain(octave: usize, f: f64) -> f64 {
    let mut stage = HalfBandStage::for_octave(octave);
    let n = 4096;
    let (mut e_in, mut e_out) = (0.0, 0.0);
    for i in 0..n {
        let even = (2.0 * PI * f * (2 * i) as f64).sin();
        let odd = (2.0 * PI * f * (2 * i + 1) as f64).sin();
        let y = stage.decimate(even, odd);
        if i >= n / 2 {
            e_in += 0.5 * (even * even + odd * odd);
            e_out += y * y;
        }
    }
    (e_out / e_in).sqrt()
}

fn cmd_halfband(probe: f64) {
    println!("Half-band stages (frequencies as a fraction of the high rate)");
    println!(
        "{:>6}  {:>5}  {:>10}  {:>10}  {:>12}",
        "Octave", "Order", "Delay", "0.05 (dB)", format!("{probe:.2} (dB)")
    );
    println!("{:-<6}  {:-<5}  {:-<10}  {:-<10}  {:-<12}", "", "", "", "", "");
    for octave in 0..MAX_OCTAVES {
        let stage = HalfBandStage::for_octave(octave);
        let pass = 20.0 * halfband_gain(octave, 0.05).log10();
        let stop = 20.0 * halfband_gain(octave, probe).log10();
        println!(
            "{octave:>6}  {:>5}  {:>10.4}  {pass:>10.3}  {stop:>12.1}",
            stage.path_order(),
            stage.round_trip_delay()
        );
    }
}

// ─── Render ─────────────────────────────────────────────────────────────────

/// Decaying sine plucks, one every half second.
fn plucks(len: usize, sample_rate: f64) -> Vec<f64> {
    let period = (sample_rate * 0.5) as usize;
    let notes = [220.0, 330.0, 277.2, 440.0];
    (0..len)
        .map(|i| {
            let k = i / period;
            let t = (i % period) as f64 / sample_rate;
            0.5 * (-t * 18.0).exp() * (2.0 * PI * notes[k % notes.len()] * t).sin()
        })
        .collect()
}

fn read_wav_mono(path: &Path) -> Result<(Vec<f64>, f64), Box<dyn Error>> {
    let mut reader = hound::WavReader::open(path)?;
    let spec = reader.spec();
    let channels = spec.channels as usize;
    let interleaved: Vec<f64> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .map(|s| s.map(f64::from))
            .collect::<Result<_, _>>()?,
        hound::SampleFormat::Int => {
            let max_val = (1i64 << (spec.bits_per_sample - 1)) as f64;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f64 / max_val))
                .collect::<Result<_, _>>()?
        }
    };
    // first channel only
    let mono = interleaved.iter().step_by(channels.max(1)).copied().collect();
    Ok((mono, spec.sample_rate as f64))
}

fn cmd_render(
    config: &BbdConfig,
    time: f64,
    feedback: f64,
    mix: f64,
    duration: f64,
    input: Option<&Path>,
    output_path: &Path,
) -> Result<(), Box<dyn Error>> {
    let (dry, sample_rate) = match input {
        Some(path) => read_wav_mono(path)?,
        None => (plucks((duration * BASE_SR) as usize, BASE_SR), BASE_SR),
    };

    let echo_config = EchoConfig {
        stages: config.stages,
        time_curve: CvCurve::Clip,
    };
    let mut echo = BbdEcho::with_design(&echo_config, config, sample_rate);
    echo.set_time(time);
    echo.set_feedback(feedback);
    let mix = mix.clamp(0.0, 1.0);

    let output: Vec<f64> = dry
        .iter()
        .map(|&x| (1.0 - mix) * x + mix * echo.process(x))
        .collect();

    let peak = output.iter().map(|x| x.abs()).fold(0.0f64, f64::max);
    let peak_dbfs = if peak > 0.0 { 20.0 * peak.log10() } else { -120.0 };

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: sample_rate as u32,
        bits_per_sample: 24,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(output_path, spec)?;
    let max_val = (1 << 23) - 1;
    for sample in &output {
        let scaled = (sample * max_val as f64).round() as i32;
        writer.write_sample(scaled.clamp(-max_val, max_val))?;
    }
    writer.finalize()?;

    println!("Render complete");
    println!("  Stages:    {}", config.stages);
    println!("  Clock:     {:.1} Hz", echo.clock_hz());
    println!("  Delay:     {:.1} ms", echo.delay_seconds() * 1000.0);
    println!("  Feedback:  {:.2}", echo.effective_feedback());
    println!("  Peak:      {peak_dbfs:.1} dBFS");
    println!("  Output:    {}", output_path.display());
    Ok(())
}
