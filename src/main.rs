use std::path::{Path, PathBuf};

use clap::{AppSettings, Args, Parser, Subcommand};
use indexmap::IndexMap;
use itertools::Itertools;
use log::{debug, info, warn};

use smart_frb::{
    candidates::{pixel_series, TimeSeriesReader},
    dedispersion::dm_time_plane,
    dispersion::{
        band_delay_s, compute_frequency_list_ghz, required_bandwidth_khz, DelayTable,
        MWA_BANDWIDTH_MHZ,
    },
    file_progress_bar,
    filenames::band_for,
    models::{
        beamforming_cost_per_time_sample, expected_frb_rate, frb_min_fluence_jyms, npixels,
        npixels_beam, pixsize_deg, sefd_jy, sensitivity_jy, DataRateParams, DataRequirements,
        ImagingCost, InstrumentConfig, ASKAP, CHIME, UTMOST,
    },
    obs::{
        frequency_project_counts, project_frequency_counts, read_asvo_xml, select_observations,
        total_duration_hours, SelectionCriteria,
    },
    parsing::{parse_float_list, parse_index_list, parse_pixels},
    peaks::{find_peaks, find_peaks_in_table, Estimator, PeakResult, DEFAULT_ALPHA, DEFAULT_SNR},
    read::{read_dynamic_spectrum, read_image, read_images},
    setup_logging,
    stats::ImageStats,
    write::{write_dynamic_spectrum, write_image_extensions},
    DynamicSpectrum, SmartFrbError,
};

#[derive(Parser)]
#[clap(version, about = "Fast radio burst search tools for the MWA SMART survey")]
#[clap(global_setting(AppSettings::DeriveDisplayOrder))]
#[clap(disable_help_subcommand = true)]
#[clap(infer_subcommands = true)]
#[clap(infer_long_args = true)]
struct SmartFrb {
    #[clap(flatten)]
    global_opts: GlobalArgs,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Args)]
struct GlobalArgs {
    /// A TOML file describing the instrument. Any parameter not in the file
    /// takes its MWA Phase I value.
    #[clap(long)]
    #[clap(global = true)]
    instrument: Option<PathBuf>,

    /// The verbosity of the program. Increase by specifying multiple times
    /// (e.g. -vv). The default is to print only high-level information.
    #[clap(short, long, parse(from_occurrences))]
    #[clap(global = true)]
    verbosity: u8,

    /// Disable progress bars.
    #[clap(long)]
    #[clap(global = true)]
    no_progress_bars: bool,
}

#[derive(Subcommand)]
#[clap(arg_required_else_help = true)]
enum Command {
    #[clap(about = "Print the dispersive delay across a band.")]
    Delay(DelayArgs),

    #[clap(about = "Print the per-channel delays [samples] for a set of DM trials.")]
    DelayTable(DelayTableArgs),

    #[clap(about = "Find the channel width whose dispersive delay matches a time resolution.")]
    Bandwidth(BandwidthArgs),

    #[clap(about = "Dedisperse and average a dynamic spectrum FITS file.")]
    Dedisperse(DedisperseArgs),

    #[clap(about = "Make a DM-time plane from a dynamic spectrum FITS file.")]
    DmTime(DmTimeArgs),

    #[clap(about = "Search the time series of a time-series dump for peaks.")]
    Peaks(PeaksArgs),

    #[clap(about = "Print the sensitivity of the instrument and the expected FRB rates.")]
    Sensitivity(SensitivityArgs),

    #[clap(about = "Print the data rates and volumes of each pipeline stage.")]
    DataRates(DataRatesArgs),

    #[clap(about = "Compare the computational cost of beamforming and imaging.")]
    Costs(CostsArgs),

    #[clap(about = "Summarise and select observations from ASVO VOTable results.")]
    Asvo(AsvoArgs),

    #[clap(about = "Print summary statistics of FITS images.")]
    ImageStats(ImageStatsArgs),

    #[clap(about = "Convert multi-image FITS files to image extensions after an empty primary HDU.")]
    ConvertBlink(ConvertBlinkArgs),

    #[clap(about = "Print the instrument parameters in use as TOML.")]
    Instrument,
}

#[derive(Args)]
struct DelayArgs {
    /// The DM trials [pc cm^-3], e.g. 100,600.
    #[clap(short, long, default_value = "600")]
    dms: String,

    /// The centre of the band [MHz].
    #[clap(short, long, default_value = "150")]
    freq: f64,

    /// The width of the band [MHz].
    #[clap(short, long, default_value_t = MWA_BANDWIDTH_MHZ)]
    bandwidth: f64,
}

#[derive(Args)]
struct DelayTableArgs {
    /// The DM trials [pc cm^-3], e.g. 100,600.
    #[clap(short, long)]
    dms: String,

    /// The centre of the band [MHz].
    #[clap(short, long, default_value = "153.5")]
    freq: f64,

    #[clap(short, long, default_value = "768")]
    nchans: usize,

    /// [MHz]
    #[clap(short, long, default_value = "0.04")]
    chan_width: f64,

    /// [s]
    #[clap(short, long, default_value = "0.02")]
    time_res: f64,
}

#[derive(Args)]
struct BandwidthArgs {
    /// The bottom of the channel [MHz].
    #[clap(short, long, default_value = "150")]
    freq: f64,

    /// [pc cm^-3]
    #[clap(short, long, default_value = "600")]
    dm: f64,

    /// [s]
    #[clap(short, long, default_value = "0.02")]
    time_res: f64,
}

/// Band parameters for files whose names don't say which coarse channel they
/// hold.
#[derive(Args)]
struct BandArgs {
    /// The centre of the band [MHz].
    #[clap(long, default_value = "153.5")]
    freq: f64,

    /// The width of a channel [MHz].
    #[clap(long, default_value = "0.04")]
    chan_width: f64,

    /// The time resolution of the dynamic spectrum [s].
    #[clap(long, default_value = "0.02")]
    time_res: f64,
}

#[derive(Args)]
struct DedisperseArgs {
    /// FITS file containing the dynamic spectrum.
    #[clap(name = "FITS_FILE")]
    input: PathBuf,

    /// The DM used to dedisperse [pc cm^-3]. 0 skips dedispersion.
    #[clap(long, default_value = "0")]
    dm: f64,

    /// Channel averaging factor.
    #[clap(long, default_value = "4")]
    chan_avg: usize,

    /// Time averaging factor.
    #[clap(long, default_value = "1")]
    time_avg: usize,

    #[clap(flatten)]
    band: BandArgs,

    /// Output FITS file.
    #[clap(short, long, default_value = "out.fits")]
    output: PathBuf,
}

#[derive(Args)]
struct DmTimeArgs {
    /// FITS file containing the dynamic spectrum.
    #[clap(name = "FITS_FILE")]
    input: PathBuf,

    /// The DM trials [pc cm^-3], e.g. 0,100,200.
    #[clap(short, long)]
    dms: String,

    #[clap(flatten)]
    band: BandArgs,

    /// Output FITS file.
    #[clap(short, long, default_value = "dm_time.fits")]
    output: PathBuf,
}

#[derive(Args)]
struct PeaksArgs {
    /// A time-series dump file.
    #[clap(name = "TIME_SERIES_FILE")]
    input: PathBuf,

    /// The pixels to search, e.g. "(10, 20) (3, 4)".
    #[clap(short, long)]
    pixels: String,

    /// The DM-trial indices to search, e.g. 0,1,2. Concatenated series are
    /// searched for these; ignored with --per-block.
    #[clap(short, long, default_value = "0")]
    dms: String,

    /// robust, running-mean or mean-std.
    #[clap(short, long, default_value = "robust")]
    estimator: Estimator,

    /// The weight given to the history by the running-mean estimator.
    #[clap(short, long, default_value_t = DEFAULT_ALPHA)]
    alpha: f64,

    #[clap(short, long, default_value_t = DEFAULT_SNR)]
    snr: f64,

    /// Search each block of the dump separately, for every DM trial, rather
    /// than concatenating the blocks.
    #[clap(long)]
    per_block: bool,

    /// The time resolution of the series [s].
    #[clap(short, long, default_value = "0.02")]
    time_res: f64,
}

#[derive(Args)]
struct SensitivityArgs {
    /// [MHz]
    #[clap(short, long, default_value = "150")]
    freq: f64,

    /// [MHz]
    #[clap(short, long, default_value_t = MWA_BANDWIDTH_MHZ)]
    bandwidth: f64,

    /// The number of antennas. Defaults to the instrument's.
    #[clap(short, long)]
    antennas: Option<u32>,

    /// Integration times [s], e.g. 0.01,0.02,0.05.
    #[clap(short, long, default_value = "0.01,0.02,0.05")]
    int_times: String,

    #[clap(long, default_value = "10")]
    snr: f64,

    /// The spectral index used to scale FRB rates.
    #[clap(long, default_value = "-1", allow_hyphen_values = true)]
    alpha: f64,
}

#[derive(Args)]
struct DataRatesArgs {
    /// [s]
    #[clap(long, default_value = "0.02")]
    int_time: f64,

    #[clap(long, default_value = "4")]
    chan_avg: u32,

    /// The side length of the images [pixels].
    #[clap(long, default_value = "1024")]
    image_side: u32,

    #[clap(long, default_value = "32")]
    bits_per_pixel: u32,

    #[clap(long, default_value = "1000")]
    n_dms: u32,

    /// The DM used to size the buffers [pc cm^-3].
    #[clap(long, default_value = "600")]
    dm: f64,

    /// [MHz]
    #[clap(long, default_value = "150")]
    freq: f64,
}

#[derive(Args)]
struct CostsArgs {
    /// [MHz]
    #[clap(short, long, default_value = "150")]
    freq: f64,

    /// [s]
    #[clap(short, long, default_value = "0.05")]
    int_time: f64,
}

#[derive(Args)]
struct AsvoArgs {
    /// VOTable XML of ASVO observation results.
    #[clap(name = "XML_FILE")]
    input: PathBuf,

    /// VOTable XML of calibrator observations. If given, observations of
    /// --project are selected.
    #[clap(short, long)]
    calibrators: Option<PathBuf>,

    #[clap(short, long, default_value = "G0057")]
    project: String,

    /// [MHz]
    #[clap(long, default_value_t = SelectionCriteria::DEFAULT_MIN_FREQ_MHZ)]
    min_freq: f64,

    /// [s]
    #[clap(long, default_value_t = SelectionCriteria::DEFAULT_MIN_DURATION_S)]
    min_duration: f64,
}

#[derive(Args)]
struct ImageStatsArgs {
    #[clap(name = "FITS_FILES", required = true)]
    files: Vec<PathBuf>,
}

#[derive(Args)]
struct ConvertBlinkArgs {
    #[clap(name = "FITS_FILES", required = true)]
    files: Vec<PathBuf>,

    /// Converted files are written here with their original names.
    #[clap(short, long, default_value = "converted")]
    output_dir: PathBuf,
}

fn main() {
    if let Err(e) = try_main() {
        eprintln!("{e}");
        std::process::exit(1);
    }
}

fn try_main() -> Result<(), SmartFrbError> {
    let SmartFrb {
        global_opts,
        command,
    } = SmartFrb::parse();
    setup_logging(global_opts.verbosity);
    let config = match &global_opts.instrument {
        Some(file) => {
            info!("Using instrument parameters from {}", file.display());
            InstrumentConfig::from_toml_file(file)?
        }
        None => InstrumentConfig::default(),
    };
    let hide_progress = global_opts.no_progress_bars;

    match command {
        Command::Delay(args) => delay(args),
        Command::DelayTable(args) => delay_table(args),
        Command::Bandwidth(args) => bandwidth(args),
        Command::Dedisperse(args) => dedisperse(args),
        Command::DmTime(args) => dm_time(args),
        Command::Peaks(args) => peaks(args),
        Command::Sensitivity(args) => sensitivity(args, &config),
        Command::DataRates(args) => data_rates(args, &config),
        Command::Costs(args) => costs(args, &config),
        Command::Asvo(args) => asvo(args),
        Command::ImageStats(args) => image_stats(args, hide_progress),
        Command::ConvertBlink(args) => convert_blink(args, hide_progress),
        Command::Instrument => {
            print!("{}", toml::to_string(&config)?);
            Ok(())
        }
    }
}

fn delay(args: DelayArgs) -> Result<(), SmartFrbError> {
    for dm in parse_float_list(&args.dms)? {
        let delay = band_delay_s(dm, args.freq, args.bandwidth)?;
        println!(
            "DM {dm}: {delay:.6} s across {} MHz at {} MHz",
            args.bandwidth, args.freq
        );
    }
    Ok(())
}

fn delay_table(args: DelayTableArgs) -> Result<(), SmartFrbError> {
    let dms = parse_float_list(&args.dms)?;
    let freqs = compute_frequency_list_ghz(args.freq, args.nchans, args.chan_width);
    let table = DelayTable::new(&freqs, &dms, args.time_res)?;
    for (dm, row) in table.dms.iter().zip(table.delays.outer_iter()) {
        println!("{dm}: {}", row.iter().join(" "));
    }
    Ok(())
}

fn bandwidth(args: BandwidthArgs) -> Result<(), SmartFrbError> {
    let khz = required_bandwidth_khz(args.freq, args.dm, args.time_res)?;
    println!(
        "At {} MHz and DM {}, a channel of {khz:.0} kHz disperses by {} s",
        args.freq, args.dm, args.time_res
    );
    Ok(())
}

/// The channel-edge frequencies \[GHz\] of a dynamic spectrum read from
/// `file`.
fn spectrum_frequencies(file: &Path, num_channels: usize, band: &BandArgs) -> Vec<f64> {
    let (centre_mhz, chan_width_mhz) = band_for(file, num_channels, (band.freq, band.chan_width));
    compute_frequency_list_ghz(centre_mhz, num_channels, chan_width_mhz).into_vec()
}

fn dedisperse(args: DedisperseArgs) -> Result<(), SmartFrbError> {
    let mut spectrum = read_dynamic_spectrum(&args.input)?;
    info!(
        "Read {} channels and {} time samples from {}",
        spectrum.num_channels(),
        spectrum.num_samples(),
        args.input.display()
    );

    if args.dm > 0.0 {
        let freqs = spectrum_frequencies(&args.input, spectrum.num_channels(), &args.band);
        let table = DelayTable::new(&freqs, &[args.dm], args.band.time_res)?;
        let delays = table.delays.row(0);
        if delays.iter().any(|&d| d >= spectrum.num_samples()) {
            warn!(
                "Delays of up to {} samples exceed the {} time samples; dedispersed channels will wrap",
                delays.iter().max().copied().unwrap_or(0),
                spectrum.num_samples()
            );
        }
        spectrum.dedisperse(delays)?;
        info!("Dedispersed at DM {}", args.dm);
    }
    spectrum.average_channels(args.chan_avg)?;
    spectrum.average_time(args.time_avg)?;

    write_dynamic_spectrum(&args.output, &spectrum)?;
    info!(
        "Wrote a {} x {} dynamic spectrum to {}",
        spectrum.num_channels(),
        spectrum.num_samples(),
        args.output.display()
    );
    Ok(())
}

fn dm_time(args: DmTimeArgs) -> Result<(), SmartFrbError> {
    let spectrum = read_dynamic_spectrum(&args.input)?;
    let dms = parse_float_list(&args.dms)?;
    let freqs = spectrum_frequencies(&args.input, spectrum.num_channels(), &args.band);
    let table = DelayTable::new(&freqs, &dms, args.band.time_res)?;
    let plane = dm_time_plane(spectrum.data.view(), &table)?;

    let mut out = DynamicSpectrum::new(plane);
    out.header = spectrum.header;
    out.start = spectrum.start;
    write_dynamic_spectrum(&args.output, &out)?;
    info!(
        "Wrote a DM-time plane with {} trials to {}",
        dms.len(),
        args.output.display()
    );
    Ok(())
}

fn print_peaks(label: &str, result: &PeakResult, time_res_s: f64) {
    if result.candidates.is_empty() {
        println!("{label}: no peaks");
        return;
    }
    println!("{label}: {} peaks", result.candidates.len());
    for &(i, value) in &result.candidates {
        println!("    sample {i:6} ({:.3} s): {value:.4}", i as f64 * time_res_s);
    }
}

fn peaks(args: PeaksArgs) -> Result<(), SmartFrbError> {
    let pixels = parse_pixels(&args.pixels)?;
    let estimator = match args.estimator {
        Estimator::RunningMean { .. } => Estimator::RunningMean { alpha: args.alpha },
        e => e,
    };
    info!(
        "Searching with the {} estimator at SNR {}",
        estimator.name(),
        args.snr
    );
    let reader = TimeSeriesReader::open(&args.input)?;

    if args.per_block {
        for table in reader {
            let table = table?;
            for &(x, y) in &pixels {
                for (dm, result) in find_peaks_in_table(&table, x, y, estimator, args.snr)? {
                    let label = format!("block {} pixel ({x}, {y}) DM {dm}", table.index);
                    print_peaks(&label, &result, args.time_res);
                }
            }
        }
        return Ok(());
    }

    let dms = parse_index_list(&args.dms)?;
    let all_series = pixel_series(reader, &dms, &pixels)?;
    for (i, series) in all_series.iter().enumerate() {
        let dm = dms[i / pixels.len()];
        let (x, y) = pixels[i % pixels.len()];
        let label = format!("pixel ({x}, {y}) DM {dm}");
        if series.is_empty() {
            warn!("{label} is not in {}", args.input.display());
            continue;
        }
        let result = find_peaks(series, estimator, args.snr)?;
        print_peaks(&label, &result, args.time_res);
    }
    Ok(())
}

fn sensitivity(args: SensitivityArgs, config: &InstrumentConfig) -> Result<(), SmartFrbError> {
    let freq_hz = args.freq * 1e6;
    let bandwidth_hz = args.bandwidth * 1e6;
    let n_antennas = args.antennas.unwrap_or(config.n_antennas);

    println!("SEFD at {} MHz: {:.1} Jy", args.freq, sefd_jy(config, freq_hz));
    for int_time in parse_float_list(&args.int_times)? {
        let s = sensitivity_jy(config, freq_hz, int_time, n_antennas, bandwidth_hz);
        let f = frb_min_fluence_jyms(config, args.snr, freq_hz, int_time, n_antennas, bandwidth_hz);
        println!(
            "{:.0} ms: sensitivity is {s:.2} Jy, minimum detectable fluence is {f:.2} Jy ms",
            int_time * 1e3
        );
    }

    println!(
        "Pixel size {:.4} deg; {:.0} pixels ({:.0} synthesised beams) cover {} deg^2",
        pixsize_deg(config.longest_baseline_m, freq_hz),
        npixels(config.fov_deg2, config.longest_baseline_m, freq_hz),
        npixels_beam(config, freq_hz),
        config.fov_deg2
    );

    let int_time = parse_float_list(&args.int_times)?[0];
    let fluence = frb_min_fluence_jyms(config, args.snr, freq_hz, int_time, n_antennas, bandwidth_hz);
    for survey in [CHIME, ASKAP, UTMOST] {
        println!(
            "Expected rate above {fluence:.1} Jy ms scaled from {}: {:.3} sky^-1 day^-1",
            survey.name,
            expected_frb_rate(&survey, freq_hz, fluence, args.alpha)
        );
    }
    Ok(())
}

fn data_rates(args: DataRatesArgs, config: &InstrumentConfig) -> Result<(), SmartFrbError> {
    let params = DataRateParams {
        int_time_s: args.int_time,
        channel_avg_factor: args.chan_avg,
        image_side: args.image_side,
        bits_per_pixel: args.bits_per_pixel,
        n_dm_trials: args.n_dms,
        representative_dm: args.dm,
        band_centre_mhz: args.freq,
    };
    let req = DataRequirements::compute(config, &params)?;
    println!(
        "{} fine channels of {:.3} kHz",
        req.n_fine_channels, req.fine_channel_width_khz
    );
    println!("Voltages:     {:10.3} GiB/s", req.voltages_gibps);
    println!("Visibilities: {:10.3} GiB/s", req.visibilities_gibps);
    println!("Images:       {:10.3} GiB/s", req.images_gibps);
    println!("Dedispersed:  {:10.3} GiB/s", req.dedispersed_gibps);
    println!(
        "A {:.3} s sweep at DM {} needs {:.3} GiB of images and {:.3} GiB of dedispersed images",
        req.sweep_s, args.dm, req.images_volume_gib, req.dedispersed_volume_gib
    );
    Ok(())
}

fn costs(args: CostsArgs, config: &InstrumentConfig) -> Result<(), SmartFrbError> {
    let freq_hz = args.freq * 1e6;
    let n_pixels = npixels(config.fov_deg2, config.longest_baseline_m, freq_hz);
    let imaging = ImagingCost::per_time_sample(config, n_pixels, args.int_time)?;
    let beamforming = beamforming_cost_per_time_sample(config, n_pixels);
    println!("Steps per time sample for {n_pixels:.0} pixels:");
    println!("Beamforming: {beamforming:.4e}");
    println!(
        "Imaging:     {:.4e} (correlation {:.4e}, gridding {:.4e}, FFT {:.4e})",
        imaging.total(),
        imaging.correlation,
        imaging.gridding,
        imaging.fft
    );
    Ok(())
}

fn asvo(args: AsvoArgs) -> Result<(), SmartFrbError> {
    let observations = read_asvo_xml(&args.input)?;
    info!(
        "{} observations in {}",
        observations.len(),
        args.input.display()
    );

    println!("Observations per project and frequency:");
    for ((project, freq), count) in project_frequency_counts(&observations)? {
        println!("    {project:8} {freq:8} MHz: {count}");
    }
    println!("Observations per frequency and project:");
    for ((freq, project), count) in frequency_project_counts(&observations)? {
        println!("    {freq:8} MHz {project:8}: {count}");
    }
    println!("Total duration: {:.2} h", total_duration_hours(&observations)?);

    if let Some(cal_file) = &args.calibrators {
        let calibrators = read_asvo_xml(cal_file)?;
        let criteria = SelectionCriteria {
            project_id: args.project,
            min_freq_mhz: args.min_freq,
            min_duration_s: args.min_duration,
        };
        let selection = select_observations(&observations, &calibrators, &criteria)?;
        for s in &selection.selected {
            println!(
                "{} {} {:20} {} MHz {} s {:.3} TB calibrator {}",
                s.obs_id,
                s.start_time,
                s.array_config,
                s.centre_freq_mhz,
                s.duration_s,
                s.terabytes,
                s.calibrator_id
            );
        }
        println!("Total: {:.3} TB", selection.total_terabytes);
        println!("Keep: {}", selection.obs_to_keep.iter().join(","));
    }
    Ok(())
}

fn image_stats(args: ImageStatsArgs, hide_progress: bool) -> Result<(), SmartFrbError> {
    let progress = file_progress_bar(args.files.len(), "Reading images", hide_progress)?;
    let mut all_stats = Vec::with_capacity(args.files.len());
    for file in &args.files {
        let image = read_image(file)?;
        all_stats.push((file, ImageStats::compute(image.view())?));
        progress.inc(1);
    }
    progress.finish();

    println!(
        "{:35} {:>10} {:>10} {:>10} {:>10} {:>10}",
        "filename", "mean", "stdev", "median", "min", "max"
    );
    for (file, s) in all_stats {
        println!(
            "{:35} {:10.6} {:10.6} {:10.6} {:10.6} {:10.6}",
            file.display(),
            s.mean,
            s.std,
            s.median,
            s.min,
            s.max
        );
    }
    Ok(())
}

fn convert_blink(args: ConvertBlinkArgs, hide_progress: bool) -> Result<(), SmartFrbError> {
    std::fs::create_dir_all(&args.output_dir)?;
    let progress = file_progress_bar(args.files.len(), "Converting", hide_progress)?;
    for file in &args.files {
        let file_name = file.file_name().ok_or_else(|| {
            SmartFrbError::Input(format!("'{}' is not a file", file.display()))
        })?;
        let images = read_images(file)?;

        // The primary HDU is stamped with the time of the first image.
        let first = &images[0].header;
        let mut primary_header = IndexMap::new();
        for key in ["TIME", "MILLITIM"] {
            let value = first.get(key).cloned().unwrap_or_else(|| "0".to_string());
            primary_header.insert(key.to_string(), value);
        }
        primary_header.insert("MARKER".to_string(), "0".to_string());

        let output = args.output_dir.join(file_name);
        write_image_extensions(&output, &primary_header, &images)?;
        debug!(
            "Converted {} ({} images) to {}",
            file.display(),
            images.len(),
            output.display()
        );
        progress.inc(1);
    }
    progress.finish();
    info!(
        "Converted {} files into {}",
        args.files.len(),
        args.output_dir.display()
    );
    Ok(())
}
