//! Inspect the candidates (and their time series) written by the FRB search
//! pipeline.

use std::path::PathBuf;

use clap::{AppSettings, Parser};
use itertools::Itertools;
use log::{info, warn};

use smart_frb::{
    candidates::{Candidate, CandidateFile, CandidateFormat, CandidateSet, SnrFilter, TimeOffset},
    parsing::parse_index_list,
    setup_logging, SmartFrbError,
};

#[derive(Parser)]
#[clap(global_setting(AppSettings::DeriveDisplayOrder))]
#[clap(disable_help_subcommand = true)]
#[clap(infer_long_args = true)]
struct Args {
    /// The candidates file.
    #[clap(name = "CANDIDATES_FILE")]
    file: PathBuf,

    /// Only show candidates with at least this SNR. -1 shows everything.
    #[clap(short, long, default_value = "-1", allow_hyphen_values = true)]
    snr: f32,

    /// Print the time series of these candidate IDs, e.g. 1,2,3.
    #[clap(short, long)]
    ids: Option<String>,

    /// The file has the older headers without time series.
    #[clap(long)]
    legacy: bool,

    /// How candidate time steps are made global: "header" uses each batch's
    /// global offset, "accumulated" sums the buffer sizes of earlier batches.
    #[clap(long, default_value = "header")]
    offset: TimeOffset,

    /// The time resolution of the series [s].
    #[clap(short, long, default_value = "0.02")]
    time_res: f64,

    /// List the candidates by time step rather than by peak flux.
    #[clap(long)]
    by_time: bool,

    /// The verbosity of the program. Increase by specifying multiple times
    /// (e.g. -vv). The default is to print only high-level information.
    #[clap(short, long, parse(from_occurrences))]
    verbosity: u8,
}

fn main() {
    if let Err(e) = try_main() {
        eprintln!("{e}");
        std::process::exit(1);
    }
}

fn print_candidate(c: &Candidate) {
    println!(
        "{:8} {:6} {:5} {:5} {:8.2} {:10} {:14.4} {:14.4} {:10.4} {:8.2}",
        c.id,
        c.batch_id,
        c.x,
        c.y,
        c.dm,
        c.time_step,
        c.peak_flux,
        c.mean_flux,
        c.std_dev,
        c.snr()
    );
}

fn try_main() -> Result<(), SmartFrbError> {
    let args = Args::parse();
    setup_logging(args.verbosity);

    let format = if args.legacy {
        CandidateFormat::Legacy
    } else {
        CandidateFormat::Series
    };
    let file = CandidateFile::new(&args.file, format, args.offset);
    let set = CandidateSet::read(&file)?;
    let filter = SnrFilter::from_threshold(args.snr);
    let mut candidates = set.filtered(filter);
    info!(
        "{} of {} candidates pass {filter:?}; images are {} pixels wide",
        candidates.len(),
        set.num_candidates(),
        set.side_size().unwrap_or(0)
    );

    if args.by_time {
        candidates.sort_by_key(|c| c.time_step);
    } else {
        candidates.sort_by(|a, b| a.peak_flux.total_cmp(&b.peak_flux));
    }
    println!(
        "{:>8} {:>6} {:>5} {:>5} {:>8} {:>10} {:>14} {:>14} {:>10} {:>8}",
        "ID", "batch", "x", "y", "dm", "time step", "peak (Jy)", "mean (Jy)", "std", "SNR"
    );
    if args.by_time {
        for (time_step, group) in &candidates.iter().group_by(|c| c.time_step) {
            println!("-- time step {time_step}");
            group.for_each(print_candidate);
        }
    } else {
        candidates.iter().for_each(print_candidate);
    }

    let ids = match &args.ids {
        Some(ids) => parse_index_list(ids)?,
        None => return Ok(()),
    };
    for id in ids {
        let Some(candidate) = set.find(id as u64) else {
            warn!("There is no candidate with ID {id}");
            continue;
        };
        if !filter.keeps(candidate) {
            info!("Candidate {id} is below the SNR threshold");
            continue;
        }
        let (Some(batch), Some(series)) = (set.batch_of(candidate), set.series_of(candidate))
        else {
            warn!("No time series was saved for candidate {id}");
            continue;
        };
        println!(
            "Candidate {id}: pixel ({}, {}), DM = {}",
            candidate.x, candidate.y, candidate.dm
        );
        for (t, flux) in batch.time_axis(args.time_res).iter().zip(series.iter()) {
            println!("    {t:10.3} s {flux:12.4} Jy");
        }
    }
    Ok(())
}
