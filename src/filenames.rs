//! Recognising MWAX-style file names, e.g.
//! `1343457784_20220801161446_ch109_000.fits`.

use std::path::Path;

use lazy_static::lazy_static;
use log::{debug, info};
use regex::{Regex, RegexBuilder};
use thiserror::Error;

/// The width of an MWA coarse channel \[MHz\].
pub const COARSE_CHAN_WIDTH_MHZ: f64 = 1.28;

lazy_static! {
    static ref RE_MWAX: Regex =
        RegexBuilder::new(r"(\d{10})_(\d{8})(.)?(\d{6})_ch(\d{3})_(\d{3})\.fits$")
            .case_insensitive(false).build().unwrap();
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum FilenameError {
    #[error("'{0}' does not look like <obsid>_<date><time>_ch<NNN>_<BBB>.fits")]
    NotMwax(String),

    #[error("'{0}' does not have a UTF-8 file name")]
    NoName(String),
}

/// The parts of an MWAX file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MwaxFilename {
    pub obsid: u32,
    /// YYYYMMDD
    pub date: String,
    /// hhmmss
    pub time: String,
    /// The receiver (coarse) channel number.
    pub channel: u16,
    pub batch: u16,
}

impl MwaxFilename {
    /// The centre frequency of the coarse channel \[MHz\].
    pub fn centre_freq_mhz(&self) -> f64 {
        f64::from(self.channel) * COARSE_CHAN_WIDTH_MHZ
    }
}

/// Attempt to parse the file name of `path`. This only looks at the name;
/// whether the file exists is not checked. Callers use the error to fall back
/// to user-supplied parameters.
pub fn parse_mwax_filename<P: AsRef<Path>>(path: P) -> Result<MwaxFilename, FilenameError> {
    let path = path.as_ref();
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| FilenameError::NoName(path.display().to_string()))?;
    let not_mwax = || FilenameError::NotMwax(name.to_string());

    let caps = RE_MWAX.captures(name).ok_or_else(not_mwax)?;
    // The regex only matches digits, but a 10-digit obsid can overflow u32.
    let obsid = caps[1].parse().map_err(|_| not_mwax())?;
    let channel = caps[5].parse().map_err(|_| not_mwax())?;
    let batch = caps[6].parse().map_err(|_| not_mwax())?;
    Ok(MwaxFilename {
        obsid,
        date: caps[2].to_string(),
        time: caps[4].to_string(),
        channel,
        batch,
    })
}

/// The band of a dynamic spectrum with `num_channels` channels, as (centre
/// frequency \[MHz\], channel width \[MHz\]). If the file name of `path`
/// names a coarse channel, the channels evenly split it. Otherwise
/// `fallback` (e.g. from the command line) is returned unchanged.
pub fn band_for<P: AsRef<Path>>(path: P, num_channels: usize, fallback: (f64, f64)) -> (f64, f64) {
    match parse_mwax_filename(path) {
        Ok(name) => {
            let centre = name.centre_freq_mhz();
            let width = COARSE_CHAN_WIDTH_MHZ / num_channels as f64;
            info!(
                "Coarse channel {} from the file name: centre {centre} MHz, channel width {width} MHz",
                name.channel
            );
            (centre, width)
        }
        Err(e) => {
            debug!("{e}");
            info!(
                "Using a centre frequency of {} MHz and channel width {} MHz",
                fallback.0, fallback.1
            );
            fallback
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn test_parse_mwax_filename() {
        let parsed =
            parse_mwax_filename("/data/1343457784_20220801161446_ch109_000.fits").unwrap();
        assert_eq!(
            parsed,
            MwaxFilename {
                obsid: 1343457784,
                date: "20220801".to_string(),
                time: "161446".to_string(),
                channel: 109,
                batch: 0,
            }
        );
        assert_abs_diff_eq!(parsed.centre_freq_mhz(), 139.52, epsilon = 1e-10);

        // An optional separator between the date and time.
        let parsed = parse_mwax_filename("1343457784_20220801-161446_ch145_012.fits").unwrap();
        assert_eq!(parsed.channel, 145);
        assert_eq!(parsed.batch, 12);
    }

    #[test]
    fn test_not_mwax() {
        assert_eq!(
            parse_mwax_filename("dynamic_spectrum.fits"),
            Err(FilenameError::NotMwax("dynamic_spectrum.fits".to_string()))
        );
        assert!(parse_mwax_filename("1343457784_20220801161446_ch109_000.fits.gz").is_err());
        // Too big for an obsid.
        assert!(parse_mwax_filename("9999999999_20220801161446_ch109_000.fits").is_err());
        assert!(parse_mwax_filename("/").is_err());
    }

    #[test]
    fn test_band_from_file_name() {
        let (centre, width) = band_for(
            "/data/1343457784_20220801161446_ch109_000.fits",
            32,
            (153.5, 0.04),
        );
        assert_abs_diff_eq!(centre, 139.52, epsilon = 1e-10);
        assert_abs_diff_eq!(width, 1.28 / 32.0, epsilon = 1e-12);

        let (_, width) =
            band_for("1343457784_20220801161446_ch109_000.fits", 128, (153.5, 0.04));
        assert_abs_diff_eq!(width, 0.01, epsilon = 1e-12);
    }

    #[test]
    fn test_band_falls_back() {
        assert_eq!(
            band_for("dynamic_spectrum.fits", 32, (153.5, 0.04)),
            (153.5, 0.04)
        );
        assert_eq!(band_for("/", 32, (200.0, 0.1)), (200.0, 0.1));
    }
}
