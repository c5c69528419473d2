//! Reading dynamic spectra and images from FITS files.

mod error;
pub(crate) mod fits;

pub use error::FitsError;

use std::path::Path;

use hifitime::Epoch;
use indexmap::IndexMap;
use log::{debug, trace};
use ndarray::prelude::*;

use crate::DynamicSpectrum;
use fits::*;

/// Header keys carried from the input to the output of a dynamic spectrum.
pub const CARRIED_KEYS: [&str; 3] = ["TIME", "MILLITIM", "MARKER"];

/// The start time from a header's `TIME` \[unix seconds\] and `MILLITIM`
/// \[ms\] keys.
pub fn header_epoch(header: &IndexMap<String, String>) -> Option<Epoch> {
    let seconds: f64 = header.get("TIME")?.parse().ok()?;
    let millis: f64 = header
        .get("MILLITIM")
        .and_then(|m| m.parse().ok())
        .unwrap_or(0.0);
    Some(Epoch::from_unix_seconds(seconds + millis / 1e3))
}

/// Read the image of `hdu_index` along with any of [`CARRIED_KEYS`] in its
/// header.
fn read_image_hdu(
    fptr: &mut fitsio::FitsFile,
    file: &Path,
    hdu_index: usize,
) -> Result<DynamicSpectrum, FitsError> {
    let hdu = fits_open_hdu(fptr, file, hdu_index)?;
    let data = fits_get_image_2d(fptr, file, &hdu)?;
    let mut header = IndexMap::new();
    for key in CARRIED_KEYS {
        if let Some(value) = fits_get_optional_key::<String>(fptr, file, &hdu, key)? {
            header.insert(key.to_string(), value);
        }
    }
    let start = header_epoch(&header);
    trace!(
        "{} HDU {}: shape {:?}, start {start:?}",
        file.display(),
        hdu_index + 1,
        data.dim()
    );
    Ok(DynamicSpectrum {
        data,
        header,
        start,
    })
}

/// Read a dynamic spectrum (channel, time) from the primary HDU of a FITS
/// file.
pub fn read_dynamic_spectrum<P: AsRef<Path>>(file: P) -> Result<DynamicSpectrum, FitsError> {
    let file = file.as_ref();
    debug!("Reading dynamic spectrum from {}", file.display());
    let mut fptr = fits_open(file)?;
    let spectrum = read_image_hdu(&mut fptr, file, 0)?;
    debug!(
        "{} channels, {} time samples",
        spectrum.num_channels(),
        spectrum.num_samples()
    );
    Ok(spectrum)
}

/// Read every 2D image HDU of a FITS file, skipping empty HDUs (e.g. a
/// data-less primary HDU).
pub fn read_images<P: AsRef<Path>>(file: P) -> Result<Vec<DynamicSpectrum>, FitsError> {
    let file = file.as_ref();
    debug!("Reading all images from {}", file.display());
    let mut fptr = fits_open(file)?;
    let num_hdus = fptr.iter().count();

    let mut images = vec![];
    for i_hdu in 0..num_hdus {
        let hdu = fits_open_hdu(&mut fptr, file, i_hdu)?;
        match fits_get_image_shape(&hdu) {
            Some(shape) if !shape.is_empty() && shape.iter().all(|&d| d > 0) => (),
            _ => {
                trace!("Skipping HDU {}", i_hdu + 1);
                continue;
            }
        }
        images.push(read_image_hdu(&mut fptr, file, i_hdu)?);
    }
    if images.is_empty() {
        return Err(FitsError::NoImages {
            fits_filename: file.to_path_buf().into_boxed_path(),
        });
    }
    Ok(images)
}

/// Read the primary image of a FITS file, e.g. for statistics.
pub fn read_image<P: AsRef<Path>>(file: P) -> Result<Array2<f32>, FitsError> {
    read_dynamic_spectrum(file).map(|s| s.data)
}
