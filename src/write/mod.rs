//! Writing dynamic spectra to FITS files.

use std::path::Path;

use fitsio::{
    hdu::FitsHdu,
    images::{ImageDescription, ImageType},
    FitsFile,
};
use indexmap::IndexMap;
use log::{debug, trace};
use ndarray::prelude::*;

use crate::{read::FitsError, DynamicSpectrum};

#[track_caller]
fn fitsio_err<'a>(
    file: &'a Path,
    hdu: &str,
) -> impl FnOnce(fitsio::errors::Error) -> FitsError + 'a {
    let caller = std::panic::Location::caller();
    let hdu = hdu.to_string();
    move |e| FitsError::Fitsio {
        fits_error: Box::new(e),
        fits_filename: file.to_path_buf().into_boxed_path(),
        hdu_description: hdu.into_boxed_str(),
        source_file: caller.file(),
        source_line: caller.line(),
    }
}

/// Create a new FITS file, replacing any existing one.
fn create(file: &Path, primary: Option<&ImageDescription>) -> Result<FitsFile, FitsError> {
    if file.exists() {
        std::fs::remove_file(file).map_err(|err| FitsError::Remove {
            file: file.to_path_buf().into_boxed_path(),
            err,
        })?;
    }
    let new = FitsFile::create(file);
    let fptr = match primary {
        Some(description) => new.with_custom_primary(description).open(),
        None => new.open(),
    };
    fptr.map_err(|e| FitsError::Open {
        fits_error: Box::new(e),
        fits_filename: file.to_path_buf().into_boxed_path(),
        source_file: file!(),
        source_line: line!(),
    })
}

/// Write header values, as integers or floats where they parse as such.
fn write_header(
    fptr: &mut FitsFile,
    file: &Path,
    hdu: &FitsHdu,
    header: &IndexMap<String, String>,
) -> Result<(), FitsError> {
    for (key, value) in header {
        trace!("Writing {key} = {value}");
        let result = if let Ok(i) = value.parse::<i64>() {
            hdu.write_key(fptr, key, i)
        } else if let Ok(f) = value.parse::<f64>() {
            hdu.write_key(fptr, key, f)
        } else {
            hdu.write_key(fptr, key, value.as_str())
        };
        result.map_err(fitsio_err(file, key))?;
    }
    Ok(())
}

fn standard_layout(data: ArrayView2<f32>) -> Vec<f32> {
    data.as_standard_layout().iter().copied().collect()
}

/// Write a dynamic spectrum as a float image in the primary HDU, along with
/// its header values.
pub fn write_dynamic_spectrum<P: AsRef<Path>>(
    file: P,
    spectrum: &DynamicSpectrum,
) -> Result<(), FitsError> {
    let file = file.as_ref();
    debug!(
        "Writing a {:?} dynamic spectrum to {}",
        spectrum.data.dim(),
        file.display()
    );
    let (rows, cols) = spectrum.data.dim();
    let description = ImageDescription {
        data_type: ImageType::Float,
        dimensions: &[rows, cols],
    };
    let mut fptr = create(file, Some(&description))?;
    let hdu = fptr.primary_hdu().map_err(fitsio_err(file, "0"))?;
    hdu.write_image(&mut fptr, &standard_layout(spectrum.data.view()))
        .map_err(fitsio_err(file, "0"))?;
    write_header(&mut fptr, file, &hdu, &spectrum.header)
}

/// Write a set of images as image extensions after a data-less primary HDU.
/// The primary HDU carries `primary_header`; each extension carries its own
/// image's header.
pub fn write_image_extensions<P: AsRef<Path>>(
    file: P,
    primary_header: &IndexMap<String, String>,
    images: &[DynamicSpectrum],
) -> Result<(), FitsError> {
    let file = file.as_ref();
    debug!("Writing {} images to {}", images.len(), file.display());
    let mut fptr = create(file, None)?;
    let primary = fptr.primary_hdu().map_err(fitsio_err(file, "0"))?;
    write_header(&mut fptr, file, &primary, primary_header)?;

    for (i, image) in images.iter().enumerate() {
        let (rows, cols) = image.data.dim();
        let description = ImageDescription {
            data_type: ImageType::Float,
            dimensions: &[rows, cols],
        };
        let name = format!("IMAGE{i}");
        let hdu = fptr
            .create_image(name.as_str(), &description)
            .map_err(fitsio_err(file, &name))?;
        hdu.write_image(&mut fptr, &standard_layout(image.data.view()))
            .map_err(fitsio_err(file, &name))?;
        write_header(&mut fptr, file, &hdu, &image.header)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use tempfile::tempdir;

    use super::*;
    use crate::read::{read_dynamic_spectrum, read_images};

    fn spectrum(offset: f32, time: &str) -> DynamicSpectrum {
        let mut s = DynamicSpectrum::new(Array2::from_shape_fn((3, 5), |(c, t)| {
            offset + (c * 5 + t) as f32
        }));
        s.header.insert("TIME".to_string(), time.to_string());
        s.header.insert("MILLITIM".to_string(), "250".to_string());
        s
    }

    #[test]
    fn test_dynamic_spectrum_survives_fits() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("ds.fits");
        let written = spectrum(0.5, "1600000000");
        write_dynamic_spectrum(&file, &written).unwrap();
        // Overwriting is fine.
        write_dynamic_spectrum(&file, &written).unwrap();

        let read = read_dynamic_spectrum(&file).unwrap();
        assert_eq!(read.data, written.data);
        assert_eq!(read.num_channels(), 3);
        assert_eq!(read.num_samples(), 5);
        assert_eq!(read.header["TIME"], "1600000000");
        assert_eq!(read.header["MILLITIM"], "250");
        assert!(!read.header.contains_key("MARKER"));
        let start = read.start.unwrap();
        assert_abs_diff_eq!(start.to_unix_seconds(), 1600000000.25, epsilon = 1e-6);
    }

    #[test]
    fn test_image_extensions() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("blink.fits");
        let images = [spectrum(0.0, "1600000000"), spectrum(100.0, "1600000001")];
        let mut primary = IndexMap::new();
        primary.insert("TIME".to_string(), "1600000000".to_string());
        primary.insert("MARKER".to_string(), "0".to_string());
        write_image_extensions(&file, &primary, &images).unwrap();

        // The data-less primary HDU is skipped.
        let read = read_images(&file).unwrap();
        assert_eq!(read.len(), 2);
        assert_eq!(read[0].data, images[0].data);
        assert_eq!(read[1].data, images[1].data);
        assert_eq!(read[1].header["TIME"], "1600000001");
    }
}
