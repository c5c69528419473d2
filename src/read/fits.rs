//! Helper functions for reading FITS files.

use std::{fmt::Display, path::Path};

use fitsio::{hdu::*, FitsFile};
use ndarray::prelude::*;

use super::FitsError;

/// Open a fits file.
#[track_caller]
pub(crate) fn fits_open<P: AsRef<Path>>(file: P) -> Result<FitsFile, FitsError> {
    FitsFile::open(file.as_ref()).map_err(|e| {
        let caller = std::panic::Location::caller();
        FitsError::Open {
            fits_error: Box::new(e),
            fits_filename: file.as_ref().to_path_buf().into_boxed_path(),
            source_file: caller.file(),
            source_line: caller.line(),
        }
    })
}

/// Open a fits file's HDU.
#[track_caller]
pub(crate) fn fits_open_hdu<T: DescribesHdu + Display + Copy>(
    fits_fptr: &mut FitsFile,
    file: &Path,
    hdu_description: T,
) -> Result<FitsHdu, FitsError> {
    fits_fptr.hdu(hdu_description).map_err(|e| {
        let caller = std::panic::Location::caller();
        FitsError::Fitsio {
            fits_error: Box::new(e),
            fits_filename: file.to_path_buf().into_boxed_path(),
            hdu_description: format!("{hdu_description}").into_boxed_str(),
            source_file: caller.file(),
            source_line: caller.line(),
        }
    })
}

/// Given a FITS file pointer, a HDU that belongs to it, and a keyword that may
/// or may not exist, pull out the value of the keyword, parsing it into the
/// desired type.
#[track_caller]
pub(crate) fn fits_get_optional_key<T: std::str::FromStr>(
    fits_fptr: &mut FitsFile,
    file: &Path,
    hdu: &FitsHdu,
    keyword: &str,
) -> Result<Option<T>, FitsError> {
    let unparsed_value: String = match hdu.read_key(fits_fptr, keyword) {
        Ok(key_value) => key_value,
        Err(e) => {
            // 202 is KEY_NO_EXIST, 204 VALUE_UNDEFINED.
            if let fitsio::errors::Error::Fits(fe) = &e {
                if matches!(fe.status, 202 | 204) {
                    return Ok(None);
                }
            }
            let caller = std::panic::Location::caller();
            return Err(FitsError::Fitsio {
                fits_error: Box::new(e),
                fits_filename: file.to_path_buf().into_boxed_path(),
                hdu_description: format!("{}", hdu.number + 1).into_boxed_str(),
                source_file: caller.file(),
                source_line: caller.line(),
            });
        }
    };

    match unparsed_value.trim().parse() {
        Ok(parsed_value) => Ok(Some(parsed_value)),
        Err(_) => Err(FitsError::Parse {
            key: keyword.to_string().into_boxed_str(),
            fits_filename: file.to_path_buf().into_boxed_path(),
            hdu_num: hdu.number + 1,
        }),
    }
}

/// The shape of a HDU's image, or `None` if the HDU isn't an image.
pub(crate) fn fits_get_image_shape(hdu: &FitsHdu) -> Option<&[usize]> {
    match &hdu.info {
        HduInfo::ImageInfo { shape, .. } => Some(shape),
        _ => None,
    }
}

/// Given a FITS file pointer and a HDU, read the associated 2D image as
/// floats. The first axis is the slowest varying (NAXIS2).
#[track_caller]
pub(crate) fn fits_get_image_2d(
    fits_fptr: &mut FitsFile,
    file: &Path,
    hdu: &FitsHdu,
) -> Result<Array2<f32>, FitsError> {
    let shape = fits_get_image_shape(hdu)
        .ok_or_else(|| FitsError::NotImage {
            fits_filename: file.to_path_buf().into_boxed_path(),
            hdu_num: hdu.number + 1,
        })?
        .to_vec();
    let (rows, cols) = match shape.as_slice() {
        [rows, cols] => (*rows, *cols),
        _ => {
            return Err(FitsError::Not2D {
                fits_filename: file.to_path_buf().into_boxed_path(),
                hdu_num: hdu.number + 1,
                shape,
            })
        }
    };

    let data: Vec<f32> = hdu.read_image(fits_fptr).map_err(|e| {
        let caller = std::panic::Location::caller();
        FitsError::Fitsio {
            fits_error: Box::new(e),
            fits_filename: file.to_path_buf().into_boxed_path(),
            hdu_description: format!("{}", hdu.number + 1).into_boxed_str(),
            source_file: caller.file(),
            source_line: caller.line(),
        }
    })?;
    // cfitsio gives us exactly rows * cols values.
    Array2::from_shape_vec((rows, cols), data).map_err(|_| FitsError::Not2D {
        fits_filename: file.to_path_buf().into_boxed_path(),
        hdu_num: hdu.number + 1,
        shape,
    })
}
