//! Errors associated with reading and writing FITS files.

use std::path::Path;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FitsError {
    /// Error when opening a fits file.
    #[error("{source_file}:{source_line}: Couldn't open {fits_filename}: {fits_error}")]
    Open {
        fits_error: Box<fitsio::errors::Error>,
        fits_filename: Box<Path>,
        source_file: &'static str,
        source_line: u32,
    },

    /// A HDU that couldn't be used as an image.
    #[error("{fits_filename} HDU {hdu_num}: Tried to use as an image, but not an image")]
    NotImage {
        fits_filename: Box<Path>,
        hdu_num: usize,
    },

    #[error("{fits_filename} HDU {hdu_num}: Expected a 2D image, but the image has shape {shape:?}")]
    Not2D {
        fits_filename: Box<Path>,
        hdu_num: usize,
        shape: Vec<usize>,
    },

    #[error("{fits_filename}: No image HDUs were found")]
    NoImages { fits_filename: Box<Path> },

    /// A generic error associated with the fitsio crate.
    #[error("{source_file}:{source_line}: {fits_filename} HDU '{hdu_description}': {fits_error}")]
    Fitsio {
        fits_error: Box<fitsio::errors::Error>,
        fits_filename: Box<Path>,
        hdu_description: Box<str>,
        source_file: &'static str,
        source_line: u32,
    },

    /// An error associated with parsing a string into another type.
    #[error("Couldn't parse {key} in {fits_filename} HDU {hdu_num}")]
    Parse {
        key: Box<str>,
        fits_filename: Box<Path>,
        hdu_num: usize,
    },

    #[error("Couldn't remove existing file {file}: {err}")]
    Remove { file: Box<Path>, err: std::io::Error },
}
