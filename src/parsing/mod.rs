//! Parsers for the tabular inputs the resolver reads.
//!
//! - **Search lists** ([`tsv`]): TSV/CSV files of names to resolve in bulk,
//!   one search per row, columns named after [`Search`](crate::core::search::Search) fields
//! - **Taxon tables** ([`taxa`]): Darwin Core style taxon files used to build a
//!   [`TaxonomyIndex`](crate::catalog::store::TaxonomyIndex)
//!
//! Files ending in `.gz` are decompressed transparently.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use taxon_solver::parsing::tsv::parse_search_file;
//!
//! let searches = parse_search_file(Path::new("names.tsv")).unwrap();
//! println!("{} rows", searches.len());
//! ```

pub mod taxa;
pub mod tsv;

use std::io::Read;
use std::path::Path;

use flate2::read::GzDecoder;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Too many rows: {0} exceeds maximum allowed ({max})", max = crate::utils::validation::MAX_BATCH_SIZE)]
    TooManyRows(usize),
}

/// Read a whole text file, decompressing it first if it is gzipped
///
/// # Errors
///
/// Returns `ParseError::Io` if the file cannot be read or decompressed.
pub fn read_text(path: &Path) -> Result<String, ParseError> {
    let file = std::fs::File::open(path)?;
    let mut text = String::new();
    if is_gzipped(path) {
        GzDecoder::new(file).read_to_string(&mut text)?;
    } else {
        std::io::BufReader::new(file).read_to_string(&mut text)?;
    }
    Ok(text)
}

fn is_gzipped(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("gz"))
}

/// The file name with any `.gz` suffix removed, lowercased
fn base_name(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    name.strip_suffix(".gz").map(str::to_string).unwrap_or(name)
}

/// Field delimiter implied by a file name: comma for `.csv`, tab otherwise
#[must_use]
pub fn delimiter_for(path: &Path) -> char {
    if base_name(path).ends_with(".csv") {
        ','
    } else {
        '\t'
    }
}

/// Split a delimited line into trimmed fields, dropping one layer of
/// surrounding double quotes from each
fn split_fields(line: &str, delimiter: char) -> Vec<String> {
    line.split(delimiter)
        .map(|field| {
            let field = field.trim();
            field
                .strip_prefix('"')
                .and_then(|f| f.strip_suffix('"'))
                .unwrap_or(field)
                .trim()
                .to_string()
        })
        .collect()
}
