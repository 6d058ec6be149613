//! Module for errors.
use crate::dataset::DatasetErr;
use std::{error::Error, fmt::Display};

/// Error from the cache and retrieval interface.
#[derive(Debug)]
pub enum OxyfloatErr {
    // Inherited errors from std
    /// Error forwarded from std
    IO(::std::io::Error),

    // Other forwarded errors
    /// Database error
    Database(::rusqlite::Error),
    /// Error serializing or deserializing a cached table
    Json(::serde_json::Error),
    /// Error parsing a delimited text feed
    Csv(::csv::Error),
    /// Error parsing a catalog document
    Xml(::roxmltree::Error),
    /// Error forwarded from the http client
    Http(::reqwest::Error),
    /// Error reading from a remote dataset
    Dataset(DatasetErr),
    /// General error with any cause information erased and replaced by a string
    GeneralError(String),

    // My own errors from this crate
    /// Key not found in the cache.
    NotInCache(String),
    /// The database structure is wrong.
    InvalidSchema,
    /// A dataset is missing one of the configured variables.
    RequiredVariableNotPresent {
        /// The missing variable name
        variable: String,
        /// Where the dataset was opened from
        location: String,
    },
    /// A profile location does not end in `<float>_<profile>.nc`.
    InvalidProfileLocation(String),
    /// A server answered with a non-success status.
    HttpStatus {
        /// The requested url
        url: String,
        /// The status code returned
        status: u16,
    },
    /// The url scheme can not be fetched by this transport.
    UnsupportedScheme(String),
}

impl Display for OxyfloatErr {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> Result<(), std::fmt::Error> {
        use crate::errors::OxyfloatErr::*;

        match self {
            IO(err) => write!(f, "std lib io error: {}", err),

            Database(err) => write!(f, "database error: {}", err),
            Json(err) => write!(f, "serialization error: {}", err),
            Csv(err) => write!(f, "error parsing delimited text: {}", err),
            Xml(err) => write!(f, "error parsing catalog: {}", err),
            Http(err) => write!(f, "http error: {}", err),
            Dataset(err) => write!(f, "dataset error: {}", err),
            GeneralError(msg) => write!(f, "general error forwarded: {}", msg),

            NotInCache(key) => write!(f, "no entry in the cache for {}", key),
            InvalidSchema => write!(f, "invalid cache file format"),
            RequiredVariableNotPresent { variable, location } => {
                write!(f, "{} not in {}", variable, location)
            }
            InvalidProfileLocation(loc) => write!(f, "not a profile data file: {}", loc),
            HttpStatus { url, status } => write!(f, "http status {} from {}", status, url),
            UnsupportedScheme(url) => write!(f, "unsupported url scheme: {}", url),
        }
    }
}

impl Error for OxyfloatErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        use crate::errors::OxyfloatErr::*;

        match self {
            IO(err) => Some(err),
            Database(err) => Some(err),
            Json(err) => Some(err),
            Csv(err) => Some(err),
            Xml(err) => Some(err),
            Http(err) => Some(err),
            Dataset(err) => Some(err),
            _ => None,
        }
    }
}

impl OxyfloatErr {
    /// True if this is the "not yet cached" condition rather than a real failure.
    pub fn is_not_in_cache(&self) -> bool {
        matches!(self, OxyfloatErr::NotInCache(_))
    }

    /// True if this came from reading remote data rather than from the cache store.
    pub fn is_fetch_failure(&self) -> bool {
        use crate::errors::OxyfloatErr::*;

        matches!(
            self,
            IO(_) | Http(_) | Dataset(_) | HttpStatus { .. } | UnsupportedScheme(_) | GeneralError(_)
        )
    }
}

impl From<::std::io::Error> for OxyfloatErr {
    fn from(err: ::std::io::Error) -> OxyfloatErr {
        OxyfloatErr::IO(err)
    }
}

impl From<::rusqlite::Error> for OxyfloatErr {
    fn from(err: ::rusqlite::Error) -> OxyfloatErr {
        OxyfloatErr::Database(err)
    }
}

impl From<::serde_json::Error> for OxyfloatErr {
    fn from(err: ::serde_json::Error) -> OxyfloatErr {
        OxyfloatErr::Json(err)
    }
}

impl From<::csv::Error> for OxyfloatErr {
    fn from(err: ::csv::Error) -> OxyfloatErr {
        OxyfloatErr::Csv(err)
    }
}

impl From<::roxmltree::Error> for OxyfloatErr {
    fn from(err: ::roxmltree::Error) -> OxyfloatErr {
        OxyfloatErr::Xml(err)
    }
}

impl From<::reqwest::Error> for OxyfloatErr {
    fn from(err: ::reqwest::Error) -> OxyfloatErr {
        OxyfloatErr::Http(err)
    }
}

impl From<DatasetErr> for OxyfloatErr {
    fn from(err: DatasetErr) -> OxyfloatErr {
        OxyfloatErr::Dataset(err)
    }
}
