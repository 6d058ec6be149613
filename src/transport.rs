//! Fetching raw bytes from the remote feeds.

use std::{io::Read, path::Path};

use tracing::debug;

use crate::errors::OxyfloatErr;

/// Something that can fetch the body behind a url.
pub trait Transport {
    /// Fetch the full body at `url`.
    fn get(&self, url: &str) -> Result<Vec<u8>, OxyfloatErr>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn get(&self, url: &str) -> Result<Vec<u8>, OxyfloatErr> {
        (**self).get(url)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn get(&self, url: &str) -> Result<Vec<u8>, OxyfloatErr> {
        (**self).get(url)
    }
}

impl<T: Transport + ?Sized> Transport for std::rc::Rc<T> {
    fn get(&self, url: &str) -> Result<Vec<u8>, OxyfloatErr> {
        (**self).get(url)
    }
}

/// Blocking http client that also reads `file://` urls and plain paths from disk.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    /// Create a new transport.
    pub fn new() -> Self {
        Self::default()
    }

    fn read_local(path: &Path) -> Result<Vec<u8>, OxyfloatErr> {
        let mut buffer = vec![];
        std::fs::File::open(path)?.read_to_end(&mut buffer)?;
        Ok(buffer)
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &str) -> Result<Vec<u8>, OxyfloatErr> {
        debug!("GET {}", url);

        if let Some(path) = url.strip_prefix("file://") {
            return Self::read_local(Path::new(path));
        }

        if url.starts_with("http://") || url.starts_with("https://") {
            let response = self.client.get(url).send()?;
            let status = response.status();
            if !status.is_success() {
                return Err(OxyfloatErr::HttpStatus {
                    url: url.to_owned(),
                    status: status.as_u16(),
                });
            }

            return Ok(response.bytes()?.to_vec());
        }

        if url.contains("://") {
            return Err(OxyfloatErr::UnsupportedScheme(url.to_owned()));
        }

        Self::read_local(Path::new(url))
    }
}
