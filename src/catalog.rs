//! Listing the profile files of one float from a THREDDS catalog.

use tracing::{debug, error};

use crate::{errors::OxyfloatErr, transport::Transport};

/// Path segment of the OPeNDAP access service on a THREDDS server.
const ACCESS_SEGMENT: &str = "dodsC";

/// Suffix of the data files listed in a catalog.
const DATA_FILE_SUFFIX: &str = ".nc";

/// Data access locations for every profile file in the catalog at `catalog_url`.
///
/// A catalog that can not be fetched or read yields no profiles; the failure is logged.
pub fn profile_locations(transport: &dyn Transport, catalog_url: &str) -> Vec<String> {
    debug!("Parsing {}", catalog_url);

    let body = match transport.get(catalog_url) {
        Ok(body) => body,
        Err(err) => {
            error!("Cannot open catalog_url = {}: {}", catalog_url, err);
            return vec![];
        }
    };

    match parse_catalog(catalog_url, &String::from_utf8_lossy(&body)) {
        Ok(locations) => locations,
        Err(err) => {
            error!("Cannot parse catalog_url = {}: {}", catalog_url, err);
            vec![]
        }
    }
}

/// Extract the data file locations from a catalog document, in document order.
pub fn parse_catalog(catalog_url: &str, text: &str) -> Result<Vec<String>, OxyfloatErr> {
    let doc = roxmltree::Document::parse(text)?;
    let base_url = access_base(catalog_url);

    Ok(doc
        .descendants()
        .filter(|node| node.is_element() && node.tag_name().name() == "dataset")
        .filter_map(|node| url_path(&node))
        .filter(|path| path.ends_with(DATA_FILE_SUFFIX))
        .map(|path| format!("{}{}", base_url, path))
        .collect())
}

/// The first four `/` separated parts of the catalog url followed by the access segment.
fn access_base(catalog_url: &str) -> String {
    let head: Vec<&str> = catalog_url.split('/').take(4).collect();
    format!("{}/{}/", head.join("/"), ACCESS_SEGMENT)
}

fn url_path<'a>(node: &roxmltree::Node<'a, '_>) -> Option<&'a str> {
    node.attributes()
        .find(|attr| attr.name().eq_ignore_ascii_case("urlpath"))
        .map(|attr| attr.value())
}
