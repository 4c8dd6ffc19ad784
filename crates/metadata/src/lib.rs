#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Repository and installed-state metadata
//!
//! Three XML documents are understood: `Updates` published by a
//! repository, `Packages` recording what is installed in a target
//! directory, and `UpdateSources` listing repositories. Parsed records are
//! plain values and are never mutated behind the caller's back.

mod element;
pub mod packages;
pub mod sources;
pub mod updates;

pub use packages::{PackageInfo, PackagesInfo};
pub use sources::{parse_update_sources, write_update_sources, UpdateSourceInfo};
pub use updates::UpdatesInfo;

use chrono::NaiveDate;
use ifw_errors::{Error, FormatError};

/// Dates are written `yyyy-MM-dd`
pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub(crate) fn invalid(file: &str, message: impl Into<String>) -> Error {
    FormatError::InvalidContent {
        file: file.to_string(),
        message: message.into(),
    }
    .into()
}

pub(crate) fn parse_date(value: &str, file: &str) -> Result<NaiveDate, Error> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .map_err(|e| invalid(file, format!("invalid date '{value}': {e}")))
}

pub(crate) fn parse_bool(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("true")
}

/// Location of a component archive inside a repository:
/// `<base>/<component>/<version><archive>`
#[must_use]
pub fn archive_url(base: &str, component: &str, version: &str, archive: &str) -> String {
    format!(
        "{}/{component}/{version}{archive}",
        base.trim_end_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_archive_url() {
        assert_eq!(
            archive_url("https://repo.example.com/linux/", "app.core", "1.0", "data.tar.zst"),
            "https://repo.example.com/linux/app.core/1.0data.tar.zst"
        );
        assert_eq!(
            archive_url("resource:", "app.core", "1.0", "data.tar"),
            "resource:/app.core/1.0data.tar"
        );
    }
}
