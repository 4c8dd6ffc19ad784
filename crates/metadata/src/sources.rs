//! `UpdateSources`: the list of repositories to query

use crate::element::{parse_document, XmlWriter};
use crate::invalid;
use ifw_errors::{Error, FormatError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateSourceInfo {
    pub url: String,
    pub title: Option<String>,
    /// Higher priorities are queried first
    pub priority: i32,
}

impl UpdateSourceInfo {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: None,
            priority: 0,
        }
    }
}

/// Parse an `UpdateSources` document, ordered by descending priority
///
/// # Errors
///
/// Malformed XML, another root element, an `UpdateSource` without `Url` or
/// a non-numeric `Priority`.
pub fn parse_update_sources(xml: &str, file: &str) -> Result<Vec<UpdateSourceInfo>, Error> {
    let root = parse_document(xml, file)?;
    if root.name != "UpdateSources" {
        return Err(FormatError::UnexpectedRoot {
            found: root.name,
            expected: "UpdateSources".to_string(),
        }
        .into());
    }

    let mut sources = root
        .children_named("UpdateSource")
        .map(|element| {
            let url = element
                .child_text("Url")
                .ok_or_else(|| invalid(file, "UpdateSource element without Url"))?;
            let priority = match element.child_text("Priority") {
                Some(p) => p
                    .parse()
                    .map_err(|_| invalid(file, format!("Priority '{p}' is not a number")))?,
                None => 0,
            };
            Ok(UpdateSourceInfo {
                url: url.to_string(),
                title: element.child_text("Title").map(str::to_string),
                priority,
            })
        })
        .collect::<Result<Vec<_>, Error>>()?;

    // Stable: equal priorities keep document order
    sources.sort_by(|a, b| b.priority.cmp(&a.priority));
    Ok(sources)
}

#[must_use]
pub fn write_update_sources(sources: &[UpdateSourceInfo]) -> String {
    let mut w = XmlWriter::new();
    w.open("UpdateSources", &[]);
    for source in sources {
        w.open("UpdateSource", &[]);
        w.text("Url", &source.url);
        if let Some(title) = &source.title {
            w.text("Title", title);
        }
        w.text("Priority", &source.priority.to_string());
        w.close("UpdateSource");
    }
    w.close("UpdateSources");
    w.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sources_sorted_by_priority() {
        let xml = r"<UpdateSources>
            <UpdateSource><Url>https://a.example.com</Url></UpdateSource>
            <UpdateSource><Url>https://b.example.com</Url><Title>Mirror</Title><Priority>5</Priority></UpdateSource>
            <UpdateSource><Url>https://c.example.com</Url></UpdateSource>
        </UpdateSources>";
        let sources = parse_update_sources(xml, "UpdateSources.xml").unwrap();
        let urls: Vec<_> = sources.iter().map(|s| s.url.as_str()).collect();
        assert_eq!(
            urls,
            vec!["https://b.example.com", "https://a.example.com", "https://c.example.com"]
        );
        assert_eq!(sources[0].title.as_deref(), Some("Mirror"));

        let reparsed = parse_update_sources(&write_update_sources(&sources), "out.xml").unwrap();
        assert_eq!(reparsed, sources);
    }

    #[test]
    fn test_source_requires_url() {
        let err = parse_update_sources(
            "<UpdateSources><UpdateSource><Title>x</Title></UpdateSource></UpdateSources>",
            "UpdateSources.xml",
        )
        .unwrap_err();
        assert!(err.to_string().contains("without Url"));
    }
}
