//! Detail URL templates
//!
//! A template is a URL with `{record_id}`, `{page_id}` and `{db_id}`
//! placeholders. Values are percent-encoded when substituted.

use crate::state::ItemRef;
use crate::{UrlError, UrlResult};
use url::form_urlencoded::byte_serialize;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placeholder {
    RecordId,
    PageId,
    DbId,
}

impl Placeholder {
    fn from_name(name: &str) -> UrlResult<Self> {
        match name {
            "record_id" => Ok(Self::RecordId),
            "page_id" => Ok(Self::PageId),
            "db_id" => Ok(Self::DbId),
            other => Err(UrlError::UnknownPlaceholder(other.to_string())),
        }
    }

    fn value<'a>(&self, item: &'a ItemRef) -> &'a str {
        match self {
            Self::RecordId => &item.record_id,
            Self::PageId => &item.page_id,
            Self::DbId => &item.db_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field(Placeholder),
}

/// Compiled detail URL template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailUrlTemplate {
    segments: Vec<Segment>,
}

impl DetailUrlTemplate {
    /// Compiles a template, rejecting unknown placeholders and templates that
    /// do not expand to an absolute http(s) URL
    pub fn parse(template: &str) -> UrlResult<Self> {
        let mut segments = Vec::new();
        let mut rest = template;

        while let Some(open) = rest.find('{') {
            if open > 0 {
                segments.push(Segment::Literal(rest[..open].to_string()));
            }
            let after = &rest[open + 1..];
            let close = after
                .find('}')
                .ok_or_else(|| UrlError::UnterminatedPlaceholder(template.to_string()))?;
            segments.push(Segment::Field(Placeholder::from_name(after[..close].trim())?));
            rest = &after[close + 1..];
        }
        if !rest.is_empty() {
            segments.push(Segment::Literal(rest.to_string()));
        }

        let compiled = Self { segments };

        let sample = compiled.build(&ItemRef::new("1", "1", "1"));
        let url = Url::parse(&sample).map_err(|e| UrlError::Parse(format!("{}: {}", sample, e)))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(UrlError::InvalidScheme(url.scheme().to_string()));
        }

        Ok(compiled)
    }

    /// Expands the template for one item
    pub fn build(&self, item: &ItemRef) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Field(field) => {
                    out.extend(byte_serialize(field.value(item).as_bytes()));
                }
            }
        }
        out
    }
}
