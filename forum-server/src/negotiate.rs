use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request, HeaderValue},
    response::{Html, IntoResponse, Response},
    Json,
};

use crate::Error;

/// Representation a client asked for through its `Accept` header
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Format {
    Html,
    Json,
}

const OFFERED: [(&str, Format); 3] = [
    ("text/html", Format::Html),
    ("application/xhtml+xml", Format::Html),
    ("application/json", Format::Json),
];

struct MediaRange<'a> {
    kind: &'a str,
    subtype: &'a str,
    quality: f32,
}

impl<'a> MediaRange<'a> {
    fn parse(range: &'a str) -> Option<MediaRange<'a>> {
        let mut params = range.split(';');
        let (kind, subtype) = params.next()?.trim().split_once('/')?;
        let mut quality = 1.0;
        for param in params {
            if let Some((name, value)) = param.split_once('=') {
                if name.trim().eq_ignore_ascii_case("q") {
                    quality = value.trim().parse::<f32>().ok()?.clamp(0.0, 1.0);
                }
            }
        }
        Some(MediaRange {
            kind: kind.trim(),
            subtype: subtype.trim(),
            quality,
        })
    }

    /// How precisely this range names `mime`, 0 if it does not match
    fn specificity(&self, mime: &str) -> u8 {
        let Some((kind, subtype)) = mime.split_once('/') else {
            return 0;
        };
        match (self.kind, self.subtype) {
            ("*", "*") => 1,
            (k, "*") if k.eq_ignore_ascii_case(kind) => 2,
            (k, s) if k.eq_ignore_ascii_case(kind) && s.eq_ignore_ascii_case(subtype) => 3,
            _ => 0,
        }
    }
}

/// Picks the preferred format for an `Accept` header value.
///
/// A missing header accepts anything. Equal weights favour HTML.
pub fn negotiate(accept: Option<&str>) -> Option<Format> {
    let accept = match accept.map(str::trim) {
        None | Some("") => return Some(Format::Html),
        Some(a) => a,
    };
    let ranges = accept
        .split(',')
        .filter_map(MediaRange::parse)
        .collect::<Vec<_>>();
    let mut best: Option<(f32, Format)> = None;
    for (mime, format) in OFFERED {
        let quality = ranges
            .iter()
            .filter(|r| r.specificity(mime) > 0)
            .max_by_key(|r| r.specificity(mime))
            .map(|r| r.quality)
            .unwrap_or(0.0);
        if quality > 0.0 && best.map(|(q, _)| quality > q).unwrap_or(true) {
            best = Some((quality, format));
        }
    }
    best.map(|(_, format)| format)
}

#[async_trait]
impl<S: Sync> FromRequestParts<S> for Format {
    type Rejection = Error;

    async fn from_request_parts(req: &mut request::Parts, _state: &S) -> Result<Format, Error> {
        let accept = req
            .headers
            .get_all(header::ACCEPT)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect::<Vec<_>>()
            .join(",");
        negotiate(Some(&accept)).ok_or_else(Error::not_acceptable)
    }
}

/// Answers with `data` as JSON, or with the page built by `html`
pub fn respond<T, F>(format: Format, data: &T, html: F) -> Result<Response, Error>
where
    T: serde::Serialize,
    F: FnOnce() -> Result<String, Error>,
{
    let mut resp = match format {
        Format::Json => Json(data).into_response(),
        Format::Html => Html(html()?).into_response(),
    };
    resp.headers_mut()
        .insert(header::VARY, HeaderValue::from_static("accept"));
    Ok(resp)
}
