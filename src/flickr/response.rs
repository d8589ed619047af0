//! `flickr.photos.search` response parsing
//!
//! Requests are made with `format=json&nojsoncallback=1`. Flickr is loose
//! about numeric fields (`total` and `farm` show up as both strings and
//! numbers), so those accept either form.

use serde::Deserialize;

use super::{PageFetchResult, PhotoRecord, RemoteServiceError};

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    stat: Option<String>,
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    photos: Option<RawPhotos>,
}

#[derive(Debug, Deserialize)]
struct RawPhotos {
    #[serde(default)]
    page: Option<Flex>,
    #[serde(default)]
    pages: Option<Flex>,
    #[serde(default)]
    total: Option<Flex>,
    #[serde(default)]
    photo: Vec<RawPhoto>,
}

#[derive(Debug, Deserialize)]
struct RawPhoto {
    owner: Option<Flex>,
    id: Option<Flex>,
    farm: Option<Flex>,
    server: Option<Flex>,
    secret: Option<Flex>,
}

/// A JSON value that may be a number or a string
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Flex {
    Num(u64),
    Str(String),
}

impl Flex {
    fn as_u64(&self) -> Option<u64> {
        match self {
            Flex::Num(n) => Some(*n),
            Flex::Str(s) => s.trim().parse().ok(),
        }
    }

    fn into_string(self) -> String {
        match self {
            Flex::Num(n) => n.to_string(),
            Flex::Str(s) => s,
        }
    }
}

/// Parse a search response body into a page result
///
/// `requested_page` is used when the body omits its own `page` field.
pub fn parse_page(body: &str, requested_page: u32) -> Result<PageFetchResult, RemoteServiceError> {
    let envelope: Envelope = serde_json::from_str(body)
        .map_err(|e| RemoteServiceError::MalformedResponse(e.to_string()))?;

    if envelope.stat.as_deref() == Some("fail") {
        return Err(RemoteServiceError::Api {
            code: envelope.code.unwrap_or(0),
            message: envelope.message.unwrap_or_default(),
        });
    }

    let photos = envelope
        .photos
        .ok_or_else(|| RemoteServiceError::MalformedResponse("missing photos".to_string()))?;

    let total_pages = count(photos.pages.as_ref(), "pages")?;
    let total_pages = u32::try_from(total_pages).map_err(|_| {
        RemoteServiceError::MalformedResponse(format!("pages out of range: {}", total_pages))
    })?;
    let total_photos = count(photos.total.as_ref(), "total")?;
    let page_number = photos
        .page
        .as_ref()
        .and_then(Flex::as_u64)
        .and_then(|p| u32::try_from(p).ok())
        .unwrap_or(requested_page);

    let records = photos
        .photo
        .into_iter()
        .enumerate()
        .map(|(i, raw)| record(raw, i))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(PageFetchResult {
        page_number,
        total_pages,
        total_photos,
        photos: records,
    })
}

fn count(value: Option<&Flex>, name: &str) -> Result<u64, RemoteServiceError> {
    value
        .ok_or_else(|| RemoteServiceError::MalformedResponse(format!("missing {}", name)))?
        .as_u64()
        .ok_or_else(|| RemoteServiceError::MalformedResponse(format!("invalid {}", name)))
}

fn record(raw: RawPhoto, index: usize) -> Result<PhotoRecord, RemoteServiceError> {
    let field = |value: Option<Flex>, name: &str| {
        value.map(Flex::into_string).ok_or_else(|| {
            RemoteServiceError::MalformedResponse(format!("photo {} missing {}", index, name))
        })
    };

    Ok(PhotoRecord {
        owner_id: field(raw.owner, "owner")?,
        photo_id: field(raw.id, "id")?,
        farm_id: field(raw.farm, "farm")?,
        server_id: field(raw.server, "server")?,
        secret: field(raw.secret, "secret")?,
    })
}
