use std::borrow::Cow;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use reqwest::Client;
use tracing::debug;
use url::Url;

use super::LoadError;
use crate::text::decode_bytes;

pub(crate) const MAX_DOCUMENT_BYTES: usize = 10_000_000;
pub(crate) const CACHE_BUST_PARAM: &str = "nocache";

static REQUEST_SEQ: AtomicU64 = AtomicU64::new(0);

/// Append a never-repeating `nocache` parameter so intermediate caches
/// always forward the request to the origin.
pub(crate) fn cache_busted(url: &Url) -> Url {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let seq = REQUEST_SEQ.fetch_add(1, Ordering::Relaxed);

    let mut busted = url.clone();
    busted
        .query_pairs_mut()
        .append_pair(CACHE_BUST_PARAM, &format!("{millis}-{seq}"));
    busted
}

pub(crate) async fn download(client: &Client, url: &Url) -> Result<String, LoadError> {
    let request_url = cache_busted(url);
    let response = client
        .get(request_url.as_str())
        .header("User-Agent", crate::USER_AGENT)
        .header("Cache-Control", "no-cache")
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(LoadError::Status(status.as_u16()));
    }

    if let Some(len) = response.content_length()
        && len as usize > MAX_DOCUMENT_BYTES
    {
        return Err(LoadError::TooLarge);
    }

    let mut body = Vec::new();
    let mut stream = response;
    while let Some(chunk) = stream.chunk().await? {
        body.extend_from_slice(&chunk);
        if body.len() > MAX_DOCUMENT_BYTES {
            return Err(LoadError::TooLarge);
        }
    }

    debug!(url = %redact_credentials(url.as_str()), bytes = body.len(), "source downloaded");
    Ok(decode_bytes(&body))
}

/// Strip userinfo (username:password) from URLs before logging.
pub(crate) fn redact_credentials(raw: &str) -> Cow<'_, str> {
    if !raw.contains('@') {
        return Cow::Borrowed(raw);
    }
    if let Ok(mut parsed) = Url::parse(raw)
        && (!parsed.username().is_empty() || parsed.password().is_some())
    {
        let _ = parsed.set_username("");
        let _ = parsed.set_password(None);
        return Cow::Owned(parsed.to_string());
    }
    Cow::Borrowed(raw)
}
