//! Encoding and decoding of `data:` URLs (RFC 2397).

use std::fmt;
use std::str::FromStr;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use thiserror::Error;

/// Errors that can occur when decoding a data URL.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataUrlError {
    #[error("not a data URL: missing \"data:\" prefix")]
    MissingScheme,
    #[error("malformed data URL: missing ',' before the payload")]
    MissingComma,
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("invalid percent-encoding in payload")]
    InvalidPercentEncoding,
}

const DEFAULT_MIME_TYPE: &str = "text/plain";

/// Encodes `data` as a base64 data URL of the given media type.
///
/// ```
/// use tunables::dataurl;
///
/// assert_eq!(dataurl::encode(b"hi", "text/plain"), "data:text/plain;base64,aGk=");
/// ```
pub fn encode(data: &[u8], mime_type: &str) -> String {
    encode_with(data, mime_type, None, true)
}

/// Encodes `data` as a data URL, optionally declaring a `charset` and
/// choosing between a base64 and a percent-encoded payload.
pub fn encode_with(
    data: &[u8],
    mime_type: &str,
    charset: Option<&str>,
    base64: bool,
) -> String {
    let mut url = format!("data:{}", mime_type);
    if let Some(charset) = charset {
        url.push_str(";charset=");
        url.push_str(charset);
    }
    if base64 {
        url.push_str(";base64,");
        url.push_str(&STANDARD.encode(data));
    } else {
        url.push(',');
        url.push_str(&urlencoding::encode_binary(data));
    }
    url
}

/// Decodes a data URL into its payload bytes and media type.
pub fn decode(url: &str) -> Result<(Vec<u8>, String), DataUrlError> {
    let parsed = DataUrl::parse(url)?;
    Ok((parsed.data, parsed.mime_type))
}

/// Every `%` must introduce exactly two hex digits; `decode_binary` alone
/// would pass malformed escapes through unchanged.
fn percent_decode(payload: &str) -> Result<Vec<u8>, DataUrlError> {
    let bytes = payload.as_bytes();
    let well_formed = bytes.iter().enumerate().all(|(i, &byte)| {
        byte != b'%'
            || bytes
                .get(i + 1..i + 3)
                .is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit))
    });
    if !well_formed {
        return Err(DataUrlError::InvalidPercentEncoding);
    }
    Ok(urlencoding::decode_binary(bytes).into_owned())
}

/// A parsed data URL.
///
/// The original text is kept, so a `DataUrl` displays exactly as it was
/// written.
///
/// # Examples
///
/// ```
/// use tunables::dataurl::{self, DataUrl};
///
/// let url: DataUrl = "data:text/plain;charset=utf-8,hello%20world".parse().unwrap();
/// assert_eq!(url.mime_type(), "text/plain");
/// assert_eq!(url.charset(), Some("utf-8"));
/// assert_eq!(url.data(), b"hello world");
///
/// let round_trip = dataurl::encode(url.data(), url.mime_type());
/// assert_eq!(round_trip, "data:text/plain;base64,aGVsbG8gd29ybGQ=");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUrl {
    url: String,
    mime_type: String,
    charset: Option<String>,
    data: Vec<u8>,
}

impl DataUrl {
    pub fn parse(url: &str) -> Result<Self, DataUrlError> {
        let trimmed = url.trim();
        let rest = trimmed
            .get(..5)
            .filter(|scheme| scheme.eq_ignore_ascii_case("data:"))
            .map(|_| &trimmed[5..])
            .ok_or(DataUrlError::MissingScheme)?;
        let (header, payload) =
            rest.split_once(',').ok_or(DataUrlError::MissingComma)?;

        let mut params = header.split(';');
        let media_type = params.next().unwrap_or_default().trim();
        let mut charset = None;
        let mut is_base64 = false;
        for param in params.map(str::trim) {
            if param.eq_ignore_ascii_case("base64") {
                is_base64 = true;
            } else if let Some((key, value)) = param.split_once('=')
                && key.trim().eq_ignore_ascii_case("charset")
            {
                charset = Some(value.trim().to_owned());
            }
        }

        let data = if is_base64 {
            let compact: String =
                payload.chars().filter(|c| !c.is_whitespace()).collect();
            STANDARD.decode(compact)?
        } else {
            percent_decode(payload)?
        };

        let mime_type = if media_type.is_empty() {
            DEFAULT_MIME_TYPE
        } else {
            media_type
        };
        Ok(Self {
            url: url.to_owned(),
            mime_type: mime_type.to_owned(),
            charset,
            data,
        })
    }

    /// Returns true if `url` parses as a data URL.
    pub fn is_valid(url: &str) -> bool { Self::parse(url).is_ok() }

    pub fn as_str(&self) -> &str { &self.url }

    pub fn mime_type(&self) -> &str { &self.mime_type }

    pub fn charset(&self) -> Option<&str> { self.charset.as_deref() }

    pub fn data(&self) -> &[u8] { &self.data }

    pub fn into_data(self) -> Vec<u8> { self.data }
}

impl FromStr for DataUrl {
    type Err = DataUrlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> { Self::parse(s) }
}

impl fmt::Display for DataUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GIF_DATAURL: &str = "data:image/gif;base64,R0lGODlhCwALAIAAAAAA3pn/ZiH5BAEAAAEALAAAAAALAAsAAAIUhA+hkcuO4lmNVindo7qyrIXiGBYAOw==";

    #[test]
    fn test_gif_round_trip() {
        let url = DataUrl::parse(GIF_DATAURL).unwrap();
        assert_eq!(url.mime_type(), "image/gif");
        assert!(!url.data().is_empty());
        assert_eq!(url.to_string(), GIF_DATAURL);
        assert_eq!(encode(url.data(), "image/gif"), GIF_DATAURL);
        assert!(DataUrl::is_valid(GIF_DATAURL));
    }

    #[test]
    fn test_defaults_and_percent_encoding() {
        let (data, mime_type) = decode("data:,A%20brief%20note").unwrap();
        assert_eq!(data, b"A brief note");
        assert_eq!(mime_type, "text/plain");

        let encoded = encode_with(b"a b/c", "text/plain", Some("utf-8"), false);
        assert_eq!(encoded, "data:text/plain;charset=utf-8,a%20b%2Fc");
        let url: DataUrl = encoded.parse().unwrap();
        assert_eq!(url.charset(), Some("utf-8"));
        assert_eq!(url.into_data(), b"a b/c");
    }

    #[test]
    fn test_invalid_urls() {
        assert_eq!(
            DataUrl::parse("http://example.com"),
            Err(DataUrlError::MissingScheme)
        );
        assert_eq!(DataUrl::parse("data:text/plain"), Err(DataUrlError::MissingComma));
        assert!(matches!(
            DataUrl::parse("data:;base64,@@@"),
            Err(DataUrlError::Base64(_))
        ));
        assert_eq!(
            DataUrl::parse("data:,100%"),
            Err(DataUrlError::InvalidPercentEncoding)
        );
        assert!(!DataUrl::is_valid("data"));
    }

    #[test]
    fn test_escape_needs_two_hex_digits() {
        for url in ["data:,%+5", "data:,%-1", "data:,%g0", "data:,%4", "data:,a%"] {
            assert_eq!(
                DataUrl::parse(url),
                Err(DataUrlError::InvalidPercentEncoding),
                "{url}"
            );
        }
        assert_eq!(DataUrl::parse("data:,%41%2b").unwrap().data(), b"A+");
    }

    #[test]
    fn test_scheme_is_case_insensitive() {
        let url = DataUrl::parse("DATA:text/html;BASE64,PGI+").unwrap();
        assert_eq!(url.mime_type(), "text/html");
        assert_eq!(url.data(), b"<b>");
    }
}
