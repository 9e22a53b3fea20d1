//! Request options: method, content type and body.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::NetworkError;

/// Header consulted and set when a request carries a body.
pub const CONTENT_TYPE_HEADER: &str = "Content-Type";

/// HTTP request methods.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// HTTP GET method.
    #[default]
    Get,
    /// HTTP POST method.
    Post,
    /// HTTP PUT method.
    Put,
    /// HTTP DELETE method.
    Delete,
    /// HTTP HEAD method.
    Head,
    /// HTTP PATCH method.
    Patch,
}

impl HttpMethod {
    /// Every method, in declaration order.
    pub const ALL: [HttpMethod; 6] = [
        Self::Get,
        Self::Post,
        Self::Put,
        Self::Delete,
        Self::Head,
        Self::Patch,
    ];

    /// The request-line verb.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Patch => "PATCH",
        }
    }

    /// Convert to reqwest method.
    pub(crate) fn to_reqwest(self) -> reqwest::Method {
        match self {
            Self::Get => reqwest::Method::GET,
            Self::Post => reqwest::Method::POST,
            Self::Put => reqwest::Method::PUT,
            Self::Delete => reqwest::Method::DELETE,
            Self::Head => reqwest::Method::HEAD,
            Self::Patch => reqwest::Method::PATCH,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Content type applied to a request body.
///
/// `Custom` leaves the `Content-Type` header to the caller; any other value
/// overwrites that header with its MIME string.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum ContentType {
    /// Use the `Content-Type` header supplied in the request headers.
    #[default]
    Custom,
    /// `application/java-archive`
    ApplicationJavaArchive,
    /// `application/EDI-X12`
    ApplicationEdiX12,
    /// `application/EDIFACT`
    ApplicationEdifact,
    /// `application/javascript`
    ApplicationJavascript,
    /// `application/octet-stream`
    ApplicationOctetStream,
    /// `application/ogg`
    ApplicationOgg,
    /// `application/pdf`
    ApplicationPdf,
    /// `application/xhtml+xml`
    ApplicationXhtmlXml,
    /// `application/x-shockwave-flash`
    ApplicationXShockwaveFlash,
    /// `application/json`
    ApplicationJson,
    /// `application/ld+json`
    ApplicationLdJson,
    /// `application/xml`
    ApplicationXml,
    /// `application/zip`
    ApplicationZip,
    /// `application/x-www-form-urlencoded`
    ApplicationXWwwFormUrlencoded,
    /// `audio/mpeg`
    AudioMpeg,
    /// `audio/x-ms-wma`
    AudioXMsWma,
    /// `audio/vnd.rn-realaudio`
    AudioVndRnRealaudio,
    /// `audio/x-wav`
    AudioXWav,
    /// `image/gif`
    ImageGif,
    /// `image/jpeg`
    ImageJpeg,
    /// `image/png`
    ImagePng,
    /// `image/tiff`
    ImageTiff,
    /// `image/vnd.microsoft.icon`
    ImageVndMicrosoftIcon,
    /// `image/x-icon`
    ImageXIcon,
    /// `image/vnd.djvu`
    ImageVndDjvu,
    /// `image/svg+xml`
    ImageSvgXml,
    /// `multipart/mixed`
    MultipartMixed,
    /// `multipart/alternative`
    MultipartAlternative,
    /// `multipart/related`
    MultipartRelated,
    /// `multipart/form-data`
    MultipartFormData,
    /// `text/css`
    TextCss,
    /// `text/csv`
    TextCsv,
    /// `text/html`
    TextHtml,
    /// `text/javascript`
    TextJavascript,
    /// `text/plain`
    TextPlain,
    /// `text/xml`
    TextXml,
    /// `video/mpeg`
    VideoMpeg,
    /// `video/mp4`
    VideoMp4,
    /// `video/quicktime`
    VideoQuicktime,
    /// `video/x-ms-wmv`
    VideoXMsWmv,
    /// `video/x-msvideo`
    VideoXMsvideo,
    /// `video/x-flv`
    VideoXFlv,
    /// `video/webm`
    VideoWebm,
    /// `application/vnd.android.package-archive`
    ApplicationVndAndroidPackageArchive,
    /// `application/vnd.oasis.opendocument.text`
    ApplicationVndOasisOpendocumentText,
    /// `application/vnd.oasis.opendocument.spreadsheet`
    ApplicationVndOasisOpendocumentSpreadsheet,
    /// `application/vnd.oasis.opendocument.presentation`
    ApplicationVndOasisOpendocumentPresentation,
    /// `application/vnd.oasis.opendocument.graphics`
    ApplicationVndOasisOpendocumentGraphics,
    /// `application/vnd.ms-excel`
    ApplicationVndMsExcel,
    /// `application/vnd.openxmlformats-officedocument.spreadsheetml.sheet`
    ApplicationVndOpenxmlformatsOfficedocumentSpreadsheetmlSheet,
    /// `application/vnd.ms-powerpoint`
    ApplicationVndMsPowerpoint,
    /// `application/vnd.openxmlformats-officedocument.presentationml.presentation`
    ApplicationVndOpenxmlformatsOfficedocumentPresentationmlPresentation,
    /// `application/msword`
    ApplicationMsword,
    /// `application/vnd.openxmlformats-officedocument.wordprocessingml.document`
    ApplicationVndOpenxmlformatsOfficedocumentWordprocessingmlDocument,
    /// `application/vnd.mozilla.xul+xml`
    ApplicationVndMozillaXulXml,
}

impl ContentType {
    /// Every MIME type in the table (excludes `Custom`).
    pub const ALL: &'static [ContentType] = &[
        Self::ApplicationJavaArchive,
        Self::ApplicationEdiX12,
        Self::ApplicationEdifact,
        Self::ApplicationJavascript,
        Self::ApplicationOctetStream,
        Self::ApplicationOgg,
        Self::ApplicationPdf,
        Self::ApplicationXhtmlXml,
        Self::ApplicationXShockwaveFlash,
        Self::ApplicationJson,
        Self::ApplicationLdJson,
        Self::ApplicationXml,
        Self::ApplicationZip,
        Self::ApplicationXWwwFormUrlencoded,
        Self::AudioMpeg,
        Self::AudioXMsWma,
        Self::AudioVndRnRealaudio,
        Self::AudioXWav,
        Self::ImageGif,
        Self::ImageJpeg,
        Self::ImagePng,
        Self::ImageTiff,
        Self::ImageVndMicrosoftIcon,
        Self::ImageXIcon,
        Self::ImageVndDjvu,
        Self::ImageSvgXml,
        Self::MultipartMixed,
        Self::MultipartAlternative,
        Self::MultipartRelated,
        Self::MultipartFormData,
        Self::TextCss,
        Self::TextCsv,
        Self::TextHtml,
        Self::TextJavascript,
        Self::TextPlain,
        Self::TextXml,
        Self::VideoMpeg,
        Self::VideoMp4,
        Self::VideoQuicktime,
        Self::VideoXMsWmv,
        Self::VideoXMsvideo,
        Self::VideoXFlv,
        Self::VideoWebm,
        Self::ApplicationVndAndroidPackageArchive,
        Self::ApplicationVndOasisOpendocumentText,
        Self::ApplicationVndOasisOpendocumentSpreadsheet,
        Self::ApplicationVndOasisOpendocumentPresentation,
        Self::ApplicationVndOasisOpendocumentGraphics,
        Self::ApplicationVndMsExcel,
        Self::ApplicationVndOpenxmlformatsOfficedocumentSpreadsheetmlSheet,
        Self::ApplicationVndMsPowerpoint,
        Self::ApplicationVndOpenxmlformatsOfficedocumentPresentationmlPresentation,
        Self::ApplicationMsword,
        Self::ApplicationVndOpenxmlformatsOfficedocumentWordprocessingmlDocument,
        Self::ApplicationVndMozillaXulXml,
    ];

    /// The MIME string, or `None` for `Custom`.
    pub fn mime(self) -> Option<&'static str> {
        match self {
            Self::Custom => None,
            other => Some(other.as_str()),
        }
    }

    /// The MIME string (`"custom"` for `Custom`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Custom => "custom",
            Self::ApplicationJavaArchive => "application/java-archive",
            Self::ApplicationEdiX12 => "application/EDI-X12",
            Self::ApplicationEdifact => "application/EDIFACT",
            Self::ApplicationJavascript => "application/javascript",
            Self::ApplicationOctetStream => "application/octet-stream",
            Self::ApplicationOgg => "application/ogg",
            Self::ApplicationPdf => "application/pdf",
            Self::ApplicationXhtmlXml => "application/xhtml+xml",
            Self::ApplicationXShockwaveFlash => "application/x-shockwave-flash",
            Self::ApplicationJson => "application/json",
            Self::ApplicationLdJson => "application/ld+json",
            Self::ApplicationXml => "application/xml",
            Self::ApplicationZip => "application/zip",
            Self::ApplicationXWwwFormUrlencoded => "application/x-www-form-urlencoded",
            Self::AudioMpeg => "audio/mpeg",
            Self::AudioXMsWma => "audio/x-ms-wma",
            Self::AudioVndRnRealaudio => "audio/vnd.rn-realaudio",
            Self::AudioXWav => "audio/x-wav",
            Self::ImageGif => "image/gif",
            Self::ImageJpeg => "image/jpeg",
            Self::ImagePng => "image/png",
            Self::ImageTiff => "image/tiff",
            Self::ImageVndMicrosoftIcon => "image/vnd.microsoft.icon",
            Self::ImageXIcon => "image/x-icon",
            Self::ImageVndDjvu => "image/vnd.djvu",
            Self::ImageSvgXml => "image/svg+xml",
            Self::MultipartMixed => "multipart/mixed",
            Self::MultipartAlternative => "multipart/alternative",
            Self::MultipartRelated => "multipart/related",
            Self::MultipartFormData => "multipart/form-data",
            Self::TextCss => "text/css",
            Self::TextCsv => "text/csv",
            Self::TextHtml => "text/html",
            Self::TextJavascript => "text/javascript",
            Self::TextPlain => "text/plain",
            Self::TextXml => "text/xml",
            Self::VideoMpeg => "video/mpeg",
            Self::VideoMp4 => "video/mp4",
            Self::VideoQuicktime => "video/quicktime",
            Self::VideoXMsWmv => "video/x-ms-wmv",
            Self::VideoXMsvideo => "video/x-msvideo",
            Self::VideoXFlv => "video/x-flv",
            Self::VideoWebm => "video/webm",
            Self::ApplicationVndAndroidPackageArchive => "application/vnd.android.package-archive",
            Self::ApplicationVndOasisOpendocumentText => "application/vnd.oasis.opendocument.text",
            Self::ApplicationVndOasisOpendocumentSpreadsheet => "application/vnd.oasis.opendocument.spreadsheet",
            Self::ApplicationVndOasisOpendocumentPresentation => "application/vnd.oasis.opendocument.presentation",
            Self::ApplicationVndOasisOpendocumentGraphics => "application/vnd.oasis.opendocument.graphics",
            Self::ApplicationVndMsExcel => "application/vnd.ms-excel",
            Self::ApplicationVndOpenxmlformatsOfficedocumentSpreadsheetmlSheet => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            Self::ApplicationVndMsPowerpoint => "application/vnd.ms-powerpoint",
            Self::ApplicationVndOpenxmlformatsOfficedocumentPresentationmlPresentation => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
            Self::ApplicationMsword => "application/msword",
            Self::ApplicationVndOpenxmlformatsOfficedocumentWordprocessingmlDocument => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            Self::ApplicationVndMozillaXulXml => "application/vnd.mozilla.xul+xml",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = NetworkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("custom") {
            return Ok(Self::Custom);
        }
        Self::ALL
            .iter()
            .copied()
            .find(|ct| ct.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| NetworkError::Config(format!("unknown content type `{s}`")))
    }
}

impl TryFrom<String> for ContentType {
    type Error = NetworkError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ContentType> for String {
    fn from(ct: ContentType) -> Self {
        ct.as_str().to_string()
    }
}

/// The body of a request.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestBody {
    /// No body.
    #[default]
    None,
    /// Raw binary body.
    Bytes(Bytes),
    /// Plain text body.
    Text(String),
    /// Body streamed from a file on disk.
    File(PathBuf),
}

impl RequestBody {
    /// Whether a body is present.
    pub fn is_some(&self) -> bool {
        !matches!(self, Self::None)
    }
}

/// Everything needed to issue one request.
///
/// # Example
///
/// ```
/// use tether_net::http::{ContentType, HttpMethod, RequestBody, RequestOptions};
///
/// let options = RequestOptions::new(HttpMethod::Post, "https://api.example.com/items")
///     .header("Accept", "application/json")
///     .content_type(ContentType::ApplicationJson)
///     .body(RequestBody::Text(r#"{"name":"lamp"}"#.into()))
///     .timeout_secs(10.0);
/// assert_eq!(options.timeout(), Some(std::time::Duration::from_secs(10)));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestOptions {
    /// Request method.
    pub method: HttpMethod,
    /// Target URL.
    pub url: String,
    /// Request headers. Setting a key again replaces its value.
    pub headers: HashMap<String, String>,
    /// Soft timeout in seconds. Zero or negative disables it.
    pub timeout_secs: f64,
    /// Content type applied when a body is present.
    pub content_type: ContentType,
    /// Request body.
    pub body: RequestBody,
}

impl RequestOptions {
    /// Options for `method` on `url`, without headers, body or timeout.
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            ..Default::default()
        }
    }

    /// Add or replace a header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Set the soft timeout in seconds.
    pub fn timeout_secs(mut self, secs: f64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Set the content type.
    pub fn content_type(mut self, content_type: ContentType) -> Self {
        self.content_type = content_type;
        self
    }

    /// Set the body.
    pub fn body(mut self, body: RequestBody) -> Self {
        self.body = body;
        self
    }

    /// The effective timeout, if enabled.
    pub fn timeout(&self) -> Option<Duration> {
        positive_secs(self.timeout_secs)
    }
}

/// `None` for zero, negative, non-finite or unrepresentable seconds.
pub(crate) fn positive_secs(secs: f64) -> Option<Duration> {
    if secs > 0.0 {
        Duration::try_from_secs_f64(secs).ok()
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_method_table_is_complete() {
        let verbs: HashSet<_> = HttpMethod::ALL.iter().map(|m| m.as_str()).collect();
        assert_eq!(verbs.len(), HttpMethod::ALL.len());
        for method in HttpMethod::ALL {
            assert_eq!(method.to_string(), method.to_reqwest().as_str());
        }
    }

    #[test]
    fn test_content_type_table_is_complete() {
        assert_eq!(ContentType::ALL.len(), 55);
        let mimes: HashSet<_> = ContentType::ALL.iter().map(|ct| ct.as_str()).collect();
        assert_eq!(mimes.len(), ContentType::ALL.len());
        assert!(!ContentType::ALL.contains(&ContentType::Custom));

        for ct in ContentType::ALL {
            assert!(ct.as_str().contains('/'), "{ct:?}");
            assert_eq!(ct.as_str().parse::<ContentType>().unwrap(), *ct);
        }
    }

    #[test]
    fn test_content_type_lookup() {
        assert_eq!(ContentType::ApplicationJson.mime(), Some("application/json"));
        assert_eq!(ContentType::Custom.mime(), None);
        assert_eq!(
            "application/edi-x12".parse::<ContentType>().unwrap(),
            ContentType::ApplicationEdiX12
        );
        assert!("application/unknown".parse::<ContentType>().is_err());
    }

    #[test]
    fn test_timeout_disabled_when_not_positive() {
        let options = RequestOptions::new(HttpMethod::Get, "http://localhost");
        assert_eq!(options.timeout(), None);
        assert_eq!(options.clone().timeout_secs(-1.0).timeout(), None);
        assert_eq!(
            options.timeout_secs(0.5).timeout(),
            Some(Duration::from_millis(500))
        );
    }

    #[test]
    fn test_oversized_timeout_is_disabled() {
        let options = RequestOptions::new(HttpMethod::Get, "http://localhost");
        assert_eq!(options.clone().timeout_secs(1e30).timeout(), None);
        assert_eq!(options.clone().timeout_secs(f64::INFINITY).timeout(), None);
        assert_eq!(options.timeout_secs(f64::NAN).timeout(), None);
    }

    #[test]
    fn test_header_last_write_wins() {
        let options = RequestOptions::new(HttpMethod::Get, "http://localhost")
            .header("X-Token", "a")
            .header("X-Token", "b");
        assert_eq!(options.headers.len(), 1);
        assert_eq!(options.headers["X-Token"], "b");
    }

    #[test]
    fn test_options_from_toml() {
        let options: RequestOptions = toml::from_str(
            r#"
            method = "POST"
            url = "https://example.com/upload"
            content_type = "text/plain"
            body = { text = "hello" }

            [headers]
            Accept = "*/*"
            "#,
        )
        .unwrap();

        assert_eq!(options.method, HttpMethod::Post);
        assert_eq!(options.content_type, ContentType::TextPlain);
        assert_eq!(options.body, RequestBody::Text("hello".into()));
        assert_eq!(options.timeout_secs, 0.0);
    }
}
