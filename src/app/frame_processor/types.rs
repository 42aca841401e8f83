// SPDX-License-Identifier: MPL-2.0

//! Core types for decode results
//!
//! A decoded payload becomes a [`ScanResult`]: the raw text, a coarse
//! URL/plain-text classification that drives the open action, and a finer
//! [`PayloadKind`] used by the options panel.

use crate::backends::camera::{BarcodeFormat, DecodedPayload};
use chrono::{DateTime, Local};

/// A rectangular region within a frame, in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl FrameRegion {
    /// Square of side `size` centred in the frame, shrunk to fit
    pub fn centered_square(size: u32, frame_width: u32, frame_height: u32) -> Self {
        let side = size.min(frame_width).min(frame_height);
        Self {
            x: (frame_width - side) / 2,
            y: (frame_height - side) / 2,
            width: side,
            height: side,
        }
    }

    /// Whole frame
    pub fn full(frame_width: u32, frame_height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width: frame_width,
            height: frame_height,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Whether a result can be opened as a link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Url,
    PlainText,
}

/// `Url` iff the whole text parses as an absolute URL
pub fn classify(text: &str) -> Classification {
    match url::Url::parse(text) {
        Ok(_) => Classification::Url,
        Err(_) => Classification::PlainText,
    }
}

/// A decoded result held by the page
#[derive(Debug, Clone, PartialEq)]
pub struct ScanResult {
    pub text: String,
    pub classification: Classification,
    pub format: BarcodeFormat,
    pub scanned_at: DateTime<Local>,
}

impl ScanResult {
    pub fn new(payload: DecodedPayload) -> Self {
        Self {
            classification: classify(&payload.text),
            text: payload.text,
            format: payload.format,
            scanned_at: Local::now(),
        }
    }

    pub fn is_url(&self) -> bool {
        self.classification == Classification::Url
    }

    /// The text when it is a URL
    pub fn url(&self) -> Option<&str> {
        self.is_url().then_some(self.text.as_str())
    }

    /// Content details recognised from the text
    pub fn kind(&self) -> PayloadKind {
        PayloadKind::parse(&self.text)
    }
}

/// WiFi security type parsed from a QR code
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WifiSecurity {
    None,
    Wep,
    Wpa,
    Wpa2Enterprise,
    Wpa3,
}

impl WifiSecurity {
    pub fn parse(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "WEP" => Self::Wep,
            "WPA" | "WPA2" => Self::Wpa,
            "WPA2-EAP" | "WPA3-EAP" => Self::Wpa2Enterprise,
            "WPA3" | "SAE" => Self::Wpa3,
            "NOPASS" | "" => Self::None,
            _ => Self::Wpa,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::None => "Open",
            Self::Wep => "WEP",
            Self::Wpa => "WPA/WPA2",
            Self::Wpa2Enterprise => "Enterprise",
            Self::Wpa3 => "WPA3",
        }
    }
}

/// What a payload contains, as far as well-known QR conventions tell
#[derive(Debug, Clone, PartialEq)]
pub enum PayloadKind {
    /// Absolute URL
    Web(String),
    Wifi {
        ssid: String,
        password: Option<String>,
        security: WifiSecurity,
        hidden: bool,
    },
    Phone(String),
    Email {
        address: String,
        subject: Option<String>,
        body: Option<String>,
    },
    Sms {
        number: String,
        message: Option<String>,
    },
    Location {
        latitude: f64,
        longitude: f64,
        label: Option<String>,
    },
    /// vCard
    Contact(String),
    /// VCALENDAR / VEVENT
    Event(String),
    Text(String),
}

impl PayloadKind {
    /// Recognise `content`, falling back to `Text`
    pub fn parse(content: &str) -> Self {
        let trimmed = content.trim();

        if trimmed.starts_with("WIFI:") {
            return Self::parse_wifi(trimmed);
        }
        if let Some(number) = strip_prefix_ignore_case(trimmed, "tel:") {
            return Self::Phone(number.to_string());
        }
        if let Some(rest) = strip_prefix_ignore_case(trimmed, "mailto:") {
            return Self::parse_mailto(rest);
        }
        if let Some(rest) = strip_prefix_ignore_case(trimmed, "smsto:")
            .or_else(|| strip_prefix_ignore_case(trimmed, "sms:"))
        {
            return Self::parse_sms(rest);
        }
        if let Some(rest) = strip_prefix_ignore_case(trimmed, "geo:")
            && let Some(location) = Self::parse_geo(rest)
        {
            return location;
        }
        if trimmed.starts_with("BEGIN:VCARD") {
            return Self::Contact(trimmed.to_string());
        }
        if trimmed.starts_with("BEGIN:VCALENDAR") || trimmed.starts_with("BEGIN:VEVENT") {
            return Self::Event(trimmed.to_string());
        }
        if classify(trimmed) == Classification::Url {
            return Self::Web(trimmed.to_string());
        }

        Self::Text(trimmed.to_string())
    }

    /// WIFI:T:<security>;S:<ssid>;P:<password>;H:<hidden>;;
    fn parse_wifi(content: &str) -> Self {
        let mut ssid = String::new();
        let mut password = None;
        let mut security = WifiSecurity::None;
        let mut hidden = false;

        let content = content.strip_prefix("WIFI:").unwrap_or(content);
        for part in split_unescaped(content, ';') {
            if let Some((key, value)) = part.split_once(':') {
                let value = unescape_wifi(value);
                match key {
                    "S" => ssid = value,
                    "P" => password = Some(value).filter(|p| !p.is_empty()),
                    "T" => security = WifiSecurity::parse(&value),
                    "H" => hidden = value.eq_ignore_ascii_case("true"),
                    _ => {}
                }
            }
        }

        Self::Wifi {
            ssid,
            password,
            security,
            hidden,
        }
    }

    fn parse_mailto(content: &str) -> Self {
        let (address, params) = content.split_once('?').unwrap_or((content, ""));
        let mut subject = None;
        let mut body = None;

        for (key, value) in query_pairs(params) {
            match key.to_lowercase().as_str() {
                "subject" => subject = Some(value),
                "body" => body = Some(value),
                _ => {}
            }
        }

        Self::Email {
            address: urlencoding_decode(address),
            subject,
            body,
        }
    }

    /// `sms:<number>?body=<text>` or `smsto:<number>:<text>`
    fn parse_sms(content: &str) -> Self {
        if let Some((number, params)) = content.split_once('?') {
            let message = query_pairs(params)
                .find(|(key, _)| key.eq_ignore_ascii_case("body"))
                .map(|(_, value)| value);
            return Self::Sms {
                number: number.to_string(),
                message,
            };
        }

        match content.split_once(':') {
            Some((number, message)) => Self::Sms {
                number: number.to_string(),
                message: Some(message.to_string()).filter(|m| !m.is_empty()),
            },
            None => Self::Sms {
                number: content.to_string(),
                message: None,
            },
        }
    }

    /// `geo:<lat>,<lon>[,<alt>][?q=<label>]`
    fn parse_geo(content: &str) -> Option<Self> {
        let (coords, params) = content.split_once('?').unwrap_or((content, ""));
        let mut parts = coords.split(',');
        let latitude = parts.next()?.trim().parse::<f64>().ok()?;
        let longitude = parts.next()?.trim().parse::<f64>().ok()?;
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return None;
        }

        let label = query_pairs(params)
            .find(|(key, _)| key == "q" || key == "label")
            .map(|(_, value)| value);

        Some(Self::Location {
            latitude,
            longitude,
            label,
        })
    }

    /// Short name of the content type
    pub fn label(&self) -> &'static str {
        match self {
            Self::Web(_) => "Web link",
            Self::Wifi { .. } => "Wi-Fi network",
            Self::Phone(_) => "Phone number",
            Self::Email { .. } => "E-mail",
            Self::Sms { .. } => "SMS",
            Self::Location { .. } => "Location",
            Self::Contact(_) => "Contact card",
            Self::Event(_) => "Calendar event",
            Self::Text(_) => "Text",
        }
    }

    /// Labelled fields for the options panel
    pub fn details(&self) -> Vec<(&'static str, String)> {
        match self {
            Self::Web(url) => {
                let host = url::Url::parse(url)
                    .ok()
                    .and_then(|u| u.host_str().map(str::to_string));
                let mut details = vec![("URL", url.clone())];
                if let Some(host) = host {
                    details.push(("Host", host));
                }
                details
            }
            Self::Wifi {
                ssid,
                password,
                security,
                hidden,
            } => {
                let mut details = vec![
                    ("Network", ssid.clone()),
                    ("Security", security.display_name().to_string()),
                ];
                if let Some(password) = password {
                    details.push(("Password", password.clone()));
                }
                if *hidden {
                    details.push(("Hidden", "yes".to_string()));
                }
                details
            }
            Self::Phone(number) => vec![("Number", number.clone())],
            Self::Email {
                address,
                subject,
                body,
            } => {
                let mut details = vec![("To", address.clone())];
                if let Some(subject) = subject {
                    details.push(("Subject", subject.clone()));
                }
                if let Some(body) = body {
                    details.push(("Body", body.clone()));
                }
                details
            }
            Self::Sms { number, message } => {
                let mut details = vec![("Number", number.clone())];
                if let Some(message) = message {
                    details.push(("Message", message.clone()));
                }
                details
            }
            Self::Location {
                latitude,
                longitude,
                label,
            } => {
                let mut details = vec![("Coordinates", format!("{latitude:.5}, {longitude:.5}"))];
                if let Some(label) = label {
                    details.push(("Place", label.clone()));
                }
                details
            }
            Self::Contact(card) => card_field(card, "FN")
                .map(|name| vec![("Name", name)])
                .unwrap_or_default(),
            Self::Event(event) => card_field(event, "SUMMARY")
                .map(|summary| vec![("Summary", summary)])
                .unwrap_or_default(),
            Self::Text(text) => vec![("Characters", text.chars().count().to_string())],
        }
    }
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix).then(|| &s[prefix.len()..])
}

/// First value of a `KEY:value` (or `KEY;params:value`) line in a vCard/iCal body
fn card_field(card: &str, key: &str) -> Option<String> {
    card.lines().find_map(|line| {
        let (name, value) = line.trim().split_once(':')?;
        let name = name.split(';').next()?;
        (name.eq_ignore_ascii_case(key) && !value.trim().is_empty())
            .then(|| value.trim().to_string())
    })
}

/// Split on `sep` unless it is backslash-escaped
fn split_unescaped(s: &str, sep: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut escaped = false;

    for c in s.chars() {
        if escaped {
            current.push('\\');
            current.push(c);
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == sep {
            parts.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
    }
    if escaped {
        current.push('\\');
    }
    parts.push(current);
    parts
}

fn unescape_wifi(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                result.push(next);
            }
        } else {
            result.push(c);
        }
    }
    result
}

fn query_pairs(params: &str) -> impl Iterator<Item = (String, String)> + '_ {
    params
        .split('&')
        .filter_map(|param| param.split_once('='))
        .map(|(key, value)| (key.to_string(), urlencoding_decode(value)))
}

/// Percent-decoding for query parameters, `+` as space
pub(crate) fn urlencoding_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                let byte = bytes
                    .get(i + 1..i + 3)
                    .filter(|hex| hex.iter().all(u8::is_ascii_hexdigit))
                    .and_then(|hex| std::str::from_utf8(hex).ok())
                    .and_then(|hex| u8::from_str_radix(hex, 16).ok());
                match byte {
                    Some(byte) => {
                        decoded.push(byte);
                        i += 3;
                    }
                    None => {
                        decoded.push(b'%');
                        i += 1;
                    }
                }
            }
            b'+' => {
                decoded.push(b' ');
                i += 1;
            }
            b => {
                decoded.push(b);
                i += 1;
            }
        }
    }

    String::from_utf8_lossy(&decoded).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(classify("https://example.com"), Classification::Url);
        assert_eq!(classify("mailto:someone@example.com"), Classification::Url);
        assert_eq!(classify("hello world"), Classification::PlainText);
        assert_eq!(classify("example.com"), Classification::PlainText);
        assert_eq!(classify(""), Classification::PlainText);
    }

    #[test]
    fn test_scan_result_url() {
        let result = ScanResult::new(DecodedPayload::qr("https://example.com/a?b=c"));
        assert!(result.is_url());
        assert_eq!(result.url(), Some("https://example.com/a?b=c"));

        let text = ScanResult::new(DecodedPayload::qr("just words"));
        assert_eq!(text.url(), None);
    }

    #[test]
    fn test_parse_wifi() {
        match PayloadKind::parse("WIFI:S:MyNetwork;T:WPA;P:my\\;pass;;") {
            PayloadKind::Wifi {
                ssid,
                password,
                security,
                hidden,
            } => {
                assert_eq!(ssid, "MyNetwork");
                assert_eq!(password, Some("my;pass".to_string()));
                assert_eq!(security, WifiSecurity::Wpa);
                assert!(!hidden);
            }
            other => panic!("Expected Wifi, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_open_hidden_wifi() {
        match PayloadKind::parse("WIFI:T:nopass;S:Cafe;H:true;;") {
            PayloadKind::Wifi {
                password,
                security,
                hidden,
                ..
            } => {
                assert_eq!(password, None);
                assert_eq!(security, WifiSecurity::None);
                assert!(hidden);
            }
            other => panic!("Expected Wifi, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_mailto() {
        assert_eq!(
            PayloadKind::parse("mailto:test@example.com?subject=Hello%20there&body=World"),
            PayloadKind::Email {
                address: "test@example.com".to_string(),
                subject: Some("Hello there".to_string()),
                body: Some("World".to_string()),
            }
        );
    }

    #[test]
    fn test_parse_sms_variants() {
        assert_eq!(
            PayloadKind::parse("sms:+123?body=Hi+you"),
            PayloadKind::Sms {
                number: "+123".to_string(),
                message: Some("Hi you".to_string()),
            }
        );
        assert_eq!(
            PayloadKind::parse("SMSTO:+123:On my way"),
            PayloadKind::Sms {
                number: "+123".to_string(),
                message: Some("On my way".to_string()),
            }
        );
    }

    #[test]
    fn test_parse_geo() {
        match PayloadKind::parse("geo:37.7749,-122.4194?q=San+Francisco") {
            PayloadKind::Location {
                latitude,
                longitude,
                label,
            } => {
                assert!((latitude - 37.7749).abs() < 1e-4);
                assert!((longitude + 122.4194).abs() < 1e-4);
                assert_eq!(label, Some("San Francisco".to_string()));
            }
            other => panic!("Expected Location, got {:?}", other),
        }
        // Out of range coordinates are not a location
        assert!(matches!(
            PayloadKind::parse("geo:123,456"),
            PayloadKind::Web(_)
        ));
    }

    #[test]
    fn test_contact_details() {
        let kind = PayloadKind::parse("BEGIN:VCARD\nVERSION:3.0\nFN:Ada Lovelace\nEND:VCARD");
        assert_eq!(kind.label(), "Contact card");
        assert_eq!(kind.details(), vec![("Name", "Ada Lovelace".to_string())]);
    }

    #[test]
    fn test_plain_text_and_web() {
        assert!(matches!(PayloadKind::parse("Hello World!"), PayloadKind::Text(_)));
        assert!(matches!(
            PayloadKind::parse("https://example.com"),
            PayloadKind::Web(_)
        ));
    }

    #[test]
    fn test_urlencoding_decode() {
        assert_eq!(urlencoding_decode("a%20b+c"), "a b c");
        assert_eq!(urlencoding_decode("caf%C3%A9"), "café");
        assert_eq!(urlencoding_decode("100%"), "100%");
        assert_eq!(urlencoding_decode("%zz"), "%zz");
    }

    #[test]
    fn test_centered_square() {
        let region = FrameRegion::centered_square(250, 640, 480);
        assert_eq!(
            region,
            FrameRegion {
                x: 195,
                y: 115,
                width: 250,
                height: 250
            }
        );
        let clamped = FrameRegion::centered_square(250, 100, 200);
        assert_eq!(clamped.width, 100);
        assert_eq!(clamped.y, 50);
    }
}
