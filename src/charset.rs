//! Decoding fetched bytes to UTF-8 before they reach a parser.
//!
//! Order of precedence: byte-order mark, then the in-document declaration
//! for XML (`<?xml ... encoding="..."?>`) or the HTTP charset for HTML,
//! then the other of the two, then UTF-8 with lossy replacement.

use encoding_rs::{Encoding, UTF_8};
use once_cell::sync::Lazy;
use regex::bytes::Regex;
use tracing::debug;

/// How to look for an in-document charset declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Markup {
    Xml,
    Html,
}

static XML_DECL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<\?xml[^>]*?encoding\s*=\s*["']([A-Za-z0-9._:-]+)["']"#).unwrap()
});

static META_CHARSET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<meta[^>]*?charset\s*=\s*["']?([A-Za-z0-9._:-]+)"#).unwrap()
});

// Declarations must appear near the start of the document.
const SNIFF_LEN: usize = 1024;

/// Decode `bytes` to a UTF-8 string.
pub fn decode(bytes: &[u8], http_charset: Option<&str>, markup: Markup) -> String {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        let (text, _) = encoding.decode_without_bom_handling(&bytes[bom_len..]);
        return text.into_owned();
    }

    let declared = declared_label(bytes, markup);
    let candidates = match markup {
        Markup::Xml => [declared.as_deref(), http_charset],
        Markup::Html => [http_charset, declared.as_deref()],
    };
    let encoding = candidates
        .into_iter()
        .flatten()
        .find_map(|label| Encoding::for_label(label.trim().as_bytes()))
        .unwrap_or(UTF_8);

    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        debug!(encoding = encoding.name(), "Replaced malformed byte sequences");
    }
    text.into_owned()
}

fn declared_label(bytes: &[u8], markup: Markup) -> Option<String> {
    let head = &bytes[..bytes.len().min(SNIFF_LEN)];
    let re = match markup {
        Markup::Xml => &XML_DECL,
        Markup::Html => &META_CHARSET,
    };
    re.captures(head)
        .and_then(|caps| caps.get(1))
        .map(|m| String::from_utf8_lossy(m.as_bytes()).into_owned())
}
