use chardetng::EncodingDetector;
use encoding_rs::Encoding;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedHtml {
    pub html: String,
    pub encoding_label: String,
    pub had_errors: bool,
}

/// Decode raw bytes into UTF-8 using: BOM -> Content-Type charset -> chardetng fallback.
///
/// Malformed sequences are replaced rather than rejected; `had_errors` reports it.
pub fn decode_html(bytes: &[u8], content_type: Option<&str>) -> DecodedHtml {
    if let Some((encoding, _)) = Encoding::for_bom(bytes) {
        return decode_with(bytes, encoding);
    }

    if let Some(label) = content_type.and_then(extract_charset) {
        if let Some(enc) = Encoding::for_label(label.as_bytes()) {
            return decode_with(bytes, enc);
        }
    }

    // chardetng also honours <meta charset> hints it finds in the bytes.
    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    let enc = detector.guess(None, true);
    decode_with(bytes, enc)
}

fn extract_charset(content_type: &str) -> Option<String> {
    content_type
        .split(';')
        .filter_map(|part| {
            let (key, value) = part.split_once('=')?;
            if key.trim().eq_ignore_ascii_case("charset") {
                Some(value.trim_matches([' ', '"', '\''].as_ref()))
            } else {
                None
            }
        })
        .next()
        .map(|s| s.to_string())
}

fn decode_with(bytes: &[u8], enc: &'static Encoding) -> DecodedHtml {
    let (text, _, had_errors) = enc.decode(bytes);
    DecodedHtml {
        html: text.into_owned(),
        encoding_label: enc.name().to_string(),
        had_errors,
    }
}

#[cfg(test)]
mod tests {
    use super::decode_html;

    #[test]
    fn charset_from_content_type_wins_over_detection() {
        let bytes = [0xcf, 0xf0, 0xe8, 0xe2, 0xe5, 0xf2]; // "Привет" in windows-1251
        let decoded = decode_html(&bytes, Some("text/html; Charset=\"windows-1251\""));
        assert_eq!(decoded.html, "Привет");
        assert_eq!(decoded.encoding_label, "windows-1251");
        assert!(!decoded.had_errors);
    }

    #[test]
    fn utf8_bom_is_respected() {
        let mut bytes = vec![0xef, 0xbb, 0xbf];
        bytes.extend_from_slice("тред".as_bytes());
        let decoded = decode_html(&bytes, Some("text/html; charset=latin1"));
        assert_eq!(decoded.html, "тред");
        assert_eq!(decoded.encoding_label, "UTF-8");
    }
}
