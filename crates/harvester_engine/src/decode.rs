use chardetng::EncodingDetector;
use encoding_rs::Encoding;
use engine_logging::engine_debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedBody {
    pub text: String,
    pub encoding_label: String,
    /// Malformed byte sequences were replaced with U+FFFD.
    pub had_errors: bool,
}

/// Decode a response body into UTF-8 using: BOM -> Content-Type charset ->
/// chardetng fallback. Never fails; undecodable bytes become U+FFFD.
pub fn decode_body(bytes: &[u8], content_type: Option<&str>) -> DecodedBody {
    if let Some((encoding, _)) = Encoding::for_bom(bytes) {
        return decode_with(bytes, encoding);
    }

    if let Some(label) = content_type.and_then(extract_charset) {
        if let Some(enc) = Encoding::for_label(label.as_bytes()) {
            return decode_with(bytes, enc);
        }
        engine_debug!("unknown charset {label:?} in content type, detecting instead");
    }

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
            key.trim()
                .eq_ignore_ascii_case("charset")
                .then(|| value.trim().trim_matches(['"', '\''].as_ref()))
        })
        .find(|value| !value.is_empty())
        .map(str::to_string)
}

fn decode_with(bytes: &[u8], enc: &'static Encoding) -> DecodedBody {
    // `decode` sniffs a BOM itself; `used` is the encoding actually applied.
    let (text, used, had_errors) = enc.decode(bytes);
    if had_errors {
        engine_debug!("body contained malformed {} sequences", used.name());
    }
    DecodedBody {
        text: text.into_owned(),
        encoding_label: used.name().to_string(),
        had_errors,
    }
}
