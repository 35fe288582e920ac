use lazy_static::lazy_static;
use regex::Regex;

use super::{ProviderError, TranscriptSegment};

lazy_static! {
    static ref TEXT_RE: Regex =
        Regex::new(r#"(?s)<text([^>/]*)>(.*?)</text>|<text[^>]*/>"#).unwrap();
    static ref START_RE: Regex = Regex::new(r#"\bstart="([0-9.]+)""#).unwrap();
    static ref DUR_RE: Regex = Regex::new(r#"\bdur="([0-9.]+)""#).unwrap();
    static ref TAG_RE: Regex = Regex::new(r"<[^>]*>").unwrap();
    static ref ENTITY_RE: Regex = Regex::new(r"&(#[0-9]+|#[xX][0-9a-fA-F]+|[a-zA-Z]+);").unwrap();
}

/// Parse a YouTube timedtext caption document into segments
pub fn parse_timedtext(xml: &str) -> Result<Vec<TranscriptSegment>, ProviderError> {
    if !xml.contains("<transcript") {
        return Err(ProviderError::Parse(
            "caption track is not a timedtext document".to_string(),
        ));
    }

    let mut segments = Vec::new();

    for caps in TEXT_RE.captures_iter(xml) {
        // Self-closing <text/> elements carry no caption text
        let (attrs, body) = match (caps.get(1), caps.get(2)) {
            (Some(attrs), Some(body)) => (attrs.as_str(), body.as_str()),
            _ => continue,
        };

        // Bodies are entity-escaped twice: once for XML, once for the inline markup
        let text = unescape_entities(&TAG_RE.replace_all(&unescape_entities(body), ""))
            .trim()
            .to_string();
        if text.is_empty() {
            continue;
        }

        segments.push(TranscriptSegment {
            text,
            start: parse_attr(&START_RE, attrs),
            duration: parse_attr(&DUR_RE, attrs),
        });
    }

    tracing::debug!("Parsed {} caption segments", segments.len());
    Ok(segments)
}

fn parse_attr(re: &Regex, attrs: &str) -> f64 {
    re.captures(attrs)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0.0)
}

/// Decode numeric HTML entities and the named entities that show up in captions.
///
/// Named entities outside `named_entity` are left untouched.
pub fn unescape_entities(text: &str) -> String {
    ENTITY_RE
        .replace_all(text, |caps: &regex::Captures| {
            let entity = &caps[1];
            let decoded = if let Some(hex) = entity
                .strip_prefix("#x")
                .or_else(|| entity.strip_prefix("#X"))
            {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = entity.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                named_entity(entity)
            };

            match decoded {
                Some(c) => c.to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

fn named_entity(name: &str) -> Option<char> {
    let c = match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{a0}',
        "iexcl" => '¡',
        "cent" => '¢',
        "pound" => '£',
        "euro" => '€',
        "yen" => '¥',
        "sect" => '§',
        "copy" => '©',
        "reg" => '®',
        "trade" => '™',
        "laquo" => '«',
        "raquo" => '»',
        "deg" => '°',
        "plusmn" => '±',
        "times" => '×',
        "divide" => '÷',
        "micro" => 'µ',
        "para" => '¶',
        "middot" => '·',
        "frac12" => '½',
        "frac14" => '¼',
        "frac34" => '¾',
        "iquest" => '¿',
        "ndash" => '–',
        "mdash" => '—',
        "lsquo" => '‘',
        "rsquo" => '’',
        "sbquo" => '‚',
        "ldquo" => '“',
        "rdquo" => '”',
        "bdquo" => '„',
        "hellip" => '…',
        "bull" => '•',
        "prime" => '′',
        "Prime" => '″',
        "dagger" => '†',
        "Dagger" => '‡',
        "permil" => '‰',
        "lsaquo" => '‹',
        "rsaquo" => '›',
        "larr" => '←',
        "rarr" => '→',
        "uarr" => '↑',
        "darr" => '↓',
        "hearts" => '♥',
        "szlig" => 'ß',
        "Agrave" => 'À',
        "Aacute" => 'Á',
        "Acirc" => 'Â',
        "Atilde" => 'Ã',
        "Auml" => 'Ä',
        "Aring" => 'Å',
        "AElig" => 'Æ',
        "Ccedil" => 'Ç',
        "Egrave" => 'È',
        "Eacute" => 'É',
        "Ecirc" => 'Ê',
        "Euml" => 'Ë',
        "Igrave" => 'Ì',
        "Iacute" => 'Í',
        "Icirc" => 'Î',
        "Iuml" => 'Ï',
        "Ntilde" => 'Ñ',
        "Ograve" => 'Ò',
        "Oacute" => 'Ó',
        "Ocirc" => 'Ô',
        "Otilde" => 'Õ',
        "Ouml" => 'Ö',
        "Oslash" => 'Ø',
        "Ugrave" => 'Ù',
        "Uacute" => 'Ú',
        "Ucirc" => 'Û',
        "Uuml" => 'Ü',
        "Yacute" => 'Ý',
        "agrave" => 'à',
        "aacute" => 'á',
        "acirc" => 'â',
        "atilde" => 'ã',
        "auml" => 'ä',
        "aring" => 'å',
        "aelig" => 'æ',
        "ccedil" => 'ç',
        "egrave" => 'è',
        "eacute" => 'é',
        "ecirc" => 'ê',
        "euml" => 'ë',
        "igrave" => 'ì',
        "iacute" => 'í',
        "icirc" => 'î',
        "iuml" => 'ï',
        "ntilde" => 'ñ',
        "ograve" => 'ò',
        "oacute" => 'ó',
        "ocirc" => 'ô',
        "otilde" => 'õ',
        "ouml" => 'ö',
        "oslash" => 'ø',
        "ugrave" => 'ù',
        "uacute" => 'ú',
        "ucirc" => 'û',
        "uuml" => 'ü',
        "yacute" => 'ý',
        "yuml" => 'ÿ',
        "OElig" => 'Œ',
        "oelig" => 'œ',
        "Scaron" => 'Š',
        "scaron" => 'š',
        _ => return None,
    };

    Some(c)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="utf-8" ?><transcript><text start="0.5" dur="1.54">Hello</text><text start="2.04" dur="2.1">world &amp;amp; friends</text><text start="4.2" dur="1"></text><text start="5.5" dur="3.25">it&amp;#39;s &lt;i&gt;great&lt;/i&gt;</text></transcript>"#;

    #[test]
    fn test_parse_segments_in_order() {
        let segments = parse_timedtext(SAMPLE).unwrap();
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0], TranscriptSegment::new("Hello", 0.5, 1.54));
        assert_eq!(segments[1].text, "world & friends");
        assert_eq!(segments[2].text, "it's great");
        assert_eq!(segments[2].start, 5.5);
        assert_eq!(segments[2].duration, 3.25);
    }

    #[test]
    fn test_multiline_body() {
        let xml = "<transcript><text start=\"1\" dur=\"2\">line one\nline two</text></transcript>";
        let segments = parse_timedtext(xml).unwrap();
        assert_eq!(segments[0].text, "line one\nline two");
    }

    #[test]
    fn test_self_closing_text_is_skipped() {
        let xml = r#"<transcript><text start="1" dur="1"/><text start="2" dur="1">Hi</text></transcript>"#;
        let segments = parse_timedtext(xml).unwrap();
        assert_eq!(segments, vec![TranscriptSegment::new("Hi", 2.0, 1.0)]);
    }

    #[test]
    fn test_empty_transcript() {
        let segments = parse_timedtext("<transcript></transcript>").unwrap();
        assert!(segments.is_empty());
    }

    #[test]
    fn test_not_a_transcript() {
        assert!(matches!(
            parse_timedtext("<html><body>oops</body></html>"),
            Err(ProviderError::Parse(_))
        ));
    }

    #[test]
    fn test_unescape_entities() {
        assert_eq!(unescape_entities("a &amp; b"), "a & b");
        assert_eq!(unescape_entities("&#39;quoted&#x27;"), "'quoted'");
        assert_eq!(unescape_entities("&quot;hi&quot; &lt;3"), "\"hi\" <3");
        assert_eq!(unescape_entities("&unknown; stays"), "&unknown; stays");
    }

    #[test]
    fn test_unescape_typographic_entities() {
        assert_eq!(unescape_entities("caf&eacute;&hellip;"), "café…");
        assert_eq!(unescape_entities("&ldquo;Na&iuml;ve&rdquo; &mdash; &Uuml;ber"), "“Naïve” — Über");
    }

    #[test]
    fn test_double_escaped_named_entity_in_caption() {
        let xml = "<transcript><text start=\"0\" dur=\"1\">Beyonc&amp;eacute; &amp;hellip;</text></transcript>";
        let segments = parse_timedtext(xml).unwrap();
        assert_eq!(segments[0].text, "Beyoncé …");
    }
}
