use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

/// Everything but RFC 3986 unreserved characters.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Percent-encodes one path segment.
pub(crate) fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, SEGMENT).to_string()
}

/// Encodes each segment on its own and joins them with `/`.
pub(crate) fn encode_path<S: AsRef<str>>(segments: &[S]) -> String {
    segments
        .iter()
        .map(|s| encode_segment(s.as_ref()))
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_unreserved() {
        assert_eq!(encode_segment("stage1"), "stage1");
        assert_eq!(encode_segment("AI-voices_v1.0~x"), "AI-voices_v1.0~x");
    }

    #[test]
    fn escapes_spaces_and_reserved() {
        assert_eq!(encode_segment("Warm Voice"), "Warm%20Voice");
        assert_eq!(encode_segment("a#b?c"), "a%23b%3Fc");
        assert_eq!(encode_segment("a/b"), "a%2Fb");
    }

    #[test]
    fn escapes_unicode() {
        assert_eq!(encode_segment("café"), "caf%C3%A9");
    }

    #[test]
    fn path_joins_encoded_segments() {
        assert_eq!(
            encode_path(&["acme corp", "stage2", "voices"]),
            "acme%20corp/stage2/voices"
        );
    }
}
