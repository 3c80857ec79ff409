//! The bootstrap header injected into downloaded scripts.
//!
//! The header lets a script run locally against the mock API. It is
//! prepended on download and stripped by exact match on upload, so both
//! directions must use [`BOOTSTRAP_HEADER`] verbatim.

/// Three-line header, matched byte for byte by [`strip_header`].
pub const BOOTSTRAP_HEADER: &str = "# First 3 lines generated by di-pyoperator - DO NOT CHANGE (Deleted again when uploaded.)
from utils.mock_di_api import mock_api
api = mock_api(__file__)
";

/// Prepend the header unless the script already starts with it.
pub fn prepend_header(script: &str) -> String {
    if script.starts_with(BOOTSTRAP_HEADER) {
        script.to_owned()
    } else {
        format!("{BOOTSTRAP_HEADER}{script}")
    }
}

/// Remove the first exact occurrence of the header; no-op when absent.
pub fn strip_header(script: &str) -> String {
    script.replacen(BOOTSTRAP_HEADER, "", 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = "def on_input(msg):\n    api.send('out', msg)\n";

    #[test]
    fn prepend_is_idempotent() {
        let once = prepend_header(BODY);
        assert!(once.starts_with(BOOTSTRAP_HEADER));
        assert_eq!(prepend_header(&once), once);
        assert_eq!(once.matches(BOOTSTRAP_HEADER).count(), 1);
    }

    #[test]
    fn strip_without_header_is_noop() {
        assert_eq!(strip_header(BODY), BODY);
    }

    #[test]
    fn strip_reverses_prepend() {
        assert_eq!(strip_header(&prepend_header(BODY)), BODY);
    }

    #[test]
    fn header_is_three_lines() {
        assert_eq!(BOOTSTRAP_HEADER.lines().count(), 3);
    }
}
