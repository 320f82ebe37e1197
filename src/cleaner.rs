use sanitize_filename::{Options, sanitize_with_options};

/// Characters that are not allowed in file or folder names on any of the
/// supported platforms.
pub const ILLEGAL_CHARS: [char; 9] = ['/', '\\', '|', '<', '>', ':', '"', '?', '*'];

/// Filesystem name sanitizer.
pub trait NameCleaner {
    fn clean_name(&self, raw: &str, is_file: bool) -> String;
    fn illegal_chars(&self) -> &[char];

    fn is_illegal(&self, c: char) -> bool {
        c.is_control() || self.illegal_chars().contains(&c)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Cleaner;

impl NameCleaner for Cleaner {
    /// Drops illegal characters with Windows rules applied everywhere, then
    /// trims whitespace. File names are cut to the 255-byte limit; folder
    /// names are kept whole.
    fn clean_name(&self, raw: &str, is_file: bool) -> String {
        let options = Options {
            windows: true,
            truncate: is_file,
            replacement: "",
        };
        sanitize_with_options(raw, options).trim().to_string()
    }

    fn illegal_chars(&self) -> &[char] {
        &ILLEGAL_CHARS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_name_strips_illegal_characters() {
        assert_eq!(Cleaner.clean_name("my:folder*?", false), "myfolder");
        assert_eq!(Cleaner.clean_name("a\tb\u{0}c", true), "abc");
    }

    #[test]
    fn test_clean_name_trims_whitespace() {
        assert_eq!(Cleaner.clean_name("  Download ", false), "Download");
    }

    #[test]
    fn test_clean_name_of_only_illegal_characters_is_empty() {
        assert_eq!(Cleaner.clean_name("<>|", false), "");
    }

    #[test]
    fn test_split_characters_are_checked_against_the_illegal_set() {
        assert!(Cleaner.is_illegal('/'));
        assert!(Cleaner.is_illegal('\n'));
        assert!(!Cleaner.is_illegal('-'));
    }
}
