//! Balloon Descript
//!
//! The balloon's own key space: a flat `key,value` file (`descript.txt`) in
//! the working directory announced by `Initialize`. Holds per-skin geometry
//! (`origin.x`, `validrect.left`, `wordwrappoint.x`, ...), text colours and
//! input-widget layout.
//!
//! Lines without a comma are ignored. Later duplicates win. Empty values are
//! treated as absent so callers always get their default.

use std::collections::HashMap;
use std::path::Path;

/// File name looked up inside the working directory
pub const DESCRIPT_FILE: &str = "descript.txt";

/// Parsed `descript.txt`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Descript {
    values: HashMap<String, String>,
}

impl Descript {
    /// Parse descript text
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let values = text
            .lines()
            .map(|line| line.strip_suffix('\r').unwrap_or(line))
            .filter_map(|line| line.split_once(','))
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        Self { values }
    }

    /// Read `descript.txt` from `dir`
    ///
    /// Invalid UTF-8 is replaced rather than rejected.
    ///
    /// # Errors
    ///
    /// Returns the IO error if the file cannot be read.
    pub fn load(dir: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(dir.join(DESCRIPT_FILE))?;
        Ok(Self::parse(&String::from_utf8_lossy(&bytes)))
    }

    /// Insert or replace a value
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Non-empty value for `key`
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Integer value for `key`, or `default` if absent or unparsable
    #[must_use]
    pub fn get_int(&self, key: &str, default: i32) -> i32 {
        self.get(key)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no entries were loaded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_key_value_lines() {
        let d = Descript::parse("charset,UTF-8\r\norigin.x,-20\nno comma here\nname,a,b\n");
        assert_eq!(d.len(), 3);
        assert_eq!(d.get("charset"), Some("UTF-8"));
        assert_eq!(d.get_int("origin.x", 0), -20);
        assert_eq!(d.get("name"), Some("a,b"));
    }

    #[test]
    fn test_empty_and_unparsable_values_fall_back() {
        let d = Descript::parse("font.color.r,\nfont.color.g,green\n");
        assert_eq!(d.get("font.color.r"), None);
        assert_eq!(d.get_int("font.color.r", 7), 7);
        assert_eq!(d.get_int("font.color.g", 9), 9);
        assert_eq!(d.get_int("missing", 200), 200);
    }

    #[test]
    fn test_load_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = std::fs::File::create(dir.path().join(DESCRIPT_FILE)).unwrap();
        file.write_all(b"wordwrappoint.x,-10\n").unwrap();

        let d = Descript::load(dir.path()).unwrap();
        assert_eq!(d.get_int("wordwrappoint.x", 0), -10);
    }

    #[test]
    fn test_load_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Descript::load(dir.path()).is_err());
    }
}
