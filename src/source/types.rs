use crate::humanize::ByteSize;
use serde::{Deserialize, Serialize};

/// One leaf entry discovered while walking a root.
///
/// `size` and `date` are strings as reported by the listing. `size` is either a
/// plain byte count or a display size such as `"12.5 MB"`; nothing in the
/// dispatch path depends on either field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRef {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub size: String,
    #[serde(default)]
    pub date: String,
}

impl FileRef {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            size: String::new(),
            date: String::new(),
        }
    }

    pub fn with_size(mut self, size: impl Into<String>) -> Self {
        self.size = size.into();
        self
    }

    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = date.into();
        self
    }

    /// Parsed display size, if the listing reported one we understand
    pub fn size_bytes(&self) -> Option<ByteSize> {
        self.size.parse().ok()
    }
}

/// Join a walk prefix and an entry name with `/`.
///
/// An empty prefix yields the bare name and redundant separators at the seam
/// are collapsed.
pub fn join_path(prefix: &str, name: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    let name = name.trim_start_matches('/');
    match (prefix.is_empty(), name.is_empty()) {
        (true, _) => name.to_string(),
        (false, true) => prefix.to_string(),
        (false, false) => format!("{}/{}", prefix, name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_path() {
        assert_eq!(join_path("", "a.txt"), "a.txt");
        assert_eq!(join_path("R", "a.txt"), "R/a.txt");
        assert_eq!(join_path("R/sub/", "a.txt"), "R/sub/a.txt");
        assert_eq!(join_path("R", ""), "R");
    }

    #[test]
    fn test_size_bytes() {
        let file = FileRef::new("1", "a.bin").with_size("2 MB");
        assert_eq!(file.size_bytes(), Some(ByteSize(2 * 1024 * 1024)));

        let file = FileRef::new("2", "b.bin").with_size("unknown");
        assert_eq!(file.size_bytes(), None);

        assert_eq!(FileRef::new("3", "c.bin").size_bytes(), None);
    }
}
