use crate::error::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Component, Path, PathBuf};

/// What the user asked for, after the model's reply has been validated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Intent {
    /// List files with a given extension
    FindFiles {
        extension: Extension,
        source_directory: Option<PathBuf>,
    },
    /// Move files with a given extension into a folder under the source directory
    OrganizeFiles {
        extension: Extension,
        source_directory: Option<PathBuf>,
        destination_folder: String,
    },
    /// Anything else; never touches the filesystem
    Unknown { reason: String },
}

impl Intent {
    pub fn unknown(reason: impl Into<String>) -> Self {
        Intent::Unknown {
            reason: reason.into(),
        }
    }

    pub fn find_files(extension: &str, source_directory: Option<&str>) -> Result<Self, ParseError> {
        Ok(Intent::FindFiles {
            extension: Extension::parse(extension)?,
            source_directory: parse_source_directory(source_directory)?,
        })
    }

    pub fn organize_files(
        extension: &str,
        source_directory: Option<&str>,
        destination_folder: &str,
    ) -> Result<Self, ParseError> {
        Ok(Intent::OrganizeFiles {
            extension: Extension::parse(extension)?,
            source_directory: parse_source_directory(source_directory)?,
            destination_folder: validate_folder_name(destination_folder)?,
        })
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Intent::Unknown { .. })
    }

    /// One-line description used in logs and the conversation history.
    pub fn describe(&self) -> String {
        let location = |dir: &Option<PathBuf>| {
            dir.as_ref()
                .map(|d| d.display().to_string())
                .unwrap_or_else(|| "the base directory".to_string())
        };
        match self {
            Intent::FindFiles {
                extension,
                source_directory,
            } => format!("find {} files in {}", extension, location(source_directory)),
            Intent::OrganizeFiles {
                extension,
                source_directory,
                destination_folder,
            } => format!(
                "move {} files in {} into '{}'",
                extension,
                location(source_directory),
                destination_folder
            ),
            Intent::Unknown { reason } => format!("not understood ({})", reason),
        }
    }
}

/// A normalised file extension: lower case, no leading dot.
///
/// Matching is a case-insensitive suffix test on the file name, so multi-part
/// extensions such as `tar.gz` work. A file named exactly `.pdf` is not a pdf.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Extension(String);

impl Extension {
    pub fn parse(raw: &str) -> Result<Self, ParseError> {
        let normalized = raw.trim().trim_start_matches('.').to_lowercase();

        if normalized.is_empty() {
            return Err(ParseError::InvalidField {
                field: "file_extension",
                reason: "extension is empty".to_string(),
            });
        }
        if normalized
            .chars()
            .any(|c| matches!(c, '/' | '\\' | '*' | '?') || c.is_whitespace())
        {
            return Err(ParseError::InvalidField {
                field: "file_extension",
                reason: format!("'{}' is not a plain extension", raw),
            });
        }

        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn matches(&self, path: &Path) -> bool {
        let Some(name) = path.file_name() else {
            return false;
        };
        // Lossy so names that are not valid UTF-8 still match on their suffix.
        let name = name.to_string_lossy().to_lowercase();
        let suffix_len = self.0.len() + 1;

        name.len() > suffix_len
            && name.ends_with(&self.0)
            && name.as_bytes()[name.len() - suffix_len] == b'.'
    }
}

impl fmt::Display for Extension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ".{}", self.0)
    }
}

impl TryFrom<String> for Extension {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Extension::parse(&value)
    }
}

impl From<Extension> for String {
    fn from(value: Extension) -> Self {
        value.0
    }
}

fn parse_source_directory(raw: Option<&str>) -> Result<Option<PathBuf>, ParseError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(dir) if dir.contains('\0') => Err(ParseError::InvalidField {
            field: "source_path",
            reason: "path contains a NUL byte".to_string(),
        }),
        Some(dir) => Ok(Some(PathBuf::from(dir))),
    }
}

/// The destination must be a single folder name created inside the source directory.
fn validate_folder_name(raw: &str) -> Result<String, ParseError> {
    let name = raw.trim();
    let invalid = |reason: &str| ParseError::InvalidField {
        field: "target_folder_name",
        reason: reason.to_string(),
    };

    if name.is_empty() {
        return Err(invalid("folder name is empty"));
    }
    if name.contains('\0') {
        return Err(invalid("folder name contains a NUL byte"));
    }

    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) if !name.contains(['/', '\\']) => Ok(name.to_string()),
        _ => Err(ParseError::InvalidField {
            field: "target_folder_name",
            reason: format!("'{}' is not a single folder name", name),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_normalization() {
        assert_eq!(Extension::parse("PDF").unwrap().as_str(), "pdf");
        assert_eq!(Extension::parse(".pdf").unwrap().as_str(), "pdf");
        assert_eq!(Extension::parse("  ..Jpg ").unwrap().as_str(), "jpg");
        assert_eq!(Extension::parse("tar.gz").unwrap().to_string(), ".tar.gz");
    }

    #[test]
    fn test_extension_rejects_garbage() {
        assert!(Extension::parse("").is_err());
        assert!(Extension::parse(".").is_err());
        assert!(Extension::parse("*.pdf").is_err());
        assert!(Extension::parse("docs/pdf").is_err());
        assert!(Extension::parse("p df").is_err());
    }

    #[test]
    fn test_extension_matching() {
        let pdf = Extension::parse("pdf").unwrap();
        assert!(pdf.matches(Path::new("/tmp/a.pdf")));
        assert!(pdf.matches(Path::new("/tmp/REPORT.PDF")));
        assert!(!pdf.matches(Path::new("/tmp/a.pdfx")));
        assert!(!pdf.matches(Path::new("/tmp/apdf")));
        assert!(!pdf.matches(Path::new("/tmp/.pdf")));

        let targz = Extension::parse("tar.gz").unwrap();
        assert!(targz.matches(Path::new("backup.tar.gz")));
        assert!(!targz.matches(Path::new("backup.gz")));
    }

    #[cfg(unix)]
    #[test]
    fn test_extension_matches_non_utf8_name() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let pdf = Extension::parse("pdf").unwrap();
        assert!(pdf.matches(Path::new(OsStr::from_bytes(b"caf\xe9.PDF"))));
        assert!(!pdf.matches(Path::new(OsStr::from_bytes(b"caf\xe9.txt"))));
    }

    #[test]
    fn test_folder_name_validation() {
        assert_eq!(validate_folder_name(" Images ").unwrap(), "Images");
        assert!(validate_folder_name("").is_err());
        assert!(validate_folder_name("..").is_err());
        assert!(validate_folder_name(".").is_err());
        assert!(validate_folder_name("a/b").is_err());
        assert!(validate_folder_name("a\\b").is_err());
        assert!(validate_folder_name("/abs").is_err());
    }

    #[test]
    fn test_intent_serializes_as_tagged_union() {
        let intent = Intent::organize_files("JPG", Some("photos"), "Images").unwrap();
        let json = serde_json::to_value(&intent).unwrap();

        assert_eq!(json["action"], "organize_files");
        assert_eq!(json["extension"], "jpg");
        assert_eq!(json["destination_folder"], "Images");

        let back: Intent = serde_json::from_value(json).unwrap();
        assert_eq!(back, intent);
    }

    #[test]
    fn test_blank_source_directory_means_default() {
        let intent = Intent::find_files("pdf", Some("   ")).unwrap();
        assert_eq!(
            intent,
            Intent::FindFiles {
                extension: Extension::parse("pdf").unwrap(),
                source_directory: None,
            }
        );
    }
}
