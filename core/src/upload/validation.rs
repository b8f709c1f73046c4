use crate::prelude::ValidationError;

/// Largest accepted upload: 100 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 100 * 1024 * 1024;

/// Folder every upload lands in inside the bucket.
const UPLOAD_PREFIX: &str = "public";

/// Facts about a file known before its bytes are sent anywhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadCandidate {
    pub name: String,
    pub content_type: String,
    pub size: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadPolicy {
    pub max_bytes: u64,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl UploadPolicy {
    pub fn new(max_bytes: u64) -> Self {
        Self { max_bytes }
    }

    /// Checks media type, size and name, in that order.
    pub fn validate(&self, candidate: &UploadCandidate) -> Result<(), ValidationError> {
        if !candidate.content_type.starts_with("video/") {
            return Err(ValidationError::NotVideo {
                content_type: candidate.content_type.clone(),
            });
        }
        if candidate.size > self.max_bytes {
            return Err(ValidationError::TooLarge {
                size: candidate.size,
                limit_mb: self.max_bytes / (1024 * 1024),
            });
        }
        validate_file_name(&candidate.name)
    }
}

fn validate_file_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::InvalidName("empty".into()));
    }
    let has_separator = name.contains('/') || name.contains('\\');
    if has_separator || name == "." || name == ".." {
        return Err(ValidationError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Bucket key for an upload made at `millis` since the Unix epoch.
pub fn object_name(file_name: &str, millis: i64) -> String {
    format!("{}/{}-{}", UPLOAD_PREFIX, millis, file_name)
}

/// Media type for a file name, judged by its extension.
pub fn guess_content_type(file_name: &str) -> &'static str {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "mp4" | "m4v" => "video/mp4",
        "avi" => "video/x-msvideo",
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        "mkv" => "video/x-matroska",
        "mpeg" | "mpg" => "video/mpeg",
        _ => "application/octet-stream",
    }
}

/// Trims `url` and rejects it when nothing is left.
pub fn validate_url(url: &str) -> Result<&str, ValidationError> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        Err(ValidationError::MissingUrl)
    } else {
        Ok(trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(content_type: &str, size: u64) -> UploadCandidate {
        UploadCandidate {
            name: "crowd.mp4".into(),
            content_type: content_type.into(),
            size,
        }
    }

    #[test]
    fn accepts_video_within_limit() {
        let policy = UploadPolicy::default();
        assert!(policy.validate(&candidate("video/mp4", 1024)).is_ok());
        assert!(policy
            .validate(&candidate("video/quicktime", DEFAULT_MAX_UPLOAD_BYTES))
            .is_ok());
    }

    #[test]
    fn rejects_non_video_types() {
        let err = UploadPolicy::default()
            .validate(&candidate("image/png", 10))
            .unwrap_err();
        assert!(matches!(err, ValidationError::NotVideo { .. }));
    }

    #[test]
    fn rejects_files_over_limit() {
        let err = UploadPolicy::default()
            .validate(&candidate("video/mp4", DEFAULT_MAX_UPLOAD_BYTES + 1))
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::TooLarge {
                size: DEFAULT_MAX_UPLOAD_BYTES + 1,
                limit_mb: 100
            }
        );
    }

    #[test]
    fn rejects_path_like_names() {
        let mut file = candidate("video/mp4", 10);
        file.name = "../etc/passwd".into();
        assert!(matches!(
            UploadPolicy::default().validate(&file),
            Err(ValidationError::InvalidName(_))
        ));
    }

    #[test]
    fn dots_inside_a_name_are_allowed() {
        let policy = UploadPolicy::default();
        for name in ["clip..mp4", "match...final.mov", "..hidden.mp4"] {
            let mut file = candidate("video/mp4", 10);
            file.name = name.into();
            assert!(policy.validate(&file).is_ok(), "{} was rejected", name);
        }
        for name in ["..", ".", "a\\b.mp4"] {
            let mut file = candidate("video/mp4", 10);
            file.name = name.into();
            assert!(policy.validate(&file).is_err(), "{} was accepted", name);
        }
    }

    #[test]
    fn object_name_prefixes_timestamp() {
        assert_eq!(object_name("a.mp4", 1700), "public/1700-a.mp4");
    }

    #[test]
    fn content_type_follows_extension() {
        assert_eq!(guess_content_type("Gate.MOV"), "video/quicktime");
        assert_eq!(guess_content_type("clip.mp4"), "video/mp4");
        assert_eq!(guess_content_type("notes.txt"), "application/octet-stream");
        assert_eq!(guess_content_type("README"), "application/octet-stream");
    }

    #[test]
    fn blank_url_is_rejected() {
        assert_eq!(validate_url("   "), Err(ValidationError::MissingUrl));
        assert_eq!(validate_url(" https://youtu.be/x "), Ok("https://youtu.be/x"));
    }
}
