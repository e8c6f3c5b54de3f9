use anyhow::{Result, anyhow};
use std::path::Path;
use uuid::Uuid;

/// Extensions accepted for process documents. Everything else is rejected
/// before any bytes reach disk.
pub const ALLOWED_EXTENSIONS: [&str; 9] = [
    "pdf", "doc", "docx", "jpg", "jpeg", "png", "txt", "zip", "rar",
];

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub code: &'static str,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Lowercased extension of a filename, if it has one
pub fn file_extension(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
}

/// Validates the extension against the allow-list, returning it lowercased
pub fn validate_extension(filename: &str) -> Result<String> {
    let ext = file_extension(filename).ok_or_else(|| {
        anyhow!(ValidationError {
            code: "MISSING_EXTENSION",
            message: "Tipo de arquivo não permitido".to_string(),
        })
    })?;

    if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
        return Err(anyhow!(ValidationError {
            code: "INVALID_EXTENSION",
            message: format!(
                "Tipo de arquivo não permitido. Permitidos: {}",
                ALLOWED_EXTENSIONS.join(", ")
            ),
        }));
    }

    Ok(ext)
}

/// Validates file size against maximum limit
pub fn validate_file_size(size: usize, max_size: usize) -> Result<()> {
    if size > max_size {
        return Err(anyhow!(ValidationError {
            code: "FILE_TOO_LARGE",
            message: format!(
                "Arquivo excede o tamanho máximo de {} MB",
                max_size / 1024 / 1024
            ),
        }));
    }
    Ok(())
}

/// Sanitizes filename to prevent path traversal and injection attacks
/// Returns the sanitized filename or an error if the name is invalid
pub fn sanitize_filename(filename: &str) -> Result<String> {
    // Get only the filename component (remove any path)
    let name = Path::new(filename)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("");

    if name.is_empty() {
        return Err(anyhow!(ValidationError {
            code: "INVALID_FILENAME",
            message: "Nome de arquivo vazio".to_string(),
        }));
    }

    if filename.contains("..") || filename.contains('/') || filename.contains('\\') {
        tracing::warn!("Path traversal attempt detected: {}", filename);
    }

    // Remove dangerous characters, keep only safe ones
    // We allow most Unicode characters but block path separators and reserved characters
    let sanitized: String = name
        .chars()
        .map(|c| {
            if c.is_control()
                || c == '/'
                || c == '\\'
                || c == ':'
                || c == '*'
                || c == '?'
                || c == '"'
                || c == '<'
                || c == '>'
                || c == '|'
                || c == ';'
            {
                '_'
            } else {
                c
            }
        })
        .collect();

    // Limit length safely for UTF-8
    let sanitized = if sanitized.len() > 255 {
        let mut end = 255;
        while !sanitized.is_char_boundary(end) {
            end -= 1;
        }
        sanitized[..end].to_string()
    } else {
        sanitized
    };

    Ok(sanitized)
}

/// Name a document is stored under on disk. The original name only survives
/// in the database row; the disk never sees user-controlled names.
pub fn stored_filename(extension: &str) -> String {
    format!("{}.{}", Uuid::new_v4(), extension)
}

/// Content type served on download, derived from the stored extension
pub fn content_type_for(filename: &str) -> &'static str {
    match file_extension(filename).as_deref() {
        Some("pdf") => "application/pdf",
        Some("doc") => "application/msword",
        Some("docx") => {
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        }
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("txt") => "text/plain; charset=utf-8",
        Some("zip") => "application/zip",
        Some("rar") => "application/x-rar-compressed",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_extension() {
        assert_eq!(validate_extension("peticao.pdf").unwrap(), "pdf");
        assert_eq!(validate_extension("RECURSO.PDF").unwrap(), "pdf");
        assert_eq!(validate_extension("foto da multa.JPEG").unwrap(), "jpeg");
        assert!(validate_extension("malware.exe").is_err());
        assert!(validate_extension("script.php").is_err());
        assert!(validate_extension("sem_extensao").is_err());
        assert!(validate_extension(".htaccess").is_err());
    }

    #[test]
    fn test_validate_file_size() {
        let max = 50 * 1024 * 1024;
        assert!(validate_file_size(1024, max).is_ok());
        assert!(validate_file_size(max, max).is_ok());
        assert!(validate_file_size(max + 1, max).is_err());
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("peticao.pdf").unwrap(), "peticao.pdf");
        assert_eq!(
            sanitize_filename("minha multa.doc").unwrap(),
            "minha multa.doc"
        );
        assert_eq!(
            sanitize_filename("laudo<1>.pdf").unwrap(),
            "laudo_1_.pdf"
        );
        assert_eq!(sanitize_filename("ação.txt").unwrap(), "ação.txt");

        // Path traversal
        assert_eq!(
            sanitize_filename("../../../etc/passwd").unwrap(),
            "passwd"
        );
        assert_eq!(
            sanitize_filename("..\\..\\windows\\system32").unwrap(),
            "system32"
        );

        assert!(sanitize_filename("").is_err());
        assert!(sanitize_filename("..").is_err());
    }

    #[test]
    fn test_sanitize_filename_truncates_on_char_boundary() {
        // 300 multibyte chars, must truncate below 255 bytes without panicking
        let long: String = "çáé".repeat(100);
        let out = sanitize_filename(&long).unwrap();
        assert!(out.len() <= 255);
        assert!(long.starts_with(&out));
    }

    #[test]
    fn test_stored_filename() {
        let name = stored_filename("pdf");
        assert!(name.ends_with(".pdf"));
        let stem = name.trim_end_matches(".pdf");
        assert!(Uuid::parse_str(stem).is_ok());
    }

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for("a.pdf"), "application/pdf");
        assert_eq!(content_type_for("b.JPG"), "image/jpeg");
        assert_eq!(content_type_for("c.txt"), "text/plain; charset=utf-8");
        assert_eq!(content_type_for("d.bin"), "application/octet-stream");
        assert_eq!(content_type_for("noext"), "application/octet-stream");
    }
}
