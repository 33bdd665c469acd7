//! CW-016: BLAKE3 hashing of generated output.

use std::io::Read;
use std::path::Path;

const STREAM_BUF_SIZE: usize = 65536;

/// Hash a string. Returns `"blake3:{hex}"`.
pub fn hash_string(s: &str) -> String {
    format!("blake3:{}", blake3::hash(s.as_bytes()).to_hex())
}

/// Hash a file's contents. Returns `"blake3:{hex}"`.
pub fn hash_file(path: &Path) -> Result<String, String> {
    let mut file =
        std::fs::File::open(path).map_err(|e| format!("cannot open {}: {}", path.display(), e))?;
    let mut hasher = blake3::Hasher::new();
    let mut buf = [0u8; STREAM_BUF_SIZE];
    loop {
        let n = file
            .read(&mut buf)
            .map_err(|e| format!("read error {}: {}", path.display(), e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("blake3:{}", hasher.finalize().to_hex()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cw016_hash_string_format() {
        let h = hash_string("# shop.v1\n");
        assert!(h.starts_with("blake3:"));
        assert_eq!(h.len(), "blake3:".len() + 64);
        assert_eq!(h, hash_string("# shop.v1\n"));
        assert_ne!(h, hash_string("# shop.v2\n"));
    }

    #[test]
    fn test_cw016_file_matches_string() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.md");
        let body = "x".repeat(STREAM_BUF_SIZE * 2 + 17);
        std::fs::write(&path, &body).unwrap();
        assert_eq!(hash_file(&path).unwrap(), hash_string(&body));
    }

    #[test]
    fn test_cw016_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = hash_file(&dir.path().join("absent")).unwrap_err();
        assert!(err.contains("cannot open"));
    }
}
