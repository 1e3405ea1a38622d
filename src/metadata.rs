//! MIME-type sniffing for `upload_image`. Only needs enough to populate a `Content-Type` header,
//! so generic magic-byte sniffing is the right tool — no media decoding involved.

use std::path::Path;

pub trait MetadataProbe: Send + Sync {
    fn mime_type_of(&self, path: &Path) -> Option<&'static str>;
}

pub struct InferMetadataProbe;

impl MetadataProbe for InferMetadataProbe {
    fn mime_type_of(&self, path: &Path) -> Option<&'static str> {
        infer::get_from_path(path).ok().flatten().map(|t| t.mime_type())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn sniffs_jpeg_magic_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo.jpg");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(&[0xFF, 0xD8, 0xFF, 0xE0, 0, 0, 0, 0]).unwrap();

        let probe = InferMetadataProbe;
        assert_eq!(probe.mime_type_of(&path), Some("image/jpeg"));
    }

    #[test]
    fn unknown_bytes_yield_no_mime_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mystery");
        std::fs::write(&path, b"not a known format").unwrap();

        let probe = InferMetadataProbe;
        assert_eq!(probe.mime_type_of(&path), None);
    }
}
