use folio_types::ImagePayload;

/// Guess an image MIME type from its leading bytes.
pub fn sniff(data: &[u8]) -> Option<&'static str> {
    const SIGNATURES: &[(&[u8], &str)] = &[
        (b"\x89PNG\r\n\x1a\n", "image/png"),
        (b"\xff\xd8\xff", "image/jpeg"),
        (b"GIF87a", "image/gif"),
        (b"GIF89a", "image/gif"),
        (b"BM", "image/bmp"),
        (b"II*\0", "image/tiff"),
        (b"MM\0*", "image/tiff"),
    ];

    if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
        return Some("image/webp");
    }

    SIGNATURES
        .iter()
        .find(|(magic, _)| data.starts_with(magic))
        .map(|(_, mime)| *mime)
}

/// MIME type of an upload: sniffed from the bytes, else guessed from the
/// client's filename.
pub fn detect(image: &ImagePayload) -> Option<&'static str> {
    sniff(&image.data).or_else(|| {
        image
            .filename
            .as_deref()
            .and_then(|name| mime_guess::from_path(name).first_raw())
    })
}

/// File extension for `mime`. Prefers the one spelled like the subtype
/// (`image/jpeg` gives `jpeg`, not `jpe`).
pub fn extension(mime: &str) -> Option<&'static str> {
    let extensions = mime_guess::get_mime_extensions_str(mime)?;
    let subtype = mime.split_once('/').map(|(_, sub)| sub);
    extensions
        .iter()
        .find(|ext| Some(**ext) == subtype)
        .or_else(|| extensions.first())
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_signatures() {
        assert_eq!(sniff(b"\xff\xd8\xff\xe0\0\x10JFIF"), Some("image/jpeg"));
        assert_eq!(sniff(b"GIF89a\x01\0"), Some("image/gif"));
        assert_eq!(sniff(b"RIFF\x24\0\0\0WEBPVP8 "), Some("image/webp"));
        assert_eq!(sniff(b"MM\0*\0\0\0\x08"), Some("image/tiff"));
    }

    #[test]
    fn unknown_or_short_input() {
        assert_eq!(sniff(b""), None);
        assert_eq!(sniff(b"RIFF\0\0\0\0WAVE"), None);
        assert_eq!(sniff(b"%PDF-1.7"), None);
    }

    #[test]
    fn extensions() {
        assert_eq!(extension("image/jpeg"), Some("jpeg"));
        assert_eq!(extension("image/png"), Some("png"));
        assert_eq!(extension("application/pdf"), Some("pdf"));
        assert_eq!(extension("application/x-folio-unknown"), None);
    }

    #[test]
    fn filename_is_the_fallback() {
        let unknown = ImagePayload::new(&b"plain bytes"[..]);
        assert_eq!(detect(&unknown), None);
        assert_eq!(detect(&unknown.clone().with_filename("scan.gif")), Some("image/gif"));

        // content wins over a misleading name
        let png = ImagePayload::new(&b"\x89PNG\r\n\x1a\n"[..]).with_filename("photo.jpg");
        assert_eq!(detect(&png), Some("image/png"));
    }
}
