//! Gzip container helpers.

use std::io::{self, Write};

use flate2::{Compression, GzBuilder};

/// Compress `body` at maximum level, recording `filename` in the gzip header.
///
/// The header mtime is left at zero so identical inputs produce identical bytes.
pub fn compress(filename: &str, body: &[u8]) -> io::Result<Vec<u8>> {
    let mut encoder = GzBuilder::new()
        .filename(filename)
        .write(Vec::with_capacity(body.len() / 4 + 64), Compression::best());
    encoder.write_all(body)?;
    encoder.finish()
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use flate2::read::GzDecoder;

    use super::*;

    #[test]
    fn header_carries_filename_and_body_roundtrips() {
        let data = compress("2-sitemap.xml", b"<urlset/>").expect("compress");

        let mut decoder = GzDecoder::new(data.as_slice());
        let mut out = String::new();
        decoder.read_to_string(&mut out).expect("decompress");

        assert_eq!(out, "<urlset/>");
        let header = decoder.header().expect("gzip header");
        assert_eq!(header.filename(), Some(&b"2-sitemap.xml"[..]));
    }

    #[test]
    fn output_is_deterministic() {
        let first = compress("sitemap.xml", b"same body").expect("compress");
        let second = compress("sitemap.xml", b"same body").expect("compress");
        assert_eq!(first, second);
    }
}
