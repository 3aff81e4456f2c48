//! PNG encoding for rasterized posters.
//!
//! Writes 8-bit RGBA (color type 6) with a pHYs chunk so print software
//! picks up the intended density.

use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::Write;

const SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];
const METERS_PER_INCH: f64 = 0.0254;

/// Encode straight (non-premultiplied) RGBA pixels.
///
/// `dpi` adds a pHYs chunk with the density in pixels per meter.
pub fn encode_rgba(
    pixels: &[u8],
    width: usize,
    height: usize,
    dpi: Option<u32>,
) -> Result<Vec<u8>, String> {
    let expected = width * height * 4;
    if pixels.len() != expected {
        return Err(format!(
            "pixel buffer has {} bytes, expected {} for {}x{}",
            pixels.len(),
            expected,
            width,
            height
        ));
    }

    let mut png = Vec::with_capacity(expected / 4 + 1024);
    png.extend_from_slice(&SIGNATURE);

    let mut ihdr = Vec::with_capacity(13);
    ihdr.extend_from_slice(&(width as u32).to_be_bytes());
    ihdr.extend_from_slice(&(height as u32).to_be_bytes());
    ihdr.push(8); // bit depth
    ihdr.push(6); // RGBA
    ihdr.push(0); // deflate
    ihdr.push(0); // adaptive filtering
    ihdr.push(0); // no interlace
    write_chunk(&mut png, b"IHDR", &ihdr);

    if let Some(dpi) = dpi {
        write_chunk(&mut png, b"pHYs", &phys_data(dpi));
    }

    let idat = deflate_rows(pixels, width, height)
        .map_err(|e| format!("IDAT compression failed: {}", e))?;
    write_chunk(&mut png, b"IDAT", &idat);

    write_chunk(&mut png, b"IEND", &[]);
    Ok(png)
}

/// Encode a tiny-skia pixmap, undoing premultiplied alpha.
pub fn encode_pixmap(pixmap: &tiny_skia::Pixmap, dpi: Option<u32>) -> Result<Vec<u8>, String> {
    let mut rgba = Vec::with_capacity(pixmap.data().len());
    for pixel in pixmap.pixels() {
        let c = pixel.demultiply();
        rgba.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
    }
    encode_rgba(
        &rgba,
        pixmap.width() as usize,
        pixmap.height() as usize,
        dpi,
    )
}

/// pHYs payload: x and y pixels per meter, unit byte 1 (meter).
fn phys_data(dpi: u32) -> [u8; 9] {
    let ppm = (dpi as f64 / METERS_PER_INCH).round() as u32;
    let mut data = [0u8; 9];
    data[0..4].copy_from_slice(&ppm.to_be_bytes());
    data[4..8].copy_from_slice(&ppm.to_be_bytes());
    data[8] = 1;
    data
}

fn write_chunk(png: &mut Vec<u8>, chunk_type: &[u8; 4], data: &[u8]) {
    png.extend_from_slice(&(data.len() as u32).to_be_bytes());
    png.extend_from_slice(chunk_type);
    png.extend_from_slice(data);

    let mut hasher = crc32fast::Hasher::new();
    hasher.update(chunk_type);
    hasher.update(data);
    png.extend_from_slice(&hasher.finalize().to_be_bytes());
}

/// Filter byte 0 per scanline, then zlib.
fn deflate_rows(pixels: &[u8], width: usize, height: usize) -> std::io::Result<Vec<u8>> {
    let stride = width * 4;
    let mut encoder = ZlibEncoder::new(
        Vec::with_capacity(pixels.len() / 4),
        Compression::default(),
    );
    let mut row = Vec::with_capacity(stride + 1);
    for y in 0..height {
        row.clear();
        row.push(0);
        row.extend_from_slice(&pixels[y * stride..(y + 1) * stride]);
        encoder.write_all(&row)?;
    }
    encoder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::ZlibDecoder;
    use std::io::Read;

    fn chunks(png: &[u8]) -> Vec<(String, Vec<u8>)> {
        let mut out = Vec::new();
        let mut pos = 8;
        while pos < png.len() {
            let len = u32::from_be_bytes(png[pos..pos + 4].try_into().unwrap()) as usize;
            let kind = String::from_utf8(png[pos + 4..pos + 8].to_vec()).unwrap();
            let data = png[pos + 8..pos + 8 + len].to_vec();
            let crc = u32::from_be_bytes(png[pos + 8 + len..pos + 12 + len].try_into().unwrap());
            assert_eq!(crc, crc32fast::hash(&png[pos + 4..pos + 8 + len]), "bad crc in {}", kind);
            out.push((kind, data));
            pos += 12 + len;
        }
        out
    }

    #[test]
    fn test_chunk_layout() {
        let pixels = vec![255u8; 2 * 2 * 4];
        let png = encode_rgba(&pixels, 2, 2, Some(300)).unwrap();
        assert_eq!(&png[..8], &SIGNATURE);

        let kinds: Vec<String> = chunks(&png).into_iter().map(|(k, _)| k).collect();
        assert_eq!(kinds, vec!["IHDR", "pHYs", "IDAT", "IEND"]);
    }

    #[test]
    fn test_phys_for_300_dpi() {
        let data = phys_data(300);
        // 300 / 0.0254 = 11811.02
        assert_eq!(u32::from_be_bytes(data[0..4].try_into().unwrap()), 11811);
        assert_eq!(data[8], 1);
    }

    #[test]
    fn test_no_phys_without_dpi() {
        let png = encode_rgba(&[0, 0, 0, 255], 1, 1, None).unwrap();
        assert!(chunks(&png).iter().all(|(k, _)| k != "pHYs"));
    }

    #[test]
    fn test_idat_inflates_to_filtered_rows() {
        let pixels: Vec<u8> = (0..3 * 2 * 4).map(|i| i as u8).collect();
        let png = encode_rgba(&pixels, 3, 2, None).unwrap();
        let idat = chunks(&png)
            .into_iter()
            .find(|(k, _)| k == "IDAT")
            .unwrap()
            .1;

        let mut raw = Vec::new();
        ZlibDecoder::new(&idat[..]).read_to_end(&mut raw).unwrap();
        assert_eq!(raw.len(), 2 * (1 + 12));
        assert_eq!(raw[0], 0);
        assert_eq!(&raw[1..13], &pixels[0..12]);
        assert_eq!(raw[13], 0);
    }

    #[test]
    fn test_size_mismatch_rejected() {
        assert!(encode_rgba(&[0, 0, 0], 1, 1, None).is_err());
    }
}
