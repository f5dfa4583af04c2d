use crate::canvas::{Command, Document, Page};
use crate::types::Pt;
use flate2::Compression;
use flate2::write::ZlibEncoder;
use image::GenericImageView;
use std::collections::{BTreeMap, BTreeSet};
use std::io::{self, Write};

const PDF_HEADER: &[u8] = b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n";

/// Serialize a laid-out document to PDF bytes. `images` maps the resource
/// ids referenced by `DrawImage` commands to their raw encoded bytes.
///
/// The writer is deliberately deterministic: objects are emitted in a fixed
/// order, resources come out of ordered maps, and no timestamps or random
/// ids are involved, so identical documents serialize to identical bytes.
pub fn document_to_pdf(
    document: &Document,
    images: &BTreeMap<String, Vec<u8>>,
) -> io::Result<Vec<u8>> {
    let page_count = document.pages.len();
    let page_height = document.page_size.height;

    // Object layout: 1 catalog, 2 pages, then (page, content) pairs, then
    // fonts, then image XObjects (SMask first where present), then info.
    let font_names: Vec<String> = collect_used_font_names(document).into_iter().collect();
    let font_map: BTreeMap<String, (String, usize)> = font_names
        .iter()
        .enumerate()
        .map(|(index, name)| {
            (
                name.clone(),
                (format!("F{}", index + 1), 3 + 2 * page_count + index),
            )
        })
        .collect();

    let mut next_id = 3 + 2 * page_count + font_names.len();
    let mut image_objects: Vec<String> = Vec::new();
    let mut image_resources: Vec<(String, usize)> = Vec::new();
    let mut image_name_map: BTreeMap<String, String> = BTreeMap::new();
    for (index, resource_id) in collect_image_ids(document).into_iter().enumerate() {
        let Some(bytes) = images.get(&resource_id) else {
            continue;
        };
        let Some(image) = decode_image_bytes(bytes) else {
            continue;
        };
        let smask_id = image.alpha.as_ref().map(|alpha| {
            let id = next_id;
            next_id += 1;
            image_objects.push(image_smask_object(alpha));
            id
        });
        let object_id = next_id;
        next_id += 1;
        let name = format!("Im{}", index + 1);
        image_objects.push(image_object(&image, smask_id));
        image_resources.push((name.clone(), object_id));
        image_name_map.insert(resource_id, name);
    }
    let info_id = next_id;

    let mut objects: Vec<String> = Vec::with_capacity(info_id);
    objects.push("<< /Type /Catalog /Pages 2 0 R >>".to_string());
    let kids = (0..page_count)
        .map(|index| format!("{} 0 R", 3 + 2 * index))
        .collect::<Vec<_>>()
        .join(" ");
    objects.push(format!(
        "<< /Type /Pages /Kids [{}] /Count {} >>",
        kids, page_count
    ));

    let resources = resources_dict(&font_map, &image_resources);
    for (index, page) in document.pages.iter().enumerate() {
        let content_id = 4 + 2 * index;
        objects.push(format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {} {}] /Resources {} /Contents {} 0 R >>",
            fmt_pt(document.page_size.width),
            fmt_pt(page_height),
            resources,
            content_id
        ));
        let content = render_page(page, page_height, &font_map, &image_name_map);
        objects.push(stream_object(&content));
    }

    for name in &font_names {
        objects.push(font_object(name));
    }
    objects.extend(image_objects);
    objects.push("<< /Producer (coapress) >>".to_string());

    debug_assert_eq!(objects.len(), info_id);
    Ok(build_pdf(objects, 1, Some(info_id)))
}

fn collect_used_font_names(document: &Document) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    for page in &document.pages {
        let mut current = "Helvetica".to_string();
        for command in &page.commands {
            match command {
                Command::SetFontName(name) => current = name.clone(),
                Command::DrawString { .. } => {
                    names.insert(current.clone());
                }
                _ => {}
            }
        }
    }
    names
}

fn collect_image_ids(document: &Document) -> Vec<String> {
    let mut seen = BTreeSet::new();
    for page in &document.pages {
        for command in &page.commands {
            if let Command::DrawImage { resource_id, .. } = command {
                seen.insert(resource_id.clone());
            }
        }
    }
    seen.into_iter().collect()
}

fn resources_dict(
    font_map: &BTreeMap<String, (String, usize)>,
    image_resources: &[(String, usize)],
) -> String {
    let mut out = String::from("<<");
    if !font_map.is_empty() {
        out.push_str(" /Font <<");
        for (resource, object_id) in font_map.values() {
            out.push_str(&format!(" /{} {} 0 R", resource, object_id));
        }
        out.push_str(" >>");
    }
    if !image_resources.is_empty() {
        out.push_str(" /XObject <<");
        for (name, object_id) in image_resources {
            out.push_str(&format!(" /{} {} 0 R", name, object_id));
        }
        out.push_str(" >>");
    }
    out.push_str(" >>");
    out
}

fn font_object(name: &str) -> String {
    format!(
        "<< /Type /Font /Subtype /Type1 /BaseFont /{} /Encoding /WinAnsiEncoding >>",
        sanitize_font_name(name)
    )
}

fn sanitize_font_name(name: &str) -> String {
    let mut out = String::new();
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() || ch == '-' {
            out.push(ch);
        }
    }
    if out.is_empty() {
        "Helvetica".to_string()
    } else {
        out
    }
}

/// Translate one captured page into a content stream. Our coordinates are
/// top-left origin; PDF user space is bottom-left, so everything flips
/// against the page height here and only here.
fn render_page(
    page: &Page,
    page_height: Pt,
    font_map: &BTreeMap<String, (String, usize)>,
    image_name_map: &BTreeMap<String, String>,
) -> String {
    let mut out = String::new();
    let mut current_font_name = "Helvetica".to_string();
    let mut current_font_size = Pt::from_f32(12.0);

    for command in &page.commands {
        match command {
            Command::SaveState => out.push_str("q\n"),
            Command::RestoreState => out.push_str("Q\n"),
            Command::SetFillColor(color) => {
                out.push_str(&format!(
                    "{} {} {} rg\n",
                    fmt_unit(color.r),
                    fmt_unit(color.g),
                    fmt_unit(color.b)
                ));
            }
            Command::SetStrokeColor(color) => {
                out.push_str(&format!(
                    "{} {} {} RG\n",
                    fmt_unit(color.r),
                    fmt_unit(color.g),
                    fmt_unit(color.b)
                ));
            }
            Command::SetLineWidth(width) => {
                out.push_str(&format!("{} w\n", fmt_pt(*width)));
            }
            Command::SetFontName(name) => current_font_name = name.clone(),
            Command::SetFontSize(size) => current_font_size = *size,
            Command::MoveTo { x, y } => {
                out.push_str(&format!("{} {} m\n", fmt_pt(*x), fmt_pt(page_height - *y)));
            }
            Command::LineTo { x, y } => {
                out.push_str(&format!("{} {} l\n", fmt_pt(*x), fmt_pt(page_height - *y)));
            }
            Command::Stroke => out.push_str("S\n"),
            Command::DrawRect {
                x,
                y,
                width,
                height,
            } => {
                out.push_str(&format!(
                    "{} {} {} {} re\nf\n",
                    fmt_pt(*x),
                    fmt_pt(page_height - *y - *height),
                    fmt_pt(*width),
                    fmt_pt(*height)
                ));
            }
            Command::DrawString { x, y, text } => {
                let resource = font_map
                    .get(&current_font_name)
                    .map(|(resource, _)| resource.as_str())
                    .unwrap_or("F1");
                out.push_str("BT\n");
                out.push_str(&format!("/{} {} Tf\n", resource, fmt_pt(current_font_size)));
                out.push_str(&format!(
                    "{} {} Td\n",
                    fmt_pt(*x),
                    fmt_pt(page_height - *y - current_font_size)
                ));
                out.push_str(&format!("({}) Tj\n", encode_winansi(text)));
                out.push_str("ET\n");
            }
            Command::DrawImage {
                x,
                y,
                width,
                height,
                resource_id,
            } => {
                if let Some(name) = image_name_map.get(resource_id) {
                    out.push_str("q\n");
                    out.push_str(&format!(
                        "{} 0 0 {} {} {} cm\n",
                        fmt_pt(*width),
                        fmt_pt(*height),
                        fmt_pt(*x),
                        fmt_pt(page_height - *y - *height)
                    ));
                    out.push_str(&format!("/{} Do\n", name));
                    out.push_str("Q\n");
                }
            }
        }
    }

    out
}

/// Literal-string encoding for WinAnsi text: escape the delimiters, pass
/// printable ASCII through, emit Latin-1 as octal escapes, and downgrade
/// anything outside Latin-1 to a close ASCII stand-in.
fn encode_winansi(text: &str) -> String {
    let mut out = String::new();
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '(' => out.push_str("\\("),
            ')' => out.push_str("\\)"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\u{2018}' | '\u{2019}' => out.push('\''),
            '\u{201C}' | '\u{201D}' => out.push('"'),
            '\u{2013}' | '\u{2014}' => out.push('-'),
            _ => {
                let code = ch as u32;
                if (0x20..0x7F).contains(&code) {
                    out.push(ch);
                } else if code <= 0xFF {
                    out.push_str(&format!("\\{:03o}", code));
                } else {
                    out.push('?');
                }
            }
        }
    }
    out
}

struct ImageData {
    width: u32,
    height: u32,
    color_space: &'static str,
    bits_per_component: u8,
    filter: &'static str,
    data: Vec<u8>,
    alpha: Option<AlphaData>,
}

struct AlphaData {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

/// JPEG bytes embed verbatim behind DCTDecode; everything else decodes to
/// RGB8 (plus an SMask when the source carries alpha) and recompresses with
/// zlib, which keeps the emitted stream a pure function of the input bytes.
fn decode_image_bytes(data: &[u8]) -> Option<ImageData> {
    let format = image::guess_format(data).ok();
    let decoded = image::load_from_memory(data).ok()?;
    let (width, height) = decoded.dimensions();

    if matches!(format, Some(image::ImageFormat::Jpeg)) {
        let color_space = match decoded.color() {
            image::ColorType::L8 | image::ColorType::La8 => "/DeviceGray",
            _ => "/DeviceRGB",
        };
        return Some(ImageData {
            width,
            height,
            color_space,
            bits_per_component: 8,
            filter: "/DCTDecode",
            data: data.to_vec(),
            alpha: None,
        });
    }

    let rgba = decoded.to_rgba8();
    let mut rgb = Vec::with_capacity((width as usize) * (height as usize) * 3);
    let mut alpha = Vec::with_capacity((width as usize) * (height as usize));
    let mut has_alpha = false;
    for pixel in rgba.pixels() {
        let [r, g, b, a] = pixel.0;
        if a != 255 {
            has_alpha = true;
        }
        rgb.extend_from_slice(&[r, g, b]);
        alpha.push(a);
    }

    Some(ImageData {
        width,
        height,
        color_space: "/DeviceRGB",
        bits_per_component: 8,
        filter: "/FlateDecode",
        data: flate_compress(&rgb),
        alpha: has_alpha.then(|| AlphaData {
            width,
            height,
            data: flate_compress(&alpha),
        }),
    })
}

fn flate_compress(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    let _ = encoder.write_all(data);
    encoder.finish().unwrap_or_default()
}

fn image_object(image: &ImageData, smask_id: Option<usize>) -> String {
    let stream_data = encode_stream_data(&image.data);
    let filters = match image.filter {
        "/DCTDecode" => "[/ASCIIHexDecode /DCTDecode]",
        _ => "[/ASCIIHexDecode /FlateDecode]",
    };
    let smask = smask_id
        .map(|id| format!(" /SMask {} 0 R", id))
        .unwrap_or_default();
    format!(
        "<< /Type /XObject /Subtype /Image /Width {} /Height {} /ColorSpace {} /BitsPerComponent {} /Length {} /Filter {}{} >>\nstream\n{}\nendstream",
        image.width,
        image.height,
        image.color_space,
        image.bits_per_component,
        stream_data.len(),
        filters,
        smask,
        stream_data
    )
}

fn image_smask_object(alpha: &AlphaData) -> String {
    let stream_data = encode_stream_data(&alpha.data);
    format!(
        "<< /Type /XObject /Subtype /Image /Width {} /Height {} /ColorSpace /DeviceGray /BitsPerComponent 8 /Length {} /Filter [/ASCIIHexDecode /FlateDecode] >>\nstream\n{}\nendstream",
        alpha.width,
        alpha.height,
        stream_data.len(),
        stream_data
    )
}

fn encode_stream_data(data: &[u8]) -> String {
    let mut hex = String::with_capacity(data.len() * 2 + 1);
    for byte in data {
        hex.push_str(&format!("{:02x}", byte));
    }
    hex.push('>');
    hex
}

fn stream_object(content: &str) -> String {
    format!(
        "<< /Length {} >>\nstream\n{}\nendstream",
        content.len(),
        content
    )
}

fn build_pdf(objects: Vec<String>, catalog_id: usize, info_id: Option<usize>) -> Vec<u8> {
    let mut out: Vec<u8> = Vec::new();
    out.extend_from_slice(PDF_HEADER);

    let mut offsets = Vec::with_capacity(objects.len());
    for (index, object) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n", index + 1).as_bytes());
        out.extend_from_slice(object.as_bytes());
        out.extend_from_slice(b"\nendobj\n");
    }

    let xref_start = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n", objects.len() + 1).as_bytes());
    out.extend_from_slice(b"0000000000 65535 f \n");
    for offset in offsets {
        out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
    }

    let mut trailer = format!(
        "trailer\n<< /Size {} /Root {} 0 R",
        objects.len() + 1,
        catalog_id
    );
    if let Some(info_id) = info_id {
        trailer.push_str(&format!(" /Info {} 0 R", info_id));
    }
    trailer.push_str(&format!(" >>\nstartxref\n{}\n%%EOF", xref_start));
    out.extend_from_slice(trailer.as_bytes());

    out
}

fn format_milli(milli: i64) -> String {
    if milli == 0 {
        return "0".to_string();
    }
    let sign = if milli < 0 { "-" } else { "" };
    let abs = milli.abs();
    let int_part = abs / 1000;
    let frac_part = abs % 1000;
    if frac_part == 0 {
        format!("{}{}", sign, int_part)
    } else {
        let mut s = format!("{}{}.{:03}", sign, int_part, frac_part);
        while s.ends_with('0') {
            s.pop();
        }
        if s.ends_with('.') {
            s.pop();
        }
        s
    }
}

fn fmt_pt(value: Pt) -> String {
    format_milli(value.to_milli_i64())
}

/// Unit-interval color component with milli precision.
fn fmt_unit(value: f32) -> String {
    let clamped = if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    };
    format_milli((clamped as f64 * 1000.0).round() as i64)
}
