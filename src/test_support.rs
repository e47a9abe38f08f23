//! Builders for tiny, valid JPEG files carrying an EXIF block, and
//! helpers for picking exported XML apart.
//!
//! Also pulled into the integration tests via `#[path]`, so it must not
//! depend on anything else in the crate.
#![allow(dead_code)]

use quick_xml::Reader;
use quick_xml::events::Event;

const TYPE_ASCII: u16 = 2;
const TYPE_LONG: u16 = 4;
const TYPE_RATIONAL: u16 = 5;

const TAG_EXIF_IFD: u16 = 0x8769;
const TAG_GPS_IFD: u16 = 0x8825;
const TAG_DATE_TIME_ORIGINAL: u16 = 0x9003;
const TAG_GPS_LATITUDE_REF: u16 = 0x0001;
const TAG_GPS_LATITUDE: u16 = 0x0002;
const TAG_GPS_LONGITUDE_REF: u16 = 0x0003;
const TAG_GPS_LONGITUDE: u16 = 0x0004;

/// nom-exif reads ahead past the last IFD and rejects a block that ends
/// right after it.
const TIFF_TAIL_PADDING: usize = 128;

struct Entry {
    tag: u16,
    kind: u16,
    count: u32,
    data: Vec<u8>,
}

impl Entry {
    fn ascii(tag: u16, s: &str) -> Self {
        let mut data = s.as_bytes().to_vec();
        data.push(0);
        Self { tag, kind: TYPE_ASCII, count: data.len() as u32, data }
    }

    fn long(tag: u16, v: u32) -> Self {
        Self { tag, kind: TYPE_LONG, count: 1, data: v.to_le_bytes().to_vec() }
    }

    fn rationals(tag: u16, values: &[(u32, u32)]) -> Self {
        let mut data = Vec::with_capacity(values.len() * 8);
        for (num, den) in values {
            data.extend_from_slice(&num.to_le_bytes());
            data.extend_from_slice(&den.to_le_bytes());
        }
        Self { tag, kind: TYPE_RATIONAL, count: values.len() as u32, data }
    }
}

/// Serialize one IFD placed at `at` (offset from the TIFF header), with
/// out-of-line values stored right after the directory.
fn ifd(entries: &[Entry], at: u32) -> Vec<u8> {
    let mut out = Vec::new();
    let mut extra = Vec::new();
    let mut extra_at = at + 2 + 12 * entries.len() as u32 + 4;

    out.extend_from_slice(&(entries.len() as u16).to_le_bytes());
    for e in entries {
        out.extend_from_slice(&e.tag.to_le_bytes());
        out.extend_from_slice(&e.kind.to_le_bytes());
        out.extend_from_slice(&e.count.to_le_bytes());
        if e.data.len() <= 4 {
            let mut inline = e.data.clone();
            inline.resize(4, 0);
            out.extend_from_slice(&inline);
        } else {
            out.extend_from_slice(&extra_at.to_le_bytes());
            extra.extend_from_slice(&e.data);
            extra_at += e.data.len() as u32;
        }
    }
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&extra);
    out
}

/// One GPS coordinate as EXIF stores it: whole degrees, minutes and
/// seconds plus a hemisphere letter.
#[derive(Debug, Clone, Copy)]
pub struct Dms {
    pub degrees: u32,
    pub minutes: u32,
    pub seconds: u32,
    pub reference: char,
}

impl Dms {
    pub fn new(degrees: u32, minutes: u32, seconds: u32, reference: char) -> Self {
        Self { degrees, minutes, seconds, reference }
    }

    fn rationals(&self) -> [(u32, u32); 3] {
        [(self.degrees, 1), (self.minutes, 1), (self.seconds, 1)]
    }
}

/// Build a little-endian TIFF body with an optional `DateTimeOriginal` in
/// the Exif IFD and an optional position in the GPS IFD.
pub fn tiff_with(capture_time: Option<&str>, gps: Option<(Dms, Dms)>) -> Vec<u8> {
    let exif_entries: Vec<Entry> = capture_time
        .map(|value| Entry::ascii(TAG_DATE_TIME_ORIGINAL, value))
        .into_iter()
        .collect();
    let gps_entries: Vec<Entry> = match gps {
        Some((lat, lon)) => vec![
            Entry::ascii(TAG_GPS_LATITUDE_REF, &lat.reference.to_string()),
            Entry::rationals(TAG_GPS_LATITUDE, &lat.rationals()),
            Entry::ascii(TAG_GPS_LONGITUDE_REF, &lon.reference.to_string()),
            Entry::rationals(TAG_GPS_LONGITUDE, &lon.rationals()),
        ],
        None => Vec::new(),
    };

    let pointers = usize::from(!exif_entries.is_empty()) + usize::from(!gps_entries.is_empty());
    let ifd0_at = 8u32;
    let exif_at = ifd0_at + 2 + 12 * pointers as u32 + 4;
    let exif_ifd = ifd(&exif_entries, exif_at);
    let gps_at = if exif_entries.is_empty() { exif_at } else { exif_at + exif_ifd.len() as u32 };

    // IFD entries must stay sorted by tag.
    let mut ifd0 = Vec::new();
    if !exif_entries.is_empty() {
        ifd0.push(Entry::long(TAG_EXIF_IFD, exif_at));
    }
    if !gps_entries.is_empty() {
        ifd0.push(Entry::long(TAG_GPS_IFD, gps_at));
    }

    let mut tiff = b"II".to_vec();
    tiff.extend_from_slice(&42u16.to_le_bytes());
    tiff.extend_from_slice(&ifd0_at.to_le_bytes());
    tiff.extend(ifd(&ifd0, ifd0_at));
    if !exif_entries.is_empty() {
        tiff.extend(exif_ifd);
    }
    if !gps_entries.is_empty() {
        tiff.extend(ifd(&gps_entries, gps_at));
    }
    tiff.resize(tiff.len() + TIFF_TAIL_PADDING, 0);
    tiff
}

/// A TIFF body whose Exif IFD holds a single `DateTimeOriginal` value.
pub fn tiff_with_capture_time(value: &str) -> Vec<u8> {
    tiff_with(Some(value), None)
}

/// Wrap a TIFF body in a JPEG APP1 "Exif" segment.
pub fn jpeg_with_tiff(tiff: &[u8]) -> Vec<u8> {
    let mut payload = b"Exif\0\0".to_vec();
    payload.extend_from_slice(tiff);

    let mut jpeg = vec![0xFF, 0xD8, 0xFF, 0xE1];
    jpeg.extend_from_slice(&((payload.len() + 2) as u16).to_be_bytes());
    jpeg.extend(payload);
    jpeg.extend_from_slice(&[0xFF, 0xD9]);
    jpeg
}

/// A JPEG whose only metadata is `DateTimeOriginal`, e.g. `"2020:01:02 03:04:05"`.
pub fn jpeg_with_capture_time(value: &str) -> Vec<u8> {
    jpeg_with_tiff(&tiff_with_capture_time(value))
}

/// A JPEG carrying `DateTimeOriginal` and a GPS position.
pub fn jpeg_with_capture_time_and_gps(value: &str, lat: Dms, lon: Dms) -> Vec<u8> {
    jpeg_with_tiff(&tiff_with(Some(value), Some((lat, lon))))
}

/// Flatten a document into `(element path, text)` pairs, e.g.
/// `("note/resource/mime", "image/jpeg")`. Text is unescaped and CDATA is
/// returned verbatim. Panics on malformed input, unbalanced tags included.
pub fn xml_texts(xml: &str) -> Vec<(String, String)> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<String> = Vec::new();
    let mut out = Vec::new();

    loop {
        match reader.read_event().expect("well-formed xml") {
            Event::Start(e) => stack.push(String::from_utf8(e.name().as_ref().to_vec()).unwrap()),
            Event::End(e) => {
                let name = String::from_utf8(e.name().as_ref().to_vec()).unwrap();
                assert_eq!(stack.pop(), Some(name), "mismatched end tag");
            }
            Event::Text(t) => out.push((stack.join("/"), t.unescape().unwrap().into_owned())),
            Event::CData(c) => out.push((stack.join("/"), String::from_utf8(c.to_vec()).unwrap())),
            Event::Eof => break,
            _ => {}
        }
    }

    assert!(stack.is_empty(), "unclosed elements: {stack:?}");
    out
}

/// All text directly under `path`, concatenated.
pub fn element_text(texts: &[(String, String)], path: &str) -> String {
    texts
        .iter()
        .filter(|(p, _)| p == path)
        .map(|(_, t)| t.as_str())
        .collect()
}

/// Count start tags named `name` anywhere in the document.
pub fn count_elements(xml: &str, name: &str) -> usize {
    let mut reader = Reader::from_str(xml);
    let mut count = 0;
    loop {
        match reader.read_event().expect("well-formed xml") {
            Event::Start(e) | Event::Empty(e) if e.name().as_ref() == name.as_bytes() => count += 1,
            Event::Eof => break,
            _ => {}
        }
    }
    count
}

/// `(hash, type)` of the `<en-media>` element in an ENML body.
pub fn media_attributes(enml: &str) -> (String, String) {
    let mut reader = Reader::from_str(enml);
    loop {
        match reader.read_event().expect("well-formed enml") {
            Event::Empty(e) | Event::Start(e) if e.name().as_ref() == b"en-media" => {
                let attr = |key: &str| {
                    e.try_get_attribute(key)
                        .unwrap()
                        .unwrap_or_else(|| panic!("en-media without {key}"))
                        .unescape_value()
                        .unwrap()
                        .into_owned()
                };
                return (attr("hash"), attr("type"));
            }
            Event::Eof => panic!("no en-media element"),
            _ => {}
        }
    }
}
