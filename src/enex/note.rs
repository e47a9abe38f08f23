use anyhow::{Context, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use md5::{Digest, Md5};
use quick_xml::Writer;
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use std::io::Write;
use std::path::Path;

use crate::resolve::ResolvedPhoto;

const ENML_DOCTYPE: &str = r#"en-note SYSTEM "http://xml.evernote.com/pub/enml2.dtd""#;

/// Lexical form ENEX uses for `created`, `updated` and `export-date`.
pub const ENEX_TIME_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// Render an instant as `YYYYMMDDTHHMMSSZ`.
pub fn format_timestamp(t: &DateTime<Utc>) -> String {
    t.format(ENEX_TIME_FORMAT).to_string()
}

/// MD5 of the resource bytes, lowercase hex. ENML uses it to point the
/// inline `<en-media>` at its attached resource.
pub fn content_digest(bytes: &[u8]) -> String {
    format!("{:x}", Md5::digest(bytes))
}

/// Encode one photo as a `<note>` element.
///
/// Pure: the caller supplies the bytes and writes the result. The returned
/// fragment is a complete element with all text and attribute values
/// escaped, ready to sit inside `<en-export>`.
pub fn encode(photo: &ResolvedPhoto, bytes: &[u8]) -> Result<Vec<u8>> {
    let digest = content_digest(bytes);
    let title = file_name(&photo.path);
    let body = note_body(&digest, &photo.mime)?;

    let mut w = Writer::new(Vec::new());
    w.write_event(Event::Start(BytesStart::new("note")))?;
    text_element(&mut w, "title", &title)?;

    w.write_event(Event::Start(BytesStart::new("content")))?;
    for section in cdata_sections(&body) {
        w.write_event(Event::CData(BytesCData::new(section)))?;
    }
    w.write_event(Event::End(BytesEnd::new("content")))?;

    text_element(&mut w, "created", &format_timestamp(&photo.created))?;

    w.write_event(Event::Start(BytesStart::new("resource")))?;
    let data = BytesStart::new("data").with_attributes([("encoding", "base64")]);
    w.write_event(Event::Start(data))?;
    w.write_event(Event::Text(BytesText::new(&STANDARD.encode(bytes))))?;
    w.write_event(Event::End(BytesEnd::new("data")))?;
    text_element(&mut w, "mime", &photo.mime)?;

    w.write_event(Event::Start(BytesStart::new("resource-attributes")))?;
    text_element(&mut w, "source-url", &source_url(&photo.path))?;
    // DTD order: source-url, timestamp, latitude, longitude, ..., file-name
    if photo.is_geotagged() {
        text_element(&mut w, "latitude", &photo.latitude.to_string())?;
        text_element(&mut w, "longitude", &photo.longitude.to_string())?;
    }
    text_element(&mut w, "file-name", &title)?;
    w.write_event(Event::End(BytesEnd::new("resource-attributes")))?;

    w.write_event(Event::End(BytesEnd::new("resource")))?;
    w.write_event(Event::End(BytesEnd::new("note")))?;

    Ok(w.into_inner())
}

/// The ENML document carried in `<content>`: a single `<en-media>` that
/// displays the attached resource.
fn note_body(digest: &str, mime: &str) -> Result<String> {
    let mut w = Writer::new(Vec::new());
    w.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    w.get_mut().write_all(b"\n")?;
    w.write_event(Event::DocType(BytesText::from_escaped(ENML_DOCTYPE)))?;
    w.get_mut().write_all(b"\n")?;
    w.write_event(Event::Start(BytesStart::new("en-note")))?;
    let media = BytesStart::new("en-media").with_attributes([("hash", digest), ("type", mime)]);
    w.write_event(Event::Empty(media))?;
    w.write_event(Event::End(BytesEnd::new("en-note")))?;

    String::from_utf8(w.into_inner()).context("ENML body is not UTF-8")
}

fn text_element<W: Write>(w: &mut Writer<W>, name: &str, text: &str) -> Result<()> {
    w.write_event(Event::Start(BytesStart::new(name)))?;
    w.write_event(Event::Text(BytesText::new(text)))?;
    w.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

/// Split text so no section contains `]]>`. Each terminator is broken
/// between `]]` and `>`, which land in adjacent CDATA sections.
fn cdata_sections(text: &str) -> Vec<&str> {
    let mut sections = Vec::new();
    let mut rest = text;
    while let Some(i) = rest.find("]]>") {
        sections.push(&rest[..i + 2]);
        rest = &rest[i + 2..];
    }
    sections.push(rest);
    sections
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// `file://` locator for the absolute form of `path`.
fn source_url(path: &Path) -> String {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    format!("file://{}", absolute.display())
}
