//! Sample payloads shared by the core and server test suites.

use serde_json::{json, Value};

pub const PROBLEM_OLX: &str = "<problem/>";

pub const PROBLEM_OLX_EDITED: &str = "<problem><p>Hi</p></problem>";

pub fn problem_olx(display_name: &str) -> String {
    format!(
        r#"<problem display_name="{}" max_attempts="3"><p>What is 2 + 2?</p></problem>"#,
        display_name
    )
}

pub fn html_olx(display_name: &str, body: &str) -> String {
    format!(r#"<html display_name="{}"><![CDATA[{}]]></html>"#, display_name, body)
}

pub fn video_olx(display_name: &str) -> String {
    format!(r#"<video display_name="{}" youtube_id_1_0="3_yD_cEKoCk"/>"#, display_name)
}

/// Smallest valid PNG: a 1x1 transparent pixel.
pub fn png_bytes() -> Vec<u8> {
    vec![
        0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x48, 0x44,
        0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1f,
        0x15, 0xc4, 0x89, 0x00, 0x00, 0x00, 0x0a, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9c, 0x63, 0x00,
        0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0d, 0x0a, 0x2d, 0xb4, 0x00, 0x00, 0x00, 0x00, 0x49,
        0x45, 0x4e, 0x44, 0xae, 0x42, 0x60, 0x82,
    ]
}

/// Deterministic bytes of the given length.
pub fn blob(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

/// A unit context as the course publishing collaborator reports it.
pub fn unit_context(section: &str, subsection: &str, unit: &str) -> Value {
    json!({
        "section": section,
        "subsection": subsection,
        "unit": unit,
    })
}
