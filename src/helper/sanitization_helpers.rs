use regex::Regex;
use std::sync::OnceLock;

pub fn is_hex_color(value: &str) -> bool {
    static HEX: OnceLock<Regex> = OnceLock::new();
    HEX.get_or_init(|| Regex::new(r"^#[0-9a-fA-F]{6}$").expect("static regex"))
        .is_match(value)
}

/// Profile handles: an optional leading `@` followed by word characters and dots.
pub fn is_valid_handle(value: &str) -> bool {
    static HANDLE: OnceLock<Regex> = OnceLock::new();
    HANDLE
        .get_or_init(|| Regex::new(r"^@?[A-Za-z0-9_.]{1,50}$").expect("static regex"))
        .is_match(value)
}

/// Public URL of a stored image. Absolute URLs and rooted paths pass through,
/// anything else is resolved below `/media/`.
pub fn media_url(path: &str) -> String {
    let path = path.trim();
    if path.is_empty() || path.starts_with("http://") || path.starts_with("https://") || path.starts_with('/') {
        path.to_string()
    } else {
        format!("/media/{}", path)
    }
}

// ====================================================================
// ========================= ADMIN PREVIEWS ===========================
// ====================================================================
// Read-only snippets shown next to list rows and form fields. Every
// interpolated value goes through html-escape.

pub fn image_preview(path: &str, height_px: u32) -> String {
    if path.trim().is_empty() {
        return "-".to_string();
    }
    format!(
        r#"<img src="{}" style="height: {}px; width: auto; border-radius: 4px;" alt="">"#,
        html_escape::encode_double_quoted_attribute(&media_url(path)),
        height_px
    )
}

pub fn icon_preview(icon_class: &str) -> String {
    if icon_class.trim().is_empty() {
        return "-".to_string();
    }
    let class = html_escape::encode_double_quoted_attribute(icon_class);
    format!(r#"<i class="{}" style="font-size: 24px;"></i> {}"#, class, class)
}

pub fn badge(label: &str, hex_color: &str) -> String {
    format!(
        r#"<span style="background-color: {}; color: white; padding: 2px 8px; border-radius: 4px;">{}</span>"#,
        html_escape::encode_double_quoted_attribute(hex_color),
        html_escape::encode_text(label)
    )
}

pub fn color_swatch(hex_color: &str) -> String {
    let color = html_escape::encode_double_quoted_attribute(hex_color);
    format!(
        r#"<span style="display: inline-block; width: 16px; height: 16px; background-color: {}; border: 1px solid #ccc;"></span> {}"#,
        color, color
    )
}
