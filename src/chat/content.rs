//! HTML fragments for chat bodies.

use std::ops::Range;

use once_cell::sync::Lazy;
use regex::Regex;

use super::InlineImage;

/// Temporary id the hosted image is uploaded under.
pub const HOSTED_CONTENT_TEMP_ID: &str = "1";

pub fn paragraph(text: &str) -> String {
    format!("<p>{}</p>", text.trim())
}

/// Local preview tag for the optimistic copy. Never sent.
pub fn optimistic_image(image: &InlineImage) -> String {
    format!(
        r#"<img src="data:image/png;base64,{}" width="100%" height="100%" />"#,
        image.base64_image
    )
}

/// Body sent to Graph: the message followed by an `<img>` pointing at the
/// hosted content uploaded in the same request.
pub fn with_hosted_image(html: &str, image: &InlineImage) -> String {
    let (w, h) = (image.width, image.height);
    format!(
        concat!(
            r#"{html}<p>&nbsp;</p><p class="ck-editor-image-container">"#,
            r#"<img height="{h}px" src="../hostedContents/{id}/$value" width="{w}px" "#,
            r#"style="vertical-align:bottom; width:{w}px; height:{h}px"></p><p>&nbsp;</p>"#,
        ),
        html = html,
        h = h,
        w = w,
        id = HOSTED_CONTENT_TEMP_ID,
    )
}

/// Whole `<img ...>` tags. Quoted attribute values may contain `>`.
static IMG_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<img\b(?:[^>"']|"[^"]*"|'[^']*')*>"#).expect("img tag pattern")
});

/// One attribute per match; values are consumed whole so text inside them
/// never reads as another attribute.
static ATTRIBUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\s([^\s=>/"']+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+)))?"#)
        .expect("attribute pattern")
});

/// Byte ranges and values of the `src` attribute of every `<img>` tag.
pub fn image_sources(html: &str) -> Vec<(Range<usize>, String)> {
    let mut sources = Vec::new();

    for tag in IMG_TAG.find_iter(html) {
        // between "<img" and the closing '>'
        let body_start = tag.start() + 4;
        let body = &html[body_start..tag.end() - 1];

        let src = ATTRIBUTE
            .captures_iter(body)
            .filter(|attr| attr[1].eq_ignore_ascii_case("src"))
            .find_map(|attr| attr.get(2).or(attr.get(3)).or(attr.get(4)));
        if let Some(value) = src {
            let range = body_start + value.start()..body_start + value.end();
            sources.push((range, value.as_str().to_owned()));
        }
    }

    sources
}

/// Replaces each listed range with its new value. Ranges must not overlap.
pub fn replace_ranges(html: &str, mut replacements: Vec<(Range<usize>, String)>) -> String {
    replacements.sort_by_key(|(range, _)| range.start);
    let mut out = String::with_capacity(html.len());
    let mut last = 0;
    for (range, value) in replacements {
        out.push_str(&html[last..range.start]);
        out.push_str(&value);
        last = range.end;
    }
    out.push_str(&html[last..]);
    out
}
