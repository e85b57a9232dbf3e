use super::{ExtractedData, PageMeta, Strategy};

/// Twitter Card tags, keyed without the `twitter:` prefix.
///
/// Hyphens in card keys are normalized to underscores by [`PageMeta::parse`],
/// so `twitter:image-alt` becomes `image_alt`.
pub fn extract(meta: &PageMeta) -> ExtractedData {
    let mut data = ExtractedData::new(Strategy::TwitterCard);
    for (key, value) in &meta.twitter {
        data.insert_text(key, value);
    }
    // Cards name the image `image:src` on older pages.
    if let Some(src) = meta.twitter.get("image:src") {
        data.insert_text_if_absent("image", src);
    }
    data
}

pub fn is_present(meta: &PageMeta) -> bool {
    !meta.twitter.is_empty()
}
