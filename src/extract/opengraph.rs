use super::{ExtractedData, PageMeta, Strategy};

/// OpenGraph properties as a flat map.
///
/// Every `og:*` key is kept verbatim, including ones this crate does not
/// know about. The document `<title>`, meta description and favicon fill in
/// `title`, `description` and `favicon` when the page omits them.
pub fn extract(meta: &PageMeta) -> ExtractedData {
    let mut data = ExtractedData::new(Strategy::OpenGraph);

    for (key, value) in &meta.open_graph {
        data.insert_text(key, value);
    }

    if let Some(title) = &meta.title {
        data.insert_text_if_absent("title", title);
    }
    if let Some(description) = &meta.description {
        data.insert_text_if_absent("description", description);
    }
    if let Some(favicon) = &meta.favicon {
        data.insert_text_if_absent("favicon", favicon);
    }

    data
}

/// True when the page carries any `og:*` property at all.
pub fn is_present(meta: &PageMeta) -> bool {
    !meta.open_graph.is_empty()
}
