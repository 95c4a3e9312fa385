use nsxpath::{DataSourceNode, XmlDocument, XmlNode};

pub type TestResult = Result<(), Box<dyn std::error::Error>>;

/// Two `k:a` elements bind `k` to different URIs; `b` elements appear both inside
/// and outside them.
pub const REFERENCE_DOC: &str = "<root>\
    <k:a xmlns:k='abc'><b>aabb11</b><k:b>aabb22</k:b><b>aabb33</b></k:a>\
    <c><b>ccbb</b></c>\
    <b>bb</b>\
    <k:a xmlns:k='def'><k:b>kkaakkbb11</k:b><k:b/></k:a>\
    </root>";

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn reference_doc() -> XmlDocument<'static> {
    init_logging();
    match XmlDocument::parse(REFERENCE_DOC) {
        Ok(doc) => doc,
        Err(e) => panic!("reference document failed to parse: {}", e),
    }
}

/// The elements with the given local name, in document order.
pub fn elements_named<'a>(doc: &'a XmlDocument<'a>, local: &str) -> Vec<XmlNode<'a, 'a>> {
    doc.descendants()
        .filter(|n| n.name().is_some_and(|q| q.local_part == local))
        .collect()
}
