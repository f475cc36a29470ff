//! Result Handlers
//!
//! A [`ResultHandler`] maps a raw response document to any value. Closures
//! taking `&Document` are handlers, so ad-hoc projections need no type.

use crate::document::Document;

/// Maps a raw response document to a value of type `R`.
pub trait ResultHandler<R> {
    fn map(&self, document: &Document) -> R;
}

impl<R, F> ResultHandler<R> for F
where
    F: Fn(&Document) -> R,
{
    fn map(&self, document: &Document) -> R {
        self(document)
    }
}

/// Returns the raw response unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawDocumentHandler;

impl ResultHandler<Document> for RawDocumentHandler {
    fn map(&self, document: &Document) -> Document {
        document.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Value;

    #[test]
    fn test_closure_handler() {
        let doc = Document::new().with("ok", 1.0);
        let handler = |d: &Document| d.get("ok").and_then(Value::as_f64);
        assert_eq!(handler.map(&doc), Some(1.0));
    }

    #[test]
    fn test_raw_document_handler() {
        let doc = Document::new().with("version", "2.4");
        assert_eq!(RawDocumentHandler.map(&doc), doc);
    }
}
