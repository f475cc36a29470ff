//! Query Results
//!
//! A query answers with a list of documents and no success indicator, so
//! [`QueryResult`] has no `is_success` to misread.

use crate::decode::{Decode, DecodeError};
use crate::document::Document;
use crate::result::handler::ResultHandler;

/// The documents matched by a query, in engine order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    documents: Vec<Document>,
}

impl QueryResult {
    /// Wraps the documents returned by the engine.
    pub fn new(documents: Vec<Document>) -> Self {
        Self { documents }
    }

    /// Returns the matched documents.
    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    /// Number of matched documents.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Returns true if nothing matched.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Decodes every document into `T`, stopping at the first error.
    pub fn as_type<T: Decode>(&self) -> Result<Vec<T>, DecodeError> {
        self.documents
            .iter()
            .enumerate()
            .map(|(i, doc)| T::decode_document(doc).map_err(|e| e.within_index(i)))
            .collect()
    }

    /// Maps every document through a handler.
    pub fn map<R, H: ResultHandler<R>>(&self, handler: H) -> Vec<R> {
        self.documents.iter().map(|doc| handler.map(doc)).collect()
    }

    /// Decodes the first document, if any.
    pub fn first_as<T: Decode>(&self) -> Result<Option<T>, DecodeError> {
        self.documents.first().map(T::decode_document).transpose()
    }

    /// Consumes the result and returns the documents.
    pub fn into_documents(self) -> Vec<Document> {
        self.documents
    }
}

impl IntoIterator for QueryResult {
    type Item = Document;
    type IntoIter = std::vec::IntoIter<Document>;

    fn into_iter(self) -> Self::IntoIter {
        self.documents.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Value;

    fn sample() -> QueryResult {
        QueryResult::new(vec![
            Document::new().with("name", "Paris").with("n", 1),
            Document::new().with("name", "Lyon").with("n", 2),
        ])
    }

    #[test]
    fn test_as_type_keeps_order() {
        let names: Vec<Document> = sample().as_type().unwrap();
        assert_eq!(names[1].get("name"), Some(&Value::from("Lyon")));
    }

    #[test]
    fn test_map_and_first() {
        let result = sample();
        let counts = result.map(|doc: &Document| doc.get("n").and_then(Value::as_i64));
        assert_eq!(counts, vec![Some(1), Some(2)]);

        let first: Option<Document> = result.first_as().unwrap();
        assert_eq!(first.and_then(|d| d.get("name").cloned()), Some(Value::from("Paris")));
        assert_eq!(QueryResult::default().first_as::<Document>().unwrap(), None);
    }

    #[test]
    fn test_as_type_error_carries_index() {
        let result = QueryResult::new(vec![Document::new().with("v", 1)]);
        #[derive(Debug, Default)]
        struct Named(String);
        impl Decode for Named {
            fn decode_value(value: &Value) -> Result<Self, DecodeError> {
                let doc = value
                    .as_document()
                    .ok_or_else(|| DecodeError::mismatch("document", value))?;
                let name = doc.get("name").ok_or(DecodeError::MissingField {
                    field: "name".to_string(),
                })?;
                String::decode_value(name).map(Named)
            }
        }
        let err = result.as_type::<Named>().unwrap_err();
        assert_eq!(err.field(), Some("[0].name"));
    }
}
