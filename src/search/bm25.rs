//! BM25 keyword retrieval over text chunks using Tantivy
//!
//! The index lives in RAM and is rebuilt whenever the fusion retriever is
//! set up; chunk ids map back to the caller's chunk list.

use anyhow::{Context, Result};
use tantivy::collector::TopDocs;
use tantivy::query::QueryParser;
use tantivy::schema::{Field, Schema, Value, STORED, TEXT};
use tantivy::{doc, Index, IndexReader, IndexWriter, ReloadPolicy};

/// BM25 full-text index over chunk texts
pub struct Bm25Index {
    index: Index,
    reader: IndexReader,
    text_field: Field,
    id_field: Field,
}

impl Bm25Index {
    /// Index `texts`; document `i` gets chunk id `i`
    pub fn build<S: AsRef<str>>(texts: &[S]) -> Result<Self> {
        let (schema, text_field, id_field) = Self::build_schema();
        let index = Index::create_in_ram(schema);

        let mut writer: IndexWriter = index
            .writer(50_000_000) // 50MB heap
            .context("Failed to create index writer")?;

        for (id, text) in texts.iter().enumerate() {
            writer.add_document(doc!(
                text_field => text.as_ref(),
                id_field => id as u64,
            ))?;
        }

        writer.commit().context("Failed to commit index")?;

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()
            .context("Failed to create index reader")?;

        Ok(Self {
            index,
            reader,
            text_field,
            id_field,
        })
    }

    /// Top `limit` chunks as `(chunk id, bm25 score)`, best first
    pub fn search(&self, query: &str, limit: usize) -> Result<Vec<(usize, f32)>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let searcher = self.reader.searcher();
        let query_parser = QueryParser::for_index(&self.index, vec![self.text_field]);

        // Lenient: stray quotes or operators in user text should not fail the search
        let (parsed_query, _errors) = query_parser.parse_query_lenient(query);

        let top_docs = searcher
            .search(&parsed_query, &TopDocs::with_limit(limit))
            .context("Search execution failed")?;

        let mut results = Vec::with_capacity(top_docs.len());
        for (score, doc_address) in top_docs {
            let retrieved_doc: tantivy::TantivyDocument = searcher
                .doc(doc_address)
                .context("Failed to retrieve document")?;

            if let Some(id) = retrieved_doc
                .get_first(self.id_field)
                .and_then(|v| v.as_u64())
            {
                results.push((id as usize, score));
            }
        }

        Ok(results)
    }

    pub fn num_docs(&self) -> u64 {
        self.reader.searcher().num_docs()
    }

    fn build_schema() -> (Schema, Field, Field) {
        let mut schema_builder = Schema::builder();
        let text_field = schema_builder.add_text_field("text", TEXT);
        let id_field = schema_builder.add_u64_field("id", STORED);
        (schema_builder.build(), text_field, id_field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunks() -> Vec<&'static str> {
        vec![
            "Rust is a systems programming language focused on safety and performance",
            "Python is a high-level programming language known for its simplicity",
            "Machine learning is a subset of AI that enables systems to learn from data",
        ]
    }

    #[test]
    fn test_build_and_search() -> Result<()> {
        let index = Bm25Index::build(&chunks())?;
        assert_eq!(index.num_docs(), 3);

        let results = index.search("rust", 10)?;
        assert!(!results.is_empty());
        assert_eq!(results[0].0, 0);

        let results = index.search("programming", 10)?;
        assert_eq!(results.len(), 2);

        Ok(())
    }

    #[test]
    fn test_special_characters_do_not_fail() -> Result<()> {
        let index = Bm25Index::build(&chunks())?;
        assert!(index.search("\"python (simplicity", 10).is_ok());
        Ok(())
    }

    #[test]
    fn test_empty_index() -> Result<()> {
        let texts: Vec<String> = Vec::new();
        let index = Bm25Index::build(&texts)?;
        assert_eq!(index.num_docs(), 0);
        assert!(index.search("anything", 10)?.is_empty());
        Ok(())
    }
}
