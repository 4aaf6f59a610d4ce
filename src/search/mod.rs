//! Tantivy-based search index module.
//!
//! Ranked full-text search over report records with per-field boosts.

use std::path::Path;
use std::sync::Arc;
use tantivy::collector::TopDocs;
use tantivy::query::{BooleanQuery, BoostQuery, Occur, Query, QueryParser};
use tantivy::schema::{Field, Schema, Value, STORED, STRING, TEXT};
use tantivy::{doc, Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};
use tokio::sync::RwLock;

use crate::errors::AppError;
use crate::models::ReportRecord;

const BOOST_DESCRIPTION: f32 = 10.0;
const BOOST_SUPPLIER: f32 = 8.0;
const BOOST_PREFIX: f32 = 7.0;
const BOOST_DEPARTMENT: f32 = 5.0;
const BOOST_NUMBERS: f32 = 4.0;
const BOOST_NOTES: f32 = 3.0;

/// Deepest hit a search will page to.
const MAX_RESULT_WINDOW: usize = 10_000;

/// Search hit with record id and relevance score.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub report_id: String,
    pub score: f32,
}

/// Search index schema fields.
struct SearchFields {
    report_id: Field,
    description: Field,
    supplier: Field,
    prefix: Field,
    department: Field,
    numbers: Field,
    notes: Field,
}

/// Tantivy search index for report records.
pub struct SearchIndex {
    index: Index,
    reader: IndexReader,
    writer: Arc<RwLock<IndexWriter>>,
    fields: SearchFields,
}

impl SearchIndex {
    /// Create or open a search index at the specified path.
    pub fn open(index_path: &Path) -> Result<Self, AppError> {
        std::fs::create_dir_all(index_path)
            .map_err(|e| AppError::Search(format!("Failed to create index directory: {}", e)))?;

        let mut schema_builder = Schema::builder();
        let report_id = schema_builder.add_text_field("report_id", STRING | STORED);
        let description = schema_builder.add_text_field("description", TEXT);
        let supplier = schema_builder.add_text_field("supplier", TEXT);
        let prefix = schema_builder.add_text_field("prefix", TEXT);
        let department = schema_builder.add_text_field("department", TEXT);
        let numbers = schema_builder.add_text_field("numbers", TEXT);
        let notes = schema_builder.add_text_field("notes", TEXT);
        let schema = schema_builder.build();

        let fields = SearchFields {
            report_id,
            description,
            supplier,
            prefix,
            department,
            numbers,
            notes,
        };

        let index = Index::open_in_dir(index_path)
            .or_else(|_| Index::create_in_dir(index_path, schema.clone()))
            .map_err(|e| AppError::Search(format!("Failed to open/create index: {}", e)))?;

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::OnCommitWithDelay)
            .try_into()
            .map_err(|e| AppError::Search(format!("Failed to create reader: {}", e)))?;

        let writer = index
            .writer(50_000_000) // 50MB buffer
            .map_err(|e| AppError::Search(format!("Failed to create writer: {}", e)))?;

        Ok(Self {
            index,
            reader,
            writer: Arc::new(RwLock::new(writer)),
            fields,
        })
    }

    /// Rebuild the entire index from report records.
    pub async fn rebuild(&self, reports: &[ReportRecord]) -> Result<(), AppError> {
        let mut writer = self.writer.write().await;

        writer.delete_all_documents()?;
        for report in reports {
            writer.add_document(self.create_document(report))?;
        }
        writer.commit()?;

        self.reader.reload()?;

        tracing::info!("Search index rebuilt with {} reports", reports.len());
        Ok(())
    }

    /// Index (or re-index) a single report record.
    pub async fn index_report(&self, report: &ReportRecord) -> Result<(), AppError> {
        let mut writer = self.writer.write().await;

        writer.delete_term(Term::from_field_text(self.fields.report_id, &report.id));
        writer.add_document(self.create_document(report))?;
        writer.commit()?;

        self.reader.reload()?;
        Ok(())
    }

    /// Remove a report record from the index.
    pub async fn remove_report(&self, report_id: &str) -> Result<(), AppError> {
        let mut writer = self.writer.write().await;

        writer.delete_term(Term::from_field_text(self.fields.report_id, report_id));
        writer.commit()?;

        self.reader.reload()?;
        Ok(())
    }

    /// Search for report records matching the query.
    pub fn search(
        &self,
        query_str: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<SearchResult>, AppError> {
        if query_str.trim().is_empty() || limit == 0 || offset >= MAX_RESULT_WINDOW {
            return Ok(Vec::new());
        }
        let window = limit.saturating_add(offset).min(MAX_RESULT_WINDOW);

        let searcher = self.reader.searcher();

        let field_boosts = [
            (self.fields.description, BOOST_DESCRIPTION),
            (self.fields.supplier, BOOST_SUPPLIER),
            (self.fields.prefix, BOOST_PREFIX),
            (self.fields.department, BOOST_DEPARTMENT),
            (self.fields.numbers, BOOST_NUMBERS),
            (self.fields.notes, BOOST_NOTES),
        ];

        // Lenient parsing: stray operators in free text must not fail the search
        let mut subqueries: Vec<(Occur, Box<dyn Query>)> = Vec::new();
        for (field, boost) in field_boosts {
            let parser = QueryParser::for_index(&self.index, vec![field]);
            let (field_query, _errors) = parser.parse_query_lenient(query_str);
            subqueries.push((Occur::Should, Box::new(BoostQuery::new(field_query, boost))));
        }
        let combined_query = BooleanQuery::new(subqueries);

        let top_docs = searcher
            .search(&combined_query, &TopDocs::with_limit(window))
            .map_err(|e| AppError::Search(format!("Search failed: {}", e)))?;

        let results = top_docs
            .into_iter()
            .skip(offset)
            .take(limit)
            .filter_map(|(score, doc_address)| {
                let doc: TantivyDocument = searcher.doc(doc_address).ok()?;
                let report_id = doc.get_first(self.fields.report_id)?.as_str()?.to_string();
                Some(SearchResult { report_id, score })
            })
            .collect();

        Ok(results)
    }

    /// Create a Tantivy document from a report record.
    fn create_document(&self, report: &ReportRecord) -> TantivyDocument {
        let numbers = [
            report.approval_numbers.as_str(),
            report.invoice.as_deref().unwrap_or_default(),
        ]
        .join(" ");

        doc!(
            self.fields.report_id => report.id.clone(),
            self.fields.description => report.description.clone(),
            self.fields.supplier => report.supplier.clone(),
            self.fields.prefix => report.prefix.clone(),
            self.fields.department => report.department.clone(),
            self.fields.numbers => numbers,
            self.fields.notes => report.notes.clone().unwrap_or_default()
        )
    }
}
