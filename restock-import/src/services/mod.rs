//! Import engine services
//!
//! One module per concern: CSV decoding, pure field helpers, the two
//! classification strategies, taxonomy resolution, image-set reconciliation,
//! the per-row pipeline, and the session-level controller.

pub mod catalog_reconciler;
pub mod csv_reader;
pub mod image_reconciler;
pub mod import_controller;
pub mod keyword_matcher;
pub mod price_parser;
pub mod retry_policy;
pub mod tag_tokenizer;
pub mod taxonomy_resolver;
pub mod zero_shot_classifier;

pub use catalog_reconciler::{CatalogReconciler, RowOutcome, RowResult};
pub use csv_reader::CsvImportError;
pub use image_reconciler::{ImageComparison, ImageSetReconciler};
pub use import_controller::ImportStreamController;
pub use keyword_matcher::KeywordCategoryMatcher;
pub use taxonomy_resolver::TaxonomyPathResolver;
pub use zero_shot_classifier::{ClassifierConfig, ZeroShotClassifierClient};
