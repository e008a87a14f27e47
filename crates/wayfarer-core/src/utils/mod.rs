//! Utility functions for user-written text.

pub mod content;

pub use content::{
    enhance_content, filter_sensitive_words, filter_words, format_paragraphs, format_text, process_content,
    ContentOptions, ContentTag, EnhancedContent, DEFAULT_SENSITIVE_WORDS,
};
