use tantivy::tokenizer::{
    AsciiFoldingFilter, Language, LowerCaser, RawTokenizer, RemoveLongFilter, SimpleTokenizer,
    Stemmer, StopWordFilter, TextAnalyzer, WhitespaceTokenizer,
};

use super::{AnalyzerCatalog, AnalyzerFactory, EngineVersion};

/// Classic English stop set
pub const ENGLISH_STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "if", "in", "into", "is", "it",
    "no", "not", "of", "on", "or", "such", "that", "the", "their", "then", "there", "these",
    "they", "this", "to", "was", "will", "with",
];

const MAX_TOKEN_BYTES: usize = 255;

pub(super) fn register_all(catalog: &mut AnalyzerCatalog) {
    catalog.register("keyword", AnalyzerFactory::Plain(keyword));
    catalog.register("whitespace", AnalyzerFactory::Plain(whitespace));
    catalog.register("simple", AnalyzerFactory::Plain(simple));
    catalog.register("standard", AnalyzerFactory::Versioned(standard));
    catalog.register("english", AnalyzerFactory::Versioned(english));
}

fn keyword() -> TextAnalyzer {
    TextAnalyzer::from(RawTokenizer::default())
}

fn whitespace() -> TextAnalyzer {
    TextAnalyzer::from(WhitespaceTokenizer::default())
}

fn simple() -> TextAnalyzer {
    TextAnalyzer::builder(SimpleTokenizer::default())
        .filter(LowerCaser)
        .build()
}

fn standard(version: EngineVersion) -> TextAnalyzer {
    if version.on_or_after(EngineVersion::V2) {
        TextAnalyzer::builder(SimpleTokenizer::default())
            .filter(RemoveLongFilter::limit(MAX_TOKEN_BYTES))
            .filter(LowerCaser)
            .filter(AsciiFoldingFilter)
            .build()
    } else {
        TextAnalyzer::builder(SimpleTokenizer::default())
            .filter(LowerCaser)
            .build()
    }
}

fn english(version: EngineVersion) -> TextAnalyzer {
    if version.on_or_after(EngineVersion::V2) {
        TextAnalyzer::builder(SimpleTokenizer::default())
            .filter(RemoveLongFilter::limit(MAX_TOKEN_BYTES))
            .filter(LowerCaser)
            .filter(AsciiFoldingFilter)
            .filter(stop_words())
            .filter(Stemmer::new(Language::English))
            .build()
    } else {
        TextAnalyzer::builder(SimpleTokenizer::default())
            .filter(LowerCaser)
            .filter(stop_words())
            .filter(Stemmer::new(Language::English))
            .build()
    }
}

fn stop_words() -> StopWordFilter {
    StopWordFilter::remove(ENGLISH_STOP_WORDS.iter().map(|w| w.to_string()))
}
