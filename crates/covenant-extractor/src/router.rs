//! Keyword routing of free-form questions to catalogue categories
//!
//! Downstream consumers (Q&A over stored answers) use the router to pick
//! which categories' answers are relevant to a user's question. The keyword
//! index is derived entirely from catalogue metadata and rebuilt when its
//! TTL expires.

use crate::catalogue::CatalogueDirectory;
use crate::error::ExtractorError;
use regex::Regex;
use std::collections::{BTreeSet, HashSet};
use std::path::PathBuf;
use std::sync::{Arc, LazyLock, RwLock};
use std::time::{Duration, Instant};
use tracing::{error, info};

static WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-z][a-z0-9]+").expect("word pattern is valid"));

const STOPWORDS: &[&str] = &[
    "the", "a", "an", "is", "are", "was", "were", "be", "been", "being", "have", "has", "had",
    "do", "does", "did", "will", "would", "shall", "should", "may", "might", "must", "can",
    "could", "of", "in", "to", "for", "with", "on", "at", "by", "from", "as", "into", "through",
    "during", "before", "after", "above", "below", "between", "out", "off", "over", "under",
    "again", "further", "then", "once", "that", "this", "these", "those", "and", "but", "or",
    "nor", "not", "so", "if", "what", "which", "who", "whom", "when", "where", "why", "how",
    "all", "each", "every", "both", "few", "more", "most", "other", "some", "such", "no", "any",
    "only",
];

const MIN_KEYWORD_LEN: usize = 3;

/// Categories matched above this count make a route non-specific
const MAX_SPECIFIC_MATCHES: usize = 3;

/// Default keyword index lifetime
pub const DEFAULT_INDEX_TTL: Duration = Duration::from_secs(300);

/// Lowercase words of at least three characters, minus stopwords
pub fn tokenize(text: &str) -> BTreeSet<String> {
    let lower = text.to_lowercase();
    WORD.find_iter(&lower)
        .map(|m| m.as_str())
        .filter(|w| w.len() >= MIN_KEYWORD_LEN && !STOPWORDS.contains(w))
        .map(str::to_string)
        .collect()
}

/// Routing metadata for one category
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryKeywords {
    /// Category name
    pub name: String,
    /// Questions in the category, in catalogue order
    pub question_ids: Vec<String>,
    /// Tokens of the name, description, question ids and question texts
    pub keywords: BTreeSet<String>,
}

/// Provider of the catalogue the router indexes
pub trait CategorySource: Send + Sync {
    /// Load the current catalogue
    fn load(&self) -> Result<CatalogueDirectory, ExtractorError>;
}

impl CategorySource for CatalogueDirectory {
    fn load(&self) -> Result<CatalogueDirectory, ExtractorError> {
        Ok(self.clone())
    }
}

/// Re-reads a catalogue file on every index refresh
#[derive(Debug, Clone)]
pub struct CatalogueFileSource {
    path: PathBuf,
}

impl CatalogueFileSource {
    /// Source backed by the TOML file at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CategorySource for CatalogueFileSource {
    fn load(&self) -> Result<CatalogueDirectory, ExtractorError> {
        CatalogueDirectory::from_file(&self.path)
    }
}

/// Build the keyword index of a catalogue
pub fn build_index(catalogue: &CatalogueDirectory) -> Vec<CategoryKeywords> {
    catalogue
        .category_list()
        .iter()
        .map(|category| {
            let mut keywords = tokenize(&category.name);
            keywords.extend(tokenize(&category.description));
            let mut question_ids = Vec::new();
            for question in catalogue
                .question_list()
                .iter()
                .filter(|q| q.category == category.name)
            {
                question_ids.push(question.id.clone());
                keywords.extend(tokenize(&question.id.replace('_', " ")));
                keywords.extend(tokenize(&question.text));
            }
            CategoryKeywords {
                name: category.name.clone(),
                question_ids,
                keywords,
            }
        })
        .collect()
}

/// A matched category and its score
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch {
    /// Category name
    pub category: String,
    /// Keyword score
    pub score: u32,
}

/// Outcome of routing one question
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RouteResult {
    /// Matched categories, best first
    pub matches: Vec<RouteMatch>,
    /// Question ids across matched categories, deduplicated
    pub question_ids: Vec<String>,
    /// At most three categories matched
    pub is_specific: bool,
}

struct CachedIndex {
    built_at: Instant,
    categories: Arc<Vec<CategoryKeywords>>,
}

/// Routes free-form questions to catalogue categories
pub struct TopicRouter<S>
where
    S: CategorySource,
{
    source: S,
    ttl: Duration,
    cache: RwLock<Option<CachedIndex>>,
}

impl<S> TopicRouter<S>
where
    S: CategorySource,
{
    /// Create a router with the default index TTL
    pub fn new(source: S) -> Self {
        Self::with_ttl(source, DEFAULT_INDEX_TTL)
    }

    /// Create a router with a custom index TTL
    pub fn with_ttl(source: S, ttl: Duration) -> Self {
        Self {
            source,
            ttl,
            cache: RwLock::new(None),
        }
    }

    /// Drop the index so the next route rebuilds it
    pub fn invalidate(&self) {
        *self.cache.write().unwrap_or_else(|p| p.into_inner()) = None;
    }

    /// Score `question` against every category
    ///
    /// Each category scores two points per shared keyword, ten if its name
    /// appears in the question as a phrase, and one per keyword found as a
    /// substring. Categories scoring at least a quarter of the top score
    /// (and at least one) match.
    pub fn route(&self, question: &str) -> Result<RouteResult, ExtractorError> {
        let index = self.index()?;
        let tokens = tokenize(question);
        let lower = question.to_lowercase();

        let mut scored: Vec<(u32, &CategoryKeywords)> = index
            .iter()
            .filter_map(|category| {
                let overlap = category.keywords.intersection(&tokens).count() as u32;
                let mut score = overlap * 2;
                if lower.contains(&category.name.to_lowercase()) {
                    score += 10;
                }
                score += category
                    .keywords
                    .iter()
                    .filter(|k| lower.contains(k.as_str()))
                    .count() as u32;
                (score > 0).then_some((score, category))
            })
            .collect();
        // Stable: equal scores keep catalogue order
        scored.sort_by(|a, b| b.0.cmp(&a.0));

        let Some(&(top, _)) = scored.first() else {
            info!("No category matched '{}'", truncate(question, 80));
            return Ok(RouteResult::default());
        };
        let threshold = (f64::from(top) * 0.25).max(1.0);

        let mut result = RouteResult::default();
        let mut seen = HashSet::new();
        for (score, category) in scored.into_iter().filter(|(s, _)| f64::from(*s) >= threshold) {
            result.matches.push(RouteMatch {
                category: category.name.clone(),
                score,
            });
            for id in &category.question_ids {
                if seen.insert(id.as_str()) {
                    result.question_ids.push(id.clone());
                }
            }
        }
        result.is_specific = result.matches.len() <= MAX_SPECIFIC_MATCHES;

        info!(
            "Routed '{}' to {} categories, {} questions",
            truncate(question, 60),
            result.matches.len(),
            result.question_ids.len()
        );
        Ok(result)
    }

    fn index(&self) -> Result<Arc<Vec<CategoryKeywords>>, ExtractorError> {
        {
            let cache = self.cache.read().unwrap_or_else(|p| p.into_inner());
            if let Some(cached) = cache.as_ref() {
                if cached.built_at.elapsed() < self.ttl {
                    return Ok(Arc::clone(&cached.categories));
                }
            }
        }

        let mut cache = self.cache.write().unwrap_or_else(|p| p.into_inner());
        match self.source.load() {
            Ok(catalogue) => {
                let categories = Arc::new(build_index(&catalogue));
                info!("Topic index refreshed: {} categories", categories.len());
                *cache = Some(CachedIndex {
                    built_at: Instant::now(),
                    categories: Arc::clone(&categories),
                });
                Ok(categories)
            }
            Err(e) => match cache.as_ref() {
                Some(stale) => {
                    error!("Topic index refresh failed, serving stale index: {}", e);
                    Ok(Arc::clone(&stale.categories))
                }
                None => Err(e),
            },
        }
    }
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
