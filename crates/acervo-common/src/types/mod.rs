//! Cultural-reference record model shared across acervo
//!
//! Records move through the pipeline in two shapes: [`RawRecord`], the
//! untrusted mapping a collector emits, and [`CleanRecord`], the validated
//! projection that is allowed to reach the store. Uniqueness is decided on
//! [`CanonicalKey`], never on the raw term.

use crate::error::AcervoError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Collapse whitespace runs to one space and trim both ends
///
/// Newlines, carriage returns and tabs count as whitespace, so embedded
/// line breaks disappear as part of the collapse.
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ============================================================================
// Closed taxonomies
// ============================================================================

/// Kind of cultural reference (stored in the `tipo` column)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    Giria,
    Meme,
    Novela,
    Musica,
    Personalidade,
    Evento,
    ExpressaoRegional,
    Filme,
    Serie,
    Esporte,
    Comida,
    Lugar,
}

impl ReferenceKind {
    pub const ALL: [ReferenceKind; 12] = [
        ReferenceKind::Giria,
        ReferenceKind::Meme,
        ReferenceKind::Novela,
        ReferenceKind::Musica,
        ReferenceKind::Personalidade,
        ReferenceKind::Evento,
        ReferenceKind::ExpressaoRegional,
        ReferenceKind::Filme,
        ReferenceKind::Serie,
        ReferenceKind::Esporte,
        ReferenceKind::Comida,
        ReferenceKind::Lugar,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReferenceKind::Giria => "giria",
            ReferenceKind::Meme => "meme",
            ReferenceKind::Novela => "novela",
            ReferenceKind::Musica => "musica",
            ReferenceKind::Personalidade => "personalidade",
            ReferenceKind::Evento => "evento",
            ReferenceKind::ExpressaoRegional => "expressao_regional",
            ReferenceKind::Filme => "filme",
            ReferenceKind::Serie => "serie",
            ReferenceKind::Esporte => "esporte",
            ReferenceKind::Comida => "comida",
            ReferenceKind::Lugar => "lugar",
        }
    }
}

impl std::str::FromStr for ReferenceKind {
    type Err = AcervoError;

    /// Exact match on the canonical spelling; synonyms are the normalizer's job
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| AcervoError::UnknownKind(s.to_string()))
    }
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Brazilian region a reference belongs to (stored in the `regiao` column)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Region {
    #[default]
    Nacional,
    Norte,
    Nordeste,
    CentroOeste,
    Sudeste,
    Sul,
}

impl Region {
    pub const ALL: [Region; 6] = [
        Region::Nacional,
        Region::Norte,
        Region::Nordeste,
        Region::CentroOeste,
        Region::Sudeste,
        Region::Sul,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Region::Nacional => "nacional",
            Region::Norte => "norte",
            Region::Nordeste => "nordeste",
            Region::CentroOeste => "centro-oeste",
            Region::Sudeste => "sudeste",
            Region::Sul => "sul",
        }
    }
}

impl std::str::FromStr for Region {
    type Err = AcervoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|region| region.as_str() == s)
            .ok_or_else(|| AcervoError::UnknownRegion(s.to_string()))
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Records
// ============================================================================

/// Untrusted record as emitted by a collector
///
/// Every field is optional text. Deserialization accepts both the English
/// field names and the Portuguese column names used by the store, so JSON
/// exports of the `cultural_references` table load directly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawRecord {
    #[serde(alias = "termo")]
    pub term: Option<String>,
    #[serde(alias = "tipo")]
    pub kind: Option<String>,
    #[serde(alias = "significado")]
    pub meaning: Option<String>,
    #[serde(alias = "exemplo_uso")]
    pub usage_example: Option<String>,
    #[serde(alias = "regiao")]
    pub region: Option<String>,
    #[serde(alias = "contexto_flerte")]
    pub flirt_context: Option<String>,
}

impl RawRecord {
    pub fn new(
        term: impl Into<String>,
        kind: impl Into<String>,
        meaning: impl Into<String>,
    ) -> Self {
        Self {
            term: Some(term.into()),
            kind: Some(kind.into()),
            meaning: Some(meaning.into()),
            ..Default::default()
        }
    }

    pub fn with_usage_example(mut self, example: impl Into<String>) -> Self {
        self.usage_example = Some(example.into());
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_flirt_context(mut self, context: impl Into<String>) -> Self {
        self.flirt_context = Some(context.into());
        self
    }
}

/// Validated record, ready for insertion
///
/// Serializes with the store's column names. Instances are produced by the
/// ingest normalizer, which guarantees the length bounds on `term` and
/// `meaning`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanRecord {
    #[serde(rename = "termo")]
    pub term: String,
    #[serde(rename = "tipo")]
    pub kind: ReferenceKind,
    #[serde(rename = "significado")]
    pub meaning: String,
    #[serde(rename = "exemplo_uso")]
    pub usage_example: String,
    #[serde(rename = "regiao")]
    pub region: Region,
    #[serde(rename = "contexto_flerte")]
    pub flirt_context: String,
}

impl CleanRecord {
    pub fn key(&self) -> CanonicalKey {
        CanonicalKey::from_term(&self.term)
    }
}

/// Case-folded, whitespace-normalized form of a term
///
/// Two records collide exactly when their keys are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalKey(String);

impl CanonicalKey {
    pub fn from_term(term: &str) -> Self {
        Self(clean_text(term).to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CanonicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CanonicalKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
