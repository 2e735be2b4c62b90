//! Raw record validation and normalization
//!
//! [`Normalizer::normalize`] is pure: the same [`RawRecord`] always yields
//! the same [`CleanRecord`] or the same [`Rejection`]. Rejections are
//! expected outcomes and are only counted, never logged as errors.

use acervo_common::types::{clean_text, CleanRecord, RawRecord, ReferenceKind, Region};
use acervo_common::{AcervoError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Length bounds for `term` and `meaning`, counted in characters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationLimits {
    pub min_term_length: usize,
    pub max_term_length: usize,
    pub min_meaning_length: usize,
    pub max_meaning_length: usize,
}

impl Default for ValidationLimits {
    fn default() -> Self {
        Self {
            min_term_length: 3,
            max_term_length: 100,
            min_meaning_length: 10,
            max_meaning_length: 500,
        }
    }
}

impl ValidationLimits {
    pub fn validate(&self) -> Result<()> {
        if self.min_term_length == 0 {
            return Err(AcervoError::config("MIN_TERM_LENGTH must be greater than 0"));
        }
        if self.min_term_length > self.max_term_length {
            return Err(AcervoError::config(format!(
                "MIN_TERM_LENGTH ({}) must not exceed MAX_TERM_LENGTH ({})",
                self.min_term_length, self.max_term_length
            )));
        }
        if self.min_meaning_length == 0 {
            return Err(AcervoError::config("MIN_MEANING_LENGTH must be greater than 0"));
        }
        if self.min_meaning_length > self.max_meaning_length {
            return Err(AcervoError::config(format!(
                "MIN_MEANING_LENGTH ({}) must not exceed MAX_MEANING_LENGTH ({})",
                self.min_meaning_length, self.max_meaning_length
            )));
        }
        Ok(())
    }
}

/// Why a raw record did not become a clean record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    MissingField(&'static str),
    TermLength { length: usize, min: usize, max: usize },
    MeaningLength { length: usize, min: usize, max: usize },
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::MissingField(field) => write!(f, "missing required field '{}'", field),
            Rejection::TermLength { length, min, max } => {
                write!(f, "term length {} outside [{}, {}]", length, min, max)
            },
            Rejection::MeaningLength { length, min, max } => {
                write!(f, "meaning length {} outside [{}, {}]", length, min, max)
            },
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    limits: ValidationLimits,
}

impl Normalizer {
    pub fn new(limits: ValidationLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &ValidationLimits {
        &self.limits
    }

    pub fn normalize(&self, raw: &RawRecord) -> std::result::Result<CleanRecord, Rejection> {
        let term = raw.term.as_deref().ok_or(Rejection::MissingField("term"))?;
        let kind = raw.kind.as_deref().ok_or(Rejection::MissingField("kind"))?;
        let meaning = raw.meaning.as_deref().ok_or(Rejection::MissingField("meaning"))?;

        let term = clean_text(term);
        let length = term.chars().count();
        if length < self.limits.min_term_length || length > self.limits.max_term_length {
            return Err(Rejection::TermLength {
                length,
                min: self.limits.min_term_length,
                max: self.limits.max_term_length,
            });
        }

        let meaning = clean_text(meaning);
        let length = meaning.chars().count();
        if length < self.limits.min_meaning_length || length > self.limits.max_meaning_length {
            return Err(Rejection::MeaningLength {
                length,
                min: self.limits.min_meaning_length,
                max: self.limits.max_meaning_length,
            });
        }

        Ok(CleanRecord {
            term,
            kind: normalize_kind(kind),
            meaning,
            usage_example: raw.usage_example.as_deref().map(clean_text).unwrap_or_default(),
            region: normalize_region(raw.region.as_deref()),
            flirt_context: raw.flirt_context.as_deref().map(clean_text).unwrap_or_default(),
        })
    }
}

/// Map free-form kind text onto the closed taxonomy, falling back to `giria`
pub fn normalize_kind(raw: &str) -> ReferenceKind {
    let folded = fold(raw, '_');

    if let Ok(kind) = folded.parse::<ReferenceKind>() {
        return kind;
    }

    match folded.as_str() {
        "expressao" | "regional" | "regionalismo" => ReferenceKind::ExpressaoRegional,
        "girias" | "slang" => ReferenceKind::Giria,
        "memes" => ReferenceKind::Meme,
        "novelas" | "telenovela" => ReferenceKind::Novela,
        "musicas" | "cancao" => ReferenceKind::Musica,
        "personalidades" | "celebridade" => ReferenceKind::Personalidade,
        "eventos" => ReferenceKind::Evento,
        "filmes" => ReferenceKind::Filme,
        "series" => ReferenceKind::Serie,
        "esportes" => ReferenceKind::Esporte,
        "comidas" | "prato" => ReferenceKind::Comida,
        "lugares" => ReferenceKind::Lugar,
        _ => ReferenceKind::Giria,
    }
}

/// Map free-form region text onto the closed taxonomy, defaulting to `nacional`
pub fn normalize_region(raw: Option<&str>) -> Region {
    raw.map(|region| fold(region, '-'))
        .and_then(|region| region.parse().ok())
        .unwrap_or_default()
}

/// Clean, lowercase, drop Portuguese diacritics and join words with `joiner`
fn fold(text: &str, joiner: char) -> String {
    clean_text(text)
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            ' ' | '-' | '_' => joiner,
            other => other,
        })
        .collect()
}
