// Document pattern validation: per-type keywords and identifier regexes
use crate::config::{DocumentProfile, PatternConfig};
use crate::types::{PatternValidation, Result, VerifyError};
use regex::Regex;

const UNRESOLVED_TYPES: &[&str] = &["", "unknown", "unidentified", "none", "n/a", "na"];

struct CompiledProfile {
    name: String,
    aliases: Vec<String>,
    keywords: Vec<Regex>,
    id_pattern: Regex,
}

pub struct PatternValidator {
    profiles: Vec<CompiledProfile>,
    max_matches: usize,
}

impl PatternValidator {
    pub fn new(config: &PatternConfig) -> Result<Self> {
        let profiles = config
            .profiles
            .iter()
            .map(compile)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            profiles,
            max_matches: config.max_matches,
        })
    }

    /// Canonical profile name for a declared or detected type, if one is configured.
    pub fn canonical_name(&self, document_type: &str) -> Option<&str> {
        self.profile(document_type).map(|p| p.name.as_str())
    }

    pub fn validate(&self, text: &str, document_type: &str) -> PatternValidation {
        let Some(profile) = self.profile(document_type) else {
            return PatternValidation::default();
        };

        let keyword_count = profile.keywords.iter().filter(|kw| kw.is_match(text)).count();

        let matched_numbers: Vec<String> = profile
            .id_pattern
            .find_iter(text)
            .take(self.max_matches)
            .map(|m| m.as_str().trim().to_string())
            .collect();

        PatternValidation {
            pattern_found: !matched_numbers.is_empty(),
            keywords_found: keyword_count > 0,
            keyword_count,
            matched_numbers,
        }
    }

    fn profile(&self, document_type: &str) -> Option<&CompiledProfile> {
        let wanted = normalize(document_type);
        if wanted.is_empty() {
            return None;
        }
        if let Some(exact) = self
            .profiles
            .iter()
            .find(|p| p.name == wanted || p.aliases.iter().any(|a| *a == wanted))
        {
            return Some(exact);
        }

        // "Aadhaar Card" or "10th Marksheet": every word of a name/alias must appear as a word of
        // the requested type. The most specific (longest) name wins.
        let words: Vec<&str> = wanted.split(' ').collect();
        self.profiles
            .iter()
            .filter_map(|p| {
                std::iter::once(&p.name)
                    .chain(p.aliases.iter())
                    .filter(|n| n.split(' ').all(|w| words.contains(&w)))
                    .map(|n| n.split(' ').count())
                    .max()
                    .map(|len| (p, len))
            })
            .min_by_key(|(_, len)| std::cmp::Reverse(*len))
            .map(|(p, _)| p)
    }
}

/// A type counts as resolved unless it is empty or an explicit "unknown" marker.
pub fn is_resolved(document_type: &str) -> bool {
    let t = document_type.trim().to_lowercase();
    !UNRESOLVED_TYPES.contains(&t.as_str())
}

fn compile(profile: &DocumentProfile) -> Result<CompiledProfile> {
    let id_pattern = Regex::new(&profile.id_pattern)
        .map_err(|e| VerifyError::Config(format!("profile {}: {}", profile.name, e)))?;
    Ok(CompiledProfile {
        name: normalize(&profile.name),
        aliases: profile.aliases.iter().map(|a| normalize(a)).collect(),
        keywords: profile
            .keywords
            .iter()
            .map(|k| keyword_regex(&profile.name, k))
            .collect::<Result<Vec<_>>>()?,
        id_pattern,
    })
}

// whole-word, case-insensitive: "pan" must not fire inside "company"
fn keyword_regex(profile: &str, keyword: &str) -> Result<Regex> {
    Regex::new(&format!(r"(?i)\b{}\b", regex::escape(keyword.trim())))
        .map_err(|e| VerifyError::Config(format!("profile {} keyword {:?}: {}", profile, keyword, e)))
}

// lowercase, punctuation folded to single spaces
fn normalize(name: &str) -> String {
    name.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
