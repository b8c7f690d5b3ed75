use std::fmt;

use crate::CandidateEntry;

/// Writing system whose presence in a title is required for acceptance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Script {
    Arabic,
    Cyrillic,
    Hebrew,
    Devanagari,
    Greek,
}

impl Script {
    /// Script associated with a language code, if the filter should check one.
    pub fn for_language(code: &str) -> Option<Script> {
        let primary = code.split(['-', '_']).next().unwrap_or(code);
        match primary.to_ascii_lowercase().as_str() {
            "ar" | "arz" | "apc" | "acm" | "ary" | "fa" | "ur" | "ps" => Some(Script::Arabic),
            "ru" | "uk" | "bg" | "sr" | "kk" => Some(Script::Cyrillic),
            "he" | "yi" => Some(Script::Hebrew),
            "hi" | "mr" | "ne" => Some(Script::Devanagari),
            "el" => Some(Script::Greek),
            _ => None,
        }
    }

    pub fn contains(self, c: char) -> bool {
        match self {
            Script::Arabic => matches!(c,
                '\u{0600}'..='\u{06FF}'
                    | '\u{0750}'..='\u{077F}'
                    | '\u{08A0}'..='\u{08FF}'
                    | '\u{FB50}'..='\u{FDFF}'
                    | '\u{FE70}'..='\u{FEFF}'
            ),
            Script::Cyrillic => matches!(c, '\u{0400}'..='\u{052F}'),
            Script::Hebrew => matches!(c, '\u{0590}'..='\u{05FF}' | '\u{FB1D}'..='\u{FB4F}'),
            Script::Devanagari => matches!(c, '\u{0900}'..='\u{097F}' | '\u{A8E0}'..='\u{A8FF}'),
            Script::Greek => matches!(c, '\u{0370}'..='\u{03FF}' | '\u{1F00}'..='\u{1FFF}'),
        }
    }

    pub fn appears_in(self, text: &str) -> bool {
        text.chars().any(|c| self.contains(c))
    }
}

/// Acceptance policy for candidate entries.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterPolicy {
    pub language: String,
    pub min_duration_secs: f64,
    pub excluded_phrases: Vec<String>,
    pub excluded_categories: Vec<String>,
    pub script: Option<Script>,
}

impl FilterPolicy {
    /// Policy with the pipeline defaults for `language`: one minute minimum,
    /// music excluded, translated uploads excluded.
    pub fn for_language(language: impl Into<String>) -> Self {
        let language = language.into();
        let script = Script::for_language(&language);
        Self {
            language,
            min_duration_secs: 60.0,
            excluded_phrases: vec!["مترجم".to_string()],
            excluded_categories: vec!["Music".to_string()],
            script,
        }
    }

    pub fn accepts(&self, entry: &CandidateEntry) -> bool {
        evaluate(entry, self).is_ok()
    }

    fn has_language_subtitles(&self, entry: &CandidateEntry) -> bool {
        let wanted = self.language.to_lowercase();
        entry
            .subtitle_languages
            .iter()
            .any(|key| key.to_lowercase().contains(&wanted))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    MissingUrl,
    NoSubtitles,
    MissingScript,
    ExcludedPhrase(String),
    ExcludedCategory(String),
    TooShort,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::MissingUrl => write!(f, "missing url"),
            Rejection::NoSubtitles => write!(f, "no subtitles in target language"),
            Rejection::MissingScript => write!(f, "title lacks target script"),
            Rejection::ExcludedPhrase(phrase) => write!(f, "title contains {phrase:?}"),
            Rejection::ExcludedCategory(category) => write!(f, "excluded category {category}"),
            Rejection::TooShort => write!(f, "below minimum duration"),
        }
    }
}

/// Applies `policy` to `entry`, stopping at the first failing condition.
pub fn evaluate(entry: &CandidateEntry, policy: &FilterPolicy) -> Result<(), Rejection> {
    if entry.url.trim().is_empty() {
        return Err(Rejection::MissingUrl);
    }
    if !policy.has_language_subtitles(entry) {
        return Err(Rejection::NoSubtitles);
    }
    if let Some(script) = policy.script {
        if !script.appears_in(&entry.title) {
            return Err(Rejection::MissingScript);
        }
    }
    if let Some(phrase) = policy
        .excluded_phrases
        .iter()
        .find(|phrase| entry.title.contains(phrase.as_str()))
    {
        return Err(Rejection::ExcludedPhrase(phrase.clone()));
    }
    if let Some(category) = entry.categories.iter().find(|category| {
        policy
            .excluded_categories
            .iter()
            .any(|excluded| excluded.eq_ignore_ascii_case(category.as_str()))
    }) {
        return Err(Rejection::ExcludedCategory(category.clone()));
    }
    if entry.duration < policy.min_duration_secs {
        return Err(Rejection::TooShort);
    }
    Ok(())
}
