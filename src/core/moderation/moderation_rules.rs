// Moderation rule tables - the lexicon and heuristics behind the engine.
//
// A `RuleTable` is plain data (serde), so it can live in a JSON file and be
// edited without a rebuild. `CompiledRules` is the validated, ready-to-match
// form. Compilation happens once at start-up; a bad rule is fatal there and
// never surfaces per request.

use super::text_normalize::{fold_case, fold_char};
use async_trait::async_trait;
use regex::{Regex, RegexSet};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("Invalid {set} pattern #{index} ({pattern:?}): {source}")]
    InvalidPattern {
        set: &'static str,
        index: usize,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Invalid {set} rule #{index}: {message}")]
    InvalidRule {
        set: &'static str,
        index: usize,
        message: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Parse(#[from] serde_json::Error),
}

// ============================================================================
// RULE TABLE (DATA)
// ============================================================================

/// A spam or fraud pattern together with the reason reported when it fires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternRuleSpec {
    pub pattern: String,
    pub reason: String,
}

/// One spam heuristic. Rules are checked in table order; the first hit wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SpamRuleSpec {
    /// Too many links in one piece of content
    UrlFlood { min_urls: usize, reason: String },
    /// The same character repeated `min_run` times in a row (`*` excluded)
    RepeatedChar { min_run: usize, reason: String },
    /// The same word repeated `min_run` times in a row
    RepeatedWord { min_run: usize, reason: String },
    /// Free-form regex. Case-insensitive rules match the case-folded text,
    /// case-sensitive rules match the raw text.
    Pattern {
        pattern: String,
        reason: String,
        #[serde(default)]
        case_sensitive: bool,
    },
}

/// The full set of moderation rules.
///
/// Profanity patterns, safe words and fraud patterns are written against
/// case-folded text (see `fold_case`), so they are lower-case and use
/// `[iı]` wherever either letter may appear.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleTable {
    pub profanity: Vec<String>,
    #[serde(default)]
    pub safe_words: Vec<String>,
    #[serde(default)]
    pub spam: Vec<SpamRuleSpec>,
    #[serde(default)]
    pub fraud: Vec<PatternRuleSpec>,
}

fn pattern_rule(pattern: &str, reason: &str) -> PatternRuleSpec {
    PatternRuleSpec {
        pattern: pattern.to_string(),
        reason: reason.to_string(),
    }
}

impl RuleTable {
    /// The built-in Turkish lexicon.
    pub fn builtin() -> Self {
        // Leet-speak classes: i -> [iı1!], o -> [o0], e -> [e3], a -> [a4@], s -> [sş5$]
        let profanity = [
            r"s[iı1!]k[iı1!]?[t7][iı1!]r",
            r"\bs[iı1!]k\b",
            r"\ba+m+k+\b",
            r"\bam[ı1!]n[a4@]\b",
            r"[o0]r[o0][sş5$]p[uü]",
            r"\bp[iı1!]ç(?:ler|lik)?\b",
            r"\by[a4@]r+[a4@]k",
            r"\bg[ö0]t",
            r"p[e3]z[e3]v[e3]n[gk]",
            r"\b[iı1]bn[e3]\b",
            r"\bk[a4@]hp[e3]",
            r"\b[şs][e3]r[e3]fs[iı1!]z",
            r"\bg[e3]r[iı1!]z[e3]k[a4@]l[ıi1]",
        ]
        .iter()
        .map(|p| p.to_string())
        .collect();

        // Benign words that contain a flagged stem
        let safe_words = ["götür", "sikke", "siklet"]
            .iter()
            .map(|w| w.to_string())
            .collect();

        let spam = vec![
            SpamRuleSpec::UrlFlood {
                min_urls: 3,
                reason: "Too many links".to_string(),
            },
            SpamRuleSpec::RepeatedChar {
                min_run: 6,
                reason: "Repeated characters".to_string(),
            },
            SpamRuleSpec::RepeatedWord {
                min_run: 4,
                reason: "Repeated words".to_string(),
            },
            SpamRuleSpec::Pattern {
                pattern: r"[A-ZÇĞİÖŞÜ]{20,}".to_string(),
                reason: "Excessive capital letters".to_string(),
                case_sensitive: true,
            },
            SpamRuleSpec::Pattern {
                pattern: r"[!?.]{5,}".to_string(),
                reason: "Excessive punctuation".to_string(),
                case_sensitive: false,
            },
            SpamRuleSpec::Pattern {
                pattern: r"(?:kazan|ödül|hed[iı]ye|bedava|ücrets[iı]z|bonus|free|pr[iı]ze)[^\n]{0,80}(?:tıkla|l[iı]nk|cl[iı]ck|buraya)".to_string(),
                reason: "Prize or giveaway link bait".to_string(),
                case_sensitive: false,
            },
            SpamRuleSpec::Pattern {
                pattern: r"(?:telegram|whatsapp|[iı]nstagram|snapchat|d[iı]scord)[^\n]{0,60}(?:\bdm\b|özelden|özel\s*mesaj|\bpm\b)|(?:\bdm\b|özelden|özel\s*mesaj|\bpm\b)[^\n]{0,60}(?:telegram|whatsapp|[iı]nstagram|snapchat|d[iı]scord)".to_string(),
                reason: "Moving the conversation to an outside messaging app".to_string(),
                case_sensitive: false,
            },
        ];

        let phone = r"(?:\+?90|0)?\s*5\d{2}\s*\d{3}\s*\d{2}\s*\d{2}";
        let fraud = vec![
            pattern_rule(
                r"\b[iı]ban\b|hesap\s*(?:no|numara)|kart\s*(?:no|numara|b[iı]lg[iı])|kred[iı]\s*kart|banka\s*b[iı]lg[iı]|\bcvv\b",
                "Requests bank account or card details",
            ),
            pattern_rule(
                r"(?:ş[iı]fre|parola|password)[^.!?\n]{0,40}(?:gönder|ver|yaz|paylaş|söyle|send)",
                "Requests a password",
            ),
            pattern_rule(
                r"\bt\.?\s*c\.?\s*k[iı]ml[iı]k|k[iı]ml[iı]k\s*(?:no|numara|b[iı]lg[iı])",
                "Requests national ID details",
            ),
            pattern_rule(
                r"(?:ön\s*ödeme|kapora|depoz[iı]to|avans|kom[iı]syon)[^.!?\n]{0,40}(?:gönder|yatır|öde|havale)",
                "Asks for an advance payment or deposit",
            ),
            pattern_rule(
                r"\b(?:ac[iı]l|hemen|derhal|çabuk)\b[^.!?\n]{0,40}(?:para|ödeme|transfer|havale|eft)",
                "Pressures for an urgent payment",
            ),
            pattern_rule(
                r"(?:garant[iı]l[iı]?|%\s*\d+)\s*[^.!?\n]{0,30}(?:kazanç|get[iı]r[iı]|kâr)",
                "Promises guaranteed returns",
            ),
            pattern_rule(
                r"(?:b[iı]tco[iı]n|\bbtc\b|kr[iı]pto|ethereum|\busdt\b)[^.!?\n]{0,40}(?:yatırım|yatır|kazan|get[iı]r[iı]|kâr)",
                "Cryptocurrency investment pitch",
            ),
            pattern_rule(
                r"(?:evden|evde\s*oturarak|kolay\s*yoldan)[^.!?\n]{0,40}(?:para\s*kazan|kazanç)|kolay\s*para",
                "Easy money from home pitch",
            ),
            pattern_rule(
                &format!(
                    r"{phone}[^\n]{{0,40}}(?:whatsapp|telegram|\bwp\b)|(?:whatsapp|telegram|\bwp\b)[^\n]{{0,40}}{phone}"
                ),
                "Shares a phone number for an outside messaging app",
            ),
        ];

        Self {
            profanity,
            safe_words,
            spam,
            fraud,
        }
    }
}

impl Default for RuleTable {
    fn default() -> Self {
        Self::builtin()
    }
}

// ============================================================================
// COMPILED RULES
// ============================================================================

#[derive(Debug)]
pub(crate) enum SpamMatcher {
    UrlFlood { min_urls: usize },
    RepeatedChar { min_run: usize },
    RepeatedWord { min_run: usize },
    Folded(Regex),
    Raw(Regex),
}

#[derive(Debug)]
pub(crate) struct SpamRule {
    pub(crate) matcher: SpamMatcher,
    pub(crate) reason: String,
}

#[derive(Debug)]
pub(crate) struct FraudRule {
    pub(crate) regex: Regex,
    pub(crate) reason: String,
}

/// Validated rules, ready for matching. Immutable once built.
#[derive(Debug)]
pub struct CompiledRules {
    /// Prefilter telling which profanity patterns can match at all
    pub(crate) profanity_set: RegexSet,
    pub(crate) profanity: Vec<Regex>,
    /// Already case-folded
    pub(crate) safe_words: Vec<String>,
    pub(crate) url: Regex,
    pub(crate) spam: Vec<SpamRule>,
    pub(crate) fraud: Vec<FraudRule>,
}

fn compile_pattern(set: &'static str, index: usize, pattern: &str) -> Result<Regex, RuleError> {
    if pattern.trim().is_empty() {
        return Err(RuleError::InvalidRule {
            set,
            index,
            message: "empty pattern".to_string(),
        });
    }
    Regex::new(pattern).map_err(|source| RuleError::InvalidPattern {
        set,
        index,
        pattern: pattern.to_string(),
        source,
    })
}

fn check_threshold(
    set: &'static str,
    index: usize,
    value: usize,
    min: usize,
) -> Result<usize, RuleError> {
    if value < min {
        return Err(RuleError::InvalidRule {
            set,
            index,
            message: format!("threshold must be at least {min}, got {value}"),
        });
    }
    Ok(value)
}

impl CompiledRules {
    pub fn compile(table: &RuleTable) -> Result<Self, RuleError> {
        let profanity = table
            .profanity
            .iter()
            .enumerate()
            .map(|(i, p)| compile_pattern("profanity", i, p))
            .collect::<Result<Vec<_>, _>>()?;
        let profanity_set =
            RegexSet::new(&table.profanity).map_err(|source| RuleError::InvalidPattern {
                set: "profanity",
                index: 0,
                pattern: "<set>".to_string(),
                source,
            })?;

        let safe_words = table
            .safe_words
            .iter()
            .map(|w| fold_case(w.trim()))
            .filter(|w| !w.is_empty())
            .collect();

        let spam = table
            .spam
            .iter()
            .enumerate()
            .map(|(i, spec)| -> Result<SpamRule, RuleError> {
                let (matcher, reason) = match spec {
                    SpamRuleSpec::UrlFlood { min_urls, reason } => (
                        SpamMatcher::UrlFlood {
                            min_urls: check_threshold("spam", i, *min_urls, 1)?,
                        },
                        reason,
                    ),
                    SpamRuleSpec::RepeatedChar { min_run, reason } => (
                        SpamMatcher::RepeatedChar {
                            min_run: check_threshold("spam", i, *min_run, 2)?,
                        },
                        reason,
                    ),
                    SpamRuleSpec::RepeatedWord { min_run, reason } => (
                        SpamMatcher::RepeatedWord {
                            min_run: check_threshold("spam", i, *min_run, 2)?,
                        },
                        reason,
                    ),
                    SpamRuleSpec::Pattern {
                        pattern,
                        reason,
                        case_sensitive,
                    } => {
                        let regex = compile_pattern("spam", i, pattern)?;
                        let matcher = if *case_sensitive {
                            SpamMatcher::Raw(regex)
                        } else {
                            SpamMatcher::Folded(regex)
                        };
                        (matcher, reason)
                    }
                };
                Ok(SpamRule {
                    matcher,
                    reason: reason.clone(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let fraud = table
            .fraud
            .iter()
            .enumerate()
            .map(|(i, spec)| -> Result<FraudRule, RuleError> {
                Ok(FraudRule {
                    regex: compile_pattern("fraud", i, &spec.pattern)?,
                    reason: spec.reason.clone(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let url = compile_pattern("url", 0, r"(?i)\b(?:https?://|www\.)\S+")?;

        Ok(Self {
            profanity_set,
            profanity,
            safe_words,
            url,
            spam,
            fraud,
        })
    }

    pub fn profanity_count(&self) -> usize {
        self.profanity.len()
    }

    pub fn spam_count(&self) -> usize {
        self.spam.len()
    }

    pub fn fraud_count(&self) -> usize {
        self.fraud.len()
    }
}

impl SpamMatcher {
    /// `raw` is the caller's text, `folded` its case-folded copy.
    pub(crate) fn is_match(&self, raw: &str, folded: &str, url: &Regex) -> bool {
        match self {
            SpamMatcher::UrlFlood { min_urls } => {
                url.find_iter(raw).take(*min_urls).count() >= *min_urls
            }
            SpamMatcher::RepeatedChar { min_run } => has_char_run(raw, *min_run),
            SpamMatcher::RepeatedWord { min_run } => has_word_run(folded, *min_run),
            SpamMatcher::Folded(regex) => regex.is_match(folded),
            SpamMatcher::Raw(regex) => regex.is_match(raw),
        }
    }
}

/// True when one character appears `min_run` times in a row, ignoring case.
/// Censor asterisks are never counted.
fn has_char_run(text: &str, min_run: usize) -> bool {
    let mut previous: Option<char> = None;
    let mut run = 0;
    for c in text.chars().map(fold_char) {
        if c == '*' {
            previous = None;
            run = 0;
            continue;
        }
        if previous == Some(c) {
            run += 1;
        } else {
            previous = Some(c);
            run = 1;
        }
        if run >= min_run {
            return true;
        }
    }
    false
}

/// True when the same word appears `min_run` times in a row, separated only by
/// whitespace. Punctuation hugging a word is ignored.
fn has_word_run(folded: &str, min_run: usize) -> bool {
    let mut previous: Option<&str> = None;
    let mut run = 0;
    for token in folded.split_whitespace() {
        let word = token.trim_matches(|c: char| !c.is_alphanumeric());
        if word.is_empty() {
            previous = None;
            run = 0;
            continue;
        }
        if previous == Some(word) {
            run += 1;
        } else {
            previous = Some(word);
            run = 1;
        }
        if run >= min_run {
            return true;
        }
    }
    false
}

// ============================================================================
// RULE SOURCE (PORT)
// ============================================================================

/// Where the rule table comes from. Loaded once at start-up.
#[async_trait]
pub trait RuleSource: Send + Sync {
    async fn load(&self) -> Result<RuleTable, RuleError>;

    /// Human-readable origin, for start-up logs
    fn describe(&self) -> String;
}

/// Serves the compiled-in lexicon.
pub struct BuiltinRuleSource;

#[async_trait]
impl RuleSource for BuiltinRuleSource {
    async fn load(&self) -> Result<RuleTable, RuleError> {
        Ok(RuleTable::builtin())
    }

    fn describe(&self) -> String {
        "built-in lexicon".to_string()
    }
}

// ============================================================================
// TESTS
// ============================================================================
