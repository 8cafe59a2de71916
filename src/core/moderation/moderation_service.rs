// Moderation engine - core business logic for the content filter.
//
// This service handles:
// - Profanity detection (with leet-speak variants and safe-word exceptions)
// - Spam heuristics (links, repetition, shouting, bait phrases)
// - Fraud patterns (only for contexts where users solicit each other)
// - Censoring flagged terms in the returned text
//
// NO transport or database dependencies here - just pure domain logic.
// The engine is immutable after construction; share it behind an `Arc`.

use super::moderation_models::{Context, ModerationVerdict, PatternHit, ProfanityMatch, Severity};
use super::moderation_rules::{CompiledRules, RuleError, RuleTable};
use super::text_normalize::{censor_term, fold_case, strip_safe_words};

pub const PROFANITY_REASON: &str = "Content contains profanity";
pub const SAFETY_REVIEW_NOTICE: &str = "This content will be reviewed by our safety team.";

/// Rule-based content classifier.
#[derive(Debug)]
pub struct ModerationEngine {
    rules: CompiledRules,
}

impl ModerationEngine {
    /// Compile the given rule table. Fails on the first invalid rule.
    pub fn new(table: &RuleTable) -> Result<Self, RuleError> {
        let rules = CompiledRules::compile(table)?;
        tracing::info!(
            profanity = rules.profanity_count(),
            safe_words = rules.safe_words.len(),
            spam = rules.spam_count(),
            fraud = rules.fraud_count(),
            "Moderation rules compiled"
        );
        Ok(Self { rules })
    }

    /// Engine over the built-in lexicon.
    pub fn builtin() -> Result<Self, RuleError> {
        Self::new(&RuleTable::builtin())
    }

    /// Find profane terms in `text`.
    ///
    /// Matching runs on a case-folded working copy with safe words removed;
    /// `text` itself is untouched. Terms come back in pattern order, then in
    /// position order, and the same term may appear more than once.
    pub fn check_profanity(&self, text: &str) -> ProfanityMatch {
        let working = strip_safe_words(&fold_case(text), &self.rules.safe_words);

        let matched_terms: Vec<String> = self
            .rules
            .profanity_set
            .matches(&working)
            .into_iter()
            .flat_map(|index| {
                self.rules.profanity[index]
                    .find_iter(&working)
                    .map(|m| m.as_str().to_string())
                    .collect::<Vec<_>>()
            })
            .collect();

        ProfanityMatch {
            found: !matched_terms.is_empty(),
            matched_terms,
        }
    }

    /// First spam rule that fires, if any.
    pub fn check_spam(&self, text: &str) -> Option<PatternHit> {
        let folded = fold_case(text);
        self.rules
            .spam
            .iter()
            .find(|rule| rule.matcher.is_match(text, &folded, &self.rules.url))
            .map(|rule| PatternHit {
                reason: rule.reason.clone(),
            })
    }

    /// First fraud rule that fires, if any. Ignores context; see `moderate`.
    pub fn check_fraud(&self, text: &str) -> Option<PatternHit> {
        let folded = fold_case(text);
        self.rules
            .fraud
            .iter()
            .find(|rule| rule.regex.is_match(&folded))
            .map(|rule| PatternHit {
                reason: rule.reason.clone(),
            })
    }

    /// Classify one piece of user content.
    ///
    /// Checks run in a fixed order: profanity, spam, then fraud when the
    /// context allows it. Blank input returns the default safe verdict.
    pub fn moderate(&self, text: &str, context: Context) -> ModerationVerdict {
        let mut verdict = ModerationVerdict::safe(text);
        if text.trim().is_empty() {
            return verdict;
        }

        let profanity = self.check_profanity(text);
        if profanity.found {
            verdict.is_safe = false;
            verdict.should_block = true;
            verdict.reasons.push(PROFANITY_REASON.to_string());
            verdict.severity = verdict.severity.raise(Severity::High);
            verdict.filtered_text = self.censor(text, &profanity.matched_terms);
        }

        if let Some(spam) = self.check_spam(text) {
            verdict.is_safe = false;
            verdict.warnings.push(spam.reason);
            verdict.severity = verdict.severity.raise(Severity::Medium);
        }

        if context.runs_fraud_check() {
            if let Some(fraud) = self.check_fraud(text) {
                verdict.is_safe = false;
                verdict.should_block = true;
                verdict.reasons.push(fraud.reason);
                verdict.severity = Severity::Critical;
                verdict.warnings.push(SAFETY_REVIEW_NOTICE.to_string());
            }
        }

        if !verdict.is_safe {
            tracing::debug!(
                context = %context,
                severity = %verdict.severity,
                should_block = verdict.should_block,
                reasons = ?verdict.reasons,
                warnings = ?verdict.warnings,
                "Content flagged"
            );
        }

        verdict
    }

    /// Censor `terms` in `text`, then keep censoring whatever the profanity
    /// check still finds until a pass changes nothing.
    ///
    /// An asterisk next to an untouched word adds a word boundary, so a second
    /// pass can match a stem the first one could not. Each pass that changes
    /// the text turns at least one more char into `*`, so the loop ends.
    fn censor(&self, text: &str, terms: &[String]) -> String {
        let mut filtered = censor_all(text, terms);
        loop {
            let again = self.check_profanity(&filtered);
            let next = censor_all(&filtered, &again.matched_terms);
            if next == filtered {
                return filtered;
            }
            filtered = next;
        }
    }

    /// Censored text only, using the general context.
    pub fn filter_text(&self, text: &str) -> String {
        self.moderate(text, Context::General).filtered_text
    }

    pub fn is_safe_content(&self, text: &str, context: Context) -> bool {
        self.moderate(text, context).is_safe
    }
}

fn censor_all(input: &str, terms: &[String]) -> String {
    terms
        .iter()
        .fold(input.to_string(), |filtered, term| censor_term(&filtered, term))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::moderation::moderation_rules::PatternRuleSpec;
    use std::sync::Arc;

    fn engine() -> ModerationEngine {
        ModerationEngine::builtin().unwrap()
    }

    const FRAUD_TEXT: &str = "IBAN numaramı gönder, hemen para transfer et";

    #[test]
    fn test_clean_text_is_safe() {
        let verdict = engine().moderate("Bu çok güzel bir proje, tebrikler!", Context::General);

        assert!(verdict.is_safe);
        assert!(!verdict.should_block);
        assert_eq!(verdict.severity, Severity::Low);
        assert_eq!(verdict.filtered_text, "Bu çok güzel bir proje, tebrikler!");
    }

    #[test]
    fn test_masked_profanity_is_blocked_and_censored() {
        let verdict = engine().moderate("Bu adam s1kt1r olsun", Context::General);

        assert!(!verdict.is_safe);
        assert!(verdict.should_block);
        assert_eq!(verdict.severity, Severity::High);
        assert_eq!(verdict.reasons, vec![PROFANITY_REASON.to_string()]);
        assert_eq!(verdict.filtered_text, "Bu adam s***** olsun");
    }

    #[test]
    fn test_leet_variants_are_detected() {
        let engine = engine();
        for text in ["siktir", "s!kt!r", "SİKTİR", "0r0spu", "or0$pu", "pez3venk", "y4rrak"] {
            let verdict = engine.moderate(text, Context::Post);
            assert!(verdict.should_block, "{text} should be blocked");
            assert_eq!(verdict.severity, Severity::High, "{text}");
        }
    }

    #[test]
    fn test_censor_keeps_original_casing_outside_term() {
        let filtered = engine().filter_text("Hadi SİKTİR git, Ahmet!");
        assert_eq!(filtered, "Hadi S***** git, Ahmet!");
    }

    #[test]
    fn test_spam_only_warns() {
        let verdict = engine().moderate(
            "KAZANIN! ücretsiz bonus tıklayın http://a.co http://b.co http://c.co",
            Context::General,
        );

        assert!(!verdict.is_safe);
        assert!(!verdict.should_block);
        assert_eq!(verdict.severity, Severity::Medium);
        assert_eq!(verdict.warnings, vec!["Too many links".to_string()]);
        assert!(verdict.reasons.is_empty());
    }

    #[test]
    fn test_spam_heuristics_priority() {
        let engine = engine();
        let reason = |text: &str| engine.check_spam(text).map(|hit| hit.reason);

        assert_eq!(reason("harikaaaaaaa"), Some("Repeated characters".to_string()));
        assert_eq!(reason("Bekle------ lütfen"), Some("Repeated characters".to_string()));
        assert_eq!(reason("tamam      bitti"), Some("Repeated characters".to_string()));
        assert_eq!(reason("gel gel gel gel"), Some("Repeated words".to_string()));
        assert_eq!(
            reason("HEMENKAYITOLUNKAMPANYABITIYOR"),
            Some("Excessive capital letters".to_string())
        );
        assert_eq!(reason("ne?!?!?"), Some("Excessive punctuation".to_string()));
        assert_eq!(
            reason("Hediye kazanmak için buraya tıkla"),
            Some("Prize or giveaway link bait".to_string())
        );
        assert_eq!(
            reason("telegram adresim var, özelden yaz"),
            Some("Moving the conversation to an outside messaging app".to_string())
        );
        assert_eq!(reason("Yarın toplantı saat üçte."), None);
    }

    #[test]
    fn test_fraud_in_message_is_critical() {
        let verdict = engine().moderate(FRAUD_TEXT, Context::Message);

        assert!(!verdict.is_safe);
        assert!(verdict.should_block);
        assert_eq!(verdict.severity, Severity::Critical);
        assert_eq!(
            verdict.reasons,
            vec!["Requests bank account or card details".to_string()]
        );
        assert!(verdict.warnings.contains(&SAFETY_REVIEW_NOTICE.to_string()));
    }

    #[test]
    fn test_fraud_gated_by_context() {
        let engine = engine();

        let verdict = engine.moderate(FRAUD_TEXT, Context::Profile);
        assert!(verdict.is_safe);
        assert!(!verdict.should_block);
        assert_eq!(verdict.severity, Severity::Low);

        for context in [Context::General, Context::Post] {
            assert!(engine.is_safe_content(FRAUD_TEXT, context), "{context}");
        }
        for context in [Context::Message, Context::Comment, Context::Service] {
            assert!(!engine.is_safe_content(FRAUD_TEXT, context), "{context}");
        }
    }

    #[test]
    fn test_fraud_patterns() {
        let engine = engine();
        let reason = |text: &str| engine.check_fraud(text).map(|hit| hit.reason);

        assert_eq!(
            reason("Şifreni bana gönder lütfen"),
            Some("Requests a password".to_string())
        );
        assert_eq!(
            reason("TC kimlik numaranı yazar mısın"),
            Some("Requests national ID details".to_string())
        );
        assert_eq!(
            reason("Önce kapora gönder sonra ürünü yollarım"),
            Some("Asks for an advance payment or deposit".to_string())
        );
        assert_eq!(
            reason("Garantili %40 kazanç sağlıyoruz"),
            Some("Promises guaranteed returns".to_string())
        );
        assert_eq!(
            reason("Bitcoin ile yatırım yap, zengin ol"),
            Some("Cryptocurrency investment pitch".to_string())
        );
        assert_eq!(
            reason("Evden günde 500 TL para kazanın"),
            Some("Easy money from home pitch".to_string())
        );
        assert_eq!(
            reason("Detaylar için 0532 123 45 67 whatsapp"),
            Some("Shares a phone number for an outside messaging app".to_string())
        );
        assert_eq!(reason("Etkinlik cumartesi günü parkta."), None);
    }

    #[test]
    fn test_blank_input_is_default_verdict_in_every_context() {
        let engine = engine();
        for text in ["", "   ", "\n\t "] {
            for context in Context::ALL {
                assert_eq!(engine.moderate(text, context), ModerationVerdict::safe(text));
            }
        }
    }

    #[test]
    fn test_filtering_is_idempotent() {
        let engine = engine();
        for text in [
            "Bu adam s1kt1r olsun",
            "orospu ve pezevenk, ikisi de",
            "Hadi SİKTİR git!",
            "tamamen temiz bir cümle",
            "siktirgöt",
            "siktirpiç",
            "SİKTİRGÖT ve s1kt1rp!ç",
        ] {
            let once = engine.filter_text(text);
            assert_eq!(engine.filter_text(&once), once, "{text}");
        }
    }

    #[test]
    fn test_censoring_reaches_stems_exposed_by_earlier_asterisks() {
        let engine = engine();

        assert_eq!(engine.filter_text("siktirgöt"), "s*****g**");
        assert_eq!(engine.filter_text("siktirpiç"), "s*****p**");
        assert_eq!(engine.filter_text("SİKTİRGÖT"), "S*****G**");
    }

    #[test]
    fn test_safe_word_alone_is_not_profane() {
        let engine = engine();
        for word in RuleTable::builtin().safe_words {
            assert!(!engine.check_profanity(&word).found, "{word}");
        }
        assert!(!engine.check_profanity("Paketi yarın götürürüm").found);
        assert!(engine.check_profanity("göt").found);
    }

    #[test]
    fn test_profanity_severity_not_lowered_by_spam() {
        let verdict = engine().moderate("siktir siktir siktir siktir", Context::General);

        assert!(verdict.should_block);
        assert_eq!(verdict.warnings, vec!["Repeated words".to_string()]);
        assert_eq!(verdict.severity, Severity::High);
        assert_eq!(verdict.filtered_text, "s***** s***** s***** s*****");
    }

    #[test]
    fn test_fraud_overrides_profanity_severity() {
        let verdict = engine().moderate("siktir git, iban numaranı at", Context::Comment);

        assert_eq!(verdict.severity, Severity::Critical);
        assert_eq!(verdict.reasons.len(), 2);
        assert_eq!(verdict.reasons[0], PROFANITY_REASON);
        assert!(verdict.should_block);
    }

    #[test]
    fn test_matched_terms_keep_discovery_order_and_duplicates() {
        let found = engine().check_profanity("pezevenk siktir pezevenk");

        assert!(found.found);
        assert_eq!(
            found.matched_terms,
            vec![
                "siktir".to_string(),
                "pezevenk".to_string(),
                "pezevenk".to_string()
            ]
        );
    }

    #[test]
    fn test_custom_rule_table() {
        let table = RuleTable {
            profanity: vec![r"\bfoo\b".to_string()],
            safe_words: vec!["foobar".to_string()],
            spam: vec![],
            fraud: vec![PatternRuleSpec {
                pattern: "wire me".to_string(),
                reason: "Wire request".to_string(),
            }],
        };
        let engine = ModerationEngine::new(&table).unwrap();

        assert!(engine.check_profanity("FOO!").found);
        assert!(!engine.check_profanity("foobar").found);
        let verdict = engine.moderate("please wire me", Context::Service);
        assert_eq!(verdict.reasons, vec!["Wire request".to_string()]);
    }

    #[test]
    fn test_adversarial_input_still_yields_verdict() {
        let engine = engine();
        let long = "a".repeat(200_000);
        assert!(!engine.moderate(&long, Context::Message).is_safe);

        let odd = "\u{202e}İ\u{0307}\u{200b}ﬁ🙂ß";
        let verdict = engine.moderate(odd, Context::Message);
        assert_eq!(verdict.filtered_text, odd);
    }

    #[test]
    fn test_engine_is_shareable_across_threads() {
        let engine = Arc::new(engine());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let engine = Arc::clone(&engine);
                std::thread::spawn(move || engine.moderate(FRAUD_TEXT, Context::Message).severity)
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), Severity::Critical);
        }
    }
}
