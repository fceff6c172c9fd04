//! PII masking for review and reply text.
//!
//! Rules run in a fixed order and each one sees the output of the previous
//! one, so greeting spellings are fixed before the greeting rule runs and the
//! capitalized-line rule only sees text that survived the earlier masks.

use anyhow::Result;
use regex::Regex;

/// Placeholder for e-mail addresses
pub const EMAIL_PLACEHOLDER: &str = "[EMAIL_SUPPRIMÉ]";
/// Placeholder for phone numbers
pub const PHONE_PLACEHOLDER: &str = "[TÉLÉPHONE_SUPPRIMÉ]";
/// Placeholder for person names
pub const NAME_PLACEHOLDER: &str = "[NOM_ANONYMISÉ]";

/// Ordered set of masking rules
pub struct Anonymizer {
    email_regex: Regex,
    phone_regex: Regex,
    greeting_typo_regex: Regex,
    greeting_name_regex: Regex,
    title_name_regex: Regex,
    name_line_regex: Regex,
}

impl Anonymizer {
    /// Compile the masking rules
    pub fn new() -> Result<Self> {
        let email_regex = Regex::new(r"\b[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}\b")
            .map_err(|e| anyhow::anyhow!("Failed to compile email regex: {e}"))?;
        // Local (0X XX XX XX XX) and international (+33 ...) numbers
        let phone_regex = Regex::new(r"(?:\+33\s*\(?0?\)?|0)[1-9](?:[\s.\-]?\d{2}){4}")
            .map_err(|e| anyhow::anyhow!("Failed to compile phone regex: {e}"))?;
        let greeting_typo_regex = Regex::new(r"(?im)^(Bonour|Bonnour|Bonjouir|Bonsoir|Bonoir)")
            .map_err(|e| anyhow::anyhow!("Failed to compile greeting regex: {e}"))?;
        let greeting_name_regex = Regex::new(r"(?im)^Bonjour\s+[^\n,]+(?:\s*,)?\s*$")
            .map_err(|e| anyhow::anyhow!("Failed to compile greeting name regex: {e}"))?;
        let title_name_regex = Regex::new(
            r"(?i)\b(MR|M|MME|Mme|Monsieur|Madame|Melle)\s+[A-Za-zÀ-ÖØ-öø-ÿ-]+(?:\s+[A-Za-zÀ-ÖØ-öø-ÿ-]+)*\b",
        )
        .map_err(|e| anyhow::anyhow!("Failed to compile title regex: {e}"))?;
        let name_line_regex =
            Regex::new(r"(?m)^(?:[A-ZÀ-ÖØ-Þ][a-zà-öø-ÿ-]+)(?:\s+[A-ZÀ-ÖØ-Þ][a-zà-öø-ÿ-]+)*[.,]?$")
                .map_err(|e| anyhow::anyhow!("Failed to compile name line regex: {e}"))?;

        Ok(Self {
            email_regex,
            phone_regex,
            greeting_typo_regex,
            greeting_name_regex,
            title_name_regex,
            name_line_regex,
        })
    }

    /// Mask e-mails, phone numbers, greetings and name-like tokens
    #[must_use]
    pub fn anonymize(&self, text: &str) -> String {
        let text = self.email_regex.replace_all(text, EMAIL_PLACEHOLDER);
        let text = self.phone_regex.replace_all(&text, PHONE_PLACEHOLDER);
        let text = self.greeting_typo_regex.replace_all(&text, "Bonjour");
        let greeting = format!("Bonjour {NAME_PLACEHOLDER},");
        let text = self.greeting_name_regex.replace_all(&text, greeting.as_str());
        let text = self.title_name_regex.replace_all(&text, NAME_PLACEHOLDER);

        // TODO: all-capitalized enterprise lines ("Service Client") are masked too; needs an allow-list.
        self.name_line_regex.replace_all(&text, NAME_PLACEHOLDER).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anonymizer() -> Anonymizer {
        Anonymizer::new().expect("Failed to compile anonymizer")
    }

    #[test]
    fn test_email_masked() {
        let out = anonymizer().anonymize("Contactez moi a jean.dupont@mail.com");
        assert!(out.contains(EMAIL_PLACEHOLDER));
        assert!(!out.contains("jean.dupont@mail.com"));
    }

    #[test]
    fn test_phone_formats_masked() {
        let a = anonymizer();
        for number in ["06 12 34 56 78", "0612345678", "01.23.45.67.89", "+33 6 12 34 56 78", "+33(0)612345678"] {
            let out = a.anonymize(&format!("appelez le {number} svp"));
            assert!(out.contains(PHONE_PLACEHOLDER), "not masked: {number} -> {out}");
        }
    }

    #[test]
    fn test_greeting_with_name() {
        let a = anonymizer();
        assert_eq!(a.anonymize("Bonsoir Julie,"), "Bonjour [NOM_ANONYMISÉ],");
        assert_eq!(a.anonymize("bonjour Marc"), "Bonjour [NOM_ANONYMISÉ],");
    }

    #[test]
    fn test_title_and_name() {
        let out = anonymizer().anonymize("merci à Madame Durand");
        assert_eq!(out, "merci à [NOM_ANONYMISÉ]");
    }

    #[test]
    fn test_capitalized_line() {
        assert_eq!(anonymizer().anonymize("Jean Dupont."), NAME_PLACEHOLDER);
    }

    #[test]
    fn test_plain_text_untouched() {
        let text = "Livraison rapide, produit conforme à la description.";
        assert_eq!(anonymizer().anonymize(text), text);
    }
}
