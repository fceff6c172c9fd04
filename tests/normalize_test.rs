//! Tests for text cleanup and PII masking

use review_etl::anonymize::{Anonymizer, EMAIL_PLACEHOLDER, NAME_PLACEHOLDER, PHONE_PLACEHOLDER};
use review_etl::normalize::{clean_text, format_date, to_float, to_int, truncate_chars, MAX_TEXT_LENGTH};
use serde_json::json;

fn anonymizer() -> Anonymizer {
    Anonymizer::new().expect("Failed to compile anonymizer")
}

#[test]
fn test_email_is_masked() {
    let output = anonymizer().anonymize("Contactez moi a jean.dupont@mail.com");

    assert!(output.contains(EMAIL_PLACEHOLDER));
    assert!(!output.contains("jean.dupont@mail.com"));
}

#[test]
fn test_phone_is_masked_inside_sentence() {
    let output = anonymizer().anonymize("Rappelez moi au 06.12.34.56.78 merci");

    assert_eq!(output, format!("Rappelez moi au {PHONE_PLACEHOLDER} merci"));
}

#[test]
fn test_greeting_typo_then_name() {
    let output = anonymizer().anonymize("Bonour Sophie,\nmerci pour votre commande");

    assert!(output.starts_with(&format!("Bonjour {NAME_PLACEHOLDER},")));
    assert!(output.contains("merci pour votre commande"));
    assert!(!output.contains("Sophie"));
}

#[test]
fn test_title_and_name_masked_case_insensitive() {
    let output = anonymizer().anonymize("le livreur mr martin était en retard");
    assert!(output.contains(NAME_PLACEHOLDER));
    assert!(!output.contains("martin"));
}

#[test]
fn test_signature_line_is_masked() {
    let output = anonymizer().anonymize("Le colis est arrivé cassé.\nPaul Durand");
    assert_eq!(output, format!("Le colis est arrivé cassé.\n{NAME_PLACEHOLDER}"));
}

#[test]
fn test_rules_compose_on_one_text() {
    let text = "Bonjour Claire,\nécrivez à claire@example.fr ou au +33 6 12 34 56 78";
    let output = anonymizer().anonymize(text);

    assert!(output.contains(EMAIL_PLACEHOLDER));
    assert!(output.contains(PHONE_PLACEHOLDER));
    assert!(!output.contains("Claire"));
}

#[test]
fn test_clean_text_truncates_to_limit() {
    let long = "a".repeat(MAX_TEXT_LENGTH + 100);
    let cleaned = clean_text(Some(&long), MAX_TEXT_LENGTH).expect("text should survive");
    assert_eq!(cleaned.chars().count(), MAX_TEXT_LENGTH);
}

#[test]
fn test_clean_text_keeps_accents() {
    assert_eq!(
        clean_text(Some("Livraison   très\u{00a0}rapide"), MAX_TEXT_LENGTH).as_deref(),
        Some("Livraison très rapide")
    );
}

#[test]
fn test_clean_text_rejects_emoji_only() {
    assert_eq!(clean_text(Some("👍👍 !!"), MAX_TEXT_LENGTH), None);
}

#[test]
fn test_truncate_multibyte() {
    assert_eq!(truncate_chars("çàéù", 3), "çàé");
}

#[test]
fn test_tolerant_numbers() {
    assert_eq!(to_float(Some(&json!("3.5"))), 3.5);
    assert_eq!(to_float(Some(&json!({"value": 1}))), 0.0);
    assert_eq!(to_int(Some(&json!(25_000))), 25_000);
    assert_eq!(to_int(Some(&json!("beaucoup"))), 0);
}

#[test]
fn test_dates_truncated_to_day() {
    assert_eq!(format_date(Some("2023-12-31T23:59:59Z")).as_deref(), Some("2023-12-31"));
    assert_eq!(format_date(Some("2023-02-30T10:00:00Z")), None);
    assert_eq!(format_date(Some("")), None);
}
