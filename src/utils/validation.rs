//! Centralized input validation and limits.

use crate::core::search::Search;

/// Maximum number of searches or identifiers in a single bulk request (DOS protection)
pub const MAX_BATCH_SIZE: usize = 10_000;

/// Maximum length of any single text field, in bytes
pub const MAX_FIELD_LENGTH: usize = 1_000;

/// Maximum number of hinted ranks, and of values per hinted rank
pub const MAX_HINT_RANKS: usize = 16;
pub const MAX_HINT_VALUES: usize = 64;

/// Upper bound for result list sizes (autocomplete, common names)
pub const MAX_RESULTS: usize = 100;

/// Input validation error types
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Field '{0}' exceeds {MAX_FIELD_LENGTH} characters")]
    FieldTooLong(String),
    #[error("Batch of {0} items exceeds maximum of {MAX_BATCH_SIZE}")]
    BatchTooLarge(usize),
    #[error("Too many hints: at most {MAX_HINT_RANKS} ranks of {MAX_HINT_VALUES} values")]
    TooManyHints,
    #[error("Invalid identifier: empty or contains control characters")]
    InvalidIdentifier,
    #[error("Empty query")]
    EmptyQuery,
}

/// Check if a batch of the given size may be processed.
///
/// Returns an error message if the batch is too large, None if safe to process.
#[must_use]
pub fn check_batch_limit(count: usize) -> Option<String> {
    if count > MAX_BATCH_SIZE {
        Some(format!(
            "Too many items: {count} exceeds maximum of {MAX_BATCH_SIZE}"
        ))
    } else {
        None
    }
}

/// Validate an opaque identifier: non-blank, bounded, and free of control characters.
///
/// # Errors
///
/// Returns `ValidationError::InvalidIdentifier` for blank identifiers or identifiers
/// with control characters, `ValidationError::FieldTooLong` if over the length limit.
pub fn validate_identifier(id: &str) -> Result<&str, ValidationError> {
    if id.trim().is_empty() || id.chars().any(char::is_control) {
        return Err(ValidationError::InvalidIdentifier);
    }
    if id.len() > MAX_FIELD_LENGTH {
        return Err(ValidationError::FieldTooLong("identifier".to_string()));
    }
    Ok(id)
}

/// Validate a free-text query parameter such as a name to search for.
///
/// # Errors
///
/// Returns `ValidationError::EmptyQuery` for blank text or
/// `ValidationError::FieldTooLong` if over the length limit.
pub fn validate_text<'a>(field: &str, text: &'a str) -> Result<&'a str, ValidationError> {
    if text.trim().is_empty() {
        return Err(ValidationError::EmptyQuery);
    }
    if text.len() > MAX_FIELD_LENGTH {
        return Err(ValidationError::FieldTooLong(field.to_string()));
    }
    Ok(text)
}

/// Validate all fields of a search before it reaches the matcher.
///
/// # Errors
///
/// Returns `ValidationError::FieldTooLong` for oversized fields,
/// `ValidationError::TooManyHints` for oversized hint maps, or
/// `ValidationError::InvalidIdentifier` for malformed identifiers.
pub fn validate_search(search: &Search) -> Result<(), ValidationError> {
    let text_fields = [
        ("kingdom", &search.kingdom),
        ("phylum", &search.phylum),
        ("class", &search.class),
        ("order", &search.order),
        ("family", &search.family),
        ("genus", &search.genus),
        ("specificEpithet", &search.specific_epithet),
        ("infraspecificEpithet", &search.infraspecific_epithet),
        ("scientificName", &search.scientific_name),
        ("scientificNameAuthorship", &search.scientific_name_authorship),
        ("vernacularName", &search.vernacular_name),
        ("rank", &search.rank),
    ];
    for (name, value) in text_fields {
        if value.as_ref().is_some_and(|v| v.len() > MAX_FIELD_LENGTH) {
            return Err(ValidationError::FieldTooLong(name.to_string()));
        }
    }

    for id in [&search.taxon_concept_id, &search.taxon_id].into_iter().flatten() {
        validate_identifier(id)?;
    }

    if search.hints.len() > MAX_HINT_RANKS
        || search.hints.values().any(|v| v.len() > MAX_HINT_VALUES)
    {
        return Err(ValidationError::TooManyHints);
    }
    for (rank, values) in &search.hints {
        if rank.len() > MAX_FIELD_LENGTH || values.iter().any(|v| v.len() > MAX_FIELD_LENGTH) {
            return Err(ValidationError::FieldTooLong(format!("hints.{rank}")));
        }
    }

    Ok(())
}

/// Clamp a requested result count into `1..=MAX_RESULTS`, using `default` when absent
#[must_use]
pub fn clamp_max_results(requested: Option<usize>, default: usize) -> usize {
    requested.unwrap_or(default).clamp(1, MAX_RESULTS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_batch_limit() {
        assert!(check_batch_limit(0).is_none());
        assert!(check_batch_limit(MAX_BATCH_SIZE).is_none());
        assert!(check_batch_limit(MAX_BATCH_SIZE + 1).is_some());
    }

    #[test]
    fn test_validate_identifier() {
        assert!(validate_identifier("https://id.biodiversity.org.au/node/apni/2912252").is_ok());
        assert_eq!(
            validate_identifier("   "),
            Err(ValidationError::InvalidIdentifier)
        );
        assert_eq!(
            validate_identifier("abc\0def"),
            Err(ValidationError::InvalidIdentifier)
        );
        let long = "x".repeat(MAX_FIELD_LENGTH + 1);
        assert!(matches!(
            validate_identifier(&long),
            Err(ValidationError::FieldTooLong(_))
        ));
    }

    #[test]
    fn test_validate_text() {
        assert_eq!(validate_text("q", "Acacia"), Ok("Acacia"));
        assert_eq!(validate_text("q", " "), Err(ValidationError::EmptyQuery));
    }

    #[test]
    fn test_validate_search_limits() {
        assert!(validate_search(&Search::named("Acacia dealbata")).is_ok());

        let long = Search::named("a".repeat(MAX_FIELD_LENGTH + 1));
        assert_eq!(
            validate_search(&long),
            Err(ValidationError::FieldTooLong("scientificName".to_string()))
        );

        let mut many_hints = Search::named("Acacia");
        for i in 0..=MAX_HINT_RANKS {
            many_hints = many_hints.with_hint(&format!("rank{i}"), ["x"]);
        }
        assert_eq!(validate_search(&many_hints), Err(ValidationError::TooManyHints));

        let bad_id = Search::by_id("bad\nid");
        assert_eq!(
            validate_search(&bad_id),
            Err(ValidationError::InvalidIdentifier)
        );
    }

    #[test]
    fn test_clamp_max_results() {
        assert_eq!(clamp_max_results(None, 10), 10);
        assert_eq!(clamp_max_results(Some(0), 10), 1);
        assert_eq!(clamp_max_results(Some(10_000), 10), MAX_RESULTS);
    }
}
