pub mod attendance;
pub mod students;
pub mod subjects;

pub use attendance::AttendanceRepository;
pub use students::StudentRepository;
pub use subjects::SubjectRepository;

/// Search keyword folded for matching; `None` when it is blank.
fn fold_keyword(keyword: &str) -> Option<String> {
    let k = keyword.trim();
    (!k.is_empty()).then(|| k.to_lowercase())
}

/// Unicode case-insensitive substring test against a folded keyword.
/// SQLite's `LIKE` only folds ASCII, so matching happens here.
fn matches_folded(field: &str, folded: &str) -> bool {
    field.to_lowercase().contains(folded)
}

#[cfg(test)]
mod tests {
    use super::{fold_keyword, matches_folded};

    #[test]
    fn folding_handles_non_ascii_letters() {
        let k = fold_keyword(" ÉLODIE ").expect("keyword");
        assert_eq!(k, "élodie");
        assert!(matches_folded("Élodie Durand", &k));
        assert!(matches_folded("ÖZGÜR", "özg"));
        assert!(!matches_folded("Elodie", &k));
        assert!(matches_folded("50% off_", "0% off_"));
    }

    #[test]
    fn blank_keyword_folds_to_none() {
        assert_eq!(fold_keyword("   "), None);
        assert_eq!(fold_keyword(""), None);
    }
}
