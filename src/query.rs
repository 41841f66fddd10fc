//! Advanced-search query building and SQL identifier hygiene.
//!
//! Schema and table names are derived from request input (dataset name,
//! epoch, table suffix), so every component is checked against an
//! alphanumeric/underscore allow-list before it may be interpolated into a
//! statement. Value-position inputs (entity ids, language codes) never go
//! through here — the store binds those as parameters.

use thiserror::Error;

use crate::models::SearchFilter;

/// Sentinel language code meaning "do not filter by language".
pub const ALL_LANGUAGES: &str = "all";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    /// The raw items text was non-empty but no token survived validation.
    #[error("Query items not valid!")]
    InvalidItems,

    /// A schema/table-name component failed the identifier allow-list.
    #[error("unsafe identifier: '{0}'")]
    UnsafeIdentifier(String),
}

/// True if `s` is non-empty ASCII alphanumeric/underscore — safe to embed
/// in a schema-qualified table reference.
pub fn is_safe_identifier(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Composes the backtick-quoted ``` `dataset`.`dataset_epoch[_suffix]` ```
/// reference used by every per-epoch table query.
pub fn table_ref(dataset: &str, epoch: &str, suffix: Option<&str>) -> Result<String, QueryError> {
    for part in [dataset, epoch].into_iter().chain(suffix) {
        if !is_safe_identifier(part) {
            return Err(QueryError::UnsafeIdentifier(part.to_string()));
        }
    }

    let table = match suffix {
        Some(suffix) => format!("{}_{}_{}", dataset, epoch, suffix),
        None => format!("{}_{}", dataset, epoch),
    };
    Ok(format!("`{}`.`{}`", dataset, table))
}

/// Schema-qualified reference to a fixed (non-epoch) table, e.g. the
/// `updatecount_stats` table inside a dataset schema.
pub fn schema_table_ref(schema: &str, table: &str) -> Result<String, QueryError> {
    for part in [schema, table] {
        if !is_safe_identifier(part) {
            return Err(QueryError::UnsafeIdentifier(part.to_string()));
        }
    }
    Ok(format!("`{}`.`{}`", schema, table))
}

/// True for a Wikidata-style entity id: one `Q` or `q`, then digits.
fn is_entity_id(token: &str) -> bool {
    let mut chars = token.chars();
    matches!(chars.next(), Some('Q') | Some('q')) && {
        let rest = chars.as_str();
        !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit())
    }
}

/// Parses the free-form items text: split on commas, trim, keep entity ids
/// (case preserved). An empty input parses to no tokens; a non-empty input
/// from which nothing survives is the invalid-search-input condition.
pub fn parse_entity_items(raw: &str) -> Result<Vec<String>, QueryError> {
    if raw.is_empty() {
        return Ok(Vec::new());
    }

    let items: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|token| is_entity_id(token))
        .map(str::to_string)
        .collect();

    if items.is_empty() {
        return Err(QueryError::InvalidItems);
    }
    Ok(items)
}

/// A validated, executable advanced-search query.
///
/// Predicates are carried as data; the store renders them into SQL with
/// bound parameters. Empty `items` / `languages` mean the corresponding
/// predicate is absent, so a fully empty query is an unfiltered table scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub dataset: String,
    pub epoch: String,
    /// Entity ids the `qNumber` column must equal one of.
    pub items: Vec<String>,
    /// Language codes the `languages` column must contain one of
    /// (substring match, OR-combined).
    pub languages: Vec<String>,
}

impl SearchQuery {
    /// Builds the query from a request filter. Epoch validity against the
    /// resolved epoch list is the caller's responsibility.
    pub fn build(filter: &SearchFilter) -> Result<Self, QueryError> {
        let items = parse_entity_items(&filter.items)?;

        let languages = if filter.languages.iter().any(|l| l == ALL_LANGUAGES) {
            Vec::new()
        } else {
            filter.languages.clone()
        };

        Ok(SearchQuery {
            dataset: filter.dsname.clone(),
            epoch: filter.epoch.clone(),
            items,
            languages,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(items: &str, languages: &[&str]) -> SearchFilter {
        SearchFilter {
            dsname: "missingdateofbirth".to_string(),
            epoch: "20200229".to_string(),
            items: items.to_string(),
            languages: languages.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_safe_identifiers() {
        assert!(is_safe_identifier("missingdateofbirth"));
        assert!(is_safe_identifier("ds_2020_logging"));
        assert!(!is_safe_identifier(""));
        assert!(!is_safe_identifier("ds; drop table users"));
        assert!(!is_safe_identifier("ds-name"));
        assert!(!is_safe_identifier("ds`name"));
    }

    #[test]
    fn test_table_ref_composition() {
        assert_eq!(
            table_ref("foo", "3", None).unwrap(),
            "`foo`.`foo_3`".to_string()
        );
        assert_eq!(
            table_ref("foo", "3", Some("logging")).unwrap(),
            "`foo`.`foo_3_logging`".to_string()
        );
    }

    #[test]
    fn test_table_ref_rejects_unsafe_parts() {
        assert_eq!(
            table_ref("foo", "3;--", None),
            Err(QueryError::UnsafeIdentifier("3;--".to_string()))
        );
        assert_eq!(
            table_ref("foo", "3", Some("log ing")),
            Err(QueryError::UnsafeIdentifier("log ing".to_string()))
        );
    }

    #[test]
    fn test_parse_items_mixed() {
        // "Q" alone has no digits and is rejected; valid ids keep their case.
        let items = parse_entity_items("Q42, q7,notanid, Q").unwrap();
        assert_eq!(items, vec!["Q42".to_string(), "q7".to_string()]);
    }

    #[test]
    fn test_parse_items_empty_input_is_no_predicate() {
        assert_eq!(parse_entity_items("").unwrap(), Vec::<String>::new());
    }

    #[test]
    fn test_parse_items_garbage_only_fails() {
        assert_eq!(parse_entity_items("notanid"), Err(QueryError::InvalidItems));
        assert_eq!(parse_entity_items("  ,  "), Err(QueryError::InvalidItems));
    }

    #[test]
    fn test_build_without_predicates_is_full_scan() {
        let query = SearchQuery::build(&filter("", &[])).unwrap();
        assert!(query.items.is_empty());
        assert!(query.languages.is_empty());
    }

    #[test]
    fn test_build_all_sentinel_disables_language_predicate() {
        let query = SearchQuery::build(&filter("", &["en", "all", "fr"])).unwrap();
        assert!(query.languages.is_empty());
    }

    #[test]
    fn test_build_keeps_requested_languages() {
        let query = SearchQuery::build(&filter("Q42", &["en", "fr"])).unwrap();
        assert_eq!(query.items, vec!["Q42".to_string()]);
        assert_eq!(query.languages, vec!["en".to_string(), "fr".to_string()]);
    }

    #[test]
    fn test_build_propagates_invalid_items() {
        assert_eq!(
            SearchQuery::build(&filter("notanid", &["en"])),
            Err(QueryError::InvalidItems)
        );
    }
}
