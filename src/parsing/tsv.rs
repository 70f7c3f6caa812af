use std::path::Path;

use crate::core::search::{LocationSearch, Search};
use crate::core::types::SearchStyle;
use crate::parsing::{delimiter_for, read_text, split_fields, ParseError};
use crate::utils::validation::check_batch_limit;

/// Separator between several values of one hint column
const HINT_VALUE_SEPARATOR: char = '|';

/// Parse a TSV/CSV file of searches, one per row
///
/// # Errors
///
/// Returns `ParseError::Io` if the file cannot be read, or other parse errors
/// if the content is invalid.
pub fn parse_search_file(path: &Path) -> Result<Vec<Option<Search>>, ParseError> {
    let content = read_text(path)?;
    parse_search_text(&content, delimiter_for(path))
}

/// Parse TSV/CSV text into searches.
///
/// The first non-comment line is a header naming `Search` fields
/// (`scientificName`, `kingdom`, `taxonConceptID`, ...). Columns named
/// `hint.<rank>` hold `|`-separated hint values. Without a recognised header
/// every line is taken as a bare scientific name. Rows whose fields are all
/// empty become `None` so positions are kept.
///
/// # Errors
///
/// Returns `ParseError::InvalidFormat` for an unknown column or bad value, or
/// `ParseError::TooManyRows` if the batch limit is exceeded.
pub fn parse_search_text(text: &str, delimiter: char) -> Result<Vec<Option<Search>>, ParseError> {
    let mut searches = Vec::new();
    let mut columns: Option<Vec<String>> = None;
    let mut first_data_line = true;

    for (i, line) in text.lines().enumerate() {
        let line = line.trim_end_matches('\r');
        if line.is_empty() || line.trim_start().starts_with('#') {
            continue;
        }

        let fields = split_fields(line, delimiter);

        // Check if first non-empty/non-comment line is a header
        if first_data_line {
            first_data_line = false;
            if fields.iter().any(|f| is_known_column(f)) {
                for field in &fields {
                    if !field.is_empty() && !is_known_column(field) {
                        return Err(ParseError::InvalidFormat(format!(
                            "Unknown column '{field}'"
                        )));
                    }
                }
                columns = Some(fields);
                continue;
            }
        }

        // Line numbers in errors are 1-based for user friendliness
        let line_num = i + 1;

        if check_batch_limit(searches.len() + 1).is_some() {
            return Err(ParseError::TooManyRows(searches.len() + 1));
        }

        let search = match &columns {
            Some(columns) => row_to_search(columns, &fields, line_num)?,
            None => Some(line.trim())
                .filter(|name| !name.is_empty())
                .map(Search::named),
        };
        searches.push(search);
    }

    Ok(searches)
}

fn is_known_column(name: &str) -> bool {
    name.to_lowercase().starts_with("hint.") || set_field(&mut Search::default(), name, "").is_ok()
}

fn row_to_search(
    columns: &[String],
    fields: &[String],
    line_num: usize,
) -> Result<Option<Search>, ParseError> {
    let mut search = Search::default();
    let mut any_value = false;

    for (column, value) in columns.iter().zip(fields) {
        if value.is_empty() || column.is_empty() {
            continue;
        }
        any_value = true;
        if let Some(rank) = column.to_lowercase().strip_prefix("hint.") {
            search = search.with_hint(rank, value.split(HINT_VALUE_SEPARATOR).map(str::trim));
            continue;
        }
        set_field(&mut search, column, value)
            .map_err(|e| ParseError::InvalidFormat(format!("Line {line_num}: {e}")))?;
    }

    Ok(any_value.then_some(search))
}

/// Set a search field by its column name
fn set_field(search: &mut Search, column: &str, value: &str) -> Result<(), String> {
    let text = Some(value.to_string()).filter(|v| !v.is_empty());
    match column.trim().to_lowercase().as_str() {
        "kingdom" => search.kingdom = text,
        "phylum" => search.phylum = text,
        "class" => search.class = text,
        "order" => search.order = text,
        "family" => search.family = text,
        "genus" => search.genus = text,
        "specificepithet" => search.specific_epithet = text,
        "infraspecificepithet" => search.infraspecific_epithet = text,
        "scientificname" | "name" => search.scientific_name = text,
        "scientificnameauthorship" | "authorship" => search.scientific_name_authorship = text,
        "vernacularname" | "commonname" => search.vernacular_name = text,
        "taxonrank" | "rank" => search.rank = text,
        "taxonconceptid" => search.taxon_concept_id = text,
        "taxonid" => search.taxon_id = text,
        "country" => location(search).country = text,
        "stateprovince" => location(search).state_province = text,
        "locality" => location(search).locality = text,
        "style" => {
            search.style = if value.is_empty() {
                None
            } else {
                Some(value.parse::<SearchStyle>()?)
            };
        }
        "loose" => {
            search.loose = match value.to_lowercase().as_str() {
                "" | "false" | "no" | "0" => false,
                "true" | "yes" | "1" => true,
                other => return Err(format!("invalid loose flag '{other}'")),
            };
        }
        other => return Err(format!("unknown field '{other}'")),
    }
    Ok(())
}

fn location(search: &mut Search) -> &mut LocationSearch {
    search.location.get_or_insert_with(LocationSearch::default)
}
