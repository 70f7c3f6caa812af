use std::collections::HashMap;
use std::path::Path;

use crate::catalog::store::TaxonRecord;
use crate::core::types::{NameType, Rank, TaxonomicStatus};
use crate::parsing::{delimiter_for, read_text, split_fields, ParseError};

/// Parse a Darwin Core style taxon file
///
/// # Errors
///
/// Returns `ParseError::Io` if the file cannot be read, or
/// `ParseError::InvalidFormat` if the content is invalid.
pub fn parse_taxa_file(path: &Path) -> Result<Vec<TaxonRecord>, ParseError> {
    let content = read_text(path)?;
    parse_taxa_text(&content, delimiter_for(path))
}

/// Parse Darwin Core taxon rows.
///
/// A header row is required and must name `taxonID` and `scientificName`.
/// Recognised optional columns are `scientificNameAuthorship`, `taxonRank`,
/// `parentNameUsageID`, `acceptedNameUsageID`, `taxonomicStatus`, `nameType`
/// and `vernacularName` (`|`-separated). Other columns are ignored.
///
/// # Errors
///
/// Returns `ParseError::InvalidFormat` if the header lacks a required column,
/// a row lacks an identifier or name, or no taxa are found.
pub fn parse_taxa_text(text: &str, delimiter: char) -> Result<Vec<TaxonRecord>, ParseError> {
    let mut lines = text
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty() && !line.starts_with('#'));

    let (_, header) = lines
        .next()
        .ok_or_else(|| ParseError::InvalidFormat("Empty taxon file".to_string()))?;
    let columns: HashMap<String, usize> = split_fields(header, delimiter)
        .into_iter()
        .enumerate()
        .map(|(i, name)| (name.to_lowercase(), i))
        .collect();

    let required = |name: &str| {
        columns.get(name).copied().ok_or_else(|| {
            ParseError::InvalidFormat(format!("Missing required column '{name}'"))
        })
    };
    let id_col = required("taxonid")?;
    let name_col = required("scientificname")?;

    let mut records = Vec::new();
    for (i, line) in lines {
        let line_num = i + 1;
        let fields = split_fields(line, delimiter);
        let get = |column: &str| {
            columns
                .get(column)
                .and_then(|&idx| fields.get(idx))
                .filter(|value| !value.is_empty())
                .cloned()
        };

        let taxon_id = fields.get(id_col).filter(|v| !v.is_empty()).cloned().ok_or_else(|| {
            ParseError::InvalidFormat(format!("Line {line_num}: missing taxonID"))
        })?;
        let scientific_name = fields
            .get(name_col)
            .filter(|v| !v.is_empty())
            .cloned()
            .ok_or_else(|| {
                ParseError::InvalidFormat(format!("Line {line_num}: missing scientificName"))
            })?;

        let rank = get("taxonrank")
            .map_or(Rank::Unranked, |r| Rank::parse(&r).unwrap_or(Rank::Unranked));
        let status = get("taxonomicstatus")
            .map(|s| TaxonomicStatus::parse(&s))
            .unwrap_or_default();
        let name_type = get("nametype")
            .and_then(|t| serde_json::from_value(serde_json::Value::String(t.to_uppercase())).ok())
            .unwrap_or(NameType::Scientific);
        let vernacular_names = get("vernacularname")
            .map(|v| {
                v.split('|')
                    .map(str::trim)
                    .filter(|n| !n.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        records.push(TaxonRecord {
            taxon_id,
            scientific_name,
            authorship: get("scientificnameauthorship"),
            rank,
            parent_id: get("parentnameusageid"),
            status,
            // Darwin Core repeats the own ID for accepted usages
            accepted_id: get("acceptednameusageid").filter(|a| Some(a) != fields.get(id_col)),
            name_type,
            vernacular_names,
        });
    }

    if records.is_empty() {
        return Err(ParseError::InvalidFormat(
            "No taxa found in file".to_string(),
        ));
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dwc_taxa() {
        let tsv = "taxonID\tparentNameUsageID\tacceptedNameUsageID\tscientificName\ttaxonRank\ttaxonomicStatus\tvernacularName\n\
                   G1\t\tG1\tAcacia\tgenus\taccepted\t\n\
                   S1\tG1\tS1\tAcacia dealbata\tspecies\taccepted\tSilver Wattle|Mimosa\n\
                   S2\t\tS1\tRacosperma dealbatum\tspecies\tsynonym\t\n";

        let records = parse_taxa_text(tsv, '\t').unwrap();
        assert_eq!(records.len(), 3);

        assert_eq!(records[1].rank, Rank::Species);
        assert_eq!(records[1].parent_id.as_deref(), Some("G1"));
        assert_eq!(records[1].accepted_id, None);
        assert_eq!(records[1].vernacular_names, vec!["Silver Wattle", "Mimosa"]);

        assert_eq!(records[2].status, TaxonomicStatus::Synonym);
        assert_eq!(records[2].accepted_id.as_deref(), Some("S1"));
    }

    #[test]
    fn test_missing_required_column() {
        let result = parse_taxa_text("taxonID\ttaxonRank\nG1\tgenus\n", '\t');
        assert!(matches!(result, Err(ParseError::InvalidFormat(_))));
    }

    #[test]
    fn test_missing_name_in_row() {
        let result = parse_taxa_text("taxonID\tscientificName\nG1\t\n", '\t');
        assert!(matches!(result, Err(ParseError::InvalidFormat(_))));
    }
}
