//
// Copyright 2020 bplist Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//

//! Lightweight regex-based `DataTable` schema scraper (`SPEC_FULL.md` §4.9).
//!
//! Does not attempt to actually parse XML; it scrapes a handful of attribute patterns
//! out of the raw text, matching the "best-effort content extract" philosophy of the
//! opaque-blob handler it supports.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::value::DataTableSchema;

static ELEMENT_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"element name="([^"]+)""#).unwrap());

static ELEMENT_NAME_AND_TYPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"element name="([^"]+)"(?:[^>]*type="([^"]+)")?"#).unwrap());

/// Scrapes a `DataTable` schema out of an `<?xml ... </xs:schema>`-ish text slice.
pub fn extract_schema(slice: &str) -> DataTableSchema {
    let table_name = ELEMENT_NAME
        .captures(slice)
        .map(|caps| caps[1].to_string());

    let columns = ELEMENT_NAME_AND_TYPE
        .captures_iter(slice)
        .filter_map(|caps| {
            let name = caps[1].to_string();
            if table_name.as_deref() == Some(name.as_str()) || name.contains("DataSet") {
                return None;
            }
            let ty = caps
                .get(2)
                .map(|m| m.as_str().to_string())
                .unwrap_or_else(|| "string".to_string());
            Some((name, ty))
        })
        .collect();

    DataTableSchema {
        table_name,
        columns,
        has_diffgram: slice.contains("<diffgr:diffgram"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_name_and_columns() {
        let xml = r#"<xs:schema><xs:element name="CustomerTable" /><xs:element name="Id" type="xs:int" /><xs:element name="Name" /></xs:schema>"#;
        let schema = extract_schema(xml);
        assert_eq!(schema.table_name.as_deref(), Some("CustomerTable"));
        assert_eq!(
            schema.columns,
            vec![
                ("Id".to_string(), "xs:int".to_string()),
                ("Name".to_string(), "string".to_string()),
            ]
        );
        assert!(!schema.has_diffgram);
    }

    #[test]
    fn test_has_diffgram() {
        let xml = r#"<xs:schema></xs:schema><diffgr:diffgram></diffgr:diffgram>"#;
        assert!(extract_schema(xml).has_diffgram);
    }

    #[test]
    fn test_no_match() {
        let schema = extract_schema("not xml at all");
        assert_eq!(schema.table_name, None);
        assert!(schema.columns.is_empty());
    }
}
