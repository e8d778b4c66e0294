//! Header discovery helpers for CSV schema inference
//!
//! Phase A maps raw header names onto unique field paths, folding repeated
//! array-element columns into placeholders; phase B merges the analyzer's
//! detected types back into the fields. Both halves are pure so the
//! controller can drive them around its await points.

use std::collections::HashSet;

use crate::services::AnalysisReport;
use crate::session::{Field, TabularType};

/// Map a raw CSV header name to its field path by stripping array index
/// segments: `tags[0]` and `tags[1]` both map to `tags`, `foo[2].bar` maps
/// to `foo.bar`. Brackets that are not a pure numeric index are kept
/// verbatim.
pub fn field_path_for_header(header: &str) -> String {
    let mut out = String::with_capacity(header.len());
    let mut rest = header;
    while let Some(open) = rest.find('[') {
        let (head, tail) = rest.split_at(open);
        if let Some(close) = tail.find(']') {
            let index = &tail[1..close];
            if !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit()) {
                out.push_str(head);
                rest = &tail[close + 1..];
                continue;
            }
        }
        out.push_str(head);
        out.push('[');
        rest = &rest[open + 1..];
    }
    out.push_str(rest);
    out
}

/// Build the preview fields for a header list.
///
/// The first header producing a given unique path becomes a checked tabular
/// field with the pre-analysis `Mixed` type; later headers colliding on the
/// same path (the remaining elements of an array column) become
/// placeholders keyed by their raw header name.
pub fn build_preview_fields(header_fields: &[String]) -> Vec<Field> {
    let mut seen = HashSet::new();
    header_fields
        .iter()
        .map(|name| {
            let path = field_path_for_header(name);
            if seen.insert(path.clone()) {
                Field::Csv {
                    path,
                    checked: true,
                    ty: TabularType::Mixed,
                    analysis: None,
                }
            } else {
                Field::Placeholder { path: name.clone() }
            }
        })
        .collect()
}

/// Merge analysis results into the fields in place, preserving order.
///
/// An always-empty column detects as `Undefined` when blank values are
/// ignored; that sentinel is substituted with `Null` so the type selector
/// shows a real type. Placeholders and paths the analyzer did not report
/// are left untouched.
pub fn merge_analysis(fields: &mut [Field], report: &AnalysisReport) {
    for field in fields {
        let Field::Csv {
            path, ty, analysis, ..
        } = field
        else {
            continue;
        };
        let Some(result) = report.fields.get(path) else {
            continue;
        };
        *ty = match result.detected {
            TabularType::Undefined => TabularType::Null,
            detected => detected,
        };
        *analysis = Some(result.clone());
    }
}
