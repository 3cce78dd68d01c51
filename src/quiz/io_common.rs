use std::collections::HashMap;
use std::path::Path;

use crate::quiz::*;

pub const ID_COLUMN: &str = "id";
pub const QUESTION_TEXT_COLUMN: &str = "question_text";
pub const QUESTION_ID_COLUMN: &str = "question_id";
pub const VARK_TYPE_COLUMN: &str = "vark_type";
pub const ANSWER_TEXT_COLUMN: &str = "answer_text";

/// A table read from a worksheet or a CSV file, with the cells already
/// turned into strings.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RawTable {
    pub name: String,
    pub header: Vec<Option<String>>,
    /// The line number (starting at 1, header included) and the cells of each row.
    pub rows: Vec<(u64, Vec<String>)>,
}

pub fn simplify_file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
        .to_string()
}

/// Header names are compared without case and surrounding whitespace.
pub fn normalize_header(s: &str) -> String {
    s.trim_start_matches('\u{feff}').trim().to_lowercase()
}

/// Given the header of a table (names of each of the columns) and the names of the
/// required columns, finds the position of each column.
pub fn get_col_index_mapping(
    table: &str,
    req_col_names: &[&str],
    header: &[Option<String>],
) -> VarkResult<Vec<usize>> {
    let col_names: HashMap<String, usize> = header
        .iter()
        .enumerate()
        .filter_map(|(idx, x)| x.as_ref().map(|s| (normalize_header(s), idx)))
        .collect();

    debug!("get_col_index_mapping: {}: col_names: {:?}", table, col_names);

    let mut col_indexes: Vec<usize> = Vec::new();
    for cname in req_col_names {
        let idx = col_names
            .get(*cname)
            .context(MissingColumnSnafu {
                table,
                column: *cname,
            })?;
        col_indexes.push(*idx);
    }
    Ok(col_indexes)
}

fn cell<'a>(row: &'a [String], idx: usize) -> &'a str {
    row.get(idx).map(|s| s.trim()).unwrap_or("")
}

fn non_blank_rows(table: &RawTable) -> impl Iterator<Item = &(u64, Vec<String>)> + '_ {
    table
        .rows
        .iter()
        .filter(|(_, row)| row.iter().any(|c| !c.trim().is_empty()))
}

fn check_id(table: &RawTable, lineno: u64, id: &str, row: &[String]) -> VarkResult<()> {
    if id.is_empty() {
        return Err(VarkError::WrongCellType {
            table: table.name.clone(),
            lineno,
            content: format!("missing question id in {:?}", row),
        });
    }
    Ok(())
}

pub fn parse_question_rows(table: &RawTable) -> VarkResult<Vec<QuestionRow>> {
    let cols = get_col_index_mapping(
        &table.name,
        &[ID_COLUMN, QUESTION_TEXT_COLUMN],
        &table.header,
    )?;
    let mut res: Vec<QuestionRow> = Vec::new();
    for (lineno, row) in non_blank_rows(table) {
        let id = cell(row, cols[0]);
        check_id(table, *lineno, id, row)?;
        let qr = QuestionRow {
            id: id.to_string(),
            text: cell(row, cols[1]).to_string(),
        };
        debug!("parse_question_rows: {}: {:?}", lineno, qr);
        res.push(qr);
    }
    Ok(res)
}

pub fn parse_answer_rows(table: &RawTable) -> VarkResult<Vec<AnswerRow>> {
    let cols = get_col_index_mapping(
        &table.name,
        &[QUESTION_ID_COLUMN, VARK_TYPE_COLUMN, ANSWER_TEXT_COLUMN],
        &table.header,
    )?;
    let mut res: Vec<AnswerRow> = Vec::new();
    for (lineno, row) in non_blank_rows(table) {
        let question_id = cell(row, cols[0]);
        check_id(table, *lineno, question_id, row)?;
        let ar = AnswerRow {
            question_id: question_id.to_string(),
            tag: cell(row, cols[1]).to_string(),
            text: cell(row, cols[2]).to_string(),
        };
        debug!("parse_answer_rows: {}: {:?}", lineno, ar);
        res.push(ar);
    }
    Ok(res)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(header: &[&str], rows: &[&[&str]]) -> RawTable {
        RawTable {
            name: "test".to_string(),
            header: header.iter().map(|s| Some(s.to_string())).collect(),
            rows: rows
                .iter()
                .enumerate()
                .map(|(idx, r)| {
                    (
                        (idx + 2) as u64,
                        r.iter().map(|s| s.to_string()).collect(),
                    )
                })
                .collect(),
        }
    }

    #[test]
    fn columns_found_by_name() {
        let t = table(
            &["answer_text", " Vark_Type ", "comment", "\u{feff}question_id"],
            &[&["Lihat gambar", "v", "", "1"], &["", "", "", ""]],
        );
        let rows = parse_answer_rows(&t).unwrap();
        assert_eq!(
            rows,
            vec![AnswerRow {
                question_id: "1".to_string(),
                tag: "v".to_string(),
                text: "Lihat gambar".to_string(),
            }]
        );
    }

    #[test]
    fn missing_column() {
        let t = table(&["id", "text"], &[]);
        let err = parse_question_rows(&t).unwrap_err();
        assert!(matches!(
            err,
            VarkError::MissingColumn { column, .. } if column == "question_text"
        ));
    }

    #[test]
    fn short_rows_and_missing_ids() {
        let t = table(&["id", "question_text"], &[&["3"], &["", "orphan text"]]);
        let err = parse_question_rows(&t).unwrap_err();
        assert!(matches!(err, VarkError::WrongCellType { lineno: 3, .. }));

        let t = table(&["id", "question_text"], &[&["3"]]);
        let rows = parse_question_rows(&t).unwrap();
        assert_eq!(rows[0].text, "");
    }

    #[test]
    fn file_names() {
        assert_eq!(simplify_file_name("/tmp/data/vark.xlsx"), "vark.xlsx");
        assert_eq!(simplify_file_name("vark.xlsx"), "vark.xlsx");
    }
}
