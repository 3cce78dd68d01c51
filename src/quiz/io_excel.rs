use calamine::{open_workbook, DataType, Reader, Xlsx};
use std::io::{Read, Seek};

use crate::quiz::{
    io_common::{
        get_col_index_mapping, parse_answer_rows, parse_question_rows, RawTable,
        ANSWER_TEXT_COLUMN, ID_COLUMN, QUESTION_ID_COLUMN, QUESTION_TEXT_COLUMN,
        VARK_TYPE_COLUMN,
    },
    *,
};

/// Reads the questions and the answers tables from two worksheets of the same workbook.
pub fn read_excel_tables(
    path: &str,
    questions_sheet: &str,
    answers_sheet: &str,
) -> VarkResult<(Vec<QuestionRow>, Vec<AnswerRow>)> {
    let mut workbook: Xlsx<_> = open_workbook(path).context(OpeningExcelSnafu { path })?;
    debug!(
        "read_excel_tables: path: {:?} worksheets: {:?}",
        path,
        workbook.sheet_names()
    );

    let questions = read_sheet(
        &mut workbook,
        path,
        questions_sheet,
        &[ID_COLUMN, QUESTION_TEXT_COLUMN],
    )?;
    let answers = read_sheet(
        &mut workbook,
        path,
        answers_sheet,
        &[QUESTION_ID_COLUMN, VARK_TYPE_COLUMN, ANSWER_TEXT_COLUMN],
    )?;
    Ok((
        parse_question_rows(&questions)?,
        parse_answer_rows(&answers)?,
    ))
}

// Only the cells of the requested columns are read, the other columns are left empty.
fn read_sheet<RS: Read + Seek>(
    workbook: &mut Xlsx<RS>,
    path: &str,
    sheet: &str,
    columns: &[&str],
) -> VarkResult<RawTable> {
    info!("Attempting to read worksheet {:?} of {:?}", sheet, path);
    let wrange = workbook
        .worksheet_range(sheet)
        .context(MissingWorksheetSnafu { sheet, path })?
        .context(OpeningExcelSnafu { path })?;

    let mut iter = wrange.rows();
    let header: Vec<Option<String>> = iter
        .next()
        .context(EmptyTableSnafu { table: sheet })?
        .iter()
        .map(|dt| match dt {
            DataType::String(s) => Some(s.clone()),
            _ => None,
        })
        .collect();
    debug!("read_sheet: {}: header: {:?}", sheet, header);
    let col_indexes = get_col_index_mapping(sheet, columns, &header)?;

    let mut rows: Vec<(u64, Vec<String>)> = Vec::new();
    for (idx, row) in iter.enumerate() {
        // The header is on the first line.
        let lineno = (idx + 2) as u64;
        let mut cells: Vec<String> = Vec::new();
        for (col_idx, elt) in row.iter().enumerate() {
            if col_indexes.contains(&col_idx) {
                cells.push(read_cell(sheet, lineno, elt)?);
            } else {
                cells.push(String::new());
            }
        }
        rows.push((lineno, cells));
    }
    Ok(RawTable {
        name: sheet.to_string(),
        header,
        rows,
    })
}

// Ids are often typed as numbers in spreadsheets: 1.0 is read as "1".
fn read_cell(sheet: &str, lineno: u64, cell: &DataType) -> VarkResult<String> {
    match cell {
        DataType::String(s) => Ok(s.clone()),
        DataType::Int(i) => Ok(i.to_string()),
        DataType::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => Ok(format!("{}", *f as i64)),
        DataType::Float(f) => Ok(f.to_string()),
        DataType::Empty => Ok("".to_string()),
        _ => Err(VarkError::WrongCellType {
            table: sheet.to_string(),
            lineno,
            content: format!("{:?}", cell),
        }),
    }
}
