// Primitives for reading CSV files.

use crate::quiz::{
    io_common::{parse_answer_rows, parse_question_rows, simplify_file_name, RawTable},
    *,
};

/// Reads the questions and the answers tables from two CSV files with a header row.
pub fn read_csv_tables(
    questions_path: &str,
    answers_path: &str,
) -> VarkResult<(Vec<QuestionRow>, Vec<AnswerRow>)> {
    let questions = read_csv_table(questions_path)?;
    let answers = match read_csv_table(answers_path) {
        Err(VarkError::CsvOpen { source, path }) if is_not_found(&source) => {
            return Err(VarkError::MissingAnswersTable { source, path })
        }
        x => x?,
    };
    Ok((
        parse_question_rows(&questions)?,
        parse_answer_rows(&answers)?,
    ))
}

fn is_not_found(e: &csv::Error) -> bool {
    matches!(e.kind(), csv::ErrorKind::Io(io_e) if io_e.kind() == std::io::ErrorKind::NotFound)
}

fn read_csv_table(path: &str) -> VarkResult<RawTable> {
    info!("Attempting to read table {:?}", path);
    let name = simplify_file_name(path);
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .context(CsvOpenSnafu { path })?;

    let mut records = rdr.records();
    let header: Vec<Option<String>> = records
        .next()
        .context(EmptyTableSnafu {
            table: name.clone(),
        })?
        .context(CsvLineParseSnafu { path })?
        .iter()
        .map(|s| Some(s.to_string()))
        .collect();
    debug!("read_csv_table: {}: header: {:?}", name, header);

    let mut rows: Vec<(u64, Vec<String>)> = Vec::new();
    for (idx, line_r) in records.enumerate() {
        let lineno = (idx + 2) as u64;
        let line = line_r.context(CsvLineParseSnafu { path })?;
        debug!("read_csv_table: {}: {:?} {:?}", name, lineno, line);
        rows.push((lineno, line.iter().map(|s| s.to_string()).collect()));
    }
    Ok(RawTable { name, header, rows })
}
