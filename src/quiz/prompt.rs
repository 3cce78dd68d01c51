// The terminal front end of a session.

use crate::quiz::*;

fn read_line<R: BufRead>(input: &mut R) -> VarkResult<String> {
    let mut line = String::new();
    let n = input.read_line(&mut line).context(TerminalSnafu {})?;
    if n == 0 {
        return Err(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "the input ended before the questionnaire was complete",
        ))
        .context(TerminalSnafu {});
    }
    Ok(line.trim().to_string())
}

fn ask_name<R: BufRead, W: Write>(
    session: &mut QuizSession,
    input: &mut R,
    output: &mut W,
) -> VarkResult<()> {
    while session.name().is_empty() {
        write!(output, "Nama: ").context(TerminalSnafu {})?;
        output.flush().context(TerminalSnafu {})?;
        let name = read_line(input)?;
        session.set_name(&name).context(InvalidResponsesSnafu {})?;
        if session.name().is_empty() {
            writeln!(output, "Nama tidak boleh kosong.").context(TerminalSnafu {})?;
        }
    }
    Ok(())
}

fn ask_question<R: BufRead, W: Write>(
    session: &mut QuizSession,
    position: usize,
    record: &QuestionRecord,
    input: &mut R,
    output: &mut W,
) -> VarkResult<()> {
    writeln!(output, "\n{}. {}", position, record.text).context(TerminalSnafu {})?;
    for (idx, option) in record.options.iter().enumerate() {
        writeln!(output, "  {}) {}", idx + 1, option.text).context(TerminalSnafu {})?;
    }
    loop {
        write!(output, "Pilihan [1-{}]: ", record.options.len()).context(TerminalSnafu {})?;
        output.flush().context(TerminalSnafu {})?;
        let line = read_line(input)?;
        let choice = match line.parse::<usize>() {
            Ok(x) if x >= 1 => x - 1,
            _ => {
                writeln!(output, "Masukkan angka antara 1 dan {}.", record.options.len())
                    .context(TerminalSnafu {})?;
                continue;
            }
        };
        match session.answer_option(&record.id, choice) {
            Ok(category) => {
                debug!("ask_question: {} -> {:?}", record.id, category);
                return Ok(());
            }
            Err(ValidationError::OptionOutOfRange { num_options, .. }) => {
                writeln!(output, "Masukkan angka antara 1 dan {}.", num_options)
                    .context(TerminalSnafu {})?;
            }
            Err(e) => return Err(e).context(InvalidResponsesSnafu {}),
        }
    }
}

/// Prints the tally, in the fixed category order.
pub fn print_tally<W: Write>(tally: &ScoreTally, output: &mut W) -> VarkResult<()> {
    writeln!(output, "\nHasil Anda:").context(TerminalSnafu {})?;
    for (category, count) in tally.iter() {
        writeln!(output, "  {}: {}", category.label(), count).context(TerminalSnafu {})?;
    }
    Ok(())
}

/// Asks the name (unless it is already known), then every question in bank
/// order, and submits the session.
pub fn run_prompt<R: BufRead, W: Write>(
    session: &mut QuizSession,
    input: &mut R,
    output: &mut W,
) -> VarkResult<ScoreTally> {
    ask_name(session, input, output)?;
    let records: Vec<QuestionRecord> = session.bank().questions().to_vec();
    for (idx, record) in records.iter().enumerate() {
        ask_question(session, idx + 1, record, input, output)?;
    }
    let tally = *session.submit().context(InvalidResponsesSnafu {})?;
    print_tally(&tally, output)?;
    Ok(tally)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use vark_scoring::builder::Builder;

    fn session() -> QuizSession {
        let mut builder = Builder::new(&LoadRules::DEFAULT_RULES);
        builder.add_question(
            "1",
            "Saya lebih mudah mengingat",
            &[
                (Category::Visual, "gambar"),
                (Category::Auditory, "suara"),
                (Category::ReadingWriting, "tulisan"),
                (Category::Kinesthetic, "gerakan"),
            ],
        );
        builder.add_question(
            "2",
            "Saat belajar hal baru",
            &[
                (Category::Kinesthetic, "mencoba"),
                (Category::ReadingWriting, "membaca"),
                (Category::Auditory, "mendengar"),
                (Category::Visual, "melihat"),
            ],
        );
        QuizSession::new(builder.build(&mut StdRng::seed_from_u64(3)).unwrap())
    }

    fn run(session: &mut QuizSession, input: &str) -> (VarkResult<ScoreTally>, String) {
        let mut input = Cursor::new(input.as_bytes().to_vec());
        let mut output: Vec<u8> = Vec::new();
        let res = run_prompt(session, &mut input, &mut output);
        (res, String::from_utf8(output).unwrap())
    }

    #[test]
    fn full_session() {
        let mut s = session();
        let (res, transcript) = run(&mut s, "Budi\n1\n1\n");
        let tally = res.unwrap();
        assert_eq!(tally.count(Category::Visual), 1);
        assert_eq!(tally.count(Category::Kinesthetic), 1);
        assert!(transcript.contains("1. Saya lebih mudah mengingat"));
        assert!(transcript.contains("  4) melihat"));
        assert!(transcript.contains("Hasil Anda"));
        assert!(transcript.contains("Kinesthetic: 1"));
        assert!(s.is_submitted());
    }

    #[test]
    fn invalid_choices_are_asked_again() {
        let mut s = session();
        s.set_name("Sari").unwrap();
        let (res, transcript) = run(&mut s, "0\nabc\n5\n2\n  3 \n");
        let tally = res.unwrap();
        assert_eq!(tally.count(Category::Auditory), 2);
        assert_eq!(transcript.matches("Masukkan angka antara 1 dan 4.").count(), 3);
        // The name was already known.
        assert!(!transcript.contains("Nama:"));
    }

    #[test]
    fn empty_name_is_asked_again() {
        let mut s = session();
        let (res, transcript) = run(&mut s, "  \nSari\n2\n2\n");
        assert!(res.is_ok());
        assert!(transcript.contains("Nama tidak boleh kosong."));
        assert_eq!(s.name(), "Sari");
    }

    #[test]
    fn end_of_input() {
        let mut s = session();
        let (res, _) = run(&mut s, "Budi\n1\n");
        let err = res.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(!s.is_submitted());
        assert_eq!(s.responses().len(), 1);
    }
}
