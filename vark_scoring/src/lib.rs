mod config;
use log::{debug, info, warn};
use rand::seq::SliceRandom;
use rand::Rng;

use std::collections::{HashMap, HashSet};

pub mod builder;
pub mod manual;
mod session;

pub use crate::config::*;
pub use crate::session::*;

/// Assembles the question bank of a session from the rows of the two source tables.
///
/// Arguments:
/// * `questions` the rows of the questions table. When questions are not shuffled,
/// the bank is sorted by id: numerically if all the ids are integers, as text otherwise.
/// * `answers` the rows of the answers table, joined to the questions on the question id.
/// Within a question, options keep the order of the rows unless options are shuffled.
/// * `rules` the join and randomization policy
/// * `rng` the source of randomness for shuffling. It is not used when no shuffling
/// is requested.
pub fn assemble_question_bank<R: Rng + ?Sized>(
    questions: &[QuestionRow],
    answers: &[AnswerRow],
    rules: &LoadRules,
    rng: &mut R,
) -> Result<QuestionBank, DataFormatError> {
    info!(
        "assemble_question_bank: {:?} question rows, {:?} answer rows, rules: {:?}",
        questions.len(),
        answers.len(),
        rules
    );

    let mut grouped = group_answers(answers)?;
    debug!(
        "assemble_question_bank: answers grouped into {:?} questions",
        grouped.len()
    );

    let mut seen: HashSet<QuestionId> = HashSet::new();
    let mut records: Vec<QuestionRecord> = Vec::new();
    for row in questions.iter() {
        let qid = QuestionId::new(&row.id);
        if !seen.insert(qid.clone()) {
            return Err(DataFormatError::DuplicateQuestion(qid));
        }
        let options = match grouped.remove(&qid) {
            Some(options) => options,
            None if rules.orphan_policy == OrphanPolicy::Skip => {
                warn!(
                    "assemble_question_bank: question {} has no answers, skipping it",
                    qid
                );
                continue;
            }
            None => {
                return Err(DataFormatError::NoOptions(qid));
            }
        };
        check_options(&qid, &options)?;
        records.push(QuestionRecord {
            id: qid,
            text: row.text.trim().to_string(),
            options,
        });
    }

    // Whatever is left could not be joined to a question.
    if !grouped.is_empty() {
        let mut orphans: Vec<QuestionId> = grouped.keys().cloned().collect();
        orphans.sort();
        match rules.orphan_policy {
            OrphanPolicy::Reject => {
                return Err(DataFormatError::OrphanedAnswer(orphans[0].clone()));
            }
            OrphanPolicy::Skip => {
                warn!(
                    "assemble_question_bank: skipping answers of unknown questions {:?}",
                    orphans
                );
            }
        }
    }

    if records.is_empty() {
        return Err(DataFormatError::EmptyBank);
    }

    sort_records(&mut records);
    shuffle_records(&mut records, rules, rng);
    info!(
        "assemble_question_bank: {:?} questions in the bank",
        records.len()
    );
    Ok(QuestionBank::new(records))
}

// Groups the options by question, keeping the order of the rows.
fn group_answers(
    answers: &[AnswerRow],
) -> Result<HashMap<QuestionId, Vec<AnswerOption>>, DataFormatError> {
    let mut grouped: HashMap<QuestionId, Vec<AnswerOption>> = HashMap::new();
    for row in answers.iter() {
        let qid = QuestionId::new(&row.question_id);
        let category =
            Category::from_tag(&row.tag).ok_or_else(|| DataFormatError::UnknownCategory {
                question_id: qid.clone(),
                tag: row.tag.clone(),
            })?;
        grouped.entry(qid).or_default().push(AnswerOption {
            category,
            text: row.text.trim().to_string(),
        });
    }
    Ok(grouped)
}

fn check_options(qid: &QuestionId, options: &[AnswerOption]) -> Result<(), DataFormatError> {
    if options.is_empty() {
        return Err(DataFormatError::NoOptions(qid.clone()));
    }
    let mut categories: HashSet<Category> = HashSet::new();
    for o in options.iter() {
        if !categories.insert(o.category) {
            return Err(DataFormatError::DuplicateCategory {
                question_id: qid.clone(),
                category: o.category,
            });
        }
    }
    for c in Category::ALL.iter() {
        if !categories.contains(c) {
            return Err(DataFormatError::MissingCategory {
                question_id: qid.clone(),
                category: *c,
            });
        }
    }
    Ok(())
}

// Ids are compared as numbers when they all are numbers, so that "10" comes after "2".
fn sort_records(records: &mut [QuestionRecord]) {
    let numeric_ids: Option<Vec<i64>> = records
        .iter()
        .map(|r| r.id.as_str().parse::<i64>().ok())
        .collect();
    if numeric_ids.is_some() {
        records.sort_by_key(|r| r.id.as_str().parse::<i64>().unwrap_or(i64::MAX));
    } else {
        records.sort_by(|r1, r2| r1.id.cmp(&r2.id));
    }
}

fn shuffle_records<R: Rng + ?Sized>(
    records: &mut [QuestionRecord],
    rules: &LoadRules,
    rng: &mut R,
) {
    // Options first, so that the draws for one question do not depend on
    // where the question ends up.
    if rules.shuffle_options {
        for r in records.iter_mut() {
            r.options.shuffle(rng);
        }
    }
    if rules.shuffle_questions {
        records.shuffle(rng);
    }
}

/// Counts the selections of each category.
///
/// The result does not depend on the order of the selections.
pub fn score_selections<I>(selections: I) -> ScoreTally
where
    I: IntoIterator<Item = Category>,
{
    let mut tally = ScoreTally::EMPTY;
    for c in selections {
        tally.increment(c);
    }
    tally
}

/// Reduces the responses to the per-category tally.
///
/// The responses are expected to cover every question of the bank. This is
/// not checked here, see [QuizSession::submit] for the validated path.
pub fn score(responses: &ResponseMap) -> ScoreTally {
    let tally = score_selections(responses.values().cloned());
    debug!("score: {:?} responses -> {:?}", responses.len(), tally);
    tally
}
