use log::{debug, info};

use crate::config::*;

#[derive(Eq, PartialEq, Debug, Clone)]
enum SessionPhase {
    Answering,
    // The tally is frozen once the submission is accepted.
    Submitted(ScoreTally),
}

/// The state of one participant going through the questionnaire.
///
/// The session owns the question bank. Answers can be changed freely until
/// the submission is accepted; after that the responses and the tally are
/// read-only.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct QuizSession {
    bank: QuestionBank,
    responses: ResponseMap,
    name: String,
    phase: SessionPhase,
}

impl QuizSession {
    pub fn new(bank: QuestionBank) -> QuizSession {
        info!("QuizSession: new session with {:?} questions", bank.len());
        QuizSession {
            bank,
            responses: ResponseMap::new(),
            name: String::new(),
            phase: SessionPhase::Answering,
        }
    }

    pub fn bank(&self) -> &QuestionBank {
        &self.bank
    }

    pub fn responses(&self) -> &ResponseMap {
        &self.responses
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    pub fn is_submitted(&self) -> bool {
        matches!(self.phase, SessionPhase::Submitted(_))
    }

    /// The tally, available once the submission has been accepted.
    pub fn tally(&self) -> Option<&ScoreTally> {
        match &self.phase {
            SessionPhase::Submitted(tally) => Some(tally),
            SessionPhase::Answering => None,
        }
    }

    pub fn set_name(&mut self, name: &str) -> Result<(), ValidationError> {
        self.check_answering()?;
        self.name = name.trim().to_string();
        Ok(())
    }

    /// Records (or replaces) the answer to a question.
    pub fn answer(
        &mut self,
        question_id: &QuestionId,
        category: Category,
    ) -> Result<(), ValidationError> {
        self.check_answering()?;
        if self.bank.get(question_id).is_none() {
            return Err(ValidationError::UnknownQuestion(question_id.clone()));
        }
        debug!("QuizSession: answer {} -> {:?}", question_id, category);
        self.responses.insert(question_id.clone(), category);
        Ok(())
    }

    /// Records the answer given as the position of the option, in the order the
    /// options are displayed.
    pub fn answer_option(
        &mut self,
        question_id: &QuestionId,
        option_index: usize,
    ) -> Result<Category, ValidationError> {
        let record = self
            .bank
            .get(question_id)
            .ok_or_else(|| ValidationError::UnknownQuestion(question_id.clone()))?;
        let option = record
            .option(option_index)
            .ok_or_else(|| ValidationError::OptionOutOfRange {
                question_id: question_id.clone(),
                index: option_index,
                num_options: record.options.len(),
            })?;
        let category = option.category;
        self.answer(question_id, category)?;
        Ok(category)
    }

    /// The questions without an answer, in bank order.
    pub fn unanswered(&self) -> Vec<&QuestionId> {
        self.bank
            .iter()
            .map(|r| &r.id)
            .filter(|qid| !self.responses.contains_key(*qid))
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.unanswered().is_empty()
    }

    /// Validates the session and freezes the tally.
    ///
    /// On error, nothing is discarded: the participant can fix the name or
    /// the missing answers and submit again. Submitting an already submitted
    /// session returns the same tally.
    pub fn submit(&mut self) -> Result<&ScoreTally, ValidationError> {
        if let SessionPhase::Answering = self.phase {
            if self.name.is_empty() {
                return Err(ValidationError::EmptyName);
            }
            if let Some(qid) = self.unanswered().first() {
                return Err(ValidationError::MissingResponse((*qid).clone()));
            }
            let tally = crate::score(&self.responses);
            info!("QuizSession: submitted for {:?}: {:?}", self.name, tally);
            self.phase = SessionPhase::Submitted(tally);
        }
        match &self.phase {
            SessionPhase::Submitted(tally) => Ok(tally),
            SessionPhase::Answering => Err(ValidationError::AlreadySubmitted),
        }
    }

    fn check_answering(&self) -> Result<(), ValidationError> {
        match self.phase {
            SessionPhase::Answering => Ok(()),
            SessionPhase::Submitted(_) => Err(ValidationError::AlreadySubmitted),
        }
    }
}
