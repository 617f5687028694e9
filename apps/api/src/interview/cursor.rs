// Caller-held position within a session's question set. Never persisted;
// stepping past the last question is the caller's cue to end the session.

use std::collections::HashSet;

use uuid::Uuid;

use crate::models::question::QuestionRow;
use crate::models::response::ResponseRow;

#[derive(Debug, PartialEq)]
pub enum CursorStep<'a> {
    Next(&'a QuestionRow),
    Finished,
}

#[derive(Debug, Clone)]
pub struct QuestionCursor {
    questions: Vec<QuestionRow>,
    index: usize,
}

impl QuestionCursor {
    pub fn new(mut questions: Vec<QuestionRow>) -> Self {
        questions.sort_by_key(|q| q.position);
        Self { questions, index: 0 }
    }

    /// Positions the cursor on `question_id`, or `None` if it is not in the set.
    pub fn at(questions: Vec<QuestionRow>, question_id: Uuid) -> Option<Self> {
        let mut cursor = Self::new(questions);
        cursor.index = cursor.questions.iter().position(|q| q.id == question_id)?;
        Some(cursor)
    }

    /// Positions the cursor on the first question without a response.
    pub fn resume(questions: Vec<QuestionRow>, responses: &[ResponseRow]) -> Self {
        let answered: HashSet<Uuid> = responses.iter().map(|r| r.question_id).collect();
        let mut cursor = Self::new(questions);
        cursor.index = cursor
            .questions
            .iter()
            .position(|q| !answered.contains(&q.id))
            .unwrap_or(cursor.questions.len());
        cursor
    }

    pub fn current(&self) -> Option<&QuestionRow> {
        self.questions.get(self.index)
    }

    pub fn advance(&mut self) -> CursorStep<'_> {
        if self.index < self.questions.len() {
            self.index += 1;
        }
        match self.questions.get(self.index) {
            Some(q) => CursorStep::Next(q),
            None => CursorStep::Finished,
        }
    }
}
