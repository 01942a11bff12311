//! Questionnaire progress (auxiliary table)

use crate::ids::MissionId;
use serde::{Deserialize, Serialize};

/// Per-user questionnaire progress and score
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizProgress {
    /// Questionnaire being answered
    pub mission_id: MissionId,
    /// Next question to ask
    pub question_index: usize,
    /// Chosen answers by question
    #[serde(default)]
    pub answers: Vec<Option<String>>,
    /// Number of answers matching the expected option
    #[serde(default)]
    pub correct: usize,
}

impl QuizProgress {
    /// Start a questionnaire
    #[must_use]
    pub fn new(mission_id: MissionId) -> Self {
        Self {
            mission_id,
            question_index: 0,
            answers: Vec::new(),
            correct: 0,
        }
    }

    /// Record an answer for a question and advance past it.
    ///
    /// Re-answering a question overwrites the previous choice but is only
    /// scored the first time; `question_index` never moves backwards.
    pub fn record_answer(&mut self, question: usize, answer: impl Into<String>, is_correct: bool) {
        if self.answers.len() <= question {
            self.answers.resize(question + 1, None);
        }
        let previously_answered = self.answers[question].is_some();
        self.answers[question] = Some(answer.into());
        if !previously_answered && is_correct {
            self.correct += 1;
        }
        self.question_index = self.question_index.max(question + 1);
    }

    /// Answered question count
    #[must_use]
    pub fn answered(&self) -> usize {
        self.answers.iter().filter(|a| a.is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_answer_advances_and_scores() {
        let mut quiz = QuizProgress::new(MissionId(4));
        quiz.record_answer(0, "A", true);
        quiz.record_answer(1, "C", false);

        assert_eq!(quiz.question_index, 2);
        assert_eq!(quiz.correct, 1);
        assert_eq!(quiz.answered(), 2);
    }

    #[test]
    fn reanswer_does_not_double_count() {
        let mut quiz = QuizProgress::new(MissionId(4));
        quiz.record_answer(0, "A", true);
        quiz.record_answer(0, "A", true);

        assert_eq!(quiz.correct, 1);
        assert_eq!(quiz.question_index, 1);
    }
}
