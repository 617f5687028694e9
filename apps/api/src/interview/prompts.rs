// Prompt templates for question generation and answer scoring.
// Placeholders are replaced verbatim; templates must stay deterministic.

/// Replace `{count}`, `{target_role}`, `{skills}`, `{experience}`.
pub const QUESTION_PROMPT_TEMPLATE: &str = r#"Generate a set of {count} diverse interview questions for a candidate applying for the role of {target_role}.
The candidate's resume shows skills like: {skills} and {experience} of experience.
Mix technical, behavioral, and situational questions, and vary the difficulty.
Return a JSON object with a "questions" array of exactly {count} objects, each having "question" (string), "type" (one of "technical", "behavioral", "situational"), and "difficulty" (one of "easy", "medium", "hard")."#;

/// Replace `{target_role}`, `{question_type}`, `{difficulty}`, `{question}`, `{answer}`.
pub const SCORING_PROMPT_TEMPLATE: &str = r#"You are an experienced interviewer hiring for the role of {target_role}.
Evaluate the candidate's answer to the {question_type} question below ({difficulty} difficulty).

QUESTION:
{question}

CANDIDATE ANSWER:
{answer}

Return a JSON object with:
- "feedback": two to four sentences of specific, constructive feedback
- "ai_score": an integer from 0 to 100 rating the answer's quality for this role
Judge only what the answer says. An empty or off-topic answer scores below 20."#;
