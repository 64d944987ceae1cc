//! Evidence records fed to response synthesis
//!
//! Every surviving sub-question/answer pair becomes one record rendered as
//!
//! ```text
//! Sub question: {sub_question}
//! Response: {answer}
//! ```
//!
//! No filtering, ranking or deduplication happens here; record order follows
//! pair order.

use crate::types::SubQuestionAnswerPair;
use serde::{Deserialize, Serialize};

/// Normalized text combining a sub-question and its answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evidence {
    /// Rendered record text
    pub text: String,

    /// Tool that produced the answer
    pub tool_name: String,
}

impl Evidence {
    /// Render one pair with the fixed record template
    pub fn from_pair(pair: &SubQuestionAnswerPair) -> Self {
        let answer = pair.answer.as_deref().unwrap_or_default();
        Self {
            text: format!(
                "Sub question: {}\nResponse: {}",
                pair.sub_q.sub_question, answer
            ),
            tool_name: pair.sub_q.tool_name.clone(),
        }
    }
}

/// Build one evidence record per pair, preserving order
pub fn build_evidence(pairs: &[SubQuestionAnswerPair]) -> Vec<Evidence> {
    pairs.iter().map(Evidence::from_pair).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SubQuestion;

    #[test]
    fn test_record_template() {
        let pair = SubQuestionAnswerPair::answered(
            SubQuestion::new("uber_10k", "What is the revenue growth of Uber"),
            "Revenue grew 57% year over year.",
        );

        let evidence = Evidence::from_pair(&pair);

        assert_eq!(
            evidence.text,
            "Sub question: What is the revenue growth of Uber\nResponse: Revenue grew 57% year over year."
        );
        assert_eq!(evidence.tool_name, "uber_10k");
    }

    #[test]
    fn test_order_and_duplicates_kept() {
        let pairs = vec![
            SubQuestionAnswerPair::answered(SubQuestion::new("docB", "Y?"), "y"),
            SubQuestionAnswerPair::answered(SubQuestion::new("docA", "X?"), "x"),
            SubQuestionAnswerPair::answered(SubQuestion::new("docA", "X?"), "x"),
        ];

        let evidence = build_evidence(&pairs);

        assert_eq!(evidence.len(), 3);
        assert_eq!(evidence[0].text, "Sub question: Y?\nResponse: y");
        assert_eq!(evidence[1], evidence[2]);
    }

    #[test]
    fn test_no_pairs_no_evidence() {
        assert!(build_evidence(&[]).is_empty());
    }
}
