use pipeline::core::types::EvaluationStatus;

/// `pass` iff no check contributed a reason.
pub fn classify(reasons: &[String]) -> EvaluationStatus {
    if reasons.is_empty() {
        EvaluationStatus::Pass
    } else {
        EvaluationStatus::Fail
    }
}

/// Reason code without its subject, e.g. `write_file_missing:out.txt` -> `write_file_missing`.
pub fn reason_code(reason: &str) -> &str {
    reason.split_once(':').map_or(reason, |(code, _)| code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pass_when_no_reasons() {
        assert_eq!(classify(&[]), EvaluationStatus::Pass);
    }

    #[test]
    fn fail_when_any_reason() {
        let reasons = vec!["write_file_missing:out.txt".to_string()];
        assert_eq!(classify(&reasons), EvaluationStatus::Fail);
    }

    #[test]
    fn reason_code_strips_subject() {
        assert_eq!(reason_code("write_file_missing:out.txt"), "write_file_missing");
        assert_eq!(
            reason_code("write_record_missing_key:0:bytes"),
            "write_record_missing_key"
        );
        assert_eq!(reason_code("outputs_not_object"), "outputs_not_object");
    }
}
