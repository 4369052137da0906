use crate::models::{FieldError, GradeSummary, StudentRecord, SubjectMarks, SUBJECTS, SUBJECT_MAX_MARKS};

/// Inclusive lower bounds, highest match wins. Out-of-range inputs fall
/// through the same chain instead of being rejected.
pub fn letter_grade(percentage: f64) -> &'static str {
    if percentage >= 90.0 {
        "A+"
    } else if percentage >= 80.0 {
        "A"
    } else if percentage >= 70.0 {
        "B"
    } else if percentage >= 60.0 {
        "C"
    } else if percentage >= 50.0 {
        "D"
    } else {
        "F"
    }
}

pub fn summarize(record: &StudentRecord) -> Result<GradeSummary, FieldError> {
    let mut subjects = Vec::with_capacity(SUBJECTS.len());
    let mut grand_total = 0.0;
    let mut max_marks = 0.0;

    for subject in SUBJECTS {
        let marks = SubjectMarks {
            subject: subject.to_string(),
            unit_test: record.score(&format!("{subject}_UT"))?,
            practical: record.score(&format!("{subject}_Practical"))?,
            final_exam: record.score(&format!("{subject}_Final"))?,
        };
        grand_total += marks.total();
        max_marks += SUBJECT_MAX_MARKS;
        subjects.push(marks);
    }

    let percentage = grand_total / max_marks * 100.0;
    let cgpa = (percentage / 10.0 * 100.0).round() / 100.0;
    let grade = letter_grade(percentage);

    Ok(GradeSummary {
        subjects,
        grand_total,
        max_marks,
        percentage,
        cgpa,
        grade,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn uniform_record(name: &str, email: &str, mark: f64) -> StudentRecord {
        let mut fields = BTreeMap::new();
        fields.insert("Name".to_string(), name.to_string());
        fields.insert("RollNo".to_string(), "17".to_string());
        fields.insert("Course".to_string(), "B.Sc. CS".to_string());
        fields.insert("Semester".to_string(), "VI".to_string());
        fields.insert("Email".to_string(), email.to_string());
        for subject in SUBJECTS {
            for part in ["UT", "Practical", "Final"] {
                fields.insert(format!("{subject}_{part}"), mark.to_string());
            }
        }
        StudentRecord::new(fields)
    }

    #[test]
    fn boundaries_are_inclusive() {
        assert_eq!(letter_grade(90.0), "A+");
        assert_eq!(letter_grade(89.999), "A");
        assert_eq!(letter_grade(80.0), "A");
        assert_eq!(letter_grade(70.0), "B");
        assert_eq!(letter_grade(60.0), "C");
        assert_eq!(letter_grade(50.0), "D");
        assert_eq!(letter_grade(49.999), "F");
    }

    #[test]
    fn out_of_range_inputs_fall_into_end_buckets() {
        assert_eq!(letter_grade(-5.0), "F");
        assert_eq!(letter_grade(130.0), "A+");
    }

    #[test]
    fn full_marks_summarize_to_a_plus() {
        let record = uniform_record("Avery Lee", "avery@example.com", 50.0);
        let summary = summarize(&record).unwrap();
        assert_eq!(summary.grand_total, 750.0);
        assert_eq!(summary.max_marks, 750.0);
        assert_eq!(summary.percentage, 100.0);
        assert_eq!(summary.cgpa, 10.0);
        assert_eq!(summary.grade, "A+");
    }

    #[test]
    fn zero_marks_summarize_to_f() {
        let record = uniform_record("Avery Lee", "avery@example.com", 0.0);
        let summary = summarize(&record).unwrap();
        assert_eq!(summary.percentage, 0.0);
        assert_eq!(summary.grade, "F");
    }

    #[test]
    fn cgpa_rounds_to_two_decimals() {
        // 40+30+41 = 111 per subject, 555/750 = 74%, CGPA 7.4
        let mut fields = BTreeMap::new();
        fields.insert("Name".to_string(), "Jules Moreno".to_string());
        fields.insert("Email".to_string(), "jules@example.com".to_string());
        for subject in SUBJECTS {
            fields.insert(format!("{subject}_UT"), "40".to_string());
            fields.insert(format!("{subject}_Practical"), "30".to_string());
            fields.insert(format!("{subject}_Final"), "41".to_string());
        }
        let summary = summarize(&StudentRecord::new(fields)).unwrap();
        assert!((summary.percentage - 74.0).abs() < 1e-9);
        assert!((summary.cgpa - 7.4).abs() < 1e-9);
        assert_eq!(summary.grade, "B");
    }

    #[test]
    fn missing_score_column_propagates() {
        let mut fields = BTreeMap::new();
        fields.insert("Name".to_string(), "Kiara Patel".to_string());
        fields.insert("Email".to_string(), "kiara@example.com".to_string());
        let err = summarize(&StudentRecord::new(fields)).unwrap_err();
        assert_eq!(err, FieldError::Missing("AI_UT".to_string()));
    }
}
