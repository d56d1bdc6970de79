//! Analytics export: rebuilds whole-student CSV and JSON dumps from the
//! persisted per-question trace, adaptation log, and window summaries.
//! The column sets are fixed so downstream analysis scripts never see a
//! schema that depends on which optional fields were populated.

use serde_json::json;
use sqlx::SqlitePool;

use crate::db::operations::{adaptation, metrics, responses, sessions, students};

pub const PER_QUESTION_COLUMNS: [&str; 30] = [
    "session_id",
    "question_number",
    "timestamp",
    "question_id",
    "question_difficulty",
    "response_correctness",
    "response_time_seconds",
    "behavioral_response_time_deviation",
    "behavioral_inactivity_duration",
    "behavioral_hint_usage_count",
    "behavioral_rapid_guessing_probability",
    "cognitive_accuracy_trend",
    "cognitive_consistency_score",
    "cognitive_load",
    "affective_frustration_probability",
    "affective_confusion_probability",
    "affective_boredom_probability",
    "engagement_score",
    "engagement_categorical_state",
    "engagement_behavioral_component",
    "engagement_cognitive_component",
    "engagement_affective_component",
    "engagement_confidence",
    "engagement_primary_driver",
    "decision_primary_action",
    "decision_secondary_actions",
    "decision_difficulty_delta",
    "decision_rationale",
    "decision_engagement_influenced",
    "resulting_difficulty_level",
];

pub const PER_WINDOW_COLUMNS: [&str; 21] = [
    "session_id",
    "window_number",
    "timestamp",
    "window_size",
    "correct_count",
    "incorrect_count",
    "accuracy",
    "avg_response_time",
    "avg_engagement_score",
    "avg_behavioral_score",
    "avg_cognitive_score",
    "avg_affective_score",
    "dominant_engagement_state",
    "primary_driver_summary",
    "difficulty_at_start",
    "difficulty_at_end",
    "total_difficulty_change",
    "decisions_count",
    "increase_count",
    "decrease_count",
    "maintain_count",
];

/// Quotes a field when it contains a delimiter, quote, or newline;
/// internal quotes are doubled.
fn escape_csv(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn write_row(out: &mut String, fields: &[String]) {
    let mut first = true;
    for field in fields {
        if !first {
            out.push(',');
        }
        out.push_str(&escape_csv(field));
        first = false;
    }
    out.push('\n');
}

/// Rounds to `dp` decimal places and drops trailing zeros, so 0.5500
/// exports as 0.55 and 1.0000 as 1.
fn fmt_round(value: f64, dp: usize) -> String {
    let s = format!("{value:.dp$}");
    if s.contains('.') {
        let trimmed = s.trim_end_matches('0').trim_end_matches('.');
        trimmed.to_string()
    } else {
        s
    }
}

fn fmt_opt(value: Option<f64>, dp: usize) -> String {
    value.map(|v| fmt_round(v, dp)).unwrap_or_default()
}

fn fmt_opt_bool(value: Option<bool>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn question_row(
    metric: &metrics::EngagementMetricRow,
    log: Option<&adaptation::AdaptationLogRow>,
) -> Vec<String> {
    vec![
        metric.session_id.clone(),
        metric.question_number.to_string(),
        metric.timestamp.clone(),
        metric.question_id.clone().unwrap_or_default(),
        fmt_opt(metric.question_difficulty, 3),
        fmt_opt_bool(metric.response_correctness),
        fmt_opt(metric.response_time_seconds, 2),
        fmt_round(metric.response_time_deviation, 4),
        fmt_round(metric.inactivity_duration, 2),
        metric.hint_usage_count.to_string(),
        fmt_round(metric.rapid_guessing_probability, 4),
        fmt_round(metric.accuracy_trend, 4),
        fmt_round(metric.consistency_score, 4),
        fmt_round(metric.cognitive_load, 4),
        fmt_round(metric.frustration_probability, 4),
        fmt_round(metric.confusion_probability, 4),
        fmt_round(metric.boredom_probability, 4),
        fmt_round(metric.engagement_score, 4),
        metric.categorical_state.clone(),
        fmt_round(metric.behavioral_score, 4),
        fmt_round(metric.cognitive_score, 4),
        fmt_round(metric.affective_score, 4),
        fmt_round(metric.confidence, 4),
        metric.primary_driver.clone(),
        log.map(|l| l.primary_action.clone()).unwrap_or_default(),
        log.map(|l| l.secondary_actions.join(","))
            .unwrap_or_default(),
        fmt_opt(log.map(|l| l.difficulty_delta), 3),
        log.map(|l| l.reason.clone()).unwrap_or_default(),
        fmt_opt_bool(log.map(|l| l.engagement_influenced)),
        fmt_opt(metric.resulting_difficulty, 3),
    ]
}

fn window_row(row: &metrics::WindowSummaryRow) -> Vec<String> {
    vec![
        row.session_id.clone(),
        row.window_number.to_string(),
        row.timestamp.clone(),
        row.window_size.to_string(),
        row.correct_count.to_string(),
        row.incorrect_count.to_string(),
        fmt_round(row.accuracy, 4),
        fmt_round(row.avg_response_time, 2),
        fmt_round(row.avg_engagement_score, 4),
        fmt_round(row.avg_behavioral_score, 4),
        fmt_round(row.avg_cognitive_score, 4),
        fmt_round(row.avg_affective_score, 4),
        row.dominant_engagement_state.clone(),
        row.primary_driver_summary.clone(),
        fmt_opt(row.difficulty_at_start, 3),
        fmt_opt(row.difficulty_at_end, 3),
        fmt_opt(row.total_difficulty_change, 3),
        row.decisions_count.to_string(),
        row.increase_count.to_string(),
        row.decrease_count.to_string(),
        row.maintain_count.to_string(),
    ]
}

/// Per-question trace for every session of the student, one CSV with a
/// single header row. Sessions appear in start order.
pub async fn student_question_csv(
    pool: &SqlitePool,
    student_id: &str,
) -> Result<String, sqlx::Error> {
    let mut out = String::new();
    write_row(
        &mut out,
        &PER_QUESTION_COLUMNS.map(str::to_string),
    );

    for session in sessions::list_by_student(pool, student_id).await? {
        let trace = metrics::list_by_session(pool, &session.id).await?;
        let logs = adaptation::list_by_session(pool, &session.id).await?;
        for metric in &trace {
            let log = logs
                .iter()
                .find(|l| l.question_number == metric.question_number);
            write_row(&mut out, &question_row(metric, log));
        }
    }
    Ok(out)
}

/// Per-window summaries for every session of the student.
pub async fn student_window_csv(
    pool: &SqlitePool,
    student_id: &str,
) -> Result<String, sqlx::Error> {
    let mut out = String::new();
    write_row(&mut out, &PER_WINDOW_COLUMNS.map(str::to_string));

    for session in sessions::list_by_student(pool, student_id).await? {
        for row in metrics::list_windows_by_session(pool, &session.id).await? {
            write_row(&mut out, &window_row(&row));
        }
    }
    Ok(out)
}

/// Full JSON dump of a student's history: sessions with responses,
/// engagement trace, adaptation log, window summaries, and a rollup.
pub async fn student_export_json(
    pool: &SqlitePool,
    student_id: &str,
) -> Result<Option<serde_json::Value>, sqlx::Error> {
    let Some(student) = students::get(pool, student_id).await? else {
        return Ok(None);
    };

    let session_list = sessions::list_by_student(pool, student_id).await?;
    let mut sessions_json = Vec::new();
    let mut total_answered: i64 = 0;
    let mut total_correct: i64 = 0;
    let mut engagement_sum = 0.0;
    let mut engagement_count: i64 = 0;
    let mut subjects: Vec<String> = Vec::new();

    for session in &session_list {
        let response_rows = responses::list_by_session(pool, &session.id).await?;
        let trace = metrics::list_by_session(pool, &session.id).await?;
        let logs = adaptation::list_by_session(pool, &session.id).await?;
        let windows = metrics::list_windows_by_session(pool, &session.id).await?;

        total_answered += response_rows.len() as i64;
        total_correct += response_rows.iter().filter(|r| r.is_correct).count() as i64;
        for metric in &trace {
            engagement_sum += metric.engagement_score;
            engagement_count += 1;
        }
        if !subjects.contains(&session.subject) {
            subjects.push(session.subject.clone());
        }

        sessions_json.push(json!({
            "session": session,
            "responses": response_rows,
            "engagement_metrics": trace,
            "adaptation_logs": logs,
            "window_summaries": windows,
        }));
    }

    let overall_score = if total_answered > 0 {
        total_correct as f64 / total_answered as f64 * 100.0
    } else {
        0.0
    };
    let average_engagement = if engagement_count > 0 {
        engagement_sum / engagement_count as f64
    } else {
        0.0
    };

    Ok(Some(json!({
        "student_id": student.id,
        "student_name": student.name,
        "student_email": student.email,
        "export_date": chrono::Utc::now().to_rfc3339(),
        "sessions": sessions_json,
        "summary": {
            "total_sessions": session_list.len(),
            "total_questions_answered": total_answered,
            "total_correct_answers": total_correct,
            "overall_score_percentage": overall_score,
            "average_engagement": average_engagement,
            "subjects_studied": subjects,
        },
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_quotes_commas_and_newlines() {
        assert_eq!(escape_csv("plain"), "plain");
        assert_eq!(escape_csv("a,b"), "\"a,b\"");
        assert_eq!(escape_csv("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(escape_csv("two\nlines"), "\"two\nlines\"");
    }

    #[test]
    fn rounding_trims_trailing_zeros() {
        assert_eq!(fmt_round(0.55, 3), "0.55");
        assert_eq!(fmt_round(1.0, 4), "1");
        assert_eq!(fmt_round(0.123449, 4), "0.1234");
        assert_eq!(fmt_round(0.1, 2), "0.1");
    }

    #[test]
    fn header_layout_is_fixed() {
        assert_eq!(PER_QUESTION_COLUMNS.len(), 30);
        assert_eq!(PER_QUESTION_COLUMNS[0], "session_id");
        assert_eq!(PER_QUESTION_COLUMNS[29], "resulting_difficulty_level");
        assert_eq!(PER_WINDOW_COLUMNS.len(), 21);
        assert_eq!(PER_WINDOW_COLUMNS[20], "maintain_count");
    }
}
