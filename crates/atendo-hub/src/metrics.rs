// SPDX-FileCopyrightText: 2026 Atendo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metrics aggregator: derived operational statistics over session history.
//!
//! All statistics are folds over an already-fetched session list; the
//! aggregator never reads the store itself. Missing data yields `None`,
//! never a fabricated zero. Rounding is half away from zero throughout
//! (which is what `f64::round` does).

use atendo_core::types::{MetricsSnapshot, Session, SessionStatus};

/// Fold a session list into a [`MetricsSnapshot`].
///
/// `window_start..=window_end` (epoch millis, inclusive) bounds the
/// "today" window on `accepted_at`; active count spans all provided
/// sessions regardless of window.
pub fn compute_metrics(
    sessions: &[Session],
    window_start: i64,
    window_end: i64,
    queue_size: u64,
) -> MetricsSnapshot {
    let windowed: Vec<&Session> = sessions
        .iter()
        .filter(|s| s.accepted_at >= window_start && s.accepted_at <= window_end)
        .collect();
    let closed: Vec<&&Session> = windowed
        .iter()
        .filter(|s| s.status == SessionStatus::Closed)
        .collect();

    let avg_wait_ms = average(
        windowed
            .iter()
            .map(|s| s.wait_time_ms)
            .filter(|&w| w >= 0),
    );
    let avg_handle_ms = average(
        closed
            .iter()
            .filter_map(|s| s.handle_time_ms)
            .filter(|&h| h >= 0),
    );

    let fcr_values: Vec<bool> = closed
        .iter()
        .filter_map(|s| s.first_contact_resolution)
        .collect();
    let fcr_percent = if fcr_values.is_empty() {
        None
    } else {
        let resolved = fcr_values.iter().filter(|&&v| v).count();
        Some(round_ratio(resolved as f64, fcr_values.len() as f64))
    };

    let nps_scores: Vec<i64> = closed.iter().filter_map(|s| s.nps_score).collect();
    let nps = if nps_scores.is_empty() {
        None
    } else {
        let promoters = nps_scores.iter().filter(|&&s| s >= 9).count() as f64;
        let detractors = nps_scores.iter().filter(|&&s| s <= 6).count() as f64;
        Some(round_ratio(promoters - detractors, nps_scores.len() as f64))
    };

    MetricsSnapshot {
        sessions_today: windowed.len() as u64,
        active_sessions: sessions
            .iter()
            .filter(|s| s.status == SessionStatus::Active)
            .count() as u64,
        avg_wait_ms,
        avg_handle_ms,
        fcr_percent,
        nps,
        queue_size,
    }
}

fn average(values: impl Iterator<Item = i64>) -> Option<i64> {
    let collected: Vec<i64> = values.collect();
    if collected.is_empty() {
        return None;
    }
    let sum: i64 = collected.iter().sum();
    Some((sum as f64 / collected.len() as f64).round() as i64)
}

/// round((numerator / denominator) * 100), half away from zero.
fn round_ratio(numerator: f64, denominator: f64) -> i64 {
    ((numerator / denominator) * 100.0).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use atendo_core::types::now_ms;
    use proptest::prelude::*;
    use serde_json::Map;

    fn session(accepted_at: i64, status: SessionStatus) -> Session {
        Session {
            id: "S".into(),
            request_id: "R".into(),
            client_connection_id: "c".into(),
            client_name: None,
            client_uid: None,
            tech_name: None,
            tech_id: None,
            tech_uid: None,
            brand: None,
            model: None,
            os_version: None,
            plan: None,
            issue: None,
            requested_at: accepted_at - 1000,
            accepted_at,
            wait_time_ms: 1000,
            status,
            closed_at: None,
            handle_time_ms: None,
            outcome: None,
            symptom: None,
            solution: None,
            notes: None,
            first_contact_resolution: None,
            nps_score: None,
            telemetry: Map::new(),
            last_message_at: None,
            last_command: None,
            updated_at: accepted_at,
        }
    }

    fn closed(accepted_at: i64, handle: i64, fcr: Option<bool>, nps: Option<i64>) -> Session {
        let mut s = session(accepted_at, SessionStatus::Closed);
        s.closed_at = Some(accepted_at + handle);
        s.handle_time_ms = Some(handle);
        s.first_contact_resolution = fcr;
        s.nps_score = nps;
        s
    }

    #[test]
    fn empty_history_yields_nulls_not_zeros() {
        let m = compute_metrics(&[], 0, now_ms(), 3);
        assert_eq!(
            m,
            MetricsSnapshot {
                sessions_today: 0,
                active_sessions: 0,
                avg_wait_ms: None,
                avg_handle_ms: None,
                fcr_percent: None,
                nps: None,
                queue_size: 3,
            }
        );
    }

    #[test]
    fn window_bounds_are_inclusive_on_accepted_at() {
        let sessions = vec![
            session(100, SessionStatus::Active),
            session(200, SessionStatus::Active),
            session(300, SessionStatus::Active),
        ];
        let m = compute_metrics(&sessions, 100, 200, 0);
        assert_eq!(m.sessions_today, 2);
        // Active count ignores the window.
        assert_eq!(m.active_sessions, 3);
    }

    #[test]
    fn averages_round_half_away_from_zero() {
        let mut a = session(100, SessionStatus::Active);
        a.wait_time_ms = 1;
        let mut b = session(100, SessionStatus::Active);
        b.wait_time_ms = 2;
        // (1 + 2) / 2 = 1.5 -> 2
        let m = compute_metrics(&[a, b], 0, 1000, 0);
        assert_eq!(m.avg_wait_ms, Some(2));
    }

    #[test]
    fn fcr_percent_only_counts_sessions_with_a_verdict() {
        let sessions = vec![
            closed(100, 10, Some(true), None),
            closed(100, 10, Some(true), None),
            closed(100, 10, Some(false), None),
            closed(100, 10, None, None),
            session(100, SessionStatus::Active),
        ];
        let m = compute_metrics(&sessions, 0, 1000, 0);
        // 2 of 3 verdicts resolved: 66.67 -> 67.
        assert_eq!(m.fcr_percent, Some(67));
        assert_eq!(m.avg_handle_ms, Some(10));
    }

    #[test]
    fn nps_mixes_promoters_and_detractors() {
        let sessions = vec![
            closed(100, 10, None, Some(10)), // promoter
            closed(100, 10, None, Some(9)),  // promoter
            closed(100, 10, None, Some(7)),  // passive
            closed(100, 10, None, Some(2)),  // detractor
        ];
        let m = compute_metrics(&sessions, 0, 1000, 0);
        // (2 - 1) / 4 * 100 = 25.
        assert_eq!(m.nps, Some(25));
    }

    #[test]
    fn all_detractors_give_negative_nps() {
        let sessions = vec![closed(100, 10, None, Some(0)), closed(100, 10, None, Some(3))];
        let m = compute_metrics(&sessions, 0, 1000, 0);
        assert_eq!(m.nps, Some(-100));
    }

    proptest! {
        #[test]
        fn nps_stays_within_bounds(scores in proptest::collection::vec(0i64..=10, 1..50)) {
            let sessions: Vec<Session> = scores
                .iter()
                .map(|&score| closed(100, 10, None, Some(score)))
                .collect();
            let m = compute_metrics(&sessions, 0, 1000, 0);
            let nps = m.nps.unwrap();
            prop_assert!((-100..=100).contains(&nps));
        }

        #[test]
        fn avg_wait_never_exceeds_the_extremes(waits in proptest::collection::vec(0i64..1_000_000, 1..50)) {
            let sessions: Vec<Session> = waits
                .iter()
                .map(|&w| {
                    let mut s = session(100, SessionStatus::Active);
                    s.wait_time_ms = w;
                    s
                })
                .collect();
            let m = compute_metrics(&sessions, 0, 1000, 0);
            let avg = m.avg_wait_ms.unwrap();
            prop_assert!(avg >= *waits.iter().min().unwrap());
            prop_assert!(avg <= *waits.iter().max().unwrap());
        }
    }
}
