//! Plain-text rendering for terminal output.

use caddie_core::{
    RoundStats, ShotGeometry, WindObservation,
    geometry::compass_label,
    model::{Club, Round, UserProfile},
    round::{format_handicap, format_relative_score},
};

/// `4.3 m/s NE (gusts 9.0 m/s)`, or `calm` under 1 m/s.
pub fn wind_line(wind: &WindObservation) -> String {
    if wind.is_calm() {
        return format!("calm ({:.1} m/s)", wind.speed_mps);
    }

    let mut line = format!("{:.1} m/s {}", wind.speed_mps, wind.compass_label());
    if wind.is_gusty() {
        line.push_str(&format!(" (gusts {:.1} m/s)", wind.gust_mps));
    }
    line
}

pub fn weather_report(wind: &WindObservation) -> String {
    format!(
        "Temperature: {:.0}°C\nHumidity:    {:.0}%\nWind:        {} from {:.0}°",
        wind.temperature_c,
        wind.humidity_pct,
        wind_line(wind),
        wind.direction_deg,
    )
}

pub fn shot_report(shot: &ShotGeometry, wind: &WindObservation) -> String {
    format!(
        "Distance: {} meters\nBearing:  {:.1}° ({})\nWind:     {}, {}",
        shot.distance_m,
        shot.bearing_deg,
        compass_label(shot.bearing_deg),
        wind_line(wind),
        shot.wind,
    )
}

pub fn profile(user: &UserProfile) -> String {
    let mut out = format!("{} <{}>", user.full_name(), user.email);
    if let Some(handicap) = user.handicap_index {
        out.push_str(&format!("\nHandicap: {}", format_handicap(handicap)));
    }
    if let Some(updated) = &user.last_handicap_update {
        out.push_str(&format!(" (updated {updated})"));
    }
    out
}

pub fn club_line(club: &Club) -> String {
    let star = if club.preferred_club { " *" } else { "" };
    format!("{:<16} {:>5.0} m{star}", club.club, club.distance_meter)
}

/// One-line summary for history listings.
pub fn round_line(round: &Round) -> String {
    let date = round
        .started_at()
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| round.start_time.clone());
    let status = match round.duration_minutes() {
        _ if !round.is_completed => " (in progress)".to_string(),
        Some(minutes) => format!("  {}", duration(minutes)),
        None => String::new(),
    };

    format!(
        "#{:<5} {date}  {:<24} {:>3} shots  {}{status}",
        round.id,
        round.course_name,
        round.total_shots,
        format_relative_score(round.score_relative_to_par),
    )
}

/// `2h 15m`, or `45m` under an hour.
pub fn duration(minutes: i64) -> String {
    match (minutes / 60, minutes % 60) {
        (0, m) => format!("{m}m"),
        (h, m) => format!("{h}h {m:02}m"),
    }
}

/// Scorecard with one row per hole.
pub fn scorecard(round: &Round, current_hole: Option<u32>) -> String {
    let mut out = format!(
        "{} - {} holes, par {}\n",
        round.course_name, round.total_holes, round.total_par
    );

    for hole in &round.hole_scores {
        let marker = if Some(hole.hole_number) == current_hole { ">" } else { " " };
        let score = if hole.shots == 0 {
            "-".to_string()
        } else {
            format_relative_score(hole.score_relative_to_par)
        };
        out.push_str(&format!(
            "{marker} Hole {:>2}  par {}  shots {:>2}  {score}\n",
            hole.hole_number, hole.par, hole.shots
        ));
    }

    out.push_str(&format!(
        "Total: {} shots ({})",
        round.total_shots,
        format_relative_score(round.score_relative_to_par)
    ));
    if let Some(minutes) = round.duration_minutes() {
        out.push_str(&format!("\nDuration: {}", duration(minutes)));
    }
    if let Some(notes) = &round.notes {
        out.push_str(&format!("\nNotes: {notes}"));
    }
    out
}

pub fn stats(stats: &RoundStats) -> String {
    let best = stats.best_score.map(format_relative_score).unwrap_or_else(|| "-".to_string());

    format!(
        "Rounds played: {}\nAverage score: {}\nBest score:    {best}\n\
         Efficiency:    {}% of par\nTotal shots:   {} (par {})",
        stats.rounds_played,
        stats.average_score,
        stats.efficiency_pct,
        stats.total_shots,
        stats.total_par,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use caddie_core::{WindClassification, model::HoleScore};

    #[test]
    fn calm_wind_skips_direction() {
        let wind = WindObservation { speed_mps: 0.4, direction_deg: 200.0, ..Default::default() };
        assert_eq!(wind_line(&wind), "calm (0.4 m/s)");
    }

    #[test]
    fn gusts_are_mentioned_when_notable() {
        let wind = WindObservation {
            speed_mps: 4.3,
            direction_deg: 45.0,
            gust_mps: 9.0,
            ..Default::default()
        };
        assert_eq!(wind_line(&wind), "4.3 m/s NE (gusts 9.0 m/s)");

        let steady = WindObservation { gust_mps: 5.0, ..wind };
        assert_eq!(wind_line(&steady), "4.3 m/s NE");
    }

    #[test]
    fn shot_report_lists_distance_and_classification() {
        let shot = ShotGeometry {
            distance_m: 148,
            bearing_deg: 92.4,
            wind: WindClassification::CrosswindLeft,
        };
        let wind = WindObservation { speed_mps: 3.0, direction_deg: 0.0, ..Default::default() };

        let report = shot_report(&shot, &wind);
        assert!(report.contains("Distance: 148 meters"));
        assert!(report.contains("92.4° (E)"));
        assert!(report.ends_with("3.0 m/s N, crosswind-left"));
    }

    fn hole(hole_number: u32, par: u32, shots: u32, score_relative_to_par: i32) -> HoleScore {
        HoleScore { hole_number, par, shots, score_relative_to_par, notes: None }
    }

    #[test]
    fn scorecard_marks_current_hole() {
        let round = Round {
            id: 1,
            course_name: "Links".into(),
            total_holes: 2,
            total_par: 7,
            total_shots: 5,
            score_relative_to_par: -2,
            start_time: "2025-06-01T09:00:00".into(),
            end_time: None,
            is_completed: false,
            notes: None,
            hole_scores: vec![
                hole(1, 4, 5, 1),
                hole(2, 3, 0, -3),
            ],
        };

        let card = scorecard(&round, Some(2));
        assert!(card.contains("  Hole  1  par 4  shots  5  +1"));
        assert!(card.contains("> Hole  2  par 3  shots  0  -"));
        assert!(card.ends_with("Total: 5 shots (-2)"));

        assert!(round_line(&round).contains("2025-06-01"));
        assert!(round_line(&round).ends_with("(in progress)"));
    }

    #[test]
    fn completed_rounds_show_duration() {
        let round = Round {
            id: 4,
            course_name: "Links".into(),
            total_holes: 1,
            total_par: 4,
            total_shots: 4,
            score_relative_to_par: 0,
            start_time: "2025-06-01T09:00:00".into(),
            end_time: Some("2025-06-01T11:05:00".into()),
            is_completed: true,
            notes: None,
            hole_scores: vec![hole(1, 4, 4, 0)],
        };

        assert!(round_line(&round).ends_with("Even  2h 05m"));
        assert!(scorecard(&round, None).ends_with("Duration: 2h 05m"));
        assert_eq!(duration(45), "45m");
    }
}
