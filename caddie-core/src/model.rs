use std::{fmt, str::FromStr};

use anyhow::anyhow;
use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize, ser::SerializeStruct};

use crate::geometry;

/// A WGS-84 coordinate in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", self.latitude, self.longitude)
    }
}

/// Current conditions at a point, as reported by a weather provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WindObservation {
    pub speed_mps: f64,
    /// Meteorological convention: where the wind blows *from*.
    pub direction_deg: f64,
    pub gust_mps: f64,
    pub temperature_c: f64,
    pub humidity_pct: f64,
}

impl WindObservation {
    /// Too little wind to be worth drawing an arrow for.
    pub fn is_calm(&self) -> bool {
        self.speed_mps < 1.0
    }

    /// Gusts noticeably stronger than the sustained wind.
    pub fn is_gusty(&self) -> bool {
        self.gust_mps > self.speed_mps + 1.0
    }

    pub fn compass_label(&self) -> &'static str {
        geometry::compass_label(self.direction_deg)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WindClassification {
    Headwind,
    Tailwind,
    CrosswindLeft,
    CrosswindRight,
}

impl WindClassification {
    pub fn as_str(&self) -> &'static str {
        match self {
            WindClassification::Headwind => "headwind",
            WindClassification::Tailwind => "tailwind",
            WindClassification::CrosswindLeft => "crosswind-left",
            WindClassification::CrosswindRight => "crosswind-right",
        }
    }
}

impl fmt::Display for WindClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of [`geometry::shot_geometry`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ShotGeometry {
    pub distance_m: u32,
    pub bearing_deg: f64,
    pub wind: WindClassification,
}

/// The lie of the ball. Exactly one applies to a shot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Surface {
    #[default]
    Fairway,
    LightRough,
    HeavyRough,
    Hardpan,
    Divot,
    Bunker,
}

impl Surface {
    pub fn as_str(&self) -> &'static str {
        match self {
            Surface::Fairway => "fairway",
            Surface::LightRough => "light_rough",
            Surface::HeavyRough => "heavy_rough",
            Surface::Hardpan => "hardpan",
            Surface::Divot => "divot",
            Surface::Bunker => "bunker",
        }
    }

    pub const fn all() -> &'static [Surface] {
        &[
            Surface::Fairway,
            Surface::LightRough,
            Surface::HeavyRough,
            Surface::Hardpan,
            Surface::Divot,
            Surface::Bunker,
        ]
    }
}

impl fmt::Display for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Surface {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let lower = value.trim().to_lowercase().replace(['-', ' '], "_");

        Surface::all().iter().copied().find(|s| s.as_str() == lower).ok_or_else(|| {
            anyhow!(
                "Unknown surface '{value}'. Expected one of: fairway, light_rough, heavy_rough, \
                 hardpan, divot, bunker."
            )
        })
    }
}

/// Lie and stance for a shot. The backend expects every surface and flag as
/// its own boolean field, so this serializes flat.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShotConditions {
    pub surface: Surface,
    pub uphill: bool,
    pub downhill: bool,
    pub ball_above_feet: bool,
    pub ball_below_feet: bool,
    pub wet_ground: bool,
    pub firm_ground: bool,
}

impl ShotConditions {
    /// Human-readable list of the active stance/ground flags.
    pub fn active_flags(&self) -> Vec<&'static str> {
        [
            (self.uphill, "uphill"),
            (self.downhill, "downhill"),
            (self.ball_above_feet, "ball above feet"),
            (self.ball_below_feet, "ball below feet"),
            (self.wet_ground, "wet ground"),
            (self.firm_ground, "firm ground"),
        ]
        .into_iter()
        .filter_map(|(on, label)| on.then_some(label))
        .collect()
    }
}

impl Serialize for ShotConditions {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ShotConditions", 12)?;
        for surface in Surface::all() {
            state.serialize_field(surface.as_str(), &(self.surface == *surface))?;
        }
        state.serialize_field("uphill", &self.uphill)?;
        state.serialize_field("downhill", &self.downhill)?;
        state.serialize_field("ball_above_feet", &self.ball_above_feet)?;
        state.serialize_field("ball_below_feet", &self.ball_below_feet)?;
        state.serialize_field("wet_ground", &self.wet_ground)?;
        state.serialize_field("firm_ground", &self.firm_ground)?;
        state.end()
    }
}

/// Body of a club recommendation query.
#[derive(Debug, Clone, Serialize)]
pub struct RecommendationRequest {
    pub wind_speed: f64,
    pub wind_direction: WindClassification,
    pub distance_to_flag: u32,
    #[serde(flatten)]
    pub conditions: ShotConditions,
}

impl RecommendationRequest {
    pub fn for_shot(
        shot: &ShotGeometry,
        wind: &WindObservation,
        conditions: ShotConditions,
    ) -> anyhow::Result<Self> {
        if shot.distance_m == 0 {
            return Err(anyhow!("Target distance is 0 m. Pick a target away from the ball first."));
        }

        Ok(Self {
            wind_speed: wind.speed_mps,
            wind_direction: shot.wind,
            distance_to_flag: shot.distance_m,
            conditions,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub answer: String,
    /// Opaque id echoed back when submitting feedback.
    #[serde(default)]
    pub timestamp: Option<String>,
    pub wind_speed: f64,
    pub wind_direction: String,
    pub distance_to_flag: f64,
    #[serde(default)]
    pub user_email: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ShotFeedback {
    pub timestamp: String,
    pub liked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub club_used: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shot_result: Option<String>,
}

impl ShotFeedback {
    /// Blank optional answers are dropped rather than sent as empty strings.
    pub fn new(
        timestamp: String,
        liked: bool,
        club_used: Option<String>,
        shot_result: Option<String>,
    ) -> Self {
        let non_blank =
            |s: Option<String>| s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());

        Self {
            timestamp,
            liked,
            club_used: non_blank(club_used),
            shot_result: non_blank(shot_result),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Club {
    pub club: String,
    pub distance_meter: f64,
    #[serde(default)]
    pub preferred_club: bool,
}

impl Club {
    /// Build a club from free-form input, as typed into a form.
    pub fn parse(name: &str, distance: &str, preferred_club: bool) -> anyhow::Result<Self> {
        let club = name.trim();
        if club.is_empty() {
            return Err(anyhow!("Club name must not be empty"));
        }

        let distance_meter: f64 = distance
            .trim()
            .parse()
            .map_err(|_| anyhow!("Distance for '{club}' must be a number, got '{distance}'"))?;

        if !distance_meter.is_finite() || distance_meter <= 0.0 {
            return Err(anyhow!("Distance for '{club}' must be positive, got {distance_meter}"));
        }

        Ok(Self { club: club.to_string(), distance_meter, preferred_club })
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ClubUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub club: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_meter: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_club: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub handicap_index: Option<f64>,
    #[serde(default)]
    pub last_handicap_update: Option<String>,
}

impl UserProfile {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Merge the names echoed back by `PUT /profile`.
    pub fn apply_update(&mut self, update: &ProfileUpdate) {
        if let Some(first_name) = &update.first_name {
            self.first_name.clone_from(first_name);
        }
        if let Some(last_name) = &update.last_name {
            self.last_name.clone_from(last_name);
        }
    }
}

pub const DEFAULT_INITIAL_HANDICAP: f64 = 54.0;

/// Best (plus) handicap accepted at registration, written as a negative number.
pub const MIN_HANDICAP: f64 = -7.0;
pub const MAX_HANDICAP: f64 = 54.0;

pub const MIN_PASSWORD_LEN: usize = 8;

pub fn validate_handicap(handicap: f64) -> anyhow::Result<f64> {
    if !handicap.is_finite() {
        return Err(anyhow!("Handicap must be a number"));
    }
    if handicap < MIN_HANDICAP {
        return Err(anyhow!("Plus handicap cannot be better than +7"));
    }
    if handicap > MAX_HANDICAP {
        return Err(anyhow!("Handicap cannot be higher than 54"));
    }
    Ok(handicap)
}

fn validate_new_password(password: &str) -> anyhow::Result<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(anyhow!("Password must be at least {MIN_PASSWORD_LEN} characters long"));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
    pub initial_handicap: f64,
}

impl Registration {
    pub fn new(
        email: &str,
        first_name: &str,
        last_name: &str,
        password: &str,
        initial_handicap: f64,
    ) -> anyhow::Result<Self> {
        let email = email.trim().to_lowercase();
        if !email.contains('@') {
            return Err(anyhow!("'{email}' is not a valid email address"));
        }

        let (first_name, last_name) = (first_name.trim(), last_name.trim());
        if first_name.is_empty() || last_name.is_empty() {
            return Err(anyhow!("First and last name are required"));
        }

        validate_new_password(password)?;

        Ok(Self {
            email,
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            password: password.to_string(),
            initial_handicap: validate_handicap(initial_handicap)?,
        })
    }
}

/// Name change request. The backend answers with the same shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
}

impl PasswordChange {
    pub fn new(current_password: &str, new_password: &str) -> anyhow::Result<Self> {
        if current_password.is_empty() {
            return Err(anyhow!("Current password is required"));
        }
        validate_new_password(new_password)?;
        if current_password == new_password {
            return Err(anyhow!("New password must be different from current password"));
        }

        Ok(Self {
            current_password: current_password.to_string(),
            new_password: new_password.to_string(),
        })
    }
}

/// Par assumed for a hole until the player sets it.
pub const DEFAULT_PAR: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoleConfig {
    pub hole_number: u32,
    pub par: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct StartRound {
    pub course_name: String,
    pub total_holes: u32,
    pub holes_config: Vec<HoleConfig>,
}

impl StartRound {
    pub fn new(course_name: &str, total_holes: u32) -> anyhow::Result<Self> {
        let course_name = course_name.trim();
        if course_name.is_empty() {
            return Err(anyhow!("Please enter a course name"));
        }
        if total_holes == 0 {
            return Err(anyhow!("A round needs at least one hole"));
        }

        let holes_config = (1..=total_holes)
            .map(|hole_number| HoleConfig { hole_number, par: DEFAULT_PAR })
            .collect();

        Ok(Self { course_name: course_name.to_string(), total_holes, holes_config })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoleScore {
    pub hole_number: u32,
    pub par: u32,
    pub shots: u32,
    pub score_relative_to_par: i32,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Round {
    pub id: i64,
    pub course_name: String,
    pub total_holes: u32,
    pub total_par: u32,
    pub total_shots: u32,
    pub score_relative_to_par: i32,
    pub start_time: String,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub hole_scores: Vec<HoleScore>,
}

impl Round {
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        parse_backend_time(&self.start_time)
    }

    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.end_time.as_deref().and_then(parse_backend_time)
    }

    /// Whole minutes from tee-off to completion. `None` while in progress.
    pub fn duration_minutes(&self) -> Option<i64> {
        let minutes = (self.ended_at()? - self.started_at()?).num_minutes();
        (minutes >= 0).then_some(minutes)
    }
}

/// Backend timestamps are ISO-8601, with or without an offset. Offset-less
/// values are taken as UTC.
pub fn parse_backend_time(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::<FixedOffset>::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f").ok().map(|ndt| ndt.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn wind_classification_wire_strings() {
        let encoded = serde_json::to_value([
            WindClassification::Headwind,
            WindClassification::Tailwind,
            WindClassification::CrosswindLeft,
            WindClassification::CrosswindRight,
        ])
        .unwrap();

        assert_eq!(encoded, json!(["headwind", "tailwind", "crosswind-left", "crosswind-right"]));
        assert_eq!(WindClassification::CrosswindLeft.to_string(), "crosswind-left");
    }

    #[test]
    fn recommendation_request_is_flat() {
        let shot = ShotGeometry {
            distance_m: 152,
            bearing_deg: 12.0,
            wind: WindClassification::CrosswindRight,
        };
        let wind = WindObservation { speed_mps: 4.2, direction_deg: 100.0, ..Default::default() };
        let conditions =
            ShotConditions { surface: Surface::LightRough, uphill: true, ..Default::default() };

        let request = RecommendationRequest::for_shot(&shot, &wind, conditions).unwrap();
        let body = serde_json::to_value(&request).unwrap();

        assert_eq!(
            body,
            json!({
                "wind_speed": 4.2,
                "wind_direction": "crosswind-right",
                "distance_to_flag": 152,
                "fairway": false,
                "light_rough": true,
                "heavy_rough": false,
                "hardpan": false,
                "divot": false,
                "bunker": false,
                "uphill": true,
                "downhill": false,
                "ball_above_feet": false,
                "ball_below_feet": false,
                "wet_ground": false,
                "firm_ground": false,
            })
        );
    }

    #[test]
    fn recommendation_needs_a_target() {
        let shot =
            ShotGeometry { distance_m: 0, bearing_deg: 0.0, wind: WindClassification::Headwind };
        let err = RecommendationRequest::for_shot(
            &shot,
            &WindObservation::default(),
            ShotConditions::default(),
        )
        .unwrap_err();

        assert!(err.to_string().contains("Pick a target"));
    }

    #[test]
    fn feedback_drops_blank_answers() {
        let fb =
            ShotFeedback::new("2025-06-01T10:00:00".into(), true, Some("  ".into()), None);
        assert_eq!(
            serde_json::to_value(&fb).unwrap(),
            json!({ "timestamp": "2025-06-01T10:00:00", "liked": true })
        );

        let fb =
            ShotFeedback::new("t".into(), false, Some(" 7 iron ".into()), Some("short".into()));
        assert_eq!(
            serde_json::to_value(&fb).unwrap(),
            json!({
                "timestamp": "t",
                "liked": false,
                "club_used": "7 iron",
                "shot_result": "short"
            })
        );
    }

    #[test]
    fn surface_parsing_is_forgiving() {
        assert_eq!("Light Rough".parse::<Surface>().unwrap(), Surface::LightRough);
        assert_eq!("heavy-rough".parse::<Surface>().unwrap(), Surface::HeavyRough);
        assert!("sand".parse::<Surface>().unwrap_err().to_string().contains("Unknown surface"));
    }

    #[test]
    fn active_flags_lists_only_set_flags() {
        let conditions =
            ShotConditions { downhill: true, wet_ground: true, ..ShotConditions::default() };
        assert_eq!(conditions.active_flags(), vec!["downhill", "wet ground"]);
    }

    #[test]
    fn club_parse_validates_form_input() {
        let club = Club::parse(" Driver ", "235.5", true).unwrap();
        assert_eq!(club.club, "Driver");
        assert_eq!(club.distance_meter, 235.5);
        assert!(club.preferred_club);

        assert!(Club::parse("", "100", false).is_err());
        assert!(Club::parse("7 iron", "far", false).unwrap_err().to_string().contains("number"));
        assert!(Club::parse("7 iron", "-3", false).is_err());
    }

    #[test]
    fn registration_validates_form_input() {
        let reg = Registration::new(" Ada@Example.com ", "Ada", " Lovelace ", "analytical", -2.5)
            .unwrap();
        assert_eq!(reg.email, "ada@example.com");
        assert_eq!(reg.last_name, "Lovelace");
        assert_eq!(reg.initial_handicap, -2.5);

        assert!(Registration::new("ada", "Ada", "L", "analytical", 10.0).is_err());
        assert!(Registration::new("a@b.c", "", "L", "analytical", 10.0).is_err());
        assert!(Registration::new("a@b.c", "A", "L", "short", 10.0).is_err());
        assert!(Registration::new("a@b.c", "A", "L", "analytical", 60.0).is_err());
    }

    #[test]
    fn handicap_bounds() {
        assert_eq!(validate_handicap(DEFAULT_INITIAL_HANDICAP).unwrap(), 54.0);
        assert_eq!(validate_handicap(-7.0).unwrap(), -7.0);
        assert!(validate_handicap(-7.1).unwrap_err().to_string().contains("+7"));
        assert!(validate_handicap(f64::NAN).is_err());
    }

    #[test]
    fn password_change_rules() {
        assert!(PasswordChange::new("old-password", "new-password").is_ok());
        assert!(PasswordChange::new("", "new-password").is_err());
        assert!(PasswordChange::new("old-password", "short").is_err());
        assert!(
            PasswordChange::new("same-password", "same-password")
                .unwrap_err()
                .to_string()
                .contains("different")
        );
    }

    #[test]
    fn start_round_fills_default_par() {
        let start = StartRound::new("  Augusta ", 9).unwrap();
        assert_eq!(start.course_name, "Augusta");
        assert_eq!(start.holes_config.len(), 9);
        assert_eq!(start.holes_config[0], HoleConfig { hole_number: 1, par: DEFAULT_PAR });
        assert_eq!(start.holes_config[8].hole_number, 9);

        assert!(StartRound::new("   ", 18).is_err());
        assert!(StartRound::new("Augusta", 0).is_err());
    }

    #[test]
    fn round_parses_backend_payload() {
        let round: Round = serde_json::from_value(json!({
            "id": 7,
            "course_name": "Links",
            "total_holes": 2,
            "total_par": 8,
            "total_shots": 9,
            "score_relative_to_par": 1,
            "start_time": "2025-05-02T08:15:00.123456",
            "end_time": "2025-05-02T10:00:00+02:00",
            "is_completed": true,
            "hole_scores": [
                { "hole_number": 1, "par": 4, "shots": 5, "score_relative_to_par": 1 },
                {
                    "hole_number": 2,
                    "par": 4,
                    "shots": 4,
                    "score_relative_to_par": 0,
                    "notes": "pin high"
                }
            ]
        }))
        .unwrap();

        assert_eq!(round.hole_scores.len(), 2);
        assert_eq!(round.notes, None);
        assert_eq!(
            round.started_at().unwrap().to_rfc3339(),
            "2025-05-02T08:15:00.123456+00:00"
        );
        assert_eq!(round.ended_at().unwrap().to_rfc3339(), "2025-05-02T08:00:00+00:00");
    }

    #[test]
    fn round_duration_needs_both_ends() {
        let mut round: Round = serde_json::from_value(json!({
            "id": 1,
            "course_name": "Links",
            "total_holes": 9,
            "total_par": 36,
            "total_shots": 40,
            "score_relative_to_par": 4,
            "start_time": "2025-05-02T08:15:00"
        }))
        .unwrap();
        assert_eq!(round.duration_minutes(), None);

        round.end_time = Some("2025-05-02T10:30:59".into());
        assert_eq!(round.duration_minutes(), Some(135));

        round.end_time = Some("2025-05-02T08:00:00".into());
        assert_eq!(round.duration_minutes(), None);
    }

    #[test]
    fn profile_update_merges_returned_names() {
        let mut user = UserProfile {
            id: 3,
            email: "ada@example.com".into(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            is_admin: false,
            handicap_index: Some(12.4),
            last_handicap_update: None,
        };

        let echoed: ProfileUpdate = serde_json::from_str(r#"{"last_name":"King"}"#).unwrap();
        assert_eq!(echoed, ProfileUpdate { first_name: None, last_name: Some("King".into()) });

        user.apply_update(&echoed);
        assert_eq!(user.full_name(), "Ada King");
        assert_eq!(user.handicap_index, Some(12.4));
    }

    #[test]
    fn wind_display_helpers() {
        let wind = WindObservation {
            speed_mps: 0.6,
            direction_deg: 95.0,
            gust_mps: 2.0,
            ..Default::default()
        };
        assert!(wind.is_calm());
        assert!(wind.is_gusty());
        assert_eq!(wind.compass_label(), "E");
    }
}
