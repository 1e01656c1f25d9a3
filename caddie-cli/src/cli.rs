use anyhow::{Context, anyhow};
use caddie_core::{
    BackendClient, BackendError, Config, GeoPoint, ProviderId, RoundStats, RoundTracker, Session,
    WindObservation,
    backend::DEFAULT_HISTORY_LIMIT,
    geometry::shot_geometry,
    model::{
        Club, ClubUpdate, DEFAULT_INITIAL_HANDICAP, PasswordChange, ProfileUpdate,
        RecommendationRequest, Registration, ShotConditions, ShotFeedback, StartRound, Surface,
    },
    provider::{default_provider_from_config, provider_from_config},
};
use clap::{Args, Parser, Subcommand};
use inquire::{Confirm, CustomType, Password, Select, Text};

use crate::output;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "caddie", version, about = "Golf caddie: shot distances, wind and club advice")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Configure the backend URL and weather provider.
    Configure,

    /// Create an account, optionally with your clubs.
    Register,

    /// Log in and remember the session.
    Login {
        #[arg(long)]
        email: Option<String>,
    },

    /// Log out and forget the session.
    Logout,

    /// Show the logged-in profile.
    Whoami,

    /// Change your password.
    Password,

    /// Update your name.
    Profile {
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
    },

    /// Distance, bearing and wind for a shot. Points are `lat,lon`.
    Shot {
        #[command(flatten)]
        points: ShotPoints,

        /// Wind direction in degrees (where it blows from). Fetched from the
        /// weather provider when omitted.
        #[arg(long, allow_hyphen_values = true)]
        wind_dir: Option<f64>,

        /// Wind speed in m/s, used with --wind-dir.
        #[arg(long, default_value_t = 0.0)]
        wind_speed: f64,

        #[arg(long)]
        provider: Option<String>,
    },

    /// Current weather at a point (`lat,lon`).
    Weather {
        #[arg(value_parser = parse_point, allow_hyphen_values = true)]
        point: GeoPoint,

        #[arg(long)]
        provider: Option<String>,
    },

    /// Ask the backend which club to hit.
    Recommend {
        #[command(flatten)]
        points: ShotPoints,

        #[command(flatten)]
        conditions: ConditionArgs,

        #[arg(long)]
        provider: Option<String>,

        /// Don't ask for feedback afterwards.
        #[arg(long)]
        no_feedback: bool,
    },

    /// Manage your clubs.
    Clubs {
        #[command(subcommand)]
        command: ClubsCommand,
    },

    /// Track rounds.
    Round {
        #[command(subcommand)]
        command: RoundCommand,
    },
}

#[derive(Debug, Args)]
pub struct ShotPoints {
    /// Ball position, `lat,lon`.
    #[arg(value_parser = parse_point, allow_hyphen_values = true)]
    from: GeoPoint,

    /// Target position, `lat,lon`.
    #[arg(value_parser = parse_point, allow_hyphen_values = true)]
    to: GeoPoint,
}

#[derive(Debug, Args)]
pub struct ConditionArgs {
    /// Lie of the ball: fairway, light_rough, heavy_rough, hardpan, divot, bunker.
    #[arg(long, default_value = "fairway")]
    surface: Surface,
    #[arg(long)]
    uphill: bool,
    #[arg(long)]
    downhill: bool,
    #[arg(long)]
    ball_above_feet: bool,
    #[arg(long)]
    ball_below_feet: bool,
    #[arg(long)]
    wet_ground: bool,
    #[arg(long)]
    firm_ground: bool,
}

impl From<ConditionArgs> for ShotConditions {
    fn from(args: ConditionArgs) -> Self {
        ShotConditions {
            surface: args.surface,
            uphill: args.uphill,
            downhill: args.downhill,
            ball_above_feet: args.ball_above_feet,
            ball_below_feet: args.ball_below_feet,
            wet_ground: args.wet_ground,
            firm_ground: args.firm_ground,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum ClubsCommand {
    /// List your clubs.
    List,
    /// Add a club with its carry distance in meters.
    Add {
        name: String,
        distance: String,
        #[arg(long)]
        preferred: bool,
    },
    /// Change a club's name, distance or preferred flag.
    Update {
        name: String,
        #[arg(long)]
        rename: Option<String>,
        #[arg(long)]
        distance: Option<f64>,
        #[arg(long)]
        preferred: Option<bool>,
    },
    /// Remove a club.
    Remove { name: String },
}

#[derive(Debug, Subcommand)]
pub enum RoundCommand {
    /// Start a round.
    Start {
        course: String,
        #[arg(long, default_value_t = 18)]
        holes: u32,
    },
    /// Show the round in progress.
    Active,
    /// Record shots for a hole of the active round.
    Score {
        hole: u32,
        shots: u32,
        /// Defaults to the par currently recorded for the hole.
        #[arg(long)]
        par: Option<u32>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Finish the active round.
    Complete {
        #[arg(long)]
        notes: Option<String>,
    },
    /// List past rounds.
    History {
        #[arg(long, default_value_t = DEFAULT_HISTORY_LIMIT)]
        limit: u32,
        #[arg(long, default_value_t = 0)]
        offset: u32,
    },
    /// Show a round's scorecard.
    Show { id: i64 },
    /// Delete a round.
    Delete {
        id: i64,
        #[arg(long)]
        yes: bool,
    },
    /// Statistics over recent rounds.
    Stats {
        #[arg(long, default_value_t = 50)]
        limit: u32,
    },
}

/// Parse `lat,lon` in degrees.
fn parse_point(value: &str) -> Result<GeoPoint, String> {
    let (lat, lon) = value
        .split_once(',')
        .ok_or_else(|| format!("expected `lat,lon`, got '{value}'"))?;

    let latitude: f64 = lat.trim().parse().map_err(|_| format!("invalid latitude '{lat}'"))?;
    let longitude: f64 = lon.trim().parse().map_err(|_| format!("invalid longitude '{lon}'"))?;

    if !(-90.0..=90.0).contains(&latitude) {
        return Err(format!("latitude {latitude} is outside -90..90"));
    }
    if !(-180.0..=180.0).contains(&longitude) {
        return Err(format!("longitude {longitude} is outside -180..180"));
    }

    Ok(GeoPoint::new(latitude, longitude))
}

fn require_session() -> anyhow::Result<Session> {
    Session::load()?.ok_or_else(|| anyhow!("Not logged in.\nHint: run `caddie login` first."))
}

/// Drop the stored session when the backend no longer accepts it.
fn check_auth<T>(result: Result<T, BackendError>) -> anyhow::Result<T> {
    match result {
        Err(e) if e.is_unauthorized() => {
            log::info!("Backend rejected the stored session; clearing it");
            Session::clear()?;
            Err(e.into())
        }
        other => Ok(other?),
    }
}

async fn fetch_wind(
    config: &Config,
    provider: Option<&str>,
    point: GeoPoint,
) -> anyhow::Result<WindObservation> {
    let provider = match provider {
        Some(id) => provider_from_config(ProviderId::try_from(id)?, config)?,
        None => default_provider_from_config(config)?,
    };

    provider.current_wind(point).await.context("Failed to fetch weather")
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let mut config = Config::load()?;

        match self.command {
            Command::Configure => configure(&mut config)?,
            Command::Register => register(&config).await?,
            Command::Login { email } => login(&config, email).await?,
            Command::Logout => {
                if let Some(session) = Session::load()? {
                    BackendClient::from_config(&config)?.logout(&session).await;
                }
                Session::clear()?;
                println!("Logged out.");
            }
            Command::Whoami => {
                let mut session = require_session()?;
                let client = BackendClient::from_config(&config)?;
                let user = check_auth(client.me(&session).await)?;
                println!("{}", output::profile(&user));
                session.user = Some(user);
                session.save()?;
            }
            Command::Password => change_password(&config).await?,
            Command::Profile { first_name, last_name } => {
                let mut session = require_session()?;
                let client = BackendClient::from_config(&config)?;
                let update = ProfileUpdate { first_name, last_name };
                let echoed = check_auth(client.update_profile(&session, &update).await)?;
                let user = match session.user.take() {
                    Some(mut user) => {
                        user.apply_update(&echoed);
                        user
                    }
                    None => check_auth(client.me(&session).await)?,
                };
                println!("{}", output::profile(&user));
                session.user = Some(user);
                session.save()?;
            }
            Command::Shot { points, wind_dir, wind_speed, provider } => {
                let wind = match wind_dir {
                    Some(direction_deg) => WindObservation {
                        speed_mps: wind_speed,
                        direction_deg,
                        ..WindObservation::default()
                    },
                    None => fetch_wind(&config, provider.as_deref(), points.from).await?,
                };

                let shot = shot_geometry(points.from, points.to, &wind);
                println!("{}", output::shot_report(&shot, &wind));
            }
            Command::Weather { point, provider } => {
                let wind = fetch_wind(&config, provider.as_deref(), point).await?;
                println!("Weather at {point}");
                println!("{}", output::weather_report(&wind));
            }
            Command::Recommend { points, conditions, provider, no_feedback } => {
                recommend(&config, points, conditions.into(), provider, !no_feedback).await?
            }
            Command::Clubs { command } => clubs(&config, command).await?,
            Command::Round { command } => round(&config, command).await?,
        }

        Ok(())
    }
}

fn configure(config: &mut Config) -> anyhow::Result<()> {
    let url = Text::new("Backend URL:").with_default(&config.backend_url()).prompt()?;
    config.set_backend_url(&url);

    let provider = Select::new("Default weather provider:", ProviderId::all().to_vec()).prompt()?;
    if provider.requires_api_key() {
        let api_key = Password::new(&format!("API key for {provider}:"))
            .without_confirmation()
            .prompt()?;
        config.upsert_provider_api_key(provider, api_key.trim().to_string());
    }
    config.set_default_provider(provider);

    config.save()?;
    println!("Saved configuration to {}", Config::config_file_path()?.display());
    Ok(())
}

async fn register(config: &Config) -> anyhow::Result<()> {
    let email = Text::new("Email:").prompt()?;
    let first_name = Text::new("First name:").prompt()?;
    let last_name = Text::new("Last name:").prompt()?;
    let password = Password::new("Password:").prompt()?;
    let handicap = CustomType::<f64>::new("Handicap index (negative for plus):")
        .with_default(DEFAULT_INITIAL_HANDICAP)
        .prompt()?;

    let registration = Registration::new(&email, &first_name, &last_name, &password, handicap)?;

    let mut clubs = Vec::new();
    while Confirm::new("Add a club?").with_default(clubs.is_empty()).prompt()? {
        let name = Text::new("Club:").prompt()?;
        let distance = Text::new("Carry distance (m):").prompt()?;
        let preferred = Confirm::new("Preferred club?").with_default(false).prompt()?;
        match Club::parse(&name, &distance, preferred) {
            Ok(club) => clubs.push(club),
            Err(e) => eprintln!("{e}"),
        }
    }

    let client = BackendClient::from_config(config)?;
    client.register(&registration).await?;

    let session = client.login(&registration.email, &registration.password).await?;
    if !clubs.is_empty() {
        client.add_clubs(&session, &clubs).await?;
    }
    session.save()?;

    println!("Account created for {}. You are logged in.", registration.email);
    Ok(())
}

async fn login(config: &Config, email: Option<String>) -> anyhow::Result<()> {
    let email = match email {
        Some(email) => email,
        None => Text::new("Email:").prompt()?,
    };
    let password = Password::new("Password:").without_confirmation().prompt()?;

    let client = BackendClient::from_config(config)?;
    let session = client.login(&email, &password).await?;
    session.save()?;

    match &session.user {
        Some(user) => println!("Welcome, {}!", user.first_name),
        None => println!("Logged in."),
    }
    Ok(())
}

async fn change_password(config: &Config) -> anyhow::Result<()> {
    let session = require_session()?;
    let current = Password::new("Current password:").without_confirmation().prompt()?;
    let new = Password::new("New password:").prompt()?;
    let change = PasswordChange::new(&current, &new)?;

    let client = BackendClient::from_config(config)?;
    check_auth(client.change_password(&session, &change).await)?;
    println!("Password changed.");
    Ok(())
}

async fn recommend(
    config: &Config,
    points: ShotPoints,
    conditions: ShotConditions,
    provider: Option<String>,
    ask_feedback: bool,
) -> anyhow::Result<()> {
    let session = require_session()?;
    let client = BackendClient::from_config(config)?;

    let wind = fetch_wind(config, provider.as_deref(), points.from).await?;
    let shot = shot_geometry(points.from, points.to, &wind);
    println!("{}", output::shot_report(&shot, &wind));

    let mut lie = conditions.surface.to_string();
    for flag in conditions.active_flags() {
        lie.push_str(", ");
        lie.push_str(flag);
    }
    println!("Lie:      {lie}\n");

    let request = RecommendationRequest::for_shot(&shot, &wind, conditions)?;
    let recommendation = check_auth(client.recommend(&session, &request).await)?;
    println!("{}", recommendation.answer);

    let Some(timestamp) = recommendation.timestamp.filter(|_| ask_feedback) else {
        return Ok(());
    };

    let rating = Select::new("Was this helpful?", vec!["👍 yes", "👎 no", "skip"]).prompt()?;
    let liked = match rating {
        "skip" => return Ok(()),
        r => r.ends_with("yes"),
    };
    let club_used = Text::new("Club used (optional):").prompt_skippable()?;
    let shot_result = Text::new("How did it go? (optional):").prompt_skippable()?;

    let feedback = ShotFeedback::new(timestamp, liked, club_used, shot_result);
    check_auth(client.submit_feedback(&session, &feedback).await)?;
    println!("Thanks, feedback recorded.");
    Ok(())
}

async fn clubs(config: &Config, command: ClubsCommand) -> anyhow::Result<()> {
    let session = require_session()?;
    let client = BackendClient::from_config(config)?;

    match command {
        ClubsCommand::List => {
            let mut clubs = check_auth(client.clubs(&session).await)?;
            if clubs.is_empty() {
                println!("No clubs yet. Add one with `caddie clubs add <name> <distance>`.");
            }
            clubs.sort_by(|a, b| b.distance_meter.total_cmp(&a.distance_meter));
            for club in &clubs {
                println!("{}", output::club_line(club));
            }
        }
        ClubsCommand::Add { name, distance, preferred } => {
            let club = Club::parse(&name, &distance, preferred)?;
            check_auth(client.add_clubs(&session, std::slice::from_ref(&club)).await)?;
            println!("Added {}", output::club_line(&club));
        }
        ClubsCommand::Update { name, rename, distance, preferred } => {
            let update =
                ClubUpdate { club: rename, distance_meter: distance, preferred_club: preferred };
            check_auth(client.update_club(&session, &name, &update).await)?;
            println!("Updated {name}.");
        }
        ClubsCommand::Remove { name } => {
            check_auth(client.delete_club(&session, &name).await)?;
            println!("Removed {name}.");
        }
    }

    Ok(())
}

async fn round(config: &Config, command: RoundCommand) -> anyhow::Result<()> {
    let session = require_session()?;
    let client = BackendClient::from_config(config)?;

    match command {
        RoundCommand::Start { course, holes } => {
            let start = StartRound::new(&course, holes)?;
            let round = check_auth(client.start_round(&session, &start).await)?;
            println!("Started round #{} at {}.", round.id, round.course_name);
        }
        RoundCommand::Active => {
            let active = check_auth(client.active_round(&session).await)?;
            let tracker = RoundTracker::from_active(active);
            match tracker.round() {
                Some(round) => {
                    println!("{}", output::scorecard(round, Some(tracker.current_hole())));
                    println!(
                        "\nNext up: hole {} (par {})",
                        tracker.current_hole(),
                        tracker.current_hole_par()
                    );
                }
                None => println!("No active round. Start one with `caddie round start <course>`."),
            }
        }
        RoundCommand::Score { hole, shots, par, notes } => {
            let mut tracker =
                RoundTracker::from_active(check_auth(client.active_round(&session).await)?);
            let round_id = tracker
                .round()
                .map(|r| r.id)
                .ok_or_else(|| anyhow!("No active round"))?;

            tracker.set_current_hole(hole);
            if tracker.current_hole() != hole {
                return Err(anyhow!("Hole {hole} is not part of this round"));
            }
            let par = par.unwrap_or_else(|| tracker.current_hole_par());

            let updated = check_auth(
                client
                    .update_hole_score(&session, round_id, hole, shots, par, notes.as_deref())
                    .await,
            )?;
            tracker.apply_hole_score(updated);
            tracker.next_hole();

            if let Some(round) = tracker.round() {
                println!("{}", output::scorecard(round, Some(tracker.current_hole())));
            }
        }
        RoundCommand::Complete { notes } => {
            let active = check_auth(client.active_round(&session).await)?
                .ok_or_else(|| anyhow!("No active round"))?;
            let round =
                check_auth(client.complete_round(&session, active.id, notes.as_deref()).await)?;
            println!("{}", output::scorecard(&round, None));
        }
        RoundCommand::History { limit, offset } => {
            let rounds = check_auth(client.round_history(&session, limit, offset).await)?;
            if rounds.is_empty() {
                println!("No rounds yet.");
            }
            for round in &rounds {
                println!("{}", output::round_line(round));
            }
        }
        RoundCommand::Show { id } => {
            let round = check_auth(client.round(&session, id).await)?;
            println!("{}", output::scorecard(&round, None));
        }
        RoundCommand::Delete { id, yes } => {
            let confirmed =
                yes || Confirm::new(&format!("Delete round #{id}?")).with_default(false).prompt()?;
            if confirmed {
                check_auth(client.delete_round(&session, id).await)?;
                println!("Deleted round #{id}.");
            }
        }
        RoundCommand::Stats { limit } => {
            let rounds = check_auth(client.round_history(&session, limit, 0).await)?;
            println!("{}", output::stats(&RoundStats::from_history(&rounds)));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_points() {
        assert_eq!(parse_point("57.7089, 11.9746").unwrap(), GeoPoint::new(57.7089, 11.9746));
        assert_eq!(parse_point("-33.86,151.21").unwrap(), GeoPoint::new(-33.86, 151.21));
        assert!(parse_point("57.7").is_err());
        assert!(parse_point("91,0").is_err());
        assert!(parse_point("0,181").is_err());
        assert!(parse_point("north,east").is_err());
    }

    #[test]
    fn shot_accepts_negative_coordinates() {
        let cli = Cli::try_parse_from([
            "caddie",
            "shot",
            "-33.8600,151.2100",
            "-33.8610,151.2115",
            "--wind-dir",
            "-45",
        ])
        .unwrap();

        match cli.command {
            Command::Shot { points, wind_dir, wind_speed, .. } => {
                assert_eq!(points.from, GeoPoint::new(-33.86, 151.21));
                assert_eq!(wind_dir, Some(-45.0));
                assert_eq!(wind_speed, 0.0);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn recommend_collects_conditions() {
        let cli = Cli::try_parse_from([
            "caddie",
            "recommend",
            "57.7,11.97",
            "57.701,11.971",
            "--surface",
            "bunker",
            "--uphill",
            "--wet-ground",
        ])
        .unwrap();

        match cli.command {
            Command::Recommend { conditions, no_feedback, .. } => {
                let conditions = ShotConditions::from(conditions);
                assert_eq!(conditions.surface, Surface::Bunker);
                assert!(conditions.uphill && conditions.wet_ground);
                assert!(!conditions.downhill);
                assert!(!no_feedback);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_surface() {
        let err = Cli::try_parse_from([
            "caddie",
            "recommend",
            "57.7,11.97",
            "57.701,11.971",
            "--surface",
            "beach",
        ])
        .unwrap_err();
        assert!(err.to_string().contains("Unknown surface"));
    }
}
