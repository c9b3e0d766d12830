use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use retrofit::advisor::{
    parse_completion, AnalysisPipeline, OpenAiCompletionClient, OutputMode, PromptBuilder,
    PromptTemplate,
};
use retrofit::config::{SettingsLoader, DEFAULT_CONFIG_PATH};
use retrofit::domain::{BuildingProfile, HeatingSystem, RenovationFocus, WindowCondition};
use retrofit::error::{AuthError, PipelineError};
use retrofit::render::{render_terminal, ReportRenderer};
use retrofit::session::{PasswordGate, SessionContext};
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const YEAR_RANGE: std::ops::RangeInclusive<u16> = 1900..=2025;
const AREA_RANGE: std::ops::RangeInclusive<f64> = 10.0..=10_000.0;
const ELECTRICITY_RANGE: std::ops::RangeInclusive<u32> = 500..=10_000;
const GAS_RANGE: std::ops::RangeInclusive<u32> = 500..=20_000;

#[derive(Parser)]
#[command(name = "retrofit", version, about = "KI-Sanierungsfahrplan CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    #[arg(long, default_value = "info", global = true)]
    log_level: String,
    #[arg(long, default_value = DEFAULT_CONFIG_PATH, global = true)]
    config: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Gebäude analysieren, Fahrplan anzeigen und als PDF speichern
    Analyze {
        #[command(flatten)]
        building: ProfileArgs,
        #[arg(long, default_value = "chart")]
        mode: OutputMode,
        #[arg(long)]
        output: Option<PathBuf>,
        #[arg(long)]
        password: Option<String>,
        #[arg(long)]
        model: Option<String>,
        #[arg(long, value_parser = parse_temperature)]
        temperature: Option<f32>,
    },
    /// Erzeugten Prompt ausgeben, ohne den KI-Dienst aufzurufen
    Prompt {
        #[command(flatten)]
        building: ProfileArgs,
        #[arg(long, default_value = "chart")]
        mode: OutputMode,
    },
    /// Gespeicherte Antwort des KI-Dienstes auswerten
    Parse {
        #[arg(long)]
        input: PathBuf,
        #[arg(long, default_value = "chart")]
        mode: OutputMode,
        #[arg(long, default_value_t = false)]
        render: bool,
        #[command(flatten)]
        building: ProfileArgs,
        #[arg(long)]
        output: Option<PathBuf>,
        #[arg(long)]
        password: Option<String>,
    },
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Wirksame Konfiguration ohne Geheimnisse anzeigen
    Show,
    /// API-Schlüssel in der Konfigurationsdatei ersetzen
    SetApiKey {
        #[arg(long)]
        key: String,
        #[arg(long)]
        password: Option<String>,
    },
}

#[derive(Args)]
struct ProfileArgs {
    /// JSON- oder TOML-Datei mit den Gebäudedaten
    #[arg(long = "profile")]
    profile_file: Option<PathBuf>,
    #[arg(long, default_value = "")]
    address: String,
    #[arg(long, default_value_t = 1970, value_parser = clap::value_parser!(u16).range(1900..=2025))]
    year: u16,
    #[arg(long, default_value_t = 120.0, value_parser = parse_floor_area)]
    area: f64,
    #[arg(long, default_value = "gas")]
    heating: HeatingSystem,
    #[arg(long)]
    roof_insulated: bool,
    #[arg(long)]
    basement_insulated: bool,
    #[arg(long)]
    photovoltaic: bool,
    #[arg(long, default_value = "old")]
    windows: WindowCondition,
    #[arg(long, value_parser = clap::value_parser!(u32).range(500..=10_000))]
    electricity_kwh: Option<u32>,
    #[arg(long, value_parser = clap::value_parser!(u32).range(500..=20_000))]
    gas_kwh: Option<u32>,
    #[arg(long)]
    focus: Option<RenovationFocus>,
}

impl ProfileArgs {
    fn resolve(&self) -> Result<BuildingProfile> {
        let Some(path) = &self.profile_file else {
            return Ok(BuildingProfile {
                address: self.address.clone(),
                construction_year: self.year,
                floor_area_m2: self.area,
                heating: self.heating,
                roof_insulated: self.roof_insulated,
                basement_ceiling_insulated: self.basement_insulated,
                photovoltaic: self.photovoltaic,
                windows: self.windows,
                electricity_kwh_per_year: self.electricity_kwh,
                gas_kwh_per_year: self.gas_kwh,
                focus: self.focus,
            });
        };

        let data = fs::read_to_string(path)
            .with_context(|| format!("Gebäudedaten {:?} nicht lesbar", path))?;
        let profile: BuildingProfile = if path.extension().is_some_and(|ext| ext == "toml") {
            toml::from_str(&data).with_context(|| format!("ungültiges TOML in {:?}", path))?
        } else {
            serde_json::from_str(&data).with_context(|| format!("ungültiges JSON in {:?}", path))?
        };
        if !YEAR_RANGE.contains(&profile.construction_year) {
            anyhow::bail!(
                "Baujahr {} liegt außerhalb von 1900 bis 2025",
                profile.construction_year
            );
        }
        if !AREA_RANGE.contains(&profile.floor_area_m2) {
            anyhow::bail!(
                "Wohnfläche {} m² liegt außerhalb von 10 bis 10000 m²",
                profile.floor_area_m2
            );
        }
        check_consumption("Stromverbrauch", profile.electricity_kwh_per_year, &ELECTRICITY_RANGE)?;
        check_consumption("Gasverbrauch", profile.gas_kwh_per_year, &GAS_RANGE)?;
        Ok(profile)
    }
}

fn check_consumption(
    label: &str,
    value: Option<u32>,
    range: &std::ops::RangeInclusive<u32>,
) -> Result<()> {
    match value {
        Some(kwh) if !range.contains(&kwh) => anyhow::bail!(
            "{} {} kWh/Jahr liegt außerhalb von {} bis {} kWh/Jahr",
            label,
            kwh,
            range.start(),
            range.end()
        ),
        _ => Ok(()),
    }
}

fn parse_floor_area(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .trim()
        .replace(',', ".")
        .parse()
        .map_err(|_| format!("keine Zahl: {}", s))?;
    if AREA_RANGE.contains(&value) {
        Ok(value)
    } else {
        Err("Wohnfläche muss zwischen 10 und 10000 m² liegen".to_string())
    }
}

fn parse_temperature(s: &str) -> Result<f32, String> {
    let value: f32 = s.trim().parse().map_err(|_| format!("keine Zahl: {}", s))?;
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err("Temperatur muss zwischen 0.0 und 1.0 liegen".to_string())
    }
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Asks for the password until the gate opens or locks out.
fn unlock(session: &mut SessionContext, password: Option<String>) -> Result<()> {
    if session.gate().is_unlocked() {
        return Ok(());
    }
    if let Some(password) = password {
        session.submit_password(&password)?;
        return Ok(());
    }

    let stdin = io::stdin();
    loop {
        eprint!("Passwort: ");
        io::stderr().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            anyhow::bail!("keine Passworteingabe");
        }
        match session.submit_password(line.trim_end_matches(['\r', '\n'])) {
            Ok(()) => return Ok(()),
            Err(AuthError::WrongPassword { remaining }) => {
                eprintln!("Falsches Passwort, noch {} Versuche.", remaining);
            }
            Err(err) => return Err(err.into()),
        }
    }
}

fn surface_failure(err: PipelineError) -> anyhow::Error {
    if let PipelineError::Parse(parse) = &err {
        eprintln!("--- Rohantwort des KI-Dienstes ---\n{}\n---", parse.raw);
    }
    error!(error = %err, "Vorgang abgebrochen");
    err.into()
}

fn deliver(session: &SessionContext, profile: &BuildingProfile, output_dir: &Path) -> Result<()> {
    let report = session.last_report().context("kein Bericht vorhanden")?;
    let document = session.last_document().context("kein Dokument vorhanden")?;

    println!("{}\n", report.narrative);
    if let Some(chart) = ReportRenderer::chart_for(report, profile) {
        println!("{}", render_terminal(&chart, 72));
    }

    fs::create_dir_all(output_dir)
        .with_context(|| format!("Ausgabeordner {:?} nicht anlegbar", output_dir))?;
    let path = output_dir.join(&document.file_name);
    fs::write(&path, &document.bytes)
        .with_context(|| format!("PDF {:?} nicht schreibbar", path))?;
    info!(
        path = %path.display(),
        mime = document.mime_type(),
        pages = document.page_count,
        "PDF gespeichert"
    );
    println!("PDF gespeichert: {}", path.display());
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    match cli.command {
        Commands::Analyze {
            building,
            mode,
            output,
            password,
            model,
            temperature,
        } => {
            let settings = SettingsLoader::load_from_path(&cli.config)?;
            let profile = building.resolve()?;
            let mut session = SessionContext::new(PasswordGate::from_secret(
                settings.gate_password.clone(),
            ));
            unlock(&mut session, password)?;

            let client = OpenAiCompletionClient::new(
                settings.endpoint.clone(),
                settings.api_key.clone().unwrap_or_default(),
                settings.timeout_secs,
            )?
            .with_max_attempts(settings.max_attempts);
            let pipeline = AnalysisPipeline::new(Arc::new(client), PromptTemplate::default())
                .with_model(model.unwrap_or_else(|| settings.model.clone()))
                .with_temperature(temperature.unwrap_or(settings.temperature));
            let renderer = ReportRenderer::new().with_branding_image(&settings.branding_image);

            session
                .run_analysis(&pipeline, &renderer, &profile, mode)
                .map_err(surface_failure)?;
            let output_dir = output.unwrap_or_else(|| settings.output_dir.clone());
            deliver(&session, &profile, &output_dir)?;
        }
        Commands::Prompt { building, mode } => {
            let profile = building.resolve()?;
            let prompt = PromptBuilder::new(PromptTemplate::default()).build(&profile, mode);
            println!("{}\n\n{}", prompt.system, prompt.user);
        }
        Commands::Parse {
            input,
            mode,
            render,
            building,
            output,
            password,
        } => {
            let raw = fs::read_to_string(&input)
                .with_context(|| format!("Antwortdatei {:?} nicht lesbar", input))?;
            let report = parse_completion(&raw, mode)
                .map_err(|err| surface_failure(PipelineError::Parse(err)))?;

            if !render {
                println!("{}", report.narrative);
                if let Some(chart) = &report.chart {
                    println!("\n{}", render_terminal(chart, 72));
                }
                return Ok(());
            }

            let settings = SettingsLoader::load_from_path(&cli.config)?;
            let profile = building.resolve()?;
            let mut session = SessionContext::new(PasswordGate::from_secret(
                settings.gate_password.clone(),
            ));
            unlock(&mut session, password)?;
            let renderer = ReportRenderer::new().with_branding_image(&settings.branding_image);
            session
                .render_report(&renderer, report, &profile)
                .map_err(surface_failure)?;
            let output_dir = output.unwrap_or_else(|| settings.output_dir.clone());
            deliver(&session, &profile, &output_dir)?;
        }
        Commands::Config { command } => match command {
            ConfigCommands::Show => {
                let settings = SettingsLoader::load_from_path(&cli.config)?;
                println!("{}", toml::to_string_pretty(&settings.redacted())?);
            }
            ConfigCommands::SetApiKey { key, password } => {
                let settings = SettingsLoader::load_from_path(&cli.config)?;
                let mut session =
                    SessionContext::new(PasswordGate::from_secret(settings.gate_password));
                unlock(&mut session, password)?;
                session.rewrite_api_key(&cli.config, &key)?;
                println!("API-Schlüssel gespeichert in {}", cli.config.display());
            }
        },
    }

    Ok(())
}
