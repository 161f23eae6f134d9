use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio::sync::broadcast;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use dashboard::agents::load_resume;
use dashboard::models::{Job, ProfileUpdate, SignUpRequest, StartApplicationRequest};
use dashboard::{
    ApiClient, ClientConfig, FileTokenStore, JobAgents, Notification, NotificationLevel,
    SessionStore, TaskPoller,
};

#[derive(Parser)]
#[command(name = "dashboard", version, about = "AI job-application dashboard client")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sign in and persist the session token
    Signin {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Create an account and sign in
    Signup {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[command(flatten)]
        profile: ProfileArgs,
    },
    /// Forget the persisted session
    Signout,
    /// Show the signed-in profile
    Me,
    /// Update profile fields
    UpdateProfile {
        #[arg(long)]
        name: Option<String>,
        #[command(flatten)]
        profile: ProfileArgs,
    },
    /// Upload a PDF résumé for parsing
    UploadResume { path: PathBuf },
    /// List AI-matched jobs
    FindJobs,
    /// Apply to a job with a generated cover letter
    Apply {
        #[arg(long)]
        job_id: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        company: String,
    },
    /// Run the job-application agent and wait for its results
    RunAgent {
        /// Preferences as a JSON object
        #[arg(long)]
        preferences: Option<String>,
    },
    /// Check backend health
    Health,
}

#[derive(Args)]
struct ProfileArgs {
    #[arg(long)]
    phone: Option<String>,
    #[arg(long)]
    location: Option<String>,
    #[arg(long)]
    experience_level: Option<String>,
    #[arg(long)]
    desired_salary: Option<String>,
    #[arg(long = "job-type")]
    job_types: Vec<String>,
}

impl ProfileArgs {
    fn job_types(&self) -> Option<Vec<String>> {
        (!self.job_types.is_empty()).then(|| self.job_types.clone())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = ClientConfig::from_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Dashboard client v{} -> {}", env!("CARGO_PKG_VERSION"), config.api_base_url);

    let api = ApiClient::new(config.api_base_url.clone(), config.request_timeout)?;
    let tokens = Arc::new(FileTokenStore::new(config.token_path.clone()));
    let session = Arc::new(
        SessionStore::new(api.clone(), tokens).with_policy(config.profile_failure_policy),
    );
    let mut notes = session.notifications();

    let outcome = run(cli.command, &config, &api, &session).await;
    print_notifications(&mut notes);
    outcome
}

async fn run(
    command: Command,
    config: &ClientConfig,
    api: &ApiClient,
    session: &Arc<SessionStore>,
) -> Result<()> {
    match command {
        Command::Signin { email, password } => {
            ensure(session.sign_in(&email, &password).await, "sign in failed")?;
            print_profile(session);
        }
        Command::Signup {
            name,
            email,
            password,
            profile,
        } => {
            let request = SignUpRequest {
                phone: profile.phone.clone(),
                location: profile.location.clone(),
                experience_level: profile.experience_level.clone(),
                desired_salary: profile.desired_salary.clone(),
                preferred_job_types: profile.job_types(),
                ..SignUpRequest::new(name, email, password)
            };
            ensure(session.sign_up(request).await, "sign up failed")?;
            print_profile(session);
        }
        Command::Signout => session.sign_out(),
        Command::Me => {
            require_session(session).await?;
            print_profile(session);
        }
        Command::UpdateProfile { name, profile } => {
            require_session(session).await?;
            let update = ProfileUpdate {
                full_name: name,
                phone: profile.phone.clone(),
                location: profile.location.clone(),
                experience_level: profile.experience_level.clone(),
                desired_salary: profile.desired_salary.clone(),
                preferred_job_types: profile.job_types(),
                profile_picture: None,
            };
            ensure(session.update_profile(&update).await, "profile update failed")?;
            print_profile(session);
        }
        Command::UploadResume { path } => {
            require_session(session).await?;
            let (file_name, content) = load_resume(&path).await?;
            let parsed = JobAgents::new(Arc::clone(session))
                .upload_resume(&file_name, content)
                .await?;
            println!("{}", serde_json::to_string_pretty(&parsed)?);
        }
        Command::FindJobs => {
            require_session(session).await?;
            let jobs = JobAgents::new(Arc::clone(session)).find_jobs().await?;
            for job in &jobs {
                println!(
                    "{:<12} {:>3}%  {} @ {} ({})",
                    job.id, job.match_score, job.title, job.company, job.location
                );
            }
        }
        Command::Apply {
            job_id,
            title,
            company,
        } => {
            require_session(session).await?;
            let job = Job {
                id: job_id,
                title,
                company,
                ..Default::default()
            };
            let response = JobAgents::new(Arc::clone(session)).apply_to_job(&job).await?;
            if let Some(letter) = response.cover_letter {
                println!("{letter}");
            }
        }
        Command::RunAgent { preferences } => {
            require_session(session).await?;
            let profile = session
                .snapshot()
                .user
                .context("profile not loaded")?;
            let preferences = preferences
                .map(|raw| serde_json::from_str::<serde_json::Value>(&raw).context("--preferences must be valid JSON"))
                .transpose()?;
            let request = StartApplicationRequest {
                resume_data: serde_json::to_value(&profile)?,
                preferences,
            };
            run_agent(config, api, &request).await?;
        }
        Command::Health => {
            println!("{}", serde_json::to_string_pretty(&api.health().await?)?);
        }
    }
    Ok(())
}

async fn run_agent(
    config: &ClientConfig,
    api: &ApiClient,
    request: &StartApplicationRequest,
) -> Result<()> {
    let poller = TaskPoller::new(Arc::new(api.clone()), config.poll_config());
    let handle = poller.start(request).await?;
    info!(
        "Polling task {} every {:?} (up to {:?})",
        handle.task_id(),
        config.poll_interval,
        poller.config().deadline()
    );

    let mut status = handle.status();
    let progress = tokio::spawn(async move {
        while status.changed().await.is_ok() {
            let current = status.borrow_and_update().clone();
            eprintln!("[{:>3}%] {:?} {}", current.progress, current.status, current.current_step);
        }
    });

    let outcome = tokio::select! {
        result = handle.wait() => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, polling stopped");
            return Ok(());
        }
    };
    progress.await.ok();

    let results = outcome?;
    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}

async fn require_session(session: &SessionStore) -> Result<()> {
    session.initialize().await;
    if !session.snapshot().is_authenticated {
        bail!("not signed in; run `dashboard signin` first");
    }
    Ok(())
}

fn ensure(ok: bool, what: &str) -> Result<()> {
    if !ok {
        bail!("{what}");
    }
    Ok(())
}

fn print_profile(session: &SessionStore) {
    if let Some(user) = session.snapshot().user {
        println!("{} <{}>", user.full_name, user.email);
        if let Some(location) = &user.location {
            println!("  location: {location}");
        }
        if let Some(level) = &user.experience_level {
            println!("  experience: {level}");
        }
        println!("  resume uploaded: {}", user.resume_uploaded);
        if !user.skills.is_empty() {
            println!("  skills: {}", user.skill_names().join(", "));
        }
    }
}

fn print_notifications(notes: &mut broadcast::Receiver<Notification>) {
    while let Ok(Notification { level, message, .. }) = notes.try_recv() {
        let tag = match level {
            NotificationLevel::Success => "ok",
            NotificationLevel::Info => "info",
            NotificationLevel::Error => "error",
        };
        eprintln!("[{tag}] {message}");
    }
}
