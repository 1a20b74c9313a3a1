//! Life Bull Market CLI
//!
//! Terminal client for the 人生牛市 backend:
//! - Log in with phone + SMS code
//! - Submit a birth profile and wait for the analysis
//! - Print the report and the life K-line chart

use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer, Registry};

use lifebull::config::{generate_default_config, LoggingConfig};
use lifebull::ConfigError;
use lifebull::error::fallback;
use lifebull::forms::current_year;
use lifebull::report::{self, AsciiChart};
use lifebull::routes::referral_code_from_query;
use lifebull::{
    AnalysisDetail, ApiClient, ClientError, Config, FileStore, Gender, PollOutcome, Poller,
    ProfileForm, Session,
};

#[derive(Parser)]
#[command(name = "lifebull")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "人生牛市 - birth-chart fortune reports with a life K-line chart")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// API server URL (overrides config)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format (table, json)
    #[arg(short, long, default_value = "table", global = true)]
    pub format: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Send an SMS verification code
    SendCode {
        phone: String,
    },

    /// Log in and store the token
    Login {
        phone: String,
        code: String,
        /// Inviter's referral code
        #[arg(long)]
        invite: Option<String>,
        /// Referral link (reads its ?ref= parameter)
        #[arg(long)]
        ref_url: Option<String>,
    },

    /// Forget the stored token
    Logout,

    /// Show account, quota and referral link
    Me,

    /// Submit a birth profile for analysis
    ///
    /// Missing fields are taken from your latest analysis, if any.
    Analyze {
        /// Male or Female (男/女)
        #[arg(long)]
        gender: Option<Gender>,
        /// Birth date, YYYY-MM-DD
        #[arg(long)]
        date: Option<String>,
        /// Birth time, HH:mm
        #[arg(long)]
        time: Option<String>,
        /// Birth place
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        name: Option<String>,
        /// Return after creating the task instead of waiting for the result
        #[arg(long)]
        no_wait: bool,
    },

    /// Show the cached bazi preview of an analysis
    Preview {
        id: i64,
    },

    /// Show an analysis, waiting while it is pending
    Result {
        id: i64,
        #[arg(long)]
        no_wait: bool,
    },

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = resolve_config(cli.config.as_deref(), std::io::stderr)?;
    if let Some(url) = &cli.api_url {
        config.api.base_url = url.clone();
    }
    init_logging(&config.logging)?;

    let app = App::new(config, cli.format == "json")?;

    match cli.command {
        Commands::SendCode { phone } => app.send_code(&phone).await,
        Commands::Login {
            phone,
            code,
            invite,
            ref_url,
        } => {
            let inviter = invite.or_else(|| ref_url.as_deref().and_then(referral_code_from_query));
            app.login(&phone, &code, inviter.as_deref()).await
        }
        Commands::Logout => app.logout(),
        Commands::Me => app.me().await,
        Commands::Analyze {
            gender,
            date,
            time,
            location,
            name,
            no_wait,
        } => {
            let overrides = ProfileOverrides {
                gender,
                date,
                time,
                location,
                name,
            };
            app.analyze(overrides, no_wait).await
        }
        Commands::Preview { id } => app.preview(id),
        Commands::Result { id, no_wait } => app.result(id, no_wait).await,
        Commands::Config { output } => write_default_config(output),
    }
}

/// Load the config with a provisional subscriber, so fallbacks taken while
/// loading are reported before the configured one exists
fn resolve_config<W>(path: Option<&Path>, writer: W) -> Result<Config, ConfigError>
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("lifebull=warn"));
    let provisional = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .finish();
    tracing::subscriber::with_default(provisional, || Config::resolve(path))
}

fn init_logging(logging: &LoggingConfig) -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("lifebull={}", logging.level)));

    let writer = match &logging.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path))?;
            BoxMakeWriter::new(Mutex::new(file))
        }
        None => BoxMakeWriter::new(std::io::stderr),
    };

    let fmt_layer: Box<dyn Layer<Registry> + Send + Sync> = if logging.format == "json" {
        tracing_subscriber::fmt::layer().json().with_writer(writer).boxed()
    } else {
        tracing_subscriber::fmt::layer().with_writer(writer).boxed()
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(filter)
        .init();
    Ok(())
}

fn write_default_config(output: Option<PathBuf>) -> anyhow::Result<()> {
    let content = generate_default_config();
    match output {
        Some(path) => {
            std::fs::write(&path, content)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Config written to {}", path.display());
        }
        None => print!("{}", content),
    }
    Ok(())
}

/// Reduce a client error to its display line, logging the detail
fn user_error(fallback: &'static str) -> impl FnOnce(ClientError) -> anyhow::Error {
    move |e| {
        tracing::debug!("Request failed: {}", e);
        anyhow!(e.user_message(fallback))
    }
}

struct ProfileOverrides {
    gender: Option<Gender>,
    date: Option<String>,
    time: Option<String>,
    location: Option<String>,
    name: Option<String>,
}

impl ProfileOverrides {
    fn is_complete(&self) -> bool {
        self.gender.is_some() && self.date.is_some() && self.time.is_some() && self.location.is_some()
    }

    fn apply(self, form: &mut ProfileForm) {
        if let Some(gender) = self.gender {
            form.gender = gender;
        }
        if let Some(date) = self.date {
            form.birth_date = date;
        }
        if let Some(time) = self.time {
            form.birth_time = time;
        }
        if let Some(location) = self.location {
            form.birth_location = location;
        }
        if let Some(name) = self.name {
            form.name = Some(name);
        }
    }
}

struct App {
    api: ApiClient,
    session: Session<FileStore>,
    poll_interval: Duration,
    json: bool,
}

impl App {
    fn new(config: Config, json: bool) -> anyhow::Result<Self> {
        let api = ApiClient::from_config(&config)?;
        let session = Session::new(FileStore::open(config.data_dir()));
        tracing::debug!(api = api.base_url(), storage = ?session.store().path(), "Client ready");

        Ok(Self {
            api,
            session,
            poll_interval: config.poll_interval(),
            json,
        })
    }

    fn token(&self) -> anyhow::Result<String> {
        self.session
            .token()
            .ok_or_else(|| anyhow!(ClientError::NotLoggedIn.user_message(fallback::LOGIN)))
    }

    fn print_json<T: serde::Serialize>(&self, value: &T) -> anyhow::Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }

    async fn send_code(&self, phone: &str) -> anyhow::Result<()> {
        if phone.trim().is_empty() {
            bail!("请输入手机号");
        }
        self.api
            .send_code(phone.trim())
            .await
            .map_err(user_error(fallback::SEND_CODE))?;
        tracing::info!(phone, "Verification code requested");
        println!("验证码已发送至 {}", phone.trim());
        Ok(())
    }

    async fn login(&self, phone: &str, code: &str, inviter: Option<&str>) -> anyhow::Result<()> {
        let form = lifebull::LoginForm {
            phone: phone.to_string(),
            code: code.to_string(),
            inviter_code: inviter.unwrap_or_default().to_string(),
        };
        if !form.can_submit() {
            bail!("请输入手机号和验证码");
        }

        let token = self
            .api
            .verify_code(form.phone.trim(), form.code.trim(), form.inviter().as_deref())
            .await
            .map_err(user_error(fallback::VERIFY_CODE))?;
        self.session
            .set_token(Some(&token.access_token))
            .map_err(user_error(fallback::LOGIN))?;
        tracing::info!(inviter = ?form.inviter(), "Logged in");

        if self.json {
            self.print_json(&token)
        } else {
            println!("登录成功");
            Ok(())
        }
    }

    fn logout(&self) -> anyhow::Result<()> {
        self.session
            .set_token(None)
            .map_err(user_error(fallback::LOGIN))?;
        println!("已退出登录");
        Ok(())
    }

    async fn me(&self) -> anyhow::Result<()> {
        let token = self.token()?;
        let me = self
            .api
            .me(&token)
            .await
            .map_err(user_error(fallback::GET_ME))?;

        if self.json {
            return self.print_json(&me);
        }
        println!("用户: {}", self.session.display_name());
        print!("{}", report::render_user(&me));
        Ok(())
    }

    async fn analyze(&self, overrides: ProfileOverrides, no_wait: bool) -> anyhow::Result<()> {
        let token = self.token()?;
        let mut form = ProfileForm::default();

        if !overrides.is_complete() {
            match self.api.latest_analysis(&token).await {
                Ok(Some(latest)) => {
                    tracing::info!(analysis_id = latest.id, "Prefilling profile from latest analysis");
                    form.prefill_from(&latest.input);
                }
                Ok(None) => {}
                Err(e) => tracing::warn!("Could not load latest analysis: {}", e),
            }
        }
        overrides.apply(&mut form);
        form.validate()?;

        let bazi = self
            .api
            .calculate_bazi(&token, &form)
            .await
            .map_err(user_error(fallback::CALCULATE_BAZI))?;
        let input = form.build_analysis_input(&bazi, current_year());
        let created = self
            .api
            .create_analysis(&token, &input)
            .await
            .map_err(user_error(fallback::CREATE_ANALYSIS))?;
        tracing::info!(analysis_id = created.id, "Analysis created");

        if let Err(e) = self.session.cache_bazi(created.id, &bazi) {
            tracing::warn!(analysis_id = created.id, "Failed to cache bazi result: {}", e);
        }
        if let Some(name) = form.name.as_deref() {
            if let Err(e) = self.session.remember_display_name(name) {
                tracing::warn!("Failed to store display name: {}", e);
            }
        }

        if no_wait {
            if self.json {
                return self.print_json(&created);
            }
            print!("{}", report::render_bazi_preview(created.id, Some(&bazi)));
            println!();
            println!("稍后运行 `lifebull result {}` 查看结果", created.id);
            return Ok(());
        }

        if !self.json {
            print!("{}", report::render_bazi_preview(created.id, Some(&bazi)));
            println!();
        }
        let detail = self.wait_for(&token, created.id).await?;
        self.show(&token, &detail).await
    }

    fn preview(&self, id: i64) -> anyhow::Result<()> {
        let bazi = self.session.cached_bazi(id);
        if self.json {
            return self.print_json(&bazi);
        }
        print!("{}", report::render_bazi_preview(id, bazi.as_ref()));
        Ok(())
    }

    async fn result(&self, id: i64, no_wait: bool) -> anyhow::Result<()> {
        let token = self.token()?;
        let detail = if no_wait {
            self.api
                .get_analysis(&token, id)
                .await
                .map_err(user_error(fallback::GET_ANALYSIS))?
        } else {
            self.wait_for(&token, id).await?
        };
        self.show(&token, &detail).await
    }

    /// Poll until the analysis leaves `pending`; Ctrl-C stops waiting
    async fn wait_for(&self, token: &str, id: i64) -> anyhow::Result<AnalysisDetail> {
        let source = self.api.analysis_source(token);
        let cancel = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        };

        let quiet = self.json;
        let mut ticks = 0u32;
        let outcome = Poller::new(self.poll_interval)
            .run(
                &source,
                id,
                |detail| {
                    if quiet || !detail.status.is_pending() {
                        return;
                    }
                    if ticks == 0 {
                        eprintln!("大师推演中（约 3–5 分钟），请稍候...");
                    } else {
                        eprint!(".");
                    }
                    ticks += 1;
                },
                cancel,
            )
            .await;
        if ticks > 1 {
            eprintln!();
        }

        match outcome {
            PollOutcome::Settled(detail) => Ok(detail),
            PollOutcome::Failed(e) => Err(user_error(fallback::GET_ANALYSIS)(e)),
            PollOutcome::Cancelled(_) => {
                tracing::info!(analysis_id = id, "Stopped waiting for analysis");
                bail!("已停止等待，稍后运行 `lifebull result {}` 查看结果", id)
            }
        }
    }

    async fn show(&self, token: &str, detail: &AnalysisDetail) -> anyhow::Result<()> {
        if self.json {
            return self.print_json(detail);
        }

        let chart = AsciiChart::new(16, std::io::stdout().is_terminal());
        print!("{}", report::render_analysis(detail, &chart));

        // Invite section; failures here only get logged
        match self.api.me(token).await {
            Ok(me) => {
                println!();
                println!("邀请好友，获得更多测算次数");
                println!("今日剩余次数：{}", me.today_remaining);
                println!("我的专属链接：{}", me.my_referral_url);
            }
            Err(e) => tracing::debug!("Skipping invite info: {}", e),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_config_warnings_reach_stderr_before_init() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[poll]\ninterval_ms = 1500\n").unwrap();

        let captured = Captured::default();
        let sink = captured.clone();
        std::env::set_var("LIFEBULL_POLL_INTERVAL_MS", "soon");
        let config = resolve_config(Some(&path), move || sink.clone());
        std::env::remove_var("LIFEBULL_POLL_INTERVAL_MS");

        let config = config.unwrap();
        assert_eq!(config.poll.interval_ms, 1500);
        let logged = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(logged.contains("Ignoring invalid LIFEBULL_POLL_INTERVAL_MS"), "{}", logged);
    }

    #[test]
    fn test_cli_parses_analyze() {
        let cli = Cli::try_parse_from([
            "lifebull", "--format", "json", "analyze", "--gender", "女", "--date", "2003-10-12",
            "--time", "04:30", "--location", "杭州", "--no-wait",
        ])
        .unwrap();

        assert_eq!(cli.format, "json");
        match cli.command {
            Commands::Analyze { gender, location, no_wait, name, .. } => {
                assert_eq!(gender, Some(Gender::Female));
                assert_eq!(location.as_deref(), Some("杭州"));
                assert!(no_wait);
                assert_eq!(name, None);
            }
            _ => panic!("expected analyze"),
        }
    }

    #[test]
    fn test_overrides_fill_form() {
        let overrides = ProfileOverrides {
            gender: None,
            date: Some("1985-05-05".to_string()),
            time: None,
            location: Some("成都".to_string()),
            name: Some("王五".to_string()),
        };
        assert!(!overrides.is_complete());

        let mut form = ProfileForm::default();
        overrides.apply(&mut form);
        assert_eq!(form.birth_date, "1985-05-05");
        assert_eq!(form.birth_time, "06:00");
        assert_eq!(form.birth_location, "成都");
        assert_eq!(form.name.as_deref(), Some("王五"));
        assert!(form.is_valid());
    }

    #[test]
    fn test_login_with_ref_url() {
        let cli = Cli::try_parse_from([
            "lifebull", "login", "13900000001", "123456", "--ref-url",
            "http://localhost:5173/auth?ref=ABC123",
        ])
        .unwrap();
        match cli.command {
            Commands::Login { invite, ref_url, .. } => {
                assert_eq!(invite, None);
                let code = ref_url.as_deref().and_then(referral_code_from_query);
                assert_eq!(code.as_deref(), Some("ABC123"));
            }
            _ => panic!("expected login"),
        }
    }
}
