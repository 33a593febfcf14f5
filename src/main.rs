use anyhow::{bail, Context};
use clap::{Arg, ArgAction, ArgMatches, Command};
use log::LevelFilter;
use serde_json::{json, Map, Value};
use snapwin_admin::backend::storage::raffle_image_path;
use snapwin_admin::campaigns::{
    describe_campaigns, fetch_campaign, fetch_raffle_names, list_campaigns, raffle_ids_for,
};
use snapwin_admin::csv_export::{deliveries_csv, write_csv};
use snapwin_admin::dashboard::load_dashboard;
use snapwin_admin::models::{
    CampaignMode, DeliveryStatusFilter, Raffle, RAFFLES, RAFFLE_IMAGES_BUCKET,
};
use snapwin_admin::normalize::decode_rows;
use snapwin_admin::optimistic::apply_then_confirm;
use snapwin_admin::session::admin_cookie;
use snapwin_admin::{
    describe_audience, infer_status, BackendClient, CampaignRequest, Config, DataService,
    DeliveryPaginator, DeliverySummary, DispatchClient, PageMode, Query, Session,
};
use std::path::Path;
use std::process;
use std::sync::Arc;

const DEFAULT_CONFIG: &str = "/etc/snapwin-admin.yaml";
const EMAIL_ENV: &str = "SNAPWIN_ADMIN_EMAIL";
const PASSWORD_ENV: &str = "SNAPWIN_ADMIN_PASSWORD";

fn cli() -> Command {
    let email = Arg::new("email")
        .long("email")
        .value_name("EMAIL")
        .global(true)
        .help(format!("Admin email (falls back to {EMAIL_ENV})"));
    let password = Arg::new("password")
        .long("password")
        .value_name("PASSWORD")
        .global(true)
        .help(format!("Admin password (falls back to {PASSWORD_ENV})"));
    let status = Arg::new("status")
        .long("status")
        .value_name("STATUS")
        .help("Delivery filter: all, pending, ok or failed")
        .default_value("all");

    Command::new("snapwin-admin")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Operator console for the Snapwin raffle backend")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value(DEFAULT_CONFIG),
        )
        .arg(
            Arg::new("generate-config")
                .long("generate-config")
                .value_name("FILE")
                .help("Generate a default configuration file")
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("test-config")
                .long("test-config")
                .help("Test configuration validity")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable debug logging")
                .action(ArgAction::SetTrue),
        )
        .arg(email)
        .arg(password)
        .subcommand(Command::new("login").about("Sign in, check admin access and print the session"))
        .subcommand(
            Command::new("send")
                .about("Send a notification campaign")
                .arg(
                    Arg::new("mode")
                        .long("mode")
                        .required(true)
                        .help("all_users, raffle_users, multi_raffle_union, selected_customers or attempt_status"),
                )
                .arg(Arg::new("title").long("title").required(true))
                .arg(Arg::new("body").long("body").required(true))
                .arg(
                    Arg::new("raffle")
                        .long("raffle")
                        .value_name("ID")
                        .action(ArgAction::Append)
                        .help("Raffle id; repeat for multi_raffle_union"),
                )
                .arg(
                    Arg::new("customer")
                        .long("customer")
                        .value_name("ID")
                        .action(ArgAction::Append)
                        .help("Customer id; repeat for several"),
                )
                .arg(
                    Arg::new("attempt-passed")
                        .long("attempt-passed")
                        .value_parser(clap::value_parser!(bool))
                        .help("Attempt outcome to target (true or false)"),
                )
                .arg(
                    Arg::new("include-incomplete")
                        .long("include-incomplete")
                        .help("Also target holders of tickets that are not completed")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("data")
                        .long("data")
                        .value_name("JSON")
                        .help("Extra payload object attached to the push"),
                ),
        )
        .subcommand(
            Command::new("campaigns").about("List recent campaigns").arg(
                Arg::new("limit")
                    .long("limit")
                    .value_parser(clap::value_parser!(usize))
                    .default_value("50"),
            ),
        )
        .subcommand(
            Command::new("campaign")
                .about("Show one campaign with its first page of deliveries")
                .arg(Arg::new("id").required(true)),
        )
        .subcommand(
            Command::new("deliveries")
                .about("List deliveries for a campaign")
                .arg(Arg::new("id").required(true))
                .arg(status.clone())
                .arg(
                    Arg::new("pages")
                        .long("pages")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("1"),
                ),
        )
        .subcommand(
            Command::new("export-deliveries")
                .about("Export a campaign's deliveries to CSV")
                .arg(Arg::new("id").required(true))
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .value_name("FILE")
                        .required(true),
                )
                .arg(status)
                .arg(
                    Arg::new("max-pages")
                        .long("max-pages")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("1000"),
                ),
        )
        .subcommand(Command::new("dashboard").about("Show headline counters"))
        .subcommand(
            Command::new("raffle-status")
                .about("Change a raffle's status")
                .arg(Arg::new("id").required(true))
                .arg(Arg::new("status").required(true)),
        )
        .subcommand(
            Command::new("upload-image")
                .about("Upload a raffle image and point the raffle at it")
                .arg(Arg::new("id").required(true))
                .arg(Arg::new("file").required(true)),
        )
}

#[tokio::main]
async fn main() {
    let matches = cli().get_matches();

    let config_path = matches
        .get_one::<String>("config")
        .map(String::as_str)
        .unwrap_or(DEFAULT_CONFIG);

    if let Some(generate_path) = matches.get_one::<String>("generate-config") {
        generate_default_config(generate_path);
        return;
    }

    let config = match Config::load(config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {e:#}");
            process::exit(1);
        }
    };

    let log_level = if matches.get_flag("verbose") {
        LevelFilter::Debug
    } else {
        config.log_level()
    };
    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    if !Path::new(config_path).exists() {
        log::warn!("Configuration file '{config_path}' not found, using default configuration");
    }

    if matches.get_flag("test-config") {
        match config.validate() {
            Ok(()) => {
                println!("✅ Configuration is valid");
                println!("Backend: {}", config.backend.url);
                println!("Dispatch function: {}", config.dispatch.function_name);
                println!("Deliveries page size: {}", config.deliveries.page_size);
            }
            Err(e) => {
                eprintln!("❌ Configuration error: {e:#}");
                process::exit(1);
            }
        }
        return;
    }

    if let Err(e) = run(&config, &matches).await {
        eprintln!("❌ {e:#}");
        process::exit(1);
    }
}

async fn run(config: &Config, matches: &ArgMatches) -> anyhow::Result<()> {
    let Some((name, sub)) = matches.subcommand() else {
        bail!("No command given, see --help");
    };

    config.validate()?;
    let backend = BackendClient::new(&config.backend)?;
    let session = admin_session(&backend, matches).await?;
    let service: Arc<dyn DataService> = Arc::new(backend.with_session(&session));

    match name {
        "login" => login(config, &session),
        "send" => send(config, &backend, &session, sub).await,
        "campaigns" => campaigns(service.as_ref(), sub).await,
        "campaign" => campaign(config, service, sub).await,
        "deliveries" => deliveries(config, service, sub).await,
        "export-deliveries" => export_deliveries(config, service, sub).await,
        "dashboard" => dashboard(service.as_ref()).await,
        "raffle-status" => raffle_status(&backend.with_session(&session), sub).await,
        "upload-image" => upload_image(&backend.with_session(&session), sub).await,
        other => bail!("Unknown command: {other}"),
    }
}

async fn admin_session(backend: &BackendClient, matches: &ArgMatches) -> anyhow::Result<Session> {
    let email = matches
        .get_one::<String>("email")
        .cloned()
        .or_else(|| std::env::var(EMAIL_ENV).ok())
        .with_context(|| format!("Admin email required (--email or {EMAIL_ENV})"))?;
    let password = matches
        .get_one::<String>("password")
        .cloned()
        .or_else(|| std::env::var(PASSWORD_ENV).ok())
        .with_context(|| format!("Admin password required (--password or {PASSWORD_ENV})"))?;

    let session = backend
        .require_admin(&email, &password)
        .await
        .context("Admin sign-in failed")?;
    log::info!("Signed in as {email}");
    Ok(session)
}

fn login(config: &Config, session: &Session) -> anyhow::Result<()> {
    println!("✅ Signed in as {}", session.email.as_deref().unwrap_or("-"));
    if let Some(expires_at) = session.expires_at {
        println!("Session expires: {}", expires_at.to_rfc3339());
    }
    println!("Set-Cookie: {}", admin_cookie(&config.session));
    Ok(())
}

async fn send(
    config: &Config,
    backend: &BackendClient,
    session: &Session,
    sub: &ArgMatches,
) -> anyhow::Result<()> {
    let mode = CampaignMode::from(required(sub, "mode")?);
    let mut builder = CampaignRequest::builder(mode.clone())
        .title(required(sub, "title")?)
        .body(required(sub, "body")?)
        .only_completed_tickets(!sub.get_flag("include-incomplete"));

    let raffles: Vec<String> = sub
        .get_many::<String>("raffle")
        .map(|values| values.cloned().collect())
        .unwrap_or_default();
    builder = match (&mode, raffles.as_slice()) {
        (CampaignMode::MultiRaffleUnion, _) => builder.raffle_ids(raffles.clone()),
        (_, [first, ..]) => builder.raffle_id(first.clone()),
        _ => builder,
    };

    if let Some(customers) = sub.get_many::<String>("customer") {
        builder = builder.customer_ids(customers.cloned());
    }
    if let Some(passed) = sub.get_one::<bool>("attempt-passed") {
        builder = builder.attempt_passed(*passed);
    }
    if let Some(raw) = sub.get_one::<String>("data") {
        let data: Map<String, Value> =
            serde_json::from_str(raw).context("--data must be a JSON object")?;
        builder = builder.data(data);
    }

    let request = builder.build()?;
    let dispatcher = DispatchClient::new(backend.clone(), &config.dispatch);
    let outcome = dispatcher.send(&request, Some(session)).await?;

    println!(
        "✅ {} campaign sent to {} recipients",
        request.mode.label(),
        outcome.recipient_count
    );
    if let Some(id) = outcome.campaign_id {
        println!("Campaign id: {id}");
    }
    Ok(())
}

async fn campaigns(service: &dyn DataService, sub: &ArgMatches) -> anyhow::Result<()> {
    let limit = sub.get_one::<usize>("limit").copied().unwrap_or(50);
    let views = describe_campaigns(service, list_campaigns(service, limit).await?).await?;

    if views.is_empty() {
        println!("No campaigns yet");
        return Ok(());
    }
    for view in views {
        println!(
            "{}  {}  {:<20}  {:>6}  {}",
            view.campaign.created_at.format("%Y-%m-%d %H:%M"),
            view.campaign.id,
            view.campaign.mode.label(),
            view.campaign.recipient_count,
            view.campaign.title
        );
        println!("    {}", view.audience.summary);
    }
    Ok(())
}

async fn campaign(
    config: &Config,
    service: Arc<dyn DataService>,
    sub: &ArgMatches,
) -> anyhow::Result<()> {
    let id = required(sub, "id")?;
    let campaign = fetch_campaign(service.as_ref(), id).await?;
    let names = fetch_raffle_names(service.as_ref(), &raffle_ids_for(&campaign)).await?;
    let audience = describe_audience(&campaign.mode, &campaign.criteria, &names);

    println!("{} ({})", campaign.title, campaign.mode.label());
    println!("{}", campaign.body);
    println!("Sent: {}", campaign.created_at.to_rfc3339());
    println!("Recipients: {}", campaign.recipient_count);
    for chip in &audience.chips {
        println!("  [{chip}]");
    }

    let mut paginator = paginator_for(config, service, id);
    let info = paginator.load(PageMode::Reset).await?;
    let summary = DeliverySummary::from_deliveries(paginator.rows());
    println!();
    println!(
        "Loaded {} deliveries{}: inbox {}, pending {}, ok {}, failed {}, attempted (unknown) {}",
        summary.total,
        if info.has_more { " (more available)" } else { "" },
        summary.inbox_inserted,
        summary.pending,
        summary.ok,
        summary.failed,
        summary.attempted_unknown
    );
    print_deliveries(&paginator);
    Ok(())
}

async fn deliveries(
    config: &Config,
    service: Arc<dyn DataService>,
    sub: &ArgMatches,
) -> anyhow::Result<()> {
    let id = required(sub, "id")?;
    let pages = sub.get_one::<usize>("pages").copied().unwrap_or(1).max(1);

    let mut paginator = paginator_for(config, service, id);
    paginator.set_filter(status_filter(sub)?);
    paginator.load_all(pages).await?;

    print_deliveries(&paginator);
    if paginator.has_more() {
        println!("… more deliveries available (use --pages)");
    }
    Ok(())
}

async fn export_deliveries(
    config: &Config,
    service: Arc<dyn DataService>,
    sub: &ArgMatches,
) -> anyhow::Result<()> {
    let id = required(sub, "id")?;
    let output = required(sub, "output")?;
    let max_pages = sub.get_one::<usize>("max-pages").copied().unwrap_or(1000);

    let mut paginator = paginator_for(config, service, id);
    paginator.set_filter(status_filter(sub)?);
    let rows = paginator.load_all(max_pages).await?.len();
    if paginator.has_more() {
        log::warn!("Stopped after {max_pages} pages; export is incomplete");
    }

    write_csv(output, &deliveries_csv(paginator.rows(), paginator.customers()))?;
    println!("✅ Exported {rows} deliveries to {output}");
    Ok(())
}

async fn dashboard(service: &dyn DataService) -> anyhow::Result<()> {
    let stats = load_dashboard(service).await?;
    println!("📊 Dashboard");
    println!("  Raffles:          {} ({} active)", stats.raffles, stats.active_raffles);
    println!("  Completed tickets: {}", stats.completed_tickets);
    println!("  Open support:     {}", stats.open_support_requests);
    println!("  Campaigns:        {}", stats.campaigns);
    Ok(())
}

async fn raffle_status(backend: &BackendClient, sub: &ArgMatches) -> anyhow::Result<()> {
    let id = required(sub, "id")?;
    let status = required(sub, "status")?.to_string();

    let rows = backend
        .select(RAFFLES, &Query::new().select(Raffle::SELECT).eq("id", id))
        .await?;
    let mut raffles: Vec<Raffle> = decode_rows(rows);
    let patch = json!({ "status": status });

    let result = apply_then_confirm(
        &mut raffles,
        id,
        |raffle| raffle.status = Some(status.clone()),
        backend.update_row(RAFFLES, id, &patch),
    )
    .await
    .with_context(|| format!("Raffle not found: {id}"))?;
    result?;

    println!("✅ Raffle {id} is now {status}");
    Ok(())
}

async fn upload_image(backend: &BackendClient, sub: &ArgMatches) -> anyhow::Result<()> {
    let id = required(sub, "id")?;
    let file = required(sub, "file")?;

    let bytes = std::fs::read(file).with_context(|| format!("Failed to read {file}"))?;
    let file_name = Path::new(file)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("image");
    let path = raffle_image_path(id, file_name);

    let url = backend
        .upload(RAFFLE_IMAGES_BUCKET, &path, bytes, image_content_type(file_name))
        .await?;
    backend
        .update_row(RAFFLES, id, &json!({ "image_url": url }))
        .await?;

    println!("✅ Uploaded {url}");
    Ok(())
}

fn paginator_for(
    config: &Config,
    service: Arc<dyn DataService>,
    campaign_id: &str,
) -> DeliveryPaginator {
    DeliveryPaginator::new(service, campaign_id)
        .with_page_size(config.deliveries.page_size)
        .with_customer_batch(config.deliveries.customer_batch_size)
}

fn print_deliveries(paginator: &DeliveryPaginator) {
    for delivery in paginator.rows() {
        let customer = paginator
            .customers()
            .get(&delivery.customer_id)
            .map(|c| c.display_name().to_string())
            .unwrap_or_else(|| delivery.customer_id.clone());
        println!(
            "{}  {:<18}  {:<28}  {}",
            delivery.created_at.format("%Y-%m-%d %H:%M"),
            infer_status(delivery).as_str(),
            truncate_string(&customer, 28),
            delivery.error_text().unwrap_or("")
        );
    }
}

fn status_filter(sub: &ArgMatches) -> anyhow::Result<DeliveryStatusFilter> {
    let raw = sub.get_one::<String>("status").map(String::as_str).unwrap_or("all");
    DeliveryStatusFilter::parse(raw)
        .with_context(|| format!("Unknown status filter: {raw} (use all, pending, ok or failed)"))
}

fn required<'a>(sub: &'a ArgMatches, name: &str) -> anyhow::Result<&'a str> {
    sub.get_one::<String>(name)
        .map(String::as_str)
        .with_context(|| format!("--{name} is required"))
}

fn image_content_type(file_name: &str) -> &'static str {
    match file_name.rsplit('.').next().map(str::to_ascii_lowercase).as_deref() {
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        _ => "application/octet-stream",
    }
}

fn generate_default_config(path: &str) {
    let config = Config::default();
    match config.to_file(path) {
        Ok(()) => {
            println!("Default configuration written to: {path}");
            println!("Please edit the configuration file to suit your needs.");
        }
        Err(e) => {
            eprintln!("Error writing configuration file: {e}");
            process::exit(1);
        }
    }
}

fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(1)).collect();
        format!("{kept}…")
    }
}
