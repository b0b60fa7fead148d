//! SpaceOdT CLI entrypoint.
//!
//! This is the main entrypoint for the spaceodt command-line tool.

use std::io::{BufReader, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use space_odt::cli::{Cli, Commands, OutputFormatter, TransformCommands};
use space_odt::config::{Settings, load_dotenv, resolve_token};
use space_odt::dummy::{DummyOptions, generate_users, write_users};
use space_odt::error::Result;
use space_odt::export::{ExportOptions, ExportRunner};
use space_odt::jobs::JobManager;
use space_odt::planner::{ActionExecutor, PLAN_FILE, ProvisioningInputs, write_plan_csv};
use space_odt::softphone::{DecisionProvider, FileDecisions, PromptDecisions, SoftphoneRunner};
use space_odt::transform::{
    AddNumbersRequest, ConfigurePstnRequest, NumberList, UpdateMainNumberRequest,
    UserForwardLegacyRequest, add_numbers, configure_pstn, update_main_number, user_forward_legacy,
};
use space_odt::ui::{self, AppState};
use space_odt::webex::WebexClient;

use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose);

    // Run async runtime
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}

/// Initializes the logging system. `RUST_LOG` wins over `--verbose`.
fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Main async entry point.
async fn run(cli: Cli) -> Result<()> {
    load_dotenv()?;
    let mut settings = Settings::discover(cli.config.as_deref())?;
    let formatter = OutputFormatter::new(cli.format);

    match cli.command {
        Commands::ExportAll {
            out_dir,
            no_report,
            skip_group_members,
            no_cache,
        } => {
            if let Some(dir) = out_dir {
                settings.out_dir = dir;
            }
            let mut options = ExportOptions::from_settings(&settings);
            options.write_report &= !no_report;
            options.group_members &= !skip_group_members;
            options.write_cache &= !no_cache;
            cmd_export(&settings, options, &formatter).await
        }
        Commands::Plan { out_dir } => {
            if let Some(dir) = out_dir {
                settings.out_dir = dir;
            }
            cmd_plan(&settings, &formatter)
        }
        Commands::Run { apply } => cmd_run(&settings, apply, &formatter).await,
        Commands::Action { id, apply } => cmd_action(&settings, id, apply, &formatter).await,
        Commands::Softphones { decisions, apply } => {
            cmd_softphones(&settings, decisions, apply, &formatter).await
        }
        Commands::Serve { host, port } => {
            let host = host.unwrap_or_else(|| settings.ui.host.clone());
            let port = port.unwrap_or(settings.ui.port);
            cmd_serve(&settings, &host, port).await
        }
        Commands::Transform { command } => cmd_transform(&settings, command, &formatter).await,
        Commands::GenerateUsers {
            domain,
            count,
            output,
            location,
            country_code,
            base_extension,
            seed,
        } => cmd_generate_users(
            &DummyOptions {
                count,
                domain,
                location,
                country_code,
                base_extension,
                seed,
                output,
            },
            &formatter,
        ),
    }
}

/// Export every module.
async fn cmd_export(
    settings: &Settings,
    options: ExportOptions,
    formatter: &OutputFormatter,
) -> Result<()> {
    let client = create_webex_client(settings)?;
    info!("Exporting into: {}", options.out_dir.display());

    let summary = ExportRunner::new(&client, options).run().await?;
    emit(&formatter.format_export(&summary))
}

/// Build and write the provisioning plan.
fn cmd_plan(settings: &Settings, formatter: &OutputFormatter) -> Result<()> {
    let v21_dir = settings.v21_dir();
    debug!("Loading inputs from: {}", v21_dir.display());

    let rows = ProvisioningInputs::load(&v21_dir)?.plan();
    let plan_csv = v21_dir.join(PLAN_FILE);
    write_plan_csv(&plan_csv, &rows)?;

    emit(&formatter.format_plan(&rows, &plan_csv))
}

/// Execute the whole plan.
async fn cmd_run(settings: &Settings, apply: bool, formatter: &OutputFormatter) -> Result<()> {
    let client = create_webex_client(settings)?;
    let executor = ActionExecutor::new(&client, settings.v21_dir());

    let summary = executor.run(!apply).await?;
    emit(&formatter.format_run(&summary))
}

/// Execute one action.
async fn cmd_action(
    settings: &Settings,
    id: usize,
    apply: bool,
    formatter: &OutputFormatter,
) -> Result<()> {
    let client = create_webex_client(settings)?;
    let executor = ActionExecutor::new(&client, settings.v21_dir());

    let outcome = executor.run_single_action(id, apply).await?;
    emit(&formatter.format_action(&outcome))
}

/// Run the softphone stages.
async fn cmd_softphones(
    settings: &Settings,
    decisions: Option<PathBuf>,
    apply: bool,
    formatter: &OutputFormatter,
) -> Result<()> {
    let client = create_webex_client(settings)?;
    let provider: Box<dyn DecisionProvider> = match decisions {
        Some(path) => {
            info!("Reading decisions from: {}", path.display());
            Box::new(FileDecisions::load(&path)?)
        }
        None => Box::new(PromptDecisions::new(
            BufReader::new(std::io::stdin()),
            std::io::stderr(),
        )),
    };

    let runner = SoftphoneRunner::new(&client, settings.v2_dir(), provider.as_ref());
    let state = runner.run(apply).await?;
    emit(&formatter.format_softphones(&state))
}

/// Serve the local UI.
async fn cmd_serve(settings: &Settings, host: &str, port: u16) -> Result<()> {
    let client = create_webex_client(settings)?;
    let v21_dir = settings.v21_dir();
    let jobs = JobManager::new(Arc::new(client), v21_dir.join("jobs"), settings.jobs);

    ui::serve(AppState::new(jobs, v21_dir), host, port).await
}

/// Run a direct transformation.
async fn cmd_transform(
    settings: &Settings,
    command: TransformCommands,
    formatter: &OutputFormatter,
) -> Result<()> {
    let client = create_webex_client(settings)?;

    let result = match command {
        TransformCommands::ConfigurePstn {
            location_id,
            premise_route_type,
            premise_route_id,
            org_id,
        } => {
            let request = ConfigurePstnRequest {
                location_id,
                premise_route_type: Some(premise_route_type),
                premise_route_id,
                org_id,
            };
            configure_pstn(&client, &request).await?
        }
        TransformCommands::AddNumbers {
            location_id,
            numbers,
            number_type,
            org_id,
        } => {
            let request = AddNumbersRequest {
                location_id,
                phone_numbers: NumberList(numbers),
                number_type: Some(number_type),
                org_id,
            };
            add_numbers(&client, &request).await?
        }
        TransformCommands::UpdateMainNumber {
            location_id,
            phone_number,
            calling_line_name,
            org_id,
        } => {
            let request = UpdateMainNumberRequest {
                location_id,
                phone_number,
                calling_line_name,
                org_id,
            };
            update_main_number(&client, &request).await?
        }
        TransformCommands::UserForwardLegacy {
            person_id,
            extension,
            destination,
            org_id,
        } => {
            let request = UserForwardLegacyRequest {
                person_id,
                extension,
                destination,
                org_id,
            };
            user_forward_legacy(&client, &request).await?
        }
    };
    emit(&formatter.format_transform(&result))
}

/// Generate dummy users.
fn cmd_generate_users(options: &DummyOptions, formatter: &OutputFormatter) -> Result<()> {
    let users = generate_users(options)?;
    write_users(&options.output, &users)?;
    info!("Wrote {} users to {}", users.len(), options.output.display());

    emit(&formatter.format_users(users.len(), &options.output))
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Creates a Webex API client from the environment token.
fn create_webex_client(settings: &Settings) -> Result<WebexClient> {
    let token = resolve_token()?;
    WebexClient::with_base_url(&token, &settings.base_url, settings.timeout_secs)
}

/// Writes command output to stdout.
fn emit(text: &str) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(text.as_bytes())?;
    if !text.ends_with('\n') {
        stdout.write_all(b"\n")?;
    }
    stdout.flush()?;
    Ok(())
}
