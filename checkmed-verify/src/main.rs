//! CheckMed command-line client
//!
//! Verifies a medicine package against the CheckMed service, registers new
//! products, and reports suspected counterfeits from the last verification.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use checkmed_common::config::{ConfigOverrides, ConfigResolver, Settings};
use checkmed_common::events::{EventBus, WorkflowEvent};
use checkmed_verify::models::GeoPoint;
use checkmed_verify::services::{
    CaptureManager, FixedLocation, LocationProvider, NoLocation, RegistrationRequest,
};
use checkmed_verify::{Error, ImageBlob, ImageRole, ProductType, Workflow};

/// Command-line arguments for checkmed
#[derive(Parser, Debug)]
#[command(name = "checkmed")]
#[command(about = "Verify medicine packaging against the CheckMed registry")]
#[command(version)]
struct Cli {
    /// Base URL of the verification service
    #[arg(long, global = true)]
    service_url: Option<String>,

    /// Directory holding the last scanned session
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    /// Configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Verify a product from its package photos and registration code
    Verify(ProductArgs),

    /// Register a product with the service
    Register {
        #[command(flatten)]
        product: ProductArgs,

        #[arg(long)]
        manufacturer: String,

        #[arg(long)]
        barcode: Option<String>,
    },

    /// Report the last verified product as a suspected counterfeit
    Report {
        /// Defaults to the last verification result
        #[arg(long)]
        reason: Option<String>,

        #[arg(long, requires = "lon", allow_negative_numbers = true)]
        lat: Option<f64>,

        #[arg(long, requires = "lat", allow_negative_numbers = true)]
        lon: Option<f64>,
    },
}

#[derive(Args, Debug)]
struct ProductArgs {
    /// Product name as printed on the package
    #[arg(long)]
    name: String,

    /// tablet or syrup
    #[arg(long = "type")]
    product_type: ProductType,

    /// Registration code (NAFDAC number)
    #[arg(long)]
    code: String,

    /// Photo of the outer package
    #[arg(long)]
    package: PathBuf,

    /// Photo of the blister pack (tablets)
    #[arg(long)]
    blister: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let resolver = ConfigResolver::new(ConfigOverrides {
        service_url: cli.service_url.clone(),
        cache_dir: cli.cache_dir.clone(),
        config_path: cli.config.clone(),
    });

    // Config warnings are emitted before the final filter level is known
    let settings = tracing::subscriber::with_default(
        tracing_subscriber::fmt().with_writer(std::io::stderr).finish(),
        || resolver.resolve(),
    );

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.log_level)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!(service_url = %settings.service_url, "CheckMed client starting");
    debug!(cache_dir = %settings.cache_dir.display(), "Session cache location");

    match cli.command {
        Command::Verify(product) => run_verify(&settings, product).await,
        Command::Register {
            product,
            manufacturer,
            barcode,
        } => run_register(&settings, product, manufacturer, barcode).await,
        Command::Report { reason, lat, lon } => run_report(&settings, reason, lat, lon).await,
    }
}

async fn run_verify(settings: &Settings, product: ProductArgs) -> Result<()> {
    let mut workflow = Workflow::from_settings(settings, Arc::new(NoLocation))
        .context("Failed to initialize verification client")?;
    let progress = spawn_progress_logger(workflow.event_bus());

    workflow.begin_scan()?;
    workflow.acknowledge_instructions()?;
    workflow.start_capture(&product.name, product.product_type)?;
    workflow.capture_image(ImageRole::Package, read_image(&product.package)?)?;
    workflow.set_registration_code(&product.code)?;
    if let Some(path) = &product.blister {
        workflow.capture_image(ImageRole::BlisterPack, read_image(path)?)?;
    }

    println!("Verifying {}...", product.name);
    let verdict = workflow.verify().await?;
    progress.abort();

    if verdict.is_authentic() {
        println!("AUTHENTIC");
    } else {
        println!("NOT VERIFIED");
    }
    println!("{}", verdict.detail_text());
    if verdict.is_failed() {
        println!();
        println!("If you believe this product is counterfeit, run `checkmed report`.");
    }
    Ok(())
}

async fn run_register(
    settings: &Settings,
    product: ProductArgs,
    manufacturer: String,
    barcode: Option<String>,
) -> Result<()> {
    let mut capture = CaptureManager::new(product.name.as_str(), product.product_type);
    capture.capture_image(ImageRole::Package, read_image(&product.package)?)?;
    capture.set_registration_code(&product.code);
    if let Some(path) = &product.blister {
        capture.capture_image(ImageRole::BlisterPack, read_image(path)?)?;
    }

    let mut workflow = Workflow::from_settings(settings, Arc::new(NoLocation))
        .context("Failed to initialize verification client")?;
    workflow.open_registration()?;

    let request = RegistrationRequest {
        manufacturer,
        barcode,
    };
    match workflow.register(capture.session(), request).await {
        Ok(message) => println!("{}", message),
        Err(Error::Rejected { detail }) => println!("Registration refused: {}", detail),
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

async fn run_report(
    settings: &Settings,
    reason: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
) -> Result<()> {
    let locator: Arc<dyn LocationProvider> = match (lat, lon) {
        (Some(lat), Some(lon)) => match GeoPoint::new(lat, lon) {
            Some(point) => Arc::new(FixedLocation(point)),
            None => bail!("Invalid coordinates: {}, {}", lat, lon),
        },
        _ => Arc::new(NoLocation),
    };

    let mut workflow = Workflow::from_settings(settings, locator)
        .context("Failed to initialize verification client")?;

    let record = match workflow.prepare_report(reason).await {
        Ok(record) => record,
        Err(Error::NoCachedSession) => {
            println!("Nothing to report: verify a product first.");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    println!(
        "Reporting {} ({}) at location: {}",
        record.product_name,
        record.registration_code,
        record.location_field()
    );
    match workflow.submit_report(&record).await {
        Ok(receipt) => println!("{}", receipt.message),
        Err(Error::Rejected { detail }) => {
            println!("Report not accepted: {}", detail);
            println!("The scan is kept; you can retry `checkmed report`.");
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

fn read_image(path: &Path) -> Result<ImageBlob> {
    ImageBlob::from_path(path).with_context(|| format!("Failed to read image {}", path.display()))
}

fn spawn_progress_logger(event_bus: &EventBus) -> tokio::task::JoinHandle<()> {
    let mut rx = event_bus.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = rx.recv().await {
            match event {
                WorkflowEvent::CaptureProgress { awaiting, .. } => {
                    debug!(awaiting = %awaiting, "Capture progress")
                }
                WorkflowEvent::VerificationStarted { session_id, .. } => {
                    info!(%session_id, "Waiting for the service")
                }
                other => debug!(event = other.event_type(), "Workflow event"),
            }
        }
    })
}
