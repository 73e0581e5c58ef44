use anyhow::{Context, Result, bail};
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;
use virtual_mirror_core::{
    AppState, AssetRoot, Config, FileStore, GarmentCatalog, StillImageDevice, Studio, init,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Override the model defined in .env
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Directory serving the garment catalog and images
    #[arg(long, global = true)]
    assets: Option<PathBuf>,

    /// Directory for saved user garments (defaults to the user data dir)
    #[arg(long, global = true)]
    store_dir: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the wardrobe grouped by category.
    List {
        /// Only show garments whose name or category contains this text
        #[arg(short, long, default_value = "")]
        search: String,
    },
    /// Capture a pose and try a garment on.
    TryOn(TryOnArgs),
}

#[derive(ClapArgs, Debug)]
struct TryOnArgs {
    /// Id of a wardrobe garment
    #[arg(short, long, conflicts_with = "upload", required_unless_present = "upload")]
    garment: Option<i64>,

    /// PNG or JPEG garment image to try on instead
    #[arg(short, long)]
    upload: Option<PathBuf>,

    /// Save the uploaded garment to the wardrobe under this category
    #[arg(short, long, requires = "upload")]
    category: Option<String>,

    /// Image used as the camera feed
    #[arg(short, long)]
    pose: PathBuf,

    /// Directory the resulting look is saved to
    #[arg(short, long, default_value = ".")]
    out: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Setup
    init();
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::WARN })
        .init();

    // Load config and apply CLI overrides
    let mut config = Config::load().context("Failed to load configuration")?;
    if let Some(m) = args.model {
        config.model_name = m;
    }
    if let Some(assets) = args.assets {
        config.asset_root = assets;
    }

    let store = match args.store_dir {
        Some(dir) => FileStore::new(dir),
        None => FileStore::in_data_dir().context("Failed to locate the data directory")?,
    };

    match args.command {
        Command::List { search } => list(&config, store, &search).await,
        Command::TryOn(try_on_args) => try_on(&config, store, try_on_args).await,
    }
}

async fn list(config: &Config, store: FileStore, search: &str) -> Result<()> {
    let mut catalog = GarmentCatalog::new(store);
    if let Err(e) = catalog
        .load(&AssetRoot::new(&config.asset_root), &config.catalog_location)
        .await
    {
        eprintln!("Warning: {}", e);
    }

    let groups = catalog.grouped(search);
    if groups.is_empty() {
        if search.is_empty() {
            println!("Your wardrobe is empty. Upload a garment to get started!");
        } else {
            println!("No garments found. Try another search.");
        }
        return Ok(());
    }

    for (category, garments) in groups {
        println!("{}", category);
        for garment in garments {
            let origin = if garment.src.is_user_uploaded() { " (yours)" } else { "" };
            println!("  {:>14}  {}{}", garment.id, garment.name, origin);
        }
    }
    Ok(())
}

async fn try_on(config: &Config, store: FileStore, args: TryOnArgs) -> Result<()> {
    let mut studio = Studio::from_config(config, store).context("Failed to set up the studio")?;
    studio.load_catalog(&config.catalog_location).await;
    studio.attach_camera(&StillImageDevice::new(&args.pose));

    if let Some(camera_error) = studio.session().camera_error() {
        eprintln!("Warning: {}", camera_error);
    }

    let started = match (&args.upload, args.garment) {
        (Some(path), _) => studio.upload_garment(path, args.category.as_deref()).await,
        (None, Some(id)) => studio.select_garment(id),
        (None, None) => false,
    };

    if !started {
        match studio.session().error() {
            Some(message) => bail!("{}", message),
            None => bail!("Garment not found. Use `list` to see available ids."),
        }
    }

    let mut last_shown = None;
    while studio.session().state() == AppState::Countdown {
        if let Some(n) = studio.session().countdown().filter(|n| last_shown != Some(*n)) {
            println!("{}...", n);
            last_shown = Some(n);
        }
        studio.step().await;
    }

    match studio.session().state() {
        AppState::Result => {
            let path = studio
                .download(&args.out)
                .await
                .context("Failed to save the look")?;
            println!("Your new look was saved to {}", path.display());
            Ok(())
        }
        _ => {
            let message = studio
                .session()
                .error()
                .unwrap_or("The try-on did not complete.")
                .to_string();
            bail!("{}", message)
        }
    }
}
