//! Command-line interface for zeto
//!
//! This module handles:
//! - Command-line argument parsing using clap
//! - Configuration loading and validation
//! - Opening the document store (MongoDB or a JSON fixture)
//! - Dispatching subcommands to their runners

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

pub mod commands;
pub mod completion;
pub mod filter;

use crate::config::{Config, LogLevel, PaginationConfig};
use crate::connection::ConnectionManager;
use crate::error::Result;
use crate::formatter::Formatter;
use crate::guard::{Role, RouteGuard};
use crate::pagination::QuerySpec;
use crate::seed;
use crate::store::{Direction, DocumentStore, MemoryStore, MongoStore};

/// Cursor pagination over document collections
#[derive(Parser, Debug)]
#[command(
    name = "zeto",
    version,
    about = "Cursor pagination over MongoDB collections",
    long_about = "Page through ordered document collections with cursor pagination, either
page by page or as an infinite feed, and check role-based route access."
)]
pub struct CliArgs {
    /// Configuration file path
    #[arg(short = 'c', long = "config", value_name = "FILE", global = true)]
    pub config_file: Option<PathBuf>,

    /// MongoDB connection URI
    ///
    /// Format: mongodb://[username:password@]host[:port][/database][?options]
    #[arg(long, value_name = "URI", global = true)]
    pub uri: Option<String>,

    /// Database name to use
    #[arg(long, value_name = "NAME", global = true)]
    pub database: Option<String>,

    /// Read collections from a JSON fixture instead of MongoDB
    #[arg(long, value_name = "FILE", global = true)]
    pub fixture: Option<PathBuf>,

    /// Output format (json, json-pretty, compact)
    #[arg(long, value_name = "FORMAT", global = true)]
    pub format: Option<String>,

    /// Disable colored output
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,

    /// Quiet mode (errors only)
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,

    /// Verbose mode (detailed logging)
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    /// Very verbose mode (trace logging)
    #[arg(long = "vv", global = true)]
    pub very_verbose: bool,

    /// Connection timeout in seconds
    #[arg(long, value_name = "SECONDS", global = true)]
    pub timeout: Option<u64>,

    /// Subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// What to paginate
#[derive(Args, Debug, Clone)]
pub struct QueryArgs {
    /// Collection name
    #[arg(value_name = "COLLECTION")]
    pub collection: String,

    /// Field the collection is ordered by
    #[arg(long = "order-by", value_name = "FIELD")]
    pub order_by: Option<String>,

    /// Ascending order
    #[arg(long, conflicts_with = "desc")]
    pub asc: bool,

    /// Descending order
    #[arg(long)]
    pub desc: bool,

    /// Documents per page
    #[arg(long = "page-size", value_name = "N")]
    pub page_size: Option<usize>,

    /// Filter, e.g. `type=chart` or `progress>=50` (repeatable)
    #[arg(long = "where", value_name = "EXPR")]
    pub filters: Vec<String>,
}

impl QueryArgs {
    /// Build the query, filling gaps from the configured defaults
    pub fn to_spec(&self, defaults: &PaginationConfig) -> Result<QuerySpec> {
        let mut spec = QuerySpec::from_config(&self.collection, defaults);
        if let Some(field) = &self.order_by {
            spec.order_field = field.clone();
        }
        if self.asc {
            spec.direction = Direction::Asc;
        } else if self.desc {
            spec.direction = Direction::Desc;
        }
        if let Some(size) = self.page_size {
            spec.page_size = size;
        }

        let filters = self
            .filters
            .iter()
            .map(|expr| filter::parse_filter_expr(expr))
            .collect::<Result<Vec<_>>>()?;
        let spec = spec.with_filters(filters);

        spec.validate()?;
        Ok(spec)
    }
}

/// Subcommands for zeto
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show one page of a collection
    Page {
        #[command(flatten)]
        query: QueryArgs,

        /// Page to open (1-based)
        #[arg(long, value_name = "N")]
        page: Option<usize>,

        /// Resume from and save the position to this file
        #[arg(long, value_name = "FILE")]
        bookmark: Option<PathBuf>,
    },

    /// Load a collection as an infinite feed
    Scroll {
        #[command(flatten)]
        query: QueryArgs,

        /// Number of fetches to perform
        #[arg(long, value_name = "N", default_value_t = 1)]
        batches: usize,
    },

    /// Page through a collection interactively
    Browse {
        #[command(flatten)]
        query: QueryArgs,
    },

    /// Check whether a role may open a route
    Route {
        /// Route path, e.g. /users/5
        #[arg(value_name = "PATH")]
        path: String,

        /// Signed-in role
        #[arg(
            long,
            value_name = "ROLE",
            value_parser = ["admin", "owner", "manager", "advertiser", "client"],
            conflicts_with = "anonymous"
        )]
        role: Option<String>,

        /// Check as a visitor without a session
        #[arg(long)]
        anonymous: bool,

        /// Check while the session is still resolving
        #[arg(long)]
        resolving: bool,
    },

    /// Generate mock project documents
    Seed {
        /// Collection name
        #[arg(value_name = "COLLECTION", default_value = "projects")]
        collection: String,

        /// Number of documents
        #[arg(long, default_value_t = 25)]
        count: usize,

        /// Write a fixture file instead of inserting into MongoDB
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,
    },

    /// Show version information
    Version,

    /// Generate shell completion script
    Completion {
        /// Shell type (bash, zsh, fish)
        #[arg(value_name = "SHELL")]
        shell: String,
    },

    /// Show configuration
    Config {
        /// Show effective configuration
        #[arg(long)]
        show: bool,

        /// Validate configuration file
        #[arg(long)]
        validate: bool,
    },
}

/// CLI interface handler
pub struct CliInterface {
    /// Parsed command-line arguments
    args: CliArgs,

    /// Loaded configuration
    config: Config,
}

impl CliInterface {
    /// Create a new CLI interface
    ///
    /// # Returns
    /// * `Result<Self>` - New CLI interface or error
    pub fn new() -> Result<Self> {
        let args = CliArgs::parse();
        let config = Self::load_config(&args)?;

        Ok(Self { args, config })
    }

    /// Load configuration from file and environment, then merge arguments
    ///
    /// # Arguments
    /// * `args` - Command-line arguments
    fn load_config(args: &CliArgs) -> Result<Config> {
        let mut config = Config::load(args.config_file.as_deref())?;

        // Logging is not up yet, so warnings go straight to stderr
        if let Err(e) = config.validate() {
            eprintln!("Warning: Configuration validation failed: {}", e);
            eprintln!("Using default configuration instead.");
            config = Config::default();
        }

        Self::apply_args_to_config(&mut config, args);

        Ok(config)
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the CLI arguments
    pub fn args(&self) -> &CliArgs {
        &self.args
    }

    /// Apply CLI arguments to configuration
    ///
    /// Overrides configuration values with CLI arguments where provided
    fn apply_args_to_config(config: &mut Config, args: &CliArgs) {
        Self::apply_display_args(config, args);
        Self::apply_logging_args(config, args);
        Self::apply_store_args(config, args);
    }

    /// Apply display-related CLI arguments to configuration
    fn apply_display_args(config: &mut Config, args: &CliArgs) {
        if let Some(format_str) = &args.format {
            match format_str.parse() {
                Ok(format) => config.display.format = format,
                Err(_) => eprintln!(
                    "Warning: Unknown format '{}', using {:?}",
                    format_str, config.display.format
                ),
            }
        }

        if args.no_color {
            config.display.color_output = false;
        }
    }

    /// Apply logging-related CLI arguments to configuration
    fn apply_logging_args(config: &mut Config, args: &CliArgs) {
        config.logging.level = if args.very_verbose {
            LogLevel::Trace
        } else if args.verbose {
            LogLevel::Debug
        } else if args.quiet {
            LogLevel::Error
        } else {
            config.logging.level
        };
    }

    /// Apply store-related CLI arguments to configuration
    fn apply_store_args(config: &mut Config, args: &CliArgs) {
        if let Some(uri) = &args.uri {
            config.store.uri = uri.clone();
        }
        if let Some(database) = &args.database {
            config.store.database = database.clone();
        }
        if let Some(timeout) = args.timeout {
            config.store.timeout = timeout;
        }
    }

    /// Run the selected subcommand
    pub async fn run(&self) -> Result<()> {
        let formatter = Formatter::from_config(&self.config.display);

        match &self.args.command {
            Commands::Page {
                query,
                page,
                bookmark,
            } => {
                let spec = query.to_spec(&self.config.pagination)?;
                let store = self.open_store().await?;
                let output =
                    commands::run_page(store, spec, *page, bookmark.as_deref(), &formatter)
                        .await?;
                println!("{}", output);
            }
            Commands::Scroll { query, batches } => {
                let spec = query.to_spec(&self.config.pagination)?;
                let store = self.open_store().await?;
                let output = commands::run_scroll(store, spec, *batches, &formatter).await?;
                println!("{}", output);
            }
            Commands::Browse { query } => {
                let spec = query.to_spec(&self.config.pagination)?;
                let store = self.open_store().await?;
                commands::browse(store, spec, &formatter).await?;
            }
            Commands::Route {
                path,
                role,
                anonymous,
                resolving,
            } => {
                let guard = RouteGuard::from_config(&self.config.routes)?;
                let role = match (role, anonymous) {
                    (Some(name), false) => Some(name.parse::<Role>()?),
                    _ => None,
                };
                let output = commands::run_route(&guard, path, role, *resolving, &formatter)?;
                println!("{}", output);
            }
            Commands::Seed {
                collection,
                count,
                out,
            } => self.seed(collection, *count, out.as_deref()).await?,
            Commands::Version => self.show_version(),
            Commands::Completion { shell } => {
                print!("{}", completion::generate_completion(shell)?);
            }
            Commands::Config { show, validate } => {
                self.handle_config_command(*show, *validate)?;
            }
        }

        Ok(())
    }

    /// Open the fixture when one is given, MongoDB otherwise
    async fn open_store(&self) -> Result<Arc<dyn DocumentStore>> {
        if let Some(path) = &self.args.fixture {
            let store = MemoryStore::from_fixture_file(path)?;
            info!(
                "Loaded fixture {} ({})",
                path.display(),
                store.collection_names().join(", ")
            );
            let store: Arc<dyn DocumentStore> = Arc::new(store);
            return Ok(store);
        }

        let mut manager = ConnectionManager::new(self.config.store.clone());
        manager.connect().await?;
        let store: Arc<dyn DocumentStore> = Arc::new(MongoStore::from_manager(&manager)?);
        Ok(store)
    }

    /// Generate mock projects into a fixture file or MongoDB
    async fn seed(&self, collection: &str, count: usize, out: Option<&std::path::Path>) -> Result<()> {
        let documents = seed::generate_projects(count, chrono::Utc::now());

        if let Some(path) = out {
            seed::write_fixture(path, collection, &documents)?;
            println!("Wrote {} document(s) to {}", documents.len(), path.display());
            return Ok(());
        }

        let mut manager = ConnectionManager::new(self.config.store.clone());
        manager.connect().await?;
        let inserted = MongoStore::from_manager(&manager)?
            .insert_documents(collection, documents)
            .await?;
        println!(
            "Inserted {} document(s) into {}.{}",
            inserted, self.config.store.database, collection
        );
        manager.disconnect().await
    }

    /// Show version information
    fn show_version(&self) {
        println!("zeto version {}", env!("CARGO_PKG_VERSION"));
        println!("Rust version: {}", env!("CARGO_PKG_RUST_VERSION"));
    }

    /// Handle config subcommand
    ///
    /// # Arguments
    /// * `show` - Whether to show configuration
    /// * `validate` - Whether to validate configuration
    fn handle_config_command(&self, show: bool, validate: bool) -> Result<()> {
        if validate {
            self.validate_config_file();
        }

        if show || !validate {
            self.show_config()?;
        }

        Ok(())
    }

    /// Validate configuration file
    fn validate_config_file(&self) {
        let path = self.get_config_path();
        println!("Validating configuration file: {}", path.display());

        if !path.exists() {
            println!("❌ Configuration file does not exist");
            return;
        }

        match Config::load_from_file(Some(&path)) {
            Ok(config) => match config.validate() {
                Ok(_) => println!("✅ Configuration is valid"),
                Err(e) => println!("❌ Configuration validation failed: {}", e),
            },
            Err(e) => println!("❌ Failed to load configuration: {}", e),
        }
    }

    /// Show effective configuration
    fn show_config(&self) -> Result<()> {
        let path = self.get_config_path();
        println!("Configuration file: {}", path.display());
        println!();
        println!("=== Effective Configuration ===");
        println!();

        match self.config.to_toml() {
            Ok(toml_str) => println!("{}", toml_str),
            Err(e) => {
                eprintln!("Error formatting configuration: {}", e);
                println!("{:#?}", self.config);
            }
        }

        Ok(())
    }

    /// Get configuration file path (from args or default)
    fn get_config_path(&self) -> PathBuf {
        self.args
            .config_file
            .clone()
            .unwrap_or_else(Config::default_config_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutputFormat;
    use crate::store::FilterOp;

    fn cli(argv: &[&str]) -> CliInterface {
        let args = CliArgs::try_parse_from(argv).unwrap();
        let mut config = Config::default();
        CliInterface::apply_args_to_config(&mut config, &args);
        CliInterface { args, config }
    }

    #[test]
    fn test_page_command_parsing() {
        let args = CliArgs::try_parse_from([
            "zeto",
            "page",
            "projects",
            "--page",
            "3",
            "--order-by",
            "name",
            "--asc",
            "--where",
            "type=chart",
            "--where",
            "fileCount>2",
        ])
        .unwrap();

        let Commands::Page { query, page, bookmark } = args.command else {
            panic!("expected page command");
        };
        assert_eq!(page, Some(3));
        assert!(bookmark.is_none());

        let spec = query.to_spec(&PaginationConfig::default()).unwrap();
        assert_eq!(spec.collection, "projects");
        assert_eq!(spec.order_field, "name");
        assert_eq!(spec.direction, Direction::Asc);
        assert_eq!(spec.page_size, crate::pagination::DEFAULT_PAGE_SIZE);
        assert_eq!(spec.filters.len(), 2);
        assert_eq!(spec.filters[1].op, FilterOp::Gt);
    }

    #[test]
    fn test_query_defaults_come_from_config() {
        let args = CliArgs::try_parse_from(["zeto", "scroll", "projects"]).unwrap();
        let Commands::Scroll { query, batches } = args.command else {
            panic!("expected scroll command");
        };
        assert_eq!(batches, 1);

        let spec = query.to_spec(&PaginationConfig::default()).unwrap();
        assert_eq!(spec.order_field, "createdAt");
        assert_eq!(spec.direction, Direction::Desc);
    }

    #[test]
    fn test_query_rejects_bad_input() {
        let args = CliArgs::try_parse_from(["zeto", "page", "projects", "--page-size", "0"]).unwrap();
        let Commands::Page { query, .. } = args.command else {
            panic!("expected page command");
        };
        assert!(query.to_spec(&PaginationConfig::default()).is_err());

        let args = CliArgs::try_parse_from(["zeto", "page", "projects", "--where", "oops"]).unwrap();
        let Commands::Page { query, .. } = args.command else {
            panic!("expected page command");
        };
        assert!(query.to_spec(&PaginationConfig::default()).is_err());

        assert!(CliArgs::try_parse_from(["zeto", "page", "projects", "--asc", "--desc"]).is_err());
    }

    #[test]
    fn test_route_command_parsing() {
        let args = CliArgs::try_parse_from(["zeto", "route", "/users", "--role", "manager"]).unwrap();
        let Commands::Route { path, role, anonymous, .. } = args.command else {
            panic!("expected route command");
        };
        assert_eq!(path, "/users");
        assert_eq!(role.as_deref(), Some("manager"));
        assert!(!anonymous);

        assert!(CliArgs::try_parse_from(["zeto", "route", "/users", "--role", "root"]).is_err());
        assert!(
            CliArgs::try_parse_from(["zeto", "route", "/", "--role", "admin", "--anonymous"])
                .is_err()
        );
    }

    #[test]
    fn test_args_override_config() {
        let cli = cli(&[
            "zeto",
            "--uri",
            "mongodb://db.internal:27017",
            "--database",
            "crm",
            "--timeout",
            "5",
            "--format",
            "compact",
            "--no-color",
            "-v",
            "version",
        ]);

        let config = cli.config();
        assert_eq!(config.store.uri, "mongodb://db.internal:27017");
        assert_eq!(config.store.database, "crm");
        assert_eq!(config.store.timeout, 5);
        assert_eq!(config.display.format, OutputFormat::Compact);
        assert!(!config.display.color_output);
        assert_eq!(config.logging.level, LogLevel::Debug);
    }

    #[test]
    fn test_unknown_format_keeps_config() {
        let cli = cli(&["zeto", "--format", "table", "-q", "version"]);
        assert_eq!(cli.config().display.format, OutputFormat::JsonPretty);
        assert_eq!(cli.config().logging.level, LogLevel::Error);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args =
            CliArgs::try_parse_from(["zeto", "page", "projects", "--fixture", "data.json"]).unwrap();
        assert_eq!(args.fixture, Some(PathBuf::from("data.json")));
    }

    #[test]
    fn test_seed_defaults() {
        let args = CliArgs::try_parse_from(["zeto", "seed"]).unwrap();
        let Commands::Seed { collection, count, out } = args.command else {
            panic!("expected seed command");
        };
        assert_eq!(collection, "projects");
        assert_eq!(count, 25);
        assert!(out.is_none());
    }
}
