use anyhow::bail;
use clap::Parser;
use core::time::Duration;

/// Runtime configuration for the `chunkfeed-demo` binary.
///
/// Every value can be given as a CLI flag or an environment variable (a
/// `.env` file in the working directory is loaded first).
#[derive(Parser, Debug, Clone)]
#[command(
    name = "chunkfeed-demo",
    version,
    about = "Pages through a live todo list while background writers edit it"
)]
pub struct CliArgs {
    /// Number of todos requested per page.
    ///
    /// Environment variable: `PAGE_SIZE`
    #[arg(long, env = "PAGE_SIZE", default_value_t = 5)]
    pub page_size: usize,

    /// Number of todos in the list before the collection opens.
    ///
    /// Environment variable: `SEED_DOCS`
    #[arg(long, env = "SEED_DOCS", default_value_t = 12)]
    pub seed_docs: usize,

    /// Number of background tasks editing the list.
    ///
    /// Environment variable: `NUM_WRITERS`
    #[arg(long, env = "NUM_WRITERS", default_value_t = 2)]
    pub num_writers: usize,

    /// Delay between two edits of the same writer, in milliseconds.
    ///
    /// Environment variable: `WRITE_INTERVAL_MS`
    #[arg(long, env = "WRITE_INTERVAL_MS", default_value_t = 700)]
    pub write_interval_ms: u64,

    /// Delay between two `load_more` calls, in milliseconds.
    ///
    /// Environment variable: `LOAD_INTERVAL_MS`
    #[arg(long, env = "LOAD_INTERVAL_MS", default_value_t = 2_000)]
    pub load_interval_ms: u64,

    /// Number of `load_more` calls before the demo stops.
    ///
    /// Environment variable: `LOAD_ROUNDS`
    #[arg(long, env = "LOAD_ROUNDS", default_value_t = 4)]
    pub load_rounds: usize,

    /// Probability, between 0 and 1, that an edit deletes a todo.
    ///
    /// Environment variable: `DELETE_RATIO`
    #[arg(long, env = "DELETE_RATIO", default_value_t = 0.25)]
    pub delete_ratio: f64,

    /// Print every view as one JSON line instead of a table.
    ///
    /// Environment variable: `JSON`
    #[arg(long, env = "JSON", default_value_t = false)]
    pub json: bool,
}

/// What each writer task does between ticks.
#[derive(Debug, Clone, Copy)]
pub struct WriterConfig {
    pub interval: Duration,
    pub delete_ratio: f64,
}

#[derive(Debug, Clone)]
pub struct DemoConfig {
    pub page_size: usize,
    pub seed_docs: usize,
    pub num_writers: usize,
    pub load_interval: Duration,
    pub load_rounds: usize,
    pub writer: WriterConfig,
    pub json: bool,
}

impl TryFrom<CliArgs> for DemoConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.page_size == 0 {
            bail!("PAGE_SIZE must be greater than 0");
        }

        if args.load_interval_ms == 0 {
            bail!("LOAD_INTERVAL_MS must be greater than 0");
        }

        if args.num_writers > 0 && args.write_interval_ms == 0 {
            bail!(
                "WRITE_INTERVAL_MS must be greater than 0 when NUM_WRITERS ({}) is set",
                args.num_writers
            );
        }

        if !(0.0..=1.0).contains(&args.delete_ratio) {
            bail!(
                "DELETE_RATIO ({}) must be between 0 and 1",
                args.delete_ratio
            );
        }

        Ok(Self {
            page_size: args.page_size,
            seed_docs: args.seed_docs,
            num_writers: args.num_writers,
            load_interval: Duration::from_millis(args.load_interval_ms),
            load_rounds: args.load_rounds,
            writer: WriterConfig {
                interval: Duration::from_millis(args.write_interval_ms),
                delete_ratio: args.delete_ratio,
            },
            json: args.json,
        })
    }
}
