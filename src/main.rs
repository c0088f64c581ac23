//! Thin composition root wiring a one-shot, local-only crawl: the
//! connector-framework glue the crate itself stays agnostic of (`SPEC_FULL.md`
//! §0). SMB/NFS-mounted roots and the full lister/schedule loop are exercised
//! through the library's trait seams and tests, not here — this binary only
//! proves the traversal subsystem end to end against the local disk.
use clap::Parser;
use fscrawl::{Document, DocumentAcceptor, FileSystemConfig, SinkError, Traverser};
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(
    version = env!("CARGO_PKG_VERSION"),
    about = "One-shot local crawl demo for the fscrawl traversal subsystem"
)]
struct Args {
    /// Root paths to crawl (local POSIX or Windows paths only).
    #[arg(required = true)]
    roots: Vec<String>,

    /// Load the rest of the options from a YAML config file (`SPEC_FULL.md`
    /// §1.3); `roots` above are appended to its `start_paths`.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Emit ACL documents alongside content documents.
    #[arg(long)]
    push_acls: bool,

    /// Mark every document public instead of emitting ACLs.
    #[arg(long, conflicts_with = "push_acls")]
    mark_all_public: bool,

    /// Use inheritance-aware ACL documents rather than legacy flat ACLs.
    #[arg(long)]
    inherited_acls: bool,

    /// Include patterns (literal prefix, or `regexp:`/`regexpIgnoreCase:`).
    #[arg(long = "include")]
    include_patterns: Vec<String>,

    /// Exclude patterns, same syntax as `--include`.
    #[arg(long = "exclude")]
    exclude_patterns: Vec<String>,

    /// `RUST_LOG`-style filter; defaults to `info`.
    #[arg(long, default_value = "info")]
    log_filter: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&args.log_filter))
        .with_writer(std::io::stderr)
        .init();

    let mut config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)?;
            FileSystemConfig::from_yaml(&text)?
        }
        None => FileSystemConfig::default(),
    };
    config.start_paths.extend(args.roots);
    config.push_acls |= args.push_acls;
    config.mark_all_documents_public |= args.mark_all_public;
    config.supports_inherited_acls |= args.inherited_acls;
    config.include_patterns.extend(args.include_patterns);
    config.exclude_patterns.extend(args.exclude_patterns);
    config.validate()?;

    let classifier = Arc::new(fscrawl::local_classifier());
    let sink = StdoutSink::default();
    let shutdown = AtomicBool::new(false);

    for root in config.start_paths.clone() {
        info!(root = %root, "starting crawl cycle");
        let traverser = Traverser::new(Arc::clone(&classifier), root.clone(), &config)?;
        if let Err(error) = traverser.call(&sink, &shutdown) {
            eprintln!("crawl of {root} ended with an error: {error}");
        }
    }

    println!("emitted {} documents", sink.count());
    Ok(())
}

/// Prints each document's docid to stdout as it arrives. A real deployment's
/// sink backs onto the connector framework's feed pusher (spec §1); this is
/// the minimal stand-in the demo binary needs.
#[derive(Default)]
struct StdoutSink {
    count: std::sync::atomic::AtomicUsize,
}

impl StdoutSink {
    fn count(&self) -> usize {
        self.count.load(std::sync::atomic::Ordering::SeqCst)
    }
}

impl DocumentAcceptor for StdoutSink {
    fn take(&self, document: Document) -> Result<(), SinkError> {
        println!("{}", document.docid());
        self.count.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok(())
    }

    fn flush(&self) -> Result<(), SinkError> {
        Ok(())
    }

    fn cancel(&self) {}
}
