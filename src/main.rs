use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use cmdtree_eval::ast::{ast2template, pretty_print, TokenOptions};
use cmdtree_eval::eval::{read_records, run_batch};
use cmdtree_eval::{ScoreConfig, Scorer};
use similar::{ChangeTag, TextDiff};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "cmdtree-eval")]
#[command(about = "Score predicted shell commands against ground truths")]
#[command(version)]
struct Cli {
    /// Scorer settings (TOML)
    #[arg(long = "config", global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Score one prediction against one or more ground truths
    Score {
        #[arg(long = "truth", required = true)]
        truth: Vec<String>,

        #[arg(long = "pred")]
        pred: String,

        #[arg(long = "confidence", default_value_t = 1.0)]
        confidence: f64,

        /// Compare argument types instead of literal values
        #[arg(long = "loose")]
        loose: bool,

        /// Output the record as JSON
        #[arg(long = "json")]
        json: bool,
    },

    /// Score a JSON-lines file of records
    Batch {
        file: String,

        /// Wall-clock budget per record
        #[arg(long = "timeout-ms")]
        timeout_ms: Option<u64>,
    },

    /// Print the normalized tree of a command
    Tree {
        cmd: String,

        #[arg(long = "template")]
        template: bool,
    },

    /// Word diff of two command templates
    Diff {
        #[arg(long = "truth")]
        truth: String,

        #[arg(long = "pred")]
        pred: String,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,cmdtree_eval=info"));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("Error: {}", message);
    std::process::exit(1);
}

fn load_config(path: Option<&str>) -> ScoreConfig {
    match path {
        Some(path) => ScoreConfig::load(path).unwrap_or_else(|e| fail(e)),
        None => ScoreConfig::default(),
    }
}

fn template_of(scorer: &Scorer, cmd: &str) -> String {
    let tree = scorer.parse_or_fallback(Some(cmd));
    ast2template(&tree, &TokenOptions::loose().arg_type_only(true))
}

#[tokio::main]
async fn main() {
    init_logging();
    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_deref());

    match cli.command {
        Command::Score {
            truth,
            pred,
            confidence,
            loose,
            json,
        } => {
            config.ignore_arg_value |= loose;
            let scorer = Scorer::new(config).unwrap_or_else(|e| fail(e));
            let record = scorer.score(&truth, &pred, confidence);
            if json {
                match serde_json::to_string(&record) {
                    Ok(line) => println!("{}", line),
                    Err(e) => fail(e),
                }
            } else {
                println!("min_tree_distance: {}", record.min_tree_distance);
                println!("one_match:         {}", record.one_match);
                println!("template_match:    {}", record.template_match);
                println!("string_match:      {}", record.string_match);
                println!("cms:               {:.4}", record.cms);
                println!("bleu:              {:.4}", record.bleu);
                println!("composite_score:   {:.4}", record.composite_score);
            }
        }
        Command::Batch { file, timeout_ms } => {
            let input = std::fs::read_to_string(&file)
                .unwrap_or_else(|e| fail(format!("Cannot read {}: {}", file, e)));
            let records = read_records(&input).unwrap_or_else(|e| fail(e));
            let scorer = Arc::new(Scorer::new(config).unwrap_or_else(|e| fail(e)));
            let budget = timeout_ms.map(Duration::from_millis);
            let summary = run_batch(scorer, records, budget).await;
            println!("{}", serde_json::json!(summary));
        }
        Command::Tree { cmd, template } => {
            let scorer = Scorer::new(config).unwrap_or_else(|e| fail(e));
            let tree = scorer.parse(&cmd).unwrap_or_else(|e| fail(e));
            if template {
                println!("{}", ast2template(&tree, &TokenOptions::loose().arg_type_only(true)));
            } else {
                println!("{}", pretty_print(&tree));
            }
        }
        Command::Diff { truth, pred } => {
            let scorer = Scorer::new(config).unwrap_or_else(|e| fail(e));
            let old = template_of(&scorer, &truth);
            let new = template_of(&scorer, &pred);
            let diff = TextDiff::from_words(&old, &new);
            let mut line = String::new();
            for change in diff.iter_all_changes() {
                let word = change.value();
                match change.tag() {
                    ChangeTag::Delete => line.push_str(&format!("[-{}-]", word)),
                    ChangeTag::Insert => line.push_str(&format!("{{+{}+}}", word)),
                    ChangeTag::Equal => line.push_str(word),
                }
            }
            println!("{}", line);
        }
    }
}
