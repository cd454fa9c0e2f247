use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;

use btoken::load::{self, VocabFormat};
use btoken::{Fallback, TokenId, Tokenizer};
use clap::Parser;
use rayon::prelude::*;

/// Tokenize files or stdin with a greedy longest-match vocabulary.
///
/// When no paths are given, reads from stdin.
#[derive(Parser, Debug)]
#[command(name = "btoken", version)]
struct Args {
    /// Vocabulary file: JSON array, JSON object of ids, or .tiktoken
    #[arg(long, env = "BTOKEN_VOCAB")]
    vocab: PathBuf,

    /// Vocabulary format: auto, json, byte-level-json or tiktoken
    #[arg(short, long, default_value = "auto")]
    format: String,

    /// Print token counts instead of ids
    #[arg(short, long)]
    count: bool,

    /// First of 256 ids for unmatched bytes (default: one past the largest id)
    #[arg(long, conflicts_with = "fallback_id")]
    fallback_base: Option<TokenId>,

    /// Single id for every unmatched byte
    #[arg(long)]
    fallback_id: Option<TokenId>,

    /// Log vocabulary and trie statistics to stderr
    #[arg(short, long)]
    verbose: bool,

    /// Input files
    paths: Vec<PathBuf>,
}

struct Input {
    name: Option<String>,
    text: Vec<u8>,
}

fn format_line(count: &str, label: &str) -> String {
    format!("{:>8} {}\n", count, label)
}

fn load_tokenizer(args: &Args) -> Result<Tokenizer, Box<dyn std::error::Error>> {
    let format = match args.format.as_str() {
        "auto" => VocabFormat::from_path(&args.vocab),
        other => other.parse::<VocabFormat>()?,
    };
    let vocab = load::load_vocab_file(&args.vocab, format)
        .map_err(|e| format!("{}: {}", args.vocab.display(), e))?;
    let tokenizer = match (args.fallback_base, args.fallback_id) {
        (Some(base), _) => Tokenizer::with_fallback(vocab, Fallback::ByteOffset(base))?,
        (None, Some(id)) => Tokenizer::with_fallback(vocab, Fallback::Single(id))?,
        (None, None) => Tokenizer::new(vocab)?,
    };
    Ok(tokenizer)
}

fn read_inputs(paths: &[PathBuf]) -> io::Result<Vec<Input>> {
    if paths.is_empty() {
        let mut buf = Vec::new();
        io::stdin().read_to_end(&mut buf)?;
        return Ok(vec![Input {
            name: None,
            text: buf,
        }]);
    }
    paths
        .iter()
        .map(|p| {
            let text = fs::read(p)
                .map_err(|e| io::Error::new(e.kind(), format!("{}: {}", p.display(), e)))?;
            Ok(Input {
                name: Some(p.to_string_lossy().to_string()),
                text,
            })
        })
        .collect()
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let tokenizer = load_tokenizer(&args)?;
    let inputs = read_inputs(&args.paths)?;
    let use_parallel = inputs.len() > 1;

    if args.count {
        let count_one = |input: &Input| tokenizer.count_tokens(&input.text);
        let counts: Vec<usize> = if use_parallel {
            inputs.par_iter().map(count_one).collect()
        } else {
            inputs.iter().map(count_one).collect()
        };
        let total: usize = counts.iter().sum();
        if inputs.len() > 1 {
            for (input, count) in inputs.iter().zip(counts.iter()) {
                print!(
                    "{}",
                    format_line(&count.to_string(), input.name.as_deref().unwrap_or(""))
                );
            }
            print!("{}", format_line(&total.to_string(), "total"));
        } else {
            print!(
                "{}",
                format_line(&total.to_string(), inputs[0].name.as_deref().unwrap_or(""))
            );
        }
        return Ok(());
    }

    let texts: Vec<&[u8]> = inputs.iter().map(|i| i.text.as_slice()).collect();
    let results = if use_parallel {
        tokenizer.tokenize_batch(&texts)
    } else {
        texts.iter().map(|t| tokenizer.tokenize(t)).collect()
    };
    for (input, ids) in inputs.iter().zip(results.iter()) {
        let json = serde_json::to_string(ids)?;
        match input.name.as_deref() {
            Some(name) if use_parallel => println!("{}: {}", name, json),
            _ => println!("{}", json),
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();

    let level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
