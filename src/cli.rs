use clap::{Parser, Subcommand};
use similtext::config;
use similtext::{DocId, DirStore, SharedIndex};
use std::convert::Infallible;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "similtext", about = "TF-IDF text similarity index")]
pub struct Cli {
    /// Directory holding the index blobs
    #[arg(short, long, env = "SIMILTEXT_STORAGE_DIR", default_value = config::DEFAULT_STORAGE_DIR)]
    pub storage_dir: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP server
    Serve {
        /// Address to bind to
        #[arg(long, env = "SIMILTEXT_HOST", default_value = config::DEFAULT_HOST)]
        host: String,

        /// Port to listen on
        #[arg(short, long, env = "SIMILTEXT_PORT", default_value_t = config::DEFAULT_PORT)]
        port: u16,
    },
    /// Rebuild the index from a JSON file of [id, text] pairs
    Init { file: PathBuf },
    /// List indexed document ids
    List,
    /// Find the most similar document and index the text under ID on a match
    Check {
        #[arg(value_parser = parse_doc_id)]
        id: DocId,
        text: String,
    },
    /// Show the term weights of a document
    Scores {
        #[arg(value_parser = parse_doc_id)]
        id: DocId,
    },
    /// Rank documents against a text without indexing it
    Search {
        text: String,

        /// Number of results
        #[arg(short = 'k', long, default_value_t = config::DEFAULT_TOP_K)]
        top_k: usize,
    },
}

/// Integer ids parse as integers so they match ids indexed from JSON numbers.
fn parse_doc_id(s: &str) -> Result<DocId, Infallible> {
    s.parse()
}

/// Reads `[[id, text], ...]`; pairs with a null id or text are dropped.
fn read_documents(path: &Path) -> Result<Vec<(DocId, String)>, String> {
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Fail to read '{}': {}", path.display(), e))?;
    let pairs: Vec<(Option<DocId>, Option<String>)> = serde_json::from_str(&raw)
        .map_err(|e| format!("Invalid document list in '{}': {}", path.display(), e))?;

    Ok(pairs.into_iter()
        .filter_map(|(id, text)| Some((id?, text?)))
        .collect())
}

/// Runs one non-server command against the index and prints the outcome.
/// Returns false when the command failed.
pub fn execute_command(index: &SharedIndex<DirStore>, command: Command) -> bool {
    let outcome = match command {
        Command::Serve { .. } => Err("'serve' is handled by main".to_string()),

        Command::Init { file } => read_documents(&file).and_then(|documents| {
            let ids = index.rebuild(documents).map_err(|e| e.to_string())?;
            println!("Indexed {} documents", ids.len());
            Ok(())
        }),

        Command::List => index.list_ids().map_err(|e| e.to_string()).map(|ids| {
            if ids.is_empty() {
                println!("Index is empty");
            } else {
                for id in &ids {
                    println!("  {}", id);
                }
                println!("Total: {} documents", ids.len());
            }
        }),

        Command::Check { id, text } => index.query_and_index(id, &text).map_err(|e| e.to_string()).map(|found| {
            match found {
                Some(m) => println!("Most similar: {} (score {:.4})", m.id, m.score),
                None => println!("No similar document"),
            }
        }),

        Command::Scores { id } => index.scores_for(&id).map_err(|e| e.to_string()).and_then(|scores| {
            let scores = scores.ok_or_else(|| format!("Document '{}' not found", id))?;
            let mut ranked: Vec<(String, f32)> = scores.into_iter().collect();
            ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
            for (term, weight) in ranked {
                println!("  {}: {:.4}", term, weight);
            }
            Ok(())
        }),

        Command::Search { text, top_k } => index.rank(&text, top_k).map_err(|e| e.to_string()).map(|matches| {
            if matches.is_empty() {
                println!("No results found");
            } else {
                println!("Top {} results:", matches.len());
                for (rank, m) in matches.iter().enumerate() {
                    println!("{}. ID: {}, Score: {:.4}", rank + 1, m.id, m.score);
                }
            }
        }),
    };

    match outcome {
        Ok(()) => true,
        Err(error) => {
            eprintln!("Error: {}", error);
            false
        }
    }
}

#[cfg(test)]
mod cli_test {
    use super::*;

    #[test]
    fn test_parse_check_with_integer_id() {
        let cli = Cli::try_parse_from(["similtext", "check", "42", "some text"]).unwrap();
        match cli.command {
            Command::Check { id, text } => {
                assert_eq!(id, DocId::Int(42));
                assert_eq!(text, "some text");
            }
            _ => panic!("expected check"),
        }
    }

    #[test]
    fn test_parse_search_defaults() {
        let cli = Cli::try_parse_from(["similtext", "--storage-dir", "/tmp/idx", "search", "hello"]).unwrap();
        assert_eq!(cli.storage_dir, PathBuf::from("/tmp/idx"));
        match cli.command {
            Command::Search { top_k, .. } => assert_eq!(top_k, config::DEFAULT_TOP_K),
            _ => panic!("expected search"),
        }
    }

    #[test]
    fn test_init_then_check() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("docs.json");
        fs::write(&file, r#"[[1, "first document"], [2, null], [3, "third document"]]"#).unwrap();

        let index = SharedIndex::new(DirStore::new(dir.path().join("storage")));
        assert!(execute_command(&index, Command::Init { file }));
        assert_eq!(index.list_ids().unwrap(), vec![DocId::Int(1), DocId::Int(3)]);

        let check = Command::Check { id: DocId::Int(4), text: "third".to_string() };
        assert!(execute_command(&index, check));
        assert_eq!(index.list_ids().unwrap().len(), 3);

        assert!(!execute_command(&index, Command::Scores { id: DocId::Int(99) }));
    }

    #[test]
    fn test_init_then_scores_by_integer_id() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("docs.json");
        fs::write(&file, r#"[[1, "cat cat dog"]]"#).unwrap();

        let index = SharedIndex::new(DirStore::new(dir.path().join("storage")));
        assert!(execute_command(&index, Command::Init { file }));

        let cli = Cli::try_parse_from(["similtext", "scores", "1"]).unwrap();
        match &cli.command {
            Command::Scores { id } => assert_eq!(id, &DocId::Int(1)),
            _ => panic!("expected scores"),
        }
        assert!(execute_command(&index, cli.command));

        let cli = Cli::try_parse_from(["similtext", "check", "doc-7", "cat"]).unwrap();
        match cli.command {
            Command::Check { id, .. } => assert_eq!(id, DocId::from("doc-7")),
            _ => panic!("expected check"),
        }
    }

    #[test]
    fn test_init_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let index = SharedIndex::new(DirStore::new(dir.path()));
        assert!(!execute_command(&index, Command::Init { file: dir.path().join("nope.json") }));
    }
}
