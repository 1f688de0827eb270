//! Walk a story script from the terminal: prints each node's text,
//! offers choices, and continues on enter.
//!
//! Usage: `cargo run --bin preview -- path/to/story`

use std::io::{self, BufRead, Write};
use std::path::Path;

use vignette::progress::{MemoryBackend, ProgressStore};
use vignette::session::{SessionHub, StorySource};

struct FileSource;

impl StorySource for FileSource {
    async fn fetch(&self, path: &str) -> anyhow::Result<Vec<u8>> {
        Ok(std::fs::read(path)?)
    }
}

fn main() -> anyhow::Result<()> {
    let path = std::env::args()
        .nth(1)
        .ok_or_else(|| anyhow::anyhow!("usage: preview <story-file>"))?;
    let story_id = Path::new(&path)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("story")
        .to_string();

    let mut hub = SessionHub::new(FileSource, ProgressStore::open(MemoryBackend::new()));
    hub.initialize_blocking(&story_id, &path)?;

    let stdin = io::stdin();
    loop {
        let Some(state) = hub.state() else { break };

        if !state.current_text.is_empty() {
            println!("\n{}", state.current_text);
        }
        if state.is_complete {
            println!("\n-- the end --");
            break;
        }

        if state.can_continue {
            print!("[enter] ");
            io::stdout().flush()?;
            let mut line = String::new();
            stdin.lock().read_line(&mut line)?;
            hub.continue_story()?;
            continue;
        }

        for choice in &state.choices {
            println!("  {}) {}", choice.index + 1, choice.text);
        }
        print!("> ");
        io::stdout().flush()?;
        let mut line = String::new();
        stdin.lock().read_line(&mut line)?;

        match line.trim().parse::<usize>() {
            Ok(pick) if pick >= 1 => {
                if let Err(err) = hub.make_choice(pick - 1) {
                    eprintln!("{}", err);
                }
            }
            _ => eprintln!("pick a choice by number"),
        }
    }

    Ok(())
}
