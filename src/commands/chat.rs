use anyhow::Result;
use std::io::{self, BufRead, Write};
use std::path::Path;

use graphsemantics::agent::Turn;

use super::{build_agent, load_settings, open_store};
use crate::cli::ReasoningArgs;

/// Interactive loop; this command owns the history and appends every answered turn
pub async fn run(env_file: Option<&Path>, args: &ReasoningArgs) -> Result<()> {
    let settings = load_settings(env_file, args)?;
    let store = open_store(&settings)?;
    let agent = build_agent(&settings, &store)?;

    let mut history: Vec<Turn> = Vec::new();
    let stdin = io::stdin();

    eprintln!("Ask about movies or people. Type 'exit' or press Ctrl-D to quit.");
    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let utterance = line.trim();
        if utterance.is_empty() {
            continue;
        }
        if matches!(utterance, "exit" | "quit") {
            break;
        }

        match agent.query(utterance, &history).await {
            Ok(answer) => {
                println!("{}\n", answer);
                history.push(Turn::new(utterance, answer));
            }
            // Keep the session alive; the turn is simply not recorded
            Err(e) => eprintln!("Error: {}\n", e),
        }
    }

    Ok(())
}
