//! Interactive decisions over a terminal

use super::{channel_closed, parse_token, ApprovalRequest, DecisionChannel};
use crate::error::Result;
use crate::state::HumanApproval;
use async_trait::async_trait;
use std::io::{self, BufRead, Write};
use std::sync::{Arc, Mutex};
use tokio::task;
use tracing::{info, warn};

/// Prompts on a writer and reads tokens line by line until one is valid.
///
/// Reads happen on the blocking pool so the runtime keeps serving other
/// tasks while the human thinks.
pub struct ConsoleDecisions {
    io: Arc<Mutex<ConsoleIo>>,
}

struct ConsoleIo {
    input: Box<dyn BufRead + Send>,
    output: Box<dyn Write + Send>,
}

impl ConsoleDecisions {
    /// Prompt on stdout, read from stdin
    pub fn stdio() -> Self {
        Self::with_io(io::BufReader::new(io::stdin()), io::stdout())
    }

    pub fn with_io(input: impl BufRead + Send + 'static, output: impl Write + Send + 'static) -> Self {
        Self {
            io: Arc::new(Mutex::new(ConsoleIo {
                input: Box::new(input),
                output: Box::new(output),
            })),
        }
    }
}

impl ConsoleIo {
    fn prompt(&mut self, request: &ApprovalRequest) -> Result<HumanApproval> {
        writeln!(self.output, "{request}")?;
        loop {
            write!(self.output, "Enter your decision: ")?;
            self.output.flush()?;

            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                return Err(channel_closed("console", "input closed before a decision was made"));
            }

            match parse_token(&line) {
                Ok(decision) => return Ok(decision),
                Err(err) => {
                    warn!(error = %err, "invalid decision token");
                    writeln!(self.output, "Invalid input, please try again")?;
                }
            }
        }
    }
}

#[async_trait]
impl DecisionChannel for ConsoleDecisions {
    async fn decide(&self, request: &ApprovalRequest) -> Result<HumanApproval> {
        let io = Arc::clone(&self.io);
        let request = request.clone();
        let decision = task::spawn_blocking(move || {
            let mut io = io
                .lock()
                .map_err(|_| channel_closed("console", "console lock poisoned"))?;
            io.prompt(&request)
        })
        .await
        .map_err(|e| channel_closed("console", format!("prompt task failed: {e}")))??;

        info!(decision = %decision, "human decision recorded");
        Ok(decision)
    }
}
