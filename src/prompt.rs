//! Operator interaction: the phase-order menu and per-phase yes/no questions.
//!
//! Confirmations wait a bounded time and fall back to "yes". stdin has no
//! cancellable read, so a detached worker thread performs reads, one line per
//! request, and hands each line back over a channel. A read is only requested
//! when a question is asked; while hashcat owns the terminal no read is in
//! flight unless the previous question timed out. A line that completes such a
//! leftover read answered the old question and is dropped before the next one.
use std::io::{self, BufRead, Write};
use std::thread;
use std::time::Duration;

use colored::Colorize;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError, unbounded};
use log::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Confirmation {
    pub accepted: bool,
    pub timed_out: bool,
}

pub trait Operator {
    fn confirm(&mut self, question: &str) -> Confirmation;

    /// Ask for the comma-separated phase order. An empty answer means `default`.
    fn phase_order(&mut self, menu: &str, default: &str) -> String;
}

/// Empty answers take the default; `y`/`yes` accept; anything else declines.
pub fn parse_answer(line: &str) -> Option<bool> {
    let answer = line.trim();
    if answer.is_empty() {
        return None;
    }
    Some(answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes"))
}

/// Read one line from `input` for every request until the requests stop or
/// the input ends. Dropping `lines` on the way out tells the prompt that no
/// more answers will come.
pub fn serve_reads<R: BufRead>(mut input: R, requests: Receiver<()>, lines: Sender<String>) {
    for () in requests.iter() {
        let mut line = String::new();
        match input.read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {
                if lines.send(line).is_err() {
                    break;
                }
            }
        }
    }
}

pub struct TimedPrompt {
    requests: Sender<()>,
    lines: Receiver<String>,
    timeout: Duration,
    pending: bool,
}

impl TimedPrompt {
    pub fn spawn(timeout: Duration) -> io::Result<Self> {
        let (req_tx, req_rx) = unbounded();
        let (line_tx, line_rx) = unbounded();
        thread::Builder::new()
            .name("stdin-reader".to_string())
            .spawn(move || serve_reads(io::stdin().lock(), req_rx, line_tx))?;
        Ok(Self::with_channels(req_tx, line_rx, timeout))
    }

    /// Prompt over an existing reader: `requests` asks for one line, `lines`
    /// delivers it.
    pub fn with_channels(requests: Sender<()>, lines: Receiver<String>, timeout: Duration) -> Self {
        Self {
            requests,
            lines,
            timeout,
            pending: false,
        }
    }

    /// Drop the answer to a question that already timed out, if it came in.
    fn discard_stale(&mut self) {
        if !self.pending {
            return;
        }
        match self.lines.try_recv() {
            Ok(line) => {
                debug!("dropping late answer {:?}", line.trim());
                self.pending = false;
            }
            Err(TryRecvError::Disconnected) => self.pending = false,
            Err(TryRecvError::Empty) => {}
        }
    }

    /// Next answer line. A read still pending from a timed-out question is
    /// reused rather than doubled.
    fn next_line(&mut self, timeout: Option<Duration>) -> Result<String, RecvTimeoutError> {
        self.discard_stale();
        if !self.pending {
            self.requests
                .send(())
                .map_err(|_| RecvTimeoutError::Disconnected)?;
            self.pending = true;
        }
        let res = match timeout {
            Some(t) => self.lines.recv_timeout(t),
            None => self.lines.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };
        if !matches!(res, Err(RecvTimeoutError::Timeout)) {
            self.pending = false;
        }
        res
    }
}

fn banner(text: &str) {
    let rule = "*".repeat(80);
    println!("\n{}", rule.on_green());
    print!("{}", text.black().on_green());
    let _ = io::stdout().flush();
}

impl Operator for TimedPrompt {
    fn confirm(&mut self, question: &str) -> Confirmation {
        banner(&format!(
            "{} [Y/n] (default Y in {}s): ",
            question,
            self.timeout.as_secs()
        ));
        match self.next_line(Some(self.timeout)) {
            Ok(line) => Confirmation {
                accepted: parse_answer(&line).unwrap_or(true),
                timed_out: false,
            },
            Err(RecvTimeoutError::Timeout) => {
                println!();
                info!("timeout, proceeding with default (Y)");
                Confirmation {
                    accepted: true,
                    timed_out: true,
                }
            }
            Err(RecvTimeoutError::Disconnected) => {
                println!();
                Confirmation {
                    accepted: true,
                    timed_out: true,
                }
            }
        }
    }

    fn phase_order(&mut self, menu: &str, default: &str) -> String {
        println!("{}", menu);
        print!("Enter your choice (default: {}): ", default);
        let _ = io::stdout().flush();
        match self.next_line(None) {
            Ok(line) if !line.trim().is_empty() => line.trim().to_string(),
            _ => default.to_string(),
        }
    }
}

/// Non-interactive operator: accepts every phase and the default order.
#[derive(Debug, Default, Clone, Copy)]
pub struct AssumeYes;

impl Operator for AssumeYes {
    fn confirm(&mut self, question: &str) -> Confirmation {
        info!("{} [auto-yes]", question);
        Confirmation {
            accepted: true,
            timed_out: false,
        }
    }

    fn phase_order(&mut self, _menu: &str, default: &str) -> String {
        default.to_string()
    }
}
