//! Completion computed off the input thread while the user types.
//!
//! Every keystroke submits the current line and bumps a generation
//! counter. A single worker thread picks up the newest request, skipping
//! any that piled up behind it, and abandons a computation as soon as a
//! newer generation is submitted. Only a result whose generation is still
//! current is ever handed back.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::completion::{Candidate, CompletionEngine};
use crate::resolver::LineContextResolver;
use crate::tree::CommandTreeIndex;

/// Answers "has a newer request superseded mine?".
#[derive(Debug, Clone)]
pub struct CancelToken {
    current: Arc<AtomicU64>,
    generation: u64,
}

impl CancelToken {
    pub fn new(current: Arc<AtomicU64>, generation: u64) -> Self {
        Self { current, generation }
    }

    /// A token that is already cancelled.
    pub fn cancelled() -> Self {
        Self {
            current: Arc::new(AtomicU64::new(1)),
            generation: 0,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_cancelled(&self) -> bool {
        self.current.load(Ordering::SeqCst) != self.generation
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionResult {
    pub generation: u64,
    pub word: String,
    /// Byte offset in the submitted line where the word starts.
    pub replace_start: usize,
    pub candidates: Vec<Candidate>,
}

struct Request {
    generation: u64,
    line: String,
    shell_path: Vec<String>,
}

type ResultSlot = Arc<(Mutex<Option<CompletionResult>>, Condvar)>;

pub struct LiveCompleter {
    generation: Arc<AtomicU64>,
    sender: Option<Sender<Request>>,
    slot: ResultSlot,
    worker: Option<JoinHandle<()>>,
}

impl LiveCompleter {
    /// Starts the worker thread. The index is cloned into it; the tree
    /// itself is shared.
    pub fn spawn(index: &CommandTreeIndex, fuzzy: bool) -> Self {
        let generation = Arc::new(AtomicU64::new(0));
        let slot: ResultSlot = Arc::new((Mutex::new(None), Condvar::new()));
        let (sender, receiver) = mpsc::channel();

        let worker = {
            let index = index.clone();
            let generation = Arc::clone(&generation);
            let slot = Arc::clone(&slot);
            thread::spawn(move || run_worker(index, fuzzy, receiver, generation, slot))
        };

        Self {
            generation,
            sender: Some(sender),
            slot,
            worker: Some(worker),
        }
    }

    /// Queues `line` (text before the cursor) and returns its generation.
    /// Any computation still running for an older line is cancelled.
    pub fn submit(&self, line: &str, shell_path: &[String]) -> u64 {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let request = Request {
            generation,
            line: line.to_string(),
            shell_path: shell_path.to_vec(),
        };
        if let Some(sender) = &self.sender {
            if sender.send(request).is_err() {
                log::debug!("Live completion worker has stopped");
            }
        }
        generation
    }

    pub fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// The result for the most recent submission, if it is ready.
    pub fn latest(&self) -> Option<CompletionResult> {
        let (lock, _) = &*self.slot;
        let guard = lock.lock().ok()?;
        guard
            .as_ref()
            .filter(|result| result.generation == self.current_generation())
            .cloned()
    }

    /// Waits up to `timeout` for the most recent submission's result.
    pub fn wait_latest(&self, timeout: Duration) -> Option<CompletionResult> {
        let deadline = Instant::now() + timeout;
        let (lock, ready) = &*self.slot;
        let mut guard = lock.lock().ok()?;
        loop {
            let current = self.current_generation();
            if let Some(result) = guard.as_ref().filter(|r| r.generation == current) {
                return Some(result.clone());
            }
            let remaining = deadline.checked_duration_since(Instant::now())?;
            let (next, wait) = ready.wait_timeout(guard, remaining).ok()?;
            guard = next;
            if wait.timed_out() {
                let current = self.current_generation();
                return guard.as_ref().filter(|r| r.generation == current).cloned();
            }
        }
    }
}

impl Drop for LiveCompleter {
    fn drop(&mut self) {
        // Closing the channel ends the worker loop.
        self.sender.take();
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::warn!("Live completion worker panicked");
            }
        }
    }
}

fn run_worker(
    index: CommandTreeIndex,
    fuzzy: bool,
    receiver: Receiver<Request>,
    generation: Arc<AtomicU64>,
    slot: ResultSlot,
) {
    let engine = if fuzzy {
        CompletionEngine::fuzzy()
    } else {
        CompletionEngine::new()
    };
    let resolver = LineContextResolver::new(&index);

    while let Ok(mut request) = receiver.recv() {
        while let Ok(newer) = receiver.try_recv() {
            request = newer;
        }

        let token = CancelToken::new(Arc::clone(&generation), request.generation);
        if token.is_cancelled() {
            continue;
        }

        let context = resolver.resolve_line(&request.line, &request.shell_path);
        let Some(candidates) = engine.complete_cancellable(&context, &context.word, &token) else {
            log::trace!("Completion for generation {} cancelled", request.generation);
            continue;
        };

        let (lock, ready) = &*slot;
        if let Ok(mut guard) = lock.lock() {
            *guard = Some(CompletionResult {
                generation: request.generation,
                word: context.word.clone(),
                replace_start: context.replace_start,
                candidates,
            });
            ready.notify_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::fixture_index;

    const WAIT: Duration = Duration::from_secs(5);

    #[test]
    fn test_cancel_token_tracks_generation() {
        let current = Arc::new(AtomicU64::new(3));
        let token = CancelToken::new(Arc::clone(&current), 3);
        assert!(!token.is_cancelled());
        current.store(4, Ordering::SeqCst);
        assert!(token.is_cancelled());
        assert!(CancelToken::cancelled().is_cancelled());
    }

    #[test]
    fn test_result_for_latest_submission() {
        let completer = LiveCompleter::spawn(&fixture_index(), false);
        let generation = completer.submit("mu", &[]);
        let result = completer.wait_latest(WAIT).unwrap();
        assert_eq!(result.generation, generation);
        assert_eq!(result.word, "mu");
        let names: Vec<&str> = result.candidates.iter().map(|c| c.insert_text.as_str()).collect();
        assert_eq!(names, vec!["multi"]);
    }

    #[test]
    fn test_superseded_results_are_never_returned() {
        let completer = LiveCompleter::spawn(&fixture_index(), false);
        completer.submit("a", &[]);
        completer.submit("api ", &[]);
        let last = completer.submit("api t", &[]);
        let result = completer.wait_latest(WAIT).unwrap();
        assert_eq!(result.generation, last);
        assert_eq!(result.word, "t");
        assert_eq!(completer.latest().map(|r| r.generation), Some(last));
    }

    #[test]
    fn test_sub_shell_path_is_used() {
        let completer = LiveCompleter::spawn(&fixture_index(), true);
        completer.submit("gr", &["someshell".to_string()]);
        let result = completer.wait_latest(WAIT).unwrap();
        assert!(result.candidates.iter().any(|c| c.insert_text == "group"));
    }
}
