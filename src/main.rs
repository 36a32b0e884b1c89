use std::io::{self, BufRead, Write};
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use chat_stream::{CancellationSignal, StreamClient};
use guru::{
    logging, ChatChunk, ChatError, ChatOrchestrator, ChatRequest, GuruConfig, HistoryStore,
    MessageHistory, StdoutSink,
};
use signal_hook::consts::SIGINT;
use signal_hook::iterator::Signals;
use tracing::debug;

/// Exit status used when interrupted outside of an answer.
const INTERRUPTED_EXIT_CODE: i32 = 130;
const NEW_CONVERSATION_COMMAND: &str = "/new";

type Orchestrator =
    ChatOrchestrator<StreamClient<ChatRequest, ChatChunk>, MessageHistory, StdoutSink>;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {error}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), ChatError> {
    let config = GuruConfig::from_env()?;
    logging::init(config.verbose);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|error| ChatError::config(format!("failed to initialize tokio runtime: {error}")))?;

    let client = StreamClient::new(config.stream_config())?;
    debug!(endpoint = %client.endpoint(), "client ready");
    let mut orchestrator = ChatOrchestrator::new(client, MessageHistory::new(), StdoutSink::stdout());

    let cancel: CancellationSignal = Arc::new(AtomicBool::new(false));
    let asking = Arc::new(AtomicBool::new(false));
    install_interrupt_handler(Arc::clone(&cancel), Arc::clone(&asking))?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    if !args.is_empty() {
        let text = args.join(" ");
        return ask_turn(&runtime, &mut orchestrator, &config, &cancel, &asking, &text);
    }

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        prompt()?;
        let Some(line) = lines.next() else {
            return Ok(());
        };
        let line = line?;
        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        if text == NEW_CONVERSATION_COMMAND {
            orchestrator.new_conversation();
            orchestrator.history_mut().clear();
            continue;
        }
        if let Err(error) = ask_turn(&runtime, &mut orchestrator, &config, &cancel, &asking, text) {
            eprintln!("error: {error}");
        }
    }
}

fn ask_turn(
    runtime: &tokio::runtime::Runtime,
    orchestrator: &mut Orchestrator,
    config: &GuruConfig,
    cancel: &CancellationSignal,
    asking: &AtomicBool,
    text: &str,
) -> Result<(), ChatError> {
    cancel.store(false, Ordering::Release);
    asking.store(true, Ordering::Release);
    let result = runtime.block_on(orchestrator.ask(cancel, text, &config.ask));
    asking.store(false, Ordering::Release);
    result.map(|_| ())
}

/// SIGINT cancels the answer in flight; when idle it exits.
fn install_interrupt_handler(
    cancel: CancellationSignal,
    asking: Arc<AtomicBool>,
) -> Result<(), ChatError> {
    let mut signals = Signals::new([SIGINT])
        .map_err(|error| ChatError::config(format!("failed to register signal handlers: {error}")))?;

    thread::Builder::new()
        .name("guru-interrupt".to_string())
        .spawn(move || {
            for _ in signals.forever() {
                if asking.load(Ordering::Acquire) {
                    cancel.store(true, Ordering::Release);
                } else {
                    std::process::exit(INTERRUPTED_EXIT_CODE);
                }
            }
        })
        .map_err(|error| ChatError::config(format!("failed to spawn signal thread: {error}")))?;
    Ok(())
}

fn prompt() -> io::Result<()> {
    let mut stderr = io::stderr();
    write!(stderr, "> ")?;
    stderr.flush()
}
