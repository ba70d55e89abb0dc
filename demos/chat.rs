//! Send one message to an LKEAP model and print the reply as it streams
//!
//! Reads `API_KEY` (and optionally `BASE_URL`, `NAME_PREFIX`) from the
//! environment or a `.env` file.
//!
//! ```bash
//! API_KEY=sk-... cargo run --example chat -- test.deepseek-r1 "你好"
//! ```

use futures::StreamExt;
use lkeap_pipe::prelude::*;
use lkeap_pipe::tracing_ext::init_tracing;
use std::io::Write;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let mut args = std::env::args().skip(1);
    let model = args.next().unwrap_or_else(|| "test.deepseek-r1".to_string());
    let prompt = args.next().unwrap_or_else(|| "你好".to_string());

    let pipe = LkeapPipe::from_env()?;
    let request = ChatRequest::new(model, vec![ChatMessage::user(prompt)]);

    let mut fragments = pipe.stream_chat(request);
    let mut stdout = std::io::stdout();
    while let Some(fragment) = fragments.next().await {
        write!(stdout, "{fragment}")?;
        stdout.flush()?;
    }
    writeln!(stdout)?;

    Ok(())
}
