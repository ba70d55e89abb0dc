//! Print the models the pipe would offer to the host

use lkeap_pipe::prelude::*;
use lkeap_pipe::tracing_ext::init_tracing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let pipe = LkeapPipe::from_env()?;
    println!("Models from {}:", pipe.config().base_url);

    for model in pipe.list_models().await {
        if model.is_error() {
            eprintln!("✗ {}", model.name);
        } else {
            println!("  {:<32} {}", model.id, model.name);
        }
    }

    Ok(())
}
