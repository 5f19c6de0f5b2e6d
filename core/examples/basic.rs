//! Minimal demo: run a prompt through the `tonepro` plugin.
//!
//! Run with `MIXGARDEN_API_KEY=sk-... cargo run -p mixgarden --example basic`.
//! Point `MIXGARDEN_BASE_URL` at a local mock server to try it offline.

use mixgarden::{decode, ChatRequest, ChatResponse, ClientConfig, Mixgarden};

fn main() -> Result<(), mixgarden::ApiError> {
    let config = ClientConfig::from_env()?;

    let reply = Mixgarden::scoped(config, |mg| {
        mg.chat(&ChatRequest::new("Rewrite this in pirate slang", "tonepro"))
    })?;

    match reply {
        Some(value) => {
            let reply: ChatResponse = decode(value)?;
            println!("{}", reply.text);
        }
        None => println!("(no content)"),
    }
    Ok(())
}
