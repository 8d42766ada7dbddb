use log::info;
use tokio::io::{ self, AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader };

use crate::error::ChatError;
use crate::models::chat::{ Message, Role };
use crate::session::ChatSession;

const HELP: &str = "Commands: /clear resets the chat, /history shows the message count, /quit exits.";

fn label(role: Role) -> &'static str {
    match role {
        Role::System => "⚙️ System",
        Role::User => "🧍 You",
        Role::Assistant => "🤖 AI",
    }
}

async fn render<W: AsyncWrite + Unpin>(output: &mut W, messages: &[Message]) -> io::Result<()> {
    for message in messages {
        output.write_all(format!("{}: {}\n", label(message.role), message.content).as_bytes()).await?;
    }
    output.flush().await
}

/// Reads user lines from `input` until EOF or `/quit`, writing the transcript to `output`.
pub async fn run_with<R, W>(session: &mut ChatSession, input: R, mut output: W) -> io::Result<()>
    where R: AsyncBufRead + Unpin, W: AsyncWrite + Unpin
{
    output.write_all(format!("{}\n", HELP).as_bytes()).await?;
    render(&mut output, session.history()).await?;

    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        match line {
            "" => continue,
            "/quit" | "/exit" => break,
            "/clear" => {
                output.write_all("🗑️ Chat history cleared.\n".as_bytes()).await?;
                let seed = session.clear_session().to_vec();
                render(&mut output, &seed).await?;
            }
            "/history" => {
                let summary = format!(
                    "💬 Messages in history: {} ({} from you, {} from the model)\n",
                    session.len(),
                    session.count(Role::User),
                    session.count(Role::Assistant)
                );
                output.write_all(summary.as_bytes()).await?;
            }
            text => {
                output.write_all("⏳ Thinking...\n".as_bytes()).await?;
                output.flush().await?;
                match session.submit_turn(text).await {
                    Ok(outcome) => {
                        let reply = Message::assistant(outcome.reply);
                        render(&mut output, std::slice::from_ref(&reply)).await?;
                    }
                    Err(ChatError::Validation(reason)) => {
                        output.write_all(format!("Message not sent: {}\n", reason).as_bytes()).await?;
                    }
                    Err(e) => {
                        return Err(io::Error::new(io::ErrorKind::Other, e.to_string()));
                    }
                }
            }
        }
        output.flush().await?;
    }

    info!("Chat ended with {} message(s) in history", session.len());
    Ok(())
}

pub async fn run(session: &mut ChatSession) -> io::Result<()> {
    run_with(session, BufReader::new(io::stdin()), io::stdout()).await
}
