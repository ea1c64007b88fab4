use std::io::Write;

use anyhow::{bail, Result};
use tokio::io::{AsyncBufReadExt, BufReader};

use agent_chat::{ChatClient, ChatWidget, Message, Role};

const PROMPT: &str = ">>> ";

fn is_exit_command(line: &str) -> bool {
    matches!(line.trim().to_lowercase().as_str(), "exit" | "quit")
}

/// Agent lines appended since `from`. The user already sees what they typed.
fn agent_lines(messages: &[Message], from: usize) -> Vec<String> {
    messages
        .iter()
        .skip(from)
        .filter(|m| m.role == Role::Agent)
        .map(|m| format!("{}: {}", m.role.label(), m.text))
        .collect()
}

/// Line-oriented chat on stdin/stdout, same widget semantics as the terminal UI
pub async fn run(client: &ChatClient) -> Result<()> {
    let mut widget = ChatWidget::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = std::io::stdout();

    println!(
        "Connected to {}. Start chatting! Type 'exit' to quit.",
        client.endpoint()
    );

    loop {
        print!("{}", PROMPT);
        stdout.flush()?;

        let Some(line) = lines.next_line().await? else {
            println!();
            break;
        };
        if is_exit_command(&line) {
            break;
        }

        let shown = widget.messages().len();
        widget.input_mut().set_value(&line);
        widget.submit(client).await;

        for out in agent_lines(widget.messages(), shown) {
            println!("{}", out);
        }
    }

    Ok(())
}

/// One exchange. Fails when the server could not be reached.
pub async fn send_once(client: &ChatClient, message: &str) -> Result<()> {
    let mut widget = ChatWidget::new();
    widget.input_mut().set_value(message);
    let Some(message) = widget.begin_submit() else {
        bail!("message is empty");
    };
    let outcome = client.send(&message).await;
    let unreachable = outcome.is_err();
    widget.finish_submit(outcome);

    let replies = agent_lines(widget.messages(), 0);
    for out in &replies {
        println!("{}", out);
    }

    if unreachable {
        bail!("could not reach {}", client.endpoint());
    }
    Ok(())
}
