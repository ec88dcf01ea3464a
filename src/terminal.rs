use crate::cli::ChatArgs;
use crate::client::{ ChatSession, RelayClient };
use crate::models::chat::{ Message, Sender };
use std::error::Error;
use std::io::{ self, Write };
use tokio::io::{ AsyncBufReadExt, BufReader };
use log::info;

const RESET_COMMAND: &str = "/reset";
const QUIT_COMMANDS: [&str; 2] = ["/quit", "/exit"];

/// Prints a cumulative text as it grows, writing only the part not yet shown.
/// If the text ever stops extending what was printed, it is shown again in full.
pub struct DeltaPrinter<W: Write> {
    out: W,
    printed: String,
    error: Option<io::Error>,
}

impl<W: Write> DeltaPrinter<W> {
    pub fn new(out: W) -> Self {
        Self { out, printed: String::new(), error: None }
    }

    pub fn render(&mut self, full_text: &str) {
        if self.error.is_some() {
            return;
        }
        let result = match full_text.strip_prefix(self.printed.as_str()) {
            Some(delta) => write!(self.out, "{}", delta),
            None => write!(self.out, "\n{}", full_text),
        }.and_then(|_| self.out.flush());

        match result {
            Ok(()) => {
                self.printed.clear();
                self.printed.push_str(full_text);
            }
            Err(e) => {
                self.error = Some(e);
            }
        }
    }

    pub fn finish(self) -> Result<W, io::Error> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.out),
        }
    }
}

fn print_message(out: &mut impl Write, message: &Message) -> io::Result<()> {
    let who = match message.sender {
        Sender::User => "you",
        Sender::Bot => "bot",
    };
    let time = message.timestamp.with_timezone(&chrono::Local).format("%H:%M");
    writeln!(out, "[{} {}] {}", who, time, message.text)?;
    out.flush()
}

pub async fn run_chat(args: ChatArgs) -> Result<(), Box<dyn Error + Send + Sync>> {
    let relay = RelayClient::new(&args.server_url)?;
    info!("Chatting with relay at {}", relay.endpoint());

    let mut session = ChatSession::new();
    for message in session.messages() {
        print_message(&mut io::stdout(), message)?;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let command = line.trim();
        if command.is_empty() {
            continue;
        }
        if QUIT_COMMANDS.contains(&command) {
            break;
        }
        if command == RESET_COMMAND {
            session.reset();
            for message in session.messages() {
                print_message(&mut io::stdout(), message)?;
            }
            continue;
        }

        print!("[bot] ");
        io::stdout().flush()?;
        let mut printer = DeltaPrinter::new(io::stdout());
        let reply = session.send(&relay, &line, |msg| printer.render(&msg.text)).await?;
        printer.finish()?;

        if reply.is_error {
            println!();
            print_message(&mut io::stdout(), &reply)?;
        } else {
            println!();
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rendered(updates: &[&str]) -> String {
        let mut printer = DeltaPrinter::new(Vec::new());
        for update in updates {
            printer.render(update);
        }
        String::from_utf8(printer.finish().unwrap()).unwrap()
    }

    #[test]
    fn prints_only_new_suffixes() {
        assert_eq!(rendered(&["Hel", "Hello", "Hello ဟယ်"]), "Hello ဟယ်");
    }

    #[test]
    fn repeated_update_prints_nothing_new() {
        assert_eq!(rendered(&["Hi", "Hi", "Hi"]), "Hi");
    }

    #[test]
    fn diverging_text_is_reprinted() {
        assert_eq!(rendered(&["abc", "xyz"]), "abc\nxyz");
    }

    #[test]
    fn message_line_names_the_sender() {
        let mut out = Vec::new();
        print_message(&mut out, &Message::new("hello", Sender::User)).unwrap();
        let line = String::from_utf8(out).unwrap();
        assert!(line.starts_with("[you "));
        assert!(line.ends_with("] hello\n"));
    }
}
