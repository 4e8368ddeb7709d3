//! console loop
//! each action runs in its own task so `status` still answers during a handshake

use std::future::Future;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines, Stdin};

use super::command::{self, Command, HELP};
use super::view;
use crate::common::error::ClientError;
use crate::session::client::DeviceSessionClient;
use crate::session::serial_link::list_ports;
use crate::{info, warn};

const LOG_TAG: &str = "console";

type InputLines = Lines<BufReader<Stdin>>;

pub async fn run(client: Arc<DeviceSessionClient>) -> Result<(), ClientError> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("{}\n", HELP);
    println!("{}", view::render(&client.snapshot()));

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                info!(LOG_TAG, "ctrl-c received, leaving");
                None
            }
        };
        let Some(line) = line else {
            break;
        };

        match command::parse(&line) {
            Ok(None) => {}
            Ok(Some(Command::Quit)) => break,
            Ok(Some(Command::Help)) => println!("{}", HELP),
            Ok(Some(Command::Status)) => println!("{}", view::render(&client.snapshot())),
            Ok(Some(Command::Serial(None))) => match prompt_port(&mut lines).await? {
                PortPrompt::Picked(selection) => dispatch(&client, Command::Serial(selection)),
                PortPrompt::Interrupted => {
                    info!(LOG_TAG, "ctrl-c received at the port prompt, leaving");
                    break;
                }
            },
            Ok(Some(cmd)) => dispatch(&client, cmd),
            Err(msg) => println!("{}", msg),
        }
    }

    // release the port on the way out
    client.disconnect().await;
    Ok(())
}

/// answer to the port prompt
#[derive(Debug, PartialEq, Eq)]
enum PortPrompt {
    // None when the user declined
    Picked(Option<String>),
    Interrupted,
}

/// list attached ports and read the user's pick
async fn prompt_port(lines: &mut InputLines) -> Result<PortPrompt, ClientError> {
    let ports = match list_ports() {
        Ok(ports) => ports,
        Err(e) => {
            warn!(LOG_TAG, "cannot list serial ports: {}", e);
            Vec::new()
        }
    };
    if ports.is_empty() {
        println!("no serial ports found, type a port name or press enter to cancel");
    } else {
        for (i, port) in ports.iter().enumerate() {
            println!("  {}) {}", i + 1, port);
        }
        println!("pick a port (number or name), enter to cancel");
    }
    read_port_choice(lines, &ports, async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await
}

/// wait for one answer line unless `interrupt` fires first
async fn read_port_choice<R, F>(lines: &mut Lines<R>, ports: &[String], interrupt: F) -> Result<PortPrompt, ClientError>
where
    R: AsyncBufRead + Unpin,
    F: Future<Output = ()>,
{
    tokio::select! {
        answer = lines.next_line() => {
            let answer = answer?.unwrap_or_default();
            Ok(PortPrompt::Picked(command::parse_port_choice(&answer, ports)))
        }
        _ = interrupt => Ok(PortPrompt::Interrupted),
    }
}

/// run one session action in the background and print the result
fn dispatch(client: &Arc<DeviceSessionClient>, cmd: Command) {
    let client = client.clone();
    tokio::spawn(async move {
        let (name, outcome) = match cmd {
            Command::Connect => ("connect", client.connect().await),
            // None here means the user declined the port prompt
            Command::Serial(port) => ("serial", client.connect_serial(port).await),
            Command::On => ("on", client.toggle_on().await),
            Command::Off => ("off", client.toggle_off().await),
            Command::Toggle => ("toggle", client.toggle_value().await),
            Command::Get => ("get", client.fetch_value().await),
            Command::Disconnect => ("disconnect", client.disconnect().await),
            Command::Status | Command::Help | Command::Quit => return,
        };
        println!("{}", view::outcome_line(name, &outcome));
        println!("{}", view::render(&client.snapshot()));
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ports() -> Vec<String> {
        vec!["/dev/ttyUSB0".to_string(), "/dev/ttyACM0".to_string()]
    }

    #[tokio::test]
    async fn test_port_choice_from_input() {
        let mut lines = BufReader::new(&b"2\n"[..]).lines();
        let res = read_port_choice(&mut lines, &ports(), std::future::pending()).await.unwrap();
        assert_eq!(res, PortPrompt::Picked(Some("/dev/ttyACM0".to_string())));
    }

    #[tokio::test]
    async fn test_port_prompt_eof_declines() {
        let mut lines = BufReader::new(&b""[..]).lines();
        let res = read_port_choice(&mut lines, &ports(), std::future::pending()).await.unwrap();
        assert_eq!(res, PortPrompt::Picked(None));
    }

    #[tokio::test]
    async fn test_port_prompt_interrupted() {
        // the user never types anything
        let (_keyboard, input) = tokio::io::duplex(16);
        let mut lines = BufReader::new(input).lines();
        let res = read_port_choice(&mut lines, &ports(), async {}).await.unwrap();
        assert_eq!(res, PortPrompt::Interrupted);
    }
}
